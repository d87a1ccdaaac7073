//! Storage substrate for GovSight.
//!
//! Two stores share one SQLite connection:
//! - **Fact store**: normalized subject–attribute–value triples, unique per
//!   (subject, attribute)
//! - **Passage store**: free-text passages with embedding vectors, ranked by
//!   cosine similarity for the semantic tier

mod backing;
pub mod facts;
pub mod migration;
pub mod normalize;
pub mod passages;

mod substrate;
pub use substrate::MemorySubstrate;
