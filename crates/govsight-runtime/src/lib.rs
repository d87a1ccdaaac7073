//! Query parsing and retrieval adapters for GovSight.
//!
//! The cascade in `govsight-kernel` only sees the [`adapters`] traits; the
//! concrete implementations here (embedding-backed passage index, web
//! reasoner) are injected at boot and can be swapped for test doubles.

pub mod adapters;
pub mod embedding;
pub mod llm;
pub mod parser;
pub mod vector_index;
pub mod web_cache;
pub mod web_reasoner;
pub mod web_search;
