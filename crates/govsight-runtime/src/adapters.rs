//! Capability interfaces the cascade consumes.
//!
//! Both traits report failure as `GovsightError::AdapterUnavailable`. The
//! cascade treats that exactly like a miss, so implementations should not
//! retry internally or panic on bad upstream data.

use async_trait::async_trait;
use govsight_types::error::GovsightResult;

/// A passage returned by a semantic index, with its similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredText {
    pub text: String,
    /// In `[0, 1]`.
    pub score: f32,
}

/// Semantic similarity search over stored passages.
///
/// Results are ordered by descending score. Implementations hold no
/// per-query state, so `query` may be called repeatedly and concurrently.
#[async_trait]
pub trait SemanticIndex: Send + Sync {
    async fn query(&self, text: &str, top_k: usize) -> GovsightResult<Vec<ScoredText>>;
}

/// A single summarized answer from the web.
#[derive(Debug, Clone, PartialEq)]
pub struct WebAnswer {
    pub text: String,
    /// Adapter-reported answer quality in `[0, 1]`.
    pub confidence: f32,
}

/// Last-resort web lookup.
#[async_trait]
pub trait WebFallback: Send + Sync {
    async fn query(&self, text: &str) -> GovsightResult<WebAnswer>;
}
