//! Embedding-backed [`SemanticIndex`] over the local passage store.

use crate::adapters::{ScoredText, SemanticIndex};
use crate::embedding::EmbeddingDriver;
use async_trait::async_trait;
use govsight_memory::passages::PassageStore;
use govsight_types::error::{GovsightError, GovsightResult};
use govsight_types::retrieval::SourceTier;
use std::sync::Arc;
use tracing::debug;

/// Embeds the query and ranks stored passages by cosine similarity.
///
/// Without an embedding driver every query reports unavailable.
pub struct EmbeddingIndex {
    driver: Option<Arc<dyn EmbeddingDriver>>,
    passages: PassageStore,
}

impl EmbeddingIndex {
    pub fn new(driver: Option<Arc<dyn EmbeddingDriver>>, passages: PassageStore) -> Self {
        Self { driver, passages }
    }

    fn driver(&self) -> GovsightResult<&Arc<dyn EmbeddingDriver>> {
        self.driver.as_ref().ok_or_else(|| {
            GovsightError::adapter(SourceTier::Vector, "no embedding driver configured")
        })
    }

    /// Embed and store a passage. Returns the passage id.
    pub async fn add_passage(&self, content: &str, source: Option<&str>) -> GovsightResult<String> {
        let embedding = self
            .driver()?
            .embed_one(content)
            .await
            .map_err(|e| GovsightError::adapter(SourceTier::Vector, e.to_string()))?;
        let id = self.passages.add(content, source, &embedding)?;
        debug!(id = %id, dims = embedding.len(), "Passage indexed");
        Ok(id)
    }
}

#[async_trait]
impl SemanticIndex for EmbeddingIndex {
    async fn query(&self, text: &str, top_k: usize) -> GovsightResult<Vec<ScoredText>> {
        let driver = self.driver()?;
        let store_err =
            |e: GovsightError| GovsightError::adapter(SourceTier::Vector, e.to_string());

        // Nothing to rank; skip the embedding call.
        if self.passages.count().map_err(store_err)? == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = driver
            .embed_one(text)
            .await
            .map_err(|e| GovsightError::adapter(SourceTier::Vector, e.to_string()))?;
        let hits = self
            .passages
            .search(&query_embedding, top_k)
            .map_err(store_err)?;

        Ok(hits
            .into_iter()
            .map(|hit| ScoredText {
                text: hit.passage.content,
                score: hit.score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingError;
    use govsight_memory::MemorySubstrate;

    /// Deterministic embedding: counts of a few marker words.
    struct KeywordEmbedder;

    #[async_trait]
    impl EmbeddingDriver for KeywordEmbedder {
        async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts
                .iter()
                .map(|t| {
                    let t = t.to_lowercase();
                    ["mayor", "rodeo", "county"]
                        .iter()
                        .map(|w| t.matches(w).count() as f32)
                        .collect()
                })
                .collect())
        }
    }

    fn index(with_driver: bool) -> EmbeddingIndex {
        let substrate = MemorySubstrate::open_in_memory().unwrap();
        let driver: Option<Arc<dyn EmbeddingDriver>> = if with_driver {
            Some(Arc::new(KeywordEmbedder))
        } else {
            None
        };
        EmbeddingIndex::new(driver, substrate.passages().clone())
    }

    #[tokio::test]
    async fn test_add_and_query() {
        let idx = index(true);
        idx.add_passage("Jane Doe is the mayor of Grandview", Some("minutes"))
            .await
            .unwrap();
        idx.add_passage("The Cleburne rodeo is in June", None)
            .await
            .unwrap();

        let hits = idx.query("who is the mayor?", 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].text.contains("Jane Doe"));
        assert!((hits[0].score - 1.0).abs() < 1e-5);
        assert_eq!(hits[1].score, 0.0);
    }

    #[tokio::test]
    async fn test_empty_store_returns_no_hits() {
        let idx = index(true);
        assert!(idx.query("anything", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_without_driver_is_unavailable() {
        let idx = index(false);
        let err = idx.query("anything", 5).await.unwrap_err();
        assert!(matches!(
            err,
            GovsightError::AdapterUnavailable {
                tier: SourceTier::Vector,
                ..
            }
        ));
        assert!(idx.add_passage("text", None).await.is_err());
    }
}
