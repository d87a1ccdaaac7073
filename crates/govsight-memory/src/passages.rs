//! Passage store backing the local semantic index.
//!
//! Passages are stored with their embedding as a little-endian f32 BLOB.
//! Search loads every embedded passage, ranks by cosine similarity against the
//! query embedding, and returns scores clamped to `[0, 1]`.

use crate::backing::Backing;
use chrono::{DateTime, Utc};
use govsight_types::error::{GovsightError, GovsightResult};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

/// A stored passage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A passage paired with its similarity to a query.
#[derive(Debug, Clone)]
pub struct ScoredPassage {
    pub passage: Passage,
    pub score: f32,
}

/// Passage store backed by SQLite.
#[derive(Clone)]
pub struct PassageStore {
    backing: Backing,
}

impl PassageStore {
    /// Create a new passage store wrapping the given (migrated) connection.
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            backing: Backing::Open(conn),
        }
    }

    pub(crate) fn from_backing(backing: Backing) -> Self {
        Self { backing }
    }

    fn lock(&self) -> GovsightResult<MutexGuard<'_, Connection>> {
        self.backing.lock()
    }

    /// Store a passage with its embedding. Returns the new passage id.
    pub fn add(
        &self,
        content: &str,
        source: Option<&str>,
        embedding: &[f32],
    ) -> GovsightResult<String> {
        let content = content.trim();
        if content.is_empty() {
            return Err(GovsightError::InvalidInput("empty passage".to_string()));
        }
        if embedding.is_empty() {
            return Err(GovsightError::InvalidInput(
                "passage embedding is empty".to_string(),
            ));
        }
        let conn = self.lock()?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO passages (id, content, source, embedding, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![id, content, source, embedding_to_bytes(embedding), now],
        )
        .map_err(|e| GovsightError::StoreUnavailable(e.to_string()))?;
        Ok(id)
    }

    /// Rank passages by similarity to `query_embedding`, best first.
    pub fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> GovsightResult<Vec<ScoredPassage>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, content, source, created_at, embedding FROM passages
                 WHERE embedding IS NOT NULL",
            )
            .map_err(|e| GovsightError::StoreUnavailable(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let content: String = row.get(1)?;
                let source: Option<String> = row.get(2)?;
                let created_str: String = row.get(3)?;
                let embedding_bytes: Vec<u8> = row.get(4)?;
                Ok((id, content, source, created_str, embedding_bytes))
            })
            .map_err(|e| GovsightError::StoreUnavailable(e.to_string()))?;

        let mut scored = Vec::new();
        let mut candidates = 0usize;
        for row in rows {
            let (id, content, source, created_str, embedding_bytes) =
                row.map_err(|e| GovsightError::StoreUnavailable(e.to_string()))?;
            candidates += 1;
            let embedding = embedding_from_bytes(&embedding_bytes);
            let score = cosine_similarity(query_embedding, &embedding).clamp(0.0, 1.0);
            let created_at = DateTime::parse_from_rfc3339(&created_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());
            scored.push(ScoredPassage {
                passage: Passage {
                    id,
                    content,
                    source,
                    created_at,
                },
                score,
            });
        }

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        debug!(
            "Passage search: {} results from {} candidates",
            scored.len(),
            candidates
        );
        Ok(scored)
    }

    /// Remove a passage. Returns whether it existed.
    pub fn remove(&self, id: &str) -> GovsightResult<bool> {
        let conn = self.lock()?;
        let removed = conn
            .execute("DELETE FROM passages WHERE id = ?1", rusqlite::params![id])
            .map_err(|e| GovsightError::StoreUnavailable(e.to_string()))?;
        Ok(removed > 0)
    }

    /// Number of stored passages.
    pub fn count(&self) -> GovsightResult<usize> {
        let conn = self.lock()?;
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM passages", [], |row| row.get(0))
            .map_err(|e| GovsightError::StoreUnavailable(e.to_string()))?;
        Ok(n as usize)
    }
}

/// Compute cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn embedding_from_bytes(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::run_migrations;

    fn setup() -> PassageStore {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        PassageStore::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_search_ranking() {
        let store = setup();
        store
            .add("Grandview mayor is Jane Doe", Some("minutes"), &[0.9, 0.1, 0.0, 0.0])
            .unwrap();
        store
            .add("Cleburne has a rodeo", None, &[0.0, 0.0, 0.9, 0.1])
            .unwrap();
        store
            .add("Johnson County towns", None, &[0.5, 0.5, 0.0, 0.0])
            .unwrap();

        let results = store.search(&[0.85, 0.15, 0.0, 0.0], 3).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].passage.content.contains("Grandview"));
        assert_eq!(results[0].passage.source.as_deref(), Some("minutes"));
        assert!(results[2].passage.content.contains("rodeo"));
        assert!(results[0].score >= results[1].score);
        assert!(results[1].score >= results[2].score);
    }

    #[test]
    fn test_scores_clamped_to_unit_interval() {
        let store = setup();
        store.add("opposite", None, &[-1.0, 0.0]).unwrap();
        let results = store.search(&[1.0, 0.0], 5).unwrap();
        assert_eq!(results[0].score, 0.0);

        store.add("same", None, &[2.0, 0.0]).unwrap();
        let results = store.search(&[1.0, 0.0], 5).unwrap();
        assert!(results[0].score <= 1.0);
        assert_eq!(results[0].passage.content, "same");
    }

    #[test]
    fn test_top_k_truncates() {
        let store = setup();
        for i in 0..5 {
            store.add(&format!("p{i}"), None, &[1.0, i as f32]).unwrap();
        }
        assert_eq!(store.search(&[1.0, 0.0], 2).unwrap().len(), 2);
        assert_eq!(store.count().unwrap(), 5);
    }

    #[test]
    fn test_dimension_mismatch_scores_zero() {
        let store = setup();
        store.add("three dims", None, &[1.0, 0.0, 0.0]).unwrap();
        let results = store.search(&[1.0, 0.0], 1).unwrap();
        assert_eq!(results[0].score, 0.0);
    }

    #[test]
    fn test_remove_and_empty_input() {
        let store = setup();
        let id = store.add("gone soon", None, &[1.0]).unwrap();
        assert!(store.remove(&id).unwrap());
        assert!(!store.remove(&id).unwrap());
        assert!(store.add("  ", None, &[1.0]).is_err());
        assert!(store.add("x", None, &[]).is_err());
    }

    #[test]
    fn test_embedding_bytes() {
        let embedding = vec![0.1, -0.5, 1.23456, 0.0];
        let recovered = embedding_from_bytes(&embedding_to_bytes(&embedding));
        assert_eq!(embedding, recovered);
    }
}
