//! Retrieval results, provenance tiers and terminal query outcomes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which knowledge source produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTier {
    /// The local structured fact store.
    Local,
    /// The semantic vector index.
    Vector,
    /// The live web fallback.
    Web,
}

impl std::fmt::Display for SourceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Vector => write!(f, "vector"),
            Self::Web => write!(f, "web"),
        }
    }
}

/// The accepted answer for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub answer_text: String,
    pub source_tier: SourceTier,
    /// Normalized to `[0.0, 1.0]`. Local exact matches are always `1.0`.
    pub confidence: f32,
}

impl RetrievalResult {
    /// Build a result, clamping `confidence` into `[0.0, 1.0]`.
    ///
    /// Non-finite confidences are treated as `0.0`.
    pub fn new(answer_text: impl Into<String>, source_tier: SourceTier, confidence: f32) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            answer_text: answer_text.into(),
            source_tier,
            confidence,
        }
    }

    /// A local exact match (confidence 1.0).
    pub fn local(answer_text: impl Into<String>) -> Self {
        Self::new(answer_text, SourceTier::Local, 1.0)
    }
}

/// Why a query ended without an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoAnswerReason {
    /// Every tier was tried and none produced an acceptable answer.
    Exhausted,
    /// The per-query deadline fired while `tier` was running.
    Timeout { tier: SourceTier },
    /// The caller cancelled the query while `tier` was running.
    Cancelled { tier: SourceTier },
}

impl std::fmt::Display for NoAnswerReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exhausted => write!(f, "all sources exhausted"),
            Self::Timeout { tier } => write!(f, "timed out during {tier} lookup"),
            Self::Cancelled { tier } => write!(f, "cancelled during {tier} lookup"),
        }
    }
}

/// Terminal, user-visible failure of a query.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[error("No answer found: {reason}")]
pub struct NoAnswerFound {
    pub reason: NoAnswerReason,
}

impl NoAnswerFound {
    pub fn exhausted() -> Self {
        Self {
            reason: NoAnswerReason::Exhausted,
        }
    }

    pub fn timeout(tier: SourceTier) -> Self {
        Self {
            reason: NoAnswerReason::Timeout { tier },
        }
    }

    pub fn cancelled(tier: SourceTier) -> Self {
        Self {
            reason: NoAnswerReason::Cancelled { tier },
        }
    }

    /// Whether the query was aborted (timeout or cancellation) rather than exhausted.
    pub fn is_aborted(&self) -> bool {
        !matches!(self.reason, NoAnswerReason::Exhausted)
    }
}
