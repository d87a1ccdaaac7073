//! Fact triples and lookup keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted subject–attribute–value triple.
///
/// `subject` and `attribute` are always stored in normalized form; `value` is
/// kept verbatim as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub subject: String,
    pub attribute: String,
    pub value: String,
    /// Free-form provenance (e.g. "cli", "teach", a document name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Fact {
    /// The (subject, attribute) key this fact is stored under.
    pub fn key(&self) -> LookupKey {
        LookupKey {
            subject: self.subject.clone(),
            attribute: self.attribute.clone(),
        }
    }
}

/// An ephemeral (subject, attribute) pair produced by the fact parser.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LookupKey {
    pub subject: String,
    pub attribute: String,
}

impl LookupKey {
    pub fn new(subject: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            attribute: attribute.into(),
        }
    }
}

impl std::fmt::Display for LookupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.subject, self.attribute)
    }
}

/// A complete triple parsed from a declarative statement, before storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedStatement {
    pub key: LookupKey,
    pub value: String,
}
