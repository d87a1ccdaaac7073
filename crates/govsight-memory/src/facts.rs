//! SQLite fact store for subject–attribute–value triples.
//!
//! Every subject and attribute passes through [`normalize_key`] on the way in,
//! for reads and writes alike. The table's primary key on (subject, attribute)
//! plus `ON CONFLICT DO UPDATE` keeps exactly one row per pair.

use crate::backing::Backing;
use crate::normalize::normalize_key;
use chrono::{DateTime, Utc};
use govsight_types::error::{GovsightError, GovsightResult};
use govsight_types::fact::Fact;
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Fact store backed by SQLite.
///
/// Cloning is cheap; clones share the same connection. All access goes
/// through the connection mutex, so writes are serialized.
#[derive(Clone)]
pub struct FactStore {
    backing: Backing,
}

impl FactStore {
    /// Create a new fact store wrapping the given (migrated) connection.
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            backing: Backing::Open(conn),
        }
    }

    pub(crate) fn from_backing(backing: Backing) -> Self {
        Self { backing }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.backing, Backing::Open(_))
    }

    fn lock(&self) -> GovsightResult<MutexGuard<'_, Connection>> {
        self.backing.lock()
    }

    /// Exact-match lookup.
    pub fn get(&self, subject: &str, attribute: &str) -> GovsightResult<Option<Fact>> {
        let key = normalize_key(subject, attribute)?;
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT subject, attribute, value, source, updated_at FROM facts
                 WHERE subject = ?1 AND attribute = ?2",
            )
            .map_err(|e| GovsightError::StoreUnavailable(e.to_string()))?;
        let result = stmt.query_row(rusqlite::params![key.subject, key.attribute], read_row);
        match result {
            Ok(row) => Ok(Some(row.into_fact())),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(GovsightError::StoreUnavailable(e.to_string())),
        }
    }

    /// Upsert a fact with no provenance.
    pub fn put(&self, subject: &str, attribute: &str, value: &str) -> GovsightResult<()> {
        self.put_with_source(subject, attribute, value, None)
    }

    /// Upsert a fact, recording where it came from.
    ///
    /// Writing an existing (subject, attribute) pair replaces `value`,
    /// `source` and `updated_at`.
    pub fn put_with_source(
        &self,
        subject: &str,
        attribute: &str,
        value: &str,
        source: Option<&str>,
    ) -> GovsightResult<()> {
        let key = normalize_key(subject, attribute)?;
        if value.trim().is_empty() {
            return Err(GovsightError::InvalidInput(format!("empty value for {key}")));
        }
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO facts (subject, attribute, value, source, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(subject, attribute) DO UPDATE SET value = ?3, source = ?4, updated_at = ?5",
            rusqlite::params![key.subject, key.attribute, value, source, now],
        )
        .map_err(|e| GovsightError::StoreUnavailable(e.to_string()))?;
        debug!(subject = %key.subject, attribute = %key.attribute, "Fact stored");
        Ok(())
    }

    /// Delete a fact. Returns whether a row existed and was removed.
    pub fn delete(&self, subject: &str, attribute: &str) -> GovsightResult<bool> {
        let key = normalize_key(subject, attribute)?;
        let conn = self.lock()?;
        let removed = conn
            .execute(
                "DELETE FROM facts WHERE subject = ?1 AND attribute = ?2",
                rusqlite::params![key.subject, key.attribute],
            )
            .map_err(|e| GovsightError::StoreUnavailable(e.to_string()))?;
        Ok(removed > 0)
    }

    /// All facts recorded for a subject, ordered by attribute.
    pub fn facts_for_subject(&self, subject: &str) -> GovsightResult<Vec<Fact>> {
        let subject_norm = crate::normalize::normalize(subject);
        if subject_norm.is_empty() {
            return Err(GovsightError::MalformedKey(format!(
                "subject '{subject}' is empty after normalization"
            )));
        }
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT subject, attribute, value, source, updated_at FROM facts
                 WHERE subject = ?1 ORDER BY attribute",
            )
            .map_err(|e| GovsightError::StoreUnavailable(e.to_string()))?;
        let rows = stmt
            .query_map(rusqlite::params![subject_norm], read_row)
            .map_err(|e| GovsightError::StoreUnavailable(e.to_string()))?;

        let mut facts = Vec::new();
        for row in rows {
            let row = row.map_err(|e| GovsightError::StoreUnavailable(e.to_string()))?;
            facts.push(row.into_fact());
        }
        Ok(facts)
    }

    /// Number of stored facts.
    pub fn count(&self) -> GovsightResult<usize> {
        let conn = self.lock()?;
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM facts", [], |row| row.get(0))
            .map_err(|e| GovsightError::StoreUnavailable(e.to_string()))?;
        Ok(n as usize)
    }
}

/// Raw row from the facts table.
struct FactRow {
    subject: String,
    attribute: String,
    value: String,
    source: Option<String>,
    updated_at: String,
}

impl FactRow {
    fn into_fact(self) -> Fact {
        let updated_at = DateTime::parse_from_rfc3339(&self.updated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        Fact {
            subject: self.subject,
            attribute: self.attribute,
            value: self.value,
            source: self.source,
            updated_at,
        }
    }
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FactRow> {
    Ok(FactRow {
        subject: row.get(0)?,
        attribute: row.get(1)?,
        value: row.get(2)?,
        source: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::run_migrations;

    fn setup() -> FactStore {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        FactStore::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_put_then_get() {
        let store = setup();
        store.put("grandview tx", "mayor", "Jane Doe").unwrap();
        let fact = store.get("grandview tx", "mayor").unwrap().unwrap();
        assert_eq!(fact.value, "Jane Doe");
        assert_eq!(fact.subject, "grandview tx");
        assert_eq!(fact.attribute, "mayor");
    }

    #[test]
    fn test_get_missing() {
        let store = setup();
        assert!(store.get("nowhere", "mayor").unwrap().is_none());
    }

    #[test]
    fn test_put_is_idempotent() {
        let store = setup();
        store.put("grandview tx", "mayor", "Jane Doe").unwrap();
        store.put("grandview tx", "mayor", "Jane Doe").unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_overwrite_updates_value_and_timestamp() {
        let store = setup();
        store.put("grandview tx", "mayor", "Jane Doe").unwrap();
        let first = store.get("grandview tx", "mayor").unwrap().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.put("Grandview, TX", "Mayor", "John Roe").unwrap();
        let second = store.get("grandview tx", "mayor").unwrap().unwrap();
        assert_eq!(second.value, "John Roe");
        assert!(second.updated_at > first.updated_at);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_normalization_is_stable() {
        let store = setup();
        store.put("grandview tx", "mayor", "Jane Doe").unwrap();
        let a = store.get("Grandview, TX", "Mayor").unwrap().unwrap();
        let b = store.get("grandview tx", "mayor").unwrap().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_value_kept_verbatim() {
        let store = setup();
        store.put("grandview tx", "population", " 4,012 ").unwrap();
        let fact = store.get("grandview tx", "population").unwrap().unwrap();
        assert_eq!(fact.value, " 4,012 ");

        store.put("grandview tx", "mayor", "  Jane Doe\n").unwrap();
        let fact = store.get("grandview tx", "mayor").unwrap().unwrap();
        assert_eq!(fact.value, "  Jane Doe\n");
    }

    #[test]
    fn test_delete() {
        let store = setup();
        store.put("grandview tx", "mayor", "Jane Doe").unwrap();
        assert!(store.delete("GRANDVIEW, tx", "mayor").unwrap());
        assert!(!store.delete("grandview tx", "mayor").unwrap());
        assert!(store.get("grandview tx", "mayor").unwrap().is_none());
    }

    #[test]
    fn test_malformed_key_rejected() {
        let store = setup();
        assert!(matches!(
            store.put("...", "mayor", "x"),
            Err(GovsightError::MalformedKey(_))
        ));
        assert!(matches!(
            store.get("grandview", "!!"),
            Err(GovsightError::MalformedKey(_))
        ));
        assert!(matches!(
            store.delete("", "mayor"),
            Err(GovsightError::MalformedKey(_))
        ));
    }

    #[test]
    fn test_empty_value_rejected() {
        let store = setup();
        assert!(matches!(
            store.put("grandview", "mayor", "   "),
            Err(GovsightError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_facts_for_subject_and_source() {
        let store = setup();
        store
            .put_with_source("grandview tx", "mayor", "Jane Doe", Some("teach"))
            .unwrap();
        store.put("grandview tx", "county", "Johnson County").unwrap();
        store.put("cleburne tx", "mayor", "Someone Else").unwrap();

        let facts = store.facts_for_subject("Grandview, TX").unwrap();
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].attribute, "county");
        assert_eq!(facts[1].source.as_deref(), Some("teach"));
    }

    #[test]
    fn test_concurrent_writers_keep_one_row() {
        let store = setup();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store
                        .put("grandview tx", "mayor", &format!("Mayor {i}"))
                        .unwrap();
                    store.get("grandview tx", "mayor").unwrap().unwrap()
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.count().unwrap(), 1);
    }
}
