//! Opens the SQLite database and hands out the stores that share it.

use crate::backing::Backing;
use crate::facts::FactStore;
use crate::migration::run_migrations;
use crate::passages::PassageStore;
use govsight_types::error::{GovsightError, GovsightResult};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

/// The fact store and passage store over one shared connection.
#[derive(Clone)]
pub struct MemorySubstrate {
    facts: FactStore,
    passages: PassageStore,
}

impl MemorySubstrate {
    /// Open (or create) the database at `db_path` and run migrations.
    ///
    /// Any failure to open or migrate surfaces as `StoreUnavailable`.
    pub fn open(db_path: &Path) -> GovsightResult<Self> {
        let conn = Connection::open(db_path).map_err(|e| {
            GovsightError::StoreUnavailable(format!("{}: {e}", db_path.display()))
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")
            .map_err(|e| GovsightError::StoreUnavailable(e.to_string()))?;
        let substrate = Self::from_connection(conn)?;
        info!(path = %db_path.display(), "Opened fact database");
        Ok(substrate)
    }

    /// In-memory database, used by tests and dry runs.
    pub fn open_in_memory() -> GovsightResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| GovsightError::StoreUnavailable(e.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> GovsightResult<Self> {
        run_migrations(&conn).map_err(|e| GovsightError::StoreUnavailable(e.to_string()))?;
        let shared = Arc::new(Mutex::new(conn));
        Ok(Self {
            facts: FactStore::new(Arc::clone(&shared)),
            passages: PassageStore::new(shared),
        })
    }

    /// A substrate whose stores fail every call with `StoreUnavailable`.
    ///
    /// Lets the system keep answering from the other tiers when the database
    /// cannot be opened.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let backing = Backing::Unavailable(Arc::from(reason.into()));
        Self {
            facts: FactStore::from_backing(backing.clone()),
            passages: PassageStore::from_backing(backing),
        }
    }

    /// Whether the stores are backed by an open database.
    pub fn is_available(&self) -> bool {
        self.facts.is_available()
    }

    pub fn facts(&self) -> &FactStore {
        &self.facts
    }

    pub fn passages(&self) -> &PassageStore {
        &self.passages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facts.db");
        {
            let substrate = MemorySubstrate::open(&path).unwrap();
            substrate
                .facts()
                .put("grandview tx", "mayor", "Jane Doe")
                .unwrap();
        }
        let reopened = MemorySubstrate::open(&path).unwrap();
        let fact = reopened.facts().get("Grandview, TX", "mayor").unwrap();
        assert_eq!(fact.unwrap().value, "Jane Doe");
    }

    #[test]
    fn test_unopenable_path_is_store_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("nested").join("facts.db");
        let result = MemorySubstrate::open(&path);
        assert!(matches!(result, Err(GovsightError::StoreUnavailable(_))));
    }

    #[test]
    fn test_unavailable_substrate_fails_every_call() {
        let substrate = MemorySubstrate::unavailable("disk gone");
        assert!(!substrate.is_available());
        assert!(matches!(
            substrate.facts().get("grandview tx", "mayor"),
            Err(GovsightError::StoreUnavailable(_))
        ));
        assert!(matches!(
            substrate.facts().put("grandview tx", "mayor", "Jane Doe"),
            Err(GovsightError::StoreUnavailable(_))
        ));
        assert!(matches!(
            substrate.passages().count(),
            Err(GovsightError::StoreUnavailable(_))
        ));
        assert!(MemorySubstrate::open_in_memory().unwrap().is_available());
    }
}
