//! Connection handle shared by the stores.

use govsight_types::error::{GovsightError, GovsightResult};
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

/// Either an open, migrated connection or the reason the database could not
/// be opened. An unavailable backing fails every call with `StoreUnavailable`.
#[derive(Clone)]
pub(crate) enum Backing {
    Open(Arc<Mutex<Connection>>),
    Unavailable(Arc<str>),
}

impl Backing {
    pub(crate) fn lock(&self) -> GovsightResult<MutexGuard<'_, Connection>> {
        match self {
            Backing::Open(conn) => conn.lock().map_err(|e| GovsightError::Internal(e.to_string())),
            Backing::Unavailable(reason) => {
                Err(GovsightError::StoreUnavailable(reason.to_string()))
            }
        }
    }
}
