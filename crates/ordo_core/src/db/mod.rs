//! SQLite layer under [`crate::store::sqlite::SqliteTaskStore`].
//!
//! # Responsibility
//! - Hand out connections whose `items` schema is current.
//! - Report schema drift with enough context to tell an old file from a
//!   newer binary's file.
//!
//! # Invariants
//! - `PRAGMA user_version` is the only schema marker.
//! - The store never reads or writes rows on a connection that failed
//!   [`migrations::ensure_current`].

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Errors from opening, migrating or checking a task database.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file was written by a newer build.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// A connection handed to the store is not at the expected version.
    SchemaMismatch { expected: u32, actual: u32 },
    /// One migration script failed; nothing from the run was kept.
    Migration {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "task database schema {db_version} is newer than this build ({latest_supported})"
            ),
            Self::SchemaMismatch { expected, actual } => write!(
                f,
                "task store requires schema version {expected}, got {actual}"
            ),
            Self::Migration {
                version,
                name,
                source,
            } => write!(f, "migration {version} ({name}) failed: {source}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::SchemaMismatch { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
