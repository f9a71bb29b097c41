//! Schema history of the task database.
//!
//! Versions are dense from 1. A run applies every pending script in one
//! transaction and bumps `user_version` after each script, so a failure
//! leaves the file at the version it was opened with.

use crate::db::{DbError, DbResult};
use log::{info, warn};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "items",
    sql: include_str!("0001_items.sql"),
}];

/// Where a connection's schema stands relative to this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    Current,
    /// `pending` scripts would bring it up to date.
    Behind { version: u32, pending: usize },
    Ahead { version: u32 },
}

/// Highest schema version this build writes.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Raw `PRAGMA user_version` of `conn`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}

pub fn schema_state(conn: &Connection) -> DbResult<SchemaState> {
    let version = schema_version(conn)?;
    let latest = latest_version();
    Ok(if version == latest {
        SchemaState::Current
    } else if version > latest {
        SchemaState::Ahead { version }
    } else {
        SchemaState::Behind {
            version,
            pending: pending(version).count(),
        }
    })
}

/// Rejects connections the store cannot safely use.
///
/// # Errors
/// - `SchemaMismatch` when the connection is behind or ahead of this build.
pub fn ensure_current(conn: &Connection) -> DbResult<()> {
    match schema_state(conn)? {
        SchemaState::Current => Ok(()),
        SchemaState::Behind { version, .. } | SchemaState::Ahead { version } => {
            warn!(
                "event=db_schema module=db status=error expected={} actual={}",
                latest_version(),
                version
            );
            Err(DbError::SchemaMismatch {
                expected: latest_version(),
                actual: version,
            })
        }
    }
}

/// Brings `conn` up to [`latest_version`].
///
/// Returns the number of scripts applied.
///
/// # Errors
/// - `UnsupportedSchemaVersion` for a file from a newer build.
/// - `Migration` naming the script that failed.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let from_version = match schema_state(conn)? {
        SchemaState::Current => return Ok(0),
        SchemaState::Ahead { version } => {
            return Err(DbError::UnsupportedSchemaVersion {
                db_version: version,
                latest_supported: latest_version(),
            })
        }
        SchemaState::Behind { version, .. } => version,
    };

    let tx = conn.transaction()?;
    let mut applied = 0;
    for migration in pending(from_version) {
        let step = tx.execute_batch(migration.sql).and_then(|()| {
            tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))
        });
        step.map_err(|source| DbError::Migration {
            version: migration.version,
            name: migration.name,
            source,
        })?;
        info!(
            "event=db_migrate module=db status=step version={} name={}",
            migration.version, migration.name
        );
        applied += 1;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={} applied={}",
        from_version,
        latest_version(),
        applied
    );
    Ok(applied)
}

fn pending(version: u32) -> impl Iterator<Item = &'static Migration> {
    MIGRATIONS
        .iter()
        .filter(move |migration| migration.version > version)
}
