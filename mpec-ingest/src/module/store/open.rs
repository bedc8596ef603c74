///! Connection bootstrap
///!
///! Every returned connection has foreign keys on, a busy timeout and the
///! schema fully migrated.

use rusqlite::Connection;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use super::migrations::apply_migrations;
use crate::error::StoreResult;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub fn open_connection(path: &Path) -> StoreResult<Connection> {
    let started_at = Instant::now();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent) {
            tracing::warn!("Failed to create database directory {}: {}", parent.display(), e);
        }
    }

    let mut conn = Connection::open(path).inspect_err(|e| {
        tracing::error!("Failed to open database {}: {}", path.display(), e);
    })?;
    bootstrap(&mut conn)?;

    tracing::info!(
        "Database {} ready ({} ms)",
        path.display(),
        started_at.elapsed().as_millis()
    );
    Ok(conn)
}

pub fn open_in_memory() -> StoreResult<Connection> {
    let mut conn = Connection::open_in_memory()?;
    bootstrap(&mut conn)?;
    Ok(conn)
}

fn bootstrap(conn: &mut Connection) -> StoreResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_migrations(conn)
}
