///! Per-station observation tables
///!
///! One `station_<CODE>` table per observatory code, created the first time a
///! bulletin mentions the station and recorded in `station_tables`.

use chrono::Utc;
use mpec_common::Observation;
use rusqlite::{Connection, OptionalExtension, params};

use super::{bool_flag, format_naive, parse_label, parse_naive};
use crate::error::{StoreError, StoreResult};

pub const TABLE_PREFIX: &str = "station_";

/// Station codes are exactly 3 ASCII alphanumerics; anything else never reaches DDL.
pub fn validate_code(code: &str) -> StoreResult<()> {
    if code.len() == 3 && code.bytes().all(|b| b.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(StoreError::InvalidStation(code.to_string()))
    }
}

pub fn table_name(code: &str) -> StoreResult<String> {
    validate_code(code)?;
    Ok(format!("{TABLE_PREFIX}{code}"))
}

pub fn is_registered(conn: &Connection, code: &str) -> StoreResult<bool> {
    let found = conn
        .query_row("SELECT 1 FROM station_tables WHERE code = ?1;", [code], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

/// Create the station table if needed. Returns true when it was created.
pub fn ensure_table(conn: &Connection, code: &str) -> StoreResult<bool> {
    let table = table_name(code)?;
    if is_registered(conn, code)? {
        return Ok(false);
    }

    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS \"{table}\" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            object_id TEXT NOT NULL,
            observed_at TEXT NOT NULL,
            time_degraded INTEGER NOT NULL,
            observer TEXT NOT NULL,
            measurer TEXT NOT NULL,
            facility TEXT NOT NULL,
            bulletin_id TEXT NOT NULL REFERENCES bulletins (id) ON DELETE CASCADE,
            bulletin_type TEXT NOT NULL,
            object_type TEXT,
            is_discovery INTEGER NOT NULL,
            UNIQUE (object_id, bulletin_id)
        );
        CREATE INDEX IF NOT EXISTS \"idx_{table}_bulletin\" ON \"{table}\" (bulletin_id);"
    ))?;
    conn.execute(
        "INSERT INTO station_tables (code, created_at) VALUES (?1, ?2);",
        params![code, Utc::now().to_rfc3339()],
    )?;

    tracing::info!("Created observation table for station {}", code);
    Ok(true)
}

pub fn registered_codes(conn: &Connection) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT code FROM station_tables ORDER BY code;")?;
    let codes = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(codes)
}

pub fn insert_observation(conn: &Connection, obs: &Observation) -> StoreResult<()> {
    let table = table_name(&obs.station_code)?;
    conn.execute(
        &format!(
            "INSERT INTO \"{table}\" (
                object_id, observed_at, time_degraded, observer, measurer, facility,
                bulletin_id, bulletin_type, object_type, is_discovery
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);"
        ),
        params![
            obs.object_id,
            format_naive(&obs.observed_at),
            obs.time_degraded,
            obs.observer,
            obs.measurer,
            obs.facility,
            obs.bulletin_id,
            obs.bulletin_type.as_str(),
            obs.object_type.map(|t| t.as_str()),
            obs.is_discovery,
        ],
    )?;
    Ok(())
}

type RawObservation = (String, String, i64, String, String, String, String, String, Option<String>, i64);

/// All observations of one station, oldest first.
pub fn observations(conn: &Connection, code: &str) -> StoreResult<Vec<Observation>> {
    let table = table_name(code)?;
    if !is_registered(conn, code)? {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT object_id, observed_at, time_degraded, observer, measurer, facility,
                bulletin_id, bulletin_type, object_type, is_discovery
         FROM \"{table}\"
         ORDER BY observed_at, id;"
    ))?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
                row.get(8)?,
                row.get(9)?,
            ))
        })?
        .collect::<Result<Vec<RawObservation>, _>>()?;

    rows.into_iter()
        .map(
            |(object_id, observed_at, degraded, observer, measurer, facility, bulletin_id, kind, object_type, discovery)| {
                Ok(Observation {
                    object_id,
                    observed_at: parse_naive(&observed_at)?,
                    time_degraded: bool_flag(degraded),
                    observer,
                    measurer,
                    facility,
                    station_code: code.to_string(),
                    bulletin_id,
                    bulletin_type: parse_label(&kind)?,
                    object_type: object_type.as_deref().map(parse_label).transpose()?,
                    is_discovery: bool_flag(discovery),
                })
            },
        )
        .collect()
}
