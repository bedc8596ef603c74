///! `change_tracking` table

use mpec_common::ChangeTrackingRecord;
use rusqlite::{Connection, OptionalExtension, params};

use super::{bool_flag, format_instant, parse_instant};
use crate::error::StoreResult;

pub fn get(conn: &Connection, unit_id: &str) -> StoreResult<Option<ChangeTrackingRecord>> {
    let raw = conn
        .query_row(
            "SELECT unit_id, last_run_at, content_hash, changed FROM change_tracking WHERE unit_id = ?1;",
            [unit_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((unit_id, last_run_at, content_hash, changed)) = raw else {
        return Ok(None);
    };
    Ok(Some(ChangeTrackingRecord {
        unit_id,
        last_run_at: parse_instant(&last_run_at)?,
        content_hash,
        changed: bool_flag(changed),
    }))
}

pub fn put(conn: &Connection, record: &ChangeTrackingRecord) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO change_tracking (unit_id, last_run_at, content_hash, changed)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (unit_id) DO UPDATE SET
            last_run_at = excluded.last_run_at,
            content_hash = excluded.content_hash,
            changed = excluded.changed;",
        params![
            record.unit_id,
            format_instant(&record.last_run_at),
            record.content_hash,
            record.changed,
        ],
    )?;
    Ok(())
}
