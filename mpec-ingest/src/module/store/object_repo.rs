///! `objects` registry, last write wins

use mpec_common::ObjectRecord;
use rusqlite::{Connection, OptionalExtension, params};

use super::{bool_flag, char_column, format_naive, parse_char, parse_naive};
use crate::error::StoreResult;

pub fn upsert(conn: &Connection, record: &ObjectRecord) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO objects (
            object_id, has_discovery_flag, note1, note2, last_observed_at,
            magnitude, band, star_catalog_code
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT (object_id) DO UPDATE SET
            has_discovery_flag = excluded.has_discovery_flag,
            note1 = excluded.note1,
            note2 = excluded.note2,
            last_observed_at = excluded.last_observed_at,
            magnitude = excluded.magnitude,
            band = excluded.band,
            star_catalog_code = excluded.star_catalog_code;",
        params![
            record.object_id,
            record.has_discovery_flag,
            char_column(record.note1),
            char_column(record.note2),
            format_naive(&record.last_observed_at),
            record.magnitude,
            char_column(record.band),
            char_column(record.star_catalog_code),
        ],
    )?;
    Ok(())
}

pub fn get(conn: &Connection, object_id: &str) -> StoreResult<Option<ObjectRecord>> {
    let raw = conn
        .query_row(
            "SELECT object_id, has_discovery_flag, note1, note2, last_observed_at,
                    magnitude, band, star_catalog_code
             FROM objects
             WHERE object_id = ?1;",
            [object_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<f64>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, Option<String>>(7)?,
                ))
            },
        )
        .optional()?;

    let Some((object_id, discovery, note1, note2, last_observed_at, magnitude, band, catalog)) = raw else {
        return Ok(None);
    };

    Ok(Some(ObjectRecord {
        object_id,
        has_discovery_flag: bool_flag(discovery),
        note1: parse_char(note1),
        note2: parse_char(note2),
        last_observed_at: parse_naive(&last_observed_at)?,
        magnitude,
        band: parse_char(band),
        star_catalog_code: parse_char(catalog),
    }))
}
