///! `bulletins` table

use chrono::Utc;
use mpec_common::{BulletinRecord, ObjectClass};
use rusqlite::{Connection, OptionalExtension, params};

use super::{bool_flag, format_instant, parse_instant, parse_label};
use crate::error::{StoreError, StoreResult};

pub fn fingerprint(conn: &Connection, id: &str) -> StoreResult<Option<String>> {
    let value = conn
        .query_row("SELECT fingerprint FROM bulletins WHERE id = ?1;", [id], |row| row.get(0))
        .optional()?;
    Ok(value)
}

/// Delete a bulletin; its station rows and cross references cascade.
pub fn delete(conn: &Connection, id: &str) -> StoreResult<bool> {
    let deleted = conn.execute("DELETE FROM bulletins WHERE id = ?1;", [id])?;
    Ok(deleted > 0)
}

pub fn insert(conn: &Connection, record: &BulletinRecord) -> StoreResult<()> {
    let stations = serde_json::to_string(&record.stations).map_err(|e| StoreError::InvalidData(e.to_string()))?;

    conn.execute(
        "INSERT INTO bulletins (
            id, title, url, published_at, bulletin_type, object_type, object_type_low_confidence,
            orbit_computer, issuer, fingerprint, stations, discovery_station,
            first_confirming_station, ingested_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14);",
        params![
            record.id,
            record.title,
            record.url,
            format_instant(&record.published_at),
            record.bulletin_type.as_str(),
            record.object_class.map(|c| c.kind.as_str()),
            record.object_class.is_some_and(|c| c.low_confidence),
            record.orbit_computer,
            record.issuer,
            record.fingerprint,
            stations,
            record.discovery_station,
            record.first_confirming_station,
            format_instant(&Utc::now()),
        ],
    )?;
    Ok(())
}

struct RawBulletin {
    id: String,
    title: String,
    url: String,
    published_at: String,
    bulletin_type: String,
    object_type: Option<String>,
    low_confidence: i64,
    orbit_computer: Option<String>,
    issuer: Option<String>,
    fingerprint: String,
    stations: String,
    discovery_station: Option<String>,
    first_confirming_station: Option<String>,
}

pub fn get(conn: &Connection, id: &str) -> StoreResult<Option<BulletinRecord>> {
    let raw = conn
        .query_row(
            "SELECT id, title, url, published_at, bulletin_type, object_type,
                    object_type_low_confidence, orbit_computer, issuer, fingerprint,
                    stations, discovery_station, first_confirming_station
             FROM bulletins
             WHERE id = ?1;",
            [id],
            |row| {
                Ok(RawBulletin {
                    id: row.get("id")?,
                    title: row.get("title")?,
                    url: row.get("url")?,
                    published_at: row.get("published_at")?,
                    bulletin_type: row.get("bulletin_type")?,
                    object_type: row.get("object_type")?,
                    low_confidence: row.get("object_type_low_confidence")?,
                    orbit_computer: row.get("orbit_computer")?,
                    issuer: row.get("issuer")?,
                    fingerprint: row.get("fingerprint")?,
                    stations: row.get("stations")?,
                    discovery_station: row.get("discovery_station")?,
                    first_confirming_station: row.get("first_confirming_station")?,
                })
            },
        )
        .optional()?;

    let Some(raw) = raw else {
        return Ok(None);
    };

    let object_class = match raw.object_type.as_deref() {
        Some(label) => Some(ObjectClass {
            kind: parse_label(label)?,
            low_confidence: bool_flag(raw.low_confidence),
        }),
        None => None,
    };
    let stations: Vec<String> =
        serde_json::from_str(&raw.stations).map_err(|e| StoreError::InvalidData(e.to_string()))?;

    Ok(Some(BulletinRecord {
        id: raw.id,
        title: raw.title,
        url: raw.url,
        published_at: parse_instant(&raw.published_at)?,
        bulletin_type: parse_label(&raw.bulletin_type)?,
        object_class,
        orbit_computer: raw.orbit_computer,
        issuer: raw.issuer,
        fingerprint: raw.fingerprint,
        stations,
        discovery_station: raw.discovery_station,
        first_confirming_station: raw.first_confirming_station,
    }))
}

/// Bulletin ids where `code` is the discovery / first confirming station.
pub fn credited_to(conn: &Connection, code: &str) -> StoreResult<(Vec<String>, Vec<String>)> {
    let mut discoveries = Vec::new();
    let mut confirmations = Vec::new();

    let mut stmt = conn.prepare(
        "SELECT id, discovery_station, first_confirming_station
         FROM bulletins
         WHERE discovery_station = ?1 OR first_confirming_station = ?1
         ORDER BY id;",
    )?;
    let rows = stmt.query_map([code], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Option<String>>(1)?,
            row.get::<_, Option<String>>(2)?,
        ))
    })?;

    for row in rows {
        let (id, discovery, confirming) = row?;
        if discovery.as_deref() == Some(code) {
            discoveries.push(id.clone());
        }
        if confirming.as_deref() == Some(code) {
            confirmations.push(id);
        }
    }

    Ok((discoveries, confirmations))
}
