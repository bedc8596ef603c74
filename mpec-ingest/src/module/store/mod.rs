///! SQLite persistence
///!
///! `BulletinStore` owns the connection for one run. Every bulletin is written
///! in a single transaction: the previous version (if any) is deleted, then
///! the bulletin, its station rows, object registry updates and cross
///! references are inserted. Row conflicts are logged and skipped.

pub mod bulletin_repo;
pub mod migrations;
pub mod object_repo;
mod open;
pub mod station_repo;
pub mod tracking_repo;
pub mod xref_repo;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use mpec_common::{BulletinRecord, ChangeTrackingRecord, CrossReference, ObjectRecord, Observation, UnknownLabel};
use rusqlite::{Connection, TransactionBehavior};
use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;

use crate::error::{StoreError, StoreResult};

const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const FIXED_TABLES: [&str; 5] = ["bulletins", "objects", "cross_references", "change_tracking", "station_tables"];

pub(crate) fn format_instant(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn parse_instant(value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidData(format!("bad timestamp '{value}': {e}")))
}

pub(crate) fn format_naive(value: &NaiveDateTime) -> String {
    value.format(NAIVE_FORMAT).to_string()
}

pub(crate) fn parse_naive(value: &str) -> StoreResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, NAIVE_FORMAT)
        .map_err(|e| StoreError::InvalidData(format!("bad timestamp '{value}': {e}")))
}

pub(crate) fn parse_label<T: FromStr<Err = UnknownLabel>>(value: &str) -> StoreResult<T> {
    value.parse().map_err(|e: UnknownLabel| StoreError::InvalidData(e.to_string()))
}

pub(crate) fn char_column(value: Option<char>) -> Option<String> {
    value.map(String::from)
}

pub(crate) fn parse_char(value: Option<String>) -> Option<char> {
    value.and_then(|v| v.chars().next())
}

pub(crate) fn bool_flag(value: i64) -> bool {
    value != 0
}

/// Everything written for one bulletin.
#[derive(Debug, Clone, PartialEq)]
pub struct BulletinBatch {
    pub record: BulletinRecord,
    /// One per (object, station), already collapsed
    pub observations: Vec<Observation>,
    /// One per observation line, in source order
    pub objects: Vec<ObjectRecord>,
    pub cross_references: Vec<CrossReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveSummary {
    /// A previous version of the bulletin was replaced
    pub superseded: bool,
    pub new_stations: usize,
    pub observations: usize,
    pub objects: usize,
    pub cross_references: usize,
    pub conflicts: usize,
}

pub struct BulletinStore {
    conn: Connection,
}

impl BulletinStore {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self {
            conn: open::open_connection(path.as_ref())?,
        })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self {
            conn: open::open_in_memory()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Replace whatever is stored for `batch.record.id` with `batch`, atomically.
    pub fn save_bulletin(&mut self, batch: &BulletinBatch) -> StoreResult<SaveSummary> {
        let bulletin = batch.record.id.as_str();
        let mut summary = SaveSummary::default();

        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        summary.superseded = bulletin_repo::delete(&tx, bulletin)?;
        bulletin_repo::insert(&tx, &batch.record)?;

        let codes: BTreeSet<&str> = batch.observations.iter().map(|o| o.station_code.as_str()).collect();
        for code in codes {
            if station_repo::ensure_table(&tx, code)? {
                summary.new_stations += 1;
            }
        }

        for obs in &batch.observations {
            match station_repo::insert_observation(&tx, obs) {
                Ok(()) => summary.observations += 1,
                Err(e) if e.is_conflict() => {
                    tracing::error!(
                        bulletin = bulletin,
                        station = %obs.station_code,
                        object = %obs.object_id,
                        function = "save_bulletin",
                        "Skipping conflicting observation row: {}",
                        e
                    );
                    summary.conflicts += 1;
                }
                Err(e) => return Err(e),
            }
        }

        for object in &batch.objects {
            object_repo::upsert(&tx, object)?;
            summary.objects += 1;
        }

        for xref in &batch.cross_references {
            match xref_repo::insert(&tx, xref) {
                Ok(()) => summary.cross_references += 1,
                Err(e) if e.is_conflict() => {
                    tracing::error!(
                        bulletin = bulletin,
                        from = %xref.from_designation,
                        to = %xref.to_designation,
                        function = "save_bulletin",
                        "Skipping conflicting cross reference: {}",
                        e
                    );
                    summary.conflicts += 1;
                }
                Err(e) => return Err(e),
            }
        }

        tx.commit()?;
        Ok(summary)
    }

    pub fn bulletin_fingerprint(&self, id: &str) -> StoreResult<Option<String>> {
        bulletin_repo::fingerprint(&self.conn, id)
    }

    pub fn get_bulletin(&self, id: &str) -> StoreResult<Option<BulletinRecord>> {
        bulletin_repo::get(&self.conn, id)
    }

    pub fn get_object(&self, object_id: &str) -> StoreResult<Option<ObjectRecord>> {
        object_repo::get(&self.conn, object_id)
    }

    pub fn list_station_codes(&self) -> StoreResult<Vec<String>> {
        station_repo::registered_codes(&self.conn)
    }

    pub fn station_observations(&self, code: &str) -> StoreResult<Vec<Observation>> {
        station_repo::observations(&self.conn, code)
    }

    /// Bulletin ids crediting `code` with (discovery, first confirmation).
    pub fn station_credits(&self, code: &str) -> StoreResult<(Vec<String>, Vec<String>)> {
        bulletin_repo::credited_to(&self.conn, code)
    }

    pub fn cross_references_for(&self, bulletin_id: &str) -> StoreResult<Vec<CrossReference>> {
        xref_repo::for_bulletin(&self.conn, bulletin_id)
    }

    pub fn get_tracking(&self, unit_id: &str) -> StoreResult<Option<ChangeTrackingRecord>> {
        tracking_repo::get(&self.conn, unit_id)
    }

    pub fn put_tracking(&self, record: &ChangeTrackingRecord) -> StoreResult<()> {
        tracking_repo::put(&self.conn, record)
    }

    /// Row count of a schema table or a station table.
    pub fn count_rows(&self, table: &str) -> StoreResult<u64> {
        if !FIXED_TABLES.contains(&table) {
            let code = table
                .strip_prefix(station_repo::TABLE_PREFIX)
                .ok_or_else(|| StoreError::InvalidData(format!("unknown table '{table}'")))?;
            station_repo::validate_code(code)?;
            if !station_repo::is_registered(&self.conn, code)? {
                return Ok(0);
            }
        }

        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM \"{table}\";"), [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
