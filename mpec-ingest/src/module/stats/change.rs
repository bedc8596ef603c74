///! Change detection over station aggregates
///!
///! Each station aggregate is hashed (SHA-256 of its canonical JSON) and
///! compared with the hash stored at the previous run. Changed aggregates are
///! written to the output directory so downstream rendering only redoes those.

use anyhow::Context;
use chrono::{DateTime, Utc};
use mpec_common::ChangeTrackingRecord;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use std::time::Instant;

use super::aggregate::StationAggregate;
use crate::module::observatory::ObservatoryDirectory;
use crate::module::store::BulletinStore;
use crate::module::store::station_repo::TABLE_PREFIX;

/// Change-tracking id of a station aggregate, e.g. `station_G96`.
pub fn unit_id(code: &str) -> String {
    format!("{TABLE_PREFIX}{code}")
}

pub fn content_hash<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let canonical = serde_json::to_vec(value)?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

/// Whether `hash` differs from the stored one. Nothing is written.
pub fn has_changed(store: &BulletinStore, unit: &str, hash: &str) -> anyhow::Result<bool> {
    let previous = store.get_tracking(unit)?;
    Ok(previous.is_none_or(|p| p.content_hash != hash))
}

/// Persist the state of one unit once its output is in place.
pub fn track(
    store: &BulletinStore,
    unit: &str,
    hash: String,
    changed: bool,
    now: DateTime<Utc>,
) -> anyhow::Result<ChangeTrackingRecord> {
    let record = ChangeTrackingRecord {
        unit_id: unit.to_string(),
        last_run_at: now,
        content_hash: hash,
        changed,
    };
    store.put_tracking(&record)?;
    Ok(record)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationReport {
    pub units: usize,
    pub changed: Vec<String>,
    pub unchanged: usize,
    pub failed: usize,
    pub duration_seconds: f64,
}

fn aggregate_station(
    store: &BulletinStore,
    observatories: &ObservatoryDirectory,
    code: &str,
) -> anyhow::Result<StationAggregate> {
    let observations = store.station_observations(code)?;
    let (discoveries, confirmations) = store.station_credits(code)?;
    Ok(StationAggregate::build(
        code,
        observatories.name(code),
        &observations,
        discoveries,
        confirmations,
    ))
}

fn write_aggregate(out_dir: &Path, unit: &str, aggregate: &StationAggregate) -> anyhow::Result<()> {
    fs::create_dir_all(out_dir).with_context(|| format!("failed to create {}", out_dir.display()))?;
    let path = out_dir.join(format!("{unit}.json"));
    let json = serde_json::to_string_pretty(aggregate)?;
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Aggregate every station, track changes and write the changed aggregates.
///
/// A station that fails is logged and counted; the pass continues.
pub fn run_aggregation(
    store: &BulletinStore,
    observatories: &ObservatoryDirectory,
    out_dir: Option<&Path>,
) -> anyhow::Result<AggregationReport> {
    let started_at = Instant::now();
    let now = Utc::now();
    let mut report = AggregationReport::default();

    for code in store.list_station_codes()? {
        let unit = unit_id(&code);
        report.units += 1;

        let result = aggregate_station(store, observatories, &code).and_then(|aggregate| {
            let hash = content_hash(&aggregate)?;
            let changed = has_changed(store, &unit, &hash)?;
            // Hash is recorded only after the file is written
            if changed {
                if let Some(dir) = out_dir {
                    write_aggregate(dir, &unit, &aggregate)?;
                }
            }
            track(store, &unit, hash, changed, now)?;
            Ok(changed)
        });

        match result {
            Ok(true) => report.changed.push(unit),
            Ok(false) => report.unchanged += 1,
            Err(e) => {
                tracing::error!(unit = %unit, function = "run_aggregation", "Aggregation failed: {:#}", e);
                report.failed += 1;
            }
        }
    }

    report.duration_seconds = started_at.elapsed().as_secs_f64();
    tracing::info!(
        "Aggregation completed: {} stations, {} changed, {} unchanged, {} failed, {:.2}s",
        report.units,
        report.changed.len(),
        report.unchanged,
        report.failed,
        report.duration_seconds
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable() {
        let aggregate = StationAggregate::build("G96", Some("Mt. Lemmon Survey"), &[], vec![], vec![]);
        let first = content_hash(&aggregate).unwrap();
        assert_eq!(first, content_hash(&aggregate.clone()).unwrap());
        assert_eq!(first.len(), 64);

        let other = StationAggregate::build("G96", None, &[], vec![], vec![]);
        assert_ne!(first, content_hash(&other).unwrap());
    }

    #[test]
    fn test_track_flags_changes() {
        let store = BulletinStore::open_in_memory().unwrap();
        let now = Utc::now();

        assert!(has_changed(&store, "station_G96", "aaa").unwrap());
        track(&store, "station_G96", "aaa".to_string(), true, now).unwrap();
        assert!(!has_changed(&store, "station_G96", "aaa").unwrap());
        assert!(has_changed(&store, "station_G96", "bbb").unwrap());

        // Checking does not record anything
        assert_eq!(store.get_tracking("station_G96").unwrap().unwrap().content_hash, "aaa");

        track(&store, "station_G96", "bbb".to_string(), true, now).unwrap();
        let stored = store.get_tracking("station_G96").unwrap().unwrap();
        assert_eq!(stored.content_hash, "bbb");
        assert!(stored.changed);
    }
}
