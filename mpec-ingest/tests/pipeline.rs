mod common;

use common::{context, discovery_page, dou_page, obs_line, orbit_update_page, ScriptedSource};
use mpec_common::{BulletinSequence, BulletinType, HalfMonth, ObjectType, RelationType};
use mpec_ingest::module::observatory::ObservatoryDirectory;
use mpec_ingest::module::pipeline::{IngestOutcome, IngestReport, SkipReason, YearMonth};
use mpec_ingest::module::stats::run_aggregation;
use mpec_ingest::module::store::BulletinStore;

const JANUARY: YearMonth = YearMonth { year: 2024, month: 1 };

fn sequence(id: &str) -> BulletinSequence {
    BulletinSequence::from_bulletin_id(id).unwrap()
}

fn table_counts(store: &BulletinStore) -> Vec<u64> {
    let mut tables = vec![
        "bulletins".to_string(),
        "objects".to_string(),
        "cross_references".to_string(),
    ];
    tables.extend(store.list_station_codes().unwrap().iter().map(|c| format!("station_{c}")));
    tables.iter().map(|t| store.count_rows(t).unwrap()).collect()
}

#[tokio::test]
async fn test_month_walk_stops_at_end_of_sequence() {
    let source = ScriptedSource::new();
    source.set_page("MPEC 2024-A1", discovery_page("MPEC 2024-A1"));
    source.set_page("MPEC 2024-A2", dou_page("MPEC 2024-A2"));
    source.set_page("MPEC 2024-B1", orbit_update_page("MPEC 2024-B1"));

    let mut ctx = context(&source);
    let report = ctx.ingest_month(JANUARY).await.unwrap();

    assert_eq!(report.stored, 3);
    assert_eq!(report.skipped, 0);
    assert_eq!(
        source.calls(),
        vec!["MPEC 2024-A1", "MPEC 2024-A2", "MPEC 2024-A3", "MPEC 2024-B1", "MPEC 2024-B2"]
    );

    let store = ctx.store();
    let discovery = store.get_bulletin("MPEC 2024-A1").unwrap().unwrap();
    assert_eq!(discovery.bulletin_type, BulletinType::Discovery);
    assert_eq!(discovery.stations, vec!["G96", "F51", "703"]);
    assert_eq!(discovery.discovery_station.as_deref(), Some("F51"));
    assert_eq!(discovery.first_confirming_station.as_deref(), Some("703"));
    assert_eq!(discovery.issuer.as_deref(), Some("Gareth V. Williams"));

    let class = discovery.object_class.unwrap();
    assert_eq!(class.kind, ObjectType::NeaMid);
    assert!(!class.low_confidence);

    let dou = store.get_bulletin("MPEC 2024-A2").unwrap().unwrap();
    assert_eq!(dou.bulletin_type, BulletinType::Dou);
    assert_eq!(dou.object_class, None);
}

#[tokio::test]
async fn test_reingesting_writes_nothing() {
    let source = ScriptedSource::new();
    source.set_page("MPEC 2024-A1", discovery_page("MPEC 2024-A1"));
    source.set_page("MPEC 2024-A2", dou_page("MPEC 2024-A2"));

    let mut ctx = context(&source);
    ctx.ingest_month(JANUARY).await.unwrap();
    let before = table_counts(ctx.store());

    let report = ctx.ingest_month(JANUARY).await.unwrap();
    assert_eq!(report.stored, 0);
    assert_eq!(report.unchanged, 2);
    assert_eq!(table_counts(ctx.store()), before);
}

#[tokio::test]
async fn test_changed_bulletin_replaces_previous_rows() {
    let source = ScriptedSource::new();
    source.set_page("MPEC 2024-A1", discovery_page("MPEC 2024-A1"));

    let mut ctx = context(&source);
    let first = ctx.ingest_one(&sequence("MPEC 2024-A1")).await;
    assert!(matches!(first, IngestOutcome::Stored(ref s) if !s.superseded && s.observations == 3));

    // Revised page without the 703 line
    let revised = discovery_page("MPEC 2024-A1").replace(&obs_line("K24A00B", false, ".30", "20.5", "703"), "");
    source.set_page("MPEC 2024-A1", revised);

    let second = ctx.ingest_one(&sequence("MPEC 2024-A1")).await;
    assert!(matches!(second, IngestOutcome::Stored(ref s) if s.superseded && s.observations == 2));

    let store = ctx.store();
    assert_eq!(store.count_rows("bulletins").unwrap(), 1);
    assert_eq!(store.count_rows("station_G96").unwrap(), 1);
    assert!(store.station_observations("703").unwrap().is_empty());

    let record = store.get_bulletin("MPEC 2024-A1").unwrap().unwrap();
    assert_eq!(record.stations, vec!["G96", "F51"]);
    assert_eq!(record.first_confirming_station, None);
}

#[tokio::test]
async fn test_later_bulletin_overwrites_object_registry() {
    let source = ScriptedSource::new();
    source.set_page("MPEC 2024-A1", discovery_page("MPEC 2024-A1"));
    source.set_page("MPEC 2024-A2", orbit_update_page("MPEC 2024-A2"));

    let mut ctx = context(&source);
    ctx.ingest_one(&sequence("MPEC 2024-A1")).await;
    assert!(ctx.store().get_object("K24A00B").unwrap().unwrap().has_discovery_flag);

    ctx.ingest_one(&sequence("MPEC 2024-A2")).await;
    let object = ctx.store().get_object("K24A00B").unwrap().unwrap();
    assert!(!object.has_discovery_flag);
    assert_eq!(object.magnitude, Some(20.9));
}

#[tokio::test]
async fn test_station_observations_carry_details() {
    let source = ScriptedSource::new();
    source.set_page("MPEC 2024-A1", discovery_page("MPEC 2024-A1"));

    let mut ctx = context(&source);
    ctx.ingest_one(&sequence("MPEC 2024-A1")).await;

    let g96 = ctx.store().station_observations("G96").unwrap();
    // Two G96 lines of the same object collapse onto one row
    assert_eq!(g96.len(), 1);
    assert_eq!(g96[0].observer, "D. C. Fuls");
    assert_eq!(g96[0].measurer, "D. C. Fuls");
    assert_eq!(g96[0].facility, "1.5-m reflector + 10K CCD");
    assert_eq!(g96[0].object_type, Some(ObjectType::NeaMid));

    let f51 = ctx.store().station_observations("F51").unwrap();
    assert!(f51[0].is_discovery);
    assert_eq!(f51[0].measurer, "M. Micheli");

    let (discoveries, confirmations) = ctx.store().station_credits("F51").unwrap();
    assert_eq!(discoveries, vec!["MPEC 2024-A1"]);
    assert!(confirmations.is_empty());
    let (_, confirmations) = ctx.store().station_credits("703").unwrap();
    assert_eq!(confirmations, vec!["MPEC 2024-A1"]);
}

#[tokio::test]
async fn test_daily_orbit_update_cross_references() {
    let source = ScriptedSource::new();
    source.set_page("MPEC 2024-A2", dou_page("MPEC 2024-A2"));

    let mut ctx = context(&source);
    ctx.ingest_one(&sequence("MPEC 2024-A2")).await;

    let rows = ctx.store().cross_references_for("MPEC 2024-A2").unwrap();
    assert_eq!(rows.len(), 4);
    for row in &rows {
        assert!(rows.iter().any(|other| other.from_designation == row.to_designation
            && other.to_designation == row.from_designation
            && other.relation == row.relation));
    }
    assert!(rows.iter().any(|r| r.relation == RelationType::Identification && r.author == "Smith"));
    assert!(rows.iter().any(|r| r.relation == RelationType::Double && r.author == "Jones"));
}

#[tokio::test]
async fn test_consecutive_fetch_failures_end_half_month() {
    let source = ScriptedSource::new();
    source.set_page("MPEC 2024-A1", discovery_page("MPEC 2024-A1"));
    source.set_failure("MPEC 2024-A2");
    source.set_failure("MPEC 2024-A3");
    source.set_failure("MPEC 2024-A4");
    source.set_page("MPEC 2024-A5", dou_page("MPEC 2024-A5"));

    let mut ctx = context(&source);
    let mut report = IngestReport::default();
    ctx.ingest_half_month(HalfMonth::new(2024, 'A').unwrap(), &mut report).await;

    assert_eq!(report.stored, 1);
    assert_eq!(report.skipped, 3);
    assert!(!source.calls().contains(&"MPEC 2024-A5".to_string()));
}

#[tokio::test]
async fn test_single_fetch_failure_does_not_stop_walk() {
    let source = ScriptedSource::new();
    source.set_failure("MPEC 2024-A1");
    source.set_page("MPEC 2024-A2", dou_page("MPEC 2024-A2"));

    let mut ctx = context(&source);
    let outcome = ctx.ingest_one(&sequence("MPEC 2024-A1")).await;
    assert_eq!(outcome, IngestOutcome::Skipped(SkipReason::Transient));

    let report = ctx.ingest_month(JANUARY).await.unwrap();
    assert_eq!(report.stored, 1);
    assert_eq!(report.skipped, 1);
}

#[tokio::test]
async fn test_malformed_bulletin_is_skipped() {
    let source = ScriptedSource::new();
    source.set_page(
        "MPEC 2024-A1",
        "MPEC 2024-A1 : 2024 AB\nObserver details:\nG96 Mt. Lemmon Survey.\n".to_string(),
    );
    source.set_page("MPEC 2024-A2", dou_page("MPEC 2024-A2"));

    let mut ctx = context(&source);
    let report = ctx.ingest_month(JANUARY).await.unwrap();

    assert_eq!(report.skipped, 1);
    assert_eq!(report.stored, 1);
    assert!(ctx.store().get_bulletin("MPEC 2024-A1").unwrap().is_none());
}

#[tokio::test]
async fn test_odd_width_lines_inside_block_are_ignored() {
    let source = ScriptedSource::new();
    let page = discovery_page("MPEC 2024-A1").replace(
        "Observations:\n",
        "Observations:\n     K24A00B  short line G96\n",
    );
    source.set_page("MPEC 2024-A1", page);

    let mut ctx = context(&source);
    let outcome = ctx.ingest_one(&sequence("MPEC 2024-A1")).await;
    assert!(matches!(outcome, IngestOutcome::Stored(ref s) if s.observations == 3));
}

#[tokio::test]
async fn test_missing_issue_date_uses_half_month_start() {
    let source = ScriptedSource::new();
    let page = dou_page("MPEC 2024-B3").replace("Issued 2024 Jan. 5, 23:00 UT\n", "");
    source.set_page("MPEC 2024-B3", page);

    let mut ctx = context(&source);
    ctx.ingest_one(&sequence("MPEC 2024-B3")).await;

    let record = ctx.store().get_bulletin("MPEC 2024-B3").unwrap().unwrap();
    assert_eq!(record.published_at.to_rfc3339(), "2024-01-16T00:00:00+00:00");
}

#[tokio::test]
async fn test_aggregation_reports_only_changed_stations() {
    let source = ScriptedSource::new();
    source.set_page("MPEC 2024-A1", discovery_page("MPEC 2024-A1"));

    let mut ctx = context(&source);
    ctx.ingest_month(JANUARY).await.unwrap();

    let out = tempfile::tempdir().unwrap();
    let observatories = ObservatoryDirectory::from_json(r#"{"G96": {"name": "Mt. Lemmon Survey"}}"#).unwrap();

    let first = run_aggregation(ctx.store(), &observatories, Some(out.path())).unwrap();
    assert_eq!(first.units, 3);
    assert_eq!(first.changed.len(), 3);
    assert!(out.path().join("station_G96.json").exists());

    let second = run_aggregation(ctx.store(), &observatories, Some(out.path())).unwrap();
    assert!(second.changed.is_empty());
    assert_eq!(second.unchanged, 3);

    // A new observation at G96 changes only G96
    source.set_page("MPEC 2024-A2", orbit_update_page("MPEC 2024-A2").replace("I41", "G96"));
    ctx.ingest_month(JANUARY).await.unwrap();

    let third = run_aggregation(ctx.store(), &observatories, Some(out.path())).unwrap();
    assert_eq!(third.changed, vec!["station_G96"]);
}

#[tokio::test]
async fn test_failed_aggregate_write_is_retried() {
    let source = ScriptedSource::new();
    source.set_page("MPEC 2024-A1", discovery_page("MPEC 2024-A1"));

    let mut ctx = context(&source);
    ctx.ingest_month(JANUARY).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let blocked = dir.path().join("not-a-directory");
    std::fs::write(&blocked, "x").unwrap();
    let observatories = ObservatoryDirectory::default();

    let first = run_aggregation(ctx.store(), &observatories, Some(blocked.as_path())).unwrap();
    assert_eq!(first.failed, 3);
    assert!(first.changed.is_empty());

    let out = dir.path().join("stations");
    let second = run_aggregation(ctx.store(), &observatories, Some(out.as_path())).unwrap();
    assert_eq!(second.failed, 0);
    assert_eq!(second.changed.len(), 3);
    assert!(out.join("station_G96.json").exists());
}
