///! Ingestion pipeline
///!
///! `IngestContext` carries everything one run needs (bulletin source, store,
///! PHA list, fetch settings) through fetch, fingerprint check, classify,
///! parse and persist. Bulletins are walked in publication order so the
///! object registry ends up holding the latest observation of each object.

use chrono::{DateTime, TimeZone, Utc};
use mpec_common::{BulletinRecord, BulletinSequence, HalfMonth, ObjectRecord};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::config::FetchConfig;
use crate::error::{FetchError, IngestError, PageParseError};
use crate::module::bulletin::{BulletinPage, BulletinSource, FetchedBulletin};
use crate::module::classify::{PhaList, classify_bulletin, classify_object};
use crate::module::observation::parse_observations;
use crate::module::store::{BulletinBatch, BulletinStore, SaveSummary};
use crate::module::xref::extract_cross_references;
use mpec_common::BulletinType;

/// Calendar month given on the command line as `YYYYMM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("expected YYYYMM, got '{s}'"));
        }
        let year: i32 = s[..4].parse().map_err(|_| format!("invalid year in '{s}'"))?;
        let month: u32 = s[4..].parse().map_err(|_| format!("invalid month in '{s}'"))?;
        if !(1..=12).contains(&month) {
            return Err(format!("month must be 01-12, got '{}'", &s[4..]));
        }
        Ok(Self { year, month })
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Transient,
    Parse,
    Store,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Stored(SaveSummary),
    /// Same fingerprint as the stored copy; nothing was parsed or written
    Unchanged,
    EndOfSequence,
    Skipped(SkipReason),
}

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub stored: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub observations: usize,
    pub cross_references: usize,
    pub conflicts: usize,
    pub new_stations: usize,
    pub duration_seconds: f64,
}

impl IngestReport {
    pub fn record(&mut self, outcome: &IngestOutcome) {
        match outcome {
            IngestOutcome::Stored(summary) => {
                self.stored += 1;
                self.observations += summary.observations;
                self.cross_references += summary.cross_references;
                self.conflicts += summary.conflicts;
                self.new_stations += summary.new_stations;
            }
            IngestOutcome::Unchanged => self.unchanged += 1,
            IngestOutcome::Skipped(_) => self.skipped += 1,
            IngestOutcome::EndOfSequence => {}
        }
    }
}

/// Publication instant, falling back to the start of the half-month.
fn published_at(page: &BulletinPage, fetched: &FetchedBulletin) -> Result<DateTime<Utc>, PageParseError> {
    if let Some(issued) = page.published_at() {
        return Ok(issued);
    }

    let bulletin = fetched.bulletin_id();
    let fallback = fetched
        .sequence
        .period
        .start_date()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| PageParseError::new(&bulletin, "no issue date and no valid half-month start"))?;

    tracing::warn!("{}: no 'Issued' line, using {}", bulletin, fallback);
    Ok(fallback)
}

/// Classify and parse one page into the rows written for it. No I/O.
pub fn process_page(
    fetched: &FetchedBulletin,
    page: &BulletinPage,
    pha: &PhaList,
) -> Result<BulletinBatch, PageParseError> {
    let bulletin = fetched.bulletin_id();
    let lines = page.lines();

    let bulletin_type = classify_bulletin(page);
    let object_class = bulletin_type.has_object_type().then(|| classify_object(page, pha));
    let parsed = parse_observations(&bulletin, &lines)?;

    let observations = parsed.to_observations(&bulletin, bulletin_type, object_class.map(|c| c.kind));
    let objects = parsed
        .lines
        .iter()
        .map(|line| ObjectRecord {
            object_id: line.object_id.clone(),
            has_discovery_flag: line.is_discovery,
            note1: line.note1,
            note2: line.note2,
            last_observed_at: line.observed_at,
            magnitude: line.magnitude,
            band: line.band,
            star_catalog_code: line.catalog_code,
        })
        .collect();
    let cross_references = if bulletin_type == BulletinType::Dou {
        extract_cross_references(&bulletin, &lines)
    } else {
        Vec::new()
    };

    let record = BulletinRecord {
        id: bulletin.clone(),
        title: page.title.clone(),
        url: fetched.url.clone(),
        published_at: published_at(page, fetched)?,
        bulletin_type,
        object_class,
        orbit_computer: page.orbit_computer(),
        issuer: page.issuer(),
        fingerprint: fetched.fingerprint.clone(),
        stations: parsed.stations.clone(),
        discovery_station: parsed.discovery_station.clone(),
        first_confirming_station: parsed.first_confirming_station.clone(),
    };

    Ok(BulletinBatch {
        record,
        observations,
        objects,
        cross_references,
    })
}

pub struct IngestContext<S: BulletinSource> {
    source: S,
    store: BulletinStore,
    pha: PhaList,
    fetch: FetchConfig,
}

impl<S: BulletinSource> IngestContext<S> {
    pub fn new(source: S, store: BulletinStore, pha: PhaList, fetch: FetchConfig) -> Self {
        Self {
            source,
            store,
            pha,
            fetch,
        }
    }

    pub fn store(&self) -> &BulletinStore {
        &self.store
    }

    /// Release the source and hand back the store.
    pub fn into_store(self) -> BulletinStore {
        self.store
    }

    async fn try_ingest(&mut self, sequence: &BulletinSequence) -> Result<IngestOutcome, IngestError> {
        let fetched = self.source.fetch(sequence).await?;
        let bulletin = fetched.bulletin_id();

        if self.store.bulletin_fingerprint(&bulletin)?.as_deref() == Some(fetched.fingerprint.as_str()) {
            tracing::debug!("{} unchanged, skipping", bulletin);
            return Ok(IngestOutcome::Unchanged);
        }

        let page = BulletinPage::from_raw(&bulletin, &fetched.raw_text());
        let batch = process_page(&fetched, &page, &self.pha)?;
        let summary = self.store.save_bulletin(&batch)?;

        tracing::info!(
            "Stored {} ({}, {} observations, {} cross references{})",
            bulletin,
            batch.record.bulletin_type,
            summary.observations,
            summary.cross_references,
            if summary.superseded { ", replaced previous version" } else { "" }
        );
        Ok(IngestOutcome::Stored(summary))
    }

    /// Fetch, classify, parse and persist one bulletin. Failures are logged, never returned.
    pub async fn ingest_one(&mut self, sequence: &BulletinSequence) -> IngestOutcome {
        let bulletin = sequence.bulletin_id();

        match self.try_ingest(sequence).await {
            Ok(outcome) => outcome,
            Err(IngestError::Fetch(FetchError::EndOfSequence { .. })) => {
                tracing::debug!("{} not published, end of sequence", bulletin);
                IngestOutcome::EndOfSequence
            }
            Err(e) => {
                let (reason, line) = match &e {
                    IngestError::Fetch(_) => (SkipReason::Transient, None),
                    IngestError::Parse(parse) => (SkipReason::Parse, parse.line_number()),
                    IngestError::Store(_) => (SkipReason::Store, None),
                };
                tracing::error!(
                    bulletin = %bulletin,
                    line = line,
                    function = e.stage(),
                    "Skipping bulletin: {}",
                    e
                );
                IngestOutcome::Skipped(reason)
            }
        }
    }

    /// Walk one half-month from number 1 until the archive runs out.
    pub async fn ingest_half_month(&mut self, period: HalfMonth, report: &mut IngestReport) {
        let delay = Duration::from_millis(self.fetch.request_delay_ms);
        let mut consecutive_failures = 0;

        tracing::info!("Ingesting half-month {} {}", period.year, period.letter);

        for number in 1..=self.fetch.max_sequence {
            let Ok(sequence) = BulletinSequence::new(period, number) else {
                break;
            };

            let outcome = self.ingest_one(&sequence).await;
            report.record(&outcome);

            match outcome {
                IngestOutcome::EndOfSequence => break,
                IngestOutcome::Skipped(SkipReason::Transient) => {
                    consecutive_failures += 1;
                    if consecutive_failures >= self.fetch.max_consecutive_failures {
                        tracing::warn!(
                            "{} consecutive fetch failures, ending half-month {} {} at {}",
                            consecutive_failures,
                            period.year,
                            period.letter,
                            sequence.bulletin_id()
                        );
                        break;
                    }
                }
                _ => consecutive_failures = 0,
            }

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    /// Ingest both half-months of a calendar month.
    pub async fn ingest_month(&mut self, month: YearMonth) -> anyhow::Result<IngestReport> {
        let started_at = Instant::now();
        let mut report = IngestReport::default();

        for period in HalfMonth::of_month(month.year, month.month)? {
            self.ingest_half_month(period, &mut report).await;
        }

        report.duration_seconds = started_at.elapsed().as_secs_f64();
        tracing::info!(
            "Ingestion of {} completed: {} stored, {} unchanged, {} skipped, {} observations, {:.2}s",
            month,
            report.stored,
            report.unchanged,
            report.skipped,
            report.observations,
            report.duration_seconds
        );
        if report.conflicts > 0 {
            tracing::warn!("{} conflicting rows were skipped", report.conflicts);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_month() {
        assert_eq!("202401".parse::<YearMonth>(), Ok(YearMonth { year: 2024, month: 1 }));
        assert_eq!(YearMonth { year: 2024, month: 3 }.to_string(), "202403");
        assert!("202413".parse::<YearMonth>().is_err());
        assert!("202400".parse::<YearMonth>().is_err());
        assert!("2024-1".parse::<YearMonth>().is_err());
        assert!("20241".parse::<YearMonth>().is_err());
    }

    #[test]
    fn test_report_counts_outcomes() {
        let mut report = IngestReport::default();
        report.record(&IngestOutcome::Stored(SaveSummary {
            observations: 3,
            cross_references: 2,
            ..Default::default()
        }));
        report.record(&IngestOutcome::Unchanged);
        report.record(&IngestOutcome::Skipped(SkipReason::Parse));
        report.record(&IngestOutcome::EndOfSequence);

        assert_eq!(report.stored, 1);
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.observations, 3);
        assert_eq!(report.cross_references, 2);
    }
}
