///! Observation block parser
///!
///! Locates the fixed-width observation table of a bulletin and turns each
///! well-formed line into an [`ObservationLine`]. Malformed lines are skipped
///! silently; only a missing or inconsistent block boundary is an error.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use mpec_common::{BulletinType, Observation, ObjectType};
use std::collections::HashMap;

use super::columns::{FixedWidthRecord, LINE_WIDTH, obs80, record_width};
use super::observer_details::{ObserverDetails, parse_observer_details};
use crate::error::PageParseError;

/// Block headers, in order of preference.
pub const OBSERVATION_HEADERS: [&str; 4] = [
    "Observations:",
    "Additional observations:",
    "Corrected observations:",
    "New observations:",
];

pub const OBSERVER_DETAILS_HEADER: &str = "Observer details:";

/// Signature line closing a bulletin; it can be exactly 80 columns wide.
const SIGNATURE_MARKER: &str = "(C) Copyright";

/// One parsed observation line
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationLine {
    pub object_id: String,
    pub is_discovery: bool,
    pub note1: Option<char>,
    pub note2: Option<char>,
    pub observed_at: NaiveDateTime,
    /// No time of day on the line; midnight assumed
    pub time_degraded: bool,
    pub magnitude: Option<f64>,
    pub band: Option<char>,
    pub catalog_code: Option<char>,
    pub station_code: String,
}

/// Line range of the observation table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationBlock {
    /// Index of the header line
    pub header: usize,
    /// First index after the header
    pub start: usize,
    /// Exclusive end index
    pub end: usize,
    /// Index of the "Observer details:" line, when present
    pub details: Option<usize>,
}

/// Everything read from one bulletin's observation block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedObservations {
    pub lines: Vec<ObservationLine>,
    pub details: HashMap<String, ObserverDetails>,
    /// Station codes in order of first appearance
    pub stations: Vec<String>,
    pub discovery_station: Option<String>,
    pub first_confirming_station: Option<String>,
}

/// Convert a fraction of a day (".12345") to a time of day, rounding to the second.
pub fn day_fraction_to_time(fraction: &str) -> Option<NaiveTime> {
    let fraction = fraction.trim();
    let value: f64 = if fraction.starts_with('.') {
        format!("0{}", fraction).parse().ok()?
    } else {
        fraction.parse().ok()?
    };
    if !(0.0..1.0).contains(&value) {
        return None;
    }

    let seconds = ((value * 86_400.0).round() as u32).min(86_399);
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)
}

/// Parse one observation line; `None` means the line is skipped.
pub fn parse_line(line: &str) -> Option<ObservationLine> {
    let record = FixedWidthRecord::new(line, LINE_WIDTH)?;

    let note2 = record.flag(&obs80::NOTE2);
    if note2.is_some_and(|n| obs80::CONTINUATION_NOTES.contains(&n)) {
        return None;
    }

    let object_id = record.text(&obs80::OBJECT_ID)?.to_string();
    let station_code = record.text(&obs80::STATION)?;
    if station_code.len() != 3 || !station_code.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }

    let date = NaiveDate::parse_from_str(record.raw(&obs80::DATE), "%Y %m %d").ok()?;
    let (time, time_degraded) = match record.text(&obs80::TIME) {
        Some(fraction) => (day_fraction_to_time(fraction)?, false),
        None => (NaiveTime::MIN, true),
    };

    Some(ObservationLine {
        object_id,
        is_discovery: record.flag(&obs80::DISCOVERY) == Some(obs80::DISCOVERY_MARK),
        note1: record.flag(&obs80::NOTE1),
        note2,
        observed_at: date.and_time(time),
        time_degraded,
        magnitude: record.decimal(&obs80::MAGNITUDE),
        band: record.flag(&obs80::BAND),
        catalog_code: record.flag(&obs80::CATALOG),
        station_code: station_code.to_string(),
    })
}

/// True when a well-formed line of the observation block carries the discovery marker.
///
/// Lines outside the block are not looked at, same as [`parse_observations`].
pub fn has_discovery_marker(lines: &[&str]) -> bool {
    let Ok(Some(block)) = locate_block("", lines) else {
        return false;
    };
    lines[block.start..block.end]
        .iter()
        .filter_map(|line| parse_line(line))
        .any(|obs| obs.is_discovery)
}

fn find_line(lines: &[&str], header: &str) -> Option<usize> {
    lines.iter().position(|line| line.trim() == header)
}

/// Find the observation table. `Ok(None)` when the bulletin has none.
pub fn locate_block(bulletin: &str, lines: &[&str]) -> Result<Option<ObservationBlock>, PageParseError> {
    let details = find_line(lines, OBSERVER_DETAILS_HEADER);
    let header = OBSERVATION_HEADERS.iter().find_map(|h| find_line(lines, h));

    let Some(header) = header else {
        return match details {
            Some(index) => Err(PageParseError::at_line(
                bulletin,
                index,
                lines[index],
                "observer details present but no observation header",
            )),
            None => Ok(None),
        };
    };
    let start = header + 1;

    if let Some(index) = details {
        if index < header {
            return Err(PageParseError::at_line(
                bulletin,
                index,
                lines[index],
                "observer details precede the observation block",
            ));
        }
        return Ok(Some(ObservationBlock {
            header,
            start,
            end: index,
            details,
        }));
    }

    // No details section: the block ends at the first line that is not 80 columns wide
    let mut end = start;
    while end < lines.len() && lines[end].trim().is_empty() {
        end += 1;
    }
    while end < lines.len()
        && record_width(lines[end]) == LINE_WIDTH
        && !lines[end].contains(SIGNATURE_MARKER)
    {
        end += 1;
    }

    Ok(Some(ObservationBlock {
        header,
        start,
        end,
        details: None,
    }))
}

/// Parse the observation table and the observer details of one bulletin.
pub fn parse_observations(bulletin: &str, lines: &[&str]) -> Result<ParsedObservations, PageParseError> {
    let Some(block) = locate_block(bulletin, lines)? else {
        return Ok(ParsedObservations::default());
    };

    let parsed: Vec<ObservationLine> = lines[block.start..block.end]
        .iter()
        .filter_map(|line| parse_line(line))
        .collect();

    let mut stations: Vec<String> = Vec::new();
    for obs in &parsed {
        if !stations.contains(&obs.station_code) {
            stations.push(obs.station_code.clone());
        }
    }

    let discovery_station = parsed
        .iter()
        .find(|obs| obs.is_discovery)
        .map(|obs| obs.station_code.clone());
    let first_confirming_station = discovery_station.as_ref().and_then(|code| {
        let position = stations.iter().position(|s| s == code)?;
        stations.get(position + 1).cloned()
    });

    let details = match block.details {
        Some(index) => parse_observer_details(lines, index + 1, &stations),
        None => HashMap::new(),
    };

    tracing::debug!(
        "{}: {} observation lines from {} stations",
        bulletin,
        parsed.len(),
        stations.len()
    );

    Ok(ParsedObservations {
        lines: parsed,
        details,
        stations,
        discovery_station,
        first_confirming_station,
    })
}

impl ParsedObservations {
    /// One observation per (object, station), in source order.
    ///
    /// Repeated lines collapse onto the first one; the discovery flag is kept
    /// if any collapsed line carried it.
    pub fn to_observations(
        &self,
        bulletin_id: &str,
        bulletin_type: BulletinType,
        object_type: Option<ObjectType>,
    ) -> Vec<Observation> {
        let mut out: Vec<Observation> = Vec::new();
        let mut index: HashMap<(&str, &str), usize> = HashMap::new();

        for line in &self.lines {
            let key = (line.object_id.as_str(), line.station_code.as_str());
            if let Some(&i) = index.get(&key) {
                out[i].is_discovery |= line.is_discovery;
                continue;
            }

            let details = self.details.get(&line.station_code).cloned().unwrap_or_default();
            index.insert(key, out.len());
            out.push(Observation {
                object_id: line.object_id.clone(),
                observed_at: line.observed_at,
                time_degraded: line.time_degraded,
                observer: details.observer,
                measurer: details.measurer,
                facility: details.facility,
                station_code: line.station_code.clone(),
                bulletin_id: bulletin_id.to_string(),
                bulletin_type,
                object_type,
                is_discovery: line.is_discovery,
            });
        }

        out
    }
}
