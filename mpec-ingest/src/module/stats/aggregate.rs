///! Per-station aggregate
///!
///! Every map is a `BTreeMap` and every list is sorted, so serializing the
///! aggregate gives the same bytes for the same data.

use chrono::Datelike;
use mpec_common::Observation;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationAggregate {
    pub code: String,
    pub name: Option<String>,
    pub total_observations: usize,
    pub distinct_objects: usize,
    pub by_bulletin_type: BTreeMap<String, usize>,
    pub by_object_type: BTreeMap<String, usize>,
    pub by_year: BTreeMap<i32, usize>,
    /// Bulletins crediting this station with the discovery
    pub discoveries: Vec<String>,
    /// Bulletins where this station confirmed first
    pub first_confirmations: Vec<String>,
    pub observers: BTreeMap<String, usize>,
    pub measurers: BTreeMap<String, usize>,
    pub facilities: BTreeMap<String, usize>,
}

/// Count each comma-separated name once.
fn count_names(map: &mut BTreeMap<String, usize>, names: &str) {
    for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        *map.entry(name.to_string()).or_default() += 1;
    }
}

impl StationAggregate {
    pub fn build(
        code: &str,
        name: Option<&str>,
        observations: &[Observation],
        mut discoveries: Vec<String>,
        mut first_confirmations: Vec<String>,
    ) -> Self {
        let mut aggregate = Self {
            code: code.to_string(),
            name: name.map(str::to_string),
            total_observations: observations.len(),
            ..Default::default()
        };

        let mut objects = BTreeSet::new();
        for obs in observations {
            objects.insert(obs.object_id.as_str());
            *aggregate
                .by_bulletin_type
                .entry(obs.bulletin_type.as_str().to_string())
                .or_default() += 1;
            if let Some(kind) = obs.object_type {
                *aggregate.by_object_type.entry(kind.as_str().to_string()).or_default() += 1;
            }
            *aggregate.by_year.entry(obs.observed_at.year()).or_default() += 1;

            count_names(&mut aggregate.observers, &obs.observer);
            count_names(&mut aggregate.measurers, &obs.measurer);
            if !obs.facility.is_empty() {
                *aggregate.facilities.entry(obs.facility.clone()).or_default() += 1;
            }
        }
        aggregate.distinct_objects = objects.len();

        discoveries.sort();
        discoveries.dedup();
        first_confirmations.sort();
        first_confirmations.dedup();
        aggregate.discoveries = discoveries;
        aggregate.first_confirmations = first_confirmations;

        aggregate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mpec_common::{BulletinType, ObjectType};

    fn obs(object: &str, year: i32, bulletin_type: BulletinType, observer: &str) -> Observation {
        Observation {
            object_id: object.to_string(),
            observed_at: NaiveDate::from_ymd_opt(year, 1, 4).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            time_degraded: false,
            observer: observer.to_string(),
            measurer: String::new(),
            facility: "1.5-m reflector + 10K CCD".to_string(),
            station_code: "G96".to_string(),
            bulletin_id: "MPEC 2024-A12".to_string(),
            bulletin_type,
            object_type: bulletin_type.has_object_type().then_some(ObjectType::NeaMid),
            is_discovery: false,
        }
    }

    #[test]
    fn test_counts() {
        let observations = vec![
            obs("K24A00B", 2024, BulletinType::Discovery, "D. C. Fuls, R. A. Kowalski"),
            obs("K24A00B", 2024, BulletinType::OrbitUpdate, "D. C. Fuls"),
            obs("K23X01A", 2023, BulletinType::Dou, ""),
        ];
        let aggregate = StationAggregate::build(
            "G96",
            Some("Mt. Lemmon Survey"),
            &observations,
            vec!["MPEC 2024-A12".to_string(), "MPEC 2024-A12".to_string()],
            Vec::new(),
        );

        assert_eq!(aggregate.total_observations, 3);
        assert_eq!(aggregate.distinct_objects, 2);
        assert_eq!(aggregate.by_bulletin_type["DOU"], 1);
        assert_eq!(aggregate.by_object_type["NEA[18,22)"], 2);
        assert_eq!(aggregate.by_year[&2023], 1);
        assert_eq!(aggregate.observers["D. C. Fuls"], 2);
        assert_eq!(aggregate.observers["R. A. Kowalski"], 1);
        assert_eq!(aggregate.facilities["1.5-m reflector + 10K CCD"], 3);
        assert_eq!(aggregate.discoveries, vec!["MPEC 2024-A12"]);
    }

    #[test]
    fn test_serialization_ignores_input_order() {
        let a = obs("K24A00B", 2024, BulletinType::Discovery, "A. Smith");
        let b = obs("K23X01A", 2023, BulletinType::Dou, "B. Jones");

        let first = StationAggregate::build("G96", None, &[a.clone(), b.clone()], vec!["x".into(), "y".into()], vec![]);
        let second = StationAggregate::build("G96", None, &[b, a], vec!["y".into(), "x".into()], vec![]);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
