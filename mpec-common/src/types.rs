///! Normalized bulletin facts shared by the ingester and downstream readers

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} label '{label}'")]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub label: String,
}

/// Bulletin type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BulletinType {
    Editorial,
    Discovery,
    OrbitUpdate,
    Dou,
    ListUpdate,
    Retraction,
    Other,
}

impl BulletinType {
    pub const ALL: [BulletinType; 7] = [
        BulletinType::Editorial,
        BulletinType::Discovery,
        BulletinType::OrbitUpdate,
        BulletinType::Dou,
        BulletinType::ListUpdate,
        BulletinType::Retraction,
        BulletinType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BulletinType::Editorial => "Editorial",
            BulletinType::Discovery => "Discovery",
            BulletinType::OrbitUpdate => "OrbitUpdate",
            BulletinType::Dou => "DOU",
            BulletinType::ListUpdate => "ListUpdate",
            BulletinType::Retraction => "Retraction",
            BulletinType::Other => "Other",
        }
    }

    /// Only discovery and orbit-update bulletins carry an object type.
    pub fn has_object_type(&self) -> bool {
        matches!(self, BulletinType::Discovery | BulletinType::OrbitUpdate)
    }
}

impl fmt::Display for BulletinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BulletinType {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BulletinType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownLabel {
                kind: "bulletin type",
                label: s.to_string(),
            })
    }
}

/// Object type of a discovery or orbit-update bulletin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectType {
    /// NEA, H < 18
    NeaBright,
    /// NEA, 18 <= H < 22
    NeaMid,
    /// NEA, H >= 22
    NeaFaint,
    /// PHA, H < 18
    PhaBright,
    /// PHA, H >= 18
    PhaFaint,
    Comet,
    Satellite,
    Tno,
    Unusual,
    Interstellar,
    Unknown,
}

impl ObjectType {
    pub const ALL: [ObjectType; 11] = [
        ObjectType::NeaBright,
        ObjectType::NeaMid,
        ObjectType::NeaFaint,
        ObjectType::PhaBright,
        ObjectType::PhaFaint,
        ObjectType::Comet,
        ObjectType::Satellite,
        ObjectType::Tno,
        ObjectType::Unusual,
        ObjectType::Interstellar,
        ObjectType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::NeaBright => "NEA<18",
            ObjectType::NeaMid => "NEA[18,22)",
            ObjectType::NeaFaint => "NEA>22",
            ObjectType::PhaBright => "PHA<18",
            ObjectType::PhaFaint => "PHA>18",
            ObjectType::Comet => "Comet",
            ObjectType::Satellite => "Satellite",
            ObjectType::Tno => "TNO",
            ObjectType::Unusual => "Unusual",
            ObjectType::Interstellar => "Interstellar",
            ObjectType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownLabel {
                kind: "object type",
                label: s.to_string(),
            })
    }
}

/// Object type plus whether it came from a fallback default rather than orbital data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectClass {
    pub kind: ObjectType,
    pub low_confidence: bool,
}

impl ObjectClass {
    pub fn certain(kind: ObjectType) -> Self {
        Self {
            kind,
            low_confidence: false,
        }
    }

    pub fn low_confidence(kind: ObjectType) -> Self {
        Self {
            kind,
            low_confidence: true,
        }
    }
}

/// One published bulletin after classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletinRecord {
    /// e.g. "MPEC 2024-A12"
    pub id: String,
    pub title: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub bulletin_type: BulletinType,
    pub object_class: Option<ObjectClass>,
    pub orbit_computer: Option<String>,
    pub issuer: Option<String>,
    /// SHA-256 hex of the raw page
    pub fingerprint: String,
    /// Station codes in order of first appearance in the observation block
    pub stations: Vec<String>,
    pub discovery_station: Option<String>,
    pub first_confirming_station: Option<String>,
}

/// One (object, station, bulletin) observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub object_id: String,
    pub observed_at: NaiveDateTime,
    /// Set when the source line had no time of day and midnight was assumed
    pub time_degraded: bool,
    pub observer: String,
    pub measurer: String,
    pub facility: String,
    pub station_code: String,
    pub bulletin_id: String,
    pub bulletin_type: BulletinType,
    pub object_type: Option<ObjectType>,
    pub is_discovery: bool,
}

/// Registry entry for one object designation (last write wins)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub object_id: String,
    pub has_discovery_flag: bool,
    pub note1: Option<char>,
    pub note2: Option<char>,
    pub last_observed_at: NaiveDateTime,
    pub magnitude: Option<f64>,
    pub band: Option<char>,
    pub star_catalog_code: Option<char>,
}

/// Relation between two designations announced in a daily orbit update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelationType {
    Identification,
    Double,
    /// Nominal relation of the erroneous-double section; stored as `Double` + retracted
    ErroneousDouble,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Identification => "identification",
            RelationType::Double => "double",
            RelationType::ErroneousDouble => "erroneous-turned-double",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationType {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "identification" => Ok(RelationType::Identification),
            "double" => Ok(RelationType::Double),
            "erroneous-turned-double" => Ok(RelationType::ErroneousDouble),
            _ => Err(UnknownLabel {
                kind: "relation type",
                label: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CrossReference {
    pub bulletin_id: String,
    pub from_designation: String,
    pub to_designation: String,
    pub relation: RelationType,
    /// Free text, "Unknown" when the line names nobody
    pub author: String,
    pub is_retracted: bool,
}

/// Content hash of one trackable aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeTrackingRecord {
    /// e.g. "station_G96"
    pub unit_id: String,
    pub last_run_at: DateTime<Utc>,
    pub content_hash: String,
    pub changed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip() {
        for t in BulletinType::ALL {
            assert_eq!(t.as_str().parse::<BulletinType>().unwrap(), t);
        }
        for t in ObjectType::ALL {
            assert_eq!(t.as_str().parse::<ObjectType>().unwrap(), t);
        }
        assert_eq!("DOU".parse::<BulletinType>().unwrap(), BulletinType::Dou);
        assert_eq!("NEA[18,22)".parse::<ObjectType>().unwrap(), ObjectType::NeaMid);
        assert!("Asteroid".parse::<ObjectType>().is_err());
    }

    #[test]
    fn test_object_type_only_for_discovery_and_orbit_update() {
        assert!(BulletinType::Discovery.has_object_type());
        assert!(BulletinType::OrbitUpdate.has_object_type());
        assert!(!BulletinType::Dou.has_object_type());
        assert!(!BulletinType::Editorial.has_object_type());
    }
}
