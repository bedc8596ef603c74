///! Object type of a discovery / orbit-update bulletin
///!
///! Title markers decide first; otherwise perihelion distance and absolute
///! magnitude place the object. Pure functions over the page text.

use mpec_common::{ObjectClass, ObjectType};
use regex::Regex;
use std::sync::LazyLock;

use super::elements::OrbitalElements;
use super::pha::PhaList;
use crate::module::bulletin::BulletinPage;

/// Used when no perihelion can be derived; places the object among the TNOs.
pub const DEFAULT_PERIHELION: f64 = 100.0;
pub const NEA_MAX_PERIHELION: f64 = 1.3;
pub const TNO_MIN_PERIHELION: f64 = 29.5;

static INTERSTELLAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+I/|(?i)interstellar").expect("valid interstellar regex"));
static SATELLITE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bS/\d{4}|(?i)satellite").expect("valid satellite regex"));
static COMET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[CPDX]/\d{4}|\b\d+P/|(?i)comet").expect("valid comet regex"));
static TNO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)trans-neptunian|\btno\b").expect("valid tno regex"));

/// Title marker rules, first match wins.
static TITLE_RULES: [(&LazyLock<Regex>, ObjectType); 4] = [
    (&INTERSTELLAR_RE, ObjectType::Interstellar),
    (&SATELLITE_RE, ObjectType::Satellite),
    (&COMET_RE, ObjectType::Comet),
    (&TNO_RE, ObjectType::Tno),
];

pub fn from_title(title: &str) -> Option<ObjectType> {
    TITLE_RULES
        .iter()
        .find(|(re, _)| re.is_match(title))
        .map(|(_, kind)| *kind)
}

/// Place an object by perihelion distance and absolute magnitude.
pub fn from_orbit(q: f64, h: Option<f64>, is_pha: bool) -> ObjectType {
    if q > TNO_MIN_PERIHELION {
        return ObjectType::Tno;
    }
    if q > NEA_MAX_PERIHELION {
        return ObjectType::Unusual;
    }

    let Some(h) = h else {
        return ObjectType::Unknown;
    };
    match (is_pha, h) {
        (true, h) if h < 18.0 => ObjectType::PhaBright,
        (true, _) => ObjectType::PhaFaint,
        (false, h) if h < 18.0 => ObjectType::NeaBright,
        (false, h) if h < 22.0 => ObjectType::NeaMid,
        (false, _) => ObjectType::NeaFaint,
    }
}

pub fn classify_object(page: &BulletinPage, pha: &PhaList) -> ObjectClass {
    if let Some(kind) = from_title(&page.title) {
        return ObjectClass::certain(kind);
    }

    let elements = OrbitalElements::parse(&page.text);
    let is_pha = pha.contains(page.subject());

    match elements.perihelion() {
        Some(q) => ObjectClass::certain(from_orbit(q, elements.h, is_pha)),
        None => {
            tracing::debug!("{}: no perihelion, using default {}", page.title, DEFAULT_PERIHELION);
            ObjectClass::low_confidence(from_orbit(DEFAULT_PERIHELION, elements.h, is_pha))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(title: &str, text: &str) -> BulletinPage {
        BulletinPage {
            title: title.to_string(),
            text: text.to_string(),
        }
    }

    fn orbit(q: &str, h: &str) -> String {
        format!(
            "Orbital elements:\nEpoch 2024 Jan. 1.0 TT\nP   2.44           H   {h}           G   0.15\nq   {q}      Q    2.3500000\n"
        )
    }

    #[test]
    fn test_title_markers() {
        assert_eq!(from_title("MPEC 2024-A20 : COMET C/2024 A1 (ATLAS)"), Some(ObjectType::Comet));
        assert_eq!(from_title("MPEC 2024-A21 : 2024 AC = P/2024 A2"), Some(ObjectType::Comet));
        assert_eq!(from_title("MPEC 2024-A22 : S/2024 J 1"), Some(ObjectType::Satellite));
        assert_eq!(from_title("MPEC 2017-U183 : A/2017 U1 = 1I/2017 U1"), Some(ObjectType::Interstellar));
        assert_eq!(from_title("MPEC 2024-A23 : NEW TRANS-NEPTUNIAN OBJECTS"), Some(ObjectType::Tno));
        assert_eq!(from_title("MPEC 2024-A24 : 2024 AB"), None);
    }

    #[test]
    fn test_orbit_thresholds() {
        assert_eq!(from_orbit(0.9, Some(17.5), false), ObjectType::NeaBright);
        assert_eq!(from_orbit(1.3, Some(18.0), false), ObjectType::NeaMid);
        assert_eq!(from_orbit(1.0, Some(22.0), false), ObjectType::NeaFaint);
        assert_eq!(from_orbit(1.0, Some(17.9), true), ObjectType::PhaBright);
        assert_eq!(from_orbit(1.0, Some(21.0), true), ObjectType::PhaFaint);
        assert_eq!(from_orbit(1.31, Some(15.0), false), ObjectType::Unusual);
        assert_eq!(from_orbit(29.5, None, false), ObjectType::Unusual);
        assert_eq!(from_orbit(29.6, None, false), ObjectType::Tno);
        assert_eq!(from_orbit(0.5, None, false), ObjectType::Unknown);
    }

    #[test]
    fn test_classify_from_elements() {
        let pha = PhaList::parse("  2024 AB\n");

        let class = classify_object(&page("MPEC 2024-A12 : 2024 AB", &orbit("0.9845678", "20.1")), &pha);
        assert_eq!(class, ObjectClass::certain(ObjectType::PhaFaint));

        let class = classify_object(&page("MPEC 2024-A13 : 2024 AC", &orbit("0.9845678", "20.1")), &pha);
        assert_eq!(class, ObjectClass::certain(ObjectType::NeaMid));
    }

    #[test]
    fn test_default_perihelion_is_low_confidence() {
        let class = classify_object(&page("MPEC 2024-A14 : 2024 AD", "Ephemeris:\n"), &PhaList::default());
        assert_eq!(class, ObjectClass::low_confidence(ObjectType::Tno));
    }
}
