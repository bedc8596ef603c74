///! Bulletin type rules
///!
///! An ordered list of (predicate, result) pairs; the first predicate that
///! holds decides the type. Order is the precedence.

use mpec_common::BulletinType;
use regex::Regex;
use std::sync::LazyLock;

use crate::module::bulletin::BulletinPage;
use crate::module::observation::has_discovery_marker;
use crate::module::observation::parser::OBSERVER_DETAILS_HEADER;

/// " = " in a title announces an identity (e.g. a comet recovery), not a discovery.
static IDENTITY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s=\s").expect("valid identity regex"));

/// Subjects of the periodic list bulletins
pub const LIST_UPDATE_PHRASES: [&str; 7] = [
    "observable comets",
    "distant minor planets",
    "critical-list minor planets",
    "atens and apollos",
    "amors",
    "unusual minor planets",
    "potentially hazardous asteroids",
];

pub struct Rule {
    pub name: &'static str,
    pub matches: fn(&BulletinPage) -> bool,
    pub result: BulletinType,
}

pub static RULES: [Rule; 8] = [
    Rule {
        name: "editorial",
        matches: is_editorial,
        result: BulletinType::Editorial,
    },
    Rule {
        name: "discovery",
        matches: is_discovery,
        result: BulletinType::Discovery,
    },
    Rule {
        name: "observer-details",
        matches: has_observer_details,
        result: BulletinType::OrbitUpdate,
    },
    Rule {
        name: "orbit-and-ephemeris",
        matches: has_orbit_and_ephemeris,
        result: BulletinType::OrbitUpdate,
    },
    Rule {
        name: "daily-orbit-update",
        matches: is_daily_orbit_update,
        result: BulletinType::Dou,
    },
    Rule {
        name: "list-update",
        matches: is_list_update,
        result: BulletinType::ListUpdate,
    },
    Rule {
        name: "retraction",
        matches: is_retraction,
        result: BulletinType::Retraction,
    },
    Rule {
        name: "other",
        matches: always,
        result: BulletinType::Other,
    },
];

fn always(_: &BulletinPage) -> bool {
    true
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

fn has_line_starting_with(page: &BulletinPage, prefix: &str) -> bool {
    page.text.lines().any(|line| line.trim_start().starts_with(prefix))
}

fn mentions_removal(title: &str) -> bool {
    contains_ci(title, "delet") || contains_ci(title, "retract")
}

pub fn is_editorial(page: &BulletinPage) -> bool {
    contains_ci(&page.title, "editorial") && !mentions_removal(&page.title)
}

pub fn has_observer_details(page: &BulletinPage) -> bool {
    page.text.lines().any(|line| line.trim() == OBSERVER_DETAILS_HEADER)
}

pub fn is_discovery(page: &BulletinPage) -> bool {
    has_observer_details(page)
        && has_discovery_marker(&page.lines())
        && !IDENTITY_RE.is_match(&page.title)
}

pub fn has_orbit_and_ephemeris(page: &BulletinPage) -> bool {
    (has_line_starting_with(page, "Orbital elements") && has_line_starting_with(page, "Ephemeris"))
        || contains_ci(&page.title, "precoveries")
}

pub fn is_daily_orbit_update(page: &BulletinPage) -> bool {
    contains_ci(&page.title, "daily orbit update") || contains_ci(&page.text, "daily orbit update")
}

pub fn is_list_update(page: &BulletinPage) -> bool {
    let title = page.title.to_lowercase();
    LIST_UPDATE_PHRASES.iter().any(|phrase| title.contains(phrase))
}

pub fn is_retraction(page: &BulletinPage) -> bool {
    contains_ci(&page.title, "retract") || contains_ci(&page.title, "abandon") || contains_ci(&page.title, "delet")
}

/// First matching rule.
pub fn matching_rule(page: &BulletinPage) -> &'static Rule {
    RULES
        .iter()
        .find(|rule| (rule.matches)(page))
        .unwrap_or(&RULES[RULES.len() - 1])
}

pub fn classify_bulletin(page: &BulletinPage) -> BulletinType {
    let rule = matching_rule(page);
    tracing::debug!("'{}' classified as {} by rule '{}'", page.title, rule.result, rule.name);
    rule.result
}
