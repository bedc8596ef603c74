///! Orbital elements read from the "Orbital elements:" block

use regex::Regex;
use std::sync::LazyLock;

use crate::module::observation::columns::{FixedWidthRecord, period_line};

/// `q`, `a` or `e` as the first token of a line, followed by its value.
static ELEMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([qae])\s+(-?\d+(?:\.\d+)?)\b").expect("valid element regex"));

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrbitalElements {
    pub q: Option<f64>,
    pub a: Option<f64>,
    pub e: Option<f64>,
    pub h: Option<f64>,
}

impl OrbitalElements {
    /// First value of each label wins.
    pub fn parse(text: &str) -> Self {
        let mut elements = Self::default();

        for caps in ELEMENT_RE.captures_iter(text) {
            let Ok(value) = caps[2].parse::<f64>() else {
                continue;
            };
            let slot = match &caps[1] {
                "q" => &mut elements.q,
                "a" => &mut elements.a,
                _ => &mut elements.e,
            };
            slot.get_or_insert(value);
        }

        elements.h = text.lines().find_map(absolute_magnitude);

        elements
    }

    /// Explicit `q`, else `a(1 - e)` for bound orbits.
    pub fn perihelion(&self) -> Option<f64> {
        if self.q.is_some() {
            return self.q;
        }
        match (self.a, self.e) {
            (Some(a), Some(e)) if a > 0.0 && (0.0..1.0).contains(&e) => Some(a * (1.0 - e)),
            _ => None,
        }
    }
}

/// `H` from a `P` line, `None` for any other line.
fn absolute_magnitude(line: &str) -> Option<f64> {
    let record = FixedWidthRecord::at_least(line, period_line::MIN_WIDTH)?;
    if record.flag(&period_line::LABEL) != Some('P') || record.flag(&period_line::MAGNITUDE_LABEL) != Some('H') {
        return None;
    }
    record.decimal(&period_line::ABSOLUTE_MAGNITUDE)
}
