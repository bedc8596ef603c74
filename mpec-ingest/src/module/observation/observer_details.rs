///! "Observer details:" section
///!
///! One entry per station, keyed by the station code at the start of the line.
///! Soft-wrapped entries continue on lines indented by three spaces.

use std::collections::HashMap;

/// Attribution for one station in one bulletin
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObserverDetails {
    pub observer: String,
    pub measurer: String,
    pub facility: String,
}

/// Continuation lines start with 3 spaces followed by a digit (telescope line)
/// or a "Measurer" fragment.
fn is_continuation(line: &str) -> bool {
    let Some(rest) = line.strip_prefix("   ") else {
        return false;
    };
    let rest = rest.trim_start();
    rest.starts_with(|c: char| c.is_ascii_digit()) || rest.starts_with("Measurer")
}

fn entry_code<'a>(line: &str, stations: &'a [String]) -> Option<&'a String> {
    stations.iter().find(|code| {
        line.strip_prefix(code.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(' '))
    })
}

/// Strip a trailing period and normalize " and " separators.
fn repair(value: &str) -> String {
    value.trim().trim_end_matches('.').trim().replace(" and ", ", ")
}

/// Names containing digits are unparseable; keep them empty.
fn names(value: &str) -> String {
    let repaired = repair(value);
    if repaired.chars().any(|c| c.is_ascii_digit()) {
        String::new()
    } else {
        repaired
    }
}

/// Drop the leading keyword ("Observers", "Measurer", ...) of a fragment.
fn after_keyword(fragment: &str) -> &str {
    fragment
        .split_once(' ')
        .map(|(_, rest)| rest)
        .unwrap_or("")
}

fn classify_fragments(entry: &str) -> ObserverDetails {
    let mut details = ObserverDetails::default();
    let mut facility: Vec<String> = Vec::new();

    // First fragment is "<code> <site name>"
    for fragment in entry.split("  ").map(str::trim).filter(|f| !f.is_empty()).skip(1) {
        if let Some(rest) = fragment
            .strip_prefix("Observers and measurers ")
            .or_else(|| fragment.strip_prefix("Observer and measurer "))
        {
            details.observer = names(rest);
            details.measurer = details.observer.clone();
        } else if fragment.starts_with("Observer") {
            details.observer = names(after_keyword(fragment));
        } else if fragment.starts_with("Measurer") {
            details.measurer = names(after_keyword(fragment));
        } else {
            let value = repair(fragment);
            if !value.is_empty() {
                facility.push(value);
            }
        }
    }

    details.facility = facility.join(", ");
    details
}

/// Any entry line starts with a 3-character code followed by a space.
fn looks_like_entry(line: &str) -> bool {
    let bytes = line.as_bytes();
    bytes.len() > 3 && bytes[..3].iter().all(u8::is_ascii_alphanumeric) && bytes[3] == b' '
}

/// Read the entries for `stations` from the section starting at `start`.
///
/// Entries of other stations are skipped together with their continuation lines.
pub fn parse_observer_details(lines: &[&str], start: usize, stations: &[String]) -> HashMap<String, ObserverDetails> {
    let mut entries: Vec<(String, String)> = Vec::new();
    let mut in_section = false;
    let mut current: Option<usize> = None;

    for line in lines.iter().skip(start) {
        if line.trim().is_empty() {
            if !in_section {
                continue;
            }
            break;
        }
        if let Some(code) = entry_code(line, stations) {
            in_section = true;
            entries.push((code.clone(), line.trim_end().to_string()));
            current = Some(entries.len() - 1);
        } else if looks_like_entry(line) {
            in_section = true;
            current = None;
        } else if is_continuation(line) {
            if let Some((_, entry)) = current.and_then(|i| entries.get_mut(i)) {
                entry.push_str("  ");
                entry.push_str(line.trim());
            }
        }
    }

    let mut out = HashMap::new();
    for (code, entry) in entries {
        out.entry(code).or_insert_with(|| classify_fragments(&entry));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECTION: &str = "\
Observer details:
F51 Pan-STARRS 1, Haleakala.  Observers R. Weryk, M. Micheli.  Measurers M. Micheli
   and R. Weryk.  1.8-m Ritchey-Chretien reflector + CCD.
G96 Mt. Lemmon Survey.  Observer and measurer D. C. Fuls.
   1.5-m reflector + 10K CCD.
703 Catalina Sky Survey.  Observers 2 staff members.  Measurer A. R. Gibbs.
   0.7-m Schmidt + 10K CCD.
I41 Not in this bulletin.  Observer X.
";

    fn stations() -> Vec<String> {
        ["F51", "G96", "703"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_entries_with_continuations() {
        let lines: Vec<&str> = SECTION.lines().collect();
        let details = parse_observer_details(&lines, 1, &stations());
        assert_eq!(details.len(), 3);

        let g96 = &details["G96"];
        assert_eq!(g96.observer, "D. C. Fuls");
        assert_eq!(g96.measurer, "D. C. Fuls");
        assert_eq!(g96.facility, "1.5-m reflector + 10K CCD");
    }

    #[test]
    fn test_digits_reset_names_only() {
        let lines: Vec<&str> = SECTION.lines().collect();
        let details = parse_observer_details(&lines, 1, &stations());

        let css = &details["703"];
        assert_eq!(css.observer, "");
        assert_eq!(css.measurer, "A. R. Gibbs");
        assert_eq!(css.facility, "0.7-m Schmidt + 10K CCD");
    }

    #[test]
    fn test_wrapped_names_do_not_continue() {
        // "   and R. Weryk." neither starts with a digit nor with "Measurer"
        let lines: Vec<&str> = SECTION.lines().collect();
        let details = parse_observer_details(&lines, 1, &stations());

        let ps1 = &details["F51"];
        assert_eq!(ps1.observer, "R. Weryk, M. Micheli");
        assert_eq!(ps1.measurer, "M. Micheli");
        assert_eq!(ps1.facility, "");
    }

    #[test]
    fn test_other_station_continuation_is_not_attached() {
        let lines = [
            "Observer details:",
            "G96 Mt. Lemmon Survey.  Observer D. C. Fuls.",
            "   1.5-m reflector + 10K CCD.",
            "I41 Palomar Mountain--ZTF.  Observer Z. Team.",
            "   1.2-m Oschin Schmidt + CCD.",
        ];
        let details = parse_observer_details(&lines, 1, &["G96".to_string()]);
        assert_eq!(details.len(), 1);
        assert_eq!(details["G96"].facility, "1.5-m reflector + 10K CCD");
    }

    #[test]
    fn test_and_is_normalized() {
        let details = classify_fragments("C51 WISE.  Observers A. Mainzer and J. Bauer.");
        assert_eq!(details.observer, "A. Mainzer, J. Bauer");
    }
}
