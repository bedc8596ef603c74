///! Daily orbit update cross-references
///!
///! Three sections list related designations, one relation per line:
///!
///! ```text
///! New identifications:
///!
///!    K24A00A = K24A00B                Smith  2024-01-05       MPC 12345
///! ```
///!
///! Each pair is stored in both directions.

use mpec_common::designation::looks_packed;
use mpec_common::{CrossReference, RelationType};

pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Section headers (singular and plural) and the relation they announce.
const SECTIONS: [(&str, RelationType); 3] = [
    ("New identification", RelationType::Identification),
    ("New double designation", RelationType::Double),
    ("Erroneous double designation", RelationType::ErroneousDouble),
];

/// One parsed entry line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XrefEntry {
    pub designations: Vec<String>,
    pub author: String,
    pub retracted: bool,
}

fn section_of(line: &str) -> Option<RelationType> {
    let trimmed = line.trim();
    SECTIONS.iter().find_map(|(prefix, relation)| {
        let rest = trimmed.strip_prefix(prefix)?;
        matches!(rest, ":" | "s:").then_some(*relation)
    })
}

fn is_designation(token: &str) -> bool {
    looks_packed(token.trim_start_matches('#'))
}

/// Tokenize one entry line. `None` when fewer than two designations remain.
pub fn parse_entry(line: &str) -> Option<XrefEntry> {
    let mut tokens: Vec<&str> = line.split_whitespace().collect();

    // Trailing "MPC 12345" is a reference, not part of the entry
    if tokens.len() >= 2
        && tokens[tokens.len() - 2] == "MPC"
        && tokens[tokens.len() - 1].bytes().all(|b| b.is_ascii_digit())
    {
        tokens.truncate(tokens.len() - 2);
    }

    let author = tokens
        .len()
        .checked_sub(2)
        .map(|i| tokens[i])
        .filter(|token| !is_designation(token) && token.bytes().any(|b| b.is_ascii_alphabetic()))
        .unwrap_or(UNKNOWN_AUTHOR)
        .to_string();

    let designations: Vec<String> = tokens
        .iter()
        .filter(|token| is_designation(token))
        .map(|token| token.trim_start_matches('#').to_string())
        .collect();

    if designations.len() < 2 {
        return None;
    }

    Some(XrefEntry {
        designations,
        author,
        retracted: line.trim_start().starts_with('#'),
    })
}

fn rows_for(bulletin_id: &str, entry: &XrefEntry, relation: RelationType) -> Vec<CrossReference> {
    // Erroneous doubles are recorded as retracted doubles whatever the line says
    let (relation, retracted) = match relation {
        RelationType::ErroneousDouble => (RelationType::Double, true),
        other => (other, entry.retracted),
    };

    let mut rows = Vec::new();
    for pair in entry.designations.windows(2) {
        for (from, to) in [(&pair[0], &pair[1]), (&pair[1], &pair[0])] {
            rows.push(CrossReference {
                bulletin_id: bulletin_id.to_string(),
                from_designation: from.clone(),
                to_designation: to.clone(),
                relation,
                author: entry.author.clone(),
                is_retracted: retracted,
            });
        }
    }
    rows
}

/// Scan every cross-reference section of a bulletin.
pub fn extract_cross_references(bulletin_id: &str, lines: &[&str]) -> Vec<CrossReference> {
    let mut out = Vec::new();
    let mut index = 0;

    while index < lines.len() {
        let Some(relation) = section_of(lines[index]) else {
            index += 1;
            continue;
        };
        index += 1;

        while index < lines.len() && lines[index].trim().is_empty() {
            index += 1;
        }

        while index < lines.len() {
            let line = lines[index];
            if line.trim().is_empty() || !line.starts_with(char::is_whitespace) {
                break;
            }
            if let Some(entry) = parse_entry(line) {
                if entry.designations.len() > 2 {
                    tracing::warn!(
                        "{}: {} designations on one {} line, pairing sequentially: {}",
                        bulletin_id,
                        entry.designations.len(),
                        relation,
                        line.trim()
                    );
                }
                out.extend(rows_for(bulletin_id, &entry, relation));
            }
            index += 1;
        }
    }

    out
}
