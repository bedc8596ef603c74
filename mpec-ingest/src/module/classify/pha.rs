///! Potentially hazardous asteroid list
///!
///! A flat text file; any provisional designation ("2024 AB1") or
///! parenthesised number ("(99942)") on a line is a member.

use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

static PROVISIONAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4} [A-Z]{2}\d*)\b").expect("valid provisional regex"));

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\((\d+)\)").expect("valid number regex"));

#[derive(Debug, Clone, Default)]
pub struct PhaList {
    designations: HashSet<String>,
}

fn keys(text: &str) -> impl Iterator<Item = String> + '_ {
    let provisional = PROVISIONAL_RE.captures_iter(text).map(|caps| caps[1].to_string());
    let numbers = NUMBER_RE.captures_iter(text).map(|caps| format!("({})", &caps[1]));
    provisional.chain(numbers)
}

impl PhaList {
    pub fn parse(content: &str) -> Self {
        Self {
            designations: content.lines().flat_map(keys).collect(),
        }
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        let content = fs::read_to_string(path)?;
        let list = Self::parse(&content);
        tracing::info!("Loaded {} PHA designations from {}", list.len(), path.display());
        Ok(list)
    }

    /// Load when configured; a missing or unreadable file yields an empty list.
    pub fn load_optional(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match Self::load(path) {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!("Failed to read PHA list {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// True when any designation in `subject` is listed.
    pub fn contains(&self, subject: &str) -> bool {
        keys(subject).any(|key| self.designations.contains(&key))
    }

    pub fn len(&self) -> usize {
        self.designations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.designations.is_empty()
    }
}
