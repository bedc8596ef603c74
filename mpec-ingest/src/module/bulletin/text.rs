///! Bulletin text extraction
///!
///! Reduces a bulletin page to its visible text (tags stripped, preformatted
///! whitespace kept so the fixed columns survive) and reads the header and
///! signature fields.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use regex::Regex;
use scraper::{Html, Node, Selector};
use std::sync::LazyLock;

static ISSUED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Issued\s+(\d{4})\s+([A-Z][a-z]+)\.?\s+(\d{1,2}),\s+(\d{1,2}):(\d{2})\s+UT")
        .expect("valid issued regex")
});

static ISSUER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(\S.*?)\s+\(C\) Copyright \d{4} MPC").expect("valid issuer regex")
});

static ORBIT_COMPUTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(?:^Orbital elements \(([^)]+)\):|[Cc]omputed by ([A-Z][^\n]*))")
        .expect("valid orbit computer regex")
});

/// Visible text of one bulletin plus its title
#[derive(Debug, Clone, PartialEq)]
pub struct BulletinPage {
    pub title: String,
    pub text: String,
}

impl BulletinPage {
    /// Build from a raw page. HTML is stripped; plain text passes through.
    pub fn from_raw(bulletin_id: &str, raw: &str) -> Self {
        let (html_title, text) = if looks_like_html(raw) {
            let document = Html::parse_document(raw);
            (html_title(&document), visible_text(&document))
        } else {
            (None, raw.replace("\r\n", "\n"))
        };

        let title = html_title
            .filter(|t| !t.is_empty())
            .or_else(|| first_line_with(&text, bulletin_id))
            .unwrap_or_else(|| bulletin_id.to_string());

        Self { title, text }
    }

    pub fn lines(&self) -> Vec<&str> {
        self.text.lines().collect()
    }

    /// Designation or subject after the first ':' of the title.
    pub fn subject(&self) -> &str {
        self.title
            .split_once(':')
            .map(|(_, subject)| subject.trim())
            .unwrap_or("")
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        parse_issued(&self.text)
    }

    pub fn issuer(&self) -> Option<String> {
        ISSUER_RE
            .captures(&self.text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn orbit_computer(&self) -> Option<String> {
        let caps = ORBIT_COMPUTER_RE.captures(&self.text)?;
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().trim().trim_end_matches('.').to_string())
            .filter(|s| !s.is_empty())
    }
}

fn looks_like_html(raw: &str) -> bool {
    let head: String = raw.chars().take(2048).collect::<String>().to_ascii_lowercase();
    head.contains("<html") || head.contains("<pre") || head.contains("<!doctype") || head.contains("<body")
}

fn html_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Text nodes of the document outside `<head>`, `<script>` and `<style>`.
fn visible_text(document: &Html) -> String {
    let mut out = String::new();

    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| matches!(el.name(), "head" | "script" | "style"))
        });
        if !hidden {
            out.push_str(text);
        }
    }

    out
}

fn first_line_with(text: &str, needle: &str) -> Option<String> {
    text.lines()
        .find(|line| line.contains(needle))
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_ascii_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Parse the `Issued 2024 Jan. 5, 20:07 UT` header line.
pub fn parse_issued(text: &str) -> Option<DateTime<Utc>> {
    let caps = ISSUED_RE.captures(text)?;
    let year: i32 = caps[1].parse().ok()?;
    let month = month_number(&caps[2])?;
    let day: u32 = caps[3].parse().ok()?;
    let hour: u32 = caps[4].parse().ok()?;
    let minute: u32 = caps[5].parse().ok()?;

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)?;
    Some(Utc.from_utc_datetime(&naive))
}
