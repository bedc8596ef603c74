///! Designation codec
///!
///! Converts provisional designations ("2024 AB12") to the 7-character packed
///! MPC form ("K24A12B"), and encodes the small sequence numbers used in packed
///! designations and bulletin URLs in base 62.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const BASE62: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Half-month letters, January first half to December second half. `I` is skipped.
pub const HALF_MONTH_LETTERS: &[u8; 24] = b"ABCDEFGHJKLMNOPQRSTUVWXY";

/// Largest cycle count (and bulletin number) that fits in one base-62 digit plus one decimal digit.
pub const MAX_PACKED_COUNT: u32 = 619;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DesignationError {
    #[error("month {0} is out of range 1-12")]
    InvalidMonth(u32),

    #[error("'{0}' is not a half-month letter")]
    InvalidHalfMonth(char),

    #[error("year {0} cannot be packed")]
    YearOutOfRange(i32),

    #[error("count {0} exceeds the packed range 0-{MAX_PACKED_COUNT}")]
    CountOutOfRange(u32),

    #[error("invalid base-62 string '{0}'")]
    InvalidBase62(String),

    #[error("malformed designation '{0}'")]
    Malformed(String),
}

/// Encode a non-negative integer in base 62 (no padding, `encode(0) == "0"`).
pub fn encode(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE62[(n % 62) as usize]);
        n /= 62;
    }
    digits.reverse();

    // BASE62 is pure ASCII
    String::from_utf8(digits).unwrap_or_default()
}

/// Decode a base-62 string produced by [`encode`].
pub fn decode(s: &str) -> Result<u64, DesignationError> {
    if s.is_empty() {
        return Err(DesignationError::InvalidBase62(s.to_string()));
    }

    s.chars().try_fold(0u64, |acc, c| {
        let value = base62_value(c).ok_or_else(|| DesignationError::InvalidBase62(s.to_string()))?;
        acc.checked_mul(62)
            .and_then(|v| v.checked_add(u64::from(value)))
            .ok_or_else(|| DesignationError::InvalidBase62(s.to_string()))
    })
}

fn base62_digit(value: u32) -> Option<char> {
    BASE62.get(value as usize).map(|b| *b as char)
}

fn base62_value(c: char) -> Option<u32> {
    match c {
        '0'..='9' => Some(c as u32 - '0' as u32),
        'A'..='Z' => Some(c as u32 - 'A' as u32 + 10),
        'a'..='z' => Some(c as u32 - 'a' as u32 + 36),
        _ => None,
    }
}

/// Letter for the given month (1-12) and half (first: days 1-15, second: 16-end).
pub fn half_month_letter(month: u32, second_half: bool) -> Result<char, DesignationError> {
    if !(1..=12).contains(&month) {
        return Err(DesignationError::InvalidMonth(month));
    }
    let index = (month as usize - 1) * 2 + usize::from(second_half);
    Ok(HALF_MONTH_LETTERS[index] as char)
}

/// Zero-based position of a half-month letter (`A` = 0 ... `Y` = 23).
pub fn half_month_index(letter: char) -> Result<usize, DesignationError> {
    HALF_MONTH_LETTERS
        .iter()
        .position(|b| *b as char == letter)
        .ok_or(DesignationError::InvalidHalfMonth(letter))
}

fn century_letter(year: i32) -> Result<char, DesignationError> {
    // Only letter digits are used for centuries (A = 1000s ... Z = 3500s)
    let century = year.div_euclid(100);
    if !(10..=35).contains(&century) {
        return Err(DesignationError::YearOutOfRange(year));
    }
    base62_digit(century as u32).ok_or(DesignationError::YearOutOfRange(year))
}

fn century_from_letter(letter: char) -> Option<i32> {
    match letter {
        'A'..='Z' => base62_value(letter).map(|v| v as i32),
        _ => None,
    }
}

fn pack_count(count: u32) -> Result<String, DesignationError> {
    if count > MAX_PACKED_COUNT {
        return Err(DesignationError::CountOutOfRange(count));
    }
    let tens = base62_digit(count / 10).ok_or(DesignationError::CountOutOfRange(count))?;
    Ok(format!("{}{}", tens, count % 10))
}

/// Pack a provisional designation, e.g. `"2024 AB12"` → `"K24A12B"`.
pub fn pack(raw: &str) -> Result<String, DesignationError> {
    let malformed = || DesignationError::Malformed(raw.to_string());
    let (year_part, rest) = raw.trim().split_once(' ').ok_or_else(malformed)?;
    let rest = rest.trim();

    if year_part.len() != 4 || !year_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    let year: i32 = year_part.parse().map_err(|_| malformed())?;

    let mut chars = rest.chars();
    let half = chars.next().ok_or_else(malformed)?;
    let second = chars.next().ok_or_else(malformed)?;
    half_month_index(half)?;
    if !second.is_ascii_uppercase() || second == 'I' {
        return Err(malformed());
    }

    let digits = chars.as_str();
    let count = if digits.is_empty() {
        0
    } else if digits.bytes().all(|b| b.is_ascii_digit()) {
        digits.parse::<u32>().map_err(|_| malformed())?
    } else {
        return Err(malformed());
    };

    Ok(format!(
        "{}{}{}{}{}",
        century_letter(year)?,
        &year_part[2..],
        half,
        pack_count(count)?,
        second
    ))
}

/// Inverse of [`pack`], e.g. `"K24A12B"` → `"2024 AB12"`.
pub fn unpack(packed: &str) -> Result<String, DesignationError> {
    let malformed = || DesignationError::Malformed(packed.to_string());
    let chars: Vec<char> = packed.chars().collect();
    if chars.len() != 7 {
        return Err(malformed());
    }

    let century = century_from_letter(chars[0]).ok_or_else(malformed)?;
    if !chars[1].is_ascii_digit() || !chars[2].is_ascii_digit() {
        return Err(malformed());
    }
    let year = century * 100 + (chars[1] as i32 - '0' as i32) * 10 + (chars[2] as i32 - '0' as i32);

    let half = chars[3];
    half_month_index(half)?;

    let tens = base62_value(chars[4]).ok_or_else(malformed)?;
    let ones = chars[5].to_digit(10).ok_or_else(malformed)?;
    let second = chars[6];
    if !second.is_ascii_uppercase() || second == 'I' {
        return Err(malformed());
    }

    let count = tens * 10 + ones;
    if count == 0 {
        Ok(format!("{year} {half}{second}"))
    } else {
        Ok(format!("{year} {half}{second}{count}"))
    }
}

/// True for strings shaped like a packed provisional designation.
pub fn looks_packed(token: &str) -> bool {
    token.len() == 7 && matches!(token.as_bytes()[0], b'I' | b'J' | b'K')
}

/// One half-month publication period, e.g. 2024 `A` (Jan 1-15).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HalfMonth {
    pub year: i32,
    pub letter: char,
}

impl HalfMonth {
    pub fn new(year: i32, letter: char) -> Result<Self, DesignationError> {
        half_month_index(letter)?;
        century_letter(year)?;
        Ok(Self { year, letter })
    }

    /// Both half-months of a calendar month.
    pub fn of_month(year: i32, month: u32) -> Result<[HalfMonth; 2], DesignationError> {
        Ok([
            HalfMonth::new(year, half_month_letter(month, false)?)?,
            HalfMonth::new(year, half_month_letter(month, true)?)?,
        ])
    }

    /// First day of the period (the 1st or the 16th).
    pub fn start_date(&self) -> Option<NaiveDate> {
        let index = half_month_index(self.letter).ok()?;
        let month = (index / 2) as u32 + 1;
        let day = if index % 2 == 0 { 1 } else { 16 };
        NaiveDate::from_ymd_opt(self.year, month, day)
    }
}

/// Position of one bulletin in the publication sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BulletinSequence {
    pub period: HalfMonth,
    pub number: u32,
}

impl BulletinSequence {
    pub fn new(period: HalfMonth, number: u32) -> Result<Self, DesignationError> {
        if !(1..=MAX_PACKED_COUNT).contains(&number) {
            return Err(DesignationError::CountOutOfRange(number));
        }
        Ok(Self { period, number })
    }

    /// Parse a human-readable id such as `"MPEC 2024-A12"`.
    pub fn from_bulletin_id(id: &str) -> Result<Self, DesignationError> {
        let malformed = || DesignationError::Malformed(id.to_string());
        let rest = id.trim().strip_prefix("MPEC ").ok_or_else(malformed)?;
        let (year, tail) = rest.split_once('-').ok_or_else(malformed)?;
        let year: i32 = year.parse().map_err(|_| malformed())?;
        let mut chars = tail.chars();
        let letter = chars.next().ok_or_else(malformed)?;
        let number: u32 = chars.as_str().parse().map_err(|_| malformed())?;
        Self::new(HalfMonth::new(year, letter)?, number)
    }

    pub fn bulletin_id(&self) -> String {
        format!("MPEC {}-{}{}", self.period.year, self.period.letter, self.number)
    }

    /// Packed page name, e.g. `"K24A12"`; numbers from 100 use a base-62 tens digit (`"K24AC3"`).
    pub fn packed(&self) -> Result<String, DesignationError> {
        Ok(format!(
            "{}{:02}{}{}",
            century_letter(self.period.year)?,
            self.period.year.rem_euclid(100),
            self.period.letter,
            pack_count(self.number)?
        ))
    }

    /// Canonical page URL below `base`, e.g. `<base>/K24/K24A12.html`.
    pub fn url(&self, base: &str) -> Result<String, DesignationError> {
        let packed = self.packed()?;
        Ok(format!("{}/{}/{}.html", base.trim_end_matches('/'), &packed[..3], packed))
    }

    pub fn next(&self) -> Option<Self> {
        Self::new(self.period, self.number + 1).ok()
    }
}
