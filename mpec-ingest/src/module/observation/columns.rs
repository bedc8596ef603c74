///! Fixed-width column schema
///!
///! Every fixed-width column (observations, the orbit `P` line) is declared once here (offset, width, kind) and
///! read through [`FixedWidthRecord`], so the column contract lives in one place.

use std::ops::Range;

/// Width of a well-formed observation line.
pub const LINE_WIDTH: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Flag,
    Date,
    DayFraction,
    Decimal,
    Code,
}

/// One named fixed-width field (0-indexed, half-open).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
    pub kind: FieldKind,
}

impl Field {
    pub const fn new(name: &'static str, offset: usize, width: usize, kind: FieldKind) -> Self {
        Self {
            name,
            offset,
            width,
            kind,
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.width
    }
}

/// Columns of the 80-column observation format.
pub mod obs80 {
    use super::{Field, FieldKind};

    pub const OBJECT_ID: Field = Field::new("object_id", 0, 12, FieldKind::Text);
    pub const DISCOVERY: Field = Field::new("discovery", 12, 1, FieldKind::Flag);
    pub const NOTE1: Field = Field::new("note1", 13, 1, FieldKind::Flag);
    pub const NOTE2: Field = Field::new("note2", 14, 1, FieldKind::Flag);
    pub const DATE: Field = Field::new("date", 15, 10, FieldKind::Date);
    pub const TIME: Field = Field::new("time", 25, 7, FieldKind::DayFraction);
    pub const MAGNITUDE: Field = Field::new("magnitude", 65, 5, FieldKind::Decimal);
    pub const BAND: Field = Field::new("band", 70, 1, FieldKind::Flag);
    pub const CATALOG: Field = Field::new("catalog", 71, 1, FieldKind::Flag);
    pub const STATION: Field = Field::new("station", 77, 3, FieldKind::Code);

    pub const SCHEMA: [Field; 10] = [
        OBJECT_ID, DISCOVERY, NOTE1, NOTE2, DATE, TIME, MAGNITUDE, BAND, CATALOG, STATION,
    ];

    /// Discovery marker value
    pub const DISCOVERY_MARK: char = '*';

    /// Note 2 values marking the second line of a satellite / roving observation
    pub const CONTINUATION_NOTES: [char; 2] = ['s', 'v'];
}

/// Columns of the `P` line in an orbital-elements block:
/// `P   2.44           H   20.1           G   0.15           U   6`
pub mod period_line {
    use super::{Field, FieldKind};

    pub const LABEL: Field = Field::new("label", 0, 1, FieldKind::Flag);
    pub const PERIOD: Field = Field::new("period", 1, 18, FieldKind::Decimal);
    pub const MAGNITUDE_LABEL: Field = Field::new("magnitude_label", 19, 1, FieldKind::Flag);
    pub const ABSOLUTE_MAGNITUDE: Field = Field::new("absolute_magnitude", 20, 7, FieldKind::Decimal);

    pub const SCHEMA: [Field; 4] = [LABEL, PERIOD, MAGNITUDE_LABEL, ABSOLUTE_MAGNITUDE];

    /// Shortest line that still carries a magnitude value
    pub const MIN_WIDTH: usize = ABSOLUTE_MAGNITUDE.offset + 1;
}

/// Width of a line once trailing whitespace is removed.
///
/// Leading blanks are significant: an unnumbered object leaves columns 0-4 empty.
pub fn record_width(line: &str) -> usize {
    line.trim_end().chars().count()
}

/// Read-only view over one line of exactly `width` ASCII characters.
#[derive(Debug, Clone, Copy)]
pub struct FixedWidthRecord<'a> {
    line: &'a str,
}

impl<'a> FixedWidthRecord<'a> {
    /// `None` when the trimmed line is not exactly `width` ASCII characters.
    pub fn new(line: &'a str, width: usize) -> Option<Self> {
        let line = line.trim_end();
        if !line.is_ascii() || line.len() != width {
            return None;
        }
        Some(Self { line })
    }

    /// Like [`FixedWidthRecord::new`] for variable-length lines: at least `width` ASCII characters.
    pub fn at_least(line: &'a str, width: usize) -> Option<Self> {
        let line = line.trim_end();
        if !line.is_ascii() || line.len() < width {
            return None;
        }
        Some(Self { line })
    }

    pub fn line(&self) -> &'a str {
        self.line
    }

    /// Untrimmed field contents, cut short where the line ends.
    pub fn raw(&self, field: &Field) -> &'a str {
        let end = field.range().end.min(self.line.len());
        self.line.get(field.offset..end).unwrap_or("")
    }

    /// Trimmed field contents, `None` when blank.
    pub fn text(&self, field: &Field) -> Option<&'a str> {
        let value = self.raw(field).trim();
        (!value.is_empty()).then_some(value)
    }

    /// Single-character field, `None` when blank.
    pub fn flag(&self, field: &Field) -> Option<char> {
        self.text(field).and_then(|v| v.chars().next())
    }

    pub fn decimal(&self, field: &Field) -> Option<f64> {
        self.text(field).and_then(|v| v.parse().ok())
    }
}
