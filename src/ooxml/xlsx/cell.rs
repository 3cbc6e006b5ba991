//! Cells, cell values and A1-style addresses.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::xlsx::format::{Style, TextRun};

/// Number of rows in a worksheet.
pub const MAX_ROWS: u32 = 1_048_576;

/// Number of columns in a worksheet.
pub const MAX_COLUMNS: u32 = 16_384;

/// Zero-based cell position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    pub row: u32,
    pub col: u32,
}

impl CellAddress {
    /// Address of a cell inside the worksheet grid.
    pub fn new(row: u32, col: u32) -> Result<Self> {
        if row >= MAX_ROWS || col >= MAX_COLUMNS {
            return Err(OoxmlError::Format(format!(
                "cell ({}, {}) is outside the worksheet grid",
                row, col
            )));
        }
        Ok(Self { row, col })
    }

    /// Parse an A1-style reference such as `B7` or `$AA$12`.
    pub fn parse(reference: &str) -> Result<Self> {
        let invalid = || OoxmlError::Format(format!("invalid cell reference '{}'", reference));

        let trimmed = reference.replace('$', "");
        let split = trimmed
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (letters, digits) = trimmed.split_at(split);
        if letters.is_empty() || !letters.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(invalid());
        }

        let mut col: u32 = 0;
        for b in letters.bytes() {
            col = col
                .checked_mul(26)
                .and_then(|c| c.checked_add(u32::from(b.to_ascii_uppercase() - b'A') + 1))
                .ok_or_else(invalid)?;
        }
        let row = atoi_simd::parse::<u32, false, false>(digits.as_bytes()).map_err(|_| invalid())?;
        if row == 0 {
            return Err(invalid());
        }

        Self::new(row - 1, col - 1)
    }

    /// Column letters for a zero-based column index (`0` → `A`, `26` → `AA`).
    pub fn column_letters(col: u32) -> String {
        let mut letters = Vec::with_capacity(3);
        let mut n = col + 1;
        while n > 0 {
            n -= 1;
            letters.push(b'A' + (n % 26) as u8);
            n /= 26;
        }
        letters.reverse();
        String::from_utf8(letters).unwrap_or_default()
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::column_letters(self.col), self.row + 1)
    }
}

/// Value stored in a cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Decimal kept as its exact textual form
    Decimal(String),
    Text(String),
    RichText(Vec<TextRun>),
    Date(NaiveDateTime),
    Time(NaiveTime),
    /// Formula text without the leading `=`
    Formula(String),
}

impl CellValue {
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Text content of text-like values.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Text(text) => Some(text.clone()),
            CellValue::RichText(runs) => Some(runs.iter().map(|r| r.text.as_str()).collect()),
            _ => None,
        }
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Int(i64::from(value))
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::Date(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value.and_time(NaiveTime::MIN))
    }
}

impl From<NaiveTime> for CellValue {
    fn from(value: NaiveTime) -> Self {
        CellValue::Time(value)
    }
}

/// A cell: a value and an optional style.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub value: CellValue,
    pub style: Option<Style>,
}

impl Cell {
    pub fn new(value: impl Into<CellValue>) -> Self {
        Self {
            value: value.into(),
            style: None,
        }
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(CellAddress::column_letters(0), "A");
        assert_eq!(CellAddress::column_letters(25), "Z");
        assert_eq!(CellAddress::column_letters(26), "AA");
        assert_eq!(CellAddress::column_letters(701), "ZZ");
        assert_eq!(CellAddress::column_letters(MAX_COLUMNS - 1), "XFD");
    }

    #[test]
    fn test_parse_reference() {
        assert_eq!(CellAddress::parse("A1").unwrap(), CellAddress { row: 0, col: 0 });
        assert_eq!(CellAddress::parse("$AB$12").unwrap(), CellAddress { row: 11, col: 27 });
        assert_eq!(CellAddress::parse("xfd1048576").unwrap().to_string(), "XFD1048576");
    }

    #[test]
    fn test_invalid_references() {
        for bad in ["", "A", "12", "A0", "1A", "A-1", "XFE1", "A1048577", "Ä1"] {
            assert!(
                matches!(CellAddress::parse(bad), Err(OoxmlError::Format(_))),
                "{bad} should not parse"
            );
        }
    }

    #[test]
    fn test_grid_bounds() {
        assert!(CellAddress::new(MAX_ROWS - 1, MAX_COLUMNS - 1).is_ok());
        assert!(CellAddress::new(MAX_ROWS, 0).is_err());
        assert!(CellAddress::new(0, MAX_COLUMNS).is_err());
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(CellValue::from(3), CellValue::Int(3));
        assert_eq!(CellValue::from("x").as_text(), Some("x".to_string()));
        let date = NaiveDate::from_ymd_opt(2020, 5, 17).unwrap();
        assert_eq!(
            CellValue::from(date),
            CellValue::Date(date.and_hms_opt(0, 0, 0).unwrap())
        );
        assert!(Cell::default().value.is_empty());
    }
}
