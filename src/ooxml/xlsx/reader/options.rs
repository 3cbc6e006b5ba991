//! Reader settings and the cell type coercion rules.
//!
//! A cell's stored primitive ([`RawValue`]) is turned into a [`CellValue`] by
//! [`ReaderOptions::coerce`]. Precedence, highest first:
//!
//! 1. a global enforcement mode other than [`GlobalEnforcingType::Default`],
//! 2. the rule registered for the cell's column,
//! 3. inference from the primitive and the cell's number format.
//!
//! Rows before [`ReaderOptions::enforcing_start_row`] only get inference, so
//! header rows keep their literal types. A conversion that fails leaves the
//! inferred value in place.

use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;
use std::sync::Arc;

use chrono::{NaiveDateTime, NaiveTime};

use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::xlsx::cell::CellValue;
use crate::ooxml::xlsx::date_utils::{serial_to_datetime, serial_to_time};
use crate::ooxml::xlsx::format::TextRun;
use crate::ooxml::xlsx::plugin::PluginRegistry;
use crate::ooxml::xlsx::styles::number_format::{is_date_format, is_time_format};

/// Default pattern for dates rendered as text.
pub const DEFAULT_DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Default pattern for times rendered as text.
pub const DEFAULT_TIME_SPAN_FORMAT: &str = "%H:%M:%S";

/// Workbook-wide conversion applied before any column rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GlobalEnforcingType {
    #[default]
    Default,
    AllNumbersToDouble,
    AllNumbersToDecimal,
    /// Numbers are rounded to the nearest `Int`, halves away from zero
    AllNumbersToInt,
    EverythingToString,
}

/// Conversion applied to every cell of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// `Int` when integral, `Float` otherwise
    Numeric,
    Double,
    Decimal,
    Date,
    Time,
    Bool,
    String,
}

/// Primitive stored in a cell record, before coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Empty,
    Bool(bool),
    /// Numeric text exactly as stored
    Number(String),
    Text(String),
    RichText(Vec<TextRun>),
}

/// Settings for one read operation.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    pub global_enforcing_type: GlobalEnforcingType,
    /// Rules keyed by zero-based column index
    pub enforced_column_types: BTreeMap<u32, ColumnType>,
    /// Keep date-formatted numbers numeric
    pub enforce_date_times_as_numbers: bool,
    /// Read empty cells as empty text
    pub enforce_empty_values_as_string: bool,
    /// Fail on malformed content instead of skipping it
    pub enforce_strict_validation: bool,
    /// First zero-based row the enforcement rules apply to
    pub enforcing_start_row: u32,
    /// `chrono` pattern used when dates are read as text
    pub date_time_format: String,
    /// `chrono` pattern used when times are read as text
    pub time_span_format: String,
    /// Drop protection hashes with unknown algorithms instead of failing
    pub ignore_not_supported_password_algorithms: bool,
    /// Registry to take reader plugins from; the process-wide registry when `None`
    pub plugins: Option<Arc<PluginRegistry>>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            global_enforcing_type: GlobalEnforcingType::Default,
            enforced_column_types: BTreeMap::new(),
            enforce_date_times_as_numbers: false,
            enforce_empty_values_as_string: false,
            enforce_strict_validation: false,
            enforcing_start_row: 0,
            date_time_format: DEFAULT_DATE_TIME_FORMAT.to_string(),
            time_span_format: DEFAULT_TIME_SPAN_FORMAT.to_string(),
            ignore_not_supported_password_algorithms: false,
            plugins: None,
        }
    }
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_global_enforcing_type(mut self, mode: GlobalEnforcingType) -> Self {
        self.global_enforcing_type = mode;
        self
    }

    pub fn with_column_type(mut self, column: u32, column_type: ColumnType) -> Self {
        self.enforced_column_types.insert(column, column_type);
        self
    }

    pub fn with_date_times_as_numbers(mut self, enabled: bool) -> Self {
        self.enforce_date_times_as_numbers = enabled;
        self
    }

    pub fn with_empty_values_as_string(mut self, enabled: bool) -> Self {
        self.enforce_empty_values_as_string = enabled;
        self
    }

    pub fn with_strict_validation(mut self, enabled: bool) -> Self {
        self.enforce_strict_validation = enabled;
        self
    }

    pub fn with_enforcing_start_row(mut self, row: u32) -> Self {
        self.enforcing_start_row = row;
        self
    }

    pub fn with_date_time_format(mut self, pattern: impl Into<String>) -> Self {
        self.date_time_format = pattern.into();
        self
    }

    pub fn with_time_span_format(mut self, pattern: impl Into<String>) -> Self {
        self.time_span_format = pattern.into();
        self
    }

    pub fn with_ignore_not_supported_password_algorithms(mut self, enabled: bool) -> Self {
        self.ignore_not_supported_password_algorithms = enabled;
        self
    }

    pub fn with_plugins(mut self, registry: PluginRegistry) -> Self {
        self.plugins = Some(Arc::new(registry));
        self
    }

    /// Skip malformed content with a warning, or fail in strict mode.
    pub(crate) fn tolerate(&self, message: impl Into<String>) -> Result<()> {
        let message = message.into();
        if self.enforce_strict_validation {
            return Err(OoxmlError::malformed(message));
        }
        log::warn!("{}", message);
        Ok(())
    }

    /// Type a stored primitive.
    ///
    /// `number_format` is the format code of the cell's style, if any.
    pub fn coerce(
        &self,
        row: u32,
        column: u32,
        raw: RawValue,
        number_format: Option<&str>,
    ) -> CellValue {
        if matches!(raw, RawValue::Empty) {
            return if self.enforce_empty_values_as_string {
                CellValue::Text(String::new())
            } else {
                CellValue::Empty
            };
        }
        if row < self.enforcing_start_row {
            return self.infer(raw, number_format);
        }

        match self.global_enforcing_type {
            GlobalEnforcingType::Default => {},
            GlobalEnforcingType::EverythingToString => {
                let inferred = self.infer(raw, number_format);
                return CellValue::Text(self.display(&inferred));
            },
            mode => return self.enforce_global(mode, raw, number_format),
        }

        match self.enforced_column_types.get(&column) {
            Some(&column_type) => self.enforce_column(column_type, raw, number_format),
            None => self.infer(raw, number_format),
        }
    }

    fn enforce_global(
        &self,
        mode: GlobalEnforcingType,
        raw: RawValue,
        number_format: Option<&str>,
    ) -> CellValue {
        let RawValue::Number(text) = &raw else {
            return self.infer(raw, number_format);
        };
        let converted = match mode {
            GlobalEnforcingType::AllNumbersToDouble => parse_float(text).map(CellValue::Float),
            GlobalEnforcingType::AllNumbersToDecimal => {
                parse_float(text).map(|_| CellValue::Decimal(text.trim().to_string()))
            },
            GlobalEnforcingType::AllNumbersToInt => parse_rounded(text).map(CellValue::Int),
            _ => None,
        };
        converted.unwrap_or_else(|| self.infer(raw, number_format))
    }

    fn enforce_column(
        &self,
        column_type: ColumnType,
        raw: RawValue,
        number_format: Option<&str>,
    ) -> CellValue {
        let converted = match (column_type, &raw) {
            (ColumnType::String, _) => {
                let inferred = self.infer(raw.clone(), number_format);
                Some(CellValue::Text(self.display(&inferred)))
            },
            (ColumnType::Numeric, RawValue::Number(text) | RawValue::Text(text)) => {
                parse_number(text)
            },
            (ColumnType::Numeric, RawValue::Bool(b)) => Some(CellValue::Int(i64::from(*b))),
            (ColumnType::Double, RawValue::Number(text) | RawValue::Text(text)) => {
                parse_float(text).map(CellValue::Float)
            },
            (ColumnType::Double, RawValue::Bool(b)) => Some(CellValue::Float(f64::from(u8::from(*b)))),
            (ColumnType::Decimal, RawValue::Number(text) | RawValue::Text(text)) => {
                parse_float(text).map(|_| CellValue::Decimal(text.trim().to_string()))
            },
            (ColumnType::Date, RawValue::Number(text)) => parse_float(text)
                .and_then(|serial| serial_to_datetime(serial).ok())
                .map(CellValue::Date),
            (ColumnType::Date, RawValue::Text(text)) => {
                self.parse_date_text(text).map(CellValue::Date)
            },
            (ColumnType::Time, RawValue::Number(text)) => parse_float(text)
                .and_then(|serial| serial_to_time(serial).ok())
                .map(CellValue::Time),
            (ColumnType::Time, RawValue::Text(text)) => {
                NaiveTime::parse_from_str(text.trim(), &self.time_span_format)
                    .ok()
                    .map(CellValue::Time)
            },
            (ColumnType::Bool, RawValue::Bool(b)) => Some(CellValue::Bool(*b)),
            (ColumnType::Bool, RawValue::Number(text)) => {
                parse_float(text).map(|n| CellValue::Bool(n != 0.0))
            },
            (ColumnType::Bool, RawValue::Text(text)) => parse_bool_text(text).map(CellValue::Bool),
            _ => None,
        };

        converted.unwrap_or_else(|| {
            log::debug!("column rule {:?} does not apply to {:?}", column_type, raw);
            self.infer(raw, number_format)
        })
    }

    /// Best-effort typing from the primitive and its number format.
    fn infer(&self, raw: RawValue, number_format: Option<&str>) -> CellValue {
        match raw {
            RawValue::Empty => CellValue::Empty,
            RawValue::Bool(b) => CellValue::Bool(b),
            RawValue::Text(text) => CellValue::Text(text),
            RawValue::RichText(runs) => CellValue::RichText(runs),
            RawValue::Number(text) => {
                if !self.enforce_date_times_as_numbers
                    && let Some(code) = number_format
                    && is_date_format(code)
                    && let Some(serial) = parse_float(&text)
                {
                    let typed = if is_time_format(code) {
                        serial_to_time(serial).map(CellValue::Time)
                    } else {
                        serial_to_datetime(serial).map(CellValue::Date)
                    };
                    match typed {
                        Ok(value) => return value,
                        Err(e) => log::warn!("keeping '{}' numeric: {}", text, e),
                    }
                }
                parse_number(&text).unwrap_or(CellValue::Text(text))
            },
        }
    }

    fn parse_date_text(&self, text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        NaiveDateTime::parse_from_str(text, &self.date_time_format)
            .ok()
            .or_else(|| {
                chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .ok()
                    .map(|date| date.and_time(NaiveTime::MIN))
            })
    }

    /// Text form of an inferred value, using the configured date patterns.
    fn display(&self, value: &CellValue) -> String {
        match value {
            CellValue::Empty => String::new(),
            CellValue::Bool(true) => "TRUE".to_string(),
            CellValue::Bool(false) => "FALSE".to_string(),
            CellValue::Int(n) => itoa::Buffer::new().format(*n).to_string(),
            CellValue::Float(n) => n.to_string(),
            CellValue::Decimal(text) | CellValue::Text(text) | CellValue::Formula(text) => {
                text.clone()
            },
            CellValue::RichText(runs) => runs.iter().map(|r| r.text.as_str()).collect(),
            CellValue::Date(dt) => format_with(dt.format(&self.date_time_format), || {
                dt.format(DEFAULT_DATE_TIME_FORMAT).to_string()
            }),
            CellValue::Time(t) => format_with(t.format(&self.time_span_format), || {
                t.format(DEFAULT_TIME_SPAN_FORMAT).to_string()
            }),
        }
    }
}

/// Render a chrono value, falling back when the user pattern is invalid.
fn format_with(formatted: impl std::fmt::Display, fallback: impl FnOnce() -> String) -> String {
    let mut out = String::new();
    match write!(out, "{}", formatted) {
        Ok(()) => out,
        Err(_) => {
            log::warn!("invalid date pattern, using the default");
            fallback()
        },
    }
}

fn parse_float(text: &str) -> Option<f64> {
    fast_float2::parse::<f64, _>(text.trim())
        .ok()
        .filter(|n| n.is_finite())
}

/// Nearest integer, halves away from zero; `None` outside the `i64` range.
fn parse_rounded(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(n) = atoi_simd::parse::<i64, false, false>(text.as_bytes()) {
        return Some(n);
    }
    let n = parse_float(text)?.round();
    (n >= -9.223_372_036_854_775_808e18 && n < 9.223_372_036_854_775_808e18).then_some(n as i64)
}

fn parse_number(text: &str) -> Option<CellValue> {
    let text = text.trim();
    if let Ok(n) = atoi_simd::parse::<i64, false, false>(text.as_bytes()) {
        return Some(CellValue::Int(n));
    }
    parse_float(text).map(CellValue::Float)
}

fn parse_bool_text(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn number(text: &str) -> RawValue {
        RawValue::Number(text.to_string())
    }

    #[test]
    fn test_inference() {
        let options = ReaderOptions::default();
        assert_eq!(options.coerce(0, 0, number("42"), None), CellValue::Int(42));
        assert_eq!(options.coerce(0, 0, number("2.5"), None), CellValue::Float(2.5));
        assert_eq!(options.coerce(0, 0, RawValue::Bool(true), None), CellValue::Bool(true));
        assert_eq!(options.coerce(0, 0, RawValue::Empty, None), CellValue::Empty);
        assert_eq!(
            options.coerce(0, 0, number("45351"), Some("yyyy-mm-dd")),
            CellValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap().and_hms_opt(0, 0, 0).unwrap())
        );
        assert_eq!(
            options.coerce(0, 0, number("0.5"), Some("h:mm:ss")),
            CellValue::Time(NaiveTime::from_hms_opt(12, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_date_times_as_numbers() {
        let options = ReaderOptions::new().with_date_times_as_numbers(true);
        assert_eq!(options.coerce(0, 0, number("45351"), Some("yyyy-mm-dd")), CellValue::Int(45351));
    }

    #[test]
    fn test_unconvertible_date_stays_numeric() {
        let options = ReaderOptions::default();
        assert_eq!(options.coerce(0, 0, number("-3"), Some("yyyy-mm-dd")), CellValue::Int(-3));
    }

    #[test]
    fn test_global_mode_overrides_column_rule() {
        let options = ReaderOptions::new()
            .with_global_enforcing_type(GlobalEnforcingType::AllNumbersToDouble)
            .with_column_type(0, ColumnType::String);
        assert_eq!(options.coerce(0, 0, number("7"), None), CellValue::Float(7.0));
        // non-numeric cells fall through to inference, not to the column rule
        assert_eq!(
            options.coerce(0, 0, RawValue::Text("x".into()), None),
            CellValue::Text("x".into())
        );
    }

    #[test]
    fn test_global_numeric_modes() {
        let decimal = ReaderOptions::new().with_global_enforcing_type(GlobalEnforcingType::AllNumbersToDecimal);
        assert_eq!(
            decimal.coerce(0, 0, number("0.10"), None),
            CellValue::Decimal("0.10".into())
        );

        let int = ReaderOptions::new().with_global_enforcing_type(GlobalEnforcingType::AllNumbersToInt);
        assert_eq!(int.coerce(0, 0, number("3.0"), None), CellValue::Int(3));
        assert_eq!(int.coerce(0, 0, number("3.25"), None), CellValue::Int(3));
        assert_eq!(int.coerce(0, 0, number("2.5"), None), CellValue::Int(3));
        assert_eq!(int.coerce(0, 0, number("-2.5"), None), CellValue::Int(-3));
        assert_eq!(int.coerce(0, 0, number("1e300"), None), CellValue::Float(1e300));
    }

    #[test]
    fn test_everything_to_string() {
        let options = ReaderOptions::new()
            .with_global_enforcing_type(GlobalEnforcingType::EverythingToString)
            .with_date_time_format("%d/%m/%Y");
        assert_eq!(options.coerce(0, 0, number("12"), None), CellValue::Text("12".into()));
        assert_eq!(options.coerce(0, 0, RawValue::Bool(false), None), CellValue::Text("FALSE".into()));
        assert_eq!(
            options.coerce(0, 0, number("45351"), Some("m/d/yy")),
            CellValue::Text("29/02/2024".into())
        );
    }

    #[test]
    fn test_column_rules() {
        let options = ReaderOptions::new()
            .with_column_type(0, ColumnType::Double)
            .with_column_type(1, ColumnType::Bool)
            .with_column_type(2, ColumnType::Date)
            .with_column_type(3, ColumnType::Numeric)
            .with_column_type(4, ColumnType::Time);

        assert_eq!(options.coerce(1, 0, number("4"), None), CellValue::Float(4.0));
        assert_eq!(options.coerce(1, 1, number("0"), None), CellValue::Bool(false));
        assert_eq!(options.coerce(1, 1, RawValue::Text("TRUE".into()), None), CellValue::Bool(true));
        assert_eq!(
            options.coerce(1, 2, RawValue::Text("2024-02-29".into()), None),
            CellValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap().and_hms_opt(0, 0, 0).unwrap())
        );
        assert_eq!(options.coerce(1, 3, RawValue::Text(" 17 ".into()), None), CellValue::Int(17));
        assert_eq!(
            options.coerce(1, 4, number("0.25"), None),
            CellValue::Time(NaiveTime::from_hms_opt(6, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_failed_column_conversion_keeps_value() {
        let options = ReaderOptions::new().with_column_type(0, ColumnType::Numeric);
        assert_eq!(
            options.coerce(0, 0, RawValue::Text("n/a".into()), None),
            CellValue::Text("n/a".into())
        );
    }

    #[test]
    fn test_header_rows_skip_rules() {
        let options = ReaderOptions::new()
            .with_column_type(0, ColumnType::String)
            .with_enforcing_start_row(1);
        assert_eq!(options.coerce(0, 0, number("1"), None), CellValue::Int(1));
        assert_eq!(options.coerce(1, 0, number("1"), None), CellValue::Text("1".into()));
    }

    #[test]
    fn test_empty_values_as_string() {
        let options = ReaderOptions::new().with_empty_values_as_string(true);
        assert_eq!(options.coerce(0, 0, RawValue::Empty, None), CellValue::Text(String::new()));
    }

    #[test]
    fn test_tolerate() {
        assert!(ReaderOptions::default().tolerate("odd").is_ok());
        let err = ReaderOptions::new().with_strict_validation(true).tolerate("odd").unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn test_invalid_pattern_falls_back() {
        let options = ReaderOptions::new()
            .with_column_type(0, ColumnType::String)
            .with_time_span_format("%Q");
        assert_eq!(
            options.coerce(0, 0, number("0.5"), Some("hh:mm")),
            CellValue::Text("12:00:00".into())
        );
    }
}
