//! Built-in number formats and date/time format detection.

/// First ID available to custom number formats; lower IDs are built-in.
pub const FIRST_CUSTOM_FORMAT_ID: u32 = 164;

/// Built-in format used for dates written without an explicit format.
pub const DEFAULT_DATE_FORMAT_ID: u32 = 22;

/// Built-in format used for times written without an explicit format.
pub const DEFAULT_TIME_FORMAT_ID: u32 = 21;

static BUILTIN_FORMATS: phf::Map<u32, &'static str> = phf::phf_map! {
    0u32 => "General",
    1u32 => "0",
    2u32 => "0.00",
    3u32 => "#,##0",
    4u32 => "#,##0.00",
    9u32 => "0%",
    10u32 => "0.00%",
    11u32 => "0.00E+00",
    12u32 => "# ?/?",
    13u32 => "# ??/??",
    14u32 => "mm-dd-yy",
    15u32 => "d-mmm-yy",
    16u32 => "d-mmm",
    17u32 => "mmm-yy",
    18u32 => "h:mm AM/PM",
    19u32 => "h:mm:ss AM/PM",
    20u32 => "h:mm",
    21u32 => "h:mm:ss",
    22u32 => "m/d/yy h:mm",
    37u32 => "#,##0 ;(#,##0)",
    38u32 => "#,##0 ;[Red](#,##0)",
    39u32 => "#,##0.00;(#,##0.00)",
    40u32 => "#,##0.00;[Red](#,##0.00)",
    45u32 => "mm:ss",
    46u32 => "[h]:mm:ss",
    47u32 => "mmss.0",
    48u32 => "##0.0E+0",
    49u32 => "@",
};

/// Format code of a built-in number format.
///
/// IDs below 164 without a published code (5-8, 23-36, 41-44, 50-163) are
/// locale-dependent and return `None`.
pub fn builtin_format_code(id: u32) -> Option<&'static str> {
    BUILTIN_FORMATS.get(&id).copied()
}

/// Whether a built-in ID denotes a date or time format.
#[inline]
pub fn is_builtin_date_id(id: u32) -> bool {
    matches!(id, 14..=22 | 27..=36 | 45..=47 | 50..=58)
}

/// Whether a built-in ID denotes a pure time (no date part).
#[inline]
pub fn is_builtin_time_id(id: u32) -> bool {
    matches!(id, 18..=21 | 45..=47)
}

/// Check if a format code represents a date/time format.
///
/// Only the first section is examined. Quoted literals, escaped characters and
/// bracketed modifiers (colors, locales) are skipped. Elapsed-time formats such
/// as `[h]:mm:ss` are durations and are not reported as dates.
pub fn is_date_format(format: &str) -> bool {
    let mut escaped = false;
    let mut in_quote = false;
    let mut depth = 0u8;
    let mut prev = ' ';
    let mut elapsed = false;
    let mut am_pm = false;

    for c in format.chars() {
        if escaped {
            escaped = false;
            prev = c;
            continue;
        }
        if in_quote {
            in_quote = c != '"';
            prev = c;
            continue;
        }
        match c {
            '_' | '\\' => escaped = true,
            '"' => in_quote = true,
            ';' => return false,
            '[' => depth += 1,
            ']' if depth == 1 && elapsed => return false,
            ']' => depth = depth.saturating_sub(1),
            'a' | 'A' if depth == 0 && !am_pm => am_pm = true,
            'p' | 'P' | 'm' | 'M' | '/' if depth == 0 && am_pm => return true,
            'd' | 'D' | 'm' | 'M' | 'h' | 'H' | 'y' | 'Y' | 's' | 'S' if depth == 0 => {
                return true;
            },
            _ if elapsed && c.eq_ignore_ascii_case(&prev) => {},
            _ => elapsed = prev == '[' && matches!(c, 'h' | 'H' | 'm' | 'M' | 's' | 'S'),
        }
        prev = c;
    }
    false
}

/// Check if a date format shows only a time of day (no year or day component).
pub fn is_time_format(format: &str) -> bool {
    if !is_date_format(format) {
        return false;
    }
    let mut in_quote = false;
    let mut depth = 0u8;
    for c in format.split(';').next().unwrap_or_default().chars() {
        match c {
            '"' => in_quote = !in_quote,
            '[' if !in_quote => depth += 1,
            ']' if !in_quote => depth = depth.saturating_sub(1),
            'y' | 'Y' | 'd' | 'D' if !in_quote && depth == 0 => return false,
            _ => {},
        }
    }
    true
}
