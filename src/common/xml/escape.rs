//! XML text sanitizing for every string written into a package part.
//!
//! Spreadsheet consumers only accept characters that are legal in XML 1.0, so
//! the escapers here never fail: markup characters become named entities,
//! illegal control characters become a single space and characters outside the
//! Basic Multilingual Plane are written as numeric character references.

use std::borrow::Cow;

/// Replacement for characters XML 1.0 cannot carry.
const REPLACEMENT: char = ' ';

#[derive(Clone, Copy, PartialEq, Eq)]
enum Target {
    Text,
    Attribute,
}

/// Escape a string for use as element content.
///
/// Returns the input unchanged (and unallocated) when nothing needs escaping.
///
/// # Examples
///
/// ```
/// use kumquat::common::xml::escape_text;
/// assert_eq!(escape_text("a<b>c&d"), "a&lt;b&gt;c&amp;d");
/// assert_eq!(escape_text("\u{1}"), " ");
/// assert_eq!(escape_text("\u{1F600}"), "&#x1F600;");
/// ```
#[inline]
pub fn escape_text(s: &str) -> Cow<'_, str> {
    escape_str(s, Target::Text)
}

/// Escape a string for use inside a double-quoted attribute value.
///
/// Identical to [`escape_text`] except that `"` is escaped as well.
///
/// ```
/// use kumquat::common::xml::escape_attribute;
/// assert_eq!(escape_attribute(r#"say "hi""#), "say &quot;hi&quot;");
/// ```
#[inline]
pub fn escape_attribute(s: &str) -> Cow<'_, str> {
    escape_str(s, Target::Attribute)
}

/// Escape an optional string; `None` yields an empty string.
#[inline]
pub fn escape_optional(s: Option<&str>) -> Cow<'_, str> {
    match s {
        Some(s) => escape_text(s),
        None => Cow::Borrowed(""),
    }
}

/// Escape raw UTF-16 code units as element content.
///
/// This is the entry point for text that did not come from a Rust `str`, where
/// unpaired surrogates can occur. An unpaired surrogate is replaced with a space;
/// a valid pair is emitted as one numeric character reference.
pub fn escape_text_utf16(units: &[u16]) -> String {
    escape_units(units, Target::Text)
}

/// Escape raw UTF-16 code units as attribute content.
pub fn escape_attribute_utf16(units: &[u16]) -> String {
    escape_units(units, Target::Attribute)
}

/// Resolve the name of an entity reference (`amp`, `#x41`, `#65`, ...).
///
/// Used by the part readers, which receive entity references as separate events.
/// Returns `None` for unknown names and for code points that are not characters.
pub(crate) fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        },
    }
}

fn escape_str(s: &str, target: Target) -> Cow<'_, str> {
    let Some(first) = s.char_indices().find(|&(_, c)| needs_escape(c, target)).map(|(i, _)| i) else {
        return Cow::Borrowed(s);
    };

    let mut out = String::with_capacity(s.len() + 16);
    out.push_str(&s[..first]);
    for c in s[first..].chars() {
        push_escaped(&mut out, c, target);
    }
    Cow::Owned(out)
}

fn escape_units(units: &[u16], target: Target) -> String {
    let mut out = String::with_capacity(units.len() + 16);
    for decoded in char::decode_utf16(units.iter().copied()) {
        match decoded {
            Ok(c) => push_escaped(&mut out, c, target),
            Err(_) => out.push(REPLACEMENT),
        }
    }
    out
}

#[inline]
fn needs_escape(c: char, target: Target) -> bool {
    match c {
        '<' | '>' | '&' => true,
        '"' => target == Target::Attribute,
        _ => is_illegal(c) || is_supplementary(c),
    }
}

/// XML 1.0 forbids C0 controls other than tab, LF and CR, and the two BMP
/// non-characters above U+FFFD. Surrogates cannot appear in a `char`.
#[inline]
fn is_illegal(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}')
}

#[inline]
fn is_supplementary(c: char) -> bool {
    c as u32 > 0xFFFF
}

fn push_escaped(out: &mut String, c: char, target: Target) {
    match c {
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '&' => out.push_str("&amp;"),
        '"' if target == Target::Attribute => out.push_str("&quot;"),
        c if is_illegal(c) => out.push(REPLACEMENT),
        c if is_supplementary(c) => {
            use std::fmt::Write;
            // Writing into a String cannot fail.
            let _ = write!(out, "&#x{:X};", c as u32);
        },
        c => out.push(c),
    }
}
