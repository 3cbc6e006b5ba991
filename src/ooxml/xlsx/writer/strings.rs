//! Shared-text table for XLSX workbooks.
//!
//! Text cells store an index into this table instead of the text itself.
//! Entries are compared exactly (case and whitespace significant) and keep the
//! order in which they were first added.

use std::fmt::Write as FmtWrite;

use indexmap::IndexSet;

use crate::common::xml::escape_text;
use crate::ooxml::error::Result;
use crate::ooxml::opc::constants::namespace;
use crate::ooxml::xlsx::format::{SharedText, TextRun};
use crate::ooxml::xlsx::writer::styles::write_font_properties;

/// Deduplicating shared-text table.
#[derive(Debug, Default, Clone)]
pub struct SharedStrings {
    entries: IndexSet<SharedText>,
    /// Number of `add` calls, emitted as the `count` attribute
    references: usize,
}

impl SharedStrings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add plain text and return its index.
    pub fn add(&mut self, text: &str) -> usize {
        self.add_text(SharedText::Plain(text.to_owned()))
    }

    /// Add a plain or rich entry and return its index.
    pub fn add_text(&mut self, text: SharedText) -> usize {
        self.references += 1;
        self.entries.insert_full(text).0
    }

    /// Entry at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&SharedText> {
        self.entries.get_index(index)
    }

    /// Number of distinct entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of cell references into the table.
    #[inline]
    pub fn total_references(&self) -> usize {
        self.references
    }

    /// Serialize the table; entries appear in insertion order.
    pub fn to_xml(&self) -> Result<String> {
        let mut xml = String::with_capacity(256 + self.entries.len() * 32);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        write!(
            xml,
            r#"<sst xmlns="{}" count="{}" uniqueCount="{}">"#,
            namespace::SML_MAIN,
            self.references,
            self.entries.len()
        )?;

        for entry in &self.entries {
            xml.push_str("<si>");
            match entry {
                SharedText::Plain(text) => write_text_element(&mut xml, text),
                SharedText::Rich(runs) => write_runs(&mut xml, runs)?,
            }
            xml.push_str("</si>");
        }

        xml.push_str("</sst>");
        Ok(xml)
    }
}

/// Write a `<t>` element, preserving leading and trailing whitespace.
pub(crate) fn write_text_element(xml: &mut String, text: &str) {
    if needs_space_preserve(text) {
        xml.push_str(r#"<t xml:space="preserve">"#);
    } else {
        xml.push_str("<t>");
    }
    xml.push_str(&escape_text(text));
    xml.push_str("</t>");
}

#[inline]
fn needs_space_preserve(text: &str) -> bool {
    text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace)
}

fn write_runs(xml: &mut String, runs: &[TextRun]) -> Result<()> {
    for run in runs {
        xml.push_str("<r>");
        if let Some(font) = &run.font {
            xml.push_str("<rPr>");
            write_font_properties(xml, font, "rFont")?;
            xml.push_str("</rPr>");
        }
        write_text_element(xml, &run.text);
        xml.push_str("</r>");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::ooxml::xlsx::format::Font;

    #[test]
    fn test_shared_strings() {
        let mut sst = SharedStrings::new();
        assert_eq!(sst.add("Hello"), 0);
        assert_eq!(sst.add("World"), 1);
        assert_eq!(sst.add("Hello"), 0);
        assert_eq!(sst.add("hello"), 2);
        assert_eq!(sst.len(), 3);
        assert_eq!(sst.total_references(), 4);
    }

    #[test]
    fn test_whitespace_is_significant() {
        let mut sst = SharedStrings::new();
        let space = sst.add(" ");
        let empty = sst.add("");
        assert_ne!(space, empty);
        assert_eq!(sst.add(" "), space);

        let xml = sst.to_xml().unwrap();
        assert!(xml.contains(r#"<si><t xml:space="preserve"> </t></si><si><t></t></si>"#));
    }

    #[test]
    fn test_rich_entries() {
        let mut sst = SharedStrings::new();
        let plain = sst.add("Total");
        let rich = sst.add_text(SharedText::Rich(vec![
            TextRun::new("Total", Some(Font::default().with_bold(true))),
            TextRun::new(" due", None),
        ]));
        assert_ne!(plain, rich);

        let xml = sst.to_xml().unwrap();
        assert!(xml.contains(r#"<r><rPr><b/><sz val="11"/><rFont val="Calibri"/>"#));
        assert!(xml.contains(r#"<r><t xml:space="preserve"> due</t></r>"#));
    }

    #[test]
    fn test_empty_table_xml() {
        let xml = SharedStrings::new().to_xml().unwrap();
        assert!(xml.ends_with(r#"count="0" uniqueCount="0"></sst>"#));
    }

    #[test]
    fn test_markup_is_escaped() {
        let mut sst = SharedStrings::new();
        sst.add("a < b & c");
        assert!(sst.to_xml().unwrap().contains("<t>a &lt; b &amp; c</t>"));
    }

    proptest! {
        #[test]
        fn prop_first_seen_order(values in prop::collection::vec("[ab ]{0,3}", 0..40)) {
            let mut sst = SharedStrings::new();
            let mut seen: Vec<String> = Vec::new();
            for value in &values {
                let index = sst.add(value);
                match seen.iter().position(|s| s == value) {
                    Some(pos) => prop_assert_eq!(index, pos),
                    None => {
                        prop_assert_eq!(index, seen.len());
                        seen.push(value.clone());
                    }
                }
            }
            prop_assert_eq!(sst.len(), seen.len());
            prop_assert_eq!(sst.total_references(), values.len());
            for (i, value) in seen.iter().enumerate() {
                prop_assert_eq!(sst.get(i), Some(&SharedText::Plain(value.clone())));
            }
        }
    }
}
