//! Style reconstruction for workbooks being read.
//!
//! [`StyleReaderContainer`] keeps the decoded style table in file order and
//! rebuilds complete [`Style`] values for cells that reference a style index.
//!
//! # Example
//!
//! ```rust
//! use kumquat::ooxml::xlsx::styles::StyleReaderContainer;
//!
//! let xml = br#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
//!   <cellXfs count="1"><xf numFmtId="14" fontId="0" fillId="0" borderId="0"/></cellXfs>
//! </styleSheet>"#;
//! let styles = StyleReaderContainer::parse(xml)?;
//! assert!(styles.is_date_style(0));
//! # Ok::<(), kumquat::ooxml::OoxmlError>(())
//! ```

pub mod number_format;
mod parser;

pub(crate) use parser::parse_font_body;

use indexmap::IndexMap;

use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::xlsx::format::{Border, CellXf, Color, Fill, Font, NumberFormat, Style};
use number_format::{FIRST_CUSTOM_FORMAT_ID, builtin_format_code, is_builtin_date_id, is_builtin_time_id, is_date_format, is_time_format};

/// Decoded style table of a workbook.
#[derive(Debug, Default, Clone)]
pub struct StyleReaderContainer {
    /// Custom number formats in file order (ID -> format code)
    pub(crate) number_formats: IndexMap<u32, String>,
    pub(crate) fonts: Vec<Font>,
    pub(crate) fills: Vec<Fill>,
    pub(crate) borders: Vec<Border>,
    pub(crate) cell_xfs: Vec<CellXf>,
    /// Most recently used colors
    pub(crate) mru_colors: Vec<Color>,
}

impl StyleReaderContainer {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `styles.xml` part.
    pub fn parse(content: &[u8]) -> Result<Self> {
        parser::parse_styles(content)
    }

    #[inline]
    pub fn font(&self, index: usize) -> Option<&Font> {
        self.fonts.get(index)
    }

    #[inline]
    pub fn fill(&self, index: usize) -> Option<&Fill> {
        self.fills.get(index)
    }

    #[inline]
    pub fn border(&self, index: usize) -> Option<&Border> {
        self.borders.get(index)
    }

    /// Style record at a position of `cellXfs`.
    #[inline]
    pub fn cell_xf(&self, index: usize) -> Option<&CellXf> {
        self.cell_xfs.get(index)
    }

    /// Number format by ID: custom formats first, then the built-in range.
    ///
    /// A custom-range ID that the file does not define is an error.
    pub fn number_format(&self, id: u32) -> Result<NumberFormat> {
        if let Some(code) = self.number_formats.get(&id) {
            return Ok(NumberFormat::Custom(code.clone()));
        }
        if id < FIRST_CUSTOM_FORMAT_ID {
            return Ok(NumberFormat::Builtin(id));
        }
        Err(OoxmlError::Style(format!("number format {} is not defined", id)))
    }

    /// Format code for an ID, when one is known.
    pub fn format_code(&self, id: u32) -> Option<&str> {
        self.number_formats
            .get(&id)
            .map(String::as_str)
            .or_else(|| builtin_format_code(id))
    }

    /// Custom number formats in file order.
    pub fn custom_number_formats(&self) -> impl Iterator<Item = (u32, &str)> {
        self.number_formats.iter().map(|(id, code)| (*id, code.as_str()))
    }

    #[inline]
    pub fn mru_colors(&self) -> &[Color] {
        &self.mru_colors
    }

    #[inline]
    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }

    #[inline]
    pub fn fill_count(&self) -> usize {
        self.fills.len()
    }

    #[inline]
    pub fn border_count(&self) -> usize {
        self.borders.len()
    }

    #[inline]
    pub fn style_count(&self) -> usize {
        self.cell_xfs.len()
    }

    /// Rebuild the complete style at a `cellXfs` position.
    ///
    /// Returns `Ok(None)` for an index past the table. Missing font, fill or
    /// border entries are replaced by defaults; an undefined custom number
    /// format is an error.
    pub fn resolve_style(&self, index: usize) -> Result<Option<Style>> {
        let Some(xf) = self.cell_xfs.get(index) else {
            return Ok(None);
        };

        let font = self.font(xf.font_id).cloned().unwrap_or_else(|| {
            log::warn!("style {} references missing font {}", index, xf.font_id);
            Font::default()
        });
        let fill = self.fill(xf.fill_id).cloned().unwrap_or_else(|| {
            log::warn!("style {} references missing fill {}", index, xf.fill_id);
            Fill::default()
        });
        let border = self.border(xf.border_id).cloned().unwrap_or_else(|| {
            log::warn!("style {} references missing border {}", index, xf.border_id);
            Border::default()
        });

        Ok(Some(Style {
            font,
            fill,
            border,
            number_format: self.number_format(xf.num_fmt_id)?,
            alignment: xf.alignment.clone(),
        }))
    }

    /// Whether cells with this style hold dates or times.
    pub fn is_date_style(&self, index: usize) -> bool {
        let Some(xf) = self.cell_xfs.get(index) else {
            return false;
        };
        match self.number_formats.get(&xf.num_fmt_id) {
            Some(code) => is_date_format(code),
            None => is_builtin_date_id(xf.num_fmt_id),
        }
    }

    /// Whether cells with this style hold a time of day only.
    pub fn is_time_style(&self, index: usize) -> bool {
        let Some(xf) = self.cell_xfs.get(index) else {
            return false;
        };
        match self.number_formats.get(&xf.num_fmt_id) {
            Some(code) => is_time_format(code),
            None => is_builtin_time_id(xf.num_fmt_id),
        }
    }
}
