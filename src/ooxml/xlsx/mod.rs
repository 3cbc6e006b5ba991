//! Excel (.xlsx) workbooks.
//!
//! A [`Workbook`] holds worksheets of typed, optionally styled cells. Writing
//! turns it into a package: styles and texts are deduplicated into the style
//! and shared-text tables while the worksheets are rendered, and every part
//! receives a relationship ID from its position in the banded part registry.
//! Reading follows the relationship graph back and types each cell through
//! [`ReaderOptions`].
//!
//! # Example
//!
//! ```rust,no_run
//! use kumquat::ooxml::xlsx::{Font, Style, Workbook};
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.add_worksheet("Report")?;
//! sheet.set_value(0, 0, "Total")?;
//! sheet.set_value(0, 1, 1250.5)?;
//! sheet.set_style(0, 0, Style::new().with_font(Font::default().with_bold(true)))?;
//! workbook.save("report.xlsx")?;
//!
//! let loaded = Workbook::load("report.xlsx")?;
//! assert_eq!(loaded.sheet_count(), 1);
//! # Ok::<(), kumquat::ooxml::OoxmlError>(())
//! ```

pub mod cell;
pub mod date_utils;
pub mod format;
pub mod plugin;
pub mod protection;
pub mod reader;
pub mod styles;
pub mod workbook;
pub mod worksheet;
pub mod writer;

#[cfg(test)]
mod tests;

pub use cell::{Cell, CellAddress, CellValue};
pub use format::{
    Argb, Border, BorderSide, BorderStyle, CellAlignment, Color, Fill, Font, NumberFormat, PatternType,
    SharedText, Style, TextRun,
};
pub use plugin::{PluginDescriptor, PluginRegistry};
pub use protection::{
    LegacyPasswordHasher, PasswordHasher, Sha512PasswordHasher, SheetPermissions, SheetProtection,
    WorkbookProtection,
};
pub use reader::{ColumnType, GlobalEnforcingType, ReadContext, ReaderOptions};
pub use styles::StyleReaderContainer;
pub use workbook::Workbook;
pub use worksheet::{SheetState, Worksheet};
pub use writer::{StyleCache, StyleRef, WriterOptions};
