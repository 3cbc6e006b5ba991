//! Workbook: the root of the spreadsheet document model.
//!
//! ```no_run
//! use kumquat::ooxml::xlsx::Workbook;
//!
//! # fn main() -> kumquat::ooxml::Result<()> {
//! let mut wb = Workbook::new();
//! let ws = wb.add_worksheet("Sales")?;
//! ws.set_value(0, 0, "Region")?;
//! ws.set_value(0, 1, 1250.5)?;
//! wb.save("sales.xlsx")?;
//!
//! let loaded = Workbook::load("sales.xlsx")?;
//! assert_eq!(loaded.sheet_count(), 1);
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use crate::ooxml::common::DocumentProperties;
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::xlsx::protection::WorkbookProtection;
use crate::ooxml::xlsx::reader::{self, ReaderOptions};
use crate::ooxml::xlsx::worksheet::{Worksheet, validate_sheet_name};
use crate::ooxml::xlsx::writer::{self, WriterOptions};

/// An in-memory workbook.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Worksheet>,
    properties: DocumentProperties,
    protection: Option<WorkbookProtection>,
}

impl Workbook {
    /// Create an empty workbook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new, empty worksheet and return it for editing.
    ///
    /// The name must be non-blank, at most 31 characters, free of `\ / ? * [ ] :`
    /// and unique within the workbook (case-insensitively).
    pub fn add_worksheet(&mut self, name: &str) -> Result<&mut Worksheet> {
        self.push_worksheet(Worksheet::new(name))
    }

    /// Append an existing worksheet.
    pub fn push_worksheet(&mut self, worksheet: Worksheet) -> Result<&mut Worksheet> {
        self.check_new_name(worksheet.name())?;
        let index = self.sheets.len();
        self.sheets.push(worksheet);
        Ok(&mut self.sheets[index])
    }

    /// Rename the worksheet at `index`.
    pub fn rename_worksheet(&mut self, index: usize, name: &str) -> Result<()> {
        if index >= self.sheets.len() {
            return Err(OoxmlError::Format(format!("no worksheet at index {}", index)));
        }
        validate_sheet_name(name)?;
        let clash = self
            .sheets
            .iter()
            .enumerate()
            .any(|(i, s)| i != index && s.name().eq_ignore_ascii_case(name));
        if clash {
            return Err(OoxmlError::Format(format!("duplicate sheet name '{}'", name)));
        }
        self.sheets[index].set_name(name.to_string());
        Ok(())
    }

    /// Remove and return the worksheet at `index`.
    pub fn remove_worksheet(&mut self, index: usize) -> Option<Worksheet> {
        (index < self.sheets.len()).then(|| self.sheets.remove(index))
    }

    fn check_new_name(&self, name: &str) -> Result<()> {
        validate_sheet_name(name)?;
        if self.worksheet_by_name(name).is_some() {
            return Err(OoxmlError::Format(format!("duplicate sheet name '{}'", name)));
        }
        Ok(())
    }

    #[inline]
    pub fn worksheet(&self, index: usize) -> Option<&Worksheet> {
        self.sheets.get(index)
    }

    #[inline]
    pub fn worksheet_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.sheets.get_mut(index)
    }

    /// Look a worksheet up by name, ignoring ASCII case.
    pub fn worksheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.sheets.iter().find(|s| s.name().eq_ignore_ascii_case(name))
    }

    #[inline]
    pub fn worksheets(&self) -> &[Worksheet] {
        &self.sheets
    }

    pub fn worksheets_mut(&mut self) -> impl Iterator<Item = &mut Worksheet> {
        self.sheets.iter_mut()
    }

    #[inline]
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    #[inline]
    pub fn properties(&self) -> &DocumentProperties {
        &self.properties
    }

    #[inline]
    pub fn properties_mut(&mut self) -> &mut DocumentProperties {
        &mut self.properties
    }

    pub fn set_properties(&mut self, properties: DocumentProperties) {
        self.properties = properties;
    }

    #[inline]
    pub fn protection(&self) -> Option<&WorkbookProtection> {
        self.protection.as_ref()
    }

    pub fn set_protection(&mut self, protection: Option<WorkbookProtection>) {
        self.protection = protection;
    }

    /// Serialize the workbook into package bytes with default options.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.to_bytes_with(&WriterOptions::default())
    }

    pub fn to_bytes_with(&self, options: &WriterOptions) -> Result<Vec<u8>> {
        writer::write_package(self, options)
    }

    /// Save the workbook to a file with default options.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.save_with(path, &WriterOptions::default())
    }

    pub fn save_with<P: AsRef<Path>>(&self, path: P, options: &WriterOptions) -> Result<()> {
        let bytes = self.to_bytes_with(options)?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| OoxmlError::io(format!("writing {}", path.as_ref().display()), e))
    }

    /// Parse package bytes with default options.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_bytes_with(data, &ReaderOptions::default())
    }

    pub fn from_bytes_with(data: Vec<u8>, options: &ReaderOptions) -> Result<Self> {
        reader::read_package(data, options)
    }

    /// Load a workbook from a file with default options.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with(path, &ReaderOptions::default())
    }

    pub fn load_with<P: AsRef<Path>>(path: P, options: &ReaderOptions) -> Result<Self> {
        let data = std::fs::read(path.as_ref())
            .map_err(|e| OoxmlError::io(format!("reading {}", path.as_ref().display()), e))?;
        Self::from_bytes_with(data, options)
    }

    /// Save on the tokio runtime. Rendering happens on the calling task; only
    /// the file write is asynchronous.
    #[cfg(feature = "async")]
    pub async fn save_async<P: AsRef<Path>>(&self, path: P, options: &WriterOptions) -> Result<()> {
        let bytes = self.to_bytes_with(options)?;
        tokio::fs::write(path.as_ref(), bytes)
            .await
            .map_err(|e| OoxmlError::io(format!("writing {}", path.as_ref().display()), e))
    }

    /// Load on the tokio runtime. Only the file read is asynchronous.
    #[cfg(feature = "async")]
    pub async fn load_async<P: AsRef<Path>>(path: P, options: &ReaderOptions) -> Result<Self> {
        let data = tokio::fs::read(path.as_ref())
            .await
            .map_err(|e| OoxmlError::io(format!("reading {}", path.as_ref().display()), e))?;
        Self::from_bytes_with(data, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_worksheets() {
        let mut wb = Workbook::new();
        wb.add_worksheet("First").unwrap().set_value(0, 0, 1).unwrap();
        wb.add_worksheet("Second").unwrap();

        assert_eq!(wb.sheet_count(), 2);
        assert_eq!(wb.worksheet(1).unwrap().name(), "Second");
        assert_eq!(wb.worksheet_by_name("first").unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut wb = Workbook::new();
        wb.add_worksheet("Data").unwrap();
        assert!(matches!(wb.add_worksheet("DATA"), Err(OoxmlError::Format(_))));
        assert!(matches!(wb.add_worksheet("a:b"), Err(OoxmlError::Format(_))));
        assert_eq!(wb.sheet_count(), 1);
    }

    #[test]
    fn test_rename_and_remove() {
        let mut wb = Workbook::new();
        wb.add_worksheet("One").unwrap();
        wb.add_worksheet("Two").unwrap();

        assert!(wb.rename_worksheet(1, "one").is_err());
        wb.rename_worksheet(1, "Three").unwrap();
        assert_eq!(wb.worksheet(1).unwrap().name(), "Three");

        assert_eq!(wb.remove_worksheet(0).unwrap().name(), "One");
        assert!(wb.remove_worksheet(5).is_none());
        assert_eq!(wb.sheet_count(), 1);
    }

    #[test]
    fn test_empty_workbook_cannot_be_written() {
        assert!(matches!(Workbook::new().to_bytes(), Err(OoxmlError::Format(_))));
    }
}
