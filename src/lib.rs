//! Kumquat - assembly and reading of Excel (.xlsx) packages
//!
//! A workbook is written as a ZIP package of XML parts. While the worksheets
//! are rendered, cell styles and texts are deduplicated into a style table
//! and a shared-text table; every part then receives a relationship ID from
//! its position in a banded part registry, so the IDs of the fixed parts never
//! depend on how many sheets or plugin parts the package carries.
//!
//! # Features
//!
//! - **Style deduplication**: equal styles share one table entry
//! - **Shared-text table**: first-occurrence order, plain and rich entries
//! - **Part plugins**: replace built-in parts or add new ones by priority
//! - **Tolerant reading**: malformed content is skipped unless strict
//!   validation is requested
//! - **Cell typing**: global and per-column coercion rules on read
//!
//! # Example
//!
//! ```no_run
//! use kumquat::ooxml::xlsx::{ReaderOptions, Workbook};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut workbook = Workbook::new();
//! let sheet = workbook.add_worksheet("Data")?;
//! sheet.set_value(0, 0, "Name")?;
//! sheet.set_value(1, 0, "Kumquat")?;
//! let bytes = workbook.to_bytes()?;
//!
//! let options = ReaderOptions::new().with_enforcing_start_row(1);
//! let loaded = Workbook::from_bytes_with(bytes, &options)?;
//! println!("{:?}", loaded.worksheet(0).and_then(|s| s.value(1, 0)));
//! # Ok(())
//! # }
//! ```

/// Text sanitizing for XML output
pub mod common;

/// OOXML spreadsheet packages: OPC layer, document model, reader and writer
pub mod ooxml;

pub use ooxml::xlsx::{Workbook, Worksheet};
pub use ooxml::{OoxmlError, Result};
