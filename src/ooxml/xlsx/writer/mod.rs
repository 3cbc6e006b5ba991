//! Package writer: deduplicating caches, part generators and assembly.

mod assembly;
pub mod metadata;
mod options;
pub(crate) mod sheet;
pub mod strings;
pub mod styles;
pub mod theme;
pub(crate) mod workbook;

pub use assembly::{AssembledPackage, WriteContext};
pub(crate) use assembly::write_package;
pub use options::WriterOptions;
pub use strings::SharedStrings;
pub use styles::{StyleCache, StyleRef};
pub use theme::Theme;
