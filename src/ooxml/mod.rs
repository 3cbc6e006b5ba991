//! Office Open XML spreadsheet packages.
//!
//! The module is organized in layers:
//!
//! 1. **OPC layer** (`opc`): pack URIs, relationships, the banded part
//!    registry, the content-types manifest and the ZIP container
//! 2. **Shared parts** (`common`, `error`): document properties and errors
//! 3. **Workbooks** (`xlsx`): the document model, the writer with its style
//!    and shared-text tables, the reader and the plugin registry
pub mod common;
pub mod error;
pub mod opc;
pub mod xlsx;

pub use common::DocumentProperties;
pub use error::{OoxmlError, Result};
pub use opc::PackURI;
