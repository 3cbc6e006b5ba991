/// Open Packaging Conventions (OPC) layer for spreadsheet packages.
///
/// This module provides:
///
/// - Pack URIs and relationship files
/// - The banded part registry that fixes part order and relationship IDs
/// - The content-types manifest
/// - ZIP-based physical packaging
pub mod constants;
pub mod error;
pub mod packuri;
pub mod part_registry;
pub mod phys_pkg;
pub mod pkgwriter;
pub mod rel;

// Re-export commonly used types
pub use packuri::PackURI;
pub use part_registry::{Band, FinalizedPart, PartDescriptor, PartKind, PartRegistry};
pub use rel::{Relationship, Relationships};
