//! Parts shared by every package regardless of document type.

mod properties;

pub use properties::DocumentProperties;
