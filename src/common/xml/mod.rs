//! XML helpers shared by the part writers and readers.

mod escape;

pub use escape::{
    escape_attribute, escape_attribute_utf16, escape_optional, escape_text, escape_text_utf16,
};
pub(crate) use escape::resolve_entity;
