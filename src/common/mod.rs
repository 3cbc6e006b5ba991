//! Common utilities shared across the package layers.

pub mod xml;
