/// Error types for spreadsheet package operations.
use thiserror::Error;

use crate::ooxml::opc::error::OpcError;

/// Result type for spreadsheet package operations.
pub type Result<T> = std::result::Result<T, OoxmlError>;

/// Boxed low-level cause carried by [`OoxmlError::Io`].
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for spreadsheet package operations.
///
/// Every failure of the archive, the XML layer or the underlying stream is
/// reported as [`OoxmlError::Io`] with the original error kept as its source.
#[derive(Error, Debug)]
pub enum OoxmlError {
    /// Stream, archive or XML failure; also raised for malformed input in strict mode
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: BoxedCause,
    },

    /// A value cannot be represented in the package (dates, non-finite numbers, names)
    #[error("Format error: {0}")]
    Format(String),

    /// Invalid style field or unresolvable number format
    #[error("Style error: {0}")]
    Style(String),

    /// Content the library recognizes but cannot process
    #[error("Unsupported content: {0}")]
    NotSupportedContent(String),

    /// A plugin failed during execution
    #[error("Plugin '{id}' failed: {source}")]
    Plugin {
        id: String,
        #[source]
        source: Box<OoxmlError>,
    },

    /// Invalid part or plugin registration
    #[error("Registry error: {0}")]
    Registry(String),
}

impl OoxmlError {
    /// Wrap a low-level error with a description of the failed operation.
    pub fn io(context: impl Into<String>, source: impl Into<BoxedCause>) -> Self {
        OoxmlError::Io {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Malformed input detected while validating strictly.
    pub fn malformed(message: impl Into<String>) -> Self {
        let message = message.into();
        OoxmlError::Io {
            context: "validating package content".to_string(),
            source: Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
        }
    }

    /// Attribute a plugin failure to the plugin's unique ID.
    pub(crate) fn plugin(id: &str, source: OoxmlError) -> Self {
        OoxmlError::Plugin {
            id: id.to_string(),
            source: Box::new(source),
        }
    }

    /// Check whether this error belongs to the I/O category.
    #[inline]
    pub fn is_io(&self) -> bool {
        matches!(self, OoxmlError::Io { .. })
    }
}

impl From<std::io::Error> for OoxmlError {
    fn from(err: std::io::Error) -> Self {
        OoxmlError::io("accessing the stream", err)
    }
}

impl From<zip::result::ZipError> for OoxmlError {
    fn from(err: zip::result::ZipError) -> Self {
        OoxmlError::io("accessing the archive", err)
    }
}

impl From<quick_xml::Error> for OoxmlError {
    fn from(err: quick_xml::Error) -> Self {
        OoxmlError::io("parsing XML", err)
    }
}

impl From<quick_xml::encoding::EncodingError> for OoxmlError {
    fn from(err: quick_xml::encoding::EncodingError) -> Self {
        OoxmlError::io("decoding XML text", err)
    }
}

impl From<quick_xml::events::attributes::AttrError> for OoxmlError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        OoxmlError::io("parsing XML attributes", err)
    }
}

impl From<OpcError> for OoxmlError {
    fn from(err: OpcError) -> Self {
        OoxmlError::io("processing the package", err)
    }
}

impl From<std::fmt::Error> for OoxmlError {
    fn from(err: std::fmt::Error) -> Self {
        OoxmlError::io("writing XML", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_io_keeps_cause() {
        let err = OoxmlError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(err.is_io());
        assert_eq!(err.source().map(|s| s.to_string()), Some("gone".to_string()));
    }

    #[test]
    fn test_malformed_is_io() {
        let err = OoxmlError::malformed("bad cell reference 'A0'");
        assert!(err.is_io());
        assert!(err.to_string().contains("bad cell reference"));
    }

    #[test]
    fn test_plugin_error_chain() {
        let err = OoxmlError::Plugin {
            id: "custom.part".to_string(),
            source: Box::new(OoxmlError::Format("bad".to_string())),
        };
        assert!(err.to_string().contains("custom.part"));
        assert!(err.source().is_some());
    }
}
