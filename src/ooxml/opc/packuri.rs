/// Pack URIs: absolute part names inside a spreadsheet package.
///
/// A part name always starts with a forward slash (`/xl/workbook.xml`); the ZIP
/// member name is the same path without the slash.
use crate::ooxml::opc::error::{OpcError, Result};

/// The package pseudo-partname, representing the package itself
pub const PACKAGE_URI: &str = "/";

/// The URI for the [Content_Types].xml part
pub const CONTENT_TYPES_URI: &str = "/[Content_Types].xml";

/// An absolute part name within the package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackURI {
    uri: String,
}

impl PackURI {
    /// Create a PackURI; the string must begin with a forward slash.
    pub fn new(uri: impl Into<String>) -> Result<Self> {
        let uri = uri.into();
        if !uri.starts_with('/') {
            return Err(OpcError::InvalidPackUri(format!(
                "part name must begin with '/', got '{}'",
                uri
            )));
        }
        Ok(Self { uri })
    }

    /// Create a PackURI from a ZIP member name or a path relative to the package root.
    pub fn from_member(member: &str) -> Result<Self> {
        Self::new(format!("/{}", member.trim_start_matches('/')))
    }

    /// Resolve a relationship target against the directory of its source part.
    ///
    /// `("/xl", "worksheets/sheet1.xml")` gives `/xl/worksheets/sheet1.xml` and
    /// `("/xl", "../docProps/app.xml")` gives `/docProps/app.xml`. Targets that are
    /// already absolute are taken as-is.
    pub fn from_rel_ref(base_uri: &str, relative_ref: &str) -> Result<Self> {
        if relative_ref.starts_with('/') {
            return Self::new(normalize(relative_ref));
        }
        let joined = if base_uri.ends_with('/') {
            format!("{}{}", base_uri, relative_ref)
        } else {
            format!("{}/{}", base_uri, relative_ref)
        };
        Self::new(normalize(&joined))
    }

    /// Directory portion, e.g. `/xl/worksheets` for `/xl/worksheets/sheet1.xml`.
    pub fn base_uri(&self) -> &str {
        match self.uri.rfind('/') {
            Some(0) | None => "/",
            Some(pos) => &self.uri[..pos],
        }
    }

    /// Filename portion; empty for the package pseudo-partname.
    pub fn filename(&self) -> &str {
        self.uri.rsplit('/').next().unwrap_or("")
    }

    /// Extension without the leading period.
    pub fn ext(&self) -> &str {
        let filename = self.filename();
        filename.rfind('.').map_or("", |pos| &filename[pos + 1..])
    }

    /// ZIP member name (leading slash stripped).
    #[inline]
    pub fn membername(&self) -> &str {
        &self.uri[1..]
    }

    /// Reference to this part as written in a relationship file located under `base_uri`.
    pub fn relative_ref(&self, base_uri: &str) -> String {
        if base_uri == "/" {
            return self.membername().to_string();
        }

        let from: Vec<&str> = base_uri.split('/').filter(|s| !s.is_empty()).collect();
        let to: Vec<&str> = self.uri.split('/').filter(|s| !s.is_empty()).collect();
        let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

        let mut parts: Vec<&str> = vec![".."; from.len() - common];
        parts.extend_from_slice(&to[common..]);
        parts.join("/")
    }

    /// The `.rels` part holding this part's relationships.
    ///
    /// `/_rels/.rels` for the package, `/xl/_rels/workbook.xml.rels` for the workbook.
    pub fn rels_uri(&self) -> Result<PackURI> {
        let base = self.base_uri();
        if base == "/" {
            Self::new(format!("/_rels/{}.rels", self.filename()))
        } else {
            Self::new(format!("{}/_rels/{}.rels", base, self.filename()))
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.uri
    }
}

/// Resolve `.` and `..` segments of an absolute path.
fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                segments.pop();
            },
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

impl std::fmt::Display for PackURI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uri)
    }
}

impl AsRef<str> for PackURI {
    fn as_ref(&self) -> &str {
        &self.uri
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packuri_new() {
        assert!(PackURI::new("/xl/workbook.xml").is_ok());
        assert!(PackURI::new("xl/workbook.xml").is_err());
        assert_eq!(PackURI::from_member("xl/styles.xml").unwrap().as_str(), "/xl/styles.xml");
    }

    #[test]
    fn test_components() {
        let uri = PackURI::new("/xl/worksheets/sheet1.xml").unwrap();
        assert_eq!(uri.base_uri(), "/xl/worksheets");
        assert_eq!(uri.filename(), "sheet1.xml");
        assert_eq!(uri.ext(), "xml");
        assert_eq!(uri.membername(), "xl/worksheets/sheet1.xml");

        let root = PackURI::new(PACKAGE_URI).unwrap();
        assert_eq!(root.base_uri(), "/");
        assert_eq!(root.filename(), "");
    }

    #[test]
    fn test_rels_uri() {
        let root = PackURI::new(PACKAGE_URI).unwrap();
        assert_eq!(root.rels_uri().unwrap().as_str(), "/_rels/.rels");

        let wb = PackURI::new("/xl/workbook.xml").unwrap();
        assert_eq!(wb.rels_uri().unwrap().as_str(), "/xl/_rels/workbook.xml.rels");
    }

    #[test]
    fn test_relative_refs() {
        let sheet = PackURI::new("/xl/worksheets/sheet2.xml").unwrap();
        assert_eq!(sheet.relative_ref("/xl"), "worksheets/sheet2.xml");
        assert_eq!(sheet.relative_ref("/"), "xl/worksheets/sheet2.xml");

        let custom = PackURI::new("/customXml/item1.xml").unwrap();
        assert_eq!(custom.relative_ref("/xl"), "../customXml/item1.xml");

        assert_eq!(
            PackURI::from_rel_ref("/xl", "../customXml/item1.xml").unwrap(),
            custom
        );
        assert_eq!(
            PackURI::from_rel_ref("/xl", "/xl/worksheets/sheet2.xml").unwrap(),
            sheet
        );
    }
}
