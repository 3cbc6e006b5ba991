//! Package writer: serializes assembled parts into the ZIP container.
//!
//! The writer receives the rendered parts in their final order, writes the
//! [Content_Types].xml manifest first and then every entry as given.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::common::xml::escape_attribute;
use crate::ooxml::opc::constants::{content_type as ct, namespace};
use crate::ooxml::opc::error::Result;
use crate::ooxml::opc::packuri::{CONTENT_TYPES_URI, PackURI};
use crate::ooxml::opc::phys_pkg::PhysPkgWriter;

/// Builder for the [Content_Types].xml manifest.
///
/// Holds Default elements keyed by extension and Override elements keyed by part name.
#[derive(Debug, Clone)]
pub struct ContentTypes {
    defaults: BTreeMap<String, String>,
    overrides: BTreeMap<String, String>,
}

impl ContentTypes {
    /// Manifest with the standard `rels` and `xml` defaults.
    pub fn new() -> Self {
        let mut defaults = BTreeMap::new();
        defaults.insert("rels".to_string(), ct::OPC_RELATIONSHIPS.to_string());
        defaults.insert("xml".to_string(), ct::XML.to_string());
        Self {
            defaults,
            overrides: BTreeMap::new(),
        }
    }

    /// Add the content type of a part.
    ///
    /// A pair matching a registered default needs no entry; anything else gets an
    /// Override for the specific part name.
    pub fn add(&mut self, partname: &PackURI, content_type: &str) {
        if self.defaults.get(partname.ext()).map(String::as_str) == Some(content_type) {
            return;
        }
        self.overrides
            .insert(partname.to_string(), content_type.to_string());
    }

    /// Register a Default element for an extension (e.g. `png` → `image/png`).
    pub fn add_default(&mut self, ext: &str, content_type: &str) {
        self.defaults.insert(ext.to_string(), content_type.to_string());
    }

    /// Content type of a part name, if known.
    pub fn get(&self, partname: &PackURI) -> Option<&str> {
        self.overrides
            .get(partname.as_str())
            .or_else(|| self.defaults.get(partname.ext()))
            .map(String::as_str)
    }

    /// Generate the manifest XML, sorted by extension and part name.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(512 + self.overrides.len() * 160);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str(r#"<Types xmlns=""#);
        xml.push_str(namespace::OPC_CONTENT_TYPES);
        xml.push_str(r#"">"#);

        for (ext, content_type) in &self.defaults {
            xml.push_str(r#"<Default Extension=""#);
            xml.push_str(&escape_attribute(ext));
            xml.push_str(r#"" ContentType=""#);
            xml.push_str(&escape_attribute(content_type));
            xml.push_str(r#""/>"#);
        }

        for (partname, content_type) in &self.overrides {
            xml.push_str(r#"<Override PartName=""#);
            xml.push_str(&escape_attribute(partname));
            xml.push_str(r#"" ContentType=""#);
            xml.push_str(&escape_attribute(content_type));
            xml.push_str(r#""/>"#);
        }

        xml.push_str("</Types>");
        xml
    }
}

impl Default for ContentTypes {
    fn default() -> Self {
        Self::new()
    }
}

/// Package writer that serializes entries to a ZIP archive.
pub struct PackageWriter;

impl PackageWriter {
    /// Serialize the manifest followed by every entry, in order.
    pub fn to_bytes(
        content_types: &ContentTypes,
        entries: &IndexMap<PackURI, Vec<u8>>,
        deflate: bool,
    ) -> Result<Vec<u8>> {
        let mut phys_writer = PhysPkgWriter::with_compression(deflate);

        let content_types_uri = PackURI::new(CONTENT_TYPES_URI)?;
        phys_writer.write(&content_types_uri, content_types.to_xml().as_bytes())?;

        for (uri, blob) in entries {
            phys_writer.write(uri, blob)?;
        }

        phys_writer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::phys_pkg::PhysPkgReader;

    #[test]
    fn test_content_types_xml() {
        let mut cti = ContentTypes::new();
        cti.add_default("png", "image/png");
        cti.add(
            &PackURI::new("/xl/workbook.xml").unwrap(),
            ct::SML_SHEET_MAIN,
        );
        // Matches the xml default, no override needed
        cti.add(&PackURI::new("/customXml/item1.xml").unwrap(), ct::XML);

        let xml = cti.to_xml();
        assert!(xml.contains(r#"<Default Extension="png" ContentType="image/png"/>"#));
        assert!(xml.contains(r#"<Override PartName="/xl/workbook.xml""#));
        assert!(!xml.contains("customXml"));
        assert_eq!(
            cti.get(&PackURI::new("/customXml/item1.xml").unwrap()),
            Some(ct::XML)
        );
    }

    #[test]
    fn test_manifest_written_first() {
        let mut entries = IndexMap::new();
        entries.insert(PackURI::new("/xl/workbook.xml").unwrap(), b"<workbook/>".to_vec());
        let bytes = PackageWriter::to_bytes(&ContentTypes::new(), &entries, true).unwrap();

        let reader = PhysPkgReader::from_bytes(bytes).unwrap();
        assert_eq!(reader.member_names(), ["[Content_Types].xml", "xl/workbook.xml"]);
    }
}
