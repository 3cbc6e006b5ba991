/// Relationship files (`.rels`) of a spreadsheet package.
///
/// On write the collection is built from the finalized part list, so each
/// relationship ID is the part's global sorted position. On read it is parsed
/// from the package and used to locate the workbook, sheets, styles and shared
/// strings.
use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::common::xml::escape_attribute;
use crate::ooxml::opc::constants::namespace;
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::PackURI;

/// A single relationship from a source part to a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    r_id: String,
    reltype: String,
    target_ref: String,
    is_external: bool,
}

impl Relationship {
    pub fn new(
        r_id: impl Into<String>,
        reltype: impl Into<String>,
        target_ref: impl Into<String>,
        is_external: bool,
    ) -> Self {
        Self {
            r_id: r_id.into(),
            reltype: reltype.into(),
            target_ref: target_ref.into(),
            is_external,
        }
    }

    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    #[inline]
    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    /// Target as written in the file, relative to the source directory.
    #[inline]
    pub fn target_ref(&self) -> &str {
        &self.target_ref
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        self.is_external
    }
}

/// Relationships of one source part, in document order.
#[derive(Debug, Clone)]
pub struct Relationships {
    /// Directory of the source part, used to resolve targets
    base_uri: String,
    rels: IndexMap<String, Relationship>,
}

impl Relationships {
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            rels: IndexMap::new(),
        }
    }

    /// Add a relationship; a later relationship with the same ID replaces the earlier one.
    pub fn add(&mut self, rel: Relationship) {
        self.rels.insert(rel.r_id.clone(), rel);
    }

    #[inline]
    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.rels.get(r_id)
    }

    /// First relationship of the given type.
    pub fn first_of_type(&self, reltype: &str) -> Option<&Relationship> {
        self.rels.values().find(|rel| rel.reltype == reltype)
    }

    /// Absolute part name of an internal relationship's target.
    pub fn target_partname(&self, rel: &Relationship) -> Result<PackURI> {
        if rel.is_external {
            return Err(OpcError::InvalidRelationship(format!(
                "relationship {} points outside the package",
                rel.r_id
            )));
        }
        PackURI::from_rel_ref(&self.base_uri, &rel.target_ref)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    /// Serialize to a `.rels` document, in insertion order.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(256 + self.rels.len() * 160);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str(r#"<Relationships xmlns=""#);
        xml.push_str(namespace::OPC_RELATIONSHIPS);
        xml.push_str(r#"">"#);

        for rel in self.rels.values() {
            xml.push_str(r#"<Relationship Id=""#);
            xml.push_str(&escape_attribute(&rel.r_id));
            xml.push_str(r#"" Type=""#);
            xml.push_str(&escape_attribute(&rel.reltype));
            xml.push_str(r#"" Target=""#);
            xml.push_str(&escape_attribute(&rel.target_ref));
            xml.push('"');
            if rel.is_external {
                xml.push_str(r#" TargetMode="External""#);
            }
            xml.push_str("/>");
        }

        xml.push_str("</Relationships>");
        xml
    }

    /// Parse a `.rels` document belonging to a source part in `base_uri`.
    pub fn from_xml(content: &[u8], base_uri: impl Into<String>) -> Result<Self> {
        let mut rels = Self::new(base_uri);
        let mut reader = Reader::from_reader(content);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::with_capacity(512);

        loop {
            buf.clear();
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                    let mut r_id = None;
                    let mut reltype = None;
                    let mut target = None;
                    let mut external = false;

                    for attr in e.attributes() {
                        let attr = attr?;
                        let Ok(value) = attr.decode_and_unescape_value(reader.decoder()) else {
                            continue;
                        };
                        match attr.key.local_name().as_ref() {
                            b"Id" => r_id = Some(value.into_owned()),
                            b"Type" => reltype = Some(value.into_owned()),
                            b"Target" => target = Some(value.into_owned()),
                            b"TargetMode" => external = value == "External",
                            _ => {},
                        }
                    }

                    match (r_id, reltype, target) {
                        (Some(r_id), Some(reltype), Some(target)) => {
                            rels.add(Relationship::new(r_id, reltype, target, external));
                        },
                        _ => {
                            return Err(OpcError::InvalidRelationship(
                                "relationship without Id, Type or Target".to_string(),
                            ));
                        },
                    }
                },
                Event::Eof => break,
                _ => {},
            }
        }

        Ok(rels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::constants::relationship_type as rt;

    #[test]
    fn test_to_xml_keeps_order() {
        let mut rels = Relationships::new("/xl");
        rels.add(Relationship::new("rId4", rt::THEME, "theme/theme1.xml", false));
        rels.add(Relationship::new("rId2", rt::STYLES, "styles.xml", false));
        rels.add(Relationship::new("rId9", "urn:x", "https://example.com/?a=1&b=2", true));

        let xml = rels.to_xml();
        let theme = xml.find("rId4").unwrap();
        let styles = xml.find("rId2").unwrap();
        assert!(theme < styles);
        assert!(xml.contains(r#"Target="https://example.com/?a=1&amp;b=2" TargetMode="External""#));
    }

    #[test]
    fn test_parse_and_resolve() {
        let xml = br#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="/xl/styles.xml"/>
</Relationships>"#;

        let rels = Relationships::from_xml(xml, "/xl").unwrap();
        assert_eq!(rels.len(), 2);

        let sheet = rels.get("rId1").unwrap();
        assert_eq!(
            rels.target_partname(sheet).unwrap().as_str(),
            "/xl/worksheets/sheet1.xml"
        );
        let styles = rels.first_of_type(rt::STYLES).unwrap();
        assert_eq!(rels.target_partname(styles).unwrap().as_str(), "/xl/styles.xml");
    }

    #[test]
    fn test_round_trip() {
        let mut rels = Relationships::new("/");
        rels.add(Relationship::new("rId1", rt::OFFICE_DOCUMENT, "xl/workbook.xml", false));
        let parsed = Relationships::from_xml(rels.to_xml().as_bytes(), "/").unwrap();
        assert_eq!(parsed.get("rId1"), rels.get("rId1"));
    }
}
