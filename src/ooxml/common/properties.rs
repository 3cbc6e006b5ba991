//! Core document properties (`docProps/core.xml`).

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::common::xml::{escape_text, resolve_entity};
use crate::ooxml::error::Result;

const CORE_PROPERTIES_OPEN: &str = r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#;

/// Document metadata stored in the package's core properties part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentProperties {
    pub title: Option<String>,
    pub subject: Option<String>,
    /// Author
    pub creator: Option<String>,
    /// Comma-separated keywords
    pub keywords: Option<String>,
    pub description: Option<String>,
    pub last_modified_by: Option<String>,
    pub category: Option<String>,
    /// Status such as "Draft" or "Final"
    pub content_status: Option<String>,
    pub language: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

impl DocumentProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn subject(mut self, subject: &str) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    pub fn creator(mut self, creator: &str) -> Self {
        self.creator = Some(creator.to_string());
        self
    }

    pub fn keywords(mut self, keywords: &str) -> Self {
        self.keywords = Some(keywords.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn last_modified_by(mut self, name: &str) -> Self {
        self.last_modified_by = Some(name.to_string());
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn created(mut self, created: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self
    }

    pub fn modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified = Some(modified);
        self
    }

    /// Text properties with their qualified element names, in schema order.
    fn text_elements(&self) -> [(&'static str, &Option<String>); 9] {
        [
            ("dc:title", &self.title),
            ("dc:subject", &self.subject),
            ("dc:creator", &self.creator),
            ("cp:keywords", &self.keywords),
            ("dc:description", &self.description),
            ("cp:lastModifiedBy", &self.last_modified_by),
            ("cp:category", &self.category),
            ("cp:contentStatus", &self.content_status),
            ("dc:language", &self.language),
        ]
    }

    fn text_slot(&mut self, local_name: &[u8]) -> Option<&mut Option<String>> {
        match local_name {
            b"title" => Some(&mut self.title),
            b"subject" => Some(&mut self.subject),
            b"creator" => Some(&mut self.creator),
            b"keywords" => Some(&mut self.keywords),
            b"description" => Some(&mut self.description),
            b"lastModifiedBy" => Some(&mut self.last_modified_by),
            b"category" => Some(&mut self.category),
            b"contentStatus" => Some(&mut self.content_status),
            b"language" => Some(&mut self.language),
            _ => None,
        }
    }

    /// Generate the core properties part.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(1024);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str(CORE_PROPERTIES_OPEN);

        for (tag, value) in self.text_elements() {
            if let Some(value) = value {
                xml.push('<');
                xml.push_str(tag);
                xml.push('>');
                xml.push_str(&escape_text(value));
                xml.push_str("</");
                xml.push_str(tag);
                xml.push('>');
            }
        }

        for (tag, value) in [("dcterms:created", &self.created), ("dcterms:modified", &self.modified)] {
            if let Some(value) = value {
                xml.push('<');
                xml.push_str(tag);
                xml.push_str(r#" xsi:type="dcterms:W3CDTF">"#);
                xml.push_str(&value.to_rfc3339_opts(SecondsFormat::Secs, true));
                xml.push_str("</");
                xml.push_str(tag);
                xml.push('>');
            }
        }

        xml.push_str("</cp:coreProperties>");
        xml
    }

    /// Parse a core properties part. Unknown elements and unparseable dates are skipped.
    pub fn from_xml(content: &[u8]) -> Result<Self> {
        let mut props = Self::default();
        let mut reader = Reader::from_reader(content);
        let mut buf = Vec::with_capacity(512);
        let mut current: Option<Vec<u8>> = None;
        let mut text = String::new();

        loop {
            buf.clear();
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    current = Some(e.local_name().as_ref().to_vec());
                    text.clear();
                },
                Event::Text(t) if current.is_some() => text.push_str(&t.decode()?),
                Event::CData(t) if current.is_some() => {
                    text.push_str(&String::from_utf8_lossy(&t.into_inner()));
                },
                Event::GeneralRef(r) if current.is_some() => {
                    let name = r.decode()?;
                    if let Some(c) = resolve_entity(&name) {
                        text.push(c);
                    }
                },
                Event::End(_) => {
                    if let Some(name) = current.take() {
                        props.assign(&name, std::mem::take(&mut text));
                    }
                },
                Event::Eof => break,
                _ => {},
            }
        }

        Ok(props)
    }

    fn assign(&mut self, local_name: &[u8], value: String) {
        match local_name {
            b"created" | b"modified" => {
                let parsed = DateTime::parse_from_rfc3339(value.trim())
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| log::warn!("ignoring unparseable timestamp '{}': {}", value, e))
                    .ok();
                if local_name == b"created" {
                    self.created = parsed;
                } else {
                    self.modified = parsed;
                }
            },
            _ => {
                if let Some(slot) = self.text_slot(local_name) {
                    *slot = Some(value);
                }
            },
        }
    }
}
