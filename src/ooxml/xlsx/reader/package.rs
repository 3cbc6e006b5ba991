//! Package reading.
//!
//! A read follows the relationship graph from the package root: package
//! relationships lead to the workbook, the workbook's relationships lead to
//! the styles, shared strings and worksheets. Reader plugins then run, inline
//! plugins once per worksheet and append plugins once at the end.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::options::ReaderOptions;
use super::shared_strings::parse_shared_strings;
use super::worksheet::{SheetSources, read_worksheet};
use crate::ooxml::common::DocumentProperties;
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::relationship_type as RT;
use crate::ooxml::opc::packuri::PACKAGE_URI;
use crate::ooxml::opc::phys_pkg::PhysPkgReader;
use crate::ooxml::opc::{PackURI, Relationships};
use crate::ooxml::xlsx::format::SharedText;
use crate::ooxml::xlsx::plugin::{PluginFactory, QueueId, default_registry};
use crate::ooxml::xlsx::protection::{WorkbookProtection, read_workbook_protection};
use crate::ooxml::xlsx::styles::StyleReaderContainer;
use crate::ooxml::xlsx::workbook::Workbook;
use crate::ooxml::xlsx::worksheet::{SheetState, Worksheet};

const DEFAULT_WORKBOOK_PATH: &str = "/xl/workbook.xml";

/// State handed to append reader plugins.
///
/// Gives access to the decoded workbook and to every raw archive entry,
/// including parts the reader itself does not understand.
pub struct ReadContext<'a> {
    workbook: Workbook,
    package: PhysPkgReader,
    options: &'a ReaderOptions,
}

impl<'a> ReadContext<'a> {
    #[inline]
    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    #[inline]
    pub fn workbook_mut(&mut self) -> &mut Workbook {
        &mut self.workbook
    }

    #[inline]
    pub fn options(&self) -> &'a ReaderOptions {
        self.options
    }

    /// Raw bytes of an archive entry such as `/custom/notes.xml`.
    pub fn part(&mut self, path: &str) -> Result<Option<Vec<u8>>> {
        let uri = PackURI::new(path)?;
        Ok(self.package.try_blob_for(&uri)?)
    }

    /// Names of all archive entries, without the leading slash.
    pub fn part_names(&self) -> Vec<String> {
        self.package.member_names()
    }

    /// Report malformed content: a warning, or an error in strict mode.
    pub fn tolerate(&self, message: impl Into<String>) -> Result<()> {
        self.options.tolerate(message)
    }
}

/// A `<sheet>` entry of the workbook part.
struct SheetEntry {
    name: String,
    state: SheetState,
    rel_id: Option<String>,
}

#[derive(Default)]
struct WorkbookManifest {
    sheets: Vec<SheetEntry>,
    protection: Option<WorkbookProtection>,
}

/// Read package bytes into a workbook.
pub(crate) fn read_package(data: Vec<u8>, options: &ReaderOptions) -> Result<Workbook> {
    let mut package = PhysPkgReader::from_bytes(data)?;

    let package_rels = match package.rels_xml_for(&PackURI::new(PACKAGE_URI)?)? {
        Some(xml) => Relationships::from_xml(&xml, PACKAGE_URI)?,
        None => {
            options.tolerate("package relationships are missing")?;
            Relationships::new(PACKAGE_URI)
        },
    };

    let workbook_uri = match package_rels.first_of_type(RT::OFFICE_DOCUMENT) {
        Some(rel) => package_rels.target_partname(rel)?,
        None => {
            options.tolerate("package has no workbook relationship")?;
            PackURI::new(DEFAULT_WORKBOOK_PATH)?
        },
    };
    let workbook_xml = package.try_blob_for(&workbook_uri)?.ok_or_else(|| {
        OoxmlError::malformed(format!("workbook part {} is missing", workbook_uri))
    })?;
    let manifest = parse_workbook(&workbook_xml, options)?;

    let workbook_rels = match package.rels_xml_for(&workbook_uri)? {
        Some(xml) => Relationships::from_xml(&xml, workbook_uri.base_uri())?,
        None => {
            options.tolerate("workbook relationships are missing")?;
            Relationships::new(workbook_uri.base_uri())
        },
    };

    let styles = match related_part(&mut package, &workbook_rels, RT::STYLES, options)? {
        Some(xml) => StyleReaderContainer::parse(&xml)?,
        None => StyleReaderContainer::new(),
    };
    let strings: Vec<SharedText> =
        match related_part(&mut package, &workbook_rels, RT::SHARED_STRINGS, options)? {
            Some(xml) => parse_shared_strings(&xml)?,
            None => Vec::new(),
        };
    log::debug!(
        "workbook has {} sheets, {} styles, {} shared strings",
        manifest.sheets.len(),
        styles.style_count(),
        strings.len()
    );

    let mut workbook = Workbook::new();
    workbook.set_protection(manifest.protection);
    let sources = SheetSources {
        strings: &strings,
        styles: &styles,
        options,
    };
    for entry in manifest.sheets {
        let mut sheet = Worksheet::new(entry.name);
        sheet.set_state(entry.state);
        if let Some(xml) = sheet_part(&mut package, &workbook_rels, entry.rel_id.as_deref(), sheet.name(), options)? {
            read_worksheet(&xml, &mut sheet, &sources)?;
        }
        if let Err(e) = workbook.push_worksheet(sheet) {
            options.tolerate(format!("skipping sheet: {}", e))?;
        }
    }

    if let Some(xml) = related_part(&mut package, &package_rels, RT::CORE_PROPERTIES, options)? {
        workbook.set_properties(DocumentProperties::from_xml(&xml)?);
    }

    let registry = options.plugins.clone().unwrap_or_else(default_registry);

    let inline = registry.resolve(QueueId::ReaderInline);
    for (index, sheet) in workbook.worksheets_mut().enumerate() {
        for descriptor in &inline {
            let PluginFactory::ReaderInline(factory) = &descriptor.factory else {
                continue;
            };
            let mut plugin = factory();
            plugin
                .init(index)
                .and_then(|()| plugin.execute(sheet))
                .map_err(|e| OoxmlError::plugin(&descriptor.unique_id, e))?;
        }
    }

    let mut ctx = ReadContext {
        workbook,
        package,
        options,
    };
    for descriptor in registry.resolve(QueueId::ReaderAppend) {
        if let PluginFactory::ReaderAppend(factory) = &descriptor.factory {
            log::debug!("running reader plugin '{}'", descriptor.unique_id);
            factory()
                .execute(&mut ctx)
                .map_err(|e| OoxmlError::plugin(&descriptor.unique_id, e))?;
        }
    }

    Ok(ctx.workbook)
}

/// Content of the first part related by `reltype`; `None` when there is no
/// such relationship or, tolerantly, when its target is missing.
fn related_part(
    package: &mut PhysPkgReader,
    rels: &Relationships,
    reltype: &str,
    options: &ReaderOptions,
) -> Result<Option<Vec<u8>>> {
    let Some(rel) = rels.first_of_type(reltype) else {
        return Ok(None);
    };
    let uri = rels.target_partname(rel)?;
    let content = package.try_blob_for(&uri)?;
    if content.is_none() {
        options.tolerate(format!("related part {} is missing", uri))?;
    }
    Ok(content)
}

fn sheet_part(
    package: &mut PhysPkgReader,
    rels: &Relationships,
    rel_id: Option<&str>,
    name: &str,
    options: &ReaderOptions,
) -> Result<Option<Vec<u8>>> {
    let Some(rel) = rel_id.and_then(|id| rels.get(id)) else {
        options.tolerate(format!("sheet '{}' has no relationship", name))?;
        return Ok(None);
    };
    let uri = rels.target_partname(rel)?;
    let content = package.try_blob_for(&uri)?;
    if content.is_none() {
        options.tolerate(format!("part {} of sheet '{}' is missing", uri, name))?;
    }
    Ok(content)
}

fn attributes(reader: &Reader<&[u8]>, e: &BytesStart<'_>) -> Result<HashMap<String, String>> {
    let mut attrs = HashMap::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.decode_and_unescape_value(reader.decoder())?.into_owned();
        attrs.insert(key, value);
    }
    Ok(attrs)
}

fn parse_workbook(content: &[u8], options: &ReaderOptions) -> Result<WorkbookManifest> {
    let mut reader = Reader::from_reader(content);
    reader.config_mut().trim_text(true);
    let mut manifest = WorkbookManifest::default();
    let mut buf = Vec::with_capacity(1024);

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"sheet" => {
                    let mut attrs = attributes(&reader, &e)?;
                    let Some(name) = attrs.remove("name") else {
                        options.tolerate("sheet entry without a name")?;
                        continue;
                    };
                    let state = attrs
                        .get("state")
                        .map(|s| SheetState::from_name(s))
                        .unwrap_or_default();
                    manifest.sheets.push(SheetEntry {
                        name,
                        state,
                        rel_id: attrs.remove("id"),
                    });
                },
                b"workbookProtection" => {
                    let attrs = attributes(&reader, &e)?;
                    manifest.protection = Some(read_workbook_protection(
                        &attrs,
                        options.ignore_not_supported_password_algorithms,
                    )?);
                },
                _ => {},
            },
            Event::Eof => break,
            _ => {},
        }
    }

    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_workbook_manifest() {
        let xml = br#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<workbookProtection lockStructure="1" workbookPassword="DAA7"/>
<sheets><sheet name="Data" sheetId="1" r:id="rId7"/><sheet name="Hidden &amp; Old" sheetId="2" state="hidden" r:id="rId8"/></sheets>
</workbook>"#;
        let manifest = parse_workbook(xml, &ReaderOptions::default()).unwrap();
        assert_eq!(manifest.sheets.len(), 2);
        assert_eq!(manifest.sheets[0].name, "Data");
        assert_eq!(manifest.sheets[0].rel_id.as_deref(), Some("rId7"));
        assert_eq!(manifest.sheets[1].name, "Hidden & Old");
        assert_eq!(manifest.sheets[1].state, SheetState::Hidden);
        assert!(manifest.protection.unwrap().lock_structure);
    }

    #[test]
    fn test_not_a_zip_archive() {
        let err = read_package(b"plain text".to_vec(), &ReaderOptions::default()).unwrap_err();
        assert!(err.is_io());
    }
}
