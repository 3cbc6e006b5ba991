//! Package assembly.
//!
//! One write runs in these steps:
//!
//! 1. resolve the package-part plugins and register their parts, expanding
//!    sheet parts once per worksheet;
//! 2. finalize the part registry, which fixes order and relationship IDs;
//! 3. render the parts: worksheets first (they fill the style and text
//!    tables), then post-sheet parts, then the workbook and root-band parts;
//! 4. build both relationship parts and the content-types manifest;
//! 5. run the append plugins over the assembled entries;
//! 6. zip everything in part order.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::packuri::PACKAGE_URI;
use crate::ooxml::opc::part_registry::{Band, WORKBOOK_ORDER};
use crate::ooxml::opc::pkgwriter::{ContentTypes, PackageWriter};
use crate::ooxml::opc::{
    FinalizedPart, PackURI, PartDescriptor, PartKind, PartRegistry, Relationship, Relationships,
};
use crate::ooxml::xlsx::plugin::{self, PackagePartWriter, PluginFactory, QueueId};
use crate::ooxml::xlsx::protection::PasswordHasher;
use crate::ooxml::xlsx::workbook::Workbook;
use crate::ooxml::xlsx::writer::options::WriterOptions;
use crate::ooxml::xlsx::writer::strings::SharedStrings;
use crate::ooxml::xlsx::writer::styles::StyleCache;

/// State shared by the part writers of one write operation.
///
/// The style and text tables live here, so two documents written at the same
/// time never share them.
pub struct WriteContext<'a> {
    workbook: &'a Workbook,
    options: &'a WriterOptions,
    styles: StyleCache,
    strings: SharedStrings,
    parts: Vec<FinalizedPart>,
    current: Option<usize>,
}

impl<'a> WriteContext<'a> {
    pub(crate) fn new(workbook: &'a Workbook, options: &'a WriterOptions) -> Self {
        Self {
            workbook,
            options,
            styles: StyleCache::new(),
            strings: SharedStrings::new(),
            parts: Vec::new(),
            current: None,
        }
    }

    #[inline]
    pub fn workbook(&self) -> &'a Workbook {
        self.workbook
    }

    #[inline]
    pub fn options(&self) -> &'a WriterOptions {
        self.options
    }

    #[inline]
    pub fn password_hasher(&self) -> &'a dyn PasswordHasher {
        self.options.password_hasher.as_ref()
    }

    #[inline]
    pub fn styles(&self) -> &StyleCache {
        &self.styles
    }

    #[inline]
    pub fn styles_mut(&mut self) -> &mut StyleCache {
        &mut self.styles
    }

    #[inline]
    pub fn strings(&self) -> &SharedStrings {
        &self.strings
    }

    #[inline]
    pub fn strings_mut(&mut self) -> &mut SharedStrings {
        &mut self.strings
    }

    /// Every part of the package, sorted, with relationship IDs assigned.
    #[inline]
    pub fn parts(&self) -> &[FinalizedPart] {
        &self.parts
    }

    /// The part being rendered.
    pub fn current_part(&self) -> Option<&FinalizedPart> {
        self.current.and_then(|i| self.parts.get(i))
    }
}

/// Rendered archive entries handed to the append plugins.
#[derive(Debug, Clone)]
pub struct AssembledPackage {
    entries: IndexMap<PackURI, Vec<u8>>,
    content_types: ContentTypes,
}

impl AssembledPackage {
    /// Content of the entry at an absolute part name such as `/xl/workbook.xml`.
    pub fn entry(&self, path: &str) -> Option<&[u8]> {
        let uri = PackURI::new(path).ok()?;
        self.entries.get(&uri).map(Vec::as_slice)
    }

    pub fn entry_mut(&mut self, path: &str) -> Option<&mut Vec<u8>> {
        let uri = PackURI::new(path).ok()?;
        self.entries.get_mut(&uri)
    }

    /// Part names in archive order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(PackURI::as_str)
    }

    /// Add or replace an entry. New entries go to the end of the archive.
    pub fn insert(&mut self, path: &str, content_type: Option<&str>, data: Vec<u8>) -> Result<()> {
        let uri = PackURI::new(path)?;
        if let Some(content_type) = content_type {
            self.content_types.add(&uri, content_type);
        }
        self.entries.insert(uri, data);
        Ok(())
    }

    /// Remove an entry; its manifest entry, if any, is kept.
    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        let uri = PackURI::new(path).ok()?;
        self.entries.shift_remove(&uri)
    }

    pub fn add_default_content_type(&mut self, ext: &str, content_type: &str) {
        self.content_types.add_default(ext, content_type);
    }

    pub fn content_type(&self, path: &str) -> Option<&str> {
        let uri = PackURI::new(path).ok()?;
        self.content_types.get(&uri)
    }
}

struct PendingPart {
    plugin_id: String,
    order: u32,
    writer: Box<dyn PackagePartWriter>,
}

/// Rendering phase of a part: worksheets, then post-sheet parts, then the rest.
fn execution_phase(order: u32) -> u8 {
    match Band::of(order) {
        Some(Band::Sheet) => 0,
        Some(Band::PostSheet) => 1,
        _ => 2,
    }
}

/// Write a workbook into package bytes.
pub(crate) fn write_package(workbook: &Workbook, options: &WriterOptions) -> Result<Vec<u8>> {
    if workbook.sheet_count() == 0 {
        return Err(OoxmlError::Format("a workbook needs at least one worksheet".to_string()));
    }

    let registry = options.plugins.clone().unwrap_or_else(plugin::default_registry);

    let mut registered = PartRegistry::new();
    let mut pending = Vec::new();
    for descriptor in registry.resolve(QueueId::WriterPackagePart) {
        let (PluginFactory::PackagePart(factory), Some(spec)) = (&descriptor.factory, &descriptor.part)
        else {
            continue;
        };

        let instances: Vec<(Option<usize>, PartDescriptor)> = if spec.kind == PartKind::Sheet {
            (0..workbook.sheet_count())
                .map(|index| -> Result<(Option<usize>, PartDescriptor)> {
                    Ok((
                        Some(index),
                        PartDescriptor::new(
                            PackURI::new(spec.sheet_path(index))?,
                            PartKind::Sheet,
                            PartDescriptor::sheet_order(index)?,
                            &spec.content_type,
                            &spec.relationship_type,
                        ),
                    ))
                })
                .collect::<Result<_>>()?
        } else {
            let order = match spec.order {
                Some(order) => order,
                None => registered.next_post_sheet_order()?,
            };
            vec![(
                None,
                PartDescriptor::new(
                    PackURI::new(spec.path.as_str())?,
                    spec.kind,
                    order,
                    &spec.content_type,
                    &spec.relationship_type,
                ),
            )]
        };

        for (sheet_index, part) in instances {
            let order = part.order;
            registered.register(part)?;

            let mut writer = factory();
            writer
                .init(workbook, sheet_index)
                .map_err(|e| OoxmlError::plugin(&descriptor.unique_id, e))?;
            pending.push(PendingPart {
                plugin_id: descriptor.unique_id.clone(),
                order,
                writer,
            });
        }
    }

    let mut ctx = WriteContext::new(workbook, options);
    ctx.parts = registered.finalize();

    pending.sort_by_key(|p| (execution_phase(p.order), p.order));
    let mut rendered: HashMap<u32, Vec<u8>> = HashMap::with_capacity(pending.len());
    for mut part in pending {
        ctx.current = ctx.parts.iter().position(|p| p.descriptor.order == part.order);
        log::debug!("rendering part {} with plugin '{}'", part.order, part.plugin_id);
        let content = part
            .writer
            .execute(&mut ctx)
            .map_err(|e| OoxmlError::plugin(&part.plugin_id, e))?;
        rendered.insert(part.order, content);
    }

    let mut package = assemble_entries(&ctx.parts, rendered)?;

    for descriptor in registry.resolve(QueueId::WriterAppend) {
        if let PluginFactory::Append(factory) = &descriptor.factory {
            log::debug!("running append plugin '{}'", descriptor.unique_id);
            factory()
                .execute(&mut package)
                .map_err(|e| OoxmlError::plugin(&descriptor.unique_id, e))?;
        }
    }

    Ok(PackageWriter::to_bytes(
        &package.content_types,
        &package.entries,
        options.deflate,
    )?)
}

/// Lay the rendered parts out in archive order with both relationship parts.
fn assemble_entries(
    parts: &[FinalizedPart],
    mut rendered: HashMap<u32, Vec<u8>>,
) -> Result<AssembledPackage> {
    let workbook_uri = parts
        .iter()
        .find(|p| p.descriptor.order == WORKBOOK_ORDER)
        .map(|p| p.descriptor.path.clone())
        .ok_or_else(|| OoxmlError::Registry("no workbook part is registered".to_string()))?;

    let mut package_rels = Relationships::new(PACKAGE_URI);
    let mut workbook_rels = Relationships::new(workbook_uri.base_uri());
    let mut content_types = ContentTypes::new();

    for part in parts {
        let descriptor = &part.descriptor;
        content_types.add(&descriptor.path, &descriptor.content_type);

        let (rels, base) = match descriptor.kind {
            PartKind::Root => (&mut package_rels, PACKAGE_URI),
            PartKind::Sheet | PartKind::Other => (&mut workbook_rels, workbook_uri.base_uri()),
        };
        rels.add(Relationship::new(
            part.r_id(),
            &descriptor.relationship_type,
            descriptor.path.relative_ref(base),
            false,
        ));
    }

    let mut entries = IndexMap::with_capacity(parts.len() + 2);
    entries.insert(
        PackURI::new("/_rels/.rels")?,
        package_rels.to_xml().into_bytes(),
    );
    for part in parts {
        let path = part.descriptor.path.clone();
        let content = rendered.remove(&part.descriptor.order).unwrap_or_default();
        entries.insert(path, content);
        if part.descriptor.order == WORKBOOK_ORDER {
            entries.insert(workbook_uri.rels_uri()?, workbook_rels.to_xml().into_bytes());
        }
    }

    Ok(AssembledPackage {
        entries,
        content_types,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::phys_pkg::PhysPkgReader;

    fn read_entry(bytes: Vec<u8>, path: &str) -> String {
        let mut reader = PhysPkgReader::from_bytes(bytes).unwrap();
        let blob = reader.blob_for(&PackURI::new(path).unwrap()).unwrap();
        String::from_utf8(blob).unwrap()
    }

    fn two_sheet_workbook() -> Workbook {
        let mut wb = Workbook::new();
        wb.add_worksheet("One").unwrap().set_value(0, 0, "a").unwrap();
        wb.add_worksheet("Two").unwrap().set_value(0, 0, "b").unwrap();
        wb
    }

    #[test]
    fn test_fixed_root_relationship_ids() {
        let bytes = write_package(&two_sheet_workbook(), &WriterOptions::default()).unwrap();

        let rels = read_entry(bytes.clone(), "/_rels/.rels");
        assert!(rels.contains(r#"Id="rId1""#) && rels.contains(r#"Target="xl/workbook.xml""#));
        assert!(rels.contains(r#"Id="rId2""#) && rels.contains(r#"Target="docProps/app.xml""#));
        assert!(rels.contains(r#"Id="rId3""#) && rels.contains(r#"Target="docProps/core.xml""#));

        let wb_rels = read_entry(bytes.clone(), "/xl/_rels/workbook.xml.rels");
        assert!(wb_rels.contains(r#"Id="rId4""#) && wb_rels.contains(r#"Target="theme/theme1.xml""#));
        assert!(wb_rels.contains(r#"Id="rId5""#) && wb_rels.contains(r#"Target="styles.xml""#));
        assert!(wb_rels.contains(r#"Id="rId6""#));
        assert!(wb_rels.contains(r#"Id="rId7""#) && wb_rels.contains(r#"Target="worksheets/sheet1.xml""#));
        assert!(wb_rels.contains(r#"Id="rId8""#) && wb_rels.contains(r#"Target="worksheets/sheet2.xml""#));

        let workbook = read_entry(bytes, "/xl/workbook.xml");
        assert!(workbook.contains(r#"<sheet name="One" sheetId="1" r:id="rId7"/>"#));
        assert!(workbook.contains(r#"<sheet name="Two" sheetId="2" r:id="rId8"/>"#));
    }

    #[test]
    fn test_archive_order_follows_part_order() {
        let bytes = write_package(&two_sheet_workbook(), &WriterOptions::default()).unwrap();
        let reader = PhysPkgReader::from_bytes(bytes).unwrap();
        assert_eq!(
            reader.member_names(),
            [
                "[Content_Types].xml",
                "_rels/.rels",
                "xl/workbook.xml",
                "xl/_rels/workbook.xml.rels",
                "docProps/app.xml",
                "docProps/core.xml",
                "xl/theme/theme1.xml",
                "xl/styles.xml",
                "xl/sharedStrings.xml",
                "xl/worksheets/sheet1.xml",
                "xl/worksheets/sheet2.xml",
            ]
        );
    }

    #[test]
    fn test_shared_strings_written_after_sheets() {
        let bytes = write_package(&two_sheet_workbook(), &WriterOptions::default()).unwrap();
        let sst = read_entry(bytes, "/xl/sharedStrings.xml");
        assert!(sst.contains(r#"count="2" uniqueCount="2""#));
        assert!(sst.find("<t>a</t>") < sst.find("<t>b</t>"));
    }

    #[test]
    fn test_empty_registry_has_no_workbook() {
        let options = WriterOptions::default().with_plugins(plugin::PluginRegistry::empty());
        assert!(matches!(
            write_package(&two_sheet_workbook(), &options),
            Err(OoxmlError::Registry(_))
        ));
    }

    #[test]
    fn test_stored_entries() {
        let options = WriterOptions::default().with_deflate(false);
        let bytes = write_package(&two_sheet_workbook(), &options).unwrap();
        assert!(read_entry(bytes, "/xl/workbook.xml").starts_with("<?xml"));
    }
}
