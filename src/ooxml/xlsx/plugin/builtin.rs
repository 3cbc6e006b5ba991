//! Built-in package-part writers.
//!
//! Each one is registered at priority 0 under a well-known ID, so a plugin
//! registered under the same ID with a higher priority replaces it.

use std::sync::Arc;

use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::PartKind;
use crate::ooxml::opc::constants::{content_type as ct, relationship_type as rt};
use crate::ooxml::opc::part_registry::{ROOT_BAND_START, WORKBOOK_ORDER};
use crate::ooxml::xlsx::plugin::{PackagePartWriter, PartSpec, PluginDescriptor};
use crate::ooxml::xlsx::workbook::Workbook;
use crate::ooxml::xlsx::writer::{WriteContext, metadata, sheet, theme, workbook};

pub const WORKBOOK_ID: &str = "kumquat.writer.workbook";
pub const APP_PROPERTIES_ID: &str = "kumquat.writer.app";
pub const CORE_PROPERTIES_ID: &str = "kumquat.writer.core";
pub const THEME_ID: &str = "kumquat.writer.theme";
pub const STYLES_ID: &str = "kumquat.writer.styles";
pub const SHARED_STRINGS_ID: &str = "kumquat.writer.sharedStrings";
pub const WORKSHEET_ID: &str = "kumquat.writer.worksheet";

/// Descriptors of every built-in part, in package order.
pub fn descriptors() -> Vec<PluginDescriptor> {
    vec![
        PluginDescriptor::package_part(
            WORKBOOK_ID,
            PartSpec::new("/xl/workbook.xml", PartKind::Root, ct::SML_SHEET_MAIN, rt::OFFICE_DOCUMENT)
                .with_order(WORKBOOK_ORDER),
            Arc::new(|| Box::new(WorkbookPart)),
        ),
        PluginDescriptor::package_part(
            APP_PROPERTIES_ID,
            PartSpec::new(
                "/docProps/app.xml",
                PartKind::Root,
                ct::OFC_EXTENDED_PROPERTIES,
                rt::EXTENDED_PROPERTIES,
            )
            .with_order(ROOT_BAND_START),
            Arc::new(|| Box::new(AppPropertiesPart)),
        ),
        PluginDescriptor::package_part(
            CORE_PROPERTIES_ID,
            PartSpec::new(
                "/docProps/core.xml",
                PartKind::Root,
                ct::OPC_CORE_PROPERTIES,
                rt::CORE_PROPERTIES,
            )
            .with_order(ROOT_BAND_START + 1),
            Arc::new(|| Box::new(CorePropertiesPart)),
        ),
        PluginDescriptor::package_part(
            THEME_ID,
            PartSpec::new("/xl/theme/theme1.xml", PartKind::Other, ct::OFC_THEME, rt::THEME)
                .with_order(ROOT_BAND_START + 2),
            Arc::new(|| Box::new(ThemePart)),
        ),
        PluginDescriptor::package_part(
            STYLES_ID,
            PartSpec::new("/xl/styles.xml", PartKind::Other, ct::SML_STYLES, rt::STYLES)
                .with_order(ROOT_BAND_START + 3),
            Arc::new(|| Box::new(StylesPart)),
        ),
        PluginDescriptor::package_part(
            SHARED_STRINGS_ID,
            PartSpec::new(
                "/xl/sharedStrings.xml",
                PartKind::Other,
                ct::SML_SHARED_STRINGS,
                rt::SHARED_STRINGS,
            )
            .with_order(ROOT_BAND_START + 4),
            Arc::new(|| Box::new(SharedStringsPart)),
        ),
        PluginDescriptor::package_part(
            WORKSHEET_ID,
            PartSpec::new(
                "/xl/worksheets/sheet{n}.xml",
                PartKind::Sheet,
                ct::SML_WORKSHEET,
                rt::WORKSHEET,
            ),
            Arc::new(|| Box::new(WorksheetPart::default())),
        ),
    ]
}

struct WorkbookPart;

impl PackagePartWriter for WorkbookPart {
    fn execute(&mut self, ctx: &mut WriteContext<'_>) -> Result<Vec<u8>> {
        workbook::workbook_xml(ctx).map(String::into_bytes)
    }
}

struct AppPropertiesPart;

impl PackagePartWriter for AppPropertiesPart {
    fn execute(&mut self, ctx: &mut WriteContext<'_>) -> Result<Vec<u8>> {
        metadata::app_xml(ctx.workbook()).map(String::into_bytes)
    }
}

struct CorePropertiesPart;

impl PackagePartWriter for CorePropertiesPart {
    fn execute(&mut self, ctx: &mut WriteContext<'_>) -> Result<Vec<u8>> {
        Ok(ctx.workbook().properties().to_xml().into_bytes())
    }
}

struct ThemePart;

impl PackagePartWriter for ThemePart {
    fn execute(&mut self, _ctx: &mut WriteContext<'_>) -> Result<Vec<u8>> {
        theme::Theme::office().to_xml().map(String::into_bytes)
    }
}

/// Runs after every worksheet, once all styles have been interned.
struct StylesPart;

impl PackagePartWriter for StylesPart {
    fn execute(&mut self, ctx: &mut WriteContext<'_>) -> Result<Vec<u8>> {
        ctx.styles().to_xml().map(String::into_bytes)
    }
}

/// Runs after every worksheet, once all text has been added.
struct SharedStringsPart;

impl PackagePartWriter for SharedStringsPart {
    fn execute(&mut self, ctx: &mut WriteContext<'_>) -> Result<Vec<u8>> {
        ctx.strings().to_xml().map(String::into_bytes)
    }
}

#[derive(Default)]
struct WorksheetPart {
    index: Option<usize>,
}

impl PackagePartWriter for WorksheetPart {
    fn init(&mut self, _workbook: &Workbook, sheet_index: Option<usize>) -> Result<()> {
        self.index = sheet_index;
        Ok(())
    }

    fn execute(&mut self, ctx: &mut WriteContext<'_>) -> Result<Vec<u8>> {
        let index = self
            .index
            .ok_or_else(|| OoxmlError::Registry("worksheet writer used for a non-sheet part".into()))?;
        sheet::worksheet_xml(ctx, index).map(String::into_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::part_registry::SHEET_BAND_START;

    #[test]
    fn test_builtin_orders_match_package_layout() {
        let orders: Vec<(String, Option<u32>)> = descriptors()
            .into_iter()
            .map(|d| {
                let part = d.part.unwrap();
                (part.path, part.order)
            })
            .collect();

        assert_eq!(orders[0], ("/xl/workbook.xml".to_string(), Some(0)));
        assert_eq!(orders[1].1, Some(1000));
        assert_eq!(orders[5], ("/xl/sharedStrings.xml".to_string(), Some(1004)));
        assert_eq!(orders[6].1, None);
        assert!(SHEET_BAND_START > 1004);
    }

    #[test]
    fn test_ids_are_unique() {
        let mut ids: Vec<String> = descriptors().into_iter().map(|d| d.unique_id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), descriptors().len());
    }
}
