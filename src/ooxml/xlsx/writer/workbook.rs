//! Workbook part (`xl/workbook.xml`) generation.

use std::fmt::Write as FmtWrite;

use crate::common::xml::escape_attribute;
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::PartKind;
use crate::ooxml::opc::constants::namespace;
use crate::ooxml::xlsx::protection::write_workbook_protection;
use crate::ooxml::xlsx::worksheet::SheetState;
use crate::ooxml::xlsx::writer::WriteContext;

/// Render the workbook part. Sheet relationship IDs come from the finalized
/// part list, so every worksheet must have its part registered.
pub(crate) fn workbook_xml(ctx: &mut WriteContext<'_>) -> Result<String> {
    let workbook = ctx.workbook();
    if workbook.sheet_count() == 0 {
        return Err(OoxmlError::Format("a workbook needs at least one worksheet".to_string()));
    }

    let mut xml = String::with_capacity(512 + workbook.sheet_count() * 96);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    write!(
        xml,
        r#"<workbook xmlns="{}" xmlns:r="{}">"#,
        namespace::SML_MAIN,
        namespace::OFC_RELATIONSHIPS
    )?;

    if let Some(protection) = workbook.protection() {
        write_workbook_protection(&mut xml, protection, ctx.password_hasher())?;
    }

    // The active tab must be a visible sheet
    let active = workbook
        .worksheets()
        .iter()
        .position(|s| s.state() == SheetState::Visible)
        .unwrap_or(0);
    xml.push_str("<bookViews><workbookView");
    if active > 0 {
        write!(xml, r#" firstSheet="{0}" activeTab="{0}""#, active)?;
    }
    xml.push_str("/></bookViews>");

    xml.push_str("<sheets>");
    for (index, sheet) in workbook.worksheets().iter().enumerate() {
        let part = ctx
            .parts()
            .iter()
            .find(|p| p.descriptor.kind == PartKind::Sheet && p.descriptor.sheet_index() == index)
            .ok_or_else(|| {
                OoxmlError::Registry(format!("no part registered for worksheet '{}'", sheet.name()))
            })?;

        write!(
            xml,
            r#"<sheet name="{}" sheetId="{}""#,
            escape_attribute(sheet.name()),
            index + 1
        )?;
        if sheet.state() != SheetState::Visible {
            write!(xml, r#" state="{}""#, sheet.state().as_str())?;
        }
        write!(xml, r#" r:id="{}"/>"#, part.r_id())?;
    }
    xml.push_str("</sheets>");

    xml.push_str("</workbook>");
    Ok(xml)
}
