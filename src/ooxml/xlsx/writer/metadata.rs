//! Extended properties part (`docProps/app.xml`).
//!
//! The core properties part is rendered by
//! [`DocumentProperties::to_xml`](crate::ooxml::common::DocumentProperties::to_xml).

use std::fmt::Write as FmtWrite;

use crate::common::xml::escape_text;
use crate::ooxml::error::Result;
use crate::ooxml::xlsx::workbook::Workbook;

const EXTENDED_PROPERTIES_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties";
const DOC_PROPS_VTYPES_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes";

/// Application name recorded in the extended properties.
pub const APPLICATION: &str = "kumquat";

/// Render `docProps/app.xml`: application name and the sheet titles.
pub(crate) fn app_xml(workbook: &Workbook) -> Result<String> {
    let count = workbook.sheet_count();
    let mut xml = String::with_capacity(512 + count * 48);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    write!(
        xml,
        r#"<Properties xmlns="{}" xmlns:vt="{}">"#,
        EXTENDED_PROPERTIES_NS, DOC_PROPS_VTYPES_NS
    )?;
    write!(xml, "<Application>{}</Application>", APPLICATION)?;
    xml.push_str("<DocSecurity>0</DocSecurity><ScaleCrop>false</ScaleCrop>");

    write!(
        xml,
        r#"<HeadingPairs><vt:vector size="2" baseType="variant"><vt:variant><vt:lpstr>Worksheets</vt:lpstr></vt:variant><vt:variant><vt:i4>{}</vt:i4></vt:variant></vt:vector></HeadingPairs>"#,
        count
    )?;

    write!(xml, r#"<TitlesOfParts><vt:vector size="{}" baseType="lpstr">"#, count)?;
    for sheet in workbook.worksheets() {
        write!(xml, "<vt:lpstr>{}</vt:lpstr>", escape_text(sheet.name()))?;
    }
    xml.push_str("</vt:vector></TitlesOfParts>");

    xml.push_str("<LinksUpToDate>false</LinksUpToDate><SharedDoc>false</SharedDoc>");
    xml.push_str("</Properties>");
    Ok(xml)
}
