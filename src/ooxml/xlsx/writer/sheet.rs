//! Worksheet part generation.

use std::fmt::Write as FmtWrite;

use crate::common::xml::escape_text;
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::namespace;
use crate::ooxml::xlsx::cell::{Cell, CellAddress, CellValue};
use crate::ooxml::xlsx::date_utils::{datetime_to_serial, time_to_serial};
use crate::ooxml::xlsx::format::{NumberFormat, SharedText, Style};
use crate::ooxml::xlsx::protection::write_sheet_protection;
use crate::ooxml::xlsx::styles::number_format::{DEFAULT_DATE_FORMAT_ID, DEFAULT_TIME_FORMAT_ID};
use crate::ooxml::xlsx::writer::WriteContext;
use crate::ooxml::xlsx::writer::styles::StyleRef;

/// Render the worksheet at `index` as a `<worksheet>` part.
///
/// Text is added to the shared-text table and styles are interned as cells are
/// visited, so this must run before the styles and shared-string parts.
pub(crate) fn worksheet_xml(ctx: &mut WriteContext<'_>, index: usize) -> Result<String> {
    let workbook = ctx.workbook();
    let worksheet = workbook
        .worksheet(index)
        .ok_or_else(|| OoxmlError::Format(format!("no worksheet at index {}", index)))?;

    let mut xml = String::with_capacity(1024 + worksheet.len() * 48);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    write!(
        xml,
        r#"<worksheet xmlns="{}" xmlns:r="{}">"#,
        namespace::SML_MAIN,
        namespace::OFC_RELATIONSHIPS
    )?;

    match worksheet.dimension() {
        Some((first, last)) if first == last => write!(xml, r#"<dimension ref="{}"/>"#, first)?,
        Some((first, last)) => write!(xml, r#"<dimension ref="{}:{}"/>"#, first, last)?,
        None => xml.push_str(r#"<dimension ref="A1"/>"#),
    }

    xml.push_str("<sheetData>");
    let mut current_row: Option<u32> = None;
    for (address, cell) in worksheet.cells() {
        let style = match effective_style(cell) {
            Some(s) => ctx.styles_mut().intern(&s)?,
            None => StyleRef::DEFAULT,
        };
        if cell.value.is_empty() && style == StyleRef::DEFAULT {
            continue;
        }

        if current_row != Some(address.row) {
            if current_row.is_some() {
                xml.push_str("</row>");
            }
            write!(xml, r#"<row r="{}">"#, address.row + 1)?;
            current_row = Some(address.row);
        }
        write_cell(&mut xml, ctx, address, cell, style)?;
    }
    if current_row.is_some() {
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData>");

    // sheetProtection must directly follow sheetData
    if let Some(protection) = worksheet.protection() {
        write_sheet_protection(&mut xml, protection, ctx.password_hasher())?;
    }

    xml.push_str("</worksheet>");
    Ok(xml)
}

/// Style of a cell, with a date or time format filled in for temporal values
/// whose style would otherwise display them as plain numbers.
fn effective_style(cell: &Cell) -> Option<Style> {
    let default_format = match cell.value {
        CellValue::Date(_) => Some(DEFAULT_DATE_FORMAT_ID),
        CellValue::Time(_) => Some(DEFAULT_TIME_FORMAT_ID),
        _ => None,
    };

    match (cell.style.as_ref(), default_format) {
        (Some(style), Some(id)) if style.number_format.is_general() => {
            Some(style.clone().with_number_format(NumberFormat::Builtin(id)))
        },
        (Some(style), _) => Some(style.clone()),
        (None, Some(id)) => Some(Style::new().with_number_format(NumberFormat::Builtin(id))),
        (None, None) => None,
    }
}

fn write_cell(
    xml: &mut String,
    ctx: &mut WriteContext<'_>,
    address: CellAddress,
    cell: &Cell,
    style: StyleRef,
) -> Result<()> {
    write!(xml, r#"<c r="{}""#, address)?;
    if style != StyleRef::DEFAULT {
        write!(xml, r#" s="{}""#, style.index())?;
    }

    match &cell.value {
        CellValue::Empty => {
            xml.push_str("/>");
            return Ok(());
        },
        CellValue::Bool(b) => {
            write!(xml, r#" t="b"><v>{}</v>"#, if *b { 1 } else { 0 })?;
        },
        CellValue::Int(i) => {
            let mut buffer = itoa::Buffer::new();
            write!(xml, "><v>{}</v>", buffer.format(*i))?;
        },
        CellValue::Float(f) => {
            if !f.is_finite() {
                return Err(OoxmlError::Format(format!(
                    "cell {} holds the non-finite number {}",
                    address, f
                )));
            }
            write!(xml, "><v>{}</v>", f)?;
        },
        CellValue::Decimal(text) => {
            let trimmed = text.trim();
            if !fast_float2::parse::<f64, _>(trimmed).is_ok_and(f64::is_finite) {
                return Err(OoxmlError::Format(format!(
                    "cell {} holds the malformed decimal '{}'",
                    address, text
                )));
            }
            write!(xml, "><v>{}</v>", trimmed)?;
        },
        CellValue::Text(text) => {
            let index = ctx.strings_mut().add(text);
            write!(xml, r#" t="s"><v>{}</v>"#, index)?;
        },
        CellValue::RichText(runs) => {
            let index = ctx.strings_mut().add_text(SharedText::Rich(runs.clone()));
            write!(xml, r#" t="s"><v>{}</v>"#, index)?;
        },
        CellValue::Date(value) => {
            let serial = datetime_to_serial(*value)
                .map_err(|e| OoxmlError::Format(format!("cell {}: {}", address, e)))?;
            write!(xml, "><v>{}</v>", serial)?;
        },
        CellValue::Time(value) => {
            write!(xml, "><v>{}</v>", time_to_serial(*value))?;
        },
        CellValue::Formula(formula) => {
            write!(xml, "><f>{}</f>", escape_text(formula))?;
        },
    }

    xml.push_str("</c>");
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::*;
    use crate::ooxml::xlsx::format::{Font, TextRun};
    use crate::ooxml::xlsx::protection::SheetProtection;
    use crate::ooxml::xlsx::workbook::Workbook;
    use crate::ooxml::xlsx::writer::WriterOptions;

    fn render<'a>(wb: &'a Workbook, options: &'a WriterOptions) -> (String, WriteContext<'a>) {
        let mut ctx = WriteContext::new(wb, options);
        let xml = worksheet_xml(&mut ctx, 0).unwrap();
        (xml, ctx)
    }

    #[test]
    fn test_cell_types() {
        let mut wb = Workbook::new();
        let ws = wb.add_worksheet("Types").unwrap();
        ws.set_value(0, 0, true).unwrap();
        ws.set_value(0, 1, 42).unwrap();
        ws.set_value(0, 2, 2.5).unwrap();
        ws.set_value(0, 3, "hello").unwrap();
        ws.set_value(1, 0, CellValue::Formula("SUM(B1:C1)".into())).unwrap();
        ws.set_value(1, 1, CellValue::Decimal("12345678901234567890.5".into())).unwrap();
        ws.set_value(1, 2, "hello").unwrap();

        let options = WriterOptions::default();
        let (xml, ctx) = render(&wb, &options);
        assert!(xml.contains(r#"<dimension ref="A1:D2"/>"#));
        assert!(xml.contains(r#"<row r="1"><c r="A1" t="b"><v>1</v></c><c r="B1"><v>42</v></c>"#));
        assert!(xml.contains(r#"<c r="C1"><v>2.5</v></c>"#));
        assert!(xml.contains(r#"<c r="D1" t="s"><v>0</v></c>"#));
        assert!(xml.contains(r#"<c r="A2"><f>SUM(B1:C1)</f></c>"#));
        assert!(xml.contains(r#"<v>12345678901234567890.5</v>"#));
        assert!(xml.contains(r#"<c r="C2" t="s"><v>0</v></c>"#));
        assert_eq!(ctx.strings().len(), 1);
        assert_eq!(ctx.strings().total_references(), 2);
    }

    #[test]
    fn test_dates_get_a_date_format() {
        let mut wb = Workbook::new();
        let ws = wb.add_worksheet("Dates").unwrap();
        ws.set_value(0, 0, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()).unwrap();
        ws.set_value(0, 1, NaiveTime::from_hms_opt(12, 0, 0).unwrap()).unwrap();

        let options = WriterOptions::default();
        let (xml, ctx) = render(&wb, &options);
        assert!(xml.contains(r#"<c r="A1" s="1"><v>45351</v></c>"#));
        assert!(xml.contains(r#"<c r="B1" s="2"><v>0.5</v></c>"#));
        assert_eq!(ctx.styles().cell_xf(StyleRef::DEFAULT).unwrap().num_fmt_id, 0);
        assert_eq!(ctx.styles().style_count(), 3);
    }

    #[test]
    fn test_styled_empty_cells_are_kept() {
        let mut wb = Workbook::new();
        let ws = wb.add_worksheet("Styled").unwrap();
        ws.set_style(2, 2, Style::new().with_font(Font::default().with_bold(true))).unwrap();
        ws.set_cell(3, 3, Cell::default()).unwrap();

        let options = WriterOptions::default();
        let (xml, _) = render(&wb, &options);
        assert!(xml.contains(r#"<row r="3"><c r="C3" s="1"/></row>"#));
        assert!(!xml.contains(r#"<row r="4">"#));
    }

    #[test]
    fn test_rich_text_and_escaping() {
        let mut wb = Workbook::new();
        let ws = wb.add_worksheet("Rich").unwrap();
        ws.set_value(
            0,
            0,
            CellValue::RichText(vec![
                TextRun::new("bold", Some(Font::default().with_bold(true))),
                TextRun::new(" plain", None),
            ]),
        )
        .unwrap();
        ws.set_value(0, 1, CellValue::Formula("\"a\"&\"<b>\"".into())).unwrap();

        let options = WriterOptions::default();
        let (xml, ctx) = render(&wb, &options);
        assert!(xml.contains(r#"<c r="A1" t="s"><v>0</v></c>"#));
        assert!(xml.contains("<f>\"a\"&amp;\"&lt;b&gt;\"</f>"));
        assert!(matches!(ctx.strings().get(0), Some(SharedText::Rich(runs)) if runs.len() == 2));
    }

    #[test]
    fn test_unrepresentable_values() {
        let mut wb = Workbook::new();
        wb.add_worksheet("Bad").unwrap().set_value(0, 0, f64::NAN).unwrap();
        let options = WriterOptions::default();
        let mut ctx = WriteContext::new(&wb, &options);
        assert!(matches!(worksheet_xml(&mut ctx, 0), Err(OoxmlError::Format(_))));

        let mut wb = Workbook::new();
        let early = NaiveDate::from_ymd_opt(1899, 12, 31).unwrap();
        wb.add_worksheet("Early").unwrap().set_value(0, 0, early).unwrap();
        let mut ctx = WriteContext::new(&wb, &options);
        assert!(matches!(worksheet_xml(&mut ctx, 0), Err(OoxmlError::Format(_))));

        let mut wb = Workbook::new();
        wb.add_worksheet("Decimal")
            .unwrap()
            .set_value(0, 0, CellValue::Decimal("12,5".into()))
            .unwrap();
        let mut ctx = WriteContext::new(&wb, &options);
        assert!(matches!(worksheet_xml(&mut ctx, 0), Err(OoxmlError::Format(_))));
    }

    #[test]
    fn test_protection_follows_sheet_data() {
        let mut wb = Workbook::new();
        let ws = wb.add_worksheet("Locked").unwrap();
        ws.set_value(0, 0, 1).unwrap();
        ws.protect(SheetProtection::new().with_password("secret"));

        let options = WriterOptions::default();
        let (xml, _) = render(&wb, &options);
        assert!(xml.contains(r#"</sheetData><sheetProtection password="DAA7" sheet="1""#));
        assert!(xml.ends_with("/></worksheet>"));
    }
}
