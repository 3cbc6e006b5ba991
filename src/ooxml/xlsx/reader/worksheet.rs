//! Reader for worksheet parts (`xl/worksheets/sheetN.xml`).
//!
//! Cells are typed through [`ReaderOptions::coerce`] with the number format
//! of their style. Rows and cells without an `r` attribute continue from the
//! previous position.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::options::{RawValue, ReaderOptions};
use crate::common::xml::resolve_entity;
use crate::ooxml::error::Result;
use crate::ooxml::xlsx::cell::{Cell, CellAddress, CellValue};
use crate::ooxml::xlsx::format::{SharedText, Style};
use crate::ooxml::xlsx::protection::read_sheet_protection;
use crate::ooxml::xlsx::styles::StyleReaderContainer;
use crate::ooxml::xlsx::worksheet::Worksheet;

/// Workbook-level tables a worksheet refers to.
pub(crate) struct SheetSources<'a> {
    pub strings: &'a [SharedText],
    pub styles: &'a StyleReaderContainer,
    pub options: &'a ReaderOptions,
}

/// Which text-bearing child of `<c>` is open.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Value,
    Formula,
    Inline,
}

#[derive(Default)]
struct PendingCell {
    address: Option<CellAddress>,
    style_index: usize,
    kind: Option<String>,
    value: String,
    formula: Option<String>,
    inline: String,
}

impl PendingCell {
    fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Value => &mut self.value,
            Field::Formula => self.formula.get_or_insert_with(String::new),
            Field::Inline => &mut self.inline,
        }
    }
}

struct SheetParser<'a> {
    sources: &'a SheetSources<'a>,
    resolved_styles: HashMap<usize, Option<Style>>,
    next_row: u32,
    row: u32,
    next_col: u32,
}

/// Fill `sheet` from a worksheet part.
pub(crate) fn read_worksheet(content: &[u8], sheet: &mut Worksheet, sources: &SheetSources<'_>) -> Result<()> {
    let mut reader = Reader::from_reader(content);
    let mut parser = SheetParser {
        sources,
        resolved_styles: HashMap::new(),
        next_row: 0,
        row: 0,
        next_col: 0,
    };
    let mut pending: Option<PendingCell> = None;
    let mut field: Option<Field> = None;
    let mut in_inline = false;
    let mut buf = Vec::with_capacity(4096);

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => parser.start_row(&reader, &e)?,
                b"c" => pending = Some(parser.start_cell(&reader, &e)?),
                b"v" if pending.is_some() => field = Some(Field::Value),
                b"f" if pending.is_some() => field = Some(Field::Formula),
                b"is" => in_inline = true,
                b"t" if in_inline => field = Some(Field::Inline),
                b"rPh" => in_inline = false,
                b"sheetProtection" => parser.read_protection(&reader, &e, sheet)?,
                _ => {},
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"row" => parser.start_row(&reader, &e)?,
                b"c" => {
                    let cell = parser.start_cell(&reader, &e)?;
                    parser.finish_cell(cell, sheet)?;
                },
                b"sheetProtection" => parser.read_protection(&reader, &e, sheet)?,
                _ => {},
            },
            Event::Text(t) => {
                if let (Some(f), Some(cell)) = (field, pending.as_mut()) {
                    cell.field_mut(f).push_str(&t.decode()?);
                }
            },
            Event::CData(t) => {
                if let (Some(f), Some(cell)) = (field, pending.as_mut()) {
                    cell.field_mut(f).push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            },
            Event::GeneralRef(r) => {
                if let (Some(f), Some(cell)) = (field, pending.as_mut()) {
                    let name = r.decode()?;
                    match resolve_entity(&name) {
                        Some(c) => cell.field_mut(f).push(c),
                        None => log::warn!("unknown entity '&{};' in cell", name),
                    }
                }
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"f" | b"t" => field = None,
                b"is" => in_inline = false,
                b"c" => {
                    field = None;
                    if let Some(cell) = pending.take() {
                        parser.finish_cell(cell, sheet)?;
                    }
                },
                _ => {},
            },
            Event::Eof => break,
            _ => {},
        }
    }

    Ok(())
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

impl SheetParser<'_> {
    fn options(&self) -> &ReaderOptions {
        self.sources.options
    }

    fn start_row(&mut self, reader: &Reader<&[u8]>, e: &BytesStart<'_>) -> Result<()> {
        let attrs = attributes(reader, e)?;
        self.row = match attrs.get("r") {
            Some(r) => match atoi_simd::parse::<u32, false, false>(r.trim().as_bytes()) {
                Ok(n) if n > 0 => n - 1,
                _ => {
                    self.options().tolerate(format!("invalid row number '{}'", r))?;
                    self.next_row
                },
            },
            None => self.next_row,
        };
        self.next_row = self.row.saturating_add(1);
        self.next_col = 0;
        Ok(())
    }

    fn start_cell(&mut self, reader: &Reader<&[u8]>, e: &BytesStart<'_>) -> Result<PendingCell> {
        let mut attrs = attributes(reader, e)?;

        let mut address = None;
        if let Some(reference) = attrs.get("r") {
            match CellAddress::parse(reference) {
                Ok(parsed) => address = Some(parsed),
                Err(_) => self
                    .options()
                    .tolerate(format!("invalid cell reference '{}'", reference))?,
            }
        }
        let address = match address {
            Some(address) => Some(address),
            None => match CellAddress::new(self.row, self.next_col) {
                Ok(address) => Some(address),
                Err(e) => {
                    self.options().tolerate(e.to_string())?;
                    None
                },
            },
        };
        if let Some(address) = address {
            self.next_col = address.col.saturating_add(1);
        }

        let style_index = match attrs.get("s") {
            Some(s) => match atoi_simd::parse::<usize, false, false>(s.trim().as_bytes()) {
                Ok(index) => index,
                Err(_) => {
                    self.options().tolerate(format!("invalid style index '{}'", s))?;
                    0
                },
            },
            None => 0,
        };

        Ok(PendingCell {
            address,
            style_index,
            kind: attrs.remove("t"),
            ..PendingCell::default()
        })
    }

    /// Style of a `cellXfs` index; `None` for the default style.
    fn style(&mut self, index: usize) -> Result<Option<Style>> {
        if let Some(style) = self.resolved_styles.get(&index) {
            return Ok(style.clone());
        }
        let style = match self.sources.styles.resolve_style(index)? {
            Some(style) => Some(style).filter(|s| *s != Style::default()),
            None => {
                if index != 0 || self.sources.styles.style_count() > 0 {
                    self.options()
                        .tolerate(format!("cell refers to missing style {}", index))?;
                }
                None
            },
        };
        self.resolved_styles.insert(index, style.clone());
        Ok(style)
    }

    fn raw_value(&self, cell: &mut PendingCell, address: CellAddress) -> Result<RawValue> {
        let value = std::mem::take(&mut cell.value);
        let raw = match cell.kind.as_deref() {
            Some("s") => {
                let entry = atoi_simd::parse::<usize, false, false>(value.trim().as_bytes())
                    .ok()
                    .and_then(|index| self.sources.strings.get(index));
                match entry {
                    Some(SharedText::Plain(text)) => RawValue::Text(text.clone()),
                    Some(SharedText::Rich(runs)) => RawValue::RichText(runs.clone()),
                    None => {
                        self.options().tolerate(format!(
                            "cell {} refers to missing shared string '{}'",
                            address, value
                        ))?;
                        RawValue::Empty
                    },
                }
            },
            Some("b") => match value.trim() {
                "1" | "true" => RawValue::Bool(true),
                "0" | "false" => RawValue::Bool(false),
                _ => {
                    self.options()
                        .tolerate(format!("cell {} holds invalid boolean '{}'", address, value))?;
                    RawValue::Text(value)
                },
            },
            Some("inlineStr") => RawValue::Text(std::mem::take(&mut cell.inline)),
            // formula results, error codes and ISO dates keep their text
            Some("str" | "e" | "d") => RawValue::Text(value),
            Some("n") | None => {
                if value.is_empty() {
                    RawValue::Empty
                } else if fast_float2::parse::<f64, _>(value.trim()).is_ok() {
                    RawValue::Number(value)
                } else {
                    self.options()
                        .tolerate(format!("cell {} holds invalid number '{}'", address, value))?;
                    RawValue::Text(value)
                }
            },
            Some(other) => {
                self.options()
                    .tolerate(format!("cell {} has unknown type '{}'", address, other))?;
                RawValue::Text(value)
            },
        };
        Ok(raw)
    }

    fn finish_cell(&mut self, mut cell: PendingCell, sheet: &mut Worksheet) -> Result<()> {
        let Some(address) = cell.address else {
            return Ok(());
        };
        let style = self.style(cell.style_index)?;

        let value = match cell.formula.take().filter(|f| !f.is_empty()) {
            Some(formula) => CellValue::Formula(formula),
            None => {
                let raw = self.raw_value(&mut cell, address)?;
                let styles = self.sources.styles;
                let number_format = styles
                    .cell_xf(cell.style_index)
                    .and_then(|xf| styles.format_code(xf.num_fmt_id));
                self.options().coerce(address.row, address.col, raw, number_format)
            },
        };

        if value.is_empty() && style.is_none() {
            return Ok(());
        }
        sheet.set_cell(address.row, address.col, Cell { value, style })
    }

    fn read_protection(&self, reader: &Reader<&[u8]>, e: &BytesStart<'_>, sheet: &mut Worksheet) -> Result<()> {
        let attrs = attributes(reader, e)?;
        if let Some(protection) =
            read_sheet_protection(&attrs, self.options().ignore_not_supported_password_algorithms)?
        {
            sheet.protect(protection);
        }
        Ok(())
    }
}
