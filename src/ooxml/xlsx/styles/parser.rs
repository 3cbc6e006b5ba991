//! XML parser for the `xl/styles.xml` part.
//!
//! Unknown enumeration values decode to their defaults with a warning. A
//! malformed RGB color is a [`OoxmlError::Style`] and aborts the parse.

use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::StyleReaderContainer;
use crate::ooxml::error::Result;
use crate::ooxml::xlsx::format::{
    Border, BorderSide, BorderStyle, CellAlignment, CellXf, Color, Fill, Font, FontScheme,
    HorizontalAlignment, PatternType, Underline, VerticalAlignment,
};

type XmlReader<'a> = Reader<&'a [u8]>;

/// Parse a styles part into a reconstruction container.
pub(crate) fn parse_styles(content: &[u8]) -> Result<StyleReaderContainer> {
    let mut reader = Reader::from_reader(content);
    reader.config_mut().trim_text(true);

    let mut styles = StyleReaderContainer::default();
    let mut buf = Vec::with_capacity(1024);

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"numFmts" => parse_number_formats(&mut reader, &mut styles.number_formats)?,
                b"fonts" => parse_fonts(&mut reader, &mut styles.fonts)?,
                b"fills" => parse_fills(&mut reader, &mut styles.fills)?,
                b"borders" => parse_borders(&mut reader, &mut styles.borders)?,
                b"cellXfs" => parse_cell_xfs(&mut reader, &mut styles.cell_xfs)?,
                b"mruColors" => parse_mru_colors(&mut reader, &mut styles.mru_colors)?,
                _ => {},
            },
            Event::Eof => break,
            _ => {},
        }
    }

    Ok(styles)
}

fn attr_value(reader: &XmlReader<'_>, e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == name)
        .and_then(|attr| {
            attr.decode_and_unescape_value(reader.decoder())
                .ok()
                .map(|value| value.into_owned())
        })
}

#[inline]
fn is_true(value: &str) -> bool {
    value == "1" || value == "true"
}

/// Boolean toggle element such as `<b/>` or `<b val="0"/>`.
fn toggle(reader: &XmlReader<'_>, e: &BytesStart<'_>) -> bool {
    attr_value(reader, e, b"val").is_none_or(|v| is_true(&v))
}

fn parse_number<T: std::str::FromStr + Default>(value: Option<String>, what: &str) -> T {
    match value {
        Some(v) => v.trim().parse().unwrap_or_else(|_| {
            log::warn!("invalid {} '{}' in styles, using default", what, v);
            T::default()
        }),
        None => T::default(),
    }
}

/// Skip past the end tag of an element whose start tag was just read.
fn skip_element(reader: &mut XmlReader<'_>, name: &[u8]) -> Result<()> {
    let mut buf = Vec::with_capacity(128);
    let mut depth = 1usize;
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == name => depth += 1,
            Event::End(e) if e.local_name().as_ref() == name => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            },
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(())
}

fn parse_number_formats(reader: &mut XmlReader<'_>, formats: &mut IndexMap<u32, String>) -> Result<()> {
    let mut buf = Vec::with_capacity(512);

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"numFmt" => {
                let id = attr_value(reader, &e, b"numFmtId").and_then(|v| v.parse::<u32>().ok());
                let code = attr_value(reader, &e, b"formatCode");
                match (id, code) {
                    (Some(id), Some(code)) => {
                        formats.insert(id, code);
                    },
                    _ => log::warn!("skipping number format without a valid id or code"),
                }
            },
            Event::End(e) if e.local_name().as_ref() == b"numFmts" => break,
            Event::Eof => break,
            _ => {},
        }
    }

    Ok(())
}

fn parse_fonts(reader: &mut XmlReader<'_>, fonts: &mut Vec<Font>) -> Result<()> {
    let mut buf = Vec::with_capacity(512);

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"font" => fonts.push(parse_font(reader)?),
            Event::Empty(e) if e.local_name().as_ref() == b"font" => fonts.push(bare_font()),
            Event::End(e) if e.local_name().as_ref() == b"fonts" => break,
            Event::Eof => break,
            _ => {},
        }
    }

    Ok(())
}

/// A font with only what the file states; family and scheme are optional in the markup.
fn bare_font() -> Font {
    Font {
        family: None,
        scheme: None,
        ..Font::default()
    }
}

/// Parse one font, also used for rich-text run properties.
pub(crate) fn parse_font_body(reader: &mut XmlReader<'_>, end: &[u8]) -> Result<Font> {
    let mut font = bare_font();
    let mut buf = Vec::with_capacity(256);

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"name" | b"rFont" => {
                    if let Some(name) = attr_value(reader, &e, b"val") {
                        font.name = name;
                    }
                },
                b"sz" => {
                    font.size = attr_value(reader, &e, b"val")
                        .and_then(|v| v.parse::<f64>().ok())
                        .unwrap_or(font.size);
                },
                b"b" => font.bold = toggle(reader, &e),
                b"i" => font.italic = toggle(reader, &e),
                b"strike" => font.strike = toggle(reader, &e),
                b"u" => {
                    let name = attr_value(reader, &e, b"val").unwrap_or_else(|| "single".to_string());
                    font.underline = Underline::from_name(&name).unwrap_or_else(|| {
                        log::warn!("unknown underline '{}', using none", name);
                        Underline::None
                    });
                },
                b"color" => font.color = parse_color(reader, &e)?,
                b"family" => font.family = Some(parse_number(attr_value(reader, &e, b"val"), "font family")),
                b"scheme" => {
                    font.scheme = match attr_value(reader, &e, b"val").as_deref() {
                        Some("major") => Some(FontScheme::Major),
                        Some("minor") => Some(FontScheme::Minor),
                        _ => None,
                    };
                },
                _ => {},
            },
            Event::End(e) if e.local_name().as_ref() == end => break,
            Event::Eof => break,
            _ => {},
        }
    }

    Ok(font)
}

fn parse_font(reader: &mut XmlReader<'_>) -> Result<Font> {
    parse_font_body(reader, b"font")
}

fn parse_fills(reader: &mut XmlReader<'_>, fills: &mut Vec<Fill>) -> Result<()> {
    let mut buf = Vec::with_capacity(512);

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"fill" => fills.push(parse_fill(reader)?),
            Event::Empty(e) if e.local_name().as_ref() == b"fill" => fills.push(Fill::default()),
            Event::End(e) if e.local_name().as_ref() == b"fills" => break,
            Event::Eof => break,
            _ => {},
        }
    }

    Ok(())
}

fn parse_fill(reader: &mut XmlReader<'_>) -> Result<Fill> {
    let mut fill = Fill::default();
    let mut buf = Vec::with_capacity(256);

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"patternFill" => {
                fill.pattern = pattern_type(reader, &e);
                parse_pattern_colors(reader, &mut fill)?;
            },
            Event::Empty(e) if e.local_name().as_ref() == b"patternFill" => {
                fill.pattern = pattern_type(reader, &e);
            },
            Event::Start(e) if e.local_name().as_ref() == b"gradientFill" => {
                log::warn!("gradient fill is not supported, decoded as no fill");
                skip_element(reader, b"gradientFill")?;
            },
            Event::End(e) if e.local_name().as_ref() == b"fill" => break,
            Event::Eof => break,
            _ => {},
        }
    }

    Ok(fill)
}

fn pattern_type(reader: &XmlReader<'_>, e: &BytesStart<'_>) -> PatternType {
    match attr_value(reader, e, b"patternType") {
        Some(name) => PatternType::from_name(&name).unwrap_or_else(|| {
            log::warn!("unknown fill pattern '{}', using none", name);
            PatternType::None
        }),
        None => PatternType::None,
    }
}

fn parse_pattern_colors(reader: &mut XmlReader<'_>, fill: &mut Fill) -> Result<()> {
    let mut buf = Vec::with_capacity(128);
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"fgColor" => fill.foreground = parse_color(reader, &e)?,
                b"bgColor" => fill.background = parse_color(reader, &e)?,
                _ => {},
            },
            Event::End(e) if e.local_name().as_ref() == b"patternFill" => break,
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(())
}

fn parse_borders(reader: &mut XmlReader<'_>, borders: &mut Vec<Border>) -> Result<()> {
    let mut buf = Vec::with_capacity(512);

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"border" => {
                let mut border = border_flags(reader, &e);
                parse_border_sides(reader, &mut border)?;
                borders.push(border);
            },
            Event::Empty(e) if e.local_name().as_ref() == b"border" => {
                borders.push(border_flags(reader, &e));
            },
            Event::End(e) if e.local_name().as_ref() == b"borders" => break,
            Event::Eof => break,
            _ => {},
        }
    }

    Ok(())
}

fn border_flags(reader: &XmlReader<'_>, e: &BytesStart<'_>) -> Border {
    Border {
        diagonal_up: attr_value(reader, e, b"diagonalUp").is_some_and(|v| is_true(&v)),
        diagonal_down: attr_value(reader, e, b"diagonalDown").is_some_and(|v| is_true(&v)),
        ..Border::default()
    }
}

fn parse_border_sides(reader: &mut XmlReader<'_>, border: &mut Border) -> Result<()> {
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        let (e, has_children) = match reader.read_event_into(&mut buf)? {
            Event::Start(e) => (e.into_owned(), true),
            Event::Empty(e) => (e.into_owned(), false),
            Event::End(e) if e.local_name().as_ref() == b"border" => break,
            Event::Eof => break,
            _ => continue,
        };

        let name = e.local_name().as_ref().to_vec();
        let mut side = BorderSide::new(border_style(reader, &e), None);
        if has_children {
            side.color = parse_side_color(reader, &name)?;
        }
        match name.as_slice() {
            b"left" | b"start" => border.left = side,
            b"right" | b"end" => border.right = side,
            b"top" => border.top = side,
            b"bottom" => border.bottom = side,
            b"diagonal" => border.diagonal = side,
            _ => {},
        }
    }
    Ok(())
}

fn border_style(reader: &XmlReader<'_>, e: &BytesStart<'_>) -> BorderStyle {
    match attr_value(reader, e, b"style") {
        Some(name) => BorderStyle::from_name(&name).unwrap_or_else(|| {
            log::warn!("unknown border style '{}', using none", name);
            BorderStyle::None
        }),
        None => BorderStyle::None,
    }
}

fn parse_side_color(reader: &mut XmlReader<'_>, side: &[u8]) -> Result<Option<Color>> {
    let mut color = None;
    let mut buf = Vec::with_capacity(128);
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"color" => {
                color = parse_color(reader, &e)?;
            },
            Event::End(e) if e.local_name().as_ref() == side => break,
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(color)
}

fn parse_cell_xfs(reader: &mut XmlReader<'_>, cell_xfs: &mut Vec<CellXf>) -> Result<()> {
    let mut buf = Vec::with_capacity(512);

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"xf" => {
                let mut xf = xf_attributes(reader, &e);
                parse_xf_children(reader, &mut xf)?;
                cell_xfs.push(xf);
            },
            Event::Empty(e) if e.local_name().as_ref() == b"xf" => {
                cell_xfs.push(xf_attributes(reader, &e));
            },
            Event::End(e) if e.local_name().as_ref() == b"cellXfs" => break,
            Event::Eof => break,
            _ => {},
        }
    }

    Ok(())
}

fn xf_attributes(reader: &XmlReader<'_>, e: &BytesStart<'_>) -> CellXf {
    CellXf {
        font_id: parse_number(attr_value(reader, e, b"fontId"), "font id"),
        fill_id: parse_number(attr_value(reader, e, b"fillId"), "fill id"),
        border_id: parse_number(attr_value(reader, e, b"borderId"), "border id"),
        num_fmt_id: parse_number(attr_value(reader, e, b"numFmtId"), "number format id"),
        alignment: CellAlignment::default(),
    }
}

fn parse_xf_children(reader: &mut XmlReader<'_>, xf: &mut CellXf) -> Result<()> {
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"alignment" => {
                xf.alignment = parse_alignment(reader, &e);
            },
            Event::End(e) if e.local_name().as_ref() == b"xf" => break,
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(())
}

fn parse_alignment(reader: &XmlReader<'_>, e: &BytesStart<'_>) -> CellAlignment {
    let horizontal = match attr_value(reader, e, b"horizontal") {
        Some(name) => HorizontalAlignment::from_name(&name).unwrap_or_else(|| {
            log::warn!("unknown horizontal alignment '{}', using general", name);
            HorizontalAlignment::General
        }),
        None => HorizontalAlignment::General,
    };
    let vertical = match attr_value(reader, e, b"vertical") {
        Some(name) => VerticalAlignment::from_name(&name).unwrap_or_else(|| {
            log::warn!("unknown vertical alignment '{}', using bottom", name);
            VerticalAlignment::Bottom
        }),
        None => VerticalAlignment::Bottom,
    };

    CellAlignment {
        horizontal,
        vertical,
        wrap_text: attr_value(reader, e, b"wrapText").is_some_and(|v| is_true(&v)),
        shrink_to_fit: attr_value(reader, e, b"shrinkToFit").is_some_and(|v| is_true(&v)),
        indent: parse_number(attr_value(reader, e, b"indent"), "indent"),
        text_rotation: parse_number(attr_value(reader, e, b"textRotation"), "text rotation"),
    }
}

fn parse_mru_colors(reader: &mut XmlReader<'_>, colors: &mut Vec<Color>) -> Result<()> {
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"color" => {
                if let Some(color) = parse_color(reader, &e)? {
                    colors.push(color);
                }
            },
            Event::End(e) if e.local_name().as_ref() == b"mruColors" => break,
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(())
}

/// Decode a color element: `rgb`, `theme`, `indexed` or `auto`.
pub(crate) fn parse_color(reader: &XmlReader<'_>, e: &BytesStart<'_>) -> Result<Option<Color>> {
    if let Some(rgb) = attr_value(reader, e, b"rgb") {
        return Color::rgb(&rgb).map(Some);
    }
    if let Some(theme) = attr_value(reader, e, b"theme") {
        return Ok(theme.parse().ok().map(Color::Theme));
    }
    if let Some(indexed) = attr_value(reader, e, b"indexed") {
        return Ok(indexed.parse().ok().map(Color::Indexed));
    }
    if attr_value(reader, e, b"auto").is_some_and(|v| is_true(&v)) {
        return Ok(Some(Color::Auto));
    }
    Ok(None)
}
