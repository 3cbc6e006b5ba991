//! Style cache and `styles.xml` generator.
//!
//! Every style is split into its components (font, fill, border, number
//! format) and each component is interned once. The style record that ties
//! them together is interned the same way, so the emitted table never lists
//! the same component or record twice.

use std::collections::HashMap;
use std::fmt::Write as FmtWrite;
use std::hash::{BuildHasher, RandomState};

use crate::common::xml::escape_attribute;
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::namespace;
use crate::ooxml::xlsx::format::{
    Border, BorderSide, CellAlignment, CellXf, Color, ComponentKind, Fill, Font, NumberFormat, Style,
    StyleComponent,
};
use crate::ooxml::xlsx::styles::number_format::FIRST_CUSTOM_FORMAT_ID;

/// Index of an interned style in the `cellXfs` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StyleRef(usize);

impl StyleRef {
    /// The default style, always present at position 0.
    pub const DEFAULT: StyleRef = StyleRef(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Deduplicating style table.
///
/// Lookups are keyed by component kind and structural hash; entries sharing a
/// key are compared field by field, so a hash collision never merges two
/// different components.
#[derive(Debug, Clone)]
pub struct StyleCache<S = RandomState> {
    fonts: Vec<Font>,
    fills: Vec<Fill>,
    borders: Vec<Border>,
    /// Custom number format codes; entry `i` has ID `164 + i`
    number_formats: Vec<String>,
    cell_xfs: Vec<CellXf>,
    index: HashMap<(ComponentKind, u64), Vec<usize>>,
    hasher: S,
}

impl StyleCache {
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }
}

impl Default for StyleCache {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: BuildHasher> StyleCache<S> {
    /// Cache hashing components with `hasher`.
    pub fn with_hasher(hasher: S) -> Self {
        let mut cache = Self {
            fonts: Vec::new(),
            fills: Vec::new(),
            borders: Vec::new(),
            number_formats: Vec::new(),
            cell_xfs: Vec::new(),
            index: HashMap::new(),
            hasher,
        };
        cache.seed();
        cache
    }

    /// Mandatory entries every style table starts with.
    fn seed(&mut self) {
        self.intern_component(StyleComponent::Font(Font::default()));
        self.intern_component(StyleComponent::Fill(Fill::default()));
        self.intern_component(StyleComponent::Fill(Fill::gray125()));
        self.intern_component(StyleComponent::Border(Border::default()));
        self.intern_component(StyleComponent::CellXf(CellXf::default()));
    }

    /// Drop every interned entry and start over with the defaults.
    pub fn reset(&mut self) {
        self.fonts.clear();
        self.fills.clear();
        self.borders.clear();
        self.number_formats.clear();
        self.cell_xfs.clear();
        self.index.clear();
        self.seed();
    }

    /// Intern a style, returning the position of its record.
    ///
    /// Structurally equal styles always yield the same [`StyleRef`]. A
    /// built-in number format ID in the custom range is a style error and
    /// leaves the cache untouched.
    pub fn intern(&mut self, style: &Style) -> Result<StyleRef> {
        let num_fmt_id = self.number_format_id(&style.number_format)?;
        let font_id = self.intern_component(StyleComponent::Font(style.font.clone()));
        let fill_id = self.intern_component(StyleComponent::Fill(style.fill.clone()));
        let border_id = self.intern_component(StyleComponent::Border(style.border.clone()));

        let xf = CellXf {
            font_id,
            fill_id,
            border_id,
            num_fmt_id,
            alignment: style.alignment.clone(),
        };
        Ok(StyleRef(self.intern_component(StyleComponent::CellXf(xf))))
    }

    fn number_format_id(&mut self, format: &NumberFormat) -> Result<u32> {
        match format {
            NumberFormat::Builtin(id) if *id < FIRST_CUSTOM_FORMAT_ID => Ok(*id),
            NumberFormat::Builtin(id) => Err(OoxmlError::Style(format!(
                "number format {} is not a built-in format",
                id
            ))),
            NumberFormat::Custom(code) => {
                let slot = self.intern_component(StyleComponent::NumberFormat(code.clone()));
                Ok(FIRST_CUSTOM_FORMAT_ID + slot as u32)
            },
        }
    }

    /// Position of `component` within its kind's table, adding it if new.
    fn intern_component(&mut self, component: StyleComponent) -> usize {
        let key = (component.kind(), self.hasher.hash_one(&component));
        if let Some(slots) = self.index.get(&key)
            && let Some(&slot) = slots.iter().find(|&&slot| self.matches(slot, &component))
        {
            return slot;
        }

        let slot = match component {
            StyleComponent::Font(font) => push(&mut self.fonts, font),
            StyleComponent::Fill(fill) => push(&mut self.fills, fill),
            StyleComponent::Border(border) => push(&mut self.borders, border),
            StyleComponent::NumberFormat(code) => push(&mut self.number_formats, code),
            StyleComponent::CellXf(xf) => push(&mut self.cell_xfs, xf),
        };
        self.index.entry(key).or_default().push(slot);
        slot
    }

    fn matches(&self, slot: usize, component: &StyleComponent) -> bool {
        match component {
            StyleComponent::Font(font) => self.fonts.get(slot) == Some(font),
            StyleComponent::Fill(fill) => self.fills.get(slot) == Some(fill),
            StyleComponent::Border(border) => self.borders.get(slot) == Some(border),
            StyleComponent::NumberFormat(code) => self.number_formats.get(slot) == Some(code),
            StyleComponent::CellXf(xf) => self.cell_xfs.get(slot) == Some(xf),
        }
    }

    /// Style record for a reference.
    #[inline]
    pub fn cell_xf(&self, style: StyleRef) -> Option<&CellXf> {
        self.cell_xfs.get(style.0)
    }

    #[inline]
    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }

    #[inline]
    pub fn fill_count(&self) -> usize {
        self.fills.len()
    }

    #[inline]
    pub fn border_count(&self) -> usize {
        self.borders.len()
    }

    /// Number of custom number formats.
    #[inline]
    pub fn number_format_count(&self) -> usize {
        self.number_formats.len()
    }

    #[inline]
    pub fn style_count(&self) -> usize {
        self.cell_xfs.len()
    }

    /// Generate the complete styles.xml content.
    pub fn to_xml(&self) -> Result<String> {
        let mut xml = String::with_capacity(2048 + self.cell_xfs.len() * 96);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        write!(xml, r#"<styleSheet xmlns="{}">"#, namespace::SML_MAIN)?;

        if !self.number_formats.is_empty() {
            write!(xml, r#"<numFmts count="{}">"#, self.number_formats.len())?;
            for (i, code) in self.number_formats.iter().enumerate() {
                write!(
                    xml,
                    r#"<numFmt numFmtId="{}" formatCode="{}"/>"#,
                    FIRST_CUSTOM_FORMAT_ID as usize + i,
                    escape_attribute(code)
                )?;
            }
            xml.push_str("</numFmts>");
        }

        write!(xml, r#"<fonts count="{}">"#, self.fonts.len())?;
        for font in &self.fonts {
            xml.push_str("<font>");
            write_font_properties(&mut xml, font, "name")?;
            xml.push_str("</font>");
        }
        xml.push_str("</fonts>");

        write!(xml, r#"<fills count="{}">"#, self.fills.len())?;
        for fill in &self.fills {
            write_fill(&mut xml, fill);
        }
        xml.push_str("</fills>");

        write!(xml, r#"<borders count="{}">"#, self.borders.len())?;
        for border in &self.borders {
            write_border(&mut xml, border);
        }
        xml.push_str("</borders>");

        xml.push_str(r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#);

        write!(xml, r#"<cellXfs count="{}">"#, self.cell_xfs.len())?;
        for xf in &self.cell_xfs {
            write_xf(&mut xml, xf)?;
        }
        xml.push_str("</cellXfs>");

        xml.push_str(r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#);
        xml.push_str(r#"<dxfs count="0"/><tableStyles count="0" defaultTableStyle="TableStyleMedium2" defaultPivotStyle="PivotStyleLight16"/>"#);
        xml.push_str("</styleSheet>");

        Ok(xml)
    }
}

#[inline]
fn push<T>(items: &mut Vec<T>, item: T) -> usize {
    items.push(item);
    items.len() - 1
}

/// Write the children of a `<font>` or `<rPr>` element.
///
/// `name_tag` is `name` in the style table and `rFont` in rich-text runs.
pub(crate) fn write_font_properties(xml: &mut String, font: &Font, name_tag: &str) -> Result<()> {
    if font.bold {
        xml.push_str("<b/>");
    }
    if font.italic {
        xml.push_str("<i/>");
    }
    if font.strike {
        xml.push_str("<strike/>");
    }
    match font.underline.as_str() {
        "none" => {},
        "single" => xml.push_str("<u/>"),
        other => write!(xml, r#"<u val="{}"/>"#, other)?,
    }
    write!(xml, r#"<sz val="{}"/>"#, font.size)?;
    if let Some(color) = &font.color {
        write_color(xml, "color", color);
    }
    write!(xml, r#"<{} val="{}"/>"#, name_tag, escape_attribute(&font.name))?;
    if let Some(family) = font.family {
        write!(xml, r#"<family val="{}"/>"#, family)?;
    }
    if let Some(scheme) = font.scheme {
        write!(xml, r#"<scheme val="{}"/>"#, scheme.as_str())?;
    }
    Ok(())
}

fn write_color(xml: &mut String, tag: &str, color: &Color) {
    xml.push('<');
    xml.push_str(tag);
    match color {
        Color::Rgb(argb) => {
            xml.push_str(r#" rgb=""#);
            xml.push_str(argb.as_str());
            xml.push('"');
        },
        Color::Theme(index) => {
            xml.push_str(r#" theme=""#);
            xml.push_str(itoa::Buffer::new().format(*index));
            xml.push('"');
        },
        Color::Indexed(index) => {
            xml.push_str(r#" indexed=""#);
            xml.push_str(itoa::Buffer::new().format(*index));
            xml.push('"');
        },
        Color::Auto => xml.push_str(r#" auto="1""#),
    }
    xml.push_str("/>");
}

fn write_fill(xml: &mut String, fill: &Fill) {
    xml.push_str(r#"<fill><patternFill patternType=""#);
    xml.push_str(fill.pattern.as_str());
    xml.push('"');

    if fill.foreground.is_none() && fill.background.is_none() {
        xml.push_str("/></fill>");
        return;
    }

    xml.push('>');
    if let Some(color) = &fill.foreground {
        write_color(xml, "fgColor", color);
    }
    if let Some(color) = &fill.background {
        write_color(xml, "bgColor", color);
    }
    xml.push_str("</patternFill></fill>");
}

fn write_border(xml: &mut String, border: &Border) {
    xml.push_str("<border");
    if border.diagonal_up {
        xml.push_str(r#" diagonalUp="1""#);
    }
    if border.diagonal_down {
        xml.push_str(r#" diagonalDown="1""#);
    }
    xml.push('>');

    write_border_side(xml, "left", &border.left);
    write_border_side(xml, "right", &border.right);
    write_border_side(xml, "top", &border.top);
    write_border_side(xml, "bottom", &border.bottom);
    write_border_side(xml, "diagonal", &border.diagonal);

    xml.push_str("</border>");
}

fn write_border_side(xml: &mut String, tag: &str, side: &BorderSide) {
    xml.push('<');
    xml.push_str(tag);
    if side.is_none() && side.color.is_none() {
        xml.push_str("/>");
        return;
    }
    if !side.is_none() {
        xml.push_str(r#" style=""#);
        xml.push_str(side.style.as_str());
        xml.push('"');
    }
    xml.push('>');
    if let Some(color) = &side.color {
        write_color(xml, "color", color);
    }
    xml.push_str("</");
    xml.push_str(tag);
    xml.push('>');
}

fn write_xf(xml: &mut String, xf: &CellXf) -> Result<()> {
    write!(
        xml,
        r#"<xf numFmtId="{}" fontId="{}" fillId="{}" borderId="{}" xfId="0""#,
        xf.num_fmt_id, xf.font_id, xf.fill_id, xf.border_id
    )?;

    if xf.num_fmt_id != 0 {
        xml.push_str(r#" applyNumberFormat="1""#);
    }
    if xf.font_id != 0 {
        xml.push_str(r#" applyFont="1""#);
    }
    if xf.fill_id != 0 {
        xml.push_str(r#" applyFill="1""#);
    }
    if xf.border_id != 0 {
        xml.push_str(r#" applyBorder="1""#);
    }

    if xf.alignment.is_default() {
        xml.push_str("/>");
        return Ok(());
    }

    xml.push_str(r#" applyAlignment="1"><alignment"#);
    write_alignment_attributes(xml, &xf.alignment)?;
    xml.push_str("/></xf>");
    Ok(())
}

fn write_alignment_attributes(xml: &mut String, alignment: &CellAlignment) -> Result<()> {
    let defaults = CellAlignment::default();
    if alignment.horizontal != defaults.horizontal {
        write!(xml, r#" horizontal="{}""#, alignment.horizontal.as_str())?;
    }
    if alignment.vertical != defaults.vertical {
        write!(xml, r#" vertical="{}""#, alignment.vertical.as_str())?;
    }
    if alignment.text_rotation != 0 {
        write!(xml, r#" textRotation="{}""#, alignment.text_rotation)?;
    }
    if alignment.wrap_text {
        xml.push_str(r#" wrapText="1""#);
    }
    if alignment.indent != 0 {
        write!(xml, r#" indent="{}""#, alignment.indent)?;
    }
    if alignment.shrink_to_fit {
        xml.push_str(r#" shrinkToFit="1""#);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::hash::{BuildHasherDefault, Hasher};

    use proptest::prelude::*;

    use super::*;
    use crate::ooxml::xlsx::format::{BorderStyle, HorizontalAlignment};
    use crate::ooxml::xlsx::styles::StyleReaderContainer;

    /// Hashes everything to the same value.
    #[derive(Default)]
    struct CollidingHasher;

    impl Hasher for CollidingHasher {
        fn finish(&self) -> u64 {
            7
        }

        fn write(&mut self, _bytes: &[u8]) {}
    }

    fn bold_red() -> Style {
        Style::new()
            .with_font(Font::default().with_bold(true).with_color(Color::rgb("FF0000").unwrap()))
            .with_fill(Fill::solid(Color::rgb("FFFF00").unwrap()))
    }

    #[test]
    fn test_seeded_defaults() {
        let cache = StyleCache::new();
        assert_eq!(cache.font_count(), 1);
        assert_eq!(cache.fill_count(), 2);
        assert_eq!(cache.border_count(), 1);
        assert_eq!(cache.style_count(), 1);
        assert_eq!(cache.number_format_count(), 0);
    }

    #[test]
    fn test_default_style_is_zero() {
        let mut cache = StyleCache::new();
        assert_eq!(cache.intern(&Style::default()).unwrap(), StyleRef::DEFAULT);
        assert_eq!(cache.style_count(), 1);
    }

    #[test]
    fn test_intern_is_idempotent() {
        let mut cache = StyleCache::new();
        let a = cache.intern(&bold_red()).unwrap();
        let b = cache.intern(&bold_red()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.index(), 1);
        assert_eq!(cache.style_count(), 2);
        assert_eq!(cache.font_count(), 2);
        assert_eq!(cache.fill_count(), 3);
    }

    #[test]
    fn test_components_are_shared() {
        let mut cache = StyleCache::new();
        let boxed = Style::new().with_border(Border::outline(BorderStyle::Thin, None));
        let boxed_centered = boxed.clone().with_alignment(CellAlignment {
            horizontal: HorizontalAlignment::Center,
            ..CellAlignment::default()
        });

        let a = cache.intern(&boxed).unwrap();
        let b = cache.intern(&boxed_centered).unwrap();
        assert_ne!(a, b);
        assert_eq!(cache.border_count(), 2);
        assert_eq!(cache.cell_xf(a).unwrap().border_id, cache.cell_xf(b).unwrap().border_id);
    }

    #[test]
    fn test_custom_number_formats_start_at_164() {
        let mut cache = StyleCache::new();
        let money = Style::new().with_number_format(NumberFormat::custom("#,##0.000").unwrap());
        let day = Style::new().with_number_format(NumberFormat::custom("yyyy-mm-dd").unwrap());
        let percent = Style::new().with_number_format(NumberFormat::builtin(10).unwrap());

        let money_ref = cache.intern(&money).unwrap();
        let day_ref = cache.intern(&day).unwrap();
        let percent_ref = cache.intern(&percent).unwrap();
        cache.intern(&money).unwrap();

        assert_eq!(cache.cell_xf(money_ref).unwrap().num_fmt_id, 164);
        assert_eq!(cache.cell_xf(day_ref).unwrap().num_fmt_id, 165);
        assert_eq!(cache.cell_xf(percent_ref).unwrap().num_fmt_id, 10);
        assert_eq!(cache.number_format_count(), 2);
    }

    #[test]
    fn test_builtin_id_in_custom_range_is_rejected() {
        let mut cache = StyleCache::new();
        let bogus = Style::new().with_number_format(NumberFormat::Builtin(200));
        assert!(matches!(cache.intern(&bogus), Err(OoxmlError::Style(_))));
        // nothing was added, and the default style keeps its own ref
        assert_eq!(cache.style_count(), 1);
        assert_eq!(cache.intern(&Style::new()).unwrap(), StyleRef::DEFAULT);
    }

    #[test]
    fn test_collisions_fall_back_to_equality() {
        let mut cache = StyleCache::with_hasher(BuildHasherDefault::<CollidingHasher>::default());
        let a = cache.intern(&bold_red()).unwrap();
        let b = cache.intern(&Style::new().with_font(Font::default().with_italic(true))).unwrap();
        let c = cache.intern(&bold_red()).unwrap();

        assert_ne!(a, b);
        assert_eq!(a, c);
        assert_eq!(cache.style_count(), 3);
        assert_eq!(cache.font_count(), 3);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut cache = StyleCache::new();
        cache.intern(&bold_red()).unwrap();
        cache.reset();
        assert_eq!(cache.style_count(), 1);
        assert_eq!(cache.fill_count(), 2);
        assert_eq!(cache.intern(&bold_red()).unwrap().index(), 1);
    }

    #[test]
    fn test_xml_reads_back() {
        let mut cache = StyleCache::new();
        let style = bold_red()
            .with_number_format(NumberFormat::custom("0.0%\"<x>\"").unwrap())
            .with_border(Border::outline(BorderStyle::Dashed, Some(Color::Theme(4))));
        let style_ref = cache.intern(&style).unwrap();

        let xml = cache.to_xml().unwrap();
        assert!(xml.contains(r#"<numFmt numFmtId="164" formatCode="0.0%&quot;&lt;x&gt;&quot;"/>"#));
        assert!(xml.contains(r#"<fill><patternFill patternType="gray125"/></fill>"#));

        let parsed = StyleReaderContainer::parse(xml.as_bytes()).unwrap();
        assert_eq!(parsed.resolve_style(style_ref.index()).unwrap(), Some(style));
        assert_eq!(parsed.resolve_style(0).unwrap(), Some(Style::default()));
    }

    fn arb_style() -> impl Strategy<Value = Style> {
        (any::<bool>(), any::<bool>(), 0u8..4, 0usize..3, prop::option::of("[0#.,]{1,6}")).prop_map(
            |(bold, italic, size, pattern, code)| {
                let fill = match pattern {
                    0 => Fill::default(),
                    1 => Fill::gray125(),
                    _ => Fill::solid(Color::Theme(u32::from(size))),
                };
                let number_format = code
                    .and_then(|c| NumberFormat::custom(c).ok())
                    .unwrap_or_default();
                Style::new()
                    .with_font(
                        Font::default()
                            .with_bold(bold)
                            .with_italic(italic)
                            .with_size(9.0 + f64::from(size)),
                    )
                    .with_fill(fill)
                    .with_number_format(number_format)
            },
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn prop_equal_styles_share_a_ref(styles in prop::collection::vec(arb_style(), 1..24)) {
            let mut cache = StyleCache::new();
            let refs: Vec<StyleRef> = styles.iter().map(|s| cache.intern(s).unwrap()).collect();

            for (i, a) in styles.iter().enumerate() {
                for (j, b) in styles.iter().enumerate() {
                    prop_assert_eq!(a == b, refs[i] == refs[j]);
                }
            }
            // Re-interning never grows the table
            let count = cache.style_count();
            for style in &styles {
                cache.intern(style).unwrap();
            }
            prop_assert_eq!(cache.style_count(), count);
        }
    }
}
