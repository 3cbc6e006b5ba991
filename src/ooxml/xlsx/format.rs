//! Shared formatting types for XLSX (used in both reading and writing).
//!
//! A [`Style`] aggregates one of each component. Components compare and hash
//! structurally, which is what the writer's style cache deduplicates on.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::xlsx::styles::number_format::{FIRST_CUSTOM_FORMAT_ID, builtin_format_code};

/// Eight uppercase hex digits of a validated ARGB color.
///
/// Only [`Color::rgb`] builds one, so every value is well formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Argb(String);

impl Argb {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Argb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Color reference used by fonts, fills and borders.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Color {
    /// ARGB value
    Rgb(Argb),
    /// Theme palette index
    Theme(u32),
    /// Legacy indexed palette entry
    Indexed(u32),
    /// Application-defined automatic color
    Auto,
}

impl Color {
    /// Parse an RGB code: `RRGGBB`, `AARRGGBB`, optionally prefixed with `#`.
    ///
    /// ```
    /// use kumquat::ooxml::xlsx::Color;
    /// assert_eq!(Color::rgb("#ff0000").unwrap().argb(), Some("FFFF0000"));
    /// assert!(Color::rgb("red").is_err());
    /// ```
    pub fn rgb(code: &str) -> Result<Self> {
        let hex = code.strip_prefix('#').unwrap_or(code);
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(OoxmlError::Style(format!("malformed color code '{}'", code)));
        }
        match hex.len() {
            6 => Ok(Color::Rgb(Argb(format!("FF{}", hex.to_ascii_uppercase())))),
            8 => Ok(Color::Rgb(Argb(hex.to_ascii_uppercase()))),
            _ => Err(OoxmlError::Style(format!("malformed color code '{}'", code))),
        }
    }

    /// The ARGB value of an explicit color.
    pub fn argb(&self) -> Option<&str> {
        match self {
            Color::Rgb(argb) => Some(argb.as_str()),
            _ => None,
        }
    }
}

/// Font underline variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Underline {
    #[default]
    None,
    Single,
    Double,
    SingleAccounting,
    DoubleAccounting,
}

impl Underline {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Single => "single",
            Self::Double => "double",
            Self::SingleAccounting => "singleAccounting",
            Self::DoubleAccounting => "doubleAccounting",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "none" => Some(Self::None),
            "single" => Some(Self::Single),
            "double" => Some(Self::Double),
            "singleAccounting" => Some(Self::SingleAccounting),
            "doubleAccounting" => Some(Self::DoubleAccounting),
            _ => None,
        }
    }
}

/// Theme font scheme a font belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontScheme {
    Major,
    Minor,
}

impl FontScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
        }
    }
}

/// Font properties for a cell.
#[derive(Debug, Clone)]
pub struct Font {
    pub name: String,
    /// Size in points
    pub size: f64,
    pub bold: bool,
    pub italic: bool,
    pub strike: bool,
    pub underline: Underline,
    pub color: Option<Color>,
    pub family: Option<u32>,
    pub scheme: Option<FontScheme>,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            name: "Calibri".to_string(),
            size: 11.0,
            bold: false,
            italic: false,
            strike: false,
            underline: Underline::None,
            color: None,
            family: Some(2),
            scheme: Some(FontScheme::Minor),
        }
    }
}

impl Font {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn with_italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }
}

// f64 has no Eq/Hash; compare sizes by bit pattern.
impl PartialEq for Font {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.size.to_bits() == other.size.to_bits()
            && self.bold == other.bold
            && self.italic == other.italic
            && self.strike == other.strike
            && self.underline == other.underline
            && self.color == other.color
            && self.family == other.family
            && self.scheme == other.scheme
    }
}

impl Eq for Font {}

impl Hash for Font {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.size.to_bits().hash(state);
        self.bold.hash(state);
        self.italic.hash(state);
        self.strike.hash(state);
        self.underline.hash(state);
        self.color.hash(state);
        self.family.hash(state);
        self.scheme.hash(state);
    }
}

/// Cell fill pattern types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PatternType {
    #[default]
    None,
    Solid,
    MediumGray,
    DarkGray,
    LightGray,
    DarkHorizontal,
    DarkVertical,
    DarkDown,
    DarkUp,
    DarkGrid,
    DarkTrellis,
    LightHorizontal,
    LightVertical,
    LightDown,
    LightUp,
    LightGrid,
    LightTrellis,
    Gray125,
    Gray0625,
}

static PATTERN_TYPES: phf::Map<&'static str, PatternType> = phf::phf_map! {
    "none" => PatternType::None,
    "solid" => PatternType::Solid,
    "mediumGray" => PatternType::MediumGray,
    "darkGray" => PatternType::DarkGray,
    "lightGray" => PatternType::LightGray,
    "darkHorizontal" => PatternType::DarkHorizontal,
    "darkVertical" => PatternType::DarkVertical,
    "darkDown" => PatternType::DarkDown,
    "darkUp" => PatternType::DarkUp,
    "darkGrid" => PatternType::DarkGrid,
    "darkTrellis" => PatternType::DarkTrellis,
    "lightHorizontal" => PatternType::LightHorizontal,
    "lightVertical" => PatternType::LightVertical,
    "lightDown" => PatternType::LightDown,
    "lightUp" => PatternType::LightUp,
    "lightGrid" => PatternType::LightGrid,
    "lightTrellis" => PatternType::LightTrellis,
    "gray125" => PatternType::Gray125,
    "gray0625" => PatternType::Gray0625,
};

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Solid => "solid",
            Self::MediumGray => "mediumGray",
            Self::DarkGray => "darkGray",
            Self::LightGray => "lightGray",
            Self::DarkHorizontal => "darkHorizontal",
            Self::DarkVertical => "darkVertical",
            Self::DarkDown => "darkDown",
            Self::DarkUp => "darkUp",
            Self::DarkGrid => "darkGrid",
            Self::DarkTrellis => "darkTrellis",
            Self::LightHorizontal => "lightHorizontal",
            Self::LightVertical => "lightVertical",
            Self::LightDown => "lightDown",
            Self::LightUp => "lightUp",
            Self::LightGrid => "lightGrid",
            Self::LightTrellis => "lightTrellis",
            Self::Gray125 => "gray125",
            Self::Gray0625 => "gray0625",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        PATTERN_TYPES.get(name).copied()
    }
}

/// Fill properties for a cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Fill {
    pub pattern: PatternType,
    pub foreground: Option<Color>,
    pub background: Option<Color>,
}

impl Fill {
    /// Solid fill in one color.
    pub fn solid(color: Color) -> Self {
        Self {
            pattern: PatternType::Solid,
            foreground: Some(color),
            background: None,
        }
    }

    /// The mandatory second fill of every style table.
    pub fn gray125() -> Self {
        Self {
            pattern: PatternType::Gray125,
            ..Self::default()
        }
    }
}

/// Border line styles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BorderStyle {
    #[default]
    None,
    Thin,
    Medium,
    Dashed,
    Dotted,
    Thick,
    Double,
    Hair,
    MediumDashed,
    DashDot,
    MediumDashDot,
    DashDotDot,
    MediumDashDotDot,
    SlantDashDot,
}

static BORDER_STYLES: phf::Map<&'static str, BorderStyle> = phf::phf_map! {
    "none" => BorderStyle::None,
    "thin" => BorderStyle::Thin,
    "medium" => BorderStyle::Medium,
    "dashed" => BorderStyle::Dashed,
    "dotted" => BorderStyle::Dotted,
    "thick" => BorderStyle::Thick,
    "double" => BorderStyle::Double,
    "hair" => BorderStyle::Hair,
    "mediumDashed" => BorderStyle::MediumDashed,
    "dashDot" => BorderStyle::DashDot,
    "mediumDashDot" => BorderStyle::MediumDashDot,
    "dashDotDot" => BorderStyle::DashDotDot,
    "mediumDashDotDot" => BorderStyle::MediumDashDotDot,
    "slantDashDot" => BorderStyle::SlantDashDot,
};

impl BorderStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Thin => "thin",
            Self::Medium => "medium",
            Self::Dashed => "dashed",
            Self::Dotted => "dotted",
            Self::Thick => "thick",
            Self::Double => "double",
            Self::Hair => "hair",
            Self::MediumDashed => "mediumDashed",
            Self::DashDot => "dashDot",
            Self::MediumDashDot => "mediumDashDot",
            Self::DashDotDot => "dashDotDot",
            Self::MediumDashDotDot => "mediumDashDotDot",
            Self::SlantDashDot => "slantDashDot",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        BORDER_STYLES.get(name).copied()
    }
}

/// One edge of a border.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BorderSide {
    pub style: BorderStyle,
    pub color: Option<Color>,
}

impl BorderSide {
    pub fn new(style: BorderStyle, color: Option<Color>) -> Self {
        Self { style, color }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.style == BorderStyle::None
    }
}

/// Border properties for a cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Border {
    pub left: BorderSide,
    pub right: BorderSide,
    pub top: BorderSide,
    pub bottom: BorderSide,
    pub diagonal: BorderSide,
    pub diagonal_up: bool,
    pub diagonal_down: bool,
}

impl Border {
    /// Same line on all four outer edges.
    pub fn outline(style: BorderStyle, color: Option<Color>) -> Self {
        let side = BorderSide::new(style, color);
        Self {
            left: side.clone(),
            right: side.clone(),
            top: side.clone(),
            bottom: side,
            ..Self::default()
        }
    }
}

/// Number format of a style: a built-in ID or a custom format code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NumberFormat {
    Builtin(u32),
    Custom(String),
}

impl Default for NumberFormat {
    fn default() -> Self {
        NumberFormat::Builtin(0)
    }
}

impl NumberFormat {
    /// Built-in format by ID; IDs from 164 upward are reserved for custom formats.
    pub fn builtin(id: u32) -> Result<Self> {
        if id >= FIRST_CUSTOM_FORMAT_ID {
            return Err(OoxmlError::Style(format!(
                "number format {} is not a built-in format",
                id
            )));
        }
        Ok(NumberFormat::Builtin(id))
    }

    /// Custom format code such as `0.000` or `yyyy-mm-dd`.
    pub fn custom(code: impl Into<String>) -> Result<Self> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err(OoxmlError::Style("empty number format code".to_string()));
        }
        Ok(NumberFormat::Custom(code))
    }

    /// The format code when it is known.
    pub fn code(&self) -> Option<&str> {
        match self {
            NumberFormat::Builtin(id) => builtin_format_code(*id),
            NumberFormat::Custom(code) => Some(code),
        }
    }

    #[inline]
    pub fn is_general(&self) -> bool {
        matches!(self, NumberFormat::Builtin(0))
    }
}

/// Horizontal alignment of cell content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HorizontalAlignment {
    #[default]
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
    CenterContinuous,
    Distributed,
}

impl HorizontalAlignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Fill => "fill",
            Self::Justify => "justify",
            Self::CenterContinuous => "centerContinuous",
            Self::Distributed => "distributed",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "general" => Some(Self::General),
            "left" => Some(Self::Left),
            "center" => Some(Self::Center),
            "right" => Some(Self::Right),
            "fill" => Some(Self::Fill),
            "justify" => Some(Self::Justify),
            "centerContinuous" => Some(Self::CenterContinuous),
            "distributed" => Some(Self::Distributed),
            _ => None,
        }
    }
}

/// Vertical alignment of cell content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum VerticalAlignment {
    #[default]
    Bottom,
    Top,
    Center,
    Justify,
    Distributed,
}

impl VerticalAlignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bottom => "bottom",
            Self::Top => "top",
            Self::Center => "center",
            Self::Justify => "justify",
            Self::Distributed => "distributed",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bottom" => Some(Self::Bottom),
            "top" => Some(Self::Top),
            "center" => Some(Self::Center),
            "justify" => Some(Self::Justify),
            "distributed" => Some(Self::Distributed),
            _ => None,
        }
    }
}

/// Alignment properties, stored inline in a style record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CellAlignment {
    pub horizontal: HorizontalAlignment,
    pub vertical: VerticalAlignment,
    pub wrap_text: bool,
    pub shrink_to_fit: bool,
    pub indent: u32,
    pub text_rotation: u32,
}

impl CellAlignment {
    #[inline]
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Complete formatting of a cell.
///
/// Two styles with equal fields are the same style; the writer emits it once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Style {
    pub font: Font,
    pub fill: Fill,
    pub border: Border,
    pub number_format: NumberFormat,
    pub alignment: CellAlignment,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font(mut self, font: Font) -> Self {
        self.font = font;
        self
    }

    pub fn with_fill(mut self, fill: Fill) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_border(mut self, border: Border) -> Self {
        self.border = border;
        self
    }

    pub fn with_number_format(mut self, number_format: NumberFormat) -> Self {
        self.number_format = number_format;
        self
    }

    pub fn with_alignment(mut self, alignment: CellAlignment) -> Self {
        self.alignment = alignment;
        self
    }
}

/// A style record as stored in the style table: component indices plus inline alignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CellXf {
    pub font_id: usize,
    pub fill_id: usize,
    pub border_id: usize,
    pub num_fmt_id: u32,
    pub alignment: CellAlignment,
}

/// Discriminant of a [`StyleComponent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Font = 0,
    Fill = 1,
    Border = 2,
    NumberFormat = 3,
    CellXf = 4,
}

impl ComponentKind {
    pub const COUNT: usize = 5;
}

/// Any entry of the style table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StyleComponent {
    Font(Font),
    Fill(Fill),
    Border(Border),
    NumberFormat(String),
    CellXf(CellXf),
}

impl StyleComponent {
    #[inline]
    pub fn kind(&self) -> ComponentKind {
        match self {
            StyleComponent::Font(_) => ComponentKind::Font,
            StyleComponent::Fill(_) => ComponentKind::Fill,
            StyleComponent::Border(_) => ComponentKind::Border,
            StyleComponent::NumberFormat(_) => ComponentKind::NumberFormat,
            StyleComponent::CellXf(_) => ComponentKind::CellXf,
        }
    }
}

/// A run of rich text with its own optional font.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextRun {
    pub text: String,
    pub font: Option<Font>,
}

impl TextRun {
    pub fn new(text: impl Into<String>, font: Option<Font>) -> Self {
        Self {
            text: text.into(),
            font,
        }
    }
}

/// An entry of the shared-text table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SharedText {
    Plain(String),
    Rich(Vec<TextRun>),
}

impl SharedText {
    /// Concatenated text of all runs.
    pub fn plain_text(&self) -> String {
        match self {
            SharedText::Plain(text) => text.clone(),
            SharedText::Rich(runs) => runs.iter().map(|r| r.text.as_str()).collect(),
        }
    }
}
