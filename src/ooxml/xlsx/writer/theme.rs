//! Theme part (`xl/theme/theme1.xml`).
//!
//! Theme colors are what `theme="n"` color references in the style table
//! point at, and the major/minor fonts back the `scheme` font attribute.

use std::fmt::Write as FmtWrite;

use crate::common::xml::escape_attribute;
use crate::ooxml::error::Result;

const DRAWINGML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";

/// Element names of the twelve color slots, in theme index order.
const COLOR_SLOTS: [&str; 12] = [
    "dk1", "lt1", "dk2", "lt2", "accent1", "accent2", "accent3", "accent4", "accent5", "accent6",
    "hlink", "folHlink",
];

/// A document theme: color scheme and font scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub name: String,
    pub major_font: String,
    pub minor_font: String,
    /// RGB hex colors for the slots `dk1`, `lt1`, `dk2`, `lt2`, the six accents, `hlink`, `folHlink`
    pub colors: [String; 12],
}

impl Theme {
    /// The default Office theme.
    pub fn office() -> Self {
        let colors = [
            "000000", "FFFFFF", "44546A", "E7E6E6", "4472C4", "ED7D31", "A5A5A5", "FFC000",
            "5B9BD5", "70AD47", "0563C1", "954F72",
        ]
        .map(str::to_string);

        Self {
            name: "Office Theme".to_string(),
            major_font: "Calibri Light".to_string(),
            minor_font: "Calibri".to_string(),
            colors,
        }
    }

    pub fn to_xml(&self) -> Result<String> {
        let mut xml = String::with_capacity(2048);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        write!(
            xml,
            r#"<a:theme xmlns:a="{}" name="{}"><a:themeElements>"#,
            DRAWINGML_NS,
            escape_attribute(&self.name)
        )?;

        xml.push_str(r#"<a:clrScheme name="Office">"#);
        for (slot, rgb) in COLOR_SLOTS.iter().zip(&self.colors) {
            // dk1/lt1 are conventionally system colors; plain RGB is equivalent
            write!(xml, r#"<a:{0}><a:srgbClr val="{1}"/></a:{0}>"#, slot, escape_attribute(rgb))?;
        }
        xml.push_str("</a:clrScheme>");

        xml.push_str(r#"<a:fontScheme name="Office">"#);
        for (tag, typeface) in [("majorFont", &self.major_font), ("minorFont", &self.minor_font)] {
            write!(
                xml,
                r#"<a:{0}><a:latin typeface="{1}"/><a:ea typeface=""/><a:cs typeface=""/></a:{0}>"#,
                tag,
                escape_attribute(typeface)
            )?;
        }
        xml.push_str("</a:fontScheme>");

        write_format_scheme(&mut xml);

        xml.push_str("</a:themeElements><a:objectDefaults/><a:extraClrSchemeLst/></a:theme>");
        Ok(xml)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::office()
    }
}

/// Minimal format scheme; each list must hold exactly three entries.
fn write_format_scheme(xml: &mut String) {
    const SOLID: &str = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;

    xml.push_str(r#"<a:fmtScheme name="Office"><a:fillStyleLst>"#);
    for _ in 0..3 {
        xml.push_str(SOLID);
    }
    xml.push_str("</a:fillStyleLst><a:lnStyleLst>");
    for width in [6350, 12700, 19050] {
        xml.push_str(r#"<a:ln w=""#);
        xml.push_str(itoa::Buffer::new().format(width));
        xml.push_str(r#"" cap="flat" cmpd="sng" algn="ctr">"#);
        xml.push_str(SOLID);
        xml.push_str(r#"<a:prstDash val="solid"/></a:ln>"#);
    }
    xml.push_str("</a:lnStyleLst><a:effectStyleLst>");
    for _ in 0..3 {
        xml.push_str("<a:effectStyle><a:effectLst/></a:effectStyle>");
    }
    xml.push_str("</a:effectStyleLst><a:bgFillStyleLst>");
    for _ in 0..3 {
        xml.push_str(SOLID);
    }
    xml.push_str("</a:bgFillStyleLst></a:fmtScheme>");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_office_theme_xml() {
        let xml = Theme::office().to_xml().unwrap();
        assert!(xml.contains(r#"name="Office Theme""#));
        assert!(xml.contains(r#"<a:accent1><a:srgbClr val="4472C4"/></a:accent1>"#));
        assert!(xml.contains(r#"<a:minorFont><a:latin typeface="Calibri"/>"#));
        assert_eq!(xml.matches("<a:effectStyle>").count(), 3);
        assert_eq!(xml.matches("<a:ln ").count(), 3);
    }

    #[test]
    fn test_custom_fonts_are_escaped() {
        let mut theme = Theme::default();
        theme.major_font = "Fira \"Sans\"".to_string();
        let xml = theme.to_xml().unwrap();
        assert!(xml.contains(r#"typeface="Fira &quot;Sans&quot;""#));
    }
}
