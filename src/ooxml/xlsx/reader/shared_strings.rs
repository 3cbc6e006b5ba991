//! Reader for `xl/sharedStrings.xml`.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::common::xml::resolve_entity;
use crate::ooxml::error::Result;
use crate::ooxml::xlsx::format::{SharedText, TextRun};
use crate::ooxml::xlsx::styles::parse_font_body;

/// Parse the shared-text table, keeping entry order and rich runs.
///
/// Phonetic runs (`<rPh>`) are not part of the cell text and are skipped.
pub(crate) fn parse_shared_strings(content: &[u8]) -> Result<Vec<SharedText>> {
    let mut reader = Reader::from_reader(content);
    let mut entries = Vec::new();
    let mut buf = Vec::with_capacity(512);

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"si" => {
                entries.push(read_entry(&mut reader)?);
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => {
                entries.push(SharedText::Plain(String::new()));
            },
            Event::Eof => break,
            _ => {},
        }
    }

    Ok(entries)
}

/// Read one `<si>` body up to its end tag.
fn read_entry(reader: &mut Reader<&[u8]>) -> Result<SharedText> {
    let mut plain = String::new();
    let mut runs: Vec<TextRun> = Vec::new();
    let mut current: Option<TextRun> = None;
    let mut in_text = false;
    let mut phonetic_depth = 0usize;
    let mut buf = Vec::with_capacity(256);

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"rPh" => phonetic_depth += 1,
                b"r" if phonetic_depth == 0 => current = Some(TextRun::new(String::new(), None)),
                b"rPr" => {
                    let font = parse_font_body(reader, b"rPr")?;
                    if let Some(run) = current.as_mut() {
                        run.font = Some(font);
                    }
                },
                b"t" => in_text = phonetic_depth == 0,
                _ => {},
            },
            Event::Text(t) if in_text => {
                push_text(&mut current, &mut plain, &t.decode()?);
            },
            Event::CData(t) if in_text => {
                push_text(&mut current, &mut plain, &String::from_utf8_lossy(&t.into_inner()));
            },
            Event::GeneralRef(r) if in_text => {
                let name = r.decode()?;
                match resolve_entity(&name) {
                    Some(c) => push_text(&mut current, &mut plain, c.encode_utf8(&mut [0; 4])),
                    None => log::warn!("unknown entity '&{};' in shared text", name),
                }
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"r" if phonetic_depth == 0 => runs.extend(current.take()),
                b"si" => break,
                _ => {},
            },
            Event::Eof => break,
            _ => {},
        }
    }

    if runs.is_empty() {
        Ok(SharedText::Plain(plain))
    } else {
        Ok(SharedText::Rich(runs))
    }
}

fn push_text(current: &mut Option<TextRun>, plain: &mut String, text: &str) {
    match current {
        Some(run) => run.text.push_str(text),
        None => plain.push_str(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_and_rich_entries() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3">
<si><t xml:space="preserve"> padded &amp; kept </t></si>
<si><r><rPr><b/><sz val="11"/><rFont val="Calibri"/></rPr><t>bold</t></r><r><t> plain</t></r></si>
<si><t/></si>
</sst>"#;

        let entries = parse_shared_strings(xml).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], SharedText::Plain(" padded & kept ".into()));

        let SharedText::Rich(runs) = &entries[1] else {
            panic!("expected rich text");
        };
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].text, "bold");
        assert!(runs[0].font.as_ref().unwrap().bold);
        assert_eq!(runs[1], TextRun::new(" plain", None));

        assert_eq!(entries[2], SharedText::Plain(String::new()));
    }

    #[test]
    fn test_phonetic_runs_are_skipped() {
        let xml = br#"<sst><si><t>kanji</t><rPh sb="0" eb="1"><t>kana</t></rPh></si></sst>"#;
        let entries = parse_shared_strings(xml).unwrap();
        assert_eq!(entries, vec![SharedText::Plain("kanji".into())]);
    }

    #[test]
    fn test_character_references() {
        let xml = br#"<sst><si><t>&#x1F600;&lt;</t></si></sst>"#;
        let entries = parse_shared_strings(xml).unwrap();
        assert_eq!(entries, vec![SharedText::Plain("\u{1F600}<".into())]);
    }
}
