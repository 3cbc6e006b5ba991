#![cfg(test)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};

use super::entry_text;
use crate::ooxml::common::DocumentProperties;
use crate::ooxml::xlsx::protection::{HashAlgorithm, PasswordHash};
use crate::ooxml::xlsx::{
    Border, BorderStyle, CellValue, Color, Fill, Font, GlobalEnforcingType, NumberFormat,
    ReaderOptions, Sha512PasswordHasher, SheetPermissions, SheetProtection, SheetState, Style, TextRun, Workbook,
    WorkbookProtection, WriterOptions,
};

fn header_style() -> Style {
    Style::new()
        .with_font(Font::default().with_bold(true).with_color(Color::rgb("1F4E79").expect("rgb")))
        .with_fill(Fill::solid(Color::Theme(4)))
        .with_border(Border::outline(BorderStyle::Thin, None))
}

fn sample_workbook() -> Workbook {
    let mut wb = Workbook::new();
    {
        let ws = wb.add_worksheet("Data").expect("add Data");
        ws.set_value(0, 0, "Name").expect("A1");
        ws.set_value(0, 1, 42i64).expect("B1");
        ws.set_value(0, 2, 2.5).expect("C1");
        ws.set_value(0, 3, true).expect("D1");
        ws.set_value(
            0,
            4,
            NaiveDate::from_ymd_opt(2024, 2, 29)
                .and_then(|d| d.and_hms_opt(10, 30, 0))
                .expect("date"),
        )
        .expect("E1");
        ws.set_value(0, 5, NaiveTime::from_hms_opt(12, 0, 0).expect("time"))
            .expect("F1");
        ws.set_value(
            1,
            0,
            CellValue::RichText(vec![
                TextRun::new("bold", Some(Font::default().with_bold(true))),
                TextRun::new(" tail", None),
            ]),
        )
        .expect("A2");
        ws.set_value(1, 1, CellValue::Formula("SUM(B1:C1)".into()))
            .expect("B2");
        ws.set_value(1, 2, CellValue::Decimal("0.10".into())).expect("C2");
        ws.set_value(1, 3, "a < b & \"c\"").expect("D2");
        ws.set_style(0, 0, header_style()).expect("style A1");
        ws.set_style(3, 3, header_style()).expect("style D4");
        ws.protect(SheetProtection::new().with_password("secret"));
    }
    {
        let ws = wb.add_worksheet("Archive").expect("add Archive");
        ws.set_value(0, 0, "Name").expect("A1");
        ws.set_state(SheetState::Hidden);
    }
    wb.set_properties(
        DocumentProperties::new()
            .title("Quarterly")
            .creator("Finance"),
    );
    wb.properties_mut().created = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).single();
    wb.set_protection(Some(WorkbookProtection::structure().with_password("secret")));
    wb
}

#[test]
fn values_survive_a_round_trip() {
    let bytes = sample_workbook().to_bytes().expect("write");
    let wb = Workbook::from_bytes(bytes).expect("read");

    assert_eq!(wb.sheet_count(), 2);
    let ws = wb.worksheet_by_name("Data").expect("Data sheet");
    assert_eq!(ws.value(0, 0), Some(&CellValue::Text("Name".into())));
    assert_eq!(ws.value(0, 1), Some(&CellValue::Int(42)));
    assert_eq!(ws.value(0, 2), Some(&CellValue::Float(2.5)));
    assert_eq!(ws.value(0, 3), Some(&CellValue::Bool(true)));
    assert_eq!(
        ws.value(0, 4),
        Some(&CellValue::Date(
            NaiveDate::from_ymd_opt(2024, 2, 29)
                .and_then(|d| d.and_hms_opt(10, 30, 0))
                .expect("date")
        ))
    );
    assert_eq!(
        ws.value(0, 5),
        Some(&CellValue::Time(NaiveTime::from_hms_opt(12, 0, 0).expect("time")))
    );
    assert_eq!(ws.value(1, 1), Some(&CellValue::Formula("SUM(B1:C1)".into())));
    // decimals are stored as plain numbers
    assert_eq!(ws.value(1, 2), Some(&CellValue::Float(0.1)));
    assert_eq!(ws.value(1, 3), Some(&CellValue::Text("a < b & \"c\"".into())));

    match ws.value(1, 0) {
        Some(CellValue::RichText(runs)) => {
            assert_eq!(runs.len(), 2);
            assert_eq!(runs[0].text, "bold");
            assert!(runs[0].font.as_ref().is_some_and(|f| f.bold));
            assert_eq!(runs[1].text, " tail");
            assert!(runs[1].font.is_none());
        },
        other => panic!("unexpected value for A2: {:?}", other),
    }
}

#[test]
fn styles_survive_a_round_trip() {
    let bytes = sample_workbook().to_bytes().expect("write");
    let wb = Workbook::from_bytes(bytes).expect("read");
    let ws = wb.worksheet(0).expect("first sheet");

    assert_eq!(ws.cell(0, 0).and_then(|c| c.style.clone()), Some(header_style()));
    // styled but empty
    let d4 = ws.cell(3, 3).expect("D4 kept");
    assert!(d4.value.is_empty());
    assert_eq!(d4.style, Some(header_style()));
    // dates carry the default date format
    assert_eq!(
        ws.cell(0, 4).and_then(|c| c.style.as_ref()).map(|s| s.number_format.clone()),
        Some(NumberFormat::Builtin(22))
    );
    assert!(ws.cell(0, 1).is_some_and(|c| c.style.is_none()));
}

#[test]
fn equal_styles_and_texts_are_stored_once() {
    let bytes = sample_workbook().to_bytes().expect("write");

    let styles = entry_text(&bytes, "/xl/styles.xml");
    // default, header, date-time, time
    assert!(styles.contains(r#"<cellXfs count="4">"#), "{}", styles);

    let sst = entry_text(&bytes, "/xl/sharedStrings.xml");
    assert!(sst.contains(r#"count="4" uniqueCount="3""#), "{}", sst);
    assert_eq!(sst.matches("<t>Name</t>").count(), 1);
}

#[test]
fn sheet_metadata_survives_a_round_trip() {
    let bytes = sample_workbook().to_bytes().expect("write");
    let wb = Workbook::from_bytes(bytes).expect("read");

    let data = wb.worksheet(0).expect("Data");
    let protection = data.protection().expect("sheet protection");
    assert_eq!(protection.hash, Some(PasswordHash::Legacy("DAA7".into())));
    assert_eq!(protection.permissions, SheetPermissions::default());

    let archive = wb.worksheet(1).expect("Archive");
    assert_eq!(archive.name(), "Archive");
    assert_eq!(archive.state(), SheetState::Hidden);

    let book_protection = wb.protection().expect("workbook protection");
    assert!(book_protection.lock_structure);
    assert_eq!(book_protection.hash, Some(PasswordHash::Legacy("DAA7".into())));

    assert_eq!(wb.properties().title.as_deref(), Some("Quarterly"));
    assert_eq!(wb.properties().creator.as_deref(), Some("Finance"));
    assert_eq!(wb.properties().created, Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).single());
}

#[test]
fn salted_hashes_survive_a_round_trip() {
    let options = WriterOptions::default()
        .with_password_hasher(Arc::new(Sha512PasswordHasher::with_spin_count(16)));
    let bytes = sample_workbook().to_bytes_with(&options).expect("write");

    let sheet_xml = entry_text(&bytes, "/xl/worksheets/sheet1.xml");
    assert!(sheet_xml.contains(r#"algorithmName="SHA-512""#), "{}", sheet_xml);

    let wb = Workbook::from_bytes(bytes).expect("read");
    match wb.worksheet(0).and_then(|s| s.protection()).and_then(|p| p.hash.clone()) {
        Some(PasswordHash::Modern { algorithm, salt_value, spin_count, .. }) => {
            assert_eq!(algorithm, HashAlgorithm::Sha512);
            assert_eq!(spin_count, 16);
            assert!(!salt_value.is_empty());
        },
        other => panic!("unexpected sheet hash: {:?}", other),
    }
    assert!(matches!(
        wb.protection().and_then(|p| p.hash.clone()),
        Some(PasswordHash::Modern { .. })
    ));
}

#[test]
fn coercion_applies_on_read() {
    let bytes = sample_workbook().to_bytes().expect("write");

    let options = ReaderOptions::new().with_global_enforcing_type(GlobalEnforcingType::AllNumbersToDecimal);
    let wb = Workbook::from_bytes_with(bytes.clone(), &options).expect("read decimals");
    let ws = wb.worksheet(0).expect("Data");
    assert_eq!(ws.value(1, 2), Some(&CellValue::Decimal("0.10".into())));
    assert_eq!(ws.value(0, 1), Some(&CellValue::Decimal("42".into())));

    let options = ReaderOptions::new().with_date_times_as_numbers(true);
    let wb = Workbook::from_bytes_with(bytes, &options).expect("read serials");
    let ws = wb.worksheet(0).expect("Data");
    assert_eq!(ws.value(0, 5), Some(&CellValue::Float(0.5)));
    assert!(matches!(ws.value(0, 4), Some(CellValue::Float(serial)) if (serial - 45351.4375).abs() < 1e-9));
}
