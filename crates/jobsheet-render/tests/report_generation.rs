//! End-to-end generation against the standard template

use chrono::NaiveDate;
use jobsheet_core::{
    DailyStatusRecord, Lane, ReportError, ReportRenderer, ReportRequest, Reporter,
    WeeklyNoteRecord, WorkRecord, WorkType,
};
use jobsheet_layout::{CellAddr, CellRange, CellValue, LayoutConfig, SheetGrid};
use jobsheet_render::{read_archive, read_sheet, summarize, ReportGenerator, TemplateAsset};
use pretty_assertions::assert_eq;

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, day).unwrap()
}

fn monday() -> NaiveDate {
    date(9)
}

fn addr(a1: &str) -> CellAddr {
    CellAddr::parse(a1).unwrap()
}

fn generator() -> ReportGenerator {
    ReportGenerator::standard().unwrap()
}

fn lunar_new_year_request() -> ReportRequest {
    ReportRequest::new(7, monday())
        .record(
            WorkRecord::new(7, monday(), "Boiler inspection")
                .project("Plant A")
                .content("pressure test\nvalve check\nreport filed")
                .order(1),
        )
        .record(
            WorkRecord::new(7, monday(), "Shift handover")
                .content("logbook signed")
                .order(2),
        )
        .record(WorkRecord::new(7, date(16), "Follow-up audit").order(1))
        .status(DailyStatusRecord::new(7, monday(), WorkType::InOffice))
        .status(DailyStatusRecord::new(7, date(10), WorkType::AnnualLeave))
        .status(
            DailyStatusRecord::new(7, date(11), WorkType::PublicHoliday)
                .holiday_name("Lunar New Year"),
        )
        .note(WeeklyNoteRecord::new(7, monday(), "Safety audit on the 12th"))
        .reporter(Reporter::new("김철수").department("설비팀"))
        .written_on(date(13))
}

/// Value, style and merge of every cell in `rows` across `cols`
fn snapshot(
    grid: &SheetGrid,
    rows: std::ops::RangeInclusive<u32>,
    cols: std::ops::RangeInclusive<u16>,
) -> Vec<(String, CellValue, Option<u32>, Option<CellRange>)> {
    rows.flat_map(|row| cols.clone().map(move |col| CellAddr::new(row, col)))
        .map(|cell| {
            (
                cell.to_a1(),
                grid.value(cell).clone(),
                grid.cell(cell).and_then(|slot| slot.style),
                grid.merge_containing(cell),
            )
        })
        .collect()
}

#[test]
fn lunar_new_year_scenario() {
    let generator = generator();
    let bytes = generator.generate(&lunar_new_year_request()).unwrap();
    let grid = read_sheet(&bytes, 1).unwrap();

    assert_eq!(grid.value(addr("C6")).as_number(), Some(46062.0));

    assert_eq!(grid.text(addr("A7")), Some("월(09)"));
    assert_eq!(grid.text(addr("C7")), Some("1. [Plant A] Boiler inspection"));
    assert_eq!(grid.text(addr("C8")), Some("pressure test\nvalve check\nreport filed"));
    assert_eq!(grid.merge_containing(addr("E10")), CellRange::parse("C8:E10"));
    assert_eq!(grid.text(addr("C11")), Some("2. Shift handover"));
    assert_eq!(grid.text(addr("C12")), Some("logbook signed"));
    assert_eq!(grid.merge_containing(addr("B12")), CellRange::parse("A7:B12"));
    assert!(grid.value(addr("A13")).is_empty());

    assert_eq!(grid.text(addr("A14")), Some("화(10)"));
    assert_eq!(grid.text(addr("C14")), Some("연차"));
    assert_eq!(grid.merge_containing(addr("A14")), CellRange::parse("A14:B14"));
    assert_eq!(grid.text(addr("A16")), Some("수(11)"));
    assert_eq!(grid.text(addr("C16")), Some("공휴일 · Lunar New Year"));
    assert_eq!(grid.text(addr("A18")), Some("목(12)"));
    assert!(grid.value(addr("C18")).is_empty());

    assert_eq!(grid.text(addr("F7")), Some("월(16)"));
    assert_eq!(grid.text(addr("H7")), Some("1. Follow-up audit"));

    assert_eq!(grid.text(addr("D41")), Some("Safety audit on the 12th"));
    assert_eq!(grid.text(addr("A4")), Some("보고자 : 설비팀 김철수"));
    assert_eq!(grid.text(addr("H4")), Some("작 성 일 : 2026.02.13."));

    let summary = summarize(&bytes, &LayoutConfig::default()).unwrap();
    assert_eq!(summary.week_start, Some(monday()));
    assert_eq!(summary.rows[0].current.as_deref(), Some("1. [Plant A] Boiler inspection"));
}

#[test]
fn reserved_block_is_untouched_except_the_note() {
    let generator = generator();
    let template = read_sheet(generator.template().bytes(), 1).unwrap();
    let bytes = generator.generate(&lunar_new_year_request()).unwrap();
    let output = read_sheet(&bytes, 1).unwrap();

    let note = addr("D41");
    let before: Vec<_> = snapshot(&template, 40..=44, 1..=14)
        .into_iter()
        .filter(|(cell, ..)| *cell != note.to_a1())
        .collect();
    let after: Vec<_> = snapshot(&output, 40..=44, 1..=14)
        .into_iter()
        .filter(|(cell, ..)| *cell != note.to_a1())
        .collect();
    assert_eq!(before, after);
    assert_eq!(output.merge_containing(note), CellRange::parse("D41:N44"));
}

#[test]
fn formulas_survive_and_recalculate_on_load() {
    let generator = generator();
    let bytes = generator.generate(&lunar_new_year_request()).unwrap();
    let grid = read_sheet(&bytes, 1).unwrap();

    assert_eq!(grid.value(addr("E6")).formula(), Some("C6+4"));
    assert_eq!(grid.value(addr("H6")).formula(), Some("C6+7"));
    assert_eq!(grid.value(addr("J6")).formula(), Some("C6+11"));

    let parts = read_archive(&bytes).unwrap();
    let workbook = parts
        .iter()
        .find(|(name, _)| name == "xl/workbook.xml")
        .map(|(_, data)| String::from_utf8_lossy(data).into_owned())
        .unwrap();
    assert!(workbook.contains(r#"fullCalcOnLoad="1""#), "{workbook}");
}

#[test]
fn other_sheets_are_carried_over() {
    let generator = generator();
    let template = read_sheet(generator.template().bytes(), 0).unwrap();
    let bytes = generator.generate(&lunar_new_year_request()).unwrap();
    let output = read_sheet(&bytes, 0).unwrap();
    assert_eq!(snapshot(&template, 1..=84, 1..=14), snapshot(&output, 1..=84, 1..=14));
}

#[test]
fn multi_line_content_gets_a_wrap_format() {
    let generator = generator();
    let template = read_sheet(generator.template().bytes(), 1).unwrap();
    let bytes = generator.generate(&lunar_new_year_request()).unwrap();
    let output = read_sheet(&bytes, 1).unwrap();

    let before = template.cell(addr("C8")).and_then(|c| c.style);
    let after = output.cell(addr("C8")).and_then(|c| c.style);
    assert!(before.is_some());
    assert_ne!(before, after);
    assert_eq!(
        output.cell(addr("C7")).and_then(|c| c.style),
        template.cell(addr("C7")).and_then(|c| c.style)
    );
}

#[test]
fn overflow_produces_no_report() {
    let generator = generator();
    let request = (1..=66).fold(ReportRequest::new(1, monday()), |req, n| {
        req.record(WorkRecord::new(1, monday(), format!("task {n}")).order(n))
    });
    match generator.generate(&request) {
        Err(ReportError::OutOfCapacity {
            lane,
            demand,
            capacity,
        }) => {
            assert_eq!(lane, Lane::CurrentWeek);
            assert_eq!(demand, 74);
            assert_eq!(capacity, 73);
        }
        other => panic!("expected overflow, got {:?}", other.map(|b| b.len())),
    }
}

#[test]
fn tuesday_window_is_rejected() {
    let err = generator()
        .generate(&ReportRequest::new(1, date(10)))
        .unwrap_err();
    assert!(matches!(err, ReportError::InvalidWindow(_)));
}

#[test]
fn corrupt_template_is_unreadable() {
    let generator = generator().with_template(TemplateAsset::from_bytes(b"junk".to_vec()));
    let err = generator
        .generate(&ReportRequest::new(1, monday()))
        .unwrap_err();
    assert!(matches!(err, ReportError::TemplateUnreadable(_)));
}

#[test]
fn repeated_generation_starts_from_a_clean_copy() {
    let generator = generator();
    generator.generate(&lunar_new_year_request()).unwrap();
    let bytes = generator
        .generate(&ReportRequest::new(7, monday()))
        .unwrap();
    let grid = read_sheet(&bytes, 1).unwrap();
    assert!(grid.value(addr("C7")).is_empty());
    assert!(grid.value(addr("D41")).is_empty());
    assert_eq!(grid.text(addr("A7")), Some("월(09)"));
}

#[test]
fn batch_packs_one_report_per_request() {
    let generator = generator();
    let anonymous = ReportRequest::new(42, monday())
        .record(WorkRecord::new(42, date(12), "Calibration"));
    let archive = generator
        .generate_batch(&[lunar_new_year_request(), anonymous])
        .unwrap();

    let entries = read_archive(&archive).unwrap();
    let names: Vec<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "김철수_주간보고서_2026-02-09.xlsx",
            "42_주간보고서_2026-02-09.xlsx"
        ]
    );
    let grid = read_sheet(&entries[1].1, 1).unwrap();
    assert_eq!(grid.text(addr("C11")), Some("1. Calibration"));
}

#[test]
fn batch_fails_when_any_member_fails() {
    let generator = generator();
    let bad = ReportRequest::new(1, date(11));
    let err = generator
        .generate_batch(&[lunar_new_year_request(), bad])
        .unwrap_err();
    assert!(matches!(err, ReportError::InvalidWindow(_)));
}

#[test]
fn custom_layout_with_matching_template() {
    let config = LayoutConfig::from_toml_str(
        r#"
        day_spacing = 0
        data_ranges = [{ start = 7, end = 20 }, { start = 26, end = 40 }]
        note_cell = "D22"
        "#,
    )
    .unwrap();
    let template = TemplateAsset::standard(&config).unwrap();
    let generator = ReportGenerator::new(template)
        .with_layout(config.clone())
        .unwrap();
    let request = ReportRequest::new(1, monday())
        .note(WeeklyNoteRecord::new(1, monday(), "short week"));
    let bytes = generator.generate(&request).unwrap();
    let grid = read_sheet(&bytes, 1).unwrap();
    assert_eq!(grid.text(addr("A8")), Some("화(10)"));
    assert_eq!(grid.text(addr("D22")), Some("short week"));
}
