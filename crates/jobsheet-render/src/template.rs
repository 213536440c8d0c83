//! Report template asset
//!
//! The template is read once and shared as an immutable buffer; every
//! generation decodes its own working copy. When no template file is at
//! hand, `build_standard_template` draws the weekly report form for a
//! `LayoutConfig` with rust_xlsxwriter.

use jobsheet_core::{Lane, ReportError};
use jobsheet_layout::{CellAddr, ColumnSpan, LayoutConfig};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use std::path::Path;
use std::sync::Arc;

/// Immutable template bytes shared across generations
#[derive(Clone, Debug)]
pub struct TemplateAsset {
    bytes: Arc<[u8]>,
}

impl TemplateAsset {
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Read a template file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            ReportError::TemplateUnreadable(format!("{}: {e}", path.display()))
        })?;
        Ok(Self::from_bytes(bytes))
    }

    /// The standard form for a layout
    pub fn standard(config: &LayoutConfig) -> Result<Self, ReportError> {
        build_standard_template(config).map(Self::from_bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Sheet names of the standard template
pub const FORM_SHEET_NAME: &str = "양식";

const TITLE: &str = "주 간 업 무 보 고 서";
const PERIOD: &str = "기간";
const NOTE_LABEL: &str = "중요 정보";
const NOTE_HEADER: &str = "특이사항 및 건의사항";

fn lane_title(lane: Lane) -> &'static str {
    match lane {
        Lane::CurrentWeek => "금주 실적",
        Lane::NextWeek => "차주 계획",
    }
}

fn format_error(e: XlsxError) -> ReportError {
    ReportError::Format(format!("Failed to create template: {e}"))
}

struct FormFormats {
    title: Format,
    header: Format,
    text: Format,
    label: Format,
    content: Format,
    date: Format,
    note: Format,
}

impl FormFormats {
    fn new() -> Self {
        Self {
            title: Format::new()
                .set_bold()
                .set_font_size(18)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter),
            header: Format::new()
                .set_bold()
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_background_color(0xD9E1F2)
                .set_border(FormatBorder::Thin),
            text: Format::new().set_align(FormatAlign::VerticalCenter),
            label: Format::new()
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::Top)
                .set_border(FormatBorder::Thin),
            content: Format::new()
                .set_align(FormatAlign::Left)
                .set_align(FormatAlign::Top)
                .set_border(FormatBorder::Thin),
            date: Format::new()
                .set_num_format("yyyy.mm.dd")
                .set_align(FormatAlign::Center)
                .set_border(FormatBorder::Thin),
            note: Format::new()
                .set_text_wrap()
                .set_align(FormatAlign::Left)
                .set_align(FormatAlign::Top)
                .set_border(FormatBorder::Thin),
        }
    }
}

/// Draw the two-week report form for `config` and return the XLSX bytes.
///
/// Every sheet up to the working sheet carries the same form; the first is
/// named `양식`, the rest `양식 (n)`.
pub fn build_standard_template(config: &LayoutConfig) -> Result<Vec<u8>, ReportError> {
    config.validate()?;
    let formats = FormFormats::new();
    let mut workbook = Workbook::new();

    for idx in 0..=config.sheet_index.max(1) {
        let name = if idx == 0 {
            FORM_SHEET_NAME.to_string()
        } else {
            format!("{FORM_SHEET_NAME} ({})", idx + 1)
        };
        let sheet = workbook.add_worksheet();
        sheet.set_name(&name).map_err(format_error)?;
        draw_form(sheet, config, &formats)?;
    }

    workbook.save_to_buffer().map_err(format_error)
}

/// 0-based coordinates for rust_xlsxwriter
fn at(addr: CellAddr) -> (u32, u16) {
    (addr.row - 1, addr.col - 1)
}

fn merge_or_write(
    sheet: &mut Worksheet,
    row: (u32, u32),
    span: ColumnSpan,
    text: &str,
    format: &Format,
) -> Result<(), ReportError> {
    let (first_row, last_row) = (row.0 - 1, row.1 - 1);
    let (first_col, last_col) = (span.first - 1, span.last - 1);
    if first_row == last_row && first_col == last_col {
        sheet
            .write_string_with_format(first_row, first_col, text, format)
            .map_err(format_error)?;
    } else {
        sheet
            .merge_range(first_row, first_col, last_row, last_col, text, format)
            .map_err(format_error)?;
    }
    Ok(())
}

fn lane_span(config: &LayoutConfig, lane: Lane) -> ColumnSpan {
    let columns = config.lane(lane);
    ColumnSpan::new(
        columns.label.first.min(columns.content.first),
        columns.label.last.max(columns.content.last),
    )
}

fn draw_form(
    sheet: &mut Worksheet,
    config: &LayoutConfig,
    formats: &FormFormats,
) -> Result<(), ReportError> {
    let last_col = config.last_column();
    let anchor_row = config.date_anchor.row;

    // Column widths: narrow labels, content spread evenly per lane
    for lane in Lane::ALL {
        let columns = config.lane(lane);
        for col in columns.label.columns() {
            sheet.set_column_width(col - 1, 6).ok();
        }
        let width = 60.0 / f64::from(columns.content.width());
        for col in columns.content.columns() {
            sheet.set_column_width(col - 1, width).ok();
        }
    }

    let header_rows: Vec<u32> = [config.reporter_cell, config.written_on_cell]
        .into_iter()
        .flatten()
        .map(|c| c.row)
        .chain([anchor_row])
        .collect();
    if header_rows.iter().all(|&row| row > 2) {
        merge_or_write(sheet, (1, 2), ColumnSpan::new(1, last_col), TITLE, &formats.title)?;
    }

    // Reporter and written-on lines stretch to the end of their lane
    let header_cells = [
        (config.reporter_cell, "보고자 : "),
        (config.written_on_cell, "작 성 일 : "),
    ];
    for (cell, text) in header_cells {
        let Some(cell) = cell else { continue };
        let end = Lane::ALL
            .into_iter()
            .map(|lane| lane_span(config, lane))
            .find(|span| span.contains(cell.col))
            .map_or(cell.col, |span| span.last);
        merge_or_write(
            sheet,
            (cell.row, cell.row),
            ColumnSpan::new(cell.col, end),
            text,
            &formats.text,
        )?;
    }

    // Lane titles above the period row
    let title_row = anchor_row - 1;
    if title_row > 0 && !header_rows.contains(&title_row) && !config.is_data_row(title_row) {
        for lane in Lane::ALL {
            merge_or_write(
                sheet,
                (title_row, title_row),
                lane_span(config, lane),
                lane_title(lane),
                &formats.header,
            )?;
        }
    }

    // Period row: anchor, formula cells and a `~` between each pair
    let mut date_cells: Vec<CellAddr> = vec![config.date_anchor];
    date_cells.extend(config.formula_cells.iter().map(|f| f.cell));
    for lane in Lane::ALL {
        let columns = config.lane(lane);
        let occupied = date_cells.iter().any(|c| c.row == anchor_row && columns.label.contains(c.col));
        if !occupied {
            merge_or_write(sheet, (anchor_row, anchor_row), columns.label, PERIOD, &formats.header)?;
        }
        let on_row: Vec<u16> = date_cells
            .iter()
            .filter(|c| c.row == anchor_row && columns.content.contains(c.col))
            .map(|c| c.col)
            .collect();
        for col in columns.content.columns() {
            if on_row.contains(&col) {
                continue;
            }
            let between = on_row.contains(&(col - 1)) && on_row.contains(&(col + 1));
            let text = if between { "~" } else { "" };
            sheet
                .write_string_with_format(anchor_row - 1, col - 1, text, &formats.date)
                .map_err(format_error)?;
        }
    }
    let (row, col) = at(config.date_anchor);
    sheet
        .write_blank(row, col, &formats.date)
        .map_err(format_error)?;
    for formula in &config.formula_cells {
        let (row, col) = at(formula.cell);
        let text = format!("={}", formula.formula);
        sheet
            .write_formula_with_format(row, col, text.as_str(), &formats.date)
            .map_err(format_error)?;
    }

    // Data rows in their single-row shape
    for range in &config.data_ranges {
        for row in range.rows() {
            for lane in Lane::ALL {
                let columns = config.lane(lane);
                merge_or_write(sheet, (row, row), columns.label, "", &formats.label)?;
                merge_or_write(sheet, (row, row), columns.content, "", &formats.content)?;
            }
        }
    }

    // Reserved block holding the weekly note
    let note = config.note_cell;
    if let Some(block) = config
        .reserved_ranges()
        .into_iter()
        .find(|r| r.contains(note.row))
    {
        if note.col > 1 {
            merge_or_write(
                sheet,
                (block.start, block.end),
                ColumnSpan::new(1, note.col - 1),
                NOTE_LABEL,
                &formats.header,
            )?;
        }
        let note_span = ColumnSpan::new(note.col, last_col.max(note.col));
        if note.row > block.start {
            merge_or_write(
                sheet,
                (block.start, note.row - 1),
                note_span,
                NOTE_HEADER,
                &formats.header,
            )?;
        }
        merge_or_write(sheet, (note.row, block.end), note_span, "", &formats.note)?;
    }

    let breaks: Vec<u32> = config.reserved_ranges().iter().map(|r| r.end).collect();
    if !breaks.is_empty() {
        sheet.set_page_breaks(&breaks).map_err(format_error)?;
    }
    sheet.set_paper_size(9);
    sheet.set_print_fit_to_pages(1, 0);

    Ok(())
}
