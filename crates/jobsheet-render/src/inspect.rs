//! Read back a generated report

use chrono::NaiveDate;
use jobsheet_core::{serial_to_date, Lane, ReportError};
use jobsheet_layout::{CellAddr, CellValue, LayoutConfig, SheetGrid};
use std::fmt;

use crate::generator::read_sheet;

/// Text of one data row, per lane
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowSummary {
    pub row: u32,
    pub current_label: Option<String>,
    pub current: Option<String>,
    pub next_label: Option<String>,
    pub next: Option<String>,
}

/// What a report holds, in layout terms
#[derive(Clone, Debug, PartialEq)]
pub struct ReportSummary {
    /// Monday stored in the date-anchor cell
    pub week_start: Option<NaiveDate>,
    pub note: Option<String>,
    /// Data rows with any text, top to bottom
    pub rows: Vec<RowSummary>,
}

fn text_at(grid: &SheetGrid, addr: CellAddr) -> Option<String> {
    match grid.value(addr) {
        CellValue::Text(text) if !text.is_empty() => Some(text.clone()),
        CellValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Summarize the working sheet of an XLSX report
pub fn summarize(bytes: &[u8], config: &LayoutConfig) -> Result<ReportSummary, ReportError> {
    let grid = read_sheet(bytes, config.sheet_index)?;
    Ok(summarize_grid(&grid, config))
}

pub fn summarize_grid(grid: &SheetGrid, config: &LayoutConfig) -> ReportSummary {
    let week_start = grid
        .value(config.date_anchor)
        .as_number()
        .filter(|n| *n >= 1.0)
        .and_then(|n| serial_to_date(n as u32));

    let cell = |row: u32, lane: Lane, label: bool| {
        let columns = config.lane(lane);
        let col = if label {
            columns.label.first
        } else {
            columns.content.first
        };
        text_at(grid, CellAddr::new(row, col))
    };

    let rows = config
        .data_ranges
        .iter()
        .flat_map(|r| r.rows())
        .map(|row| RowSummary {
            row,
            current_label: cell(row, Lane::CurrentWeek, true),
            current: cell(row, Lane::CurrentWeek, false),
            next_label: cell(row, Lane::NextWeek, true),
            next: cell(row, Lane::NextWeek, false),
        })
        .filter(|r| {
            r.current_label.is_some() || r.current.is_some() || r.next_label.is_some() || r.next.is_some()
        })
        .collect();

    ReportSummary {
        week_start,
        note: text_at(grid, config.note_cell),
        rows,
    }
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.week_start {
            Some(date) => writeln!(f, "week of {date}")?,
            None => writeln!(f, "week of (no date)")?,
        }
        for row in &self.rows {
            let one_line = |s: &Option<String>| s.as_deref().unwrap_or("").replace('\n', " / ");
            writeln!(
                f,
                "{:>3} | {:<8} {:<40} | {:<8} {}",
                row.row,
                one_line(&row.current_label),
                one_line(&row.current),
                one_line(&row.next_label),
                one_line(&row.next),
            )?;
        }
        if let Some(note) = &self.note {
            writeln!(f, "note: {}", note.replace('\n', " / "))?;
        }
        Ok(())
    }
}
