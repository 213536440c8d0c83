//! Cell writer and merge manager
//!
//! Applies a lane allocation to a `SheetGrid`: clears the lane's data cells,
//! writes day labels, status rows and record blocks, and re-merges whatever
//! is left into the template's single-row shape.

use jobsheet_core::{
    date_to_serial, Lane, ReportError, ReportRequest, ReportWindow, WeeklyNoteRecord,
};
use tracing::{debug, trace};

use crate::allocate::LaneAllocation;
use crate::config::{LaneColumns, LayoutConfig};
use crate::grid::{CellAddr, CellRange, CellValue, ColumnSpan, SheetGrid};
use crate::plan::BlockKind;
use crate::sequence::AvailableRowSequence;

pub struct SheetWriter<'a> {
    grid: &'a mut SheetGrid,
    config: &'a LayoutConfig,
    sequence: &'a AvailableRowSequence,
}

impl<'a> SheetWriter<'a> {
    pub fn new(
        grid: &'a mut SheetGrid,
        config: &'a LayoutConfig,
        sequence: &'a AvailableRowSequence,
    ) -> Self {
        Self {
            grid,
            config,
            sequence,
        }
    }

    fn columns(&self, lane: Lane) -> LaneColumns {
        *self.config.lane(lane)
    }

    fn in_data_area(&self, range: CellRange) -> bool {
        let lanes = [self.config.current_week, self.config.next_week];
        (range.first.row..=range.last.row).all(|row| self.config.is_data_row(row))
            && (range.first.col..=range.last.col).all(|col| lanes.iter().any(|l| l.contains(col)))
    }

    /// Merge `span` across `first..=last`, skipping single cells
    fn merge_span(&mut self, first: u32, last: u32, span: ColumnSpan) -> Result<(), ReportError> {
        let range = CellRange::rows(first, last, span);
        if !range.is_single_cell() {
            self.grid.merge(range)?;
        }
        Ok(())
    }

    /// Dissolve the lane's merges and null its data cells, keeping styles
    pub fn clear_lane(&mut self, lane: Lane) -> Result<(), ReportError> {
        let columns = self.columns(lane);
        let touched: Vec<_> = self
            .grid
            .merges()
            .filter(|(_, range)| {
                let rows_hit = self
                    .sequence
                    .rows()
                    .iter()
                    .any(|row| (range.first.row..=range.last.row).contains(row));
                let cols_hit = columns.spans().iter().any(|span| {
                    span.overlaps(&ColumnSpan::new(range.first.col, range.last.col))
                });
                rows_hit && cols_hit
            })
            .collect();

        for (id, range) in touched {
            if !self.in_data_area(range) {
                return Err(ReportError::InvalidLayout(format!(
                    "merge {range} crosses out of the {lane} data area"
                )));
            }
            self.grid.unmerge(id)?;
        }

        for &row in self.sequence.rows() {
            for span in columns.spans() {
                for col in span.columns() {
                    self.grid.clear(CellAddr::new(row, col));
                }
            }
        }
        trace!(%lane, "lane cleared");
        Ok(())
    }

    /// Write day labels and blocks of a placed lane
    pub fn write_lane(&mut self, allocation: &LaneAllocation) -> Result<(), ReportError> {
        let columns = self.columns(allocation.lane);
        for day in &allocation.days {
            for segment in day.segments() {
                if let (Some(&first), Some(&last)) = (segment.first(), segment.last()) {
                    self.merge_span(first, last, columns.label)?;
                }
            }
            self.grid.set_value(
                CellAddr::new(day.first_row(), columns.label.first),
                CellValue::Text(day.label.clone()),
            )?;

            for block in &day.blocks {
                let first = block.first_row();
                let master = CellAddr::new(first, columns.content.first);
                match &block.kind {
                    BlockKind::Blank => {}
                    BlockKind::Status(label) => {
                        self.merge_span(first, first, columns.content)?;
                        self.grid.set_value(master, CellValue::Text(label.clone()))?;
                    }
                    BlockKind::Record { heading, lines } => {
                        self.merge_span(first, first, columns.content)?;
                        self.grid.set_value(master, CellValue::Text(heading.clone()))?;
                        if let Some(&body) = block.rows.get(1) {
                            self.merge_span(body, block.last_row(), columns.content)?;
                            let cell = CellAddr::new(body, columns.content.first);
                            self.grid.set_value(cell, CellValue::Text(lines.join("\n")))?;
                            self.grid.set_wrap(cell, true)?;
                        }
                    }
                }
            }
            debug!(
                lane = %allocation.lane,
                date = %day.date,
                rows = day.rows.len(),
                blocks = day.blocks.len(),
                "day written"
            );
        }
        Ok(())
    }

    /// Re-merge every unmerged row span of the lane into its one-row shape
    pub fn restore_default_shape(&mut self, lane: Lane) -> Result<(), ReportError> {
        let columns = self.columns(lane);
        let rows: Vec<u32> = self.sequence.rows().to_vec();
        for row in rows {
            for span in columns.spans() {
                let covered = span
                    .columns()
                    .any(|col| self.grid.merge_at(CellAddr::new(row, col)).is_some());
                if !covered {
                    self.merge_span(row, row, span)?;
                }
            }
        }
        Ok(())
    }

    /// Put the weekly note into the note cell, or clear it
    pub fn write_note(&mut self, note: Option<&WeeklyNoteRecord>) -> Result<(), ReportError> {
        let cell = self.config.note_cell;
        match note.filter(|n| !n.is_blank()) {
            Some(note) => {
                self.grid
                    .set_value(cell, CellValue::Text(note.content.trim_end().to_string()))?;
                self.grid.set_wrap(cell, true)?;
            }
            None => self.grid.clear(cell),
        }
        Ok(())
    }

    /// Store the window's Monday as a date serial in the anchor cell
    pub fn write_anchor(&mut self, window: &ReportWindow) -> Result<(), ReportError> {
        let serial = date_to_serial(window.week_start()).ok_or_else(|| {
            ReportError::InvalidWindow(format!(
                "{} has no spreadsheet date serial",
                window.week_start()
            ))
        })?;
        self.grid
            .set_value(self.config.date_anchor, CellValue::Number(f64::from(serial)))?;
        Ok(())
    }

    /// Reporter and written-on lines, when both cell and value are present
    pub fn write_header(&mut self, request: &ReportRequest) -> Result<(), ReportError> {
        if let (Some(cell), Some(reporter)) = (self.config.reporter_cell, &request.reporter) {
            self.grid
                .set_value(cell, CellValue::Text(reporter.header_line()))?;
        }
        if let (Some(cell), Some(date)) = (self.config.written_on_cell, request.written_on) {
            self.grid.set_value(
                cell,
                CellValue::Text(format!("작 성 일 : {}", date.format("%Y.%m.%d."))),
            )?;
        }
        Ok(())
    }
}
