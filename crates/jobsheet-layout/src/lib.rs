//! # jobsheet-layout
//!
//! Pure layout engine for the two-week job report.
//!
//! This crate provides:
//! - `LayoutConfig`: template geometry, loadable from TOML
//! - `AvailableRowSequence`: the template's data rows flattened in order
//! - Day planning into unsplittable blocks
//! - Row-budget allocation with implicit pagination
//! - `SheetGrid`: a row-slot arena with merge-group ids, and the writer that fills it
//!
//! Nothing here touches files; `jobsheet-render` loads the grid from a
//! template and writes it back out.
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use jobsheet_core::{ReportRequest, WorkRecord};
//! use jobsheet_layout::{ReportLayoutEngine, SheetGrid};
//!
//! let monday = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();
//! let request = ReportRequest::new(1, monday)
//!     .record(WorkRecord::new(1, monday, "Inspection").content("Line A\nLine B"));
//!
//! let engine = ReportLayoutEngine::default();
//! let mut grid = SheetGrid::new();
//! let layout = engine.apply(&mut grid, &request).unwrap();
//! assert_eq!(layout.lanes[0].days[0].rows, vec![7, 8, 9]);
//! ```

pub mod allocate;
pub mod config;
pub mod grid;
pub mod plan;
pub mod sequence;
pub mod writer;

pub use allocate::{DayAllocation, LaneAllocation, PlacedBlock, RowAllocator};
pub use config::{FormulaCell, LaneColumns, LayoutConfig, RowRange};
pub use grid::{
    column_index, column_name, CellAddr, CellRange, CellSlot, CellValue, ColumnSpan, GridError,
    MergeId, RowSlot, SheetGrid,
};
pub use plan::{day_label, plan_lane, record_heading, BlockKind, DayPlan};
pub use sequence::AvailableRowSequence;
pub use writer::SheetWriter;

use jobsheet_core::{Lane, ReportError, ReportRequest, ReportWindow};
use tracing::debug;

/// Placement of both lanes for one request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportLayout {
    pub window: ReportWindow,
    /// Current week first, then next week
    pub lanes: Vec<LaneAllocation>,
}

impl ReportLayout {
    pub fn lane(&self, lane: Lane) -> Option<&LaneAllocation> {
        self.lanes.iter().find(|l| l.lane == lane)
    }
}

/// Lays a report request out over a template grid
#[derive(Clone, Debug)]
pub struct ReportLayoutEngine {
    config: LayoutConfig,
    sequence: AvailableRowSequence,
}

impl ReportLayoutEngine {
    /// Create an engine for a validated layout
    pub fn new(config: LayoutConfig) -> Result<Self, ReportError> {
        config.validate()?;
        let sequence = AvailableRowSequence::new(&config.data_ranges);
        Ok(Self { config, sequence })
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn sequence(&self) -> &AvailableRowSequence {
        &self.sequence
    }

    /// Validate the request and place both lanes without touching a sheet
    pub fn plan(&self, request: &ReportRequest) -> Result<ReportLayout, ReportError> {
        let window = request.validate()?;
        let allocator = RowAllocator::new(&self.sequence, &self.config);
        let lanes = Lane::ALL
            .into_iter()
            .map(|lane| {
                let days = plan_lane(request, &window, lane, &self.config);
                allocator.allocate(lane, &days)
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            employee = request.employee_id,
            week_start = %window.week_start(),
            current = lanes[0].used,
            next = lanes[1].used,
            "report planned"
        );
        Ok(ReportLayout { window, lanes })
    }

    /// Plan the request and write it into `grid`.
    ///
    /// The grid is only modified once planning has succeeded.
    pub fn apply(
        &self,
        grid: &mut SheetGrid,
        request: &ReportRequest,
    ) -> Result<ReportLayout, ReportError> {
        let layout = self.plan(request)?;
        let mut writer = SheetWriter::new(grid, &self.config, &self.sequence);
        for allocation in &layout.lanes {
            writer.clear_lane(allocation.lane)?;
            writer.write_lane(allocation)?;
            writer.restore_default_shape(allocation.lane)?;
        }
        writer.write_note(request.weekly_note.as_ref())?;
        writer.write_anchor(&layout.window)?;
        writer.write_header(request)?;
        Ok(layout)
    }
}

impl Default for ReportLayoutEngine {
    fn default() -> Self {
        let config = LayoutConfig::default();
        let sequence = AvailableRowSequence::new(&config.data_ranges);
        Self { config, sequence }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use jobsheet_core::{DailyStatusRecord, WeeklyNoteRecord, WorkRecord, WorkType};
    use pretty_assertions::assert_eq;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 9).unwrap()
    }

    fn addr(a1: &str) -> CellAddr {
        CellAddr::parse(a1).unwrap()
    }

    #[test]
    fn invalid_layout_is_rejected() {
        let config = LayoutConfig {
            data_ranges: vec![],
            ..LayoutConfig::default()
        };
        assert!(matches!(
            ReportLayoutEngine::new(config),
            Err(ReportError::InvalidLayout(_))
        ));
    }

    #[test]
    fn failed_plan_leaves_grid_untouched() {
        let engine = ReportLayoutEngine::default();
        let mut grid = SheetGrid::new();
        grid.load_cell(addr("C7"), CellValue::Text("old".into()), Some(3));
        let request = ReportRequest::new(1, monday().succ_opt().unwrap());
        assert!(engine.apply(&mut grid, &request).is_err());
        assert_eq!(grid.text(addr("C7")), Some("old"));
        assert!(!grid.merges_dirty());
    }

    #[test]
    fn writes_labels_records_and_anchor() {
        let engine = ReportLayoutEngine::default();
        let mut grid = SheetGrid::new();
        let request = ReportRequest::new(1, monday())
            .record(
                WorkRecord::new(1, monday(), "Survey")
                    .project("Dam")
                    .content("north\nsouth"),
            )
            .status(DailyStatusRecord::new(
                1,
                monday().succ_opt().unwrap(),
                WorkType::AnnualLeave,
            ));
        engine.apply(&mut grid, &request).unwrap();

        assert_eq!(grid.text(addr("A7")), Some("월(09)"));
        assert_eq!(grid.text(addr("C7")), Some("1. [Dam] Survey"));
        assert_eq!(grid.text(addr("C8")), Some("north\nsouth"));
        assert!(grid.cell(addr("C8")).unwrap().wrap);
        assert_eq!(grid.merge_containing(addr("E9")), Some(CellRange::parse("C8:E9").unwrap()));
        assert_eq!(grid.merge_containing(addr("B9")), Some(CellRange::parse("A7:B9").unwrap()));
        assert_eq!(grid.text(addr("A11")), Some("화(10)"));
        assert_eq!(grid.text(addr("C11")), Some("연차"));
        assert_eq!(grid.text(addr("F7")), Some("월(16)"));
        assert_eq!(grid.value(addr("C6")).as_number(), Some(46062.0));
    }

    #[test]
    fn every_data_row_ends_up_merged() {
        let engine = ReportLayoutEngine::default();
        let mut grid = SheetGrid::new();
        engine
            .apply(&mut grid, &ReportRequest::new(1, monday()))
            .unwrap();
        for &row in engine.sequence().rows() {
            for col in [1, 3, 6, 8] {
                assert!(
                    grid.merge_at(CellAddr::new(row, col)).is_some(),
                    "row {row} col {col}"
                );
            }
        }
    }

    #[test]
    fn note_and_header_cells() {
        let engine = ReportLayoutEngine::default();
        let mut grid = SheetGrid::new();
        grid.load_cell(addr("D41"), CellValue::Text("stale".into()), None);
        let request = ReportRequest::new(1, monday())
            .note(WeeklyNoteRecord::new(1, monday(), "Safety audit Thursday\n"))
            .reporter(jobsheet_core::Reporter::new("Kim").department("Plant"))
            .written_on(NaiveDate::from_ymd_opt(2026, 2, 13).unwrap());
        engine.apply(&mut grid, &request).unwrap();
        assert_eq!(grid.text(addr("D41")), Some("Safety audit Thursday"));
        assert_eq!(grid.text(addr("A4")), Some("보고자 : Plant Kim"));
        assert_eq!(grid.text(addr("H4")), Some("작 성 일 : 2026.02.13."));

        engine
            .apply(&mut grid, &ReportRequest::new(1, monday()))
            .unwrap();
        assert!(grid.value(addr("D41")).is_empty());
    }
}
