//! Template geometry
//!
//! `LayoutConfig` describes where things live in the report template: the
//! data row ranges, the two week lanes, the date anchor and formula cells,
//! the weekly-note cell and the header cells. The default matches the legacy
//! two-page weekly report form; any field can be overridden from TOML.
//!
//! ```toml
//! data_ranges = [{ start = 7, end = 39 }, { start = 45, end = 84 }]
//! date_anchor = "C6"
//! note_cell = "D41"
//!
//! [current_week]
//! label = "A:B"
//! content = "C:E"
//! ```

use jobsheet_core::{Lane, ReportError};
use serde::{Deserialize, Serialize};

use crate::grid::{CellAddr, ColumnSpan};

/// Inclusive range of 1-based sheet rows
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRange {
    pub start: u32,
    pub end: u32,
}

impl RowRange {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.end - self.start) as usize + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn contains(&self, row: u32) -> bool {
        (self.start..=self.end).contains(&row)
    }

    pub fn rows(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }
}

/// Columns of one week: the day label span and the content span
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneColumns {
    pub label: ColumnSpan,
    pub content: ColumnSpan,
}

impl LaneColumns {
    pub const fn new(label: ColumnSpan, content: ColumnSpan) -> Self {
        Self { label, content }
    }

    /// Both spans, label first
    pub fn spans(&self) -> [ColumnSpan; 2] {
        [self.label, self.content]
    }

    pub fn contains(&self, col: u16) -> bool {
        self.label.contains(col) || self.content.contains(col)
    }
}

/// A template cell whose formula must survive generation untouched
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaCell {
    pub cell: CellAddr,
    /// Formula text without the leading `=`
    pub formula: String,
}

impl FormulaCell {
    pub fn new(cell: CellAddr, formula: impl Into<String>) -> Self {
        Self {
            cell,
            formula: formula.into(),
        }
    }
}

/// Layout of the report template
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Zero-based index of the working sheet
    pub sheet_index: usize,
    /// Rows available for day content, in sheet order
    pub data_ranges: Vec<RowRange>,
    pub current_week: LaneColumns,
    pub next_week: LaneColumns,
    /// Cell receiving the date serial of the window's Monday
    pub date_anchor: CellAddr,
    /// Cells computing dates from the anchor
    pub formula_cells: Vec<FormulaCell>,
    /// Weekly-note cell inside the reserved block
    pub note_cell: CellAddr,
    /// Header cell for the reporter line
    pub reporter_cell: Option<CellAddr>,
    /// Header cell for the writing date
    pub written_on_cell: Option<CellAddr>,
    /// Blank rows between consecutive days
    pub day_spacing: usize,
    /// Blank rows between consecutive blocks of one day
    pub record_spacing: usize,
    /// Close worked days with a `<내근>`-style status row
    pub work_type_footer: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            sheet_index: 1,
            data_ranges: vec![RowRange::new(7, 39), RowRange::new(45, 84)],
            current_week: LaneColumns::new(ColumnSpan::new(1, 2), ColumnSpan::new(3, 5)),
            next_week: LaneColumns::new(ColumnSpan::new(6, 7), ColumnSpan::new(8, 14)),
            date_anchor: CellAddr::new(6, 3),
            formula_cells: vec![
                FormulaCell::new(CellAddr::new(6, 5), "C6+4"),
                FormulaCell::new(CellAddr::new(6, 8), "C6+7"),
                FormulaCell::new(CellAddr::new(6, 10), "C6+11"),
            ],
            note_cell: CellAddr::new(41, 4),
            reporter_cell: Some(CellAddr::new(4, 1)),
            written_on_cell: Some(CellAddr::new(4, 8)),
            day_spacing: 1,
            record_spacing: 0,
            work_type_footer: false,
        }
    }
}

impl LayoutConfig {
    /// Parse a (partial) configuration from TOML; missing keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self, ReportError> {
        let config: LayoutConfig =
            toml::from_str(text).map_err(|e| ReportError::InvalidLayout(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ReportError> {
        toml::to_string_pretty(self).map_err(|e| ReportError::InvalidLayout(e.to_string()))
    }

    pub fn lane(&self, lane: Lane) -> &LaneColumns {
        match lane {
            Lane::CurrentWeek => &self.current_week,
            Lane::NextWeek => &self.next_week,
        }
    }

    /// Row blocks between consecutive data ranges
    pub fn reserved_ranges(&self) -> Vec<RowRange> {
        self.data_ranges
            .windows(2)
            .filter(|pair| pair[0].end + 1 < pair[1].start)
            .map(|pair| RowRange::new(pair[0].end + 1, pair[1].start - 1))
            .collect()
    }

    pub fn is_data_row(&self, row: u32) -> bool {
        self.data_ranges.iter().any(|r| r.contains(row))
    }

    /// Last column any lane reaches
    pub fn last_column(&self) -> u16 {
        Lane::ALL
            .iter()
            .flat_map(|lane| self.lane(*lane).spans())
            .map(|span| span.last)
            .max()
            .unwrap_or(1)
    }

    /// Check internal consistency of the geometry
    pub fn validate(&self) -> Result<(), ReportError> {
        let invalid = |msg: String| Err(ReportError::InvalidLayout(msg));

        if self.data_ranges.is_empty() {
            return invalid("at least one data range is required".into());
        }
        for range in &self.data_ranges {
            if range.start == 0 || range.is_empty() {
                return invalid(format!(
                    "data range {}..={} is empty or starts at row 0",
                    range.start, range.end
                ));
            }
        }
        for pair in self.data_ranges.windows(2) {
            if pair[1].start <= pair[0].end {
                return invalid(format!(
                    "data ranges {}..={} and {}..={} overlap or are out of order",
                    pair[0].start, pair[0].end, pair[1].start, pair[1].end
                ));
            }
        }

        let spans: Vec<(String, ColumnSpan)> = Lane::ALL
            .iter()
            .flat_map(|lane| {
                let columns = self.lane(*lane);
                [
                    (format!("{lane} label"), columns.label),
                    (format!("{lane} content"), columns.content),
                ]
            })
            .collect();
        for (name, span) in &spans {
            if span.first == 0 || span.first > span.last {
                return invalid(format!("{name} columns {span} are invalid"));
            }
        }
        for (i, (name_a, a)) in spans.iter().enumerate() {
            for (name_b, b) in &spans[i + 1..] {
                if a.overlaps(b) {
                    return invalid(format!("{name_a} {a} overlaps {name_b} {b}"));
                }
            }
        }

        let mut fixed = vec![
            ("date anchor".to_string(), self.date_anchor),
            ("note cell".to_string(), self.note_cell),
        ];
        fixed.extend(
            self.formula_cells
                .iter()
                .map(|f| (format!("formula cell {}", f.cell), f.cell)),
        );
        if let Some(cell) = self.reporter_cell {
            fixed.push(("reporter cell".to_string(), cell));
        }
        if let Some(cell) = self.written_on_cell {
            fixed.push(("written-on cell".to_string(), cell));
        }
        for (name, cell) in &fixed {
            if self.is_data_row(cell.row) {
                return invalid(format!("{name} {cell} lies inside a data range"));
            }
        }
        for (i, (name_a, a)) in fixed.iter().enumerate() {
            if let Some((name_b, _)) = fixed[i + 1..].iter().find(|(_, b)| b == a) {
                return invalid(format!("{name_a} and {name_b} share cell {a}"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_layout_is_valid() {
        let config = LayoutConfig::default();
        config.validate().unwrap();
        assert_eq!(config.reserved_ranges(), vec![RowRange::new(40, 44)]);
        assert_eq!(config.last_column(), 14);
    }

    #[test]
    fn inverted_range_is_empty() {
        assert_eq!(RowRange::new(7, 39).len(), 33);
        assert_eq!(RowRange::new(9, 9).len(), 1);
        assert_eq!(RowRange::new(9, 7).len(), 0);
        assert!(RowRange::new(9, 7).is_empty());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = LayoutConfig::from_toml_str(
            r#"
            day_spacing = 2
            data_ranges = [{ start = 7, end = 30 }, { start = 40, end = 60 }]

            [next_week]
            label = "F:G"
            content = "H:L"
            "#,
        )
        .unwrap();
        assert_eq!(config.day_spacing, 2);
        assert_eq!(config.data_ranges[1], RowRange::new(40, 60));
        assert_eq!(config.next_week.content, ColumnSpan::new(8, 12));
        assert_eq!(config.date_anchor, CellAddr::new(6, 3));
    }

    #[test]
    fn toml_round_trip() {
        let config = LayoutConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(LayoutConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn overlapping_ranges_are_rejected() {
        let config = LayoutConfig {
            data_ranges: vec![RowRange::new(7, 40), RowRange::new(40, 84)],
            ..LayoutConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ReportError::InvalidLayout(_))
        ));
    }

    #[test]
    fn formula_cell_in_data_range_is_rejected() {
        let mut config = LayoutConfig::default();
        config
            .formula_cells
            .push(FormulaCell::new(CellAddr::new(12, 3), "C6+1"));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("C12"), "{err}");
    }

    #[test]
    fn overlapping_lanes_are_rejected() {
        let config = LayoutConfig {
            next_week: LaneColumns::new(ColumnSpan::new(5, 7), ColumnSpan::new(8, 14)),
            ..LayoutConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn anchor_and_formula_must_not_share_a_cell() {
        let mut config = LayoutConfig::default();
        config.formula_cells[0].cell = config.date_anchor;
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_cell_reference_in_toml() {
        let err = LayoutConfig::from_toml_str(r#"date_anchor = "6C""#).unwrap_err();
        assert!(matches!(err, ReportError::InvalidLayout(_)));
    }
}
