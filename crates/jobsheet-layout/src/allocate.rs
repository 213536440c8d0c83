//! Row-budget allocation
//!
//! Walks a lane's day plans in order and hands every block a run of
//! positions from the `AvailableRowSequence`. Blocks are never split across
//! a reserved gap: a block that would straddle one restarts at the next data
//! range and the skipped rows stay blank. Demand is measured against a
//! virtual tail past the last row, so an overflow reports the full size.

use chrono::NaiveDate;
use jobsheet_core::{Lane, ReportError};
use std::ops::Range;
use tracing::debug;

use crate::config::LayoutConfig;
use crate::plan::{BlockKind, DayPlan};
use crate::sequence::AvailableRowSequence;

/// A block with its sheet rows
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacedBlock {
    pub kind: BlockKind,
    /// Sheet rows, top to bottom; always one contiguous run
    pub rows: Vec<u32>,
}

impl PlacedBlock {
    pub fn first_row(&self) -> u32 {
        self.rows.first().copied().unwrap_or_default()
    }

    pub fn last_row(&self) -> u32 {
        self.rows.last().copied().unwrap_or_default()
    }
}

/// The rows given to one weekday
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DayAllocation {
    pub date: NaiveDate,
    pub label: String,
    /// Every row of the day's run, in sequence order
    pub rows: Vec<u32>,
    pub blocks: Vec<PlacedBlock>,
}

impl DayAllocation {
    pub fn first_row(&self) -> u32 {
        self.rows.first().copied().unwrap_or_default()
    }

    /// The day's rows split wherever the sheet skips a reserved gap
    pub fn segments(&self) -> Vec<Vec<u32>> {
        let mut segments: Vec<Vec<u32>> = Vec::new();
        for &row in &self.rows {
            match segments.last_mut() {
                Some(segment) if segment.last().is_some_and(|last| last + 1 == row) => {
                    segment.push(row);
                }
                _ => segments.push(vec![row]),
            }
        }
        segments
    }
}

/// The complete placement of one lane
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaneAllocation {
    pub lane: Lane,
    pub days: Vec<DayAllocation>,
    /// Sequence positions consumed, spacing included
    pub used: usize,
}

impl LaneAllocation {
    /// Rows carrying content of any day in this lane
    pub fn occupied_rows(&self) -> impl Iterator<Item = u32> + '_ {
        self.days.iter().flat_map(|d| d.rows.iter().copied())
    }
}

struct Placement {
    run: Range<usize>,
    blocks: Vec<(BlockKind, Range<usize>)>,
}

/// Assigns day runs over an `AvailableRowSequence`
#[derive(Clone, Copy, Debug)]
pub struct RowAllocator<'a> {
    sequence: &'a AvailableRowSequence,
    day_spacing: usize,
    record_spacing: usize,
}

impl<'a> RowAllocator<'a> {
    pub fn new(sequence: &'a AvailableRowSequence, config: &LayoutConfig) -> Self {
        Self {
            sequence,
            day_spacing: config.day_spacing,
            record_spacing: config.record_spacing,
        }
    }

    pub fn capacity(&self) -> usize {
        self.sequence.len()
    }

    /// First position at or after `pos` where `len` rows stay in one data range
    fn fit(&self, mut pos: usize, len: usize) -> usize {
        while !self.sequence.is_contiguous(pos, len) {
            match self.sequence.next_range_start(pos) {
                Some(next) => pos = next,
                None => break,
            }
        }
        pos
    }

    fn place(&self, days: &[DayPlan]) -> (Vec<Placement>, usize) {
        let mut cursor = 0;
        let mut placements = Vec::with_capacity(days.len());

        for (day_idx, day) in days.iter().enumerate() {
            if day_idx > 0 {
                cursor += self.day_spacing;
            }
            let mut blocks = Vec::with_capacity(day.blocks.len());
            let mut day_start = None;
            for (block_idx, block) in day.blocks.iter().enumerate() {
                if block_idx > 0 {
                    cursor += self.record_spacing;
                }
                let len = block.rows();
                let start = self.fit(cursor, len);
                if start != cursor {
                    debug!(
                        date = %day.date,
                        from = cursor,
                        to = start,
                        rows = len,
                        "block moved past reserved gap"
                    );
                }
                day_start.get_or_insert(start);
                cursor = start + len;
                blocks.push((block.clone(), start..cursor));
            }
            let start = day_start.unwrap_or(cursor);
            placements.push(Placement {
                run: start..cursor,
                blocks,
            });
        }

        (placements, cursor)
    }

    /// Positions the lane would consume, including any overflow past the end
    pub fn demand(&self, days: &[DayPlan]) -> usize {
        self.place(days).1
    }

    /// Place every day of a lane, or report how far the lane overflows
    pub fn allocate(&self, lane: Lane, days: &[DayPlan]) -> Result<LaneAllocation, ReportError> {
        let (placements, used) = self.place(days);
        let capacity = self.capacity();
        debug!(%lane, demand = used, capacity, "lane demand");
        if used > capacity {
            return Err(ReportError::OutOfCapacity {
                lane,
                demand: used,
                capacity,
            });
        }

        let rows_of = |range: Range<usize>| -> Vec<u32> {
            range.filter_map(|pos| self.sequence.get(pos)).collect()
        };
        let days = days
            .iter()
            .zip(placements)
            .map(|(day, placement)| DayAllocation {
                date: day.date,
                label: day.label.clone(),
                rows: rows_of(placement.run),
                blocks: placement
                    .blocks
                    .into_iter()
                    .map(|(kind, range)| PlacedBlock {
                        kind,
                        rows: rows_of(range),
                    })
                    .collect(),
            })
            .collect();

        Ok(LaneAllocation { lane, days, used })
    }
}
