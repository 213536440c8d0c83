//! Flattened view of the template's data rows
//!
//! The allocator never sees sheet rows directly: it walks positions of the
//! `AvailableRowSequence`, the concatenation of every data range in template
//! order. Position 30 of the legacy template is row 37, position 33 is row 45.

use crate::config::RowRange;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AvailableRowSequence {
    rows: Vec<u32>,
    /// Positions where a new data range begins (always includes 0)
    range_starts: Vec<usize>,
}

impl AvailableRowSequence {
    pub fn new(ranges: &[RowRange]) -> Self {
        let ranges: Vec<&RowRange> = ranges.iter().filter(|r| !r.is_empty()).collect();
        let mut rows = Vec::with_capacity(ranges.iter().map(|r| r.len()).sum());
        let mut range_starts = Vec::with_capacity(ranges.len());
        for range in ranges {
            range_starts.push(rows.len());
            rows.extend(range.rows());
        }
        Self { rows, range_starts }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sheet row at a sequence position
    pub fn get(&self, pos: usize) -> Option<u32> {
        self.rows.get(pos).copied()
    }

    pub fn rows(&self) -> &[u32] {
        &self.rows
    }

    /// True when positions `start..start + len` stay inside one data range.
    ///
    /// Positions past the end of the sequence are virtual and count as a
    /// continuation of the last range, so overflow is measured, not hidden.
    pub fn is_contiguous(&self, start: usize, len: usize) -> bool {
        if len <= 1 {
            return true;
        }
        let end = start + len;
        !self
            .range_starts
            .iter()
            .any(|&boundary| boundary > start && boundary < end)
    }

    /// First position of the data range following the one containing `pos`
    pub fn next_range_start(&self, pos: usize) -> Option<usize> {
        self.range_starts.iter().copied().find(|&s| s > pos)
    }
}
