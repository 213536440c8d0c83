//! In-memory sheet model
//!
//! `SheetGrid` is an arena of row slots. Every cell slot carries the id of
//! the merge group it belongs to, so "is this cell merged, and with what" is
//! a map lookup instead of a walk over a spreadsheet library's object graph.
//!
//! Rows and columns are 1-based, as in A1 notation.

use jobsheet_core::ReportError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Identifier of a merge group inside one grid
pub type MergeId = usize;

// ============================================================================
// Addresses
// ============================================================================

/// Column letters for a 1-based column index (1 → `A`, 27 → `AA`)
pub fn column_name(col: u16) -> String {
    let mut result = String::new();
    let mut n = u32::from(col);
    while n > 0 {
        let rem = (n - 1) % 26;
        result.insert(0, char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    result
}

/// 1-based column index for column letters (`A` → 1)
pub fn column_index(name: &str) -> Option<u16> {
    if name.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for ch in name.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = u32::from(ch.to_ascii_uppercase()) - u32::from('A') + 1;
        col = col.checked_mul(26)?.checked_add(digit)?;
    }
    u16::try_from(col).ok()
}

/// A single cell position
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellAddr {
    pub row: u32,
    pub col: u16,
}

impl CellAddr {
    pub const fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }

    /// Parse A1 notation, tolerating `$` anchors
    pub fn parse(a1: &str) -> Option<Self> {
        let cleaned: String = a1.trim().chars().filter(|c| *c != '$').collect();
        let split = cleaned.find(|c: char| c.is_ascii_digit())?;
        let (letters, digits) = cleaned.split_at(split);
        let col = column_index(letters)?;
        let row: u32 = digits.parse().ok()?;
        (row > 0).then_some(Self { row, col })
    }

    pub fn to_a1(&self) -> String {
        format!("{}{}", column_name(self.col), self.row)
    }
}

impl fmt::Display for CellAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

impl TryFrom<String> for CellAddr {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid cell reference '{value}'"))
    }
}

impl From<CellAddr> for String {
    fn from(addr: CellAddr) -> Self {
        addr.to_a1()
    }
}

/// Inclusive run of columns, written `C:E`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColumnSpan {
    pub first: u16,
    pub last: u16,
}

impl ColumnSpan {
    pub const fn new(first: u16, last: u16) -> Self {
        Self { first, last }
    }

    pub fn parse(text: &str) -> Option<Self> {
        let (first, last) = match text.split_once(':') {
            Some((a, b)) => (column_index(a.trim())?, column_index(b.trim())?),
            None => {
                let col = column_index(text.trim())?;
                (col, col)
            }
        };
        (first <= last).then_some(Self { first, last })
    }

    pub fn width(&self) -> u16 {
        self.last - self.first + 1
    }

    pub fn contains(&self, col: u16) -> bool {
        (self.first..=self.last).contains(&col)
    }

    pub fn overlaps(&self, other: &ColumnSpan) -> bool {
        self.first <= other.last && other.first <= self.last
    }

    pub fn columns(&self) -> impl Iterator<Item = u16> {
        self.first..=self.last
    }
}

impl fmt::Display for ColumnSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", column_name(self.first), column_name(self.last))
    }
}

impl TryFrom<String> for ColumnSpan {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid column span '{value}'"))
    }
}

impl From<ColumnSpan> for String {
    fn from(span: ColumnSpan) -> Self {
        span.to_string()
    }
}

/// Rectangular block of cells, written `A7:B7`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub first: CellAddr,
    pub last: CellAddr,
}

impl CellRange {
    /// Build a range from any two corners
    pub fn new(a: CellAddr, b: CellAddr) -> Self {
        Self {
            first: CellAddr::new(a.row.min(b.row), a.col.min(b.col)),
            last: CellAddr::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    /// `span` columns across rows `first_row..=last_row`
    pub fn rows(first_row: u32, last_row: u32, span: ColumnSpan) -> Self {
        Self::new(
            CellAddr::new(first_row, span.first),
            CellAddr::new(last_row, span.last),
        )
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text.split_once(':') {
            Some((a, b)) => Some(Self::new(CellAddr::parse(a)?, CellAddr::parse(b)?)),
            None => CellAddr::parse(text).map(|addr| Self::new(addr, addr)),
        }
    }

    pub fn contains(&self, addr: CellAddr) -> bool {
        (self.first.row..=self.last.row).contains(&addr.row)
            && (self.first.col..=self.last.col).contains(&addr.col)
    }

    pub fn height(&self) -> u32 {
        self.last.row - self.first.row + 1
    }

    pub fn width(&self) -> u16 {
        self.last.col - self.first.col + 1
    }

    pub fn is_single_cell(&self) -> bool {
        self.first == self.last
    }

    pub fn cells(&self) -> impl Iterator<Item = CellAddr> {
        let (first, last) = (self.first, self.last);
        (first.row..=last.row)
            .flat_map(move |row| (first.col..=last.col).map(move |col| CellAddr::new(row, col)))
    }

    pub fn to_a1(&self) -> String {
        format!("{}:{}", self.first.to_a1(), self.last.to_a1())
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

// ============================================================================
// Cells
// ============================================================================

/// Value held by a cell
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Formula text (without the leading `=`) and its cached result, if any
    Formula {
        formula: String,
        cached: Option<String>,
    },
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn formula(&self) -> Option<&str> {
        match self {
            CellValue::Formula { formula, .. } => Some(formula),
            _ => None,
        }
    }
}

static EMPTY: CellValue = CellValue::Empty;

/// One cell of the arena
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellSlot {
    pub value: CellValue,
    /// Style index carried over from the template
    pub style: Option<u32>,
    /// Wrapped, top-aligned text
    pub wrap: bool,
    merge: Option<MergeId>,
    dirty: bool,
}

impl CellSlot {
    pub fn merge(&self) -> Option<MergeId> {
        self.merge
    }

    /// True once the cell's value or style flags were changed after loading
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// One row of the arena
#[derive(Clone, Debug, Default)]
pub struct RowSlot {
    cells: BTreeMap<u16, CellSlot>,
}

impl RowSlot {
    pub fn cells(&self) -> impl Iterator<Item = (u16, &CellSlot)> {
        self.cells.iter().map(|(col, slot)| (*col, slot))
    }

    pub fn cell(&self, col: u16) -> Option<&CellSlot> {
        self.cells.get(&col)
    }

    pub fn is_dirty(&self) -> bool {
        self.cells.values().any(|c| c.dirty)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Merge or write bookkeeping violation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("merge {range} overlaps existing merge {existing}")]
    Overlap { range: CellRange, existing: CellRange },

    #[error("merge {0} covers a single cell")]
    SingleCell(CellRange),

    #[error("cell {cell} is covered by merge {range}")]
    Covered { cell: CellAddr, range: CellRange },

    #[error("unknown merge id {0}")]
    UnknownMerge(MergeId),
}

impl From<GridError> for ReportError {
    fn from(err: GridError) -> Self {
        ReportError::Sheet(err.to_string())
    }
}

// ============================================================================
// Grid
// ============================================================================

/// Sheet contents plus merge bookkeeping
#[derive(Clone, Debug, Default)]
pub struct SheetGrid {
    rows: BTreeMap<u32, RowSlot>,
    merges: Vec<Option<CellRange>>,
    merges_dirty: bool,
}

impl SheetGrid {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_mut(&mut self, addr: CellAddr) -> &mut CellSlot {
        self.rows
            .entry(addr.row)
            .or_default()
            .cells
            .entry(addr.col)
            .or_default()
    }

    /// Insert a cell as read from a template; the cell stays clean
    pub fn load_cell(&mut self, addr: CellAddr, value: CellValue, style: Option<u32>) {
        let slot = self.slot_mut(addr);
        slot.value = value;
        slot.style = style;
    }

    /// Register a merge read from a template without marking the merge list changed
    pub fn load_merge(&mut self, range: CellRange) -> Result<MergeId, GridError> {
        let dirty = self.merges_dirty;
        let id = self.merge(range)?;
        self.merges_dirty = dirty;
        Ok(id)
    }

    pub fn cell(&self, addr: CellAddr) -> Option<&CellSlot> {
        self.rows.get(&addr.row).and_then(|row| row.cells.get(&addr.col))
    }

    pub fn value(&self, addr: CellAddr) -> &CellValue {
        self.cell(addr).map_or(&EMPTY, |slot| &slot.value)
    }

    pub fn text(&self, addr: CellAddr) -> Option<&str> {
        self.value(addr).as_text()
    }

    pub fn row(&self, row: u32) -> Option<&RowSlot> {
        self.rows.get(&row)
    }

    pub fn rows(&self) -> impl Iterator<Item = (u32, &RowSlot)> {
        self.rows.iter().map(|(row, slot)| (*row, slot))
    }

    /// Merge group the cell belongs to
    pub fn merge_at(&self, addr: CellAddr) -> Option<MergeId> {
        self.cell(addr).and_then(|slot| slot.merge)
    }

    pub fn merge_range(&self, id: MergeId) -> Option<CellRange> {
        self.merges.get(id).copied().flatten()
    }

    /// Range of the merge covering the cell
    pub fn merge_containing(&self, addr: CellAddr) -> Option<CellRange> {
        self.merge_at(addr).and_then(|id| self.merge_range(id))
    }

    /// Live merges in creation order
    pub fn merges(&self) -> impl Iterator<Item = (MergeId, CellRange)> + '_ {
        self.merges
            .iter()
            .enumerate()
            .filter_map(|(id, range)| range.map(|r| (id, r)))
    }

    /// True once a merge was added or removed after loading
    pub fn merges_dirty(&self) -> bool {
        self.merges_dirty
    }

    /// Merge a range into one logical cell
    pub fn merge(&mut self, range: CellRange) -> Result<MergeId, GridError> {
        if range.is_single_cell() {
            return Err(GridError::SingleCell(range));
        }
        if let Some(existing) = range.cells().find_map(|cell| self.merge_containing(cell)) {
            return Err(GridError::Overlap { range, existing });
        }
        let id = self.merges.len();
        self.merges.push(Some(range));
        for cell in range.cells() {
            self.slot_mut(cell).merge = Some(id);
        }
        self.merges_dirty = true;
        Ok(id)
    }

    /// Dissolve a merge group, returning the range it covered
    pub fn unmerge(&mut self, id: MergeId) -> Result<CellRange, GridError> {
        let range = self
            .merges
            .get_mut(id)
            .and_then(Option::take)
            .ok_or(GridError::UnknownMerge(id))?;
        for cell in range.cells() {
            self.slot_mut(cell).merge = None;
        }
        self.merges_dirty = true;
        Ok(range)
    }

    fn check_master(&self, addr: CellAddr) -> Result<(), GridError> {
        match self.merge_containing(addr) {
            Some(range) if range.first != addr => Err(GridError::Covered { cell: addr, range }),
            _ => Ok(()),
        }
    }

    /// Write a value; cells hidden under a merge must be written through its master
    pub fn set_value(&mut self, addr: CellAddr, value: CellValue) -> Result<(), GridError> {
        self.check_master(addr)?;
        let slot = self.slot_mut(addr);
        slot.value = value;
        slot.dirty = true;
        Ok(())
    }

    /// Toggle wrapped, top-aligned text on a master cell
    pub fn set_wrap(&mut self, addr: CellAddr, wrap: bool) -> Result<(), GridError> {
        self.check_master(addr)?;
        let slot = self.slot_mut(addr);
        if slot.wrap != wrap {
            slot.wrap = wrap;
            slot.dirty = true;
        }
        Ok(())
    }

    /// Null out a cell's value, keeping its style
    pub fn clear(&mut self, addr: CellAddr) {
        let Some(slot) = self
            .rows
            .get_mut(&addr.row)
            .and_then(|row| row.cells.get_mut(&addr.col))
        else {
            return;
        };
        if !slot.value.is_empty() || slot.wrap {
            slot.value = CellValue::Empty;
            slot.wrap = false;
            slot.dirty = true;
        }
    }
}
