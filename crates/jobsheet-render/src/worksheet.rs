//! Worksheet part: decode into a `SheetGrid`, patch back out
//!
//! Decoding records the byte span of every row and cell. Writing copies each
//! span whose grid cells are clean and re-serializes only the dirty cells,
//! so formulas, styles and anything the grid does not model survive
//! unchanged.

use jobsheet_core::ReportError;
use jobsheet_layout::{CellAddr, CellRange, CellSlot, CellValue, SheetGrid};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use crate::styles::StyleSheet;
use crate::xml::{attr, escape_text, malformed, open_tag, raw_attrs, reader, unescape_text};

/// Elements that follow `mergeCells` in a worksheet
const AFTER_MERGE_CELLS: &[&[u8]] = &[
    b"phoneticPr",
    b"conditionalFormatting",
    b"dataValidations",
    b"hyperlinks",
    b"printOptions",
    b"pageMargins",
    b"pageSetup",
    b"headerFooter",
    b"rowBreaks",
    b"colBreaks",
    b"customProperties",
    b"cellWatches",
    b"ignoredErrors",
    b"smartTags",
    b"drawing",
    b"legacyDrawing",
    b"legacyDrawingHF",
    b"picture",
    b"oleObjects",
    b"controls",
    b"webPublishItems",
    b"tableParts",
    b"extLst",
];

#[derive(Clone, Debug)]
struct RawCell {
    col: u16,
    span: Range<usize>,
}

#[derive(Clone, Debug)]
struct RawRow {
    number: u32,
    attrs: Vec<(String, String)>,
    span: Range<usize>,
    cells: Vec<RawCell>,
}

/// Where the text of the element being read goes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Capture {
    None,
    Value,
    Formula,
    Inline,
}

/// Cell being read
#[derive(Debug)]
struct PendingCell {
    addr: CellAddr,
    start: usize,
    style: Option<u32>,
    kind: Option<String>,
    value: Option<String>,
    formula: Option<String>,
    inline: Option<String>,
}

impl PendingCell {
    fn into_value(self, strings: &[String], part: &str) -> Result<CellValue, ReportError> {
        if let Some(formula) = self.formula {
            return Ok(CellValue::Formula {
                formula,
                cached: self.value,
            });
        }
        let value = match self.kind.as_deref() {
            Some("s") => {
                let idx: usize = self
                    .value
                    .as_deref()
                    .and_then(|v| v.trim().parse().ok())
                    .ok_or_else(|| malformed(part, format!("{} has no string index", self.addr)))?;
                let text = strings.get(idx).ok_or_else(|| {
                    malformed(part, format!("{} refers to missing string {idx}", self.addr))
                })?;
                CellValue::Text(text.clone())
            }
            Some("inlineStr") => {
                CellValue::Text(unescape_text(&self.inline.unwrap_or_default()))
            }
            Some("b") => CellValue::Bool(self.value.as_deref().map(str::trim) == Some("1")),
            Some("str" | "e") => self.value.map_or(CellValue::Empty, CellValue::Text),
            _ => match self.value.as_deref().map(str::trim) {
                Some(v) if !v.is_empty() => v
                    .parse()
                    .map(CellValue::Number)
                    .map_err(|_| malformed(part, format!("{} has value '{v}'", self.addr)))?,
                _ => CellValue::Empty,
            },
        };
        Ok(value)
    }
}

/// Decoded worksheet with the spans needed to patch it
#[derive(Clone, Debug)]
pub struct WorksheetPart {
    name: String,
    xml: Vec<u8>,
    rows: Vec<RawRow>,
    sheet_data: Range<usize>,
    merge_cells: Option<Range<usize>>,
    merge_insert_at: usize,
}

impl WorksheetPart {
    /// Decode a worksheet, loading its cells and merges into a fresh grid
    pub fn parse(
        name: &str,
        xml: &[u8],
        strings: &[String],
    ) -> Result<(Self, SheetGrid), ReportError> {
        let mut reader = reader(xml);
        let mut grid = SheetGrid::new();

        let mut depth = 0usize;
        let mut rows: Vec<RawRow> = Vec::new();
        let mut row: Option<RawRow> = None;
        let mut cell: Option<PendingCell> = None;
        let mut capture = Capture::None;
        let mut in_inline = false;

        let mut sheet_data_start = None;
        let mut sheet_data = None;
        let mut merge_start = None;
        let mut merge_cells = None;
        let mut merge_insert_at = None;

        loop {
            let start = reader.buffer_position() as usize;
            let event = reader.read_event().map_err(|e| malformed(name, e))?;
            let end = reader.buffer_position() as usize;

            match event {
                Event::Start(e) => {
                    let local = e.local_name();
                    match local.as_ref() {
                        b"sheetData" if depth == 1 => sheet_data_start = Some(start),
                        b"mergeCells" if depth == 1 => merge_start = Some(start),
                        b"row" if sheet_data_start.is_some() && sheet_data.is_none() => {
                            row = Some(start_row(&e, start, rows.last()));
                        }
                        b"c" if row.is_some() => {
                            cell = Some(start_cell(&e, start, row.as_ref())?);
                        }
                        b"v" if cell.is_some() => capture = Capture::Value,
                        b"f" if cell.is_some() => {
                            capture = Capture::Formula;
                            if let Some(c) = cell.as_mut() {
                                c.formula.get_or_insert_with(String::new);
                            }
                        }
                        b"is" if cell.is_some() => {
                            in_inline = true;
                            if let Some(c) = cell.as_mut() {
                                c.inline.get_or_insert_with(String::new);
                            }
                        }
                        b"rPh" if in_inline => in_inline = false,
                        b"t" if in_inline => capture = Capture::Inline,
                        other => {
                            if depth == 1
                                && merge_insert_at.is_none()
                                && AFTER_MERGE_CELLS.contains(&other)
                            {
                                merge_insert_at = Some(start);
                            }
                        }
                    }
                    depth += 1;
                }
                Event::Empty(e) => {
                    let local = e.local_name();
                    match local.as_ref() {
                        b"sheetData" if depth == 1 => sheet_data = Some(start..end),
                        b"mergeCells" if depth == 1 => merge_cells = Some(start..end),
                        b"mergeCell" if merge_start.is_some() && merge_cells.is_none() => {
                            let reference = attr(&e, b"ref").unwrap_or_default();
                            let range = CellRange::parse(&reference).ok_or_else(|| {
                                malformed(name, format!("bad merge reference '{reference}'"))
                            })?;
                            if !range.is_single_cell() {
                                grid.load_merge(range).map_err(|err| malformed(name, err))?;
                            }
                        }
                        b"row" if sheet_data_start.is_some() && sheet_data.is_none() => {
                            let mut empty = start_row(&e, start, rows.last());
                            empty.span = start..end;
                            rows.push(empty);
                        }
                        b"c" if row.is_some() => {
                            let pending = start_cell(&e, start, row.as_ref())?;
                            finish_cell(pending, end, strings, name, &mut grid, row.as_mut())?;
                        }
                        b"f" if cell.is_some() => {
                            if let Some(c) = cell.as_mut() {
                                c.formula.get_or_insert_with(String::new);
                            }
                        }
                        other => {
                            if depth == 1
                                && merge_insert_at.is_none()
                                && AFTER_MERGE_CELLS.contains(&other)
                            {
                                merge_insert_at = Some(start);
                            }
                        }
                    }
                }
                Event::Text(t) if capture != Capture::None => {
                    let text = t.unescape().map_err(|e| malformed(name, e))?;
                    push_text(cell.as_mut(), capture, &text);
                }
                Event::CData(t) if capture != Capture::None => {
                    push_text(cell.as_mut(), capture, &String::from_utf8_lossy(&t));
                }
                Event::End(e) => {
                    depth = depth.saturating_sub(1);
                    match e.local_name().as_ref() {
                        b"sheetData" if depth == 1 => {
                            if let Some(s) = sheet_data_start {
                                sheet_data = Some(s..end);
                            }
                        }
                        b"mergeCells" if depth == 1 => {
                            if let Some(s) = merge_start {
                                merge_cells = Some(s..end);
                            }
                        }
                        b"worksheet" if depth == 0 => {
                            merge_insert_at.get_or_insert(start);
                        }
                        b"row" => {
                            if let Some(mut done) = row.take() {
                                done.span.end = end;
                                rows.push(done);
                            }
                        }
                        b"c" => {
                            if let Some(pending) = cell.take() {
                                finish_cell(pending, end, strings, name, &mut grid, row.as_mut())?;
                            }
                        }
                        b"v" | b"f" | b"t" => capture = Capture::None,
                        b"is" => in_inline = false,
                        b"rPh" if cell.is_some() => in_inline = true,
                        _ => {}
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        let sheet_data = sheet_data.ok_or_else(|| malformed(name, "no sheetData element"))?;
        let merge_insert_at =
            merge_insert_at.ok_or_else(|| malformed(name, "no closing worksheet tag"))?;

        let part = Self {
            name: name.to_string(),
            xml: xml.to_vec(),
            rows,
            sheet_data,
            merge_cells,
            merge_insert_at,
        };
        Ok((part, grid))
    }

    /// Part name inside the package
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Serialize the worksheet with the grid's changes applied
    pub fn to_bytes(&self, grid: &SheetGrid, styles: &mut StyleSheet) -> Vec<u8> {
        let mut edits: Vec<(Range<usize>, Vec<u8>)> =
            vec![(self.sheet_data.clone(), self.write_sheet_data(grid, styles))];
        if grid.merges_dirty() {
            let merges = write_merge_cells(grid);
            match &self.merge_cells {
                Some(span) => edits.push((span.clone(), merges)),
                None => edits.push((self.merge_insert_at..self.merge_insert_at, merges)),
            }
        }
        edits.sort_by_key(|(span, _)| span.start);

        let mut out = Vec::with_capacity(self.xml.len() + 1024);
        let mut pos = 0;
        for (span, bytes) in edits {
            out.extend_from_slice(&self.xml[pos..span.start]);
            out.extend_from_slice(&bytes);
            pos = span.end;
        }
        out.extend_from_slice(&self.xml[pos..]);
        out
    }

    fn write_sheet_data(&self, grid: &SheetGrid, styles: &mut StyleSheet) -> Vec<u8> {
        let raw_rows: BTreeMap<u32, &RawRow> = self.rows.iter().map(|r| (r.number, r)).collect();
        let numbers: BTreeSet<u32> = raw_rows
            .keys()
            .copied()
            .chain(grid.rows().filter(|(_, r)| r.is_dirty()).map(|(n, _)| n))
            .collect();

        let mut out = Vec::with_capacity(self.sheet_data.len() + 1024);
        out.extend_from_slice(b"<sheetData>");
        for number in numbers {
            let raw = raw_rows.get(&number).copied();
            let dirty = grid.row(number).is_some_and(|r| r.is_dirty());
            match (raw, dirty) {
                (Some(raw), false) => out.extend_from_slice(&self.xml[raw.span.clone()]),
                (raw, _) => {
                    let attrs: Vec<(String, String)> = match raw {
                        Some(raw) => raw
                            .attrs
                            .iter()
                            .filter(|(k, _)| k != "spans")
                            .cloned()
                            .collect(),
                        None => vec![("r".to_string(), number.to_string())],
                    };
                    open_tag(&mut out, "row", &attrs);
                    out.push(b'>');
                    self.write_row_cells(&mut out, number, raw, grid, styles);
                    out.extend_from_slice(b"</row>");
                }
            }
        }
        out.extend_from_slice(b"</sheetData>");
        out
    }

    fn write_row_cells(
        &self,
        out: &mut Vec<u8>,
        number: u32,
        raw: Option<&RawRow>,
        grid: &SheetGrid,
        styles: &mut StyleSheet,
    ) {
        let raw_cells: BTreeMap<u16, &RawCell> = raw
            .map(|r| r.cells.iter().map(|c| (c.col, c)).collect())
            .unwrap_or_default();
        let dirty: BTreeMap<u16, &CellSlot> = grid
            .row(number)
            .map(|r| r.cells().filter(|(_, slot)| slot.is_dirty()).collect())
            .unwrap_or_default();
        let columns: BTreeSet<u16> = raw_cells.keys().chain(dirty.keys()).copied().collect();

        for col in columns {
            match (dirty.get(&col), raw_cells.get(&col)) {
                (Some(slot), _) => write_cell(out, CellAddr::new(number, col), slot, styles),
                (None, Some(raw)) => out.extend_from_slice(&self.xml[raw.span.clone()]),
                (None, None) => {}
            }
        }
    }
}

fn start_row(e: &quick_xml::events::BytesStart<'_>, start: usize, prev: Option<&RawRow>) -> RawRow {
    let number = attr(e, b"r")
        .and_then(|r| r.parse().ok())
        .unwrap_or_else(|| prev.map_or(1, |p| p.number + 1));
    RawRow {
        number,
        attrs: raw_attrs(e),
        span: start..start,
        cells: Vec::new(),
    }
}

fn start_cell(
    e: &quick_xml::events::BytesStart<'_>,
    start: usize,
    row: Option<&RawRow>,
) -> Result<PendingCell, ReportError> {
    let row_number = row.map_or(1, |r| r.number);
    let addr = match attr(e, b"r") {
        Some(reference) => CellAddr::parse(&reference).ok_or_else(|| {
            ReportError::TemplateUnreadable(format!("bad cell reference '{reference}'"))
        })?,
        None => {
            let col = row
                .and_then(|r| r.cells.last())
                .map_or(1, |c| c.col + 1);
            CellAddr::new(row_number, col)
        }
    };
    Ok(PendingCell {
        addr,
        start,
        style: attr(e, b"s").and_then(|s| s.parse().ok()),
        kind: attr(e, b"t"),
        value: None,
        formula: None,
        inline: None,
    })
}

fn finish_cell(
    pending: PendingCell,
    end: usize,
    strings: &[String],
    part: &str,
    grid: &mut SheetGrid,
    row: Option<&mut RawRow>,
) -> Result<(), ReportError> {
    let addr = pending.addr;
    let span = pending.start..end;
    let style = pending.style;
    let value = pending.into_value(strings, part)?;
    grid.load_cell(addr, value, style);
    if let Some(row) = row {
        row.cells.push(RawCell {
            col: addr.col,
            span,
        });
    }
    Ok(())
}

fn push_text(cell: Option<&mut PendingCell>, capture: Capture, text: &str) {
    let Some(cell) = cell else { return };
    let target = match capture {
        Capture::Value => cell.value.get_or_insert_with(String::new),
        Capture::Formula => cell.formula.get_or_insert_with(String::new),
        Capture::Inline => cell.inline.get_or_insert_with(String::new),
        Capture::None => return,
    };
    target.push_str(text);
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn write_cell(out: &mut Vec<u8>, addr: CellAddr, slot: &CellSlot, styles: &mut StyleSheet) {
    let style = match (slot.style, slot.wrap) {
        (base, true) => Some(styles.wrap_variant(base.unwrap_or(0))),
        (base, false) => base,
    };

    let mut attrs = vec![("r".to_string(), addr.to_a1())];
    if let Some(s) = style {
        attrs.push(("s".to_string(), s.to_string()));
    }

    match &slot.value {
        CellValue::Empty => {
            open_tag(out, "c", &attrs);
            out.extend_from_slice(b"/>");
        }
        CellValue::Text(text) => {
            attrs.push(("t".to_string(), "inlineStr".to_string()));
            open_tag(out, "c", &attrs);
            out.extend_from_slice(b"><is><t xml:space=\"preserve\">");
            out.extend_from_slice(escape_text(text).as_bytes());
            out.extend_from_slice(b"</t></is></c>");
        }
        CellValue::Number(n) => {
            open_tag(out, "c", &attrs);
            out.extend_from_slice(format!("><v>{}</v></c>", format_number(*n)).as_bytes());
        }
        CellValue::Bool(b) => {
            attrs.push(("t".to_string(), "b".to_string()));
            open_tag(out, "c", &attrs);
            out.extend_from_slice(format!("><v>{}</v></c>", u8::from(*b)).as_bytes());
        }
        CellValue::Formula { formula, cached } => {
            open_tag(out, "c", &attrs);
            out.extend_from_slice(b"><f>");
            out.extend_from_slice(escape(formula.as_str()).as_bytes());
            out.extend_from_slice(b"</f>");
            if let Some(cached) = cached {
                out.extend_from_slice(b"<v>");
                out.extend_from_slice(escape(cached.as_str()).as_bytes());
                out.extend_from_slice(b"</v>");
            }
            out.extend_from_slice(b"</c>");
        }
    }
}

fn write_merge_cells(grid: &SheetGrid) -> Vec<u8> {
    let mut ranges: Vec<CellRange> = grid.merges().map(|(_, range)| range).collect();
    if ranges.is_empty() {
        return Vec::new();
    }
    ranges.sort_by_key(|r| (r.first.row, r.first.col));
    let mut out = format!("<mergeCells count=\"{}\">", ranges.len()).into_bytes();
    for range in ranges {
        out.extend_from_slice(format!("<mergeCell ref=\"{}\"/>", range.to_a1()).as_bytes());
    }
    out.extend_from_slice(b"</mergeCells>");
    out
}
