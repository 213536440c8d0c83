//! Workbook part: sheet lookup and recalculation flag

use jobsheet_core::ReportError;
use quick_xml::events::Event;

use crate::package::Package;
use crate::xml::{attr, malformed, open_tag, raw_attrs, reader, set_attr};

pub const WORKBOOK_PART: &str = "xl/workbook.xml";
pub const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";

/// Elements that follow `calcPr` in a workbook
const AFTER_CALC_PR: &[&[u8]] = &[
    b"oleSize",
    b"customWorkbookViews",
    b"pivotCaches",
    b"smartTagPr",
    b"smartTagTypes",
    b"webPublishing",
    b"fileRecoveryPr",
    b"webPublishObjects",
    b"extLst",
];

/// A sheet entry of the workbook
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetEntry {
    pub name: String,
    /// Relationship id pointing at the worksheet part
    pub rel_id: String,
}

/// Sheets in tab order
pub fn sheets(package: &Package) -> Result<Vec<SheetEntry>, ReportError> {
    let xml = package.required_part(WORKBOOK_PART)?;
    let mut reader = reader(xml);
    let mut sheets = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                let name = attr(&e, b"name").unwrap_or_default();
                // r:id is the only namespaced `id` on a sheet element
                let rel_id = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.prefix().is_some() && a.key.local_name().as_ref() == b"id")
                    .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
                    .ok_or_else(|| malformed(WORKBOOK_PART, format!("sheet '{name}' has no r:id")))?;
                sheets.push(SheetEntry { name, rel_id });
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(malformed(WORKBOOK_PART, e)),
        }
    }
    Ok(sheets)
}

/// Part name of the worksheet at a zero-based tab index
pub fn sheet_part_path(package: &Package, index: usize) -> Result<String, ReportError> {
    let sheets = sheets(package)?;
    let sheet = sheets.get(index).ok_or_else(|| {
        ReportError::TemplateUnreadable(format!(
            "template has {} sheet(s), working sheet index is {index}",
            sheets.len()
        ))
    })?;

    let rels = package.required_part(WORKBOOK_RELS_PART)?;
    let mut reader = reader(rels);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship"
                    && attr(&e, b"Id").as_deref() == Some(sheet.rel_id.as_str()) =>
            {
                let target = attr(&e, b"Target").ok_or_else(|| {
                    malformed(WORKBOOK_RELS_PART, format!("{} has no target", sheet.rel_id))
                })?;
                return Ok(resolve_target(&target));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(malformed(WORKBOOK_RELS_PART, e)),
        }
    }
    Err(malformed(
        WORKBOOK_RELS_PART,
        format!("no relationship {} for sheet '{}'", sheet.rel_id, sheet.name),
    ))
}

/// Relationship targets are relative to `xl/` unless absolute
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => {
            let mut parts: Vec<&str> = vec!["xl"];
            for segment in target.split('/') {
                match segment {
                    "" | "." => {}
                    ".." => {
                        parts.pop();
                    }
                    other => parts.push(other),
                }
            }
            parts.join("/")
        }
    }
}

/// Flag the workbook for a full recalculation when it is opened
pub fn request_full_calc(xml: &[u8]) -> Result<Vec<u8>, ReportError> {
    let mut reader = reader(xml);
    let mut depth = 0usize;
    let mut insert_at = None;

    loop {
        let start = reader.buffer_position() as usize;
        let event = reader.read_event().map_err(|e| malformed(WORKBOOK_PART, e))?;
        let end = reader.buffer_position() as usize;
        match event {
            Event::Start(e) | Event::Empty(e)
                if depth == 1 && e.local_name().as_ref() == b"calcPr" =>
            {
                let mut attrs = raw_attrs(&e);
                set_attr(&mut attrs, "fullCalcOnLoad", "1");
                let mut out = Vec::with_capacity(xml.len() + 32);
                out.extend_from_slice(&xml[..start]);
                open_tag(&mut out, "calcPr", &attrs);
                let raw = &xml[start..end];
                out.extend_from_slice(if raw.ends_with(b"/>") { b"/>" } else { b">" });
                out.extend_from_slice(&xml[end..]);
                return Ok(out);
            }
            Event::Start(e) => {
                if depth == 1
                    && insert_at.is_none()
                    && AFTER_CALC_PR.contains(&e.local_name().as_ref())
                {
                    insert_at = Some(start);
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if depth == 1
                    && insert_at.is_none()
                    && AFTER_CALC_PR.contains(&e.local_name().as_ref())
                {
                    insert_at = Some(start);
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if depth == 0 && insert_at.is_none() {
                    insert_at = Some(start);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let at = insert_at.ok_or_else(|| malformed(WORKBOOK_PART, "no workbook element"))?;
    let mut out = Vec::with_capacity(xml.len() + 32);
    out.extend_from_slice(&xml[..at]);
    out.extend_from_slice(b"<calcPr fullCalcOnLoad=\"1\"/>");
    out.extend_from_slice(&xml[at..]);
    Ok(out)
}
