//! Cell formats of the styles part
//!
//! Template styles are kept as they are. Cells that receive multi-line text
//! need wrapped, top-aligned text, so for each base format used that way a
//! variant is appended to `cellXfs` and the cell is pointed at it.

use jobsheet_core::ReportError;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::ops::Range;

use crate::xml::{malformed, open_tag, raw_attrs, reader, set_attr};

pub const STYLES_PART: &str = "xl/styles.xml";

/// One `<xf>` of `cellXfs`, split for rewriting
#[derive(Clone, Debug, PartialEq, Eq)]
struct CellFormat {
    attrs: Vec<(String, String)>,
    alignment: Vec<(String, String)>,
    /// Raw child elements other than `alignment`
    rest: Vec<u8>,
}

impl CellFormat {
    fn wrapped(&self) -> Self {
        let mut variant = self.clone();
        set_attr(&mut variant.attrs, "applyAlignment", "1");
        set_attr(&mut variant.alignment, "wrapText", "1");
        set_attr(&mut variant.alignment, "vertical", "top");
        variant
    }

    fn write(&self, out: &mut Vec<u8>) {
        open_tag(out, "xf", &self.attrs);
        out.push(b'>');
        open_tag(out, "alignment", &self.alignment);
        out.extend_from_slice(b"/>");
        out.extend_from_slice(&self.rest);
        out.extend_from_slice(b"</xf>");
    }
}

/// Parsed `styles.xml` with room for appended formats
#[derive(Clone, Debug)]
pub struct StyleSheet {
    xml: Vec<u8>,
    formats: Vec<CellFormat>,
    /// Span of the `<cellXfs ...>` start tag
    open: Range<usize>,
    /// Start of `</cellXfs>`
    close: usize,
    template_count: usize,
    wrapped: HashMap<u32, u32>,
}

impl StyleSheet {
    pub fn parse(xml: &[u8]) -> Result<Self, ReportError> {
        let mut reader = reader(xml);
        let mut open = None;
        let mut close = None;
        let mut formats = Vec::new();
        let mut current: Option<CellFormat> = None;
        // Start of the current child of an xf, while copying it raw
        let mut child: Option<(usize, usize)> = None;
        let mut depth = 0usize;

        loop {
            let start = reader.buffer_position() as usize;
            let event = reader.read_event().map_err(|e| malformed(STYLES_PART, e))?;
            let end = reader.buffer_position() as usize;
            match event {
                Event::Start(e) => {
                    depth += 1;
                    let name = e.local_name();
                    if open.is_none() && name.as_ref() == b"cellXfs" {
                        open = Some(start..end);
                    } else if open.is_some() && close.is_none() {
                        if let Some(format) = current.as_mut() {
                            if child.is_none() {
                                if name.as_ref() == b"alignment" {
                                    format.alignment = raw_attrs(&e);
                                }
                                child = Some((start, depth));
                            }
                        } else if name.as_ref() == b"xf" {
                            current = Some(CellFormat {
                                attrs: raw_attrs(&e),
                                alignment: Vec::new(),
                                rest: Vec::new(),
                            });
                        }
                    }
                }
                Event::Empty(e) => {
                    let name = e.local_name();
                    if open.is_none() && name.as_ref() == b"cellXfs" {
                        return Err(malformed(STYLES_PART, "cellXfs has no formats"));
                    }
                    if open.is_some() && close.is_none() {
                        if let Some(format) = current.as_mut() {
                            if child.is_none() {
                                if name.as_ref() == b"alignment" {
                                    format.alignment = raw_attrs(&e);
                                } else {
                                    format.rest.extend_from_slice(&xml[start..end]);
                                }
                            }
                        } else if name.as_ref() == b"xf" {
                            formats.push(CellFormat {
                                attrs: raw_attrs(&e),
                                alignment: Vec::new(),
                                rest: Vec::new(),
                            });
                        }
                    }
                }
                Event::End(e) => {
                    let name = e.local_name();
                    if let Some((child_start, child_depth)) = child {
                        if child_depth == depth {
                            if let Some(format) = current.as_mut() {
                                if name.as_ref() != b"alignment" {
                                    format.rest.extend_from_slice(&xml[child_start..end]);
                                }
                            }
                            child = None;
                        }
                    } else if name.as_ref() == b"xf" && open.is_some() && close.is_none() {
                        formats.extend(current.take());
                    } else if name.as_ref() == b"cellXfs" && open.is_some() && close.is_none() {
                        close = Some(start);
                    }
                    depth = depth.saturating_sub(1);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        let (Some(open), Some(close)) = (open, close) else {
            return Err(malformed(STYLES_PART, "no cellXfs element"));
        };
        Ok(Self {
            xml: xml.to_vec(),
            template_count: formats.len(),
            formats,
            open,
            close,
            wrapped: HashMap::new(),
        })
    }

    /// Number of cell formats, appended variants included
    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    /// Index of a wrapped, top-aligned copy of format `base`
    pub fn wrap_variant(&mut self, base: u32) -> u32 {
        if let Some(&index) = self.wrapped.get(&base) {
            return index;
        }
        let Some(format) = self.formats.get(base as usize) else {
            return base;
        };
        let is_wrapped = format
            .alignment
            .iter()
            .any(|(k, v)| k == "wrapText" && (v == "1" || v == "true"))
            && format
                .alignment
                .iter()
                .any(|(k, v)| k == "vertical" && v == "top");
        let index = if is_wrapped {
            base
        } else {
            let variant = format.wrapped();
            self.formats.push(variant);
            (self.formats.len() - 1) as u32
        };
        self.wrapped.insert(base, index);
        index
    }

    /// True once a variant was appended
    pub fn is_dirty(&self) -> bool {
        self.formats.len() != self.template_count
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        if !self.is_dirty() {
            return self.xml.clone();
        }
        let mut out = Vec::with_capacity(self.xml.len() + 128 * self.wrapped.len());
        out.extend_from_slice(&self.xml[..self.open.start]);
        out.extend_from_slice(format!("<cellXfs count=\"{}\">", self.formats.len()).as_bytes());
        out.extend_from_slice(&self.xml[self.open.end..self.close]);
        for format in &self.formats[self.template_count..] {
            format.write(&mut out);
        }
        out.extend_from_slice(&self.xml[self.close..]);
        out
    }
}
