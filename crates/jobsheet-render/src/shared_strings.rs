//! Shared string table

use jobsheet_core::ReportError;
use quick_xml::events::Event;

use crate::xml::{malformed, reader, unescape_text};

pub const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// Plain text of every `<si>` item, rich-text runs concatenated and
/// phonetic hints dropped
pub fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>, ReportError> {
    let mut reader = reader(xml);
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut phonetic_depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"rPh" => phonetic_depth += 1,
                b"t" => in_text = phonetic_depth == 0,
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"si" => {
                strings.push(String::new());
            }
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| malformed(SHARED_STRINGS_PART, e))?;
                if let Some(s) = current.as_mut() {
                    s.push_str(&text);
                }
            }
            Ok(Event::CData(t)) if in_text => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"si" => strings.extend(current.take().map(|s| unescape_text(&s))),
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(malformed(SHARED_STRINGS_PART, e)),
        }
    }
    Ok(strings)
}
