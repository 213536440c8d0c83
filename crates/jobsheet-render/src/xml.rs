//! Small helpers over quick-xml events

use jobsheet_core::ReportError;
use quick_xml::escape::escape;
use quick_xml::events::BytesStart;
use quick_xml::Reader;
use std::fmt::Write;

/// Error for a part that could not be parsed
pub fn malformed(part: &str, err: impl std::fmt::Display) -> ReportError {
    ReportError::TemplateUnreadable(format!("{part}: {err}"))
}

/// Unescaped value of the attribute whose local name is `name`
pub fn attr(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Attributes in document order, values left escaped
pub fn raw_attrs(e: &BytesStart<'_>) -> Vec<(String, String)> {
    e.attributes()
        .flatten()
        .map(|a| {
            (
                String::from_utf8_lossy(a.key.as_ref()).into_owned(),
                String::from_utf8_lossy(&a.value).into_owned(),
            )
        })
        .collect()
}

/// Write `<name k="v" ...` without closing the tag
pub fn open_tag(out: &mut Vec<u8>, name: &str, attrs: &[(String, String)]) {
    out.push(b'<');
    out.extend_from_slice(name.as_bytes());
    for (key, value) in attrs {
        out.push(b' ');
        out.extend_from_slice(key.as_bytes());
        out.extend_from_slice(b"=\"");
        out.extend_from_slice(value.as_bytes());
        out.push(b'"');
    }
}

/// Set or replace an attribute in a raw attribute list
pub fn set_attr(attrs: &mut Vec<(String, String)>, key: &str, value: &str) {
    match attrs.iter_mut().find(|(k, _)| k == key) {
        Some(entry) => entry.1 = value.to_string(),
        None => attrs.push((key.to_string(), value.to_string())),
    }
}

/// Reader over a complete in-memory part
pub fn reader(xml: &[u8]) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(false);
    reader
}

/// True when `s` starts with an `_xHHHH_` escape sequence
fn starts_with_escape(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 7 && b.starts_with(b"_x") && b[2..6].iter().all(u8::is_ascii_hexdigit) && b[6] == b'_'
}

/// Escape cell text for a `<t>` element.
///
/// Control characters XML 1.0 cannot carry are written as `_xHHHH_`; an
/// underscore that would read as such a sequence becomes `_x005F_`.
pub fn escape_text(text: &str) -> String {
    let mut encoded = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        match c {
            '\t' | '\n' | '\r' => encoded.push(c),
            c if c < ' ' || c == '\u{FFFE}' || c == '\u{FFFF}' => {
                let _ = write!(encoded, "_x{:04X}_", u32::from(c));
            }
            '_' if starts_with_escape(&text[i..]) => encoded.push_str("_x005F_"),
            c => encoded.push(c),
        }
    }
    escape(encoded.as_str()).into_owned()
}

/// Resolve `_xHHHH_` sequences in text read from a `<t>` element
pub fn unescape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("_x") {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let decoded = if starts_with_escape(tail) {
            u32::from_str_radix(&tail[2..6], 16)
                .ok()
                .and_then(char::from_u32)
        } else {
            None
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[7..];
            }
            None => {
                out.push_str("_x");
                rest = &tail[2..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn control_characters_are_encoded() {
        assert_eq!(escape_text("a\u{1}b\tc"), "a_x0001_b\tc");
        assert_eq!(escape_text("x\u{1F}<y>"), "x_x001F_&lt;y&gt;");
        assert_eq!(escape_text("line\nbreak"), "line\nbreak");
    }

    #[test]
    fn literal_escape_sequences_survive() {
        assert_eq!(escape_text("id_x0041_"), "id_x005F_x0041_");
        assert_eq!(escape_text("snake_case_x"), "snake_case_x");
        assert_eq!(unescape_text("id_x005F_x0041_"), "id_x0041_");
        assert_eq!(unescape_text("a_x0001_b"), "a\u{1}b");
        assert_eq!(unescape_text("_xZZZZ_ and _x"), "_xZZZZ_ and _x");
    }
}
