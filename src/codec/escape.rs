//! Value escaping
//!
//! Characters that carry meaning in the line syntax are replaced with fixed
//! placeholders. Line breaks are escaped too so a value never splits a line.

const REPLACEMENTS: [(&str, &str); 7] = [
    ("\t", "\\t"),
    ("\n", "\\n"),
    ("\r", "\\r"),
    ("\"", "&quot;"),
    ("@", "&#64;"),
    ("(", "&#40;"),
    (")", "&#41;"),
];

/// Replace reserved characters with their placeholders
pub fn escape(value: &str) -> String {
    let mut escaped = value.to_string();
    for (raw, placeholder) in REPLACEMENTS {
        if escaped.contains(raw) {
            escaped = escaped.replace(raw, placeholder);
        }
    }
    escaped
}

/// Reverse [`escape`]
pub fn unescape(value: &str) -> String {
    let mut raw = value.to_string();
    for (original, placeholder) in REPLACEMENTS {
        if raw.contains(placeholder) {
            raw = raw.replace(placeholder, original);
        }
    }
    raw
}

/// Metadata payload: escaped and wrapped in double quotes
pub fn encode_value(value: &str) -> String {
    format!("\"{}\"", escape(value))
}

/// Metadata payload back to text: drops the wrapping quotes, then unescapes
pub fn decode_value(payload: &str) -> String {
    unescape(&payload.replace('"', ""))
}

pub(crate) fn encode_bool(value: bool) -> &'static str {
    if value {
        super::YES
    } else {
        super::NO
    }
}

pub(crate) fn decode_bool(payload: &str) -> Option<bool> {
    let value = decode_value(payload);
    if value.eq_ignore_ascii_case(super::YES) || value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case(super::NO) || value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
