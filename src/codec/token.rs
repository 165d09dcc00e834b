//! Metadata tokens
//!
//! A metadata line starts with `#` and carries `@tag(payload)` tokens.
//! Payloads never contain a raw `)` because values are escaped, so a token
//! ends at the first closing parenthesis.

use super::LINE_START;

/// Every `@tag(payload)` token on a metadata line, in order
pub fn tokens(line: &str) -> Vec<(&str, &str)> {
    let mut found = Vec::new();
    if !line.starts_with(LINE_START) {
        return found;
    }

    let mut rest = line;
    while let Some(at) = rest.find('@') {
        let after = &rest[at + 1..];
        let Some(open) = after.find('(') else {
            break;
        };
        let tag = &after[..open];
        if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            rest = after;
            continue;
        }
        let Some(close) = after[open + 1..].find(')') else {
            break;
        };
        found.push((tag, &after[open + 1..open + 1 + close]));
        rest = &after[open + 1 + close + 1..];
    }
    found
}

/// Payload of the first `@tag(...)` token on a metadata line
pub fn find_token<'a>(line: &'a str, tag: &str) -> Option<&'a str> {
    tokens(line)
        .into_iter()
        .find(|(name, _)| *name == tag)
        .map(|(_, payload)| payload)
}

/// `name:value` payload split on the first colon
pub(crate) fn split_key_value(payload: &str) -> (&str, &str) {
    payload.split_once(':').unwrap_or((payload, ""))
}
