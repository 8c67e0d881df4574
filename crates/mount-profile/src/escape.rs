//! Octal escaping of whitespace and backslashes inside mount table fields.

use std::borrow::Cow;

const ESCAPED: [char; 4] = [' ', '\t', '\n', '\\'];

/// Encodes characters that would otherwise split or corrupt a field.
pub(crate) fn escape(field: &str) -> Cow<'_, str> {
    if !field.contains(ESCAPED) {
        return Cow::Borrowed(field);
    }
    let mut out = String::with_capacity(field.len() + 8);
    for ch in field.chars() {
        match ch {
            ' ' => out.push_str("\\040"),
            '\t' => out.push_str("\\011"),
            '\n' => out.push_str("\\012"),
            '\\' => out.push_str("\\134"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

/// Decodes the escapes produced by [`escape`]. Unknown sequences are kept
/// verbatim.
pub(crate) fn unescape(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut rest = field;
    while let Some(pos) = rest.find('\\') {
        let (head, tail) = rest.split_at(pos);
        out.push_str(head);
        match tail.get(1..4).and_then(decode) {
            Some(ch) => {
                out.push(ch);
                rest = tail.get(4..).unwrap_or_default();
            }
            None => {
                out.push('\\');
                rest = tail.get(1..).unwrap_or_default();
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode(code: &str) -> Option<char> {
    match code {
        "040" => Some(' '),
        "011" => Some('\t'),
        "012" => Some('\n'),
        "134" => Some('\\'),
        _ => None,
    }
}
