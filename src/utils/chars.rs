//! XML name utilities
//!
//! Character classes from the XML 1.0 `Name` production, plus helpers for
//! `prefix:local` strings.

/// Whether `c` may start an XML name
pub fn is_name_start_char(c: char) -> bool {
    matches!(c,
        'A'..='Z' | 'a'..='z' | '_' | ':'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

/// Whether `c` may appear after the first character of an XML name
pub fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9'
            | '\u{B7}'
            | '\u{300}'..='\u{36F}'
            | '\u{203F}'..='\u{2040}')
}

/// Whether `s` is a well-formed XML name
pub fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if is_name_start_char(first) => chars.all(is_name_char),
        _ => false,
    }
}

/// Split `prefix:local` into its parts
///
/// A colon at the very start or end does not count as a separator.
pub fn split_prefixed(prefixed: &str) -> (&str, &str) {
    match prefixed.find(':') {
        Some(i) if i >= 1 && i + 1 < prefixed.len() => (&prefixed[..i], &prefixed[i + 1..]),
        _ => ("", prefixed),
    }
}

/// Join a prefix and a local name
pub fn join_prefixed(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{}:{}", prefix, local)
    }
}

/// Count the 1-based line of a byte offset
pub fn line_at(input: &[u8], offset: usize) -> usize {
    let end = offset.min(input.len());
    1 + input[..end].iter().filter(|&&b| b == b'\n').count()
}
