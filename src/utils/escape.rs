//! Output escaping
//!
//! Characters outside the XML 1.0 `Char` production are replaced with
//! U+FFFD. A carriage return is always written as `&#xD;` since readers fold
//! a literal one into `\n`. Attribute values also escape quotes, tabs and
//! line feeds, which readers would otherwise turn into spaces.

use std::borrow::Cow;

/// Whether `c` may appear anywhere in an XML 1.0 document
pub fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// Escape character data
pub fn escape_text(text: &str) -> Cow<'_, str> {
    escape(text, false)
}

/// Escape an attribute value for a double-quoted attribute
pub fn escape_attr(value: &str) -> Cow<'_, str> {
    escape(value, true)
}

/// Replace characters that cannot appear in XML, without escaping markup
pub fn replace_invalid(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .map(|c| if is_xml_char(c) { c } else { '\u{FFFD}' })
            .collect(),
    )
}

fn needs_escape(c: char, attr: bool) -> bool {
    match c {
        '<' | '>' | '&' | '\r' => true,
        '"' | '\'' | '\n' | '\t' => attr,
        c => !is_xml_char(c),
    }
}

fn escape(s: &str, attr: bool) -> Cow<'_, str> {
    if !s.chars().any(|c| needs_escape(c, attr)) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '\r' => out.push_str("&#xD;"),
            '"' if attr => out.push_str("&quot;"),
            '\'' if attr => out.push_str("&apos;"),
            '\n' if attr => out.push_str("&#xA;"),
            '\t' if attr => out.push_str("&#x9;"),
            c if !is_xml_char(c) => out.push('\u{FFFD}'),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}
