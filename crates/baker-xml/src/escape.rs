/*
 * escape.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Escaping of character data and attribute values.

use std::borrow::Cow;

/// Escape character data: `&`, `<` and `>`.
pub fn escape_cdata(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>']) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}

/// Escape an attribute value.
///
/// On top of [`escape_cdata`] this escapes `"`, normalizes `\r\n` and lone
/// `\r` to `\n` (XML 1.0 section 2.11), and writes `\n` and tab as character
/// references so that they survive attribute-value normalization.
pub fn escape_attrib(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\r', '\n', '\t']) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 8);
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\r' => {
                chars.next_if_eq(&'\n');
                out.push_str("&#10;");
            }
            '\n' => out.push_str("&#10;"),
            '\t' => out.push_str("&#09;"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}
