//! Single-byte text encoding for thermal printers
//!
//! Printers are driven in code page 16 (WPC1252), so every character that
//! reaches the wire is exactly one byte. This module provides utilities for:
//! - Measuring, truncating and padding text in printer columns
//! - Normalizing line breaks
//! - Mapping UTF-8 text to Windows-1252 without ever emitting a control byte

use std::borrow::Cow;

/// Marker appended to text cut at the column limit
pub const ELLIPSIS: &str = "...";

/// Byte substituted for any character the code page cannot represent
pub const REPLACEMENT: u8 = b'?';

/// Horizontal placement of text inside a fixed-width field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldAlign {
    /// Text flush left, padding on the right
    #[default]
    Left,
    /// Text flush right, padding on the left
    Right,
    /// Padding split around the text, the extra space going right
    Center,
}

/// Collapse `\r\n` and lone `\r` into `\n`
pub fn normalize_newlines(s: &str) -> Cow<'_, str> {
    if !s.contains('\r') {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.replace("\r\n", "\n").replace('\r', "\n"))
}

/// Printer columns used by a string
///
/// One character always encodes to one byte, so this is the char count.
pub fn text_width(s: &str) -> usize {
    s.chars().count()
}

/// Truncate a string to `max_width` columns, ending with [`ELLIPSIS`] when cut
pub fn truncate_text(s: &str, max_width: usize) -> String {
    if text_width(s) <= max_width {
        return s.to_string();
    }
    let marker = text_width(ELLIPSIS);
    if max_width <= marker {
        return ELLIPSIS.chars().take(max_width).collect();
    }
    let mut result: String = s.chars().take(max_width - marker).collect();
    result.push_str(ELLIPSIS);
    result
}

/// Pad a string to exactly `width` columns
///
/// If the string is longer than the width, it is truncated first.
pub fn pad_text(s: &str, width: usize, align: FieldAlign) -> String {
    let s = truncate_text(s, width);
    let spaces = width - text_width(&s);
    match align {
        FieldAlign::Left => format!("{}{}", s, " ".repeat(spaces)),
        FieldAlign::Right => format!("{}{}", " ".repeat(spaces), s),
        FieldAlign::Center => {
            let before = spaces / 2;
            let after = spaces - before;
            format!("{}{}{}", " ".repeat(before), s, " ".repeat(after))
        }
    }
}

/// Map one character to its WPC1252 byte
///
/// Control characters (C0, DEL and C1) and anything outside the code page
/// become [`REPLACEMENT`] so text can never be read as a printer command.
pub fn encode_char(c: char) -> u8 {
    match c {
        '\n' => b'\n',
        '\t' => b' ',
        c if c.is_control() => REPLACEMENT,
        c if c.is_ascii() => c as u8,
        c => {
            let mut tmp = [0u8; 4];
            let (bytes, _, had_errors) = encoding_rs::WINDOWS_1252.encode(c.encode_utf8(&mut tmp));
            match (had_errors, bytes.as_ref()) {
                (false, [b]) => *b,
                _ => REPLACEMENT,
            }
        }
    }
}

/// Encode text for the printer
///
/// Line breaks are normalized to `\n` and every other character is mapped
/// through [`encode_char`].
pub fn encode_text(s: &str) -> Vec<u8> {
    let normalized = normalize_newlines(s);
    normalized.chars().map(encode_char).collect()
}
