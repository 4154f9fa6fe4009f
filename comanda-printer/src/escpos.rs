//! ESC/POS encoder
//!
//! Deterministic translation of a [`Document`] into the byte stream an
//! ESC/POS thermal printer expects. The encoder is a pure function: the same
//! document always yields the same bytes.

use crate::document::{Align, Document, FontSize, Instruction};
use crate::encoding::{encode_char, encode_text, pad_text};
use tracing::instrument;

const ESC: u8 = 0x1B;
const GS: u8 = 0x1D;
const LF: u8 = 0x0A;

/// ESC @ - Initialize printer
pub const INIT: [u8; 2] = [ESC, 0x40];

/// ESC t 16 - Select character code table WPC1252
pub const CODE_PAGE_WPC1252: [u8; 3] = [ESC, 0x74, 16];

/// GS V 1 - Partial cut
pub const CUT_PARTIAL: [u8; 3] = [GS, 0x56, 0x01];

fn align_cmd(align: Align) -> [u8; 3] {
    // ESC a n
    let n = match align {
        Align::Left => 0x00,
        Align::Center => 0x01,
        Align::Right => 0x02,
    };
    [ESC, 0x61, n]
}

fn bold_cmd(on: bool) -> [u8; 3] {
    // ESC E n
    [ESC, 0x45, u8::from(on)]
}

fn size_cmd(size: FontSize) -> [u8; 3] {
    // GS ! n - high nibble width, low nibble height
    let n = match size {
        FontSize::Normal => 0x00,
        FontSize::Double => 0x11,
    };
    [GS, 0x21, n]
}

fn feed_cmd(lines: u8) -> [u8; 3] {
    // ESC d n - Print and feed n lines
    [ESC, 0x64, lines]
}

/// Encode a document into one ESC/POS buffer
///
/// The buffer always starts with printer init and code page selection.
/// Separators, blank lines and cuts start on a fresh line.
#[instrument(skip(doc), fields(instructions = doc.len()))]
pub fn encode(doc: &Document) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4096);
    buf.extend_from_slice(&INIT);
    buf.extend_from_slice(&CODE_PAGE_WPC1252);

    let mut line_open = false;

    for ins in doc.instructions() {
        match ins {
            Instruction::Align(a) => buf.extend_from_slice(&align_cmd(*a)),
            Instruction::Bold(on) => buf.extend_from_slice(&bold_cmd(*on)),
            Instruction::Size(s) => buf.extend_from_slice(&size_cmd(*s)),
            Instruction::Text(t) => {
                let bytes = encode_text(t);
                if let Some(&last) = bytes.last() {
                    line_open = last != LF;
                }
                buf.extend_from_slice(&bytes);
            }
            Instruction::Field { text, width, align } => {
                let bytes = encode_text(&pad_text(text, *width, *align));
                if let Some(&last) = bytes.last() {
                    line_open = last != LF;
                }
                buf.extend_from_slice(&bytes);
            }
            Instruction::LineFeed => {
                buf.push(LF);
                line_open = false;
            }
            Instruction::Separator { ch, width } => {
                close_line(&mut buf, &mut line_open);
                let b = encode_char(*ch);
                buf.extend(std::iter::repeat_n(b, *width));
                buf.push(LF);
            }
            Instruction::BlankLine => {
                close_line(&mut buf, &mut line_open);
                buf.push(LF);
            }
            Instruction::Feed(n) => {
                buf.extend_from_slice(&feed_cmd(*n));
                line_open = false;
            }
            Instruction::Cut => {
                close_line(&mut buf, &mut line_open);
                buf.extend_from_slice(&CUT_PARTIAL);
            }
        }
    }

    buf
}

fn close_line(buf: &mut Vec<u8>, line_open: &mut bool) {
    if *line_open {
        buf.push(LF);
        *line_open = false;
    }
}
