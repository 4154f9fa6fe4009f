//! Printer-agnostic instruction stream
//!
//! A [`Document`] is an ordered list of [`Instruction`]s. Composers build one
//! with [`DocumentBuilder`]; the encoder in [`crate::escpos`] turns it into
//! bytes. Nothing here knows about a particular printer command set.

use crate::encoding::{normalize_newlines, pad_text, text_width, FieldAlign};

/// Line alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// Character size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontSize {
    #[default]
    Normal,
    /// Double width and height
    Double,
}

impl FontSize {
    /// Printer columns taken by one character at this size
    pub fn columns_per_char(self) -> usize {
        match self {
            FontSize::Normal => 1,
            FontSize::Double => 2,
        }
    }
}

/// One formatting or content instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Set alignment for subsequent lines
    Align(Align),
    /// Bold on/off
    Bold(bool),
    /// Character size for subsequent text
    Size(FontSize),
    /// Literal text, no line break appended
    Text(String),
    /// End the current line
    LineFeed,
    /// A full line of `ch` repeated `width` times
    Separator { ch: char, width: usize },
    /// Text truncated then padded to exactly `width` columns
    Field {
        text: String,
        width: usize,
        align: FieldAlign,
    },
    /// An empty line
    BlankLine,
    /// Feed `n` lines without printing
    Feed(u8),
    /// Partial cut
    Cut,
}

/// A printable line as the device would lay it out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    pub text: String,
    pub size: FontSize,
}

impl RenderedLine {
    /// Physical columns occupied on paper
    pub fn columns(&self) -> usize {
        text_width(&self.text) * self.size.columns_per_char()
    }
}

/// Ordered instruction stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    instructions: Vec<Instruction>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Lay the stream out into lines
    ///
    /// A line takes the largest font size used on it. Feeds and cuts
    /// produce no lines.
    pub fn rendered_lines(&self) -> Vec<RenderedLine> {
        let mut layout = LineLayout::default();

        for ins in &self.instructions {
            match ins {
                Instruction::Size(s) => layout.set_size(*s),
                Instruction::Text(t) => layout.push_text(t),
                Instruction::Field { text, width, align } => {
                    layout.push_text(&pad_text(text, *width, *align))
                }
                Instruction::LineFeed => layout.flush(),
                Instruction::Separator { ch, width } => {
                    layout.close();
                    layout.push_whole(ch.to_string().repeat(*width));
                }
                Instruction::BlankLine => {
                    layout.close();
                    layout.push_whole(String::new());
                }
                Instruction::Align(_)
                | Instruction::Bold(_)
                | Instruction::Feed(_)
                | Instruction::Cut => {}
            }
        }

        layout.close();
        layout.lines
    }
}

#[derive(Default)]
struct LineLayout {
    lines: Vec<RenderedLine>,
    current: String,
    size: FontSize,
    line_size: FontSize,
    open: bool,
}

impl LineLayout {
    fn set_size(&mut self, size: FontSize) {
        self.size = size;
        if !self.open {
            self.line_size = size;
        }
    }

    fn push_text(&mut self, text: &str) {
        let normalized = normalize_newlines(text);
        let mut parts = normalized.split('\n').peekable();
        while let Some(part) = parts.next() {
            if !part.is_empty() {
                if self.size == FontSize::Double {
                    self.line_size = FontSize::Double;
                }
                self.current.push_str(part);
                self.open = true;
            }
            if parts.peek().is_some() {
                self.flush();
            }
        }
    }

    fn push_whole(&mut self, text: String) {
        self.lines.push(RenderedLine {
            text,
            size: self.size,
        });
    }

    /// End the current line, even if empty
    fn flush(&mut self) {
        self.lines.push(RenderedLine {
            text: std::mem::take(&mut self.current),
            size: self.line_size,
        });
        self.line_size = self.size;
        self.open = false;
    }

    /// End the current line only if something was written to it
    fn close(&mut self) {
        if self.open {
            self.flush();
        }
    }
}

impl From<Vec<Instruction>> for Document {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }
}

impl IntoIterator for Document {
    type Item = Instruction;
    type IntoIter = std::vec::IntoIter<Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.into_iter()
    }
}

/// Builder for [`Document`]
///
/// Every method appends one or more instructions; nothing is written to a
/// device until the document is encoded.
///
/// Common widths:
/// - 58mm paper: 32 characters
/// - 80mm paper: 48 characters
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    instructions: Vec<Instruction>,
    width: usize,
}

impl DocumentBuilder {
    pub fn new(width: usize) -> Self {
        Self {
            instructions: Vec::with_capacity(128),
            width,
        }
    }

    /// Configured paper width in columns
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn push(&mut self, instruction: Instruction) -> &mut Self {
        self.instructions.push(instruction);
        self
    }

    // === Text Output ===

    pub fn text(&mut self, s: &str) -> &mut Self {
        self.push(Instruction::Text(s.to_string()))
    }

    /// Text followed by a line feed
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.text(s);
        self.push(Instruction::LineFeed)
    }

    pub fn newline(&mut self) -> &mut Self {
        self.push(Instruction::LineFeed)
    }

    pub fn blank(&mut self) -> &mut Self {
        self.push(Instruction::BlankLine)
    }

    pub fn field(&mut self, s: &str, width: usize, align: FieldAlign) -> &mut Self {
        self.push(Instruction::Field {
            text: s.to_string(),
            width,
            align,
        })
    }

    pub fn feed(&mut self, lines: u8) -> &mut Self {
        self.push(Instruction::Feed(lines))
    }

    // === Alignment ===

    pub fn center(&mut self) -> &mut Self {
        self.push(Instruction::Align(Align::Center))
    }

    pub fn left(&mut self) -> &mut Self {
        self.push(Instruction::Align(Align::Left))
    }

    pub fn right(&mut self) -> &mut Self {
        self.push(Instruction::Align(Align::Right))
    }

    // === Text Style ===

    pub fn bold(&mut self) -> &mut Self {
        self.push(Instruction::Bold(true))
    }

    pub fn bold_off(&mut self) -> &mut Self {
        self.push(Instruction::Bold(false))
    }

    pub fn double_size(&mut self) -> &mut Self {
        self.push(Instruction::Size(FontSize::Double))
    }

    pub fn reset_size(&mut self) -> &mut Self {
        self.push(Instruction::Size(FontSize::Normal))
    }

    // === Separators ===

    /// Print a line of '=' characters
    pub fn sep_double(&mut self) -> &mut Self {
        let width = self.width;
        self.push(Instruction::Separator { ch: '=', width })
    }

    /// Print a line of '-' characters
    pub fn sep_single(&mut self) -> &mut Self {
        let width = self.width;
        self.push(Instruction::Separator { ch: '-', width })
    }

    // === Layout Helpers ===

    /// Left and right text on one line
    ///
    /// The right text keeps its full width when it fits; the left text is
    /// truncated to whatever remains.
    pub fn line_lr(&mut self, left: &str, right: &str) -> &mut Self {
        let rw = text_width(right).min(self.width);
        let lw = self.width - rw;
        self.field(left, lw, FieldAlign::Left);
        self.field(right, rw, FieldAlign::Right);
        self.newline()
    }

    // === Paper Control ===

    pub fn cut(&mut self) -> &mut Self {
        self.push(Instruction::Cut)
    }

    /// Feed `lines` then cut, the standard end of every ticket
    pub fn feed_and_cut(&mut self, lines: u8) -> &mut Self {
        self.feed(lines);
        self.cut()
    }

    // === Build ===

    pub fn build(self) -> Document {
        Document {
            instructions: self.instructions,
        }
    }
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new(32)
    }
}
