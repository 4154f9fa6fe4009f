//! Width-bounded layout primitives shared by every document

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use comanda_printer::{Document, DocumentBuilder, FieldAlign, truncate_text};
use shared::models::Order;

/// Feed before the cut, enough to clear the tear bar
const FEED_BEFORE_CUT: u8 = 4;

/// Indent of item sub-lines
pub const INDENT: &str = "  ";

/// [`DocumentBuilder`] wrapper that never lets a line exceed the width
///
/// Text is truncated with an ellipsis, never wrapped. Double-size text
/// counts two columns per character.
pub struct TicketWriter {
    b: DocumentBuilder,
    width: usize,
}

impl TicketWriter {
    pub fn new(width: usize) -> Self {
        Self {
            b: DocumentBuilder::new(width),
            width,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn builder(&mut self) -> &mut DocumentBuilder {
        &mut self.b
    }

    /// One normal-size line; embedded line breaks become spaces
    pub fn line(&mut self, text: &str) {
        let text = flatten(text);
        self.b.line(&truncate_text(&text, self.width));
    }

    pub fn bold_line(&mut self, text: &str) {
        self.b.bold();
        self.line(text);
        self.b.bold_off();
    }

    /// Indented sub-line, the indent counting against the width
    pub fn indented(&mut self, text: &str) {
        let text = flatten(text);
        let room = self.width.saturating_sub(INDENT.len());
        self.b
            .line(&format!("{}{}", INDENT, truncate_text(&text, room)));
    }

    /// Double-size bold line
    pub fn title(&mut self, text: &str) {
        let text = flatten(text);
        self.b.double_size().bold();
        self.b.line(&truncate_text(&text, self.width / 2));
        self.b.bold_off().reset_size();
    }

    /// Left and right text on one line
    pub fn pair(&mut self, left: &str, right: &str) {
        self.b.line_lr(&flatten(left), &flatten(right));
    }

    /// One row of fixed-width columns
    pub fn row(&mut self, cells: &[(&str, usize, FieldAlign)]) {
        for (text, width, align) in cells {
            self.b.field(&flatten(text), *width, *align);
        }
        self.b.newline();
    }

    /// Labeled bold block, one line per line of `note`
    pub fn note_block(&mut self, label: &str, note: &str) {
        self.b.left().bold();
        self.line(label);
        for line in note.lines().map(str::trim).filter(|l| !l.is_empty()) {
            self.indented(line);
        }
        self.b.bold_off();
    }

    pub fn footer(&mut self, text: Option<&str>) {
        if let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) {
            self.b.blank();
            self.b.center();
            for line in text.lines() {
                self.line(line);
            }
            self.b.left();
        }
    }

    /// Feed, cut and build
    pub fn finish(mut self) -> Document {
        self.b.feed_and_cut(FEED_BEFORE_CUT);
        self.b.build()
    }
}

/// Shared document header
///
/// Title, order number in double size, table or service kind, customer
/// and creation time.
pub fn header(
    w: &mut TicketWriter,
    business_name: Option<&str>,
    title: &str,
    order: &Order,
    timezone: Tz,
) {
    w.builder().center();
    if let Some(name) = business_name.map(str::trim).filter(|n| !n.is_empty()) {
        w.bold_line(name);
    }
    w.line(title);
    w.title(&format!("#{}", order.number));

    let service = match order.table.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(table) => format!("MESA {}", table),
        None => order.kind.label().to_string(),
    };
    w.bold_line(&service);
    if let Some(customer) = order.customer_name.as_deref().filter(|c| !c.trim().is_empty()) {
        w.line(customer.trim());
    }
    w.line(&format_timestamp(order.created_at, timezone));

    w.builder().left();
    w.builder().sep_double();
}

/// `DD/MM/YYYY HH:MM` in the given zone
pub fn format_timestamp(at: DateTime<Utc>, timezone: Tz) -> String {
    at.with_timezone(&timezone)
        .format("%d/%m/%Y %H:%M")
        .to_string()
}

fn flatten(text: &str) -> String {
    if text.contains(['\n', '\r']) {
        text.split(['\n', '\r'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        text.to_string()
    }
}
