//! Kitchen ticket: what to prepare, no prices

use super::ComposeOptions;
use super::layout::{TicketWriter, header};
use crate::printing::customization::parse_customization;
use comanda_printer::Document;
use shared::models::{Order, OrderItem};

const UNCATEGORIZED: &str = "OTROS";

pub fn compose_kitchen_ticket(order: &Order, options: &ComposeOptions) -> Document {
    let mut w = TicketWriter::new(options.width);
    header(&mut w, None, "COCINA", order, options.timezone);

    for (category, items) in group_by_category(order) {
        w.bold_line(&format!("[{}]", category.to_uppercase()));
        for item in items {
            render_item(&mut w, item);
        }
        w.builder().sep_single();
    }

    w.bold_line(&format!("Total items: {}", order.item_count()));

    if let Some(note) = order.note() {
        w.builder().blank();
        w.note_block("NOTA:", note);
    }

    w.finish()
}

/// Items grouped by category, groups in order of first appearance
fn group_by_category(order: &Order) -> Vec<(&str, Vec<&OrderItem>)> {
    let mut groups: Vec<(&str, Vec<&OrderItem>)> = Vec::new();
    for item in order.sorted_items() {
        let category = item
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(UNCATEGORIZED);
        match groups
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(category))
        {
            Some((_, items)) => items.push(item),
            None => groups.push((category, vec![item])),
        }
    }
    groups
}

fn render_item(w: &mut TicketWriter, item: &OrderItem) {
    w.bold_line(&format!("{} x {}", item.quantity, item.name.trim().to_uppercase()));

    let Some(parsed) = item.customization.as_ref().and_then(parse_customization) else {
        return;
    };
    for line in parsed.lines() {
        w.indented(&line);
    }
}
