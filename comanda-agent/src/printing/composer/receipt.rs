//! Customer receipt and payment receipt

use super::ComposeOptions;
use super::layout::{TicketWriter, format_timestamp, header};
use crate::printing::money::{TaxBreakdown, format_amount};
use comanda_printer::{Document, FieldAlign, text_width};
use shared::models::Order;

const QTY_WIDTH: usize = 5;
const MIN_PRICE_WIDTH: usize = 7;

pub fn compose_receipt(order: &Order, options: &ComposeOptions) -> Document {
    let mut w = receipt_body(order, options, "BOLETA");
    closing(&mut w, order, options);
    w.finish()
}

/// Receipt followed by the payment details
pub fn compose_payment_receipt(order: &Order, options: &ComposeOptions) -> Document {
    let mut w = receipt_body(order, options, "COMPROBANTE DE PAGO");

    if order.payment_method.is_some() || order.paid_at.is_some() {
        w.builder().sep_single();
        if let Some(method) = order.payment_method {
            w.pair("Forma de pago", method.label());
        }
        if let Some(paid_at) = order.paid_at {
            w.pair("Pagado", &format_timestamp(paid_at, options.timezone));
        }
    }

    closing(&mut w, order, options);
    w.finish()
}

/// Header, item table and totals
fn receipt_body(order: &Order, options: &ComposeOptions, title: &str) -> TicketWriter {
    let mut w = TicketWriter::new(options.width);
    header(
        &mut w,
        options.business_name.as_deref(),
        title,
        order,
        options.timezone,
    );

    let items = order.sorted_items();
    let unit_prices: Vec<String> = items
        .iter()
        .map(|item| format_amount(TaxBreakdown::from_gross(item.unit_price, options.tax_rate).net))
        .collect();

    let price_width = unit_prices
        .iter()
        .map(|p| text_width(p) + 1)
        .max()
        .unwrap_or(0)
        .max(MIN_PRICE_WIDTH)
        .min(options.width / 2);
    let name_width = options.width - QTY_WIDTH - price_width;

    w.row(&[
        ("CANT", QTY_WIDTH, FieldAlign::Left),
        ("PRODUCTO", name_width, FieldAlign::Left),
        ("P.UNIT", price_width, FieldAlign::Right),
    ]);
    w.builder().sep_single();

    for (item, price) in items.iter().zip(&unit_prices) {
        w.row(&[
            (item.quantity.to_string().as_str(), QTY_WIDTH, FieldAlign::Left),
            (item.name.trim(), name_width, FieldAlign::Left),
            (price.as_str(), price_width, FieldAlign::Right),
        ]);
    }

    // Sum raw values, round only when printing
    let totals: TaxBreakdown = items
        .iter()
        .map(|item| TaxBreakdown::from_gross(item.subtotal, options.tax_rate))
        .sum();

    w.builder().sep_single();
    w.pair("Neto", &format_amount(totals.net));
    w.pair(&format!("IVA {}%", format_rate(options.tax_rate)), &format_amount(totals.tax));
    w.builder().bold();
    w.pair("TOTAL", &format_amount(totals.gross));
    w.builder().bold_off();

    w
}

/// Order note and footer
fn closing(w: &mut TicketWriter, order: &Order, options: &ComposeOptions) {
    if let Some(note) = order.note() {
        w.builder().blank();
        w.note_block("NOTA:", note);
    }
    w.footer(options.footer.as_deref());
}

fn format_rate(rate: f64) -> String {
    let pct = rate * 100.0;
    if (pct - pct.round()).abs() < 1e-9 {
        format!("{}", pct.round() as i64)
    } else {
        format!("{:.1}", pct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printing::composer::test_support::*;
    use shared::models::PaymentMethod;

    fn texts(doc: &Document) -> Vec<String> {
        doc.rendered_lines().into_iter().map(|l| l.text).collect()
    }

    fn value_of(lines: &[String], label: &str) -> String {
        lines
            .iter()
            .find(|l| l.starts_with(label))
            .map(|l| l[label.len()..].trim().to_string())
            .unwrap_or_else(|| panic!("no line starting with {:?}", label))
    }

    #[test]
    fn test_totals_sum_raw_item_values() {
        let order = order(vec![
            item("Completo", None, 1, 1000.0),
            item("Papas", None, 1, 1200.0),
        ]);

        let lines = texts(&compose_receipt(&order, &ComposeOptions::default()));

        assert_eq!(value_of(&lines, "Neto"), "$1.849");
        assert_eq!(value_of(&lines, "IVA 19%"), "$351");
        assert_eq!(value_of(&lines, "TOTAL"), "$2.200");
    }

    #[test]
    fn test_item_rows() {
        let order = order(vec![item("Completo italiano", None, 2, 1190.0)]);
        let lines = texts(&compose_receipt(&order, &ComposeOptions::default()));

        // 5 qty + 20 name + 7 price
        assert!(lines.contains(&"CANT PRODUCTO             P.UNIT".to_string()));
        assert!(lines.contains(&"2    Completo italiano    $1.000".to_string()));
    }

    #[test]
    fn test_receipt_has_no_payment_block() {
        let order = order(vec![item("Completo", None, 1, 1000.0)]);
        let lines = texts(&compose_receipt(&order, &ComposeOptions::default()));
        assert!(lines.contains(&"BOLETA".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("Forma de pago")));
    }

    #[test]
    fn test_payment_block() {
        let mut order = order(vec![item("Completo", None, 1, 1000.0)]);
        order.payment_method = Some(PaymentMethod::Cash);

        let lines = texts(&compose_payment_receipt(&order, &ComposeOptions::default()));

        assert_eq!(value_of(&lines, "Forma de pago"), "Efectivo");
        // 19:05 UTC is 16:05 in Santiago (UTC-3 in March)
        assert_eq!(value_of(&lines, "Pagado"), "01/03/2026 16:05");
    }

    #[test]
    fn test_payment_block_skipped_when_unpaid() {
        let mut order = order(vec![item("Completo", None, 1, 1000.0)]);
        order.payment_method = None;
        order.paid_at = None;

        let lines = texts(&compose_payment_receipt(&order, &ComposeOptions::default()));
        assert!(!lines.iter().any(|l| l.starts_with("Pagado")));
    }

    #[test]
    fn test_note_and_footer() {
        let mut order = order(vec![item("Completo", None, 1, 1000.0)]);
        order.note = Some("Retira Juan".into());
        let options = ComposeOptions {
            footer: Some("Gracias por su compra".into()),
            business_name: Some("La Picada".into()),
            ..Default::default()
        };

        let lines = texts(&compose_receipt(&order, &options));
        let note = lines.iter().position(|l| l == "NOTA:").unwrap();
        let footer = lines.iter().position(|l| l == "Gracias por su compra").unwrap();

        assert_eq!(lines[0], "La Picada");
        assert_eq!(lines[note + 1], "  Retira Juan");
        assert!(note < footer);
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(0.19), "19");
        assert_eq!(format_rate(0.105), "10.5");
    }
}
