//! Document composers
//!
//! Turn an order into a printer-agnostic [`Document`]. One composer per job
//! type; all of them share the primitives in [`layout`].

mod kitchen;
pub mod layout;
mod receipt;

pub use kitchen::compose_kitchen_ticket;
pub use receipt::{compose_payment_receipt, compose_receipt};

use crate::core::AgentConfig;
use chrono_tz::Tz;
use comanda_printer::Document;
use shared::models::{JobType, Order};

/// Settings every composer reads
#[derive(Debug, Clone)]
pub struct ComposeOptions {
    /// Characters per line
    pub width: usize,
    /// Tax rate included in prices
    pub tax_rate: f64,
    pub timezone: Tz,
    pub business_name: Option<String>,
    pub footer: Option<String>,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            width: 32,
            tax_rate: 0.19,
            timezone: chrono_tz::America::Santiago,
            business_name: None,
            footer: None,
        }
    }
}

impl From<&AgentConfig> for ComposeOptions {
    fn from(config: &AgentConfig) -> Self {
        Self {
            width: config.paper_width,
            tax_rate: config.tax_rate,
            timezone: config.timezone,
            business_name: config.business_name.clone(),
            footer: config.receipt_footer.clone(),
        }
    }
}

/// Picks the composer for a job type
#[derive(Debug, Clone, Default)]
pub struct DocumentComposer {
    options: ComposeOptions,
}

impl DocumentComposer {
    pub fn new(options: ComposeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ComposeOptions {
        &self.options
    }

    pub fn compose(&self, job_type: JobType, order: &Order) -> Document {
        match job_type {
            JobType::Kitchen => compose_kitchen_ticket(order, &self.options),
            JobType::Receipt => compose_receipt(order, &self.options),
            JobType::Payment => compose_payment_receipt(order, &self.options),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, Utc};
    use serde_json::{Value, json};
    use shared::models::{Order, OrderItem, OrderKind, PaymentMethod};

    pub fn item(name: &str, category: Option<&str>, quantity: u32, unit_price: f64) -> OrderItem {
        OrderItem {
            id: format!("item-{}", name),
            name: name.to_string(),
            category: category.map(str::to_string),
            quantity,
            unit_price,
            subtotal: unit_price * quantity as f64,
            customization: None,
            position: None,
        }
    }

    pub fn with_customization(mut item: OrderItem, payload: Value) -> OrderItem {
        item.customization = Some(payload);
        item
    }

    pub fn order(items: Vec<OrderItem>) -> Order {
        let total = items.iter().map(|i| i.subtotal).sum();
        Order {
            id: "ord-1".to_string(),
            number: 57,
            kind: OrderKind::DineIn,
            table: Some("4".to_string()),
            customer_name: None,
            total,
            payment_method: Some(PaymentMethod::Debit),
            paid_at: Some("2026-03-01T19:05:00Z".parse::<DateTime<Utc>>().unwrap()),
            note: None,
            created_at: "2026-03-01T18:55:00Z".parse::<DateTime<Utc>>().unwrap(),
            items,
        }
    }

    pub fn busy_order() -> Order {
        let mut order = order(vec![
            with_customization(
                item("Completo italiano extra grande de la casa", Some("Sandwiches"), 2, 3500.0),
                json!({
                    "extras": ["Palta", "Tomate", "Mayonesa casera", "Americana"],
                    "removed": ["Chucrut"],
                    "drinks": [{"name": "Bebida lata", "flavor": "Coca-Cola sin azúcar"}],
                    "details": "la salchicha bien dorada por favor, gracias"
                }),
            ),
            item("Papas fritas", Some("Acompañamientos"), 1, 2200.0),
            with_customization(
                item("Churrasco", Some("Sandwiches"), 3, 5900.0),
                json!("{esto no es json valido y es bastante largo"),
            ),
            item("Jugo natural", None, 1, 1800.0),
        ]);
        order.note = Some("Cliente alérgico al maní.\nServir todo junto".to_string());
        order.customer_name = Some("María José Fernández de la Fuente".to_string());
        order
    }
}
