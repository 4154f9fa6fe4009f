//! Order Model
//!
//! Read-only to the print agent. Rows come from `orders` joined with
//! `order_items`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// How the order is served
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    #[default]
    #[serde(alias = "dine-in", alias = "local", alias = "mesa")]
    DineIn,
    #[serde(alias = "para_llevar", alias = "retiro")]
    Takeaway,
    #[serde(alias = "despacho")]
    Delivery,
}

impl OrderKind {
    /// Label printed in ticket headers
    pub fn label(self) -> &'static str {
        match self {
            OrderKind::DineIn => "LOCAL",
            OrderKind::Takeaway => "PARA LLEVAR",
            OrderKind::Delivery => "DELIVERY",
        }
    }
}

/// Payment method recorded when the order is paid
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[serde(alias = "efectivo")]
    Cash,
    #[serde(alias = "debito")]
    Debit,
    #[serde(alias = "credito")]
    Credit,
    #[serde(alias = "transferencia")]
    Transfer,
    #[serde(other)]
    Other,
}

impl PaymentMethod {
    pub fn label(self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Efectivo",
            PaymentMethod::Debit => "Débito",
            PaymentMethod::Credit => "Crédito",
            PaymentMethod::Transfer => "Transferencia",
            PaymentMethod::Other => "Otro",
        }
    }
}

/// Order line item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub id: String,
    #[serde(alias = "product_name")]
    pub name: String,
    /// Menu category, used to group kitchen tickets
    #[serde(default)]
    pub category: Option<String>,
    pub quantity: u32,
    /// Tax-inclusive price in currency unit
    pub unit_price: f64,
    /// Tax-inclusive line total in currency unit
    pub subtotal: f64,
    /// Raw customization payload, parsed leniently at print time
    #[serde(default, alias = "customizations")]
    pub customization: Option<serde_json::Value>,
    /// Position within the order
    #[serde(default)]
    pub position: Option<i32>,
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: String,
    #[serde(alias = "order_number")]
    pub number: i64,
    #[serde(default, alias = "order_type", deserialize_with = "null_as_default")]
    pub kind: OrderKind,
    /// Table label; numeric columns are accepted and printed as-is
    #[serde(default, alias = "table_number", deserialize_with = "text_or_number")]
    pub table: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    /// Tax-inclusive total in currency unit
    pub total: f64,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    /// Free-text note for the whole order
    #[serde(default, alias = "notes")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, alias = "order_items")]
    pub items: Vec<OrderItem>,
}

/// `null` decodes like a missing key
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextOrNumber {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(match Option::<TextOrNumber>::deserialize(deserializer)? {
        Some(TextOrNumber::Text(s)) => Some(s),
        Some(TextOrNumber::Integer(n)) => Some(n.to_string()),
        Some(TextOrNumber::Float(n)) => Some(n.to_string()),
        None => None,
    })
}

impl Order {
    /// Items in print order (explicit position first, then as stored)
    pub fn sorted_items(&self) -> Vec<&OrderItem> {
        let mut items: Vec<&OrderItem> = self.items.iter().collect();
        items.sort_by_key(|item| item.position.unwrap_or(i32::MAX));
        items
    }

    /// Sum of all item quantities
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Non-blank order note
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}
