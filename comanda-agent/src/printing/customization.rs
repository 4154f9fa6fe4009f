//! Item customization payloads
//!
//! Payloads are free-form JSON written by the ordering front end. They are
//! parsed leniently; anything that does not fit the structured shape is
//! kept as literal text so the ticket still shows it.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One selected option, either a bare name or an object with a quantity
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Choice {
    Name(String),
    Detailed {
        #[serde(alias = "nombre")]
        name: String,
        #[serde(default, alias = "cantidad")]
        quantity: Option<u32>,
    },
}

impl Choice {
    pub fn label(&self) -> String {
        match self {
            Choice::Name(name) => name.trim().to_string(),
            Choice::Detailed {
                name,
                quantity: Some(q),
            } if *q > 1 => format!("{}x {}", q, name.trim()),
            Choice::Detailed { name, .. } => name.trim().to_string(),
        }
    }
}

/// Selected drink with optional flavor
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DrinkChoice {
    Name(String),
    Detailed {
        #[serde(alias = "nombre")]
        name: String,
        #[serde(default, alias = "sabor")]
        flavor: Option<String>,
    },
}

impl DrinkChoice {
    pub fn label(&self) -> String {
        match self {
            DrinkChoice::Name(name) => name.trim().to_string(),
            DrinkChoice::Detailed {
                name,
                flavor: Some(flavor),
            } if !flavor.trim().is_empty() => format!("{} ({})", name.trim(), flavor.trim()),
            DrinkChoice::Detailed { name, .. } => name.trim().to_string(),
        }
    }
}

/// Structured customization of one order item
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Customization {
    #[serde(
        alias = "agregados",
        alias = "adicionales",
        deserialize_with = "one_or_many"
    )]
    pub extras: Vec<Choice>,
    #[serde(alias = "salsas", deserialize_with = "one_or_many")]
    pub sauces: Vec<Choice>,
    #[serde(
        alias = "sin",
        alias = "quitar",
        alias = "ingredientes_removidos",
        deserialize_with = "one_or_many"
    )]
    pub removed: Vec<Choice>,
    #[serde(alias = "bebidas", alias = "bebida", deserialize_with = "one_or_many")]
    pub drinks: Vec<DrinkChoice>,
    #[serde(alias = "detalle", alias = "detalles", alias = "note", alias = "nota")]
    pub details: Option<String>,
}

impl Customization {
    pub fn is_empty(&self) -> bool {
        self.extras.is_empty()
            && self.sauces.is_empty()
            && self.removed.is_empty()
            && self.drinks.is_empty()
            && self.details().is_none()
    }

    pub fn details(&self) -> Option<&str> {
        self.details
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }

    /// One line per non-empty facet, untruncated
    pub fn facet_lines(&self) -> Vec<String> {
        fn join<T>(items: &[T], label: impl Fn(&T) -> String) -> String {
            items.iter().map(label).collect::<Vec<_>>().join(", ")
        }

        let mut lines = Vec::new();
        if !self.extras.is_empty() {
            lines.push(format!("+ {}", join(&self.extras, Choice::label)));
        }
        if !self.sauces.is_empty() {
            lines.push(format!("Salsas: {}", join(&self.sauces, Choice::label)));
        }
        if !self.removed.is_empty() {
            lines.push(format!("Sin: {}", join(&self.removed, Choice::label)));
        }
        if !self.drinks.is_empty() {
            lines.push(format!("Bebida: {}", join(&self.drinks, DrinkChoice::label)));
        }
        if let Some(details) = self.details() {
            lines.push(format!("Nota: {}", details));
        }
        lines
    }
}

/// Result of reading a payload
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedCustomization {
    Structured(Customization),
    /// Payload that is not a customization record, as text
    Literal(String),
}

impl ParsedCustomization {
    pub fn lines(&self) -> Vec<String> {
        match self {
            ParsedCustomization::Structured(c) => c.facet_lines(),
            ParsedCustomization::Literal(text) => vec![format!("* {}", text)],
        }
    }
}

/// Parse a raw payload, falling back to its text
///
/// Returns `None` only when there is nothing to print.
pub fn parse_customization(raw: &Value) -> Option<ParsedCustomization> {
    match raw {
        Value::Null => None,
        Value::Object(map) if map.is_empty() => None,
        Value::Object(_) => Some(from_object(raw)),
        Value::String(s) => {
            let text = s.trim();
            if text.is_empty() {
                return None;
            }
            match serde_json::from_str::<Value>(text) {
                Ok(inner @ Value::Object(_)) => parse_customization(&inner),
                Ok(Value::Null) => None,
                _ => Some(ParsedCustomization::Literal(single_line(text))),
            }
        }
        other => Some(ParsedCustomization::Literal(other.to_string())),
    }
}

fn from_object(raw: &Value) -> ParsedCustomization {
    match Customization::deserialize(raw) {
        Ok(c) if !c.is_empty() => ParsedCustomization::Structured(c),
        Ok(_) | Err(_) => {
            tracing::debug!(payload = %raw, "Customization not structured, printing as text");
            ParsedCustomization::Literal(raw.to_string())
        }
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
        Nothing(()),
    }

    Ok(match OneOrMany::<T>::deserialize(deserializer)? {
        OneOrMany::Many(items) => items,
        OneOrMany::One(item) => vec![item],
        OneOrMany::Nothing(()) => Vec::new(),
    })
}
