//! Amounts and tax extraction
//!
//! Prices are tax-inclusive and the currency has no minor unit. Amounts are
//! carried as `f64` through every calculation and rounded only when
//! formatted.

use std::iter::Sum;
use std::ops::Add;

/// Tax-inclusive amount split into net and tax
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TaxBreakdown {
    pub net: f64,
    pub tax: f64,
    pub gross: f64,
}

impl TaxBreakdown {
    /// `net = gross / (1 + rate)`, `tax = gross - net`
    pub fn from_gross(gross: f64, rate: f64) -> Self {
        let net = gross / (1.0 + rate);
        Self {
            net,
            tax: gross - net,
            gross,
        }
    }
}

impl Add for TaxBreakdown {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            net: self.net + other.net,
            tax: self.tax + other.tax,
            gross: self.gross + other.gross,
        }
    }
}

impl Sum for TaxBreakdown {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Round to the nearest whole unit, halves away from zero
pub fn round_amount(amount: f64) -> i64 {
    amount.round() as i64
}

/// Format as `$1.234.567`
pub fn format_amount(amount: f64) -> String {
    let rounded = round_amount(amount);
    let grouped = group_thousands(rounded.unsigned_abs());
    if rounded < 0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}
