//! What gets printed: customization parsing, money formatting and the
//! document composers

pub mod composer;
pub mod customization;
pub mod money;

pub use composer::{ComposeOptions, DocumentComposer};
pub use customization::{Customization, ParsedCustomization, parse_customization};
pub use money::{TaxBreakdown, format_amount, round_amount};
