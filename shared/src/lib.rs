//! Shared types for the comanda print pipeline
//!
//! Row types exchanged with the order store: print jobs and the orders
//! they print.

pub mod models;

// Re-exports
pub use serde::{Deserialize, Serialize};
