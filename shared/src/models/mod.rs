//! Data models
//!
//! Mirrors the `print_jobs`, `orders` and `order_items` tables. IDs are
//! opaque strings owned by the store.

pub mod order;
pub mod print_job;

// Re-exports
pub use order::*;
pub use print_job::*;
