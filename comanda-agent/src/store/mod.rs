//! Job store access
//!
//! The store is the only channel through which job state becomes visible.
//! Every method is a single write or read; the claim is a compare-and-set
//! on `status`, and outcome writes only apply while the job is still in
//! `printing`.

mod memory;
mod rest;

pub use memory::MemoryJobStore;
pub use rest::RestJobStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::models::{Order, PrintJob};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Store request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid store response: {0}")]
    Decode(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Outcome write found the job no longer in `printing`
    #[error("Job {0} is no longer claimed")]
    NotClaimed(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Up to `limit` pending jobs, oldest first
    async fn pending_jobs(&self, limit: usize) -> StoreResult<Vec<PrintJob>>;

    /// Atomically move a listed job from `pending` to `printing`, counting
    /// the attempt in the same write
    ///
    /// The write only applies while the row still has the listed status and
    /// `attempts`; otherwise it returns `None` and the job is left alone.
    /// On success returns the claimed row.
    async fn claim(&self, job: &PrintJob) -> StoreResult<Option<PrintJob>>;

    /// Order header with its items, `None` if the order does not exist
    async fn fetch_order(&self, order_id: &str) -> StoreResult<Option<Order>>;

    async fn mark_printed(
        &self,
        job_id: &str,
        attempts: u32,
        printed_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Hand a claimed job back to `pending` for a later cycle
    async fn release(&self, job_id: &str, attempts: u32) -> StoreResult<()>;

    async fn mark_failed(&self, job_id: &str, attempts: u32, message: &str) -> StoreResult<()>;

    /// Reset `printing` jobs claimed before the cutoff; returns how many
    async fn reset_stale_claims(&self, claimed_before: DateTime<Utc>) -> StoreResult<usize>;
}
