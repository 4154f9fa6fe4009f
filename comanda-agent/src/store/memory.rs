//! In-process job store
//!
//! Same compare-and-set semantics as the remote store. Used by tests and
//! for dry runs without a backend.

use super::{JobStore, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use shared::models::{JobStatus, Order, PrintJob};
use std::collections::HashMap;

#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<Vec<PrintJob>>,
    orders: Mutex<HashMap<String, Order>>,
    order_fetch_error: Mutex<Option<String>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_job(&self, job: PrintJob) {
        let mut jobs = self.jobs.lock();
        jobs.retain(|j| j.id != job.id);
        jobs.push(job);
    }

    pub fn insert_order(&self, order: Order) {
        self.orders.lock().insert(order.id.clone(), order);
    }

    /// Make every `fetch_order` fail until cleared with `None`
    pub fn set_order_fetch_error(&self, error: Option<&str>) {
        *self.order_fetch_error.lock() = error.map(str::to_string);
    }

    pub fn job(&self, job_id: &str) -> Option<PrintJob> {
        self.jobs.lock().iter().find(|j| j.id == job_id).cloned()
    }

    pub fn jobs(&self) -> Vec<PrintJob> {
        self.jobs.lock().clone()
    }

    /// Apply `update` to a job currently in `printing`
    fn update_claimed<F>(&self, job_id: &str, update: F) -> StoreResult<()>
    where
        F: FnOnce(&mut PrintJob),
    {
        let mut jobs = self.jobs.lock();
        match jobs
            .iter_mut()
            .find(|j| j.id == job_id && j.status == JobStatus::Printing)
        {
            Some(job) => {
                update(job);
                Ok(())
            }
            None => Err(StoreError::NotClaimed(job_id.to_string())),
        }
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn pending_jobs(&self, limit: usize) -> StoreResult<Vec<PrintJob>> {
        let mut pending: Vec<PrintJob> = self
            .jobs
            .lock()
            .iter()
            .filter(|j| j.status == JobStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|j| j.created_at);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn claim(&self, listed: &PrintJob) -> StoreResult<Option<PrintJob>> {
        let mut jobs = self.jobs.lock();
        let row = jobs.iter_mut().find(|j| {
            j.id == listed.id && j.status == JobStatus::Pending && j.attempts == listed.attempts
        });
        Ok(row.map(|job| {
            job.status = JobStatus::Printing;
            job.attempts += 1;
            job.claimed_at = Some(Utc::now());
            job.clone()
        }))
    }

    async fn fetch_order(&self, order_id: &str) -> StoreResult<Option<Order>> {
        if let Some(error) = self.order_fetch_error.lock().clone() {
            return Err(StoreError::Unavailable(error));
        }
        Ok(self.orders.lock().get(order_id).cloned())
    }

    async fn mark_printed(
        &self,
        job_id: &str,
        attempts: u32,
        printed_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.update_claimed(job_id, |job| {
            job.status = JobStatus::Printed;
            job.attempts = attempts;
            job.printed_at = Some(printed_at);
            job.error_message = None;
            job.claimed_at = None;
        })
    }

    async fn release(&self, job_id: &str, attempts: u32) -> StoreResult<()> {
        self.update_claimed(job_id, |job| {
            job.status = JobStatus::Pending;
            job.attempts = attempts;
            job.claimed_at = None;
        })
    }

    async fn mark_failed(&self, job_id: &str, attempts: u32, message: &str) -> StoreResult<()> {
        self.update_claimed(job_id, |job| {
            job.status = JobStatus::Error;
            job.attempts = attempts;
            job.error_message = Some(message.to_string());
            job.claimed_at = None;
        })
    }

    async fn reset_stale_claims(&self, claimed_before: DateTime<Utc>) -> StoreResult<usize> {
        let mut reset = 0;
        for job in self.jobs.lock().iter_mut() {
            let stale = job.status == JobStatus::Printing
                && job.claimed_at.is_none_or(|at| at < claimed_before);
            if stale {
                job.status = JobStatus::Pending;
                job.claimed_at = None;
                reset += 1;
            }
        }
        Ok(reset)
    }
}
