//! Poll cycle and per-job processing
//!
//! One cycle lists pending jobs, splits them into one queue per printer
//! target, and drains the queues concurrently. Inside a queue jobs run one
//! at a time so output on a device never interleaves.

use super::DispatchError;
use crate::core::AgentConfig;
use crate::printing::{ComposeOptions, DocumentComposer};
use crate::store::{JobStore, StoreError, StoreResult};
use chrono::Utc;
use comanda_printer::{Delivery, Transport, TransportError};
use shared::models::{PrintJob, PrinterTarget};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

/// What happened to one listed job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Claim lost or failed, someone else owns the job
    Skipped,
    Printed { attempts: u32, strategy: String },
    /// Back to `pending` for a later cycle
    Retrying { attempts: u32, error: String },
    Failed { attempts: u32, error: String },
}

/// Tally of one poll cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub listed: usize,
    pub skipped: usize,
    pub printed: usize,
    pub retrying: usize,
    pub failed: usize,
}

impl CycleReport {
    fn record(&mut self, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Skipped => self.skipped += 1,
            JobOutcome::Printed { .. } => self.printed += 1,
            JobOutcome::Retrying { .. } => self.retrying += 1,
            JobOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

pub struct Dispatcher {
    config: Arc<AgentConfig>,
    store: Arc<dyn JobStore>,
    transport: Arc<dyn Transport>,
    composer: DocumentComposer,
}

impl Dispatcher {
    pub fn new(
        config: Arc<AgentConfig>,
        store: Arc<dyn JobStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let composer = DocumentComposer::new(ComposeOptions::from(config.as_ref()));
        Self {
            config,
            store,
            transport,
            composer,
        }
    }

    /// Poll on the configured interval until cancelled
    ///
    /// A cycle that has started always runs to completion.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        info!(
            interval_ms = self.config.poll_interval.as_millis() as u64,
            batch = self.config.poll_batch_size,
            "Dispatcher started"
        );
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Dispatcher received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    match self.poll_once().await {
                        Ok(report) if report.listed > 0 => info!(?report, "Poll cycle finished"),
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "Poll cycle failed"),
                    }
                }
            }
        }
    }

    /// One poll cycle
    pub async fn poll_once(&self) -> StoreResult<CycleReport> {
        let jobs = self
            .bounded(self.store.pending_jobs(self.config.poll_batch_size))
            .await?;

        let mut report = CycleReport {
            listed: jobs.len(),
            ..Default::default()
        };
        if jobs.is_empty() {
            return Ok(report);
        }

        let queues = group_by_target(jobs);
        let drained = futures::future::join_all(
            queues
                .into_iter()
                .map(|(target, jobs)| self.drain_queue(target, jobs)),
        )
        .await;

        for outcome in drained.iter().flatten() {
            report.record(outcome);
        }
        Ok(report)
    }

    async fn drain_queue(&self, target: PrinterTarget, jobs: Vec<PrintJob>) -> Vec<JobOutcome> {
        let mut outcomes = Vec::with_capacity(jobs.len());
        for job in jobs {
            let span = info_span!(
                "job",
                job_id = %job.id,
                order_id = %job.order_id,
                target = %target,
                job_type = %job.job_type,
            );
            outcomes.push(self.process(job).instrument(span).await);
        }
        outcomes
    }

    /// Claim one listed job and carry it to its next state
    ///
    /// The attempt count always comes from the claimed row, never from the
    /// listed snapshot.
    pub async fn process(&self, listed: PrintJob) -> JobOutcome {
        let job = match self.bounded(self.store.claim(&listed)).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                debug!("Job claimed or changed elsewhere, skipping");
                return JobOutcome::Skipped;
            }
            Err(e) => {
                warn!(error = %e, "Claim failed, skipping");
                return JobOutcome::Skipped;
            }
        };

        let attempts = job.attempts;
        let max = self.config.max_print_attempts;
        if attempts > max {
            // Every earlier attempt ended without an outcome (crash mid-print)
            let message = format!("Gave up after {} attempts without a recorded outcome", max);
            error!(attempt = attempts, max, "Job exhausted its attempts, not printing");
            self.report("mark_failed", self.store.mark_failed(&job.id, max, &message))
                .await;
            return JobOutcome::Failed {
                attempts: max,
                error: message,
            };
        }

        match self.deliver(&job).await {
            Ok(delivery) => {
                if !delivery.earlier_failures.is_empty() {
                    debug!(failures = ?delivery.earlier_failures, "Delivered after fallback");
                }
                info!(
                    attempt = attempts,
                    strategy = %delivery.strategy,
                    bytes = delivery.bytes,
                    "Job printed"
                );
                self.report("mark_printed", self.store.mark_printed(&job.id, attempts, Utc::now()))
                    .await;
                JobOutcome::Printed {
                    attempts,
                    strategy: delivery.strategy,
                }
            }
            Err(e) if e.is_retryable() && attempts < max => {
                warn!(
                    attempt = attempts,
                    max,
                    kind = %e.kind(),
                    error = %e,
                    "Print attempt failed, will retry"
                );
                self.report("release", self.store.release(&job.id, attempts))
                    .await;
                JobOutcome::Retrying {
                    attempts,
                    error: e.to_string(),
                }
            }
            Err(e) => {
                let message = e.to_string();
                error!(attempt = attempts, kind = %e.kind(), error = %message, "Job failed");
                self.report("mark_failed", self.store.mark_failed(&job.id, attempts, &message))
                    .await;
                JobOutcome::Failed {
                    attempts,
                    error: message,
                }
            }
        }
    }

    /// Fetch, compose, encode and send
    async fn deliver(&self, job: &PrintJob) -> Result<Delivery, DispatchError> {
        let order = self
            .bounded(self.store.fetch_order(&job.order_id))
            .await?
            .ok_or_else(|| DispatchError::OrderNotFound(job.order_id.clone()))?;
        if order.items.is_empty() {
            return Err(DispatchError::EmptyOrder(order.id));
        }

        let document = self.composer.compose(job.job_type, &order);
        let data = comanda_printer::encode(&document);

        let printer = self.config.printer_for(job.printer_target);
        if !self.transport.exists(printer).await? {
            return Err(TransportError::PrinterNotFound(printer.to_string()).into());
        }
        debug!(printer, bytes = data.len(), "Sending to printer");
        Ok(self.transport.send(printer, &data).await?)
    }

    /// Apply the store call timeout
    async fn bounded<T>(&self, call: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        tokio::time::timeout(self.config.store_timeout, call)
            .await
            .map_err(|_| StoreError::Timeout(self.config.store_timeout))?
    }

    /// Log a failed status write; the reconciler recovers the job
    async fn report(&self, write: &'static str, call: impl Future<Output = StoreResult<()>>) {
        match self.bounded(call).await {
            Ok(()) => {}
            Err(StoreError::NotClaimed(job_id)) => {
                warn!(write, job_id = %job_id, "Job was reset while printing, status left as is")
            }
            Err(e) => error!(write, error = %e, "Status write failed"),
        }
    }
}

/// Split jobs into per-target queues, keeping listing order
fn group_by_target(jobs: Vec<PrintJob>) -> BTreeMap<PrinterTarget, Vec<PrintJob>> {
    let mut queues: BTreeMap<PrinterTarget, Vec<PrintJob>> = BTreeMap::new();
    for job in jobs {
        queues.entry(job.printer_target).or_default().push(job);
    }
    queues
}
