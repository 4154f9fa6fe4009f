//! PostgREST-style job store client

use super::{JobStore, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use shared::models::{JobStatus, Order, PrintJob};
use std::time::Duration;
use tracing::{debug, instrument};

const JOBS_TABLE: &str = "print_jobs";
const ORDERS_TABLE: &str = "orders";

/// Job store reached over HTTP
#[derive(Debug, Clone)]
pub struct RestJobStore {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl RestJobStore {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> StoreResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> StoreResult<T> {
        let response = request.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let text = response.text().await.map_err(|e| self.map_error(e))?;
        serde_json::from_str(&text).map_err(|e| StoreError::Decode(e.to_string()))
    }

    fn map_error(&self, e: reqwest::Error) -> StoreError {
        if e.is_timeout() {
            StoreError::Timeout(self.timeout)
        } else {
            StoreError::Http(e)
        }
    }

    /// PATCH rows matching `filters`, returning the rows that changed
    async fn patch_jobs(&self, filters: &[(&str, String)], body: Value) -> StoreResult<Vec<PrintJob>> {
        let request = self
            .request(Method::PATCH, JOBS_TABLE)
            .query(filters)
            .header("Prefer", "return=representation")
            .json(&body);
        self.send(request).await
    }

    /// Outcome write guarded by `status = printing`
    async fn patch_claimed(&self, job_id: &str, body: Value) -> StoreResult<()> {
        let rows = self
            .patch_jobs(
                &[
                    ("id", format!("eq.{}", job_id)),
                    ("status", format!("eq.{}", JobStatus::Printing)),
                ],
                body,
            )
            .await?;
        if rows.is_empty() {
            return Err(StoreError::NotClaimed(job_id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl JobStore for RestJobStore {
    #[instrument(skip(self))]
    async fn pending_jobs(&self, limit: usize) -> StoreResult<Vec<PrintJob>> {
        let request = self.request(Method::GET, JOBS_TABLE).query(&[
            ("select", "*".to_string()),
            ("status", format!("eq.{}", JobStatus::Pending)),
            ("order", "created_at.asc".to_string()),
            ("limit", limit.to_string()),
        ]);
        let jobs: Vec<PrintJob> = self.send(request).await?;
        debug!(count = jobs.len(), "Fetched pending jobs");
        Ok(jobs)
    }

    #[instrument(skip(self, listed), fields(job_id = %listed.id, attempts = listed.attempts))]
    async fn claim(&self, listed: &PrintJob) -> StoreResult<Option<PrintJob>> {
        let mut rows = self
            .patch_jobs(
                &[
                    ("id", format!("eq.{}", listed.id)),
                    ("status", format!("eq.{}", JobStatus::Pending)),
                    ("attempts", format!("eq.{}", listed.attempts)),
                ],
                json!({
                    "status": JobStatus::Printing,
                    "attempts": listed.attempts + 1,
                    "claimed_at": Utc::now(),
                }),
            )
            .await?;
        if rows.len() != 1 {
            return Ok(None);
        }
        Ok(rows.pop())
    }

    #[instrument(skip(self))]
    async fn fetch_order(&self, order_id: &str) -> StoreResult<Option<Order>> {
        let request = self.request(Method::GET, ORDERS_TABLE).query(&[
            ("id", format!("eq.{}", order_id)),
            ("select", "*,order_items(*)".to_string()),
        ]);
        let mut orders: Vec<Order> = self.send(request).await?;
        Ok(orders.pop())
    }

    #[instrument(skip(self))]
    async fn mark_printed(
        &self,
        job_id: &str,
        attempts: u32,
        printed_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.patch_claimed(
            job_id,
            json!({
                "status": JobStatus::Printed,
                "attempts": attempts,
                "printed_at": printed_at,
                "error_message": null,
                "claimed_at": null,
            }),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn release(&self, job_id: &str, attempts: u32) -> StoreResult<()> {
        self.patch_claimed(
            job_id,
            json!({
                "status": JobStatus::Pending,
                "attempts": attempts,
                "claimed_at": null,
            }),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn mark_failed(&self, job_id: &str, attempts: u32, message: &str) -> StoreResult<()> {
        self.patch_claimed(
            job_id,
            json!({
                "status": JobStatus::Error,
                "attempts": attempts,
                "error_message": message,
                "claimed_at": null,
            }),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn reset_stale_claims(&self, claimed_before: DateTime<Utc>) -> StoreResult<usize> {
        let cutoff = claimed_before.to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let rows = self
            .patch_jobs(
                &[
                    ("status", format!("eq.{}", JobStatus::Printing)),
                    ("or", format!("(claimed_at.lt.{},claimed_at.is.null)", cutoff)),
                ],
                json!({
                    "status": JobStatus::Pending,
                    "claimed_at": null,
                }),
            )
            .await?;
        Ok(rows.len())
    }
}
