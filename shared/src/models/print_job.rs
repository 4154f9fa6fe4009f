//! Print Job Model
//!
//! A job is created `pending` by the order-management side and then owned by
//! the print agent until it reaches `printed` or `error`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Job lifecycle: `pending → printing → printed | error`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Printing,
    Printed,
    Error,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Printing => "printing",
            JobStatus::Printed => "printed",
            JobStatus::Error => "error",
        }
    }

    /// `printed` and `error` are never left again by the agent
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Printed | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which document a job prints
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Kitchen ticket, no prices
    Kitchen,
    /// Customer receipt with tax breakdown
    Receipt,
    /// Receipt plus payment details
    Payment,
}

impl JobType {
    pub fn as_str(self) -> &'static str {
        match self {
            JobType::Kitchen => "kitchen",
            JobType::Receipt => "receipt",
            JobType::Payment => "payment",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical printer role, mapped to one physical device by configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PrinterTarget {
    Kitchen,
    Cashier,
}

impl PrinterTarget {
    pub const ALL: [PrinterTarget; 2] = [PrinterTarget::Kitchen, PrinterTarget::Cashier];

    pub fn as_str(self) -> &'static str {
        match self {
            PrinterTarget::Kitchen => "kitchen",
            PrinterTarget::Cashier => "cashier",
        }
    }
}

impl fmt::Display for PrinterTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Print job record (one row of `print_jobs`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrintJob {
    pub id: String,
    pub order_id: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub printer_target: PrinterTarget,
    pub status: JobStatus,
    /// Dispatch attempts so far, counted by the claim
    #[serde(default)]
    pub attempts: u32,
    /// Last failure, only set on `error`
    #[serde(default)]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub printed_at: Option<DateTime<Utc>>,
    /// When the current `printing` claim was taken
    #[serde(default)]
    pub claimed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub requested_by: Option<String>,
}

impl PrintJob {
    /// New pending job
    pub fn new(
        id: impl Into<String>,
        order_id: impl Into<String>,
        job_type: JobType,
        printer_target: PrinterTarget,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            order_id: order_id.into(),
            job_type,
            printer_target,
            status: JobStatus::Pending,
            attempts: 0,
            error_message: None,
            created_at,
            printed_at: None,
            claimed_at: None,
            requested_by: None,
        }
    }
}
