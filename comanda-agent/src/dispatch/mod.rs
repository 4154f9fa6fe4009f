//! Job lifecycle: polling, claiming, printing and reporting

mod dispatcher;
mod reconciler;

pub use dispatcher::{CycleReport, Dispatcher, JobOutcome};
pub use reconciler::Reconciler;

use crate::store::StoreError;
use comanda_printer::TransportError;
use std::fmt;
use thiserror::Error;

/// Why a claimed job did not print
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Order {0} not found")]
    OrderNotFound(String),

    #[error("Order {0} has no items")]
    EmptyOrder(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Order fetch failed: {0}")]
    Store(#[from] StoreError),
}

/// Failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Bad order data, waiting will not help
    Validation,
    Transport,
    Store,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Validation => write!(f, "validation"),
            FailureKind::Transport => write!(f, "transport"),
            FailureKind::Store => write!(f, "store"),
        }
    }
}

impl DispatchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            DispatchError::OrderNotFound(_) | DispatchError::EmptyOrder(_) => FailureKind::Validation,
            DispatchError::Transport(_) => FailureKind::Transport,
            DispatchError::Store(_) => FailureKind::Store,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() != FailureKind::Validation
    }
}
