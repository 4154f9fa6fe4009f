//! Physical delivery of encoded buffers
//!
//! [`PrinterTransport`] resolves a printer name to its port, stages the
//! buffer on disk, then walks its strategies in order until one succeeds.
//! Every failure along the way is kept so the caller gets the whole story
//! when nothing worked.
//!
//! The transport is a best-effort byte mover: it never de-duplicates, and
//! once bytes reach the device there is no acknowledgement to wait for.

pub mod network;
pub mod port;
pub mod spooler;
pub mod staging;
pub mod strategy;

use crate::error::PrintError;
use async_trait::async_trait;
use port::PortInfo;
use spooler::Spooler;
use staging::StagedBuffer;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use strategy::{DeliveryContext, DeliveryStrategy, StrategyKind};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Outcome of one strategy that did not deliver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyFailure {
    pub strategy: String,
    pub reason: String,
    /// The strategy did not apply to the port and was not attempted
    pub skipped: bool,
}

impl fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.skipped {
            write!(f, "{}: skipped ({})", self.strategy, self.reason)
        } else {
            write!(f, "{}: {}", self.strategy, self.reason)
        }
    }
}

fn join_failures(failures: &[StrategyFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Successful delivery
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Strategy that delivered the buffer
    pub strategy: String,
    pub port: PortInfo,
    pub bytes: usize,
    /// Strategies tried before the successful one
    pub earlier_failures: Vec<StrategyFailure>,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Printer not found: {0}")]
    PrinterNotFound(String),

    #[error("Port lookup failed for {printer}: {source}")]
    PortLookup {
        printer: String,
        #[source]
        source: PrintError,
    },

    #[error("Staging failed: {0}")]
    Staging(#[source] PrintError),

    #[error("All delivery strategies failed for {printer}: {}", join_failures(.failures))]
    AllStrategiesFailed {
        printer: String,
        failures: Vec<StrategyFailure>,
    },
}

/// Moves bytes to a named printer
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fast-fail check that the host knows the printer
    async fn exists(&self, printer: &str) -> Result<bool, TransportError>;

    /// Deliver a finished buffer
    async fn send(&self, printer: &str, data: &[u8]) -> Result<Delivery, TransportError>;
}

/// Multi-strategy transport over the host print subsystem
pub struct PrinterTransport {
    spooler: Arc<dyn Spooler>,
    strategies: Vec<Box<dyn DeliveryStrategy>>,
    strategy_timeout: Duration,
}

impl PrinterTransport {
    /// Transport with the built-in strategies in the given order
    pub fn new(
        spooler: Arc<dyn Spooler>,
        order: &[StrategyKind],
        strategy_timeout: Duration,
    ) -> Self {
        let strategies = order.iter().map(|k| k.build(spooler.clone())).collect();
        Self::with_strategies(spooler, strategies, strategy_timeout)
    }

    /// Transport with arbitrary strategies
    pub fn with_strategies(
        spooler: Arc<dyn Spooler>,
        strategies: Vec<Box<dyn DeliveryStrategy>>,
        strategy_timeout: Duration,
    ) -> Self {
        Self {
            spooler,
            strategies,
            strategy_timeout,
        }
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    async fn resolve_port(&self, printer: &str) -> Result<PortInfo, TransportError> {
        let lookup = tokio::time::timeout(self.strategy_timeout, self.spooler.port_of(printer))
            .await
            .map_err(|_| TransportError::PortLookup {
                printer: printer.to_string(),
                source: PrintError::Timeout("port lookup".to_string()),
            })?
            .map_err(|source| TransportError::PortLookup {
                printer: printer.to_string(),
                source,
            })?;

        match lookup {
            Some(raw) => Ok(PortInfo::classify(&raw)),
            None => Err(TransportError::PrinterNotFound(printer.to_string())),
        }
    }
}

#[async_trait]
impl Transport for PrinterTransport {
    #[instrument(skip(self))]
    async fn exists(&self, printer: &str) -> Result<bool, TransportError> {
        tokio::time::timeout(self.strategy_timeout, self.spooler.exists(printer))
            .await
            .map_err(|_| TransportError::PortLookup {
                printer: printer.to_string(),
                source: PrintError::Timeout("printer lookup".to_string()),
            })?
            .map_err(|source| TransportError::PortLookup {
                printer: printer.to_string(),
                source,
            })
    }

    #[instrument(skip(self, data), fields(data_len = data.len()))]
    async fn send(&self, printer: &str, data: &[u8]) -> Result<Delivery, TransportError> {
        let port = self.resolve_port(printer).await?;
        debug!(port = %port, "Resolved printer port");

        // Removed when `staged` drops, whichever way this function exits
        let staged = StagedBuffer::stage(data)
            .await
            .map_err(TransportError::Staging)?;

        let mut failures = Vec::new();
        for strategy in &self.strategies {
            let ctx = DeliveryContext {
                printer,
                port: &port,
                staged: staged.path(),
            };

            let outcome = tokio::time::timeout(self.strategy_timeout, strategy.deliver(ctx)).await;
            let error = match outcome {
                Ok(Ok(())) => {
                    info!(
                        strategy = strategy.name(),
                        bytes = staged.len(),
                        "Delivered to printer"
                    );
                    return Ok(Delivery {
                        strategy: strategy.name().to_string(),
                        port,
                        bytes: staged.len(),
                        earlier_failures: failures,
                    });
                }
                Ok(Err(e)) => e,
                Err(_) => PrintError::Timeout(format!(
                    "delivery ({}ms)",
                    self.strategy_timeout.as_millis()
                )),
            };

            if error.is_skip() {
                debug!(strategy = strategy.name(), error = %error, "Strategy skipped");
            } else {
                warn!(strategy = strategy.name(), error = %error, "Strategy failed, trying next");
            }
            failures.push(StrategyFailure {
                strategy: strategy.name().to_string(),
                reason: error.to_string(),
                skipped: error.is_skip(),
            });
        }

        Err(TransportError::AllStrategiesFailed {
            printer: printer.to_string(),
            failures,
        })
    }
}
