//! Delivery strategies
//!
//! Each strategy is one way of moving a staged buffer to a device. The
//! transport tries them in configured order; a strategy that cannot handle
//! a port returns [`PrintError::NotApplicable`] instead of attempting it.

use super::network::NetworkPrinter;
use super::port::{PortInfo, PortKind};
use super::spooler::Spooler;
use crate::error::{PrintError, PrintResult};
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

/// Everything a strategy needs for one delivery
#[derive(Debug, Clone, Copy)]
pub struct DeliveryContext<'a> {
    pub printer: &'a str,
    pub port: &'a PortInfo,
    pub staged: &'a Path,
}

#[async_trait]
pub trait DeliveryStrategy: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(&self, ctx: DeliveryContext<'_>) -> PrintResult<()>;
}

/// Built-in strategies, selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Open the port endpoint and write to it (serial, parallel, file ports)
    Direct,
    /// Submit a raw job through the host print subsystem
    Spooler,
    /// Last resort write against whatever the port resolves to
    Generic,
}

impl StrategyKind {
    pub const DEFAULT_ORDER: [StrategyKind; 3] =
        [StrategyKind::Direct, StrategyKind::Spooler, StrategyKind::Generic];

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Direct => "direct",
            StrategyKind::Spooler => "spooler",
            StrategyKind::Generic => "generic",
        }
    }

    /// Instantiate the strategy
    pub fn build(self, spooler: Arc<dyn Spooler>) -> Box<dyn DeliveryStrategy> {
        match self {
            StrategyKind::Direct => Box::new(DirectPortWrite),
            StrategyKind::Spooler => Box::new(SpoolerSubmit::new(spooler)),
            StrategyKind::Generic => Box::new(GenericWrite::default()),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = PrintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "direct" => Ok(StrategyKind::Direct),
            "spooler" => Ok(StrategyKind::Spooler),
            "generic" => Ok(StrategyKind::Generic),
            other => Err(PrintError::InvalidConfig(format!(
                "Unknown delivery strategy: {}",
                other
            ))),
        }
    }
}

/// Copy the staged file into a device path
async fn write_to_path(device: &Path, staged: &Path, create: bool) -> PrintResult<()> {
    let mut source = tokio::fs::File::open(staged).await?;
    let mut target = tokio::fs::OpenOptions::new()
        .write(true)
        .create(create)
        .truncate(create)
        .open(device)
        .await?;
    let copied = tokio::io::copy(&mut source, &mut target).await?;
    target.flush().await?;
    debug!(device = %device.display(), bytes = copied, "Wrote to device");
    Ok(())
}

/// Strategy 1: direct write to a serial, parallel or file port
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectPortWrite;

#[async_trait]
impl DeliveryStrategy for DirectPortWrite {
    fn name(&self) -> &str {
        StrategyKind::Direct.as_str()
    }

    #[instrument(skip_all, fields(printer = ctx.printer, port = %ctx.port))]
    async fn deliver(&self, ctx: DeliveryContext<'_>) -> PrintResult<()> {
        if !ctx.port.kind.is_direct_writable() {
            return Err(PrintError::NotApplicable(format!(
                "{} port is not directly writable",
                ctx.port.kind
            )));
        }
        let device = ctx
            .port
            .device_path()
            .ok_or_else(|| PrintError::NotApplicable(format!("no device path for {}", ctx.port)))?;
        write_to_path(&device, ctx.staged, ctx.port.kind == PortKind::File).await
    }
}

/// Strategy 2: raw job through the host spooler
///
/// Covers USB and virtual ports that cannot be opened directly.
pub struct SpoolerSubmit {
    spooler: Arc<dyn Spooler>,
}

impl SpoolerSubmit {
    pub fn new(spooler: Arc<dyn Spooler>) -> Self {
        Self { spooler }
    }
}

#[async_trait]
impl DeliveryStrategy for SpoolerSubmit {
    fn name(&self) -> &str {
        StrategyKind::Spooler.as_str()
    }

    #[instrument(skip_all, fields(printer = ctx.printer))]
    async fn deliver(&self, ctx: DeliveryContext<'_>) -> PrintResult<()> {
        self.spooler.submit_raw(ctx.printer, ctx.staged).await
    }
}

/// Strategy 3: generic write against the resolved port
///
/// Network ports get raw TCP; anything else with an endpoint is opened as
/// a path, including spooler-owned ports such as `USB001`.
#[derive(Debug, Clone)]
pub struct GenericWrite {
    connect_timeout: Duration,
}

impl Default for GenericWrite {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
        }
    }
}

#[async_trait]
impl DeliveryStrategy for GenericWrite {
    fn name(&self) -> &str {
        StrategyKind::Generic.as_str()
    }

    #[instrument(skip_all, fields(printer = ctx.printer, port = %ctx.port))]
    async fn deliver(&self, ctx: DeliveryContext<'_>) -> PrintResult<()> {
        if let Some(addr) = ctx.port.socket_addr() {
            let data = tokio::fs::read(ctx.staged).await?;
            return NetworkPrinter::from_addr(&addr)?
                .with_timeout(self.connect_timeout)
                .print(&data)
                .await;
        }
        match ctx.port.device_path() {
            Some(device) => write_to_path(&device, ctx.staged, false).await,
            None => Err(PrintError::NotApplicable(format!(
                "nothing to write to for {}",
                ctx.port
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::staging::StagedBuffer;

    #[test]
    fn test_strategy_kind_parse() {
        assert_eq!("direct".parse::<StrategyKind>().unwrap(), StrategyKind::Direct);
        assert_eq!(" Spooler ".parse::<StrategyKind>().unwrap(), StrategyKind::Spooler);
        assert!("fax".parse::<StrategyKind>().is_err());
    }

    #[tokio::test]
    async fn test_direct_write_to_file_port() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("printer.out");
        let port = PortInfo::classify(out.to_str().unwrap());
        let staged = StagedBuffer::write(b"ticket").unwrap();

        DirectPortWrite
            .deliver(DeliveryContext {
                printer: "COCINA",
                port: &port,
                staged: staged.path(),
            })
            .await
            .unwrap();

        assert_eq!(std::fs::read(&out).unwrap(), b"ticket");
    }

    #[tokio::test]
    async fn test_direct_write_skips_usb_port() {
        let port = PortInfo::classify("USB001");
        let staged = StagedBuffer::write(b"ticket").unwrap();

        let err = DirectPortWrite
            .deliver(DeliveryContext {
                printer: "COCINA",
                port: &port,
                staged: staged.path(),
            })
            .await
            .unwrap_err();

        assert!(err.is_skip());
    }

    #[tokio::test]
    async fn test_generic_write_skips_virtual_port() {
        let port = PortInfo::classify("PORTPROMPT:");
        let staged = StagedBuffer::write(b"ticket").unwrap();

        let err = GenericWrite::default()
            .deliver(DeliveryContext {
                printer: "CAJA",
                port: &port,
                staged: staged.path(),
            })
            .await
            .unwrap_err();

        assert!(err.is_skip());
    }
}
