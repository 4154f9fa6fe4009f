//! Raw TCP delivery (JetDirect, port 9100)

use super::port::RAW_TCP_PORT;
use crate::error::{PrintError, PrintResult};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, instrument};

/// Printer reached by host name or IP over raw TCP
///
/// The endpoint is kept as `host:port` text so names such as
/// `printer.local:9100` resolve at connect time.
#[derive(Debug, Clone)]
pub struct NetworkPrinter {
    endpoint: String,
    connect_timeout: Duration,
    write_timeout: Duration,
}

impl NetworkPrinter {
    /// `host:port`, or a bare host which gets port 9100
    pub fn from_addr(addr: &str) -> PrintResult<Self> {
        let addr = addr.trim();
        if addr.is_empty() {
            return Err(PrintError::InvalidConfig("Empty printer address".to_string()));
        }
        let endpoint = match addr.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() => {
                port.parse::<u16>().map_err(|_| {
                    PrintError::InvalidConfig(format!("Invalid port in address: {}", addr))
                })?;
                addr.to_string()
            }
            Some(_) => {
                return Err(PrintError::InvalidConfig(format!("Missing host in address: {}", addr)));
            }
            None => format!("{}:{}", addr, RAW_TCP_PORT),
        };
        Ok(Self {
            endpoint,
            connect_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(10),
        })
    }

    pub fn with_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[instrument(skip(self, data), fields(endpoint = %self.endpoint, bytes = data.len()))]
    pub async fn print(&self, data: &[u8]) -> PrintResult<()> {
        let mut stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.endpoint))
            .await
            .map_err(|_| PrintError::Timeout(format!("connect to {}", self.endpoint)))?
            .map_err(|e| PrintError::Connection(format!("{}: {}", self.endpoint, e)))?;

        let write = async {
            stream.write_all(data).await?;
            stream.shutdown().await
        };
        tokio::time::timeout(self.write_timeout, write)
            .await
            .map_err(|_| PrintError::Timeout(format!("write to {}", self.endpoint)))??;

        debug!("Buffer written over TCP");
        Ok(())
    }
}
