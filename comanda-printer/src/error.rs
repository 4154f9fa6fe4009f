//! Printer crate errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrintError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TCP endpoint refused or unreachable
    #[error("Cannot reach {0}")]
    Connection(String),

    #[error("Timed out during {0}")]
    Timeout(String),

    /// The strategy does not handle this port; nothing was attempted
    #[error("Not applicable: {0}")]
    NotApplicable(String),

    /// Host print subsystem rejected the job
    #[error("Spooler rejected job: {0}")]
    Spooler(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[cfg(windows)]
    #[error("Win32 spooler call failed: {0}")]
    Win32(String),
}

impl PrintError {
    /// Skips are reported in diagnostics but never count as an attempt
    pub fn is_skip(&self) -> bool {
        matches!(self, PrintError::NotApplicable(_))
    }
}

pub type PrintResult<T> = Result<T, PrintError>;
