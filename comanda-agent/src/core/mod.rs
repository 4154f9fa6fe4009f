//! Configuration and task plumbing

pub mod config;
pub mod tasks;

pub use config::{AgentConfig, ConfigError, ConfigResult};
pub use tasks::{BackgroundTasks, SHUTDOWN_GRACE};
