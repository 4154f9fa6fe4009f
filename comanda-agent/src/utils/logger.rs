//! Logging setup
//!
//! Console output always; daily rolling files as well when `log_dir` exists.

use std::path::Path;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Rolling log file location, if `log_dir` is usable
fn log_file_dir(log_dir: Option<&str>) -> Option<&Path> {
    let dir = log_dir?;
    let path = Path::new(dir);
    if path.is_dir() {
        Some(path)
    } else {
        eprintln!("LOG_DIR {} does not exist, logging to console only", dir);
        None
    }
}

/// Initialize the global subscriber
///
/// `RUST_LOG` takes precedence over `log_level` when set.
pub fn init_logger(log_level: &str, log_dir: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console = tracing_subscriber::fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    let file = log_file_dir(log_dir).map(|dir| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(tracing_appender::rolling::daily(dir, "comanda-agent"))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();
}
