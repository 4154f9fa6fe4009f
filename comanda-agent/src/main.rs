use anyhow::Context;
use comanda_agent::{Agent, AgentConfig, BackgroundTasks, init_logger, print_banner};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = Arc::new(AgentConfig::from_env().context("Invalid configuration")?);
    init_logger(&config.log_level, config.log_dir.as_deref());
    print_banner();

    tracing::info!(
        poll_interval_ms = config.poll_interval.as_millis() as u64,
        max_attempts = config.max_print_attempts,
        width = config.paper_width,
        timezone = %config.timezone,
        "Comanda print agent starting..."
    );

    let agent = Agent::from_config(config).context("Failed to build job store client")?;

    let mut tasks = BackgroundTasks::new();
    agent.start(&mut tasks);
    tasks.log_summary();

    shutdown_signal().await;
    tasks.shutdown().await;

    tracing::info!("Comanda print agent stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
