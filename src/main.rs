use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod insights;
mod orchestrator;
mod prompt;
mod providers;
mod routes;
mod secrets;

use config::{AppConfig, Cli};
use orchestrator::TrendAnalyzer;
use routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_cli(Cli::parse());
    config.log_summary();

    let analyzer = TrendAnalyzer::from_config(&config)?;
    info!(
        providers = ?analyzer.provider_names(),
        cascade = config.cascade_providers,
        max_rows = config.max_rows,
        "trend analyzer ready"
    );

    let app = routes::router(AppState::new(analyzer), config.cors_origin.as_deref())?;

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("listening on {}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM so in-flight analyses can finish.
async fn shutdown_signal() {
    let signal = tokio::select! {
        () = interrupt() => "interrupt",
        () = terminate() => "terminate",
    };
    info!(signal, "draining requests before shutdown");
}

async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!(error = %e, "cannot listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await
}
