//! campus-server — campus pickup-ordering core
//!
//! Long-running service that:
//! - Takes paid student orders against university restaurants (serializable
//!   creation transaction, conditional-update status pipeline)
//! - Runs the report escalation engine (3-strike auto-disable + staleness
//!   sweep)
//! - Fans order/report/notification events out to connected clients

mod api;
mod auth;
mod config;
mod db;
mod error;
mod escalation;
mod live;
mod notify;
mod state;
mod tasks;

use config::Config;
use state::AppState;
use tasks::BackgroundTasks;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campus_server=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting campus-server (env: {})", config.environment);

    // Initialize application state (connects + migrates)
    let state = AppState::new(&config).await?;

    // Background tasks: the escalation sweep runs once per process for the
    // process's whole lifetime.
    let mut tasks = BackgroundTasks::new();
    escalation::spawn_sweep(&mut tasks, state.clone());

    // Build router and bind
    let app = api::create_router(state);
    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("campus-server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tasks.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {e}");
    }
    tracing::info!("Shutdown signal received");
}
