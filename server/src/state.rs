//! Shared application state

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::Config;
use crate::live::FanoutHub;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state — cheap to clone, one per request
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    /// Deployment configuration
    pub config: Config,
    /// Realtime fan-out hub
    pub hub: FanoutHub,
}

impl AppState {
    /// Connect to the database, run migrations, and assemble state
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPoolOptions::new()
            .max_connections(16)
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database ready");

        Ok(Self {
            pool,
            config: config.clone(),
            hub: FanoutHub::new(),
        })
    }
}
