//! Server configuration
//!
//! Deployment configuration comes from the environment. Business-level
//! global config (ordering enabled, maintenance mode, fee settings) lives in
//! the `platform_config` table and is loaded per operation — see
//! `db::platform`.

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// JWT secret for verifying identity tokens issued by the auth service
    pub jwt_secret: String,
    /// Escalation sweep interval in seconds
    pub sweep_interval_secs: u64,
    /// Hours a resolved report may sit unconfirmed before auto-escalation
    pub resolved_stale_hours: i64,
    /// Three-strike scan window in minutes
    pub strike_window_minutes: i64,
    /// Distinct students required to trigger an auto-disable
    pub strike_threshold: i64,
    /// Per-restaurant report cooldown in hours
    pub report_cooldown_hours: i64,
}

impl Config {
    /// Require a secret env var: must be set and non-empty outside development.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
        std::env::var(name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: Self::env_parsed("HTTP_PORT", 8080),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            sweep_interval_secs: Self::env_parsed("SWEEP_INTERVAL_SECS", 60),
            resolved_stale_hours: Self::env_parsed("RESOLVED_STALE_HOURS", 24),
            strike_window_minutes: Self::env_parsed("STRIKE_WINDOW_MINUTES", 120),
            strike_threshold: Self::env_parsed("STRIKE_THRESHOLD", 3),
            report_cooldown_hours: Self::env_parsed("REPORT_COOLDOWN_HOURS", 24),
            environment,
        })
    }
}
