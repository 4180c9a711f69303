//! Back-office configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ERP_DATABASE_URL` - ERP `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `BACKOFFICE_HOST` - Bind address (default: 127.0.0.1)
//! - `BACKOFFICE_PORT` - Listen port (default: 3002)
//! - `ANALYSIS_PARETO_THRESHOLD` - Cumulative revenue share flagged as Pareto (default: 0.8)
//! - `ANALYSIS_PRICE_BAND_WIDTH` - Width of a price band (default: 100)
//! - `ANALYSIS_MAX_PRICE_BANDS` - Maximum bands per leaf before widening (default: 50)
//! - `ANALYSIS_PROGRESS_INTERVAL` - Products processed between progress events (default: 250)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE` - Sample rates (default: 1.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

use jewel_ops_core::validate_pareto_threshold;

const DEFAULT_PARETO_THRESHOLD: &str = "0.8";
const DEFAULT_PRICE_BAND_WIDTH: &str = "100";
const DEFAULT_MAX_PRICE_BANDS: &str = "50";
const DEFAULT_PROGRESS_INTERVAL: &str = "250";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Back-office application configuration.
#[derive(Debug, Clone)]
pub struct BackofficeConfig {
    /// ERP `PostgreSQL` connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Sales analysis tuning
    pub analysis: AnalysisConfig,
    /// Emit JSON logs instead of text
    pub json_logs: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Tuning of the sales analysis engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Cumulative revenue share, in `(0, 1]`, that marks the Pareto set.
    pub pareto_threshold: Decimal,
    /// Width of one price band.
    pub price_band_width: Decimal,
    /// Maximum number of bands in one leaf node.
    pub max_price_bands: usize,
    /// Number of processed products between two progress events.
    pub progress_interval: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            pareto_threshold: Decimal::new(8, 1),
            price_band_width: Decimal::ONE_HUNDRED,
            max_price_bands: 50,
            progress_interval: 250,
        }
    }
}

impl AnalysisConfig {
    /// Load analysis tuning from environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a value does not parse or is out
    /// of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        let pareto_threshold: Decimal =
            parse_env("ANALYSIS_PARETO_THRESHOLD", DEFAULT_PARETO_THRESHOLD)?;
        validate_pareto_threshold(pareto_threshold).map_err(|e| {
            ConfigError::InvalidEnvVar("ANALYSIS_PARETO_THRESHOLD".to_string(), e.to_string())
        })?;

        let price_band_width: Decimal =
            parse_env("ANALYSIS_PRICE_BAND_WIDTH", DEFAULT_PRICE_BAND_WIDTH)?;
        if price_band_width <= Decimal::ZERO {
            return Err(ConfigError::InvalidEnvVar(
                "ANALYSIS_PRICE_BAND_WIDTH".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let max_price_bands: usize =
            parse_env("ANALYSIS_MAX_PRICE_BANDS", DEFAULT_MAX_PRICE_BANDS)?;
        let progress_interval: usize =
            parse_env("ANALYSIS_PROGRESS_INTERVAL", DEFAULT_PROGRESS_INTERVAL)?;
        for (key, value) in [
            ("ANALYSIS_MAX_PRICE_BANDS", max_price_bands),
            ("ANALYSIS_PROGRESS_INTERVAL", progress_interval),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidEnvVar(
                    key.to_string(),
                    "must be at least 1".to_string(),
                ));
            }
        }

        Ok(Self {
            pareto_threshold,
            price_band_width,
            max_price_bands,
            progress_interval,
        })
    }
}

impl BackofficeConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("ERP_DATABASE_URL")?;
        let host = parse_env("BACKOFFICE_HOST", "127.0.0.1")?;
        let port = parse_env("BACKOFFICE_PORT", "3002")?;
        let analysis = AnalysisConfig::from_env()?;
        let json_logs =
            get_optional_env("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json"));
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database_url,
            host,
            port,
            analysis,
            json_logs,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` naming the primary key if neither is set.
pub fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_trims_input() {
        let port: u16 = parse_value("BACKOFFICE_PORT", " 3002 ").unwrap();
        assert_eq!(port, 3002);
    }

    #[test]
    fn test_parse_value_reports_key() {
        let err = parse_value::<u16>("BACKOFFICE_PORT", "not-a-port").unwrap_err();
        match err {
            ConfigError::InvalidEnvVar(key, _) => assert_eq!(key, "BACKOFFICE_PORT"),
            ConfigError::MissingEnvVar(_) => panic!("expected InvalidEnvVar"),
        }
    }

    #[test]
    fn test_parse_decimal_threshold() {
        let threshold: Decimal = parse_value("ANALYSIS_PARETO_THRESHOLD", "0.8").unwrap();
        assert_eq!(threshold, Decimal::new(8, 1));
    }

    #[test]
    fn test_analysis_config_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.pareto_threshold, Decimal::new(8, 1));
        assert_eq!(config.price_band_width, Decimal::from(100));
        assert_eq!(config.max_price_bands, 50);
        assert_eq!(config.progress_interval, 250);
    }

    #[test]
    fn test_socket_addr() {
        let config = BackofficeConfig {
            database_url: SecretString::from("postgres://localhost/erp"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3002,
            analysis: AnalysisConfig::default(),
            json_logs: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3002);
    }

    #[test]
    fn test_config_debug_redacts_database_url() {
        let config = BackofficeConfig {
            database_url: SecretString::from("postgres://erp:hunter2@db/erp"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3002,
            analysis: AnalysisConfig::default(),
            json_logs: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        };

        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("hunter2"));
    }
}
