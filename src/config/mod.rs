use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::motivation::{EngineConfig, FetchPolicy};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub scoring: ScoringSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let defaults = ScoringSettings::default();
        let scoring = ScoringSettings {
            cache_ttl: Duration::from_secs(numeric_var(
                "APP_SIGNAL_CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )?),
            partial_cache_ttl: Duration::from_secs(numeric_var(
                "APP_PARTIAL_CACHE_TTL_SECS",
                defaults.partial_cache_ttl.as_secs(),
            )?),
            provider_timeout: Duration::from_millis(numeric_var(
                "APP_PROVIDER_TIMEOUT_MS",
                defaults.provider_timeout.as_millis() as u64,
            )?),
            provider_retries: numeric_var("APP_PROVIDER_RETRIES", defaults.provider_retries)?,
            advisor_timeout: Duration::from_millis(numeric_var(
                "APP_ADVISOR_TIMEOUT_MS",
                defaults.advisor_timeout.as_millis() as u64,
            )?),
            adjustment_cap: numeric_var("APP_ADJUSTMENT_CAP", defaults.adjustment_cap)?,
            batch_concurrency: numeric_var("APP_BATCH_CONCURRENCY", defaults.batch_concurrency)?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            scoring,
        })
    }
}

fn numeric_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Knobs for signal fetching, caching, and the AI adjustment pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringSettings {
    pub cache_ttl: Duration,
    pub partial_cache_ttl: Duration,
    pub provider_timeout: Duration,
    pub provider_retries: u8,
    pub advisor_timeout: Duration,
    pub adjustment_cap: u8,
    pub batch_concurrency: usize,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(3600),
            partial_cache_ttl: Duration::from_secs(300),
            provider_timeout: Duration::from_millis(8000),
            provider_retries: 1,
            advisor_timeout: Duration::from_millis(10_000),
            adjustment_cap: 15,
            batch_concurrency: 4,
        }
    }
}

impl ScoringSettings {
    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            cache_ttl: self.cache_ttl,
            partial_cache_ttl: self.partial_cache_ttl,
            provider_timeout: self.provider_timeout,
            transient_retries: self.provider_retries,
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            adjustment_cap: self.adjustment_cap,
            advisor_timeout: self.advisor_timeout,
            batch_concurrency: self.batch_concurrency.max(1),
            ..EngineConfig::default()
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16 port number"),
            ConfigError::InvalidHost { source } => {
                write!(f, "APP_HOST must be an IP address or localhost: {source}")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be a non-negative number, got '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
