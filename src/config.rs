use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use validator::Validate;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";

/// Application configuration with validation.
///
/// Values are layered from `config/default.toml`, an environment-specific
/// file (`config/{environment}.toml`), and `APP__`-prefixed environment
/// variables, highest last.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB: connect timeout in seconds
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,

    /// DB: idle timeout in seconds
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,

    /// DB: acquire timeout in seconds
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Checkout: how many times the order transaction is retried when the
    /// database reports lock contention before surfacing a conflict
    #[validate(range(min = 1, max = 10))]
    #[serde(default = "default_checkout_max_retries")]
    pub checkout_max_retries: u32,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_min_connections() -> u32 {
    1
}

fn default_db_connect_timeout_secs() -> u64 {
    30
}

fn default_db_idle_timeout_secs() -> u64 {
    600
}

fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_checkout_max_retries() -> u32 {
    3
}

impl AppConfig {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}

/// Loads configuration from files and environment variables.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let mut builder = Config::builder();

    let default_path = Path::new(CONFIG_DIR).join("default.toml");
    if default_path.exists() {
        builder = builder.add_source(File::from(default_path));
    }

    let env_path = Path::new(CONFIG_DIR).join(format!("{}.toml", run_env));
    if env_path.exists() {
        builder = builder.add_source(File::from(env_path));
    }

    let config = builder
        // APP__DATABASE_URL, APP__PORT, ...
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config
        .validate()
        .map_err(|e| ConfigError::Message(format!("invalid configuration: {}", e)))?;

    Ok(app_config)
}

/// Initializes the global tracing subscriber.
pub fn init_tracing(log_level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".to_string(),
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: true,
            cors_allowed_origins: None,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            checkout_max_retries: default_checkout_max_retries(),
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn zero_checkout_retries_rejected() {
        let mut cfg = base_config();
        cfg.checkout_max_retries = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn environment_helpers() {
        let mut cfg = base_config();
        assert!(cfg.is_development());
        cfg.environment = "production".to_string();
        assert!(!cfg.is_development());
    }
}
