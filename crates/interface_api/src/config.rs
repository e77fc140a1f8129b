//! API configuration

use core_kernel::{Currency, Timezone};
use domain_billing::LedgerSettings;
use serde::Deserialize;

/// Where bills are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    /// Process-local store, lost on restart
    Memory,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// API configuration
///
/// Every field has a default, so any subset may be supplied through
/// `API_`-prefixed environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    /// Maximum pooled connections
    pub database_max_connections: u32,
    /// Log level
    pub log_level: String,
    pub log_format: LogFormat,
    pub storage: StorageBackend,
    /// Clinic currency (ISO code)
    pub currency: Currency,
    /// Clinic timezone (IANA name), defines "today" on the dashboard
    pub timezone: Timezone,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/clinic".to_string(),
            database_max_connections: 10,
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            storage: StorageBackend::default(),
            currency: Currency::default(),
            timezone: Timezone::default(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Settings the billing ledger runs under
    pub fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings {
            currency: self.currency,
            timezone: self.timezone,
        }
    }
}
