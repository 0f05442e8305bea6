//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Read-path cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Cache capacity and per-query-shape TTLs, in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached payloads.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    /// Most recent ledger entry of a budget.
    #[serde(default = "default_last_entry_ttl")]
    pub last_entry_ttl_secs: u64,
    /// Full ledger listing of a budget.
    #[serde(default = "default_ledger_list_ttl")]
    pub ledger_list_ttl_secs: u64,
    /// Current balance of a budget. Kept short on purpose.
    #[serde(default = "default_current_balance_ttl")]
    pub current_balance_ttl_secs: u64,
    /// Transaction listing of a user.
    #[serde(default = "default_transactions_list_ttl")]
    pub transactions_list_ttl_secs: u64,
    /// Single transaction lookup.
    #[serde(default = "default_transaction_ttl")]
    pub transaction_ttl_secs: u64,
    /// Budget lookup by owner.
    #[serde(default = "default_budget_ttl")]
    pub budget_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
            last_entry_ttl_secs: default_last_entry_ttl(),
            ledger_list_ttl_secs: default_ledger_list_ttl(),
            current_balance_ttl_secs: default_current_balance_ttl(),
            transactions_list_ttl_secs: default_transactions_list_ttl(),
            transaction_ttl_secs: default_transaction_ttl(),
            budget_ttl_secs: default_budget_ttl(),
        }
    }
}

fn default_max_capacity() -> u64 {
    10_000
}

fn default_last_entry_ttl() -> u64 {
    300 // 5 minutes
}

fn default_ledger_list_ttl() -> u64 {
    900 // 15 minutes
}

fn default_current_balance_ttl() -> u64 {
    30
}

fn default_transactions_list_ttl() -> u64 {
    300 // 5 minutes
}

fn default_transaction_ttl() -> u64 {
    900 // 15 minutes
}

fn default_budget_ttl() -> u64 {
    1800 // 30 minutes
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones winning: `config/default`, `config/{RUN_MODE}`,
    /// then `FINLY__SECTION__KEY` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("FINLY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
