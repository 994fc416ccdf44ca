//! Dashboard configuration.
//!
//! Hierarchical loading:
//! 1. Default values in code
//! 2. Optional `config/<environment>` file (toml, yaml, json)
//! 3. Environment variable overrides with `FRESHCART__` prefix and `__` separator
//!    (e.g. `FRESHCART__INVENTORY__LOW_STOCK_THRESHOLD=10`)

use config::{ConfigError, Environment, File};
use serde::Deserialize;

use freshcart_inventory::LOW_STOCK_THRESHOLD;
use freshcart_observability::LoggingConfig;

const DEFAULT_ENVIRONMENT: &str = "development";
const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";
const DEFAULT_TIMEOUT_MS: u64 = 15_000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DashboardConfig {
    /// Current environment (development, staging, production)
    pub environment: String,

    pub inventory: InventoryConfig,

    pub backend: BackendConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InventoryConfig {
    /// Variants with stock strictly below this are flagged
    pub low_stock_threshold: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the order/inventory service
    pub base_url: String,

    /// Per-request timeout handed to the HTTP client
    pub request_timeout_ms: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT.to_string(),
            inventory: InventoryConfig::default(),
            backend: BackendConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: LOW_STOCK_THRESHOLD,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl DashboardConfig {
    /// Load `.env`, then the layered sources.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let environment =
            std::env::var("FRESHCART__ENVIRONMENT").unwrap_or_else(|_| DEFAULT_ENVIRONMENT.into());
        Self::load_from(&environment, Environment::with_prefix("FRESHCART"))
    }

    /// Layered load with an explicit environment source (tests pass a fixed map).
    pub fn load_from(environment: &str, env: Environment) -> Result<Self, ConfigError> {
        let defaults = LoggingConfig::default();

        config::Config::builder()
            .set_default("environment", environment)?
            .set_default("inventory.low_stock_threshold", LOW_STOCK_THRESHOLD)?
            .set_default("backend.base_url", DEFAULT_BASE_URL)?
            .set_default("backend.request_timeout_ms", DEFAULT_TIMEOUT_MS)?
            .set_default("logging.filter", defaults.filter)?
            .set_default("logging.json", defaults.json)?
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(env.prefix_separator("__").separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}
