use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for rackflow
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RackflowConfig {
    /// Backend service settings
    pub backend: BackendConfig,
    /// Warehouse addressing settings
    pub warehouses: WarehouseConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Base URL of the inventory backend
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
    /// Bounded retry policy for transient transport failures
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Base backoff delay in milliseconds
    pub base_delay_ms: u64,
    /// Backoff ceiling in milliseconds
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WarehouseConfig {
    /// Warehouse id carrying the hydro paired-rack addressing scheme
    pub hydro_warehouse_id: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Enable structured tracing output
    pub tracing_enabled: bool,
    /// Log level
    pub log_level: String,
}

impl Default for RackflowConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig {
                base_url: "http://localhost:8000".to_string(),
                timeout_seconds: 15,
                retry: RetryConfig {
                    max_attempts: 3,
                    base_delay_ms: 500,
                    max_delay_ms: 10_000,
                },
            },
            warehouses: WarehouseConfig {
                // Hydro containers live under warehouse 100
                hydro_warehouse_id: 100,
            },
            observability: ObservabilityConfig {
                tracing_enabled: true,
                log_level: "info".to_string(),
            },
        }
    }
}

impl RackflowConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (rackflow.toml)
    /// 3. Environment variables (prefixed with RACKFLOW_)
    pub fn load() -> Result<Self> {
        let defaults = Config::try_from(&RackflowConfig::default())?;
        let mut builder = Config::builder().add_source(defaults);

        if Path::new("rackflow.toml").exists() {
            builder = builder.add_source(File::with_name("rackflow"));
        }

        builder = builder.add_source(
            Environment::with_prefix("RACKFLOW")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let mut rackflow_config: RackflowConfig = config.try_deserialize()?;

        // Plain BACKEND_URL is honored too, for parity with the ops
        // scripts that already export it.
        if let Ok(url) = std::env::var("BACKEND_URL") {
            rackflow_config.backend.base_url = url;
        }

        Ok(rackflow_config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<RackflowConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = RackflowConfig::load_env_file();
        RackflowConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static RackflowConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}
