//! Configuration management for the Fitlog sync engine
//!
//! Configuration is loaded hierarchically:
//! 1. Default values (in code)
//! 2. TOML config files (config/development.toml or config/production.toml)
//! 3. Environment variables (prefix: FITLOG__)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, warn};

use crate::sync::retry::RetryConfig;

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
    pub progress: ProgressConfig,
}

/// Local persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one JSON file per domain
    pub data_dir: PathBuf,
}

/// Hosted backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub url: String,
    pub anon_key: String,
}

/// Remote reconciliation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Upper bound for a single remote call
    pub remote_timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl SyncConfig {
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }
}

/// Progress statistics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Flat burn rate applied to every logged session
    pub calories_per_minute: f64,
    /// Distinct workout days per week counted as 100% progress
    pub weekly_goal: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                data_dir: PathBuf::from("data"),
            },
            remote: RemoteConfig {
                url: "http://localhost:54321".to_string(),
                anon_key: String::new(),
            },
            sync: SyncConfig {
                remote_timeout_secs: 15,
                retry: RetryConfig::default(),
            },
            progress: ProgressConfig {
                calories_per_minute: 8.0,
                weekly_goal: 3,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    ///
    /// Loading order (later sources override earlier):
    /// 1. Default values
    /// 2. Config file based on RUST_ENV (development.toml or production.toml)
    /// 3. Environment variables with FITLOG__ prefix
    pub fn load() -> Result<Self> {
        let env = env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string());
        let config_file = format!("config/{}.toml", env);

        let config = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // Load from environment-specific config file
            .add_source(config::File::with_name(&config_file).required(false))
            // Override with environment variables (FITLOG__ prefix)
            // e.g., FITLOG__SYNC__REMOTE_TIMEOUT_SECS=30 sets sync.remote_timeout_secs
            .add_source(
                config::Environment::with_prefix("FITLOG")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Check if running in production mode
    pub fn is_production() -> bool {
        env::var("RUST_ENV")
            .map(|v| v == "production")
            .unwrap_or(false)
    }

    /// Validate configuration before the engine talks to a real backend
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.progress.weekly_goal == 0 {
            errors.push("progress.weekly_goal must be at least 1");
        }
        if !self.progress.calories_per_minute.is_finite() || self.progress.calories_per_minute < 0.0 {
            errors.push("progress.calories_per_minute must be a non-negative number");
        }
        if self.sync.remote_timeout_secs == 0 {
            errors.push("sync.remote_timeout_secs must be at least 1");
        }
        if self.sync.retry.max_attempts == 0 {
            errors.push("sync.retry.max_attempts must be at least 1");
        }

        if Self::is_production() {
            if self.remote.anon_key.is_empty() {
                errors.push("remote.anon_key is required in production");
            }
            if self.remote.url.contains("localhost") || self.remote.url.contains("127.0.0.1") {
                warn!("Remote URL contains localhost - ensure this is intentional for production");
            }
        }

        if !errors.is_empty() {
            for err in &errors {
                error!("Configuration error: {}", err);
            }
            anyhow::bail!("Invalid configuration");
        }

        Ok(())
    }
}
