//! Configuration loading and tenant registry entries
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Per-user config file (`~/.config/epinet/config.toml`)
//! 4. Compiled defaults (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "EPINET_CONFIG";

/// Complete service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub warming: WarmingConfig,
    pub graph: GraphConfig,
    /// Tenant registry: id → status and database location
    pub tenants: Vec<TenantEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5790,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing level when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Bin warming parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmingConfig {
    /// Full backfill window, in hours (including the current hour)
    pub window_hours: u32,
    /// Batch span used when the volume estimate exceeds the threshold
    pub batch_hours: u32,
    /// Estimated event count above which backfill is batched
    pub batch_threshold_events: i64,
    /// TTL for the still-accumulating current hour
    pub current_hour_ttl_secs: u64,
    /// TTL for fully elapsed hours
    pub past_hour_ttl_secs: u64,
    /// Tenants warmed at the same time by `warm_all_tenants`
    pub max_concurrent_tenants: usize,
    /// Maintenance loop period
    pub refresh_interval_secs: u64,
    /// Run a full warm of every active tenant at startup
    pub warm_on_startup: bool,
}

impl Default for WarmingConfig {
    fn default() -> Self {
        Self {
            window_hours: 672,
            batch_hours: 168,
            batch_threshold_events: 10_000,
            current_hour_ttl_secs: 15 * 60,
            past_hour_ttl_secs: 24 * 60 * 60,
            max_concurrent_tenants: 4,
            refresh_interval_secs: 300,
            warm_on_startup: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Lookback used when a graph request names no explicit range
    pub default_lookback_hours: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            default_lookback_hours: 168,
        }
    }
}

/// Tenant activation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Inactive,
}

/// One tenant registry entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantEntry {
    pub id: String,
    pub status: TenantStatus,
    /// Path to the tenant's SQLite database
    pub database: PathBuf,
}

impl TomlConfig {
    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the warming engine cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.warming.window_hours == 0 {
            return Err(Error::Config("warming.window_hours must be positive".to_string()));
        }
        if self.warming.batch_hours == 0 {
            return Err(Error::Config("warming.batch_hours must be positive".to_string()));
        }
        if self.warming.max_concurrent_tenants == 0 {
            return Err(Error::Config(
                "warming.max_concurrent_tenants must be positive".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for tenant in &self.tenants {
            if tenant.id.trim().is_empty() {
                return Err(Error::Config("Tenant id must not be empty".to_string()));
            }
            if !seen.insert(tenant.id.as_str()) {
                return Err(Error::Config(format!("Duplicate tenant id: {}", tenant.id)));
            }
        }
        Ok(())
    }
}

/// Resolve the config file path following the priority order above
///
/// Returns `None` when no file is configured, in which case compiled
/// defaults apply.
pub fn resolve_config_path(cli_arg: Option<&str>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(PathBuf::from(path));
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: per-user config file, only when present
    dirs::config_dir()
        .map(|d| d.join("epinet").join("config.toml"))
        .filter(|p| p.exists())
}

/// Load configuration from `path`, or compiled defaults when `None`
pub fn load_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        info!("No config file found, using compiled defaults");
        return Ok(TomlConfig::default());
    };

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = TomlConfig::from_toml_str(&content)?;
    debug!(
        path = %path.display(),
        tenants = config.tenants.len(),
        "Loaded configuration"
    );
    Ok(config)
}
