//! Configuration for rtbridged.
//!
//! Loaded once from a TOML file at startup, validated, and then treated
//! as immutable for the lifetime of the daemon. The engine never reads
//! configuration from ambient storage; everything it needs is resolved
//! into a `SyncContext` and passed down explicitly.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Default config file path.
pub const CONFIG_PATH: &str = "/etc/rtbridge/config.toml";

/// Bounds for the scheduled sync interval, in hours.
pub const MIN_SYNC_INTERVAL_HOURS: u64 = 1;
pub const MAX_SYNC_INTERVAL_HOURS: u64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Base URL of the RT instance, e.g. "https://rt.example.org".
    pub url: String,

    /// RT API token.
    pub token: String,

    /// Queue for device tickets.
    #[serde(default = "default_queue")]
    pub queue: String,

    /// Catalog for device assets.
    #[serde(default = "default_catalog")]
    pub catalog: String,

    /// Street address of the site, stamped onto tickets when set.
    #[serde(default)]
    pub address: String,

    /// Hours between full scheduled syncs.
    #[serde(default = "default_sync_interval")]
    pub sync_interval_hours: u64,

    /// Bind address of the HTTP command surface.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Where the device registry is persisted.
    #[serde(default = "default_registry_path")]
    pub registry_path: String,
}

fn default_queue() -> String {
    "Facility Management".to_string()
}

fn default_catalog() -> String {
    "General assets".to_string()
}

fn default_sync_interval() -> u64 {
    6
}

fn default_listen() -> String {
    "127.0.0.1:8095".to_string()
}

fn default_registry_path() -> String {
    "/var/lib/rtbridge/registry.json".to_string()
}

impl BridgeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        let config: Self =
            toml::from_str(&raw).with_context(|| format!("failed to parse {:?}", path))?;
        config.validate()?;
        info!(
            "configuration loaded: queue={:?} catalog={:?} interval={}h",
            config.queue, config.catalog, config.sync_interval_hours
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            bail!("config: url must not be empty");
        }
        if self.token.trim().is_empty() {
            bail!("config: token must not be empty");
        }
        if self.queue.trim().is_empty() {
            bail!("config: queue must not be empty");
        }
        if self.catalog.trim().is_empty() {
            bail!("config: catalog must not be empty");
        }
        if !(MIN_SYNC_INTERVAL_HOURS..=MAX_SYNC_INTERVAL_HOURS).contains(&self.sync_interval_hours)
        {
            bail!(
                "config: sync_interval_hours must be between {MIN_SYNC_INTERVAL_HOURS} and {MAX_SYNC_INTERVAL_HOURS}, got {}",
                self.sync_interval_hours
            );
        }
        Ok(())
    }

    /// Resolve the immutable context the engine runs against.
    pub fn context(&self) -> SyncContext {
        SyncContext {
            queue: self.queue.clone(),
            catalog: self.catalog.clone(),
            address: self.address.clone(),
        }
    }
}

/// The read-only slice of configuration the reconciliation engine sees.
/// Resolved once per connection and injected into every operation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncContext {
    pub queue: String,
    pub catalog: String,
    pub address: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let config: BridgeConfig = toml::from_str(
            "url = \"https://rt.example.org\"\ntoken = \"secret\"\n",
        )
        .unwrap();
        assert_eq!(config.queue, "Facility Management");
        assert_eq!(config.catalog, "General assets");
        assert_eq!(config.sync_interval_hours, 6);
        assert!(config.address.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn test_interval_bounds() {
        let mut config: BridgeConfig = toml::from_str(
            "url = \"https://rt.example.org\"\ntoken = \"secret\"\n",
        )
        .unwrap();

        config.sync_interval_hours = 0;
        assert!(config.validate().is_err());

        config.sync_interval_hours = 25;
        assert!(config.validate().is_err());

        config.sync_interval_hours = 1;
        assert!(config.validate().is_ok());
        config.sync_interval_hours = 24;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_token_rejected() {
        let config: BridgeConfig =
            toml::from_str("url = \"https://rt.example.org\"\ntoken = \"\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_context_carries_connection_slice() {
        let mut config: BridgeConfig = toml::from_str(
            "url = \"https://rt.example.org\"\ntoken = \"secret\"\n",
        )
        .unwrap();
        config.address = "Hauptgasse 1".to_string();
        let ctx = config.context();
        assert_eq!(ctx.queue, "Facility Management");
        assert_eq!(ctx.address, "Hauptgasse 1");
    }
}
