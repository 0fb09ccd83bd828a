//! Configuration
//!
//! Explicit configuration object for the cache and data manager, replacing
//! what used to live in process-wide constants: the cache root directory
//! and the channel-prefix routing table. Supports TOML config files and
//! environment variable overrides.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Root directory under which per-channel cache directories live
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Channel-name prefix to database routing table. Keys are the part of
    /// the channel name before the first `:` (or `.` when no colon is
    /// present), e.g. `mc` for `mc:azDemandPos`.
    #[serde(default = "default_routing")]
    pub routing: HashMap<String, String>,
}

fn default_root_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("gea-cache"))
        .unwrap_or_else(|| PathBuf::from("./gea-cache"))
}

fn default_routing() -> HashMap<String, String> {
    // The standard site mapping. Not 1-to-1: several prefixes share a
    // database, which is why queries may also name the database explicitly.
    [
        ("cal", "cal"),
        ("ref", "cal"),
        ("ag", "ag"),
        ("cr", "crcs"),
        ("ec", "ecs"),
        ("gis", "gis"),
        ("gm", "gmos"),
        ("ws", "gws"),
        ("mc", "mcs"),
        ("niri", "niri"),
        ("m1", "pcs"),
        ("m2", "scs"),
        ("ao", "tcs"),
        ("oiwfs", "tcs"),
        ("pwfs1", "tcs"),
        ("pwfs2", "tcs"),
        ("tcs", "tcs"),
        ("las", "laser"),
        ("lhx", "laser"),
        ("lis", "laser"),
        ("ltcss", "laser"),
        ("bto", "bto"),
        ("nifs", "nifs"),
        ("gc", "gcal"),
        ("gnirsgate", "gnirs"),
        ("nirs", "gnirs"),
        ("tc", "gnirs"),
        ("bfo", "pr"),
        ("fps", "pr"),
        ("hbs", "pr"),
        ("pr", "pr"),
        ("ta", "sbflab"),
        ("mc1", "sbflab"),
        ("tc1", "sbflab"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            routing: default_routing(),
        }
    }
}

impl CacheConfig {
    /// Default routing table rooted at an explicit directory.
    pub fn with_root(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Default::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: CacheConfig = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration with environment variable overrides applied.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Defaults plus environment variable overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(root) = std::env::var("GEA_CACHE_ROOT") {
            self.root_dir = PathBuf::from(root);
        }
    }

    /// The routing key for a channel name: the part before the first `:`,
    /// falling back to the part before the first `.`.
    pub fn channel_prefix(channel: &str) -> &str {
        if channel.contains(':') {
            channel.split(':').next().unwrap_or(channel)
        } else {
            channel.split('.').next().unwrap_or(channel)
        }
    }

    /// The database a channel routes to, if its prefix is mapped.
    pub fn resolve_database(&self, channel: &str) -> Option<&str> {
        self.routing
            .get(Self::channel_prefix(channel))
            .map(String::as_str)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_routing_resolves_known_prefixes() {
        let config = CacheConfig::default();
        assert_eq!(config.resolve_database("mc:azDemandPos"), Some("mcs"));
        assert_eq!(config.resolve_database("tcs:currentRA"), Some("tcs"));
        assert_eq!(config.resolve_database("pwfs1:dc:seeing"), Some("tcs"));
    }

    #[test]
    fn test_dot_separated_channel() {
        let config = CacheConfig::default();
        assert_eq!(config.resolve_database("mc.VAL"), Some("mcs"));
    }

    #[test]
    fn test_unknown_prefix() {
        let config = CacheConfig::default();
        assert_eq!(config.resolve_database("nope:field"), None);
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
root_dir = "/var/cache/gea"

[routing]
mc = "mcs"
"#,
        )
        .unwrap();

        let config = CacheConfig::load(&path).unwrap();
        assert_eq!(config.root_dir, PathBuf::from("/var/cache/gea"));
        // Explicit routing replaces the default table entirely.
        assert_eq!(config.routing.len(), 1);
    }
}
