pub mod env;

use crate::cache::{EvictionStrategy, IdleTtl, Lru, Unbounded};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Complete cache configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapeCacheConfig {
    #[serde(default)]
    pub accounts: CacheSettings,
    #[serde(default)]
    pub auctions: CacheSettings,
    #[serde(default)]
    pub trades: CacheSettings,
    #[serde(default)]
    pub listings: CacheSettings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionKind {
    /// Entries live until cleared or invalidated
    #[default]
    Unbounded,
    /// Least recently used, bounded by `capacity`
    Lru,
    /// Evicted by `sweep` once idle longer than `idle_ttl_seconds`
    Ttl,
}

/// Per-cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default)]
    pub eviction: EvictionKind,
    /// Only used with `lru`
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Only used with `ttl`
    #[serde(default = "default_idle_ttl")]
    pub idle_ttl_seconds: u64,
}

fn default_capacity() -> usize {
    10_000
}

fn default_idle_ttl() -> u64 {
    600
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            eviction: EvictionKind::default(),
            capacity: default_capacity(),
            idle_ttl_seconds: default_idle_ttl(),
        }
    }
}

impl CacheSettings {
    /// Eviction strategy these settings describe
    pub fn strategy(&self) -> Box<dyn EvictionStrategy> {
        match self.eviction {
            EvictionKind::Unbounded => Box::new(Unbounded),
            EvictionKind::Lru => Box::new(Lru::new(self.capacity)),
            EvictionKind::Ttl => Box::new(IdleTtl::new(Duration::from_secs(self.idle_ttl_seconds))),
        }
    }

    fn validate(&self, section: &'static str) -> Result<(), ConfigError> {
        match self.eviction {
            EvictionKind::Lru if self.capacity == 0 => Err(ConfigError::Invalid {
                section,
                reason: "lru eviction needs a capacity of at least 1".to_string(),
            }),
            EvictionKind::Ttl if self.idle_ttl_seconds == 0 => Err(ConfigError::Invalid {
                section,
                reason: "ttl eviction needs idle_ttl_seconds of at least 1".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid [{section}] settings: {reason}")]
    Invalid {
        section: &'static str,
        reason: String,
    },
}

impl ShapeCacheConfig {
    /// Sections by their TOML name
    pub fn sections(&self) -> [(&'static str, &CacheSettings); 4] {
        [
            ("accounts", &self.accounts),
            ("auctions", &self.auctions),
            ("trades", &self.trades),
            ("listings", &self.listings),
        ]
    }

    pub(crate) fn section_mut(&mut self, name: &str) -> Option<&mut CacheSettings> {
        match name {
            "accounts" => Some(&mut self.accounts),
            "auctions" => Some(&mut self.auctions),
            "trades" => Some(&mut self.trades),
            "listings" => Some(&mut self.listings),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (section, settings) in self.sections() {
            settings.validate(section)?;
        }
        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: ShapeCacheConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> Result<ShapeCacheConfig, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    ShapeCacheConfig::from_toml(&contents)
}
