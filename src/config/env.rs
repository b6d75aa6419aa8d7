//! Environment overrides.
//!
//! `SHAPECACHE_<SECTION>_<KEY>` replaces a single setting, e.g.
//! `SHAPECACHE_ACCOUNTS_CAPACITY=5000` or `SHAPECACHE_TRADES_EVICTION=ttl`.
//! Values that fail to parse are ignored with a warning.

use super::{ConfigError, EvictionKind, ShapeCacheConfig};
use tracing::warn;

const PREFIX: &str = "SHAPECACHE";

const SECTIONS: [&str; 4] = ["accounts", "auctions", "trades", "listings"];

impl ShapeCacheConfig {
    /// Apply overrides from the process environment, then re-validate
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup, then re-validate
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        for section in SECTIONS {
            let upper = section.to_ascii_uppercase();
            let Some(settings) = self.section_mut(section) else {
                continue;
            };

            let key = format!("{PREFIX}_{upper}_EVICTION");
            if let Some(v) = lookup(&key) {
                match parse_eviction(&v) {
                    Some(kind) => settings.eviction = kind,
                    None => warn!(key = %key, value = %v, "ignoring unknown eviction kind"),
                }
            }

            let key = format!("{PREFIX}_{upper}_CAPACITY");
            if let Some(v) = lookup(&key) {
                match v.trim().parse::<usize>() {
                    Ok(n) => settings.capacity = n,
                    Err(e) => warn!(key = %key, value = %v, error = %e, "ignoring override"),
                }
            }

            let key = format!("{PREFIX}_{upper}_IDLE_TTL_SECONDS");
            if let Some(v) = lookup(&key) {
                match v.trim().parse::<u64>() {
                    Ok(n) => settings.idle_ttl_seconds = n,
                    Err(e) => warn!(key = %key, value = %v, error = %e, "ignoring override"),
                }
            }
        }

        self.validate()
    }
}

fn parse_eviction(value: &str) -> Option<EvictionKind> {
    match value.trim().to_ascii_lowercase().as_str() {
        "unbounded" => Some(EvictionKind::Unbounded),
        "lru" => Some(EvictionKind::Lru),
        "ttl" => Some(EvictionKind::Ttl),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_overrides_apply_per_section() {
        let mut config = ShapeCacheConfig::default();
        config
            .apply_overrides(env(&[
                ("SHAPECACHE_ACCOUNTS_EVICTION", "LRU"),
                ("SHAPECACHE_ACCOUNTS_CAPACITY", "250"),
                ("SHAPECACHE_TRADES_EVICTION", "ttl"),
                ("SHAPECACHE_TRADES_IDLE_TTL_SECONDS", "45"),
            ]))
            .unwrap();

        assert_eq!(config.accounts.eviction, EvictionKind::Lru);
        assert_eq!(config.accounts.capacity, 250);
        assert_eq!(config.trades.eviction, EvictionKind::Ttl);
        assert_eq!(config.trades.idle_ttl_seconds, 45);
        assert_eq!(config.listings, ShapeCacheConfig::default().listings);
    }

    #[test]
    fn test_bad_values_are_ignored() {
        let mut config = ShapeCacheConfig::default();
        config
            .apply_overrides(env(&[
                ("SHAPECACHE_AUCTIONS_CAPACITY", "lots"),
                ("SHAPECACHE_AUCTIONS_EVICTION", "fifo"),
            ]))
            .unwrap();
        assert_eq!(config, ShapeCacheConfig::default());
    }

    #[test]
    fn test_override_result_is_validated() {
        let mut config = ShapeCacheConfig::default();
        let err = config
            .apply_overrides(env(&[
                ("SHAPECACHE_LISTINGS_EVICTION", "lru"),
                ("SHAPECACHE_LISTINGS_CAPACITY", "0"),
            ]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { section: "listings", .. }));
    }
}
