//! One cache per shape type, built from configuration.
//!
//! `Caches` is the explicit owner of all cached state. Construct it once at
//! startup, hand out references, and call [`Caches::clear`] on teardown.

use crate::cache::{CacheStatsSnapshot, Shape, ShapeBuilder, ShapeCache};
use crate::clock::{Clock, SystemClock};
use crate::config::{CacheSettings, ShapeCacheConfig};
use crate::shapes::{Account, Auction, Listing, Trade};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Data sources for every shape type
#[derive(Clone)]
pub struct Builders {
    pub accounts: Arc<dyn ShapeBuilder<Account>>,
    pub auctions: Arc<dyn ShapeBuilder<Auction>>,
    pub trades: Arc<dyn ShapeBuilder<Trade>>,
    pub listings: Arc<dyn ShapeBuilder<Listing>>,
}

pub struct Caches {
    pub accounts: ShapeCache<Account>,
    pub auctions: ShapeCache<Auction>,
    pub trades: ShapeCache<Trade>,
    pub listings: ShapeCache<Listing>,
}

/// Stats of every cache at one point in time
#[derive(Debug, Clone, Serialize)]
pub struct RegistryStats {
    pub accounts: CacheStatsSnapshot,
    pub auctions: CacheStatsSnapshot,
    pub trades: CacheStatsSnapshot,
    pub listings: CacheStatsSnapshot,
}

fn build_cache<S: Shape>(
    name: &'static str,
    builder: Arc<dyn ShapeBuilder<S>>,
    settings: &CacheSettings,
    clock: &Arc<dyn Clock>,
) -> ShapeCache<S> {
    let eviction = settings.strategy();
    info!(cache = name, eviction = eviction.name(), "cache configured");
    ShapeCache::new(name, builder)
        .with_eviction(eviction)
        .with_clock(Arc::clone(clock))
}

impl Caches {
    pub fn new(config: &ShapeCacheConfig, builders: Builders, clock: Arc<dyn Clock>) -> Self {
        Self {
            accounts: build_cache("accounts", builders.accounts, &config.accounts, &clock),
            auctions: build_cache("auctions", builders.auctions, &config.auctions, &clock),
            trades: build_cache("trades", builders.trades, &config.trades, &clock),
            listings: build_cache("listings", builders.listings, &config.listings, &clock),
        }
    }

    /// Caches on the system clock
    pub fn with_system_clock(config: &ShapeCacheConfig, builders: Builders) -> Self {
        Self::new(config, builders, Arc::new(SystemClock))
    }

    /// Run TTL eviction on every cache; returns the number of entries removed
    pub fn sweep(&self) -> usize {
        self.accounts.sweep() + self.auctions.sweep() + self.trades.sweep() + self.listings.sweep()
    }

    /// Teardown: drop every entry, timestamp and index key
    pub fn clear(&self) {
        self.accounts.clear();
        self.auctions.clear();
        self.trades.clear();
        self.listings.clear();
        info!("all caches cleared");
    }

    pub fn len(&self) -> usize {
        self.accounts.len() + self.auctions.len() + self.trades.len() + self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            accounts: self.accounts.stats(),
            auctions: self.auctions.stats(),
            trades: self.trades.stats(),
            listings: self.listings.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::EvictionKind;
    use crate::entity::EntityHandle;
    use crate::shapes::account::AccountProfile;
    use crate::shapes::AccountGroup;
    use crate::RefreshPolicy;
    use std::time::Duration;

    /// Builds a shape with the requested handle for any non-null handle
    struct Echo;

    impl ShapeBuilder<Account> for Echo {
        fn build(&self, handle: EntityHandle) -> anyhow::Result<Option<Account>> {
            Ok(Some(Account {
                handle,
                profile: AccountProfile {
                    name: format!("player-{handle}"),
                    pfp_uri: String::new(),
                },
                ..Account::default()
            }))
        }

        fn build_group(
            &self,
            _handle: EntityHandle,
            _group: AccountGroup,
        ) -> anyhow::Result<Option<crate::shapes::AccountPatch>> {
            Ok(None)
        }
    }

    /// Knows no entities
    struct Empty;

    impl<S: Shape> ShapeBuilder<S> for Empty {
        fn build(&self, _handle: EntityHandle) -> anyhow::Result<Option<S>> {
            Ok(None)
        }

        fn build_group(
            &self,
            _handle: EntityHandle,
            _group: S::Group,
        ) -> anyhow::Result<Option<S::Patch>> {
            Ok(None)
        }
    }

    fn builders() -> Builders {
        Builders {
            accounts: Arc::new(Echo),
            auctions: Arc::new(Empty),
            trades: Arc::new(Empty),
            listings: Arc::new(Empty),
        }
    }

    #[test]
    fn test_caches_follow_config() {
        let mut config = ShapeCacheConfig::default();
        config.accounts.eviction = EvictionKind::Lru;
        config.accounts.capacity = 2;

        let clock = Arc::new(ManualClock::at_millis(1_700_000_000_000));
        let caches = Caches::new(&config, builders(), clock.clone());

        for id in 1..=3 {
            clock.advance_millis(10);
            caches.accounts.get(EntityHandle::new(id), None).unwrap();
        }
        assert_eq!(caches.accounts.len(), 2);
        assert!(caches.accounts.peek(EntityHandle::new(1)).is_none());
        assert_eq!(caches.stats().accounts.evictions, 1);
    }

    #[test]
    fn test_sweep_and_clear() {
        let mut config = ShapeCacheConfig::default();
        config.accounts.eviction = EvictionKind::Ttl;
        config.accounts.idle_ttl_seconds = 60;

        let clock = Arc::new(ManualClock::at_millis(1_700_000_000_000));
        let caches = Caches::new(&config, builders(), clock.clone());

        caches.accounts.get(EntityHandle::new(1), None).unwrap();
        caches.accounts.get(EntityHandle::new(2), None).unwrap();
        caches.auctions.get(EntityHandle::new(9), None).unwrap();
        assert_eq!(caches.len(), 3);

        clock.advance(Duration::from_secs(30));
        caches.accounts.get(EntityHandle::new(2), None).unwrap();
        clock.advance(Duration::from_secs(31));
        assert_eq!(caches.sweep(), 1);
        assert!(caches.accounts.peek(EntityHandle::new(2)).is_some());

        caches.clear();
        assert!(caches.is_empty());
        assert_eq!(caches.accounts.index_len(), 0);
    }

    #[test]
    fn test_index_survives_through_registry() {
        let clock = Arc::new(ManualClock::at_millis(1_700_000_000_000));
        let caches = Caches::new(&ShapeCacheConfig::default(), builders(), clock);

        let policy = RefreshPolicy::new().with(AccountGroup::Profile, Duration::from_secs(60));
        caches.accounts.get(EntityHandle::new(7), Some(&policy)).unwrap();
        assert_eq!(
            caches
                .accounts
                .lookup(crate::shapes::AccountIndex::Name, "player-7"),
            Some(EntityHandle::new(7))
        );

        // Unknown entities are negative-cached, never indexed
        let auction = caches.auctions.get(EntityHandle::new(9), None).unwrap();
        assert!(auction.is_null());
        assert_eq!(caches.auctions.index_len(), 0);
    }
}
