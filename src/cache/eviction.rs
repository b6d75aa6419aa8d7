//! Pluggable eviction strategies.
//!
//! A strategy only picks victims; the cache removes them together with their
//! timestamps and index entries.

use crate::entity::EntityHandle;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// What a strategy gets to see about one cached entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryUsage {
    pub handle: EntityHandle,
    pub inserted: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
    /// Strictly increasing per access within one cache; breaks timestamp ties
    pub access_seq: u64,
}

pub trait EvictionStrategy: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Entries to evict, given the current population
    fn victims(&self, usage: &[EntryUsage], now: DateTime<Utc>) -> Vec<EntityHandle>;

    /// `false` lets the cache skip collecting usage after every fill
    fn is_bounded(&self) -> bool {
        true
    }
}

/// Never evicts. Entries live until invalidated or the cache is cleared.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unbounded;

impl EvictionStrategy for Unbounded {
    fn name(&self) -> &'static str {
        "unbounded"
    }

    fn victims(&self, _usage: &[EntryUsage], _now: DateTime<Utc>) -> Vec<EntityHandle> {
        Vec::new()
    }

    fn is_bounded(&self) -> bool {
        false
    }
}

/// Keeps at most `capacity` entries, evicting the least recently accessed.
#[derive(Debug, Clone, Copy)]
pub struct Lru {
    capacity: usize,
}

impl Lru {
    /// Capacity is at least one
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl EvictionStrategy for Lru {
    fn name(&self) -> &'static str {
        "lru"
    }

    fn victims(&self, usage: &[EntryUsage], _now: DateTime<Utc>) -> Vec<EntityHandle> {
        if usage.len() <= self.capacity {
            return Vec::new();
        }
        let mut ordered = usage.to_vec();
        ordered.sort_by_key(|entry| (entry.last_access, entry.access_seq));
        ordered
            .iter()
            .take(usage.len() - self.capacity)
            .map(|entry| entry.handle)
            .collect()
    }
}

/// Evicts entries not accessed for longer than `max_idle`.
#[derive(Debug, Clone, Copy)]
pub struct IdleTtl {
    max_idle: Duration,
}

impl IdleTtl {
    pub fn new(max_idle: Duration) -> Self {
        Self { max_idle }
    }
}

impl EvictionStrategy for IdleTtl {
    fn name(&self) -> &'static str {
        "ttl"
    }

    fn victims(&self, usage: &[EntryUsage], now: DateTime<Utc>) -> Vec<EntityHandle> {
        let Ok(max_idle) = chrono::Duration::from_std(self.max_idle) else {
            return Vec::new();
        };
        usage
            .iter()
            .filter(|entry| now.signed_duration_since(entry.last_access) > max_idle)
            .map(|entry| entry.handle)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn usage(handle: u64, inserted: i64, last_access: i64) -> EntryUsage {
        EntryUsage {
            handle: EntityHandle::new(handle),
            inserted: at(inserted),
            last_access: at(last_access),
            access_seq: handle,
        }
    }

    #[test]
    fn test_unbounded_never_evicts() {
        let population: Vec<_> = (1..100).map(|i| usage(i, 0, 0)).collect();
        assert!(Unbounded.victims(&population, at(1_000_000)).is_empty());
        assert!(!Unbounded.is_bounded());
    }

    #[test]
    fn test_lru_within_capacity() {
        let lru = Lru::new(3);
        let population = vec![usage(1, 0, 0), usage(2, 0, 1), usage(3, 0, 2)];
        assert!(lru.victims(&population, at(10)).is_empty());
    }

    #[test]
    fn test_lru_evicts_least_recently_accessed() {
        let lru = Lru::new(2);
        let population = vec![
            usage(1, 0, 50),
            usage(2, 10, 20),
            usage(3, 20, 30),
            usage(4, 30, 40),
        ];
        let victims = lru.victims(&population, at(100));
        assert_eq!(victims, vec![EntityHandle::new(2), EntityHandle::new(3)]);
    }

    #[test]
    fn test_lru_same_timestamp_evicts_oldest_access() {
        let lru = Lru::new(2);
        let mut population = vec![usage(5, 0, 0), usage(7, 0, 0)];
        // filled last, smallest handle
        population.push(EntryUsage {
            access_seq: 9,
            ..usage(1, 0, 0)
        });
        let victims = lru.victims(&population, at(0));
        assert_eq!(victims, vec![EntityHandle::new(5)]);
    }

    #[test]
    fn test_lru_capacity_floor() {
        assert_eq!(Lru::new(0).capacity(), 1);
    }

    #[test]
    fn test_idle_ttl_evicts_strictly_older() {
        let ttl = IdleTtl::new(Duration::from_secs(60));
        let population = vec![usage(1, 0, 0), usage(2, 0, 40), usage(3, 0, 90)];
        // entry 2 is exactly 60s idle and stays
        let victims = ttl.victims(&population, at(100));
        assert_eq!(victims, vec![EntityHandle::new(1)]);
    }
}
