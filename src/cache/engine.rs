use super::eviction::{EntryUsage, EvictionStrategy, Unbounded};
use super::index::SecondaryIndex;
use super::stats::{CacheStats, CacheStatsSnapshot};
use super::{CacheError, FieldGroup, RefreshPolicy, Shape, ShapeBuilder};
use crate::clock::{Clock, SystemClock};
use crate::entity::EntityHandle;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One cached shape plus its staleness registry
struct CacheEntry<S: Shape> {
    shape: Arc<S>,
    /// Last successful refresh per field group; absent means infinitely stale
    refreshed: HashMap<S::Group, DateTime<Utc>>,
    inserted: DateTime<Utc>,
    last_access: DateTime<Utc>,
    /// Cache-wide access counter at the last fill or hit
    access_seq: u64,
}

impl<S: Shape> CacheEntry<S> {
    fn new(shape: Arc<S>, now: DateTime<Utc>, access_seq: u64) -> Self {
        Self {
            shape,
            refreshed: S::Group::all().iter().map(|group| (*group, now)).collect(),
            inserted: now,
            last_access: now,
            access_seq,
        }
    }

    /// `age > max_age`, strictly
    fn is_stale(&self, group: S::Group, max_age: TimeDelta, now: DateTime<Utc>) -> bool {
        match self.refreshed.get(&group) {
            Some(refreshed) => now.signed_duration_since(*refreshed) > max_age,
            None => true,
        }
    }

    fn usage(&self, handle: EntityHandle) -> EntryUsage {
        EntryUsage {
            handle,
            inserted: self.inserted,
            last_access: self.last_access,
            access_seq: self.access_seq,
        }
    }
}

/// Selective-refresh cache for one shape type.
///
/// Shapes are built once on a miss and served from memory afterwards. Callers
/// name the field groups they care about in a [`RefreshPolicy`]; only those groups
/// whose age exceeds the caller's budget are rebuilt.
///
/// Snapshots are handed out as `Arc<S>`. A refresh swaps in a new `Arc`, so a
/// snapshot a caller already holds never changes under it.
pub struct ShapeCache<S: Shape> {
    name: &'static str,

    /// Concurrent map; each entry's write guard serializes its refreshes
    entries: DashMap<EntityHandle, CacheEntry<S>>,

    index: SecondaryIndex<S::Index>,

    builder: Arc<dyn ShapeBuilder<S>>,

    eviction: Box<dyn EvictionStrategy>,

    clock: Arc<dyn Clock>,

    /// Shared sentinel returned for the null handle and unknown entities
    null: Arc<S>,

    stats: CacheStats,

    /// Orders accesses that share a timestamp
    access_seq: AtomicU64,
}

impl<S: Shape> ShapeCache<S> {
    /// Create an unbounded cache on the system clock
    pub fn new(name: &'static str, builder: Arc<dyn ShapeBuilder<S>>) -> Self {
        Self {
            name,
            entries: DashMap::new(),
            index: SecondaryIndex::new(),
            builder,
            eviction: Box::new(Unbounded),
            clock: Arc::new(SystemClock),
            null: Arc::new(S::null()),
            stats: CacheStats::new(),
            access_seq: AtomicU64::new(0),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_eviction(mut self, eviction: Box<dyn EvictionStrategy>) -> Self {
        self.eviction = eviction;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Get the shape for `handle`, refreshing the groups `policy` finds stale.
    ///
    /// The null handle bypasses the cache and always yields the sentinel. Unknown
    /// entities yield the sentinel too; check [`Shape::is_null`].
    pub fn get(
        &self,
        handle: EntityHandle,
        policy: Option<&RefreshPolicy<S::Group>>,
    ) -> Result<Arc<S>, CacheError> {
        if handle.is_null() {
            return Ok(Arc::clone(&self.null));
        }

        let shape = match self.touch(handle) {
            Some(shape) => {
                self.stats.record_hit();
                shape
            }
            None => {
                self.stats.record_miss();
                self.fill(handle)?
            }
        };

        match policy {
            Some(policy) if !policy.is_empty() && !shape.is_null() => {
                self.refresh(handle, shape, policy)
            }
            _ => Ok(shape),
        }
    }

    /// Resolve `key` through the secondary index, then [`ShapeCache::get`].
    ///
    /// `Ok(None)` means no handle is known under that key yet.
    pub fn get_by_index(
        &self,
        kind: S::Index,
        key: &str,
        policy: Option<&RefreshPolicy<S::Group>>,
    ) -> Result<Option<Arc<S>>, CacheError> {
        match self.index.lookup(kind, key) {
            Some(handle) => self.get(handle, policy).map(Some),
            None => Ok(None),
        }
    }

    pub fn lookup(&self, kind: S::Index, key: &str) -> Option<EntityHandle> {
        self.index.lookup(kind, key)
    }

    /// Stored snapshot, if any. Never builds, refreshes or counts as an access.
    pub fn peek(&self, handle: EntityHandle) -> Option<Arc<S>> {
        self.entries
            .get(&handle)
            .map(|entry| Arc::clone(&entry.shape))
    }

    pub fn last_refreshed(&self, handle: EntityHandle, group: S::Group) -> Option<DateTime<Utc>> {
        self.entries
            .get(&handle)
            .and_then(|entry| entry.refreshed.get(&group).copied())
    }

    /// Drop the cached shape, its timestamps and its index entries
    pub fn invalidate(&self, handle: EntityHandle) -> bool {
        match self.entries.remove(&handle) {
            Some((_, entry)) => {
                self.index.remove(handle, &entry.shape.index_keys());
                debug!(cache = self.name, handle = %handle, "Invalidated shape");
                true
            }
            None => false,
        }
    }

    /// Run the eviction strategy against the current population
    pub fn sweep(&self) -> usize {
        self.evict(self.clock.now())
    }

    /// Teardown: drop every entry and index key
    pub fn clear(&self) {
        let entries = self.entries.len();
        self.entries.clear();
        self.index.clear();
        info!(cache = self.name, entries, "Cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot(self.entries.len(), self.clock.now())
    }

    fn next_access(&self) -> u64 {
        self.access_seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Hit path: bump access time and hand out the current snapshot
    fn touch(&self, handle: EntityHandle) -> Option<Arc<S>> {
        let now = self.clock.now();
        self.entries.get_mut(&handle).map(|mut entry| {
            entry.last_access = now;
            entry.access_seq = self.next_access();
            Arc::clone(&entry.shape)
        })
    }

    /// Miss path: full build, then store (or keep a concurrent winner)
    fn fill(&self, handle: EntityHandle) -> Result<Arc<S>, CacheError> {
        let built = self
            .builder
            .build(handle)
            .and_then(|built| {
                if let Some(shape) = &built {
                    shape.validate()?;
                }
                Ok(built)
            })
            .map_err(|source| {
                self.stats.record_failure();
                CacheError::BuildFailure {
                    handle,
                    group: None,
                    source,
                }
            })?;

        let shape = match built {
            Some(shape) => Arc::new(shape),
            None => {
                debug!(cache = self.name, handle = %handle, "Entity not found, caching sentinel");
                Arc::clone(&self.null)
            }
        };

        let now = self.clock.now();
        let stored = match self.entries.entry(handle) {
            Entry::Occupied(existing) => Arc::clone(&existing.get().shape),
            Entry::Vacant(slot) => {
                if !shape.is_null() {
                    self.index.replace(handle, &[], &shape.index_keys());
                }
                slot.insert(CacheEntry::new(Arc::clone(&shape), now, self.next_access()));
                debug!(cache = self.name, handle = %handle, "Filled shape");
                shape
            }
        };

        if self.eviction.is_bounded() {
            self.evict(now);
        }

        Ok(stored)
    }

    /// Rebuild the policy's stale groups and swap in the patched shape.
    ///
    /// Groups are rebuilt in [`FieldGroup::all`] order. On a group failure the
    /// groups built before it are still committed; the failing one is untouched.
    fn refresh(
        &self,
        handle: EntityHandle,
        current: Arc<S>,
        policy: &RefreshPolicy<S::Group>,
    ) -> Result<Arc<S>, CacheError> {
        let now = self.clock.now();
        let stale: Vec<S::Group> = match self.entries.get(&handle) {
            Some(entry) => policy
                .groups()
                .filter(|(group, max_age)| entry.is_stale(*group, *max_age, now))
                .map(|(group, _)| group)
                .collect(),
            None => return Ok(current),
        };
        if stale.is_empty() {
            return Ok(current);
        }

        // Builders run without any cache lock held
        let mut patches = Vec::with_capacity(stale.len());
        let mut failure = None;
        for group in stale {
            match self.builder.build_group(handle, group) {
                Ok(Some(patch)) => patches.push((group, patch)),
                Ok(None) => {
                    warn!(
                        cache = self.name,
                        handle = %handle,
                        group = group.name(),
                        "Entity vanished during refresh, keeping cached group"
                    );
                }
                Err(source) => {
                    self.stats.record_failure();
                    failure = Some(CacheError::BuildFailure {
                        handle,
                        group: Some(group.name()),
                        source,
                    });
                    break;
                }
            }
        }

        let shape = self.commit(handle, patches, now).unwrap_or(current);
        match failure {
            Some(err) => Err(err),
            None => Ok(shape),
        }
    }

    /// Copy-and-swap under the entry's write guard
    fn commit(
        &self,
        handle: EntityHandle,
        patches: Vec<(S::Group, S::Patch)>,
        now: DateTime<Utc>,
    ) -> Option<Arc<S>> {
        let mut entry = self.entries.get_mut(&handle)?;
        if patches.is_empty() {
            return Some(Arc::clone(&entry.shape));
        }

        let previous = Arc::clone(&entry.shape);
        let mut next = S::clone(&previous);
        let mut reindex = false;
        for (group, patch) in patches {
            next.apply(patch);
            entry.refreshed.insert(group, now);
            reindex |= group.feeds_index();
            self.stats.record_refresh();
            debug!(cache = self.name, handle = %handle, group = group.name(), "Refreshed field group");
        }

        let next = Arc::new(next);
        if reindex {
            self.index
                .replace(handle, &previous.index_keys(), &next.index_keys());
        }
        entry.shape = Arc::clone(&next);
        Some(next)
    }

    fn evict(&self, now: DateTime<Utc>) -> usize {
        let usage: Vec<EntryUsage> = self
            .entries
            .iter()
            .map(|entry| entry.value().usage(*entry.key()))
            .collect();
        let victims = self.eviction.victims(&usage, now);
        if victims.is_empty() {
            return 0;
        }

        let evicted = victims
            .into_iter()
            .filter(|handle| self.invalidate(*handle))
            .count();
        self.stats.record_evictions(evicted);
        debug!(
            cache = self.name,
            strategy = self.eviction.name(),
            evicted,
            "Evicted shapes"
        );
        evicted
    }
}
