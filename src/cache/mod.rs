// Selective-refresh cache for derived entity shapes

mod engine;
pub mod eviction;
pub mod index;
mod stats;

pub use engine::ShapeCache;
pub use eviction::{EntryUsage, EvictionStrategy, IdleTtl, Lru, Unbounded};
pub use index::SecondaryIndex;
pub use stats::{CacheStats, CacheStatsSnapshot};

use crate::entity::EntityHandle;
use chrono::TimeDelta;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::time::Duration;
use thiserror::Error;


/// A named, independently refreshable slice of a shape.
pub trait FieldGroup: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Every group of the shape, in refresh order
    fn all() -> &'static [Self];

    fn name(self) -> &'static str;

    /// Whether refreshing this group can change the shape's index keys
    fn feeds_index(self) -> bool {
        false
    }
}

/// Derived composite view of one entity.
///
/// Static fields are set by the full build only. Dynamic fields belong to a
/// [`FieldGroup`] and are overwritten through [`Shape::apply`].
pub trait Shape: Clone + Send + Sync + 'static {
    type Group: FieldGroup;
    type Index: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;
    /// Freshly built fields of exactly one group
    type Patch: Send;

    /// The well-known sentinel for unknown entities
    fn null() -> Self;

    fn handle(&self) -> EntityHandle;

    fn is_null(&self) -> bool {
        self.handle().is_null()
    }

    /// Alternate keys this shape should be reachable under
    fn index_keys(&self) -> Vec<(Self::Index, String)>;

    /// Overwrite the slice of the shape the patch belongs to.
    fn apply(&mut self, patch: Self::Patch);

    /// Reject shapes whose contents are unusable. Runs on every full build.
    fn validate(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Reads shapes out of the world. Supplied by the application.
///
/// `Ok(None)` means the entity does not exist.
pub trait ShapeBuilder<S: Shape>: Send + Sync {
    fn build(&self, handle: EntityHandle) -> anyhow::Result<Option<S>>;

    fn build_group(
        &self,
        handle: EntityHandle,
        group: S::Group,
    ) -> anyhow::Result<Option<S::Patch>>;
}

/// Per-call freshness budget: field group -> maximum tolerated age.
///
/// Groups not named are never refreshed by the call. Budgets are signed: a
/// group is stale once `age > budget`, so a negative budget always refreshes
/// and [`TimeDelta::MAX`] never does.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshPolicy<G: FieldGroup> {
    max_age: HashMap<G, TimeDelta>,
}

impl<G: FieldGroup> RefreshPolicy<G> {
    pub fn new() -> Self {
        Self {
            max_age: HashMap::new(),
        }
    }

    /// Budgets beyond chrono's range saturate to "never stale"
    pub fn with(self, group: G, max_age: Duration) -> Self {
        let max_age = TimeDelta::from_std(max_age).unwrap_or(TimeDelta::MAX);
        self.with_delta(group, max_age)
    }

    pub fn with_delta(mut self, group: G, max_age: TimeDelta) -> Self {
        self.max_age.insert(group, max_age);
        self
    }

    /// Fractional seconds. Negative or NaN budgets always refresh; `+inf` and
    /// budgets too large to represent never do.
    pub fn with_secs(self, group: G, max_age_secs: f64) -> Self {
        self.with_delta(group, delta_from_secs(max_age_secs))
    }

    pub fn max_age(&self, group: G) -> Option<TimeDelta> {
        self.max_age.get(&group).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.max_age.is_empty()
    }

    /// Named groups in the shape's refresh order
    pub fn groups(&self) -> impl Iterator<Item = (G, TimeDelta)> + '_ {
        G::all()
            .iter()
            .filter_map(|group| self.max_age(*group).map(|age| (*group, age)))
    }
}

fn delta_from_secs(secs: f64) -> TimeDelta {
    if secs.is_nan() {
        return TimeDelta::MIN;
    }
    let nanos = secs * 1e9;
    if nanos >= i64::MAX as f64 {
        TimeDelta::MAX
    } else if nanos <= i64::MIN as f64 {
        TimeDelta::MIN
    } else {
        TimeDelta::nanoseconds(nanos as i64)
    }
}

impl<G: FieldGroup> Default for RefreshPolicy<G> {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors surfaced by [`ShapeCache`]
#[derive(Debug, Error)]
pub enum CacheError {
    /// The builder failed; cached state is unchanged for the failing scope
    #[error("failed to build {} for entity {handle}", .group.unwrap_or("shape"))]
    BuildFailure {
        handle: EntityHandle,
        /// `None` for a full build
        group: Option<&'static str>,
        #[source]
        source: anyhow::Error,
    },
}

impl CacheError {
    pub fn handle(&self) -> EntityHandle {
        match self {
            CacheError::BuildFailure { handle, .. } => *handle,
        }
    }
}
