// Entity handles used as cache keys
pub mod entity;

// Injectable time source
pub mod clock;

// Selective-refresh cache, secondary indices and eviction
pub mod cache;

// GDA and fixed/scaled pricing
pub mod pricing;

// Concrete shapes: accounts, auctions, trades, NPC listings
pub mod shapes;

// TOML configuration
pub mod config;

// Composition root owning one cache per shape type
pub mod registry;

pub use cache::{CacheError, RefreshPolicy, ShapeBuilder, ShapeCache};
pub use entity::EntityHandle;
