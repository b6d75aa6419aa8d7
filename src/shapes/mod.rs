//! Concrete shapes cached by [`crate::registry::Caches`].
//!
//! Each shape pairs its fields with a field-group enum, a patch type carrying one
//! group's freshly built fields, and the index kinds it can be looked up by.

pub mod account;
pub mod auction;
pub mod listing;
pub mod trade;

pub use account::{Account, AccountGroup, AccountIndex, AccountPatch};
pub use auction::{Auction, AuctionGroup, AuctionIndex, AuctionPatch};
pub use listing::{Listing, ListingGroup, ListingIndex, ListingPatch};
pub use trade::{Trade, TradeGroup, TradeIndex, TradePatch};
