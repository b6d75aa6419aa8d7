use crate::cache::{FieldGroup, Shape};
use crate::entity::EntityHandle;
use crate::pricing::{self, Priced, PricingError, PricingKind, PricingSide, Side};
use anyhow::Context;
use serde::{Deserialize, Serialize};

/// An NPC shop listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub handle: EntityHandle,
    pub npc_index: u32,
    pub item_index: u32,
    pub pay_item: PayItem,
    /// Base value in the pay item's smallest unit
    pub value: f64,
    pub buy: Option<PricingSide>,
    pub sell: Option<PricingSide>,
    /// Units sold through the listing
    pub balance: u64,
    /// Curve start, seconds since the Unix epoch
    pub start_time: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayItem {
    pub index: u32,
    /// Token decimals; 0 for in-game items
    pub decimals: u8,
}

impl Listing {
    pub fn buy_price(&self, now: f64, amt: u64) -> Result<u64, PricingError> {
        pricing::buy_price(self, now, amt)
    }

    pub fn sell_price(&self, now: f64, amt: u64) -> Result<u64, PricingError> {
        pricing::sell_price(self, now, amt)
    }

    fn index_key(npc_index: u32, item_index: u32) -> String {
        format!("{}:{}", npc_index, item_index)
    }

    /// Key of [`ListingIndex::NpcItem`] for an NPC and item pair
    pub fn npc_item_key(npc_index: u32, item_index: u32) -> String {
        Self::index_key(npc_index, item_index)
    }
}

impl Priced for Listing {
    fn unit_value(&self) -> f64 {
        self.value / 10f64.powi(i32::from(self.pay_item.decimals))
    }

    fn sold(&self) -> f64 {
        self.balance as f64
    }

    fn start_time(&self) -> f64 {
        self.start_time as f64
    }

    fn pricing(&self, side: Side) -> Option<&PricingSide> {
        match side {
            Side::Buy => self.buy.as_ref(),
            Side::Sell => self.sell.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingGroup {
    /// Units sold
    Balance,
    /// Curve start time
    Start,
}

impl FieldGroup for ListingGroup {
    fn all() -> &'static [Self] {
        &[ListingGroup::Balance, ListingGroup::Start]
    }

    fn name(self) -> &'static str {
        match self {
            ListingGroup::Balance => "balance",
            ListingGroup::Start => "start",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingIndex {
    /// `"{npc}:{item}"`
    NpcItem,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListingPatch {
    Balance(u64),
    Start(i64),
}

impl Shape for Listing {
    type Group = ListingGroup;
    type Index = ListingIndex;
    type Patch = ListingPatch;

    fn null() -> Self {
        Listing::default()
    }

    fn handle(&self) -> EntityHandle {
        self.handle
    }

    fn index_keys(&self) -> Vec<(ListingIndex, String)> {
        vec![(
            ListingIndex::NpcItem,
            Self::index_key(self.npc_index, self.item_index),
        )]
    }

    fn apply(&mut self, patch: ListingPatch) {
        match patch {
            ListingPatch::Balance(balance) => self.balance = balance,
            ListingPatch::Start(start_time) => self.start_time = start_time,
        }
    }

    /// GDA buy curves are checked up front; unknown kinds surface at pricing time
    fn validate(&self) -> anyhow::Result<()> {
        let Some(buy) = &self.buy else {
            return Ok(());
        };
        if buy.kind() == Some(PricingKind::Gda) {
            buy.params(self.unit_value(), self.sold(), Priced::start_time(self))
                .validate()
                .with_context(|| {
                    format!(
                        "listing of item {} at npc {} has an unusable buy curve",
                        self.item_index, self.npc_index
                    )
                })?;
        }
        Ok(())
    }
}
