use crate::cache::{FieldGroup, Shape};
use crate::entity::EntityHandle;
use crate::pricing::{self, PricingError, PricingParams};
use anyhow::Context;
use serde::{Deserialize, Serialize};

/// A unidirectional GDA selling one item for another
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Auction {
    pub id: String,
    pub handle: EntityHandle,
    /// Item being auctioned
    pub item_index: u32,
    /// Item paid with
    pub pay_item_index: u32,
    pub curve: AuctionCurve,
    pub supply: AuctionSupply,
    pub time: AuctionTime,
}

/// Registry-level curve parameters; set once
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuctionCurve {
    pub value: f64,
    pub period: f64,
    pub decay: f64,
    pub rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuctionSupply {
    /// Units sold since the last reset
    pub sold: u64,
    /// Cap on units sold per reset
    pub total: u64,
}

/// Seconds since the Unix epoch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuctionTime {
    pub start: i64,
    pub reset: i64,
}

impl Auction {
    pub fn pricing_params(&self) -> PricingParams {
        PricingParams {
            value: self.curve.value,
            period: self.curve.period,
            decay: self.curve.decay,
            rate: self.curve.rate,
            sold: self.supply.sold as f64,
            start_time: self.time.start as f64,
        }
    }

    /// Cost of buying `amt` units at `now` (seconds)
    pub fn buy_price(&self, now: f64, amt: u64) -> Result<u64, PricingError> {
        pricing::gda_buy_price(&self.pricing_params(), now, amt)
    }

    /// Units left before the supply cap
    pub fn remaining(&self) -> u64 {
        self.supply.total.saturating_sub(self.supply.sold)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuctionGroup {
    /// Units sold
    Supply,
    /// Curve start and reset times
    Reset,
}

impl FieldGroup for AuctionGroup {
    fn all() -> &'static [Self] {
        &[AuctionGroup::Supply, AuctionGroup::Reset]
    }

    fn name(self) -> &'static str {
        match self {
            AuctionGroup::Supply => "supply",
            AuctionGroup::Reset => "reset",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuctionIndex {
    /// Auctioned item index
    Item,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuctionPatch {
    Supply { sold: u64 },
    Reset(AuctionTime),
}

impl Shape for Auction {
    type Group = AuctionGroup;
    type Index = AuctionIndex;
    type Patch = AuctionPatch;

    fn null() -> Self {
        Auction::default()
    }

    fn handle(&self) -> EntityHandle {
        self.handle
    }

    fn index_keys(&self) -> Vec<(AuctionIndex, String)> {
        vec![(AuctionIndex::Item, self.item_index.to_string())]
    }

    fn apply(&mut self, patch: AuctionPatch) {
        match patch {
            AuctionPatch::Supply { sold } => self.supply.sold = sold,
            AuctionPatch::Reset(time) => self.time = time,
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        self.pricing_params()
            .validate()
            .with_context(|| format!("auction for item {} has an unusable curve", self.item_index))
    }
}
