use crate::cache::{FieldGroup, Shape};
use crate::entity::EntityHandle;
use serde::{Deserialize, Serialize};

/// Player-to-player trade offer.
///
/// Parties are account handles; resolve them through the account cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub handle: EntityHandle,
    pub orders: TradeOrders,
    pub parties: TradeParties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeOrders {
    /// What the seller wants
    pub buy: TradeOrder,
    /// What the seller gives
    pub sell: TradeOrder,
}

/// Parallel item index / amount lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeOrder {
    pub items: Vec<u32>,
    pub amounts: Vec<u64>,
}

impl TradeOrder {
    pub fn lines(&self) -> impl Iterator<Item = (u32, u64)> + '_ {
        self.items.iter().copied().zip(self.amounts.iter().copied())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeParties {
    pub seller: EntityHandle,
    /// Only this account may take the trade, when set
    pub buyer: Option<EntityHandle>,
}

impl Trade {
    pub fn is_open_to(&self, account: EntityHandle) -> bool {
        account != self.parties.seller
            && self.parties.buyer.map_or(true, |buyer| buyer == account)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeGroup {
    Orders,
    Parties,
}

impl FieldGroup for TradeGroup {
    fn all() -> &'static [Self] {
        &[TradeGroup::Orders, TradeGroup::Parties]
    }

    fn name(self) -> &'static str {
        match self {
            TradeGroup::Orders => "orders",
            TradeGroup::Parties => "parties",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeIndex {
    Id,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TradePatch {
    Orders(TradeOrders),
    Parties(TradeParties),
}

impl Shape for Trade {
    type Group = TradeGroup;
    type Index = TradeIndex;
    type Patch = TradePatch;

    fn null() -> Self {
        Trade::default()
    }

    fn handle(&self) -> EntityHandle {
        self.handle
    }

    fn index_keys(&self) -> Vec<(TradeIndex, String)> {
        vec![(TradeIndex::Id, self.id.clone())]
    }

    fn apply(&mut self, patch: TradePatch) {
        match patch {
            TradePatch::Orders(orders) => self.orders = orders,
            TradePatch::Parties(parties) => self.parties = parties,
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        for (side, order) in [("buy", &self.orders.buy), ("sell", &self.orders.sell)] {
            if order.items.len() != order.amounts.len() {
                anyhow::bail!(
                    "trade {} {} order has {} items but {} amounts",
                    self.id,
                    side,
                    order.items.len(),
                    order.amounts.len()
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(buyer: Option<u64>) -> Trade {
        Trade {
            id: "0xt1".to_string(),
            handle: EntityHandle::new(31),
            orders: TradeOrders {
                buy: TradeOrder {
                    items: vec![1],
                    amounts: vec![500],
                },
                sell: TradeOrder {
                    items: vec![7, 8],
                    amounts: vec![1, 2],
                },
            },
            parties: TradeParties {
                seller: EntityHandle::new(11),
                buyer: buyer.map(EntityHandle::new),
            },
        }
    }

    #[test]
    fn test_open_trade() {
        let trade = trade(None);
        assert!(trade.is_open_to(EntityHandle::new(12)));
        assert!(!trade.is_open_to(EntityHandle::new(11)));
    }

    #[test]
    fn test_targeted_trade() {
        let trade = trade(Some(12));
        assert!(trade.is_open_to(EntityHandle::new(12)));
        assert!(!trade.is_open_to(EntityHandle::new(13)));
    }

    #[test]
    fn test_order_lines() {
        let lines: Vec<_> = trade(None).orders.sell.lines().collect();
        assert_eq!(lines, vec![(7, 1), (8, 2)]);
    }

    #[test]
    fn test_validate_mismatched_order() {
        let mut trade = trade(None);
        assert!(trade.validate().is_ok());
        trade.orders.sell.amounts.pop();
        assert!(trade.validate().is_err());
    }

    #[test]
    fn test_parties_patch() {
        let mut trade = trade(None);
        trade.apply(TradePatch::Parties(TradeParties {
            seller: EntityHandle::new(11),
            buyer: Some(EntityHandle::new(14)),
        }));
        assert_eq!(trade.parties.buyer, Some(EntityHandle::new(14)));
        assert_eq!(trade.orders.buy.amounts, vec![500]);
    }
}
