use crate::cache::{FieldGroup, Shape};
use crate::entity::EntityHandle;
use serde::{Deserialize, Serialize};

/// Player account as seen by the client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// World-level entity id
    pub id: String,
    pub handle: EntityHandle,
    /// Registry index of the account
    pub index: u32,
    pub owner_address: String,
    pub operator_address: String,
    /// Farcaster id, 0 when unlinked
    pub fid: u64,
    /// Creation time, seconds since the Unix epoch
    pub created_at: i64,

    pub profile: AccountProfile,
    pub live: AccountLive,
    pub friends: AccountFriends,
    pub inventories: Vec<InventorySlot>,
    pub stats: AccountStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub name: String,
    pub pfp_uri: String,
}

/// Fields that move every few seconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountLive {
    pub room_index: u32,
    /// Last action of any kind
    pub last_time: i64,
    /// Last standard action
    pub action_time: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountFriends {
    pub accepted: Vec<EntityHandle>,
    pub incoming: Vec<EntityHandle>,
    pub outgoing: Vec<EntityHandle>,
    pub blocked: Vec<EntityHandle>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventorySlot {
    pub item_index: u32,
    pub balance: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountStats {
    pub kills: u64,
    pub coin: u64,
}

impl Account {
    /// Seconds since the account last did anything
    pub fn idle_seconds(&self, now: i64) -> i64 {
        (now - self.live.last_time).max(0)
    }

    pub fn balance_of(&self, item_index: u32) -> u64 {
        self.inventories
            .iter()
            .filter(|slot| slot.item_index == item_index)
            .map(|slot| slot.balance)
            .sum()
    }

    pub fn is_friend(&self, other: EntityHandle) -> bool {
        self.friends.accepted.contains(&other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountGroup {
    Live,
    Profile,
    Friends,
    Inventories,
    Stats,
}

impl FieldGroup for AccountGroup {
    fn all() -> &'static [Self] {
        &[
            AccountGroup::Live,
            AccountGroup::Profile,
            AccountGroup::Friends,
            AccountGroup::Inventories,
            AccountGroup::Stats,
        ]
    }

    fn name(self) -> &'static str {
        match self {
            AccountGroup::Live => "live",
            AccountGroup::Profile => "profile",
            AccountGroup::Friends => "friends",
            AccountGroup::Inventories => "inventories",
            AccountGroup::Stats => "stats",
        }
    }

    fn feeds_index(self) -> bool {
        matches!(self, AccountGroup::Profile)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountIndex {
    Name,
    Operator,
    Owner,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AccountPatch {
    Live(AccountLive),
    Profile(AccountProfile),
    Friends(AccountFriends),
    Inventories(Vec<InventorySlot>),
    Stats(AccountStats),
}

impl Shape for Account {
    type Group = AccountGroup;
    type Index = AccountIndex;
    type Patch = AccountPatch;

    fn null() -> Self {
        Account::default()
    }

    fn handle(&self) -> EntityHandle {
        self.handle
    }

    fn index_keys(&self) -> Vec<(AccountIndex, String)> {
        vec![
            (AccountIndex::Name, self.profile.name.clone()),
            (AccountIndex::Operator, self.operator_address.clone()),
            (AccountIndex::Owner, self.owner_address.clone()),
        ]
    }

    fn apply(&mut self, patch: AccountPatch) {
        match patch {
            AccountPatch::Live(live) => self.live = live,
            AccountPatch::Profile(profile) => self.profile = profile,
            AccountPatch::Friends(friends) => self.friends = friends,
            AccountPatch::Inventories(inventories) => self.inventories = inventories,
            AccountPatch::Stats(stats) => self.stats = stats,
        }
    }
}
