//! Secondary indices: alternate key -> entity handle.
//!
//! Entries are derived from cached shapes only and are as fresh as the field
//! group they come from. A miss means "no handle known under that key yet".

use crate::entity::EntityHandle;
use dashmap::DashMap;
use std::hash::Hash;

pub struct SecondaryIndex<K> {
    keys: DashMap<(K, String), EntityHandle>,
}

impl<K> SecondaryIndex<K>
where
    K: Copy + Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            keys: DashMap::new(),
        }
    }

    pub fn lookup(&self, kind: K, key: &str) -> Option<EntityHandle> {
        self.keys
            .get(&(kind, key.to_string()))
            .map(|handle| *handle.value())
    }

    /// Move `handle` from its `old` keys to its `new` ones.
    ///
    /// Old keys that meanwhile point at another handle are left alone. Empty keys
    /// are never indexed.
    pub fn replace(&self, handle: EntityHandle, old: &[(K, String)], new: &[(K, String)]) {
        for stale in old.iter().filter(|key| !new.contains(key)) {
            self.keys.remove_if(stale, |_, owner| *owner == handle);
        }
        for (kind, key) in new {
            if key.is_empty() {
                continue;
            }
            self.keys.insert((*kind, key.clone()), handle);
        }
    }

    /// Drop every key in `keys` still owned by `handle`
    pub fn remove(&self, handle: EntityHandle, keys: &[(K, String)]) {
        self.replace(handle, keys, &[]);
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn clear(&self) {
        self.keys.clear();
    }
}

impl<K> Default for SecondaryIndex<K>
where
    K: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Kind {
        Name,
        Address,
    }

    fn keys(name: &str, address: &str) -> Vec<(Kind, String)> {
        vec![
            (Kind::Name, name.to_string()),
            (Kind::Address, address.to_string()),
        ]
    }

    #[test]
    fn test_insert_and_lookup() {
        let index = SecondaryIndex::new();
        let handle = EntityHandle::new(5);
        index.replace(handle, &[], &keys("alice", "0xabc"));

        assert_eq!(index.lookup(Kind::Name, "alice"), Some(handle));
        assert_eq!(index.lookup(Kind::Address, "0xabc"), Some(handle));
        assert_eq!(index.lookup(Kind::Name, "0xabc"), None);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_replace_drops_old_keys() {
        let index = SecondaryIndex::new();
        let handle = EntityHandle::new(5);
        index.replace(handle, &[], &keys("alice", "0xabc"));
        index.replace(handle, &keys("alice", "0xabc"), &keys("alicia", "0xabc"));

        assert_eq!(index.lookup(Kind::Name, "alice"), None);
        assert_eq!(index.lookup(Kind::Name, "alicia"), Some(handle));
        assert_eq!(index.lookup(Kind::Address, "0xabc"), Some(handle));
    }

    #[test]
    fn test_replace_keeps_keys_taken_over_by_others() {
        let index = SecondaryIndex::new();
        let first = EntityHandle::new(1);
        let second = EntityHandle::new(2);
        index.replace(first, &[], &keys("bob", "0x1"));
        // second entity claims the name before the first one is refreshed
        index.replace(second, &[], &keys("bob", "0x2"));
        index.replace(first, &keys("bob", "0x1"), &keys("robert", "0x1"));

        assert_eq!(index.lookup(Kind::Name, "bob"), Some(second));
        assert_eq!(index.lookup(Kind::Name, "robert"), Some(first));
    }

    #[test]
    fn test_empty_keys_not_indexed() {
        let index = SecondaryIndex::new();
        index.replace(EntityHandle::new(3), &[], &keys("", "0x3"));
        assert_eq!(index.lookup(Kind::Name, ""), None);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_remove_and_clear() {
        let index = SecondaryIndex::new();
        let handle = EntityHandle::new(9);
        index.replace(handle, &[], &keys("carol", "0x9"));
        index.remove(handle, &keys("carol", "0x9"));
        assert!(index.is_empty());

        index.replace(handle, &[], &keys("carol", "0x9"));
        index.clear();
        assert_eq!(index.lookup(Kind::Name, "carol"), None);
    }
}
