//
// Copyright 2026 The AMQP-Relay Authors. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! The authoritative mapping from upstream receivers to downstream senders.

use crate::link::key::{LinkKey, SenderHandle};
use crate::link::traits::UpstreamReceiver;
use std::collections::HashMap;
use std::sync::Arc;

/// Tracks which downstream sender serves which upstream receiver.
///
/// Two maps are kept strictly consistent: the primary map from link key to
/// receiver and sender, and a secondary index from upstream connection id
/// to the keys of its receivers, in insertion order. The index makes bulk
/// teardown of a whole upstream connection a single step, and the
/// insertion order makes close notifications reproducible.
///
/// The registry itself is not synchronized; the relay guards it with its
/// state mutex so every operation is atomic with respect to the engine.
#[derive(Default)]
pub struct LinkRegistry {
    active: HashMap<LinkKey, LinkEntry>,
    by_connection: HashMap<String, Vec<LinkKey>>,
}

struct LinkEntry {
    receiver: Arc<dyn UpstreamReceiver>,
    handle: SenderHandle,
}

impl LinkRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates a downstream sender with an upstream receiver.
    ///
    /// Re-inserting under the same key replaces the sender and keeps the
    /// receiver's position in its connection list.
    pub fn insert(&mut self, receiver: Arc<dyn UpstreamReceiver>, handle: SenderHandle) {
        let key = LinkKey::for_receiver(receiver.as_ref());
        let entry = LinkEntry { receiver, handle };
        if self.active.insert(key.clone(), entry).is_none() {
            self.by_connection
                .entry(key.connection_id().to_string())
                .or_default()
                .push(key);
        }
    }

    /// Looks up the sender handle for a key.
    #[must_use]
    pub fn get(&self, key: &LinkKey) -> Option<&SenderHandle> {
        self.active.get(key).map(|entry| &entry.handle)
    }

    /// Removes the entry for a key, returning the sender handle if one
    /// was registered.
    pub fn remove(&mut self, key: &LinkKey) -> Option<SenderHandle> {
        if let Some(keys) = self.by_connection.get_mut(key.connection_id()) {
            keys.retain(|k| k != key);
            if keys.is_empty() {
                self.by_connection.remove(key.connection_id());
            }
        }
        self.active.remove(key).map(|entry| entry.handle)
    }

    /// Removes every entry belonging to an upstream connection, returning
    /// the receivers and sender handles in insertion order.
    pub fn remove_connection(
        &mut self,
        connection_id: &str,
    ) -> Vec<(Arc<dyn UpstreamReceiver>, SenderHandle)> {
        let keys = self.by_connection.remove(connection_id).unwrap_or_default();
        keys.into_iter()
            .filter_map(|key| self.active.remove(&key))
            .map(|entry| (entry.receiver, entry.handle))
            .collect()
    }

    /// Removes every entry, returning all receivers and sender handles.
    ///
    /// Entries of the same upstream connection come out in insertion
    /// order. Used when the downstream connection is lost.
    pub fn drain_all(&mut self) -> Vec<(Arc<dyn UpstreamReceiver>, SenderHandle)> {
        let connection_ids: Vec<String> = self.by_connection.keys().cloned().collect();
        let mut links = Vec::with_capacity(self.active.len());
        for connection_id in connection_ids {
            links.extend(self.remove_connection(&connection_id));
        }
        links
    }

    /// The number of active links.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether the registry holds no links.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// The number of upstream connections with at least one active link.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.by_connection.len()
    }

    #[cfg(test)]
    fn is_consistent(&self) -> bool {
        let indexed: usize = self.by_connection.values().map(Vec::len).sum();
        if indexed != self.active.len() {
            return false;
        }
        self.by_connection.iter().all(|(connection_id, keys)| {
            !keys.is_empty()
                && keys.iter().all(|key| {
                    key.connection_id() == connection_id && self.active.contains_key(key)
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryReceiver, MemorySender};

    fn receiver(connection_id: &str, link_id: &str) -> Arc<MemoryReceiver> {
        Arc::new(MemoryReceiver::new(connection_id, link_id, "telemetry/t1"))
    }

    fn handle(owner: &str) -> SenderHandle {
        SenderHandle::new(MemorySender::detached("telemetry/t1"), owner)
    }

    fn insert(registry: &mut LinkRegistry, connection_id: &str, link_id: &str) -> LinkKey {
        let receiver = receiver(connection_id, link_id);
        let key = LinkKey::for_receiver(receiver.as_ref());
        registry.insert(receiver, handle(connection_id));
        key
    }

    #[test]
    fn test_insert_and_get() {
        let mut registry = LinkRegistry::new();
        let key = insert(&mut registry, "con-a", "link-1");

        assert!(registry.get(&key).is_some());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.connection_count(), 1);
        assert!(registry.is_consistent());
    }

    #[test]
    fn test_reinsert_same_key_does_not_duplicate() {
        let mut registry = LinkRegistry::new();
        let key = insert(&mut registry, "con-a", "link-1");
        insert(&mut registry, "con-a", "link-1");

        assert_eq!(registry.len(), 1);
        assert!(registry.is_consistent());

        registry.remove(&key);
        assert!(registry.is_empty());
        assert_eq!(registry.connection_count(), 0);
        assert!(registry.is_consistent());
    }

    #[test]
    fn test_remove_returns_handle() {
        let mut registry = LinkRegistry::new();
        let key = insert(&mut registry, "con-a", "link-1");

        let handle = registry.remove(&key);
        assert!(handle.is_some());
        assert_eq!(handle.unwrap().owner(), "con-a");
        assert!(registry.remove(&key).is_none());
        assert!(registry.is_consistent());
    }

    #[test]
    fn test_remove_connection_preserves_insertion_order() {
        let mut registry = LinkRegistry::new();
        insert(&mut registry, "con-a", "link-1");
        insert(&mut registry, "con-a", "link-2");
        insert(&mut registry, "con-b", "link-1");

        let removed = registry.remove_connection("con-a");
        let link_ids: Vec<&str> = removed
            .iter()
            .map(|(receiver, _)| receiver.link_id())
            .collect();
        assert_eq!(link_ids, ["link-1", "link-2"]);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.connection_count(), 1);
        assert!(registry.is_consistent());
    }

    #[test]
    fn test_remove_connection_unknown_id_is_empty() {
        let mut registry = LinkRegistry::new();
        assert!(registry.remove_connection("nope").is_empty());
    }

    #[test]
    fn test_drain_all_empties_both_maps() {
        let mut registry = LinkRegistry::new();
        insert(&mut registry, "con-a", "link-1");
        insert(&mut registry, "con-a", "link-2");
        insert(&mut registry, "con-b", "link-1");

        let links = registry.drain_all();
        assert_eq!(links.len(), 3);
        assert!(registry.is_empty());
        assert_eq!(registry.connection_count(), 0);
        assert!(registry.is_consistent());
    }

    #[test]
    fn test_consistency_after_interleaved_mutations() {
        let mut registry = LinkRegistry::new();
        let key1 = insert(&mut registry, "con-a", "link-1");
        insert(&mut registry, "con-b", "link-1");
        registry.remove(&key1);
        insert(&mut registry, "con-a", "link-2");
        registry.remove_connection("con-b");

        assert_eq!(registry.len(), 1);
        assert!(registry.is_consistent());
    }
}
