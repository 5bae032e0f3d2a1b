//! Binding and singleton-instance storage
//!
//! Uses DashMap so lookups during forging never block each other, and so the
//! singleton check-then-cache sequence goes through the entry API instead of
//! a racy double lookup.

use crate::descriptor::ServiceDescriptor;
use crate::key::Key;
use crate::value::Object;
use ahash::RandomState;
use dashmap::DashMap;
use std::fmt;

/// Storage backing one container: the binding map plus the singleton cache.
pub(crate) struct BindingStore {
    bindings: DashMap<Key, ServiceDescriptor, RandomState>,
    instances: DashMap<Key, Object, RandomState>,
}

impl BindingStore {
    pub fn new() -> Self {
        Self {
            bindings: DashMap::with_hasher(RandomState::new()),
            instances: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Insert a descriptor under its own interface key. Replaces any prior
    /// binding and drops the stale cached singleton for the key.
    pub fn insert(&self, descriptor: ServiceDescriptor) {
        let key = descriptor.interface().clone();
        self.instances.remove(&key);
        self.bindings.insert(key, descriptor);
    }

    /// Snapshot clone of the descriptor bound to `key`.
    pub fn descriptor(&self, key: &Key) -> Option<ServiceDescriptor> {
        self.bindings.get(key).map(|entry| entry.value().clone())
    }

    /// Edit the stored descriptor in place. Returns `None` if `key` lost its
    /// binding in the meantime.
    pub fn with_descriptor_mut<R>(
        &self,
        key: &Key,
        edit: impl FnOnce(&mut ServiceDescriptor) -> R,
    ) -> Option<R> {
        self.bindings.get_mut(key).map(|mut entry| edit(entry.value_mut()))
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.bindings.contains_key(key)
    }

    /// Cached singleton instance for `key`, if one exists.
    pub fn cached(&self, key: &Key) -> Option<Object> {
        self.instances.get(key).map(|entry| entry.value().clone())
    }

    /// Cache a freshly forged singleton. If a racing caller cached one first,
    /// that instance wins and is returned instead.
    pub fn cache(&self, key: Key, instance: Object) -> Object {
        self.instances.entry(key).or_insert(instance).clone()
    }

    /// All currently bound keys.
    pub fn keys(&self) -> Vec<Key> {
        self.bindings.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Copy the bindings and cached instances whose key passes `keep`.
    ///
    /// Descriptors are cloned as independent metadata; cached instances keep
    /// sharing their payload by reference.
    pub fn copy_filtered(&self, keep: impl Fn(&Key) -> bool) -> BindingStore {
        let copy = BindingStore::new();
        for entry in self.bindings.iter() {
            if keep(entry.key()) {
                copy.bindings.insert(entry.key().clone(), entry.value().clone());
            }
        }
        for entry in self.instances.iter() {
            if keep(entry.key()) {
                copy.instances.insert(entry.key().clone(), entry.value().clone());
            }
        }
        copy
    }
}

impl fmt::Debug for BindingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingStore")
            .field("bindings", &self.bindings.len())
            .field("cached_instances", &self.instances.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str) -> ServiceDescriptor {
        ServiceDescriptor::binding(Key::new(name), Key::new(name))
    }

    #[test]
    fn test_insert_and_lookup() {
        let store = BindingStore::new();
        assert!(!store.contains(&Key::new("a")));

        store.insert(descriptor("a"));
        assert!(store.contains(&Key::new("a")));
        assert_eq!(store.descriptor(&Key::new("a")).unwrap().interface().as_str(), "a");
    }

    #[test]
    fn test_reinsert_drops_cached_instance() {
        let store = BindingStore::new();
        store.insert(descriptor("a"));
        store.cache(Key::new("a"), Object::new("a", 1u8));
        assert!(store.cached(&Key::new("a")).is_some());

        store.insert(descriptor("a"));
        assert!(store.cached(&Key::new("a")).is_none());
    }

    #[test]
    fn test_cache_first_writer_wins() {
        let store = BindingStore::new();
        let first = store.cache(Key::new("a"), Object::new("a", 1u8));
        let second = store.cache(Key::new("a"), Object::new("a", 2u8));

        assert!(first.shares_payload(&second));
        assert_eq!(second.downcast_ref::<u8>(), Some(&1));
    }

    #[test]
    fn test_copy_filtered_splits_by_key() {
        let store = BindingStore::new();
        store.insert(descriptor("a"));
        store.insert(descriptor("b"));
        store.cache(Key::new("a"), Object::new("a", 1u8));

        let copy = store.copy_filtered(|key| key.as_str() == "a");
        assert!(copy.contains(&Key::new("a")));
        assert!(!copy.contains(&Key::new("b")));
        assert!(copy.cached(&Key::new("a")).unwrap().shares_payload(
            &store.cached(&Key::new("a")).unwrap()
        ));
    }
}
