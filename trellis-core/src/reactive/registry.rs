//! Dependency Registry
//!
//! Maps `(container, field)` pairs to the set of subscribers that read that
//! field during their latest run. This module is pure data: it never runs a
//! subscriber. [`Runtime`](super::Runtime) owns the process-wide instance and
//! drives it from reads and writes.
//!
//! # Layout
//!
//! - Forward index: `ContainerId -> FieldKey -> SubscriberId -> Weak<subscriber>`.
//!   Used by trigger to find who to re-run.
//! - Reverse index: `SubscriberId -> {DepKey}`. Used to prune an effect's
//!   subscriptions before it re-runs, and to count its dependencies.
//!
//! Both indexes are kept in step by every mutating method. Empty subscriber
//! sets and empty per-container maps are removed, so an entry exists only
//! while at least one subscriber depends on it.
//!
//! The registry keys on [`ContainerId`] and holds subscribers by [`Weak`]
//! reference, so it keeps neither a container nor an effect alive. An effect
//! usually owns clones of the containers it reads; holding it strongly would
//! pin those containers forever. Containers call
//! [`Runtime::release_container`](super::Runtime::release_container) when
//! their last handle drops, and effects unsubscribe when theirs does.
//! Entries whose subscriber is gone are skipped by [`subscribers`].
//!
//! [`subscribers`]: DependencyRegistry::subscribers

use std::borrow::{Borrow, Cow};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use serde::Serialize;
use smallvec::SmallVec;

use super::subscriber::{ContainerId, Subscriber, SubscriberId};

/// Name of a tracked slot within a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldKey(Cow<'static, str>);

impl FieldKey {
    /// The single field exposed by scalar cells.
    pub const VALUE: FieldKey = FieldKey(Cow::Borrowed("value"));

    /// Borrow the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for FieldKey {
    fn from(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }
}

impl From<String> for FieldKey {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl Borrow<str> for FieldKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A `(container, field)` pair: the unit of dependency tracking.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DepKey {
    /// Identity of the container.
    pub container: ContainerId,
    /// Field within the container.
    pub field: FieldKey,
}

impl DepKey {
    /// Create a new dependency key.
    pub fn new(container: ContainerId, field: impl Into<FieldKey>) -> Self {
        Self {
            container,
            field: field.into(),
        }
    }
}

/// Subscribers of one dependency entry, deduplicated by ID.
type SubscriberSet = IndexMap<SubscriberId, Weak<dyn Subscriber>>;

/// A copy of a subscriber set taken at trigger time.
pub type SubscriberSnapshot = SmallVec<[Arc<dyn Subscriber>; 4]>;

/// Size summary of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RegistryStats {
    /// Containers with at least one dependency entry.
    pub containers: usize,
    /// Live `(container, field)` entries.
    pub entries: usize,
    /// Total subscriptions across all entries.
    pub subscriptions: usize,
}

/// The dependency registry.
#[derive(Default)]
pub struct DependencyRegistry {
    containers: HashMap<ContainerId, IndexMap<FieldKey, SubscriberSet>>,
    dependencies: HashMap<SubscriberId, HashSet<DepKey>>,
}

impl DependencyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `subscriber` as depending on `(container, field)`.
    ///
    /// Returns `false` if it was already subscribed.
    pub fn subscribe(
        &mut self,
        container: ContainerId,
        field: &FieldKey,
        subscriber: &Arc<dyn Subscriber>,
    ) -> bool {
        let id = subscriber.subscriber_id();
        let set = self
            .containers
            .entry(container)
            .or_default()
            .entry(field.clone())
            .or_default();

        if set.contains_key(&id) {
            return false;
        }
        set.insert(id, Arc::downgrade(subscriber));

        self.dependencies
            .entry(id)
            .or_default()
            .insert(DepKey::new(container, field.clone()));
        true
    }

    /// Snapshot the live subscribers of `(container, field)`.
    ///
    /// Returns an empty snapshot when there is no entry. Subscribers that
    /// have been dropped are left out.
    pub fn subscribers(&self, container: ContainerId, field: &str) -> SubscriberSnapshot {
        self.containers
            .get(&container)
            .and_then(|fields| fields.get(field))
            .map(|set| set.values().filter_map(Weak::upgrade).collect())
            .unwrap_or_default()
    }

    /// Number of subscribers of `(container, field)`.
    pub fn subscriber_count(&self, container: ContainerId, field: &str) -> usize {
        self.containers
            .get(&container)
            .and_then(|fields| fields.get(field))
            .map_or(0, IndexMap::len)
    }

    /// Number of fields of `container` that have subscribers.
    pub fn tracked_fields(&self, container: ContainerId) -> usize {
        self.containers.get(&container).map_or(0, IndexMap::len)
    }

    /// Whether any entry exists for `container`.
    pub fn contains_container(&self, container: ContainerId) -> bool {
        self.containers.contains_key(&container)
    }

    /// Number of entries the subscriber is registered in.
    pub fn dependency_count(&self, id: SubscriberId) -> usize {
        self.dependencies.get(&id).map_or(0, HashSet::len)
    }

    /// The entries the subscriber is registered in, sorted.
    pub fn dependencies_of(&self, id: SubscriberId) -> Vec<DepKey> {
        let mut keys: Vec<DepKey> = self
            .dependencies
            .get(&id)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Remove every subscription held by `id`.
    ///
    /// Returns how many were removed.
    pub fn unsubscribe_all(&mut self, id: SubscriberId) -> usize {
        let Some(keys) = self.dependencies.remove(&id) else {
            return 0;
        };

        let mut removed = 0;
        for key in keys {
            let Some(fields) = self.containers.get_mut(&key.container) else {
                continue;
            };
            if let Some(set) = fields.get_mut(key.field.as_str()) {
                if set.shift_remove(&id).is_some() {
                    removed += 1;
                }
                if set.is_empty() {
                    fields.shift_remove(key.field.as_str());
                }
            }
            if fields.is_empty() {
                self.containers.remove(&key.container);
            }
        }
        removed
    }

    /// Remove every entry keyed by `container`.
    ///
    /// Returns how many subscriptions were removed.
    pub fn release_container(&mut self, container: ContainerId) -> usize {
        let Some(fields) = self.containers.remove(&container) else {
            return 0;
        };

        let mut removed = 0;
        for (field, set) in fields {
            let key = DepKey::new(container, field);
            for id in set.into_keys() {
                if let Some(keys) = self.dependencies.get_mut(&id) {
                    keys.remove(&key);
                    if keys.is_empty() {
                        self.dependencies.remove(&id);
                    }
                }
                removed += 1;
            }
        }
        removed
    }

    /// Whether the registry holds no entries.
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Summarize the registry's size.
    pub fn stats(&self) -> RegistryStats {
        let entries = self.containers.values().map(IndexMap::len).sum();
        let subscriptions = self
            .containers
            .values()
            .flat_map(IndexMap::values)
            .map(IndexMap::len)
            .sum();
        RegistryStats {
            containers: self.containers.len(),
            entries,
            subscriptions,
        }
    }
}

impl fmt::Debug for DependencyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyRegistry")
            .field("stats", &self.stats())
            .finish()
    }
}
