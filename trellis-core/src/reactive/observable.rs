//! Observable Maps
//!
//! [`Observable<V>`] is a string-keyed container for state whose shape is
//! only known at runtime. Each key is a separately tracked field.
//!
//! Only `get` and `set` are instrumented. Enumeration, length and removal
//! pass straight through to the underlying map without tracking or
//! triggering.
//!
//! Keys can be sealed. A sealed key rejects writes and removals with
//! [`ReactiveError::ReadOnlyField`], and nothing is triggered.

use std::collections::HashSet;
use std::fmt::{self, Debug};
use std::sync::Arc;

use indexmap::map::Entry;
use indexmap::IndexMap;
use parking_lot::RwLock;

use super::runtime::Runtime;
use super::subscriber::ContainerId;
use crate::error::{ReactiveError, Result};

/// A string-keyed reactive map.
pub struct Observable<V> {
    inner: Arc<ObservableInner<V>>,
}

struct ObservableInner<V> {
    id: ContainerId,
    state: RwLock<MapState<V>>,
}

struct MapState<V> {
    entries: IndexMap<String, V>,
    sealed: HashSet<String>,
}

impl<V> Drop for ObservableInner<V> {
    fn drop(&mut self) {
        Runtime::release_container(self.id);
    }
}

impl<V> Observable<V>
where
    V: Send + Sync + 'static,
{
    /// Wrap the given entries.
    pub fn new<K>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
    {
        let entries = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self {
            inner: Arc::new(ObservableInner {
                id: ContainerId::new(),
                state: RwLock::new(MapState {
                    entries,
                    sealed: HashSet::new(),
                }),
            }),
        }
    }

    /// Get the map's container ID.
    pub fn id(&self) -> ContainerId {
        self.inner.id
    }

    /// Read a key, tracking the read.
    ///
    /// Absent keys are tracked too, so an effect re-runs once the key is
    /// inserted.
    pub fn get(&self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        let value = self.inner.state.read().entries.get(key).cloned();
        if Runtime::is_tracking() {
            Runtime::track(self.inner.id, key.to_owned());
        }
        value
    }

    /// Write a key, inserting it if absent.
    ///
    /// Effects that read the key re-run if the stored value changed.
    /// Returns whether it changed.
    pub fn set(&self, key: impl Into<String>, value: V) -> Result<bool>
    where
        V: PartialEq,
    {
        let key = key.into();
        let changed = {
            let mut state = self.inner.state.write();
            if state.sealed.contains(&key) {
                return Err(ReactiveError::ReadOnlyField {
                    container: self.inner.id,
                    field: key,
                });
            }
            match state.entries.entry(key.clone()) {
                Entry::Occupied(mut slot) => {
                    if *slot.get() == value {
                        false
                    } else {
                        slot.insert(value);
                        true
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(value);
                    true
                }
            }
        };

        if changed {
            Runtime::trigger(self.inner.id, &key)?;
        }
        Ok(changed)
    }

    /// Make a key read-only.
    pub fn seal(&self, key: impl Into<String>) {
        self.inner.state.write().sealed.insert(key.into());
    }

    /// Whether a key is read-only.
    pub fn is_sealed(&self, key: &str) -> bool {
        self.inner.state.read().sealed.contains(key)
    }

    /// Remove a key. Not tracked and not triggered.
    pub fn remove(&self, key: &str) -> Result<Option<V>> {
        let mut state = self.inner.state.write();
        if state.sealed.contains(key) {
            return Err(ReactiveError::ReadOnlyField {
                container: self.inner.id,
                field: key.to_owned(),
            });
        }
        Ok(state.entries.shift_remove(key))
    }

    /// Keys in insertion order. Not tracked.
    pub fn keys(&self) -> Vec<String> {
        self.inner.state.read().entries.keys().cloned().collect()
    }

    /// Whether a key is present. Not tracked.
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.state.read().entries.contains_key(key)
    }

    /// Number of entries. Not tracked.
    pub fn len(&self) -> usize {
        self.inner.state.read().entries.len()
    }

    /// Whether the map is empty. Not tracked.
    pub fn is_empty(&self) -> bool {
        self.inner.state.read().entries.is_empty()
    }

    /// Clone all entries without tracking.
    pub fn snapshot(&self) -> IndexMap<String, V>
    where
        V: Clone,
    {
        self.inner.state.read().entries.clone()
    }
}

impl<V> Default for Observable<V>
where
    V: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(std::iter::empty::<(String, V)>())
    }
}

impl<V> Clone for Observable<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Debug for Observable<V>
where
    V: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("Observable")
            .field("id", &self.inner.id)
            .field("entries", &state.entries)
            .field("sealed", &state.sealed)
            .finish()
    }
}
