//! Identity types for the reactive system.
//!
//! A Subscriber is any computation that re-runs when state it read changes.
//! In this crate that is an [`Effect`](super::Effect), but the registry only
//! depends on the [`Subscriber`] trait.
//!
//! Containers (signals, records, observable maps) are identified by a
//! [`ContainerId`]. Two containers with equal contents are still distinct
//! tracking keys.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;

/// Unique identifier for a subscriber.
///
/// Each subscriber gets a unique ID when created. Subscriber sets are keyed
/// by this ID, so subscribing the same subscriber twice is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a state container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(u64);

impl ContainerId {
    /// Generate a new unique container ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ContainerId {
    fn default() -> Self {
        Self::new()
    }
}

/// A computation that can be re-run when one of its dependencies changes.
pub trait Subscriber: Send + Sync {
    /// Get the subscriber's unique ID.
    fn subscriber_id(&self) -> SubscriberId;

    /// Notify the subscriber that one of its dependencies changed.
    ///
    /// For effects this re-runs the callback synchronously.
    fn notify(&self) -> Result<()>;
}
