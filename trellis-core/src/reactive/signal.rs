//! Signal Implementation
//!
//! A Signal is a single-value reactive cell. It exposes exactly one tracked
//! field, `"value"`, and is keyed in the registry by its own identity, not
//! by its contents: two signals holding equal values are independent.
//!
//! # How Signals Work
//!
//! 1. When a signal is read while an effect is running, the effect is
//!    subscribed to `(signal, "value")`.
//!
//! 2. When a signal is set to a value that differs from the current one,
//!    every subscribed effect re-runs before `set` returns.
//!
//! 3. Setting a signal to a value equal to the current one does nothing.
//!
//! # Memory Layout
//!
//! Each signal consists of:
//! - A unique container ID (8 bytes)
//! - The value, behind a `RwLock`
//!
//! Subscribers live in the runtime's registry. When the last handle to a
//! signal is dropped, its registry entries are released.

use std::fmt::{self, Debug};
use std::sync::Arc;

use parking_lot::RwLock;

use super::registry::FieldKey;
use super::runtime::Runtime;
use super::subscriber::ContainerId;
use crate::error::Result;

/// A reactive signal holding a value of type T.
///
/// # Example
///
/// ```rust
/// use trellis_core::reactive::Signal;
///
/// let count = Signal::new(0);
/// assert_eq!(count.get(), 0);
///
/// // Returns whether the value changed.
/// assert!(count.set(5).unwrap());
/// assert!(!count.set(5).unwrap());
/// ```
pub struct Signal<T> {
    inner: Arc<SignalInner<T>>,
}

struct SignalInner<T> {
    id: ContainerId,
    value: RwLock<T>,
}

impl<T> Drop for SignalInner<T> {
    fn drop(&mut self) {
        Runtime::release_container(self.id);
    }
}

impl<T> Signal<T>
where
    T: Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                id: ContainerId::new(),
                value: RwLock::new(value),
            }),
        }
    }

    /// Get the signal's container ID.
    pub fn id(&self) -> ContainerId {
        self.inner.id
    }

    /// Borrow the value, tracking the read.
    ///
    /// `f` runs under the signal's read lock and must not write this signal.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let result = f(&*self.inner.value.read());
        Runtime::track(self.inner.id, FieldKey::VALUE);
        result
    }

    /// Borrow the value without tracking the read.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.inner.value.read())
    }

    /// Set a new value.
    ///
    /// If it differs from the current value, subscribers re-run before this
    /// returns. Returns whether the value changed.
    pub fn set(&self, value: T) -> Result<bool>
    where
        T: PartialEq,
    {
        let changed = {
            let mut guard = self.inner.value.write();
            if *guard == value {
                false
            } else {
                *guard = value;
                true
            }
        };

        if changed {
            Runtime::trigger(self.inner.id, FieldKey::VALUE.as_str())?;
        }
        Ok(changed)
    }

    /// Update the value using a function of the current value.
    ///
    /// The read is not tracked.
    pub fn update<F>(&self, f: F) -> Result<bool>
    where
        T: PartialEq,
        F: FnOnce(&T) -> T,
    {
        let new_value = {
            let guard = self.inner.value.read();
            f(&*guard)
        };
        self.set(new_value)
    }
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Get the current value.
    ///
    /// If called while an effect is running, the effect is subscribed.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.inner.value.read().clone()
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.read())
            .field(
                "subscriber_count",
                &Runtime::subscriber_count(self.inner.id, FieldKey::VALUE.as_str()),
            )
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
