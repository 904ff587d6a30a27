//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects containers and
//! effects. It owns the process-wide [`DependencyRegistry`] and implements
//! the two protocols every container goes through:
//!
//! 1. **Track**: a read calls [`Runtime::track`]. If an effect is active on
//!    this thread, it is subscribed to `(container, field)`.
//!
//! 2. **Trigger**: a write that changed a value calls [`Runtime::trigger`].
//!    The runtime snapshots the subscribers of `(container, field)` and
//!    re-runs each one synchronously, before the write returns.
//!
//! # Thread Safety
//!
//! The registry sits behind a global mutex. The context stack and the
//! [`RuntimeConfig`] are thread-local. The registry lock is never held
//! while a subscriber runs or is dropped: trigger upgrades the subscriber
//! set into a snapshot under the lock and releases it before running.

use std::cell::Cell;
use std::sync::OnceLock;

use parking_lot::Mutex;
use tracing::{debug, error, trace};

use super::context::ReactiveContext;
use super::registry::{DepKey, DependencyRegistry, FieldKey, RegistryStats};
use super::subscriber::{ContainerId, SubscriberId};
use crate::config::{ErrorPolicy, RuntimeConfig};
use crate::error::Result;

static REGISTRY: OnceLock<Mutex<DependencyRegistry>> = OnceLock::new();

thread_local! {
    static CONFIG: Cell<RuntimeConfig> = Cell::new(RuntimeConfig::default());
}

fn registry() -> &'static Mutex<DependencyRegistry> {
    REGISTRY.get_or_init(|| Mutex::new(DependencyRegistry::new()))
}

/// The global reactive runtime.
pub struct Runtime;

impl Runtime {
    /// Install a configuration for the current thread.
    pub fn configure(config: RuntimeConfig) {
        debug!(?config, "runtime configured");
        CONFIG.with(|cell| cell.set(config));
    }

    /// The configuration in effect on the current thread.
    pub fn config() -> RuntimeConfig {
        CONFIG.with(Cell::get)
    }

    /// Record that the active effect depends on `(container, field)`.
    ///
    /// No-op when no effect is active or it is already subscribed.
    /// Returns whether a new subscription was created.
    pub fn track(container: ContainerId, field: impl Into<FieldKey>) -> bool {
        let Some(subscriber) = ReactiveContext::current() else {
            return false;
        };

        let field = field.into();
        let added = registry().lock().subscribe(container, &field, &subscriber);
        if added {
            trace!(
                container = container.raw(),
                field = %field,
                subscriber = subscriber.subscriber_id().raw(),
                "tracked dependency"
            );
        }
        added
    }

    /// Re-run every subscriber of `(container, field)`.
    ///
    /// The subscriber set is copied before iteration, so subscribers may
    /// change subscriptions while they run. Failures follow the thread's
    /// [`ErrorPolicy`].
    pub fn trigger(container: ContainerId, field: &str) -> Result<()> {
        let snapshot = registry().lock().subscribers(container, field);
        if snapshot.is_empty() {
            return Ok(());
        }

        trace!(
            container = container.raw(),
            field,
            subscribers = snapshot.len(),
            "trigger"
        );

        let policy = Self::config().error_policy;
        for subscriber in snapshot {
            if let Err(err) = subscriber.notify() {
                match policy {
                    ErrorPolicy::FailFast => return Err(err),
                    ErrorPolicy::Isolate => error!(
                        container = container.raw(),
                        field,
                        subscriber = subscriber.subscriber_id().raw(),
                        error = %err,
                        "subscriber failed during trigger"
                    ),
                }
            }
        }
        Ok(())
    }

    /// Remove every subscription held by a subscriber.
    ///
    /// Returns how many subscriptions were removed.
    pub fn unsubscribe_all(id: SubscriberId) -> usize {
        registry().lock().unsubscribe_all(id)
    }

    /// Drop every registry entry keyed by `container`.
    ///
    /// Containers call this when their last handle is dropped.
    pub fn release_container(container: ContainerId) {
        let removed = registry().lock().release_container(container);
        if removed > 0 {
            debug!(
                container = container.raw(),
                subscriptions = removed,
                "released container"
            );
        }
    }

    /// Number of subscribers of `(container, field)`.
    pub fn subscriber_count(container: ContainerId, field: &str) -> usize {
        registry().lock().subscriber_count(container, field)
    }

    /// Number of fields of `container` with at least one subscriber.
    pub fn tracked_fields(container: ContainerId) -> usize {
        registry().lock().tracked_fields(container)
    }

    /// Number of entries a subscriber is registered in.
    pub fn dependency_count(id: SubscriberId) -> usize {
        registry().lock().dependency_count(id)
    }

    /// The entries a subscriber is registered in, sorted.
    pub fn dependencies_of(id: SubscriberId) -> Vec<DepKey> {
        registry().lock().dependencies_of(id)
    }

    /// Size summary of the global registry.
    pub fn stats() -> RegistryStats {
        registry().lock().stats()
    }

    /// Get the current subscriber being tracked, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        ReactiveContext::current_subscriber()
    }

    /// Check if reads on this thread are currently tracked.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }
}
