//! Effect Implementation
//!
//! An Effect is a side-effecting computation that re-runs whenever state it
//! read on its latest run changes.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. Every run pushes the effect onto the thread's context stack, so each
//!    tracked read inside the function subscribes it to that field.
//!
//! 3. When a dependency is written with a different value, the write
//!    re-runs the effect synchronously, before returning.
//!
//! 4. Before re-running, the effect drops its old subscriptions (unless
//!    pruning is disabled in [`RuntimeConfig`](crate::config::RuntimeConfig))
//!    and rebuilds them from the reads of the new run.
//!
//! # Re-entrancy
//!
//! An effect's run may write state that triggers other effects; those run
//! nested, on top of the context stack, and attribution returns to the
//! outer effect afterwards. An effect that is already running is never
//! re-entered: triggering it from inside its own run is skipped.
//!
//! # Failure
//!
//! Fallible effects ([`Effect::try_new`]) return errors from the callback as
//! [`ReactiveError::EffectFailed`]. A panic unwinds through the run but the
//! context stack is still restored.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use tracing::{debug, trace};

use super::context::ReactiveContext;
use super::registry::DepKey;
use super::runtime::Runtime;
use super::subscriber::{Subscriber, SubscriberId};
use crate::error::{BoxError, ReactiveError, Result};

type EffectFn = Box<dyn Fn() -> Result<(), BoxError> + Send + Sync>;

/// A side-effecting computation that runs when dependencies change.
///
/// Cloning an effect yields another handle to the same effect. The registry
/// only holds it weakly, so the effect stays subscribed for as long as some
/// handle is alive. Dropping the last handle unsubscribes it and releases
/// whatever its function captured. [`Effect::dispose`] stops it early.
///
/// # Example
///
/// ```rust
/// use trellis_core::reactive::{Effect, Signal};
///
/// let count = Signal::new(0);
/// let seen = Signal::new(0);
///
/// let (count_in, seen_in) = (count.clone(), seen.clone());
/// let _effect = Effect::try_new(move || seen_in.set(count_in.get() * 2).map(|_| ())).unwrap();
///
/// count.set(5).unwrap();
/// assert_eq!(seen.get_untracked(), 10);
/// ```
#[derive(Clone)]
#[must_use = "an effect stops when its last handle is dropped"]
pub struct Effect {
    inner: Arc<EffectInner>,
}

struct EffectInner {
    id: SubscriberId,
    run: EffectFn,
    this: Weak<EffectInner>,
    disposed: AtomicBool,
    run_count: AtomicUsize,
}

impl Effect {
    /// Create a new effect with the given function.
    ///
    /// The function runs immediately to establish dependencies.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let effect = Self::new_lazy(run);
        effect.run().ok();
        effect
    }

    /// Create a new effect whose function may fail.
    ///
    /// The function runs immediately. If that first run fails, the effect
    /// is disposed and the error is returned.
    pub fn try_new<F, E>(run: F) -> Result<Self>
    where
        F: Fn() -> Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let effect = Self::from_fn(Box::new(move || run().map_err(Into::into)));
        if let Err(err) = effect.run() {
            effect.dispose();
            return Err(err);
        }
        Ok(effect)
    }

    /// Create a new effect without running it.
    ///
    /// It has no dependencies until [`Effect::run`] is called.
    pub fn new_lazy<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::from_fn(Box::new(move || {
            run();
            Ok(())
        }))
    }

    fn from_fn(run: EffectFn) -> Self {
        let inner = Arc::new_cyclic(|this| EffectInner {
            id: SubscriberId::new(),
            run,
            this: this.clone(),
            disposed: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
        });
        Self { inner }
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    /// Run the effect now, re-discovering its dependencies.
    ///
    /// Does nothing if the effect is disposed or already running on this
    /// thread.
    pub fn run(&self) -> Result<()> {
        self.inner.execute()
    }

    /// Dispose of the effect.
    ///
    /// Its subscriptions are removed and it will not run again.
    pub fn dispose(&self) {
        if !self.inner.disposed.swap(true, Ordering::SeqCst) {
            let removed = Runtime::unsubscribe_all(self.inner.id);
            debug!(effect = self.inner.id.raw(), removed, "effect disposed");
        }
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Get the number of `(container, field)` pairs the effect depends on.
    pub fn dependency_count(&self) -> usize {
        Runtime::dependency_count(self.inner.id)
    }

    /// The `(container, field)` pairs the effect depends on, sorted.
    pub fn dependencies(&self) -> Vec<DepKey> {
        Runtime::dependencies_of(self.inner.id)
    }
}

impl EffectInner {
    fn execute(&self) -> Result<()> {
        if self.disposed.load(Ordering::SeqCst) {
            return Ok(());
        }
        if ReactiveContext::is_running(self.id) {
            trace!(effect = self.id.raw(), "effect already running; skipped");
            return Ok(());
        }
        let Some(this) = self.this.upgrade() else {
            return Ok(());
        };

        if Runtime::config().prune_stale_dependencies {
            Runtime::unsubscribe_all(self.id);
        }

        debug!(
            effect = self.id.raw(),
            run = self.run_count.load(Ordering::SeqCst) + 1,
            "running effect"
        );

        let result = {
            let _ctx = ReactiveContext::enter(this);
            (self.run)()
        };
        self.run_count.fetch_add(1, Ordering::SeqCst);

        result.map_err(|source| ReactiveError::EffectFailed {
            effect: self.id,
            source,
        })
    }
}

impl Drop for EffectInner {
    fn drop(&mut self) {
        if !*self.disposed.get_mut() {
            Runtime::unsubscribe_all(self.id);
        }
    }
}

impl Subscriber for EffectInner {
    fn subscriber_id(&self) -> SubscriberId {
        self.id
    }

    fn notify(&self) -> Result<()> {
        self.execute()
    }
}

impl PartialEq for Effect {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Effect {}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Signal;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn effect_runs_on_creation() {
        let run_count = Arc::new(AtomicI32::new(0));
        let run_count_clone = run_count.clone();

        let _effect = Effect::new(move || {
            run_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        // Effect should have run once on creation
        assert_eq!(run_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn effect_lazy_does_not_run_on_creation() {
        let run_count = Arc::new(AtomicI32::new(0));
        let run_count_clone = run_count.clone();

        let effect = Effect::new_lazy(move || {
            run_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(run_count.load(Ordering::SeqCst), 0);
        assert_eq!(effect.run_count(), 0);

        effect.run().unwrap();
        assert_eq!(run_count.load(Ordering::SeqCst), 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn effect_reruns_when_dependency_changes() {
        let signal = Signal::new(1);
        let observed = Arc::new(AtomicI32::new(0));

        let (signal_in, observed_in) = (signal.clone(), observed.clone());
        let effect = Effect::new(move || {
            observed_in.store(signal_in.get(), Ordering::SeqCst);
        });

        assert_eq!(effect.dependency_count(), 1);

        signal.set(7).unwrap();
        assert_eq!(observed.load(Ordering::SeqCst), 7);
        assert_eq!(effect.run_count(), 2);
    }

    #[test]
    fn effect_does_not_run_after_disposal() {
        let signal = Signal::new(0);
        let signal_in = signal.clone();
        let effect = Effect::new(move || {
            signal_in.get();
        });

        effect.dispose();
        assert!(effect.is_disposed());
        assert_eq!(effect.dependency_count(), 0);

        signal.set(1).unwrap();
        effect.run().unwrap();
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn failed_first_run_disposes() {
        let signal = Signal::new(0);
        let signal_in = signal.clone();

        let err = Effect::try_new(move || {
            signal_in.get();
            Err("not ready")
        })
        .unwrap_err();

        assert!(matches!(err, ReactiveError::EffectFailed { .. }));
        assert_eq!(Runtime::subscriber_count(signal.id(), "value"), 0);
    }

    #[test]
    fn stale_dependencies_are_pruned() {
        let toggle = Signal::new(true);
        let left = Signal::new("left");
        let right = Signal::new("right");
        let runs = Arc::new(AtomicI32::new(0));

        let (toggle_in, left_in, right_in, runs_in) =
            (toggle.clone(), left.clone(), right.clone(), runs.clone());
        let effect = Effect::new(move || {
            runs_in.fetch_add(1, Ordering::SeqCst);
            if toggle_in.get() {
                left_in.get();
            } else {
                right_in.get();
            }
        });
        assert_eq!(effect.dependency_count(), 2);

        toggle.set(false).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        // `left` is no longer read, so writing it must not re-run the effect.
        left.set("LEFT").unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        right.set("RIGHT").unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn self_trigger_is_not_reentered() {
        let counter = Signal::new(0);
        let counter_in = counter.clone();

        let effect = Effect::try_new(move || -> Result<()> {
            let value = counter_in.get();
            if value < 10 {
                counter_in.set(value + 1)?;
            }
            Ok(())
        })
        .unwrap();

        assert_eq!(counter.get_untracked(), 1);
        assert_eq!(effect.run_count(), 1);

        counter.set(5).unwrap();
        assert_eq!(counter.get_untracked(), 6);
        assert_eq!(effect.run_count(), 2);
    }

    #[test]
    fn dropping_last_handle_unsubscribes() {
        let signal = Signal::new(0);
        let runs = Arc::new(AtomicI32::new(0));

        let (signal_in, runs_in) = (signal.clone(), runs.clone());
        let effect = Effect::new(move || {
            signal_in.get();
            runs_in.fetch_add(1, Ordering::SeqCst);
        });
        let extra = effect.clone();
        drop(effect);

        // A remaining clone keeps it subscribed.
        signal.set(1).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        drop(extra);
        assert_eq!(Runtime::subscriber_count(signal.id(), "value"), 0);
        signal.set(2).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn effect_clone_shares_state() {
        let effect1 = Effect::new(|| {});
        let effect2 = effect1.clone();

        assert_eq!(effect1, effect2);
        assert_eq!(effect2.run_count(), 1);

        effect1.run().unwrap();
        assert_eq!(effect2.run_count(), 2);

        effect1.dispose();
        assert!(effect2.is_disposed());
    }
}
