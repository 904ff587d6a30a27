//! Reactive Context
//!
//! The reactive context tracks which effect is currently running, so that
//! reads performed during its run can be attributed to it.
//!
//! # Implementation
//!
//! We use a thread-local stack of entries. Running an effect pushes it onto
//! the stack; the returned guard pops it when dropped, including on panic.
//! The active effect is always the top entry, so an effect that triggers
//! another effect mid-run gets its own attribution back once the inner run
//! returns.
//!
//! [`untrack`] pushes an empty entry: reads inside it attribute to nobody.

use std::cell::RefCell;
use std::sync::Arc;

use super::subscriber::{Subscriber, SubscriberId};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Option<Arc<dyn Subscriber>>>> = const { RefCell::new(Vec::new()) };
}

/// Guard that pops the context when dropped.
pub struct ReactiveContext {
    subscriber_id: Option<SubscriberId>,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given subscriber.
    ///
    /// While this context is the top of the stack, tracked reads register
    /// the subscriber as a dependent. The context is exited when the
    /// returned guard is dropped.
    pub fn enter(subscriber: Arc<dyn Subscriber>) -> Self {
        let subscriber_id = Some(subscriber.subscriber_id());
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(Some(subscriber)));
        Self { subscriber_id }
    }

    /// Enter a context in which reads are not tracked.
    pub fn enter_untracked() -> Self {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(None));
        Self {
            subscriber_id: None,
        }
    }

    /// Check if a subscriber is active, i.e. reads are currently tracked.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| matches!(stack.borrow().last(), Some(Some(_))))
    }

    /// Get the subscriber that reads are attributed to, if any.
    pub fn current() -> Option<Arc<dyn Subscriber>> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().cloned().flatten())
    }

    /// Get the current subscriber ID, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .and_then(|entry| entry.as_ref().map(|s| s.subscriber_id()))
        })
    }

    /// Whether `id` is anywhere on this thread's stack, i.e. mid-run.
    pub fn is_running(id: SubscriberId) -> bool {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .iter()
                .flatten()
                .any(|s| s.subscriber_id() == id)
        })
    }

    /// Number of entries on this thread's stack.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let popped = CONTEXT_STACK.with(|stack| stack.borrow_mut().pop());

        // Verify we're popping the right context.
        if let Some(entry) = &popped {
            debug_assert_eq!(
                entry.as_ref().map(|s| s.subscriber_id()),
                self.subscriber_id,
                "ReactiveContext mismatch"
            );
        }

        // Released outside the stack borrow; dropping a subscriber can run
        // arbitrary destructors.
        drop(popped);
    }
}

/// Run `f` without tracking any reads it performs.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::enter_untracked();
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;

    struct Probe(SubscriberId);

    impl Subscriber for Probe {
        fn subscriber_id(&self) -> SubscriberId {
            self.0
        }

        fn notify(&self) -> Result<()> {
            Ok(())
        }
    }

    fn probe() -> Arc<dyn Subscriber> {
        Arc::new(Probe(SubscriberId::new()))
    }

    #[test]
    fn context_tracks_subscriber() {
        let sub = probe();
        let id = sub.subscriber_id();

        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_subscriber().is_none());

        {
            let _ctx = ReactiveContext::enter(sub);

            assert!(ReactiveContext::is_active());
            assert_eq!(ReactiveContext::current_subscriber(), Some(id));
        }

        // Context should be cleaned up after drop
        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_subscriber().is_none());
    }

    #[test]
    fn nested_contexts() {
        let outer = probe();
        let inner = probe();
        let outer_id = outer.subscriber_id();
        let inner_id = inner.subscriber_id();

        {
            let _ctx1 = ReactiveContext::enter(outer);
            assert_eq!(ReactiveContext::current_subscriber(), Some(outer_id));

            {
                let _ctx2 = ReactiveContext::enter(inner);
                assert_eq!(ReactiveContext::current_subscriber(), Some(inner_id));
                assert!(ReactiveContext::is_running(outer_id));
            }

            // After inner context drops, outer should be current
            assert_eq!(ReactiveContext::current_subscriber(), Some(outer_id));
            assert!(!ReactiveContext::is_running(inner_id));
        }

        assert!(ReactiveContext::current_subscriber().is_none());
        assert_eq!(ReactiveContext::depth(), 0);
    }

    #[test]
    fn untrack_hides_outer_subscriber() {
        let sub = probe();
        let id = sub.subscriber_id();
        let _ctx = ReactiveContext::enter(sub);

        untrack(|| {
            assert!(!ReactiveContext::is_active());
            assert!(ReactiveContext::current().is_none());
            assert!(ReactiveContext::is_running(id));
        });

        assert_eq!(ReactiveContext::current_subscriber(), Some(id));
    }

    #[test]
    fn context_is_restored_after_panic() {
        let sub = probe();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ctx = ReactiveContext::enter(sub);
            panic!("effect blew up");
        }));

        assert!(result.is_err());
        assert_eq!(ReactiveContext::depth(), 0);
        assert!(ReactiveContext::current_subscriber().is_none());
    }
}
