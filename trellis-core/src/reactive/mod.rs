//! Reactive Primitives
//!
//! This module implements the dependency graph: containers that record who
//! reads them, and effects that re-run when what they read changes.
//!
//! # Concepts
//!
//! ## Containers
//!
//! A container is a piece of mutable state whose field accesses are
//! instrumented. Reads inside a running effect subscribe the effect to
//! `(container, field)`; writes that change a value re-run the subscribers
//! of that field. Three container shapes are provided:
//!
//! - [`Reactive<T>`]: a plain struct, addressed through [`Field`] descriptors
//! - [`Observable<V>`]: a string-keyed map
//! - [`Signal<T>`]: a single value under the field key `"value"`
//!
//! ## Effects
//!
//! An [`Effect`] is a side-effecting callback. It runs once on creation and
//! again, synchronously, every time a field it read on its latest run is
//! written with a different value.
//!
//! # Implementation Notes
//!
//! The active effect is the top of a thread-local stack
//! ([`ReactiveContext`]). The `(container, field) -> subscribers` map is the
//! [`DependencyRegistry`], owned by the global [`Runtime`]. The registry
//! refers to containers by [`ContainerId`] only, and containers release
//! their entries when dropped.

mod context;
mod effect;
mod observable;
mod record;
mod registry;
mod runtime;
mod signal;
mod subscriber;

pub use context::{untrack, ReactiveContext};
pub use effect::Effect;
pub use observable::Observable;
pub use record::{Field, Reactive};
pub use registry::{DepKey, DependencyRegistry, FieldKey, RegistryStats, SubscriberSnapshot};
pub use runtime::Runtime;
pub use signal::Signal;
pub use subscriber::{ContainerId, Subscriber, SubscriberId};
