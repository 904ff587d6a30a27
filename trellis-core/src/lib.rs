//! Trellis Core
//!
//! This crate provides a fine-grained reactive dependency-tracking engine.
//! It implements:
//!
//! - Read tracking: recording which effect depends on which field
//! - Write propagation: re-running exactly the effects that read a field
//!   when that field changes
//! - Reactive containers (records, maps, signals) and effects
//!
//! Everything runs synchronously. A write returns only after every
//! affected effect has re-run.
//!
//! # Architecture
//!
//! - `reactive`: containers, effects, the context stack and the registry
//! - `config`: per-thread runtime configuration
//! - `error`: the crate's error type
//!
//! # Example
//!
//! ```rust
//! use trellis_core::{effect, field, reactive, signal};
//!
//! struct Product {
//!     price: f64,
//!     quantity: f64,
//! }
//!
//! let product = reactive(Product { price: 5.0, quantity: 2.0 });
//! let (price, quantity) = (field!(Product, price), field!(Product, quantity));
//! let total = signal(0.0);
//!
//! let (p, t) = (product.clone(), total.clone());
//! let _effect = effect(move || {
//!     t.set(p.get(price) * p.get(quantity)).ok();
//! });
//! assert_eq!(total.get(), 10.0);
//!
//! product.set(quantity, 3.0).unwrap();
//! assert_eq!(total.get(), 15.0);
//! ```

pub mod config;
pub mod error;
pub mod reactive;

pub use config::{ErrorPolicy, RuntimeConfig};
pub use error::{BoxError, ReactiveError, Result};
pub use reactive::{untrack, Effect, Field, Observable, Reactive, Runtime, Signal};

/// Wrap a record so its field accesses are tracked.
pub fn reactive<T>(value: T) -> Reactive<T>
where
    T: Send + Sync + 'static,
{
    Reactive::new(value)
}

/// Wrap key/value entries in a tracked map.
pub fn observable<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Observable<V>
where
    K: Into<String>,
    V: Send + Sync + 'static,
{
    Observable::new(entries)
}

/// Create a single-value reactive cell.
pub fn signal<T>(value: T) -> Signal<T>
where
    T: Send + Sync + 'static,
{
    Signal::new(value)
}

/// Run `f` now and again whenever state it read changes.
pub fn effect<F>(f: F) -> Effect
where
    F: Fn() + Send + Sync + 'static,
{
    Effect::new(f)
}

/// Like [`effect`], for callbacks that can fail.
///
/// A failure on the first run disposes the effect and is returned.
pub fn try_effect<F, E>(f: F) -> Result<Effect>
where
    F: Fn() -> std::result::Result<(), E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    Effect::try_new(f)
}
