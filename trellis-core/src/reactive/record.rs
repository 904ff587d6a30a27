//! Reactive Records
//!
//! [`Reactive<T>`] wraps a plain struct so that field reads are tracked and
//! field writes re-run dependent effects. Fields are addressed through
//! [`Field`] descriptors: a name plus accessor functions. The name is the
//! tracking key, so each field has its own subscriber set.
//!
//! ```rust
//! use trellis_core::field;
//! use trellis_core::reactive::{Effect, Reactive};
//!
//! struct Product {
//!     price: f64,
//!     quantity: u32,
//! }
//!
//! let product = Reactive::new(Product { price: 5.0, quantity: 2 });
//! let price = field!(Product, price);
//! let quantity = field!(Product, quantity);
//!
//! let reader = product.clone();
//! let _effect = Effect::new(move || {
//!     let _total = reader.get(price) * f64::from(reader.get(quantity));
//! });
//!
//! product.set(quantity, 3).unwrap();
//! ```

use std::fmt::{self, Debug};
use std::sync::Arc;

use parking_lot::RwLock;

use super::runtime::Runtime;
use super::subscriber::ContainerId;
use crate::error::Result;

/// Descriptor of one field of a record type.
pub struct Field<T, V> {
    name: &'static str,
    get: fn(&T) -> &V,
    get_mut: fn(&mut T) -> &mut V,
}

impl<T, V> Field<T, V> {
    /// Create a field descriptor. Prefer the [`field!`](crate::field) macro.
    pub const fn new(name: &'static str, get: fn(&T) -> &V, get_mut: fn(&mut T) -> &mut V) -> Self {
        Self { name, get, get_mut }
    }

    /// The field's tracking key.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T, V> Clone for Field<T, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, V> Copy for Field<T, V> {}

impl<T, V> Debug for Field<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Field").field(&self.name).finish()
    }
}

/// Build a [`Field`] descriptor for a named struct field.
///
/// `field!(Product, price)` is keyed by `"price"`.
#[macro_export]
macro_rules! field {
    ($ty:ty, $name:ident) => {
        $crate::reactive::Field::<$ty, _>::new(
            stringify!($name),
            |record| &record.$name,
            |record| &mut record.$name,
        )
    };
}

/// A record whose field accesses are tracked.
pub struct Reactive<T> {
    inner: Arc<RecordInner<T>>,
}

struct RecordInner<T> {
    id: ContainerId,
    value: RwLock<T>,
}

impl<T> Drop for RecordInner<T> {
    fn drop(&mut self) {
        Runtime::release_container(self.id);
    }
}

impl<T> Reactive<T>
where
    T: Send + Sync + 'static,
{
    /// Wrap a record.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(RecordInner {
                id: ContainerId::new(),
                value: RwLock::new(value),
            }),
        }
    }

    /// Get the record's container ID.
    pub fn id(&self) -> ContainerId {
        self.inner.id
    }

    /// Read a field, tracking the read.
    pub fn get<V>(&self, field: Field<T, V>) -> V
    where
        V: Clone,
    {
        self.with(field, V::clone)
    }

    /// Borrow a field, tracking the read.
    ///
    /// `f` runs under the record's read lock and must not write this record.
    pub fn with<V, R>(&self, field: Field<T, V>, f: impl FnOnce(&V) -> R) -> R {
        let result = {
            let guard = self.inner.value.read();
            f((field.get)(&*guard))
        };
        Runtime::track(self.inner.id, field.name);
        result
    }

    /// Write a field.
    ///
    /// If the new value differs from the current one, effects that read
    /// this field re-run before this returns. Returns whether it changed.
    pub fn set<V>(&self, field: Field<T, V>, value: V) -> Result<bool>
    where
        V: PartialEq,
    {
        let changed = {
            let mut guard = self.inner.value.write();
            let slot = (field.get_mut)(&mut *guard);
            if *slot == value {
                false
            } else {
                *slot = value;
                true
            }
        };

        if changed {
            Runtime::trigger(self.inner.id, field.name)?;
        }
        Ok(changed)
    }

    /// Write a field using a function of its current value.
    ///
    /// The read is not tracked.
    pub fn update<V>(&self, field: Field<T, V>, f: impl FnOnce(&V) -> V) -> Result<bool>
    where
        V: PartialEq,
    {
        let new_value = {
            let guard = self.inner.value.read();
            f((field.get)(&*guard))
        };
        self.set(field, new_value)
    }

    /// Borrow the whole record without tracking.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.inner.value.read())
    }

    /// Clone the whole record without tracking.
    pub fn snapshot(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.read().clone()
    }
}

impl<T> Clone for Reactive<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Reactive<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Effect;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    fn x() -> Field<Point, i32> {
        field!(Point, x)
    }

    fn y() -> Field<Point, i32> {
        field!(Point, y)
    }

    fn watch(point: &Reactive<Point>, field: Field<Point, i32>) -> (Effect, Arc<AtomicI32>) {
        let runs = Arc::new(AtomicI32::new(0));
        let (point_in, runs_in) = (point.clone(), runs.clone());
        let effect = Effect::new(move || {
            point_in.get(field);
            runs_in.fetch_add(1, Ordering::SeqCst);
        });
        (effect, runs)
    }

    #[test]
    fn field_macro_uses_field_name() {
        assert_eq!(x().name(), "x");
        assert_eq!(y().name(), "y");
    }

    #[test]
    fn get_and_set_fields() {
        let point = Reactive::new(Point { x: 1, y: 2 });

        assert!(point.set(x(), 10).unwrap());
        assert_eq!(point.get(x()), 10);
        assert_eq!(point.snapshot(), Point { x: 10, y: 2 });
    }

    #[test]
    fn read_outside_effect_is_not_tracked() {
        let point = Reactive::new(Point { x: 1, y: 2 });
        point.get(x());
        assert_eq!(Runtime::tracked_fields(point.id()), 0);
    }

    #[test]
    fn fields_trigger_independently() {
        let point = Reactive::new(Point { x: 1, y: 2 });
        let (_on_x, runs_x) = watch(&point, x());
        let (_on_y, runs_y) = watch(&point, y());

        point.set(x(), 5).unwrap();
        assert_eq!(runs_x.load(Ordering::SeqCst), 2);
        assert_eq!(runs_y.load(Ordering::SeqCst), 1);

        point.update(y(), |y| y + 1).unwrap();
        assert_eq!(runs_x.load(Ordering::SeqCst), 2);
        assert_eq!(runs_y.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn equal_write_is_suppressed() {
        let point = Reactive::new(Point { x: 1, y: 2 });
        let (_effect, runs) = watch(&point, x());

        assert!(!point.set(x(), 1).unwrap());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn untracked_access_passes_through() {
        let point = Reactive::new(Point { x: 3, y: 4 });
        let sum = Arc::new(AtomicI32::new(0));
        let (point_in, sum_in) = (point.clone(), sum.clone());

        let effect = Effect::new(move || {
            let total = point_in.with_untracked(|p| p.x + p.y);
            sum_in.store(total, Ordering::SeqCst);
        });

        assert_eq!(sum.load(Ordering::SeqCst), 7);
        assert_eq!(effect.dependency_count(), 0);
    }
}
