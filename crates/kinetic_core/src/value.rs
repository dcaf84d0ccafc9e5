//! Change detection for store values
//!
//! A store only notifies when a `set` actually changes its value. Scalars are
//! compared by value. Aggregates are always treated as changed, because an
//! in-place mutation of a shared aggregate cannot be observed by comparing it
//! with itself.

use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

/// A value that can live inside a store.
///
/// The default `changed` reports every write as a change, which is the right
/// answer for records and collections. Scalar types override it with `!=`.
pub trait StoreValue: Clone + 'static {
    /// Returns true when replacing `self` with `next` must notify subscribers.
    fn changed(&self, next: &Self) -> bool {
        let _ = next;
        true
    }
}

macro_rules! scalar_store_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl StoreValue for $ty {
                #[inline]
                fn changed(&self, next: &Self) -> bool {
                    self != next
                }
            }
        )*
    };
}

scalar_store_value!(
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    bool,
    char,
    (),
    String,
    &'static str,
);

impl<T: StoreValue> StoreValue for Option<T> {
    fn changed(&self, next: &Self) -> bool {
        match (self, next) {
            (None, None) => false,
            (Some(current), Some(next)) => current.changed(next),
            _ => true,
        }
    }
}

impl<T: Clone + 'static> StoreValue for Vec<T> {}

impl<T: ?Sized + 'static> StoreValue for Rc<T> {}

impl<K: Clone + 'static, V: Clone + 'static, S: Clone + 'static> StoreValue for HashMap<K, V, S> {}

impl<K: Clone + 'static, V: Clone + 'static> StoreValue for BTreeMap<K, V> {}

impl<K: Clone + 'static, V: Clone + 'static, S: Clone + 'static> StoreValue for IndexMap<K, V, S> {}

impl<A: Clone + 'static, B: Clone + 'static> StoreValue for (A, B) {}

impl<A: Clone + 'static, B: Clone + 'static, C: Clone + 'static> StoreValue for (A, B, C) {}

impl<A: Clone + 'static, B: Clone + 'static, C: Clone + 'static, D: Clone + 'static> StoreValue
    for (A, B, C, D)
{
}
