//! Derived stores
//!
//! A derived store subscribes to one or more upstream stores and recomputes
//! its value from theirs. Recomputation is glitch-free: an upstream index is
//! marked pending when that store invalidates, cleared when its value
//! arrives, and the projection only runs once nothing is pending. Two
//! upstreams updated back-to-back inside one delivery round therefore
//! produce a single recomputation over both new values.
//!
//! Projections come in two forms:
//!
//! - [`derived`]: the projection returns the new value
//! - [`derived_with`]: the projection receives a [`Setter`] and may return
//!   a teardown that runs before the next recomputation and on stop
//!
//! ```rust
//! use kinetic_core::derived::derived;
//! use kinetic_core::store::writable;
//!
//! let width = writable(3.0f64);
//! let height = writable(4.0f64);
//! let area = derived((width.clone(), height.clone()), |(w, h)| w * h);
//!
//! assert_eq!(area.get(), 12.0);
//! width.set(5.0);
//! assert_eq!(area.get(), 20.0);
//! ```

use crate::store::{readable, Readable, Setter, Subscribable, Teardown, Unsubscriber, Writable};
use crate::value::StoreValue;
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Bit per upstream index, any number of upstreams
#[derive(Debug, Default)]
struct PendingMask {
    words: SmallVec<[u64; 1]>,
}

impl PendingMask {
    fn mark(&mut self, index: usize) {
        let word = index / 64;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1 << (index % 64);
    }

    fn clear(&mut self, index: usize) {
        if let Some(word) = self.words.get_mut(index / 64) {
            *word &= !(1 << (index % 64));
        }
    }

    fn any(&self) -> bool {
        self.words.iter().any(|w| *w != 0)
    }
}

/// Bookkeeping for one active derivation: which upstreams are pending and
/// how to recompute once they have all arrived.
#[derive(Default)]
pub struct DeriveRound {
    pending: RefCell<PendingMask>,
    inited: Cell<bool>,
    sync: RefCell<Option<Rc<dyn Fn()>>>,
}

impl DeriveRound {
    /// Upstream `index` announced that a new value is coming
    pub fn invalidate(&self, index: usize) {
        self.pending.borrow_mut().mark(index);
    }

    /// Upstream `index` delivered its value
    pub fn arrived(&self, index: usize) {
        self.pending.borrow_mut().clear(index);
        if self.inited.get() {
            let sync = self.sync.borrow().clone();
            if let Some(sync) = sync {
                sync();
            }
        }
    }

    fn is_pending(&self) -> bool {
        self.pending.borrow().any()
    }
}

/// Subscribe to one upstream store, writing arrivals through `write`
fn connect_one<S, W>(store: &S, index: usize, round: &Rc<DeriveRound>, write: W) -> Unsubscriber
where
    S: Subscribable,
    W: Fn(&S::Value) + 'static,
{
    let on_value = Rc::clone(round);
    let on_invalidate = Rc::clone(round);
    store.subscribe_with(
        Box::new(move |value| {
            write(value);
            on_value.arrived(index);
        }),
        Box::new(move || on_invalidate.invalidate(index)),
    )
}

/// A set of upstream stores a derived store can depend on.
///
/// Implemented for single stores (the projection sees the bare value),
/// tuples of two to four stores, and `Vec`s of same-typed stores.
pub trait StoreSet: 'static {
    type Values: Clone + 'static;
    type Slots: 'static;

    fn empty_slots(&self) -> Self::Slots;

    fn connect(&self, slots: &Rc<RefCell<Self::Slots>>, round: &Rc<DeriveRound>) -> Vec<Unsubscriber>;

    /// All upstream values, once every slot has been filled
    fn values(slots: &Self::Slots) -> Option<Self::Values>;
}

macro_rules! single_store_set {
    ($store:ident) => {
        impl<T: StoreValue> StoreSet for $store<T> {
            type Values = T;
            type Slots = Option<T>;

            fn empty_slots(&self) -> Option<T> {
                None
            }

            fn connect(&self, slots: &Rc<RefCell<Option<T>>>, round: &Rc<DeriveRound>) -> Vec<Unsubscriber> {
                let slots = Rc::clone(slots);
                vec![connect_one(self, 0, round, move |v: &T| {
                    *slots.borrow_mut() = Some(v.clone());
                })]
            }

            fn values(slots: &Option<T>) -> Option<T> {
                slots.clone()
            }
        }
    };
}

single_store_set!(Writable);
single_store_set!(Readable);

macro_rules! tuple_store_set {
    ($(($store:ident, $idx:tt)),+) => {
        impl<$($store: Subscribable + 'static),+> StoreSet for ($($store,)+) {
            type Values = ($($store::Value,)+);
            type Slots = ($(Option<$store::Value>,)+);

            fn empty_slots(&self) -> Self::Slots {
                ($(None::<$store::Value>,)+)
            }

            fn connect(&self, slots: &Rc<RefCell<Self::Slots>>, round: &Rc<DeriveRound>) -> Vec<Unsubscriber> {
                vec![$({
                    let slots = Rc::clone(slots);
                    connect_one(&self.$idx, $idx, round, move |v: &$store::Value| {
                        slots.borrow_mut().$idx = Some(v.clone());
                    })
                }),+]
            }

            fn values(slots: &Self::Slots) -> Option<Self::Values> {
                Some(($(slots.$idx.clone()?,)+))
            }
        }
    };
}

tuple_store_set!((A, 0), (B, 1));
tuple_store_set!((A, 0), (B, 1), (C, 2));
tuple_store_set!((A, 0), (B, 1), (C, 2), (D, 3));

impl<S: Subscribable + 'static> StoreSet for Vec<S> {
    type Values = Vec<S::Value>;
    type Slots = Vec<Option<S::Value>>;

    fn empty_slots(&self) -> Self::Slots {
        vec![None; self.len()]
    }

    fn connect(&self, slots: &Rc<RefCell<Self::Slots>>, round: &Rc<DeriveRound>) -> Vec<Unsubscriber> {
        self.iter()
            .enumerate()
            .map(|(index, store)| {
                let slots = Rc::clone(slots);
                connect_one(store, index, round, move |v: &S::Value| {
                    slots.borrow_mut()[index] = Some(v.clone());
                })
            })
            .collect()
    }

    fn values(slots: &Self::Slots) -> Option<Self::Values> {
        slots.iter().cloned().collect()
    }
}

type AutoProjection<V, T> = Box<dyn Fn(&V) -> T>;
type ManualProjection<V, T> = RefCell<Box<dyn FnMut(&V, &Setter<T>) -> Option<Teardown>>>;

enum Projection<V, T> {
    Auto(AutoProjection<V, T>),
    Manual(ManualProjection<V, T>),
}

/// Derive a store whose value is `projection(upstream values)`.
///
/// Before the first subscription the store holds `T::default()`.
pub fn derived<S, T, F>(stores: S, projection: F) -> Readable<T>
where
    S: StoreSet,
    T: StoreValue + Default,
    F: Fn(&S::Values) -> T + 'static,
{
    build(stores, T::default(), Projection::Auto(Box::new(projection)))
}

/// Like [`derived`], holding `initial` until the first subscription instead
/// of `T::default()`.
pub fn derived_with_initial<S, T, F>(stores: S, projection: F, initial: T) -> Readable<T>
where
    S: StoreSet,
    T: StoreValue,
    F: Fn(&S::Values) -> T + 'static,
{
    build(stores, initial, Projection::Auto(Box::new(projection)))
}

/// Derive a store whose projection sets the value itself.
///
/// The projection may set asynchronously (or not at all for a round) and
/// may return a teardown, run before the next recomputation and when the
/// last subscriber leaves.
pub fn derived_with<S, T, F>(stores: S, projection: F, initial: T) -> Readable<T>
where
    S: StoreSet,
    T: StoreValue,
    F: FnMut(&S::Values, &Setter<T>) -> Option<Teardown> + 'static,
{
    build(stores, initial, Projection::Manual(RefCell::new(Box::new(projection))))
}

fn build<S, T>(stores: S, initial: T, projection: Projection<S::Values, T>) -> Readable<T>
where
    S: StoreSet,
    T: StoreValue,
{
    let stores = Rc::new(stores);
    let projection = Rc::new(projection);

    readable(initial, move |setter: Setter<T>| {
        let slots = Rc::new(RefCell::new(stores.empty_slots()));
        let round = Rc::new(DeriveRound::default());
        let cleanup: Rc<RefCell<Option<Teardown>>> = Rc::new(RefCell::new(None));

        let sync: Rc<dyn Fn()> = {
            let slots = Rc::clone(&slots);
            let round = Rc::downgrade(&round);
            let projection = Rc::clone(&projection);
            let cleanup = Rc::clone(&cleanup);
            Rc::new(move || {
                let Some(round) = round.upgrade() else {
                    return;
                };
                if round.is_pending() {
                    return;
                }
                let Some(values) = S::values(&slots.borrow()) else {
                    return;
                };

                let previous = cleanup.borrow_mut().take();
                if let Some(previous) = previous {
                    previous();
                }

                match projection.as_ref() {
                    Projection::Auto(f) => setter.set(f(&values)),
                    Projection::Manual(f) => {
                        let mut project = f.borrow_mut();
                        let next = (*project)(&values, &setter);
                        drop(project);
                        *cleanup.borrow_mut() = next;
                    }
                }
            })
        };

        *round.sync.borrow_mut() = Some(Rc::clone(&sync));
        let unsubscribers = stores.connect(&slots, &round);
        round.inited.set(true);
        sync();

        Some(Box::new(move || {
            round.sync.borrow_mut().take();
            for unsubscriber in unsubscribers {
                unsubscriber.unsubscribe();
            }
            let last = cleanup.borrow_mut().take();
            if let Some(last) = last {
                last();
            }
        }) as Teardown)
    })
}
