//! Observable stores
//!
//! A store holds one value and pushes it to its subscribers whenever it
//! changes. Three capability variants share one record:
//!
//! - [`Writable`]: read, write, and subscribe
//! - [`Readable`]: subscribe only; the start/stop notifier is the only writer
//! - derived stores (see [`crate::derived`]), which are readables fed by upstream stores
//!
//! # Notification order
//!
//! Every `set` that happens while a notification is being delivered is
//! queued into one thread-local FIFO. Only the outermost `set` drains it, so
//! subscribers observe updates in the order they were produced and a
//! callback never re-enters delivery.
//!
//! # Example
//!
//! ```rust
//! use kinetic_core::store::{writable, Subscribable};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let count = writable(0i32);
//! let seen = Rc::new(RefCell::new(Vec::new()));
//!
//! let sink = seen.clone();
//! let sub = count.subscribe(move |v| sink.borrow_mut().push(*v));
//!
//! count.set(1);
//! count.set(1); // unchanged, no notification
//! count.update(|v| v + 1);
//!
//! assert_eq!(*seen.borrow(), vec![0, 1, 2]);
//! sub.unsubscribe();
//! ```

use crate::value::StoreValue;
use indexmap::IndexMap;
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

/// Cleanup returned by a start/stop notifier or a manual derived projection
pub type Teardown = Box<dyn FnOnce()>;

/// Called once when a store gains its first subscriber
pub type StartStopNotifier<T> = Box<dyn FnMut(Setter<T>) -> Option<Teardown>>;

type Notify<T> = Rc<dyn Fn(&T)>;
type Invalidate = Rc<dyn Fn()>;
type Delivery = Box<dyn FnOnce()>;

thread_local! {
    static DELIVERY_QUEUE: RefCell<VecDeque<Delivery>> = RefCell::new(VecDeque::new());
    static DRAINING: Cell<bool> = const { Cell::new(false) };
}

fn enqueue(delivery: Delivery) {
    DELIVERY_QUEUE.with(|queue| queue.borrow_mut().push_back(delivery));
}

/// Resets the draining flag even if a subscriber panics mid-delivery
struct DrainGuard;

impl Drop for DrainGuard {
    fn drop(&mut self) {
        DRAINING.with(|draining| draining.set(false));
        if std::thread::panicking() {
            DELIVERY_QUEUE.with(|queue| queue.borrow_mut().clear());
        }
    }
}

fn drain() {
    if DRAINING.with(|draining| draining.replace(true)) {
        return;
    }
    let _guard = DrainGuard;

    let mut delivered = 0usize;
    while let Some(delivery) = DELIVERY_QUEUE.with(|queue| queue.borrow_mut().pop_front()) {
        delivery();
        delivered += 1;
    }
    tracing::trace!(delivered, "store notification queue drained");
}

struct Subscriber<T> {
    notify: Notify<T>,
    invalidate: Invalidate,
}

struct StoreInner<T> {
    value: RefCell<T>,
    subscribers: RefCell<IndexMap<u64, Subscriber<T>>>,
    next_subscriber: Cell<u64>,
    notifier: RefCell<Option<StartStopNotifier<T>>>,
    stop: RefCell<Option<Teardown>>,
    started: Cell<bool>,
}

impl<T: StoreValue> StoreInner<T> {
    fn set(&self, next: T) {
        if !self.value.borrow().changed(&next) {
            return;
        }
        *self.value.borrow_mut() = next;

        if !self.started.get() {
            return;
        }

        let value = Rc::new(self.value.borrow().clone());
        let subscribers: SmallVec<[(Notify<T>, Invalidate); 4]> = self
            .subscribers
            .borrow()
            .values()
            .map(|s| (Rc::clone(&s.notify), Rc::clone(&s.invalidate)))
            .collect();

        for (notify, invalidate) in subscribers {
            invalidate();
            let value = Rc::clone(&value);
            enqueue(Box::new(move || notify(&value)));
        }
        drain();
    }

    fn start(self: &Rc<Self>) {
        // Taken out while it runs: the notifier may set the store synchronously.
        let notifier = self.notifier.borrow_mut().take();
        let stop = match notifier {
            Some(mut notifier) => {
                let stop = notifier(Setter {
                    inner: Rc::downgrade(self),
                });
                *self.notifier.borrow_mut() = Some(notifier);
                stop
            }
            None => None,
        };
        *self.stop.borrow_mut() = stop;
        self.started.set(true);
    }

    fn remove_subscriber(&self, id: u64) {
        let now_empty = {
            let mut subscribers = self.subscribers.borrow_mut();
            if subscribers.shift_remove(&id).is_none() {
                return;
            }
            subscribers.is_empty()
        };

        if now_empty && self.started.replace(false) {
            let stop = self.stop.borrow_mut().take();
            if let Some(stop) = stop {
                stop();
            }
        }
    }
}

/// Handle returned by `subscribe`. Dropping it does not unsubscribe.
#[must_use = "dropping an Unsubscriber leaves the subscription active"]
pub struct Unsubscriber {
    action: Option<Box<dyn FnOnce()>>,
}

impl Unsubscriber {
    pub fn new<F: FnOnce() + 'static>(action: F) -> Self {
        Self {
            action: Some(Box::new(action)),
        }
    }

    /// An unsubscriber that does nothing
    pub fn noop() -> Self {
        Self { action: None }
    }

    /// Remove the subscription. If it was the last one, the store's stop
    /// teardown runs.
    pub fn unsubscribe(mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }
}

impl std::fmt::Debug for Unsubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unsubscriber")
            .field("active", &self.action.is_some())
            .finish()
    }
}

/// Anything that can be subscribed to.
///
/// Every subscriber receives the current value synchronously before
/// `subscribe` returns, then every subsequent change in order.
pub trait Subscribable {
    type Value: StoreValue;

    /// Register a `(notify, invalidate)` pair. `invalidate` is called as
    /// soon as a new value is known to be coming, before `notify` delivers it.
    fn subscribe_with(
        &self,
        notify: Box<dyn Fn(&Self::Value)>,
        invalidate: Box<dyn Fn()>,
    ) -> Unsubscriber;

    fn subscribe<F>(&self, notify: F) -> Unsubscriber
    where
        F: Fn(&Self::Value) + 'static,
        Self: Sized,
    {
        self.subscribe_with(Box::new(notify), Box::new(|| {}))
    }
}

/// Write access handed to start/stop notifiers and manual derived projections.
///
/// Holds a weak reference, so a notifier capturing its setter does not keep
/// the store alive.
pub struct Setter<T> {
    inner: Weak<StoreInner<T>>,
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T: StoreValue> Setter<T> {
    pub fn set(&self, value: T) {
        if let Some(inner) = self.inner.upgrade() {
            inner.set(value);
        }
    }

    pub fn update<F: FnOnce(&T) -> T>(&self, f: F) {
        if let Some(inner) = self.inner.upgrade() {
            let next = f(&inner.value.borrow());
            inner.set(next);
        }
    }
}

/// A read/write store
pub struct Writable<T> {
    inner: Rc<StoreInner<T>>,
}

impl<T> Clone for Writable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: StoreValue> Writable<T> {
    fn build(initial: T, notifier: Option<StartStopNotifier<T>>) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                value: RefCell::new(initial),
                subscribers: RefCell::new(IndexMap::new()),
                next_subscriber: Cell::new(0),
                notifier: RefCell::new(notifier),
                stop: RefCell::new(None),
                started: Cell::new(false),
            }),
        }
    }

    /// The value currently held by the store.
    ///
    /// For a store fed by a notifier this is the last value written, which
    /// may be stale while nobody is subscribed. Use [`get`] to force a fresh read.
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Replace the value and notify subscribers if it changed
    pub fn set(&self, value: T) {
        self.inner.set(value);
    }

    /// Set the value computed from the current one
    pub fn update<F: FnOnce(&T) -> T>(&self, f: F) {
        let next = f(&self.inner.value.borrow());
        self.inner.set(next);
    }

    /// A setter that does not keep the store alive
    pub fn setter(&self) -> Setter<T> {
        Setter {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// A read-only view sharing this store's value and subscribers
    pub fn readable(&self) -> Readable<T> {
        Readable {
            inner: self.clone(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// Whether the start/stop notifier is currently running
    pub fn is_started(&self) -> bool {
        self.inner.started.get()
    }
}

impl<T: StoreValue> Subscribable for Writable<T> {
    type Value = T;

    fn subscribe_with(&self, notify: Box<dyn Fn(&T)>, invalidate: Box<dyn Fn()>) -> Unsubscriber {
        let id = self.inner.next_subscriber.get();
        self.inner.next_subscriber.set(id + 1);

        let notify: Notify<T> = Rc::from(notify);
        let first = {
            let mut subscribers = self.inner.subscribers.borrow_mut();
            subscribers.insert(
                id,
                Subscriber {
                    notify: Rc::clone(&notify),
                    invalidate: Rc::from(invalidate),
                },
            );
            subscribers.len() == 1
        };

        if first {
            self.inner.start();
        }

        let current = self.inner.value.borrow().clone();
        notify(&current);

        let store = Rc::downgrade(&self.inner);
        Unsubscriber::new(move || {
            if let Some(inner) = store.upgrade() {
                inner.remove_subscriber(id);
            }
        })
    }
}

/// A read-only store
pub struct Readable<T> {
    inner: Writable<T>,
}

impl<T> Clone for Readable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: StoreValue> Readable<T> {
    /// Read the value by briefly subscribing, so that a notifier-backed or
    /// derived store computes a fresh value even when nobody is listening.
    pub fn get(&self) -> T {
        let peek = self.inner.subscribe_with(Box::new(|_| {}), Box::new(|| {}));
        let value = self.inner.get();
        peek.unsubscribe();
        value
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscriber_count()
    }
}

impl<T: StoreValue> Subscribable for Readable<T> {
    type Value = T;

    fn subscribe_with(&self, notify: Box<dyn Fn(&T)>, invalidate: Box<dyn Fn()>) -> Unsubscriber {
        self.inner.subscribe_with(notify, invalidate)
    }
}

/// Create a writable store
pub fn writable<T: StoreValue>(initial: T) -> Writable<T> {
    Writable::build(initial, None)
}

/// Create a writable store whose `notifier` runs on the first subscription.
///
/// The teardown it returns runs when the last subscriber leaves.
pub fn writable_with<T, F>(initial: T, notifier: F) -> Writable<T>
where
    T: StoreValue,
    F: FnMut(Setter<T>) -> Option<Teardown> + 'static,
{
    Writable::build(initial, Some(Box::new(notifier)))
}

/// Create a read-only store; `notifier` is the only way to change its value
pub fn readable<T, F>(initial: T, notifier: F) -> Readable<T>
where
    T: StoreValue,
    F: FnMut(Setter<T>) -> Option<Teardown> + 'static,
{
    writable_with(initial, notifier).readable()
}

/// Read any store's current value by subscribing and immediately unsubscribing
pub fn get<S: Subscribable>(store: &S) -> Option<S::Value> {
    let slot = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&slot);
    store
        .subscribe(move |value: &S::Value| *sink.borrow_mut() = Some(value.clone()))
        .unsubscribe();
    let value = slot.borrow_mut().take();
    value
}
