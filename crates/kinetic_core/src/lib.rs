//! Kinetic Core Runtime
//!
//! This crate provides the observable containers the rest of Kinetic is
//! built on:
//!
//! - **Stores**: `writable` and `readable` values with synchronous,
//!   ordered, batched notification
//! - **Derived stores**: glitch-free values computed from other stores
//! - **Change detection**: the `StoreValue` rule deciding when a write notifies
//!
//! Everything here is single-threaded. Stores are `Rc` handles and never
//! cross threads; delivery happens on the caller's turn.
//!
//! # Example
//!
//! ```rust
//! use kinetic_core::{derived, writable, Subscribable};
//!
//! let count = writable(1i32);
//! let doubled = derived(count.clone(), |v: &i32| v * 2);
//!
//! let _sub = doubled.subscribe(|v| println!("doubled is now {v}"));
//! count.set(5);
//! assert_eq!(doubled.get(), 10);
//! ```

pub mod derived;
pub mod store;
pub mod value;

pub use derived::{derived, derived_with, derived_with_initial, DeriveRound, StoreSet};
pub use store::{
    get, readable, writable, writable_with, Readable, Setter, StartStopNotifier, Subscribable,
    Teardown, Unsubscriber, Writable,
};
pub use value::StoreValue;
