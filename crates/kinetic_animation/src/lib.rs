//! Kinetic Animation System
//!
//! Frame-driven springs and tweens exposed as subscribable stores.
//!
//! # Features
//!
//! - **Frame Scheduler**: one shared set of per-frame tasks, driven by a
//!   pluggable [`FrameClock`]
//! - **Spring Physics**: damped springs over numbers, dates, arrays and records
//! - **Tweens**: timed interpolation with delays, easing and custom interpolators
//! - **Completions**: every `set` returns a handle that resolves when the
//!   animation lands, and never resolves if a later `set` supersedes it
//!
//! # Example
//!
//! ```rust
//! use kinetic_animation::{FrameScheduler, ManualClock, Spring, SpringOptions};
//! use std::rc::Rc;
//!
//! let clock = ManualClock::new();
//! let scheduler = Rc::new(FrameScheduler::new(Rc::new(clock.clone())));
//! let spring = Spring::with_scheduler(scheduler.clone(), 0.0, SpringOptions::stiff());
//!
//! let done = spring.set(1.0).unwrap();
//! while scheduler.is_frame_requested() {
//!     clock.advance(1000.0 / 60.0);
//!     scheduler.advance();
//! }
//! assert!(done.is_resolved());
//! ```

pub mod completion;
pub mod easing;
pub mod error;
pub mod interpolate;
pub mod scheduler;
pub mod spring;
pub mod tween;
pub mod value;

pub use completion::Completion;
pub use easing::Easing;
pub use error::{AnimationError, Result};
pub use interpolate::{default_factory, default_interpolator, Interpolator, InterpolatorFactory};
pub use scheduler::{loop_task, now, FrameClock, FrameScheduler, ManualClock, Task, TaskId, WallClock};
pub use spring::{spring, SetOptions, Soft, Spring, SpringOptions};
pub use tween::{tweened, TweenDuration, TweenOptions, TweenOverrides, Tweened};
pub use value::{Value, ValueKind};
