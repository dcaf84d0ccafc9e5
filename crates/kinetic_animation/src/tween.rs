//! Tweened stores
//!
//! A [`Tweened`] store moves from its current value to a new target over a
//! fixed duration, pushing `interpolate(from, to)(easing(elapsed / duration))`
//! once per frame and finishing on the exact target.

use crate::completion::Completion;
use crate::easing::Easing;
use crate::error::Result;
use crate::interpolate::{default_factory, Interpolator, InterpolatorFactory};
use crate::scheduler::{FrameScheduler, Task};
use crate::value::Value;
use kinetic_core::derived::{DeriveRound, StoreSet};
use kinetic_core::store::{writable, Readable, Subscribable, Unsubscriber, Writable};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Length of a tween in milliseconds
#[derive(Clone)]
pub enum TweenDuration {
    Fixed(f64),
    /// Computed from `(from, to)` once, on the tween's first active frame
    Dynamic(Rc<dyn Fn(&Value, &Value) -> f64>),
}

impl TweenDuration {
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&Value, &Value) -> f64 + 'static,
    {
        TweenDuration::Dynamic(Rc::new(f))
    }

    fn resolve(&self, from: &Value, to: &Value) -> f64 {
        match self {
            TweenDuration::Fixed(ms) => *ms,
            TweenDuration::Dynamic(f) => f(from, to),
        }
    }

    fn is_zero(&self) -> bool {
        matches!(self, TweenDuration::Fixed(ms) if *ms == 0.0)
    }
}

impl Default for TweenDuration {
    fn default() -> Self {
        TweenDuration::Fixed(400.0)
    }
}

impl std::fmt::Debug for TweenDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TweenDuration::Fixed(ms) => f.debug_tuple("Fixed").field(ms).finish(),
            TweenDuration::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Store-wide tween defaults
#[derive(Clone)]
pub struct TweenOptions {
    /// Milliseconds to hold the current value before moving
    pub delay: f64,
    pub duration: TweenDuration,
    pub easing: Easing,
    pub interpolate: InterpolatorFactory,
}

impl Default for TweenOptions {
    fn default() -> Self {
        Self {
            delay: 0.0,
            duration: TweenDuration::default(),
            easing: Easing::Linear,
            interpolate: default_factory(),
        }
    }
}

impl TweenOptions {
    pub fn with_delay(mut self, ms: f64) -> Self {
        self.delay = ms;
        self
    }

    pub fn with_duration(mut self, ms: f64) -> Self {
        self.duration = TweenDuration::Fixed(ms);
        self
    }

    pub fn with_dynamic_duration<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &Value) -> f64 + 'static,
    {
        self.duration = TweenDuration::dynamic(f);
        self
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn with_interpolator<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Value, &Value) -> Result<Interpolator> + 'static,
    {
        self.interpolate = Rc::new(factory);
        self
    }
}

impl std::fmt::Debug for TweenOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TweenOptions")
            .field("delay", &self.delay)
            .field("duration", &self.duration)
            .field("easing", &self.easing)
            .finish_non_exhaustive()
    }
}

/// Per-call overrides for [`Tweened::set_with`]; unset fields fall back to
/// the store's [`TweenOptions`]
#[derive(Clone, Default)]
pub struct TweenOverrides {
    pub delay: Option<f64>,
    pub duration: Option<TweenDuration>,
    pub easing: Option<Easing>,
    pub interpolate: Option<InterpolatorFactory>,
}

impl TweenOverrides {
    pub fn delay(mut self, ms: f64) -> Self {
        self.delay = Some(ms);
        self
    }

    pub fn duration(mut self, ms: f64) -> Self {
        self.duration = Some(TweenDuration::Fixed(ms));
        self
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = Some(easing);
        self
    }

    pub fn interpolate<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Value, &Value) -> Result<Interpolator> + 'static,
    {
        self.interpolate = Some(Rc::new(factory));
        self
    }

    fn apply(self, defaults: &TweenOptions) -> TweenOptions {
        TweenOptions {
            delay: self.delay.unwrap_or(defaults.delay),
            duration: self.duration.unwrap_or_else(|| defaults.duration.clone()),
            easing: self.easing.unwrap_or(defaults.easing),
            interpolate: self
                .interpolate
                .unwrap_or_else(|| defaults.interpolate.clone()),
        }
    }
}

struct TweenState {
    value: Value,
    target: Value,
    /// Every tween task that may still push values, newest last. A tween
    /// only aborts its predecessors once it has started moving.
    tasks: Vec<Task>,
    token: u64,
    options: TweenOptions,
}

impl TweenState {
    fn live_tasks(&mut self) -> Vec<Task> {
        let mut tasks = std::mem::take(&mut self.tasks);
        tasks.retain(Task::is_active);
        tasks
    }

    fn snap(&mut self, value: Value) -> u64 {
        for task in self.live_tasks() {
            task.abort();
        }
        self.token += 1;
        self.value = value.clone();
        self.target = value;
        self.token
    }
}

/// A store animated by timed interpolation
#[derive(Clone)]
pub struct Tweened {
    store: Writable<Value>,
    state: Rc<RefCell<TweenState>>,
    scheduler: Rc<FrameScheduler>,
}

/// Create a tweened store on this thread's scheduler
pub fn tweened(initial: impl Into<Value>, options: TweenOptions) -> Tweened {
    Tweened::with_scheduler(FrameScheduler::current(), initial, options)
}

impl Tweened {
    pub fn with_scheduler(
        scheduler: Rc<FrameScheduler>,
        initial: impl Into<Value>,
        options: TweenOptions,
    ) -> Self {
        let initial = initial.into();
        Self {
            store: writable(initial.clone()),
            state: Rc::new(RefCell::new(TweenState {
                value: initial.clone(),
                target: initial,
                tasks: Vec::new(),
                token: 0,
                options,
            })),
            scheduler,
        }
    }

    /// Tween to `target` with the store's defaults
    pub fn set(&self, target: impl Into<Value>) -> Result<Completion> {
        self.set_with(target, TweenOverrides::default())
    }

    /// Tween to `target`.
    ///
    /// Fails without touching the store if `target` cannot be reached from
    /// the current value, or from the target of a tween still in flight
    /// (which the value may have taken the shape of by the time this tween
    /// starts). The returned completion resolves when
    /// this tween lands on its target, unless a later `set` supersedes it.
    pub fn set_with(&self, target: impl Into<Value>, overrides: TweenOverrides) -> Result<Completion> {
        let target = target.into();
        let mut state = self.state.borrow_mut();
        let opts = overrides.apply(&state.options);

        if state.value.is_null() || opts.duration.is_zero() {
            let token = state.snap(target.clone());
            drop(state);
            tracing::debug!(token, "tween snapped");
            self.store.set(target);
            return Ok(Completion::resolved());
        }

        let previous = state.live_tasks();
        let mut checked = (opts.interpolate)(&state.value, &target).map(|_| ());
        if checked.is_ok() && !previous.is_empty() {
            checked = (opts.interpolate)(&state.target, &target).map(|_| ());
        }
        if let Err(err) = checked {
            state.tasks = previous;
            return Err(err);
        }

        state.token += 1;
        let token = state.token;
        state.target = target.clone();

        let start = self.scheduler.now() + opts.delay;
        let failed = Rc::new(Cell::new(false));
        let task = self.start_task(token, start, target, opts, previous.clone(), failed.clone());
        let task_completion = task.completion();
        state.tasks = previous;
        state.tasks.push(task);
        drop(state);
        tracing::debug!(token, start, "tween scheduled");

        let completion = Completion::new();
        let resolve = completion.clone();
        let controller = Rc::downgrade(&self.state);
        task_completion.on_resolve(move || {
            let current = controller.upgrade().map(|state| state.borrow().token);
            if !failed.get() && current == Some(token) {
                resolve.resolve();
            }
        });
        Ok(completion)
    }

    /// Tween to a function of `(target, value)`
    pub fn update<F>(&self, f: F) -> Result<Completion>
    where
        F: FnOnce(&Value, &Value) -> Value,
    {
        self.update_with(f, TweenOverrides::default())
    }

    pub fn update_with<F>(&self, f: F, overrides: TweenOverrides) -> Result<Completion>
    where
        F: FnOnce(&Value, &Value) -> Value,
    {
        let next = {
            let state = self.state.borrow();
            f(&state.target, &state.value)
        };
        self.set_with(next, overrides)
    }

    fn start_task(
        &self,
        token: u64,
        start: f64,
        target: Value,
        opts: TweenOptions,
        mut previous: Vec<Task>,
        failed: Rc<Cell<bool>>,
    ) -> Task {
        let state = Rc::downgrade(&self.state);
        let store = self.store.clone();
        let mut running: Option<(Interpolator, f64)> = None;

        self.scheduler.loop_task(move |now| {
            let Some(state) = state.upgrade() else {
                return false;
            };
            if now < start {
                return true;
            }

            let (next, done) = {
                let mut s = state.borrow_mut();

                if running.is_none() {
                    // Rebuilt from wherever the value is now, not where it was at `set`
                    match (opts.interpolate)(&s.value, &target) {
                        Ok(interpolator) => {
                            let duration = opts.duration.resolve(&s.value, &target);
                            running = Some((interpolator, duration));
                        }
                        Err(err) => {
                            // Earlier tweens keep running; this one never resolves.
                            tracing::error!(%err, token, "tween interpolation failed");
                            failed.set(true);
                            return false;
                        }
                    }
                    for previous in previous.drain(..) {
                        previous.abort();
                    }
                }
                let Some((interpolator, duration)) = running.as_ref() else {
                    return false;
                };

                let elapsed = now - start;
                let next = if *duration <= 0.0 || elapsed > *duration {
                    None
                } else {
                    Some(interpolator(opts.easing.apply(elapsed / duration)))
                };
                let done = next.is_none();
                let next = next.unwrap_or_else(|| target.clone());

                s.value = next.clone();
                (next, done)
            };

            store.set(next);
            if done {
                tracing::debug!(token, "tween finished");
            }
            !done
        })
    }

    /// Current value
    pub fn get(&self) -> Value {
        self.state.borrow().value.clone()
    }

    /// Value of the most recent `set`
    pub fn target(&self) -> Value {
        self.state.borrow().target.clone()
    }

    pub fn is_animating(&self) -> bool {
        self.state.borrow().tasks.iter().any(Task::is_active)
    }

    pub fn options(&self) -> TweenOptions {
        self.state.borrow().options.clone()
    }

    /// Replace the defaults used by later `set` calls
    pub fn set_options(&self, options: TweenOptions) {
        self.state.borrow_mut().options = options;
    }

    pub fn readable(&self) -> Readable<Value> {
        self.store.readable()
    }
}

impl Subscribable for Tweened {
    type Value = Value;

    fn subscribe_with(&self, notify: Box<dyn Fn(&Value)>, invalidate: Box<dyn Fn()>) -> Unsubscriber {
        self.store.subscribe_with(notify, invalidate)
    }
}

impl StoreSet for Tweened {
    type Values = Value;
    type Slots = Option<Value>;

    fn empty_slots(&self) -> Option<Value> {
        None
    }

    fn connect(&self, slots: &Rc<RefCell<Option<Value>>>, round: &Rc<DeriveRound>) -> Vec<Unsubscriber> {
        self.store.readable().connect(slots, round)
    }

    fn values(slots: &Option<Value>) -> Option<Value> {
        slots.clone()
    }
}
