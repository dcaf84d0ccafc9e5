//! Spring stores
//!
//! A [`Spring`] is a store whose value chases a target with a damped
//! harmonic oscillator. Each frame advances the value by one integration
//! step, normalized so that `dt == 1` at 60 frames per second:
//!
//! ```text
//! velocity     = (current - last) / dt
//! acceleration = (stiffness * (target - current) - damping * velocity) * inv_mass
//! next         = current + (velocity + acceleration) * dt
//! ```
//!
//! The spring settles (snaps exactly onto the target and stops ticking)
//! once both the step and the remaining distance fall under `precision`.
//! Numbers, dates, arrays and records are stepped component-wise.
//!
//! Every `set` mints a new token. The completion returned by an earlier
//! `set` only resolves if no later `set` superseded it.

use crate::completion::Completion;
use crate::error::{AnimationError, Result};
use crate::scheduler::{FrameScheduler, Task};
use crate::value::Value;
use indexmap::IndexMap;
use kinetic_core::derived::{DeriveRound, StoreSet};
use kinetic_core::store::{writable, Readable, Subscribable, Unsubscriber, Writable};
use std::cell::RefCell;
use std::rc::Rc;

/// Spring configuration
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpringOptions {
    /// Pull toward the target per unit distance
    pub stiffness: f64,
    /// Resistance per unit velocity
    pub damping: f64,
    /// Settling threshold for both step size and remaining distance
    pub precision: f64,
}

impl Default for SpringOptions {
    fn default() -> Self {
        Self {
            stiffness: 0.15,
            damping: 0.8,
            precision: 0.01,
        }
    }
}

impl SpringOptions {
    pub fn new(stiffness: f64, damping: f64) -> Self {
        Self {
            stiffness,
            damping,
            ..Self::default()
        }
    }

    /// Soft and slow, little overshoot
    pub fn gentle() -> Self {
        Self::new(0.08, 0.9)
    }

    /// Visible bounce before settling
    pub fn wobbly() -> Self {
        Self::new(0.2, 0.35)
    }

    /// Fast with almost no overshoot
    pub fn stiff() -> Self {
        Self::new(0.4, 0.9)
    }

    /// Fast with a slight overshoot
    pub fn snappy() -> Self {
        Self::new(0.3, 0.6)
    }

    pub fn with_stiffness(mut self, stiffness: f64) -> Self {
        self.stiffness = stiffness;
        self
    }

    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_precision(mut self, precision: f64) -> Self {
        self.precision = precision;
        self
    }
}

/// How long a soft set keeps the spring weightless
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Soft {
    /// Half a second
    Default,
    Seconds(f64),
}

impl Soft {
    pub fn seconds(self) -> f64 {
        match self {
            Soft::Default => 0.5,
            Soft::Seconds(s) => s,
        }
    }
}

/// Per-call options for [`Spring::set_with`]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SetOptions {
    /// Snap to the value immediately
    pub hard: bool,
    /// Drop the spring's mass to zero and let it recover over a period,
    /// so frequent retargeting eases in rather than yanking
    pub soft: Option<Soft>,
}

impl SetOptions {
    pub fn hard() -> Self {
        Self {
            hard: true,
            soft: None,
        }
    }

    pub fn soft() -> Self {
        Self {
            hard: false,
            soft: Some(Soft::Default),
        }
    }

    pub fn soft_for(seconds: f64) -> Self {
        Self {
            hard: false,
            soft: Some(Soft::Seconds(seconds)),
        }
    }
}

struct SpringState {
    value: Value,
    last: Value,
    target: Value,
    last_time: f64,
    inv_mass: f64,
    inv_mass_recovery: f64,
    task: Option<Task>,
    token: u64,
    options: SpringOptions,
}

/// Inputs shared by every component of one integration step
#[derive(Clone, Copy, Debug)]
pub(crate) struct StepContext {
    pub stiffness: f64,
    pub damping: f64,
    pub precision: f64,
    pub inv_mass: f64,
    /// Frame delta normalized to 60fps
    pub dt: f64,
    /// Cleared by any component that has not settled yet
    pub settled: bool,
}

/// Advance one scalar component
fn step_scalar(ctx: &mut StepContext, last: f64, current: f64, target: f64) -> f64 {
    let delta = target - current;
    let velocity = (current - last) / if ctx.dt == 0.0 { 1.0 / 60.0 } else { ctx.dt };
    let spring = ctx.stiffness * delta;
    let damper = ctx.damping * velocity;
    let acceleration = (spring - damper) * ctx.inv_mass;
    let d = (velocity + acceleration) * ctx.dt;

    if d.abs() < ctx.precision && delta.abs() < ctx.precision {
        target
    } else {
        ctx.settled = false;
        current + d
    }
}

fn scalar_of(value: &Value, expected: &Value) -> Result<f64> {
    match (value, expected) {
        (Value::Number(n), Value::Number(_)) | (Value::Date(n), Value::Date(_)) => Ok(*n),
        _ => Err(AnimationError::KindMismatch {
            from: expected.kind(),
            to: value.kind(),
        }),
    }
}

/// Advance `current` one step toward `target`, matching the shape of `current`.
///
/// Builds the whole next value before returning, so a failure leaves
/// nothing half-stepped.
pub(crate) fn step(ctx: &mut StepContext, last: &Value, current: &Value, target: &Value) -> Result<Value> {
    match current {
        Value::Number(c) => {
            let (l, t) = (scalar_of(last, current)?, scalar_of(target, current)?);
            Ok(Value::Number(step_scalar(ctx, l, *c, t)))
        }
        Value::Date(c) => {
            let (l, t) = (scalar_of(last, current)?, scalar_of(target, current)?);
            Ok(Value::Date(step_scalar(ctx, l, *c, t)))
        }
        Value::Array(items) => {
            let (Value::Array(lasts), Value::Array(targets)) = (last, target) else {
                return Err(AnimationError::KindMismatch {
                    from: current.kind(),
                    to: target.kind(),
                });
            };
            if lasts.len() != items.len() || targets.len() != items.len() {
                return Err(AnimationError::ShapeMismatch {
                    detail: format!(
                        "array of {} elements cannot spring toward {} elements",
                        items.len(),
                        targets.len()
                    ),
                });
            }
            items
                .iter()
                .zip(lasts)
                .zip(targets)
                .map(|((c, l), t)| step(ctx, l, c, t))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array)
        }
        Value::Record(fields) => {
            let (Value::Record(lasts), Value::Record(targets)) = (last, target) else {
                return Err(AnimationError::KindMismatch {
                    from: current.kind(),
                    to: target.kind(),
                });
            };
            let mut next = IndexMap::with_capacity(fields.len());
            for (key, c) in fields {
                let (Some(l), Some(t)) = (lasts.get(key), targets.get(key)) else {
                    return Err(AnimationError::ShapeMismatch {
                        detail: format!("target record has no field `{key}`"),
                    });
                };
                next.insert(key.clone(), step(ctx, l, c, t)?);
            }
            Ok(Value::Record(next))
        }
        other => Err(AnimationError::Unsupported { kind: other.kind() }),
    }
}

/// Check that `target` can be sprung toward from `current`
fn check_shape(current: &Value, target: &Value) -> Result<()> {
    let mut trial = StepContext {
        stiffness: 0.0,
        damping: 0.0,
        precision: 0.0,
        inv_mass: 0.0,
        dt: 0.0,
        settled: true,
    };
    step(&mut trial, current, current, target).map(|_| ())
}

/// A store animated by spring physics
#[derive(Clone)]
pub struct Spring {
    store: Writable<Value>,
    state: Rc<RefCell<SpringState>>,
    scheduler: Rc<FrameScheduler>,
}

/// Create a spring store on this thread's scheduler
pub fn spring(initial: impl Into<Value>, options: SpringOptions) -> Spring {
    Spring::with_scheduler(FrameScheduler::current(), initial, options)
}

impl Spring {
    pub fn with_scheduler(
        scheduler: Rc<FrameScheduler>,
        initial: impl Into<Value>,
        options: SpringOptions,
    ) -> Self {
        let initial = initial.into();
        Self {
            store: writable(initial.clone()),
            state: Rc::new(RefCell::new(SpringState {
                value: initial.clone(),
                last: initial.clone(),
                target: initial,
                last_time: scheduler.now(),
                inv_mass: 1.0,
                inv_mass_recovery: 0.0,
                task: None,
                token: 0,
                options,
            })),
            scheduler,
        }
    }

    /// Retarget the spring with default options
    pub fn set(&self, target: impl Into<Value>) -> Result<Completion> {
        self.set_with(target, SetOptions::default())
    }

    /// Retarget the spring.
    ///
    /// The returned completion resolves once the spring settles on this
    /// target, unless a later `set` supersedes it first.
    pub fn set_with(&self, target: impl Into<Value>, opts: SetOptions) -> Result<Completion> {
        let target = target.into();
        let mut state = self.state.borrow_mut();

        let hard = opts.hard
            || state.value.is_null()
            || (state.options.stiffness >= 1.0 && state.options.damping >= 1.0);
        if !hard {
            check_shape(&state.value, &target)?;
        }

        state.token += 1;
        let token = state.token;
        state.target = target.clone();

        if hard {
            if let Some(task) = state.task.take() {
                task.abort();
            }
            state.last_time = self.scheduler.now();
            state.last = target.clone();
            state.value = target.clone();
            drop(state);

            tracing::debug!(token, "spring snapped");
            self.store.set(target);
            return Ok(Completion::resolved());
        }

        if let Some(soft) = opts.soft {
            state.inv_mass_recovery = 1.0 / (soft.seconds() * 60.0);
            state.inv_mass = 0.0;
        }

        let task_completion = match &state.task {
            Some(task) => task.completion(),
            None => {
                state.last_time = self.scheduler.now();
                let task = self.start_task();
                let completion = task.completion();
                state.task = Some(task);
                tracing::debug!(token, "spring animating");
                completion
            }
        };
        drop(state);

        let completion = Completion::new();
        let resolve = completion.clone();
        let controller = Rc::downgrade(&self.state);
        task_completion.on_resolve(move || {
            let current = controller.upgrade().map(|state| state.borrow().token);
            if current == Some(token) {
                resolve.resolve();
            }
        });
        Ok(completion)
    }

    /// Retarget using a function of `(target, value)`
    pub fn update<F>(&self, f: F) -> Result<Completion>
    where
        F: FnOnce(&Value, &Value) -> Value,
    {
        self.update_with(f, SetOptions::default())
    }

    pub fn update_with<F>(&self, f: F, opts: SetOptions) -> Result<Completion>
    where
        F: FnOnce(&Value, &Value) -> Value,
    {
        let next = {
            let state = self.state.borrow();
            f(&state.target, &state.value)
        };
        self.set_with(next, opts)
    }

    fn start_task(&self) -> Task {
        let state = Rc::downgrade(&self.state);
        let store = self.store.clone();

        self.scheduler.loop_task(move |now| {
            let Some(state) = state.upgrade() else {
                return false;
            };

            let (next, settled) = {
                let mut s = state.borrow_mut();
                s.inv_mass = (s.inv_mass + s.inv_mass_recovery).min(1.0);

                let mut ctx = StepContext {
                    stiffness: s.options.stiffness,
                    damping: s.options.damping,
                    precision: s.options.precision,
                    inv_mass: s.inv_mass,
                    dt: (now - s.last_time) * 60.0 / 1000.0,
                    settled: true,
                };

                match step(&mut ctx, &s.last, &s.value, &s.target) {
                    Ok(next) => {
                        s.last_time = now;
                        s.last = std::mem::replace(&mut s.value, next.clone());
                        if ctx.settled {
                            s.task = None;
                        }
                        (next, ctx.settled)
                    }
                    Err(err) => {
                        tracing::error!(%err, "spring step failed");
                        // Abort rather than finish so pending completions stay unresolved.
                        if let Some(task) = s.task.take() {
                            task.abort();
                        }
                        return false;
                    }
                }
            };

            store.set(next);
            if settled {
                tracing::debug!("spring settled");
            }
            !settled
        })
    }

    /// Current value
    pub fn get(&self) -> Value {
        self.state.borrow().value.clone()
    }

    /// Value the spring is heading toward
    pub fn target(&self) -> Value {
        self.state.borrow().target.clone()
    }

    pub fn is_animating(&self) -> bool {
        self.state.borrow().task.is_some()
    }

    pub fn options(&self) -> SpringOptions {
        self.state.borrow().options
    }

    pub fn stiffness(&self) -> f64 {
        self.state.borrow().options.stiffness
    }

    /// Takes effect on the next frame
    pub fn set_stiffness(&self, stiffness: f64) {
        self.state.borrow_mut().options.stiffness = stiffness;
    }

    pub fn damping(&self) -> f64 {
        self.state.borrow().options.damping
    }

    /// Takes effect on the next frame
    pub fn set_damping(&self, damping: f64) {
        self.state.borrow_mut().options.damping = damping;
    }

    pub fn precision(&self) -> f64 {
        self.state.borrow().options.precision
    }

    /// Takes effect on the next frame
    pub fn set_precision(&self, precision: f64) {
        self.state.borrow_mut().options.precision = precision;
    }

    /// A read-only view of the animated value, usable as a derived input
    pub fn readable(&self) -> Readable<Value> {
        self.store.readable()
    }
}

impl Subscribable for Spring {
    type Value = Value;

    fn subscribe_with(&self, notify: Box<dyn Fn(&Value)>, invalidate: Box<dyn Fn()>) -> Unsubscriber {
        self.store.subscribe_with(notify, invalidate)
    }
}

impl StoreSet for Spring {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualClock;

    const FRAME: f64 = 1000.0 / 60.0;

    fn setup(initial: impl Into<Value>, options: SpringOptions) -> (Spring, Rc<FrameScheduler>, ManualClock) {
        let clock = ManualClock::new();
        let scheduler = Rc::new(FrameScheduler::new(Rc::new(clock.clone())));
        let spring = Spring::with_scheduler(scheduler.clone(), initial, options);
        (spring, scheduler, clock)
    }

    fn run(scheduler: &FrameScheduler, clock: &ManualClock, frames: usize) -> usize {
        let mut ran = 0;
        while ran < frames && scheduler.is_frame_requested() {
            clock.advance(FRAME);
            scheduler.advance();
            ran += 1;
        }
        ran
    }

    fn number(value: &Value) -> f64 {
        value.as_number().unwrap_or(f64::NAN)
    }

    fn ctx() -> StepContext {
        let opts = SpringOptions::default();
        StepContext {
            stiffness: opts.stiffness,
            damping: opts.damping,
            precision: opts.precision,
            inv_mass: 1.0,
            dt: 1.0,
            settled: true,
        }
    }

    #[test]
    fn test_step_scalar_from_rest() {
        let mut ctx = ctx();
        // From rest, the first step is stiffness * delta.
        let next = step_scalar(&mut ctx, 0.0, 0.0, 10.0);
        assert!((next - 1.5).abs() < 1e-12);
        assert!(!ctx.settled);
    }

    #[test]
    fn test_step_scalar_settles_within_precision() {
        let mut ctx = ctx();
        let next = step_scalar(&mut ctx, 9.999, 9.999, 10.0);
        assert_eq!(next, 10.0);
        assert!(ctx.settled);
    }

    #[test]
    fn test_step_zero_dt_holds_position() {
        let mut ctx = StepContext { dt: 0.0, ..ctx() };
        let next = step_scalar(&mut ctx, 0.0, 0.0, 10.0);
        assert_eq!(next, 0.0);
        assert!(!ctx.settled);
    }

    #[test]
    fn test_step_record_of_arrays() {
        let mut ctx = ctx();
        let current = Value::record([("p", Value::from(vec![0.0, 0.0]))]);
        let target = Value::record([("p", Value::from(vec![10.0, 0.0]))]);
        let next = step(&mut ctx, &current, &current, &target);
        assert_eq!(next, Ok(Value::record([("p", Value::from(vec![1.5, 0.0]))])));
    }

    #[test]
    fn test_step_rejects_unsupported_kind() {
        let mut ctx = ctx();
        let text = Value::from("x");
        assert_eq!(
            step(&mut ctx, &text, &text, &text),
            Err(AnimationError::Unsupported {
                kind: crate::value::ValueKind::Text
            })
        );
    }

    #[test]
    fn test_spring_settles_on_target() {
        let (spring, scheduler, clock) = setup(0.0, SpringOptions::default());
        let completion = spring.set(10.0).expect("number target");
        assert!(spring.is_animating());

        let frames = run(&scheduler, &clock, 1000);

        assert!(frames < 1000, "spring never settled");
        assert_eq!(spring.get(), Value::Number(10.0));
        assert!(completion.is_resolved());
        assert!(!spring.is_animating());
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_spring_overshoot_is_bounded() {
        let (spring, scheduler, clock) = setup(0.0, SpringOptions::default());
        let peak = Rc::new(RefCell::new(0.0f64));
        let p = peak.clone();
        let _sub = spring.subscribe(move |v: &Value| {
            let mut peak = p.borrow_mut();
            *peak = peak.max(number(v));
        });

        spring.set(10.0).expect("number target");
        run(&scheduler, &clock, 1000);

        assert!(*peak.borrow() < 15.0, "peak {}", peak.borrow());
    }

    #[test]
    fn test_hard_set_is_synchronous() {
        let (spring, scheduler, _clock) = setup(0.0, SpringOptions::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let _sub = spring.subscribe(move |v: &Value| s.borrow_mut().push(v.clone()));

        let completion = spring.set_with(10.0, SetOptions::hard()).expect("hard set");

        assert!(completion.is_resolved());
        assert_eq!(spring.get(), Value::Number(10.0));
        assert_eq!(*seen.borrow(), vec![Value::Number(0.0), Value::Number(10.0)]);
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_rigid_spring_snaps() {
        let (spring, scheduler, _clock) = setup(0.0, SpringOptions::new(1.0, 1.0));
        let completion = spring.set(5.0).expect("number target");
        assert!(completion.is_resolved());
        assert_eq!(spring.get(), Value::Number(5.0));
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_unset_spring_snaps_first_value() {
        let (spring, _scheduler, _clock) = setup(Value::Null, SpringOptions::default());
        let completion = spring.set(3.0).expect("first value");
        assert!(completion.is_resolved());
        assert_eq!(spring.get(), Value::Number(3.0));
    }

    #[test]
    fn test_hard_set_cancels_animation() {
        let (spring, scheduler, clock) = setup(0.0, SpringOptions::default());
        let first = spring.set(100.0).expect("number target");
        run(&scheduler, &clock, 3);

        spring.set_with(-5.0, SetOptions::hard()).expect("hard set");
        assert!(scheduler.is_idle());
        run(&scheduler, &clock, 10);

        assert_eq!(spring.get(), Value::Number(-5.0));
        assert!(!first.is_resolved());
    }

    #[test]
    fn test_only_latest_completion_resolves() {
        let (spring, scheduler, clock) = setup(0.0, SpringOptions::default());
        let first = spring.set(5.0).expect("number target");
        let second = spring.set(10.0).expect("number target");

        run(&scheduler, &clock, 1000);

        assert!(second.is_resolved());
        assert!(!first.is_resolved());
        assert_eq!(spring.get(), Value::Number(10.0));
    }

    #[test]
    fn test_retarget_mid_flight_reuses_task() {
        let (spring, scheduler, clock) = setup(0.0, SpringOptions::default());
        spring.set(100.0).expect("number target");
        run(&scheduler, &clock, 5);
        let mid = number(&spring.get());
        assert!(mid > 0.0 && mid < 100.0);

        spring.set(0.0).expect("number target");
        assert_eq!(scheduler.task_count(), 1);

        run(&scheduler, &clock, 1000);
        assert_eq!(spring.get(), Value::Number(0.0));
    }

    #[test]
    fn test_soft_set_starts_slowly() {
        let (hard_spring, s1, c1) = setup(0.0, SpringOptions::default());
        let (soft_spring, s2, c2) = setup(0.0, SpringOptions::default());

        hard_spring.set(10.0).expect("number target");
        soft_spring.set_with(10.0, SetOptions::soft()).expect("soft set");
        run(&s1, &c1, 3);
        run(&s2, &c2, 3);

        assert!(number(&soft_spring.get()) < number(&hard_spring.get()));

        run(&s2, &c2, 2000);
        assert_eq!(soft_spring.get(), Value::Number(10.0));
    }

    #[test]
    fn test_soft_period_sets_mass_recovery() {
        let (half, s1, c1) = setup(0.0, SpringOptions::default());
        let (whole, s2, c2) = setup(0.0, SpringOptions::default());

        half.set_with(10.0, SetOptions::soft()).expect("soft set");
        whole.set_with(10.0, SetOptions::soft_for(1.0)).expect("soft set");
        run(&s1, &c1, 1);
        run(&s2, &c2, 1);

        // First step: 0.15 * 10 at a mass recovery of 1/30 versus 1/60 per frame
        assert!((number(&half.get()) - 0.05).abs() < 1e-6);
        assert!((number(&whole.get()) - 0.025).abs() < 1e-6);

        let (spring, scheduler, clock) = setup(0.0, SpringOptions::gentle());
        spring.set_with(1e6, SetOptions::soft_for(1.0)).expect("soft set");
        run(&scheduler, &clock, 30);
        assert!((spring.state.borrow().inv_mass - 0.5).abs() < 1e-9);

        run(&scheduler, &clock, 40);
        assert_eq!(spring.state.borrow().inv_mass, 1.0);
        assert!(spring.is_animating());
    }

    #[test]
    fn test_array_and_record_springs() {
        let (spring, scheduler, clock) = setup(vec![0.0, 0.0], SpringOptions::stiff());
        spring.set(vec![1.0, -1.0]).expect("array target");
        run(&scheduler, &clock, 1000);
        assert_eq!(spring.get(), Value::from(vec![1.0, -1.0]));

        let (spring, scheduler, clock) =
            setup(Value::record([("x", 0.0), ("y", 0.0)]), SpringOptions::stiff());
        spring.set(Value::record([("x", 4.0), ("y", 2.0)])).expect("record target");
        run(&scheduler, &clock, 1000);
        assert_eq!(spring.get(), Value::record([("x", 4.0), ("y", 2.0)]));
    }

    #[test]
    fn test_date_spring() {
        let (spring, scheduler, clock) = setup(Value::Date(0.0), SpringOptions::stiff());
        spring.set(Value::Date(1000.0)).expect("date target");
        run(&scheduler, &clock, 1000);
        assert_eq!(spring.get(), Value::Date(1000.0));
    }

    #[test]
    fn test_mismatched_target_is_rejected_without_change() {
        let (spring, scheduler, _clock) = setup(vec![0.0, 0.0], SpringOptions::default());
        let err = spring.set(vec![1.0]).err();
        assert!(matches!(err, Some(AnimationError::ShapeMismatch { .. })));
        assert_eq!(spring.target(), Value::from(vec![0.0, 0.0]));
        assert!(scheduler.is_idle());

        let (spring, _, _) = setup(Value::from("idle"), SpringOptions::default());
        assert!(matches!(
            spring.set("busy"),
            Err(AnimationError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_options_are_read_each_frame() {
        let (spring, scheduler, clock) = setup(0.0, SpringOptions::default());
        spring.set(10.0).expect("number target");
        spring.set_stiffness(0.5);
        spring.set_damping(0.9);
        assert_eq!(spring.stiffness(), 0.5);

        run(&scheduler, &clock, 1);
        assert!((number(&spring.get()) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_spring_feeds_derived() {
        let (spring, scheduler, clock) = setup(0.0, SpringOptions::stiff());
        let doubled = kinetic_core::derived(spring.clone(), |v: &Value| Value::Number(number(v) * 2.0));
        let _sub = doubled.subscribe(|_| {});

        spring.set(4.0).expect("number target");
        run(&scheduler, &clock, 1000);
        assert_eq!(doubled.get(), Value::Number(8.0));
    }

    #[test]
    fn test_update_sees_target_and_value() {
        let (spring, scheduler, clock) = setup(1.0, SpringOptions::default());
        spring.set(4.0).expect("number target");
        spring
            .update(|target, _value| Value::Number(number(target) * 2.0))
            .expect("update");
        assert_eq!(spring.target(), Value::Number(8.0));
        run(&scheduler, &clock, 1000);
        assert_eq!(spring.get(), Value::Number(8.0));
    }
}
