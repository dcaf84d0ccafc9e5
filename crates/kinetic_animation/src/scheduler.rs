//! Frame scheduler
//!
//! Runs every active per-frame task once per frame. The scheduler asks its
//! [`FrameClock`] for a frame when the first task arrives, keeps asking
//! while tasks remain, and goes idle once the last one finishes.
//!
//! Springs and tweens register their tasks on the thread's current
//! scheduler ([`FrameScheduler::current`]). A host with its own frame
//! source installs a clock and calls [`FrameScheduler::tick`] from its
//! frame callback; without one, [`FrameScheduler::run_until_idle`] drives
//! the tasks from the wall clock.

use crate::completion::Completion;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

new_key_type! {
    pub struct TaskId;
}

/// Source of frame times and frame requests
pub trait FrameClock {
    /// Current time in milliseconds
    fn now(&self) -> f64;

    /// Ask the host for a frame. The host answers by calling `tick`.
    fn request_frame(&self);

    /// How long `run_until_idle` sleeps between frames, if at all
    fn frame_interval(&self) -> Option<Duration> {
        None
    }
}

/// Fallback clock backed by `Instant`, paced at 60 frames per second
pub struct WallClock {
    origin: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for WallClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    fn request_frame(&self) {}

    fn frame_interval(&self) -> Option<Duration> {
        Some(Duration::from_micros(16_667))
    }
}

#[derive(Default)]
struct ManualClockState {
    now: Cell<f64>,
    requests: Cell<usize>,
}

/// A clock the host (or a test) advances by hand
#[derive(Clone, Default)]
pub struct ManualClock {
    state: Rc<ManualClockState>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: f64) {
        self.state.now.set(self.state.now.get() + ms);
    }

    pub fn set(&self, ms: f64) {
        self.state.now.set(ms);
    }

    /// How many frames have been requested so far
    pub fn frame_requests(&self) -> usize {
        self.state.requests.get()
    }
}

impl FrameClock for ManualClock {
    fn now(&self) -> f64 {
        self.state.now.get()
    }

    fn request_frame(&self) {
        self.state.requests.set(self.state.requests.get() + 1);
    }
}

type Predicate = Box<dyn FnMut(f64) -> bool>;

struct TaskEntry {
    /// `None` while the predicate is running
    predicate: Option<Predicate>,
    completion: Completion,
}

/// The scheduler that ticks all active per-frame tasks
pub struct FrameScheduler {
    tasks: RefCell<SlotMap<TaskId, TaskEntry>>,
    clock: RefCell<Rc<dyn FrameClock>>,
    frame_requested: Cell<bool>,
    frames: Cell<u64>,
}

thread_local! {
    static CURRENT: Rc<FrameScheduler> = Rc::new(FrameScheduler::new(Rc::new(WallClock::new())));
}

impl FrameScheduler {
    pub fn new(clock: Rc<dyn FrameClock>) -> Self {
        Self {
            tasks: RefCell::new(SlotMap::with_key()),
            clock: RefCell::new(clock),
            frame_requested: Cell::new(false),
            frames: Cell::new(0),
        }
    }

    /// This thread's scheduler, created with a [`WallClock`] on first use
    pub fn current() -> Rc<FrameScheduler> {
        CURRENT.with(Rc::clone)
    }

    /// Replace the clock used for frame times and frame requests
    pub fn install_clock(&self, clock: Rc<dyn FrameClock>) {
        *self.clock.borrow_mut() = clock;
        if self.frame_requested.get() {
            self.clock().request_frame();
        }
    }

    fn clock(&self) -> Rc<dyn FrameClock> {
        self.clock.borrow().clone()
    }

    pub fn now(&self) -> f64 {
        self.clock().now()
    }

    fn request_frame(&self) {
        if !self.frame_requested.replace(true) {
            tracing::trace!("frame requested");
            self.clock().request_frame();
        }
    }

    /// Run `predicate` once per frame until it returns false.
    ///
    /// The task's completion resolves when the predicate first returns false.
    pub fn loop_task<F>(self: &Rc<Self>, predicate: F) -> Task
    where
        F: FnMut(f64) -> bool + 'static,
    {
        let completion = Completion::new();
        let (id, was_empty) = {
            let mut tasks = self.tasks.borrow_mut();
            let was_empty = tasks.is_empty();
            let id = tasks.insert(TaskEntry {
                predicate: Some(Box::new(predicate)),
                completion: completion.clone(),
            });
            (id, was_empty)
        };

        tracing::debug!(?id, "task scheduled");
        if was_empty {
            self.request_frame();
        }

        Task {
            id,
            scheduler: Rc::downgrade(self),
            completion,
        }
    }

    /// Remove a task without resolving its completion
    fn abort(&self, id: TaskId) -> bool {
        let removed = self.tasks.borrow_mut().remove(id).is_some();
        if removed {
            tracing::debug!(?id, "task aborted");
        }
        removed
    }

    fn contains(&self, id: TaskId) -> bool {
        self.tasks.borrow().contains_key(id)
    }

    /// Run one frame at `frame_time` (milliseconds).
    ///
    /// Tasks added during the pass wait for the next frame; tasks aborted
    /// during the pass are skipped.
    pub fn tick(&self, frame_time: f64) {
        self.frame_requested.set(false);
        self.frames.set(self.frames.get() + 1);

        let ids: SmallVec<[TaskId; 8]> = self.tasks.borrow().keys().collect();
        tracing::trace!(frame_time, tasks = ids.len(), "tick");

        for id in ids {
            let predicate = match self.tasks.borrow_mut().get_mut(id) {
                Some(entry) => entry.predicate.take(),
                None => continue,
            };
            let Some(mut predicate) = predicate else {
                continue;
            };

            let keep_running = predicate(frame_time);

            let finished = {
                let mut tasks = self.tasks.borrow_mut();
                if keep_running {
                    // Missing if it aborted itself from inside its own predicate
                    if let Some(entry) = tasks.get_mut(id) {
                        entry.predicate = Some(predicate);
                    }
                    None
                } else {
                    tasks.remove(id).map(|entry| entry.completion)
                }
            };

            if let Some(completion) = finished {
                tracing::debug!(?id, "task completed");
                completion.resolve();
            }
        }

        if self.tasks.borrow().is_empty() {
            tracing::debug!(frames = self.frames.get(), "scheduler idle");
        } else {
            self.request_frame();
        }
    }

    /// Tick at the clock's current time if a frame has been requested
    pub fn advance(&self) -> bool {
        if !self.frame_requested.get() {
            return false;
        }
        let now = self.now();
        self.tick(now);
        true
    }

    /// Drive frames until no task remains or `max_frames` have run.
    ///
    /// Sleeps the clock's frame interval between frames. Returns the number
    /// of frames run.
    pub fn run_until_idle(&self, max_frames: usize) -> usize {
        let mut ran = 0;
        while ran < max_frames && self.frame_requested.get() {
            if let Some(interval) = self.clock().frame_interval() {
                std::thread::sleep(interval);
            }
            self.advance();
            ran += 1;
        }
        ran
    }

    pub fn task_count(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn is_idle(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    pub fn is_frame_requested(&self) -> bool {
        self.frame_requested.get()
    }

    /// Total frames ticked by this scheduler
    pub fn frame_count(&self) -> u64 {
        self.frames.get()
    }
}

/// Handle to a scheduled per-frame task
#[derive(Clone)]
pub struct Task {
    id: TaskId,
    scheduler: Weak<FrameScheduler>,
    completion: Completion,
}

impl Task {
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Resolves when the predicate first returns false. Never resolves for
    /// an aborted task.
    pub fn completion(&self) -> Completion {
        self.completion.clone()
    }

    /// Stop the task before its next frame. Idempotent.
    pub fn abort(&self) {
        if let Some(scheduler) = self.scheduler.upgrade() {
            scheduler.abort(self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.scheduler
            .upgrade()
            .is_some_and(|scheduler| scheduler.contains(self.id))
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Schedule a per-frame task on this thread's scheduler
pub fn loop_task<F>(predicate: F) -> Task
where
    F: FnMut(f64) -> bool + 'static,
{
    FrameScheduler::current().loop_task(predicate)
}

/// Current time of this thread's scheduler clock, in milliseconds
pub fn now() -> f64 {
    FrameScheduler::current().now()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual() -> (Rc<FrameScheduler>, ManualClock) {
        let clock = ManualClock::new();
        let scheduler = Rc::new(FrameScheduler::new(Rc::new(clock.clone())));
        (scheduler, clock)
    }

    #[test]
    fn test_first_task_requests_frame() {
        let (scheduler, clock) = manual();
        assert!(!scheduler.is_frame_requested());

        let _a = scheduler.loop_task(|_| true);
        let _b = scheduler.loop_task(|_| true);

        assert!(scheduler.is_frame_requested());
        assert_eq!(clock.frame_requests(), 1);
        assert_eq!(scheduler.task_count(), 2);
    }

    #[test]
    fn test_task_runs_until_predicate_false() {
        let (scheduler, clock) = manual();
        let calls = Rc::new(Cell::new(0));

        let c = calls.clone();
        let task = scheduler.loop_task(move |_| {
            c.set(c.get() + 1);
            c.get() < 3
        });
        let completion = task.completion();

        for _ in 0..5 {
            clock.advance(16.0);
            scheduler.advance();
        }

        assert_eq!(calls.get(), 3);
        assert!(completion.is_resolved());
        assert!(!task.is_active());
    }

    #[test]
    fn test_scheduler_idles_after_last_task() {
        let (scheduler, clock) = manual();
        let _task = scheduler.loop_task(|now| now < 32.0);

        clock.advance(16.0);
        assert!(scheduler.advance());
        assert_eq!(clock.frame_requests(), 2);

        clock.advance(16.0);
        assert!(scheduler.advance());

        assert!(scheduler.is_idle());
        assert!(!scheduler.is_frame_requested());
        assert!(!scheduler.advance());
        assert_eq!(clock.frame_requests(), 2);

        let _again = scheduler.loop_task(|_| false);
        assert_eq!(clock.frame_requests(), 3);
    }

    #[test]
    fn test_abort_never_resolves() {
        let (scheduler, clock) = manual();
        let task = scheduler.loop_task(|_| true);
        let completion = task.completion();

        task.abort();
        task.abort();
        clock.advance(16.0);
        scheduler.advance();

        assert!(!completion.is_resolved());
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_sibling_abort_during_tick() {
        let (scheduler, clock) = manual();
        let visits = Rc::new(RefCell::new(Vec::new()));

        let victim: Rc<RefCell<Option<Task>>> = Rc::new(RefCell::new(None));
        let (v, slot) = (visits.clone(), victim.clone());
        let _killer = scheduler.loop_task(move |_| {
            v.borrow_mut().push("killer");
            if let Some(task) = slot.borrow_mut().take() {
                task.abort();
            }
            true
        });
        let v = visits.clone();
        let target = scheduler.loop_task(move |_| {
            v.borrow_mut().push("victim");
            true
        });
        let v = visits.clone();
        let _bystander = scheduler.loop_task(move |_| {
            v.borrow_mut().push("bystander");
            true
        });
        *victim.borrow_mut() = Some(target);

        clock.advance(16.0);
        scheduler.advance();

        assert_eq!(*visits.borrow(), vec!["killer", "bystander"]);
        assert_eq!(scheduler.task_count(), 2);
    }

    #[test]
    fn test_task_can_abort_itself() {
        let (scheduler, clock) = manual();
        let me: Rc<RefCell<Option<Task>>> = Rc::new(RefCell::new(None));
        let slot = me.clone();
        let task = scheduler.loop_task(move |_| {
            if let Some(task) = slot.borrow().as_ref() {
                task.abort();
            }
            false
        });
        let completion = task.completion();
        *me.borrow_mut() = Some(task);

        clock.advance(16.0);
        scheduler.advance();

        assert!(!completion.is_resolved());
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_task_added_during_tick_runs_next_frame() {
        let (scheduler, clock) = manual();
        let spawned = Rc::new(Cell::new(0));

        let weak = Rc::downgrade(&scheduler);
        let s = spawned.clone();
        let mut once = true;
        let _parent = scheduler.loop_task(move |_| {
            if once {
                once = false;
                if let Some(scheduler) = weak.upgrade() {
                    let s = s.clone();
                    let _child = scheduler.loop_task(move |_| {
                        s.set(s.get() + 1);
                        false
                    });
                }
            }
            false
        });

        clock.advance(16.0);
        scheduler.advance();
        assert_eq!(spawned.get(), 0);
        assert!(scheduler.is_frame_requested());

        clock.advance(16.0);
        scheduler.advance();
        assert_eq!(spawned.get(), 1);
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_frame_time_is_passed_to_predicate() {
        let (scheduler, clock) = manual();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let _task = scheduler.loop_task(move |now| {
            s.borrow_mut().push(now);
            now < 40.0
        });

        for _ in 0..3 {
            clock.advance(20.0);
            scheduler.advance();
        }
        assert_eq!(*seen.borrow(), vec![20.0, 40.0]);
    }

    #[test]
    fn test_run_until_idle_with_manual_clock() {
        let (scheduler, _clock) = manual();
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let _task = scheduler.loop_task(move |_| {
            c.set(c.get() + 1);
            c.get() < 4
        });

        assert_eq!(scheduler.run_until_idle(100), 4);
        assert!(scheduler.is_idle());
    }
}
