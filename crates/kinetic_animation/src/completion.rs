//! One-shot completion signals
//!
//! A [`Completion`] is handed out by `loop_task` and by every spring or
//! tween `set`. It resolves at most once. Callers can poll it, register a
//! callback, or `.await` it from a single-threaded executor.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

#[derive(Default)]
struct CompletionState {
    resolved: bool,
    callbacks: Vec<Box<dyn FnOnce()>>,
    waker: Option<Waker>,
}

/// A shared, single-threaded completion flag
#[derive(Clone, Default)]
pub struct Completion {
    state: Rc<RefCell<CompletionState>>,
}

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    /// A completion that has already resolved
    pub fn resolved() -> Self {
        let completion = Self::new();
        completion.state.borrow_mut().resolved = true;
        completion
    }

    pub fn is_resolved(&self) -> bool {
        self.state.borrow().resolved
    }

    /// Run `f` once this completion resolves (immediately if it already has)
    pub fn on_resolve<F: FnOnce() + 'static>(&self, f: F) {
        let mut state = self.state.borrow_mut();
        if state.resolved {
            drop(state);
            f();
        } else {
            state.callbacks.push(Box::new(f));
        }
    }

    /// Resolve and run the registered callbacks. Resolving twice is a no-op.
    pub(crate) fn resolve(&self) {
        let (callbacks, waker) = {
            let mut state = self.state.borrow_mut();
            if state.resolved {
                return;
            }
            state.resolved = true;
            (std::mem::take(&mut state.callbacks), state.waker.take())
        };

        for callback in callbacks {
            callback();
        }
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

impl Future for Completion {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut state = self.state.borrow_mut();
        if state.resolved {
            Poll::Ready(())
        } else {
            state.waker = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}
