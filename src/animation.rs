//! Transition execution
//!
//! Animation executors are external collaborators: they get the outgoing and
//! incoming views plus a direction, run whatever transition they like, and
//! must eventually call the completion callback. The queue enforces "eventually"
//! with a time limit, so a misbehaving executor costs animation correctness,
//! never liveness.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::queue::NavigationMessageQueue;
use crate::view::View;

/// One-shot signal marking a transition as over (finished or superseded).
///
/// Listeners registered after the signal fired run immediately; `cancel` is
/// idempotent, so completion and supersession can race without double-firing.
#[derive(Clone)]
pub struct CancellationSignal {
    inner: Rc<RefCell<SignalInner>>,
}

struct SignalInner {
    canceled: bool,
    listeners: Vec<Box<dyn FnOnce()>>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SignalInner {
                canceled: false,
                listeners: Vec::new(),
            })),
        }
    }

    pub fn cancel(&self) {
        let listeners = {
            let mut inner = self.inner.borrow_mut();
            if inner.canceled {
                return;
            }
            inner.canceled = true;
            std::mem::take(&mut inner.listeners)
        };
        for listener in listeners {
            listener();
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.inner.borrow().canceled
    }

    pub fn on_cancel(&self, listener: impl FnOnce() + 'static) {
        let fire_now = {
            let mut inner = self.inner.borrow_mut();
            if inner.canceled {
                true
            } else {
                inner.listeners.push(Box::new(listener));
                return;
            }
        };
        if fire_now {
            listener();
        }
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationDirection {
    Push,
    Pop,
}

/// What an executor gets to work with.
pub struct AnimationRequest {
    pub direction: AnimationDirection,
    pub from: Option<View>,
    pub to: Option<View>,
}

/// Runs enter/exit transitions for a push or pop.
///
/// Contract: `on_end` must be called exactly once, synchronously or later.
/// Executors should watch `signal` and finish early when it fires.
pub trait AnimationExecutor {
    fn execute(&self, request: AnimationRequest, signal: &CancellationSignal, on_end: Box<dyn FnOnce()>);
}

/// Completes every transition synchronously. The default for headless hosts.
pub struct InstantAnimationExecutor;

impl AnimationExecutor for InstantAnimationExecutor {
    fn execute(
        &self,
        request: AnimationRequest,
        _signal: &CancellationSignal,
        on_end: Box<dyn FnOnce()>,
    ) {
        log::trace!("instant {:?} transition", request.direction);
        on_end();
    }
}

/// Completes transitions via a timed queue task, like a real animator would
/// complete on a later frame. Cancellation completes immediately.
pub struct DeferredAnimationExecutor {
    queue: NavigationMessageQueue,
    duration: Duration,
}

impl DeferredAnimationExecutor {
    pub fn new(queue: NavigationMessageQueue, duration: Duration) -> Self {
        Self { queue, duration }
    }
}

impl AnimationExecutor for DeferredAnimationExecutor {
    fn execute(
        &self,
        request: AnimationRequest,
        signal: &CancellationSignal,
        on_end: Box<dyn FnOnce()>,
    ) {
        log::trace!(
            "deferred {:?} transition over {:?}",
            request.direction,
            self.duration
        );
        let slot: Rc<RefCell<Option<Box<dyn FnOnce()>>>> = Rc::new(RefCell::new(Some(on_end)));

        let cancel_slot = slot.clone();
        signal.on_cancel(move || {
            if let Some(end) = cancel_slot.borrow_mut().take() {
                end();
            }
        });

        let timed_slot = slot.clone();
        self.queue.post_timed(self.duration, move || {
            if let Some(end) = timed_slot.borrow_mut().take() {
                end();
            }
            Ok(())
        });
    }
}
