//! Navigation message queue
//!
//! All structural stack mutations funnel through one single-threaded queue.
//! Semantics, in order of importance:
//!
//! - at most one task executes at a time;
//! - a task posted while the queue is idle runs inline; a task posted while
//!   another task is executing is deferred until the loop is pumped again;
//! - head insertion exists so a composite operation can schedule its own
//!   sub-phases ahead of anything queued by external callers;
//! - timed tasks become runnable once their deadline passes, which is how
//!   "run this when the animation finished or after N seconds, whichever is
//!   first" keeps the stack live even if an animation callback never arrives.
//!
//! The host drives the loop explicitly with [`NavigationMessageQueue::run_until_idle`];
//! tests run it synchronously to completion.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::animation::CancellationSignal;
use crate::error::Result;

type QueueTask = Box<dyn FnOnce() -> Result<()>>;

struct TimedEntry {
    due: Instant,
    task: QueueTask,
}

struct QueueInner {
    tasks: VecDeque<QueueTask>,
    timed: Vec<TimedEntry>,
    depth: u32,
}

/// Single-threaded FIFO task queue with head insertion and timed tasks.
#[derive(Clone)]
pub struct NavigationMessageQueue {
    inner: Rc<RefCell<QueueInner>>,
}

impl NavigationMessageQueue {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(QueueInner {
                tasks: VecDeque::new(),
                timed: Vec::new(),
                depth: 0,
            })),
        }
    }

    fn can_run_inline(&self) -> bool {
        let inner = self.inner.borrow();
        inner.depth == 0 && inner.tasks.is_empty()
    }

    fn run_task(&self, task: QueueTask) -> Result<()> {
        self.inner.borrow_mut().depth += 1;
        let result = task();
        self.inner.borrow_mut().depth -= 1;
        result
    }

    /// Appends a task; runs it inline when the queue is idle.
    pub fn post(&self, task: impl FnOnce() -> Result<()> + 'static) -> Result<()> {
        if self.can_run_inline() {
            self.run_task(Box::new(task))
        } else {
            self.enqueue_tail(Box::new(task));
            Ok(())
        }
    }

    /// Inserts a task at the head; runs it inline when the queue is idle.
    pub fn post_at_head(&self, task: impl FnOnce() -> Result<()> + 'static) -> Result<()> {
        if self.can_run_inline() {
            self.run_task(Box::new(task))
        } else {
            self.enqueue_head(Box::new(task));
            Ok(())
        }
    }

    pub(crate) fn enqueue_tail(&self, task: QueueTask) {
        self.inner.borrow_mut().tasks.push_back(task);
    }

    pub(crate) fn enqueue_head(&self, task: QueueTask) {
        self.inner.borrow_mut().tasks.push_front(task);
    }

    /// Schedules a task to become runnable after `delay`.
    pub fn post_timed(&self, delay: Duration, task: impl FnOnce() -> Result<()> + 'static) {
        self.inner.borrow_mut().timed.push(TimedEntry {
            due: Instant::now() + delay,
            task: Box::new(task),
        });
    }

    /// Runs one runnable task. Due timed tasks win over queued ones, earliest
    /// deadline first. Returns false when nothing is runnable right now.
    pub fn run_one(&self) -> Result<bool> {
        let task = {
            let mut inner = self.inner.borrow_mut();
            let now = Instant::now();
            let due_index = inner
                .timed
                .iter()
                .enumerate()
                .filter(|(_, entry)| entry.due <= now)
                .min_by_key(|(_, entry)| entry.due)
                .map(|(index, _)| index);
            match due_index {
                Some(index) => Some(inner.timed.swap_remove(index).task),
                None => inner.tasks.pop_front(),
            }
        };
        match task {
            Some(task) => {
                self.run_task(task)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Pumps the queue until nothing is runnable. Timed tasks whose deadline
    /// has not passed are left in place.
    pub fn run_until_idle(&self) -> Result<()> {
        while self.run_one()? {}
        Ok(())
    }

    pub fn pending_task_count(&self) -> usize {
        self.inner.borrow().tasks.len()
    }

    pub fn delayed_task_count(&self) -> usize {
        self.inner.borrow().timed.len()
    }

    /// Runs `task` once every signal in `signals` has fired, or once `timeout`
    /// elapsed, whichever comes first; exactly once either way.
    ///
    /// The signal path inserts at the queue head so a finished animation's
    /// follow-up stays ahead of externally queued operations.
    pub fn execute_when_idle_or_time_limit(
        &self,
        task: impl FnOnce() -> Result<()> + 'static,
        signals: &[CancellationSignal],
        timeout: Duration,
    ) {
        let slot: Rc<RefCell<Option<QueueTask>>> = Rc::new(RefCell::new(Some(Box::new(task))));

        if signals.is_empty() {
            let slot = slot.clone();
            self.enqueue_head(Box::new(move || match slot.borrow_mut().take() {
                Some(task) => task(),
                None => Ok(()),
            }));
            return;
        }

        let remaining = Rc::new(Cell::new(signals.len()));
        for signal in signals {
            let slot = slot.clone();
            let remaining = remaining.clone();
            let queue = self.clone();
            signal.on_cancel(move || {
                remaining.set(remaining.get().saturating_sub(1));
                if remaining.get() == 0 && slot.borrow().is_some() {
                    let slot = slot.clone();
                    queue.enqueue_head(Box::new(move || match slot.borrow_mut().take() {
                        Some(task) => task(),
                        None => Ok(()),
                    }));
                }
            });
        }

        let slot = slot.clone();
        self.post_timed(timeout, move || match slot.borrow_mut().take() {
            Some(task) => {
                log::debug!("idle-or-time-limit task hit the time limit");
                task()
            }
            None => Ok(()),
        });
    }
}

impl Default for NavigationMessageQueue {
    fn default() -> Self {
        Self::new()
    }
}
