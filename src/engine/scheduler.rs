//! Host scheduling for `after` and `every` timers.
//!
//! The engine never sleeps. It hands a task and a delay to a [`Scheduler`]
//! and keeps the returned [`Disposer`]; exiting the owning state disposes
//! it. Timer messages also carry the generation of the state entry that
//! armed them, so a task that runs after its state exited is dropped even
//! if the host could not cancel it in time.

use crate::effects::Disposer;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

/// The host's deferred-execution primitive.
pub trait Scheduler {
    /// Run `task` once after `delay`, unless the returned disposer is
    /// disposed first.
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> Disposer;
}

type Task = Box<dyn FnOnce()>;

#[derive(Default)]
struct ManualClock {
    now: Duration,
    next_id: u64,
    pending: BTreeMap<(Duration, u64), Task>,
}

/// Scheduler driven by a virtual clock.
///
/// Nothing runs until [`advance`](Self::advance) moves the clock. Tasks due
/// at the same instant run in the order they were scheduled. Clones share
/// one clock, so a test can keep a clone and drive the machine's timers.
///
/// # Example
///
/// ```rust
/// use statecore::{ManualScheduler, Scheduler};
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use std::time::Duration;
///
/// let scheduler = ManualScheduler::new();
/// let fired = Rc::new(Cell::new(0));
///
/// let counter = Rc::clone(&fired);
/// let _keep = scheduler.schedule(Duration::from_millis(100), Box::new(move || counter.set(counter.get() + 1)));
/// let counter = Rc::clone(&fired);
/// let mut cancelled = scheduler.schedule(Duration::from_millis(50), Box::new(move || counter.set(counter.get() + 10)));
/// cancelled.dispose();
///
/// assert_eq!(scheduler.advance(Duration::from_millis(99)), 0);
/// assert_eq!(scheduler.advance(Duration::from_millis(1)), 1);
/// assert_eq!(fired.get(), 1);
/// ```
#[derive(Clone, Default)]
pub struct ManualScheduler {
    clock: Rc<RefCell<ManualClock>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed on the virtual clock.
    pub fn now(&self) -> Duration {
        self.clock.borrow().now
    }

    /// Tasks scheduled and not yet run or cancelled.
    pub fn pending(&self) -> usize {
        self.clock.borrow().pending.len()
    }

    /// Move the clock forward by `by`, running every task that falls due,
    /// including tasks scheduled by those tasks. Returns how many ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.clock.borrow().now + by;
        let mut ran = 0;
        loop {
            let next = {
                let mut clock = self.clock.borrow_mut();
                match clock.pending.first_key_value() {
                    Some((&(due, _), _)) if due <= target => {
                        clock.now = due;
                        clock.pending.pop_first()
                    }
                    _ => None,
                }
            };
            match next {
                Some((_, task)) => {
                    task();
                    ran += 1;
                }
                None => break,
            }
        }
        self.clock.borrow_mut().now = target;
        ran
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> Disposer {
        let key = {
            let mut clock = self.clock.borrow_mut();
            let key = (clock.now + delay, clock.next_id);
            clock.next_id += 1;
            clock.pending.insert(key, task);
            key
        };
        let clock: Weak<RefCell<ManualClock>> = Rc::downgrade(&self.clock);
        Disposer::new(move || {
            if let Some(clock) = clock.upgrade() {
                // Dropping the task may drop machine state; do it unborrowed.
                let removed = clock.borrow_mut().pending.remove(&key);
                drop(removed);
            }
        })
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("now", &self.now())
            .field("pending", &self.pending())
            .finish()
    }
}

/// Scheduler backed by the tokio timer.
///
/// Tasks are spawned with `spawn_local`, so the machine must be driven from
/// inside a `tokio::task::LocalSet`.
#[cfg(feature = "tokio")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioScheduler;

#[cfg(feature = "tokio")]
impl TokioScheduler {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "tokio")]
impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> Disposer {
        let handle = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        Disposer::new(move || handle.abort())
    }
}
