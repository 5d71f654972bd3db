//! Release handles for started effects.

use std::fmt;

/// Ownership handle for a started activity, listener, or timer.
///
/// Disposing releases exactly the resource the handle represents and is
/// idempotent: the release function runs at most once. Dropping a
/// disposer without disposing it leaves the resource running.
///
/// # Example
///
/// ```rust
/// use statecore::Disposer;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let released = Rc::new(Cell::new(0));
/// let counter = Rc::clone(&released);
/// let mut disposer = Disposer::new(move || counter.set(counter.get() + 1));
///
/// disposer.dispose();
/// disposer.dispose();
/// assert_eq!(released.get(), 1);
/// assert!(disposer.is_disposed());
/// ```
#[must_use = "dropping a Disposer does not release the resource"]
pub struct Disposer {
    release: Option<Box<dyn FnOnce()>>,
}

impl Disposer {
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A disposer with nothing to release.
    pub fn noop() -> Self {
        Self { release: None }
    }

    /// Combine several disposers into one that releases them in order.
    pub fn merge<I>(disposers: I) -> Self
    where
        I: IntoIterator<Item = Disposer>,
    {
        let mut all: Vec<Disposer> = disposers.into_iter().collect();
        Disposer::new(move || {
            for disposer in &mut all {
                disposer.dispose();
            }
        })
    }

    /// Release the resource. Does nothing after the first call.
    pub fn dispose(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.release.is_none()
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
