//! Activities: effects that live exactly as long as a state is active.
//!
//! An activity starts when its state is entered and returns an optional
//! [`Disposer`]. The manager holds every disposer returned while the state
//! is active and releases them in reverse start order when it exits.

use super::action::BoxError;
use super::disposer::Disposer;
use super::scope::Scope;
use crate::context::MachineContext;
use crate::engine::MachineError;
use smallvec::SmallVec;
use std::fmt;
use std::rc::Rc;

/// An activity callback.
pub type ActivityFn<C> = Rc<dyn Fn(&mut Scope<'_, C>) -> Result<Option<Disposer>, BoxError>>;

/// Reference to an activity, as written in a machine definition.
pub enum Activity<C> {
    /// Looked up in the activity table of the machine options.
    Named(String),
    Inline(ActivityFn<C>),
}

impl<C> Activity<C> {
    pub fn new<F>(activity: F) -> Self
    where
        F: Fn(&mut Scope<'_, C>) -> Result<Option<Disposer>, BoxError> + 'static,
    {
        Activity::Inline(Rc::new(activity))
    }
}

impl<C> From<&str> for Activity<C> {
    fn from(name: &str) -> Self {
        Activity::Named(name.to_string())
    }
}

impl<C> From<String> for Activity<C> {
    fn from(name: String) -> Self {
        Activity::Named(name)
    }
}

impl<C> Clone for Activity<C> {
    fn clone(&self) -> Self {
        match self {
            Activity::Named(name) => Activity::Named(name.clone()),
            Activity::Inline(f) => Activity::Inline(Rc::clone(f)),
        }
    }
}

impl<C> fmt::Debug for Activity<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Activity::Named(name) => f.write_str(name),
            Activity::Inline(_) => f.write_str("<inline>"),
        }
    }
}

pub(crate) struct ResolvedActivity<C> {
    pub(crate) name: String,
    pub(crate) start: ActivityFn<C>,
}

/// Sole owner of the disposers of the running activities of one scope
/// (the current state, or the machine as a whole).
#[derive(Default)]
pub(crate) struct ActivityManager {
    held: SmallVec<[(String, Disposer); 4]>,
}

impl ActivityManager {
    /// Start activities in declaration order.
    ///
    /// On failure the activities already started stay held, so the next
    /// [`stop_all`](Self::stop_all) still releases them.
    pub(crate) fn start<C: MachineContext>(
        &mut self,
        activities: &[ResolvedActivity<C>],
        scope: &mut Scope<'_, C>,
    ) -> Result<(), MachineError> {
        for activity in activities {
            tracing::trace!(machine = scope.machine_id(), activity = %activity.name, "starting activity");
            let disposer = (activity.start)(scope).map_err(|source| MachineError::Activity {
                name: activity.name.clone(),
                source,
            })?;
            if let Some(disposer) = disposer {
                self.held.push((activity.name.clone(), disposer));
            }
        }
        Ok(())
    }

    /// Release every held disposer, newest first.
    pub(crate) fn stop_all(&mut self) {
        while let Some((name, mut disposer)) = self.held.pop() {
            tracing::trace!(activity = %name, "stopping activity");
            disposer.dispose();
        }
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.held.iter().map(|(name, _)| name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn tracked(log: &Rc<RefCell<Vec<String>>>, name: &str) -> (String, Disposer) {
        let log = Rc::clone(log);
        let label = name.to_string();
        (
            name.to_string(),
            Disposer::new(move || log.borrow_mut().push(label)),
        )
    }

    #[test]
    fn stop_all_releases_newest_first_exactly_once() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut manager = ActivityManager::default();
        for name in ["pointerLock", "mousemove", "cursor"] {
            manager.held.push(tracked(&log, name));
        }
        assert_eq!(manager.names(), vec!["pointerLock", "mousemove", "cursor"]);

        manager.stop_all();
        manager.stop_all();

        assert_eq!(*log.borrow(), vec!["cursor", "mousemove", "pointerLock"]);
        assert!(manager.names().is_empty());
    }

    #[test]
    fn debug_renders_names() {
        let named: Activity<()> = Activity::from("trackFormControl");
        let inline: Activity<()> = Activity::new(|_| Ok(None));
        assert_eq!(format!("{named:?}"), "trackFormControl");
        assert_eq!(format!("{inline:?}"), "<inline>");
    }
}
