//! State nodes.

use super::transition::Transition;
use crate::effects::{Action, Activity, Delay};
use std::collections::BTreeSet;
use std::fmt;

/// A delay plus the candidates tried, in order, when it elapses.
pub struct TimerNode<C> {
    pub delay: Delay<C>,
    pub transitions: Vec<Transition<C>>,
}

impl<C> Clone for TimerNode<C> {
    fn clone(&self) -> Self {
        Self {
            delay: self.delay.clone(),
            transitions: self.transitions.clone(),
        }
    }
}

impl<C> fmt::Debug for TimerNode<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerNode")
            .field("delay", &self.delay)
            .field("transitions", &self.transitions)
            .finish()
    }
}

/// The behavior of one state.
///
/// # Example
///
/// ```rust
/// use statecore::guards::not;
/// use statecore::{StateNode, Transition};
///
/// struct Ctx;
///
/// let spinning: StateNode<Ctx> = StateNode::new()
///     .tag("focus")
///     .activity("trackButtonDisabled")
///     .every("CHANGE_INTERVAL", Transition::new().guard(not("isAtMax")).action("increment"))
///     .on("TRIGGER.POINTER_UP", Transition::to("focused").action("clearHint"))
///     .exit("clearHint");
///
/// assert!(spinning.tags.contains("focus"));
/// assert_eq!(spinning.every.len(), 1);
/// assert_eq!(spinning.on[0].0, "TRIGGER.POINTER_UP");
/// ```
pub struct StateNode<C> {
    pub entry: Vec<Action<C>>,
    pub exit: Vec<Action<C>>,
    /// Candidates per event type, in declaration order.
    pub on: Vec<(String, Vec<Transition<C>>)>,
    pub activities: Vec<Activity<C>>,
    pub after: Vec<TimerNode<C>>,
    pub every: Vec<TimerNode<C>>,
    pub tags: BTreeSet<String>,
}

impl<C> StateNode<C> {
    pub fn new() -> Self {
        Self {
            entry: Vec::new(),
            exit: Vec::new(),
            on: Vec::new(),
            activities: Vec::new(),
            after: Vec::new(),
            every: Vec::new(),
            tags: BTreeSet::new(),
        }
    }

    pub fn entry(mut self, action: impl Into<Action<C>>) -> Self {
        self.entry.push(action.into());
        self
    }

    pub fn exit(mut self, action: impl Into<Action<C>>) -> Self {
        self.exit.push(action.into());
        self
    }

    /// Add a candidate for `event`. Calling this again for the same event
    /// appends a lower-priority candidate.
    pub fn on(mut self, event: impl Into<String>, transition: impl Into<Transition<C>>) -> Self {
        push_candidate(&mut self.on, event.into(), transition.into());
        self
    }

    pub fn activity(mut self, activity: impl Into<Activity<C>>) -> Self {
        self.activities.push(activity.into());
        self
    }

    /// One-shot timer with a single candidate.
    pub fn after(self, delay: impl Into<Delay<C>>, transition: impl Into<Transition<C>>) -> Self {
        self.after_candidates(delay, [transition.into()])
    }

    /// One-shot timer whose candidates are tried in order when it elapses.
    pub fn after_candidates<I>(mut self, delay: impl Into<Delay<C>>, transitions: I) -> Self
    where
        I: IntoIterator<Item = Transition<C>>,
    {
        self.after.push(TimerNode {
            delay: delay.into(),
            transitions: transitions.into_iter().collect(),
        });
        self
    }

    /// Repeating timer, re-armed after every firing while the state is
    /// current.
    pub fn every(mut self, delay: impl Into<Delay<C>>, transition: impl Into<Transition<C>>) -> Self {
        self.every.push(TimerNode {
            delay: delay.into(),
            transitions: vec![transition.into()],
        });
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}

pub(crate) fn push_candidate<C>(
    on: &mut Vec<(String, Vec<Transition<C>>)>,
    event: String,
    transition: Transition<C>,
) {
    match on.iter_mut().find(|(name, _)| *name == event) {
        Some((_, candidates)) => candidates.push(transition),
        None => on.push((event, vec![transition])),
    }
}

impl<C> Default for StateNode<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for StateNode<C> {
    fn clone(&self) -> Self {
        Self {
            entry: self.entry.clone(),
            exit: self.exit.clone(),
            on: self.on.clone(),
            activities: self.activities.clone(),
            after: self.after.clone(),
            every: self.every.clone(),
            tags: self.tags.clone(),
        }
    }
}

impl<C> fmt::Debug for StateNode<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateNode")
            .field("entry", &self.entry)
            .field("exit", &self.exit)
            .field("on", &self.on)
            .field("activities", &self.activities)
            .field("after", &self.after)
            .field("every", &self.every)
            .field("tags", &self.tags)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ctx;

    #[test]
    fn repeated_on_appends_candidates_in_order() {
        let node: StateNode<Ctx> = StateNode::new()
            .on("GO", Transition::to("B").guard("canGo"))
            .on("STOP", "idle")
            .on("GO", "C");

        assert_eq!(node.on.len(), 2);
        let (event, candidates) = &node.on[0];
        assert_eq!(event, "GO");
        let targets: Vec<_> = candidates.iter().map(|t| t.target.as_deref()).collect();
        assert_eq!(targets, [Some("B"), Some("C")]);
    }

    #[test]
    fn after_candidates_share_one_timer() {
        let node: StateNode<Ctx> = StateNode::new()
            .after_candidates(
                "CHANGE_DELAY",
                [Transition::to("spinning").guard("isHoldingPointer"), Transition::to("focused")],
            )
            .after(50, "idle");

        assert_eq!(node.after.len(), 2);
        assert_eq!(node.after[0].transitions.len(), 2);
        assert_eq!(format!("{:?}", node.after[1].delay), "50ms");
    }

    #[test]
    fn tags_are_deduplicated() {
        let node: StateNode<Ctx> = StateNode::new().tag("focus").tags(["focus", "active"]);
        assert_eq!(node.tags.iter().collect::<Vec<_>>(), ["active", "focus"]);
    }
}
