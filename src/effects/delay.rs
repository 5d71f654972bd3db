//! Delays for `after` and `every` timers.

use crate::core::Event;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Computes a delay from the context and the triggering event.
pub type DelayFn<C> = Rc<dyn Fn(&C, &Event) -> Duration>;

/// Reference to a delay, as written in a machine definition.
///
/// Plain integers are milliseconds:
///
/// ```rust
/// use statecore::Delay;
/// use std::time::Duration;
///
/// let fixed: Delay<()> = 300.into();
/// assert!(matches!(fixed, Delay::Fixed(d) if d == Duration::from_millis(300)));
///
/// let named: Delay<()> = "CHANGE_INTERVAL".into();
/// assert!(matches!(named, Delay::Named(ref n) if n == "CHANGE_INTERVAL"));
/// ```
pub enum Delay<C> {
    Fixed(Duration),
    /// Looked up in the delay table of the machine options.
    Named(String),
    /// Re-evaluated every time the timer is armed.
    Dynamic(DelayFn<C>),
}

impl<C> Delay<C> {
    pub fn millis(ms: u64) -> Self {
        Delay::Fixed(Duration::from_millis(ms))
    }

    pub fn dynamic<F>(compute: F) -> Self
    where
        F: Fn(&C, &Event) -> Duration + 'static,
    {
        Delay::Dynamic(Rc::new(compute))
    }
}

impl<C> From<u64> for Delay<C> {
    fn from(ms: u64) -> Self {
        Delay::millis(ms)
    }
}

impl<C> From<Duration> for Delay<C> {
    fn from(duration: Duration) -> Self {
        Delay::Fixed(duration)
    }
}

impl<C> From<&str> for Delay<C> {
    fn from(name: &str) -> Self {
        Delay::Named(name.to_string())
    }
}

impl<C> From<String> for Delay<C> {
    fn from(name: String) -> Self {
        Delay::Named(name)
    }
}

impl<C> Clone for Delay<C> {
    fn clone(&self) -> Self {
        match self {
            Delay::Fixed(duration) => Delay::Fixed(*duration),
            Delay::Named(name) => Delay::Named(name.clone()),
            Delay::Dynamic(f) => Delay::Dynamic(Rc::clone(f)),
        }
    }
}

impl<C> fmt::Debug for Delay<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delay::Fixed(duration) => write!(f, "{}ms", duration.as_millis()),
            Delay::Named(name) => f.write_str(name),
            Delay::Dynamic(_) => f.write_str("<dynamic>"),
        }
    }
}

pub(crate) enum ResolvedDelay<C> {
    Fixed(Duration),
    Dynamic(DelayFn<C>),
}

impl<C> ResolvedDelay<C> {
    /// The delay to arm with now. Dynamic delays are never cached.
    pub(crate) fn resolve(&self, context: &C, event: &Event) -> Duration {
        match self {
            ResolvedDelay::Fixed(duration) => *duration,
            ResolvedDelay::Dynamic(compute) => compute(context, event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Ctx {
        interval: u64,
    }

    #[test]
    fn fixed_delay_ignores_context() {
        let delay: ResolvedDelay<Ctx> = ResolvedDelay::Fixed(Duration::from_millis(50));
        let event = Event::new("TICK");
        assert_eq!(
            delay.resolve(&Ctx { interval: 1 }, &event),
            Duration::from_millis(50)
        );
    }

    #[test]
    fn dynamic_delay_is_reevaluated_each_time() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let delay: ResolvedDelay<Ctx> = ResolvedDelay::Dynamic(Rc::new(move |ctx: &Ctx, _: &Event| {
            counter.set(counter.get() + 1);
            Duration::from_millis(ctx.interval)
        }));
        let event = Event::new("TICK");

        assert_eq!(delay.resolve(&Ctx { interval: 10 }, &event), Duration::from_millis(10));
        assert_eq!(delay.resolve(&Ctx { interval: 20 }, &event), Duration::from_millis(20));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn debug_renders_each_form() {
        assert_eq!(format!("{:?}", Delay::<Ctx>::millis(300)), "300ms");
        assert_eq!(format!("{:?}", Delay::<Ctx>::from("CHANGE_DELAY")), "CHANGE_DELAY");
        assert_eq!(
            format!("{:?}", Delay::<Ctx>::dynamic(|_, _| Duration::ZERO)),
            "<dynamic>"
        );
    }
}
