use crate::SimTime;
use std::{fmt::Display, mem};

///
/// A condition under which a [`Runtime`](super::Runtime) stops dispatching
/// timers before the simulation ran dry.
///
/// The limit is checked against the timer that would be dispatched next. If
/// it applies, the timer stays scheduled and the run ends with
/// [`RuntimeResult::PrematureAbort`](super::RuntimeResult::PrematureAbort).
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeLimit {
    /// Never stops the run.
    None,

    /// Stops before the timer that would exceed this many dispatched timers.
    /// A run whose last timer is exactly the n-th one finishes normally.
    EventCount(usize),

    /// Stops before the first timer scheduled after this time. Timers at
    /// exactly this time are still dispatched.
    SimTime(SimTime),

    /// Applies once both limits apply.
    CombinedAnd(Box<RuntimeLimit>, Box<RuntimeLimit>),

    /// Applies once either limit applies.
    CombinedOr(Box<RuntimeLimit>, Box<RuntimeLimit>),
}

impl RuntimeLimit {
    /// Combines two limits so that both must apply.
    #[must_use]
    pub fn and(self, other: RuntimeLimit) -> RuntimeLimit {
        Self::CombinedAnd(Box::new(self), Box::new(other))
    }

    /// Combines two limits so that either one suffices.
    #[must_use]
    pub fn or(self, other: RuntimeLimit) -> RuntimeLimit {
        Self::CombinedOr(Box::new(self), Box::new(other))
    }

    /// Whether dispatching the `n`-th timer, due at `time`, is out of bounds.
    pub(crate) fn applies(&self, n: usize, time: SimTime) -> bool {
        match self {
            Self::None => false,
            Self::EventCount(max) => n > *max,
            Self::SimTime(max) => time > *max,
            Self::CombinedAnd(lhs, rhs) => lhs.applies(n, time) && rhs.applies(n, time),
            Self::CombinedOr(lhs, rhs) => lhs.applies(n, time) || rhs.applies(n, time),
        }
    }

    // Builder limits accumulate: any one of them ends the run.
    pub(crate) fn add(&mut self, limit: RuntimeLimit) {
        *self = match mem::replace(self, Self::None) {
            Self::None => limit,
            current => current.or(limit),
        };
    }
}

impl Display for RuntimeLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::EventCount(max) => write!(f, "MaxEventCount({max})"),
            Self::SimTime(max) => write!(f, "MaxSimTime({max})"),
            Self::CombinedAnd(lhs, rhs) => write!(f, "({lhs} and {rhs})"),
            Self::CombinedOr(lhs, rhs) => write!(f, "({lhs} or {rhs})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_inclusive() {
        let events = RuntimeLimit::EventCount(3);
        assert!(!events.applies(3, SimTime::MAX));
        assert!(events.applies(4, SimTime::ZERO));

        let time = RuntimeLimit::SimTime(SimTime::from(2.5));
        assert!(!time.applies(1000, SimTime::from(2.5)));
        assert!(time.applies(0, SimTime::from(2.6)));

        assert!(!RuntimeLimit::None.applies(usize::MAX, SimTime::MAX));
    }

    #[test]
    fn combinators_nest() {
        let both = RuntimeLimit::EventCount(10).and(RuntimeLimit::SimTime(SimTime::from(5.0)));
        assert!(!both.applies(11, SimTime::from(1.0)));
        assert!(both.applies(11, SimTime::from(6.0)));
        assert_eq!(both.to_string(), "(MaxEventCount(10) and MaxSimTime(5))");

        let either = RuntimeLimit::EventCount(10).or(RuntimeLimit::SimTime(SimTime::from(5.0)));
        assert!(either.applies(11, SimTime::from(1.0)));
        assert!(either.applies(0, SimTime::from(6.0)));
    }

    #[test]
    fn added_limits_accumulate() {
        let mut limit = RuntimeLimit::None;
        limit.add(RuntimeLimit::EventCount(1));
        assert_eq!(limit, RuntimeLimit::EventCount(1));

        limit.add(RuntimeLimit::SimTime(SimTime::from(9.0)));
        assert_eq!(
            limit,
            RuntimeLimit::EventCount(1).or(RuntimeLimit::SimTime(SimTime::from(9.0)))
        );
    }
}
