use crate::runtime::{Event, EventStatus};
use std::{
    fmt::Display,
    future::Future,
    mem,
    pin::Pin,
    task::{Context, Poll},
};

///
/// The state a [`Condition`] waits for.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    /// The container is at capacity.
    Full,
    /// The container has room left.
    NotFull,
    /// The container holds something.
    Any,
    /// The container holds nothing.
    Empty,
    /// Something was inserted.
    New,
    /// A pool level reached a lower bound.
    AtLeast,
    /// A pool level fell to an upper bound.
    AtMost,
}

impl Display for ConditionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Full => "full",
            Self::NotFull => "not_full",
            Self::Any => "any",
            Self::Empty => "empty",
            Self::New => "new",
            Self::AtLeast => "at_least",
            Self::AtMost => "at_most",
        };
        write!(f, "{name}")
    }
}

///
/// A wait for a container to reach some state.
///
/// All processes that requested the same condition before it held share
/// one underlying event, so they are woken together. Awaiting a condition
/// does not consume it: every clone resolves.
///
#[derive(Debug, Clone)]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Condition {
    kind: ConditionKind,
    event: Event<()>,
}

impl Condition {
    pub(crate) fn new(kind: ConditionKind, event: Event<()>) -> Self {
        Self { kind, event }
    }

    pub(crate) fn holds(kind: ConditionKind) -> Self {
        Self::new(kind, Event::succeeded(()))
    }

    pub fn kind(&self) -> ConditionKind {
        self.kind
    }

    /// Indicates whether the condition was met.
    pub fn is_triggered(&self) -> bool {
        self.event.is_triggered()
    }

    /// Indicates whether both conditions wait on the same watcher.
    pub fn shares_watcher(&self, other: &Condition) -> bool {
        self.event.ptr_eq(&other.event)
    }
}

impl Future for Condition {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        match self.event.poll_status(cx) {
            Poll::Ready(EventStatus::Succeeded) => Poll::Ready(()),
            Poll::Ready(status) => {
                // Watchers are only ever succeeded.
                debug_assert!(false, "condition event ended as {status:?}");
                Poll::Ready(())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

///
/// The persistent watcher behind one condition kind.
///
/// Requesting an idle watcher arms a fresh event, requesting an armed one
/// hands out the same event. Firing succeeds the event and returns to idle.
///
#[derive(Debug, Default)]
pub(crate) enum Watcher {
    #[default]
    Idle,
    Armed(Event<()>),
}

impl Watcher {
    pub(crate) fn arm(&mut self, kind: ConditionKind) -> Condition {
        let event = match self {
            Self::Armed(event) => event.clone(),
            Self::Idle => {
                let event = Event::new();
                *self = Self::Armed(event.clone());
                event
            }
        };
        Condition::new(kind, event)
    }

    pub(crate) fn is_armed(&self) -> bool {
        matches!(self, Self::Armed(_))
    }

    /// Fires the watcher if armed. Returns whether it fired.
    pub(crate) fn fire(&mut self) -> bool {
        match mem::take(self) {
            Self::Armed(event) => event.succeed(()).is_ok(),
            Self::Idle => false,
        }
    }
}

///
/// Watchers for conditions parameterized by a level.
///
#[derive(Debug)]
pub(crate) struct LevelWatchers<N> {
    watchers: Vec<(N, Event<()>)>,
}

impl<N: PartialEq + Copy> LevelWatchers<N> {
    pub(crate) fn new() -> Self {
        Self {
            watchers: Vec::new(),
        }
    }

    pub(crate) fn arm(&mut self, kind: ConditionKind, level: N) -> Condition {
        let event = match self.watchers.iter().find(|(l, _)| *l == level) {
            Some((_, event)) => event.clone(),
            None => {
                let event = Event::new();
                self.watchers.push((level, event.clone()));
                event
            }
        };
        Condition::new(kind, event)
    }

    /// Fires all watchers whose level satisfies `holds`. Returns the number fired.
    pub(crate) fn fire_where(&mut self, mut holds: impl FnMut(N) -> bool) -> usize {
        let mut fired = 0;
        self.watchers.retain(|(level, event)| {
            if holds(*level) {
                fired += usize::from(event.succeed(()).is_ok());
                false
            } else {
                true
            }
        });
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watcher_shares_until_fired() {
        let mut watcher = Watcher::default();
        let a = watcher.arm(ConditionKind::Full);
        let b = watcher.arm(ConditionKind::Full);
        assert!(a.shares_watcher(&b));
        assert!(watcher.is_armed());

        assert!(watcher.fire());
        assert!(a.is_triggered() && b.is_triggered());
        assert!(!watcher.is_armed());
        assert!(!watcher.fire());

        let c = watcher.arm(ConditionKind::Full);
        assert!(!c.shares_watcher(&a));
        assert!(!c.is_triggered());
    }

    #[test]
    fn level_watchers_fire_selectively() {
        let mut watchers = LevelWatchers::new();
        let low = watchers.arm(ConditionKind::AtLeast, 2);
        let high = watchers.arm(ConditionKind::AtLeast, 8);
        let again = watchers.arm(ConditionKind::AtLeast, 2);
        assert!(low.shares_watcher(&again));

        assert_eq!(watchers.fire_where(|level| level <= 5), 1);
        assert!(low.is_triggered());
        assert!(!high.is_triggered());
        assert_eq!(ConditionKind::AtLeast.to_string(), "at_least");
    }
}
