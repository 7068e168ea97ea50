use super::{
    waiters::{RequestId, Side},
    QueueError,
};
use crate::runtime::{Event, EventStatus};
use std::{
    cell::RefCell,
    fmt::{self, Debug},
    future::Future,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

/// A container that can take back a pending request.
pub(crate) trait Withdraw {
    /// Removes the request from its waiter set, cancels its event and
    /// settles the container again.
    fn withdraw(&self, side: Side, id: RequestId);
}

// Link from a request to the container it waits on.
struct Origin {
    side: Side,
    id: RequestId,
    owner: Rc<dyn Withdraw>,
}

impl Origin {
    fn cancel<V>(&self, event: &Event<V>) -> Result<(), QueueError> {
        match event.status() {
            EventStatus::Succeeded => Err(QueueError::AlreadyFulfilled),
            EventStatus::Canceled | EventStatus::Failed => Ok(()),
            EventStatus::Pending => {
                self.owner.withdraw(self.side, self.id);
                Ok(())
            }
        }
    }
}

fn cancel_unregistered<V>(event: &Event<V>) -> Result<(), QueueError> {
    match event.status() {
        EventStatus::Succeeded => Err(QueueError::AlreadyFulfilled),
        _ => Ok(()),
    }
}

///
/// A put or get request on a queue or pool.
///
/// Awaiting it resolves once the request was fulfilled, with the assigned
/// item or amount for gets. A request that could be served at once is
/// returned already fulfilled.
///
/// Dropping a request that still waits withdraws it, as
/// [`cancel`](Request::cancel) does. A get that lost a race against a timer
/// thus never swallows a later item.
///
#[must_use = "a pending request is withdrawn when dropped"]
pub struct Request<V> {
    event: Event<V>,
    origin: Option<Origin>,
}

/// A put request, fulfilled once the item (or amount) was accepted.
pub type PutEvent = Request<()>;

/// A get request, fulfilled with the item (or amount) it was assigned.
pub type GetEvent<T> = Request<T>;

impl<V> Request<V> {
    pub(crate) fn pending(
        event: Event<V>,
        side: Side,
        id: RequestId,
        owner: Rc<dyn Withdraw>,
    ) -> Self {
        Self {
            event,
            origin: Some(Origin { side, id, owner }),
        }
    }

    pub(crate) fn completed(event: Event<V>) -> Self {
        Self {
            event,
            origin: None,
        }
    }

    /// Returns the state of the request.
    pub fn status(&self) -> EventStatus {
        self.event.status()
    }

    /// Indicates whether the request still waits.
    pub fn is_pending(&self) -> bool {
        self.event.is_pending()
    }

    /// Indicates whether the request was fulfilled.
    pub fn is_fulfilled(&self) -> bool {
        self.event.is_succeeded()
    }

    pub fn is_canceled(&self) -> bool {
        self.event.is_canceled()
    }

    pub fn is_failed(&self) -> bool {
        self.event.is_failed()
    }

    /// Takes the value of a fulfilled get without awaiting.
    pub fn take(&mut self) -> Option<V> {
        self.event.take_value()
    }

    ///
    /// Withdraws the request.
    ///
    /// A pending request is removed from the waiter set of its container and
    /// resolves to [`QueueError::Canceled`]. Cancelling a request that was
    /// already canceled, or that failed, does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::AlreadyFulfilled`] if the request was fulfilled
    /// before.
    ///
    pub fn cancel(&self) -> Result<(), QueueError> {
        match &self.origin {
            Some(origin) => origin.cancel(&self.event),
            None => cancel_unregistered(&self.event),
        }
    }
}

impl<V> Drop for Request<V> {
    fn drop(&mut self) {
        if let Some(origin) = &self.origin {
            if self.event.is_pending() {
                origin.owner.withdraw(origin.side, origin.id);
            }
        }
    }
}

impl<V> Future for Request<V> {
    type Output = Result<V, QueueError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.event.poll_value(cx).map_err(QueueError::from)
    }
}

impl<V> Debug for Request<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("status", &self.status())
            .field("side", &self.origin.as_ref().map(|o| o.side))
            .finish()
    }
}

type Hook<L> = RefCell<Option<Box<dyn FnMut(L)>>>;

///
/// Callbacks observing the level of a container after each committed
/// put and get.
///
pub(crate) struct Hooks<L> {
    on_put: Hook<L>,
    on_get: Hook<L>,
}

impl<L: Copy> Hooks<L> {
    pub(crate) fn new() -> Self {
        Self {
            on_put: RefCell::new(None),
            on_get: RefCell::new(None),
        }
    }

    pub(crate) fn set(&self, side: Side, hook: Box<dyn FnMut(L)>) {
        *self.slot(side).borrow_mut() = Some(hook);
    }

    fn slot(&self, side: Side) -> &Hook<L> {
        match side {
            Side::Put => &self.on_put,
            Side::Get => &self.on_get,
        }
    }

    ///
    /// Calls the hooks for each commit. Must not be called while the
    /// container state is borrowed. A hook is not re-entered by commits
    /// it causes itself.
    ///
    pub(crate) fn run(&self, commits: &[(Side, L)]) {
        for &(side, level) in commits {
            let slot = self.slot(side);
            let hook = slot.borrow_mut().take();
            if let Some(mut hook) = hook {
                hook(level);
                let mut slot = slot.borrow_mut();
                if slot.is_none() {
                    *slot = Some(hook);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Recorder(Cell<Option<(Side, RequestId)>>);

    impl Withdraw for Recorder {
        fn withdraw(&self, side: Side, id: RequestId) {
            self.0.set(Some((side, id)));
        }
    }

    #[test]
    fn cancel_follows_event_state() {
        let recorder = Rc::new(Recorder(Cell::new(None)));

        let event = Event::<u8>::new();
        let get = GetEvent::pending(event.clone(), Side::Get, 4, recorder.clone());
        assert!(get.cancel().is_ok());
        assert_eq!(recorder.0.get(), Some((Side::Get, 4)));

        let done = GetEvent::completed(Event::succeeded(1u8));
        assert!(matches!(done.cancel(), Err(QueueError::AlreadyFulfilled)));
        assert!(done.is_fulfilled());

        let put = PutEvent::completed(Event::new());
        put.event.cancel().unwrap();
        assert!(put.cancel().is_ok());
        assert!(put.is_canceled());
    }

    #[test]
    fn dropping_withdraws_only_pending_requests() {
        let recorder = Rc::new(Recorder(Cell::new(None)));

        let event = Event::<u8>::new();
        drop(GetEvent::pending(event.clone(), Side::Get, 7, recorder.clone()));
        assert_eq!(recorder.0.get(), Some((Side::Get, 7)));

        recorder.0.set(None);
        let done = Event::<()>::new();
        let put = PutEvent::pending(done.clone(), Side::Put, 8, recorder.clone());
        done.succeed(()).unwrap();
        drop(put);
        assert_eq!(recorder.0.get(), None);
    }

    #[test]
    fn hooks_see_each_commit() {
        let hooks = Hooks::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        hooks.set(Side::Put, Box::new(move |level: i32| s.borrow_mut().push(level)));

        hooks.run(&[(Side::Put, 1), (Side::Get, 0), (Side::Put, 2)]);
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }
}
