use super::{EventError, RuntimeError};
use std::{
    cell::RefCell,
    fmt::{self, Debug},
    future::Future,
    mem,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll, Waker},
};

///
/// The observable state of an [`Event`].
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventStatus {
    /// Not yet completed. Processes awaiting the event are suspended.
    Pending,
    /// Completed with a value.
    Succeeded,
    /// Completed with an error.
    Failed,
    /// Withdrawn before completion.
    Canceled,
}

enum State<T> {
    Pending,
    // `None` once the value was moved out to a waiter.
    Succeeded(Option<T>),
    Failed(Rc<RuntimeError>),
    Canceled,
}

struct Inner<T> {
    state: State<T>,
    waiters: Vec<Waker>,
}

///
/// An occurrence at some point in virtual time, that processes can wait on.
///
/// An event starts out pending and is completed exactly once, either by
/// [`succeed`](Event::succeed), [`fail`](Event::fail) or
/// [`cancel`](Event::cancel). Completing an event wakes every process that
/// is currently suspended on it; the processes are resumed by the runtime in
/// the order they were woken, before virtual time advances.
///
/// `Event` is a shared handle: clones refer to the same event. Awaiting an
/// event moves the success value out to the awaiting process, so a value
/// carrying event should be awaited by one process only. Use
/// [`wait_triggered`](Event::wait_triggered) to observe completion without
/// taking the value.
///
pub struct Event<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Event<T> {
    /// Creates a new pending event.
    #[must_use]
    pub fn new() -> Self {
        Self::with_state(State::Pending)
    }

    /// Creates an event that already succeeded with the given value.
    #[must_use]
    pub fn succeeded(value: T) -> Self {
        Self::with_state(State::Succeeded(Some(value)))
    }

    fn with_state(state: State<T>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                state,
                waiters: Vec::new(),
            })),
        }
    }

    /// Returns the current state of the event.
    pub fn status(&self) -> EventStatus {
        match self.inner.borrow().state {
            State::Pending => EventStatus::Pending,
            State::Succeeded(_) => EventStatus::Succeeded,
            State::Failed(_) => EventStatus::Failed,
            State::Canceled => EventStatus::Canceled,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status() == EventStatus::Pending
    }

    /// Indicates whether the event has left the pending state by any means.
    pub fn is_triggered(&self) -> bool {
        !self.is_pending()
    }

    pub fn is_succeeded(&self) -> bool {
        self.status() == EventStatus::Succeeded
    }

    pub fn is_failed(&self) -> bool {
        self.status() == EventStatus::Failed
    }

    pub fn is_canceled(&self) -> bool {
        self.status() == EventStatus::Canceled
    }

    /// Indicates whether both handles refer to the same event.
    pub fn ptr_eq(&self, other: &Event<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    ///
    /// Completes the event with a value, waking all waiting processes.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::AlreadyTriggered`] if the event is not pending.
    /// The value is dropped in this case.
    ///
    pub fn succeed(&self, value: T) -> Result<(), EventError> {
        self.complete(State::Succeeded(Some(value)))
    }

    ///
    /// Completes the event with an error, waking all waiting processes.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::AlreadyTriggered`] if the event is not pending.
    ///
    pub fn fail(&self, error: impl Into<RuntimeError>) -> Result<(), EventError> {
        self.complete(State::Failed(Rc::new(error.into())))
    }

    ///
    /// Withdraws the event. Waiting processes are resumed with
    /// [`EventError::Canceled`]. Canceling a canceled event does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::AlreadyTriggered`] if the event already
    /// succeeded or failed.
    ///
    pub fn cancel(&self) -> Result<(), EventError> {
        if self.is_canceled() {
            return Ok(());
        }
        self.complete(State::Canceled)
    }

    fn complete(&self, state: State<T>) -> Result<(), EventError> {
        let waiters = {
            let mut inner = self.inner.borrow_mut();
            if !matches!(inner.state, State::Pending) {
                return Err(EventError::AlreadyTriggered);
            }
            inner.state = state;
            mem::take(&mut inner.waiters)
        };

        // Waking only schedules the waiters, it never resumes them inline.
        waiters.into_iter().for_each(Waker::wake);
        Ok(())
    }

    /// Moves the success value out of the event, if there is one left.
    pub fn take_value(&self) -> Option<T> {
        match &mut self.inner.borrow_mut().state {
            State::Succeeded(value) => value.take(),
            _ => None,
        }
    }

    /// Returns a future that resolves once the event is no longer pending,
    /// without consuming the value.
    pub fn wait_triggered(&self) -> WaitTriggered<T> {
        WaitTriggered {
            event: self.clone(),
        }
    }

    fn register(&self, waker: &Waker) {
        let mut inner = self.inner.borrow_mut();
        if !inner.waiters.iter().any(|w| w.will_wake(waker)) {
            inner.waiters.push(waker.clone());
        }
    }

    pub(crate) fn poll_status(&self, cx: &mut Context<'_>) -> Poll<EventStatus> {
        match self.status() {
            EventStatus::Pending => {
                self.register(cx.waker());
                Poll::Pending
            }
            status => Poll::Ready(status),
        }
    }

    pub(crate) fn poll_value(&self, cx: &mut Context<'_>) -> Poll<Result<T, EventError>> {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        match &mut inner.state {
            State::Pending => {
                if !inner.waiters.iter().any(|w| w.will_wake(cx.waker())) {
                    inner.waiters.push(cx.waker().clone());
                }
                Poll::Pending
            }
            State::Succeeded(value) => Poll::Ready(value.take().ok_or(EventError::Consumed)),
            State::Failed(cause) => Poll::Ready(Err(EventError::Failed(Rc::clone(cause)))),
            State::Canceled => Poll::Ready(Err(EventError::Canceled)),
        }
    }
}

impl<T> Default for Event<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Event<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("status", &self.status())
            .field("waiters", &self.inner.borrow().waiters.len())
            .finish()
    }
}

impl<T> Future for Event<T> {
    type Output = Result<T, EventError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.poll_value(cx)
    }
}

///
/// Future returned by [`Event::wait_triggered`].
///
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct WaitTriggered<T> {
    event: Event<T>,
}

impl<T> Future for WaitTriggered<T> {
    type Output = EventStatus;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.event.poll_status(cx)
    }
}

impl<T> Debug for WaitTriggered<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WaitTriggered").field(&self.event).finish()
    }
}
