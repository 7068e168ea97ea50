use std::{any::Any, error::Error as StdError, fmt::Display, rc::Rc};

/// An error raised by a simulation process, carried by a failed [`Event`].
///
/// Any `std::error::Error` converts into a `RuntimeError`; the original
/// error can be recovered with [`downcast_ref`](RuntimeError::downcast_ref).
///
/// [`Event`]: crate::runtime::Event
#[derive(Debug)]
pub struct RuntimeError {
    inner: Box<dyn StdErrorAny>,
}

impl RuntimeError {
    /// As any
    pub fn as_any(&self) -> &dyn Any {
        self.inner.as_any()
    }

    /// Returns the wrapped error if it is of type `E`.
    pub fn downcast_ref<E: Any>(&self) -> Option<&E> {
        self.as_any().downcast_ref::<E>()
    }
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner.fmt(f)
    }
}

impl<T: StdError + Any + 'static> From<T> for RuntimeError {
    fn from(err: T) -> Self {
        RuntimeError {
            inner: Box::new(err),
        }
    }
}

trait StdErrorAny: StdError + Any {
    fn as_any(&self) -> &dyn Any;
}
impl<T: StdError + Any + 'static> StdErrorAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The ways waiting on an [`Event`](crate::runtime::Event) can go wrong.
#[derive(Debug, Clone)]
pub enum EventError {
    /// The event was completed or canceled before, and cannot be completed again.
    AlreadyTriggered,
    /// The event was canceled before it succeeded.
    Canceled,
    /// The event succeeded, but its value was already taken by another waiter.
    Consumed,
    /// The event failed with the given error.
    Failed(Rc<RuntimeError>),
}

impl Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyTriggered => write!(f, "event was already triggered"),
            Self::Canceled => write!(f, "event was canceled"),
            Self::Consumed => write!(f, "event value was already consumed"),
            Self::Failed(cause) => write!(f, "event failed: {cause}"),
        }
    }
}

impl StdError for EventError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Boom(u8);

    impl Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "boom #{}", self.0)
        }
    }

    impl StdError for Boom {}

    #[test]
    fn runtime_error_downcast() {
        let err = RuntimeError::from(Boom(3));
        assert_eq!(err.to_string(), "boom #3");
        assert_eq!(err.downcast_ref::<Boom>(), Some(&Boom(3)));
        assert!(err.downcast_ref::<EventError>().is_none());
    }

    #[test]
    fn event_error_display() {
        let failed = EventError::Failed(Rc::new(RuntimeError::from(Boom(1))));
        assert_eq!(failed.to_string(), "event failed: boom #1");
        assert_eq!(EventError::Canceled.to_string(), "event was canceled");
    }
}
