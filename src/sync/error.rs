use crate::runtime::EventError;
use std::{error::Error, fmt::Display};

///
/// Misuse of a queue or pool, or the reason a request did not succeed.
///
#[derive(Debug, Clone)]
pub enum QueueError {
    /// The capacity is zero, or too small for the initial items.
    Capacity(usize),
    /// A request was canceled after it was already fulfilled.
    AlreadyFulfilled,
    /// A put could not be satisfied immediately on a hard capped container.
    Overflow,
    /// A pool amount outside of `(0, capacity]`.
    InvalidAmount,
    /// The request was canceled before it was fulfilled.
    Canceled,
    /// The underlying event failed otherwise.
    Event(EventError),
}

impl Display for QueueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Capacity(c) => write!(f, "invalid capacity {c}"),
            Self::AlreadyFulfilled => write!(f, "request was already fulfilled"),
            Self::Overflow => write!(f, "put exceeds the hard capacity"),
            Self::InvalidAmount => write!(f, "amount must be in (0, capacity]"),
            Self::Canceled => write!(f, "request was canceled"),
            Self::Event(e) => write!(f, "{e}"),
        }
    }
}

impl Error for QueueError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Event(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EventError> for QueueError {
    fn from(error: EventError) -> Self {
        if let EventError::Failed(cause) = &error {
            if let Some(inner) = cause.downcast_ref::<QueueError>() {
                return inner.clone();
            }
        }

        match error {
            EventError::Canceled => Self::Canceled,
            error => Self::Event(error),
        }
    }
}

///
/// The error returned by `try_put`, handing the rejected item back.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TryPutError<T> {
    /// There was no room for the item.
    Full(T),
    /// There was no room for the item and the container is hard capped.
    Overflow(T),
}

impl<T> TryPutError<T> {
    /// Returns the rejected item.
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(item) | Self::Overflow(item) => item,
        }
    }

    /// Maps the rejected item, keeping the reason.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> TryPutError<U> {
        match self {
            Self::Full(item) => TryPutError::Full(f(item)),
            Self::Overflow(item) => TryPutError::Overflow(f(item)),
        }
    }
}

impl<T> Display for TryPutError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full(_) => write!(f, "no room for the item"),
            Self::Overflow(_) => write!(f, "put exceeds the hard capacity"),
        }
    }
}

impl<T: std::fmt::Debug> Error for TryPutError<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RuntimeError;
    use std::rc::Rc;

    #[test]
    fn event_errors_unwrap_queue_failures() {
        let failed = EventError::Failed(Rc::new(RuntimeError::from(QueueError::Overflow)));
        assert!(matches!(QueueError::from(failed), QueueError::Overflow));
        assert!(matches!(
            QueueError::from(EventError::Canceled),
            QueueError::Canceled
        ));
        assert!(matches!(
            QueueError::from(EventError::Consumed),
            QueueError::Event(EventError::Consumed)
        ));
    }

    #[test]
    fn try_put_error_returns_item() {
        let err = TryPutError::Full(3).map(|v| v * 2);
        assert_eq!(err, TryPutError::Full(6));
        assert_eq!(err.into_inner(), 6);
        assert_eq!(
            TryPutError::Overflow(()).to_string(),
            "put exceeds the hard capacity"
        );
    }
}
