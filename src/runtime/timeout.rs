use super::{Context, Event};
use crate::SimTime;
use pin_project_lite::pin_project;
use std::{
    error::Error,
    fmt::{self, Display},
    future::Future,
    pin::Pin,
    task::Poll,
};

/// Requires a future to complete within `delay` units of virtual time.
///
/// If the future completes first, its output is returned. Otherwise
/// the timeout resolves to [`Elapsed`]. In both cases the loser is not
/// touched: a request that lost the race stays registered until it is
/// canceled, so callers racing a queue request usually write
///
/// ```
/// # use desq::prelude::*;
/// # let rt = Builder::seeded(0).quiet().build();
/// # let ctx = rt.context();
/// # let queue = Queue::<u32>::new(&ctx, 1).unwrap();
/// # let c = ctx.clone();
/// ctx.spawn(async move {
///     let mut get = queue.get();
///     if desq::runtime::timeout(&c, 5.0, &mut get).await.is_err() {
///         get.cancel().unwrap();
///     }
/// });
/// # rt.run();
/// ```
///
/// # Cancellation
///
/// Dropping the `Timeout` cancels its timer, so an abandoned timeout never
/// advances the clock.
pub fn timeout<F>(ctx: &Context, delay: impl Into<SimTime>, future: F) -> Timeout<F>
where
    F: Future,
{
    let delay = delay.into();
    Timeout {
        timer: ctx.timeout(delay),
        deadline: ctx.now() + delay,
        future,
    }
}

/// Error returned by [`Timeout`] when the delay elapsed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed {
    /// The virtual time the timeout fired at.
    pub deadline: SimTime,
}

impl Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deadline has elapsed at {}", self.deadline)
    }
}

impl Error for Elapsed {}

pin_project! {
    /// Future returned by [`timeout`].
    #[must_use = "futures do nothing unless you `.await` or poll them"]
    #[derive(Debug)]
    pub struct Timeout<F> {
        #[pin]
        future: F,
        timer: Event<()>,
        deadline: SimTime,
    }

    impl<F> PinnedDrop for Timeout<F> {
        fn drop(this: Pin<&mut Self>) {
            let _ = this.project().timer.cancel();
        }
    }
}

impl<F> Timeout<F> {
    /// The virtual time the timeout fires at.
    pub fn deadline(&self) -> SimTime {
        self.deadline
    }
}

impl<F: Future> Future for Timeout<F> {
    type Output = Result<F::Output, Elapsed>;

    fn poll(self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
        let me = self.project();

        if let Poll::Ready(output) = me.future.poll(cx) {
            return Poll::Ready(Ok(output));
        }

        match me.timer.poll_status(cx) {
            Poll::Ready(_) => Poll::Ready(Err(Elapsed {
                deadline: *me.deadline,
            })),
            Poll::Pending => Poll::Pending,
        }
    }
}
