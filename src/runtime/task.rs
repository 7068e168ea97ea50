use std::{
    collections::VecDeque,
    fmt::Debug,
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    task::{Context, Poll, Wake, Waker},
};

pub(crate) type TaskId = u64;

///
/// The FIFO of processes that were woken and wait to be polled.
///
/// `Waker` must be `Send + Sync`, so the queue is behind a mutex even though
/// only the simulation thread ever touches it.
///
#[derive(Debug, Clone, Default)]
pub(crate) struct ReadyQueue {
    inner: Arc<Mutex<VecDeque<TaskId>>>,
}

impl ReadyQueue {
    fn lock(&self) -> MutexGuard<'_, VecDeque<TaskId>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn push(&self, id: TaskId) {
        self.lock().push_back(id);
    }

    pub(crate) fn pop(&self) -> Option<TaskId> {
        self.lock().pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }
}

#[derive(Debug)]
struct TaskWaker {
    id: TaskId,
    queued: AtomicBool,
    ready: ReadyQueue,
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        // Multiple wakeups before the next poll collapse into one.
        if !self.queued.swap(true, Ordering::SeqCst) {
            self.ready.push(self.id);
        }
    }
}

///
/// A spawned simulation process.
///
pub(crate) struct Task {
    future: Pin<Box<dyn Future<Output = ()>>>,
    handle: Arc<TaskWaker>,
    waker: Waker,
}

impl Task {
    pub(crate) fn new(
        id: TaskId,
        future: Pin<Box<dyn Future<Output = ()>>>,
        ready: ReadyQueue,
    ) -> Self {
        let handle = Arc::new(TaskWaker {
            id,
            queued: AtomicBool::new(false),
            ready,
        });
        let waker = Waker::from(Arc::clone(&handle));
        Self {
            future,
            handle,
            waker,
        }
    }

    pub(crate) fn schedule(&self) {
        self.waker.wake_by_ref();
    }

    /// Polls the process once. Returns `true` if it ran to completion.
    pub(crate) fn poll(&mut self) -> bool {
        self.handle.queued.store(false, Ordering::SeqCst);
        let mut cx = Context::from_waker(&self.waker);
        matches!(self.future.as_mut().poll(&mut cx), Poll::Ready(()))
    }
}

impl Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").field("id", &self.handle.id).finish()
    }
}
