use super::{
    condition::{Condition, ConditionKind, Watcher},
    request::{GetEvent, Hooks, PutEvent, Withdraw},
    waiters::{PendingRequest, RequestId, Side, WaiterRegistry},
    QueueError, TryPutError,
};
use crate::runtime::{Context, Event};
use log::{debug, trace, warn};
use std::{
    cell::RefCell,
    collections::VecDeque,
    fmt::{Debug, Display},
    rc::Rc,
};

///
/// The storage behind a queue, deciding which item leaves next.
///
pub trait ItemStore: Default {
    /// The stored item.
    type Item;

    /// The name used in displays and logs.
    const KIND: &'static str;

    /// Stores an item.
    fn push(&mut self, item: Self::Item);

    /// Removes the next item.
    fn pop(&mut self) -> Option<Self::Item>;

    /// Returns the next item without removing it.
    fn peek(&self) -> Option<&Self::Item>;

    /// Returns the number of stored items.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Storage of a [`Queue`]: items leave in insertion order.
#[derive(Debug)]
pub struct FifoStore<T> {
    items: VecDeque<T>,
}

impl<T> Default for FifoStore<T> {
    fn default() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }
}

impl<T> ItemStore for FifoStore<T> {
    type Item = T;
    const KIND: &'static str = "Queue";

    fn push(&mut self, item: T) {
        self.items.push_back(item);
    }

    fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    fn peek(&self) -> Option<&T> {
        self.items.front()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

///
/// Counters of a queue, collected over its lifetime.
///
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QueueStats {
    /// Items that entered the queue.
    pub puts: usize,
    /// Items that left the queue.
    pub gets: usize,
    /// Puts that had to wait for room.
    pub put_waits: usize,
    /// Gets that had to wait for an item.
    pub get_waits: usize,
    /// Pending requests that were canceled.
    pub cancellations: usize,
    /// The largest size observed.
    pub max_size: usize,
}

// The outcome of one fulfillment pass.
#[derive(Debug, Default)]
struct Settled {
    commits: Vec<(Side, usize)>,
    inserted: usize,
}

struct QueueState<S: ItemStore> {
    store: S,
    capacity: usize,
    hard_cap: bool,

    put_waiters: WaiterRegistry<S::Item, ()>,
    get_waiters: WaiterRegistry<(), S::Item>,

    full: Watcher,
    not_full: Watcher,
    any: Watcher,
    new: Watcher,

    stats: QueueStats,
    next_request: RequestId,
    arrivals: u64,
}

impl<S: ItemStore> QueueState<S> {
    fn check(&self) {
        debug_assert!(
            self.store.len() <= self.capacity,
            "queue size {} exceeds capacity {}",
            self.store.len(),
            self.capacity
        );
    }

    fn is_full(&self) -> bool {
        self.store.len() >= self.capacity
    }

    fn next_request(&mut self) -> RequestId {
        let id = self.next_request;
        self.next_request += 1;
        id
    }

    fn insert(&mut self, item: S::Item, settled: &mut Settled) {
        self.store.push(item);
        let size = self.store.len();
        self.stats.puts += 1;
        self.stats.max_size = self.stats.max_size.max(size);
        settled.inserted += 1;
        settled.commits.push((Side::Put, size));
    }

    fn remove(&mut self, settled: &mut Settled) -> Option<S::Item> {
        let item = self.store.pop()?;
        self.stats.gets += 1;
        settled.commits.push((Side::Get, self.store.len()));
        Some(item)
    }

    ///
    /// Serves waiters until neither side can make progress, then fires the
    /// watchers whose condition holds on the settled state.
    ///
    fn settle(&mut self, label: &str, settled: &mut Settled) {
        loop {
            let mut progress = false;

            // Gets take existing stock first.
            while !self.store.is_empty() {
                let Some(request) = self.get_waiters.pop_front() else {
                    break;
                };
                let Some(item) = self.remove(settled) else {
                    self.get_waiters.push_front(request);
                    break;
                };
                if request.event.succeed(item).is_err() {
                    warn!(target: "desq::queue", "{label}: get #{} was completed elsewhere, item dropped", request.id);
                }
                trace!(target: "desq::queue", "{label}: fulfilled get #{}", request.id);
                progress = true;
            }

            while !self.is_full() {
                let Some(request) = self.put_waiters.pop_front() else {
                    break;
                };
                self.insert(request.payload, settled);
                let _ = request.event.succeed(());
                trace!(target: "desq::queue", "{label}: fulfilled put #{}", request.id);
                progress = true;
            }

            if !progress {
                break;
            }
        }

        self.evaluate(label, settled.inserted);
    }

    fn evaluate(&mut self, label: &str, inserted: usize) {
        let size = self.store.len();
        let fired = [
            (ConditionKind::Full, size == self.capacity && self.full.fire()),
            (ConditionKind::NotFull, size < self.capacity && self.not_full.fire()),
            (ConditionKind::Any, size > 0 && self.any.fire()),
            (ConditionKind::New, inserted > 0 && self.new.fire()),
        ];
        for (kind, _) in fired.iter().filter(|(_, fired)| *fired) {
            trace!(target: "desq::queue", "{label}: condition {kind} fired at size {size}");
        }
    }

    fn when(&mut self, kind: ConditionKind) -> Condition {
        let size = self.store.len();
        let (holds, watcher) = match kind {
            ConditionKind::Full => (size == self.capacity, &mut self.full),
            ConditionKind::NotFull => (size < self.capacity, &mut self.not_full),
            ConditionKind::Any => (size > 0, &mut self.any),
            ConditionKind::New => (false, &mut self.new),
            other => unreachable!("queues have no {other} condition"),
        };
        if holds {
            Condition::holds(kind)
        } else {
            watcher.arm(kind)
        }
    }
}

struct QueueCore<S: ItemStore> {
    state: RefCell<QueueState<S>>,
    hooks: Hooks<usize>,
    name: Option<String>,
    ctx: Context,
}

impl<S: ItemStore> QueueCore<S> {
    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(S::KIND)
    }

    /// Runs `f` on the state, settles the queue and calls the hooks after
    /// the state was released.
    fn mutate<R>(&self, f: impl FnOnce(&mut QueueState<S>, &mut Settled) -> R) -> R {
        let mut settled = Settled::default();
        let result = {
            let mut state = self.state.borrow_mut();
            state.check();
            let result = f(&mut state, &mut settled);
            state.settle(self.label(), &mut settled);
            state.check();
            result
        };
        self.hooks.run(&settled.commits);
        result
    }
}

impl<S: ItemStore> Withdraw for QueueCore<S> {
    fn withdraw(&self, side: Side, id: RequestId) {
        self.mutate(|state, _| {
            let canceled = match side {
                Side::Put => state.put_waiters.remove(id).map(|r| r.event.cancel()),
                Side::Get => state.get_waiters.remove(id).map(|r| r.event.cancel()),
            };
            if canceled.is_some() {
                state.stats.cancellations += 1;
                debug!(target: "desq::queue", "{}: canceled {side:?} #{id}", self.label());
            }
        });
    }
}

///
/// A bounded buffer shared between simulation processes, generic over the
/// order items leave in.
///
/// Use the aliases [`Queue`] (first in, first out) and
/// [`PriorityQueue`](super::PriorityQueue) (lowest priority first).
///
/// Handles are cheap to clone and refer to the same queue.
///
pub struct BaseQueue<S: ItemStore> {
    core: Rc<QueueCore<S>>,
}

///
/// A bounded first in, first out queue.
///
/// A `put` on a full queue and a `get` on an empty queue return pending
/// requests that the calling process awaits. Requests on each side are
/// served in arrival order. Whenever the queue changes, pending gets are
/// served from the stock first, then pending puts fill the freed room, until
/// neither side can make progress.
///
/// # Examples
///
/// ```
/// use desq::prelude::*;
///
/// let rt = Builder::seeded(1).quiet().build();
/// let ctx = rt.context();
/// let queue = Queue::new(&ctx, 2).unwrap();
///
/// let q = queue.clone();
/// let c = ctx.clone();
/// ctx.spawn(async move {
///     for i in 0..4 {
///         q.put(i).await.unwrap();
///         c.timeout(1.0).await.unwrap();
///     }
/// });
///
/// let q = queue.clone();
/// let received = ctx.spawn(async move {
///     let mut items = Vec::new();
///     for _ in 0..4 {
///         items.push(q.get().await.unwrap());
///     }
///     items
/// });
///
/// rt.run();
/// assert_eq!(received.take_value(), Some(vec![0, 1, 2, 3]));
/// ```
pub type Queue<T> = BaseQueue<FifoStore<T>>;

impl<S: ItemStore + 'static> BaseQueue<S> {
    ///
    /// Creates a queue holding at most `capacity` items.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Capacity`] if `capacity` is zero.
    ///
    pub fn new(ctx: &Context, capacity: usize) -> Result<Self, QueueError> {
        QueueBuilder::new().capacity(capacity).build(ctx)
    }

    /// Creates a queue without a capacity bound.
    pub fn unbounded(ctx: &Context) -> Self {
        Self::from_builder(QueueBuilder::new(), ctx)
    }

    /// Returns a builder for a configured queue.
    pub fn builder() -> QueueBuilder<S> {
        QueueBuilder::new()
    }

    fn from_builder(builder: QueueBuilder<S>, ctx: &Context) -> Self {
        let mut store = S::default();
        let arrivals = builder.items.len() as u64;
        builder.items.into_iter().for_each(|item| store.push(item));

        let stats = QueueStats {
            max_size: store.len(),
            ..QueueStats::default()
        };

        Self {
            core: Rc::new(QueueCore {
                state: RefCell::new(QueueState {
                    store,
                    capacity: builder.capacity,
                    hard_cap: builder.hard_cap,
                    put_waiters: WaiterRegistry::new(),
                    get_waiters: WaiterRegistry::new(),
                    full: Watcher::default(),
                    not_full: Watcher::default(),
                    any: Watcher::default(),
                    new: Watcher::default(),
                    stats,
                    next_request: 0,
                    arrivals,
                }),
                hooks: Hooks::new(),
                name: builder.name,
                ctx: ctx.clone(),
            }),
        }
    }

    fn owner(&self) -> Rc<dyn Withdraw> {
        self.core.clone()
    }

    /// Returns the arrival number for the next item.
    pub(crate) fn next_arrival(&self) -> u64 {
        let mut state = self.core.state.borrow_mut();
        let seq = state.arrivals;
        state.arrivals += 1;
        seq
    }

    ///
    /// Puts an item into the queue.
    ///
    /// If there is room, the item is stored at once and the returned request
    /// is already fulfilled. Otherwise the request waits until a get frees
    /// room, or fails with [`QueueError::Overflow`] if the queue is hard
    /// capped.
    ///
    pub(crate) fn put_item(&self, item: S::Item) -> PutEvent {
        let owner = self.owner();
        self.core.mutate(|state, settled| {
            if !state.is_full() {
                state.insert(item, settled);
                return PutEvent::completed(Event::succeeded(()));
            }

            let event = self.core.ctx.event();
            if state.hard_cap {
                warn!(target: "desq::queue", "{}: put overflows capacity {}", self.core.label(), state.capacity);
                let _ = event.fail(QueueError::Overflow);
                return PutEvent::completed(event);
            }

            let id = state.next_request();
            state.put_waiters.push(PendingRequest {
                id,
                payload: item,
                event: event.clone(),
            });
            state.stats.put_waits += 1;
            trace!(target: "desq::queue", "{}: put #{id} waits for room", self.core.label());
            PutEvent::pending(event, Side::Put, id, owner)
        })
    }

    ///
    /// Stores an item only if there is room right now.
    ///
    pub(crate) fn try_put_item(&self, item: S::Item) -> Result<(), TryPutError<S::Item>> {
        self.core.mutate(|state, settled| {
            if !state.is_full() {
                state.insert(item, settled);
                Ok(())
            } else if state.hard_cap {
                Err(TryPutError::Overflow(item))
            } else {
                Err(TryPutError::Full(item))
            }
        })
    }

    ///
    /// Takes the next item from the queue.
    ///
    /// If the queue holds an item, the returned request is already fulfilled
    /// with it. Otherwise the request waits and is fulfilled with the item
    /// the next served put delivers.
    ///
    pub fn get(&self) -> GetEvent<S::Item> {
        let owner = self.owner();
        self.core.mutate(|state, settled| {
            if let Some(item) = state.remove(settled) {
                return GetEvent::completed(Event::succeeded(item));
            }

            let id = state.next_request();
            let event = self.core.ctx.event();
            state.get_waiters.push(PendingRequest {
                id,
                payload: (),
                event: event.clone(),
            });
            state.stats.get_waits += 1;
            trace!(target: "desq::queue", "{}: get #{id} waits for an item", self.core.label());
            GetEvent::pending(event, Side::Get, id, owner)
        })
    }

    /// Takes the next item if there is one, without waiting.
    pub fn try_get(&self) -> Option<S::Item> {
        self.core.mutate(|state, settled| state.remove(settled))
    }

    /// Returns a copy of the next item without removing it.
    pub fn peek(&self) -> Option<S::Item>
    where
        S::Item: Clone,
    {
        self.core.state.borrow().store.peek().cloned()
    }

    /// The number of stored items.
    pub fn size(&self) -> usize {
        self.core.state.borrow().store.len()
    }

    pub fn capacity(&self) -> usize {
        self.core.state.borrow().capacity
    }

    /// The number of items that fit before the queue is full.
    pub fn remaining(&self) -> usize {
        let state = self.core.state.borrow();
        state.capacity - state.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.state.borrow().store.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.core.state.borrow().is_full()
    }

    pub fn is_unbounded(&self) -> bool {
        self.capacity() == usize::MAX
    }

    pub fn is_hard_capped(&self) -> bool {
        self.core.state.borrow().hard_cap
    }

    pub fn name(&self) -> Option<&str> {
        self.core.name.as_deref()
    }

    /// The runtime this queue belongs to.
    pub fn context(&self) -> &Context {
        &self.core.ctx
    }

    /// The number of pending puts.
    pub fn num_put_waiters(&self) -> usize {
        self.core.state.borrow().put_waiters.len()
    }

    /// The number of pending gets.
    pub fn num_get_waiters(&self) -> usize {
        self.core.state.borrow().get_waiters.len()
    }

    pub fn stats(&self) -> QueueStats {
        self.core.state.borrow().stats
    }

    ///
    /// Registers a hook called with the new size after every item that
    /// entered the queue. Replaces a previous hook.
    ///
    pub fn on_put(&self, hook: impl FnMut(usize) + 'static) {
        self.core.hooks.set(Side::Put, Box::new(hook));
    }

    ///
    /// Registers a hook called with the new size after every item that
    /// left the queue. Replaces a previous hook.
    ///
    pub fn on_get(&self, hook: impl FnMut(usize) + 'static) {
        self.core.hooks.set(Side::Get, Box::new(hook));
    }

    /// Resolves once the queue is full. Holds at once if it is full now.
    pub fn when_full(&self) -> Condition {
        self.core.state.borrow_mut().when(ConditionKind::Full)
    }

    /// Resolves once the queue has room. Holds at once if it has room now.
    pub fn when_not_full(&self) -> Condition {
        self.core.state.borrow_mut().when(ConditionKind::NotFull)
    }

    /// Resolves once the queue holds an item. Holds at once if it does now.
    pub fn when_any(&self) -> Condition {
        self.core.state.borrow_mut().when(ConditionKind::Any)
    }

    ///
    /// Resolves after the next put that stored an item, including a put
    /// that was handed straight to a waiting get. Request again to observe
    /// later puts.
    ///
    pub fn when_new(&self) -> Condition {
        self.core.state.borrow_mut().when(ConditionKind::New)
    }
}

impl<T: 'static> Queue<T> {
    ///
    /// Puts an item at the back of the queue.
    ///
    /// See [`BaseQueue::get`] for the matching side.
    ///
    pub fn put(&self, item: T) -> PutEvent {
        self.put_item(item)
    }

    ///
    /// Stores the item only if there is room right now, handing it back
    /// otherwise. Never registers a waiter.
    ///
    pub fn try_put(&self, item: T) -> Result<(), TryPutError<T>> {
        self.try_put_item(item)
    }
}

impl<S: ItemStore> Clone for BaseQueue<S> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<S: ItemStore> Display for BaseQueue<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.core.state.borrow();
        write!(
            f,
            "{}(name={:?} size={} capacity=",
            S::KIND,
            self.core.name,
            state.store.len()
        )?;
        if state.capacity == usize::MAX {
            write!(f, "inf)")
        } else {
            write!(f, "{})", state.capacity)
        }
    }
}

impl<S: ItemStore> Debug for BaseQueue<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.core.state.borrow();
        f.debug_struct(S::KIND)
            .field("name", &self.core.name)
            .field("size", &state.store.len())
            .field("capacity", &state.capacity)
            .field("put_waiters", &state.put_waiters)
            .field("get_waiters", &state.get_waiters)
            .finish()
    }
}

///
/// A builder for queues with a name, initial items or a hard cap.
///
/// ```
/// use desq::prelude::*;
///
/// let rt = Builder::seeded(1).quiet().build();
/// let queue = Queue::builder()
///     .capacity(2)
///     .name("q")
///     .items(["a"])
///     .build(&rt.context())
///     .unwrap();
///
/// assert_eq!(queue.to_string(), r#"Queue(name=Some("q") size=1 capacity=2)"#);
/// ```
#[must_use]
pub struct QueueBuilder<S: ItemStore> {
    capacity: usize,
    hard_cap: bool,
    name: Option<String>,
    pub(crate) items: Vec<S::Item>,
}

impl<S: ItemStore + 'static> QueueBuilder<S> {
    /// Creates a builder for an unbounded queue.
    pub fn new() -> Self {
        Self {
            capacity: usize::MAX,
            hard_cap: false,
            name: None,
            items: Vec::new(),
        }
    }

    /// Bounds the queue to `capacity` items.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Removes the capacity bound.
    pub fn unbounded(mut self) -> Self {
        self.capacity = usize::MAX;
        self
    }

    ///
    /// Fails puts that do not fit at once with [`QueueError::Overflow`]
    /// instead of letting them wait.
    ///
    pub fn hard_cap(mut self, hard_cap: bool) -> Self {
        self.hard_cap = hard_cap;
        self
    }

    /// Names the queue in displays and logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    ///
    /// Builds the queue.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Capacity`] if the capacity is zero or smaller
    /// than the number of initial items.
    ///
    pub fn build(self, ctx: &Context) -> Result<BaseQueue<S>, QueueError> {
        if self.capacity == 0 || self.items.len() > self.capacity {
            return Err(QueueError::Capacity(self.capacity));
        }
        Ok(BaseQueue::from_builder(self, ctx))
    }
}

impl<T: 'static> QueueBuilder<FifoStore<T>> {
    /// Fills the queue with initial items, front first.
    pub fn items(mut self, items: impl IntoIterator<Item = T>) -> Self {
        self.items.extend(items);
        self
    }
}

impl<S: ItemStore + 'static> Default for QueueBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ItemStore> Debug for QueueBuilder<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueBuilder")
            .field("capacity", &self.capacity)
            .field("hard_cap", &self.hard_cap)
            .field("name", &self.name)
            .field("items", &self.items.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{Builder, Runtime};
    use std::cell::Cell;

    fn setup() -> (Runtime, Context) {
        let rt = Builder::seeded(7).quiet().build();
        let ctx = rt.context();
        (rt, ctx)
    }

    #[test]
    fn rejects_zero_capacity() {
        let (_rt, ctx) = setup();
        assert!(matches!(
            Queue::<u8>::new(&ctx, 0),
            Err(QueueError::Capacity(0))
        ));
        assert!(matches!(
            Queue::builder().capacity(1).items([1, 2]).build(&ctx),
            Err(QueueError::Capacity(1))
        ));
    }

    #[test]
    fn immediate_put_and_get() {
        let (_rt, ctx) = setup();
        let queue = Queue::new(&ctx, 2).unwrap();

        assert!(queue.put('a').is_fulfilled());
        assert!(queue.put('b').is_fulfilled());
        assert!(queue.is_full());
        assert_eq!(queue.remaining(), 0);

        let blocked = queue.put('c');
        assert!(blocked.is_pending());
        assert_eq!(queue.num_put_waiters(), 1);

        let mut get = queue.get();
        assert_eq!(get.take(), Some('a'));

        // The waiting put was granted by the same get.
        assert!(blocked.is_fulfilled());
        assert_eq!(queue.size(), 2);
        assert_eq!(queue.peek(), Some('b'));
    }

    #[test]
    fn put_hands_item_to_waiting_get() {
        let (_rt, ctx) = setup();
        let queue = Queue::new(&ctx, 1).unwrap();

        let mut first = queue.get();
        let mut second = queue.get();
        assert!(first.is_pending() && second.is_pending());

        assert!(queue.put(10).is_fulfilled());
        assert_eq!(first.take(), Some(10));
        assert!(second.is_pending());
        assert!(queue.is_empty());

        let _ = queue.put(20);
        assert_eq!(second.take(), Some(20));
        assert_eq!(queue.stats().get_waits, 2);
    }

    #[test]
    fn cancel_pending_and_fulfilled() {
        let (_rt, ctx) = setup();
        let queue = Queue::new(&ctx, 1).unwrap();

        let canceled = queue.get();
        let mut live = queue.get();
        canceled.cancel().unwrap();
        canceled.cancel().unwrap();
        assert!(canceled.is_canceled());
        assert_eq!(queue.num_get_waiters(), 1);

        let _ = queue.put(5);
        assert_eq!(live.take(), Some(5));
        assert!(matches!(live.cancel(), Err(QueueError::AlreadyFulfilled)));
        assert_eq!(queue.size(), 0);
        assert_eq!(queue.stats().cancellations, 1);
    }

    #[test]
    fn hard_cap_fails_overflowing_puts() {
        let (_rt, ctx) = setup();
        let queue = Queue::builder()
            .capacity(1)
            .hard_cap(true)
            .build(&ctx)
            .unwrap();

        assert!(queue.put(1).is_fulfilled());
        let overflow = queue.put(2);
        assert!(overflow.is_failed());
        assert!(overflow.cancel().is_ok());
        assert_eq!(queue.num_put_waiters(), 0);
        assert_eq!(queue.try_put(3), Err(TryPutError::Overflow(3)));
    }

    #[test]
    fn try_access_never_waits() {
        let (_rt, ctx) = setup();
        let queue = Queue::new(&ctx, 1).unwrap();

        assert_eq!(queue.try_get(), None);
        assert_eq!(queue.try_put("x"), Ok(()));
        assert_eq!(queue.try_put("y"), Err(TryPutError::Full("y")));
        assert_eq!(queue.try_get(), Some("x"));
        assert_eq!(queue.num_put_waiters() + queue.num_get_waiters(), 0);
    }

    #[test]
    fn conditions_hold_at_request_time() {
        let (_rt, ctx) = setup();
        let queue = Queue::new(&ctx, 1).unwrap();

        assert!(queue.when_not_full().is_triggered());
        assert!(!queue.when_any().is_triggered());
        let full = queue.when_full();
        assert!(!full.is_triggered());
        let new = queue.when_new();

        let _ = queue.put(());
        assert!(full.is_triggered());
        assert!(new.is_triggered());
        assert!(queue.when_full().is_triggered());
        assert!(queue.when_any().is_triggered());
        assert!(!queue.when_new().is_triggered());
    }

    #[test]
    fn hooks_observe_sizes() {
        let (_rt, ctx) = setup();
        let queue = Queue::new(&ctx, 2).unwrap();
        let sizes = Rc::new(RefCell::new(Vec::new()));
        let gets = Rc::new(Cell::new(0));

        let s = sizes.clone();
        queue.on_put(move |size| s.borrow_mut().push(size));
        let g = gets.clone();
        queue.on_get(move |_| g.set(g.get() + 1));

        let _ = queue.put(1);
        let _ = queue.put(2);
        let _blocked = queue.put(3);
        queue.try_get();

        assert_eq!(*sizes.borrow(), vec![1, 2, 2]);
        assert_eq!(gets.get(), 1);
        assert_eq!(queue.stats().max_size, 2);
    }

    #[test]
    fn peeked_item_outlives_mutations() {
        let (_rt, ctx) = setup();
        let queue = Queue::new(&ctx, 3).unwrap();

        let _ = queue.put(1);
        if let Some(head) = queue.peek() {
            assert!(queue.put(head + 1).is_fulfilled());
            assert_eq!(queue.get().take(), Some(head));
        }
        assert_eq!(queue.peek(), Some(2));
        assert_eq!(queue.size(), 1);
    }

    #[test]
    fn display_and_builder() {
        let (_rt, ctx) = setup();
        let queue = Queue::builder()
            .name("q")
            .items([1, 2, 3])
            .build(&ctx)
            .unwrap();
        assert!(queue.is_unbounded());
        assert_eq!(queue.name(), Some("q"));
        assert_eq!(
            queue.to_string(),
            r#"Queue(name=Some("q") size=3 capacity=inf)"#
        );
        assert_eq!(queue.try_get(), Some(1));
    }
}
