use super::{
    condition::{Condition, ConditionKind, LevelWatchers, Watcher},
    request::{GetEvent, Hooks, PutEvent, Withdraw},
    waiters::{PendingRequest, RequestId, Side, WaiterRegistry},
    QueueError,
};
use crate::runtime::Context;
use log::{debug, trace, warn};
use num_traits::{Bounded, Num};
use std::{
    cell::RefCell,
    fmt::{Debug, Display},
    marker::PhantomData,
    rc::Rc,
};

///
/// A numeric quantity held by a pool.
///
pub trait Amount: Num + Bounded + PartialOrd + Copy + Debug + Display + 'static {}

impl<N> Amount for N where N: Num + Bounded + PartialOrd + Copy + Debug + Display + 'static {}

///
/// The order in which a pool serves waiting requests.
///
pub trait Discipline: 'static {
    /// The key requests are ordered by. Equal keys are served by arrival.
    type Key: Ord + 'static;

    /// Whether a request that does not fit blocks the requests behind it.
    const STRICT: bool;

    /// The name used in displays and logs.
    const KIND: &'static str;
}

///
/// Requests are served in arrival order, but a request that does not fit
/// is passed by later ones that do.
///
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstFit;

impl Discipline for FirstFit {
    type Key = ();
    const STRICT: bool = false;
    const KIND: &'static str = "Pool";
}

///
/// Requests are served strictly by priority (lowest first) and arrival.
/// A request that does not fit blocks all requests behind it.
///
#[derive(Debug, Clone, Copy, Default)]
pub struct ByPriority<P>(PhantomData<P>);

impl<P: Ord + 'static> Discipline for ByPriority<P> {
    type Key = P;
    const STRICT: bool = true;
    const KIND: &'static str = "PriorityPool";
}

///
/// Counters of a pool, collected over its lifetime.
///
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolStats<N> {
    /// Committed puts.
    pub puts: usize,
    /// Committed gets.
    pub gets: usize,
    /// Puts that had to wait for room.
    pub put_waits: usize,
    /// Gets that had to wait for stock.
    pub get_waits: usize,
    /// Pending requests that were canceled.
    pub cancellations: usize,
    /// The highest level observed.
    pub max_level: N,
}

impl<N: Amount> PoolStats<N> {
    fn new(level: N) -> Self {
        Self {
            puts: 0,
            gets: 0,
            put_waits: 0,
            get_waits: 0,
            cancellations: 0,
            max_level: level,
        }
    }
}

struct Settled<N> {
    commits: Vec<(Side, N)>,
    inserted: usize,
}

type Waiters<D, N, V> = WaiterRegistry<(<D as Discipline>::Key, N), V>;

struct PoolState<N: Amount, D: Discipline> {
    level: N,
    capacity: N,
    hard_cap: bool,

    put_waiters: Waiters<D, N, ()>,
    get_waiters: Waiters<D, N, N>,

    full: Watcher,
    not_full: Watcher,
    any: Watcher,
    empty: Watcher,
    new: Watcher,
    at_least: LevelWatchers<N>,
    at_most: LevelWatchers<N>,

    stats: PoolStats<N>,
    next_request: RequestId,
}

impl<N: Amount, D: Discipline> PoolState<N, D> {
    fn check(&self) {
        debug_assert!(
            self.level >= N::zero() && self.level <= self.capacity,
            "pool level {} outside of [0, {}]",
            self.level,
            self.capacity
        );
    }

    fn valid(&self, amount: N) -> bool {
        amount > N::zero() && amount <= self.capacity
    }

    fn settle(&mut self, label: &str, settled: &mut Settled<N>) {
        self.drain(label, settled);
        self.evaluate(label, settled.inserted);
    }

    // Serves waiters until neither side makes progress.
    fn drain(&mut self, label: &str, settled: &mut Settled<N>) {
        loop {
            let mut progress = false;

            loop {
                let level = self.level;
                let Some(request) = self
                    .get_waiters
                    .pop_first_fit(D::STRICT, |(_, amount)| *amount <= level)
                else {
                    break;
                };
                let amount = request.payload.1;
                self.level = self.level - amount;
                self.stats.gets += 1;
                settled.commits.push((Side::Get, self.level));
                let _ = request.event.succeed(amount);
                trace!(target: "desq::pool", "{label}: fulfilled get #{} of {amount}", request.id);
                progress = true;
            }

            loop {
                let room = self.capacity - self.level;
                let Some(request) = self
                    .put_waiters
                    .pop_first_fit(D::STRICT, |(_, amount)| *amount <= room)
                else {
                    break;
                };
                let amount = request.payload.1;
                self.level = self.level + amount;
                self.stats.puts += 1;
                if self.level > self.stats.max_level {
                    self.stats.max_level = self.level;
                }
                settled.inserted += 1;
                settled.commits.push((Side::Put, self.level));
                let _ = request.event.succeed(());
                trace!(target: "desq::pool", "{label}: fulfilled put #{} of {amount}", request.id);
                progress = true;
            }

            if !progress {
                break;
            }
        }
    }

    fn evaluate(&mut self, label: &str, inserted: usize) {
        let level = self.level;
        let zero = N::zero();
        let fired = [
            (ConditionKind::Full, level >= self.capacity && self.full.fire()),
            (ConditionKind::NotFull, level < self.capacity && self.not_full.fire()),
            (ConditionKind::Any, level > zero && self.any.fire()),
            (ConditionKind::Empty, level == zero && self.empty.fire()),
            (ConditionKind::New, inserted > 0 && self.new.fire()),
            (ConditionKind::AtLeast, self.at_least.fire_where(|n| level >= n) > 0),
            (ConditionKind::AtMost, self.at_most.fire_where(|n| level <= n) > 0),
        ];
        for (kind, _) in fired.iter().filter(|(_, fired)| *fired) {
            trace!(target: "desq::pool", "{label}: condition {kind} fired at level {level}");
        }
    }

    fn when(&mut self, kind: ConditionKind) -> Condition {
        let level = self.level;
        let zero = N::zero();
        let (holds, watcher) = match kind {
            ConditionKind::Full => (level >= self.capacity, &mut self.full),
            ConditionKind::NotFull => (level < self.capacity, &mut self.not_full),
            ConditionKind::Any => (level > zero, &mut self.any),
            ConditionKind::Empty => (level == zero, &mut self.empty),
            ConditionKind::New => (false, &mut self.new),
            other => unreachable!("level conditions are armed by value, not as {other}"),
        };
        if holds {
            Condition::holds(kind)
        } else {
            watcher.arm(kind)
        }
    }
}

struct PoolCore<N: Amount, D: Discipline> {
    state: RefCell<PoolState<N, D>>,
    hooks: Hooks<N>,
    name: Option<String>,
    ctx: Context,
}

impl<N: Amount, D: Discipline> PoolCore<N, D> {
    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(D::KIND)
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut PoolState<N, D>, &mut Settled<N>) -> R) -> R {
        let mut settled = Settled {
            commits: Vec::new(),
            inserted: 0,
        };
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

impl<N: Amount, D: Discipline> Withdraw for PoolCore<N, D> {
    fn withdraw(&self, side: Side, id: RequestId) {
        // A withdrawn head may unblock the requests behind it.
        self.mutate(|state, _| {
            let canceled = match side {
                Side::Put => state.put_waiters.remove(id).map(|r| r.event.cancel()),
                Side::Get => state.get_waiters.remove(id).map(|r| r.event.cancel()),
            };
            if canceled.is_some() {
                state.stats.cancellations += 1;
                debug!(target: "desq::pool", "{}: canceled {side:?} #{id}", self.label());
            }
        });
    }
}

///
/// A container of a homogeneous, divisible quantity shared between
/// simulation processes, generic over the order waiting requests are
/// served in.
///
/// Use the aliases [`Pool`] and [`PriorityPool`].
///
pub struct BasePool<N: Amount, D: Discipline> {
    core: Rc<PoolCore<N, D>>,
}

///
/// A pool serving waiting requests in arrival order, letting smaller
/// requests pass a larger one that does not fit yet.
///
/// # Examples
///
/// ```
/// use desq::prelude::*;
///
/// let rt = Builder::seeded(1).quiet().build();
/// let ctx = rt.context();
/// let tank = Pool::new(&ctx, 10.0).unwrap();
///
/// let t = tank.clone();
/// let c = ctx.clone();
/// ctx.spawn(async move {
///     for _ in 0..4 {
///         c.timeout(1.0).await.unwrap();
///         t.put(2.5).await.unwrap();
///     }
/// });
///
/// let t = tank.clone();
/// let c = ctx.clone();
/// let drained_at = ctx.spawn(async move {
///     t.get(10.0).await.unwrap();
///     c.now()
/// });
///
/// rt.run();
/// assert_eq!(drained_at.take_value(), Some(SimTime::from(4.0)));
/// assert!(tank.is_empty());
/// ```
pub type Pool<N> = BasePool<N, FirstFit>;

///
/// A pool serving waiting requests strictly by priority, lowest first, then
/// by arrival. A request that does not fit blocks all requests behind it.
///
pub type PriorityPool<N, P> = BasePool<N, ByPriority<P>>;

impl<N: Amount, D: Discipline> BasePool<N, D> {
    ///
    /// Creates an empty pool holding at most `capacity`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidAmount`] if `capacity` is not positive.
    ///
    pub fn new(ctx: &Context, capacity: N) -> Result<Self, QueueError> {
        PoolBuilder::new().capacity(capacity).build(ctx)
    }

    /// Creates an empty pool bounded only by the largest value of `N`.
    pub fn unbounded(ctx: &Context) -> Self {
        Self::from_builder(PoolBuilder::new(), ctx)
    }

    /// Returns a builder for a configured pool.
    pub fn builder() -> PoolBuilder<N, D> {
        PoolBuilder::new()
    }

    fn from_builder(builder: PoolBuilder<N, D>, ctx: &Context) -> Self {
        Self {
            core: Rc::new(PoolCore {
                state: RefCell::new(PoolState {
                    level: builder.init,
                    capacity: builder.capacity,
                    hard_cap: builder.hard_cap,
                    put_waiters: WaiterRegistry::new(),
                    get_waiters: WaiterRegistry::new(),
                    full: Watcher::default(),
                    not_full: Watcher::default(),
                    any: Watcher::default(),
                    empty: Watcher::default(),
                    new: Watcher::default(),
                    at_least: LevelWatchers::new(),
                    at_most: LevelWatchers::new(),
                    stats: PoolStats::new(builder.init),
                    next_request: 0,
                }),
                hooks: Hooks::new(),
                name: builder.name,
                ctx: ctx.clone(),
            }),
        }
    }

    fn put_keyed(&self, key: D::Key, amount: N) -> PutEvent {
        let owner: Rc<dyn Withdraw> = self.core.clone();
        let label = self.core.label();
        let event = self.core.ctx.event();

        self.core.mutate(|state, settled| {
            if !state.valid(amount) {
                warn!(target: "desq::pool", "{label}: invalid put of {amount}");
                let _ = event.fail(QueueError::InvalidAmount);
                return PutEvent::completed(event);
            }

            let id = state.next_request;
            state.next_request += 1;
            state.put_waiters.insert_by(
                PendingRequest {
                    id,
                    payload: (key, amount),
                    event: event.clone(),
                },
                |a, b| a.0.cmp(&b.0),
            );
            state.drain(label, settled);

            if event.is_pending() {
                if state.hard_cap {
                    state.put_waiters.remove(id);
                    warn!(target: "desq::pool", "{label}: put of {amount} overflows capacity {}", state.capacity);
                    let _ = event.fail(QueueError::Overflow);
                    return PutEvent::completed(event);
                }
                state.stats.put_waits += 1;
                trace!(target: "desq::pool", "{label}: put #{id} of {amount} waits for room");
            }
            PutEvent::pending(event, Side::Put, id, owner)
        })
    }

    fn get_keyed(&self, key: D::Key, amount: N) -> GetEvent<N> {
        let owner: Rc<dyn Withdraw> = self.core.clone();
        let label = self.core.label();
        let event = self.core.ctx.event();

        self.core.mutate(|state, settled| {
            if !state.valid(amount) {
                warn!(target: "desq::pool", "{label}: invalid get of {amount}");
                let _ = event.fail(QueueError::InvalidAmount);
                return GetEvent::completed(event);
            }

            let id = state.next_request;
            state.next_request += 1;
            state.get_waiters.insert_by(
                PendingRequest {
                    id,
                    payload: (key, amount),
                    event: event.clone(),
                },
                |a, b| a.0.cmp(&b.0),
            );
            state.drain(label, settled);

            if event.is_pending() {
                state.stats.get_waits += 1;
                trace!(target: "desq::pool", "{label}: get #{id} of {amount} waits for stock");
            }
            GetEvent::pending(event, Side::Get, id, owner)
        })
    }

    /// The amount held.
    pub fn level(&self) -> N {
        self.core.state.borrow().level
    }

    pub fn capacity(&self) -> N {
        self.core.state.borrow().capacity
    }

    /// The amount that fits before the pool is full.
    pub fn remaining(&self) -> N {
        let state = self.core.state.borrow();
        state.capacity - state.level
    }

    pub fn is_empty(&self) -> bool {
        self.level() == N::zero()
    }

    pub fn is_full(&self) -> bool {
        let state = self.core.state.borrow();
        state.level >= state.capacity
    }

    pub fn is_hard_capped(&self) -> bool {
        self.core.state.borrow().hard_cap
    }

    pub fn name(&self) -> Option<&str> {
        self.core.name.as_deref()
    }

    /// The runtime this pool belongs to.
    pub fn context(&self) -> &Context {
        &self.core.ctx
    }

    pub fn num_put_waiters(&self) -> usize {
        self.core.state.borrow().put_waiters.len()
    }

    pub fn num_get_waiters(&self) -> usize {
        self.core.state.borrow().get_waiters.len()
    }

    pub fn stats(&self) -> PoolStats<N> {
        self.core.state.borrow().stats
    }

    /// Registers a hook called with the new level after every committed put.
    pub fn on_put(&self, hook: impl FnMut(N) + 'static) {
        self.core.hooks.set(Side::Put, Box::new(hook));
    }

    /// Registers a hook called with the new level after every committed get.
    pub fn on_get(&self, hook: impl FnMut(N) + 'static) {
        self.core.hooks.set(Side::Get, Box::new(hook));
    }

    /// Resolves once the level is at least `amount`.
    pub fn when_at_least(&self, amount: N) -> Condition {
        let mut state = self.core.state.borrow_mut();
        if state.level >= amount {
            Condition::holds(ConditionKind::AtLeast)
        } else {
            state.at_least.arm(ConditionKind::AtLeast, amount)
        }
    }

    /// Resolves once the level is at most `amount`.
    pub fn when_at_most(&self, amount: N) -> Condition {
        let mut state = self.core.state.borrow_mut();
        if state.level <= amount {
            Condition::holds(ConditionKind::AtMost)
        } else {
            state.at_most.arm(ConditionKind::AtMost, amount)
        }
    }

    pub fn when_any(&self) -> Condition {
        self.core.state.borrow_mut().when(ConditionKind::Any)
    }

    pub fn when_full(&self) -> Condition {
        self.core.state.borrow_mut().when(ConditionKind::Full)
    }

    pub fn when_not_full(&self) -> Condition {
        self.core.state.borrow_mut().when(ConditionKind::NotFull)
    }

    pub fn when_empty(&self) -> Condition {
        self.core.state.borrow_mut().when(ConditionKind::Empty)
    }

    /// Resolves after the next committed put. Request again for later puts.
    pub fn when_new(&self) -> Condition {
        self.core.state.borrow_mut().when(ConditionKind::New)
    }
}

impl<N: Amount> Pool<N> {
    ///
    /// Adds `amount` to the pool, waiting for room if needed.
    ///
    /// An amount outside of `(0, capacity]` returns a request that already
    /// failed with [`QueueError::InvalidAmount`].
    ///
    pub fn put(&self, amount: N) -> PutEvent {
        self.put_keyed((), amount)
    }

    ///
    /// Takes `amount` from the pool, waiting for stock if needed.
    ///
    /// An amount outside of `(0, capacity]` returns a request that already
    /// failed with [`QueueError::InvalidAmount`].
    ///
    pub fn get(&self, amount: N) -> GetEvent<N> {
        self.get_keyed((), amount)
    }
}

impl<N: Amount, P: Ord + 'static> PriorityPool<N, P> {
    /// Adds `amount` to the pool. Lower priorities are served first.
    pub fn put(&self, amount: N, priority: P) -> PutEvent {
        self.put_keyed(priority, amount)
    }

    /// Takes `amount` from the pool. Lower priorities are served first.
    pub fn get(&self, amount: N, priority: P) -> GetEvent<N> {
        self.get_keyed(priority, amount)
    }
}

impl<N: Amount, D: Discipline> Clone for BasePool<N, D> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<N: Amount, D: Discipline> Display for BasePool<N, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.core.state.borrow();
        write!(
            f,
            "{}(name={:?} level={} capacity={})",
            D::KIND,
            self.core.name,
            state.level,
            state.capacity
        )
    }
}

impl<N: Amount, D: Discipline> Debug for BasePool<N, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.core.state.borrow();
        f.debug_struct(D::KIND)
            .field("name", &self.core.name)
            .field("level", &state.level)
            .field("capacity", &state.capacity)
            .field("put_waiters", &state.put_waiters)
            .field("get_waiters", &state.get_waiters)
            .finish()
    }
}

///
/// A builder for pools with a name, an initial level or a hard cap.
///
#[must_use]
pub struct PoolBuilder<N, D> {
    capacity: N,
    init: N,
    hard_cap: bool,
    name: Option<String>,
    discipline: PhantomData<D>,
}

impl<N: Amount, D: Discipline> PoolBuilder<N, D> {
    /// Creates a builder for an empty, unbounded pool.
    pub fn new() -> Self {
        Self {
            capacity: N::max_value(),
            init: N::zero(),
            hard_cap: false,
            name: None,
            discipline: PhantomData,
        }
    }

    pub fn capacity(mut self, capacity: N) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the initial level.
    pub fn init(mut self, init: N) -> Self {
        self.init = init;
        self
    }

    /// Fails puts that do not fit with [`QueueError::Overflow`] instead of
    /// letting them wait.
    pub fn hard_cap(mut self, hard_cap: bool) -> Self {
        self.hard_cap = hard_cap;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    ///
    /// Builds the pool.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidAmount`] if the capacity is not positive
    /// or the initial level is outside of `[0, capacity]`.
    ///
    pub fn build(self, ctx: &Context) -> Result<BasePool<N, D>, QueueError> {
        let zero = N::zero();
        if !(self.capacity > zero) || !(self.init >= zero && self.init <= self.capacity) {
            return Err(QueueError::InvalidAmount);
        }
        Ok(BasePool::from_builder(self, ctx))
    }
}

impl<N: Amount, D: Discipline> Default for PoolBuilder<N, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Debug, D> Debug for PoolBuilder<N, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolBuilder")
            .field("capacity", &self.capacity)
            .field("init", &self.init)
            .field("hard_cap", &self.hard_cap)
            .field("name", &self.name)
            .finish()
    }
}
