//!
//! Central primitives for running a discrete event simulation.
//!
//! A [`Runtime`] owns the virtual clock, the pending timers and the set of
//! simulation processes. Processes are plain Rust futures spawned through a
//! [`Context`]; they suspend by awaiting an [`Event`] and are resumed by the
//! runtime once the event completes. Exactly one process runs at a time and
//! every process that became ready at the current virtual time is resumed
//! before the clock advances.
//!
//! # Examples
//!
//! ```
//! use desq::prelude::*;
//!
//! let mut rt = Builder::seeded(42).quiet().build();
//! let ctx = rt.context();
//!
//! let c = ctx.clone();
//! let done = ctx.spawn(async move {
//!     c.timeout(3.0).await.unwrap();
//!     c.now()
//! });
//!
//! match rt.run() {
//!     RuntimeResult::Finished { time, .. } => assert_eq!(time, SimTime::from(3.0)),
//!     _ => panic!("simulation did not finish"),
//! }
//! assert_eq!(done.take_value(), Some(SimTime::from(3.0)));
//! ```

use crate::SimTime;
use fxhash::FxHashMap;
use log::{debug, trace, warn};
use rand::{distributions::Standard, prelude::Distribution, rngs::StdRng, Rng};
use std::{
    cell::{Cell, RefCell},
    fmt::{Debug, Display},
    future::Future,
    mem,
    rc::Rc,
};

mod builder;
pub use self::builder::*;

mod error;
pub use self::error::*;

mod event;
pub use self::event::*;

mod future_event_set;
use self::future_event_set::*;

mod limit;
pub use self::limit::*;

mod logger;
pub use self::logger::*;

mod profiler;
pub use self::profiler::*;

mod task;
use self::task::*;

mod timeout;
pub use self::timeout::*;

pub(crate) const SYM_CHECKMARK: char = '\u{2713}';
pub(crate) const SYM_CROSSMARK: char = '\u{02df}';

///
/// The outcome of a [`Runtime::run`].
///
#[derive(Debug, Clone)]
pub enum RuntimeResult {
    /// Nothing was ever scheduled or spawned.
    EmptySimulation {
        /// The start time of the runtime.
        time: SimTime,
    },
    /// All timers fired and no process is ready anymore.
    Finished {
        /// The virtual time of the last dispatched event.
        time: SimTime,
        /// The number of dispatched timer events.
        event_count: usize,
        /// Processes that are still suspended on an event that will never complete.
        suspended: usize,
        /// The run profile.
        profiler: Profiler,
    },
    /// The runtime limit was reached with timers left.
    PrematureAbort {
        /// The virtual time of the last dispatched event.
        time: SimTime,
        /// The number of dispatched timer events.
        event_count: usize,
        /// The number of timers that did not fire.
        active_events: usize,
        /// The run profile.
        profiler: Profiler,
    },
}

impl RuntimeResult {
    /// The virtual time the run ended at.
    pub fn time(&self) -> SimTime {
        match self {
            Self::EmptySimulation { time }
            | Self::Finished { time, .. }
            | Self::PrematureAbort { time, .. } => *time,
        }
    }
}

// The state shared between a `Runtime` and its `Context` handles.
struct RuntimeCore {
    now: Cell<SimTime>,
    future_event_set: RefCell<FutureEventSet>,

    tasks: RefCell<FxHashMap<TaskId, Task>>,
    ready: ReadyQueue,
    next_task_id: Cell<TaskId>,
    polls: Cell<usize>,

    rng: RefCell<StdRng>,
}

impl RuntimeCore {
    fn run_ready(&self) {
        StandardLogger::set_time(Some(self.now.get().as_f64()));
        loop {
            let Some(id) = self.ready.pop() else {
                break;
            };

            // Remove while polling, so the process may spawn new ones.
            let task = self.tasks.borrow_mut().remove(&id);
            let Some(mut task) = task else {
                continue;
            };

            self.polls.set(self.polls.get() + 1);
            if task.poll() {
                trace!(target: "desq::runtime", "process #{id} completed");
            } else {
                self.tasks.borrow_mut().insert(id, task);
            }
        }
        StandardLogger::set_time(None);
    }
}

///
/// A handle to a [`Runtime`], used by models to read the virtual clock,
/// schedule timers and spawn processes.
///
/// Contexts are cheap to clone and are passed explicitly to every
/// simulation primitive. Several runtimes may exist side by side.
///
#[derive(Clone)]
pub struct Context {
    core: Rc<RuntimeCore>,
}

impl Context {
    /// Returns the current virtual time.
    pub fn now(&self) -> SimTime {
        self.core.now.get()
    }

    /// Creates a new pending event.
    pub fn event<T>(&self) -> Event<T> {
        Event::new()
    }

    ///
    /// Returns an event that succeeds `delay` units of virtual time from now.
    ///
    /// Canceling the returned event removes the timer without advancing
    /// the clock to it.
    ///
    /// # Panics
    ///
    /// Panics if `delay` is negative.
    ///
    pub fn timeout(&self, delay: impl Into<SimTime>) -> Event<()> {
        let delay = delay.into();
        assert!(delay >= SimTime::ZERO, "timeout delay must not be negative");

        let event = Event::new();
        self.core
            .future_event_set
            .borrow_mut()
            .add(self.now() + delay, event.clone());
        event
    }

    ///
    /// Spawns a new simulation process. The process starts running at the
    /// current virtual time, after the currently running process yields.
    ///
    /// The returned event succeeds with the output of the process once it
    /// completes.
    ///
    pub fn spawn<F>(&self, future: F) -> Event<F::Output>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        let event = Event::new();
        let done = event.clone();
        self.spawn_task(async move {
            let output = future.await;
            let _ = done.succeed(output);
        });
        event
    }

    ///
    /// Spawns a process that may fail. An `Err` output fails the returned
    /// event instead of succeeding it.
    ///
    pub fn spawn_fallible<F, R, E>(&self, future: F) -> Event<R>
    where
        F: Future<Output = Result<R, E>> + 'static,
        R: 'static,
        E: Into<RuntimeError> + 'static,
    {
        let event = Event::new();
        let done = event.clone();
        self.spawn_task(async move {
            let _ = match future.await {
                Ok(output) => done.succeed(output),
                Err(error) => {
                    let error: RuntimeError = error.into();
                    debug!(target: "desq::runtime", "process failed: {error}");
                    done.fail(error)
                }
            };
        });
        event
    }

    fn spawn_task(&self, future: impl Future<Output = ()> + 'static) {
        let id = self.core.next_task_id.get();
        self.core.next_task_id.set(id + 1);

        let task = Task::new(id, Box::pin(future), self.core.ready.clone());
        task.schedule();
        self.core.tasks.borrow_mut().insert(id, task);
        trace!(target: "desq::runtime", "spawned process #{id}");
    }

    ///
    /// Generates a random instance of type T with a Standard distribution.
    ///
    pub fn random<T>(&self) -> T
    where
        Standard: Distribution<T>,
    {
        self.core.rng.borrow_mut().gen()
    }

    ///
    /// Generates a random instance of type T with a distribution
    /// of type D.
    ///
    pub fn sample<T, D>(&self, distr: D) -> T
    where
        D: Distribution<T>,
    {
        self.core.rng.borrow_mut().sample(distr)
    }

    /// Indicates whether both contexts belong to the same runtime.
    pub fn same_runtime(&self, other: &Context) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context").field("now", &self.now()).finish()
    }
}

///
/// The central managment point for an instance of a discrete event
/// simulation.
///
/// Build one with [`Builder`], hand out [`Context`]s to the model, then
/// [`run`](Runtime::run) it or drive it manually with
/// [`start`](Runtime::start), the `dispatch_*` functions and
/// [`finish`](Runtime::finish).
///
pub struct Runtime {
    core: Rc<RuntimeCore>,
    state: State,

    // Rt limits
    limit: RuntimeLimit,
    itr: usize,

    // Misc
    quiet: bool,
    profiler: Profiler,
}

#[derive(Debug, PartialEq, Eq)]
enum State {
    Ready,
    Running,
}

impl Runtime {
    pub(super) fn new_with(builder: Builder) -> Self {
        Runtime {
            core: Rc::new(RuntimeCore {
                now: Cell::new(builder.start_time),
                future_event_set: RefCell::new(FutureEventSet::new(builder.start_time)),
                tasks: RefCell::new(FxHashMap::default()),
                ready: ReadyQueue::default(),
                next_task_id: Cell::new(0),
                polls: Cell::new(0),
                rng: RefCell::new(builder.rng),
            }),
            state: State::Ready,

            limit: builder.limit,
            itr: 0,

            quiet: builder.quiet,
            profiler: Profiler::default(),
        }
    }

    /// Returns a new handle to this runtime.
    pub fn context(&self) -> Context {
        Context {
            core: Rc::clone(&self.core),
        }
    }

    ///
    /// Returns the number of timer events that were dispatched.
    ///
    pub fn num_events_dispatched(&self) -> usize {
        self.itr
    }

    ///
    /// Returns the number of timers that are waiting to fire.
    ///
    pub fn num_events_scheduled(&self) -> usize {
        self.core.future_event_set.borrow().num_active()
    }

    ///
    /// Returns the number of processes that did not complete yet.
    ///
    pub fn num_processes(&self) -> usize {
        self.core.tasks.borrow().len()
    }

    ///
    /// Returns the current simulation time.
    ///
    pub fn sim_time(&self) -> SimTime {
        self.core.now.get()
    }

    /// Runs the simulation until it terminates or a breaking condition
    /// is reached.
    ///
    /// # Panics
    ///
    /// This function panics if the simulation was already started.
    pub fn run(mut self) -> RuntimeResult {
        assert_eq!(
            self.state,
            State::Ready,
            "Runtime::run can only be used for simulations in the ready state"
        );
        // (0) Start sim-start
        self.start();

        // (1) Event main loop
        self.dispatch_all();

        // (2) Finish sim-end
        self.finish()
    }

    /// Starts the simulation manually. If `Runtime::run` is not used, use the combination
    /// of start, dispatch and finish to complete a full execution cycle.
    pub fn start(&mut self) {
        macro_rules! symbol {
            ($i:expr) => {
                if $i {
                    SYM_CHECKMARK
                } else {
                    SYM_CROSSMARK
                }
            };
        }

        if !self.quiet {
            println!("\u{23A1}");
            println!("\u{23A2} Simulation starting");
            println!("\u{23A2}  serde [{}]", symbol!(cfg!(feature = "serde")));
            println!(
                "\u{23A2}  Executor := {}",
                self.core.future_event_set.borrow().descriptor()
            );
            println!("\u{23A2}  Event limit := {}", self.limit);
            println!("\u{23A3}");
        }

        self.profiler.start();
        self.state = State::Running;
    }

    /// Executes events until `n` more timer events were dispatched.
    ///
    /// # Panics
    ///
    /// This function panics if the simulation has not been started.
    pub fn dispatch_n_events(&mut self, n: usize) {
        let limit = RuntimeLimit::EventCount(self.num_events_dispatched() + n);
        self.dispatch_with(limit);
    }

    /// Executes events until the runtime reaches the designated time.
    /// Events at exactly `t` are dispatched.
    ///
    /// # Panics
    ///
    /// This function panics if the simulation has not been started.
    pub fn dispatch_events_until(&mut self, t: impl Into<SimTime>) {
        self.dispatch_with(RuntimeLimit::SimTime(t.into()));
    }

    fn dispatch_with(&mut self, mut limit: RuntimeLimit) {
        mem::swap(&mut self.limit, &mut limit);
        self.dispatch_all();
        self.limit = limit;
    }

    /// Executes events until no timer is left or the limit applies.
    ///
    /// # Panics
    ///
    /// This function panics if the simulation has not been started.
    pub fn dispatch_all(&mut self) {
        assert_eq!(
            self.state,
            State::Running,
            "dispatching is only allowed for running simulations"
        );
        self.core.run_ready();
        while !self.dispatch_event() {}
    }

    /// Fires the next timer and resumes all processes woken by it.
    /// Returns `true` if the simulation should stop.
    fn dispatch_event(&mut self) -> bool {
        let next = loop {
            let node = self.core.future_event_set.borrow_mut().fetch_next();
            match node {
                Some(node) if node.event.is_canceled() => continue,
                Some(node) => break node,
                None => return true,
            }
        };

        if self.limit.applies(self.itr + 1, next.time) {
            self.core
                .future_event_set
                .borrow_mut()
                .restore(next, self.core.now.get());
            return true;
        }

        self.itr += 1;

        // Let this be the only position where SimTime is changed
        self.core.now.set(next.time);

        if next.event.succeed(()).is_err() {
            trace!(target: "desq::runtime", "timer at {} was completed manually", next.time);
        }

        self.core.run_ready();
        false
    }

    /// Decontructs the runtime and reports how the simulation ended.
    ///
    /// # Panics
    ///
    /// This function panics if the runtime is has not yet been started.
    pub fn finish(mut self) -> RuntimeResult {
        assert_eq!(
            self.state,
            State::Running,
            "only a running simulation can be finished"
        );

        let polls = self.core.polls.get();
        let processes = self.core.next_task_id.get() as usize;
        self.profiler.finish(self.itr, polls, processes);

        let time = self.sim_time();
        let active_events = self.num_events_scheduled();
        let suspended = self.num_processes();

        if active_events == 0 && self.itr == 0 && processes == 0 {
            warn!(target: "desq::runtime", "Running simulation without any events or processes.");
            if !self.quiet {
                println!("\u{23A1}");
                println!("\u{23A2} Empty simulation");
                println!("\u{23A2}  Ended at event #0 after {time}");
                println!("\u{23A3}");
            }
            return RuntimeResult::EmptySimulation { time };
        }

        if active_events == 0 {
            if suspended > 0 {
                debug!(target: "desq::runtime", "{suspended} processes remain suspended");
            }
            if !self.quiet {
                println!("\u{23A1}");
                println!("\u{23A2} Simulation ended");
                println!("\u{23A2}  Ended at event #{} after {}", self.itr, time);
                println!("\u{23A3}");
            }

            RuntimeResult::Finished {
                time,
                event_count: self.itr,
                suspended,
                profiler: self.profiler.clone(),
            }
        } else {
            if !self.quiet {
                println!("\u{23A1}");
                println!("\u{23A2} Simulation ended prematurly");
                println!(
                    "\u{23A2}  Ended at event #{} with {} active events after {}",
                    self.itr, active_events, time
                );
                println!("\u{23A3}");
            }

            RuntimeResult::PrematureAbort {
                time,
                event_count: self.itr,
                active_events,
                profiler: self.profiler.clone(),
            }
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        // Processes hold contexts, which hold the core. Break the cycle.
        let tasks = mem::take(&mut *self.core.tasks.borrow_mut());
        drop(tasks);
    }
}

impl Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl Display for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Runtime {{ sim_time: {} (itr {} / {}) processes: {} enqueued: {} }}",
            self.sim_time(),
            self.itr,
            self.limit,
            self.num_processes(),
            self.core.future_event_set.borrow().len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime() -> Runtime {
        Builder::seeded(123).quiet().build()
    }

    #[test]
    fn empty_simulation() {
        let rt = runtime();
        assert!(matches!(rt.run(), RuntimeResult::EmptySimulation { .. }));
    }

    #[test]
    fn processes_observe_virtual_time() {
        let rt = runtime();
        let ctx = rt.context();

        let c = ctx.clone();
        let done = ctx.spawn(async move {
            let mut seen = Vec::new();
            for delay in [1.0, 0.0, 2.5] {
                c.timeout(delay).await.unwrap();
                seen.push(c.now().as_f64());
            }
            seen
        });

        match rt.run() {
            RuntimeResult::Finished {
                time,
                event_count,
                suspended,
                ..
            } => {
                assert_eq!(time, SimTime::from(3.5));
                assert_eq!(event_count, 3);
                assert_eq!(suspended, 0);
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert_eq!(done.take_value(), Some(vec![1.0, 1.0, 3.5]));
    }

    #[test]
    fn ready_processes_run_in_wake_order() {
        let rt = runtime();
        let ctx = rt.context();
        let trigger = ctx.event::<()>();
        let log = Rc::new(RefCell::new(Vec::new()));

        for i in 0..3 {
            let trigger = trigger.clone();
            let log = log.clone();
            ctx.spawn(async move {
                trigger.wait_triggered().await;
                log.borrow_mut().push(i);
            });
        }

        let c = ctx.clone();
        ctx.spawn(async move {
            c.timeout(1.0).await.unwrap();
            trigger.succeed(()).unwrap();
        });

        rt.run();
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn canceled_timers_do_not_advance_time() {
        let rt = runtime();
        let ctx = rt.context();

        let long = ctx.timeout(100.0);
        let c = ctx.clone();
        ctx.spawn(async move {
            c.timeout(1.0).await.unwrap();
            long.cancel().unwrap();
        });

        assert_eq!(rt.run().time(), SimTime::from(1.0));
    }

    #[test]
    fn limits_abort_prematurely() {
        let rt = Builder::seeded(1).quiet().max_time(5.0).build();
        let ctx = rt.context();

        let c = ctx.clone();
        ctx.spawn(async move {
            loop {
                c.timeout(1.0).await.unwrap();
            }
        });

        match rt.run() {
            RuntimeResult::PrematureAbort {
                time,
                event_count,
                active_events,
                ..
            } => {
                assert_eq!(time, SimTime::from(5.0));
                assert_eq!(event_count, 5);
                assert_eq!(active_events, 1);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn canceled_timers_are_not_reported_as_active() {
        let rt = Builder::seeded(1).quiet().max_time(5.0).build();
        let ctx = rt.context();

        let c = ctx.clone();
        ctx.spawn(async move {
            c.timeout(10.0).cancel().unwrap();
            loop {
                c.timeout(1.0).await.unwrap();
            }
        });

        match rt.run() {
            RuntimeResult::PrematureAbort { active_events, .. } => assert_eq!(active_events, 1),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn manual_dispatch() {
        let mut rt = runtime();
        let ctx = rt.context();

        let c = ctx.clone();
        let done = ctx.spawn(async move {
            for _ in 0..4 {
                c.timeout(2.0).await.unwrap();
            }
        });

        rt.start();
        rt.dispatch_events_until(4.0);
        assert_eq!(rt.sim_time(), SimTime::from(4.0));
        assert!(done.is_pending());

        rt.dispatch_n_events(1);
        assert_eq!(rt.sim_time(), SimTime::from(6.0));

        rt.dispatch_all();
        assert!(done.is_succeeded());
        assert!(matches!(rt.finish(), RuntimeResult::Finished { .. }));
    }

    #[test]
    fn fallible_processes_fail_their_event() {
        let rt = runtime();
        let ctx = rt.context();

        let failed = ctx.spawn_fallible(async { Err::<(), _>(EventError::Canceled) });
        let ok = ctx.spawn_fallible(async { Ok::<_, EventError>(7) });
        rt.run();

        assert!(failed.is_failed());
        assert_eq!(ok.take_value(), Some(7));
    }

    #[test]
    fn seeded_runtimes_are_reproducible() {
        let a = Builder::seeded(9).quiet().build().context();
        let b = Builder::seeded(9).quiet().build().context();
        let xs: Vec<u32> = (0..4).map(|_| a.random()).collect();
        let ys: Vec<u32> = (0..4).map(|_| b.random()).collect();
        assert_eq!(xs, ys);
        assert!(!a.same_runtime(&b));
    }
}
