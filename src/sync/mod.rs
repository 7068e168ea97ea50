//!
//! Bounded containers shared between simulation processes.
//!
//! A [`Queue`] buffers discrete items in arrival order, a [`PriorityQueue`]
//! by priority. A [`Pool`] or [`PriorityPool`] holds an amount of some
//! divisible quantity. All of them hand out [`PutEvent`]s and
//! [`GetEvent`]s that processes await, and [`Condition`]s that resolve once
//! the container reaches some state.
//!
//! After every put, get or cancellation, a container serves its pending
//! gets from the current stock first, then its pending puts from the freed
//! room, and repeats until neither side can make progress. Conditions are
//! then checked against the settled state. A request that was handed an
//! item in this pass only resumes its process once the runtime polls it, so
//! containers are never re-entered while they are settling.
//!

mod condition;
pub use self::condition::*;

mod error;
pub use self::error::*;

mod pool;
pub use self::pool::*;

mod priority;
pub use self::priority::*;

mod queue;
pub use self::queue::*;

mod request;
pub use self::request::{GetEvent, PutEvent, Request};

mod waiters;
