//!
//! Bounded, event-driven queues and resource pools for discrete event
//! simulations.
//!
//! `desq` provides a small single-threaded [`runtime`] that advances a
//! virtual clock and drives simulation processes written as plain `async`
//! blocks, and the [`sync`] containers processes exchange items through.
//!
//! # Building a simple simulation
//!
//! A [`Runtime`](runtime::Runtime) is created with a
//! [`Builder`](runtime::Builder). Every model component receives a
//! [`Context`](runtime::Context) handle to read the time, wait for timeouts
//! and spawn processes. Queues are bound to the context they were created
//! with, so independent runtimes never share state.
//!
//! ```
//! use desq::prelude::*;
//!
//! let rt = Builder::seeded(42).quiet().build();
//! let ctx = rt.context();
//! let queue = Queue::new(&ctx, 1).unwrap();
//!
//! // A producer that is faster than the queue can be drained.
//! let q = queue.clone();
//! let producer = ctx.spawn(async move {
//!     for i in 0..3 {
//!         q.put(i).await.unwrap();
//!     }
//! });
//!
//! let q = queue.clone();
//! let c = ctx.clone();
//! let consumer = ctx.spawn(async move {
//!     let mut log = Vec::new();
//!     for _ in 0..3 {
//!         c.timeout(2.0).await.unwrap();
//!         log.push((c.now().as_f64(), q.get().await.unwrap()));
//!     }
//!     log
//! });
//!
//! let result = rt.run();
//! assert_eq!(result.time(), SimTime::from(6.0));
//! assert!(producer.is_succeeded());
//! assert_eq!(consumer.take_value(), Some(vec![(2.0, 0), (4.0, 1), (6.0, 2)]));
//! ```
//!
//! # Logging
//!
//! Internal records are emitted through the `log` facade with the targets
//! `desq::runtime`, `desq::queue` and `desq::pool`. A ready-made logger
//! that prefixes every record with the virtual time is available as
//! [`StandardLogger`](runtime::StandardLogger).
//!
//! # Features
//!
//! - `serde`: implements `Serialize` and `Deserialize` for [`SimTime`] and
//!   the container statistics.
//!

pub mod prelude;
pub mod runtime;
pub mod sync;

mod simtime;
pub use simtime::SimTime;
