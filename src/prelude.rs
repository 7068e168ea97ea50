//!
//! Convenience re-export of common members.
//!

pub use crate::SimTime;

pub use crate::runtime::timeout;
pub use crate::runtime::Builder;
pub use crate::runtime::Context;
pub use crate::runtime::Event;
pub use crate::runtime::EventError;
pub use crate::runtime::EventStatus;
pub use crate::runtime::Runtime;
pub use crate::runtime::RuntimeLimit;
pub use crate::runtime::RuntimeResult;
pub use crate::runtime::StandardLogger;

pub use crate::sync::Condition;
pub use crate::sync::ConditionKind;
pub use crate::sync::GetEvent;
pub use crate::sync::PutEvent;
pub use crate::sync::QueueError;
pub use crate::sync::TryPutError;

pub use crate::sync::PriorityItem;
pub use crate::sync::PriorityQueue;
pub use crate::sync::Queue;

pub use crate::sync::Pool;
pub use crate::sync::PriorityPool;
