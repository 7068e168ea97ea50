use super::{Runtime, RuntimeLimit};
use crate::SimTime;
use rand::{rngs::StdRng, SeedableRng};
use std::fmt::Debug;

/// A builder for a runtime instance.
#[must_use]
pub struct Builder {
    pub(super) quiet: bool,
    pub(super) rng: StdRng,
    pub(super) limit: RuntimeLimit,
    pub(super) start_time: SimTime,
}

impl Builder {
    /// Creates a new unconfigured builder, using an entropy seeded RNG.
    pub fn new() -> Builder {
        Builder {
            quiet: false,
            rng: StdRng::from_entropy(),
            limit: RuntimeLimit::None,

            start_time: SimTime::ZERO,
        }
    }

    /// Creates a `Builder` with a static seeded RNG.
    pub fn seeded(seed: u64) -> Builder {
        Builder {
            quiet: false,
            rng: StdRng::seed_from_u64(seed),
            limit: RuntimeLimit::None,

            start_time: SimTime::ZERO,
        }
    }

    ///
    /// Suppressed runtime messages from the simulation framework.
    ///
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    ///
    /// Changes the virtual time the runtime starts at (default: 0).
    ///
    pub fn start_time(mut self, time: impl Into<SimTime>) -> Self {
        self.start_time = time.into();
        self
    }

    ///
    /// Changes the maximum iteration number of a runtime.
    ///
    pub fn max_itr(mut self, max_itr: usize) -> Self {
        self.limit.add(RuntimeLimit::EventCount(max_itr));
        self
    }

    ///
    /// Changes the maximum time of the runtime (default: inf).
    ///
    pub fn max_time(mut self, max_time: impl Into<SimTime>) -> Self {
        self.limit.add(RuntimeLimit::SimTime(max_time.into()));
        self
    }

    ///
    /// Adds a custom limit to the end of the runtime. Limits
    /// are combined with `max_itr` and `max_time` by a logical OR.
    ///
    pub fn limit(mut self, limit: RuntimeLimit) -> Self {
        self.limit.add(limit);
        self
    }

    ///
    /// Builds a new [`Runtime`] instance.
    ///
    /// # Examples
    ///
    /// ```
    /// use desq::prelude::*;
    ///
    /// let rt = Builder::seeded(1).quiet().max_time(10.0).build();
    /// assert_eq!(rt.context().now(), SimTime::ZERO);
    /// ```
    pub fn build(self) -> Runtime {
        Runtime::new_with(self)
    }
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new()
    }
}

impl Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("quiet", &self.quiet)
            .field("limit", &self.limit)
            .field("start_time", &self.start_time)
            .finish()
    }
}
