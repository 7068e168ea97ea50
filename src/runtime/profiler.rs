use std::time::{Duration, Instant};

/// A run profiler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profiler {
    time_start: Instant,
    /// The wall-clock duration of the simulation.
    pub duration: Duration,

    /// The number of timer events that where dispatched.
    pub event_count: usize,
    /// The number of times a process was resumed.
    pub poll_count: usize,
    /// The number of processes spawned over the lifetime of the runtime.
    pub process_count: usize,
}

impl Profiler {
    /// Starts the profile.
    pub(super) fn start(&mut self) {
        self.time_start = Instant::now();
    }

    /// Finishes the profile.
    pub(super) fn finish(&mut self, event_count: usize, poll_count: usize, process_count: usize) {
        self.event_count = event_count;
        self.poll_count = poll_count;
        self.process_count = process_count;
        self.duration = Instant::now() - self.time_start;
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self {
            time_start: Instant::now(),
            duration: Duration::ZERO,
            event_count: 0,
            poll_count: 0,
            process_count: 0,
        }
    }
}
