use super::Event;
use crate::SimTime;
use std::{
    cmp::Ordering,
    collections::{BinaryHeap, VecDeque},
};

///
/// A timer that completes `event` at `time`.
///
#[derive(Debug)]
pub(crate) struct TimerNode {
    pub(crate) time: SimTime,
    pub(crate) seq: u64,
    pub(crate) event: Event<()>,
}

impl TimerNode {
    fn key(&self) -> (SimTime, u64) {
        (self.time, self.seq)
    }
}

impl PartialEq for TimerNode {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for TimerNode {}

impl PartialOrd for TimerNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerNode {
    // Reversed, so the max-heap yields the earliest timer first.
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

///
/// The pending timers of a runtime, ordered by time and by scheduling order
/// among equal times.
///
/// Timers due at the current time bypass the heap and are kept in a FIFO.
///
#[derive(Debug)]
pub(crate) struct FutureEventSet {
    heap: BinaryHeap<TimerNode>,
    zero_queue: VecDeque<TimerNode>,

    last_event_simtime: SimTime,
    seq: u64,
}

impl FutureEventSet {
    pub(crate) fn new(start_time: SimTime) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(64),
            zero_queue: VecDeque::with_capacity(32),

            last_event_simtime: start_time,
            seq: 0,
        }
    }

    pub(crate) fn descriptor(&self) -> String {
        String::from("FutureEventSet::BinaryHeap()")
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len() + self.zero_queue.len()
    }

    /// The number of timers that were not canceled and can still fire.
    pub(crate) fn num_active(&self) -> usize {
        self.heap
            .iter()
            .chain(self.zero_queue.iter())
            .filter(|node| !node.event.is_canceled())
            .count()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty() && self.zero_queue.is_empty()
    }

    pub(crate) fn add(&mut self, time: SimTime, event: Event<()>) {
        assert!(
            time >= self.last_event_simtime,
            "Sorry we cannot timetravel yet"
        );

        let node = TimerNode {
            time,
            seq: self.seq,
            event,
        };
        self.seq += 1;

        if time == self.last_event_simtime {
            self.zero_queue.push_back(node);
        } else {
            self.heap.push(node);
        }
    }

    /// Puts back a node that was fetched but not dispatched, rewinding to
    /// the time `now` the runtime is still at.
    pub(crate) fn restore(&mut self, node: TimerNode, now: SimTime) {
        self.last_event_simtime = now;
        if node.time == now {
            self.zero_queue.push_front(node);
        } else {
            self.heap.push(node);
        }
    }

    pub(crate) fn fetch_next(&mut self) -> Option<TimerNode> {
        let take_zero = match (self.zero_queue.front(), self.heap.peek()) {
            (Some(zero), Some(heap)) => zero.key() < heap.key(),
            (Some(_), None) => true,
            (None, _) => false,
        };

        let node = if take_zero {
            self.zero_queue.pop_front()
        } else {
            self.heap.pop()
        }?;

        self.last_event_simtime = node.time;
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetches_by_time_then_scheduling_order() {
        let mut fes = FutureEventSet::new(SimTime::ZERO);
        let a = Event::new();
        let b = Event::new();
        let c = Event::new();
        let d = Event::new();

        fes.add(SimTime::from(2.0), a.clone());
        fes.add(SimTime::from(1.0), b.clone());
        fes.add(SimTime::from(2.0), c.clone());
        fes.add(SimTime::ZERO, d.clone());
        assert_eq!(fes.len(), 4);

        let order: Vec<_> = std::iter::from_fn(|| fes.fetch_next()).collect();
        assert!(order[0].event.ptr_eq(&d));
        assert!(order[1].event.ptr_eq(&b));
        assert!(order[2].event.ptr_eq(&a));
        assert!(order[3].event.ptr_eq(&c));
        assert!(fes.is_empty());
    }

    #[test]
    fn zero_queue_respects_earlier_heap_entries() {
        let mut fes = FutureEventSet::new(SimTime::ZERO);
        let early = Event::new();
        let late = Event::new();

        fes.add(SimTime::from(1.0), early.clone());
        fes.add(SimTime::from(1.0), Event::new());

        let first = fes.fetch_next().unwrap();
        assert!(first.event.ptr_eq(&early));

        // Scheduled at the current time, but after the remaining heap entry.
        fes.add(SimTime::from(1.0), late.clone());
        assert!(!fes.fetch_next().unwrap().event.ptr_eq(&late));
        assert!(fes.fetch_next().unwrap().event.ptr_eq(&late));
    }

    #[test]
    fn canceled_timers_are_not_active() {
        let mut fes = FutureEventSet::new(SimTime::ZERO);
        let canceled = Event::new();
        fes.add(SimTime::ZERO, canceled.clone());
        fes.add(SimTime::from(3.0), Event::new());
        fes.add(SimTime::from(4.0), Event::new());

        canceled.cancel().unwrap();
        assert_eq!(fes.len(), 3);
        assert_eq!(fes.num_active(), 2);
    }

    #[test]
    #[should_panic = "Sorry we cannot timetravel yet"]
    fn rejects_past_timers() {
        let mut fes = FutureEventSet::new(SimTime::from(5.0));
        fes.add(SimTime::from(4.0), Event::new());
    }
}
