use super::{
    queue::{BaseQueue, ItemStore, QueueBuilder},
    request::PutEvent,
    TryPutError,
};
use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
    fmt::Debug,
};

///
/// An item stored in a [`PriorityQueue`], together with its priority.
///
/// Items are ordered by priority, lowest first, and among equal priorities
/// by the order they were put.
///
#[derive(Debug, Clone)]
pub struct PriorityItem<P, T> {
    pub priority: P,
    pub item: T,
    seq: u64,
}

impl<P, T> PriorityItem<P, T> {
    pub(crate) fn new(priority: P, item: T, seq: u64) -> Self {
        Self {
            priority,
            item,
            seq,
        }
    }

    /// Drops the priority.
    pub fn into_inner(self) -> T {
        self.item
    }

    /// The arrival number of the item in its queue.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl<P: Ord, T> PartialEq for PriorityItem<P, T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<P: Ord, T> Eq for PriorityItem<P, T> {}

impl<P: Ord, T> PartialOrd for PriorityItem<P, T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P: Ord, T> Ord for PriorityItem<P, T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Storage of a [`PriorityQueue`]: a binary min-heap.
#[derive(Debug)]
pub struct PriorityStore<P, T> {
    heap: BinaryHeap<Reverse<PriorityItem<P, T>>>,
}

impl<P: Ord, T> Default for PriorityStore<P, T> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }
}

impl<P: Ord, T> ItemStore for PriorityStore<P, T> {
    type Item = PriorityItem<P, T>;
    const KIND: &'static str = "PriorityQueue";

    fn push(&mut self, item: Self::Item) {
        self.heap.push(Reverse(item));
    }

    fn pop(&mut self) -> Option<Self::Item> {
        self.heap.pop().map(|Reverse(item)| item)
    }

    fn peek(&self) -> Option<&Self::Item> {
        self.heap.peek().map(|Reverse(item)| item)
    }

    fn len(&self) -> usize {
        self.heap.len()
    }
}

///
/// A bounded queue handing out the item with the lowest priority first.
///
/// Puts, gets, cancellation and conditions behave as for a
/// [`Queue`](super::Queue); only the order of stored items differs. Gets
/// yield [`PriorityItem`]s. Items of equal priority leave in the order they
/// were put.
///
/// # Examples
///
/// ```
/// use desq::prelude::*;
///
/// let rt = Builder::seeded(1).quiet().build();
/// let queue = PriorityQueue::unbounded(&rt.context());
///
/// let _ = queue.put("low", 5);
/// let _ = queue.put("first", 1);
/// let _ = queue.put("second", 1);
///
/// let order: Vec<_> = std::iter::from_fn(|| queue.try_get())
///     .map(PriorityItem::into_inner)
///     .collect();
/// assert_eq!(order, ["first", "second", "low"]);
/// ```
pub type PriorityQueue<P, T> = BaseQueue<PriorityStore<P, T>>;

impl<P: Ord + 'static, T: 'static> PriorityQueue<P, T> {
    /// Puts an item with the given priority. Lower values leave first.
    pub fn put(&self, item: T, priority: P) -> PutEvent {
        let seq = self.next_arrival();
        self.put_item(PriorityItem::new(priority, item, seq))
    }

    ///
    /// Stores the item only if there is room right now, handing it back
    /// otherwise. Never registers a waiter.
    ///
    pub fn try_put(&self, item: T, priority: P) -> Result<(), TryPutError<T>> {
        let seq = self.next_arrival();
        self.try_put_item(PriorityItem::new(priority, item, seq))
            .map_err(|e| e.map(PriorityItem::into_inner))
    }
}

impl<P: Ord + 'static, T: 'static> QueueBuilder<PriorityStore<P, T>> {
    /// Fills the queue with initial items and their priorities.
    pub fn items(mut self, items: impl IntoIterator<Item = (T, P)>) -> Self {
        for (item, priority) in items {
            let seq = self.items.len() as u64;
            self.items.push(PriorityItem::new(priority, item, seq));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Builder;

    #[test]
    fn ties_break_by_arrival() {
        let mut store = PriorityStore::default();
        store.push(PriorityItem::new(2, 'a', 0));
        store.push(PriorityItem::new(1, 'b', 1));
        store.push(PriorityItem::new(2, 'c', 2));
        store.push(PriorityItem::new(1, 'd', 3));

        assert_eq!(store.peek().map(|i| i.item), Some('b'));
        let order: Vec<_> = std::iter::from_fn(|| store.pop()).map(|i| i.item).collect();
        assert_eq!(order, vec!['b', 'd', 'a', 'c']);
    }

    #[test]
    fn blocked_puts_keep_arrival_order() {
        let rt = Builder::seeded(3).quiet().build();
        let queue = PriorityQueue::new(&rt.context(), 1).unwrap();

        assert!(queue.put('x', 5).is_fulfilled());
        let y = queue.put('y', 1);
        let z = queue.put('z', 1);
        assert!(y.is_pending() && z.is_pending());

        let mut gets = Vec::new();
        for _ in 0..3 {
            let mut get = queue.get();
            gets.push(get.take().map(|i| (i.item, i.priority)));
        }
        assert_eq!(gets, vec![Some(('x', 5)), Some(('y', 1)), Some(('z', 1))]);
        assert!(y.is_fulfilled() && z.is_fulfilled());
    }

    #[test]
    fn builder_items_and_try_put() {
        let rt = Builder::seeded(3).quiet().build();
        let queue = PriorityQueue::builder()
            .capacity(2)
            .items([("b", 2), ("a", 1)])
            .build(&rt.context())
            .unwrap();

        assert_eq!(queue.try_put("c", 0), Err(TryPutError::Full("c")));
        assert_eq!(queue.peek().map(|i| i.item), Some("a"));
        assert_eq!(queue.to_string(), "PriorityQueue(name=None size=2 capacity=2)");
    }
}
