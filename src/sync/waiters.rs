use crate::runtime::Event;
use std::{cmp::Ordering, collections::VecDeque, fmt::Debug};

pub(crate) type RequestId = u64;

/// The side of a container a request waits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Put,
    Get,
}

///
/// A suspended put or get.
///
/// `payload` is the item (or amount) a put carries, or the amount a get
/// asks for. `event` is completed when the request is fulfilled.
///
pub(crate) struct PendingRequest<P, V> {
    pub(crate) id: RequestId,
    pub(crate) payload: P,
    pub(crate) event: Event<V>,
}

impl<P, V> PendingRequest<P, V> {
    fn is_live(&self) -> bool {
        self.event.is_pending()
    }
}

///
/// The pending requests on one side of a container, in service order.
///
pub(crate) struct WaiterRegistry<P, V> {
    waiters: VecDeque<PendingRequest<P, V>>,
}

impl<P, V> WaiterRegistry<P, V> {
    pub(crate) fn new() -> Self {
        Self {
            waiters: VecDeque::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.waiters.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    /// Appends a request at the end.
    pub(crate) fn push(&mut self, request: PendingRequest<P, V>) {
        self.waiters.push_back(request);
    }

    /// Inserts a request behind every request that does not order after it.
    pub(crate) fn insert_by(
        &mut self,
        request: PendingRequest<P, V>,
        mut cmp: impl FnMut(&P, &P) -> Ordering,
    ) {
        let index = self
            .waiters
            .partition_point(|w| cmp(&w.payload, &request.payload) != Ordering::Greater);
        self.waiters.insert(index, request);
    }

    /// Puts back a request that was popped but could not be served.
    pub(crate) fn push_front(&mut self, request: PendingRequest<P, V>) {
        self.waiters.push_front(request);
    }

    /// Pops the oldest live request, discarding completed ones on the way.
    pub(crate) fn pop_front(&mut self) -> Option<PendingRequest<P, V>> {
        while let Some(request) = self.waiters.pop_front() {
            if request.is_live() {
                return Some(request);
            }
        }
        None
    }

    ///
    /// Pops the first live request whose payload `fits`.
    ///
    /// If `strict`, only the head is considered, so a request that does not
    /// fit blocks all requests behind it.
    ///
    pub(crate) fn pop_first_fit(
        &mut self,
        strict: bool,
        mut fits: impl FnMut(&P) -> bool,
    ) -> Option<PendingRequest<P, V>> {
        self.waiters.retain(PendingRequest::is_live);
        let index = if strict {
            self.waiters.front().filter(|r| fits(&r.payload)).map(|_| 0)
        } else {
            self.waiters.iter().position(|r| fits(&r.payload))
        }?;
        self.waiters.remove(index)
    }

    /// Removes the request with the given id. O(n).
    pub(crate) fn remove(&mut self, id: RequestId) -> Option<PendingRequest<P, V>> {
        let index = self.waiters.iter().position(|r| r.id == id)?;
        self.waiters.remove(index)
    }
}

impl<P, V> Debug for WaiterRegistry<P, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.waiters.iter().map(|r| r.id))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: RequestId, payload: u32) -> PendingRequest<u32, ()> {
        PendingRequest {
            id,
            payload,
            event: Event::new(),
        }
    }

    #[test]
    fn pops_in_arrival_order_skipping_dead() {
        let mut registry = WaiterRegistry::new();
        registry.push(request(0, 10));
        registry.push(request(1, 20));
        registry.push(request(2, 30));

        registry.waiters[1].event.cancel().unwrap();
        assert_eq!(registry.pop_front().map(|r| r.id), Some(0));
        assert_eq!(registry.pop_front().map(|r| r.id), Some(2));
        assert!(registry.pop_front().is_none());
    }

    #[test]
    fn removes_by_id() {
        let mut registry = WaiterRegistry::new();
        for id in 0..4 {
            registry.push(request(id, 0));
        }
        assert_eq!(registry.remove(2).map(|r| r.id), Some(2));
        assert!(registry.remove(2).is_none());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn ordered_insertion_is_stable() {
        let mut registry = WaiterRegistry::new();
        registry.insert_by(request(0, 5), Ord::cmp);
        registry.insert_by(request(1, 1), Ord::cmp);
        registry.insert_by(request(2, 5), Ord::cmp);
        registry.insert_by(request(3, 1), Ord::cmp);

        let order: Vec<_> = std::iter::from_fn(|| registry.pop_front())
            .map(|r| r.id)
            .collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
    }

    #[test]
    fn first_fit_strict_and_relaxed() {
        let mut registry = WaiterRegistry::new();
        registry.push(request(0, 8));
        registry.push(request(1, 2));

        assert!(registry.pop_first_fit(true, |&amount| amount <= 4).is_none());
        let found = registry.pop_first_fit(false, |&amount| amount <= 4);
        assert_eq!(found.map(|r| r.id), Some(1));
        assert_eq!(registry.len(), 1);
    }
}
