use desq::prelude::*;

fn runtime() -> (Runtime, Context) {
    let rt = Builder::seeded(5).quiet().build();
    let ctx = rt.context();
    (rt, ctx)
}

#[test]
fn capacity_one_walkthrough() {
    let (rt, ctx) = runtime();
    let queue = PriorityQueue::new(&ctx, 1).unwrap();

    let q = queue.clone();
    ctx.spawn(async move {
        q.put('X', 5).await.unwrap();
    });
    for (item, priority) in [('Y', 1), ('Z', 1)] {
        let q = queue.clone();
        ctx.spawn(async move {
            q.put(item, priority).await.unwrap();
        });
    }

    let q = queue.clone();
    let c = ctx.clone();
    let received = ctx.spawn(async move {
        let mut items = Vec::new();
        for _ in 0..3 {
            c.timeout(1.0).await.unwrap();
            let got = q.get().await.unwrap();
            items.push((got.item, got.priority));
        }
        items
    });

    rt.run();
    assert_eq!(
        received.take_value(),
        Some(vec![('X', 5), ('Y', 1), ('Z', 1)])
    );
    assert!(queue.is_empty());
}

#[test]
fn lower_priority_values_leave_first() {
    let (rt, ctx) = runtime();
    let queue = PriorityQueue::unbounded(&ctx);

    let q = queue.clone();
    let c = ctx.clone();
    ctx.spawn(async move {
        for i in 0..20u32 {
            let priority = c.random::<u8>() % 4;
            q.put(i, priority).await.unwrap();
        }
    });

    let q = queue.clone();
    let c = ctx.clone();
    let drained = ctx.spawn(async move {
        c.timeout(1.0).await.unwrap();
        let mut out = Vec::new();
        while let Some(entry) = q.try_get() {
            out.push((entry.priority, entry.item));
        }
        out
    });

    rt.run();
    let drained = drained.take_value().unwrap();
    assert_eq!(drained.len(), 20);

    // Sorted by priority, and by put order among equal priorities.
    let mut expected = drained.clone();
    expected.sort();
    assert_eq!(drained, expected);
}

#[test]
fn waiting_get_receives_first_put() {
    let (rt, ctx) = runtime();
    let queue = PriorityQueue::new(&ctx, 2).unwrap();

    let q = queue.clone();
    let first = ctx.spawn(async move { q.get().await.unwrap().into_inner() });

    let q = queue.clone();
    let c = ctx.clone();
    ctx.spawn(async move {
        c.timeout(1.0).await.unwrap();
        // Handed over at once, even though a better item follows.
        q.put("late", 9).await.unwrap();
        q.put("urgent", 0).await.unwrap();
    });

    rt.run();
    assert_eq!(first.take_value(), Some("late"));
    assert_eq!(queue.peek().map(|e| e.item), Some("urgent"));
}

#[test]
fn canceled_put_never_arrives() {
    let (rt, ctx) = runtime();
    let queue = PriorityQueue::new(&ctx, 1).unwrap();

    let q = queue.clone();
    let c = ctx.clone();
    let order = ctx.spawn(async move {
        q.put("resident", 3).await.unwrap();
        let withdrawn = q.put("withdrawn", 0);
        let waiting = q.put("waiting", 1);
        withdrawn.cancel().unwrap();
        assert_eq!(q.num_put_waiters(), 1);

        c.timeout(1.0).await.unwrap();
        let mut order = Vec::new();
        for _ in 0..2 {
            order.push(q.get().await.unwrap().into_inner());
        }
        assert!(waiting.is_fulfilled());
        order
    });

    rt.run();
    assert_eq!(order.take_value(), Some(vec!["resident", "waiting"]));
}

#[derive(Debug, PartialEq, Eq)]
struct Touchy(u8);

impl PartialOrd for Touchy {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Touchy {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        if self.0 == 13 || other.0 == 13 {
            panic!("unlucky priority");
        }
        self.0.cmp(&other.0)
    }
}

#[test]
fn panicking_priority_order_propagates_and_keeps_the_queue_usable() {
    let (_rt, ctx) = runtime();
    let queue = PriorityQueue::new(&ctx, 2).unwrap();
    let _ = queue.put("ok", Touchy(1));

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _ = queue.put("bad", Touchy(13));
    }));
    let payload = result.expect_err("the comparison panic reaches the caller");
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"unlucky priority"));

    // The state borrow was released while unwinding.
    assert!((1..=2).contains(&queue.size()));
    assert_eq!(queue.num_put_waiters(), 0);
    assert!(queue.try_get().is_some());
}
