use kernel_sync::hosted::ThreadBlocker;
use kernel_sync::{Blocker, PollMask, PollTable, WaitQueue};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Device-style readiness check: register first, then look at the state.
fn poll_flag<'a>(queue: &'a WaitQueue<bool>, table: Option<&PollTable<'a>>) -> PollMask {
    if let Some(table) = table {
        table.register(queue);
    }
    if *queue.lock() {
        PollMask::READABLE
    } else {
        PollMask::empty()
    }
}

#[test]
fn readiness_after_registration_wakes_the_poller() {
    let q = Arc::new(WaitQueue::new(false));
    let woke = Arc::new(AtomicBool::new(false));

    let poller = {
        let q = Arc::clone(&q);
        let woke = Arc::clone(&woke);
        thread::spawn(move || {
            let blocker = ThreadBlocker::current();
            let table = PollTable::new(blocker.waker());
            let mut mask = poll_flag(&q, Some(&table));
            while mask.is_empty() {
                blocker.block();
                mask = poll_flag(&q, None);
            }
            woke.store(true, Ordering::SeqCst);
            mask
        })
    };

    while q.waiter_count() == 0 {
        thread::yield_now();
    }
    thread::sleep(Duration::from_millis(10));
    assert!(!woke.load(Ordering::SeqCst));

    {
        let mut g = q.lock();
        *g = true;
        g.wake_all();
    }

    assert_eq!(poller.join().unwrap(), PollMask::READABLE);
    assert_eq!(q.waiter_count(), 0, "poll table must detach on drop");
}

#[test]
fn poll_registration_survives_unrelated_wakes() {
    let q = WaitQueue::new(false);
    let blocker = ThreadBlocker::current();
    let table = PollTable::new(blocker.waker());

    assert!(poll_flag(&q, Some(&table)).is_empty());
    assert_eq!(q.wake_all(), 1);
    assert_eq!(q.wake_all(), 1, "poll entries are not one-shot");
    assert_eq!(table.len(), 1);

    drop(table);
    assert_eq!(q.waiter_count(), 0);
}

#[test]
fn pollers_and_blocking_waiters_share_a_queue() {
    let q = Arc::new(WaitQueue::new(false));

    let waiter = {
        let q = Arc::clone(&q);
        thread::spawn(move || {
            let blocker = ThreadBlocker::current();
            q.wait_until(&blocker, |ready| *ready).map(|g| *g)
        })
    };

    let blocker = ThreadBlocker::current();
    let table = PollTable::new(blocker.waker());
    assert!(poll_flag(&q, Some(&table)).is_empty());

    while q.waiter_count() < 2 {
        thread::yield_now();
    }
    {
        let mut g = q.lock();
        *g = true;
        assert_eq!(g.wake_all(), 2);
        // The blocking waiter is dequeued, the poll entry stays.
        assert_eq!(g.waiter_count(), 1);
    }

    assert_eq!(waiter.join().unwrap(), Ok(true));
    assert_eq!(poll_flag(&q, None), PollMask::READABLE);
}
