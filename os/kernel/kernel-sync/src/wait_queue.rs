//! Wait queues.
//!
//! A [`WaitQueue`] owns the state its waiters are interested in. The same
//! spin lock protects that state and the list of registered wakers, so a
//! producer that updates the state and calls [`WaitQueueGuard::wake_all`]
//! inside one critical section can never slip between a consumer's
//! condition check and its registration.

use crate::{Blocker, SpinLock, SpinLockIrqGuard};
use alloc::vec::Vec;
use core::fmt;
use core::ops::{Deref, DerefMut};
use core::task::Waker;

/// Identifies one registration on one queue.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WaiterId(u64);

impl fmt::Display for WaiterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// A wait ended because a signal became pending before the condition held.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[error("wait interrupted by a pending signal")]
pub struct Interrupted;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum EntryKind {
    /// A blocked [`WaitQueue::wait_until`] caller; removed by the wake that fires it.
    OneShot,
    /// A poll registration; stays until its poll table lets go of it.
    Persistent,
}

struct WakeEntry {
    id: WaiterId,
    waker: Waker,
    kind: EntryKind,
}

struct Inner<T> {
    state: T,
    entries: Vec<WakeEntry>,
    next_id: u64,
}

impl<T> Inner<T> {
    fn allocate_id(&mut self) -> WaiterId {
        let id = WaiterId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Registers `id` unless it already is.
    fn arm(&mut self, id: WaiterId, waker: &Waker, kind: EntryKind) {
        if !self.entries.iter().any(|e| e.id == id) {
            self.entries.push(WakeEntry {
                id,
                waker: waker.clone(),
                kind,
            });
        }
    }

    fn disarm(&mut self, id: WaiterId) {
        self.entries.retain(|e| e.id != id);
    }

    fn wake_all(&mut self) -> usize {
        let woken = self.entries.len();
        for entry in &self.entries {
            entry.waker.wake_by_ref();
        }
        self.entries.retain(|e| e.kind == EntryKind::Persistent);
        woken
    }
}

/// Blocking rendezvous around a piece of shared state.
///
/// Constructing the queue is its one-time initialization; it lives exactly
/// as long as the value owning it (usually a device) and cannot be
/// re-initialized while in use.
///
/// Wakers are invoked with the queue lock held and interrupts disabled, so
/// they must not call back into the same queue.
pub struct WaitQueue<T> {
    inner: SpinLock<Inner<T>>,
}

impl<T: Default> Default for WaitQueue<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> WaitQueue<T> {
    pub const fn new(state: T) -> Self {
        Self {
            inner: SpinLock::new(Inner {
                state,
                entries: Vec::new(),
                next_id: 0,
            }),
        }
    }

    /// Locks the queue, with local interrupts disabled until the guard drops.
    #[inline]
    pub fn lock(&self) -> WaitQueueGuard<'_, T> {
        WaitQueueGuard {
            inner: self.inner.lock_irqsave(),
        }
    }

    /// Blocks until `condition` holds for the protected state, or a signal
    /// becomes pending.
    ///
    /// On success the queue is returned **locked**, with `condition`
    /// observed true under that same lock; the caller can act on the state
    /// without a second check. The condition is re-evaluated after every
    /// wakeup, so a wakeup whose effect was already consumed by another
    /// waiter simply puts this one back to sleep.
    ///
    /// The caller's registration is removed before this returns, on every
    /// path.
    ///
    /// # Errors
    ///
    /// [`Interrupted`] if `blocker` reports a pending signal while the
    /// condition is false. The condition always wins over the signal.
    pub fn wait_until<B, F>(
        &self,
        blocker: &B,
        mut condition: F,
    ) -> Result<WaitQueueGuard<'_, T>, Interrupted>
    where
        B: Blocker + ?Sized,
        F: FnMut(&T) -> bool,
    {
        let mut guard = self.lock();
        let mut registration: Option<(WaiterId, Waker)> = None;

        loop {
            if condition(&guard.inner.state) {
                if let Some((id, _)) = &registration {
                    guard.inner.disarm(*id);
                }
                return Ok(guard);
            }

            if blocker.signal_pending() {
                if let Some((id, _)) = &registration {
                    guard.inner.disarm(*id);
                    log::trace!("waiter {id} interrupted");
                }
                return Err(Interrupted);
            }

            let (id, waker) = registration.get_or_insert_with(|| {
                let id = guard.inner.allocate_id();
                (id, blocker.waker())
            });
            guard.inner.arm(*id, waker, EntryKind::OneShot);

            drop(guard);
            blocker.block();
            guard = self.lock();
        }
    }

    /// Wakes every registered waiter and poller.
    ///
    /// Never blocks; safe to call from interrupt context. Producers that
    /// just changed the state should prefer [`WaitQueueGuard::wake_all`] on
    /// the guard they already hold.
    pub fn wake_all(&self) -> usize {
        self.lock().wake_all()
    }

    /// Number of registrations currently on the queue.
    #[must_use]
    pub fn waiter_count(&self) -> usize {
        self.lock().waiter_count()
    }

    /// Mutable access without locking when you have `&mut self`.
    pub const fn get_mut(&mut self) -> &mut T {
        &mut self.inner.get_mut().state
    }

    pub(crate) fn add_persistent(&self, waker: &Waker) -> WaiterId {
        let mut guard = self.lock();
        let id = guard.inner.allocate_id();
        guard.inner.arm(id, waker, EntryKind::Persistent);
        id
    }

    pub(crate) fn remove(&self, id: WaiterId) {
        self.lock().inner.disarm(id);
    }
}

/// Exclusive access to a [`WaitQueue`]'s state.
pub struct WaitQueueGuard<'a, T> {
    inner: SpinLockIrqGuard<'a, Inner<T>>,
}

impl<T> WaitQueueGuard<'_, T> {
    /// Wakes every registration while still holding the lock.
    ///
    /// One-shot waiters are dequeued (they re-register if their condition
    /// still fails), poll registrations stay. Returns the number of wakers
    /// invoked.
    pub fn wake_all(&mut self) -> usize {
        let woken = self.inner.wake_all();
        if woken > 0 {
            log::trace!("woke {woken} waiter(s)");
        }
        woken
    }

    #[must_use]
    pub fn waiter_count(&self) -> usize {
        self.inner.entries.len()
    }
}

impl<T> Deref for WaitQueueGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner.state
    }
}

impl<T> DerefMut for WaitQueueGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner.state
    }
}
