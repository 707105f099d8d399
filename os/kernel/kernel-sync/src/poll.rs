//! Readiness polling.
//!
//! A `poll`/`select` call builds one [`PollTable`] for the whole call and
//! hands it to every file it examines. Each file registers the table on the
//! wait queue(s) that govern its readiness, then reports its current
//! [`PollMask`]. If nothing is ready the caller sleeps; any `wake_all` on a
//! registered queue wakes the table's waker and the caller polls again.
//!
//! Registering *before* computing the mask closes the window between "not
//! ready" and "going to sleep": a producer that makes the file ready after
//! the check still finds the table on the queue.

use crate::wait_queue::{WaitQueue, WaiterId};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use core::ptr;
use core::task::Waker;

bitflags::bitflags! {
    /// Readiness events, bit-compatible with Linux `POLL*`.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct PollMask: u16 {
        const IN = 0x0001;
        const PRI = 0x0002;
        const OUT = 0x0004;
        const ERR = 0x0008;
        const HUP = 0x0010;
        const NVAL = 0x0020;
        const RDNORM = 0x0040;
        const RDBAND = 0x0080;
        const WRNORM = 0x0100;
        const WRBAND = 0x0200;
    }
}

impl PollMask {
    /// Data can be read without blocking.
    pub const READABLE: Self = Self::IN.union(Self::RDNORM);

    /// Data can be written without blocking.
    pub const WRITABLE: Self = Self::OUT.union(Self::WRNORM);

    /// Conditions reported whether or not the caller asked for them.
    pub const ALWAYS: Self = Self::ERR.union(Self::HUP).union(Self::NVAL);
}

/// Type-erased view of a queue a table is registered on.
trait WaitSource: Sync {
    fn detach(&self, id: WaiterId);
}

impl<T: Send> WaitSource for WaitQueue<T> {
    fn detach(&self, id: WaiterId) {
        self.remove(id);
    }
}

/// Registrations made on behalf of one polling call.
///
/// Not `Sync`: a table belongs to the context that is polling. Dropping the
/// table detaches it from every queue it was registered on.
pub struct PollTable<'a> {
    waker: Waker,
    entries: RefCell<Vec<(&'a dyn WaitSource, WaiterId)>>,
}

impl<'a> PollTable<'a> {
    #[must_use]
    pub const fn new(waker: Waker) -> Self {
        Self {
            waker,
            entries: RefCell::new(Vec::new()),
        }
    }

    /// Attaches this table to `queue` so that the queue's next
    /// [`wake_all`](WaitQueue::wake_all) wakes the polling context.
    ///
    /// Never blocks. Registering the same queue twice is a no-op.
    pub fn register<T: Send + 'a>(&self, queue: &'a WaitQueue<T>) {
        let mut entries = self.entries.borrow_mut();
        let already = entries
            .iter()
            .any(|(source, _)| ptr::addr_eq(ptr::from_ref(*source), ptr::from_ref(queue)));
        if already {
            return;
        }

        let id = queue.add_persistent(&self.waker);
        let source: &'a dyn WaitSource = queue;
        entries.push((source, id));
    }

    /// Number of queues this table is registered on.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn waker(&self) -> &Waker {
        &self.waker
    }
}

impl Drop for PollTable<'_> {
    fn drop(&mut self) {
        for (source, id) in self.entries.get_mut().drain(..) {
            source.detach(id);
        }
    }
}

impl fmt::Debug for PollTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollTable")
            .field("registrations", &self.len())
            .finish_non_exhaustive()
    }
}
