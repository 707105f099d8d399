//! Thread-backed [`Blocker`] for hosted targets.
//!
//! Parks the calling OS thread in place of descheduling a task. Signal
//! delivery is simulated with an [`Interrupter`], which can be handed to any
//! other thread.

use crate::Blocker;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Wake, Waker};
use std::thread::{self, Thread};

struct Shared {
    thread: Thread,
    signal: AtomicBool,
}

impl Wake for Shared {
    fn wake(self: Arc<Self>) {
        self.thread.unpark();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.thread.unpark();
    }
}

/// Blocker for the thread that created it.
///
/// Not `Send`: parking only ever suspends the current thread, so the blocker
/// must stay on the thread it describes.
pub struct ThreadBlocker {
    shared: Arc<Shared>,
    _not_send: PhantomData<*const ()>,
}

impl ThreadBlocker {
    /// Describes the calling thread.
    #[must_use]
    pub fn current() -> Self {
        Self {
            shared: Arc::new(Shared {
                thread: thread::current(),
                signal: AtomicBool::new(false),
            }),
            _not_send: PhantomData,
        }
    }

    /// A handle other threads use to deliver a signal to this one.
    #[must_use]
    pub fn interrupter(&self) -> Interrupter {
        Interrupter {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Marks the pending signal as delivered.
    pub fn clear_signal(&self) {
        self.shared.signal.store(false, Ordering::Release);
    }
}

impl Blocker for ThreadBlocker {
    fn waker(&self) -> Waker {
        Waker::from(Arc::clone(&self.shared))
    }

    fn block(&self) {
        // An unpark issued before this point leaves the token set and
        // park returns immediately.
        thread::park();
    }

    fn signal_pending(&self) -> bool {
        self.shared.signal.load(Ordering::Acquire)
    }
}

/// Delivers a simulated signal to a [`ThreadBlocker`]'s thread.
#[derive(Clone)]
pub struct Interrupter {
    shared: Arc<Shared>,
}

impl Interrupter {
    /// Flags a pending signal and kicks the thread out of `block`.
    pub fn raise(&self) {
        self.shared.signal.store(true, Ordering::Release);
        self.shared.thread.unpark();
    }
}
