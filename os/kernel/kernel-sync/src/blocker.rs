use core::task::Waker;

/// The execution context a blocking call runs on.
///
/// Provided by the scheduler glue; the wait queue only ever asks the current
/// context for a [`Waker`], to go to sleep, and whether a signal is pending.
///
/// # Contract
///
/// Waking the waker returned by [`waker`](Self::waker) must make a
/// [`block`](Self::block) that is in progress, or the next one to start,
/// return. This is what rules out lost wakeups: the wait queue hands the
/// waker to producers under its lock, drops the lock, and only then blocks.
/// A wakeup landing in between must not be forgotten.
///
/// `block` may return spuriously; callers re-check their condition.
pub trait Blocker {
    /// Handle another context can use to resume this one.
    fn waker(&self) -> Waker;

    /// Suspends the calling context until woken.
    fn block(&self);

    /// Whether a signal is pending that should abort an interruptible wait.
    fn signal_pending(&self) -> bool;
}
