use core::hint::spin_loop;
use core::sync::atomic::{AtomicBool, Ordering};
use kernel_bug::bug_on;

/// Bare test-and-test-and-set lock word without any protected data.
pub struct RawSpin {
    held: AtomicBool,
}

impl Default for RawSpin {
    fn default() -> Self {
        Self::new()
    }
}

impl RawSpin {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn lock(&self) {
        while self.held.swap(true, Ordering::Acquire) {
            while self.held.load(Ordering::Relaxed) {
                spin_loop();
            }
        }
    }

    #[inline]
    pub fn try_lock(&self) -> bool {
        !self.held.swap(true, Ordering::Acquire)
    }

    /// Racy snapshot; only meaningful for assertions.
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.held.load(Ordering::Relaxed)
    }

    /// Releases the lock.
    ///
    /// # Safety
    ///
    /// The caller must own the lock, i.e. it acquired it through
    /// [`lock`](Self::lock) or a successful [`try_lock`](Self::try_lock) and
    /// has not released it since.
    ///
    /// # Panics
    ///
    /// Releasing a lock that is not held means the lock state is corrupted;
    /// this is reported through [`kernel_bug::bug!`].
    #[inline]
    pub unsafe fn unlock(&self) {
        let was_held = self.held.swap(false, Ordering::Release);
        bug_on!(!was_held, "spin lock released while not held");
    }
}
