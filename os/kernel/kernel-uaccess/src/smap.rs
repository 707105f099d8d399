//! Temporary SMAP-lifting guard.
//!
//! With CR4.SMAP set the CPU faults on supervisor-mode loads and stores to
//! user pages. [`SmapGuard`] sets RFLAGS.AC (`stac`) for its lifetime and
//! clears it (`clac`) on drop, opening a window for exactly one user copy.
//!
//! Only bare-metal `x86_64` builds touch RFLAGS; on every other target the
//! guard compiles to nothing, which lets the direct copy backend run
//! unchanged in hosted tests.
//!
//! # Safety
//!
//! The caller must ensure that:
//! - user ranges are validated before the guard is entered;
//! - nothing inside the guard calls into code that relies on SMAP
//!   protection still being active.

/// RAII guard permitting supervisor access to user pages.
pub struct SmapGuard {
    _private: (),
}

impl SmapGuard {
    /// Enter a temporary SMAP-disabled region.
    ///
    /// The returned guard **must** be bound to a local so it lives across
    /// the copy and restores protection when the scope ends.
    #[inline(always)]
    #[allow(clippy::inline_always)]
    #[must_use]
    pub fn enter() -> Self {
        #[cfg(all(target_arch = "x86_64", target_os = "none"))]
        unsafe {
            core::arch::asm!("stac", options(nomem, nostack));
        }
        Self { _private: () }
    }
}

impl Drop for SmapGuard {
    #[inline(always)]
    #[allow(clippy::inline_always)]
    fn drop(&mut self) {
        #[cfg(all(target_arch = "x86_64", target_os = "none"))]
        unsafe {
            core::arch::asm!("clac", options(nomem, nostack));
        }
    }
}
