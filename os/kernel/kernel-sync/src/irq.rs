//! Local interrupt masking.
//!
//! On bare-metal `x86_64` the guard snapshots `RFLAGS.IF`, executes `cli`
//! and restores the flag with `sti` on drop. Hosted builds (tests, user-space
//! simulators) have no interrupts to mask, so the guard is inert there and
//! "interrupt context" is modelled by ordinary threads.

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
mod arch {
    /// `RFLAGS.IF`
    const INTERRUPT_FLAG: u64 = 1 << 9;

    #[inline]
    pub fn interrupts_enabled() -> bool {
        let r: u64;
        unsafe { core::arch::asm!("pushfq; pop {}", out(reg) r, options(nostack, preserves_flags)) }
        r & INTERRUPT_FLAG != 0
    }

    #[inline]
    pub fn disable() {
        unsafe { core::arch::asm!("cli", options(nomem, nostack, preserves_flags)) }
    }

    #[inline]
    pub fn enable() {
        unsafe { core::arch::asm!("sti", options(nomem, nostack, preserves_flags)) }
    }
}

#[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
mod arch {
    #[inline]
    pub const fn interrupts_enabled() -> bool {
        false
    }

    #[inline]
    pub const fn disable() {}

    #[inline]
    pub const fn enable() {}
}

/// Whether local interrupts are currently enabled.
///
/// Always `false` on hosted targets.
#[inline]
#[must_use]
pub fn interrupts_enabled() -> bool {
    arch::interrupts_enabled()
}

/// RAII guard that disables local interrupts on creation and restores them
/// on drop.
///
/// Guards nest: an inner guard created while interrupts are already off
/// leaves them off when it drops, only the outermost guard re-enables.
///
/// # Privilege
///
/// On bare metal this must run where `cli`/`sti` are legal (ring 0).
pub struct IrqGuard {
    /// Whether interrupts were enabled when the guard was created.
    were_enabled: bool,
}

impl Default for IrqGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl IrqGuard {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        let enabled = arch::interrupts_enabled();
        if enabled {
            arch::disable();
        }
        Self {
            were_enabled: enabled,
        }
    }
}

impl Drop for IrqGuard {
    fn drop(&mut self) {
        if self.were_enabled {
            arch::enable();
        }
    }
}
