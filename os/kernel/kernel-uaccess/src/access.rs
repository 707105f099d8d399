use crate::UserAddress;
use core::fmt;

/// Lowest address a process may map; the zero page is never accessible, so
/// a null pointer is always rejected no matter what length accompanies it.
pub const MMAP_MIN_ADDR: u64 = 0x1000;

/// First address past the user half of the address space (canonical lower
/// half on `x86_64` with 4-level paging).
pub const USER_SPACE_END: u64 = 0x0000_8000_0000_0000;

/// Which way bytes move across the user/kernel boundary.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Direction {
    /// The kernel reads user memory (`copy_from_user`); needs read access.
    Read,
    /// The kernel writes user memory (`copy_to_user`); needs write access.
    Write,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserAccessError {
    /// The range failed validation; nothing was copied.
    #[error("user range {addr}+{len:#x} is not accessible for {direction}")]
    Rejected {
        addr: UserAddress,
        len: usize,
        direction: Direction,
    },
    /// The backend stopped short inside a validated range.
    #[error("user memory fault at {addr} after {copied} bytes")]
    Fault { addr: UserAddress, copied: usize },
}

/// Architectural range check, independent of what the process has mapped.
///
/// The range must not wrap, must not touch the zero page, and must end
/// inside the user half of the address space. Empty ranges pass.
#[must_use]
pub fn range_ok(addr: UserAddress, len: usize) -> bool {
    if len == 0 {
        return true;
    }
    let Ok(len) = u64::try_from(len) else {
        return false;
    };
    match addr.as_u64().checked_add(len) {
        Some(end) => addr.as_u64() >= MMAP_MIN_ADDR && end <= USER_SPACE_END,
        None => false,
    }
}

/// Access to the memory of the process on whose behalf the kernel runs.
///
/// Implemented by the platform glue. Validation and copying are split so that
/// callers can reject a request before any state changes; the copy
/// primitives are only ever invoked by the descriptors in this crate, on
/// ranges [`access_ok`](Self::access_ok) accepted during the same call.
///
/// Copies run with the caller's locks held; implementations must not sleep.
pub trait UserMemory {
    /// Whether `[addr, addr + len)` may be accessed in `direction`.
    ///
    /// Must not dereference `addr`.
    fn access_ok(&self, addr: UserAddress, len: usize, direction: Direction) -> bool;

    /// Copies `src` to user memory at `dst`, returning the number of bytes
    /// copied. Fewer than `src.len()` means a fault stopped the copy.
    ///
    /// # Safety
    ///
    /// `[dst, dst + src.len())` must lie inside a range accepted by
    /// `access_ok(.., Direction::Write)` during the current call.
    unsafe fn copy_to_user(&self, dst: UserAddress, src: &[u8]) -> usize;

    /// Copies user memory at `src` into `dst`, returning the number of bytes
    /// copied. Fewer than `dst.len()` means a fault stopped the copy.
    ///
    /// # Safety
    ///
    /// `[src, src + dst.len())` must lie inside a range accepted by
    /// `access_ok(.., Direction::Read)` during the current call.
    unsafe fn copy_from_user(&self, dst: &mut [u8], src: UserAddress) -> usize;
}

/// Full validation used by the descriptors.
pub(crate) fn validate(
    memory: &dyn UserMemory,
    addr: UserAddress,
    len: usize,
    direction: Direction,
) -> Result<(), UserAccessError> {
    if len == 0 || (range_ok(addr, len) && memory.access_ok(addr, len, direction)) {
        Ok(())
    } else {
        log::debug!("rejected user range {addr}+{len:#x} for {direction}");
        Err(UserAccessError::Rejected {
            addr,
            len,
            direction,
        })
    }
}
