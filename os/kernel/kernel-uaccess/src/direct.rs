use crate::smap::SmapGuard;
use crate::{Direction, UserAddress, UserMemory, range_ok};

/// Granule at which user mappings are looked up.
pub const PAGE_SIZE: u64 = 4096;

/// Page-table view of the calling process, as the direct backend needs it.
///
/// Usually a thin wrapper around the active address space's page walk.
pub trait UserPages {
    /// Whether the page containing `addr` is present, user-accessible and,
    /// for [`Direction::Write`], writable.
    fn accessible(&self, addr: UserAddress, direction: Direction) -> bool;
}

/// Backend for a kernel that runs inside the calling process's address
/// space.
///
/// Validation is the architectural [`range_ok`] check plus a lookup of every
/// page the range touches. Copies are plain `memcpy`s inside an
/// [`SmapGuard`]; there is no exception-table fixup, so copies never stop
/// short and rely on the validated pages staying put.
pub struct DirectUserMemory<P> {
    pages: P,
}

impl<P: UserPages> DirectUserMemory<P> {
    /// # Safety
    ///
    /// Every page `pages` reports as accessible must stay mapped with at
    /// least that access until the system call that validated it returns
    /// (the pages are pinned, or nothing can unmap them concurrently).
    pub const unsafe fn new(pages: P) -> Self {
        Self { pages }
    }

    /// Checks each page of `[addr, addr + len)`; `len` is non-zero and the
    /// range already passed [`range_ok`].
    fn pages_ok(&self, addr: UserAddress, len: usize, direction: Direction) -> bool {
        let start = addr.as_u64();
        let end = start + len as u64;
        let mut at = start;
        while at < end {
            if !self.pages.accessible(UserAddress::new(at), direction) {
                log::debug!("user page at {at:#x} not accessible for {direction}");
                return false;
            }
            at = (at & !(PAGE_SIZE - 1)) + PAGE_SIZE;
        }
        true
    }
}

impl<P: UserPages> UserMemory for DirectUserMemory<P> {
    fn access_ok(&self, addr: UserAddress, len: usize, direction: Direction) -> bool {
        range_ok(addr, len) && (len == 0 || self.pages_ok(addr, len, direction))
    }

    unsafe fn copy_to_user(&self, dst: UserAddress, src: &[u8]) -> usize {
        let _smap = SmapGuard::enter();
        // SAFETY: the caller guarantees the destination range was validated
        // for writing; the constructor contract keeps it mapped.
        unsafe {
            core::ptr::copy_nonoverlapping(src.as_ptr(), dst.as_mut_ptr::<u8>(), src.len());
        }
        src.len()
    }

    unsafe fn copy_from_user(&self, dst: &mut [u8], src: UserAddress) -> usize {
        let _smap = SmapGuard::enter();
        // SAFETY: as above, for reading.
        unsafe {
            core::ptr::copy_nonoverlapping(src.as_ptr::<u8>(), dst.as_mut_ptr(), dst.len());
        }
        dst.len()
    }
}

impl<P> core::fmt::Debug for DirectUserMemory<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DirectUserMemory").finish_non_exhaustive()
    }
}
