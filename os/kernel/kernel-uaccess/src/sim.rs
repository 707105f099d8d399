//! In-memory model of a process address space.
//!
//! Regions are mapped at fixed or automatically chosen addresses with
//! read/write protections. Validation and copies walk the regions exactly
//! the way page-table backed checks would, so adjacent regions can be
//! crossed while holes and protection mismatches cannot. A fault can be
//! injected after a given number of copied bytes to exercise short copies.
//!
//! Each simulated process owns its own space, so the type is not `Sync`.

use crate::{Direction, UserAddress, UserMemory};
use alloc::vec;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

bitflags::bitflags! {
    /// Access the process has to a region.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct Protection: u8 {
        const READ = 0b01;
        const WRITE = 0b10;
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

impl Protection {
    const fn required(direction: Direction) -> Self {
        match direction {
            Direction::Read => Self::READ,
            Direction::Write => Self::WRITE,
        }
    }
}

/// First address handed out by [`SimulatedUserSpace::map_anywhere`].
const AUTO_MAP_BASE: u64 = 0x0000_1000_0000;

/// Unmapped gap left between automatically placed regions.
const GUARD_GAP: u64 = 0x1000;

struct Region {
    base: u64,
    bytes: Vec<u8>,
    prot: Protection,
}

impl Region {
    fn end(&self) -> u64 {
        self.base + self.bytes.len() as u64
    }

    fn contains(&self, addr: u64) -> bool {
        (self.base..self.end()).contains(&addr)
    }
}

#[derive(Default)]
pub struct SimulatedUserSpace {
    regions: RefCell<Vec<Region>>,
    next_auto: Cell<u64>,
    /// Bytes that may still be copied before an injected fault.
    fault_budget: Cell<Option<usize>>,
}

impl SimulatedUserSpace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `len` zeroed bytes at `base`.
    ///
    /// Returns `None` for empty, wrapping, or overlapping requests.
    pub fn map(&self, base: u64, len: usize, prot: Protection) -> Option<UserAddress> {
        let end = base.checked_add(u64::try_from(len).ok()?)?;
        if len == 0 {
            return None;
        }
        let mut regions = self.regions.borrow_mut();
        if regions.iter().any(|r| base < r.end() && r.base < end) {
            return None;
        }
        regions.push(Region {
            base,
            bytes: vec![0; len],
            prot,
        });
        regions.sort_by_key(|r| r.base);
        Some(UserAddress::new(base))
    }

    /// Maps `len` zeroed bytes at a fresh address, surrounded by unmapped
    /// guard gaps.
    pub fn map_anywhere(&self, len: usize, prot: Protection) -> Option<UserAddress> {
        let base = self.next_auto.get().max(AUTO_MAP_BASE);
        let addr = self.map(base, len, prot)?;
        let end = base + len as u64;
        self.next_auto.set(end.next_multiple_of(GUARD_GAP) + GUARD_GAP);
        Some(addr)
    }

    /// Removes the region starting at `addr`.
    pub fn unmap(&self, addr: UserAddress) -> bool {
        let mut regions = self.regions.borrow_mut();
        let before = regions.len();
        regions.retain(|r| r.base != addr.as_u64());
        regions.len() != before
    }

    /// Makes every later copy stop after `bytes` more bytes.
    pub fn inject_fault_after(&self, bytes: usize) {
        self.fault_budget.set(Some(bytes));
    }

    pub fn clear_fault(&self) {
        self.fault_budget.set(None);
    }

    /// Writes bytes ignoring protections, as the process itself would.
    pub fn poke(&self, addr: UserAddress, data: &[u8]) -> bool {
        self.walk(addr, data.len(), None, |chunk, done| {
            chunk.copy_from_slice(&data[done..done + chunk.len()]);
        }) == data.len()
    }

    /// Reads bytes ignoring protections.
    #[must_use]
    pub fn peek(&self, addr: UserAddress, len: usize) -> Option<Vec<u8>> {
        let mut out = vec![0; len];
        let n = self.walk(addr, len, None, |chunk, done| {
            out[done..done + chunk.len()].copy_from_slice(chunk);
        });
        (n == len).then_some(out)
    }

    /// Visits `[addr, addr + len)` region by region, stopping at the first
    /// hole, protection mismatch, or exhausted fault budget. Returns the
    /// number of bytes visited.
    fn walk(
        &self,
        addr: UserAddress,
        len: usize,
        required: Option<Protection>,
        mut visit: impl FnMut(&mut [u8], usize),
    ) -> usize {
        let mut regions = self.regions.borrow_mut();
        let mut done = 0;
        let mut at = addr.as_u64();
        while done < len {
            let Some(region) = regions.iter_mut().find(|r| r.contains(at)) else {
                break;
            };
            if required.is_some_and(|p| !region.prot.contains(p)) {
                break;
            }
            #[allow(clippy::cast_possible_truncation)]
            let offset = (at - region.base) as usize;
            let n = (len - done).min(region.bytes.len() - offset);
            visit(&mut region.bytes[offset..offset + n], done);
            done += n;
            at += n as u64;
        }
        done
    }

    /// Consumes the injected fault budget, returning how many of `want`
    /// bytes may be copied.
    fn charge(&self, want: usize) -> usize {
        match self.fault_budget.get() {
            None => want,
            Some(budget) => {
                let n = want.min(budget);
                self.fault_budget.set(Some(budget - n));
                n
            }
        }
    }
}

impl UserMemory for SimulatedUserSpace {
    fn access_ok(&self, addr: UserAddress, len: usize, direction: Direction) -> bool {
        let required = Protection::required(direction);
        // Counting without copying: the visitor does nothing.
        self.walk(addr, len, Some(required), |_, _| {}) == len
    }

    unsafe fn copy_to_user(&self, dst: UserAddress, src: &[u8]) -> usize {
        let allowed = self.charge(src.len());
        self.walk(dst, allowed, Some(Protection::WRITE), |chunk, done| {
            chunk.copy_from_slice(&src[done..done + chunk.len()]);
        })
    }

    unsafe fn copy_from_user(&self, dst: &mut [u8], src: UserAddress) -> usize {
        let allowed = self.charge(dst.len());
        self.walk(src, allowed, Some(Protection::READ), |chunk, done| {
            dst[done..done + chunk.len()].copy_from_slice(chunk);
        })
    }
}
