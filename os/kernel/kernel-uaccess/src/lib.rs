//! # User-memory access
//!
//! Everything that touches memory owned by a user process goes through this
//! crate. A system call receives a raw `(address, length)` pair; before a
//! single byte is copied the whole range is validated for the direction of
//! the copy, producing a descriptor ([`UserWriter`] for data flowing to the
//! process, [`UserReader`] for data flowing from it). Only descriptors ever
//! invoke the unsafe copy primitives of a [`UserMemory`] backend.
//!
//! ```text
//! syscall(addr, len)
//!     ↓
//! UserWriter::new ── range_ok + UserMemory::access_ok ──✗── UserAccessError::Rejected
//!     ↓ ✓
//! UserWriter::write(&kernel_bytes)   (bounded by the validated length)
//!     ↓
//! UserMemory::copy_to_user           (short count on fault)
//! ```
//!
//! Backends:
//!
//! * [`DirectUserMemory`]: the kernel shares the process address space,
//!   validates each touched page through a [`UserPages`] lookup and copies
//!   with SMAP lifted for the duration of the copy.
//! * [`sim::SimulatedUserSpace`] (feature `sim`): mapped regions with
//!   read/write protections, for hosted tests.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

mod access;
mod address;
mod buffer;
mod direct;
#[cfg(feature = "sim")]
pub mod sim;
pub mod smap;

pub use access::{Direction, MMAP_MIN_ADDR, USER_SPACE_END, UserAccessError, UserMemory, range_ok};
pub use address::UserAddress;
pub use buffer::{UserReader, UserWriter};
pub use direct::{DirectUserMemory, PAGE_SIZE, UserPages};
