//! # Kernel synchronization primitives
//!
//! Non-sleeping locks, wait queues for blocking system calls, and the poll
//! table used to answer readiness queries.
//!
//! Everything here is usable from interrupt context except
//! [`WaitQueue::wait_until`], the only operation that suspends the caller.

#![cfg_attr(not(any(test, doctest, feature = "std")), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

mod blocker;
#[cfg(feature = "std")]
pub mod hosted;
pub mod irq;
pub mod poll;
mod raw_spin;
mod spin_lock;
mod wait_queue;

pub use blocker::Blocker;
pub use irq::IrqGuard;
pub use poll::{PollMask, PollTable};
pub use raw_spin::RawSpin;
pub use spin_lock::{SpinLock, SpinLockGuard, SpinLockIrqGuard};
pub use wait_queue::{Interrupted, WaitQueue, WaitQueueGuard, WaiterId};
