//! # Blocking character-device I/O
//!
//! The engine behind a stream-like character device: user processes read
//! and write through the usual file operations, block while the device has
//! nothing to offer, and multiplex many devices with `poll`.
//!
//! ## Architecture
//!
//! ```text
//!  read(2)/write(2)          poll(2)                 IRQ / producer
//!        │                      │                          │
//!        ▼                      ▼                          ▼
//!   File ──► FileOperations ◄── do_poll ── PollTable   StreamDevice::produce
//!                 │                              │          │
//!                 ▼                              ▼          ▼
//!            StreamDevice ───────────────► WaitQueue<StreamState>
//!                 │                     (spin lock: ring + wakers)
//!                 ▼
//!        UserWriter / UserReader  (validated user ranges)
//! ```
//!
//! A call validates the user range first, then takes the queue lock. If the
//! device is ready the transfer happens under that lock; otherwise the call
//! fails with [`ChrDevError::WouldBlock`] (non-blocking files) or sleeps in
//! [`WaitQueue::wait_until`](kernel_sync::WaitQueue::wait_until) until a
//! producer or the opposite direction changes the state and wakes the queue.
//! Every transfer that frees space or adds data wakes the queue in turn.
//!
//! ## Errors
//!
//! Recoverable failures are [`ChrDevError`] values and map to the negative
//! errno the syscall layer returns. Broken internal invariants are not
//! errors: they go through `kernel_bug::bug!` and halt.

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

mod config;
mod error;
pub mod file;
mod flags;
pub mod poll;
mod ring;
mod stream;

pub use config::{ChrDevConfig, ConfigError, DEFAULT_CAPACITY, MAX_CAPACITY};
pub use error::{ChrDevError, errno};
pub use file::{File, FileOperations, Whence};
pub use flags::OpenFlags;
pub use poll::{PollFd, do_poll};
pub use ring::ByteRing;
pub use stream::{Caller, StreamDevice, StreamState};
