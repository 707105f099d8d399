#![allow(dead_code)]

use kernel_chrdev::{Caller, ChrDevConfig, ChrDevError, OpenFlags, StreamDevice};
use kernel_sync::hosted::ThreadBlocker;
use kernel_uaccess::UserAddress;
use kernel_uaccess::sim::{Protection, SimulatedUserSpace};
use std::thread;

/// A user process: its own address space, one mapped buffer, and the
/// thread it runs on.
pub struct Process {
    pub space: SimulatedUserSpace,
    pub buf: UserAddress,
    pub blocker: ThreadBlocker,
}

impl Process {
    pub fn new(buf_len: usize) -> Self {
        let space = SimulatedUserSpace::new();
        let buf = space.map_anywhere(buf_len, Protection::READ_WRITE).unwrap();
        Self {
            space,
            buf,
            blocker: ThreadBlocker::current(),
        }
    }

    pub fn caller(&self) -> Caller<'_> {
        Caller::new(&self.space, &self.blocker)
    }

    pub fn nonblocking(&self) -> Caller<'_> {
        self.caller().with_flags(OpenFlags::NONBLOCK)
    }

    /// Blocking read of up to `len` bytes into the buffer; returns them.
    pub fn read(&self, dev: &StreamDevice, len: usize) -> Result<Vec<u8>, ChrDevError> {
        self.read_as(&self.caller(), dev, len)
    }

    pub fn read_as(
        &self,
        caller: &Caller<'_>,
        dev: &StreamDevice,
        len: usize,
    ) -> Result<Vec<u8>, ChrDevError> {
        let n = dev.read(caller, self.buf, len)?;
        Ok(self.space.peek(self.buf, n).unwrap())
    }

    /// Blocking write of `data` staged through the buffer.
    pub fn write(&self, dev: &StreamDevice, data: &[u8]) -> Result<usize, ChrDevError> {
        assert!(self.space.poke(self.buf, data));
        dev.write(&self.caller(), self.buf, data.len())
    }
}

pub fn device(capacity: usize) -> StreamDevice {
    StreamDevice::new(&ChrDevConfig::new("stream0").with_capacity(capacity)).unwrap()
}

/// Spins until `dev` has at least `n` blocked contexts or poll registrations.
pub fn await_waiters(dev: &StreamDevice, n: usize) {
    while dev.waiter_count() < n {
        thread::yield_now();
    }
}
