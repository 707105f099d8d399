//! File operations and open files.
//!
//! A driver implements [`FileOperations`]; the VFS side opens it into a
//! [`File`], which carries the per-open status flags and calls
//! [`release`](FileOperations::release) when the last reference goes away.

use crate::{Caller, ChrDevError, OpenFlags};
use core::fmt;
use kernel_sync::{Blocker, PollMask, PollTable};
use kernel_uaccess::{UserAddress, UserMemory};

/// Origin of an `llseek` offset.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Whence {
    Set = 0,
    Current = 1,
    End = 2,
}

impl TryFrom<u32> for Whence {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Set),
            1 => Ok(Self::Current),
            2 => Ok(Self::End),
            other => Err(other),
        }
    }
}

/// The operations a character device offers to open files.
pub trait FileOperations: Sync {
    /// Called once per [`File::open`]. Refusing fails the open.
    ///
    /// # Errors
    ///
    /// Whatever the driver refuses the open with.
    fn open(&self, flags: OpenFlags) -> Result<(), ChrDevError> {
        let _ = flags;
        Ok(())
    }

    /// # Errors
    ///
    /// Driver-specific; see [`StreamDevice::read`](crate::StreamDevice::read).
    fn read(
        &self,
        caller: &Caller<'_>,
        buf: UserAddress,
        len: usize,
    ) -> Result<usize, ChrDevError>;

    /// # Errors
    ///
    /// Driver-specific; see [`StreamDevice::write`](crate::StreamDevice::write).
    fn write(
        &self,
        caller: &Caller<'_>,
        buf: UserAddress,
        len: usize,
    ) -> Result<usize, ChrDevError>;

    /// Registers `table` on the driver's wait queues and reports readiness.
    fn poll<'a>(&'a self, table: Option<&PollTable<'a>>) -> PollMask;

    /// Stream devices have no file position.
    ///
    /// # Errors
    ///
    /// [`ChrDevError::NotSeekable`] unless the driver overrides this.
    fn llseek(&self, offset: i64, whence: Whence) -> Result<u64, ChrDevError> {
        let _ = (offset, whence);
        Err(ChrDevError::NotSeekable)
    }

    /// Called when an open file is dropped.
    fn release(&self) {}
}

/// An open file on a device.
pub struct File<'d> {
    ops: &'d dyn FileOperations,
    flags: OpenFlags,
}

impl<'d> File<'d> {
    /// # Errors
    ///
    /// The driver's [`open`](FileOperations::open) error.
    pub fn open(ops: &'d dyn FileOperations, flags: OpenFlags) -> Result<Self, ChrDevError> {
        ops.open(flags)?;
        Ok(Self { ops, flags })
    }

    #[must_use]
    pub const fn flags(&self) -> OpenFlags {
        self.flags
    }

    /// The `fcntl(F_SETFL, O_NONBLOCK)` path.
    pub fn set_nonblocking(&mut self, nonblocking: bool) {
        self.flags.set(OpenFlags::NONBLOCK, nonblocking);
    }

    /// # Errors
    ///
    /// [`ChrDevError::BadFileMode`] on a write-only file, otherwise see
    /// [`FileOperations::read`].
    pub fn read(
        &self,
        memory: &dyn UserMemory,
        blocker: &dyn Blocker,
        buf: UserAddress,
        len: usize,
    ) -> Result<usize, ChrDevError> {
        if !self.flags.can_read() {
            return Err(ChrDevError::BadFileMode);
        }
        let caller = Caller::new(memory, blocker).with_flags(self.flags);
        self.ops.read(&caller, buf, len)
    }

    /// # Errors
    ///
    /// [`ChrDevError::BadFileMode`] on a read-only file, otherwise see
    /// [`FileOperations::write`].
    pub fn write(
        &self,
        memory: &dyn UserMemory,
        blocker: &dyn Blocker,
        buf: UserAddress,
        len: usize,
    ) -> Result<usize, ChrDevError> {
        if !self.flags.can_write() {
            return Err(ChrDevError::BadFileMode);
        }
        let caller = Caller::new(memory, blocker).with_flags(self.flags);
        self.ops.write(&caller, buf, len)
    }

    pub fn poll<'a>(&'a self, table: Option<&PollTable<'a>>) -> PollMask {
        self.ops.poll(table)
    }

    /// # Errors
    ///
    /// See [`FileOperations::llseek`].
    pub fn llseek(&self, offset: i64, whence: Whence) -> Result<u64, ChrDevError> {
        self.ops.llseek(offset, whence)
    }
}

impl Drop for File<'_> {
    fn drop(&mut self) {
        self.ops.release();
    }
}

impl fmt::Debug for File<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}
