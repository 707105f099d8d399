use crate::access::validate;
use crate::{Direction, UserAccessError, UserAddress, UserMemory};
use core::fmt;
use kernel_bug::bug_on;

/// Validated user range plus a cursor; shared by both descriptors.
struct Cursor<'m> {
    memory: &'m dyn UserMemory,
    base: UserAddress,
    len: usize,
    done: usize,
    faulted: bool,
}

impl<'m> Cursor<'m> {
    fn new(
        memory: &'m dyn UserMemory,
        base: UserAddress,
        len: usize,
        direction: Direction,
    ) -> Result<Self, UserAccessError> {
        validate(memory, base, len, direction)?;
        Ok(Self {
            memory,
            base,
            len,
            done: 0,
            faulted: false,
        })
    }

    const fn remaining(&self) -> usize {
        self.len - self.done
    }

    /// Address of the next byte, or `None` when no copy should be attempted.
    fn next_chunk(&self, want: usize) -> Option<(UserAddress, usize)> {
        let n = want.min(self.remaining());
        if self.faulted || n == 0 {
            return None;
        }
        // Inside the validated range, so this cannot overflow.
        self.base.checked_add(self.done).map(|at| (at, n))
    }

    fn advance(&mut self, at: UserAddress, requested: usize, copied: usize) {
        bug_on!(
            copied > requested,
            "user copy at {at} reported {copied} of {requested} bytes"
        );
        self.done += copied;
        if copied < requested {
            self.faulted = true;
            log::debug!("user memory fault at {at} after {copied} of {requested} bytes");
        }
    }

    fn fault(&self) -> Option<UserAccessError> {
        self.faulted.then(|| UserAccessError::Fault {
            addr: self.base.checked_add(self.done).unwrap_or(self.base),
            copied: self.done,
        })
    }
}

/// Destination in user memory for data the kernel produces (`read(2)`).
pub struct UserWriter<'m> {
    cursor: Cursor<'m>,
}

impl<'m> UserWriter<'m> {
    /// Validates `[addr, addr + len)` for writing.
    ///
    /// # Errors
    ///
    /// [`UserAccessError::Rejected`] if any part of the range is not
    /// writable by the process. Nothing is touched in that case.
    pub fn new(
        memory: &'m dyn UserMemory,
        addr: UserAddress,
        len: usize,
    ) -> Result<Self, UserAccessError> {
        Cursor::new(memory, addr, len, Direction::Write).map(|cursor| Self { cursor })
    }

    /// Copies as much of `src` as fits at the cursor and advances it.
    ///
    /// Returns the number of bytes copied; a short count is either the end
    /// of the validated range or a fault (see [`fault`](Self::fault)).
    pub fn write(&mut self, src: &[u8]) -> usize {
        let Some((at, n)) = self.cursor.next_chunk(src.len()) else {
            return 0;
        };
        // SAFETY: [at, at + n) lies inside the range validated for writing.
        let copied = unsafe { self.cursor.memory.copy_to_user(at, &src[..n]) };
        self.cursor.advance(at, n, copied);
        copied
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.cursor.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.cursor.len == 0
    }

    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    /// Bytes copied so far.
    #[must_use]
    pub const fn transferred(&self) -> usize {
        self.cursor.done
    }

    /// The fault that stopped an earlier [`write`](Self::write), if any.
    #[must_use]
    pub fn fault(&self) -> Option<UserAccessError> {
        self.cursor.fault()
    }

    #[must_use]
    pub const fn is_faulted(&self) -> bool {
        self.cursor.faulted
    }
}

/// Source in user memory for data the kernel consumes (`write(2)`).
pub struct UserReader<'m> {
    cursor: Cursor<'m>,
}

impl<'m> UserReader<'m> {
    /// Validates `[addr, addr + len)` for reading.
    ///
    /// # Errors
    ///
    /// [`UserAccessError::Rejected`] if any part of the range is not
    /// readable by the process. Nothing is touched in that case.
    pub fn new(
        memory: &'m dyn UserMemory,
        addr: UserAddress,
        len: usize,
    ) -> Result<Self, UserAccessError> {
        Cursor::new(memory, addr, len, Direction::Read).map(|cursor| Self { cursor })
    }

    /// Fills as much of `dst` as the range allows and advances the cursor.
    pub fn read(&mut self, dst: &mut [u8]) -> usize {
        let Some((at, n)) = self.cursor.next_chunk(dst.len()) else {
            return 0;
        };
        // SAFETY: [at, at + n) lies inside the range validated for reading.
        let copied = unsafe { self.cursor.memory.copy_from_user(&mut dst[..n], at) };
        self.cursor.advance(at, n, copied);
        copied
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.cursor.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.cursor.len == 0
    }

    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    #[must_use]
    pub const fn transferred(&self) -> usize {
        self.cursor.done
    }

    #[must_use]
    pub fn fault(&self) -> Option<UserAccessError> {
        self.cursor.fault()
    }

    #[must_use]
    pub const fn is_faulted(&self) -> bool {
        self.cursor.faulted
    }
}

impl fmt::Debug for UserWriter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserWriter")
            .field("base", &self.cursor.base)
            .field("len", &self.cursor.len)
            .field("written", &self.cursor.done)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for UserReader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserReader")
            .field("base", &self.cursor.base)
            .field("len", &self.cursor.len)
            .field("read", &self.cursor.done)
            .finish_non_exhaustive()
    }
}
