//! A bounded byte-stream device.
//!
//! One producer context (an interrupt handler, a timer, another driver)
//! feeds bytes in with [`StreamDevice::produce`]; any number of processes
//! read them back with `read(2)`. Processes can also `write(2)` into the
//! same ring, which makes the device usable as a pipe.

use crate::{ByteRing, ChrDevConfig, ChrDevError, FileOperations, OpenFlags};
use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};
use kernel_sync::{Blocker, PollMask, PollTable, WaitQueue, WaitQueueGuard};
use kernel_uaccess::{UserAddress, UserMemory, UserReader, UserWriter};

/// Everything one `read`/`write` call needs from its calling context.
#[derive(Copy, Clone)]
pub struct Caller<'a> {
    /// Address space of the calling process.
    pub memory: &'a dyn UserMemory,
    /// Puts the calling context to sleep and reports pending signals.
    pub blocker: &'a dyn Blocker,
    /// Status flags of the open file the call came through.
    pub flags: OpenFlags,
}

impl<'a> Caller<'a> {
    #[must_use]
    pub const fn new(memory: &'a dyn UserMemory, blocker: &'a dyn Blocker) -> Self {
        Self {
            memory,
            blocker,
            flags: OpenFlags::empty(),
        }
    }

    #[must_use]
    pub const fn with_flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub const fn is_nonblocking(&self) -> bool {
        self.flags.contains(OpenFlags::NONBLOCK)
    }
}

impl fmt::Debug for Caller<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Caller")
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

/// The state a [`StreamDevice`]'s wait queue protects.
#[derive(Debug)]
pub struct StreamState {
    ring: ByteRing,
    hung_up: bool,
}

impl StreamState {
    /// A read would not block: data is buffered or the stream has ended.
    #[must_use]
    pub const fn readable(&self) -> bool {
        !self.ring.is_empty() || self.hung_up
    }

    /// A write would not block: there is room, or it fails right away.
    #[must_use]
    pub const fn writable(&self) -> bool {
        !self.ring.is_full() || self.hung_up
    }

    #[must_use]
    pub const fn is_hung_up(&self) -> bool {
        self.hung_up
    }
}

pub struct StreamDevice {
    name: &'static str,
    queue: WaitQueue<StreamState>,
    opens: AtomicUsize,
}

impl StreamDevice {
    /// # Errors
    ///
    /// [`ChrDevError::Config`] if `config` does not validate.
    pub fn new(config: &ChrDevConfig) -> Result<Self, ChrDevError> {
        let capacity = config.validate()?;
        log::debug!("{}: stream device with {capacity} byte ring", config.name);
        Ok(Self {
            name: config.name,
            queue: WaitQueue::new(StreamState {
                ring: ByteRing::new(capacity),
                hung_up: false,
            }),
            opens: AtomicUsize::new(0),
        })
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Copies buffered bytes to the user range `[buf, buf + len)`.
    ///
    /// Returns the number of bytes copied, which may be less than `len`,
    /// or `0` once the stream has hung up and is drained.
    ///
    /// The copy to user memory runs with the device's spin lock held and
    /// local interrupts disabled, so `caller.memory` must not sleep.
    ///
    /// # Errors
    ///
    /// - [`ChrDevError::InvalidUserPointer`] if the range is not writable
    ///   by the caller, checked before anything else; or if the copy faults
    ///   before the first byte.
    /// - [`ChrDevError::WouldBlock`] for a non-blocking caller when nothing
    ///   is buffered.
    /// - [`ChrDevError::Interrupted`] if a signal arrives while waiting.
    pub fn read(
        &self,
        caller: &Caller<'_>,
        buf: UserAddress,
        len: usize,
    ) -> Result<usize, ChrDevError> {
        let mut out = UserWriter::new(caller.memory, buf, len)?;
        if out.is_empty() {
            return Ok(0);
        }

        let mut state = self.ready(caller, StreamState::readable)?;
        let (first, second) = state.ring.readable_slices();
        let mut copied = out.write(first);
        if copied == first.len() {
            copied += out.write(second);
        }

        if copied == 0 {
            return match out.fault() {
                Some(fault) => Err(fault.into()),
                None => {
                    log::debug!("{}: end of stream", self.name);
                    Ok(0)
                }
            };
        }

        state.ring.consume(copied);
        state.wake_all();
        log::debug!("{}: read {copied} of {len} bytes", self.name);
        Ok(copied)
    }

    /// Copies bytes from the user range `[buf, buf + len)` into the ring.
    ///
    /// Returns the number of bytes accepted, which may be less than `len`.
    ///
    /// As with [`read`](Self::read), the copy from user memory runs under the
    /// device's spin lock with interrupts disabled; `caller.memory` must not
    /// sleep.
    ///
    /// # Errors
    ///
    /// As for [`read`](Self::read), with the range checked for reading and
    /// "nothing buffered" replaced by "no free space"; plus
    /// [`ChrDevError::HungUp`] once the stream has ended.
    pub fn write(
        &self,
        caller: &Caller<'_>,
        buf: UserAddress,
        len: usize,
    ) -> Result<usize, ChrDevError> {
        let mut src = UserReader::new(caller.memory, buf, len)?;
        if src.is_empty() {
            return Ok(0);
        }

        let mut state = self.ready(caller, StreamState::writable)?;
        if state.hung_up {
            return Err(ChrDevError::HungUp);
        }

        let (first, second) = state.ring.writable_slices();
        let first_len = first.len();
        let mut copied = src.read(first);
        if copied == first_len {
            copied += src.read(second);
        }

        if copied == 0 {
            return match src.fault() {
                Some(fault) => Err(fault.into()),
                None => Ok(0),
            };
        }

        state.ring.commit(copied);
        state.wake_all();
        log::debug!("{}: wrote {copied} of {len} bytes", self.name);
        Ok(copied)
    }

    /// Feeds bytes in from the device side. Never blocks.
    ///
    /// Returns how many bytes fit; the rest is dropped. Nothing is accepted
    /// after [`hang_up`](Self::hang_up).
    pub fn produce(&self, data: &[u8]) -> usize {
        let mut state = self.queue.lock();
        if state.hung_up {
            return 0;
        }
        let pushed = state.ring.push(data);
        if pushed > 0 {
            let woken = state.wake_all();
            log::trace!("{}: produced {pushed} bytes, woke {woken}", self.name);
        }
        pushed
    }

    /// Ends the stream: readers drain what is left and then see `0`,
    /// writers fail with [`ChrDevError::HungUp`].
    pub fn hang_up(&self) {
        let mut state = self.queue.lock();
        if state.hung_up {
            return;
        }
        state.hung_up = true;
        let woken = state.wake_all();
        log::debug!("{}: hung up, woke {woken}", self.name);
    }

    /// Registers `table` (if any) on the device queue, then reports the
    /// current readiness.
    pub fn poll<'a>(&'a self, table: Option<&PollTable<'a>>) -> PollMask {
        if let Some(table) = table {
            table.register(&self.queue);
        }

        let state = self.queue.lock();
        let mut mask = PollMask::empty();
        if !state.ring.is_empty() {
            mask |= PollMask::READABLE;
        }
        if state.hung_up {
            mask |= PollMask::HUP;
        } else if !state.ring.is_full() {
            mask |= PollMask::WRITABLE;
        }
        mask
    }

    /// Bytes buffered for readers.
    #[must_use]
    pub fn available(&self) -> usize {
        self.queue.lock().ring.len()
    }

    #[must_use]
    pub fn free_space(&self) -> usize {
        self.queue.lock().ring.free()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.queue.lock().ring.capacity()
    }

    #[must_use]
    pub fn is_hung_up(&self) -> bool {
        self.queue.lock().hung_up
    }

    /// Number of open files on the device.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::Acquire)
    }

    /// Blocked contexts plus poll registrations on the device queue.
    #[must_use]
    pub fn waiter_count(&self) -> usize {
        self.queue.waiter_count()
    }

    /// Locks the queue once `condition` holds, honouring the caller's flags.
    fn ready(
        &self,
        caller: &Caller<'_>,
        condition: fn(&StreamState) -> bool,
    ) -> Result<WaitQueueGuard<'_, StreamState>, ChrDevError> {
        let state = self.queue.lock();
        if condition(&state) {
            return Ok(state);
        }
        if caller.is_nonblocking() {
            return Err(ChrDevError::WouldBlock);
        }
        drop(state);
        self.queue
            .wait_until(caller.blocker, condition)
            .map_err(ChrDevError::from)
    }
}

impl FileOperations for StreamDevice {
    fn open(&self, flags: OpenFlags) -> Result<(), ChrDevError> {
        let opens = self.opens.fetch_add(1, Ordering::AcqRel) + 1;
        log::debug!("{}: open ({flags:?}), {opens} open", self.name);
        Ok(())
    }

    fn read(
        &self,
        caller: &Caller<'_>,
        buf: UserAddress,
        len: usize,
    ) -> Result<usize, ChrDevError> {
        Self::read(self, caller, buf, len)
    }

    fn write(
        &self,
        caller: &Caller<'_>,
        buf: UserAddress,
        len: usize,
    ) -> Result<usize, ChrDevError> {
        Self::write(self, caller, buf, len)
    }

    fn poll<'a>(&'a self, table: Option<&PollTable<'a>>) -> PollMask {
        Self::poll(self, table)
    }

    fn release(&self) {
        let previous = self.opens.fetch_sub(1, Ordering::AcqRel);
        kernel_bug::bug_on!(previous == 0, "{}: release without open", self.name);
        log::debug!("{}: release, {} open", self.name, previous - 1);
    }
}

impl fmt::Debug for StreamDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamDevice")
            .field("name", &self.name)
            .field("opens", &self.open_count())
            .finish_non_exhaustive()
    }
}
