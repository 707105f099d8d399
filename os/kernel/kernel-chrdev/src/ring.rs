use alloc::boxed::Box;
use alloc::vec;
use core::fmt;
use core::num::NonZeroUsize;
use kernel_bug::bug_on;

/// Fixed-capacity byte FIFO.
///
/// Data and free space are exposed as at most two contiguous slices each,
/// so callers can copy straight between the ring and user memory and then
/// [`consume`](Self::consume) or [`commit`](Self::commit) exactly the bytes
/// that actually moved.
pub struct ByteRing {
    buf: Box<[u8]>,
    head: usize,
    len: usize,
}

impl ByteRing {
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            buf: vec![0; capacity.get()].into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.len == self.buf.len()
    }

    #[must_use]
    pub const fn free(&self) -> usize {
        self.buf.len() - self.len
    }

    /// Buffered data in FIFO order.
    #[must_use]
    pub fn readable_slices(&self) -> (&[u8], &[u8]) {
        let first = self.len.min(self.capacity() - self.head);
        (
            &self.buf[self.head..self.head + first],
            &self.buf[..self.len - first],
        )
    }

    /// Drops the oldest `n` bytes.
    pub fn consume(&mut self, n: usize) {
        bug_on!(n > self.len, "ring consume of {n} with {} buffered", self.len);
        self.head = (self.head + n) % self.capacity();
        self.len -= n;
        if self.len == 0 {
            self.head = 0;
        }
    }

    /// Free space in the order it will be filled.
    pub fn writable_slices(&mut self) -> (&mut [u8], &mut [u8]) {
        let free = self.free();
        let tail = (self.head + self.len) % self.capacity();
        let (front, back) = self.buf.split_at_mut(tail);
        let first = free.min(back.len());
        (&mut back[..first], &mut front[..free - first])
    }

    /// Publishes `n` bytes previously written through
    /// [`writable_slices`](Self::writable_slices).
    pub fn commit(&mut self, n: usize) {
        bug_on!(n > self.free(), "ring commit of {n} with {} free", self.free());
        self.len += n;
    }

    /// Appends as much of `data` as fits; returns the count taken.
    pub fn push(&mut self, data: &[u8]) -> usize {
        let (first, second) = self.writable_slices();
        let a = first.len().min(data.len());
        first[..a].copy_from_slice(&data[..a]);
        let b = second.len().min(data.len() - a);
        second[..b].copy_from_slice(&data[a..a + b]);
        self.commit(a + b);
        a + b
    }

    /// Moves up to `out.len()` of the oldest bytes into `out`.
    #[cfg(test)]
    fn pop(&mut self, out: &mut [u8]) -> usize {
        let (first, second) = self.readable_slices();
        let a = first.len().min(out.len());
        out[..a].copy_from_slice(&first[..a]);
        let b = second.len().min(out.len() - a);
        out[a..a + b].copy_from_slice(&second[..b]);
        self.consume(a + b);
        a + b
    }
}

impl fmt::Debug for ByteRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteRing")
            .field("capacity", &self.capacity())
            .field("len", &self.len)
            .field("head", &self.head)
            .finish_non_exhaustive()
    }
}
