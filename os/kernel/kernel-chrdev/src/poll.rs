//! `poll(2)` over a set of open files.

use crate::{ChrDevError, File};
use kernel_sync::{Blocker, PollMask, PollTable};

/// One entry of a `poll(2)` request.
#[derive(Debug)]
pub struct PollFd<'a> {
    pub file: &'a File<'a>,
    /// Events the caller is interested in.
    pub events: PollMask,
    /// Events that were reported, filled in by [`do_poll`].
    pub revents: PollMask,
}

impl<'a> PollFd<'a> {
    #[must_use]
    pub const fn new(file: &'a File<'a>, events: PollMask) -> Self {
        Self {
            file,
            events,
            revents: PollMask::empty(),
        }
    }
}

/// Waits until at least one file in `fds` is ready.
///
/// The first pass registers a single [`PollTable`] on every file; later
/// passes (after a wakeup) only re-check. Registrations are dropped before
/// returning. `ERR`, `HUP` and `NVAL` are reported even if not requested.
///
/// Returns the number of entries with non-empty `revents`. With
/// `nonblocking` set this is a single pass and may return `0`.
///
/// # Errors
///
/// [`ChrDevError::Interrupted`] if a signal is pending while nothing is
/// ready.
pub fn do_poll(
    fds: &mut [PollFd<'_>],
    blocker: &dyn Blocker,
    nonblocking: bool,
) -> Result<usize, ChrDevError> {
    let table = PollTable::new(blocker.waker());
    let mut first_pass = !nonblocking;

    loop {
        let mut ready = 0;
        for fd in fds.iter_mut() {
            let mask = fd.file.poll(first_pass.then_some(&table));
            fd.revents = mask & (fd.events | PollMask::ALWAYS);
            if !fd.revents.is_empty() {
                ready += 1;
            }
        }
        first_pass = false;

        if ready > 0 || nonblocking {
            log::trace!("poll: {ready} of {} ready", fds.len());
            return Ok(ready);
        }
        if blocker.signal_pending() {
            return Err(ChrDevError::Interrupted);
        }
        blocker.block();
    }
}
