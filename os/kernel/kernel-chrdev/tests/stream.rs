mod common;

use common::{Process, await_waiters, device};
use kernel_chrdev::{ChrDevError, errno};
use kernel_sync::PollMask;
use kernel_uaccess::{Direction, UserAccessError, UserAddress};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

#[test]
fn nonblocking_then_blocking_then_nonblocking() {
    let dev = Arc::new(device(64));
    let p = Process::new(16);

    assert_eq!(
        p.read_as(&p.nonblocking(), &dev, 10),
        Err(ChrDevError::WouldBlock)
    );

    let reader = {
        let dev = Arc::clone(&dev);
        thread::spawn(move || Process::new(16).read(&dev, 10))
    };
    await_waiters(&dev, 1);
    assert_eq!(dev.produce(b"hello"), 5);

    assert_eq!(reader.join().unwrap().unwrap(), b"hello");
    assert_eq!(
        p.read_as(&p.nonblocking(), &dev, 10).map_err(ChrDevError::to_errno),
        Err(-errno::EAGAIN)
    );
}

#[test]
fn blocked_reader_stays_blocked_until_data_arrives() {
    let dev = Arc::new(device(8));
    let returned = Arc::new(AtomicBool::new(false));

    let reader = {
        let dev = Arc::clone(&dev);
        let returned = Arc::clone(&returned);
        thread::spawn(move || {
            let data = Process::new(8).read(&dev, 8);
            returned.store(true, Ordering::SeqCst);
            data
        })
    };
    await_waiters(&dev, 1);

    // Nothing buffered yet.
    thread::sleep(Duration::from_millis(20));
    assert!(!returned.load(Ordering::SeqCst));

    dev.produce(b"x");
    assert_eq!(reader.join().unwrap().unwrap(), b"x");
}

#[test]
fn null_pointer_is_rejected_without_touching_state() {
    let dev = device(16);
    let p = Process::new(16);
    dev.produce(b"abc");

    // Blocking caller, yet the bad pointer is reported without waiting.
    let err = dev.read(&p.caller(), UserAddress::null(), 10).unwrap_err();
    assert_eq!(
        err,
        ChrDevError::InvalidUserPointer(UserAccessError::Rejected {
            addr: UserAddress::null(),
            len: 10,
            direction: Direction::Write,
        })
    );
    assert_eq!(err.to_errno(), -errno::EFAULT);
    assert_eq!(dev.available(), 3);

    // Same for an empty device, where a valid pointer would block.
    let empty = device(16);
    assert!(matches!(
        empty.read(&p.caller(), UserAddress::null(), 10),
        Err(ChrDevError::InvalidUserPointer(_))
    ));
    assert!(matches!(
        empty.write(&p.caller(), UserAddress::new(0x10), 4),
        Err(ChrDevError::InvalidUserPointer(_))
    ));
    assert_eq!(empty.waiter_count(), 0);
}

#[test]
fn read_returns_what_is_available() {
    let dev = device(128);
    let p = Process::new(100);
    let data: Vec<u8> = (0..40).collect();
    assert_eq!(dev.produce(&data), 40);

    assert_eq!(p.read(&dev, 100).unwrap(), data);
    assert_eq!(dev.available(), 0);
}

#[test]
fn zero_length_transfers_never_block() {
    let dev = device(4);
    let p = Process::new(4);
    assert_eq!(dev.read(&p.caller(), p.buf, 0), Ok(0));
    dev.produce(b"full");
    assert_eq!(dev.write(&p.caller(), p.buf, 0), Ok(0));
    assert_eq!(dev.available(), 4);
}

#[test]
fn writer_blocks_on_full_ring_until_a_reader_drains() {
    let dev = Arc::new(device(4));
    dev.produce(b"abcd");

    let writer = {
        let dev = Arc::clone(&dev);
        thread::spawn(move || Process::new(8).write(&dev, b"xy"))
    };
    await_waiters(&dev, 1);

    let p = Process::new(8);
    assert_eq!(p.read(&dev, 3).unwrap(), b"abc");
    assert_eq!(writer.join().unwrap(), Ok(2));
    assert_eq!(p.read(&dev, 8).unwrap(), b"dxy");
}

#[test]
fn short_write_when_space_is_limited() {
    let dev = device(4);
    let p = Process::new(8);
    dev.produce(b"ab");
    assert_eq!(p.write(&dev, b"cdef"), Ok(2));
    assert_eq!(p.read(&dev, 8).unwrap(), b"abcd");
}

#[test]
fn signal_interrupts_a_blocked_reader() {
    let dev = Arc::new(device(8));
    let (tx, rx) = mpsc::channel();

    let reader = {
        let dev = Arc::clone(&dev);
        thread::spawn(move || {
            let p = Process::new(8);
            tx.send(p.blocker.interrupter()).unwrap();
            p.read(&dev, 8)
        })
    };
    let interrupter = rx.recv().unwrap();
    await_waiters(&dev, 1);
    interrupter.raise();

    let err = reader.join().unwrap().unwrap_err();
    assert_eq!(err, ChrDevError::Interrupted);
    assert_eq!(err.to_errno(), -errno::ERESTARTSYS);
    assert_eq!(dev.waiter_count(), 0);
}

#[test]
fn pending_signal_loses_to_available_data() {
    let dev = device(8);
    let p = Process::new(8);
    p.blocker.interrupter().raise();
    dev.produce(b"ok");
    assert_eq!(p.read(&dev, 8).unwrap(), b"ok");
    assert_eq!(p.read(&dev, 8), Err(ChrDevError::Interrupted));
}

#[test]
fn every_blocked_reader_is_released() {
    const READERS: usize = 4;

    let dev = Arc::new(device(16));
    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let dev = Arc::clone(&dev);
            thread::spawn(move || Process::new(1).read(&dev, 1))
        })
        .collect();
    await_waiters(&dev, READERS);

    assert_eq!(dev.produce(b"wxyz"), READERS);

    let mut got: Vec<u8> = readers
        .into_iter()
        .flat_map(|r| r.join().unwrap().unwrap())
        .collect();
    got.sort_unstable();
    assert_eq!(got, b"wxyz");
    assert_eq!(dev.available(), 0);
}

#[test]
fn hang_up_drains_then_reports_end_of_stream() {
    let dev = device(16);
    let p = Process::new(16);
    dev.produce(b"tail");
    dev.hang_up();
    dev.hang_up();

    assert!(dev.is_hung_up());
    assert_eq!(dev.produce(b"late"), 0);
    assert_eq!(dev.poll(None), PollMask::READABLE | PollMask::HUP);
    assert_eq!(p.read(&dev, 16).unwrap(), b"tail");
    assert_eq!(p.read(&dev, 16).unwrap(), b"");
    assert_eq!(p.read_as(&p.nonblocking(), &dev, 16).unwrap(), b"");
    assert_eq!(dev.poll(None), PollMask::HUP);

    let err = p.write(&dev, b"more").unwrap_err();
    assert_eq!(err, ChrDevError::HungUp);
    assert_eq!(err.to_errno(), -errno::EPIPE);
}

#[test]
fn hang_up_releases_blocked_readers_and_writers() {
    let dev = Arc::new(device(2));
    let reader = {
        let dev = Arc::clone(&dev);
        thread::spawn(move || Process::new(4).read(&dev, 4))
    };
    await_waiters(&dev, 1);

    // A writer only blocks on a full ring; give it a device of its own.
    let full = Arc::new(device(2));
    full.produce(b"xx");
    let writer = {
        let full = Arc::clone(&full);
        thread::spawn(move || Process::new(4).write(&full, b"yy"))
    };
    await_waiters(&full, 1);

    dev.hang_up();
    full.hang_up();
    assert_eq!(reader.join().unwrap(), Ok(Vec::new()));
    assert_eq!(writer.join().unwrap(), Err(ChrDevError::HungUp));
}

#[test]
fn stress_every_byte_moves_exactly_once() {
    const PER_WRITER: usize = 5_000;
    const WRITERS: u8 = 3;
    const READERS: usize = 3;

    let dev = Arc::new(device(64));

    let writers: Vec<_> = (0..WRITERS)
        .map(|w| {
            let dev = Arc::clone(&dev);
            thread::spawn(move || {
                let p = Process::new(32);
                let chunk = [w; 32];
                let mut left = PER_WRITER;
                while left > 0 {
                    let n = p.write(&dev, &chunk[..left.min(chunk.len())]).unwrap();
                    assert!(n > 0);
                    left -= n;
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let dev = Arc::clone(&dev);
            thread::spawn(move || {
                let p = Process::new(17);
                let mut seen = BTreeMap::<u8, usize>::new();
                loop {
                    let data = p.read(&dev, 17).unwrap();
                    if data.is_empty() {
                        return seen;
                    }
                    for b in data {
                        *seen.entry(b).or_default() += 1;
                    }
                }
            })
        })
        .collect();

    for w in writers {
        w.join().unwrap();
    }
    // Readers drain what is left, then see end of stream.
    dev.hang_up();

    let mut total = BTreeMap::<u8, usize>::new();
    for r in readers {
        for (b, n) in r.join().unwrap() {
            *total.entry(b).or_default() += n;
        }
    }
    let expected: BTreeMap<u8, usize> = (0..WRITERS).map(|w| (w, PER_WRITER)).collect();
    assert_eq!(total, expected);
    assert_eq!(dev.available(), 0);
    assert_eq!(dev.waiter_count(), 0);
}
