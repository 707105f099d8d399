//! # Diagnostic abort
//!
//! Escape hatch for conditions the rest of the kernel treats as impossible:
//! a lock released while not held, a ring buffer asked to hand out more
//! bytes than it holds, and similar corruption of internal state.
//!
//! [`bug!`] and [`bug_on!`] report the violation through the `log` facade
//! (target `bug`, level `error`) together with the source location of the
//! check, then panic. Kernel builds use `panic = "abort"`, so the panic
//! halts the execution context; there is no way to resume past a bug.
//!
//! This is **not** an error path. Anything a user process can provoke
//! (bad pointers, empty buffers, signals) is reported through `Result`.
//!
//! ```should_panic
//! use kernel_bug::bug_on;
//!
//! let consumed = 8;
//! let available = 4;
//! bug_on!(consumed > available, "consumed {consumed} of {available} bytes");
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

use core::fmt;
use core::panic::Location;

/// Target used for every record emitted by [`bug`].
pub const LOG_TARGET: &str = "bug";

/// Reports a fatal invariant violation and halts.
///
/// Prefer the [`bug!`] and [`bug_on!`] macros; they capture the location of
/// the check rather than of this function.
///
/// # Panics
///
/// Always.
#[cold]
#[inline(never)]
#[track_caller]
pub fn bug(args: fmt::Arguments<'_>) -> ! {
    let location = Location::caller();
    log::error!(
        target: LOG_TARGET,
        "kernel BUG at {}:{}: {}",
        location.file(),
        location.line(),
        args
    );
    panic!(
        "kernel BUG at {}:{}: {}",
        location.file(),
        location.line(),
        args
    );
}

/// Halts with a diagnostic message.
#[macro_export]
macro_rules! bug {
    () => {
        $crate::bug(::core::format_args!("unreachable kernel state"))
    };
    ($($arg:tt)+) => {
        $crate::bug(::core::format_args!($($arg)+))
    };
}

/// Halts with a diagnostic message if `cond` holds.
#[macro_export]
macro_rules! bug_on {
    ($cond:expr $(,)?) => {
        if $cond {
            $crate::bug(::core::format_args!(
                "condition `{}` holds",
                ::core::stringify!($cond)
            ));
        }
    };
    ($cond:expr, $($arg:tt)+) => {
        if $cond {
            $crate::bug(::core::format_args!($($arg)+));
        }
    };
}
