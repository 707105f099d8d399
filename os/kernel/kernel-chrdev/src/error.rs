use crate::ConfigError;
use kernel_sync::Interrupted;
use kernel_uaccess::UserAccessError;

/// Linux errno values the device layer reports.
pub mod errno {
    pub const EBADF: i32 = 9;
    pub const EAGAIN: i32 = 11;
    pub const EFAULT: i32 = 14;
    pub const EINVAL: i32 = 22;
    pub const ESPIPE: i32 = 29;
    pub const EPIPE: i32 = 32;
    /// Kernel-internal: restart the system call if the signal handler allows.
    pub const ERESTARTSYS: i32 = 512;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChrDevError {
    /// A non-blocking call found no data or no space.
    #[error("operation would block")]
    WouldBlock,
    /// A blocking call was interrupted by a signal before it could proceed.
    #[error("interrupted by a signal")]
    Interrupted,
    /// The user buffer failed validation or faulted before any byte moved.
    #[error("invalid user pointer: {0}")]
    InvalidUserPointer(#[from] UserAccessError),
    /// Write to a device whose stream has ended.
    #[error("device has hung up")]
    HungUp,
    #[error("device is not seekable")]
    NotSeekable,
    /// Read on a write-only file, or write on a read-only one.
    #[error("file not open for this access mode")]
    BadFileMode,
    #[error("invalid device configuration: {0}")]
    Config(#[from] ConfigError),
}

impl ChrDevError {
    /// The negative errno handed back to the system call layer.
    #[must_use]
    pub const fn to_errno(self) -> i32 {
        -match self {
            Self::WouldBlock => errno::EAGAIN,
            Self::Interrupted => errno::ERESTARTSYS,
            Self::InvalidUserPointer(_) => errno::EFAULT,
            Self::HungUp => errno::EPIPE,
            Self::NotSeekable => errno::ESPIPE,
            Self::BadFileMode => errno::EBADF,
            Self::Config(_) => errno::EINVAL,
        }
    }

    /// Whether retrying the same call later may succeed.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::WouldBlock | Self::Interrupted)
    }
}

impl From<Interrupted> for ChrDevError {
    fn from(_: Interrupted) -> Self {
        Self::Interrupted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_uaccess::{Direction, UserAddress};

    #[test]
    fn errno_mapping() {
        let rejected = UserAccessError::Rejected {
            addr: UserAddress::null(),
            len: 10,
            direction: Direction::Write,
        };
        assert_eq!(ChrDevError::WouldBlock.to_errno(), -11);
        assert_eq!(ChrDevError::Interrupted.to_errno(), -512);
        assert_eq!(ChrDevError::from(rejected).to_errno(), -14);
        assert_eq!(ChrDevError::HungUp.to_errno(), -32);
        assert_eq!(ChrDevError::NotSeekable.to_errno(), -29);
        assert_eq!(ChrDevError::BadFileMode.to_errno(), -9);
        assert_eq!(ChrDevError::from(ConfigError::ZeroCapacity).to_errno(), -22);
    }

    #[test]
    fn only_wouldblock_and_interrupted_are_retryable() {
        assert!(ChrDevError::WouldBlock.is_retryable());
        assert!(ChrDevError::from(Interrupted).is_retryable());
        assert!(!ChrDevError::HungUp.is_retryable());
        assert!(!ChrDevError::NotSeekable.is_retryable());
    }
}
