use core::num::NonZeroUsize;

/// Ring size used when a device does not ask for one.
pub const DEFAULT_CAPACITY: usize = 4096;

/// Upper bound on a device ring; the ring is allocated up front.
pub const MAX_CAPACITY: usize = 1 << 20;

/// Static description of a stream device.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ChrDevConfig {
    /// Name used in log records.
    pub name: &'static str,
    /// Bytes the device buffers between producer and readers.
    pub capacity: usize,
}

impl ChrDevConfig {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            capacity: DEFAULT_CAPACITY,
        }
    }

    #[must_use]
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Checks the configuration and returns the ring capacity to allocate.
    ///
    /// # Errors
    ///
    /// A [`ConfigError`] naming the first invalid field.
    pub const fn validate(&self) -> Result<NonZeroUsize, ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.capacity > MAX_CAPACITY {
            return Err(ConfigError::CapacityTooLarge(self.capacity));
        }
        match NonZeroUsize::new(self.capacity) {
            Some(capacity) => Ok(capacity),
            None => Err(ConfigError::ZeroCapacity),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("device name is empty")]
    EmptyName,
    #[error("ring capacity must be non-zero")]
    ZeroCapacity,
    #[error("ring capacity {0} exceeds {max}", max = MAX_CAPACITY)]
    CapacityTooLarge(usize),
}
