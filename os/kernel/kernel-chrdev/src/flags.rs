bitflags::bitflags! {
    /// Per-open-file flags, bit-compatible with Linux `O_*`.
    ///
    /// The access mode is the two low bits; read-only is the absence of
    /// both [`WRONLY`](Self::WRONLY) and [`RDWR`](Self::RDWR).
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct OpenFlags: u32 {
        const WRONLY = 0o1;
        const RDWR = 0o2;
        const NONBLOCK = 0o4000;
    }
}

impl OpenFlags {
    pub const RDONLY: Self = Self::empty();
    pub const ACCMODE: Self = Self::WRONLY.union(Self::RDWR);

    /// The access-mode bits alone.
    #[must_use]
    pub const fn access_mode(self) -> Self {
        self.intersection(Self::ACCMODE)
    }

    #[must_use]
    pub const fn can_read(self) -> bool {
        !self.contains(Self::WRONLY)
    }

    #[must_use]
    pub const fn can_write(self) -> bool {
        self.intersects(Self::ACCMODE)
    }
}
