use std::fmt;
use std::num::NonZeroU64;

/// Opaque, pointer-sized identifier of a native window/context pair.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NativeHandle(NonZeroU64);

impl NativeHandle {
    pub fn new(raw: NonZeroU64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeHandle({:#x})", self.0)
    }
}

/// Requested graphics API version.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ContextVersion {
    pub major: u8,
    pub minor: u8,
}

impl ContextVersion {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Decodes the two-digit packed form used in config files (`33` → 3.3).
    pub const fn from_packed(packed: u8) -> Self {
        Self::new(packed / 10, packed % 10)
    }

    pub const fn packed(self) -> u8 {
        self.major * 10 + self.minor
    }

    /// Returns `true` for versions that were actually released.
    pub fn is_known(self) -> bool {
        let max_minor = match self.major {
            1 => 5,
            2 => 1,
            3 => 3,
            4 => 6,
            _ => return false,
        };
        self.minor <= max_minor
    }
}

impl Default for ContextVersion {
    fn default() -> Self {
        Self::new(4, 3)
    }
}

impl fmt::Display for ContextVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Creation hints for a native window/context pair.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowHints {
    pub version: ContextVersion,
    pub width: u32,
    pub height: u32,
    pub title: String,
    /// Windows start hidden; the worker reveals them after `start` ran.
    pub visible: bool,
}

impl Default for WindowHints {
    fn default() -> Self {
        Self {
            version: ContextVersion::default(),
            width: 1366,
            height: 910,
            title: String::new(),
            visible: false,
        }
    }
}
