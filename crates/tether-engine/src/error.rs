use std::thread::ThreadId;

/// Broad classification of an [`Error`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    /// The native library or a context could not be brought up.
    ///
    /// Fatal: there is no retry and no partially initialized state.
    Initialization,
    /// A thread-affinity or current-context rule was broken by the caller.
    Misuse,
}

/// Errors surfaced by the coordination layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("native library failed to initialize: {0:#}")]
    PlatformInit(anyhow::Error),

    #[error("unsupported context version {major}.{minor}")]
    InvalidVersion { major: u8, minor: u8 },

    #[error("failed to create native context: {0:#}")]
    ContextCreation(anyhow::Error),

    #[error("failed to load graphics functions: {0:#}")]
    FunctionLoading(anyhow::Error),

    #[error("operation is only valid on the affinity thread {expected:?} (called from {actual:?})")]
    NotAffinityThread { expected: ThreadId, actual: ThreadId },

    #[error("context is current on another thread {0:?}")]
    CurrentElsewhere(ThreadId),

    #[error("another context is already current on this thread")]
    ThreadBusy,

    #[error("no context is registered for this thread")]
    NoContext,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::PlatformInit(_)
            | Error::InvalidVersion { .. }
            | Error::ContextCreation(_)
            | Error::FunctionLoading(_) => ErrorKind::Initialization,

            Error::NotAffinityThread { .. }
            | Error::CurrentElsewhere(_)
            | Error::ThreadBusy
            | Error::NoContext => ErrorKind::Misuse,
        }
    }

    /// Returns `true` for fatal initialization failures.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Initialization
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
