//! Error type for the spawn builders and the parent side of a spawn.

use thiserror::Error;

use crate::errno;

/// Failure of a builder call or of the parent side of a spawn.
///
/// Every variant maps to the positive errno the C surface returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SpawnError {
    /// A file descriptor argument was negative.
    #[error("invalid file descriptor {0}")]
    InvalidFd(i32),
    /// A flag word or other argument was outside the accepted set.
    #[error("invalid argument")]
    InvalidArgument,
    /// Allocation of an action or its owned path failed.
    #[error("out of memory")]
    OutOfMemory,
    /// An OS call failed with this errno.
    #[error("os error {0}")]
    Os(i32),
}

impl SpawnError {
    /// Positive errno for the C return convention.
    #[must_use]
    pub const fn errno(self) -> i32 {
        match self {
            Self::InvalidFd(_) => errno::EBADF,
            Self::InvalidArgument => errno::EINVAL,
            Self::OutOfMemory => errno::ENOMEM,
            Self::Os(e) => e,
        }
    }
}

impl From<std::collections::TryReserveError> for SpawnError {
    fn from(_: std::collections::TryReserveError) -> Self {
        Self::OutOfMemory
    }
}
