//! Child exit conventions and wait-status decoding.
//!
//! A spawned child that fails anywhere between fork and a successful `exec`
//! terminates with [`CHILD_FAILURE_STATUS`], the same status a shell reports
//! for a command that could not be executed.

/// Exit status of a child whose setup or `exec` failed.
pub const CHILD_FAILURE_STATUS: i32 = 127;

/// `WNOHANG`: return immediately if no child has exited.
pub const WNOHANG: i32 = 1;

// ---------------------------------------------------------------------------
// Wait-status decoding (glibc bit layout)
// ---------------------------------------------------------------------------

/// True if the child terminated normally.
#[must_use]
pub const fn wifexited(status: i32) -> bool {
    (status & 0x7f) == 0
}

/// Exit code of a normally-terminated child (valid only when `wifexited`).
#[must_use]
pub const fn wexitstatus(status: i32) -> i32 {
    (status >> 8) & 0xff
}

/// True if the child was killed by a signal.
#[must_use]
pub const fn wifsignaled(status: i32) -> bool {
    let low7 = status & 0x7f;
    low7 != 0 && low7 != 0x7f
}

/// Signal number that killed the child (valid only when `wifsignaled`).
#[must_use]
pub const fn wtermsig(status: i32) -> i32 {
    status & 0x7f
}

/// True if the child is currently stopped.
#[must_use]
pub const fn wifstopped(status: i32) -> bool {
    (status & 0xff) == 0x7f
}

/// Signal that stopped the child (valid only when `wifstopped`).
#[must_use]
pub const fn wstopsig(status: i32) -> i32 {
    (status >> 8) & 0xff
}

/// Decoded wait status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Normal termination with an exit code.
    Exited(i32),
    /// Killed by a signal.
    Signaled(i32),
    /// Stopped by a signal.
    Stopped(i32),
}

impl ExitOutcome {
    /// Decode a raw `waitpid` status word.
    #[must_use]
    pub const fn from_wait_status(status: i32) -> Self {
        if wifexited(status) {
            Self::Exited(wexitstatus(status))
        } else if wifstopped(status) {
            Self::Stopped(wstopsig(status))
        } else {
            Self::Signaled(wtermsig(status))
        }
    }

    /// Returns true if the child died with the setup/exec failure sentinel.
    #[must_use]
    pub const fn is_spawn_failure(self) -> bool {
        matches!(self, Self::Exited(CHILD_FAILURE_STATUS))
    }

    /// Exit code, if the child exited normally.
    #[must_use]
    pub const fn exit_code(self) -> Option<i32> {
        match self {
            Self::Exited(code) => Some(code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_exit_status_127() {
        let status = 127 << 8;
        assert!(wifexited(status));
        assert_eq!(wexitstatus(status), 127);
        let outcome = ExitOutcome::from_wait_status(status);
        assert_eq!(outcome, ExitOutcome::Exited(127));
        assert!(outcome.is_spawn_failure());
    }

    #[test]
    fn killed_by_sigkill() {
        let status = 9;
        assert!(!wifexited(status));
        assert!(wifsignaled(status));
        assert_eq!(ExitOutcome::from_wait_status(status), ExitOutcome::Signaled(9));
        assert_eq!(ExitOutcome::Signaled(9).exit_code(), None);
    }

    #[test]
    fn stopped_by_sigstop() {
        let status = (19 << 8) | 0x7f;
        assert!(wifstopped(status));
        assert!(!wifsignaled(status));
        assert_eq!(ExitOutcome::from_wait_status(status), ExitOutcome::Stopped(19));
    }

    #[test]
    fn ordinary_exit_is_not_spawn_failure() {
        let outcome = ExitOutcome::from_wait_status(3 << 8);
        assert_eq!(outcome.exit_code(), Some(3));
        assert!(!outcome.is_spawn_failure());
    }
}
