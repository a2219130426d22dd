//! Signal numbers, dispositions, and the spawn signal-set representation.
//!
//! Spawn attributes carry two signal sets (the child's mask and the set of
//! signals forced to default). Both are stored in one canonical wide form
//! covering every Linux signal. Both the `sigset_t` and `sigset64_t` entry
//! points read and write this form.

/// Signal numbers.
pub const SIGHUP: i32 = 1;
pub const SIGINT: i32 = 2;
pub const SIGQUIT: i32 = 3;
pub const SIGUSR1: i32 = 10;
pub const SIGUSR2: i32 = 12;
pub const SIGPIPE: i32 = 13;
pub const SIGALRM: i32 = 14;
pub const SIGTERM: i32 = 15;
pub const SIGCHLD: i32 = 17;
pub const SIGKILL: i32 = 9;
pub const SIGSTOP: i32 = 19;
pub const SIGRTMIN: i32 = 32;

/// Highest signal number (`_NSIG - 1` on Linux).
pub const MAX_SIGNAL: i32 = 64;

/// Returns true if `sig` is in the valid signal range [1, 64].
#[must_use]
pub const fn valid_signal(sig: i32) -> bool {
    sig >= 1 && sig <= MAX_SIGNAL
}

/// Returns true if a handler may be installed for `sig`.
#[must_use]
pub const fn catchable_signal(sig: i32) -> bool {
    valid_signal(sig) && sig != SIGKILL && sig != SIGSTOP
}

/// Current handling of a signal in the calling process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// `SIG_DFL`.
    Default,
    /// `SIG_IGN`.
    Ignore,
    /// A handler function installed by the process.
    Caught,
}

impl Disposition {
    /// Classify a raw `sa_handler` value.
    #[must_use]
    pub const fn from_handler(handler: usize) -> Self {
        match handler {
            0 => Self::Default,
            1 => Self::Ignore,
            _ => Self::Caught,
        }
    }
}

/// Wide signal set: bit `n - 1` is signal `n`, for signals 1..=64.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SigSet(u64);

impl SigSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);
    /// Every signal 1..=64.
    pub const FULL: Self = Self(u64::MAX);

    /// Build from raw wide bits.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Raw wide bits.
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Add `sig`. Returns false and leaves the set unchanged for an invalid signal.
    pub fn insert(&mut self, sig: i32) -> bool {
        if !valid_signal(sig) {
            return false;
        }
        self.0 |= 1u64 << (sig - 1);
        true
    }

    /// Remove `sig`. Returns false for an invalid signal.
    pub fn remove(&mut self, sig: i32) -> bool {
        if !valid_signal(sig) {
            return false;
        }
        self.0 &= !(1u64 << (sig - 1));
        true
    }

    /// Membership test. Invalid signals are never members.
    #[must_use]
    pub const fn contains(self, sig: i32) -> bool {
        valid_signal(sig) && (self.0 & (1u64 << (sig - 1))) != 0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate member signal numbers in ascending order.
    pub fn iter(self) -> impl Iterator<Item = i32> {
        (1..=MAX_SIGNAL).filter(move |&sig| self.contains(sig))
    }
}

impl FromIterator<i32> for SigSet {
    fn from_iter<T: IntoIterator<Item = i32>>(iter: T) -> Self {
        let mut set = Self::EMPTY;
        for sig in iter {
            set.insert(sig);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_signal_range() {
        assert!(!valid_signal(0));
        assert!(valid_signal(1));
        assert!(valid_signal(64));
        assert!(!valid_signal(65));
        assert!(!valid_signal(-1));
    }

    #[test]
    fn kill_and_stop_are_not_catchable() {
        assert!(!catchable_signal(SIGKILL));
        assert!(!catchable_signal(SIGSTOP));
        assert!(catchable_signal(SIGTERM));
    }

    #[test]
    fn disposition_from_handler_value() {
        assert_eq!(Disposition::from_handler(0), Disposition::Default);
        assert_eq!(Disposition::from_handler(1), Disposition::Ignore);
        assert_eq!(Disposition::from_handler(0x5555_0000), Disposition::Caught);
    }

    #[test]
    fn insert_and_membership() {
        let mut set = SigSet::EMPTY;
        assert!(set.insert(SIGTERM));
        assert!(set.insert(MAX_SIGNAL));
        assert!(!set.insert(0));
        assert!(!set.insert(65));
        assert!(set.contains(SIGTERM));
        assert!(set.contains(MAX_SIGNAL));
        assert!(!set.contains(SIGINT));
        assert_eq!(set.bits(), (1 << 14) | (1 << 63));
        assert!(set.remove(SIGTERM));
        assert!(!set.contains(SIGTERM));
    }

    #[test]
    fn iter_is_ascending() {
        let set: SigSet = [SIGTERM, SIGHUP, SIGUSR1].into_iter().collect();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![SIGHUP, SIGUSR1, SIGTERM]);
    }
}
