//! Spawn attributes (`posix_spawnattr_t` payload).
//!
//! A plain value type: setting a field never sets the flag that makes the
//! child act on it. Only [`SpawnAttributes::set_flags`] validates its input.

use super::error::SpawnError;
use super::flags::SpawnFlags;
use crate::signal::SigSet;

/// `SCHED_OTHER` scheduling policy.
pub const SCHED_OTHER: i32 = 0;
/// `SCHED_FIFO` scheduling policy.
pub const SCHED_FIFO: i32 = 1;
/// `SCHED_RR` scheduling policy.
pub const SCHED_RR: i32 = 2;

/// Scheduling parameters (`struct sched_param`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SchedParam {
    pub priority: i32,
}

impl SchedParam {
    #[must_use]
    pub const fn new(priority: i32) -> Self {
        Self { priority }
    }
}

/// Child-side configuration for one spawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpawnAttributes {
    flags: SpawnFlags,
    process_group: i32,
    sched_param: SchedParam,
    sched_policy: i32,
    signal_mask: SigSet,
    signal_defaults: SigSet,
}

impl SpawnAttributes {
    /// Zero-initialized attributes: no flags, every value zero/empty.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            flags: SpawnFlags::EMPTY,
            process_group: 0,
            sched_param: SchedParam { priority: 0 },
            sched_policy: 0,
            signal_mask: SigSet::EMPTY,
            signal_defaults: SigSet::EMPTY,
        }
    }

    #[must_use]
    pub const fn flags(&self) -> SpawnFlags {
        self.flags
    }

    /// Replace the flag word. Unknown bits fail with `InvalidArgument` and
    /// leave the stored flags unchanged.
    pub fn set_flags(&mut self, bits: i16) -> Result<(), SpawnError> {
        self.flags = SpawnFlags::from_bits(bits)?;
        Ok(())
    }

    #[must_use]
    pub const fn process_group(&self) -> i32 {
        self.process_group
    }

    pub fn set_process_group(&mut self, pgroup: i32) {
        self.process_group = pgroup;
    }

    #[must_use]
    pub const fn signal_mask(&self) -> SigSet {
        self.signal_mask
    }

    pub fn set_signal_mask(&mut self, mask: SigSet) {
        self.signal_mask = mask;
    }

    #[must_use]
    pub const fn signal_defaults(&self) -> SigSet {
        self.signal_defaults
    }

    pub fn set_signal_defaults(&mut self, set: SigSet) {
        self.signal_defaults = set;
    }

    #[must_use]
    pub const fn sched_policy(&self) -> i32 {
        self.sched_policy
    }

    pub fn set_sched_policy(&mut self, policy: i32) {
        self.sched_policy = policy;
    }

    #[must_use]
    pub const fn sched_param(&self) -> SchedParam {
        self.sched_param
    }

    pub fn set_sched_param(&mut self, param: SchedParam) {
        self.sched_param = param;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{SIGHUP, SIGTERM};
    use crate::spawn::flags::{POSIX_SPAWN_SETPGROUP, POSIX_SPAWN_SETSID};

    #[test]
    fn new_is_zeroed() {
        let attrs = SpawnAttributes::new();
        assert_eq!(attrs, SpawnAttributes::default());
        assert!(attrs.flags().is_empty());
        assert_eq!(attrs.process_group(), 0);
        assert!(attrs.signal_mask().is_empty());
    }

    #[test]
    fn set_flags_rejects_unknown_bits_without_mutation() {
        let mut attrs = SpawnAttributes::new();
        attrs.set_flags(POSIX_SPAWN_SETSID).unwrap();
        assert_eq!(attrs.set_flags(0x400), Err(SpawnError::InvalidArgument));
        assert_eq!(attrs.flags().bits(), POSIX_SPAWN_SETSID);
    }

    #[test]
    fn value_setters_do_not_touch_flags() {
        let mut attrs = SpawnAttributes::new();
        attrs.set_process_group(42);
        attrs.set_sched_policy(SCHED_FIFO);
        attrs.set_sched_param(SchedParam::new(10));
        attrs.set_signal_mask([SIGTERM].into_iter().collect());
        assert!(attrs.flags().is_empty());
        assert_eq!(attrs.process_group(), 42);
        assert_eq!(attrs.sched_policy(), SCHED_FIFO);
        assert_eq!(attrs.sched_param().priority, 10);
    }

    #[test]
    fn setters_overwrite() {
        let mut attrs = SpawnAttributes::new();
        attrs.set_flags(POSIX_SPAWN_SETPGROUP).unwrap();
        attrs.set_flags(0).unwrap();
        attrs.set_process_group(1);
        attrs.set_process_group(2);
        assert!(attrs.flags().is_empty());
        assert_eq!(attrs.process_group(), 2);
    }

    #[test]
    fn signal_sets_keep_realtime_signals() {
        let mut attrs = SpawnAttributes::new();
        attrs.set_signal_mask([SIGHUP, 40].into_iter().collect());
        assert!(attrs.signal_mask().contains(40));

        attrs.set_signal_mask([SIGTERM].into_iter().collect());
        assert!(attrs.signal_mask().contains(SIGTERM));
        assert!(!attrs.signal_mask().contains(40));

        attrs.set_signal_defaults(SigSet::from_bits(0b11));
        assert_eq!(attrs.signal_defaults().bits(), 0b11);
        assert!(attrs.signal_mask().contains(SIGTERM));
    }
}
