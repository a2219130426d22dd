//! `posix_spawnattr_setflags` flag word.

use super::error::SpawnError;

/// Reset effective uid/gid to the real ids in the child.
pub const POSIX_SPAWN_RESETIDS: i16 = 0x01;
/// Move the child into the `pgroup` attribute's process group.
pub const POSIX_SPAWN_SETPGROUP: i16 = 0x02;
/// Force signals in the `sigdefault` attribute to `SIG_DFL`.
pub const POSIX_SPAWN_SETSIGDEF: i16 = 0x04;
/// Install the `sigmask` attribute as the child's signal mask.
pub const POSIX_SPAWN_SETSIGMASK: i16 = 0x08;
/// Apply the `schedparam` attribute, keeping the current policy.
pub const POSIX_SPAWN_SETSCHEDPARAM: i16 = 0x10;
/// Apply the `schedpolicy` and `schedparam` attributes.
pub const POSIX_SPAWN_SETSCHEDULER: i16 = 0x20;
/// Create the child with vfork semantics.
pub const POSIX_SPAWN_USEVFORK: i16 = 0x40;
/// Make the child a session leader.
pub const POSIX_SPAWN_SETSID: i16 = 0x80;

/// Every recognized flag bit.
pub const POSIX_SPAWN_FLAGS_MASK: i16 = POSIX_SPAWN_RESETIDS
    | POSIX_SPAWN_SETPGROUP
    | POSIX_SPAWN_SETSIGDEF
    | POSIX_SPAWN_SETSIGMASK
    | POSIX_SPAWN_SETSCHEDPARAM
    | POSIX_SPAWN_SETSCHEDULER
    | POSIX_SPAWN_USEVFORK
    | POSIX_SPAWN_SETSID;

/// Returns true if `flags` contains only recognized bits.
#[must_use]
pub const fn valid_spawn_flags(flags: i16) -> bool {
    (flags & !POSIX_SPAWN_FLAGS_MASK) == 0
}

/// Mask `flags` down to recognized bits.
#[must_use]
pub const fn sanitize_spawn_flags(flags: i16) -> i16 {
    flags & POSIX_SPAWN_FLAGS_MASK
}

/// A validated spawn flag word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SpawnFlags(i16);

impl SpawnFlags {
    pub const EMPTY: Self = Self(0);
    pub const RESETIDS: Self = Self(POSIX_SPAWN_RESETIDS);
    pub const SETPGROUP: Self = Self(POSIX_SPAWN_SETPGROUP);
    pub const SETSIGDEF: Self = Self(POSIX_SPAWN_SETSIGDEF);
    pub const SETSIGMASK: Self = Self(POSIX_SPAWN_SETSIGMASK);
    pub const SETSCHEDPARAM: Self = Self(POSIX_SPAWN_SETSCHEDPARAM);
    pub const SETSCHEDULER: Self = Self(POSIX_SPAWN_SETSCHEDULER);
    pub const USEVFORK: Self = Self(POSIX_SPAWN_USEVFORK);
    pub const SETSID: Self = Self(POSIX_SPAWN_SETSID);

    /// Validate a raw flag word.
    pub const fn from_bits(bits: i16) -> Result<Self, SpawnError> {
        if valid_spawn_flags(bits) {
            Ok(Self(bits))
        } else {
            Err(SpawnError::InvalidArgument)
        }
    }

    /// Keep only recognized bits.
    #[must_use]
    pub const fn from_bits_truncate(bits: i16) -> Self {
        Self(sanitize_spawn_flags(bits))
    }

    #[must_use]
    pub const fn bits(self) -> i16 {
        self.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOr for SpawnFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_covers_eight_bits() {
        assert_eq!(POSIX_SPAWN_FLAGS_MASK, 0xff);
    }

    #[test]
    fn valid_flags_check() {
        assert!(valid_spawn_flags(0));
        assert!(valid_spawn_flags(POSIX_SPAWN_SETSID | POSIX_SPAWN_USEVFORK));
        assert!(!valid_spawn_flags(0x100));
        assert!(!valid_spawn_flags(-1));
    }

    #[test]
    fn from_bits_rejects_unknown() {
        assert_eq!(SpawnFlags::from_bits(0x100), Err(SpawnError::InvalidArgument));
        assert_eq!(
            SpawnFlags::from_bits(POSIX_SPAWN_SETPGROUP).map(SpawnFlags::bits),
            Ok(POSIX_SPAWN_SETPGROUP)
        );
    }

    #[test]
    fn truncate_strips_unknown_bits() {
        assert_eq!(SpawnFlags::from_bits_truncate(0x1ff).bits(), 0xff);
        assert_eq!(sanitize_spawn_flags(0x0300), 0);
    }

    #[test]
    fn contains_and_union() {
        let flags = SpawnFlags::SETSCHEDULER | SpawnFlags::SETSCHEDPARAM;
        assert!(flags.contains(SpawnFlags::SETSCHEDULER));
        assert!(flags.contains(SpawnFlags::SETSCHEDPARAM));
        assert!(!flags.contains(SpawnFlags::USEVFORK));
        assert!(flags.contains(SpawnFlags::EMPTY));
        assert!(SpawnFlags::EMPTY.is_empty());
    }
}
