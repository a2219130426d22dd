//! Fork strategy selection.

use super::flags::SpawnFlags;

/// How the child process is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForkStrategy {
    /// Full copy-on-write fork.
    Fork,
    /// Shared address space, parent suspended until the child execs or exits.
    Vfork,
}

impl ForkStrategy {
    /// vfork when explicitly requested, or when the child has nothing to do
    /// besides exec (no file actions and no flags). Everything else forks.
    #[must_use]
    pub const fn select(flags: SpawnFlags, has_file_actions: bool) -> Self {
        if flags.contains(SpawnFlags::USEVFORK) || (!has_file_actions && flags.is_empty()) {
            Self::Vfork
        } else {
            Self::Fork
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fork => "fork",
            Self::Vfork => "vfork",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_spawn_uses_vfork() {
        assert_eq!(ForkStrategy::select(SpawnFlags::EMPTY, false), ForkStrategy::Vfork);
    }

    #[test]
    fn file_actions_or_any_flag_force_fork() {
        assert_eq!(ForkStrategy::select(SpawnFlags::EMPTY, true), ForkStrategy::Fork);
        assert_eq!(ForkStrategy::select(SpawnFlags::SETSID, false), ForkStrategy::Fork);
        assert_eq!(
            ForkStrategy::select(SpawnFlags::SETSIGMASK | SpawnFlags::RESETIDS, false),
            ForkStrategy::Fork
        );
    }

    #[test]
    fn explicit_usevfork_always_wins() {
        assert_eq!(ForkStrategy::select(SpawnFlags::USEVFORK, true), ForkStrategy::Vfork);
        assert_eq!(
            ForkStrategy::select(SpawnFlags::USEVFORK | SpawnFlags::SETPGROUP, true),
            ForkStrategy::Vfork
        );
    }

    #[test]
    fn every_flag_combination() {
        for bits in 0..=0xffi16 {
            let flags = SpawnFlags::from_bits_truncate(bits);
            for has_actions in [false, true] {
                let expected = bits & 0x40 != 0 || (bits == 0 && !has_actions);
                assert_eq!(
                    ForkStrategy::select(flags, has_actions) == ForkStrategy::Vfork,
                    expected,
                    "flags={bits:#x} actions={has_actions}"
                );
            }
        }
    }

    #[test]
    fn names() {
        assert_eq!(ForkStrategy::Fork.as_str(), "fork");
        assert_eq!(ForkStrategy::Vfork.as_str(), "vfork");
    }
}
