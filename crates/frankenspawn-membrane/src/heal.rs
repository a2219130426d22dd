//! Self-healing policy engine.
//!
//! In hardened mode the membrane repairs invalid spawn builder input instead of
//! rejecting it. Every repair is deterministic and counted.

use std::sync::atomic::{AtomicU64, Ordering};

/// Actions the membrane can take to heal an unsafe operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealingAction {
    /// Mask unrecognized bits out of a spawn flag word.
    SanitizeFlags { requested: u16, sanitized: u16 },
    /// Silently ignore a destroy of a handle that is not live.
    IgnoreForeignDestroy,
    /// Surface a child's pre-exec failure to the parent as an errno.
    ReportChildFailure { errno: i32 },
    /// No healing needed; operation is valid.
    None,
}

impl HealingAction {
    /// Returns true if this action represents an actual healing (not None).
    #[must_use]
    pub const fn is_heal(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Stable name used by structured logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SanitizeFlags { .. } => "SanitizeFlags",
            Self::IgnoreForeignDestroy => "IgnoreForeignDestroy",
            Self::ReportChildFailure { .. } => "ReportChildFailure",
            Self::None => "None",
        }
    }
}

/// Policy engine that decides and counts healing actions.
pub struct HealingPolicy {
    /// Total heals applied.
    pub total_heals: AtomicU64,
    /// Flag words sanitized.
    pub flag_sanitizations: AtomicU64,
    /// Foreign destroys ignored.
    pub foreign_destroys: AtomicU64,
    /// Child failures reported to the parent.
    pub child_reports: AtomicU64,
}

impl HealingPolicy {
    /// Create a new policy with zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            total_heals: AtomicU64::new(0),
            flag_sanitizations: AtomicU64::new(0),
            foreign_destroys: AtomicU64::new(0),
            child_reports: AtomicU64::new(0),
        }
    }

    /// Record a healing action.
    pub fn record(&self, action: &HealingAction) {
        if action.is_heal() {
            self.total_heals.fetch_add(1, Ordering::Relaxed);
        }

        match action {
            HealingAction::SanitizeFlags { .. } => {
                self.flag_sanitizations.fetch_add(1, Ordering::Relaxed);
            }
            HealingAction::IgnoreForeignDestroy => {
                self.foreign_destroys.fetch_add(1, Ordering::Relaxed);
            }
            HealingAction::ReportChildFailure { .. } => {
                self.child_reports.fetch_add(1, Ordering::Relaxed);
            }
            HealingAction::None => {}
        }
    }

    /// Decide healing for a spawn flag word against the recognized mask.
    #[must_use]
    pub fn heal_flags(&self, requested: u16, recognized_mask: u16) -> HealingAction {
        let sanitized = requested & recognized_mask;
        if sanitized == requested {
            HealingAction::None
        } else {
            HealingAction::SanitizeFlags {
                requested,
                sanitized,
            }
        }
    }
}

impl Default for HealingPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Global healing policy instance.
static GLOBAL_POLICY: HealingPolicy = HealingPolicy::new();

/// Access the global healing policy.
#[must_use]
pub fn global_healing_policy() -> &'static HealingPolicy {
    &GLOBAL_POLICY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_when_unknown_bits_present() {
        let policy = HealingPolicy::new();
        let action = policy.heal_flags(0x1ff, 0xff);
        assert_eq!(
            action,
            HealingAction::SanitizeFlags {
                requested: 0x1ff,
                sanitized: 0xff
            }
        );
    }

    #[test]
    fn no_heal_for_recognized_flags() {
        let policy = HealingPolicy::new();
        assert_eq!(policy.heal_flags(0x42, 0xff), HealingAction::None);
        assert_eq!(policy.heal_flags(0, 0xff), HealingAction::None);
    }

    #[test]
    fn record_increments_counters() {
        let policy = HealingPolicy::new();
        policy.record(&HealingAction::IgnoreForeignDestroy);
        policy.record(&HealingAction::IgnoreForeignDestroy);
        policy.record(&HealingAction::SanitizeFlags {
            requested: 0x100,
            sanitized: 0,
        });
        policy.record(&HealingAction::ReportChildFailure { errno: 2 });
        policy.record(&HealingAction::None);

        assert_eq!(policy.total_heals.load(Ordering::Relaxed), 4);
        assert_eq!(policy.foreign_destroys.load(Ordering::Relaxed), 2);
        assert_eq!(policy.flag_sanitizations.load(Ordering::Relaxed), 1);
        assert_eq!(policy.child_reports.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn none_is_not_a_heal() {
        assert!(!HealingAction::None.is_heal());
        assert!(HealingAction::IgnoreForeignDestroy.is_heal());
        assert_eq!(HealingAction::None.name(), "None");
    }
}
