//! Runtime policy bridge for ABI entrypoints.
//!
//! Centralizes membrane access so ABI functions get the mode, handle
//! verdicts, and counters through one place instead of each reaching into
//! the membrane on its own.

use std::ffi::c_int;

use frankenspawn_core::errno;
use frankenspawn_core::spawn::ForkStrategy;
use frankenspawn_core::spawn::flags::{POSIX_SPAWN_FLAGS_MASK, sanitize_spawn_flags};
use frankenspawn_membrane::config::{SafetyLevel, safety_level};
use frankenspawn_membrane::heal::{HealingAction, global_healing_policy};
use frankenspawn_membrane::metrics::{SpawnMetrics, global_metrics};
use frankenspawn_membrane::registry::{HandleKind, HandleState, global_registry};

#[inline]
pub(crate) fn mode() -> SafetyLevel {
    safety_level()
}

/// Verdict on a handle payload address before it is dereferenced.
pub(crate) fn check_handle(mode: SafetyLevel, addr: usize, kind: HandleKind) -> Result<(), c_int> {
    if !mode.validation_enabled() || global_registry().is_live(addr, kind) {
        return Ok(());
    }
    SpawnMetrics::inc(&global_metrics().handle_rejections);
    Err(errno::EINVAL)
}

pub(crate) fn register_handle(addr: usize, kind: HandleKind) {
    global_registry().register(addr, kind);
}

/// Outcome of a destroy request against the registry.
pub(crate) enum DestroyVerdict {
    /// Free the payload.
    Release,
    /// Leave the payload alone and report success.
    Ignore,
    /// Leave the payload alone and fail with this errno.
    Reject(c_int),
}

pub(crate) fn retire_handle(mode: SafetyLevel, addr: usize, kind: HandleKind) -> DestroyVerdict {
    let previous = global_registry().retire(addr, kind);
    if previous == HandleState::Live || !mode.validation_enabled() {
        return DestroyVerdict::Release;
    }
    if mode.heals_enabled() {
        global_healing_policy().record(&HealingAction::IgnoreForeignDestroy);
        return DestroyVerdict::Ignore;
    }
    SpawnMetrics::inc(&global_metrics().handle_rejections);
    DestroyVerdict::Reject(errno::EINVAL)
}

/// Resolve a caller flag word. Hardened mode masks unknown bits instead of
/// rejecting them.
pub(crate) fn admit_flags(mode: SafetyLevel, bits: i16) -> i16 {
    if !mode.heals_enabled() {
        return bits;
    }
    let action = global_healing_policy().heal_flags(bits as u16, POSIX_SPAWN_FLAGS_MASK as u16);
    if action.is_heal() {
        global_healing_policy().record(&action);
        return sanitize_spawn_flags(bits);
    }
    bits
}

pub(crate) fn note_validation_failure() {
    SpawnMetrics::inc(&global_metrics().validation_failures);
}

pub(crate) fn observe_spawn(strategy: ForkStrategy) {
    let metrics = global_metrics();
    SpawnMetrics::inc(&metrics.spawns);
    match strategy {
        ForkStrategy::Fork => SpawnMetrics::inc(&metrics.forks),
        ForkStrategy::Vfork => SpawnMetrics::inc(&metrics.vforks),
    }
}

pub(crate) fn observe_fork_failure() {
    SpawnMetrics::inc(&global_metrics().fork_failures);
}

pub(crate) fn observe_child_report(errno: i32) {
    SpawnMetrics::inc(&global_metrics().child_failures_reported);
    global_healing_policy().record(&HealingAction::ReportChildFailure { errno });
}
