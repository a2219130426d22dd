//! Runtime mode configuration.
//!
//! The runtime mode is set via the `FRANKENSPAWN_MODE` environment variable:
//! - `strict` (default): POSIX `posix_spawn` semantics. Invalid builder input
//!   is rejected with the errno a conformant libc returns, and a child that
//!   fails before `exec` is only observable through exit status 127.
//! - `hardened`: repair mode. Unknown spawn flag bits are masked off instead of
//!   rejected, destroying a handle we never issued is ignored, and the child
//!   reports setup failures back to the parent over a close-on-exec pipe.
//! - `off`: No handle validation. Pure passthrough for benchmarking baseline only.

use std::sync::atomic::{AtomicU8, Ordering};

/// Name of the environment variable that selects the runtime mode.
pub const MODE_ENV_VAR: &str = "FRANKENSPAWN_MODE";

/// Runtime operating mode for the membrane.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SafetyLevel {
    /// Strict POSIX behavior. Handles are validated, invalid input produces
    /// the POSIX error return, child failures surface only as exit 127.
    #[default]
    Strict,
    /// Hardened mode. Deterministic healing for invalid builder input and a
    /// child-to-parent error channel for pre-exec failures.
    Hardened,
    /// No validation. Pure passthrough for benchmarking baseline.
    Off,
}

impl SafetyLevel {
    /// Parse from string (case-insensitive).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "strict" | "default" | "abi" => Self::Strict,
            "hardened" | "repair" | "tsm" | "full" => Self::Hardened,
            "off" | "none" | "disabled" => Self::Off,
            _ => Self::Strict,
        }
    }

    /// Stable lowercase name, as written to structured logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Hardened => "hardened",
            Self::Off => "off",
        }
    }

    /// Returns true if the membrane should apply healing actions.
    #[must_use]
    pub const fn heals_enabled(self) -> bool {
        matches!(self, Self::Hardened)
    }

    /// Returns true if handle validation is active.
    #[must_use]
    pub const fn validation_enabled(self) -> bool {
        !matches!(self, Self::Off)
    }

    /// Returns true if children should report pre-exec failures to the parent.
    #[must_use]
    pub const fn reports_child_errors(self) -> bool {
        matches!(self, Self::Hardened)
    }
}

// Atomic cache: 0=unresolved, 1=Strict, 2=Hardened, 3=Off, 255=resolving.
static CACHED_LEVEL: AtomicU8 = AtomicU8::new(0);

const LEVEL_UNRESOLVED: u8 = 0;
const LEVEL_STRICT: u8 = 1;
const LEVEL_HARDENED: u8 = 2;
const LEVEL_OFF: u8 = 3;
const LEVEL_RESOLVING: u8 = 255;

fn parse_runtime_mode_env(raw: &str) -> SafetyLevel {
    match raw.to_ascii_lowercase().as_str() {
        "strict" | "default" | "abi" => SafetyLevel::Strict,
        "hardened" | "repair" | "tsm" | "full" => SafetyLevel::Hardened,
        // Env contract is strict|hardened only. `Off` stays reachable through
        // `override_safety_level` for benchmarks.
        _ => SafetyLevel::Strict,
    }
}

fn level_to_u8(level: SafetyLevel) -> u8 {
    match level {
        SafetyLevel::Strict => LEVEL_STRICT,
        SafetyLevel::Hardened => LEVEL_HARDENED,
        SafetyLevel::Off => LEVEL_OFF,
    }
}

fn u8_to_level(v: u8) -> SafetyLevel {
    match v {
        LEVEL_HARDENED => SafetyLevel::Hardened,
        LEVEL_OFF => SafetyLevel::Off,
        _ => SafetyLevel::Strict,
    }
}

/// Get the configured safety level (reads env var on first call, caches thereafter).
///
/// A call that races with the first resolution sees `Strict`.
#[must_use]
pub fn safety_level() -> SafetyLevel {
    let cached = CACHED_LEVEL.load(Ordering::Relaxed);

    if cached != LEVEL_UNRESOLVED && cached != LEVEL_RESOLVING {
        return u8_to_level(cached);
    }

    if cached == LEVEL_RESOLVING {
        return SafetyLevel::Strict;
    }

    if CACHED_LEVEL
        .compare_exchange(
            LEVEL_UNRESOLVED,
            LEVEL_RESOLVING,
            Ordering::SeqCst,
            Ordering::Relaxed,
        )
        .is_err()
    {
        let v = CACHED_LEVEL.load(Ordering::Relaxed);
        return if v != LEVEL_UNRESOLVED && v != LEVEL_RESOLVING {
            u8_to_level(v)
        } else {
            SafetyLevel::Strict
        };
    }

    let level = std::env::var(MODE_ENV_VAR)
        .map(|v| parse_runtime_mode_env(&v))
        .unwrap_or_default();
    CACHED_LEVEL.store(level_to_u8(level), Ordering::Release);
    level
}

/// Pin the runtime mode for the rest of the process, bypassing the env var.
///
/// Returns the previously cached level (`Strict` if none was resolved yet).
/// Used by the harness `--mode` switch and by tests.
pub fn override_safety_level(level: SafetyLevel) -> SafetyLevel {
    let previous = CACHED_LEVEL.swap(level_to_u8(level), Ordering::SeqCst);
    u8_to_level(previous)
}
