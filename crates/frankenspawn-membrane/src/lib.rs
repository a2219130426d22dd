//! Safety membrane for FrankenSpawn.
//!
//! Sits between the `extern "C"` spawn entry points and the safe core. The
//! membrane owns everything that is process-global rather than per-spawn:
//!
//! - **Configuration** (`config`): runtime mode from `FRANKENSPAWN_MODE`
//! - **Self-healing engine** (`heal`): deterministic repairs in hardened mode
//! - **Handle registry** (`registry`): live attribute / file-action handles
//! - **Metrics** (`metrics`): atomic counters for observability

#![deny(unsafe_code)]

pub mod config;
pub mod heal;
pub mod metrics;
pub mod registry;

pub use config::SafetyLevel;
pub use heal::{HealingAction, HealingPolicy};
pub use metrics::SpawnMetrics;
pub use registry::{HandleKind, HandleRegistry, HandleState};
