//! Verification harness for FrankenSpawn.
//!
//! This crate provides:
//! - Fixtures: JSON descriptions of spawn cases and their expected outcome
//! - Runner: executes fixtures through the spawn engine in a chosen mode
//! - Structured logging: JSONL evidence records plus a SHA-256 artifact index

#![forbid(unsafe_code)]

pub mod error;
pub mod fixtures;
pub mod runner;
pub mod structured_log;
pub mod verify;

pub use error::HarnessError;
pub use fixtures::{FixtureCase, FixtureFileAction, FixtureSet};
pub use runner::TestRunner;
pub use verify::{VerificationResult, VerificationSummary};
