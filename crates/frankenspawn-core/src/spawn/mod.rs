//! POSIX process spawning.
//!
//! Implements the safe half of `<spawn.h>`: the attribute and file-action
//! builders, the fork/vfork decision, and the ordered child setup sequence
//! that runs between fork and `exec`.
//!
//! # Child setup order
//!
//! ```text
//! signal dispositions -> setpgid -> setsid -> scheduler -> reset ids
//!   -> signal mask -> file actions -> (restore mask) -> exec
//! ```
//!
//! Any failure in that sequence is terminal for the child; see
//! [`crate::process::CHILD_FAILURE_STATUS`].

pub mod attr;
pub mod child;
pub mod error;
pub mod file_actions;
pub mod flags;
pub mod strategy;

pub use attr::{SchedParam, SpawnAttributes};
pub use child::{
    ChildFailure, ChildOps, ChildStep, apply_attributes, replay_file_actions, run_child,
};
pub use error::SpawnError;
pub use file_actions::{FileAction, FileActionKind, FileActionList};
pub use flags::SpawnFlags;
pub use strategy::ForkStrategy;
