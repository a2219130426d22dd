// All extern "C" ABI exports accept raw pointers from C callers; the membrane
// validates handles at runtime, so per-function safety docs would be boilerplate.
#![allow(clippy::missing_safety_doc)]
//! # frankenspawn-abi
//!
//! ABI-compatible extern "C" boundary for the `<spawn.h>` family.
//!
//! ```text
//! C caller -> ABI entry (this crate) -> membrane (mode, handle registry)
//!          -> core (attributes, file actions, child sequence) -> orchestrator
//! ```
//!
//! Entry points are exported unmangled only in release builds. Debug builds
//! keep the Rust names so the test binaries still link against the host libc.

mod handle;
mod runtime_policy;

pub mod command;
pub mod host_ops;
pub mod orchestrator;
pub mod spawn_abi;
pub mod spawn_attr_abi;
pub mod spawn_file_actions_abi;

pub use command::{SpawnRequest, admit_spawn_flags, wait_for_exit};
pub use orchestrator::ExecFn;
