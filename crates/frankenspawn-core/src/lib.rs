//! # frankenspawn-core
//!
//! Safe Rust implementation of the `posix_spawn` family.
//!
//! This crate owns the data model (spawn attributes, file-action lists, signal
//! sets) and the child-side setup sequence. Every OS call the child makes goes
//! through the [`spawn::ChildOps`] trait, so the ordering and failure rules can
//! be exercised without creating processes. The ABI crate supplies the real
//! syscall-backed implementation. No `unsafe` code is permitted here.

#![deny(unsafe_code)]

pub mod errno;
pub mod process;
pub mod signal;
pub mod spawn;
