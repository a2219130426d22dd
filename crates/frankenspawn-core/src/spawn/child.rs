//! Child-side setup: attribute application, file-action replay, exec.
//!
//! Everything here runs in the freshly created child, possibly sharing the
//! parent's address space. The code therefore never allocates, never takes a
//! lock, and reaches the kernel only through a [`ChildOps`] implementation.
//! The first failing step is returned as a [`ChildFailure`]; the caller turns
//! it into exit status 127.

use std::ffi::CStr;

use super::attr::{SchedParam, SpawnAttributes};
use super::file_actions::{FileAction, FileActionList};
use super::flags::SpawnFlags;
use crate::signal::{Disposition, MAX_SIGNAL, SigSet, catchable_signal};

/// Operating-system calls the child performs. Errors are positive errno values.
pub trait ChildOps {
    fn signal_disposition(&mut self, sig: i32) -> Result<Disposition, i32>;
    fn set_default_disposition(&mut self, sig: i32) -> Result<(), i32>;
    fn set_process_group(&mut self, pgroup: i32) -> Result<(), i32>;
    fn create_session(&mut self) -> Result<(), i32>;
    fn set_scheduler(&mut self, policy: i32, param: SchedParam) -> Result<(), i32>;
    fn set_sched_param(&mut self, param: SchedParam) -> Result<(), i32>;
    fn reset_effective_uid(&mut self) -> Result<(), i32>;
    fn reset_effective_gid(&mut self) -> Result<(), i32>;
    fn set_signal_mask(&mut self, mask: SigSet) -> Result<(), i32>;
    /// Returns the descriptor the kernel picked.
    fn open(&mut self, path: &CStr, flags: i32, mode: u32) -> Result<i32, i32>;
    fn close(&mut self, fd: i32) -> Result<(), i32>;
    fn dup2(&mut self, fd: i32, new_fd: i32) -> Result<(), i32>;
    fn clear_cloexec(&mut self, fd: i32) -> Result<(), i32>;
    fn chdir(&mut self, path: &CStr) -> Result<(), i32>;
    fn fchdir(&mut self, fd: i32) -> Result<(), i32>;
    /// Reinstall the mask that was in effect before the spawn blocked signals.
    fn restore_signal_mask(&mut self);
    /// Replace the process image. Only returns on failure, with the errno.
    fn exec(&mut self) -> i32;
}

/// Which child-side step failed.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildStep {
    SignalDefaults = 1,
    ProcessGroup = 2,
    Session = 3,
    Scheduler = 4,
    ResetIds = 5,
    SignalMask = 6,
    FileOpen = 7,
    FileDup2 = 8,
    FileChdir = 9,
    FileFchdir = 10,
    Exec = 11,
}

impl ChildStep {
    #[must_use]
    pub const fn from_u32(raw: u32) -> Option<Self> {
        Some(match raw {
            1 => Self::SignalDefaults,
            2 => Self::ProcessGroup,
            3 => Self::Session,
            4 => Self::Scheduler,
            5 => Self::ResetIds,
            6 => Self::SignalMask,
            7 => Self::FileOpen,
            8 => Self::FileDup2,
            9 => Self::FileChdir,
            10 => Self::FileFchdir,
            11 => Self::Exec,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SignalDefaults => "signal_defaults",
            Self::ProcessGroup => "process_group",
            Self::Session => "session",
            Self::Scheduler => "scheduler",
            Self::ResetIds => "reset_ids",
            Self::SignalMask => "signal_mask",
            Self::FileOpen => "file_open",
            Self::FileDup2 => "file_dup2",
            Self::FileChdir => "file_chdir",
            Self::FileFchdir => "file_fchdir",
            Self::Exec => "exec",
        }
    }
}

/// First failing child step and its errno.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildFailure {
    pub step: ChildStep,
    pub errno: i32,
}

impl ChildFailure {
    /// Size of the wire record written to the report channel.
    pub const WIRE_SIZE: usize = 8;

    #[must_use]
    pub const fn new(step: ChildStep, errno: i32) -> Self {
        Self { step, errno }
    }

    /// Encode as `step: u32 LE` followed by `errno: i32 LE`.
    #[must_use]
    pub fn to_bytes(self) -> [u8; Self::WIRE_SIZE] {
        let mut out = [0u8; Self::WIRE_SIZE];
        out[..4].copy_from_slice(&(self.step as u32).to_le_bytes());
        out[4..].copy_from_slice(&self.errno.to_le_bytes());
        out
    }

    /// Decode a wire record; `None` for an unknown step.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; Self::WIRE_SIZE]) -> Option<Self> {
        let step = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let errno = i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        ChildStep::from_u32(step).map(|step| Self { step, errno })
    }
}

fn at<T>(step: ChildStep, result: Result<T, i32>) -> Result<T, ChildFailure> {
    result.map_err(|errno| ChildFailure::new(step, errno))
}

/// Apply spawn attributes in the fixed order: signal dispositions, process
/// group, session, scheduling, id reset, signal mask.
///
/// `None` behaves like zeroed attributes: only caught signals are reset.
pub fn apply_attributes<O: ChildOps + ?Sized>(
    ops: &mut O,
    attrs: Option<&SpawnAttributes>,
) -> Result<(), ChildFailure> {
    let attrs = attrs.copied().unwrap_or_default();
    let flags = attrs.flags();

    let defaults = if flags.contains(SpawnFlags::SETSIGDEF) {
        attrs.signal_defaults()
    } else {
        SigSet::EMPTY
    };
    for sig in 1..=MAX_SIGNAL {
        // SIGKILL and SIGSTOP are always default; sigaction rejects them.
        if !catchable_signal(sig) {
            continue;
        }
        let reset = defaults.contains(sig)
            || at(ChildStep::SignalDefaults, ops.signal_disposition(sig))?
                == Disposition::Caught;
        if reset {
            at(ChildStep::SignalDefaults, ops.set_default_disposition(sig))?;
        }
    }

    if flags.contains(SpawnFlags::SETPGROUP) {
        at(
            ChildStep::ProcessGroup,
            ops.set_process_group(attrs.process_group()),
        )?;
    }

    if flags.contains(SpawnFlags::SETSID) {
        at(ChildStep::Session, ops.create_session())?;
    }

    if flags.contains(SpawnFlags::SETSCHEDULER) {
        at(
            ChildStep::Scheduler,
            ops.set_scheduler(attrs.sched_policy(), attrs.sched_param()),
        )?;
    } else if flags.contains(SpawnFlags::SETSCHEDPARAM) {
        at(ChildStep::Scheduler, ops.set_sched_param(attrs.sched_param()))?;
    }

    if flags.contains(SpawnFlags::RESETIDS) {
        at(ChildStep::ResetIds, ops.reset_effective_uid())?;
        at(ChildStep::ResetIds, ops.reset_effective_gid())?;
    }

    if flags.contains(SpawnFlags::SETSIGMASK) {
        at(ChildStep::SignalMask, ops.set_signal_mask(attrs.signal_mask()))?;
    }

    Ok(())
}

/// Replay file actions in insertion order, stopping at the first failure.
/// Close failures are ignored.
pub fn replay_file_actions<O: ChildOps + ?Sized>(
    ops: &mut O,
    actions: Option<&FileActionList>,
) -> Result<(), ChildFailure> {
    let Some(actions) = actions else {
        return Ok(());
    };
    for action in actions {
        match action {
            FileAction::Open {
                fd,
                path,
                flags,
                mode,
            } => {
                let opened = at(ChildStep::FileOpen, ops.open(path, *flags, *mode))?;
                if opened != *fd {
                    at(ChildStep::FileOpen, ops.dup2(opened, *fd))?;
                    let _ = ops.close(opened);
                }
            }
            FileAction::Close { fd } => {
                let _ = ops.close(*fd);
            }
            FileAction::Dup2 { fd, new_fd } => {
                if fd == new_fd {
                    at(ChildStep::FileDup2, ops.clear_cloexec(*fd))?;
                } else {
                    at(ChildStep::FileDup2, ops.dup2(*fd, *new_fd))?;
                }
            }
            FileAction::Chdir { path } => {
                at(ChildStep::FileChdir, ops.chdir(path))?;
            }
            FileAction::Fchdir { fd } => {
                at(ChildStep::FileFchdir, ops.fchdir(*fd))?;
            }
        }
    }
    Ok(())
}

/// Full child sequence. Returns only if something failed, including exec.
pub fn run_child<O: ChildOps + ?Sized>(
    ops: &mut O,
    attrs: Option<&SpawnAttributes>,
    actions: Option<&FileActionList>,
) -> ChildFailure {
    if let Err(failure) = apply_attributes(ops, attrs) {
        return failure;
    }
    if let Err(failure) = replay_file_actions(ops, actions) {
        return failure;
    }
    let keeps_mask = attrs.is_some_and(|a| a.flags().contains(SpawnFlags::SETSIGMASK));
    if !keeps_mask {
        ops.restore_signal_mask();
    }
    ChildFailure::new(ChildStep::Exec, ops.exec())
}
