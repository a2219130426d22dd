//! Spawn orchestration: block signals, create the child, run the child
//! sequence, report back to the caller.
//!
//! ```text
//! Initial -> SignalsBlocked -> { Forked | ChildBranch | ForkFailed }
//! ```
//!
//! The parent's signal mask is restored on every exit path by
//! [`SignalBlockGuard`]. In hardened mode a close-on-exec pipe lets the child
//! report the first failing setup step; strict mode only ever sees exit 127.

use std::ffi::{c_char, c_int, c_void};

use frankenspawn_core::process::CHILD_FAILURE_STATUS;
use frankenspawn_core::signal::SigSet;
use frankenspawn_core::spawn::{
    ChildFailure, FileActionList, ForkStrategy, SpawnAttributes, SpawnError, SpawnFlags, run_child,
};
use frankenspawn_membrane::config::SafetyLevel;

use crate::host_ops::{ExecTarget, HostChildOps, set_thread_mask};
use crate::runtime_policy;

/// `execve`-shaped program loader: exact path for `posix_spawn`, `PATH`
/// search for `posix_spawnp`.
pub type ExecFn =
    unsafe extern "C" fn(*const c_char, *const *const c_char, *const *const c_char) -> c_int;

/// Stack size for the shared-address-space child.
const VFORK_STACK_SIZE: usize = 256 * 1024;

/// Everything one spawn needs, borrowed from the caller.
pub struct SpawnPlan<'a> {
    pub target: ExecTarget,
    pub attrs: Option<&'a SpawnAttributes>,
    pub actions: Option<&'a FileActionList>,
}

impl SpawnPlan<'_> {
    #[must_use]
    pub fn flags(&self) -> SpawnFlags {
        self.attrs.map_or(SpawnFlags::EMPTY, SpawnAttributes::flags)
    }

    #[must_use]
    pub fn strategy(&self) -> ForkStrategy {
        ForkStrategy::select(self.flags(), self.actions.is_some())
    }
}

/// Blocks every signal for its lifetime; restores the previous mask on drop.
pub struct SignalBlockGuard {
    previous: SigSet,
}

impl SignalBlockGuard {
    pub fn block_all() -> Result<Self, SpawnError> {
        let previous = set_thread_mask(SigSet::FULL.bits()).map_err(SpawnError::Os)?;
        Ok(Self {
            previous: SigSet::from_bits(previous),
        })
    }

    #[must_use]
    pub const fn previous(&self) -> SigSet {
        self.previous
    }
}

impl Drop for SignalBlockGuard {
    fn drop(&mut self) {
        let _ = set_thread_mask(self.previous.bits());
    }
}

/// Child-side state; lives on the parent's stack for the whole spawn.
struct ChildContext<'a> {
    plan: &'a SpawnPlan<'a>,
    saved_mask: SigSet,
    report_fd: c_int,
}

/// Read and write ends of the child error channel.
struct ReportPipe {
    read_fd: c_int,
    write_fd: c_int,
}

impl ReportPipe {
    fn open(actions: Option<&FileActionList>) -> Option<Self> {
        let mut fds = [-1 as c_int; 2];
        // SAFETY: `fds` is a writable array of two ints.
        if unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) } != 0 {
            return None;
        }
        let pipe = Self {
            read_fd: fds[0],
            write_fd: fds[1],
        };
        // The child would clobber its own channel; fall back to exit status only.
        if actions.is_some_and(|list| list.references_fd(pipe.write_fd)) {
            return None;
        }
        Some(pipe)
    }

    fn close_write(&mut self) {
        if self.write_fd >= 0 {
            // SAFETY: we own the descriptor.
            unsafe { libc::close(self.write_fd) };
            self.write_fd = -1;
        }
    }

    /// Blocks until the child execs (EOF) or reports a failure.
    fn read_failure(&mut self) -> Option<ChildFailure> {
        let mut buf = [0u8; ChildFailure::WIRE_SIZE];
        let mut filled = 0;
        while filled < buf.len() {
            // SAFETY: reading into the unfilled tail of `buf`.
            let n = unsafe {
                libc::read(
                    self.read_fd,
                    buf[filled..].as_mut_ptr().cast::<c_void>(),
                    buf.len() - filled,
                )
            };
            if n < 0 {
                if std::io::Error::last_os_error().raw_os_error() == Some(libc::EINTR) {
                    continue;
                }
                return None;
            }
            if n == 0 {
                return None;
            }
            filled += n as usize;
        }
        ChildFailure::from_bytes(&buf)
    }
}

impl Drop for ReportPipe {
    fn drop(&mut self) {
        self.close_write();
        // SAFETY: we own the descriptor.
        unsafe { libc::close(self.read_fd) };
    }
}

fn report_and_exit(ctx: &ChildContext<'_>, failure: ChildFailure) -> ! {
    if ctx.report_fd >= 0 {
        let bytes = failure.to_bytes();
        // SAFETY: writing a stack buffer to a descriptor we own.
        unsafe {
            libc::write(ctx.report_fd, bytes.as_ptr().cast::<c_void>(), bytes.len());
        }
    }
    // SAFETY: terminates the child without running parent-owned destructors.
    unsafe { libc::_exit(CHILD_FAILURE_STATUS) }
}

fn child_main(ctx: &ChildContext<'_>) -> ! {
    let mut ops = HostChildOps::new(ctx.plan.target, ctx.saved_mask);
    let failure = run_child(&mut ops, ctx.plan.attrs, ctx.plan.actions);
    report_and_exit(ctx, failure)
}

extern "C" fn vfork_entry(arg: *mut c_void) -> c_int {
    // SAFETY: `arg` is the ChildContext the suspended parent passed to clone.
    let ctx = unsafe { &*arg.cast::<ChildContext<'_>>() };
    child_main(ctx)
}

fn wait_reap(pid: libc::pid_t) {
    let mut status = 0;
    loop {
        // SAFETY: `status` is a writable int.
        let rc = unsafe { libc::waitpid(pid, &mut status, 0) };
        if rc >= 0 || std::io::Error::last_os_error().raw_os_error() != Some(libc::EINTR) {
            return;
        }
    }
}

/// Create the child with a copied address space.
fn create_forked(ctx: &ChildContext<'_>) -> Result<libc::pid_t, SpawnError> {
    // SAFETY: the child branch only runs the allocation-free child sequence
    // and then execs or `_exit`s.
    let pid = unsafe { libc::fork() };
    match pid {
        -1 => Err(SpawnError::Os(last_errno())),
        0 => child_main(ctx),
        pid => Ok(pid),
    }
}

/// Create the child on a private stack sharing our address space; returns
/// after the child has exec'd or exited.
fn create_vforked(ctx: &ChildContext<'_>) -> Result<libc::pid_t, SpawnError> {
    // SAFETY: anonymous private mapping, checked below.
    let stack = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            VFORK_STACK_SIZE,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_STACK,
            -1,
            0,
        )
    };
    if stack == libc::MAP_FAILED {
        return Err(SpawnError::Os(last_errno()));
    }
    // SAFETY: one-past-the-end of the mapping; stacks grow down.
    let stack_top = unsafe { stack.cast::<u8>().add(VFORK_STACK_SIZE) }.cast::<c_void>();
    let arg = std::ptr::from_ref(ctx).cast_mut().cast::<c_void>();
    // SAFETY: CLONE_VFORK suspends us until the child execs or exits, so `ctx`
    // and the stack outlive every child access.
    let pid = unsafe {
        libc::clone(
            vfork_entry,
            stack_top,
            libc::CLONE_VM | libc::CLONE_VFORK | libc::SIGCHLD,
            arg,
        )
    };
    let result = if pid == -1 {
        Err(SpawnError::Os(last_errno()))
    } else {
        Ok(pid)
    };
    // SAFETY: the child no longer runs on this stack.
    unsafe { libc::munmap(stack, VFORK_STACK_SIZE) };
    result
}

fn last_errno() -> i32 {
    std::io::Error::last_os_error()
        .raw_os_error()
        .unwrap_or(libc::EAGAIN)
}

/// Run one spawn. Returns the child's pid.
///
/// # Safety
/// `plan.target` must hold a NUL-terminated path and NULL-terminated
/// argv/envp arrays valid for the duration of the call.
pub unsafe fn spawn(plan: &SpawnPlan<'_>, mode: SafetyLevel) -> Result<libc::pid_t, SpawnError> {
    let strategy = plan.strategy();
    let mut pipe = if mode.reports_child_errors() {
        ReportPipe::open(plan.actions)
    } else {
        None
    };

    let guard = SignalBlockGuard::block_all()?;
    let ctx = ChildContext {
        plan,
        saved_mask: guard.previous(),
        report_fd: pipe.as_ref().map_or(-1, |p| p.write_fd),
    };
    let created = match strategy {
        ForkStrategy::Fork => create_forked(&ctx),
        ForkStrategy::Vfork => create_vforked(&ctx),
    };
    drop(guard);

    let pid = match created {
        Ok(pid) => pid,
        Err(err) => {
            runtime_policy::observe_fork_failure();
            return Err(err);
        }
    };
    runtime_policy::observe_spawn(strategy);

    if let Some(pipe) = pipe.as_mut() {
        pipe.close_write();
        if let Some(failure) = pipe.read_failure() {
            wait_reap(pid);
            runtime_policy::observe_child_report(failure.errno);
            return Err(SpawnError::Os(failure.errno));
        }
    }
    Ok(pid)
}
