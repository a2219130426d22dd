//! Host implementation of the child-side operations.
//!
//! Runs in the child between fork/clone and exec, possibly on memory shared
//! with the suspended parent. Every call is a raw system call: no allocation,
//! no locks, nothing that glibc would intercept (its internal signals, setxid
//! broadcast, fork handlers).

use std::ffi::{CStr, c_char, c_int, c_long, c_ulong};

use frankenspawn_core::signal::{Disposition, SigSet};
use frankenspawn_core::spawn::{ChildOps, SchedParam};

use crate::orchestrator::ExecFn;

/// Size of the kernel signal set, in bytes.
pub(crate) const KERNEL_SIGSET_SIZE: usize = 8;

/// `struct kernel_sigaction` as taken by `rt_sigaction`.
#[repr(C)]
struct KernelSigaction {
    handler: usize,
    flags: c_ulong,
    restorer: usize,
    mask: u64,
}

#[inline]
fn last_errno() -> i32 {
    std::io::Error::last_os_error()
        .raw_os_error()
        .unwrap_or(libc::EINVAL)
}

#[inline]
fn check(rc: c_long) -> Result<c_long, i32> {
    if rc < 0 { Err(last_errno()) } else { Ok(rc) }
}

/// Replace the calling thread's signal mask with `mask`, returning the old one.
pub(crate) fn set_thread_mask(mask: u64) -> Result<u64, i32> {
    let mut old = 0u64;
    // SAFETY: both pointers reference live u64s of KERNEL_SIGSET_SIZE bytes.
    check(unsafe {
        libc::syscall(
            libc::SYS_rt_sigprocmask,
            libc::SIG_SETMASK,
            &raw const mask,
            &raw mut old,
            KERNEL_SIGSET_SIZE,
        )
    })?;
    Ok(old)
}

/// Program image and environment handed to `exec`.
#[derive(Clone, Copy)]
pub struct ExecTarget {
    pub exec: ExecFn,
    pub path: *const c_char,
    pub argv: *const *const c_char,
    pub envp: *const *const c_char,
}

/// [`ChildOps`] backed by Linux system calls.
pub struct HostChildOps {
    target: ExecTarget,
    saved_mask: SigSet,
}

impl HostChildOps {
    /// `saved_mask` is the caller's mask from before signals were blocked.
    #[must_use]
    pub const fn new(target: ExecTarget, saved_mask: SigSet) -> Self {
        Self { target, saved_mask }
    }
}

impl ChildOps for HostChildOps {
    fn signal_disposition(&mut self, sig: i32) -> Result<Disposition, i32> {
        let mut current = KernelSigaction {
            handler: 0,
            flags: 0,
            restorer: 0,
            mask: 0,
        };
        // SAFETY: query only; `current` is a valid kernel_sigaction.
        check(unsafe {
            libc::syscall(
                libc::SYS_rt_sigaction,
                sig,
                std::ptr::null::<KernelSigaction>(),
                &raw mut current,
                KERNEL_SIGSET_SIZE,
            )
        })?;
        Ok(Disposition::from_handler(current.handler))
    }

    fn set_default_disposition(&mut self, sig: i32) -> Result<(), i32> {
        let action = KernelSigaction {
            handler: libc::SIG_DFL,
            flags: 0,
            restorer: 0,
            mask: 0,
        };
        // SAFETY: `action` is a valid kernel_sigaction; old action not requested.
        check(unsafe {
            libc::syscall(
                libc::SYS_rt_sigaction,
                sig,
                &raw const action,
                std::ptr::null_mut::<KernelSigaction>(),
                KERNEL_SIGSET_SIZE,
            )
        })?;
        Ok(())
    }

    fn set_process_group(&mut self, pgroup: i32) -> Result<(), i32> {
        // SAFETY: plain integer arguments.
        check(unsafe { libc::syscall(libc::SYS_setpgid, 0, pgroup) })?;
        Ok(())
    }

    fn create_session(&mut self) -> Result<(), i32> {
        // SAFETY: no arguments.
        check(unsafe { libc::syscall(libc::SYS_setsid) })?;
        Ok(())
    }

    fn set_scheduler(&mut self, policy: i32, param: SchedParam) -> Result<(), i32> {
        let param = libc::sched_param {
            sched_priority: param.priority,
        };
        // SAFETY: `param` outlives the call.
        check(unsafe { libc::syscall(libc::SYS_sched_setscheduler, 0, policy, &raw const param) })?;
        Ok(())
    }

    fn set_sched_param(&mut self, param: SchedParam) -> Result<(), i32> {
        let param = libc::sched_param {
            sched_priority: param.priority,
        };
        // SAFETY: `param` outlives the call.
        check(unsafe { libc::syscall(libc::SYS_sched_setparam, 0, &raw const param) })?;
        Ok(())
    }

    fn reset_effective_uid(&mut self) -> Result<(), i32> {
        // SAFETY: plain integer arguments; -1 leaves real and saved ids alone.
        let uid = unsafe { libc::syscall(libc::SYS_getuid) };
        check(unsafe { libc::syscall(libc::SYS_setresuid, -1, uid, -1) })?;
        Ok(())
    }

    fn reset_effective_gid(&mut self) -> Result<(), i32> {
        // SAFETY: as above.
        let gid = unsafe { libc::syscall(libc::SYS_getgid) };
        check(unsafe { libc::syscall(libc::SYS_setresgid, -1, gid, -1) })?;
        Ok(())
    }

    fn set_signal_mask(&mut self, mask: SigSet) -> Result<(), i32> {
        set_thread_mask(mask.bits()).map(|_| ())
    }

    fn open(&mut self, path: &CStr, flags: i32, mode: u32) -> Result<i32, i32> {
        // SAFETY: `path` is NUL-terminated and outlives the call.
        let fd = check(unsafe {
            libc::syscall(
                libc::SYS_openat,
                libc::AT_FDCWD,
                path.as_ptr(),
                flags,
                mode,
            )
        })?;
        Ok(fd as i32)
    }

    fn close(&mut self, fd: i32) -> Result<(), i32> {
        // SAFETY: closing an arbitrary descriptor number is memory-safe.
        check(unsafe { libc::syscall(libc::SYS_close, fd) })?;
        Ok(())
    }

    fn dup2(&mut self, fd: i32, new_fd: i32) -> Result<(), i32> {
        // SAFETY: integer arguments; callers never pass fd == new_fd.
        check(unsafe { libc::syscall(libc::SYS_dup3, fd, new_fd, 0) })?;
        Ok(())
    }

    fn clear_cloexec(&mut self, fd: i32) -> Result<(), i32> {
        // SAFETY: integer arguments.
        let flags = check(unsafe { libc::syscall(libc::SYS_fcntl, fd, libc::F_GETFD) })?;
        let cleared = flags & !c_long::from(libc::FD_CLOEXEC);
        check(unsafe { libc::syscall(libc::SYS_fcntl, fd, libc::F_SETFD, cleared) })?;
        Ok(())
    }

    fn chdir(&mut self, path: &CStr) -> Result<(), i32> {
        // SAFETY: `path` is NUL-terminated and outlives the call.
        check(unsafe { libc::syscall(libc::SYS_chdir, path.as_ptr()) })?;
        Ok(())
    }

    fn fchdir(&mut self, fd: i32) -> Result<(), i32> {
        // SAFETY: integer argument.
        check(unsafe { libc::syscall(libc::SYS_fchdir, fd) })?;
        Ok(())
    }

    fn restore_signal_mask(&mut self) {
        let _ = set_thread_mask(self.saved_mask.bits());
    }

    fn exec(&mut self) -> i32 {
        let ExecTarget {
            exec,
            path,
            argv,
            envp,
        } = self.target;
        // SAFETY: the orchestrator's caller guarantees NUL-terminated path and
        // NULL-terminated argv/envp arrays that stay alive until exec.
        let rc: c_int = unsafe { exec(path, argv, envp) };
        if rc == 0 { libc::EINVAL } else { last_errno() }
    }
}
