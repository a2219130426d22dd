//! ABI layer for `posix_spawn` and `posix_spawnp`.
//!
//! The two entry points differ only in how the child loads the program:
//! `posix_spawn` takes the path as-is, `posix_spawnp` searches `PATH`.

use std::ffi::{c_char, c_int};

use frankenspawn_core::errno;
use frankenspawn_core::spawn::{FileActionList, SpawnAttributes};
use frankenspawn_membrane::registry::HandleKind;

use crate::handle;
use crate::host_ops::ExecTarget;
use crate::orchestrator::{self, ExecFn, SpawnPlan};
use crate::runtime_policy;

unsafe extern "C" {
    static mut environ: *mut *mut c_char;
}

unsafe fn spawn_with(
    pid: *mut libc::pid_t,
    path: *const c_char,
    file_actions: *const libc::posix_spawn_file_actions_t,
    attrp: *const libc::posix_spawnattr_t,
    argv: *const *mut c_char,
    envp: *const *mut c_char,
    exec: ExecFn,
) -> c_int {
    if path.is_null() {
        return errno::EFAULT;
    }

    let actions = if file_actions.is_null() {
        None
    } else {
        match unsafe {
            handle::resolve::<_, FileActionList>(file_actions, HandleKind::FileActions)
        } {
            Ok(list) => Some(list),
            Err(err) => return err,
        }
    };
    let attrs = if attrp.is_null() {
        None
    } else {
        match unsafe { handle::resolve::<_, SpawnAttributes>(attrp, HandleKind::Attributes) } {
            Ok(attrs) => Some(attrs),
            Err(err) => return err,
        }
    };

    let envp = if envp.is_null() {
        // SAFETY: reading the process environment pointer.
        unsafe { environ.cast_const().cast::<*const c_char>() }
    } else {
        envp.cast::<*const c_char>()
    };
    let plan = SpawnPlan {
        target: ExecTarget {
            exec,
            path,
            argv: argv.cast::<*const c_char>(),
            envp,
        },
        attrs,
        actions,
    };

    // SAFETY: the caller's pointers are valid per the posix_spawn contract.
    match unsafe { orchestrator::spawn(&plan, runtime_policy::mode()) } {
        Ok(child) => {
            if !pid.is_null() {
                // SAFETY: non-null out-pointer supplied by the caller.
                unsafe { *pid = child };
            }
            0
        }
        Err(err) => err.errno(),
    }
}

/// POSIX `posix_spawn`: create a child running the program at `path`.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_spawn(
    pid: *mut libc::pid_t,
    path: *const c_char,
    file_actions: *const libc::posix_spawn_file_actions_t,
    attrp: *const libc::posix_spawnattr_t,
    argv: *const *mut c_char,
    envp: *const *mut c_char,
) -> c_int {
    unsafe { spawn_with(pid, path, file_actions, attrp, argv, envp, libc::execve) }
}

/// POSIX `posix_spawnp`: like `posix_spawn`, but searches `PATH` for `file`.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_spawnp(
    pid: *mut libc::pid_t,
    file: *const c_char,
    file_actions: *const libc::posix_spawn_file_actions_t,
    attrp: *const libc::posix_spawnattr_t,
    argv: *const *mut c_char,
    envp: *const *mut c_char,
) -> c_int {
    unsafe { spawn_with(pid, file, file_actions, attrp, argv, envp, libc::execvpe) }
}
