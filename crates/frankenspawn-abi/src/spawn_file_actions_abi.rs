//! ABI layer for `posix_spawn_file_actions_*`.

use std::ffi::{CStr, c_char, c_int};

use frankenspawn_core::errno;
use frankenspawn_core::spawn::{FileActionList, SpawnError};
use frankenspawn_membrane::registry::HandleKind;

use crate::handle;
use crate::runtime_policy;

unsafe fn append(
    file_actions: *mut libc::posix_spawn_file_actions_t,
    f: impl FnOnce(&mut FileActionList) -> Result<(), SpawnError>,
) -> c_int {
    let list = match unsafe {
        handle::resolve_mut::<_, FileActionList>(file_actions, HandleKind::FileActions)
    } {
        Ok(list) => list,
        Err(err) => return err,
    };
    match f(list) {
        Ok(()) => 0,
        Err(err) => {
            runtime_policy::note_validation_failure();
            err.errno()
        }
    }
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_spawn_file_actions_init(
    file_actions: *mut libc::posix_spawn_file_actions_t,
) -> c_int {
    unsafe { handle::install(file_actions, FileActionList::new(), HandleKind::FileActions) }
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_spawn_file_actions_destroy(
    file_actions: *mut libc::posix_spawn_file_actions_t,
) -> c_int {
    unsafe { handle::destroy::<_, FileActionList>(file_actions, HandleKind::FileActions) }
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_spawn_file_actions_addopen(
    file_actions: *mut libc::posix_spawn_file_actions_t,
    fd: c_int,
    path: *const c_char,
    oflag: c_int,
    mode: libc::mode_t,
) -> c_int {
    if path.is_null() {
        return errno::EFAULT;
    }
    // SAFETY: non-null, NUL-terminated per the C contract; copied before return.
    let path = unsafe { CStr::from_ptr(path) };
    unsafe { append(file_actions, |list| list.add_open(fd, path, oflag, mode)) }
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_spawn_file_actions_addclose(
    file_actions: *mut libc::posix_spawn_file_actions_t,
    fd: c_int,
) -> c_int {
    unsafe { append(file_actions, |list| list.add_close(fd)) }
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_spawn_file_actions_adddup2(
    file_actions: *mut libc::posix_spawn_file_actions_t,
    fd: c_int,
    new_fd: c_int,
) -> c_int {
    unsafe { append(file_actions, |list| list.add_dup2(fd, new_fd)) }
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_spawn_file_actions_addchdir_np(
    file_actions: *mut libc::posix_spawn_file_actions_t,
    path: *const c_char,
) -> c_int {
    if path.is_null() {
        return errno::EFAULT;
    }
    // SAFETY: as in addopen.
    let path = unsafe { CStr::from_ptr(path) };
    unsafe { append(file_actions, |list| list.add_chdir(path)) }
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_spawn_file_actions_addfchdir_np(
    file_actions: *mut libc::posix_spawn_file_actions_t,
    fd: c_int,
) -> c_int {
    unsafe { append(file_actions, |list| list.add_fchdir(fd)) }
}
