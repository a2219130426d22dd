//! ABI layer for `posix_spawnattr_*`.
//!
//! Each function resolves the opaque handle through the membrane, then reads
//! or writes one field of the core [`SpawnAttributes`]. Only `setflags`
//! validates its value; everything else is stored verbatim.

use std::ffi::{c_int, c_short};

use frankenspawn_core::errno;
use frankenspawn_core::signal::SigSet;
use frankenspawn_core::spawn::{SchedParam, SpawnAttributes};
use frankenspawn_membrane::registry::HandleKind;

use crate::handle;
use crate::runtime_policy;

/// Wide signal set covering every Linux signal (1..=64).
#[allow(non_camel_case_types)]
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct sigset64_t {
    pub __bits: u64,
}

/// Read a `sigset_t`. Linux layout: bit `n - 1` of the first word is signal `n`.
unsafe fn read_sigset(set: *const libc::sigset_t) -> SigSet {
    // SAFETY: sigset_t is at least 8 bytes on every Linux target.
    SigSet::from_bits(unsafe { set.cast::<u64>().read_unaligned() })
}

unsafe fn write_sigset(out: *mut libc::sigset_t, set: SigSet) {
    // SAFETY: `out` is a writable sigset_t; clear it, then fill the first word.
    unsafe {
        out.write_bytes(0, 1);
        out.cast::<u64>().write_unaligned(set.bits());
    }
}

unsafe fn with_attrs<R>(
    attr: *const libc::posix_spawnattr_t,
    f: impl FnOnce(&SpawnAttributes) -> R,
) -> Result<R, c_int> {
    let attrs = unsafe { handle::resolve::<_, SpawnAttributes>(attr, HandleKind::Attributes)? };
    Ok(f(attrs))
}

unsafe fn with_attrs_mut<R>(
    attr: *mut libc::posix_spawnattr_t,
    f: impl FnOnce(&mut SpawnAttributes) -> R,
) -> Result<R, c_int> {
    let attrs = unsafe { handle::resolve_mut::<_, SpawnAttributes>(attr, HandleKind::Attributes)? };
    Ok(f(attrs))
}

/// Store `value` through `out`, or fail with EFAULT on a null out-pointer.
unsafe fn store<T>(out: *mut T, value: Result<T, c_int>) -> c_int {
    if out.is_null() {
        return errno::EFAULT;
    }
    match value {
        Ok(v) => {
            // SAFETY: non-null out-pointer supplied by the caller.
            unsafe { out.write(v) };
            0
        }
        Err(err) => err,
    }
}

fn status(result: Result<(), c_int>) -> c_int {
    result.err().unwrap_or(0)
}

// ---------------------------------------------------------------------------
// init / destroy
// ---------------------------------------------------------------------------

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_spawnattr_init(attr: *mut libc::posix_spawnattr_t) -> c_int {
    unsafe { handle::install(attr, SpawnAttributes::new(), HandleKind::Attributes) }
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_spawnattr_destroy(attr: *mut libc::posix_spawnattr_t) -> c_int {
    unsafe { handle::destroy::<_, SpawnAttributes>(attr, HandleKind::Attributes) }
}

// ---------------------------------------------------------------------------
// flags
// ---------------------------------------------------------------------------

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_spawnattr_getflags(
    attr: *const libc::posix_spawnattr_t,
    flags: *mut c_short,
) -> c_int {
    unsafe { store(flags, with_attrs(attr, |a| a.flags().bits())) }
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_spawnattr_setflags(
    attr: *mut libc::posix_spawnattr_t,
    flags: c_short,
) -> c_int {
    let mode = runtime_policy::mode();
    let result = unsafe {
        with_attrs_mut(attr, |a| {
            a.set_flags(runtime_policy::admit_flags(mode, flags))
                .map_err(|e| e.errno())
        })
    };
    match result {
        Ok(Ok(())) => 0,
        Ok(Err(err)) => {
            runtime_policy::note_validation_failure();
            err
        }
        Err(err) => err,
    }
}

// ---------------------------------------------------------------------------
// pgroup
// ---------------------------------------------------------------------------

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_spawnattr_getpgroup(
    attr: *const libc::posix_spawnattr_t,
    pgroup: *mut libc::pid_t,
) -> c_int {
    unsafe { store(pgroup, with_attrs(attr, SpawnAttributes::process_group)) }
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_spawnattr_setpgroup(
    attr: *mut libc::posix_spawnattr_t,
    pgroup: libc::pid_t,
) -> c_int {
    status(unsafe { with_attrs_mut(attr, |a| a.set_process_group(pgroup)) })
}

// ---------------------------------------------------------------------------
// sigmask
// ---------------------------------------------------------------------------

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_spawnattr_getsigmask(
    attr: *const libc::posix_spawnattr_t,
    mask: *mut libc::sigset_t,
) -> c_int {
    if mask.is_null() {
        return errno::EFAULT;
    }
    match unsafe { with_attrs(attr, SpawnAttributes::signal_mask) } {
        Ok(set) => {
            unsafe { write_sigset(mask, set) };
            0
        }
        Err(err) => err,
    }
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_spawnattr_setsigmask(
    attr: *mut libc::posix_spawnattr_t,
    mask: *const libc::sigset_t,
) -> c_int {
    if mask.is_null() {
        return errno::EFAULT;
    }
    let set = unsafe { read_sigset(mask) };
    status(unsafe { with_attrs_mut(attr, |a| a.set_signal_mask(set)) })
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_spawnattr_getsigmask64(
    attr: *const libc::posix_spawnattr_t,
    mask: *mut sigset64_t,
) -> c_int {
    unsafe {
        store(
            mask,
            with_attrs(attr, |a| sigset64_t {
                __bits: a.signal_mask().bits(),
            }),
        )
    }
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_spawnattr_setsigmask64(
    attr: *mut libc::posix_spawnattr_t,
    mask: *const sigset64_t,
) -> c_int {
    if mask.is_null() {
        return errno::EFAULT;
    }
    let set = SigSet::from_bits(unsafe { (*mask).__bits });
    status(unsafe { with_attrs_mut(attr, |a| a.set_signal_mask(set)) })
}

// ---------------------------------------------------------------------------
// sigdefault
// ---------------------------------------------------------------------------

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_spawnattr_getsigdefault(
    attr: *const libc::posix_spawnattr_t,
    set: *mut libc::sigset_t,
) -> c_int {
    if set.is_null() {
        return errno::EFAULT;
    }
    match unsafe { with_attrs(attr, SpawnAttributes::signal_defaults) } {
        Ok(defaults) => {
            unsafe { write_sigset(set, defaults) };
            0
        }
        Err(err) => err,
    }
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_spawnattr_setsigdefault(
    attr: *mut libc::posix_spawnattr_t,
    set: *const libc::sigset_t,
) -> c_int {
    if set.is_null() {
        return errno::EFAULT;
    }
    let defaults = unsafe { read_sigset(set) };
    status(unsafe { with_attrs_mut(attr, |a| a.set_signal_defaults(defaults)) })
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_spawnattr_getsigdefault64(
    attr: *const libc::posix_spawnattr_t,
    set: *mut sigset64_t,
) -> c_int {
    unsafe {
        store(
            set,
            with_attrs(attr, |a| sigset64_t {
                __bits: a.signal_defaults().bits(),
            }),
        )
    }
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_spawnattr_setsigdefault64(
    attr: *mut libc::posix_spawnattr_t,
    set: *const sigset64_t,
) -> c_int {
    if set.is_null() {
        return errno::EFAULT;
    }
    let defaults = SigSet::from_bits(unsafe { (*set).__bits });
    status(unsafe { with_attrs_mut(attr, |a| a.set_signal_defaults(defaults)) })
}

// ---------------------------------------------------------------------------
// scheduling
// ---------------------------------------------------------------------------

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_spawnattr_getschedparam(
    attr: *const libc::posix_spawnattr_t,
    param: *mut libc::sched_param,
) -> c_int {
    unsafe {
        store(
            param,
            with_attrs(attr, |a| libc::sched_param {
                sched_priority: a.sched_param().priority,
            }),
        )
    }
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_spawnattr_setschedparam(
    attr: *mut libc::posix_spawnattr_t,
    param: *const libc::sched_param,
) -> c_int {
    if param.is_null() {
        return errno::EFAULT;
    }
    let priority = unsafe { (*param).sched_priority };
    status(unsafe { with_attrs_mut(attr, |a| a.set_sched_param(SchedParam::new(priority))) })
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_spawnattr_getschedpolicy(
    attr: *const libc::posix_spawnattr_t,
    policy: *mut c_int,
) -> c_int {
    unsafe { store(policy, with_attrs(attr, SpawnAttributes::sched_policy)) }
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_spawnattr_setschedpolicy(
    attr: *mut libc::posix_spawnattr_t,
    policy: c_int,
) -> c_int {
    status(unsafe { with_attrs_mut(attr, |a| a.set_sched_policy(policy)) })
}
