//! Opaque handle storage.
//!
//! `posix_spawnattr_t` and `posix_spawn_file_actions_t` are caller-owned
//! blobs. We keep one pointer in their first word, pointing at a boxed Rust
//! payload; the rest of the blob is never touched. A null first word means
//! "destroyed" (or never initialized).

use std::ffi::{c_int, c_void};

use frankenspawn_core::errno;
use frankenspawn_membrane::registry::HandleKind;

use crate::runtime_policy::{self, DestroyVerdict};

#[inline]
fn slot<H>(handle: *const H) -> *mut *mut c_void {
    handle.cast::<*mut c_void>().cast_mut()
}

/// Box `value` and store it in `handle`.
pub(crate) unsafe fn install<H, T>(handle: *mut H, value: T, kind: HandleKind) -> c_int {
    if handle.is_null() {
        return errno::EINVAL;
    }
    let payload = Box::into_raw(Box::new(value));
    runtime_policy::register_handle(payload as usize, kind);
    // SAFETY: caller passed a writable handle blob at least one pointer wide.
    unsafe { slot(handle).write(payload.cast::<c_void>()) };
    0
}

/// Borrow the payload stored in `handle`.
pub(crate) unsafe fn resolve<'a, H, T>(handle: *const H, kind: HandleKind) -> Result<&'a T, c_int> {
    let payload = unsafe { payload_of(handle, kind)? };
    // SAFETY: the registry (or, in off mode, the caller) vouches for the pointer.
    Ok(unsafe { &*payload })
}

/// Mutably borrow the payload stored in `handle`.
pub(crate) unsafe fn resolve_mut<'a, H, T>(
    handle: *mut H,
    kind: HandleKind,
) -> Result<&'a mut T, c_int> {
    let payload = unsafe { payload_of(handle, kind)? };
    // SAFETY: as in `resolve`; the C API gives no concurrent-access guarantees.
    Ok(unsafe { &mut *payload })
}

unsafe fn payload_of<H, T>(handle: *const H, kind: HandleKind) -> Result<*mut T, c_int> {
    if handle.is_null() {
        return Err(errno::EINVAL);
    }
    // SAFETY: non-null handle blob; first word holds our payload pointer.
    let payload = unsafe { slot(handle).read() }.cast::<T>();
    if payload.is_null() {
        return Err(errno::EINVAL);
    }
    runtime_policy::check_handle(runtime_policy::mode(), payload as usize, kind)?;
    Ok(payload)
}

/// Free the payload stored in `handle` and null the slot.
///
/// Destroying an already-destroyed handle is a no-op that succeeds.
pub(crate) unsafe fn destroy<H, T>(handle: *mut H, kind: HandleKind) -> c_int {
    if handle.is_null() {
        return errno::EINVAL;
    }
    // SAFETY: non-null handle blob.
    let payload = unsafe { slot(handle).read() }.cast::<T>();
    if payload.is_null() {
        return 0;
    }
    match runtime_policy::retire_handle(runtime_policy::mode(), payload as usize, kind) {
        DestroyVerdict::Release => {
            // SAFETY: payload came from `install` and was live until the retire above.
            drop(unsafe { Box::from_raw(payload) });
            unsafe { slot(handle).write(std::ptr::null_mut()) };
            0
        }
        DestroyVerdict::Ignore => {
            unsafe { slot(handle).write(std::ptr::null_mut()) };
            0
        }
        DestroyVerdict::Reject(err) => err,
    }
}
