//! Error number definitions used by the spawn family.
//!
//! Values match Linux `<errno.h>`. The spawn functions return these directly
//! (positive), never through the thread-local `errno`.

pub const EPERM: i32 = 1;
pub const ENOENT: i32 = 2;
pub const ESRCH: i32 = 3;
pub const EINTR: i32 = 4;
pub const EIO: i32 = 5;
pub const E2BIG: i32 = 7;
pub const ENOEXEC: i32 = 8;
pub const EBADF: i32 = 9;
pub const ECHILD: i32 = 10;
pub const EAGAIN: i32 = 11;
pub const ENOMEM: i32 = 12;
pub const EACCES: i32 = 13;
pub const EFAULT: i32 = 14;
pub const ENOTDIR: i32 = 20;
pub const EISDIR: i32 = 21;
pub const EINVAL: i32 = 22;
pub const EMFILE: i32 = 24;
pub const ENOSYS: i32 = 38;

/// Symbolic name for an errno value, for logs and reports.
#[must_use]
pub const fn errno_name(errno: i32) -> &'static str {
    match errno {
        0 => "OK",
        EPERM => "EPERM",
        ENOENT => "ENOENT",
        ESRCH => "ESRCH",
        EINTR => "EINTR",
        EIO => "EIO",
        E2BIG => "E2BIG",
        ENOEXEC => "ENOEXEC",
        EBADF => "EBADF",
        ECHILD => "ECHILD",
        EAGAIN => "EAGAIN",
        ENOMEM => "ENOMEM",
        EACCES => "EACCES",
        EFAULT => "EFAULT",
        ENOTDIR => "ENOTDIR",
        EISDIR => "EISDIR",
        EINVAL => "EINVAL",
        EMFILE => "EMFILE",
        ENOSYS => "ENOSYS",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_for_spawn_errnos() {
        assert_eq!(errno_name(0), "OK");
        assert_eq!(errno_name(EBADF), "EBADF");
        assert_eq!(errno_name(EINVAL), "EINVAL");
        assert_eq!(errno_name(ENOENT), "ENOENT");
        assert_eq!(errno_name(9999), "UNKNOWN");
    }
}
