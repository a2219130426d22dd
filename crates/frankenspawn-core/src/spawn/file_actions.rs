//! File actions (`posix_spawn_file_actions_t` payload).
//!
//! An ordered, append-only list of descriptor operations replayed in the
//! child before `exec`. Insertion order is execution order. Each action owns
//! its path, so dropping the list releases everything exactly once.
//!
//! Every `add_*` call validates its descriptors and reserves storage before
//! touching the list: a rejected call leaves the list exactly as it was.

use std::ffi::{CStr, CString};

use super::error::SpawnError;

/// Discriminant of a [`FileAction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileActionKind {
    Open,
    Close,
    Dup2,
    Chdir,
    Fchdir,
}

/// One deferred descriptor operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAction {
    /// Open `path` and make it available as `fd`.
    Open {
        fd: i32,
        path: CString,
        flags: i32,
        mode: u32,
    },
    /// Close `fd`; failure is ignored.
    Close { fd: i32 },
    /// Duplicate `fd` onto `new_fd`. When equal, clears close-on-exec instead.
    Dup2 { fd: i32, new_fd: i32 },
    /// Change the working directory to `path`.
    Chdir { path: CString },
    /// Change the working directory to the directory open as `fd`.
    Fchdir { fd: i32 },
}

impl FileAction {
    #[must_use]
    pub const fn kind(&self) -> FileActionKind {
        match self {
            Self::Open { .. } => FileActionKind::Open,
            Self::Close { .. } => FileActionKind::Close,
            Self::Dup2 { .. } => FileActionKind::Dup2,
            Self::Chdir { .. } => FileActionKind::Chdir,
            Self::Fchdir { .. } => FileActionKind::Fchdir,
        }
    }

    /// Returns true if replaying this action reads, writes, or closes `fd`.
    #[must_use]
    pub const fn references_fd(&self, fd: i32) -> bool {
        match self {
            Self::Open { fd: target, .. } => *target == fd,
            Self::Close { fd: target } | Self::Fchdir { fd: target } => *target == fd,
            Self::Dup2 { fd: source, new_fd } => *source == fd || *new_fd == fd,
            Self::Chdir { .. } => false,
        }
    }
}

/// Ordered list of file actions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileActionList {
    actions: Vec<FileAction>,
}

impl FileActionList {
    /// An empty list; replaying it is a no-op.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            actions: Vec::new(),
        }
    }

    /// Append an open of `path` onto `fd`.
    pub fn add_open(
        &mut self,
        fd: i32,
        path: &CStr,
        flags: i32,
        mode: u32,
    ) -> Result<(), SpawnError> {
        check_fd(fd)?;
        let path = own_path(path)?;
        self.push(FileAction::Open {
            fd,
            path,
            flags,
            mode,
        })
    }

    /// Append a close of `fd`.
    pub fn add_close(&mut self, fd: i32) -> Result<(), SpawnError> {
        check_fd(fd)?;
        self.push(FileAction::Close { fd })
    }

    /// Append a `dup2(fd, new_fd)`.
    pub fn add_dup2(&mut self, fd: i32, new_fd: i32) -> Result<(), SpawnError> {
        check_fd(fd)?;
        check_fd(new_fd)?;
        self.push(FileAction::Dup2 { fd, new_fd })
    }

    /// Append a `chdir(path)`.
    pub fn add_chdir(&mut self, path: &CStr) -> Result<(), SpawnError> {
        let path = own_path(path)?;
        self.push(FileAction::Chdir { path })
    }

    /// Append a `fchdir(fd)`.
    pub fn add_fchdir(&mut self, fd: i32) -> Result<(), SpawnError> {
        check_fd(fd)?;
        self.push(FileAction::Fchdir { fd })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Actions in execution order.
    pub fn iter(&self) -> std::slice::Iter<'_, FileAction> {
        self.actions.iter()
    }

    /// Returns true if any action touches `fd`.
    #[must_use]
    pub fn references_fd(&self, fd: i32) -> bool {
        self.actions.iter().any(|action| action.references_fd(fd))
    }

    fn push(&mut self, action: FileAction) -> Result<(), SpawnError> {
        self.actions.try_reserve(1)?;
        self.actions.push(action);
        Ok(())
    }
}

impl<'a> IntoIterator for &'a FileActionList {
    type Item = &'a FileAction;
    type IntoIter = std::slice::Iter<'a, FileAction>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn check_fd(fd: i32) -> Result<(), SpawnError> {
    if fd < 0 {
        Err(SpawnError::InvalidFd(fd))
    } else {
        Ok(())
    }
}

/// Copy a caller path into owned storage, reporting allocation failure.
fn own_path(path: &CStr) -> Result<CString, SpawnError> {
    let bytes = path.to_bytes_with_nul();
    let mut owned = Vec::new();
    owned.try_reserve_exact(bytes.len())?;
    owned.extend_from_slice(bytes);
    CString::from_vec_with_nul(owned).map_err(|_| SpawnError::InvalidArgument)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_open_fd_is_rejected_and_list_stays_empty() {
        let mut list = FileActionList::new();
        assert_eq!(
            list.add_open(-1, c"/tmp/x", 0, 0),
            Err(SpawnError::InvalidFd(-1))
        );
        assert!(list.is_empty());
    }

    #[test]
    fn negative_fds_rejected_for_every_add() {
        let mut list = FileActionList::new();
        list.add_close(3).unwrap();
        for fd in [-1, -2, i32::MIN] {
            assert_eq!(list.add_close(fd), Err(SpawnError::InvalidFd(fd)));
            assert_eq!(list.add_dup2(fd, 1), Err(SpawnError::InvalidFd(fd)));
            assert_eq!(list.add_dup2(1, fd), Err(SpawnError::InvalidFd(fd)));
            assert_eq!(list.add_fchdir(fd), Err(SpawnError::InvalidFd(fd)));
            assert_eq!(list.add_open(fd, c"/dev/null", 0, 0), Err(SpawnError::InvalidFd(fd)));
        }
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn actions_keep_insertion_order_without_dedup() {
        let mut list = FileActionList::new();
        list.add_open(5, c"/dev/null", 1, 0o644).unwrap();
        list.add_dup2(5, 1).unwrap();
        list.add_close(5).unwrap();
        list.add_close(5).unwrap();
        list.add_chdir(c"/tmp").unwrap();

        let kinds: Vec<_> = list.iter().map(FileAction::kind).collect();
        assert_eq!(
            kinds,
            vec![
                FileActionKind::Open,
                FileActionKind::Dup2,
                FileActionKind::Close,
                FileActionKind::Close,
                FileActionKind::Chdir,
            ]
        );
    }

    #[test]
    fn open_owns_a_copy_of_the_path() {
        let source = CString::new("/var/tmp/spawn-out").unwrap();
        let mut list = FileActionList::new();
        list.add_open(3, &source, 0, 0).unwrap();
        drop(source);

        match list.iter().next() {
            Some(FileAction::Open { path, .. }) => {
                assert_eq!(path.as_bytes(), b"/var/tmp/spawn-out");
            }
            other => panic!("expected open action, got {other:?}"),
        }
    }

    #[test]
    fn references_fd_covers_all_descriptor_slots() {
        let mut list = FileActionList::new();
        list.add_open(7, c"/dev/null", 0, 0).unwrap();
        list.add_dup2(8, 9).unwrap();
        list.add_close(10).unwrap();
        list.add_fchdir(11).unwrap();
        list.add_chdir(c"/").unwrap();
        for fd in 7..=11 {
            assert!(list.references_fd(fd), "fd {fd} should be referenced");
        }
        assert!(!list.references_fd(12));
        assert!(!FileActionList::new().references_fd(0));
    }
}
