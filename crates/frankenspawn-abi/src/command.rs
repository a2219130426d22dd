//! Safe Rust front end over the spawn orchestrator.
//!
//! `SpawnRequest` owns its argv/envp strings and optional attributes and file
//! actions, builds the NULL-terminated pointer arrays in the parent, and runs
//! the same orchestrator the C entry points use.

use std::ffi::{CString, c_char};

use frankenspawn_core::process::ExitOutcome;
use frankenspawn_core::spawn::{FileActionList, ForkStrategy, SpawnAttributes, SpawnError};
use frankenspawn_membrane::config::SafetyLevel;

use crate::host_ops::ExecTarget;
use crate::orchestrator::{self, ExecFn, SpawnPlan};
use crate::runtime_policy;

fn c_string(value: &str) -> Result<CString, SpawnError> {
    CString::new(value).map_err(|_| SpawnError::InvalidArgument)
}

/// An owned description of one process to spawn.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    program: CString,
    args: Vec<CString>,
    env: Option<Vec<CString>>,
    search_path: bool,
    attrs: Option<SpawnAttributes>,
    actions: Option<FileActionList>,
}

impl SpawnRequest {
    /// `program` doubles as `argv[0]`. Strings with interior NULs are rejected.
    pub fn new(program: &str) -> Result<Self, SpawnError> {
        let program = c_string(program)?;
        Ok(Self {
            args: vec![program.clone()],
            program,
            env: None,
            search_path: false,
            attrs: None,
            actions: None,
        })
    }

    pub fn arg(&mut self, arg: &str) -> Result<&mut Self, SpawnError> {
        self.args.push(c_string(arg)?);
        Ok(self)
    }

    pub fn args<'a>(
        &mut self,
        args: impl IntoIterator<Item = &'a str>,
    ) -> Result<&mut Self, SpawnError> {
        for arg in args {
            self.arg(arg)?;
        }
        Ok(self)
    }

    /// Add `key=value` to an explicit environment. Without any `env` call the
    /// child inherits the caller's environment.
    pub fn env(&mut self, key: &str, value: &str) -> Result<&mut Self, SpawnError> {
        let entry = c_string(&format!("{key}={value}"))?;
        self.env.get_or_insert_with(Vec::new).push(entry);
        Ok(self)
    }

    /// Start from an empty environment.
    pub fn env_clear(&mut self) -> &mut Self {
        self.env = Some(Vec::new());
        self
    }

    /// Search `PATH` for the program, like `posix_spawnp`.
    pub fn search_path(&mut self, enabled: bool) -> &mut Self {
        self.search_path = enabled;
        self
    }

    pub fn attributes(&mut self, attrs: SpawnAttributes) -> &mut Self {
        self.attrs = Some(attrs);
        self
    }

    pub fn file_actions(&mut self, actions: FileActionList) -> &mut Self {
        self.actions = Some(actions);
        self
    }

    /// The strategy a spawn of this request would use.
    #[must_use]
    pub fn strategy(&self) -> ForkStrategy {
        let flags = self.attrs.map(|a| a.flags()).unwrap_or_default();
        ForkStrategy::select(flags, self.actions.is_some())
    }

    /// Spawn in the configured runtime mode.
    pub fn spawn(&self) -> Result<libc::pid_t, SpawnError> {
        self.spawn_in(runtime_policy::mode())
    }

    /// Spawn in an explicit runtime mode.
    pub fn spawn_in(&self, mode: SafetyLevel) -> Result<libc::pid_t, SpawnError> {
        let argv = null_terminated(&self.args)?;
        let envp = match &self.env {
            Some(env) => Some(null_terminated(env)?),
            None => None,
        };
        let envp_ptr = match &envp {
            Some(envp) => envp.as_ptr(),
            None => inherited_environment(),
        };
        let exec: ExecFn = if self.search_path {
            libc::execvpe
        } else {
            libc::execve
        };
        let plan = SpawnPlan {
            target: ExecTarget {
                exec,
                path: self.program.as_ptr(),
                argv: argv.as_ptr(),
                envp: envp_ptr,
            },
            attrs: self.attrs.as_ref(),
            actions: self.actions.as_ref(),
        };
        // SAFETY: every pointer in `plan` borrows from `self`, `argv`, or
        // `envp`, all of which outlive the call.
        unsafe { orchestrator::spawn(&plan, mode) }
    }
}

unsafe extern "C" {
    static mut environ: *mut *mut c_char;
}

fn inherited_environment() -> *const *const c_char {
    // SAFETY: reading the process environment pointer.
    unsafe { environ.cast_const().cast::<*const c_char>() }
}

fn null_terminated(strings: &[CString]) -> Result<Vec<*const c_char>, SpawnError> {
    let mut ptrs = Vec::new();
    ptrs.try_reserve_exact(strings.len() + 1)?;
    ptrs.extend(strings.iter().map(|s| s.as_ptr()));
    ptrs.push(std::ptr::null());
    Ok(ptrs)
}

/// Wait for `pid` to terminate and decode its status.
pub fn wait_for_exit(pid: libc::pid_t) -> Result<ExitOutcome, SpawnError> {
    let mut status = 0;
    loop {
        // SAFETY: `status` is a writable int.
        let rc = unsafe { libc::waitpid(pid, &mut status, 0) };
        if rc >= 0 {
            return Ok(ExitOutcome::from_wait_status(status));
        }
        let err = std::io::Error::last_os_error()
            .raw_os_error()
            .unwrap_or(libc::ECHILD);
        if err != libc::EINTR {
            return Err(SpawnError::Os(err));
        }
    }
}

/// Resolve a caller flag word the way `posix_spawnattr_setflags` does in
/// `mode`. Hardened mode masks unknown bits and records the heal.
#[must_use]
pub fn admit_spawn_flags(mode: SafetyLevel, bits: i16) -> i16 {
    runtime_policy::admit_flags(mode, bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use frankenspawn_core::spawn::flags::POSIX_SPAWN_SETSID;

    #[test]
    fn interior_nul_is_rejected() {
        assert_eq!(
            SpawnRequest::new("bad\0name").unwrap_err(),
            SpawnError::InvalidArgument
        );
        let mut req = SpawnRequest::new("/bin/true").unwrap();
        assert!(req.arg("x\0y").is_err());
        assert!(req.env("K", "v\0").is_err());
    }

    #[test]
    fn strategy_tracks_attributes_and_actions() {
        let mut req = SpawnRequest::new("/bin/true").unwrap();
        assert_eq!(req.strategy(), ForkStrategy::Vfork);

        // An empty list is still a list.
        req.file_actions(FileActionList::new());
        assert_eq!(req.strategy(), ForkStrategy::Fork);

        let mut req = SpawnRequest::new("/bin/true").unwrap();
        let mut attrs = SpawnAttributes::new();
        attrs.set_flags(POSIX_SPAWN_SETSID).unwrap();
        req.attributes(attrs);
        assert_eq!(req.strategy(), ForkStrategy::Fork);
    }

    #[test]
    fn admitted_flags_follow_mode() {
        assert_eq!(admit_spawn_flags(SafetyLevel::Strict, 0x101), 0x101);
        assert_eq!(admit_spawn_flags(SafetyLevel::Hardened, 0x101), 0x01);
        assert_eq!(
            admit_spawn_flags(SafetyLevel::Hardened, POSIX_SPAWN_SETSID),
            POSIX_SPAWN_SETSID
        );
    }

    #[test]
    fn pointer_array_is_null_terminated() {
        let strings = vec![c"a".to_owned(), c"b".to_owned()];
        let ptrs = null_terminated(&strings).unwrap();
        assert_eq!(ptrs.len(), 3);
        assert!(ptrs[2].is_null());
        assert_eq!(ptrs[0], strings[0].as_ptr());
    }
}
