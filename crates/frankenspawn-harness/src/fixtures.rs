//! Fixture loading and management.

use std::collections::BTreeMap;
use std::ffi::CString;
use std::path::Path;

use frankenspawn_core::spawn::{FileActionList, SpawnError};
use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// One deferred file action, as written in fixture JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FixtureFileAction {
    Open {
        fd: i32,
        path: String,
        #[serde(default)]
        oflag: i32,
        #[serde(default)]
        mode: u32,
    },
    Close {
        fd: i32,
    },
    Dup2 {
        fd: i32,
        new_fd: i32,
    },
    Chdir {
        path: String,
    },
    Fchdir {
        fd: i32,
    },
}

fn c_path(path: &str) -> Result<CString, SpawnError> {
    CString::new(path).map_err(|_| SpawnError::InvalidArgument)
}

impl FixtureFileAction {
    /// Append this action, with the same validation the C entry points apply.
    pub fn append_to(&self, list: &mut FileActionList) -> Result<(), SpawnError> {
        match self {
            Self::Open {
                fd,
                path,
                oflag,
                mode,
            } => list.add_open(*fd, &c_path(path)?, *oflag, *mode),
            Self::Close { fd } => list.add_close(*fd),
            Self::Dup2 { fd, new_fd } => list.add_dup2(*fd, *new_fd),
            Self::Chdir { path } => list.add_chdir(&c_path(path)?),
            Self::Fchdir { fd } => list.add_fchdir(*fd),
        }
    }
}

/// A single spawn case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureCase {
    /// Case identifier.
    pub name: String,
    /// Program path (or bare name when `search_path` is set).
    pub program: String,
    /// Arguments after `argv[0]`.
    #[serde(default)]
    pub args: Vec<String>,
    /// Use `posix_spawnp` semantics.
    #[serde(default)]
    pub search_path: bool,
    /// Explicit environment; inherited when absent.
    #[serde(default)]
    pub env: Option<BTreeMap<String, String>>,
    /// Raw `posix_spawnattr_setflags` word. No attributes object when absent.
    #[serde(default)]
    pub flags: Option<i16>,
    #[serde(default)]
    pub process_group: Option<i32>,
    #[serde(default)]
    pub file_actions: Vec<FixtureFileAction>,
    /// Expected child exit code when the spawn call succeeds.
    #[serde(default)]
    pub expected_exit_code: Option<i32>,
    /// Expected errno from the spawn (or builder) call.
    #[serde(default)]
    pub expected_errno: Option<i32>,
    /// Expected fork strategy (`fork` or `vfork`).
    #[serde(default)]
    pub expected_strategy: Option<String>,
    /// `strict`, `hardened`, or `both`.
    #[serde(default = "default_case_mode")]
    pub mode: String,
}

fn default_case_mode() -> String {
    String::from("both")
}

impl FixtureCase {
    /// The C symbol this case exercises.
    #[must_use]
    pub fn symbol(&self) -> &'static str {
        if self.search_path {
            "posix_spawnp"
        } else {
            "posix_spawn"
        }
    }

    /// Expected result rendered as `exit:N` or `errno:N`.
    pub fn expected_output(&self) -> Result<String, HarnessError> {
        match (self.expected_exit_code, self.expected_errno) {
            (Some(code), None) => Ok(format!("exit:{code}")),
            (None, Some(errno)) => Ok(format!("errno:{errno}")),
            _ => Err(HarnessError::InvalidFixture {
                case: self.name.clone(),
                reason: String::from(
                    "exactly one of expected_exit_code / expected_errno is required",
                ),
            }),
        }
    }
}

/// A collection of spawn cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureSet {
    /// Schema version.
    pub version: String,
    /// Family name (e.g. `spawn/file_actions`).
    pub family: String,
    /// Individual test cases.
    pub cases: Vec<FixtureCase>,
}

impl FixtureSet {
    /// Load fixture set from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize fixture set to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load fixture set from a file path.
    pub fn from_file(path: &Path) -> Result<Self, HarnessError> {
        let content = std::fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
        Ok(Self::from_json(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_file_actions_with_defaults() {
        let set = FixtureSet::from_json(
            r#"{
                "version":"v1",
                "family":"spawn/smoke",
                "cases":[
                    {"name":"redirect","program":"/bin/sh","args":["-c","true"],
                     "file_actions":[{"op":"open","fd":1,"path":"/dev/null","oflag":1},
                                     {"op":"dup2","fd":1,"new_fd":2},
                                     {"op":"close","fd":0}],
                     "expected_exit_code":0}
                ]
            }"#,
        )
        .expect("valid fixture json");
        let case = &set.cases[0];
        assert_eq!(case.mode, "both");
        assert_eq!(case.symbol(), "posix_spawn");
        assert_eq!(case.file_actions.len(), 3);
        assert_eq!(
            case.file_actions[0],
            FixtureFileAction::Open {
                fd: 1,
                path: String::from("/dev/null"),
                oflag: 1,
                mode: 0,
            }
        );
        assert_eq!(case.expected_output().unwrap(), "exit:0");
    }

    #[test]
    fn expected_output_requires_exactly_one_expectation() {
        let mut case: FixtureCase =
            serde_json::from_str(r#"{"name":"x","program":"/bin/true"}"#).unwrap();
        assert!(case.expected_output().is_err());
        case.expected_errno = Some(9);
        assert_eq!(case.expected_output().unwrap(), "errno:9");
        case.expected_exit_code = Some(0);
        assert!(case.expected_output().is_err());
    }

    #[test]
    fn negative_fd_fails_when_appended() {
        let mut list = FileActionList::new();
        let action = FixtureFileAction::Close { fd: -1 };
        assert_eq!(action.append_to(&mut list), Err(SpawnError::InvalidFd(-1)));
        assert!(list.is_empty());
    }
}
