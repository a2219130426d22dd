//! Harness error type.

use std::path::PathBuf;

use frankenspawn_core::spawn::SpawnError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid fixture case '{case}': {reason}")]
    InvalidFixture { case: String, reason: String },
    #[error("spawn failed: {0}")]
    Spawn(#[from] SpawnError),
    #[error("{failed} of {total} cases failed")]
    VerificationFailed { failed: usize, total: usize },
}

impl HarnessError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
