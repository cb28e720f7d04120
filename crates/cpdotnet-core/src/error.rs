// ── Core error types ──
//
// Every failure an orchestration request can produce. Validation errors
// are raised before any side effect; `Service` carries the captured
// output of the external command that failed so the operator can read it
// verbatim. Nothing in this crate retries a `Service` failure.

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Input errors ─────────────────────────────────────────────────
    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("{entity} not found: {identifier}")]
    NotFound { entity: String, identifier: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    // ── External process errors ──────────────────────────────────────
    #[error("{action} of {unit} failed with exit code {code}")]
    Service {
        unit: String,
        action: String,
        code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("Release {release} is live but {unit} was not restarted")]
    RestartPending {
        domain: String,
        unit: String,
        release: PathBuf,
        #[source]
        source: Box<CoreError>,
    },

    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    // ── Local state errors ───────────────────────────────────────────
    #[error("Filesystem error at {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("State file {} is unreadable: {message}", .path.display())]
    CorruptState { path: PathBuf, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn site_not_found(domain: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "site".into(),
            identifier: domain.into(),
        }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Storage { path, source }
    }

    /// Numeric result code carried in the action report.
    ///
    /// External failures report the exit code of the process that failed;
    /// local failures use the same numbering as the CLI exit codes.
    pub fn result_code(&self) -> i32 {
        match self {
            Self::InvalidInput { .. } => 2,
            Self::NotFound { .. } => 4,
            Self::Conflict { .. } => 6,
            Self::Service { code, .. } => {
                if *code == 0 {
                    1
                } else {
                    *code
                }
            }
            Self::RestartPending { source, .. } => source.result_code(),
            Self::Spawn { .. } => 127,
            Self::Storage { .. } | Self::CorruptState { .. } | Self::Internal(_) => 1,
        }
    }
}
