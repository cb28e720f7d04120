//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with help text
//! and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use cpdotnet_config::ConfigError;
use cpdotnet_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const SERVICE: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(cpdotnet::validation))]
    Validation { field: String, reason: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(cpdotnet::not_found),
        help("Run: cyberpanel-dotnet sites list to see registered domains")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    #[error("{message}")]
    #[diagnostic(code(cpdotnet::conflict))]
    Conflict { message: String },

    // ── External commands ────────────────────────────────────────────
    #[error("{action} of {unit} failed with exit code {code}")]
    #[diagnostic(
        code(cpdotnet::service),
        help("The captured stderr is included in the action report above.")
    )]
    Service {
        unit: String,
        action: String,
        code: i32,
    },

    #[error("Release {release} is live but {unit} was not restarted")]
    #[diagnostic(
        code(cpdotnet::restart_pending),
        help("Fix the service and run: cyberpanel-dotnet restart {domain}")
    )]
    RestartPending {
        domain: String,
        unit: String,
        release: String,
    },

    #[error("Failed to launch {program}")]
    #[diagnostic(
        code(cpdotnet::spawn),
        help("Check that {program} is installed and on PATH, or set it in the config file.")
    )]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(cpdotnet::config),
        help("Inspect the effective settings with: cyberpanel-dotnet config show")
    )]
    Config(#[from] ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(cpdotnet::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Local state / IO ─────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(cpdotnet::state))]
    State(CoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(cpdotnet::serialization))]
    Serialization(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::Config(ConfigError::Validation { .. }) => exit_code::USAGE,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Service { .. } | Self::RestartPending { .. } | Self::Spawn { .. } => {
                exit_code::SERVICE
            }
            Self::Config(_) | Self::State(_) | Self::Io(_) | Self::Serialization(_) => {
                exit_code::GENERAL
            }
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidInput { field, reason } => Self::Validation { field, reason },
            CoreError::NotFound { entity, identifier } => Self::NotFound {
                resource_type: entity,
                identifier,
            },
            CoreError::Conflict { message } => Self::Conflict { message },
            CoreError::Service {
                unit, action, code, ..
            } => Self::Service { unit, action, code },
            CoreError::RestartPending {
                domain,
                unit,
                release,
                ..
            } => Self::RestartPending {
                domain,
                unit,
                release: release.display().to_string(),
            },
            CoreError::Spawn { program, source } => Self::Spawn { program, source },
            other @ (CoreError::Storage { .. }
            | CoreError::CorruptState { .. }
            | CoreError::Internal(_)) => Self::State(other),
        }
    }
}
