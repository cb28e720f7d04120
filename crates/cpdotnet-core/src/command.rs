// ── Command API ──
//
// Every request the orchestrator serves is one `Command`. Fields carry the
// caller's raw input; validation happens inside `Orchestrator::execute`
// so that rejected input still produces a full action report.

use std::path::PathBuf;

use tokio::task::JoinHandle;

use crate::error::CoreError;
use crate::report::{ActionFailure, ActionReport, Transcript};

/// All operations against a hosted domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Register (or update) a domain in `Dotnet` mode and create its unit.
    Enable {
        domain: String,
        entry_assembly: String,
        port: Option<u16>,
    },
    /// Copy a build into a new release and make it live.
    Deploy {
        domain: String,
        source: Option<PathBuf>,
    },
    ToggleMode { domain: String, mode: String },
    Restart { domain: String },
    SignalrToggle {
        domain: String,
        state: String,
        hubs: Vec<String>,
    },
    Status { domain: String, lines: Option<usize> },
    /// Re-point the live release at the one before it.
    Rollback { domain: String },
    /// Re-derive the unit file and proxy fragment from the stored record.
    Reconcile { domain: String },
}

impl Command {
    /// The effective action in command-line form, as echoed in reports.
    pub fn describe(&self) -> String {
        match self {
            Self::Enable {
                domain,
                entry_assembly,
                port,
            } => {
                let mut out = format!("enable {domain} --dll {entry_assembly}");
                if let Some(port) = port {
                    out.push_str(&format!(" --port {port}"));
                }
                out
            }
            Self::Deploy { domain, source } => match source {
                Some(path) => format!("deploy {domain} --from {}", path.display()),
                None => format!("deploy {domain}"),
            },
            Self::ToggleMode { domain, mode } => format!("toggle {domain} {mode}"),
            Self::Restart { domain } => format!("restart {domain}"),
            Self::SignalrToggle {
                domain,
                state,
                hubs,
            } => {
                let mut out = format!("signalr {domain} {state}");
                for hub in hubs {
                    out.push(' ');
                    out.push_str(hub);
                }
                out
            }
            Self::Status { domain, lines } => match lines {
                Some(n) => format!("status {domain} --lines {n}"),
                None => format!("status {domain}"),
            },
            Self::Rollback { domain } => format!("rollback {domain}"),
            Self::Reconcile { domain } => format!("reconcile {domain}"),
        }
    }
}

// ── Submission ──────────────────────────────────────────────────────

/// Outcome of submitting a command with an advisory deadline.
#[derive(Debug)]
pub enum Submission {
    Finished(Result<ActionReport, ActionFailure>),
    /// The deadline elapsed; the action keeps running to completion.
    Pending(PendingAction),
}

/// An action still running after its deadline.
#[derive(Debug)]
pub struct PendingAction {
    action: String,
    handle: JoinHandle<Result<ActionReport, ActionFailure>>,
}

impl PendingAction {
    pub(crate) fn new(
        action: String,
        handle: JoinHandle<Result<ActionReport, ActionFailure>>,
    ) -> Self {
        Self { action, handle }
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// Wait for the action to finish.
    pub async fn wait(self) -> Result<ActionReport, ActionFailure> {
        joined(self.action, self.handle.await)
    }
}

pub(crate) fn joined(
    action: String,
    result: Result<Result<ActionReport, ActionFailure>, tokio::task::JoinError>,
) -> Result<ActionReport, ActionFailure> {
    result.unwrap_or_else(|e| {
        Err(Transcript::new(action).fail(CoreError::Internal(format!("action task failed: {e}"))))
    })
}
