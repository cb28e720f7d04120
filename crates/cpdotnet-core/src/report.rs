// ── Action reports ──
//
// Every request produces the same envelope: success flag, the effective
// action, the external commands that ran, their captured output and a
// numeric result code. `Transcript` accumulates it while an operation runs.

use serde::Serialize;
use thiserror::Error;

use crate::error::CoreError;
use crate::exec::{ExecOutput, command_line};
use crate::model::{DeploymentRecord, SiteRecord, UnitStatus};

/// Response envelope for one orchestrator request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionReport {
    pub ok: bool,
    /// The effective action, e.g. `enable example.com --dll App.dll`.
    pub cmd: String,
    /// External commands run on the caller's behalf, in order.
    pub commands: Vec<String>,
    pub stdout: String,
    pub stderr: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<SiteRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment: Option<DeploymentRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<UnitStatus>,
}

/// A failed request: the envelope describing what happened plus the cause.
#[derive(Debug, Error)]
#[error("`{}` failed", .report.cmd)]
pub struct ActionFailure {
    pub report: ActionReport,
    #[source]
    pub error: CoreError,
}

/// Collects the observable effects of an operation as it runs.
#[derive(Debug, Default)]
pub struct Transcript {
    action: String,
    commands: Vec<String>,
    stdout: String,
    stderr: String,
    pub(crate) site: Option<SiteRecord>,
    pub(crate) deployment: Option<DeploymentRecord>,
    pub(crate) unit: Option<UnitStatus>,
}

impl Transcript {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    /// Record an external command together with its captured output.
    pub fn record(&mut self, program: &str, args: &[String], output: &ExecOutput) {
        self.commands.push(command_line(program, args));
        self.stdout.push_str(&output.stdout);
        self.stderr.push_str(&output.stderr);
    }

    /// Append an informational line to the captured stdout.
    pub fn note(&mut self, line: impl AsRef<str>) {
        self.stdout.push_str(line.as_ref());
        self.stdout.push('\n');
    }

    /// Append a warning line to the captured stderr.
    pub fn warn(&mut self, line: impl AsRef<str>) {
        self.stderr.push_str(line.as_ref());
        self.stderr.push('\n');
    }

    pub fn finish(self) -> ActionReport {
        self.into_report(true, 0)
    }

    pub fn fail(mut self, error: CoreError) -> ActionFailure {
        // Service failures already carry their stderr in the transcript.
        if !matches!(error, CoreError::Service { .. }) {
            self.warn(error.to_string());
        }
        let report = self.into_report(false, error.result_code());
        ActionFailure { report, error }
    }

    fn into_report(self, ok: bool, code: i32) -> ActionReport {
        ActionReport {
            ok,
            cmd: self.action,
            commands: self.commands,
            stdout: self.stdout,
            stderr: self.stderr,
            code,
            site: self.site,
            deployment: self.deployment,
            unit: self.unit,
        }
    }
}
