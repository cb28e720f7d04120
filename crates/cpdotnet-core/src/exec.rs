// ── Execution port ──
//
// Every external program the orchestrator drives (systemctl, journalctl,
// the web-server reload) goes through `CommandRunner`. Production uses
// `SystemRunner`; tests inject a fake that records invocations.

use std::process::Stdio;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::error::CoreError;

/// Exit code and captured output of one external command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Runs external programs on behalf of the orchestrator.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` to completion and capture its output.
    ///
    /// A non-zero exit is *not* an error at this level; only failing to
    /// launch the program is.
    async fn run(&self, program: &str, args: &[String]) -> Result<ExecOutput, CoreError>;
}

/// `CommandRunner` backed by real child processes.
///
/// Children are never killed when the caller stops waiting: once a service
/// manager call is launched it runs to completion.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<ExecOutput, CoreError> {
        debug!(command = %command_line(program, args), "running external command");

        let output = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(false)
            .output()
            .await
            .map_err(|source| CoreError::Spawn {
                program: program.to_owned(),
                source,
            })?;

        // Killed by a signal: no exit code to report.
        let code = output.status.code().unwrap_or(-1);
        debug!(program, code, "external command finished");

        Ok(ExecOutput {
            code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Render a program and its arguments as a single display string.
pub fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}
