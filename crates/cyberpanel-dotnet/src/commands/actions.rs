//! Handlers for the state-changing verbs and `status`.
//!
//! Each one submits a core command with the configured deadline and prints
//! the resulting action report, on failure as well as on success.

use std::io::{self, IsTerminal};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use cpdotnet_core::{
    ActionFailure, ActionReport, Command as CoreCommand, Orchestrator, PendingAction, Submission,
};

use crate::error::CliError;
use crate::output;

use super::{Session, util};

pub async fn run(
    orchestrator: &Orchestrator,
    cmd: CoreCommand,
    session: &Session,
) -> Result<(), CliError> {
    let result = match orchestrator.submit(cmd, session.deadline).await {
        Submission::Finished(result) => result,
        Submission::Pending(pending) => wait_pending(pending, session).await,
    };
    report(result, session)
}

pub async fn rollback(
    orchestrator: &Orchestrator,
    domain: String,
    session: &Session,
) -> Result<(), CliError> {
    let message = format!("Make the previous release of {domain} live again?");
    if !util::confirm("rollback", &message, session.yes)? {
        return Ok(());
    }
    run(orchestrator, CoreCommand::Rollback { domain }, session).await
}

/// Tell the operator the deadline passed, then keep waiting: leaving early
/// would drop the runtime and abort the action midway.
async fn wait_pending(
    pending: PendingAction,
    session: &Session,
) -> Result<ActionReport, ActionFailure> {
    tracing::info!(action = pending.action(), "deadline elapsed; action still running");
    if session.quiet {
        return pending.wait().await;
    }
    eprintln!("`{}` is still in progress, waiting for it to finish", pending.action());

    if !io::stderr().is_terminal() {
        return pending.wait().await;
    }
    let spinner = ProgressBar::new_spinner().with_message(pending.action().to_owned());
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} ({elapsed})") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(120));
    let result = pending.wait().await;
    spinner.finish_and_clear();
    result
}

fn report(result: Result<ActionReport, ActionFailure>, session: &Session) -> Result<(), CliError> {
    match result {
        Ok(report) => {
            let out = output::render_report(session.format, &report, session.color)?;
            output::print_output(&out, session.quiet);
            Ok(())
        }
        Err(failure) => {
            let out = output::render_report(session.format, &failure.report, session.color)?;
            output::print_output(&out, session.quiet);
            Err(failure.error.into())
        }
    }
}
