//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod actions;
pub mod config_cmd;
pub mod sites;
pub mod util;

use std::time::Duration;

use cpdotnet_config::Config;
use cpdotnet_core::{Command as CoreCommand, Orchestrator};

use crate::cli::{Command, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

/// Per-invocation settings resolved from flags and the config file.
#[derive(Debug, Clone, Copy)]
pub struct Session {
    pub format: OutputFormat,
    pub color: bool,
    pub quiet: bool,
    pub yes: bool,
    pub deadline: Option<Duration>,
}

impl Session {
    pub fn resolve(global: &GlobalOpts, cfg: &Config) -> Result<Self, CliError> {
        Ok(Self {
            format: config::output_format(global, cfg)?,
            color: output::should_color(global.color),
            quiet: global.quiet,
            yes: global.yes,
            deadline: config::deadline(global, cfg),
        })
    }
}

/// Dispatch an orchestrator-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    orchestrator: &Orchestrator,
    session: &Session,
) -> Result<(), CliError> {
    match cmd {
        Command::Enable(args) => {
            let cmd = CoreCommand::Enable {
                domain: args.domain,
                entry_assembly: args.dll,
                port: args.port,
            };
            actions::run(orchestrator, cmd, session).await
        }
        Command::Deploy(args) => {
            let cmd = CoreCommand::Deploy {
                domain: args.domain,
                source: args.from,
            };
            actions::run(orchestrator, cmd, session).await
        }
        Command::Toggle(args) => {
            let cmd = CoreCommand::ToggleMode {
                domain: args.domain,
                mode: args.mode,
            };
            actions::run(orchestrator, cmd, session).await
        }
        Command::Restart(args) => {
            let cmd = CoreCommand::Restart {
                domain: args.domain,
            };
            actions::run(orchestrator, cmd, session).await
        }
        Command::Signalr(args) => {
            let cmd = CoreCommand::SignalrToggle {
                domain: args.domain,
                state: args.state,
                hubs: args.hubs,
            };
            actions::run(orchestrator, cmd, session).await
        }
        Command::Status(args) => {
            let cmd = CoreCommand::Status {
                domain: args.domain,
                lines: args.lines,
            };
            actions::run(orchestrator, cmd, session).await
        }
        Command::Rollback(args) => actions::rollback(orchestrator, args.domain, session).await,
        Command::Reconcile(args) => {
            let cmd = CoreCommand::Reconcile {
                domain: args.domain,
            };
            actions::run(orchestrator, cmd, session).await
        }
        Command::Render(args) => sites::render(orchestrator, &args.domain, session),
        Command::Deployments(args) => sites::deployments(orchestrator, &args.domain, session),
        Command::Sites(args) => sites::handle(orchestrator, args, session),
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
