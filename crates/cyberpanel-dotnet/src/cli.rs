//! Clap derive structures for the `cyberpanel-dotnet` CLI.
//!
//! Defines the command tree, global flags, and shared value enums. This file
//! is also compiled by `build.rs` for man-page generation, so it may only
//! depend on `clap` and `clap_complete`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// cyberpanel-dotnet -- host .NET applications next to PHP sites
#[derive(Debug, Parser)]
#[command(
    name = "cyberpanel-dotnet",
    version,
    about = "Host .NET applications on a PHP web panel",
    long_about = "Switches domains between PHP and reverse-proxied .NET serving.\n\n\
        Each .NET site runs as a dotnet-<domain> service unit behind a\n\
        generated virtual-host fragment. Deployments are kept as releases\n\
        so the previous build can be restored with `rollback`.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration file (default: /etc/cyberpanel-dotnet/config.toml)
    #[arg(long, short = 'c', env = "CPDOTNET_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format (default from the config file, else json)
    #[arg(long, short = 'o', env = "CPDOTNET_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Seconds before an action is reported as still in progress (0 = never)
    #[arg(long, env = "CPDOTNET_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table
    Table,
    /// Pretty-printed JSON (default, what the panel parses)
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register a domain for .NET hosting and create its service unit
    Enable(EnableArgs),

    /// Copy a build into a new release and make it live
    Deploy(DeployArgs),

    /// Switch a domain between PHP and .NET serving
    Toggle(ToggleArgs),

    /// Restart the .NET service of a domain
    Restart(DomainArg),

    /// Enable, replace or disable real-time hub routes
    #[command(alias = "hubs")]
    Signalr(SignalrArgs),

    /// Show service state and recent log lines
    Status(StatusArgs),

    /// Make the previous release live again
    Rollback(DomainArg),

    /// Rewrite the unit file and proxy fragment from the stored record
    Reconcile(DomainArg),

    /// Print the proxy fragment for a domain without applying it
    Render(DomainArg),

    /// List the deployment history of a domain
    #[command(alias = "history")]
    Deployments(DomainArg),

    /// Inspect registered sites
    #[command(alias = "s")]
    Sites(SitesArgs),

    /// Manage the tool configuration file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Site Actions ─────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DomainArg {
    /// Fully qualified domain name
    pub domain: String,
}

#[derive(Debug, Args)]
pub struct EnableArgs {
    /// Fully qualified domain name
    pub domain: String,

    /// Entry assembly started by the dotnet runtime, e.g. MyApp.dll
    #[arg(long = "dll", value_name = "ASSEMBLY")]
    pub dll: String,

    /// Loopback port (allocated from the configured range when omitted)
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Debug, Args)]
pub struct DeployArgs {
    /// Fully qualified domain name
    pub domain: String,

    /// Absolute build directory (defaults to the last one deployed)
    #[arg(long = "from", value_name = "DIR")]
    pub from: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ToggleArgs {
    /// Fully qualified domain name
    pub domain: String,

    /// Target mode: php or dotnet
    pub mode: String,
}

#[derive(Debug, Args)]
pub struct SignalrArgs {
    /// Fully qualified domain name
    pub domain: String,

    /// on or off
    pub state: String,

    /// Hub paths; with `on`, replaces the registered set
    pub hubs: Vec<String>,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Fully qualified domain name
    pub domain: String,

    /// Number of recent log lines
    #[arg(long, short = 'n')]
    pub lines: Option<usize>,
}

// ── Sites ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SitesArgs {
    #[command(subcommand)]
    pub command: SitesCommand,
}

#[derive(Debug, Subcommand)]
pub enum SitesCommand {
    /// List all registered sites
    #[command(alias = "ls")]
    List,

    /// Show one site record
    Show(DomainArg),
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Print the configuration file path
    Path,

    /// Write a configuration file with the built-in defaults
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
