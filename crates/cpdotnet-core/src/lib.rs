//! Orchestration core for hosting .NET applications on a PHP web panel.
//!
//! Each hosted domain is either served by PHP or reverse-proxied to a local
//! .NET process supervised by systemd. This crate owns the model and every
//! side effect behind that switch:
//!
//! - **[`Orchestrator`]**: facade that validates a [`Command`], serializes
//!   it per domain, mutates the [`ConfigStore`] and brings the projections
//!   in line. [`Orchestrator::submit`] adds an advisory deadline after which
//!   the caller is told the action is still in progress.
//!
//! - **[`ConfigStore`]**: the persisted registry of [`SiteRecord`]s and
//!   [`DeploymentRecord`]s, replaced atomically on every mutation.
//!
//! - **Projections**: [`proxy::render`] turns a record into a virtual-host
//!   fragment; [`supervisor::render_unit`] turns it into a unit file. Both
//!   are regenerated in full, never patched.
//!
//! - **[`CommandRunner`]**: the execution port through which every external
//!   program (`systemctl`, `journalctl`, the web-server reload) is invoked.
//!
//! Every command answers with an [`ActionReport`] carrying the commands
//! that ran and their captured output.

pub mod command;
pub mod config;
pub mod deploy;
pub mod error;
pub mod exec;
pub mod hubs;
pub mod model;
pub mod orchestrator;
pub mod proxy;
pub mod report;
pub mod store;
pub mod supervisor;

mod atomic;
mod lock;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, PendingAction, Submission};
pub use config::{HostConfig, PortRange, ProxySettings, ServiceSettings};
pub use error::CoreError;
pub use exec::{CommandRunner, ExecOutput, SystemRunner};
pub use orchestrator::Orchestrator;
pub use proxy::ConfigFragment;
pub use report::{ActionFailure, ActionReport};
pub use store::ConfigStore;

pub use model::{
    DeploymentKind, DeploymentRecord, Domain, EntryAssembly, HubPath, HubToggle, Mode,
    ServiceUnit, SiteRecord, UnitState, UnitStatus,
};
