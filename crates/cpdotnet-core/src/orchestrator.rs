// ── Orchestrator ──
//
// Owns control flow for every request: validate input, take the domain's
// lock (in-process and through a lock file in the state directory),
// mutate the config store, then bring the projections (unit file,
// proxy fragment) and the running process in line with it. If a
// projection fails right after a store mutation, the previous record is
// put back and its projections re-applied.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::command::{Command, PendingAction, Submission, joined};
use crate::config::HostConfig;
use crate::deploy::DeploymentEngine;
use crate::error::CoreError;
use crate::exec::CommandRunner;
use crate::hubs::HubChange;
use crate::lock::FileLock;
use crate::model::{DeploymentRecord, Domain, EntryAssembly, HubToggle, Mode, SiteRecord};
use crate::proxy::{self, ConfigFragment, ProxyConfigurator};
use crate::report::{ActionFailure, ActionReport, Transcript};
use crate::store::ConfigStore;
use crate::supervisor::ProcessSupervisor;

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<Inner>`. Mutating commands on one domain run
/// one at a time, also across processes; different domains proceed in
/// parallel.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

/// Both halves of a domain lock; released together on drop.
struct DomainGuard {
    _file: FileLock,
    _local: OwnedMutexGuard<()>,
}

struct Inner {
    config: HostConfig,
    store: Arc<ConfigStore>,
    proxy: ProxyConfigurator,
    supervisor: Arc<ProcessSupervisor>,
    deployer: DeploymentEngine,
    locks: DashMap<Domain, Arc<Mutex<()>>>,
}

impl Orchestrator {
    /// Open the site registry and wire the components to `runner`.
    pub fn new(config: HostConfig, runner: Arc<dyn CommandRunner>) -> Result<Self, CoreError> {
        let store = Arc::new(ConfigStore::open(config.state_file(), config.ports)?);
        let proxy = ProxyConfigurator::new(config.proxy.clone(), Arc::clone(&runner));
        let supervisor = Arc::new(ProcessSupervisor::new(
            config.service.clone(),
            config.sites_root.clone(),
            runner,
        ));
        let deployer = DeploymentEngine::new(
            config.sites_root.clone(),
            config.release_retention,
            Arc::clone(&store),
            Arc::clone(&supervisor),
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                store,
                proxy,
                supervisor,
                deployer,
                locks: DashMap::new(),
            }),
        })
    }

    // ── Command execution ────────────────────────────────────────────

    /// Run one command to completion and report what happened.
    pub async fn execute(&self, cmd: Command) -> Result<ActionReport, ActionFailure> {
        let mut transcript = Transcript::new(cmd.describe());
        debug!(action = %cmd.describe(), "executing");

        match self.dispatch(cmd, &mut transcript).await {
            Ok(()) => Ok(transcript.finish()),
            Err(e) => {
                warn!(error = %e, "action failed");
                Err(transcript.fail(e))
            }
        }
    }

    /// Run `cmd` on its own task, waiting at most `deadline` for it.
    ///
    /// The deadline is advisory: when it elapses the caller gets a
    /// [`PendingAction`] and the command keeps running to completion.
    pub async fn submit(&self, cmd: Command, deadline: Option<Duration>) -> Submission {
        let action = cmd.describe();
        let this = self.clone();
        let mut handle = tokio::spawn(async move { this.execute(cmd).await });

        let Some(deadline) = deadline else {
            return Submission::Finished(joined(action, handle.await));
        };
        match tokio::time::timeout(deadline, &mut handle).await {
            Ok(result) => Submission::Finished(joined(action, result)),
            Err(_) => {
                info!(action = %action, ?deadline, "action still in progress");
                Submission::Pending(PendingAction::new(action, handle))
            }
        }
    }

    async fn dispatch(&self, cmd: Command, t: &mut Transcript) -> Result<(), CoreError> {
        match cmd {
            Command::Enable {
                domain,
                entry_assembly,
                port,
            } => self.enable(&domain, &entry_assembly, port, t).await,
            Command::Deploy { domain, source } => self.deploy(&domain, source, t).await,
            Command::ToggleMode { domain, mode } => self.toggle_mode(&domain, &mode, t).await,
            Command::Restart { domain } => self.restart(&domain, t).await,
            Command::SignalrToggle {
                domain,
                state,
                hubs,
            } => self.toggle_hubs(&domain, &state, &hubs, t).await,
            Command::Status { domain, lines } => self.status(&domain, lines, t).await,
            Command::Rollback { domain } => self.rollback(&domain, t).await,
            Command::Reconcile { domain } => self.reconcile(&domain, t).await,
        }
    }

    // ── Handlers ─────────────────────────────────────────────────────

    async fn enable(
        &self,
        domain: &str,
        entry_assembly: &str,
        port: Option<u16>,
        t: &mut Transcript,
    ) -> Result<(), CoreError> {
        let domain = Domain::parse(domain)?;
        let entry_assembly = EntryAssembly::parse(entry_assembly)?;
        let _guard = self.lock_domain(&domain).await?;

        let previous = self.inner.store.find(&domain)?;
        let site = self
            .inner
            .store
            .upsert_site(&domain, Mode::Dotnet, &entry_assembly, port)?;
        t.site = Some(site.clone());
        self.commit(&site, previous, true, t).await?;

        if self.inner.deployer.has_live_release(&domain) {
            self.inner.supervisor.restart(&domain, t).await?;
        } else {
            t.note(format!("{domain} has no release yet; deploy a build to start it"));
        }
        info!(domain = %domain, port = ?site.listen_port, "enabled");
        Ok(())
    }

    async fn deploy(
        &self,
        domain: &str,
        source: Option<PathBuf>,
        t: &mut Transcript,
    ) -> Result<(), CoreError> {
        let domain = Domain::parse(domain)?;
        if let Some(path) = &source {
            if !path.is_absolute() {
                return Err(CoreError::invalid(
                    "source path",
                    format!("'{}' must be an absolute directory", path.display()),
                ));
            }
        }
        let _guard = self.lock_domain(&domain).await?;

        let site = self.inner.store.get(&domain)?;
        let source = source.or_else(|| site.source_path.clone()).ok_or_else(|| {
            CoreError::invalid(
                "source path",
                format!("{domain} has no previous deployment; pass a source directory"),
            )
        })?;

        let result = self.inner.deployer.deploy(&site, &source, t).await;
        self.refresh_site(&domain, t);
        result.map(drop)
    }

    async fn rollback(&self, domain: &str, t: &mut Transcript) -> Result<(), CoreError> {
        let domain = Domain::parse(domain)?;
        let _guard = self.lock_domain(&domain).await?;

        let site = self.inner.store.get(&domain)?;
        let result = self.inner.deployer.rollback(&site, t).await;
        self.refresh_site(&domain, t);
        result.map(drop)
    }

    async fn toggle_mode(
        &self,
        domain: &str,
        mode: &str,
        t: &mut Transcript,
    ) -> Result<(), CoreError> {
        let domain = Domain::parse(domain)?;
        let mode = Mode::parse(mode)?;
        let _guard = self.lock_domain(&domain).await?;

        let previous = self.inner.store.get(&domain)?;
        let site = self.inner.store.set_mode(&domain, mode)?;
        t.site = Some(site.clone());
        self.commit(&site, Some(previous), site.is_dotnet(), t).await?;

        match mode {
            Mode::Dotnet if self.inner.deployer.has_live_release(&domain) => {
                self.inner.supervisor.restart(&domain, t).await?;
            }
            Mode::Dotnet => {
                t.note(format!("{domain} has no release yet; deploy a build to start it"));
            }
            Mode::Php if self.inner.supervisor.unit_exists(&domain) => {
                self.inner.supervisor.stop(&domain, t).await?;
            }
            Mode::Php => t.note(format!("{} does not exist; nothing to stop", domain.unit_name())),
        }
        info!(domain = %domain, %mode, "switched mode");
        Ok(())
    }

    async fn restart(&self, domain: &str, t: &mut Transcript) -> Result<(), CoreError> {
        let domain = Domain::parse(domain)?;
        let _guard = self.lock_domain(&domain).await?;

        let site = self.inner.store.get(&domain)?;
        t.site = Some(site.clone());
        if !site.is_dotnet() {
            return Err(CoreError::invalid(
                "mode",
                format!("{domain} is served by php; there is no application to restart"),
            ));
        }
        self.inner.supervisor.restart(&domain, t).await
    }

    async fn toggle_hubs(
        &self,
        domain: &str,
        state: &str,
        hubs: &[String],
        t: &mut Transcript,
    ) -> Result<(), CoreError> {
        let domain = Domain::parse(domain)?;
        let change = HubChange::plan(HubToggle::parse(state)?, hubs)?;
        let _guard = self.lock_domain(&domain).await?;

        let previous = self.inner.store.get(&domain)?;
        let site = change.apply(&self.inner.store, &domain)?;
        t.site = Some(site.clone());
        t.note(change.summary());
        if !site.is_dotnet() {
            t.note(format!("{domain} is served by php; hub routes apply once it runs dotnet"));
        }
        // Only the web server is reloaded; the application keeps running.
        self.commit(&site, Some(previous), false, t).await
    }

    async fn status(
        &self,
        domain: &str,
        lines: Option<usize>,
        t: &mut Transcript,
    ) -> Result<(), CoreError> {
        let domain = Domain::parse(domain)?;
        let site = self.inner.store.get(&domain)?;
        let lines = lines.unwrap_or(self.inner.config.service.log_lines);

        let status = self.inner.supervisor.status(&domain, lines, t).await?;
        t.site = Some(site);
        t.unit = Some(status);
        Ok(())
    }

    async fn reconcile(&self, domain: &str, t: &mut Transcript) -> Result<(), CoreError> {
        let domain = Domain::parse(domain)?;
        let _guard = self.lock_domain(&domain).await?;

        let site = self.inner.store.get(&domain)?;
        t.site = Some(site.clone());
        self.project(&site, site.is_dotnet(), t).await
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn sites(&self) -> Result<Vec<SiteRecord>, CoreError> {
        self.inner.store.list()
    }

    pub fn site(&self, domain: &str) -> Result<SiteRecord, CoreError> {
        self.inner.store.get(&Domain::parse(domain)?)
    }

    pub fn deployments(&self, domain: &str) -> Result<Vec<DeploymentRecord>, CoreError> {
        self.inner.store.deployments(&Domain::parse(domain)?)
    }

    /// The fragment the stored record renders to, without applying it.
    pub fn render(&self, domain: &str) -> Result<ConfigFragment, CoreError> {
        let site = self.site(domain)?;
        Ok(proxy::render(&site, &self.inner.config.proxy))
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Serialize mutating commands on `domain`: first among this process's
    /// tasks, then against other processes through the domain's lock file.
    async fn lock_domain(&self, domain: &Domain) -> Result<DomainGuard, CoreError> {
        let lock = Arc::clone(&self.inner.locks.entry(domain.clone()).or_default());
        let local = lock.lock_owned().await;
        let path = self.inner.config.domain_lock_file(domain);
        let file = FileLock::acquire_blocking(path).await?;
        debug!(domain = %domain, "holding domain lock");
        Ok(DomainGuard {
            _file: file,
            _local: local,
        })
    }

    /// Bring projections in line with a freshly mutated `site`; on failure
    /// put `previous` back and re-apply its projections. A site that did
    /// not exist before loses its fragment and unit again.
    async fn commit(
        &self,
        site: &SiteRecord,
        previous: Option<SiteRecord>,
        with_unit: bool,
        t: &mut Transcript,
    ) -> Result<(), CoreError> {
        let Err(e) = self.project(site, with_unit, t).await else {
            return Ok(());
        };

        warn!(domain = %site.domain, error = %e, "projection failed; restoring previous record");
        if let Err(restore) = self.inner.store.restore(&site.domain, previous.clone()) {
            t.warn(format!("could not restore previous record: {restore}"));
            return Err(e);
        }
        t.site = previous.clone();

        let undo = match &previous {
            Some(record) => self.project(record, with_unit && record.is_dotnet(), t).await,
            None => {
                let fragment = self.inner.proxy.remove(&site.domain, t).await;
                let unit = if with_unit {
                    self.inner.supervisor.remove_unit(&site.domain, t).await
                } else {
                    Ok(())
                };
                fragment.and(unit)
            }
        };
        if let Err(undo) = undo {
            t.warn(format!("could not re-apply previous configuration: {undo}"));
        }
        Err(e)
    }

    async fn project(
        &self,
        site: &SiteRecord,
        with_unit: bool,
        t: &mut Transcript,
    ) -> Result<(), CoreError> {
        if with_unit {
            self.inner.supervisor.ensure_unit(site, t).await?;
        }
        self.inner.proxy.apply(site, t).await.map(drop)
    }

    fn refresh_site(&self, domain: &Domain, t: &mut Transcript) {
        match self.inner.store.find(domain) {
            Ok(site) => t.site = site,
            Err(e) => warn!(domain = %domain, error = %e, "could not re-read site record"),
        }
    }
}
