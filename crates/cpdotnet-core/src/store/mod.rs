// ── Config store ──
//
// The single source of truth for site hosting configuration and
// deployment history. Proxy fragments and unit files are projections of
// what lives here. Several processes share the registry file: reads load
// it from disk, and every mutation re-reads it under an exclusive lock on
// `sites.lock`, applies the change to that fresh copy, and replaces the
// file atomically. A failed mutation leaves the file untouched.

mod ports;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::atomic::{read_optional, write_atomic};
use crate::config::PortRange;
use crate::error::CoreError;
use crate::lock::FileLock;
use crate::model::{
    DeploymentKind, DeploymentRecord, Domain, EntryAssembly, HubPath, Mode, SiteRecord,
};

/// On-disk shape of the registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    #[serde(default)]
    sites: BTreeMap<Domain, SiteRecord>,
    #[serde(default)]
    deployments: BTreeMap<Domain, Vec<DeploymentRecord>>,
}

/// Persistent registry of [`SiteRecord`]s and [`DeploymentRecord`]s.
///
/// Safe to share between threads and between processes. Callers that need
/// read-modify-write consistency across several calls hold the
/// orchestrator's per-domain lock.
pub struct ConfigStore {
    path: PathBuf,
    lock_path: PathBuf,
    ports: PortRange,
    writer: Mutex<()>,
}

impl ConfigStore {
    /// Open the registry at `path`. A missing file is an empty registry;
    /// nothing is written until the first mutation.
    pub fn open(path: impl Into<PathBuf>, ports: PortRange) -> Result<Self, CoreError> {
        let path = path.into();
        let store = Self {
            lock_path: path.with_extension("lock"),
            path,
            ports,
            writer: Mutex::new(()),
        };
        let state = store.load()?;
        debug!(path = %store.path.display(), sites = state.sites.len(), "opened site registry");
        Ok(store)
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn get(&self, domain: &Domain) -> Result<SiteRecord, CoreError> {
        self.find(domain)?
            .ok_or_else(|| CoreError::site_not_found(domain.as_str()))
    }

    pub fn find(&self, domain: &Domain) -> Result<Option<SiteRecord>, CoreError> {
        Ok(self.load()?.sites.remove(domain))
    }

    /// All sites, ordered by domain.
    pub fn list(&self) -> Result<Vec<SiteRecord>, CoreError> {
        Ok(self.load()?.sites.into_values().collect())
    }

    /// Deployment history of a domain, oldest first.
    pub fn deployments(&self, domain: &Domain) -> Result<Vec<DeploymentRecord>, CoreError> {
        let mut state = self.load()?;
        if !state.sites.contains_key(domain) {
            return Err(CoreError::site_not_found(domain.as_str()));
        }
        Ok(state.deployments.remove(domain).unwrap_or_default())
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Create or update a site.
    ///
    /// A `Dotnet` site keeps its existing port, takes `requested_port` if
    /// given, or gets the lowest free port of the configured range.
    pub fn upsert_site(
        &self,
        domain: &Domain,
        mode: Mode,
        entry_assembly: &EntryAssembly,
        requested_port: Option<u16>,
    ) -> Result<SiteRecord, CoreError> {
        let ports = self.ports;
        self.mutate(|state| {
            let now = Utc::now();
            let existing = state.sites.get(domain).cloned();

            let held = existing.as_ref().and_then(|s| s.listen_port);
            let listen_port = match (requested_port, held) {
                (Some(port), _) => {
                    ports::check_requested(state.sites.values(), domain, port)?;
                    Some(port)
                }
                (None, Some(port)) => Some(port),
                (None, None) if mode == Mode::Dotnet => {
                    Some(ports::allocate(state.sites.values(), domain, ports)?)
                }
                (None, None) => None,
            };
            if mode == Mode::Dotnet {
                if let Some(port) = listen_port {
                    ports::check_unique(state.sites.values(), domain, port)?;
                }
            }

            let record = match existing {
                Some(mut site) => {
                    site.mode = mode;
                    site.entry_assembly = entry_assembly.clone();
                    site.listen_port = listen_port;
                    site.updated_at = now;
                    site
                }
                None => SiteRecord {
                    domain: domain.clone(),
                    mode,
                    entry_assembly: entry_assembly.clone(),
                    source_path: None,
                    listen_port,
                    hubs: Vec::new(),
                    hubs_enabled: false,
                    created_at: now,
                    updated_at: now,
                },
            };
            state.sites.insert(domain.clone(), record.clone());
            Ok(record)
        })
    }

    /// Switch the serving mode of an existing site.
    pub fn set_mode(&self, domain: &Domain, mode: Mode) -> Result<SiteRecord, CoreError> {
        let ports = self.ports;
        self.mutate(|state| {
            let mut site = state
                .sites
                .get(domain)
                .cloned()
                .ok_or_else(|| CoreError::site_not_found(domain.as_str()))?;

            if mode == Mode::Dotnet {
                let port = match site.listen_port {
                    Some(port) => port,
                    None => ports::allocate(state.sites.values(), domain, ports)?,
                };
                ports::check_unique(state.sites.values(), domain, port)?;
                site.listen_port = Some(port);
            }
            site.mode = mode;
            site.updated_at = Utc::now();

            state.sites.insert(domain.clone(), site.clone());
            Ok(site)
        })
    }

    /// Append a deployment record and remember where the build came from.
    pub fn record_deployment(
        &self,
        domain: &Domain,
        kind: DeploymentKind,
        source_path: &Path,
        release_path: &Path,
        previous_version_ref: Option<PathBuf>,
    ) -> Result<DeploymentRecord, CoreError> {
        if !source_path.is_absolute() {
            return Err(CoreError::invalid(
                "source path",
                format!("'{}' must be an absolute directory", source_path.display()),
            ));
        }

        self.mutate(|state| {
            let site = state
                .sites
                .get_mut(domain)
                .ok_or_else(|| CoreError::site_not_found(domain.as_str()))?;

            let record = DeploymentRecord {
                id: Uuid::new_v4(),
                domain: domain.clone(),
                kind,
                source_path: source_path.to_path_buf(),
                release_path: release_path.to_path_buf(),
                previous_version_ref,
                deployed_at: Utc::now(),
            };
            site.source_path = Some(source_path.to_path_buf());
            site.updated_at = record.deployed_at;

            state
                .deployments
                .entry(domain.clone())
                .or_default()
                .push(record.clone());
            Ok(record)
        })
    }

    /// Replace the hub set and its enabled flag in one step.
    ///
    /// Every path is normalized before anything is stored: either all of
    /// them are recorded or the call fails on the first invalid one.
    pub fn set_hubs<S: AsRef<str>>(
        &self,
        domain: &Domain,
        hubs: &[S],
        enabled: bool,
    ) -> Result<SiteRecord, CoreError> {
        let hubs = HubPath::normalize_all(hubs)?;
        self.update_site(domain, |site| {
            site.hubs = hubs;
            site.hubs_enabled = enabled;
        })
    }

    /// Turn real-time routes off, keeping the registered hub set.
    pub fn disable_hubs(&self, domain: &Domain) -> Result<SiteRecord, CoreError> {
        self.update_site(domain, |site| site.hubs_enabled = false)
    }

    /// Put a previously read record back, or remove the site if it did not
    /// exist before. Used to undo a mutation whose projection failed.
    pub fn restore(&self, domain: &Domain, previous: Option<SiteRecord>) -> Result<(), CoreError> {
        self.mutate(|state| {
            match previous {
                Some(record) => {
                    state.sites.insert(domain.clone(), record);
                }
                None => {
                    state.sites.remove(domain);
                }
            }
            Ok(())
        })?;
        info!(domain = %domain, "restored previous site record");
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────────

    fn update_site(
        &self,
        domain: &Domain,
        apply: impl FnOnce(&mut SiteRecord),
    ) -> Result<SiteRecord, CoreError> {
        self.mutate(|state| {
            let site = state
                .sites
                .get_mut(domain)
                .ok_or_else(|| CoreError::site_not_found(domain.as_str()))?;
            apply(site);
            site.updated_at = Utc::now();
            Ok(site.clone())
        })
    }

    /// Re-read the registry under the cross-process lock, run `apply`
    /// against it, then persist the result.
    fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut StoreState) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let _writer = self
            .writer
            .lock()
            .map_err(|_| CoreError::Internal("site registry lock poisoned".into()))?;
        let _lock = FileLock::acquire(&self.lock_path)?;

        let mut state = self.load()?;
        let value = apply(&mut state)?;

        let json = serde_json::to_vec_pretty(&state)
            .map_err(|e| CoreError::Internal(format!("failed to serialize registry: {e}")))?;
        write_atomic(&self.path, &json)?;
        Ok(value)
    }

    /// The registry as currently persisted. Writers replace the file in
    /// one rename, so no lock is needed to read a consistent copy.
    fn load(&self) -> Result<StoreState, CoreError> {
        let Some(text) = read_optional(&self.path)? else {
            return Ok(StoreState::default());
        };
        serde_json::from_str(&text).map_err(|e| CoreError::CorruptState {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }
}
