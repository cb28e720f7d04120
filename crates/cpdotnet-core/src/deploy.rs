// ── Deployment engine ──
//
// Layout per domain under the sites root:
//
//   <root>/<domain>/releases/<stamp>-<id>/   one directory per build
//   <root>/<domain>/current -> releases/...  the live release
//
// A deploy copies the build into a fresh release, then swaps `current` by
// renaming a new symlink over it. Until that rename the old release stays
// authoritative; after it the new files are live even if the restart
// that follows fails.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{DeploymentKind, DeploymentRecord, Domain, SiteRecord};
use crate::report::Transcript;
use crate::store::ConfigStore;
use crate::supervisor::ProcessSupervisor;

const RELEASES_DIR: &str = "releases";
const LIVE_LINK: &str = "current";

pub fn site_dir(sites_root: &Path, domain: &Domain) -> PathBuf {
    sites_root.join(domain.as_str())
}

/// The stable path units and tools use to reach the live release.
pub fn live_dir(sites_root: &Path, domain: &Domain) -> PathBuf {
    site_dir(sites_root, domain).join(LIVE_LINK)
}

pub fn releases_dir(sites_root: &Path, domain: &Domain) -> PathBuf {
    site_dir(sites_root, domain).join(RELEASES_DIR)
}

/// Check that `source` is an absolute, existing, non-empty directory.
pub fn validate_source(source: &Path) -> Result<(), CoreError> {
    if !source.is_absolute() {
        return Err(CoreError::invalid(
            "source path",
            format!("'{}' must be an absolute directory", source.display()),
        ));
    }
    if !source.exists() {
        return Err(CoreError::NotFound {
            entity: "source directory".into(),
            identifier: source.display().to_string(),
        });
    }
    if !source.is_dir() {
        return Err(CoreError::invalid(
            "source path",
            format!("'{}' is not a directory", source.display()),
        ));
    }
    let mut entries = fs::read_dir(source).map_err(CoreError::storage(source))?;
    if entries.next().is_none() {
        return Err(CoreError::invalid(
            "source path",
            format!("'{}' is empty", source.display()),
        ));
    }
    Ok(())
}

pub struct DeploymentEngine {
    sites_root: PathBuf,
    retention: usize,
    store: Arc<ConfigStore>,
    supervisor: Arc<ProcessSupervisor>,
}

impl DeploymentEngine {
    pub fn new(
        sites_root: impl Into<PathBuf>,
        retention: usize,
        store: Arc<ConfigStore>,
        supervisor: Arc<ProcessSupervisor>,
    ) -> Self {
        Self {
            sites_root: sites_root.into(),
            retention,
            store,
            supervisor,
        }
    }

    /// Release directory `current` points at, if any.
    pub fn live_target(&self, domain: &Domain) -> Result<Option<PathBuf>, CoreError> {
        let link = live_dir(&self.sites_root, domain);
        match fs::symlink_metadata(&link) {
            Ok(meta) if meta.file_type().is_symlink() => {
                let target = fs::read_link(&link).map_err(CoreError::storage(&link))?;
                Ok(Some(if target.is_absolute() {
                    target
                } else {
                    site_dir(&self.sites_root, domain).join(target)
                }))
            }
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CoreError::storage(&link)(e)),
        }
    }

    /// Whether a live release exists for `domain`.
    pub fn has_live_release(&self, domain: &Domain) -> bool {
        live_dir(&self.sites_root, domain).is_dir()
    }

    /// Copy `source` into a new release, make it live, record it and
    /// restart the unit.
    pub async fn deploy(
        &self,
        site: &SiteRecord,
        source: &Path,
        transcript: &mut Transcript,
    ) -> Result<DeploymentRecord, CoreError> {
        let domain = &site.domain;
        validate_source(source)?;

        let previous = self.live_target(domain)?;
        let release = self.stage(domain, source).await?;
        transcript.note(format!("staged {} from {}", release.display(), source.display()));

        if let Err(e) = self.swap(domain, &release) {
            discard(&release);
            return Err(e);
        }
        let live = live_dir(&self.sites_root, domain);
        transcript.note(format!("{} -> {}", live.display(), release.display()));

        let record = match self.store.record_deployment(
            domain,
            DeploymentKind::Deploy,
            source,
            &release,
            previous.clone(),
        ) {
            Ok(record) => record,
            Err(e) => {
                self.revert_swap(domain, previous.as_deref());
                discard(&release);
                return Err(e);
            }
        };
        info!(domain = %domain, release = %release.display(), "deployed new release");

        let mut keep = vec![release.clone()];
        keep.extend(previous);
        self.prune(domain, &keep, transcript);

        transcript.deployment = Some(record.clone());
        self.restart_after_swap(site, &release, transcript).await?;
        Ok(record)
    }

    /// Point `current` back at the release that was live before the latest
    /// change, record the revert and restart.
    pub async fn rollback(
        &self,
        site: &SiteRecord,
        transcript: &mut Transcript,
    ) -> Result<DeploymentRecord, CoreError> {
        let domain = &site.domain;
        let history = self.store.deployments(domain)?;
        let latest = history.last().ok_or_else(|| CoreError::Conflict {
            message: format!("{domain} has never been deployed"),
        })?;
        let target = latest.previous_version_ref.clone().ok_or_else(|| CoreError::Conflict {
            message: format!("{domain} has no earlier release to roll back to"),
        })?;
        if !target.is_dir() {
            return Err(CoreError::NotFound {
                entity: "release".into(),
                identifier: target.display().to_string(),
            });
        }

        // The source of a release is whatever build created it.
        let source = history
            .iter()
            .rev()
            .find(|record| record.release_path == target)
            .map_or_else(|| latest.source_path.clone(), |record| record.source_path.clone());

        let current = self.live_target(domain)?;
        self.swap(domain, &target)?;
        let live = live_dir(&self.sites_root, domain);
        transcript.note(format!("{} -> {}", live.display(), target.display()));

        let record = match self.store.record_deployment(
            domain,
            DeploymentKind::Rollback,
            &source,
            &target,
            current.clone(),
        ) {
            Ok(record) => record,
            Err(e) => {
                self.revert_swap(domain, current.as_deref());
                return Err(e);
            }
        };
        info!(domain = %domain, release = %target.display(), "rolled back");

        transcript.deployment = Some(record.clone());
        self.restart_after_swap(site, &target, transcript).await?;
        Ok(record)
    }

    async fn restart_after_swap(
        &self,
        site: &SiteRecord,
        release: &Path,
        transcript: &mut Transcript,
    ) -> Result<(), CoreError> {
        if !site.is_dotnet() {
            transcript.note(format!("{} is in php mode; unit not restarted", site.domain));
            return Ok(());
        }
        self.supervisor
            .restart(&site.domain, transcript)
            .await
            .map_err(|source| {
                warn!(
                    domain = %site.domain,
                    release = %release.display(),
                    "new release is live but restart failed"
                );
                CoreError::RestartPending {
                    domain: site.domain.to_string(),
                    unit: site.unit_name(),
                    release: release.to_path_buf(),
                    source: Box::new(source),
                }
            })
    }

    // ── Filesystem steps ─────────────────────────────────────────────

    /// Copy `source` into a fresh directory under `releases/`.
    async fn stage(&self, domain: &Domain, source: &Path) -> Result<PathBuf, CoreError> {
        let releases = releases_dir(&self.sites_root, domain);
        let id = Uuid::new_v4().simple().to_string();
        let name = format!("{}-{}", Utc::now().format("%Y%m%dT%H%M%S%6fZ"), &id[..8]);
        let staging = releases.join(format!(".staging-{id}"));
        let release = releases.join(name);

        let source = source.to_path_buf();
        let (staging_dir, release_dir) = (staging.clone(), release.clone());
        let copied = tokio::task::spawn_blocking(move || {
            copy_tree(&source, &staging_dir)?;
            fs::rename(&staging_dir, &release_dir).map_err(CoreError::storage(&release_dir))
        })
        .await
        .map_err(|e| CoreError::Internal(format!("staging task failed: {e}")))?;

        if let Err(e) = copied {
            discard(&staging);
            return Err(e);
        }
        debug!(domain = %domain, release = %release.display(), "staged release");
        Ok(release)
    }

    /// Atomically point `current` at `release`.
    fn swap(&self, domain: &Domain, release: &Path) -> Result<(), CoreError> {
        let link = live_dir(&self.sites_root, domain);
        let tmp = site_dir(&self.sites_root, domain)
            .join(format!(".current-{}", Uuid::new_v4().simple()));

        symlink(release, &tmp).map_err(CoreError::storage(&tmp))?;
        if let Err(e) = fs::rename(&tmp, &link) {
            let _ = fs::remove_file(&tmp);
            warn!(domain = %domain, error = %e, "live release swap failed");
            return Err(CoreError::storage(&link)(e));
        }
        Ok(())
    }

    /// Best-effort restore of the previous live pointer.
    fn revert_swap(&self, domain: &Domain, previous: Option<&Path>) {
        let result = match previous {
            Some(prev) => self.swap(domain, prev),
            None => fs::remove_file(live_dir(&self.sites_root, domain))
                .map_err(CoreError::storage(live_dir(&self.sites_root, domain))),
        };
        if let Err(e) = result {
            warn!(domain = %domain, error = %e, "could not restore previous live release");
        }
    }

    /// Remove releases beyond the retention count, never touching `keep`.
    fn prune(&self, domain: &Domain, keep: &[PathBuf], transcript: &mut Transcript) {
        let releases = releases_dir(&self.sites_root, domain);
        let mut names: Vec<PathBuf> = match fs::read_dir(&releases) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
                .map(|entry| entry.path())
                .collect(),
            Err(e) => {
                warn!(domain = %domain, error = %e, "cannot list releases for pruning");
                return;
            }
        };
        // Release names start with a UTC stamp: newest first after this.
        names.sort_unstable_by(|a, b| b.cmp(a));

        for stale in names.into_iter().skip(self.retention) {
            if keep.contains(&stale) {
                continue;
            }
            match fs::remove_dir_all(&stale) {
                Ok(()) => debug!(domain = %domain, release = %stale.display(), "pruned release"),
                Err(e) => {
                    warn!(domain = %domain, release = %stale.display(), error = %e, "prune failed");
                    transcript.warn(format!("could not prune {}: {e}", stale.display()));
                }
            }
        }
    }
}

fn discard(dir: &Path) {
    if let Err(e) = fs::remove_dir_all(dir) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %dir.display(), error = %e, "could not remove staged release");
        }
    }
}

fn copy_tree(from: &Path, to: &Path) -> Result<(), CoreError> {
    fs::create_dir_all(to).map_err(CoreError::storage(to))?;
    for entry in fs::read_dir(from).map_err(CoreError::storage(from))? {
        let entry = entry.map_err(CoreError::storage(from))?;
        let path = entry.path();
        let dest = to.join(entry.file_name());
        let kind = entry.file_type().map_err(CoreError::storage(&path))?;

        if kind.is_dir() {
            copy_tree(&path, &dest)?;
        } else if kind.is_symlink() {
            let target = fs::read_link(&path).map_err(CoreError::storage(&path))?;
            symlink(&target, &dest).map_err(CoreError::storage(&dest))?;
        } else {
            fs::copy(&path, &dest).map_err(CoreError::storage(&dest))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn symlink(_target: &Path, _link: &Path) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "symbolic links are required for release switching",
    ))
}
