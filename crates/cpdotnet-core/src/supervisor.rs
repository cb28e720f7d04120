// ── Process supervisor adapter ──
//
// Owns the `dotnet-<domain>` units: writes their definitions, enables
// them, and drives start/restart/stop/status through `systemctl` and
// `journalctl`. Failures surface the command's stderr verbatim and are
// never retried.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::atomic::{read_optional, write_atomic};
use crate::config::ServiceSettings;
use crate::deploy::live_dir;
use crate::error::CoreError;
use crate::exec::{CommandRunner, ExecOutput};
use crate::model::{Domain, ServiceUnit, SiteRecord, UnitState, UnitStatus};
use crate::report::Transcript;

/// Render the unit definition of a `Dotnet` site listening on `port`.
pub fn render_unit(
    site: &SiteRecord,
    port: u16,
    settings: &ServiceSettings,
    sites_root: &Path,
) -> String {
    let domain = &site.domain;
    let live = live_dir(sites_root, domain);
    let exec_start = format!(
        "ExecStart={} {}",
        settings.dotnet.display(),
        live.join(site.entry_assembly.as_str()).display()
    );

    let lines = [
        "# Managed by cyberpanel-dotnet; regenerated from the site registry.".to_owned(),
        "[Unit]".to_owned(),
        format!("Description=.NET application for {domain}"),
        "After=network.target".to_owned(),
        String::new(),
        "[Service]".to_owned(),
        format!("WorkingDirectory={}", live.display()),
        exec_start,
        "Restart=always".to_owned(),
        "RestartSec=10".to_owned(),
        "KillSignal=SIGINT".to_owned(),
        format!("SyslogIdentifier={}", domain.unit_name()),
        format!("User={}", settings.user),
        format!("Environment=ASPNETCORE_URLS=http://127.0.0.1:{port}"),
        format!("Environment=ASPNETCORE_ENVIRONMENT={}", settings.environment),
        "Environment=DOTNET_PRINT_TELEMETRY_MESSAGE=false".to_owned(),
        String::new(),
        "[Install]".to_owned(),
        "WantedBy=multi-user.target".to_owned(),
    ];
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

pub struct ProcessSupervisor {
    settings: ServiceSettings,
    sites_root: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl ProcessSupervisor {
    pub fn new(
        settings: ServiceSettings,
        sites_root: impl Into<PathBuf>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            settings,
            sites_root: sites_root.into(),
            runner,
        }
    }

    pub fn unit_path(&self, domain: &Domain) -> PathBuf {
        self.settings
            .unit_dir
            .join(format!("{}.service", domain.unit_name()))
    }

    pub fn unit_exists(&self, domain: &Domain) -> bool {
        self.unit_path(domain).is_file()
    }

    /// Create or refresh the unit definition, reload the manager and enable
    /// the unit. Does not start it.
    pub async fn ensure_unit(
        &self,
        site: &SiteRecord,
        transcript: &mut Transcript,
    ) -> Result<(), CoreError> {
        let Some(port) = site.listen_port else {
            return Err(CoreError::Internal(format!(
                "{} has no listen port assigned",
                site.domain
            )));
        };
        let unit = site.domain.unit_name();
        let path = self.unit_path(&site.domain);
        let text = render_unit(site, port, &self.settings, &self.sites_root);

        if read_optional(&path)?.as_deref() == Some(text.as_str()) {
            debug!(unit = %unit, "unit definition unchanged");
        } else {
            write_atomic(&path, text.as_bytes())?;
            info!(unit = %unit, port, path = %path.display(), "wrote unit definition");
        }

        self.systemctl(&unit, &["daemon-reload"], transcript).await?;
        self.systemctl(&unit, &["enable", unit.as_str()], transcript).await?;
        Ok(())
    }

    /// Disable the unit and delete its definition. A unit that was never
    /// written is left alone.
    ///
    /// Every step is attempted; the first failure is returned.
    pub async fn remove_unit(
        &self,
        domain: &Domain,
        transcript: &mut Transcript,
    ) -> Result<(), CoreError> {
        let unit = domain.unit_name();
        let path = self.unit_path(domain);
        if !path.is_file() {
            debug!(unit = %unit, "no unit definition to remove");
            return Ok(());
        }

        let disabled = self.systemctl(&unit, &["disable", unit.as_str()], transcript).await;
        fs::remove_file(&path).map_err(CoreError::storage(&path))?;
        info!(unit = %unit, path = %path.display(), "removed unit definition");
        let reloaded = self.systemctl(&unit, &["daemon-reload"], transcript).await;

        disabled.and(reloaded).map(drop)
    }

    pub async fn start(
        &self,
        domain: &Domain,
        transcript: &mut Transcript,
    ) -> Result<(), CoreError> {
        let unit = domain.unit_name();
        self.systemctl(&unit, &["start", unit.as_str()], transcript).await?;
        info!(unit = %unit, "started");
        Ok(())
    }

    pub async fn restart(
        &self,
        domain: &Domain,
        transcript: &mut Transcript,
    ) -> Result<(), CoreError> {
        let unit = domain.unit_name();
        self.systemctl(&unit, &["restart", unit.as_str()], transcript).await?;
        info!(unit = %unit, "restarted");
        Ok(())
    }

    pub async fn stop(
        &self,
        domain: &Domain,
        transcript: &mut Transcript,
    ) -> Result<(), CoreError> {
        let unit = domain.unit_name();
        self.systemctl(&unit, &["stop", unit.as_str()], transcript).await?;
        info!(unit = %unit, "stopped");
        Ok(())
    }

    /// Current state plus the last `lines` journal lines. Read-only.
    ///
    /// A journal that cannot be read is reported as a warning; the state
    /// query alone decides success.
    pub async fn status(
        &self,
        domain: &Domain,
        lines: usize,
        transcript: &mut Transcript,
    ) -> Result<UnitStatus, CoreError> {
        let unit = domain.unit_name();

        let state = if self.unit_exists(domain) {
            let args = to_args(&["show", "--property=ActiveState", "--value", unit.as_str()]);
            let output = self.run(&self.settings.systemctl, &args, transcript).await?;
            if !output.success() {
                return Err(service_error(&unit, "status", output));
            }
            UnitState::from_active_state(&output.stdout)
        } else {
            UnitState::Absent
        };

        let lines_arg = lines.to_string();
        let args = to_args(&[
            "-u",
            unit.as_str(),
            "-n",
            lines_arg.as_str(),
            "--no-pager",
            "--output=cat",
        ]);
        let output = self.run(&self.settings.journalctl, &args, transcript).await?;
        let recent_log_lines = if output.success() {
            tail(&output.stdout, lines)
        } else {
            warn!(unit = %unit, code = output.code, "journal query failed");
            transcript.warn(format!("journal unavailable (exit code {})", output.code));
            Vec::new()
        };

        debug!(unit = %unit, %state, lines = recent_log_lines.len(), "queried unit status");
        Ok(UnitStatus {
            unit: ServiceUnit {
                domain: domain.clone(),
                unit_name: unit,
                state,
            },
            recent_log_lines,
        })
    }

    async fn systemctl(
        &self,
        unit: &str,
        args: &[&str],
        transcript: &mut Transcript,
    ) -> Result<ExecOutput, CoreError> {
        let args = to_args(args);
        let output = self.run(&self.settings.systemctl, &args, transcript).await?;
        if output.success() {
            Ok(output)
        } else {
            let action = args.first().cloned().unwrap_or_default();
            warn!(unit, action = %action, code = output.code, "service manager command failed");
            Err(service_error(unit, &action, output))
        }
    }

    async fn run(
        &self,
        program: &str,
        args: &[String],
        transcript: &mut Transcript,
    ) -> Result<ExecOutput, CoreError> {
        let output = self.runner.run(program, args).await?;
        transcript.record(program, args, &output);
        Ok(output)
    }
}

fn service_error(unit: &str, action: &str, output: ExecOutput) -> CoreError {
    CoreError::Service {
        unit: unit.to_owned(),
        action: action.to_owned(),
        code: output.code,
        stdout: output.stdout,
        stderr: output.stderr,
    }
}

fn to_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| (*a).to_owned()).collect()
}

fn tail(text: &str, lines: usize) -> Vec<String> {
    let all: Vec<&str> = text.lines().collect();
    let skip = all.len().saturating_sub(lines);
    all[skip..].iter().map(|l| (*l).to_owned()).collect()
}
