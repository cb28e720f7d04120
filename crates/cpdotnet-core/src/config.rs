// ── Runtime host configuration ──
//
// These types describe *where* the orchestrator keeps its state and *which*
// external programs it drives. They never touch disk: the CLI loads its
// TOML/env layers and hands a finished `HostConfig` in.

use std::path::PathBuf;

use crate::model::Domain;

/// Reverse-proxy settings used to render and apply per-domain fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    /// Directory the web server includes fragments from (one file per domain).
    pub vhost_dir: PathBuf,
    /// Port the generated `server` blocks listen on.
    pub listen_port: u16,
    /// FastCGI address used by PHP-mode sites (e.g. `unix:/run/php/php-fpm.sock`).
    pub php_fastcgi: String,
    /// Document root template for PHP-mode sites; `{domain}` is substituted.
    pub php_docroot: String,
    /// Command that makes the web server re-read its configuration.
    pub reload_command: Vec<String>,
}

impl ProxySettings {
    /// Document root of a PHP-mode site.
    pub fn docroot_for(&self, domain: &str) -> String {
        self.php_docroot.replace("{domain}", domain)
    }
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            vhost_dir: PathBuf::from("/etc/nginx/conf.d/cyberpanel-dotnet"),
            listen_port: 80,
            php_fastcgi: "unix:/run/php/php-fpm.sock".into(),
            php_docroot: "/home/{domain}/public_html".into(),
            reload_command: vec!["systemctl".into(), "reload".into(), "nginx".into()],
        }
    }
}

/// Service-manager settings for the per-domain `dotnet-<domain>` units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Directory unit files are written to.
    pub unit_dir: PathBuf,
    /// `systemctl` program.
    pub systemctl: String,
    /// `journalctl` program.
    pub journalctl: String,
    /// Managed runtime launcher the units execute.
    pub dotnet: PathBuf,
    /// System user the application runs as.
    pub user: String,
    /// Value of `ASPNETCORE_ENVIRONMENT`.
    pub environment: String,
    /// Default number of log lines returned by status queries.
    pub log_lines: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            unit_dir: PathBuf::from("/etc/systemd/system"),
            systemctl: "systemctl".into(),
            journalctl: "journalctl".into(),
            dotnet: PathBuf::from("/usr/bin/dotnet"),
            user: "www-data".into(),
            environment: "Production".into(),
            log_lines: 30,
        }
    }
}

/// Inclusive range listen ports are allocated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl Default for PortRange {
    fn default() -> Self {
        Self {
            start: 5000,
            end: 5999,
        }
    }
}

/// Everything the orchestrator needs to run.
///
/// Built by the CLI, passed to `Orchestrator` -- core never reads config files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Directory holding the persisted site registry.
    pub state_dir: PathBuf,
    /// Root under which each domain gets `releases/` and a `current` link.
    pub sites_root: PathBuf,
    pub proxy: ProxySettings,
    pub service: ServiceSettings,
    pub ports: PortRange,
    /// Number of most recent releases kept on disk per domain.
    pub release_retention: usize,
}

impl HostConfig {
    /// Path of the persisted site registry.
    pub fn state_file(&self) -> PathBuf {
        self.state_dir.join("sites.json")
    }

    /// Lock file serializing mutating commands on `domain` across processes.
    pub fn domain_lock_file(&self, domain: &Domain) -> PathBuf {
        self.state_dir.join("locks").join(format!("{domain}.lock"))
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("/var/lib/cyberpanel-dotnet"),
            sites_root: PathBuf::from("/var/www/dotnet"),
            proxy: ProxySettings::default(),
            service: ServiceSettings::default(),
            ports: PortRange::default(),
            release_retention: 5,
        }
    }
}
