//! Configuration for the cyberpanel-dotnet tool.
//!
//! Settings are layered with figment: built-in defaults, then the TOML
//! file (`/etc/cyberpanel-dotnet/config.toml` unless overridden), then
//! `CPDOTNET_*` environment variables where `__` separates nesting levels
//! (`CPDOTNET_PORTS__START=6000`). The result is translated into
//! `cpdotnet_core::HostConfig`; the core never reads files itself.

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cpdotnet_core::{HostConfig, PortRange, ProxySettings, ServiceSettings};

/// System-wide configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/cyberpanel-dotnet/config.toml";

const ENV_PREFIX: &str = "CPDOTNET_";

/// Variables consumed by CLI flags rather than the config tree.
const CLI_ONLY_VARS: &[&str] = &["CONFIG", "OUTPUT", "TIMEOUT"];

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub paths: Paths,
    pub runtime: Runtime,
    pub ports: Ports,
    pub web_server: WebServer,
    pub service: Service,
    pub deploy: Deploy,
    pub defaults: Defaults,
}

/// Where state, releases, fragments and unit files live.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Paths {
    pub state_dir: PathBuf,
    pub sites_root: PathBuf,
    pub vhost_dir: PathBuf,
    pub unit_dir: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        let host = HostConfig::default();
        Self {
            state_dir: host.state_dir,
            sites_root: host.sites_root,
            vhost_dir: host.proxy.vhost_dir,
            unit_dir: host.service.unit_dir,
        }
    }
}

/// How the managed application is launched.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Runtime {
    /// Path of the `dotnet` launcher.
    pub dotnet: PathBuf,
    /// System user the application runs as.
    pub user: String,
    /// `ASPNETCORE_ENVIRONMENT` value.
    pub environment: String,
}

impl Default for Runtime {
    fn default() -> Self {
        let service = ServiceSettings::default();
        Self {
            dotnet: service.dotnet,
            user: service.user,
            environment: service.environment,
        }
    }
}

/// Range listen ports are allocated from (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Ports {
    pub start: u16,
    pub end: u16,
}

impl Default for Ports {
    fn default() -> Self {
        let range = PortRange::default();
        Self {
            start: range.start,
            end: range.end,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WebServer {
    /// Command that reloads the web server, as program plus arguments.
    pub reload_command: Vec<String>,
    /// FastCGI address of the PHP handler.
    pub php_fastcgi: String,
    /// PHP document root; `{domain}` is substituted.
    pub php_docroot: String,
    /// Port the virtual hosts listen on.
    pub listen_port: u16,
}

impl Default for WebServer {
    fn default() -> Self {
        let proxy = ProxySettings::default();
        Self {
            reload_command: proxy.reload_command,
            php_fastcgi: proxy.php_fastcgi,
            php_docroot: proxy.php_docroot,
            listen_port: proxy.listen_port,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Service {
    pub systemctl: String,
    pub journalctl: String,
    /// Log lines returned by `status` when `--lines` is not given.
    pub log_lines: usize,
}

impl Default for Service {
    fn default() -> Self {
        let service = ServiceSettings::default();
        Self {
            systemctl: service.systemctl,
            journalctl: service.journalctl,
            log_lines: service.log_lines,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Deploy {
    /// Most recent releases kept per domain.
    pub retention: usize,
}

impl Default for Deploy {
    fn default() -> Self {
        Self {
            retention: HostConfig::default().release_retention,
        }
    }
}

/// CLI defaults, overridable per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Defaults {
    /// Output format: json, json-compact, yaml, table or plain.
    pub output: String,
    /// Seconds to wait before reporting an action as still in progress.
    /// Zero waits for completion.
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: "json".into(),
            timeout: 0,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// The config file to read: `explicit` if given, else the system default.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), Path::to_path_buf)
}

// ── Config loading ──────────────────────────────────────────────────

/// The layered figment for `path`. A missing file contributes nothing.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).ignore(CLI_ONLY_VARS).split("__"))
}

/// Load and validate the full Config from file + environment.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = figment(path).extract()?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Validation & translation ────────────────────────────────────────

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, path) in [
            ("paths.state_dir", &self.paths.state_dir),
            ("paths.sites_root", &self.paths.sites_root),
            ("paths.vhost_dir", &self.paths.vhost_dir),
            ("paths.unit_dir", &self.paths.unit_dir),
        ] {
            if !path.is_absolute() {
                return Err(invalid(field, format!("'{}' must be absolute", path.display())));
            }
        }
        if self.ports.start < 1024 {
            return Err(invalid("ports.start", "must be 1024 or above"));
        }
        if self.ports.start > self.ports.end {
            return Err(invalid(
                "ports",
                format!("start {} is above end {}", self.ports.start, self.ports.end),
            ));
        }
        if self.web_server.reload_command.is_empty() {
            return Err(invalid("web_server.reload_command", "must name a program"));
        }
        if self.deploy.retention == 0 {
            return Err(invalid("deploy.retention", "must keep at least one release"));
        }
        if self.service.log_lines == 0 {
            return Err(invalid("service.log_lines", "must be at least 1"));
        }
        Ok(())
    }

    /// Translate into the core's runtime configuration.
    pub fn to_host_config(&self) -> Result<HostConfig, ConfigError> {
        self.validate()?;
        Ok(HostConfig {
            state_dir: self.paths.state_dir.clone(),
            sites_root: self.paths.sites_root.clone(),
            proxy: ProxySettings {
                vhost_dir: self.paths.vhost_dir.clone(),
                listen_port: self.web_server.listen_port,
                php_fastcgi: self.web_server.php_fastcgi.clone(),
                php_docroot: self.web_server.php_docroot.clone(),
                reload_command: self.web_server.reload_command.clone(),
            },
            service: ServiceSettings {
                unit_dir: self.paths.unit_dir.clone(),
                systemctl: self.service.systemctl.clone(),
                journalctl: self.service.journalctl.clone(),
                dotnet: self.runtime.dotnet.clone(),
                user: self.runtime.user.clone(),
                environment: self.runtime.environment.clone(),
                log_lines: self.service.log_lines,
            },
            ports: PortRange {
                start: self.ports.start,
                end: self.ports.end,
            },
            release_retention: self.deploy.retention,
        })
    }
}
