// ── Site domain types ──

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::names::{Domain, EntryAssembly, HubPath};
use crate::error::CoreError;

/// How a domain's traffic is served.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Mode {
    /// Static files and PHP through the FastCGI handler.
    Php,
    /// Reverse-proxied to a local .NET process.
    Dotnet,
}

impl Mode {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        raw.trim()
            .parse()
            .map_err(|_| CoreError::invalid("mode", format!("must be php or dotnet, got '{raw}'")))
    }
}

/// Requested real-time hub state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum HubToggle {
    On,
    Off,
}

impl HubToggle {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        raw.trim()
            .parse()
            .map_err(|_| CoreError::invalid("state", format!("must be on or off, got '{raw}'")))
    }
}

/// Persisted hosting configuration of one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub domain: Domain,
    pub mode: Mode,
    pub entry_assembly: EntryAssembly,
    /// Directory the last build was deployed from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
    /// Loopback port the application listens on. Always set in `Dotnet` mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen_port: Option<u16>,
    /// Hub paths in registration order, without duplicates.
    #[serde(default)]
    pub hubs: Vec<HubPath>,
    #[serde(default)]
    pub hubs_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SiteRecord {
    pub fn unit_name(&self) -> String {
        self.domain.unit_name()
    }

    pub fn is_dotnet(&self) -> bool {
        self.mode == Mode::Dotnet
    }

    /// Hubs that receive upgrade-capable routes right now.
    pub fn active_hubs(&self) -> &[HubPath] {
        if self.hubs_enabled { self.hubs.as_slice() } else { &[] }
    }
}
