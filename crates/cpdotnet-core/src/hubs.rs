// ── Hub registry & toggle ──
//
// Decides how a `signalr <domain> on|off [hubs...]` request changes the
// stored hub set. The change is planned (and every path validated) before
// anything is written, so an invalid list never touches the registry.

use crate::error::CoreError;
use crate::model::{Domain, HubPath, HubToggle, SiteRecord};
use crate::store::ConfigStore;

/// A validated change to a site's hub configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubChange {
    /// Real-time routes off; the stored hub list is kept for later.
    Disable,
    /// Real-time routes on for exactly these hubs (possibly none).
    Enable(Vec<HubPath>),
}

impl HubChange {
    /// `off` ignores whatever hubs were supplied. `on` with no hubs is a
    /// valid request: real-time mode with zero special routes.
    pub fn plan<S: AsRef<str>>(state: HubToggle, hubs: &[S]) -> Result<Self, CoreError> {
        match state {
            HubToggle::Off => Ok(Self::Disable),
            HubToggle::On => HubPath::normalize_all(hubs).map(Self::Enable),
        }
    }

    pub fn apply(&self, store: &ConfigStore, domain: &Domain) -> Result<SiteRecord, CoreError> {
        match self {
            Self::Disable => store.disable_hubs(domain),
            Self::Enable(hubs) => store.set_hubs(domain, hubs, true),
        }
    }

    /// Short description for the action transcript.
    pub fn summary(&self) -> String {
        match self {
            Self::Disable => "real-time routes disabled".into(),
            Self::Enable(hubs) if hubs.is_empty() => "real-time mode on with no hub routes".into(),
            Self::Enable(hubs) => {
                let paths: Vec<&str> = hubs.iter().map(HubPath::as_str).collect();
                format!("real-time routes for {}", paths.join(", "))
            }
        }
    }
}
