// ── Service unit state ──

use serde::{Deserialize, Serialize};
use strum::Display;

use super::names::Domain;

/// Observed state of a `dotnet-<domain>` unit.
///
/// `Absent` is reported before the unit file exists; the remaining states
/// mirror the service manager's view at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UnitState {
    Absent,
    Inactive,
    Active,
    Failed,
}

impl UnitState {
    /// Map a systemd `ActiveState` value onto the unit states we track.
    pub fn from_active_state(raw: &str) -> Self {
        match raw.trim() {
            "active" | "activating" | "reloading" => Self::Active,
            "failed" => Self::Failed,
            _ => Self::Inactive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceUnit {
    pub domain: Domain,
    pub unit_name: String,
    pub state: UnitState,
}

/// Result of a status query: current state plus the most recent log lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStatus {
    #[serde(flatten)]
    pub unit: ServiceUnit,
    pub recent_log_lines: Vec<String>,
}
