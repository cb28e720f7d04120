// ── Deployment history ──

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use super::names::Domain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeploymentKind {
    /// A new build copied from a source directory.
    Deploy,
    /// The live pointer moved back to an earlier release.
    Rollback,
}

/// One change of the live release of a domain.
///
/// Records are never deleted; the newest one describes what is live and
/// its `previous_version_ref` is where a rollback would go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub id: Uuid,
    pub domain: Domain,
    pub kind: DeploymentKind,
    /// Directory the build was copied from.
    pub source_path: PathBuf,
    /// Release directory that became live.
    pub release_path: PathBuf,
    /// Release directory that was live before this change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version_ref: Option<PathBuf>,
    pub deployed_at: DateTime<Utc>,
}
