// ── Listen port allocation ──
//
// Ports stay with a site when it switches to PHP so that switching back
// never has to renumber it; allocation therefore skips every held port,
// while the uniqueness invariant is enforced among `Dotnet` sites.

use crate::config::PortRange;
use crate::error::CoreError;
use crate::model::{Domain, Mode, SiteRecord};

const MIN_UNPRIVILEGED_PORT: u16 = 1024;

/// Lowest port of `range` not held by any site other than `domain`.
pub(super) fn allocate<'a>(
    sites: impl Iterator<Item = &'a SiteRecord> + Clone,
    domain: &Domain,
    range: PortRange,
) -> Result<u16, CoreError> {
    (range.start..=range.end)
        .find(|port| holder(sites.clone(), domain, *port, false).is_none())
        .ok_or_else(|| CoreError::Conflict {
            message: format!(
                "no free listen port left in {}-{}",
                range.start, range.end
            ),
        })
}

/// Validate an explicitly requested port.
pub(super) fn check_requested<'a>(
    sites: impl Iterator<Item = &'a SiteRecord> + Clone,
    domain: &Domain,
    port: u16,
) -> Result<(), CoreError> {
    if port < MIN_UNPRIVILEGED_PORT {
        return Err(CoreError::invalid(
            "port",
            format!("{port} is privileged; use {MIN_UNPRIVILEGED_PORT} or above"),
        ));
    }
    match holder(sites, domain, port, false) {
        Some(other) => Err(CoreError::Conflict {
            message: format!("port {port} is already assigned to {other}"),
        }),
        None => Ok(()),
    }
}

/// Enforce that no other `Dotnet` site listens on `port`.
pub(super) fn check_unique<'a>(
    sites: impl Iterator<Item = &'a SiteRecord> + Clone,
    domain: &Domain,
    port: u16,
) -> Result<(), CoreError> {
    match holder(sites, domain, port, true) {
        Some(other) => Err(CoreError::Conflict {
            message: format!("port {port} is already used by {other}"),
        }),
        None => Ok(()),
    }
}

fn holder<'a>(
    mut sites: impl Iterator<Item = &'a SiteRecord>,
    domain: &Domain,
    port: u16,
    dotnet_only: bool,
) -> Option<&'a Domain> {
    sites
        .find(|site| {
            &site.domain != domain
                && site.listen_port == Some(port)
                && (!dotnet_only || site.mode == Mode::Dotnet)
        })
        .map(|site| &site.domain)
}
