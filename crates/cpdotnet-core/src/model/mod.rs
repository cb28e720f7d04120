// ── Domain model ──
//
// Canonical types shared by the store, the renderers and the CLI.

pub mod deployment;
pub mod names;
pub mod site;
pub mod unit;

pub use deployment::{DeploymentKind, DeploymentRecord};
pub use names::{Domain, EntryAssembly, HubPath};
pub use site::{HubToggle, Mode, SiteRecord};
pub use unit::{ServiceUnit, UnitState, UnitStatus};
