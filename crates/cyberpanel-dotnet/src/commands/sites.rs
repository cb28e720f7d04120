//! Read-only views over the site registry.

use tabled::Tabled;

use cpdotnet_core::{ConfigFragment, DeploymentRecord, HubPath, Orchestrator, SiteRecord};

use crate::cli::{SitesArgs, SitesCommand};
use crate::error::CliError;
use crate::output;

use super::Session;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct SiteRow {
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "Assembly")]
    assembly: String,
    #[tabled(rename = "Port")]
    port: String,
    #[tabled(rename = "Hubs")]
    hubs: String,
}

impl SiteRow {
    fn new(site: &SiteRecord, color: bool) -> Self {
        Self {
            domain: site.domain.to_string(),
            mode: output::paint_mode(site.mode, color),
            assembly: site.entry_assembly.to_string(),
            port: site.listen_port.map(|p| p.to_string()).unwrap_or_default(),
            hubs: hub_summary(site),
        }
    }
}

#[derive(Tabled)]
struct DeploymentRow {
    #[tabled(rename = "When")]
    when: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Release")]
    release: String,
    #[tabled(rename = "Source")]
    source: String,
}

impl From<&DeploymentRecord> for DeploymentRow {
    fn from(d: &DeploymentRecord) -> Self {
        Self {
            when: d.deployed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            kind: d.kind.to_string(),
            release: release_name(d),
            source: d.source_path.display().to_string(),
        }
    }
}

fn release_name(d: &DeploymentRecord) -> String {
    match d.release_path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => d.release_path.display().to_string(),
    }
}

fn hub_summary(site: &SiteRecord) -> String {
    if site.hubs.is_empty() {
        return String::new();
    }
    let paths: Vec<&str> = site.hubs.iter().map(HubPath::as_str).collect();
    let state = if site.hubs_enabled { "on" } else { "off" };
    format!("{} ({state})", paths.join(", "))
}

// ── Handlers ────────────────────────────────────────────────────────

pub fn handle(
    orchestrator: &Orchestrator,
    args: SitesArgs,
    session: &Session,
) -> Result<(), CliError> {
    match args.command {
        SitesCommand::List => {
            let sites = orchestrator.sites()?;
            let out = output::render_list(
                session.format,
                &sites,
                |s| SiteRow::new(s, session.color),
                |s| s.domain.to_string(),
            )?;
            output::print_output(&out, session.quiet);
            Ok(())
        }
        SitesCommand::Show(args) => {
            let site = orchestrator.site(&args.domain)?;
            let out = output::render_single(
                session.format,
                &site,
                |s| site_detail(s, session.color),
                |s| s.domain.to_string(),
            )?;
            output::print_output(&out, session.quiet);
            Ok(())
        }
    }
}

pub fn deployments(
    orchestrator: &Orchestrator,
    domain: &str,
    session: &Session,
) -> Result<(), CliError> {
    let history = orchestrator.deployments(domain)?;
    let out = output::render_list(
        session.format,
        &history,
        |d| DeploymentRow::from(d),
        |d| d.release_path.display().to_string(),
    )?;
    output::print_output(&out, session.quiet);
    Ok(())
}

/// Print the fragment the stored record renders to. Nothing is written.
pub fn render(
    orchestrator: &Orchestrator,
    domain: &str,
    session: &Session,
) -> Result<(), CliError> {
    let fragment = orchestrator.render(domain)?;
    let out = output::render_single(
        session.format,
        &fragment,
        |f: &ConfigFragment| f.text.trim_end().to_owned(),
        |f: &ConfigFragment| f.text.trim_end().to_owned(),
    )?;
    output::print_output(&out, session.quiet);
    Ok(())
}

fn site_detail(site: &SiteRecord, color: bool) -> String {
    let mut lines = vec![
        format!("Domain:     {}", site.domain),
        format!("Mode:       {}", output::paint_mode(site.mode, color)),
        format!("Assembly:   {}", site.entry_assembly),
    ];
    if let Some(port) = site.listen_port {
        lines.push(format!("Port:       {port}"));
    }
    if let Some(source) = &site.source_path {
        lines.push(format!("Source:     {}", source.display()));
    }
    if !site.hubs.is_empty() {
        lines.push(format!("Hubs:       {}", hub_summary(site)));
    }
    lines.push(format!("Created:    {}", site.created_at.format("%Y-%m-%d %H:%M:%S")));
    lines.push(format!("Updated:    {}", site.updated_at.format("%Y-%m-%d %H:%M:%S")));
    lines.join("\n")
}
