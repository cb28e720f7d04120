//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. The panel parses the
//! JSON envelope, so `json` is the default; `table` is for operators at a
//! terminal. Structured formats use serde, plain emits one value per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use cpdotnet_core::{ActionReport, Mode, UnitState};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

pub fn paint_state(state: UnitState, color: bool) -> String {
    if !color {
        return state.to_string();
    }
    match state {
        UnitState::Active => state.green().to_string(),
        UnitState::Failed => state.red().to_string(),
        UnitState::Inactive => state.yellow().to_string(),
        UnitState::Absent => state.dimmed().to_string(),
    }
}

pub fn paint_mode(mode: Mode, color: bool) -> String {
    if !color {
        return mode.to_string();
    }
    match mode {
        Mode::Dotnet => mode.cyan().to_string(),
        Mode::Php => mode.magenta().to_string(),
    }
}

fn paint_ok(ok: bool, color: bool) -> String {
    let label = if ok { "ok" } else { "failed" };
    match (color, ok) {
        (false, _) => label.to_owned(),
        (true, true) => label.green().bold().to_string(),
        (true, false) => label.red().bold().to_string(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a collection. `to_row` projects each item onto a table row;
/// `id_fn` gives the single value printed per line in plain mode. The
/// structured formats serialize the items themselves, not the rows.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(&id_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since single-item views are key/value
/// listings rather than rows.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(id_fn(data)),
    }
}

/// Render an action report. Table and plain views show the captured output
/// as-is so service errors read the same as on a terminal.
pub fn render_report(
    format: OutputFormat,
    report: &ActionReport,
    color: bool,
) -> Result<String, CliError> {
    render_single(
        format,
        report,
        |r| report_detail(r, color),
        |r| {
            let mut out = r.stdout.trim_end().to_owned();
            if let Some(unit) = &r.unit {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(&unit.recent_log_lines.join("\n"));
            }
            out
        },
    )
}

fn report_detail(report: &ActionReport, color: bool) -> String {
    let mut lines = vec![
        format!("Action:   {}", report.cmd),
        format!("Result:   {} (code {})", paint_ok(report.ok, color), report.code),
    ];
    if let Some(site) = &report.site {
        lines.push(format!("Mode:     {}", paint_mode(site.mode, color)));
        if let Some(port) = site.listen_port {
            lines.push(format!("Port:     {port}"));
        }
    }
    if let Some(deployment) = &report.deployment {
        lines.push(format!("Release:  {}", deployment.release_path.display()));
    }
    if let Some(unit) = &report.unit {
        lines.push(format!(
            "Unit:     {} ({})",
            unit.unit.unit_name,
            paint_state(unit.unit.state, color)
        ));
    }
    if !report.commands.is_empty() {
        lines.push("Commands:".into());
        lines.extend(report.commands.iter().map(|c| format!("  $ {c}")));
    }
    if !report.stdout.trim().is_empty() {
        lines.push("Stdout:".into());
        lines.extend(report.stdout.lines().map(|l| format!("  {l}")));
    }
    if !report.stderr.trim().is_empty() {
        lines.push("Stderr:".into());
        lines.extend(report.stderr.lines().map(|l| format!("  {l}")));
    }
    if let Some(unit) = &report.unit {
        if !unit.recent_log_lines.is_empty() {
            lines.push("Recent log:".into());
            lines.extend(unit.recent_log_lines.iter().map(|l| format!("  {l}")));
        }
    }
    lines.join("\n")
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.map_err(|e| CliError::Serialization(e.to_string()))
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(|e| CliError::Serialization(e.to_string()))
}
