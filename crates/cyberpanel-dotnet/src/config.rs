//! Resolution of per-invocation settings from the config file and flags.
//!
//! The file is loaded through `cpdotnet_config`; flags win over its
//! `[defaults]` section.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

use cpdotnet_config::Config;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

pub fn config_path(global: &GlobalOpts) -> PathBuf {
    cpdotnet_config::config_path(global.config.as_deref())
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(cpdotnet_config::load_config(&config_path(global))?)
}

/// `--output`, else `defaults.output` from the file.
pub fn output_format(global: &GlobalOpts, cfg: &Config) -> Result<OutputFormat, CliError> {
    if let Some(format) = global.output {
        return Ok(format);
    }
    OutputFormat::from_str(&cfg.defaults.output, true).map_err(|_| CliError::Validation {
        field: "defaults.output".into(),
        reason: format!(
            "unknown format '{}', expected table, json, json-compact, yaml or plain",
            cfg.defaults.output
        ),
    })
}

/// Advisory deadline for actions. Zero means wait for completion.
pub fn deadline(global: &GlobalOpts, cfg: &Config) -> Option<Duration> {
    let secs = global.timeout.unwrap_or(cfg.defaults.timeout);
    (secs > 0).then(|| Duration::from_secs(secs))
}
