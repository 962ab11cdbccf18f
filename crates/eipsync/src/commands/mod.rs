//! Command handlers.

pub mod config_cmd;
pub mod sync;

use std::path::PathBuf;

use eipsync_config::Config;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// The config file this invocation reads and writes.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(eipsync_config::config_path)
}

/// Load the config file; a missing file yields the defaults.
pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(eipsync_config::load_config_from(&config_path(global))?)
}
