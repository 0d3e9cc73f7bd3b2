//! CLI-side configuration resolution: which config file, which inventory.
//!
//! `maas-config` owns the file format; this module only layers the global
//! flags on top of it.

use std::path::PathBuf;

use maas_config::Config;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// `--config`, or the platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(maas_config::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = config_file(global);
    tracing::debug!(path = %path.display(), "loading config");
    Ok(maas_config::load_config_from(&path)?)
}

/// `--inventory` wins over the config file's `[inventory] path`.
pub fn inventory_path(global: &GlobalOpts, cfg: &Config) -> PathBuf {
    global
        .inventory
        .clone()
        .unwrap_or_else(|| cfg.inventory_path())
}
