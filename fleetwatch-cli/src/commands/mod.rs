pub mod check;
pub mod hosts;
pub mod run;

use std::path::Path;

use anyhow::{Context, Result};

use fleetwatch_core::{config, Config};

/// Load `path`, or `~/.fleetwatch.yaml` when no path was given.
pub(crate) fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config::default_path().context("could not determine home directory")?,
    };
    Config::load(&path).with_context(|| format!("invalid configuration {}", path.display()))
}
