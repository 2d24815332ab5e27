//! `charter init`: write a commented default config.

use super::config::{default_state_path, CharterConfig};
use super::CliError;
use std::path::Path;

pub fn execute(config_path: &Path, force: bool) -> Result<(), CliError> {
    if config_path.exists() && !force {
        return Err(CliError::ConfigExists(config_path.to_path_buf()));
    }

    CharterConfig::create_default(config_path, &default_state_path())?;
    println!("Wrote {}", config_path.display());
    Ok(())
}
