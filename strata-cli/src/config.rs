//! CLI configuration handling.

use std::path::{Path, PathBuf};

use strata_core::StrataConfig;

use crate::error::{CliError, CliResult};

/// Default config file name (lives in project root)
pub const CONFIG_FILE_NAME: &str = "strata.toml";

/// Find the config file, walking up from the current directory.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

/// Load the configuration from an explicit path or by discovery.
pub fn load_config(explicit: Option<&Path>) -> CliResult<StrataConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let cwd = std::env::current_dir()?;
            find_config_file(&cwd).ok_or_else(|| {
                CliError::Config(format!(
                    "no {} found in this directory or any parent; pass --config",
                    CONFIG_FILE_NAME
                ))
            })?
        }
    };

    StrataConfig::from_file(&path)
        .map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))
}
