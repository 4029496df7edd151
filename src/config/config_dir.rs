use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::{ConfigError, ConfigResult};

/// Environment variable that points at an explicit config file.
pub static CONFIG_PATH_ENV: &str = "FORGE_CONFIG";

static CONFIG_FILENAME: &str = "config.toml";

pub fn find_config_file(use_local: bool) -> PathBuf {
    if let Some(explicit) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(explicit);
    }

    if use_local {
        return PathBuf::from(".").join(CONFIG_FILENAME);
    }

    #[cfg(unix)]
    let base = std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"));
    #[cfg(windows)]
    let base = std::env::var_os("APPDATA").map(PathBuf::from);
    #[cfg(not(any(unix, windows)))]
    let base: Option<PathBuf> = None;

    base.map(|dir| dir.join(crate::APPLICATION_NAME).join(CONFIG_FILENAME))
        .filter(|path| path.exists())
        .unwrap_or_else(|| PathBuf::from(".").join(CONFIG_FILENAME))
}

pub fn read_config(use_local: bool) -> ConfigResult<String> {
    read_config_file(&find_config_file(use_local))
}

pub fn read_config_file(filename: &Path) -> ConfigResult<String> {
    tracing::trace!("looking for config at: {}", filename.display());
    if !filename.exists() {
        return Err(ConfigError::ConfigNotFound);
    }

    let filename = filename.canonicalize()?;
    debug!("using {} as configuration file", filename.display());

    Ok(std::fs::read_to_string(filename)?)
}
