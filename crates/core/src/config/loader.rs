//! Config path resolution
//!
//! The base directory comes from `PROTOFORGE_HOME` when set, otherwise from
//! the location of the running executable.

use std::path::PathBuf;

use super::{ConfigError, ConfigResult};

/// Environment variable overriding the base directory
pub const HOME_ENV: &str = "PROTOFORGE_HOME";

/// Returns the protoforge base directory.
///
/// Without `PROTOFORGE_HOME` the executable is expected at
/// `<base>/bin/protoforge` or `<base>/protoforge`.
pub fn protoforge_base_dir() -> ConfigResult<PathBuf> {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|h| !h.is_empty()) {
        return Ok(PathBuf::from(home));
    }

    let exe = std::env::current_exe().map_err(ConfigError::IoError)?;
    let dir = exe.parent().ok_or(ConfigError::NoConfigDirectory)?;

    // bin/ -> base
    if dir.file_name().is_some_and(|name| name == "bin") {
        dir.parent()
            .map(PathBuf::from)
            .ok_or(ConfigError::NoConfigDirectory)
    } else {
        Ok(dir.to_path_buf())
    }
}

/// Returns the base configs directory.
///
/// Path: `<base>/configs/`
pub fn configs_dir() -> ConfigResult<PathBuf> {
    Ok(protoforge_base_dir()?.join("configs"))
}

/// Returns the core config path.
///
/// Path: `<base>/configs/core.toml`
pub fn core_config_path() -> ConfigResult<PathBuf> {
    Ok(configs_dir()?.join("core.toml"))
}
