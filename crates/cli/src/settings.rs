//! Config file discovery and loading.

use std::path::{Path, PathBuf};

use payadj_recon::AdjustmentConfig;

use crate::exit_codes::EXIT_INVALID_CONFIG;
use crate::CliError;

pub const LOCAL_CONFIG: &str = "payadj.toml";

/// Per-user config file: `<config dir>/payadj/config.toml`.
pub fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("payadj")
        .join("config.toml")
}

/// Explicit path (flag or `PAYADJ_CONFIG`), else `./payadj.toml`, else the
/// per-user config file.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.is_file() {
        return Ok(local);
    }
    let user = user_config_path();
    if user.is_file() {
        return Ok(user);
    }
    Err(CliError::usage("no config file found").with_hint(format!(
        "pass --config, set PAYADJ_CONFIG, or create ./{} or {}",
        LOCAL_CONFIG,
        user.display()
    )))
}

/// Read and validate a config file. Returns the config and the directory
/// that relative store paths resolve against.
pub fn load_config(path: &Path) -> Result<(AdjustmentConfig, PathBuf), CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| CliError {
        code: EXIT_INVALID_CONFIG,
        kind: "config".into(),
        message: format!("cannot read config {}: {e}", path.display()),
        hint: None,
        details: Vec::new(),
    })?;
    let config = AdjustmentConfig::from_toml(&text)?;
    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    tracing::debug!(config = %path.display(), name = %config.name, "config loaded");
    Ok((config, base_dir))
}
