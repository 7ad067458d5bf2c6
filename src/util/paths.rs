use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::RwLock;

static CONFIG_DIR_OVERRIDE: RwLock<Option<PathBuf>> = RwLock::new(None);

/// Process-wide `--config` override; `None` clears it
pub fn set_config_dir_override(path: Option<PathBuf>) {
    *CONFIG_DIR_OVERRIDE.write().unwrap_or_else(|e| e.into_inner()) = path;
}

pub fn get_config_dir_override() -> Option<PathBuf> {
    CONFIG_DIR_OVERRIDE.read().unwrap_or_else(|e| e.into_inner()).clone()
}

const CONFIG_DIR_ENV: &str = "NEXDIRECT_CONFIG_DIR";

/// Existing-directory candidates, highest priority first
fn config_dir_candidates() -> Vec<(&'static str, PathBuf)> {
    let mut candidates = Vec::new();
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        candidates.push((CONFIG_DIR_ENV, PathBuf::from(dir)));
    }
    if let Ok(dir) = get_user_config_dir() {
        candidates.push(("user config dir", dir));
    }
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(("working dir", cwd.join("config")));
    }
    candidates
}

/// Locate the config directory.
///
/// Order: the `--config` override, `NEXDIRECT_CONFIG_DIR`, the platform config
/// dir (`~/.config/nexdirect`, `%APPDATA%\nexdirect`), then `./config`. The
/// override is used as given; the others only when they already exist. With
/// none present the platform config dir is created.
pub fn find_config_directory() -> Result<PathBuf> {
    if let Some(dir) = get_config_dir_override() {
        return Ok(dir);
    }

    if let Some((source, dir)) = config_dir_candidates().into_iter().find(|(_, dir)| dir.is_dir()) {
        tracing::debug!(source, "Config directory: {:?}", dir);
        return Ok(dir);
    }

    let dir = get_user_config_dir()?;
    std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create config directory {:?}", dir))?;
    tracing::info!("Created config directory at: {:?}", dir);
    Ok(dir)
}

/// Get platform-specific user config directory
fn get_user_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|base| base.join("nexdirect"))
        .context("No platform config directory")
}

pub fn get_app_config_path() -> Result<PathBuf> {
    Ok(find_config_directory()?.join("settings.toml"))
}

/// `<config dir>/logs`, where the daily JSON log files go
pub fn get_logs_dir() -> Result<PathBuf> {
    Ok(find_config_directory()?.join("logs"))
}

/// Resolve the default osu! installation directory.
///
/// Windows installs land in `%LOCALAPPDATA%\osu!`; elsewhere fall back to
/// `./osu!` relative to the working directory.
pub fn resolve_default_game_directory() -> PathBuf {
    if cfg!(windows) {
        if let Some(local) = dirs::data_local_dir() {
            return local.join("osu!");
        }
    }
    PathBuf::from("osu!")
}

/// Resolve the default working directory for temp artifacts.
///
/// Uses the executable's directory so the startup sweep sees the same place
/// every launch, falling back to the current directory.
pub fn resolve_default_work_directory() -> PathBuf {
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            return exe_dir.to_path_buf();
        }
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
