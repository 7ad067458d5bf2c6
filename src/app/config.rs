use crate::beatmap::Backend;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete configuration (saved to config/settings.toml)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub general: GeneralConfig,
    pub paths: PathsConfig,
    pub official: OfficialConfig,
    pub mirror: MirrorConfig,
    pub network: NetworkConfig,
    #[serde(default)]
    pub download: DownloadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Backend used for search, resolve and download
    pub backend: Backend,
    /// Hand finished archives to a running game client instead of the Songs folder
    #[serde(default)]
    pub launch_game: bool,
    #[serde(default = "default_deep_link_scheme")]
    pub deep_link_scheme: String,
}

fn default_deep_link_scheme() -> String {
    "nexdirect".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// osu! installation directory (contains osu!.exe and Songs/)
    pub game_dir: PathBuf,
    /// Override for the library directory; defaults to `<game_dir>/Songs`
    #[serde(default)]
    pub songs_dir: Option<PathBuf>,
    /// Where in-progress `.nexd` files and hand-off archives live
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfficialConfig {
    pub base_url: String,
    /// Session cookie sent with official downloads
    #[serde(default)]
    pub session_cookie: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Speed aggregation cadence
    #[serde(default = "default_speed_interval_ms")]
    pub speed_interval_ms: u64,
}

fn default_speed_interval_ms() -> u64 {
    500
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            speed_interval_ms: default_speed_interval_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig {
                backend: Backend::Mirror,
                launch_game: false,
                deep_link_scheme: default_deep_link_scheme(),
            },
            paths: PathsConfig {
                game_dir: crate::util::paths::resolve_default_game_directory(),
                songs_dir: None,
                work_dir: None,
            },
            official: OfficialConfig {
                base_url: "https://osu.ppy.sh".to_string(),
                session_cookie: None,
            },
            mirror: MirrorConfig {
                base_url: "https://bloodcat.com/osu".to_string(),
            },
            network: NetworkConfig {
                user_agent: format!("NexDirect/{}", env!("CARGO_PKG_VERSION")),
                connect_timeout_secs: 30,
                timeout_secs: 300,
            },
            download: DownloadConfig::default(),
        }
    }
}

impl Config {
    /// Library directory new archives are placed in
    pub fn songs_dir(&self) -> PathBuf {
        self.paths
            .songs_dir
            .clone()
            .unwrap_or_else(|| self.paths.game_dir.join("Songs"))
    }

    /// Directory holding `.nexd` temp artifacts
    pub fn work_dir(&self) -> PathBuf {
        self.paths
            .work_dir
            .clone()
            .unwrap_or_else(crate::util::paths::resolve_default_work_directory)
    }

    /// Directories that can hold `.nexd` artifacts: the work dir, plus the
    /// Songs dir where cross-device placement stages its copy
    pub fn temp_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![self.work_dir()];
        let songs = self.songs_dir();
        if !dirs.contains(&songs) {
            dirs.push(songs);
        }
        dirs
    }

    /// Game client executable used for the launch hand-off
    pub fn game_executable(&self) -> PathBuf {
        self.paths.game_dir.join("osu!.exe")
    }

    /// Load configuration from settings.toml, falling back to defaults
    pub fn load() -> anyhow::Result<Self> {
        let config_path = crate::util::paths::get_app_config_path()?;
        Self::load_from(&config_path)
    }

    /// Save configuration to settings.toml
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = crate::util::paths::get_app_config_path()?;
        self.save_to(&config_path)
    }

    pub fn load_from(path: &std::path::Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        if path.exists() {
            let content = std::fs::read_to_string(path)
                .context(format!("Failed to read {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .context(format!("Failed to parse {:?}", path))?;
            Ok(config)
        } else {
            tracing::info!("Config not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &std::path::Path) -> anyhow::Result<()> {
        use anyhow::Context;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;

        // Atomic write using temp file + rename
        let temp_path = path.with_extension("toml.tmp");
        std::fs::write(&temp_path, &content)
            .context("Failed to write temp config file")?;
        std::fs::rename(&temp_path, path)
            .context("Failed to rename temp config file")?;

        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
