use serde::{Deserialize, Serialize};
use std::fmt;

/// Which service a beatmap set id belongs to.
///
/// Official and mirror ids are separate namespaces, so every set carries the
/// backend it was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Official,
    Mirror,
}

impl Backend {
    /// Human-facing name used in "not found" style messages
    pub fn display_name(&self) -> &'static str {
        match self {
            Backend::Official => "the official osu! directory",
            Backend::Mirror => "the beatmap mirror",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Official => write!(f, "official"),
            Backend::Mirror => write!(f, "mirror"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "official" | "osu" => Ok(Backend::Official),
            "mirror" | "bloodcat" => Ok(Backend::Mirror),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// Identity and display metadata for a downloadable beatmap set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatmapSet {
    pub id: u64,
    pub backend: Backend,
    pub artist: String,
    pub title: String,
    pub mapper: String,
    pub preview_image: String,
    pub preview_audio: String,
    /// Set once from the local library when the search result is built
    pub already_have: bool,
}

impl BeatmapSet {
    /// "Artist - Title"
    pub fn friendly_name(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }

    /// Final on-disk name before sanitizing: "<id> <artist> - <title>.osz"
    pub fn archive_name(&self) -> String {
        format!("{} {} - {}.osz", self.id, self.artist, self.title)
    }

    /// The same logical set addressed in another backend's namespace.
    ///
    /// The mirror keys sets by the official set id, so the id carries over.
    pub fn translated_to(&self, backend: Backend) -> Self {
        Self {
            backend,
            ..self.clone()
        }
    }
}
