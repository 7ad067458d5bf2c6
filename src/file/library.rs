use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, RwLock};

/// The game's song library as seen by the download core.
///
/// The core only ever asks it to rescan, once the last active transfer is gone.
pub trait LibraryIndex: Send + Sync {
    fn reload(&self);
}

/// Library entries are "<set id> <artist> - <title>" folders or "<set id>.osz" archives
static SET_ID_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)(?:\s|\.osz$)").expect("valid set id regex"));

/// Set ids present in the Songs directory
pub struct LocalLibrary {
    songs_dir: PathBuf,
    ids: RwLock<HashSet<u64>>,
}

impl LocalLibrary {
    pub fn new(songs_dir: impl Into<PathBuf>) -> Self {
        Self {
            songs_dir: songs_dir.into(),
            ids: RwLock::new(HashSet::new()),
        }
    }

    /// Create and scan immediately
    pub fn scanned(songs_dir: impl Into<PathBuf>) -> Self {
        let library = Self::new(songs_dir);
        library.reload();
        library
    }

    pub fn songs_dir(&self) -> &Path {
        &self.songs_dir
    }

    pub fn contains(&self, set_id: u64) -> bool {
        self.ids
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&set_id)
    }

    pub fn len(&self) -> usize {
        self.ids.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn scan(dir: &Path) -> HashSet<u64> {
        let mut ids = HashSet::new();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Could not read songs directory {:?}: {}", dir, e);
                return ids;
            }
        };

        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(id) = SET_ID_PREFIX
                .captures(name)
                .and_then(|caps| caps[1].parse::<u64>().ok())
            {
                ids.insert(id);
            }
        }
        ids
    }
}

impl LibraryIndex for LocalLibrary {
    fn reload(&self) {
        let ids = Self::scan(&self.songs_dir);
        tracing::info!("Library reloaded: {} beatmap set(s) in {:?}", ids.len(), self.songs_dir);
        *self.ids.write().unwrap_or_else(|e| e.into_inner()) = ids;
    }
}
