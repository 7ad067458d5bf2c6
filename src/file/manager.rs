use super::naming::is_temp_artifact;
use anyhow::Result;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// A `.nexd` file untouched this long belongs to no live transfer.
///
/// Running transfers rewrite their file on every chunk, and other instances
/// may share the work directory, so fresh artifacts are never swept.
pub const STALE_TEMP_AGE: Duration = Duration::from_secs(15 * 60);

pub struct FileManager;

impl FileManager {
    pub fn new() -> Self {
        Self
    }

    pub fn ensure_directory(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::create_dir_all(path)?;
        }
        Ok(())
    }

    /// Delete `*.nexd` leftovers in the top level of `dir` not modified for `min_age`.
    ///
    /// Best effort: a failed listing or delete is logged and skipped. Returns
    /// how many files were removed.
    pub fn sweep_stale_temps(&self, dir: &Path, min_age: Duration) -> usize {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!("Skipping temp sweep of {:?}: {}", dir, e);
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() || !is_temp_artifact(&path) {
                continue;
            }
            if !Self::untouched_for(&path, min_age) {
                tracing::debug!("Keeping recent temp file {:?}", path);
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    tracing::debug!("Removed stale temp file {:?}", path);
                    removed += 1;
                }
                Err(e) => tracing::warn!("Failed to remove stale temp file {:?}: {}", path, e),
            }
        }

        if removed > 0 {
            tracing::info!("Cleaned up {} stale temp file(s) in {:?}", removed, dir);
        }
        removed
    }

    /// Unknown modification times count as recent
    fn untouched_for(path: &Path, min_age: Duration) -> bool {
        std::fs::metadata(path)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .is_some_and(|age| age >= min_age)
    }
}

impl Default for FileManager {
    fn default() -> Self {
        Self::new()
    }
}
