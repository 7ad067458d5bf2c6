use super::naming::temp_file_name;
use crate::download::task::CompletedDownload;
use crate::error::{Error, Result};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sysinfo::System;
use uuid::Uuid;

/// The running game client, as far as placement cares
pub trait GameProcess: Send + Sync {
    fn is_running(&self) -> bool;

    /// Hand an archive to the client so it imports it itself
    fn launch(&self, archive: &Path) -> io::Result<()>;
}

/// osu! detected through the process table and launched with the archive as argument
pub struct OsuProcess {
    executable: PathBuf,
}

impl OsuProcess {
    const PROCESS_NAME: &'static str = "osu!";

    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

impl GameProcess for OsuProcess {
    fn is_running(&self) -> bool {
        let mut system = System::new();
        system.refresh_processes();
        system.processes().values().any(|process| {
            let name = process.name().to_ascii_lowercase();
            name == Self::PROCESS_NAME || name == "osu!.exe"
        })
    }

    fn launch(&self, archive: &Path) -> io::Result<()> {
        std::process::Command::new(&self.executable).arg(archive).spawn()?;
        Ok(())
    }
}

/// Where a finished archive ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedFile {
    pub path: PathBuf,
    /// Handed to the running game instead of dropped into the library
    pub launched: bool,
}

/// Moves completed temp artifacts to their final location
pub struct Placement {
    songs_dir: PathBuf,
    work_dir: PathBuf,
    launch_game: bool,
    game: Arc<dyn GameProcess>,
}

impl Placement {
    pub fn new(songs_dir: PathBuf, work_dir: PathBuf, launch_game: bool, game: Arc<dyn GameProcess>) -> Self {
        Self {
            songs_dir,
            work_dir,
            launch_game,
            game,
        }
    }

    /// Move the artifact to `songs_dir/<file name>`, or hand it to the running game.
    ///
    /// An existing file of the same name is replaced.
    pub async fn place(&self, completed: &CompletedDownload) -> Result<PlacedFile> {
        let download = &completed.download;
        let handoff = self.launch_game && self.game_running().await;
        let dest_dir = if handoff { &self.work_dir } else { &self.songs_dir };
        let dest = dest_dir.join(&download.file_name);

        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| Error::placement(dest_dir, e))?;
        move_replacing(&download.temp_path, &dest).await?;

        if handoff {
            self.game
                .launch(&dest)
                .map_err(|e| Error::placement(&dest, e))?;
            tracing::info!("Handed {:?} to the running game", dest);
        } else {
            tracing::info!("Placed {:?}", dest);
        }

        Ok(PlacedFile {
            path: dest,
            launched: handoff,
        })
    }

    /// Process table scans block, so they run off the async workers
    async fn game_running(&self) -> bool {
        let game = self.game.clone();
        match tokio::task::spawn_blocking(move || game.is_running()).await {
            Ok(running) => running,
            Err(e) => {
                tracing::warn!("Game process check failed: {}", e);
                false
            }
        }
    }
}

/// Rename `src` over `dest`, falling back to copy when the rename crosses devices.
///
/// An existing `dest` is only replaced by the final rename, so it survives
/// any earlier failure.
async fn move_replacing(src: &Path, dest: &Path) -> Result<()> {
    let rename_err = match tokio::fs::rename(src, dest).await {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    tracing::debug!("Rename {:?} -> {:?} failed ({}), copying instead", src, dest, rename_err);

    // Copy next to the destination first so the final rename stays atomic.
    // A crash mid-copy leaves a `.nexd` there, which the startup sweep covers.
    let parent = dest.parent().unwrap_or(Path::new("."));
    let staging = parent.join(temp_file_name(Uuid::new_v4()));
    if let Err(e) = tokio::fs::copy(src, &staging).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(Error::placement(dest, e));
    }
    if let Err(e) = tokio::fs::rename(&staging, dest).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(Error::placement(dest, e));
    }
    if let Err(e) = tokio::fs::remove_file(src).await {
        tracing::warn!("Copied {:?} but could not delete the source: {}", src, e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beatmap::{Backend, BeatmapSet};
    use crate::download::task::BeatmapDownload;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FakeGame {
        running: bool,
        launched: Mutex<Vec<PathBuf>>,
    }

    impl GameProcess for FakeGame {
        fn is_running(&self) -> bool {
            self.running
        }

        fn launch(&self, archive: &Path) -> io::Result<()> {
            self.launched.lock().unwrap().push(archive.to_path_buf());
            Ok(())
        }
    }

    fn completed(work_dir: &Path, body: &[u8]) -> CompletedDownload {
        let set = BeatmapSet {
            id: 7,
            backend: Backend::Mirror,
            artist: "Artist".to_string(),
            title: "Title".to_string(),
            mapper: "m".to_string(),
            preview_image: String::new(),
            preview_audio: String::new(),
            already_have: false,
        };
        let download = BeatmapDownload::new(
            Arc::new(set),
            Backend::Mirror,
            "http://unused/d/7".to_string(),
            HashMap::new(),
            work_dir,
        );
        std::fs::write(&download.temp_path, body).unwrap();
        CompletedDownload {
            download,
            bytes: body.len() as u64,
            finished_at: chrono::Utc::now(),
        }
    }

    fn game(running: bool) -> Arc<FakeGame> {
        Arc::new(FakeGame {
            running,
            launched: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_place_into_songs_dir() {
        let work = TempDir::new().unwrap();
        let songs = TempDir::new().unwrap();
        let done = completed(work.path(), b"archive");

        let placement = Placement::new(songs.path().to_path_buf(), work.path().to_path_buf(), true, game(false));
        let placed = placement.place(&done).await.unwrap();

        assert!(!placed.launched);
        assert_eq!(placed.path, songs.path().join("7 Artist - Title.osz"));
        assert_eq!(std::fs::read(&placed.path).unwrap(), b"archive");
        assert!(!done.download.temp_path.exists());
    }

    #[tokio::test]
    async fn test_place_replaces_existing_file() {
        let work = TempDir::new().unwrap();
        let songs = TempDir::new().unwrap();
        std::fs::write(songs.path().join("7 Artist - Title.osz"), b"old").unwrap();
        let done = completed(work.path(), b"new");

        let placement = Placement::new(songs.path().to_path_buf(), work.path().to_path_buf(), false, game(false));
        placement.place(&done).await.unwrap();

        let files: Vec<_> = std::fs::read_dir(songs.path()).unwrap().flatten().collect();
        assert_eq!(files.len(), 1);
        assert_eq!(std::fs::read(files[0].path()).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_handoff_when_game_running() {
        let work = TempDir::new().unwrap();
        let songs = TempDir::new().unwrap();
        let done = completed(work.path(), b"archive");
        let fake = game(true);

        let placement = Placement::new(songs.path().to_path_buf(), work.path().to_path_buf(), true, fake.clone());
        let placed = placement.place(&done).await.unwrap();

        assert!(placed.launched);
        assert_eq!(placed.path, work.path().join("7 Artist - Title.osz"));
        assert_eq!(fake.launched.lock().unwrap().as_slice(), &[placed.path.clone()]);
        assert_eq!(std::fs::read_dir(songs.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_failed_placement_keeps_existing_file() {
        let work = TempDir::new().unwrap();
        let songs = TempDir::new().unwrap();
        let existing = songs.path().join("7 Artist - Title.osz");
        std::fs::write(&existing, b"old").unwrap();
        let done = completed(work.path(), b"new");
        std::fs::remove_file(&done.download.temp_path).unwrap();

        let placement = Placement::new(songs.path().to_path_buf(), work.path().to_path_buf(), false, game(false));
        assert!(placement.place(&done).await.is_err());

        assert_eq!(std::fs::read(&existing).unwrap(), b"old");
        assert_eq!(std::fs::read_dir(songs.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_missing_temp_is_placement_error() {
        let work = TempDir::new().unwrap();
        let songs = TempDir::new().unwrap();
        let done = completed(work.path(), b"x");
        std::fs::remove_file(&done.download.temp_path).unwrap();

        let placement = Placement::new(songs.path().to_path_buf(), work.path().to_path_buf(), false, game(false));
        let err = placement.place(&done).await.unwrap_err();
        assert!(matches!(err, Error::Placement { .. }));
    }
}
