use super::config::Config;
use super::prompt::Prompter;
use crate::beatmap::BeatmapSet;
use crate::download::task::{BeatmapDownload, DownloadKey};
use crate::download::DownloadManager;
use crate::error::{Error, Result};
use crate::file::placement::{GameProcess, PlacedFile, Placement};
use crate::source::SourceResolver;
use std::sync::Arc;
use tokio::sync::RwLock;

/// How a user-initiated download ended, short of an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    Placed(PlacedFile),
    /// Already in the library and the user kept it
    Skipped,
    /// The user turned down the mirror fallback
    Declined,
    Cancelled,
}

/// Prepare, transfer and place one beatmap set
#[derive(Clone)]
pub struct DownloadFlow {
    config: Arc<RwLock<Config>>,
    resolver: SourceResolver,
    manager: DownloadManager,
    game: Arc<dyn GameProcess>,
    prompter: Arc<dyn Prompter>,
}

impl DownloadFlow {
    pub fn new(
        config: Arc<RwLock<Config>>,
        resolver: SourceResolver,
        manager: DownloadManager,
        game: Arc<dyn GameProcess>,
        prompter: Arc<dyn Prompter>,
    ) -> Self {
        Self {
            config,
            resolver,
            manager,
            game,
            prompter,
        }
    }

    pub fn manager(&self) -> &DownloadManager {
        &self.manager
    }

    /// Put one question to the prompter on a blocking thread, since
    /// terminal answers come from a stdin read. A lost answer counts as "no".
    pub async fn ask<F>(&self, set: &BeatmapSet, question: F) -> bool
    where
        F: FnOnce(&dyn Prompter, &BeatmapSet) -> bool + Send + 'static,
    {
        let prompter = self.prompter.clone();
        let set = set.clone();
        match tokio::task::spawn_blocking(move || question(prompter.as_ref(), &set)).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("Confirmation prompt failed: {}", e);
                false
            }
        }
    }

    pub async fn download_set(&self, set: &BeatmapSet) -> Result<FlowOutcome> {
        self.download_set_via(set, None).await
    }

    /// Like [`download_set`](Self::download_set), with a one-off mirror base URL
    pub async fn download_set_via(&self, set: &BeatmapSet, mirror_override: Option<&str>) -> Result<FlowOutcome> {
        let key = DownloadKey::of(set);
        if self.manager.is_active(key).await {
            return Err(Error::AlreadyInProgress {
                backend: key.backend,
                set_id: key.set_id,
            });
        }

        if set.already_have && !self.ask(set, |p, s| p.confirm_redownload(s)).await {
            tracing::info!(%key, "Skipping download of installed set: {}", set.friendly_name());
            return Ok(FlowOutcome::Skipped);
        }

        let download = match self.resolver.prepare_download(set, mirror_override).await {
            Ok(download) => download,
            Err(Error::IllegalDownload { set_id }) => {
                if !self.ask(set, |p, s| p.confirm_mirror_fallback(s)).await {
                    tracing::info!(set_id, "Mirror fallback declined");
                    return Ok(FlowOutcome::Declined);
                }
                tracing::info!(set_id, "Falling back to the mirror");
                self.resolver.prepare_from_mirror(set, mirror_override).await?
            }
            Err(e) => return Err(e),
        };

        self.transfer_and_place(download).await
    }

    async fn transfer_and_place(&self, download: BeatmapDownload) -> Result<FlowOutcome> {
        let key = download.key();

        let completed = match self.manager.start(download).await {
            Ok(completed) => completed,
            Err(e) if e.is_cancelled() => return Ok(FlowOutcome::Cancelled),
            Err(e) => return Err(e),
        };

        let placement = {
            let config = self.config.read().await;
            Placement::new(
                config.songs_dir(),
                config.work_dir(),
                config.general.launch_game,
                self.game.clone(),
            )
        };
        let placed = placement.place(&completed).await;

        if placed.is_err() {
            match tokio::fs::remove_file(&completed.download.temp_path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to delete temp file {:?}: {}", completed.download.temp_path, e),
            }
        }
        self.manager.remove(key).await;

        let placed = placed?;
        tracing::info!(
            %key,
            bytes = completed.bytes,
            secs = completed.duration_secs(),
            "Finished {}",
            completed.download.friendly_name
        );
        Ok(FlowOutcome::Placed(placed))
    }
}
