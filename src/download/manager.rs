use super::http_client::{HttpClient, TransferError};
use super::speed::{RateTracker, SpeedSample, SpeedSubscriber, mean_speed};
use super::task::{BeatmapDownload, CompletedDownload, DownloadKey, DownloadSnapshot, TransferState};
use crate::error::{Error, Result};
use crate::file::library::LibraryIndex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Registry change notification.
///
/// Per key the order is `Started`, any number of `Progress`, exactly one
/// `Finished`, then `Removed`.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadEvent {
    Started(DownloadKey),
    Progress {
        key: DownloadKey,
        downloaded: u64,
        total: Option<u64>,
    },
    Finished {
        key: DownloadKey,
        state: TransferState,
    },
    Removed(DownloadKey),
    /// The registry went from non-empty to empty
    Drained,
}

#[derive(Debug, Clone)]
struct Entry {
    download: BeatmapDownload,
    state: TransferState,
    started: Instant,
}

#[derive(Clone)]
pub struct DownloadManager {
    /// Active and completed-but-unplaced transfers, keyed by (backend, set id)
    registry: Arc<RwLock<HashMap<DownloadKey, Entry>>>,
    http_client: Arc<HttpClient>,
    events: broadcast::Sender<DownloadEvent>,
    rates: Arc<Mutex<RateTracker>>,
    speed_tx: broadcast::Sender<SpeedSample>,
    speed_interval: Duration,
    library: Option<Arc<dyn LibraryIndex>>,
    shutdown: CancellationToken,
}

impl DownloadManager {
    pub fn new(http_client: Arc<HttpClient>) -> Self {
        let (events, _) = broadcast::channel(256);
        let (speed_tx, _) = broadcast::channel(16);
        Self {
            registry: Arc::new(RwLock::new(HashMap::new())),
            http_client,
            events,
            rates: Arc::new(Mutex::new(RateTracker::new(Duration::from_millis(500)))),
            speed_tx,
            speed_interval: Duration::from_millis(500),
            library: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// Speed aggregation cadence (also the subscriber debounce window)
    pub fn with_speed_interval(mut self, interval: Duration) -> Self {
        self.speed_interval = interval;
        self.rates = Arc::new(Mutex::new(RateTracker::new(interval)));
        self
    }

    /// Library to reload whenever the registry drains
    pub fn with_library(mut self, library: Arc<dyn LibraryIndex>) -> Self {
        self.library = Some(library);
        self
    }

    // ========== Registry Views ==========

    /// Read-only copy of every registered transfer
    pub async fn snapshot(&self) -> Vec<DownloadSnapshot> {
        let registry = self.registry.read().await;
        registry
            .iter()
            .map(|(key, entry)| DownloadSnapshot {
                key: *key,
                friendly_name: entry.download.friendly_name.clone(),
                state: entry.state,
                downloaded: entry.download.downloaded(),
                total: entry.download.total(),
                speed: entry.download.speed(),
                cancelled: entry.download.is_cancelled(),
            })
            .collect()
    }

    pub async fn get(&self, key: DownloadKey) -> Option<BeatmapDownload> {
        self.registry.read().await.get(&key).map(|e| e.download.clone())
    }

    pub async fn state(&self, key: DownloadKey) -> Option<TransferState> {
        self.registry.read().await.get(&key).map(|e| e.state)
    }

    /// Whether the key holds a registry slot (running or awaiting placement)
    pub async fn is_active(&self, key: DownloadKey) -> bool {
        self.registry.read().await.contains_key(&key)
    }

    /// Transfers still moving bytes
    pub async fn active_count(&self) -> usize {
        self.registry
            .read()
            .await
            .values()
            .filter(|e| e.state == TransferState::Downloading)
            .count()
    }

    /// All registry entries, including completed ones not yet removed
    pub async fn len(&self) -> usize {
        self.registry.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.registry.read().await.is_empty()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DownloadEvent> {
        self.events.subscribe()
    }

    pub fn subscribe_speed(&self) -> SpeedSubscriber {
        SpeedSubscriber::new(self.speed_tx.subscribe(), self.speed_interval)
    }

    fn publish(&self, event: DownloadEvent) {
        // No listeners is fine
        let _ = self.events.send(event);
    }

    // ========== Download Operations ==========

    /// Register and run one transfer until it completes, fails or is cancelled.
    ///
    /// A completed entry stays registered until [`remove`](Self::remove). On
    /// failure or cancellation the temp file is deleted and the entry dropped
    /// before the error is returned.
    pub async fn start(&self, download: BeatmapDownload) -> Result<CompletedDownload> {
        let key = download.key();

        {
            let mut registry = self.registry.write().await;
            if registry.contains_key(&key) {
                tracing::info!(%key, "Download already in progress: {}", download.friendly_name);
                return Err(Error::AlreadyInProgress {
                    backend: key.backend,
                    set_id: key.set_id,
                });
            }
            registry.insert(
                key,
                Entry {
                    download: download.clone(),
                    state: TransferState::Downloading,
                    started: Instant::now(),
                },
            );
        }

        self.publish(DownloadEvent::Started(key));
        tracing::info!(%key, temp = ?download.temp_path, "Starting download: {}", download.friendly_name);

        let manager = self.clone();
        let transfer = download.clone();
        let handle = tokio::spawn(async move { manager.run_transfer(transfer).await });

        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(TransferError::Io(std::io::Error::other(format!(
                "transfer task ended unexpectedly: {}",
                e
            )))),
        };

        self.finish(download, result).await
    }

    async fn run_transfer(&self, download: BeatmapDownload) -> std::result::Result<u64, TransferError> {
        let key = download.key();
        let cancel = download.cancel_token();
        let events = self.events.clone();
        let progress_view = download.clone();
        let throttle = self.speed_interval;
        let mut last_event: Option<Instant> = None;

        let progress_callback = move |downloaded: u64, total: Option<u64>| {
            progress_view.record_progress(downloaded, total);

            // Throttled to one event per speed window
            if last_event.is_none_or(|at| at.elapsed() >= throttle) {
                last_event = Some(Instant::now());
                let _ = events.send(DownloadEvent::Progress {
                    key,
                    downloaded,
                    total,
                });
            }
        };

        self.http_client
            .download_to_file(
                &download.url,
                &download.temp_path,
                &download.headers,
                &cancel,
                progress_callback,
            )
            .await
    }

    async fn finish(
        &self,
        download: BeatmapDownload,
        result: std::result::Result<u64, TransferError>,
    ) -> Result<CompletedDownload> {
        let key = download.key();
        download.record_speed(0.0);

        match result {
            Ok(bytes) if !download.is_cancelled() => {
                if let Some(entry) = self.registry.write().await.get_mut(&key) {
                    entry.state = TransferState::Completed;
                }
                self.publish(DownloadEvent::Progress {
                    key,
                    downloaded: bytes,
                    total: download.total(),
                });
                self.publish(DownloadEvent::Finished {
                    key,
                    state: TransferState::Completed,
                });
                tracing::info!(%key, bytes, "Download completed: {}", download.friendly_name);

                Ok(CompletedDownload {
                    download,
                    bytes,
                    finished_at: chrono::Utc::now(),
                })
            }
            outcome => {
                // A cancelled transfer is reported as cancelled even if the
                // transport failed at the same time
                let cancelled =
                    download.is_cancelled() || matches!(outcome, Err(TransferError::Cancelled));

                Self::discard_temp(&download).await;

                let state = if cancelled {
                    TransferState::Cancelled
                } else {
                    TransferState::Failed
                };
                if let Some(entry) = self.registry.write().await.get_mut(&key) {
                    entry.state = state;
                }
                self.publish(DownloadEvent::Finished { key, state });
                self.unregister(key).await;

                if cancelled {
                    tracing::info!(%key, "Download cancelled: {}", download.friendly_name);
                    return Err(Error::Cancelled {
                        title: download.set.title.clone(),
                    });
                }

                let message = match outcome {
                    Err(TransferError::Status(info)) => info.detail(),
                    Err(e) => e.to_string(),
                    Ok(_) => "transfer ended in an unknown state".to_string(),
                };
                tracing::error!(%key, "Download failed for {}: {}", download.friendly_name, message);

                Err(Error::TransferFailed {
                    title: download.set.title.clone(),
                    backend: download.backend,
                    temp_path: download.temp_path.clone(),
                    message,
                })
            }
        }
    }

    /// Delete a transfer's temp artifact, tolerating its absence
    async fn discard_temp(download: &BeatmapDownload) {
        match tokio::fs::remove_file(&download.temp_path).await {
            Ok(()) => tracing::debug!("Deleted temp file {:?}", download.temp_path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to delete temp file {:?}: {}", download.temp_path, e),
        }
    }

    /// Request a cooperative stop. Returns false if it was already cancelled.
    pub fn cancel(&self, download: &BeatmapDownload) -> bool {
        let first = download.cancel();
        if first {
            tracing::info!(key = %download.key(), "Cancellation requested: {}", download.friendly_name);
        }
        first
    }

    /// Cancel by key; false when nothing is registered under it
    pub async fn cancel_key(&self, key: DownloadKey) -> bool {
        match self.get(key).await {
            Some(download) => self.cancel(&download),
            None => false,
        }
    }

    /// Drop a finished entry once the caller has placed it.
    ///
    /// Entries still downloading are left alone (cancel them instead).
    pub async fn remove(&self, key: DownloadKey) -> Option<BeatmapDownload> {
        if self.state(key).await == Some(TransferState::Downloading) {
            tracing::warn!(%key, "Refusing to remove a running download");
            return None;
        }
        self.unregister(key).await
    }

    async fn unregister(&self, key: DownloadKey) -> Option<BeatmapDownload> {
        let (removed, drained) = {
            let mut registry = self.registry.write().await;
            let removed = registry.remove(&key);
            let drained = removed.is_some() && registry.is_empty();
            (removed, drained)
        };

        if removed.is_some() {
            self.publish(DownloadEvent::Removed(key));
        }
        if drained {
            self.on_drained().await;
        }
        removed.map(|e| e.download)
    }

    async fn on_drained(&self) {
        tracing::debug!("Download registry drained");
        self.publish(DownloadEvent::Drained);

        if let Some(library) = self.library.clone() {
            if let Err(e) = tokio::task::spawn_blocking(move || library.reload()).await {
                tracing::error!("Library reload failed: {}", e);
            }
        }
    }

    // ========== Speed Aggregation ==========

    /// Mean speed across transfers that are still downloading.
    ///
    /// Each transfer's rate comes from its byte count change over the last
    /// full speed interval, so a stalled transfer counts as 0.
    pub async fn current_speed(&self) -> SpeedSample {
        let registry = self.registry.read().await;
        let mut rates = self.rates.lock().await;
        let now = Instant::now();

        let running = |key: &DownloadKey| {
            registry
                .get(key)
                .is_some_and(|e| e.state == TransferState::Downloading)
        };
        rates.retain(running);

        let samples: Vec<f64> = registry
            .iter()
            .filter(|(_, e)| e.state == TransferState::Downloading)
            .map(|(key, e)| {
                let speed = rates.observe(*key, e.download.downloaded(), e.started, now);
                e.download.record_speed(speed);
                speed
            })
            .collect();
        mean_speed(&samples)
    }

    /// Start the periodic speed publisher; it runs until [`shutdown`](Self::shutdown)
    pub fn spawn_speed_monitor(&self) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(manager.speed_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = manager.shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let sample = manager.current_speed().await;
                        tracing::trace!(active = sample.active, "Speed sample: {:.1} B/s", sample.bytes_per_sec);
                        let _ = manager.speed_tx.send(sample);
                    }
                }
            }
            tracing::debug!("Speed monitor stopped");
        })
    }

    /// Cancel every running transfer and stop the speed monitor
    pub async fn shutdown(&self) {
        let running: Vec<BeatmapDownload> = self
            .registry
            .read()
            .await
            .values()
            .filter(|e| e.state == TransferState::Downloading)
            .map(|e| e.download.clone())
            .collect();
        for download in &running {
            self.cancel(download);
        }
        self.shutdown.cancel();
    }
}
