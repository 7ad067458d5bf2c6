use crate::beatmap::{Backend, BeatmapSet};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Dedup identity of a transfer: set ids are only unique within one backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DownloadKey {
    pub backend: Backend,
    pub set_id: u64,
}

impl DownloadKey {
    pub fn new(backend: Backend, set_id: u64) -> Self {
        Self { backend, set_id }
    }

    pub fn of(set: &BeatmapSet) -> Self {
        Self::new(set.backend, set.id)
    }
}

impl fmt::Display for DownloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.backend, self.set_id)
    }
}

/// Where a registered transfer is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferState {
    Downloading,
    Completed,
    Cancelled,
    Failed,
}

/// Live counters shared by every clone of a download handle
#[derive(Debug, Default)]
struct TransferProgress {
    downloaded: AtomicU64,
    /// 0 when the server did not announce a length
    total: AtomicU64,
    /// f64 bits of the latest bytes/sec sample
    speed: AtomicU64,
}

/// One transfer handle, produced by the source resolver and run by the manager.
///
/// Clones share the cancellation flag and progress counters.
#[derive(Debug, Clone)]
pub struct BeatmapDownload {
    pub id: Uuid,
    pub backend: Backend,
    pub set: Arc<BeatmapSet>,
    pub url: String,
    pub headers: HashMap<String, String>,
    /// Scratch file owned by this transfer
    pub temp_path: PathBuf,
    /// Final sanitized archive name
    pub file_name: String,
    pub friendly_name: String,
    pub created_at: DateTime<Utc>,
    cancel: CancellationToken,
    progress: Arc<TransferProgress>,
}

impl BeatmapDownload {
    pub fn new(
        set: Arc<BeatmapSet>,
        backend: Backend,
        url: String,
        headers: HashMap<String, String>,
        work_dir: &std::path::Path,
    ) -> Self {
        let id = Uuid::new_v4();
        let temp_path = work_dir.join(crate::file::naming::temp_file_name(id));
        let file_name = crate::file::naming::sanitize_filename(&set.archive_name());
        let friendly_name = set.friendly_name();

        Self {
            id,
            backend,
            set,
            url,
            headers,
            temp_path,
            file_name,
            friendly_name,
            created_at: Utc::now(),
            cancel: CancellationToken::new(),
            progress: Arc::new(TransferProgress::default()),
        }
    }

    pub fn key(&self) -> DownloadKey {
        DownloadKey::new(self.backend, self.set.id)
    }

    /// Flip the cancellation flag. Returns false if it was already set.
    pub fn cancel(&self) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.cancel.cancel();
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn downloaded(&self) -> u64 {
        self.progress.downloaded.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> Option<u64> {
        match self.progress.total.load(Ordering::Relaxed) {
            0 => None,
            total => Some(total),
        }
    }

    /// Latest throughput sample in bytes per second
    pub fn speed(&self) -> f64 {
        f64::from_bits(self.progress.speed.load(Ordering::Relaxed))
    }

    pub(crate) fn record_progress(&self, downloaded: u64, total: Option<u64>) {
        self.progress.downloaded.store(downloaded, Ordering::Relaxed);
        if let Some(total) = total {
            self.progress.total.store(total, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_speed(&self, bytes_per_sec: f64) {
        self.progress
            .speed
            .store(bytes_per_sec.max(0.0).to_bits(), Ordering::Relaxed);
    }

    /// Progress percentage when the total is known
    pub fn percent(&self) -> Option<u8> {
        let total = self.total()?;
        Some(((self.downloaded() as f64 / total as f64) * 100.0).min(100.0) as u8)
    }
}

/// Read-only view of a registry entry for progress displays
#[derive(Debug, Clone, Serialize)]
pub struct DownloadSnapshot {
    pub key: DownloadKey,
    pub friendly_name: String,
    pub state: TransferState,
    pub downloaded: u64,
    pub total: Option<u64>,
    pub speed: f64,
    pub cancelled: bool,
}

/// A transfer that reached `Completed`; the temp file holds the whole archive
#[derive(Debug, Clone)]
pub struct CompletedDownload {
    pub download: BeatmapDownload,
    pub bytes: u64,
    pub finished_at: DateTime<Utc>,
}

impl CompletedDownload {
    pub fn duration_secs(&self) -> f64 {
        (self.finished_at - self.download.created_at).num_milliseconds() as f64 / 1000.0
    }
}
