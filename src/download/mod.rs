pub mod http_client;
pub mod http_errors;
pub mod manager;
pub mod speed;
pub mod task;

pub use manager::{DownloadEvent, DownloadManager};
pub use speed::{SpeedSample, SpeedSubscriber};
pub use task::{BeatmapDownload, CompletedDownload, DownloadKey, DownloadSnapshot, TransferState};
