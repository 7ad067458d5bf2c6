//! Process-wide throughput sampling.
//!
//! The manager's monitor task publishes one [`SpeedSample`] per interval.
//! Listeners read through a [`SpeedSubscriber`], which drops nonzero samples
//! that arrive within one interval of the last delivered sample so a slow
//! consumer is never flooded. Zero samples always get through, so an idle
//! manager is reported promptly.

use super::task::DownloadKey;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

/// Mean throughput across active transfers at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpeedSample {
    pub bytes_per_sec: f64,
    pub active: usize,
}

impl SpeedSample {
    pub const IDLE: SpeedSample = SpeedSample {
        bytes_per_sec: 0.0,
        active: 0,
    };
}

/// Mean of the per-transfer samples; 0 when there are none
pub fn mean_speed(samples: &[f64]) -> SpeedSample {
    if samples.is_empty() {
        return SpeedSample::IDLE;
    }
    SpeedSample {
        bytes_per_sec: samples.iter().sum::<f64>() / samples.len() as f64,
        active: samples.len(),
    }
}

/// Debounced view of the speed broadcast
pub struct SpeedSubscriber {
    rx: broadcast::Receiver<SpeedSample>,
    interval: Duration,
    suppressed_until: Option<Instant>,
}

impl SpeedSubscriber {
    pub(crate) fn new(rx: broadcast::Receiver<SpeedSample>, interval: Duration) -> Self {
        Self {
            rx,
            interval,
            suppressed_until: None,
        }
    }

    /// Next sample that passes the debounce; None once the manager is gone
    pub async fn recv(&mut self) -> Option<SpeedSample> {
        loop {
            let sample = match self.rx.recv().await {
                Ok(sample) => sample,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::trace!("Speed subscriber lagged by {} samples", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            };

            let now = Instant::now();
            let suppressed = self.suppressed_until.is_some_and(|until| now < until);
            if suppressed && sample.bytes_per_sec != 0.0 {
                continue;
            }

            self.suppressed_until = Some(now + self.interval);
            return Some(sample);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RateMark {
    bytes: u64,
    at: Instant,
    rate: f64,
}

/// Per-transfer throughput from byte-count deltas.
///
/// A transfer's rate is only recomputed once a full window has passed since
/// its last mark, so a stalled transfer drops to 0 one window after its last
/// byte and frequent readers do not shrink the window.
#[derive(Debug)]
pub(crate) struct RateTracker {
    window: Duration,
    marks: HashMap<DownloadKey, RateMark>,
}

impl RateTracker {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            marks: HashMap::new(),
        }
    }

    /// Current rate of `key`, counting from `started` with 0 bytes on first sight
    pub(crate) fn observe(&mut self, key: DownloadKey, downloaded: u64, started: Instant, now: Instant) -> f64 {
        let mark = self.marks.entry(key).or_insert(RateMark {
            bytes: 0,
            at: started,
            rate: 0.0,
        });

        let elapsed = now.saturating_duration_since(mark.at);
        if elapsed >= self.window && !elapsed.is_zero() {
            mark.rate = downloaded.saturating_sub(mark.bytes) as f64 / elapsed.as_secs_f64();
            mark.bytes = downloaded;
            mark.at = now;
        }
        mark.rate
    }

    /// Forget transfers that are no longer running
    pub(crate) fn retain(&mut self, keep: impl Fn(&DownloadKey) -> bool) {
        self.marks.retain(|key, _| keep(key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_speed() {
        assert_eq!(mean_speed(&[]), SpeedSample::IDLE);
        let sample = mean_speed(&[1000.0, 3000.0]);
        assert_eq!(sample.bytes_per_sec, 2000.0);
        assert_eq!(sample.active, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscriber_suppresses_nonzero_within_interval() {
        let (tx, rx) = broadcast::channel(16);
        let mut sub = SpeedSubscriber::new(rx, Duration::from_millis(500));

        tx.send(SpeedSample { bytes_per_sec: 100.0, active: 1 }).unwrap();
        tx.send(SpeedSample { bytes_per_sec: 200.0, active: 1 }).unwrap();
        tx.send(SpeedSample { bytes_per_sec: 0.0, active: 0 }).unwrap();

        assert_eq!(sub.recv().await.unwrap().bytes_per_sec, 100.0);
        // 200 arrives inside the window and is dropped, the zero sample is not
        assert_eq!(sub.recv().await.unwrap().bytes_per_sec, 0.0);

        tokio::time::advance(Duration::from_millis(600)).await;
        tx.send(SpeedSample { bytes_per_sec: 300.0, active: 1 }).unwrap();
        assert_eq!(sub.recv().await.unwrap().bytes_per_sec, 300.0);
    }

    #[tokio::test]
    async fn test_subscriber_ends_when_sender_dropped() {
        let (tx, rx) = broadcast::channel::<SpeedSample>(4);
        let mut sub = SpeedSubscriber::new(rx, Duration::from_millis(500));
        drop(tx);
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_tracker_follows_byte_deltas() {
        let key = DownloadKey::new(crate::beatmap::Backend::Mirror, 1);
        let started = Instant::now();
        let mut tracker = RateTracker::new(Duration::from_millis(500));

        // Inside the first window nothing is computed yet
        assert_eq!(tracker.observe(key, 4096, started, Instant::now()), 0.0);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(tracker.observe(key, 4096, started, Instant::now()), 4096.0);

        // A read shortly after keeps the last rate instead of a tiny window
        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(tracker.observe(key, 4096, started, Instant::now()), 4096.0);

        // No new bytes over a full window: stalled
        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(tracker.observe(key, 4096, started, Instant::now()), 0.0);

        tracker.retain(|_| false);
        assert!(tracker.marks.is_empty());
    }
}
