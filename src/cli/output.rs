use crate::app::flow::FlowOutcome;
use crate::beatmap::BeatmapSet;

/// Format bytes into human-readable string (KB, MB, GB)
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// "1.50 MB/s"; whole bytes per second are enough precision
pub fn format_speed(bytes_per_sec: f64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec.max(0.0) as u64))
}

/// One search result per line
pub fn format_set(set: &BeatmapSet) -> String {
    let marker = if set.already_have { "✓" } else { " " };
    format!(
        "{} {:>8}  {} (mapped by {})",
        marker,
        set.id,
        set.friendly_name(),
        set.mapper
    )
}

pub fn format_sets(sets: &[BeatmapSet]) -> String {
    if sets.is_empty() {
        return "No beatmap sets found".to_string();
    }
    sets.iter().map(format_set).collect::<Vec<_>>().join("\n")
}

/// Progress line for a running transfer
pub fn format_progress(downloaded: u64, total: Option<u64>) -> String {
    match total {
        Some(total) if total > 0 => {
            let percent = (downloaded as f64 / total as f64 * 100.0).min(100.0) as u8;
            format!("{}% ({} / {})", percent, format_bytes(downloaded), format_bytes(total))
        }
        _ => format_bytes(downloaded),
    }
}

pub fn format_outcome(name: &str, outcome: &FlowOutcome) -> String {
    match outcome {
        FlowOutcome::Placed(placed) if placed.launched => {
            format!("Handed {} to the running game ({})", name, placed.path.display())
        }
        FlowOutcome::Placed(placed) => format!("Downloaded {} to {}", name, placed.path.display()),
        FlowOutcome::Skipped => format!("Skipped {} (already in your library)", name),
        FlowOutcome::Declined => format!("Did not download {}", name),
        FlowOutcome::Cancelled => format!("Cancelled download of {}", name),
    }
}
