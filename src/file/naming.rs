use std::path::Path;
use uuid::Uuid;

/// Extension reserved for in-progress transfers
pub const TEMP_EXTENSION: &str = "nexd";

const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL",
    "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9",
    "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Make a display-derived name legal on every filesystem osu! runs on
pub fn sanitize_filename(name: &str) -> String {
    let mut result: String = name
        .chars()
        .map(|c| {
            if INVALID_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let upper = result.to_uppercase();
    let base = upper.split('.').next().unwrap_or("");
    if RESERVED_NAMES.contains(&base) {
        result = format!("_{}", result);
    }

    // Windows rejects trailing spaces and dots
    result = result.trim_end_matches([' ', '.']).to_string();

    if result.is_empty() {
        result = "_".to_string();
    }

    result
}

/// Temp artifact name for one transfer: `<uuid>.nexd`.
///
/// A fresh v4 id per transfer keeps concurrent transfers and leftovers from a
/// crashed run from ever sharing a path.
pub fn temp_file_name(transfer_id: Uuid) -> String {
    format!("{}.{}", transfer_id, TEMP_EXTENSION)
}

/// Whether `path` looks like a temp artifact the startup sweep may delete
pub fn is_temp_artifact(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(TEMP_EXTENSION))
}
