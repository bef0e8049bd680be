//! Utility functions for log formatting, time parsing and file system checks.

use chrono::NaiveTime;
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a character boundary) and
/// get an ellipsis plus the number of dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Parse a time of day written as `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime, String> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|e| format!("invalid time {s:?} (expected HH:MM): {e}"))
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and immediately deletes a
/// probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    // A small sync write keeps the error surface simple.
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Resource directory is writable");
    Ok(())
}
