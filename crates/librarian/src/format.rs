//! Display helpers for sizes and timestamps

use chrono::DateTime;

/// Human size with 1024 steps: whole bytes, one decimal above.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// `2024-03-14T15:09:26Z` -> `2024-03-14 15:09:26`.
///
/// Anything that is not RFC 3339 gets the same treatment textually.
pub fn format_time(ts: &str) -> String {
    if ts.is_empty() {
        return String::new();
    }
    match DateTime::parse_from_rfc3339(ts) {
        Ok(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        Err(_) => ts.replacen('T', " ", 1).replacen('Z', "", 1),
    }
}
