//! Human readable byte sizes.

const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Formats `bytes` with binary units and two decimals, e.g. `"1.50 KB"`.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}
