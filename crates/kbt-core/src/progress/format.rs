//! Human-readable formatting of sizes, rates and durations for display.

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Formats a byte count with binary units, e.g. `1.50 MB`.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

/// Formats a transfer rate, e.g. `512.00 KB/s`.
pub fn format_speed(bytes_per_sec: f64) -> String {
    if !bytes_per_sec.is_finite() || bytes_per_sec <= 0.0 {
        return "0 B/s".to_string();
    }
    format!("{}/s", format_size(bytes_per_sec.round() as u64))
}

/// Formats a remaining-time estimate; `--` when unknown.
pub fn format_time(seconds: Option<f64>) -> String {
    let secs = match seconds {
        Some(s) if s.is_finite() && s >= 0.0 => s.round() as u64,
        _ => return "--".to_string(),
    };
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let rest = secs % 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, rest)
    } else {
        format!("{}s", rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1536 * 1024), "1.50 MB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024), "5.00 GB");
    }

    #[test]
    fn speeds() {
        assert_eq!(format_speed(0.0), "0 B/s");
        assert_eq!(format_speed(f64::NAN), "0 B/s");
        assert_eq!(format_speed(512.0 * 1024.0), "512.00 KB/s");
    }

    #[test]
    fn times() {
        assert_eq!(format_time(None), "--");
        assert_eq!(format_time(Some(f64::INFINITY)), "--");
        assert_eq!(format_time(Some(42.4)), "42s");
        assert_eq!(format_time(Some(125.0)), "2m 5s");
        assert_eq!(format_time(Some(7_260.0)), "2h 1m");
    }
}
