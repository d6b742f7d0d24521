//! Compact, human-readable renderings used in skill results.
//!
//! The model reads these values, so they favour brevity over precision.

const KIB: f64 = 1024.0;
const MIB: f64 = KIB * 1024.0;
const GIB: f64 = MIB * 1024.0;

/// Names longer than this are shortened.
const MAX_NAME_CHARS: usize = 50;

/// Hard cap on list results.
pub const MAX_LIMIT: usize = 100;

pub fn format_size(bytes: u64) -> String {
    let b = bytes as f64;
    if bytes < 1024 {
        format!("{bytes}B")
    } else if b < MIB {
        format!("{:.1}KB", b / KIB)
    } else if b < GIB {
        format!("{:.1}MB", b / MIB)
    } else {
        format!("{:.2}GB", b / GIB)
    }
}

pub fn format_speed(bytes_per_sec: u64) -> String {
    if bytes_per_sec == 0 {
        "0".to_string()
    } else {
        format!("{}/s", format_size(bytes_per_sec))
    }
}

/// Cuts names to 47 characters plus `...` when over 50 characters.
pub fn truncate_name(name: &str) -> String {
    if name.chars().count() > MAX_NAME_CHARS {
        let head: String = name.chars().take(MAX_NAME_CHARS - 3).collect();
        format!("{head}...")
    } else {
        name.to_string()
    }
}

/// `percent_done` (0.0..=1.0) as a rounded percentage.
pub fn format_progress(percent_done: f64) -> String {
    format!("{}%", (percent_done * 100.0).round() as i64)
}

/// Transmission reports -1 / -2 when no ratio is available.
pub fn format_ratio(ratio: f64) -> String {
    format!("{:.2}", ratio.max(0.0))
}

/// Result limit: non-positive or absent falls back to `default`, capped
/// at [`MAX_LIMIT`].
pub fn effective_limit(requested: Option<i64>, default: usize) -> usize {
    match requested {
        Some(n) if n > 0 => (n as usize).min(MAX_LIMIT),
        _ => default.min(MAX_LIMIT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(0), "0B");
        assert_eq!(format_size(1023), "1023B");
        assert_eq!(format_size(1024), "1.0KB");
        assert_eq!(format_size(1536), "1.5KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024 / 2), "1.50GB");
    }

    #[test]
    fn test_format_speed() {
        assert_eq!(format_speed(0), "0");
        assert_eq!(format_speed(2048), "2.0KB/s");
    }

    #[test]
    fn test_truncate_name() {
        let short = "ubuntu-24.04-desktop-amd64.iso";
        assert_eq!(truncate_name(short), short);

        let exact = "a".repeat(50);
        assert_eq!(truncate_name(&exact), exact);

        let long = "b".repeat(60);
        let cut = truncate_name(&long);
        assert_eq!(cut.chars().count(), 50);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_truncate_name_multibyte() {
        let long = "电".repeat(51);
        let cut = truncate_name(&long);
        assert_eq!(cut, format!("{}...", "电".repeat(47)));
    }

    #[test]
    fn test_progress_and_ratio() {
        assert_eq!(format_progress(0.456), "46%");
        assert_eq!(format_progress(1.0), "100%");
        assert_eq!(format_ratio(1.234), "1.23");
        assert_eq!(format_ratio(-1.0), "0.00");
    }

    #[test]
    fn test_effective_limit() {
        assert_eq!(effective_limit(None, 20), 20);
        assert_eq!(effective_limit(Some(0), 20), 20);
        assert_eq!(effective_limit(Some(-5), 20), 20);
        assert_eq!(effective_limit(Some(7), 20), 7);
        assert_eq!(effective_limit(Some(500), 20), 100);
    }
}
