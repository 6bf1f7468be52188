//! Formatting helpers shared across the CLI and version feed.

use chrono::{DateTime, Utc};

/// Approximate tokens in a raw response: `ceil(chars / 4)`.
///
/// Counts characters, not bytes, so multibyte text is not overcounted.
pub fn approx_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

/// Format a token count in thousands with one decimal (e.g., "1.2k").
pub fn format_tokens(tokens: u64) -> String {
    format!("{:.1}k", tokens as f64 / 1000.0)
}

/// Derived asset size metric: content length / 4, one decimal, `k` suffix.
pub fn format_approx_size(byte_len: usize) -> String {
    format!("{:.1}k", byte_len as f64 / 4.0)
}

/// Format an elapsed duration in whole seconds (e.g., "12s").
pub fn format_elapsed(secs: u64) -> String {
    format!("{}s", secs)
}

/// Format a timestamp as relative time (e.g., "2m ago").
pub fn format_relative_time(ts: DateTime<Utc>) -> String {
    let now = Utc::now();
    let duration = now.signed_duration_since(ts);

    if duration.num_seconds() < 0 {
        "just now".to_string()
    } else if duration.num_seconds() < 60 {
        format!("{}s ago", duration.num_seconds())
    } else if duration.num_minutes() < 60 {
        format!("{}m ago", duration.num_minutes())
    } else if duration.num_hours() < 24 {
        format!("{}h ago", duration.num_hours())
    } else if duration.num_days() < 7 {
        format!("{}d ago", duration.num_days())
    } else {
        ts.format("%b %d").to_string()
    }
}
