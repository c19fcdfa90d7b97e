// Output formatting: terminal rendering of feeds, events and comments.

pub mod terminal;

use chrono::{DateTime, Utc};

/// Shorten `text` to `max_chars` characters, appending "..." when cut.
/// Counts chars, not bytes, so emoji and accented names never split.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Compact engagement count as shown on cards: zero renders as nothing,
/// thousands as `1.2k`, millions as `1.2M`.
pub fn format_count(count: u64) -> String {
    match count {
        0 => String::new(),
        c if c >= 1_000_000 => format!("{:.1}M", c as f64 / 1_000_000.0),
        c if c >= 1_000 => format!("{:.1}k", c as f64 / 1_000.0),
        c => c.to_string(),
    }
}

/// Human "time ago" relative to `now`.
pub fn relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - at).num_seconds();
    match secs {
        s if s < 60 => "just now".to_string(),
        s if s < 3_600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3_600),
        s if s < 86_400 * 30 => format!("{}d ago", s / 86_400),
        _ => at.format("%Y-%m-%d").to_string(),
    }
}
