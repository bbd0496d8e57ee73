use chrono::{DateTime, Utc};

/// Relative age like "3 hours ago". Future timestamps read as "just now".
pub fn time_ago(published: DateTime<Utc>, now: DateTime<Utc>) -> String {
  let secs = (now - published).num_seconds();
  if secs < 60 {
    return "just now".to_string();
  }
  let (value, unit) = match secs {
    s if s < 3_600 => (s / 60, "minute"),
    s if s < 86_400 => (s / 3_600, "hour"),
    s if s < 30 * 86_400 => (s / 86_400, "day"),
    s if s < 365 * 86_400 => (s / (30 * 86_400), "month"),
    s => (s / (365 * 86_400), "year"),
  };
  let plural = if value == 1 { "" } else { "s" };
  format!("{} {}{} ago", value, unit, plural)
}

pub fn published_label(published: Option<DateTime<Utc>>) -> String {
  match published {
    Some(ts) => time_ago(ts, Utc::now()),
    None => "unknown time".to_string(),
  }
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
pub fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

pub fn watch_url(video_id: &str) -> String {
  format!("https://www.youtube.com/watch?v={}", video_id)
}

/// 950 -> "950", 1_234 -> "1.2K", 3_400_000 -> "3.4M".
pub fn compact_count(n: u64) -> String {
  if n >= 1_000_000 {
    format!("{:.1}M", n as f64 / 1_000_000.0)
  } else if n >= 1_000 {
    format!("{:.1}K", n as f64 / 1_000.0)
  } else {
    n.to_string()
  }
}

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}
