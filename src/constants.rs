//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` so it's always available,
//! with no runtime file I/O. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;

/// Default tuning for the feed browser. User prefs and CLI flags override some of these.
#[derive(Debug, Deserialize)]
pub struct Constants {
  pub api_base_url: String,
  pub request_timeout_secs: u64,

  // Browsing
  pub page_size: u32,
  pub page_window: u32,
  pub stale_after_secs: u64,
  pub cache_capacity: usize,

  // Search
  pub recent_search_limit: usize,
  pub popular_searches: Vec<String>,
}

impl Constants {
  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_secs)
  }

  pub fn stale_after(&self) -> Duration {
    Duration::from_secs(self.stale_after_secs)
  }
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed the constants test fails.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}
