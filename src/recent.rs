use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::constants::constants;

const FILE_NAME: &str = "recent_searches.json";

/// On-disk shape: a single namespaced key holding the ordered list.
#[derive(Serialize, Deserialize, Default)]
struct Persisted {
  #[serde(rename = "recentSearches")]
  recent_searches: Vec<String>,
}

/// Most-recent-first list of submitted search terms, persisted between sessions.
#[derive(Debug, Clone)]
pub struct RecentSearches {
  terms: Vec<String>,
  limit: usize,
  path: Option<PathBuf>,
}

impl RecentSearches {
  /// Load from the default data directory. Never fails; missing or corrupt data means empty history.
  pub fn load() -> Self {
    Self::load_from(default_path(), constants().recent_search_limit)
  }

  pub fn load_from(path: Option<PathBuf>, limit: usize) -> Self {
    let terms = path.as_deref().map(|p| read_terms(p, limit)).unwrap_or_default();
    Self { terms, limit, path }
  }

  pub fn terms(&self) -> &[String] {
    &self.terms
  }

  pub fn is_empty(&self) -> bool {
    self.terms.is_empty()
  }

  /// Move `term` to the front, drop older duplicates, cap the length, then persist.
  pub fn record(&mut self, term: &str) {
    if term.is_empty() {
      return;
    }
    self.terms = push_front_unique(&self.terms, term, self.limit);
    self.save();
  }

  fn save(&self) {
    let Some(path) = self.path.as_deref() else { return };
    if let Some(dir) = path.parent()
      && let Err(e) = std::fs::create_dir_all(dir)
    {
      warn!(err = %e, path = %dir.display(), "recent: failed to create data dir");
      return;
    }
    let payload = Persisted { recent_searches: self.terms.clone() };
    match serde_json::to_string(&payload) {
      Ok(content) => {
        if let Err(e) = std::fs::write(path, content) {
          warn!(err = %e, path = %path.display(), "recent: failed to persist searches");
        }
      }
      Err(e) => warn!(err = %e, "recent: failed to encode searches"),
    }
  }
}

pub fn default_path() -> Option<PathBuf> {
  ProjectDirs::from("", "", "vidfeed").map(|dirs| dirs.data_dir().join(FILE_NAME))
}

fn read_terms(path: &Path, limit: usize) -> Vec<String> {
  let Ok(content) = std::fs::read_to_string(path) else { return Vec::new() };
  match serde_json::from_str::<Persisted>(&content) {
    Ok(p) => p.recent_searches.into_iter().take(limit).collect(),
    Err(e) => {
      debug!(err = %e, path = %path.display(), "recent: ignoring malformed history");
      Vec::new()
    }
  }
}

/// Returns a new list with `term` first and no other copy of it, at most `limit` long.
pub fn push_front_unique(terms: &[String], term: &str, limit: usize) -> Vec<String> {
  std::iter::once(term.to_string()).chain(terms.iter().filter(|t| t.as_str() != term).cloned()).take(limit).collect()
}
