use serde::{Deserialize, Serialize};

// --- Search mode / sort order ---

/// Which backend a search runs against. `None` means "browse the stored feed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
  #[default]
  None,
  Live,
  Stored,
}

impl SearchMode {
  pub fn label(self) -> &'static str {
    match self {
      SearchMode::None => "browse",
      SearchMode::Live => "live",
      SearchMode::Stored => "stored",
    }
  }

  pub fn from_config(s: &str) -> Self {
    match s.to_lowercase().as_str() {
      "stored" => SearchMode::Stored,
      "none" | "browse" => SearchMode::None,
      _ => SearchMode::Live,
    }
  }

  pub fn is_active(self) -> bool {
    self != SearchMode::None
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
  #[default]
  Latest,
  Oldest,
  Title,
  Channel,
}

impl SortOrder {
  pub const ALL: [SortOrder; 4] = [SortOrder::Latest, SortOrder::Oldest, SortOrder::Title, SortOrder::Channel];

  /// Value of the `sort` query parameter.
  pub fn as_param(self) -> &'static str {
    match self {
      SortOrder::Latest => "latest",
      SortOrder::Oldest => "oldest",
      SortOrder::Title => "title",
      SortOrder::Channel => "channel",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      SortOrder::Latest => "Latest first",
      SortOrder::Oldest => "Oldest first",
      SortOrder::Title => "Title A-Z",
      SortOrder::Channel => "Channel name",
    }
  }

  pub fn from_config(s: &str) -> Self {
    match s.to_lowercase().as_str() {
      "oldest" => SortOrder::Oldest,
      "title" => SortOrder::Title,
      "channel" => SortOrder::Channel,
      _ => SortOrder::Latest,
    }
  }

  pub fn next(self) -> Self {
    let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
    Self::ALL[(idx + 1) % Self::ALL.len()]
  }
}

// --- View parameters ---

/// Everything that determines which page of videos the user is looking at.
///
/// Treated as a value: the controller builds a new one for every change and swaps it in whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewParameters {
  /// 1-based page number.
  pub page: u32,
  pub page_size: u32,
  /// Empty means no active search.
  pub search_text: String,
  pub search_mode: SearchMode,
  pub sort_order: SortOrder,
}

impl ViewParameters {
  pub fn browse(page_size: u32, sort_order: SortOrder) -> Self {
    Self { page: 1, page_size: page_size.max(1), search_text: String::new(), search_mode: SearchMode::None, sort_order }
  }

  /// True when the search text takes part in the request.
  pub fn is_searching(&self) -> bool {
    self.search_mode.is_active() && !self.search_text.is_empty()
  }

  pub fn with_page(&self, page: u32) -> Self {
    Self { page: page.max(1), ..self.clone() }
  }

  pub fn with_sort(&self, sort_order: SortOrder) -> Self {
    Self { page: 1, sort_order, ..self.clone() }
  }

  pub fn with_search(&self, text: &str, mode: SearchMode) -> Self {
    Self { page: 1, search_text: text.to_string(), search_mode: mode, ..self.clone() }
  }

  pub fn cleared(&self) -> Self {
    Self { page: 1, search_text: String::new(), search_mode: SearchMode::None, ..self.clone() }
  }
}

// --- Cache key ---

/// Canonical identity of a request, used to index the result cache.
///
/// Field order is fixed and the derived `Ord` compares in that order.
/// The mode discriminator keeps live and stored results for the same text apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
  pub page: u32,
  pub page_size: u32,
  pub search_text: String,
  pub search_active: bool,
  pub search_mode: SearchMode,
  pub sort_order: SortOrder,
}

pub fn compose(params: &ViewParameters) -> CacheKey {
  CacheKey {
    page: params.page,
    page_size: params.page_size,
    search_text: params.search_text.clone(),
    search_active: params.search_mode.is_active(),
    search_mode: params.search_mode,
    sort_order: params.sort_order,
  }
}
