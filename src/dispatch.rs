use futures::future::BoxFuture;

use crate::api::{FetchResult, VideoApi};
use crate::query::{SearchMode, SortOrder, ViewParameters};

/// Which API operation a set of view parameters maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
  List { page: u32, page_size: u32, sort: SortOrder },
  SearchLive { query: String, page: u32, page_size: u32, sort: SortOrder },
  SearchStored { query: String, page: u32, page_size: u32, sort: SortOrder },
}

impl Route {
  pub fn for_params(params: &ViewParameters) -> Self {
    let (page, page_size, sort) = (params.page, params.page_size, params.sort_order);
    // Blank text always falls back to the plain listing, whatever the mode says.
    if params.search_text.is_empty() {
      return Route::List { page, page_size, sort };
    }
    match params.search_mode {
      SearchMode::Live => Route::SearchLive { query: params.search_text.clone(), page, page_size, sort },
      SearchMode::Stored => Route::SearchStored { query: params.search_text.clone(), page, page_size, sort },
      SearchMode::None => Route::List { page, page_size, sort },
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      Route::List { .. } => "list",
      Route::SearchLive { .. } => "search-live",
      Route::SearchStored { .. } => "search-stored",
    }
  }
}

/// Start the request for `params`. No retries here; the caller decides what a failure means.
pub fn dispatch(api: &dyn VideoApi, params: &ViewParameters) -> BoxFuture<'static, FetchResult> {
  match Route::for_params(params) {
    Route::List { page, page_size, sort } => api.list_videos(page, page_size, sort),
    Route::SearchLive { query, page, page_size, sort } => api.search_live(&query, page, page_size, sort),
    Route::SearchStored { query, page, page_size, sort } => api.search_stored(&query, page, page_size, sort),
  }
}
