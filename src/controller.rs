//! Query/cache controller: turns view-parameter changes into cached or fetched result pages.
//!
//! Every request is identified by its [`CacheKey`]. Results are cached per key in a bounded
//! LRU. A cached entry younger than `stale_after` is served without a request; an older one is
//! served immediately while a revalidation runs. Whatever was on screen stays on screen until
//! the replacement arrives.
//!
//! Fetches run as spawned tasks that report back over a channel. A completion is applied only
//! if its key is still the current key, so a slow response for an abandoned page can never
//! overwrite a newer one.

use futures::FutureExt;
use lru::LruCache;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::api::{FetchFailure, FetchResult, VideoApi, VideoSummary};
use crate::constants::constants;
use crate::dispatch::{Route, dispatch};
use crate::pagination::{self, PaginationWindow};
use crate::query::{CacheKey, SearchMode, SortOrder, ViewParameters, compose};

// --- Types ---

#[derive(Debug, Clone)]
pub struct ControllerSettings {
  pub page_size: u32,
  pub page_window: u32,
  pub stale_after: Duration,
  pub cache_capacity: usize,
}

impl ControllerSettings {
  pub fn from_constants() -> Self {
    let c = constants();
    Self {
      page_size: c.page_size,
      page_window: c.page_window,
      stale_after: c.stale_after(),
      cache_capacity: c.cache_capacity,
    }
  }
}

/// One successful response, stored whole. Results are shared, never edited in place.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  pub results: Arc<Vec<VideoSummary>>,
  pub total_count: u64,
  pub fetched_at: Instant,
}

impl CacheEntry {
  fn is_fresh(&self, stale_after: Duration) -> bool {
    self.fetched_at.elapsed() < stale_after
  }
}

/// What the UI is currently showing and which request it came from.
#[derive(Debug, Clone)]
pub struct Snapshot {
  pub key: CacheKey,
  pub entry: CacheEntry,
}

/// Result of looking up the current key before deciding whether to fetch.
enum CacheLookup {
  Fresh(CacheEntry),
  Stale(CacheEntry),
  Miss,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPhase {
  /// Showing a fresh entry for the current key; nothing in flight.
  Idle,
  /// Waiting on a request for the current key. `revalidating` means a stale entry for this key is shown meanwhile.
  Fetching { revalidating: bool },
  /// The last request for the current key failed.
  Error(FetchFailure),
}

struct Completion {
  key: CacheKey,
  result: FetchResult,
}

pub struct QueryController {
  api: Arc<dyn VideoApi>,
  settings: ControllerSettings,
  params: ViewParameters,
  key: CacheKey,
  /// Mode used for the next submitted search; remembered while no search is active.
  preferred_mode: SearchMode,
  cache: LruCache<CacheKey, CacheEntry>,
  snapshot: Option<Snapshot>,
  phase: QueryPhase,
  in_flight: HashSet<CacheKey>,
  tx: mpsc::UnboundedSender<Completion>,
  rx: mpsc::UnboundedReceiver<Completion>,
}

impl QueryController {
  /// Create the controller and immediately request `initial`. Must be called inside a tokio runtime.
  pub fn new(
    api: Arc<dyn VideoApi>,
    settings: ControllerSettings,
    initial: ViewParameters,
    preferred_mode: SearchMode,
  ) -> Self {
    let capacity = NonZeroUsize::new(settings.cache_capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
    let (tx, rx) = mpsc::unbounded_channel();
    let key = compose(&initial);
    let preferred_mode = if preferred_mode.is_active() { preferred_mode } else { SearchMode::Live };
    let mut controller = Self {
      api,
      settings,
      params: initial.clone(),
      key,
      preferred_mode,
      cache: LruCache::new(capacity),
      snapshot: None,
      phase: QueryPhase::Fetching { revalidating: false },
      in_flight: HashSet::new(),
      tx,
      rx,
    };
    controller.apply_params(initial, false);
    controller
  }

  // --- Read side ---

  pub fn params(&self) -> &ViewParameters {
    &self.params
  }

  pub fn key(&self) -> &CacheKey {
    &self.key
  }

  pub fn preferred_mode(&self) -> SearchMode {
    self.preferred_mode
  }

  pub fn phase(&self) -> &QueryPhase {
    &self.phase
  }

  pub fn snapshot(&self) -> Option<&Snapshot> {
    self.snapshot.as_ref()
  }

  pub fn results(&self) -> &[VideoSummary] {
    self.snapshot.as_ref().map(|s| s.entry.results.as_slice()).unwrap_or(&[])
  }

  pub fn total_count(&self) -> Option<u64> {
    self.snapshot.as_ref().map(|s| s.entry.total_count)
  }

  pub fn is_fetching(&self) -> bool {
    matches!(self.phase, QueryPhase::Fetching { .. })
  }

  /// Fetching with nothing at all to show yet.
  pub fn is_loading(&self) -> bool {
    self.is_fetching() && self.snapshot.is_none()
  }

  /// The visible results belong to an earlier key and are being kept until the new page arrives.
  pub fn is_showing_previous(&self) -> bool {
    self.snapshot.as_ref().is_some_and(|s| s.key != self.key)
  }

  pub fn error(&self) -> Option<&FetchFailure> {
    match &self.phase {
      QueryPhase::Error(failure) => Some(failure),
      _ => None,
    }
  }

  pub fn total_pages(&self) -> u32 {
    self.total_count().map_or(0, |total| pagination::total_pages(total, self.params.page_size))
  }

  pub fn pagination(&self) -> Option<PaginationWindow> {
    let total = self.total_count()?;
    pagination::compute(self.params.page, total, self.params.page_size, self.settings.page_window)
  }

  #[cfg(test)]
  pub(crate) fn cached(&self, key: &CacheKey) -> Option<&CacheEntry> {
    self.cache.peek(key)
  }

  // --- User actions ---

  /// Run a search with the preferred mode. Blank text clears the search instead.
  pub fn submit_search(&mut self, text: &str) {
    let text = text.trim();
    if text.is_empty() {
      self.clear_search();
      return;
    }
    info!(query = %text, mode = self.preferred_mode.label(), "search submitted");
    let next = self.params.with_search(text, self.preferred_mode);
    self.apply_params(next, false);
  }

  pub fn clear_search(&mut self) {
    let next = self.params.cleared();
    self.apply_params(next, false);
  }

  /// Choose live or stored search. Re-runs the active search (from page 1) if there is one.
  pub fn set_search_mode(&mut self, mode: SearchMode) {
    if !mode.is_active() {
      self.clear_search();
      return;
    }
    self.preferred_mode = mode;
    if self.params.is_searching() {
      let next = self.params.with_search(&self.params.search_text, mode);
      self.apply_params(next, false);
    }
  }

  pub fn set_sort_order(&mut self, sort: SortOrder) {
    let next = self.params.with_sort(sort);
    self.apply_params(next, false);
  }

  /// Jump to `page`. Returns false (and does nothing) for the current page or one out of range.
  pub fn go_to_page(&mut self, page: u32) -> bool {
    if !pagination::is_navigable(page, self.params.page, self.total_pages()) {
      return false;
    }
    let next = self.params.with_page(page);
    self.apply_params(next, false);
    true
  }

  pub fn next_page(&mut self) -> bool {
    self.go_to_page(self.params.page.saturating_add(1))
  }

  pub fn previous_page(&mut self) -> bool {
    self.go_to_page(self.params.page.saturating_sub(1))
  }

  pub fn first_page(&mut self) -> bool {
    self.go_to_page(1)
  }

  pub fn last_page(&mut self) -> bool {
    self.go_to_page(self.total_pages())
  }

  /// Request the current key again even if the cached copy is fresh.
  pub fn refresh(&mut self) {
    info!(page = self.params.page, "refetching current page");
    let params = self.params.clone();
    self.apply_params(params, true);
  }

  /// Same as [`refresh`](Self::refresh); named for the error state.
  pub fn retry(&mut self) {
    self.refresh();
  }

  // --- Completions ---

  /// Apply every completion that has already arrived. Returns true if any did.
  pub fn poll(&mut self) -> bool {
    let mut applied = false;
    while let Ok(completion) = self.rx.try_recv() {
      self.apply_completion(completion);
      applied = true;
    }
    applied
  }

  /// Wait for the next completion and apply it. Returns false if nothing is in flight.
  pub async fn wait_for_completion(&mut self) -> bool {
    if self.in_flight.is_empty() {
      return false;
    }
    match self.rx.recv().await {
      Some(completion) => {
        self.apply_completion(completion);
        true
      }
      None => false,
    }
  }

  // --- Internals ---

  fn lookup(&mut self, key: &CacheKey) -> CacheLookup {
    match self.cache.get(key) {
      Some(entry) if entry.is_fresh(self.settings.stale_after) => CacheLookup::Fresh(entry.clone()),
      Some(entry) => CacheLookup::Stale(entry.clone()),
      None => CacheLookup::Miss,
    }
  }

  /// Swap in `params` and decide between serving from cache and fetching.
  fn apply_params(&mut self, params: ViewParameters, force: bool) {
    let key = compose(&params);
    self.params = params;
    self.key = key.clone();

    match self.lookup(&key) {
      CacheLookup::Fresh(entry) if !force => {
        debug!(page = key.page, "cache hit");
        self.snapshot = Some(Snapshot { key, entry });
        self.phase = QueryPhase::Idle;
      }
      CacheLookup::Fresh(entry) | CacheLookup::Stale(entry) => {
        debug!(page = key.page, "revalidating cached page");
        self.snapshot = Some(Snapshot { key, entry });
        self.phase = QueryPhase::Fetching { revalidating: true };
        self.start_fetch();
      }
      CacheLookup::Miss => {
        self.phase = QueryPhase::Fetching { revalidating: false };
        self.start_fetch();
      }
    }
  }

  fn start_fetch(&mut self) {
    if !self.in_flight.insert(self.key.clone()) {
      debug!(page = self.key.page, "request already in flight");
      return;
    }
    let route = Route::for_params(&self.params);
    info!(route = route.label(), page = self.params.page, sort = self.params.sort_order.as_param(), "fetching");

    let request = dispatch(self.api.as_ref(), &self.params);
    let key = self.key.clone();
    let tx = self.tx.clone();
    tokio::spawn(async move {
      // A panicking request still has to report back, or its key stays in flight forever.
      let result = AssertUnwindSafe(request).catch_unwind().await.unwrap_or_else(|_| {
        error!("fetch task panicked");
        Err(FetchFailure::transport("Request failed unexpectedly"))
      });
      let _ = tx.send(Completion { key, result });
    });
  }

  fn apply_completion(&mut self, completion: Completion) {
    let Completion { key, result } = completion;
    self.in_flight.remove(&key);
    if key != self.key {
      debug!(page = key.page, "discarding superseded response");
      return;
    }
    match result {
      Ok(page) => {
        debug!(results = page.results.len(), total = page.count, "page loaded");
        let entry = CacheEntry { results: Arc::new(page.results), total_count: page.count, fetched_at: Instant::now() };
        self.cache.put(key.clone(), entry.clone());
        self.snapshot = Some(Snapshot { key, entry });
        self.phase = QueryPhase::Idle;
      }
      Err(failure) => {
        warn!(err = %failure, kind = ?failure.kind, "fetch failed");
        self.phase = QueryPhase::Error(failure);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::{FailureKind, VideoPage};
  use futures::future::{BoxFuture, FutureExt};
  use std::collections::HashMap;
  use std::sync::Mutex;
  use tokio::sync::oneshot;

  /// In-memory API. Answers immediately unless `gated`, in which case each call waits for `resolve`.
  struct FakeApi {
    total: u64,
    gated: bool,
    calls: Mutex<Vec<String>>,
    fail_with: Mutex<Option<FetchFailure>>,
    pending: Mutex<HashMap<String, oneshot::Sender<FetchResult>>>,
  }

  impl FakeApi {
    fn new(total: u64, gated: bool) -> Arc<Self> {
      Arc::new(Self {
        total,
        gated,
        calls: Mutex::new(Vec::new()),
        fail_with: Mutex::new(None),
        pending: Mutex::new(HashMap::new()),
      })
    }

    fn calls(&self) -> Vec<String> {
      self.calls.lock().unwrap().clone()
    }

    fn fail_next(&self, failure: Option<FetchFailure>) {
      *self.fail_with.lock().unwrap() = failure;
    }

    fn resolve(&self, call: &str) {
      self.resolve_as(call, call);
    }

    /// Answer a pending call with a page whose single title is `title`.
    fn resolve_as(&self, call: &str, title: &str) {
      let tx = self.pending.lock().unwrap().remove(call).unwrap_or_else(|| panic!("no pending call {}", call));
      let _ = tx.send(Ok(page_for(title, self.total)));
    }

    fn answer(&self, call: String) -> BoxFuture<'static, FetchResult> {
      self.calls.lock().unwrap().push(call.clone());
      if self.gated {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(call, tx);
        return async move { rx.await.unwrap_or_else(|_| Err(FetchFailure::transport("dropped"))) }.boxed();
      }
      let result = match self.fail_with.lock().unwrap().clone() {
        Some(failure) => Err(failure),
        None => Ok(page_for(&call, self.total)),
      };
      async move { result }.boxed()
    }
  }

  fn page_for(call: &str, total: u64) -> VideoPage {
    VideoPage {
      results: vec![VideoSummary { title: call.to_string(), ..Default::default() }],
      count: total,
      ..Default::default()
    }
  }

  impl VideoApi for FakeApi {
    fn list_videos(&self, page: u32, _page_size: u32, sort: SortOrder) -> BoxFuture<'static, FetchResult> {
      self.answer(format!("list {} {}", page, sort.as_param()))
    }

    fn search_stored(&self, query: &str, page: u32, _page_size: u32, _sort: SortOrder) -> BoxFuture<'static, FetchResult> {
      self.answer(format!("stored {} {}", query, page))
    }

    fn search_live(&self, query: &str, page: u32, _page_size: u32, _sort: SortOrder) -> BoxFuture<'static, FetchResult> {
      self.answer(format!("live {} {}", query, page))
    }

    fn health(&self) -> BoxFuture<'static, Result<serde_json::Value, FetchFailure>> {
      async { Ok(serde_json::Value::Null) }.boxed()
    }
  }

  fn settings(stale_after: Duration, cache_capacity: usize) -> ControllerSettings {
    ControllerSettings { page_size: 12, page_window: 5, stale_after, cache_capacity }
  }

  fn controller(api: &Arc<FakeApi>, stale_after: Duration) -> QueryController {
    let api: Arc<dyn VideoApi> = api.clone();
    QueryController::new(api, settings(stale_after, 64), ViewParameters::browse(12, SortOrder::Latest), SearchMode::Live)
  }

  const FRESH: Duration = Duration::from_secs(3600);

  fn titles(ctrl: &QueryController) -> Vec<String> {
    ctrl.results().iter().map(|v| v.title.clone()).collect()
  }

  #[tokio::test]
  async fn initial_load_fetches_listing() {
    let api = FakeApi::new(100, false);
    let mut ctrl = controller(&api, FRESH);
    assert!(ctrl.is_loading());
    assert!(ctrl.wait_for_completion().await);
    assert_eq!(ctrl.phase(), &QueryPhase::Idle);
    assert_eq!(titles(&ctrl), ["list 1 latest"]);
    assert_eq!(ctrl.total_pages(), 9);
    assert!(!ctrl.wait_for_completion().await);
  }

  #[tokio::test]
  async fn fresh_cache_entry_is_served_without_fetch() {
    let api = FakeApi::new(100, false);
    let mut ctrl = controller(&api, FRESH);
    ctrl.wait_for_completion().await;
    assert!(ctrl.go_to_page(2));
    ctrl.wait_for_completion().await;
    assert!(ctrl.go_to_page(1));

    assert!(!ctrl.is_fetching());
    assert_eq!(titles(&ctrl), ["list 1 latest"]);
    assert_eq!(api.calls(), ["list 1 latest", "list 2 latest"]);
  }

  #[tokio::test]
  async fn previous_results_stay_visible_while_fetching() {
    let api = FakeApi::new(100, false);
    let mut ctrl = controller(&api, FRESH);
    ctrl.wait_for_completion().await;
    ctrl.next_page();

    assert!(ctrl.is_fetching());
    assert!(!ctrl.is_loading());
    assert!(ctrl.is_showing_previous());
    assert_eq!(titles(&ctrl), ["list 1 latest"]);

    ctrl.wait_for_completion().await;
    assert!(!ctrl.is_showing_previous());
    assert_eq!(titles(&ctrl), ["list 2 latest"]);
  }

  #[tokio::test]
  async fn stale_entry_is_served_and_revalidated() {
    let api = FakeApi::new(100, false);
    let mut ctrl = controller(&api, Duration::ZERO);
    ctrl.wait_for_completion().await;
    ctrl.go_to_page(2);
    ctrl.wait_for_completion().await;
    ctrl.go_to_page(1);

    assert_eq!(ctrl.phase(), &QueryPhase::Fetching { revalidating: true });
    assert!(!ctrl.is_showing_previous());
    assert_eq!(titles(&ctrl), ["list 1 latest"]);
    ctrl.wait_for_completion().await;
    assert_eq!(api.calls(), ["list 1 latest", "list 2 latest", "list 1 latest"]);
  }

  #[tokio::test]
  async fn switching_live_to_stored_misses_the_cache() {
    let api = FakeApi::new(30, false);
    let mut ctrl = controller(&api, FRESH);
    ctrl.wait_for_completion().await;
    ctrl.submit_search("  cats ");
    ctrl.wait_for_completion().await;
    assert_eq!(titles(&ctrl), ["live cats 1"]);

    ctrl.set_search_mode(SearchMode::Stored);
    assert!(ctrl.is_fetching());
    ctrl.wait_for_completion().await;
    assert_eq!(titles(&ctrl), ["stored cats 1"]);
    assert_eq!(api.calls(), ["list 1 latest", "live cats 1", "stored cats 1"]);

    // Back to live: that entry is still fresh.
    ctrl.set_search_mode(SearchMode::Live);
    assert!(!ctrl.is_fetching());
    assert_eq!(titles(&ctrl), ["live cats 1"]);
  }

  #[tokio::test]
  async fn mode_preference_applies_to_next_search() {
    let api = FakeApi::new(30, false);
    let mut ctrl = controller(&api, FRESH);
    ctrl.wait_for_completion().await;

    ctrl.set_search_mode(SearchMode::Stored);
    assert!(!ctrl.is_fetching());
    assert_eq!(ctrl.params().search_mode, SearchMode::None);

    ctrl.submit_search("dogs");
    ctrl.wait_for_completion().await;
    assert_eq!(titles(&ctrl), ["stored dogs 1"]);
  }

  #[tokio::test]
  async fn clearing_search_resets_mode_and_page() {
    let api = FakeApi::new(100, false);
    let mut ctrl = controller(&api, FRESH);
    ctrl.wait_for_completion().await;
    ctrl.submit_search("cats");
    ctrl.wait_for_completion().await;
    ctrl.go_to_page(3);
    ctrl.wait_for_completion().await;

    ctrl.submit_search("   ");
    let params = ctrl.params();
    assert_eq!(params.page, 1);
    assert_eq!(params.search_mode, SearchMode::None);
    assert!(params.search_text.is_empty());
    // Listing page 1 is still cached.
    assert!(!ctrl.is_fetching());
    assert_eq!(titles(&ctrl), ["list 1 latest"]);
  }

  #[tokio::test]
  async fn sort_change_returns_to_first_page() {
    let api = FakeApi::new(100, false);
    let mut ctrl = controller(&api, FRESH);
    ctrl.wait_for_completion().await;
    ctrl.go_to_page(4);
    ctrl.wait_for_completion().await;
    ctrl.set_sort_order(SortOrder::Title);
    assert_eq!(ctrl.params().page, 1);
    ctrl.wait_for_completion().await;
    assert_eq!(titles(&ctrl), ["list 1 title"]);
  }

  #[tokio::test]
  async fn superseded_response_is_discarded() {
    let api = FakeApi::new(100, true);
    let mut ctrl = controller(&api, FRESH);
    api.resolve("list 1 latest");
    ctrl.wait_for_completion().await;

    ctrl.submit_search("a");
    let key_a = ctrl.key().clone();
    ctrl.submit_search("b");
    let key_b = ctrl.key().clone();

    api.resolve("live b 1");
    ctrl.wait_for_completion().await;
    assert_eq!(titles(&ctrl), ["live b 1"]);

    api.resolve("live a 1");
    ctrl.wait_for_completion().await;
    assert_eq!(titles(&ctrl), ["live b 1"]);
    assert_eq!(ctrl.key(), &key_b);
    assert!(ctrl.cached(&key_a).is_none());
    assert_eq!(ctrl.cached(&key_b).map(|e| e.results[0].title.as_str()), Some("live b 1"));
    assert_eq!(ctrl.phase(), &QueryPhase::Idle);
  }

  #[tokio::test]
  async fn in_flight_key_is_not_requested_twice() {
    let api = FakeApi::new(100, true);
    let mut ctrl = controller(&api, FRESH);
    ctrl.set_sort_order(SortOrder::Title);
    ctrl.set_sort_order(SortOrder::Latest);
    assert_eq!(api.calls(), ["list 1 latest", "list 1 title"]);

    api.resolve("list 1 title");
    api.resolve("list 1 latest");
    ctrl.wait_for_completion().await;
    ctrl.wait_for_completion().await;
    assert_eq!(titles(&ctrl), ["list 1 latest"]);
    assert_eq!(ctrl.phase(), &QueryPhase::Idle);
  }

  #[tokio::test]
  async fn failure_keeps_last_snapshot_and_retry_recovers() {
    let api = FakeApi::new(100, false);
    let mut ctrl = controller(&api, FRESH);
    ctrl.wait_for_completion().await;

    api.fail_next(Some(FetchFailure::upstream("Failed to fetch videos: database unavailable")));
    ctrl.go_to_page(2);
    ctrl.wait_for_completion().await;

    let err = ctrl.error().expect("error state");
    assert_eq!(err.kind, FailureKind::Upstream);
    assert_eq!(err.message, "Failed to fetch videos: database unavailable");
    assert!(!ctrl.is_fetching());
    assert_eq!(titles(&ctrl), ["list 1 latest"]);

    api.fail_next(None);
    ctrl.retry();
    assert!(ctrl.is_fetching());
    ctrl.wait_for_completion().await;
    assert!(ctrl.error().is_none());
    assert_eq!(titles(&ctrl), ["list 2 latest"]);
  }

  #[tokio::test]
  async fn stale_revalidation_failure_keeps_stale_entry() {
    let api = FakeApi::new(100, false);
    let mut ctrl = controller(&api, Duration::ZERO);
    ctrl.wait_for_completion().await;
    ctrl.go_to_page(2);
    ctrl.wait_for_completion().await;

    api.fail_next(Some(FetchFailure::transport("Failed to fetch videos: timed out")));
    ctrl.go_to_page(1);
    assert_eq!(ctrl.phase(), &QueryPhase::Fetching { revalidating: true });
    let key = ctrl.key().clone();
    ctrl.wait_for_completion().await;

    assert_eq!(ctrl.error().map(|e| e.kind), Some(FailureKind::Transport));
    assert!(!ctrl.is_showing_previous());
    assert_eq!(ctrl.snapshot().map(|s| &s.key), Some(&key));
    assert_eq!(titles(&ctrl), ["list 1 latest"]);
    assert_eq!(ctrl.cached(&key).map(|e| e.results[0].title.as_str()), Some("list 1 latest"));
  }

  #[tokio::test]
  async fn superseded_revalidation_is_discarded() {
    let api = FakeApi::new(100, true);
    let mut ctrl = controller(&api, Duration::ZERO);
    api.resolve("list 1 latest");
    ctrl.wait_for_completion().await;
    let page_1 = ctrl.key().clone();
    ctrl.go_to_page(2);
    api.resolve("list 2 latest");
    ctrl.wait_for_completion().await;
    let page_2 = ctrl.key().clone();

    // Both pages are stale now: each visit serves the cached copy and revalidates.
    ctrl.go_to_page(1);
    assert_eq!(ctrl.phase(), &QueryPhase::Fetching { revalidating: true });
    ctrl.go_to_page(2);
    assert_eq!(ctrl.phase(), &QueryPhase::Fetching { revalidating: true });
    assert_eq!(titles(&ctrl), ["list 2 latest"]);

    api.resolve_as("list 1 latest", "late page 1");
    ctrl.wait_for_completion().await;
    assert_eq!(ctrl.key(), &page_2);
    assert_eq!(titles(&ctrl), ["list 2 latest"]);
    assert_eq!(ctrl.phase(), &QueryPhase::Fetching { revalidating: true });
    assert_eq!(ctrl.cached(&page_1).map(|e| e.results[0].title.as_str()), Some("list 1 latest"));

    api.resolve_as("list 2 latest", "new page 2");
    ctrl.wait_for_completion().await;
    assert_eq!(ctrl.phase(), &QueryPhase::Idle);
    assert_eq!(titles(&ctrl), ["new page 2"]);
  }

  struct PanickingApi;

  impl VideoApi for PanickingApi {
    fn list_videos(&self, _page: u32, _page_size: u32, _sort: SortOrder) -> BoxFuture<'static, FetchResult> {
      futures::future::lazy(|_| -> FetchResult { panic!("backend exploded") }).boxed()
    }

    fn search_stored(&self, _query: &str, page: u32, page_size: u32, sort: SortOrder) -> BoxFuture<'static, FetchResult> {
      self.list_videos(page, page_size, sort)
    }

    fn search_live(&self, _query: &str, page: u32, page_size: u32, sort: SortOrder) -> BoxFuture<'static, FetchResult> {
      self.list_videos(page, page_size, sort)
    }

    fn health(&self) -> BoxFuture<'static, Result<serde_json::Value, FetchFailure>> {
      async { Ok(serde_json::Value::Null) }.boxed()
    }
  }

  #[tokio::test]
  async fn panicking_request_becomes_transport_failure() {
    let api: Arc<dyn VideoApi> = Arc::new(PanickingApi);
    let mut ctrl =
      QueryController::new(api, settings(FRESH, 8), ViewParameters::browse(12, SortOrder::Latest), SearchMode::Live);
    assert!(ctrl.wait_for_completion().await);
    assert_eq!(ctrl.error().map(|e| e.kind), Some(FailureKind::Transport));
    assert!(!ctrl.is_fetching());
    // Nothing left in flight, so waiting returns instead of hanging.
    assert!(!ctrl.wait_for_completion().await);
  }

  #[tokio::test]
  async fn failure_without_snapshot_shows_error_only() {
    let api = FakeApi::new(100, false);
    api.fail_next(Some(FetchFailure::transport("Failed to fetch videos: connection refused")));
    let mut ctrl = controller(&api, FRESH);
    ctrl.wait_for_completion().await;
    assert!(ctrl.error().is_some());
    assert!(ctrl.results().is_empty());
    assert!(ctrl.snapshot().is_none());
  }

  #[tokio::test]
  async fn refresh_refetches_fresh_entry() {
    let api = FakeApi::new(100, false);
    let mut ctrl = controller(&api, FRESH);
    ctrl.wait_for_completion().await;
    ctrl.refresh();
    assert_eq!(ctrl.phase(), &QueryPhase::Fetching { revalidating: true });
    ctrl.wait_for_completion().await;
    assert_eq!(api.calls().len(), 2);
  }

  #[tokio::test]
  async fn page_navigation_respects_bounds() {
    let api = FakeApi::new(100, false);
    let mut ctrl = controller(&api, FRESH);
    assert!(!ctrl.next_page(), "no total known yet");
    ctrl.wait_for_completion().await;

    assert!(!ctrl.go_to_page(1));
    assert!(!ctrl.go_to_page(10));
    assert!(!ctrl.previous_page());
    assert!(ctrl.go_to_page(9));
    ctrl.wait_for_completion().await;
    assert!(!ctrl.next_page());

    let window = ctrl.pagination().unwrap();
    assert_eq!(window.pages, vec![5, 6, 7, 8, 9]);
    assert!(window.show_leading_ellipsis);
  }

  #[tokio::test]
  async fn first_and_last_page_jumps() {
    let api = FakeApi::new(100, false);
    let mut ctrl = controller(&api, FRESH);
    ctrl.wait_for_completion().await;
    assert!(!ctrl.first_page());
    assert!(ctrl.last_page());
    assert_eq!(ctrl.params().page, 9);
    ctrl.wait_for_completion().await;
    assert!(!ctrl.last_page());
    assert!(ctrl.first_page());
    assert_eq!(ctrl.params().page, 1);
    assert_eq!(titles(&ctrl), ["list 1 latest"]);
  }

  #[tokio::test]
  async fn cache_is_bounded() {
    let api = FakeApi::new(100, false);
    let dyn_api: Arc<dyn VideoApi> = api.clone();
    let mut ctrl =
      QueryController::new(dyn_api, settings(FRESH, 2), ViewParameters::browse(12, SortOrder::Latest), SearchMode::Live);
    ctrl.wait_for_completion().await;
    let first = ctrl.key().clone();
    ctrl.go_to_page(2);
    ctrl.wait_for_completion().await;
    ctrl.go_to_page(3);
    ctrl.wait_for_completion().await;

    assert!(ctrl.cached(&first).is_none());
    ctrl.go_to_page(1);
    assert!(ctrl.is_fetching());
  }

  #[tokio::test]
  async fn poll_applies_arrived_completions() {
    let api = FakeApi::new(100, false);
    let mut ctrl = controller(&api, FRESH);
    assert!(!ctrl.poll());
    // Let the spawned request run.
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;
    while !ctrl.poll() {
      tokio::task::yield_now().await;
    }
    assert_eq!(titles(&ctrl), ["list 1 latest"]);
  }
}
