use ratatui::widgets::ListState;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::api::{FetchFailure, VideoApi, VideoSummary};
use crate::config::Config;
use crate::constants::constants;
use crate::controller::{ControllerSettings, QueryController};
use crate::format::watch_url;
use crate::query::{CacheKey, SearchMode, SortOrder, ViewParameters};
use crate::recent::RecentSearches;
use crate::theme::{self, THEMES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
  Input,
  Results,
}

/// Result of the background `/health` probe shown in the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiHealth {
  Checking,
  Connected,
  Unreachable(String),
}

type HealthResult = Result<serde_json::Value, FetchFailure>;

pub struct App {
  pub input: String,
  pub cursor_position: usize,
  pub input_scroll: usize,
  pub mode: AppMode,
  pub theme_index: usize,
  pub query: QueryController,
  pub recent: RecentSearches,
  pub popular: Vec<String>,
  pub list_state: ListState,
  /// Page highlighted in the pagination strip by `[`/`]`, jumped to with Enter.
  pub page_cursor: Option<u32>,
  /// UI-level errors (browser launch etc.). Fetch errors live in the controller.
  pub last_error: Option<String>,
  pub info_message: Option<String>,
  pub health: ApiHealth,
  pub should_quit: bool,
  /// App start instant, used to drive the fetching spinner.
  pub started_at: Instant,
  /// Key of the snapshot the list selection refers to; selection resets when it changes.
  shown_key: Option<CacheKey>,
  prefs: Config,
  prefs_path: Option<PathBuf>,
  health_rx: Option<oneshot::Receiver<HealthResult>>,
  api: Arc<dyn VideoApi>,
  error_time: Option<Instant>,
}

impl App {
  pub fn new(
    api: Arc<dyn VideoApi>,
    config: Config,
    prefs_path: Option<PathBuf>,
    settings: ControllerSettings,
    recent: RecentSearches,
  ) -> Self {
    let theme_index = config.theme_name.as_deref().map(theme::index_by_name).unwrap_or(0);
    let sort = config.sort_order.as_deref().map(SortOrder::from_config).unwrap_or_default();
    let mode = config.search_mode.as_deref().map(SearchMode::from_config).unwrap_or(SearchMode::Live);

    let initial = ViewParameters::browse(settings.page_size, sort);
    let query = QueryController::new(Arc::clone(&api), settings, initial, mode);

    Self {
      input: String::new(),
      cursor_position: 0,
      input_scroll: 0,
      mode: AppMode::Input,
      theme_index,
      query,
      recent,
      popular: constants().popular_searches.clone(),
      list_state: ListState::default(),
      page_cursor: None,
      last_error: None,
      info_message: None,
      health: ApiHealth::Checking,
      should_quit: false,
      started_at: Instant::now(),
      shown_key: None,
      prefs: config,
      prefs_path,
      health_rx: None,
      api,
      error_time: None,
    }
  }

  pub fn theme(&self) -> &'static theme::Theme {
    &THEMES[self.theme_index % THEMES.len()]
  }

  pub fn set_error(&mut self, msg: String) {
    self.last_error = Some(msg);
    self.error_time = Some(Instant::now());
  }

  pub fn clear_error(&mut self) {
    self.last_error = None;
    self.error_time = None;
  }

  /// Clear stale UI error messages after 5 seconds.
  pub fn expire_error(&mut self) {
    if let Some(t) = self.error_time
      && t.elapsed() >= Duration::from_secs(5)
    {
      self.clear_error();
    }
  }

  /// Write theme, sort and search mode back to `prefs.toml`, keeping any other settings.
  fn persist_prefs(&mut self) {
    self.prefs.theme_name = Some(self.theme().name.to_string());
    self.prefs.sort_order = Some(self.query.params().sort_order.as_param().to_string());
    self.prefs.search_mode = Some(self.query.preferred_mode().label().to_string());
    if let Some(path) = self.prefs_path.as_deref() {
      self.prefs.save_to(path);
    }
  }

  pub fn prefs(&self) -> &Config {
    &self.prefs
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
    self.persist_prefs();
  }

  // --- Background work ---

  pub fn trigger_health_check(&mut self) {
    self.health = ApiHealth::Checking;
    let request = self.api.health();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(request.await);
    });
    self.health_rx = Some(rx);
  }

  /// Apply finished fetches and health probes. Called once per UI tick.
  pub fn check_pending(&mut self) {
    self.query.poll();
    self.sync_selection();

    if let Some(mut rx) = self.health_rx.take() {
      match rx.try_recv() {
        Ok(Ok(_)) => {
          info!("api: health check passed");
          self.health = ApiHealth::Connected;
        }
        Ok(Err(e)) => {
          warn!(err = %e, "api: health check failed");
          self.health = ApiHealth::Unreachable(e.message);
        }
        Err(oneshot::error::TryRecvError::Empty) => {
          self.health_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          self.health = ApiHealth::Unreachable("health task failed".to_string());
        }
      }
    }
  }

  /// Keep the list selection valid for whatever snapshot is on screen.
  fn sync_selection(&mut self) {
    let current = self.query.snapshot().map(|s| s.key.clone());
    if current == self.shown_key {
      return;
    }
    self.shown_key = current;
    self.page_cursor = None;
    let selection = if self.query.results().is_empty() { None } else { Some(0) };
    self.list_state.select(selection);
  }

  // --- Query actions ---

  pub fn trigger_search(&mut self) {
    let query = self.input.trim().to_string();
    self.clear_error();
    if query.is_empty() {
      self.clear_search();
      return;
    }
    self.recent.record(&query);
    self.query.submit_search(&query);
    self.info_message = None;
    self.mode = AppMode::Results;
    self.sync_selection();
  }

  /// Run a suggested or recent term as if it had been typed.
  pub fn quick_search(&mut self, term: &str) {
    self.input = term.to_string();
    self.cursor_position = self.input.chars().count();
    self.input_scroll = 0;
    self.trigger_search();
  }

  /// Quick-select the `n`th (0-based) recent search, falling back to popular suggestions.
  pub fn quick_search_slot(&mut self, n: usize) {
    let term = self.quick_terms().get(n).cloned();
    if let Some(term) = term {
      self.quick_search(&term);
    }
  }

  /// Recent searches if there are any, otherwise the popular suggestions.
  pub fn quick_terms(&self) -> Vec<String> {
    if self.recent.is_empty() { self.popular.clone() } else { self.recent.terms().to_vec() }
  }

  pub fn clear_search(&mut self) {
    self.input.clear();
    self.cursor_position = 0;
    self.input_scroll = 0;
    self.query.clear_search();
    self.sync_selection();
  }

  pub fn toggle_search_mode(&mut self) {
    let next = match self.query.preferred_mode() {
      SearchMode::Live => SearchMode::Stored,
      SearchMode::Stored | SearchMode::None => SearchMode::Live,
    };
    self.query.set_search_mode(next);
    self.sync_selection();
    self.persist_prefs();
  }

  pub fn cycle_sort(&mut self) {
    let next = self.query.params().sort_order.next();
    self.query.set_sort_order(next);
    self.sync_selection();
    self.persist_prefs();
  }

  pub fn next_page(&mut self) {
    if self.query.next_page() {
      self.sync_selection();
    }
  }

  pub fn previous_page(&mut self) {
    if self.query.previous_page() {
      self.sync_selection();
    }
  }

  pub fn first_page(&mut self) {
    if self.query.first_page() {
      self.sync_selection();
    }
  }

  pub fn last_page(&mut self) {
    if self.query.last_page() {
      self.sync_selection();
    }
  }

  /// Step the page cursor through the strip's page numbers, starting from the current page.
  pub fn move_page_cursor(&mut self, forward: bool) {
    let Some(window) = self.query.pagination() else { return };
    let targets = window.targets();
    let from = self.page_cursor.unwrap_or(self.query.params().page);
    let idx = targets.iter().position(|&p| p == from).unwrap_or(0);
    let next = if forward { (idx + 1).min(targets.len() - 1) } else { idx.saturating_sub(1) };
    self.page_cursor = targets.get(next).copied();
  }

  /// Go to the page under the cursor. Returns false when there is no cursor.
  pub fn jump_to_page_cursor(&mut self) -> bool {
    let Some(page) = self.page_cursor.take() else { return false };
    if self.query.go_to_page(page) {
      self.sync_selection();
    }
    true
  }

  /// Retry after a failure, otherwise force a refresh of the current page.
  pub fn retry_or_refresh(&mut self) {
    if self.query.error().is_some() {
      self.query.retry();
    } else {
      self.query.refresh();
    }
  }

  pub fn select_next(&mut self) {
    let count = self.query.results().len();
    if count > 0 {
      let i = self.list_state.selected().map_or(0, |i| (i + 1) % count);
      self.list_state.select(Some(i));
    }
  }

  pub fn select_previous(&mut self) {
    let count = self.query.results().len();
    if count > 0 {
      let i = self.list_state.selected().map_or(0, |i| if i == 0 { count - 1 } else { i - 1 });
      self.list_state.select(Some(i));
    }
  }

  pub fn selected_video(&self) -> Option<&VideoSummary> {
    self.list_state.selected().and_then(|i| self.query.results().get(i))
  }

  pub fn open_selected(&mut self) {
    let Some(video) = self.selected_video() else { return };
    if video.video_id.is_empty() {
      self.set_error("Video has no id to open.".to_string());
      return;
    }
    let url = watch_url(&video.video_id);
    #[cfg(target_os = "macos")]
    let cmd = "open";
    #[cfg(not(target_os = "macos"))]
    let cmd = "xdg-open";
    match std::process::Command::new(cmd)
      .arg(&url)
      .stdin(std::process::Stdio::null())
      .stdout(std::process::Stdio::null())
      .stderr(std::process::Stdio::null())
      .spawn()
    {
      Ok(mut child) => {
        // Reap the child in a background thread to avoid zombie processes.
        std::thread::spawn(move || {
          let _ = child.wait();
        });
        self.info_message = Some(format!("Opened {}", url));
      }
      Err(e) => {
        self.set_error(format!("Failed to open browser: {}", e));
      }
    }
  }
}
