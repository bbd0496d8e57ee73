mod api;
mod app;
mod config;
mod constants;
mod controller;
mod dispatch;
mod format;
mod input;
mod pagination;
mod query;
mod recent;
mod theme;
mod ui;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use directories::ProjectDirs;
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use api::{HttpApi, VideoApi};
use app::App;
use config::Config;
use constants::constants;
use controller::{ControllerSettings, QueryController};
use format::{published_label, truncate_str, watch_url};
use query::{SearchMode, SortOrder, ViewParameters};
use recent::RecentSearches;

// --- CLI ---

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliSearchMode {
  Live,
  Stored,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliSort {
  Latest,
  Oldest,
  Title,
  Channel,
}

impl From<CliSort> for SortOrder {
  fn from(sort: CliSort) -> Self {
    match sort {
      CliSort::Latest => SortOrder::Latest,
      CliSort::Oldest => SortOrder::Oldest,
      CliSort::Title => SortOrder::Title,
      CliSort::Channel => SortOrder::Channel,
    }
  }
}

impl From<CliSearchMode> for SearchMode {
  fn from(mode: CliSearchMode) -> Self {
    match mode {
      CliSearchMode::Live => SearchMode::Live,
      CliSearchMode::Stored => SearchMode::Stored,
    }
  }
}

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about = "Browse and search a curated video feed", long_about = None)]
struct Args {
  /// Base URL of the video feed API (overrides prefs.toml)
  #[arg(long, env = "VIDFEED_API_URL")]
  api_url: Option<String>,

  /// Videos per page
  #[arg(long)]
  page_size: Option<u32>,

  /// Fetch one page, print it to stdout and exit (no TUI)
  #[arg(long)]
  print: bool,

  /// Search text for --print
  #[arg(short, long, requires = "print")]
  search: Option<String>,

  /// Search backend for --print
  #[arg(short, long, value_enum, default_value = "live")]
  mode: CliSearchMode,

  /// Sort order (defaults to the saved preference)
  #[arg(long, value_enum)]
  sort: Option<CliSort>,

  /// Page number for --print
  #[arg(short, long, default_value_t = 1)]
  page: u32,
}

// --- Logging ---

/// Log to a daily file in the data dir; stdout belongs to the TUI.
fn init_logging() -> Option<WorkerGuard> {
  let dirs = ProjectDirs::from("", "", "vidfeed")?;
  let log_dir = dirs.data_dir().join("logs");
  std::fs::create_dir_all(&log_dir).ok()?;
  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, "vidfeed.log"));
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vidfeed=info"));
  tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
  Some(guard)
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  let _log_guard = init_logging();

  let mut config = Config::load();
  if let Some(sort) = args.sort {
    config.sort_order = Some(SortOrder::from(sort).as_param().to_string());
  }
  let api_url =
    args.api_url.clone().or_else(|| config.api_base_url.clone()).unwrap_or_else(|| constants().api_base_url.clone());
  let http =
    HttpApi::new(&api_url, constants().request_timeout()).with_context(|| format!("Cannot use API at {}", api_url))?;
  info!(api = http.base_url(), "starting vidfeed");
  let api: Arc<dyn VideoApi> = Arc::new(http);

  let mut settings = ControllerSettings::from_constants();
  if let Some(page_size) = args.page_size {
    if page_size == 0 {
      bail!("--page-size must be at least 1");
    }
    settings.page_size = page_size;
  }

  if args.print {
    return print_page(api, settings, &args, &config).await;
  }

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let app = App::new(api, config, Config::path(), settings, RecentSearches::load());
  let mut terminal = ratatui::init();
  let result = run(&mut terminal, app).await;
  ratatui::restore();
  result
}

async fn run(terminal: &mut DefaultTerminal, mut app: App) -> Result<()> {
  app.trigger_health_check();

  loop {
    app.check_pending();
    app.expire_error();

    terminal.draw(|frame| ui::ui(frame, &mut app)).context("Failed to draw frame")?;

    if event::poll(Duration::from_millis(100))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
          input::handle_key_event(&mut app, key);
        }
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  info!("exiting");
  Ok(())
}

/// Headless mode: one request through the same controller, printed as tab-separated rows.
async fn print_page(api: Arc<dyn VideoApi>, settings: ControllerSettings, args: &Args, config: &Config) -> Result<()> {
  let sort = config.sort_order.as_deref().map(SortOrder::from_config).unwrap_or_default();
  let mut params = ViewParameters::browse(settings.page_size, sort).with_page(args.page);
  if let Some(text) = args.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
    params = params.with_search(text, args.mode.into()).with_page(args.page);
  }

  let mut query = QueryController::new(api, settings, params, args.mode.into());
  while query.is_fetching() {
    if !query.wait_for_completion().await {
      break;
    }
  }
  if let Some(err) = query.error() {
    bail!("{}", err);
  }

  for video in query.results() {
    println!(
      "{}\t{}\t{}\t{}\t{}",
      truncate_str(&video.title, 80),
      video.channel_title,
      published_label(video.published_at),
      watch_url(&video.video_id),
      video.best_thumbnail().unwrap_or("-")
    );
  }
  let total = query.total_count().unwrap_or(0);
  println!("page {} of {} ({} videos)", query.params().page, query.total_pages().max(1), format::compact_count(total));
  Ok(())
}
