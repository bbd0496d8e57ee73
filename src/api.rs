use anyhow::Context;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::query::SortOrder;

// --- Payloads ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thumbnails {
  pub default: String,
  pub medium: String,
  pub high: String,
}

/// One video as returned by the feed API. Passed through to the UI untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSummary {
  pub id: String,
  pub video_id: String,
  pub title: String,
  pub description: String,
  pub channel_title: String,
  pub published_at: Option<DateTime<Utc>>,
  pub thumbnails: Thumbnails,
}

impl VideoSummary {
  /// Highest resolution thumbnail the API gave us, if any.
  pub fn best_thumbnail(&self) -> Option<&str> {
    [&self.thumbnails.high, &self.thumbnails.medium, &self.thumbnails.default]
      .into_iter()
      .map(String::as_str)
      .find(|s| !s.is_empty())
  }
}

/// One page of results plus the total number of matches across all pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VideoPage {
  #[serde(default, deserialize_with = "null_as_empty")]
  pub results: Vec<VideoSummary>,
  #[serde(default)]
  pub count: u64,
  #[serde(default)]
  pub next: Option<String>,
  #[serde(default)]
  pub previous: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<VideoSummary>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(Option::<Vec<VideoSummary>>::deserialize(deserializer)?.unwrap_or_default())
}

// --- Failures ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
  /// Connection refused, timeout, or a body we could not decode.
  Transport,
  /// The API answered with a non-success status.
  Upstream,
}

/// Uniform failure for every API operation. `message` is shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FetchFailure {
  pub kind: FailureKind,
  pub message: String,
}

impl FetchFailure {
  pub fn transport(message: impl Into<String>) -> Self {
    Self { kind: FailureKind::Transport, message: message.into() }
  }

  pub fn upstream(message: impl Into<String>) -> Self {
    Self { kind: FailureKind::Upstream, message: message.into() }
  }
}

pub type FetchResult = Result<VideoPage, FetchFailure>;

/// Pull a human readable message out of an error payload like
/// `{"error": "Failed to fetch videos", "details": "..."}`.
pub fn upstream_message(body: &str) -> Option<String> {
  let value: serde_json::Value = serde_json::from_str(body).ok()?;
  let error = value.get("error")?.as_str()?.trim();
  if error.is_empty() {
    return None;
  }
  match value.get("details").and_then(|d| d.as_str()).map(str::trim).filter(|d| !d.is_empty()) {
    Some(details) => Some(format!("{} ({})", error, details)),
    None => Some(error.to_string()),
  }
}

// --- API collaborator ---

/// The remote feed service. Futures are `'static` so the controller can spawn them.
pub trait VideoApi: Send + Sync {
  fn list_videos(&self, page: u32, page_size: u32, sort: SortOrder) -> BoxFuture<'static, FetchResult>;

  fn search_stored(&self, query: &str, page: u32, page_size: u32, sort: SortOrder) -> BoxFuture<'static, FetchResult>;

  fn search_live(&self, query: &str, page: u32, page_size: u32, sort: SortOrder) -> BoxFuture<'static, FetchResult>;

  fn health(&self) -> BoxFuture<'static, Result<serde_json::Value, FetchFailure>>;
}

const LIST_PATH: &str = "/api/videos";
const SEARCH_PATH: &str = "/api/videos/search";
const LIVE_SEARCH_PATH: &str = "/api/videos/youtube-search";
const HEALTH_PATH: &str = "/health";

/// `VideoApi` over HTTP with a single shared reqwest client.
#[derive(Clone)]
pub struct HttpApi {
  client: Client,
  base_url: String,
}

impl HttpApi {
  pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
    let client = Client::builder()
      .timeout(timeout)
      .user_agent(concat!("vidfeed/", env!("CARGO_PKG_VERSION")))
      .build()
      .context("Failed to build HTTP client")?;
    let base_url = base_url.trim_end_matches('/').to_string();
    Url::parse(&base_url).with_context(|| format!("Invalid API base URL: {}", base_url))?;
    Ok(Self { client, base_url })
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  fn page_request(
    &self,
    path: &str,
    query: Option<&str>,
    page: u32,
    page_size: u32,
    sort: SortOrder,
    context: &'static str,
  ) -> BoxFuture<'static, FetchResult> {
    let mut params: Vec<(&str, String)> = Vec::with_capacity(4);
    if let Some(q) = query {
      params.push(("q", q.to_string()));
    }
    params.push(("page", page.to_string()));
    params.push(("page_size", page_size.to_string()));
    params.push(("sort", sort.as_param().to_string()));

    let url = Url::parse_with_params(&format!("{}{}", self.base_url, path), &params);
    let client = self.client.clone();
    async move {
      let url = url.map_err(|e| FetchFailure::transport(format!("{}: {}", context, e)))?;
      let body = get_text(&client, url, context).await?;
      serde_json::from_str::<VideoPage>(&body)
        .map_err(|e| FetchFailure::transport(format!("{}: unexpected response: {}", context, e)))
    }
    .boxed()
  }
}

/// GET `url` and return the body, mapping failures the same way for every endpoint.
async fn get_text(client: &Client, url: Url, context: &'static str) -> Result<String, FetchFailure> {
  debug!(url = %url, "api: GET");
  let response =
    client.get(url).send().await.map_err(|e| FetchFailure::transport(format!("{}: {}", context, e)))?;
  let status = response.status();
  let body = response.text().await.map_err(|e| FetchFailure::transport(format!("{}: {}", context, e)))?;
  if !status.is_success() {
    let msg = upstream_message(&body).unwrap_or_else(|| status_message(status));
    return Err(FetchFailure::upstream(format!("{}: {}", context, msg)));
  }
  Ok(body)
}

fn status_message(status: StatusCode) -> String {
  format!("request failed with status code {}", status.as_u16())
}

impl VideoApi for HttpApi {
  fn list_videos(&self, page: u32, page_size: u32, sort: SortOrder) -> BoxFuture<'static, FetchResult> {
    self.page_request(LIST_PATH, None, page, page_size, sort, "Failed to fetch videos")
  }

  fn search_stored(&self, query: &str, page: u32, page_size: u32, sort: SortOrder) -> BoxFuture<'static, FetchResult> {
    self.page_request(SEARCH_PATH, Some(query), page, page_size, sort, "Failed to search stored videos")
  }

  fn search_live(&self, query: &str, page: u32, page_size: u32, sort: SortOrder) -> BoxFuture<'static, FetchResult> {
    self.page_request(LIVE_SEARCH_PATH, Some(query), page, page_size, sort, "Failed to search YouTube")
  }

  fn health(&self) -> BoxFuture<'static, Result<serde_json::Value, FetchFailure>> {
    const CONTEXT: &str = "Health check failed";
    let url = Url::parse(&format!("{}{}", self.base_url, HEALTH_PATH));
    let client = self.client.clone();
    async move {
      let url = url.map_err(|e| FetchFailure::transport(format!("{}: {}", CONTEXT, e)))?;
      let body = get_text(&client, url, CONTEXT).await?;
      serde_json::from_str(&body).map_err(|e| FetchFailure::transport(format!("{}: {}", CONTEXT, e)))
    }
    .boxed()
  }
}
