use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, BorderType, List, ListItem, Padding, Paragraph},
};

use crate::app::{ApiHealth, App, AppMode};
use crate::format::{display_width, published_label, truncate_str};
use crate::pagination::PaginationWindow;
use crate::query::SearchMode;
use crate::theme::Theme;

const SPINNER: [&str; 8] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧"];

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();
  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, input_area, quick_area, summary_area, main_area, pages_area, status_area, footer_area] =
    Layout::vertical([
      Constraint::Length(1),
      Constraint::Length(3),
      Constraint::Length(1),
      Constraint::Length(1),
      Constraint::Min(3),
      Constraint::Length(1),
      Constraint::Length(1),
      Constraint::Length(1),
    ])
    .areas(frame.area());

  render_header(frame, app, header_area);
  render_input(frame, app, input_area);
  render_quick_terms(frame, app, quick_area);
  render_summary(frame, app, summary_area);
  render_main(frame, app, main_area);
  render_pagination(frame, app, pages_area);
  render_status(frame, app, status_area);
  render_footer(frame, app, footer_area);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let left = Line::from(Span::styled(" ▶ vidfeed ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)));
  frame.render_widget(left, area);

  let (health, color) = match &app.health {
    ApiHealth::Checking => ("● checking API", theme.muted),
    ApiHealth::Connected => ("● API connected", theme.stored),
    ApiHealth::Unreachable(_) => ("● API unreachable", theme.error),
  };
  let right_text = format!("{}   v{} ", health, env!("CARGO_PKG_VERSION"));
  let width = right_text.chars().count() as u16;
  let right = Line::from(Span::styled(right_text, Style::default().fg(color)));
  let right_area = Rect { x: area.x + area.width.saturating_sub(width), width: width.min(area.width), ..area };
  frame.render_widget(right, right_area);
}

fn mode_title(mode: SearchMode) -> &'static str {
  match mode {
    SearchMode::Live => " Live YouTube search ",
    SearchMode::Stored => " Search stored videos ",
    SearchMode::None => " Search ",
  }
}

fn mode_color(theme: &Theme, mode: SearchMode) -> ratatui::style::Color {
  match mode {
    SearchMode::Live => theme.live,
    SearchMode::Stored => theme.stored,
    SearchMode::None => theme.border,
  }
}

fn render_input(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let mode = app.query.preferred_mode();
  let border_color = if app.mode == AppMode::Input { mode_color(theme, mode) } else { theme.border };
  let input_block = Block::bordered()
    .title(mode_title(mode))
    .title_style(Style::default().fg(mode_color(theme, mode)).add_modifier(Modifier::BOLD))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  let cursor_col = display_width(&app.input, app.cursor_position);

  if cursor_col < app.input_scroll {
    app.input_scroll = cursor_col;
  } else if cursor_col >= app.input_scroll + inner_w {
    app.input_scroll = cursor_col.saturating_sub(inner_w) + 1;
  }

  let visible: String = app
    .input
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= app.input_scroll)
    .take_while(|(start, _, _)| *start < app.input_scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  let paragraph = if visible.is_empty() && app.mode != AppMode::Input {
    Paragraph::new("Search channels, topics, tutorials…").style(Style::default().fg(theme.muted))
  } else {
    Paragraph::new(visible).style(Style::default().fg(theme.fg))
  };
  frame.render_widget(paragraph.block(input_block), area);

  if app.mode == AppMode::Input {
    let cursor_x = area.x + 2 + (cursor_col - app.input_scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn render_quick_terms(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let label = if app.recent.is_empty() { " Try: " } else { " Recent: " };
  let mut spans = vec![Span::styled(label, Style::default().fg(theme.muted))];
  for (i, term) in app.quick_terms().iter().take(5).enumerate() {
    spans.push(Span::styled(format!("{} ", i + 1), Style::default().fg(theme.key_fg).bg(theme.key_bg)));
    spans.push(Span::styled(format!(" {}  ", truncate_str(term, 24)), Style::default().fg(theme.fg)));
  }
  frame.render_widget(Line::from(spans), area);
}

/// Search text and backend behind the rows on screen. Follows the snapshot, not the pending request.
fn shown_search(app: &App) -> Option<(&str, SearchMode)> {
  let key = &app.query.snapshot()?.key;
  match key.search_mode {
    SearchMode::Live | SearchMode::Stored if key.search_active => Some((key.search_text.as_str(), key.search_mode)),
    _ => None,
  }
}

fn source_label(mode: SearchMode) -> &'static str {
  match mode {
    SearchMode::Live => "Live from YouTube",
    SearchMode::Stored => "From stored videos",
    SearchMode::None => "All videos",
  }
}

fn summary_text(app: &App) -> Option<String> {
  let total = app.query.total_count().filter(|&t| t > 0)?;
  let shown = app.query.results().len();
  Some(match shown_search(app) {
    Some((text, mode)) => format!(" Showing {} videos for \"{}\" ({})", shown, text, source_label(mode)),
    None => format!(" Showing {} of {} videos", shown, total),
  })
}

fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();

  let left = match summary_text(app) {
    Some(text) => {
      let color = shown_search(app).map_or(theme.fg, |(_, mode)| mode_color(theme, mode));
      Line::from(Span::styled(text, Style::default().fg(color)))
    }
    None if app.query.total_count().is_some() => Line::from(Span::styled(" No videos", Style::default().fg(theme.muted))),
    None => Line::from(Span::styled(" Loading videos…", Style::default().fg(theme.muted))),
  };
  frame.render_widget(left, area);

  let sort = format!("Sort: {} ", app.query.params().sort_order.label());
  let width = sort.chars().count() as u16;
  let right_area = Rect { x: area.x + area.width.saturating_sub(width), width: width.min(area.width), ..area };
  frame.render_widget(Line::from(Span::styled(sort, Style::default().fg(theme.muted))), right_area);
}

fn render_main(frame: &mut Frame, app: &mut App, area: Rect) {
  if app.query.is_loading() {
    let msg = if app.query.params().is_searching() { "Searching YouTube…" } else { "Loading videos…" };
    render_message(frame, app.theme(), area, msg, None);
  } else if app.query.results().is_empty() {
    if let Some(err) = app.query.error() {
      let detail = err.message.clone();
      render_message(frame, app.theme(), area, "Error loading videos", Some(&detail));
    } else if !app.query.is_fetching() {
      let hint = if app.query.params().is_searching() { Some("Try a different search term.") } else { None };
      render_message(frame, app.theme(), area, "No videos found", hint);
    } else {
      render_message(frame, app.theme(), area, "Loading videos…", None);
    }
  } else {
    render_results(frame, app, area);
  }
}

fn render_message(frame: &mut Frame, theme: &Theme, area: Rect, headline: &str, detail: Option<&str>) {
  let mut text = vec![
    Line::from(""),
    Line::from(Span::styled(headline.to_string(), Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))),
  ];
  if let Some(detail) = detail {
    text.push(Line::from(""));
    text.push(Line::from(Span::styled(detail.to_string(), Style::default().fg(theme.muted))));
  }
  let paragraph = Paragraph::new(text)
    .alignment(Alignment::Center)
    .block(Block::bordered().border_type(BorderType::Rounded).border_style(Style::default().fg(theme.border)));
  frame.render_widget(paragraph, area);
}

fn render_results(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();

  // Inner width: area minus 2 borders minus 2 chars for highlight symbol ("▶ ")
  let inner_w = area.width.saturating_sub(4) as usize;
  let selected = app.list_state.selected();

  let items: Vec<ListItem> = app
    .query
    .results()
    .iter()
    .enumerate()
    .map(|(i, video)| {
      let is_selected = Some(i) == selected;
      let fg = if is_selected { theme.highlight_fg } else { theme.fg };
      let bg = if is_selected {
        theme.highlight_bg
      } else if i % 2 == 1 {
        theme.stripe_bg
      } else {
        theme.bg
      };

      let right = format!("{}  {}", video.channel_title, published_label(video.published_at));
      let right_w = right.chars().count();
      let title_max = inner_w.saturating_sub(right_w + 2);
      let title = truncate_str(&video.title, title_max);
      let gap = inner_w.saturating_sub(title.chars().count() + right_w);
      let line = Line::from(vec![
        Span::styled(title, Style::default().fg(fg)),
        Span::raw(" ".repeat(gap)),
        Span::styled(right, Style::default().fg(theme.muted)),
      ]);
      ListItem::new(line).bg(bg)
    })
    .collect();

  let title = match shown_search(app) {
    Some((text, _)) => format!(" Results for \"{}\" ", truncate_str(text, 40)),
    None => " Latest videos ".to_string(),
  };
  let border = if app.query.is_showing_previous() { theme.muted } else { theme.border };

  let list = List::new(items)
    .block(
      Block::bordered()
        .title(title)
        .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border)),
    )
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));

  frame.render_stateful_widget(list, area, &mut app.list_state);
}

/// Spans for the page strip, e.g. `‹ 1 … 4 5 [6] 7 8 … 12 ›`.
fn pagination_spans(window: &PaginationWindow, current: u32, cursor: Option<u32>, theme: &Theme) -> Vec<Span<'static>> {
  let plain = Style::default().fg(theme.fg);
  let dim = Style::default().fg(theme.muted);
  let marked = Style::default().fg(theme.accent).add_modifier(Modifier::UNDERLINED | Modifier::BOLD);
  let page_style = |page: u32| if cursor == Some(page) { marked } else { plain };
  let mut spans = vec![Span::styled(" ‹ ", if current > 1 { plain } else { dim })];
  if window.show_first_page {
    spans.push(Span::styled(" 1 ", page_style(1)));
    if window.show_leading_ellipsis {
      spans.push(Span::styled(" … ", dim));
    }
  }
  for &page in &window.pages {
    if page == current {
      spans.push(Span::styled(
        format!("[{}]", page),
        Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD),
      ));
    } else {
      spans.push(Span::styled(format!(" {} ", page), page_style(page)));
    }
  }
  if window.show_last_page {
    if window.show_trailing_ellipsis {
      spans.push(Span::styled(" … ", dim));
    }
    spans.push(Span::styled(format!(" {} ", window.total_pages), page_style(window.total_pages)));
  }
  spans.push(Span::styled(" › ", if current < window.total_pages { plain } else { dim }));
  spans.push(Span::styled(format!("  page {} of {}", current, window.total_pages), dim));
  spans
}

fn render_pagination(frame: &mut Frame, app: &App, area: Rect) {
  let Some(window) = app.query.pagination() else { return };
  let spans = pagination_spans(&window, app.query.params().page, app.page_cursor, app.theme());
  frame.render_widget(Line::from(spans).alignment(Alignment::Center), area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let (text, style) = if app.query.is_fetching() {
    let tick = (app.started_at.elapsed().as_millis() / 100) as usize % SPINNER.len();
    let label = if app.query.params().is_searching() { "Searching…" } else { "Loading…" };
    (format!(" {} {}", SPINNER[tick], label), Style::default().fg(theme.status))
  } else if let Some(err) = app.query.error() {
    (format!(" ⚠  {}  (r to retry)", err.message), Style::default().fg(theme.error))
  } else if let Some(err) = &app.last_error {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else if let Some(info) = &app.info_message {
    (format!(" ℹ  {}", info), Style::default().fg(theme.muted))
  } else {
    (" Ready".to_string(), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let has_results = !app.query.results().is_empty();
  let keys: Vec<(&str, &str)> = match app.mode {
    AppMode::Input => {
      let mut k = vec![("Enter", "Search"), ("Tab", "Live/Stored"), ("^s", "Sort")];
      if has_results {
        k.push(("↓", "Results"));
      }
      k.push(("Esc", if app.input.is_empty() && !app.query.params().is_searching() { "Quit" } else { "Clear" }));
      k
    }
    AppMode::Results => {
      let mut k = if app.page_cursor.is_some() {
        vec![("Enter", "Go to page"), ("[/]", "Pick page"), ("Esc", "Cancel")]
      } else {
        vec![("Enter", "Open"), ("j/k", "Navigate"), ("h/l", "Page"), ("[/]", "Pick page"), ("1-5", "Quick")]
      };
      if app.query.error().is_some() {
        k.push(("r", "Retry"));
      }
      k.push(("/", "Search"));
      k.push(("q", "Quit"));
      k
    }
  };

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw("  "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let theme_label = format!("{} ", theme.name);
  let right = Line::from(Span::styled(&theme_label, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(theme_label.len() as u16), width: theme_label.len() as u16, ..area };
  frame.render_widget(right, right_area);
}
