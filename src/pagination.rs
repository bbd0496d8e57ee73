/// The page buttons to show for the current position, with shortcut/ellipsis markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationWindow {
  pub pages: Vec<u32>,
  pub total_pages: u32,
  pub show_first_page: bool,
  pub show_leading_ellipsis: bool,
  pub show_trailing_ellipsis: bool,
  pub show_last_page: bool,
}

impl PaginationWindow {
  /// Every page number the strip shows, shortcuts included, in display order.
  pub fn targets(&self) -> Vec<u32> {
    let mut targets = Vec::with_capacity(self.pages.len() + 2);
    if self.show_first_page {
      targets.push(1);
    }
    targets.extend(&self.pages);
    if self.show_last_page {
      targets.push(self.total_pages);
    }
    targets
  }
}

pub fn total_pages(total_items: u64, page_size: u32) -> u32 {
  if page_size == 0 {
    return 0;
  }
  let pages = total_items.div_ceil(u64::from(page_size));
  u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Center a window of `window_size` pages on `current_page`, clamped to the available pages.
///
/// Returns `None` when everything fits on one page.
pub fn compute(current_page: u32, total_items: u64, page_size: u32, window_size: u32) -> Option<PaginationWindow> {
  let total_pages = total_pages(total_items, page_size);
  if total_pages <= 1 {
    return None;
  }
  let window_size = window_size.max(1);
  let current = current_page.clamp(1, total_pages);

  let mut start = current.saturating_sub(window_size / 2).max(1);
  let end = start.saturating_add(window_size - 1).min(total_pages);
  start = end.saturating_sub(window_size - 1).max(1);

  Some(PaginationWindow {
    pages: (start..=end).collect(),
    total_pages,
    show_first_page: start > 1,
    show_leading_ellipsis: start > 2,
    show_trailing_ellipsis: end < total_pages.saturating_sub(1),
    show_last_page: end < total_pages,
  })
}

/// Whether clicking `target` should change the page.
pub fn is_navigable(target: u32, current_page: u32, total_pages: u32) -> bool {
  target >= 1 && target <= total_pages && target != current_page
}
