use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};

use crate::app::{App, AppMode};

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

// --- Event Handling ---

pub fn handle_key_event(app: &mut App, key: event::KeyEvent) {
  if key.modifiers.contains(KeyModifiers::CONTROL) {
    match key.code {
      KeyCode::Char('c') => {
        app.should_quit = true;
        return;
      }
      KeyCode::Char('t') => {
        app.next_theme();
        return;
      }
      KeyCode::Char('s') => {
        app.cycle_sort();
        return;
      }
      KeyCode::Char('r') => {
        app.retry_or_refresh();
        return;
      }
      KeyCode::Char('o') => {
        app.open_selected();
        return;
      }
      _ => {}
    }
  }

  // Tab flips live/stored search in both modes.
  if key.code == KeyCode::Tab {
    app.toggle_search_mode();
    return;
  }

  match app.mode {
    AppMode::Input => handle_input_key(app, key),
    AppMode::Results => handle_results_key(app, key),
  }
}

fn handle_input_key(app: &mut App, key: event::KeyEvent) {
  app.clear_error();
  match key.code {
    KeyCode::Enter => {
      app.trigger_search();
    }
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
      app.input.insert(byte_idx, c);
      app.cursor_position += 1;
    }
    KeyCode::Backspace => {
      if app.cursor_position > 0 {
        app.cursor_position -= 1;
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
      }
    }
    KeyCode::Delete => {
      if app.cursor_position < app.input.chars().count() {
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
      }
    }
    KeyCode::Left => {
      app.cursor_position = app.cursor_position.saturating_sub(1);
    }
    KeyCode::Right => {
      if app.cursor_position < app.input.chars().count() {
        app.cursor_position += 1;
      }
    }
    KeyCode::Home => {
      app.cursor_position = 0;
    }
    KeyCode::End => {
      app.cursor_position = app.input.chars().count();
    }
    KeyCode::Esc => {
      if !app.input.is_empty() || app.query.params().is_searching() {
        app.clear_search();
      } else if !app.query.results().is_empty() {
        app.mode = AppMode::Results;
      } else {
        app.should_quit = true;
      }
    }
    KeyCode::Down => {
      if !app.query.results().is_empty() {
        app.mode = AppMode::Results;
      }
    }
    _ => {}
  }
}

fn handle_results_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Enter => {
      if !app.jump_to_page_cursor() {
        app.open_selected();
      }
    }
    KeyCode::Down | KeyCode::Char('j') => {
      app.select_next();
    }
    KeyCode::Up | KeyCode::Char('k') => {
      app.select_previous();
    }
    KeyCode::Right | KeyCode::Char('l') | KeyCode::PageDown => {
      app.next_page();
    }
    KeyCode::Left | KeyCode::Char('h') | KeyCode::PageUp => {
      app.previous_page();
    }
    KeyCode::Home | KeyCode::Char('g') => {
      app.first_page();
    }
    KeyCode::End | KeyCode::Char('G') => {
      app.last_page();
    }
    KeyCode::Char('[') => {
      app.move_page_cursor(false);
    }
    KeyCode::Char(']') => {
      app.move_page_cursor(true);
    }
    KeyCode::Char('r') => {
      app.retry_or_refresh();
    }
    KeyCode::Char('s') => {
      app.cycle_sort();
    }
    KeyCode::Char('c') => {
      app.clear_search();
    }
    KeyCode::Char(c @ '1'..='5') => {
      let slot = c as usize - '1' as usize;
      app.quick_search_slot(slot);
    }
    KeyCode::Esc if app.page_cursor.is_some() => {
      app.page_cursor = None;
    }
    KeyCode::Char('/') | KeyCode::Char('i') | KeyCode::Esc => {
      app.mode = AppMode::Input;
    }
    KeyCode::Char('q') => {
      app.should_quit = true;
    }
    _ => {}
  }
}
