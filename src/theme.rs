use ratatui::style::Color;

pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub muted: Color,
  pub accent: Color,
  pub border: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub stripe_bg: Color,
  pub status: Color,
  pub error: Color,
  pub live: Color,
  pub stored: Color,
  pub key_fg: Color,
  pub key_bg: Color,
}

pub const THEMES: [Theme; 3] = [
  Theme {
    name: "Midnight",
    bg: Color::Rgb(18, 18, 24),
    fg: Color::Rgb(220, 220, 230),
    muted: Color::Rgb(120, 120, 140),
    accent: Color::Rgb(239, 68, 68),
    border: Color::Rgb(60, 60, 75),
    highlight_fg: Color::Rgb(255, 255, 255),
    highlight_bg: Color::Rgb(55, 48, 80),
    stripe_bg: Color::Rgb(24, 24, 32),
    status: Color::Rgb(96, 165, 250),
    error: Color::Rgb(248, 113, 113),
    live: Color::Rgb(239, 68, 68),
    stored: Color::Rgb(59, 130, 246),
    key_fg: Color::Rgb(18, 18, 24),
    key_bg: Color::Rgb(160, 160, 180),
  },
  Theme {
    name: "Paper",
    bg: Color::Rgb(249, 250, 251),
    fg: Color::Rgb(17, 24, 39),
    muted: Color::Rgb(107, 114, 128),
    accent: Color::Rgb(220, 38, 38),
    border: Color::Rgb(209, 213, 219),
    highlight_fg: Color::Rgb(255, 255, 255),
    highlight_bg: Color::Rgb(37, 99, 235),
    stripe_bg: Color::Rgb(243, 244, 246),
    status: Color::Rgb(37, 99, 235),
    error: Color::Rgb(220, 38, 38),
    live: Color::Rgb(220, 38, 38),
    stored: Color::Rgb(37, 99, 235),
    key_fg: Color::Rgb(255, 255, 255),
    key_bg: Color::Rgb(75, 85, 99),
  },
  Theme {
    name: "Terminal",
    bg: Color::Reset,
    fg: Color::Reset,
    muted: Color::DarkGray,
    accent: Color::Red,
    border: Color::DarkGray,
    highlight_fg: Color::Black,
    highlight_bg: Color::Cyan,
    stripe_bg: Color::Reset,
    status: Color::Blue,
    error: Color::LightRed,
    live: Color::Red,
    stored: Color::Blue,
    key_fg: Color::Black,
    key_bg: Color::Gray,
  },
];

pub fn index_by_name(name: &str) -> usize {
  THEMES.iter().position(|t| t.name.eq_ignore_ascii_case(name)).unwrap_or(0)
}
