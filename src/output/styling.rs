use console::{style, Color, Style};

use crate::providers::gitlab::types::{Status, StatusClass};

/// Styling helpers for terminal output
pub fn bright(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright()
}

pub fn bright_red(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright().red()
}

pub fn cyan(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).cyan()
}

pub fn dim(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).dim()
}

/// Colors and emphasis of one status, shared by styled text and table cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPalette {
    pub fg: Color,
    pub bg: Option<Color>,
    pub dim: bool,
}

/// The one status to display lookup.
pub fn status_palette(status: Status) -> StatusPalette {
    let (fg, bg, dim) = match status {
        Status::Running => (Color::Blue, Some(Color::Black), false),
        Status::Pending => (Color::Yellow, Some(Color::Black), false),
        Status::Success => (Color::Green, Some(Color::Black), false),
        Status::Failed => (Color::Red, Some(Color::Black), false),
        Status::Canceled => (Color::Black, Some(Color::White), false),
        Status::Skipped | Status::Manual => (Color::White, None, true),
    };
    StatusPalette { fg, bg, dim }
}

pub fn status_style(status: Status) -> Style {
    let palette = status_palette(status);
    let mut style = Style::new().fg(palette.fg);
    if let Some(bg) = palette.bg {
        style = style.bg(bg);
    }
    if palette.dim {
        style = style.dim();
    }
    style
}

/// Marker printed in front of a status of the given class.
pub fn class_marker(class: StatusClass) -> &'static str {
    match class {
        StatusClass::Informational => "ℹ",
        StatusClass::Positive => "✓",
        StatusClass::Negative => "✗",
        StatusClass::Neutral => "•",
    }
}

/// Colored status text, e.g. for the watch summary line.
pub fn styled_status(status: Status) -> console::StyledObject<&'static str> {
    status_style(status).apply_to(status.as_str())
}
