use ratatui::style::{Color, Modifier, Style};
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub accent: Color,
    pub muted: Color,
    pub selection: Color,
    pub playing: Color,
    pub error: Color,
    pub progress: Color,
    pub is_color: bool,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Cyan,
            muted: Color::Gray,
            selection: Color::DarkGray,
            playing: Color::Green,
            error: Color::Red,
            progress: Color::Magenta,
            is_color: true,
        }
    }
}

impl Theme {
    pub fn monochrome() -> Self {
        Self {
            accent: Color::White,
            muted: Color::Gray,
            selection: Color::Reset,
            playing: Color::White,
            error: Color::White,
            progress: Color::White,
            is_color: false,
        }
    }

    /// Picks the theme named in config. `NO_COLOR` (no-color.org) wins over it.
    pub fn from_config(name: Option<&str>) -> Self {
        if env::var_os("NO_COLOR").is_some() {
            return Self::monochrome();
        }
        Self::named(name)
    }

    fn named(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some("monochrome") => Self::monochrome(),
            Some(other) if !other.is_empty() && other != "default" => {
                tracing::warn!(theme = other, "unknown theme; using default");
                Self::default()
            }
            _ => Self::default(),
        }
    }

    pub fn title(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    /// Without colors the selected row is reversed instead of shaded.
    pub fn highlight(&self) -> Style {
        if self.is_color {
            Style::default()
                .bg(self.selection)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::REVERSED)
        }
    }

    pub fn error_style(&self) -> Style {
        let style = Style::default().fg(self.error);
        if self.is_color {
            style
        } else {
            style.add_modifier(Modifier::BOLD)
        }
    }
}
