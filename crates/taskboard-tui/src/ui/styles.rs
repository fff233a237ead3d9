use ratatui::style::{Color, Modifier, Style};

use taskboard_core::config::ThemeMode;

/// Colors for one theme
pub struct Palette {
    pub primary: Color,
    pub secondary: Color,
    pub accent: Color,
    pub error: Color,
    pub muted: Color,
    pub highlight: Color,
    pub text: Color,
    pub status_bg: Color,
    pub background: Color,
}

static DARK: Palette = Palette {
    primary: Color::Rgb(64, 128, 192),
    secondary: Color::Rgb(96, 160, 96),
    accent: Color::Rgb(192, 160, 64),
    error: Color::Rgb(192, 64, 64),
    muted: Color::Rgb(128, 128, 128),
    highlight: Color::Rgb(48, 48, 64),
    text: Color::White,
    status_bg: Color::Rgb(32, 32, 40),
    background: Color::Reset,
};

static LIGHT: Palette = Palette {
    primary: Color::Rgb(25, 118, 210),
    secondary: Color::Rgb(46, 125, 50),
    accent: Color::Rgb(156, 39, 176),
    error: Color::Rgb(198, 40, 40),
    muted: Color::Rgb(110, 110, 110),
    highlight: Color::Rgb(210, 225, 245),
    text: Color::Black,
    status_bg: Color::Rgb(230, 230, 235),
    background: Color::White,
};

pub fn palette(theme: ThemeMode) -> &'static Palette {
    match theme {
        ThemeMode::Light => &LIGHT,
        ThemeMode::Dark => &DARK,
    }
}

impl Palette {
    pub fn title_style(&self) -> Style {
        Style::default().fg(self.primary).add_modifier(Modifier::BOLD)
    }

    pub fn selected_style(&self) -> Style {
        Style::default()
            .bg(self.highlight)
            .fg(self.text)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text_style(&self) -> Style {
        Style::default().fg(self.text)
    }

    pub fn muted_style(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn highlight_style(&self) -> Style {
        Style::default().fg(self.accent)
    }

    pub fn success_style(&self) -> Style {
        Style::default().fg(self.secondary)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error)
    }

    pub fn border_style(&self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.primary)
        } else {
            Style::default().fg(self.muted)
        }
    }

    pub fn status_bar_style(&self) -> Style {
        Style::default().bg(self.status_bg).fg(self.text)
    }

    pub fn help_key_style(&self) -> Style {
        Style::default().fg(self.accent).add_modifier(Modifier::BOLD)
    }

    /// Role badge in the navbar
    pub fn badge_style(&self, admin: bool) -> Style {
        let bg = if admin { self.error } else { self.primary };
        Style::default()
            .bg(bg)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD)
    }

    pub fn completed_style(&self) -> Style {
        Style::default()
            .fg(self.muted)
            .add_modifier(Modifier::CROSSED_OUT)
    }

    /// Base style for full-screen backgrounds
    pub fn base_style(&self) -> Style {
        Style::default().bg(self.background).fg(self.text)
    }
}
