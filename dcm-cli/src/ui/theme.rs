//! Color palette and style helpers for the project list
//!
//! A [`Theme`] value is built once in `main` and passed down to the renderer;
//! nothing here is global.

use ratatui::style::{Color, Modifier, Style};

use dcm_core::model::ProjectStatus;

/// Color palette tokens for the theme
#[derive(Clone, Debug)]
pub struct Palette {
    /// Panel border color
    pub panel_border: Color,
    /// Primary text color
    pub text: Color,
    /// Dimmed text (secondary info)
    pub text_dim: Color,
    /// Muted text (stopped, unknown)
    pub text_muted: Color,
    /// Accent color (titles, focus)
    pub accent: Color,
    /// Running
    pub success: Color,
    /// Starting, stopping
    pub warn: Color,
    /// Failed operations
    pub error: Color,
    /// Selection background
    pub selection_bg: Color,
    /// Selection foreground
    pub selection_fg: Color,
    /// Key hint text
    pub key_hint: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self::dark()
    }
}

impl Palette {
    pub fn dark() -> Self {
        Self {
            panel_border: Color::Rgb(60, 60, 60),
            text: Color::Rgb(212, 212, 212),
            text_dim: Color::Rgb(150, 150, 150),
            text_muted: Color::Rgb(100, 100, 100),
            accent: Color::Rgb(46, 248, 187),
            success: Color::Rgb(78, 201, 176),
            warn: Color::Rgb(220, 180, 100),
            error: Color::Rgb(255, 95, 135),
            selection_bg: Color::Rgb(38, 79, 120),
            selection_fg: Color::White,
            key_hint: Color::Rgb(206, 145, 120),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Theme {
    pub palette: Palette,
}

impl Theme {
    pub fn status_style(&self, status: &ProjectStatus) -> Style {
        let color = match status {
            ProjectStatus::Running => self.palette.success,
            ProjectStatus::Transitioning { .. } => self.palette.warn,
            ProjectStatus::Error { .. } => self.palette.error,
            ProjectStatus::Stopped | ProjectStatus::Unknown => self.palette.text_muted,
        };
        Style::default().fg(color)
    }

    pub fn status_icon(&self, status: &ProjectStatus) -> &'static str {
        match status {
            ProjectStatus::Running => "●",
            ProjectStatus::Stopped => "○",
            ProjectStatus::Transitioning { .. } => "◐",
            ProjectStatus::Error { .. } => "✗",
            ProjectStatus::Unknown => "?",
        }
    }

    pub fn text_style(&self) -> Style {
        Style::default().fg(self.palette.text)
    }

    pub fn text_dim_style(&self) -> Style {
        Style::default().fg(self.palette.text_dim)
    }

    pub fn accent_bold_style(&self) -> Style {
        Style::default()
            .fg(self.palette.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn warn_style(&self) -> Style {
        Style::default().fg(self.palette.warn)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.palette.error)
    }

    pub fn border_style(&self) -> Style {
        Style::default().fg(self.palette.panel_border)
    }

    pub fn selection_style(&self) -> Style {
        Style::default()
            .bg(self.palette.selection_bg)
            .fg(self.palette.selection_fg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn key_hint_style(&self) -> Style {
        Style::default().fg(self.palette.key_hint)
    }
}
