mod keys;
mod theme;

pub use keys::map_key;
pub use theme::Theme;

use std::time::{Duration, Instant};

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use dcm_core::controller::{InteractiveController, MessageLevel, ViewMode};
use dcm_core::model::{ProjectIndex, Target};

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const SPINNER_INTERVAL: Duration = Duration::from_millis(80);

/// Busy indicator driven by wall-clock time, so it turns at the same rate
/// whether or not keys are being pressed
#[derive(Clone, Copy, Debug)]
pub struct Spinner {
    started: Instant,
}

impl Default for Spinner {
    fn default() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Spinner {
    pub fn frame(&self) -> &'static str {
        frame_at(self.started.elapsed())
    }
}

fn frame_at(elapsed: Duration) -> &'static str {
    let step = (elapsed.as_millis() / SPINNER_INTERVAL.as_millis()) as usize;
    SPINNER_FRAMES[step % SPINNER_FRAMES.len()]
}

pub fn render(
    f: &mut Frame,
    controller: &InteractiveController,
    theme: &Theme,
    spinner: &Spinner,
    list_state: &mut ListState,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(f.area());

    match controller.view_mode() {
        ViewMode::List => render_list(f, chunks[0], controller, theme, spinner, list_state),
        ViewMode::Busy { index, target } => {
            render_busy(f, chunks[0], controller, index, target, theme, spinner)
        }
    }

    if let Some(message) = controller.message() {
        let style = match message.level {
            MessageLevel::Info => theme.text_dim_style(),
            MessageLevel::Error => theme.error_style(),
        };
        f.render_widget(
            Paragraph::new(Span::styled(format!(" {}", message.text), style)),
            chunks[1],
        );
    }

    f.render_widget(Paragraph::new(key_hints(controller.is_busy(), theme)), chunks[2]);
}

fn render_list(
    f: &mut Frame,
    area: Rect,
    controller: &InteractiveController,
    theme: &Theme,
    spinner: &Spinner,
    list_state: &mut ListState,
) {
    let items: Vec<ListItem> = controller
        .rows()
        .iter()
        .map(|row| {
            // Background transitions keep animating in the list
            let icon = if row.status.is_transitioning() {
                spinner.frame()
            } else {
                theme.status_icon(&row.status)
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{} ", icon), theme.status_style(&row.status)),
                Span::styled(row.label.clone(), theme.text_style()),
            ]))
        })
        .collect();

    let (running, total) = controller.registry().counts();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border_style())
        .title(Span::styled(
            format!(" Choose a compose to start/stop ({}/{} running) ", running, total),
            theme.accent_bold_style(),
        ));

    let list = List::new(items)
        .block(block)
        .highlight_style(theme.selection_style())
        .highlight_symbol("> ");

    list_state.select(controller.selected());
    f.render_stateful_widget(list, area, list_state);
}

fn render_busy(
    f: &mut Frame,
    area: Rect,
    controller: &InteractiveController,
    index: ProjectIndex,
    target: Target,
    theme: &Theme,
    spinner: &Spinner,
) {
    let name = controller
        .registry()
        .get(index)
        .map(|p| p.name())
        .unwrap_or_default();

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("Processing {} to status {} ...", name, target),
            theme.text_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(spinner.frame(), theme.warn_style())),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border_style());
    f.render_widget(
        Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center),
        area,
    );
}

fn key_hints(busy: bool, theme: &Theme) -> Line<'static> {
    let hints: &[(&str, &str)] = if busy {
        &[("esc", "back to list"), ("q", "quit")]
    } else {
        &[
            ("↑/↓", "move"),
            ("enter", "start/stop"),
            ("r", "refresh"),
            ("q", "quit"),
        ]
    };

    let mut spans = vec![Span::raw(" ")];
    for (key, action) in hints {
        spans.push(Span::styled(key.to_string(), theme.key_hint_style()));
        spans.push(Span::styled(format!(" {}  ", action), theme.text_dim_style()));
    }
    Line::from(spans)
}
