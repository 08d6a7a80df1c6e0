//! Commands tab rendering: runnable tool verbs.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::theme::Palette;
use crate::{App, COMMAND_VERBS, SPINNER_FRAMES};

pub fn render_commands_tab(app: &mut App, f: &mut Frame, area: Rect, palette: &Palette) {
    let title = if app.service.is_read_only() {
        " commands · read-only, running disabled "
    } else {
        " commands "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent_primary))
        .title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    app.list_top = inner.y;
    app.list_offset = 0;
    app.panel_x = 0;

    let lines: Vec<Line> = COMMAND_VERBS
        .iter()
        .enumerate()
        .map(|(i, (verb, desc))| {
            let is_cursor = i == app.command_cursor;
            let base = if is_cursor {
                Style::default()
                    .bg(palette.selection_bg)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let running = app
                .busy_action
                .map(|a| a == crate::jobs::ActionId::RunVerb(verb))
                .unwrap_or(false);
            let verb = *verb;
            let marker = if running {
                SPINNER_FRAMES[app.spinner_frame % SPINNER_FRAMES.len()]
            } else {
                " "
            };
            Line::from(vec![
                Span::styled(format!(" {} ", marker), base.fg(palette.warn_fg)),
                Span::styled(format!("{:<10}", verb), base.fg(palette.accent_secondary)),
                Span::styled((*desc).to_string(), base.fg(palette.dim_fg)),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}
