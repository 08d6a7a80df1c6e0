//! Info tab rendering: the four tool-introspection sub-views.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::info::INFO_VIEWS;
use crate::theme::Palette;
use crate::{App, SPINNER_FRAMES};

pub fn render_info_tab(app: &mut App, f: &mut Frame, area: Rect, palette: &Palette) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);

    let mut spans = Vec::new();
    for (i, view) in INFO_VIEWS.iter().enumerate() {
        let style = if i == app.info.active {
            Style::default()
                .fg(palette.btn_fg)
                .bg(palette.accent_primary)
        } else {
            Style::default().fg(palette.dim_fg)
        };
        spans.push(Span::styled(format!(" {} ", view.label()), style));
        spans.push(Span::raw(" "));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), chunks[0]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.border_inactive))
        .title(format!(" {} ", app.info.active_kind().label()));
    let inner = block.inner(chunks[1]);
    f.render_widget(block, chunks[1]);

    // Wrap state is built lazily for the width we actually render at.
    app.handle_info_result_width(inner.width);

    let view = app.info.active_view();
    if view.loading {
        f.render_widget(
            Paragraph::new(format!(
                "{} loading…",
                SPINNER_FRAMES[app.spinner_frame % SPINNER_FRAMES.len()]
            ))
            .style(Style::default().fg(palette.dim_fg)),
            inner,
        );
        return;
    }

    if let Some(err) = &view.err {
        f.render_widget(
            Paragraph::new(format!("Error: {}", err))
                .style(Style::default().fg(palette.del_fg))
                .wrap(Wrap { trim: false }),
            inner,
        );
        return;
    }

    if !view.loaded {
        f.render_widget(
            Paragraph::new("not loaded yet — press r")
                .style(Style::default().fg(palette.dim_fg)),
            inner,
        );
        return;
    }

    let lines: Vec<Line> = view
        .lines
        .iter()
        .skip(view.scroll as usize)
        .take(inner.height as usize)
        .map(|l| Line::from(l.clone()))
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}
