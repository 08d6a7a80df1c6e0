//! Status tab rendering: the flattened section list plus the preview panel.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::panel::PanelMode;
use crate::rows::Row;
use crate::theme::Palette;
use crate::ui::{drift_icon, git_icon, styled_diff_line};
use crate::{App, SPINNER_FRAMES};

pub fn render_status_tab(app: &mut App, f: &mut Frame, area: Rect, palette: &Palette) {
    let show_panel = app.panel.should_show(app.width);
    let (list_area, panel_area) = if show_panel {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(area);
        app.panel_x = chunks[1].x;
        (chunks[0], Some(chunks[1]))
    } else {
        app.panel_x = 0;
        (area, None)
    };

    render_row_list(app, f, list_area, palette);
    if let Some(panel_area) = panel_area {
        render_panel(app, f, panel_area, palette);
    }
}

fn render_row_list(app: &mut App, f: &mut Frame, area: Rect, palette: &Palette) {
    let border = if app.panel.focused {
        palette.border_inactive
    } else {
        palette.accent_primary
    };
    let title = if app.filter_query.is_empty() {
        " changes ".to_string()
    } else {
        format!(" changes · filter: {} ", app.filter_query)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    app.list_top = inner.y;

    if app.rows.is_empty() {
        let text = if app.status_domain.loading || app.git_domain.loading {
            format!(
                "{} loading…",
                SPINNER_FRAMES[app.spinner_frame % SPINNER_FRAMES.len()]
            )
        } else {
            "✓ everything in sync".to_string()
        };
        f.render_widget(
            Paragraph::new(text).style(Style::default().fg(palette.dim_fg)),
            inner,
        );
        app.list_offset = 0;
        return;
    }

    let visible = inner.height as usize;
    let offset = if app.sel.cursor >= visible && visible > 0 {
        app.sel.cursor + 1 - visible
    } else {
        0
    };
    app.list_offset = offset;

    let lines: Vec<Line> = app
        .rows
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible)
        .map(|(i, row)| row_line(app, i, row, palette))
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

fn row_line<'a>(app: &App, idx: usize, row: &'a Row, palette: &Palette) -> Line<'a> {
    let is_cursor = idx == app.sel.cursor;
    let in_range = app.sel.contains(idx);
    let base = if is_cursor {
        Style::default()
            .bg(palette.selection_bg)
            .add_modifier(Modifier::BOLD)
    } else if in_range {
        Style::default().bg(palette.selection_bg)
    } else {
        Style::default()
    };

    match row {
        Row::Header {
            section,
            collapsed,
            count,
        } => {
            let arrow = if *collapsed { "▸" } else { "▾" };
            Line::from(Span::styled(
                format!("{} {} ({})", arrow, section.label(), count),
                base.fg(palette.header_fg).add_modifier(Modifier::BOLD),
            ))
        }
        Row::Drift(fs) => Line::from(vec![
            Span::styled(
                format!("  {} ", drift_icon(app.icon_mode, fs.target)),
                base.fg(palette.warn_fg),
            ),
            Span::styled(fs.path.clone(), base.fg(palette.fg)),
        ]),
        Row::GitFile { entry, .. } => Line::from(vec![
            Span::styled(
                format!("  {} ", git_icon(app.icon_mode, entry.x, entry.y)),
                base.fg(palette.accent_secondary),
            ),
            Span::styled(entry.path.clone(), base.fg(palette.fg)),
        ]),
        Row::Commit { entry, .. } => Line::from(vec![
            Span::styled(format!("  {} ", entry.short), base.fg(palette.dim_fg)),
            Span::styled(format!("{} ", entry.date), base.fg(palette.dim_fg)),
            Span::styled(entry.subject.clone(), base.fg(palette.fg)),
        ]),
    }
}

fn render_panel(app: &mut App, f: &mut Frame, area: Rect, palette: &Palette) {
    let border = if app.panel.focused {
        palette.accent_primary
    } else {
        palette.border_inactive
    };
    let key = app.panel_key_for_cursor();
    let title = match &key {
        Some(k) if k.mode == PanelMode::Diff => format!(" diff · {} ", k.path),
        Some(k) => format!(" {} ", k.path),
        None => " preview ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(key) = key else {
        f.render_widget(
            Paragraph::new("nothing selected").style(Style::default().fg(palette.dim_fg)),
            inner,
        );
        return;
    };

    let Some(entry) = app.panel.get(&key).cloned() else {
        f.render_widget(
            Paragraph::new(format!(
                "{} loading…",
                SPINNER_FRAMES[app.spinner_frame % SPINNER_FRAMES.len()]
            ))
            .style(Style::default().fg(palette.dim_fg)),
            inner,
        );
        return;
    };

    if let Some(err) = &entry.err {
        let style = match err {
            crate::panel::PanelError::Friendly(_) => Style::default().fg(palette.dim_fg),
            crate::panel::PanelError::Raw(_) => Style::default().fg(palette.del_fg),
        };
        f.render_widget(
            Paragraph::new(err.user_message())
                .style(style)
                .wrap(Wrap { trim: false }),
            inner,
        );
        return;
    }

    if entry.lines.is_empty() {
        f.render_widget(
            Paragraph::new("no differences").style(Style::default().fg(palette.dim_fg)),
            inner,
        );
        return;
    }

    let visible = app
        .panel
        .viewport(&entry.lines, inner.width, inner.height);
    let lines: Vec<Line> = visible
        .iter()
        .map(|l| styled_diff_line(l, palette))
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}
