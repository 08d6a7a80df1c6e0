//! Files tab rendering: managed files, deep-search results, content preview.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::highlight;
use crate::panel::PanelError;
use crate::theme::Palette;
use crate::{App, SPINNER_FRAMES, SearchPhase};

pub fn render_files_tab(app: &mut App, f: &mut Frame, area: Rect, palette: &Palette) {
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

    render_file_list(app, f, list_area, palette);
    if let Some(panel_area) = panel_area {
        render_content_panel(app, f, panel_area, palette);
    }
}

fn search_label(app: &App) -> &'static str {
    match app.search.phase {
        SearchPhase::Idle => "",
        SearchPhase::Searching => " · searching…",
        SearchPhase::Paused => " · search paused",
        SearchPhase::Done => " · search done",
    }
}

fn render_file_list(app: &mut App, f: &mut Frame, area: Rect, palette: &Palette) {
    let title = format!(
        " files · {} managed · {} unmanaged{} ",
        app.files.managed.len(),
        app.files.unmanaged.len(),
        search_label(app),
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent_primary))
        .title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    app.list_top = inner.y;

    if app.files.len() == 0 {
        let text = if app.managed_domain.loading {
            format!(
                "{} loading…",
                SPINNER_FRAMES[app.spinner_frame % SPINNER_FRAMES.len()]
            )
        } else {
            "no managed files".to_string()
        };
        f.render_widget(
            Paragraph::new(text).style(Style::default().fg(palette.dim_fg)),
            inner,
        );
        app.list_offset = 0;
        return;
    }

    let visible = inner.height as usize;
    let offset = if app.files.cursor >= visible && visible > 0 {
        app.files.cursor + 1 - visible
    } else {
        0
    };
    app.list_offset = offset;

    let managed_len = app.files.managed.len();
    let mut lines = Vec::new();
    for i in offset..(offset + visible).min(app.files.len()) {
        let is_cursor = i == app.files.cursor;
        let base = if is_cursor {
            Style::default()
                .bg(palette.selection_bg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let line = if i < managed_len {
            Line::from(Span::styled(
                format!("  {}", app.files.managed[i]),
                base.fg(palette.fg),
            ))
        } else {
            // Unmanaged hits from the deep search.
            Line::from(vec![
                Span::styled("? ", base.fg(palette.warn_fg)),
                Span::styled(
                    app.files.unmanaged[i - managed_len].clone(),
                    base.fg(palette.dim_fg),
                ),
            ])
        };
        lines.push(line);
    }
    f.render_widget(Paragraph::new(lines), inner);
}

fn render_content_panel(app: &mut App, f: &mut Frame, area: Rect, palette: &Palette) {
    let border = if app.panel.focused {
        palette.accent_primary
    } else {
        palette.border_inactive
    };
    let key = app.panel_key_for_cursor();
    let title = match &key {
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
        let text = if app.files.selected_is_managed() {
            "nothing selected"
        } else {
            "unmanaged file; no target content"
        };
        f.render_widget(
            Paragraph::new(text).style(Style::default().fg(palette.dim_fg)),
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
            PanelError::Friendly(_) => Style::default().fg(palette.dim_fg),
            PanelError::Raw(_) => Style::default().fg(palette.del_fg),
        };
        f.render_widget(
            Paragraph::new(err.user_message())
                .style(style)
                .wrap(Wrap { trim: false }),
            inner,
        );
        return;
    }

    // Content mode gets syntax highlighting, cached per path.
    let highlighted = match app.highlight_cache.get(&key.path) {
        Some(lines) => lines,
        None => {
            let lines = highlight::highlight_lines(&key.path, &entry.lines);
            app.highlight_cache.insert(key.path.clone(), lines.clone());
            lines
        }
    };

    let max_scroll = highlighted.len().saturating_sub(inner.height as usize) as u16;
    if app.panel.scroll > max_scroll {
        app.panel.scroll = max_scroll;
    }
    let lines: Vec<Line> = highlighted
        .into_iter()
        .skip(app.panel.scroll as usize)
        .take(inner.height as usize)
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}
