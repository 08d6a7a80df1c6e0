//! Screen rendering. Every draw helper takes the palette as an explicit
//! argument; nothing reads style state from globals.

pub mod tabs;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::config::IconMode;
use crate::theme::Palette;
use crate::{App, SPINNER_FRAMES, Screen, TAB_ORDER, Tab};

pub fn draw_ui(f: &mut Frame, app: &mut App) {
    let area = f.area();
    app.width = area.width;
    app.height = area.height;
    let palette = app.palette;

    f.render_widget(
        Block::default().style(Style::default().bg(palette.bg).fg(palette.fg)),
        area,
    );

    if let Some(err) = app.startup_err.clone() {
        draw_startup_error(f, area, &err, &palette);
        return;
    }

    match app.screen {
        Screen::Landing => draw_landing(f, area, app, &palette),
        Screen::Diff => draw_diff_screen(f, area, app, &palette),
        Screen::Commit => draw_commit_screen(f, area, app, &palette),
        Screen::Confirm => {
            draw_tabs_root(f, area, app, &palette);
            draw_confirm_modal(f, area, app, &palette);
        }
        Screen::Tabs => {
            draw_tabs_root(f, area, app, &palette);
            if app.help_open {
                draw_help_overlay(f, area, app, &palette);
            } else if app.view_picker.is_some() {
                draw_view_picker_overlay(f, area, app, &palette);
            } else if app.action_menu.is_some() {
                draw_action_menu_overlay(f, area, app, &palette);
            }
        }
    }
}

fn draw_startup_error(f: &mut Frame, area: Rect, err: &str, palette: &Palette) {
    let rect = centered_rect(60, 30, area);
    let lines = vec![
        Line::from(Span::styled(
            "dotui could not start",
            Style::default()
                .fg(palette.del_fg)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(err.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            "press any key to quit",
            Style::default().fg(palette.dim_fg),
        )),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.del_fg));
    f.render_widget(Clear, rect);
    f.render_widget(
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false }),
        rect,
    );
}

fn draw_landing(f: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(TAB_ORDER.len() as u16 + 2),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    let title = app.breadcrumb.clone().unwrap_or_else(|| "dotui".to_string());
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(
                title,
                Style::default()
                    .fg(palette.accent_primary)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                "  dotfiles, managed",
                Style::default().fg(palette.dim_fg),
            ),
        ]))
        .block(Block::default().borders(Borders::BOTTOM).border_style(
            Style::default().fg(palette.border_inactive),
        )),
        chunks[0],
    );

    let mut menu_lines = Vec::new();
    for (i, tab) in TAB_ORDER.iter().enumerate() {
        let marker = if i == app.landing.cursor { "▸ " } else { "  " };
        let style = if i == app.landing.cursor {
            Style::default()
                .fg(palette.accent_primary)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(palette.fg)
        };
        menu_lines.push(Line::from(vec![
            Span::styled(format!("{}{} ", marker, i + 1), Style::default().fg(palette.dim_fg)),
            Span::styled(tab.label().to_string(), style),
        ]));
    }
    f.render_widget(
        Paragraph::new(menu_lines).block(Block::default().borders(Borders::NONE)),
        chunks[1],
    );

    // The stats block appears only once every landing domain has settled,
    // behind a short debounce so staggered completions do not flash.
    let stats: Vec<Line> = if app.landing.stats_ready {
        let unpushed = app.commits.unpushed.len();
        vec![
            Line::from(""),
            stat_line("drift", app.statuses.len().to_string(), palette),
            stat_line("managed", app.files.managed.len().to_string(), palette),
            stat_line(
                "branch",
                if app.git.branch.is_empty() {
                    "-".to_string()
                } else {
                    format!("{} ↑{} ↓{}", app.git.branch, app.git.ahead, app.git.behind)
                },
                palette,
            ),
            stat_line("unpushed", unpushed.to_string(), palette),
        ]
    } else {
        vec![
            Line::from(""),
            Line::from(Span::styled(
                format!(
                    "{} gathering status…",
                    SPINNER_FRAMES[app.spinner_frame % SPINNER_FRAMES.len()]
                ),
                Style::default().fg(palette.dim_fg),
            )),
        ]
    };
    f.render_widget(Paragraph::new(stats), chunks[2]);

    let hint = if app.service.is_read_only() {
        "enter: open · q: quit · read-only"
    } else {
        "enter: open · 1-4: jump · q: quit"
    };
    f.render_widget(
        Paragraph::new(Span::styled(hint, Style::default().fg(palette.dim_fg))),
        chunks[3],
    );
}

fn stat_line(label: &str, value: String, palette: &Palette) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:>9}  ", label), Style::default().fg(palette.dim_fg)),
        Span::styled(value, Style::default().fg(palette.fg)),
    ])
}

fn draw_tabs_root(f: &mut Frame, area: Rect, app: &mut App, palette: &Palette) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    draw_title_bar(f, chunks[0], app, palette);

    match app.tab {
        Tab::Status => tabs::render_status_tab(app, f, chunks[1], palette),
        Tab::Files => tabs::render_files_tab(app, f, chunks[1], palette),
        Tab::Info => tabs::render_info_tab(app, f, chunks[1], palette),
        Tab::Commands => tabs::render_commands_tab(app, f, chunks[1], palette),
    }

    draw_status_bar(f, chunks[2], app, palette);

    if app.filter_editing {
        draw_filter_overlay(f, chunks[2], app, palette);
    }
}

fn draw_title_bar(f: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let mut spans = vec![Span::styled(
        format!(
            " {} ",
            app.breadcrumb.clone().unwrap_or_else(|| "dotui".to_string())
        ),
        Style::default()
            .fg(palette.accent_primary)
            .add_modifier(Modifier::BOLD),
    )];

    for tab in TAB_ORDER {
        let style = if tab == app.tab {
            Style::default()
                .fg(palette.btn_fg)
                .bg(palette.accent_primary)
        } else {
            Style::default().fg(palette.dim_fg)
        };
        spans.push(Span::styled(format!(" {} ", tab.label()), style));
        spans.push(Span::raw(" "));
    }

    if !app.git.branch.is_empty() {
        spans.push(Span::styled(
            format!("  {} ↑{} ↓{}", app.git.branch, app.git.ahead, app.git.behind),
            Style::default().fg(palette.accent_secondary),
        ));
    }
    if app.service.is_read_only() {
        spans.push(Span::styled(
            "  [read-only]",
            Style::default().fg(palette.warn_fg),
        ));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_status_bar(f: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let left = if let Some((msg, _)) = &app.status_message {
        msg.clone()
    } else {
        match app.tab {
            Tab::Status => "j/k: move · shift: select · enter: diff · s: stage · x: actions · ?: help".to_string(),
            Tab::Files => "j/k: move · enter: view · u: search unmanaged · a: re-add".to_string(),
            Tab::Info => "h/l: view · j/k: scroll · r: reload".to_string(),
            Tab::Commands => "j/k: move · enter: run".to_string(),
        }
    };

    let mut spans = vec![Span::styled(
        format!(" {}", left),
        Style::default().fg(palette.dim_fg),
    )];
    if let Some(action) = app.busy_action {
        spans.push(Span::styled(
            format!(
                "  {} {}…",
                SPINNER_FRAMES[app.spinner_frame % SPINNER_FRAMES.len()],
                action.label()
            ),
            Style::default().fg(palette.warn_fg),
        ));
    } else if app.is_loading() {
        spans.push(Span::styled(
            format!("  {}", SPINNER_FRAMES[app.spinner_frame % SPINNER_FRAMES.len()]),
            Style::default().fg(palette.accent_secondary),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_diff_screen(f: &mut Frame, area: Rect, app: &mut App, palette: &Palette) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent_primary))
        .title(format!(" {} ", app.diff_screen.title));
    let inner = block.inner(area);
    f.render_widget(block, area);

    if app.diff_screen.loading {
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

    if let Some(err) = &app.diff_screen.err {
        f.render_widget(
            Paragraph::new(format!("Error: {}", err))
                .style(Style::default().fg(palette.del_fg))
                .wrap(Wrap { trim: false }),
            inner,
        );
        return;
    }

    let max = app
        .diff_screen
        .lines
        .len()
        .saturating_sub(inner.height as usize) as u16;
    if app.diff_screen.scroll > max {
        app.diff_screen.scroll = max;
    }
    let lines: Vec<Line> = app
        .diff_screen
        .lines
        .iter()
        .skip(app.diff_screen.scroll as usize)
        .take(inner.height as usize)
        .map(|l| styled_diff_line(l, palette))
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_commit_screen(f: &mut Frame, area: Rect, app: &mut App, palette: &Palette) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),
            Constraint::Length(app.commit_ui.presets.len() as u16 + 2),
            Constraint::Length(1),
        ])
        .split(area);

    let editor_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent_primary))
        .title(" commit message ");
    let inner = editor_block.inner(chunks[0]);
    f.render_widget(editor_block, chunks[0]);

    app.commit_ui.ensure_cursor_visible(inner.height as usize);
    let text: Vec<Line> = app
        .commit_ui
        .message
        .split('\n')
        .skip(app.commit_ui.scroll_y as usize)
        .take(inner.height as usize)
        .map(|l| Line::from(l.to_string()))
        .collect();
    f.render_widget(Paragraph::new(text), inner);

    let (line, col) = app.commit_ui.line_col();
    let cursor_y = inner.y + (line as u16).saturating_sub(app.commit_ui.scroll_y);
    let cursor_x = inner.x + col as u16;
    if cursor_y < inner.y + inner.height && cursor_x < inner.x + inner.width {
        f.set_cursor_position((cursor_x, cursor_y));
    }

    let mut preset_lines = Vec::new();
    for (i, preset) in app.commit_ui.presets.iter().enumerate() {
        preset_lines.push(Line::from(vec![
            Span::styled(format!(" alt+{} ", i + 1), Style::default().fg(palette.dim_fg)),
            Span::styled(preset.clone(), Style::default().fg(palette.fg)),
        ]));
    }
    f.render_widget(
        Paragraph::new(preset_lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.border_inactive))
                .title(" presets "),
        ),
        chunks[1],
    );

    let hint = app
        .commit_ui
        .status
        .clone()
        .unwrap_or_else(|| "ctrl+enter: commit · esc: back".to_string());
    f.render_widget(
        Paragraph::new(Span::styled(hint, Style::default().fg(palette.dim_fg))),
        chunks[2],
    );
}

fn draw_confirm_modal(f: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let Some(confirm) = &app.confirm else {
        return;
    };
    let rect = centered_rect(50, 20, area);
    f.render_widget(Clear, rect);

    let lines = vec![
        Line::from(Span::styled(
            format!("{}?", confirm.label),
            Style::default().fg(palette.fg).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("y", Style::default().fg(palette.ok_fg).add_modifier(Modifier::BOLD)),
            Span::styled(": confirm   ", Style::default().fg(palette.dim_fg)),
            Span::styled("n/esc", Style::default().fg(palette.del_fg).add_modifier(Modifier::BOLD)),
            Span::styled(": cancel", Style::default().fg(palette.dim_fg)),
        ]),
    ];
    f.render_widget(
        Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(palette.warn_fg))
                    .style(Style::default().bg(palette.menu_bg))
                    .title(" confirm "),
            )
            .wrap(Wrap { trim: false }),
        rect,
    );
}

fn draw_help_overlay(f: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let rect = centered_rect(70, 70, area);
    f.render_widget(Clear, rect);

    let mut lines = vec![
        help_line("1-4", "switch tab", palette),
        help_line("j/k ↑/↓", "move cursor (hold to accelerate)", palette),
        help_line("shift+j/k", "extend selection within a section", palette),
        help_line("enter", "open diff / toggle section", palette),
        help_line("tab", "focus preview panel", palette),
        help_line("b", "toggle preview panel", palette),
        help_line("/", "filter rows", palette),
        help_line("r", "refresh", palette),
        help_line("v", "view picker", palette),
        help_line("T", "cycle theme", palette),
        Line::from(""),
    ];
    match app.tab {
        Tab::Status => {
            lines.push(help_line("s/space", "stage · unstage · apply", palette));
            lines.push(help_line("a", "apply selected drift", palette));
            lines.push(help_line("A", "stage all", palette));
            lines.push(help_line("d", "discard", palette));
            lines.push(help_line("c", "commit", palette));
            lines.push(help_line("P/p", "push / pull", palette));
            lines.push(help_line("U", "undo last commit", palette));
            lines.push(help_line("x", "action menu", palette));
        }
        Tab::Files => {
            lines.push(help_line("u", "deep-search unmanaged (again: pause)", palette));
            lines.push(help_line("a", "re-add selected file", palette));
        }
        Tab::Info => lines.push(help_line("h/l", "switch info view", palette)),
        Tab::Commands => lines.push(help_line("enter", "run command", palette)),
    }

    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.accent_primary))
                .style(Style::default().bg(palette.menu_bg))
                .title(" keys "),
        ),
        rect,
    );
}

fn help_line(keys: &str, what: &str, palette: &Palette) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!(" {:>10}  ", keys),
            Style::default().fg(palette.accent_secondary),
        ),
        Span::styled(what.to_string(), Style::default().fg(palette.fg)),
    ])
}

fn draw_view_picker_overlay(f: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let Some(cursor) = app.view_picker else {
        return;
    };
    let rect = centered_rect(30, 30, area);
    f.render_widget(Clear, rect);

    let lines: Vec<Line> = TAB_ORDER
        .iter()
        .enumerate()
        .map(|(i, tab)| {
            let style = if i == cursor {
                Style::default()
                    .fg(palette.accent_primary)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(palette.fg)
            };
            Line::from(Span::styled(format!(" {} {}", i + 1, tab.label()), style))
        })
        .collect();

    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.accent_primary))
                .style(Style::default().bg(palette.menu_bg))
                .title(" go to "),
        ),
        rect,
    );
}

fn draw_action_menu_overlay(f: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let Some(menu) = &app.action_menu else {
        return;
    };
    let height = (menu.items.len() as u16 + 2).min(area.height);
    let width = 30u16.min(area.width);
    let rect = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };
    f.render_widget(Clear, rect);

    let lines: Vec<Line> = menu
        .items
        .iter()
        .enumerate()
        .map(|(i, action)| {
            let style = if i == menu.cursor {
                Style::default()
                    .fg(palette.accent_primary)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(palette.fg)
            };
            Line::from(Span::styled(format!(" {}", action.label()), style))
        })
        .collect();

    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.accent_secondary))
                .style(Style::default().bg(palette.menu_bg))
                .title(" actions "),
        ),
        rect,
    );
}

fn draw_filter_overlay(f: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let line = Line::from(vec![
        Span::styled(" filter: ", Style::default().fg(palette.accent_secondary)),
        Span::styled(app.filter_query.clone(), Style::default().fg(palette.fg)),
        Span::styled("▏", Style::default().fg(palette.accent_primary)),
    ]);
    f.render_widget(Paragraph::new(line).style(Style::default().bg(palette.menu_bg)), area);
}

/// Centered sub-rectangle, percent-sized. Shared by every modal.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);
    horizontal[1]
}

/// Color one unified-diff line by its leading marker.
pub(crate) fn styled_diff_line(line: &str, palette: &Palette) -> Line<'static> {
    let style = if line.starts_with("@@") {
        Style::default().fg(palette.hunk_fg)
    } else if line.starts_with('+') && !line.starts_with("+++") {
        Style::default().fg(palette.add_fg)
    } else if line.starts_with('-') && !line.starts_with("---") {
        Style::default().fg(palette.del_fg)
    } else if line.starts_with("diff ")
        || line.starts_with("index ")
        || line.starts_with("+++ ")
        || line.starts_with("--- ")
        || line.starts_with("new file")
        || line.starts_with("deleted file")
    {
        Style::default()
            .fg(palette.dim_fg)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(palette.fg)
    };
    Line::from(Span::styled(line.to_string(), style))
}

/// Marker shown before a drift row, honoring the configured icon mode.
pub(crate) fn drift_icon(mode: IconMode, target: char) -> &'static str {
    match mode {
        IconMode::None => " ",
        IconMode::Ascii => match target {
            'A' => "A",
            'D' => "D",
            'R' => "R",
            _ => "M",
        },
        IconMode::Auto | IconMode::Nerd => match target {
            'A' => "+",
            'D' => "×",
            'R' => "▶",
            _ => "✎",
        },
    }
}

/// Marker for a git row from its porcelain code.
pub(crate) fn git_icon(mode: IconMode, x: char, y: char) -> &'static str {
    let code = if x == '?' { '?' } else if y != ' ' { y } else { x };
    match mode {
        IconMode::None => " ",
        _ => match code {
            '?' => "?",
            'A' => "+",
            'D' => "×",
            'R' => "→",
            _ => "~",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme;

    #[test]
    fn diff_lines_classified_by_marker() {
        let palette = theme::palette(theme::Theme::Terminal);
        let add = styled_diff_line("+added", &palette);
        assert_eq!(add.spans[0].style.fg, Some(palette.add_fg));
        let del = styled_diff_line("-gone", &palette);
        assert_eq!(del.spans[0].style.fg, Some(palette.del_fg));
        let hunk = styled_diff_line("@@ -1,2 +1,2 @@", &palette);
        assert_eq!(hunk.spans[0].style.fg, Some(palette.hunk_fg));
        let meta = styled_diff_line("+++ b/.bashrc", &palette);
        assert_eq!(meta.spans[0].style.fg, Some(palette.dim_fg));
        let ctx = styled_diff_line(" unchanged", &palette);
        assert_eq!(ctx.spans[0].style.fg, Some(palette.fg));
    }

    #[test]
    fn icon_modes_differ() {
        assert_eq!(drift_icon(IconMode::Ascii, 'M'), "M");
        assert_eq!(drift_icon(IconMode::Nerd, 'M'), "✎");
        assert_eq!(drift_icon(IconMode::None, 'A'), " ");
        assert_eq!(git_icon(IconMode::Ascii, '?', '?'), "?");
    }

    #[test]
    fn centered_rect_stays_inside() {
        let area = Rect::new(0, 0, 100, 40);
        let rect = centered_rect(50, 50, area);
        assert!(rect.x >= area.x && rect.right() <= area.right());
        assert!(rect.y >= area.y && rect.bottom() <= area.bottom());
    }
}
