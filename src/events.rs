//! Key and mouse dispatch.
//!
//! Events route through a fixed priority ladder: startup-error screen,
//! landing, help overlay, view picker, filter overlay, then the
//! diff/confirm/commit screens, and finally the active tab's handler.
//! Each layer either consumes the event or explicitly falls through.
//! Unrecognized keys are no-ops at every layer.

use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use crate::config::EscBehavior;
use crate::jobs::ActionId;
use crate::rows::{REPEAT_STEP, Row, actionable_rows};
use crate::{ActionMenu, App, COMMAND_VERBS, Screen, TAB_ORDER, Tab};

/// Handle a key press or repeat event.
pub fn handle_key(app: &mut App, key: KeyEvent) {
    // Fail-fast startup error: any key exits.
    if app.startup_err.is_some() {
        app.should_quit = true;
        return;
    }

    if app.screen == Screen::Landing {
        handle_landing_key(app, key);
        return;
    }

    if app.help_open {
        handle_help_key(app, key);
        return;
    }
    if app.view_picker.is_some() {
        handle_view_picker_key(app, key);
        return;
    }
    if app.filter_editing {
        handle_filter_key(app, key);
        return;
    }

    match app.screen {
        Screen::Diff => handle_diff_key(app, key),
        Screen::Confirm => handle_confirm_key(app, key),
        Screen::Commit => handle_commit_key(app, key),
        Screen::Tabs => handle_tab_screen_key(app, key),
        Screen::Landing => {}
    }
}

fn handle_landing_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Esc => {
            if app.esc_behavior == EscBehavior::EscBack {
                app.should_quit = true;
            }
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.landing.cursor = (app.landing.cursor + 1).min(TAB_ORDER.len() - 1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.landing.cursor = app.landing.cursor.saturating_sub(1);
        }
        KeyCode::Enter => app.set_tab(TAB_ORDER[app.landing.cursor]),
        KeyCode::Char(ch @ '1'..='4') => {
            let idx = (ch as usize - '1' as usize).min(TAB_ORDER.len() - 1);
            app.set_tab(TAB_ORDER[idx]);
        }
        _ => {}
    }
}

fn handle_help_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Enter | KeyCode::Char('?') | KeyCode::Char('q') => {
            app.help_open = false;
        }
        _ => {}
    }
}

fn handle_view_picker_key(app: &mut App, key: KeyEvent) {
    let Some(cursor) = app.view_picker else {
        return;
    };
    match key.code {
        KeyCode::Esc => app.view_picker = None,
        KeyCode::Char('j') | KeyCode::Down => {
            app.view_picker = Some((cursor + 1).min(TAB_ORDER.len() - 1));
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.view_picker = Some(cursor.saturating_sub(1));
        }
        KeyCode::Enter => {
            app.view_picker = None;
            app.set_tab(TAB_ORDER[cursor]);
        }
        KeyCode::Char(ch @ '1'..='4') => {
            app.view_picker = None;
            app.set_tab(TAB_ORDER[ch as usize - '1' as usize]);
        }
        _ => {}
    }
}

fn handle_filter_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.filter_editing = false;
            app.filter_query.clear();
            app.rebuild_rows();
            app.request_panel_load();
        }
        KeyCode::Enter => app.filter_editing = false,
        KeyCode::Backspace => {
            app.filter_query.pop();
            app.rebuild_rows();
            app.request_panel_load();
        }
        KeyCode::Char(ch)
            if !key.modifiers.contains(KeyModifiers::CONTROL)
                && !key.modifiers.contains(KeyModifiers::ALT) =>
        {
            app.filter_query.push(ch);
            app.rebuild_rows();
            app.request_panel_load();
        }
        _ => {}
    }
}

fn handle_diff_key(app: &mut App, key: KeyEvent) {
    // While the diff is still loading only Esc is honored.
    if app.diff_screen.loading && key.code != KeyCode::Esc {
        return;
    }

    let step = if key.kind == KeyEventKind::Repeat {
        REPEAT_STEP as u16
    } else {
        1
    };
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => {
            app.screen = Screen::Tabs;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            let max = app.diff_screen.lines.len().saturating_sub(1) as u16;
            app.diff_screen.scroll = app.diff_screen.scroll.saturating_add(step).min(max);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.diff_screen.scroll = app.diff_screen.scroll.saturating_sub(step);
        }
        KeyCode::Char('g') => app.diff_screen.scroll = 0,
        KeyCode::Char('G') => {
            app.diff_screen.scroll = app.diff_screen.lines.len().saturating_sub(1) as u16;
        }
        _ => {}
    }
}

fn handle_confirm_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            app.confirm_yes();
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            app.confirm_no();
        }
        _ => {}
    }
}

fn handle_commit_key(app: &mut App, key: KeyEvent) {
    let repeat = key.kind == KeyEventKind::Repeat;

    if key.modifiers.contains(KeyModifiers::ALT) {
        if let KeyCode::Char(ch @ '1'..='9') = key.code {
            app.commit_ui.apply_preset(ch as usize - '1' as usize);
            return;
        }
    }

    if key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Enter | KeyCode::Char('s'))
    {
        if repeat || app.busy_action.is_some() {
            return;
        }
        if !app.commit_ui.can_commit() {
            app.commit_ui.status = Some("empty commit message".to_string());
            return;
        }
        let message = app.commit_ui.message.clone();
        app.commit_ui.reset();
        app.screen = Screen::Tabs;
        app.dispatch_action(ActionId::GitCommit, Vec::new(), Some(message));
        return;
    }

    match key.code {
        KeyCode::Esc => app.screen = Screen::Tabs,
        KeyCode::Left => app.commit_ui.move_left(),
        KeyCode::Right => app.commit_ui.move_right(),
        KeyCode::Home => app.commit_ui.move_home(),
        KeyCode::End => app.commit_ui.move_end(),
        KeyCode::Backspace => app.commit_ui.backspace(),
        KeyCode::Delete => app.commit_ui.delete(),
        KeyCode::Enter => app.commit_ui.insert_char('\n'),
        KeyCode::Char(ch)
            if !key.modifiers.contains(KeyModifiers::CONTROL)
                && !key.modifiers.contains(KeyModifiers::ALT) =>
        {
            app.commit_ui.insert_char(ch);
        }
        _ => {}
    }
}

fn handle_tab_screen_key(app: &mut App, key: KeyEvent) {
    if app.action_menu.is_some() {
        handle_action_menu_key(app, key);
        return;
    }

    match key.code {
        KeyCode::Char('q') => match app.esc_behavior {
            // Only `q` from the landing screen truly exits in EscQuit mode.
            EscBehavior::EscQuit => app.screen = Screen::Landing,
            EscBehavior::EscBack => app.should_quit = true,
        },
        KeyCode::Esc => {
            if !app.filter_query.is_empty() {
                app.filter_query.clear();
                app.rebuild_rows();
                app.request_panel_load();
            } else {
                app.escape_from_tabs();
            }
        }
        KeyCode::Char('?') => app.help_open = true,
        KeyCode::Char('v') => app.view_picker = Some(app.tab.index()),
        KeyCode::Char('/') if app.tab == Tab::Status => app.filter_editing = true,
        KeyCode::Char('r') => app.refresh_active(),
        KeyCode::Char('b') => app.toggle_panel(),
        KeyCode::Char('T') => app.cycle_theme(),
        KeyCode::Char(ch @ '1'..='4') => {
            app.set_tab(TAB_ORDER[ch as usize - '1' as usize]);
        }
        KeyCode::Tab => {
            if app.panel.should_show(app.width) {
                app.panel.focused = !app.panel.focused;
            }
        }
        _ => {
            // Panel focus steals the overlapping scroll bindings.
            if app.panel.focused
                && matches!(
                    key.code,
                    KeyCode::Char('j') | KeyCode::Down | KeyCode::Char('k') | KeyCode::Up
                )
            {
                let step = if key.kind == KeyEventKind::Repeat {
                    REPEAT_STEP as i32
                } else {
                    1
                };
                match key.code {
                    KeyCode::Char('j') | KeyCode::Down => app.panel.scroll_by(step),
                    _ => app.panel.scroll_by(-step),
                }
                return;
            }

            match app.tab {
                Tab::Status => handle_status_key(app, key),
                Tab::Files => handle_files_key(app, key),
                Tab::Info => handle_info_key(app, key),
                Tab::Commands => handle_commands_key(app, key),
            }
        }
    }
}

fn handle_action_menu_key(app: &mut App, key: KeyEvent) {
    let Some(menu) = &mut app.action_menu else {
        return;
    };
    match key.code {
        KeyCode::Esc | KeyCode::Char('x') => app.action_menu = None,
        KeyCode::Char('j') | KeyCode::Down => {
            menu.cursor = (menu.cursor + 1).min(menu.items.len().saturating_sub(1));
        }
        KeyCode::Char('k') | KeyCode::Up => {
            menu.cursor = menu.cursor.saturating_sub(1);
        }
        KeyCode::Enter => {
            if key.kind == KeyEventKind::Repeat {
                return;
            }
            let action = menu.items.get(menu.cursor).copied();
            app.action_menu = None;
            if let Some(action) = action {
                let paths = selected_paths(app);
                app.request_action(action, paths);
            }
        }
        _ => {}
    }
}

/// Paths of the selected rows (range selection or just the cursor),
/// headers excluded.
fn selected_paths(app: &App) -> Vec<String> {
    actionable_rows(&app.rows, &app.sel)
        .iter()
        .filter_map(|r| r.path().map(str::to_string))
        .collect()
}

fn move_status_cursor(app: &mut App, delta: isize, extend: bool) {
    app.sel.move_by(&app.rows, delta, extend);
    app.panel.focused = false;
    app.request_panel_load();
}

fn handle_status_key(app: &mut App, key: KeyEvent) {
    let repeat = key.kind == KeyEventKind::Repeat;
    // Repeats accelerate pure motion and are swallowed for mutations.
    let step = if repeat { REPEAT_STEP as isize } else { 1 };
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);

    match key.code {
        KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('J') => {
            move_status_cursor(app, step, shift || key.code == KeyCode::Char('J'));
        }
        KeyCode::Up | KeyCode::Char('k') | KeyCode::Char('K') => {
            move_status_cursor(app, -step, shift || key.code == KeyCode::Char('K'));
        }
        KeyCode::Char('g') => move_status_cursor(app, -(app.rows.len() as isize), false),
        KeyCode::Char('G') => move_status_cursor(app, app.rows.len() as isize, false),
        KeyCode::Left | KeyCode::Char('h') => {
            if let Some(row) = app.rows.get(app.sel.cursor) {
                let section = row.section();
                if app.collapsed.insert(section) {
                    app.rebuild_rows();
                }
            }
        }
        KeyCode::Right | KeyCode::Char('l') => {
            if let Some(row) = app.rows.get(app.sel.cursor) {
                let section = row.section();
                if app.collapsed.remove(&section) {
                    app.rebuild_rows();
                }
            }
        }
        KeyCode::Enter => {
            if !repeat {
                app.activate_cursor_row();
            }
        }
        KeyCode::Char(' ') | KeyCode::Char('s') => {
            if !repeat {
                stage_toggle_selection(app);
            }
        }
        KeyCode::Char('a') => {
            if !repeat {
                let paths = drift_paths_in_selection(app);
                if !paths.is_empty() {
                    app.request_action(ActionId::Apply, paths);
                }
            }
        }
        KeyCode::Char('A') => {
            if !repeat {
                let paths: Vec<String> = app
                    .git
                    .entries
                    .iter()
                    .filter(|e| e.is_unstaged())
                    .map(|e| e.path.clone())
                    .collect();
                if !paths.is_empty() {
                    app.request_action(ActionId::GitStageAll, paths);
                }
            }
        }
        KeyCode::Char('d') => {
            if !repeat {
                let paths = git_paths_in_selection(app, false);
                if !paths.is_empty() {
                    app.request_action(ActionId::GitDiscard, paths);
                }
            }
        }
        KeyCode::Char('P') => {
            if !repeat {
                app.request_action(ActionId::GitPush, Vec::new());
            }
        }
        KeyCode::Char('p') => {
            if !repeat {
                app.request_action(ActionId::GitPull, Vec::new());
            }
        }
        KeyCode::Char('U') => {
            if !repeat {
                app.request_action(ActionId::GitUndoCommit, Vec::new());
            }
        }
        KeyCode::Char('f') => {
            if !repeat {
                app.request_action(ActionId::GitFetch, Vec::new());
            }
        }
        KeyCode::Char('c') => {
            if !app.service.is_read_only() {
                app.screen = Screen::Commit;
            }
        }
        KeyCode::Char('x') => open_action_menu(app),
        _ => {}
    }
}

/// Space/`s` on git rows: stage what is unstaged, unstage what is staged.
/// Drift rows fall back to apply.
fn stage_toggle_selection(app: &mut App) {
    let Some(row) = app.rows.get(app.sel.cursor) else {
        return;
    };
    match row {
        Row::GitFile { entry, .. } => {
            let action = if entry.is_staged() {
                ActionId::GitUnstage
            } else {
                ActionId::GitStage
            };
            let staged = entry.is_staged();
            let paths = git_paths_in_selection(app, staged);
            if !paths.is_empty() {
                app.request_action(action, paths);
            }
        }
        Row::Drift(_) => {
            let paths = drift_paths_in_selection(app);
            if !paths.is_empty() {
                app.request_action(ActionId::Apply, paths);
            }
        }
        _ => {}
    }
}

fn drift_paths_in_selection(app: &App) -> Vec<String> {
    actionable_rows(&app.rows, &app.sel)
        .iter()
        .filter_map(|r| match r {
            Row::Drift(fs) => Some(fs.path.clone()),
            _ => None,
        })
        .collect()
}

fn git_paths_in_selection(app: &App, staged: bool) -> Vec<String> {
    actionable_rows(&app.rows, &app.sel)
        .iter()
        .filter_map(|r| match r {
            Row::GitFile { entry, .. } if entry.is_staged() == staged => Some(entry.path.clone()),
            _ => None,
        })
        .collect()
}

fn open_action_menu(app: &mut App) {
    let Some(row) = app.rows.get(app.sel.cursor) else {
        return;
    };
    let items: Vec<ActionId> = match row {
        Row::Drift(_) => vec![ActionId::Apply, ActionId::ReAdd, ActionId::Forget, ActionId::Destroy],
        Row::GitFile { entry, .. } => {
            if entry.is_staged() {
                vec![ActionId::GitUnstage, ActionId::GitDiscard]
            } else {
                vec![ActionId::GitStage, ActionId::GitDiscard]
            }
        }
        Row::Commit { .. } => vec![ActionId::GitPush, ActionId::GitUndoCommit],
        Row::Header { .. } => return,
    };
    app.action_menu = Some(ActionMenu { items, cursor: 0 });
}

fn handle_files_key(app: &mut App, key: KeyEvent) {
    let repeat = key.kind == KeyEventKind::Repeat;
    let step = if repeat { REPEAT_STEP } else { 1 };

    match key.code {
        KeyCode::Down | KeyCode::Char('j') => {
            let len = app.files.len();
            if len > 0 {
                app.files.cursor = (app.files.cursor + step).min(len - 1);
                app.request_panel_load();
            }
        }
        KeyCode::Up | KeyCode::Char('k') => {
            app.files.cursor = app.files.cursor.saturating_sub(step);
            app.request_panel_load();
        }
        KeyCode::Char('g') => {
            app.files.cursor = 0;
            app.request_panel_load();
        }
        KeyCode::Char('G') => {
            app.files.cursor = app.files.len().saturating_sub(1);
            app.request_panel_load();
        }
        KeyCode::Enter => {
            if !repeat && app.busy_action.is_none() {
                if let Some(path) = app.files.selected().map(str::to_string) {
                    if app.files.selected_is_managed() {
                        app.open_file_content(path);
                    }
                }
            }
        }
        KeyCode::Char('u') => {
            if !repeat {
                app.toggle_search();
            }
        }
        KeyCode::Char('a') => {
            if !repeat && app.files.selected_is_managed() {
                if let Some(path) = app.files.selected().map(str::to_string) {
                    app.request_action(ActionId::ReAdd, vec![path]);
                }
            }
        }
        _ => {}
    }
}

fn handle_info_key(app: &mut App, key: KeyEvent) {
    let step = if key.kind == KeyEventKind::Repeat {
        REPEAT_STEP as u16
    } else {
        1
    };
    match key.code {
        KeyCode::Left | KeyCode::Char('h') => app.info.cycle(-1),
        KeyCode::Right | KeyCode::Char('l') => app.info.cycle(1),
        KeyCode::Down | KeyCode::Char('j') => {
            let view = app.info.active_view_mut();
            let max = view.lines.len().saturating_sub(1) as u16;
            view.scroll = view.scroll.saturating_add(step).min(max);
        }
        KeyCode::Up | KeyCode::Char('k') => {
            let view = app.info.active_view_mut();
            view.scroll = view.scroll.saturating_sub(step);
        }
        KeyCode::Char('g') => app.info.active_view_mut().scroll = 0,
        KeyCode::Char('G') => {
            let view = app.info.active_view_mut();
            view.scroll = view.lines.len().saturating_sub(1) as u16;
        }
        _ => {}
    }
}

fn handle_commands_key(app: &mut App, key: KeyEvent) {
    let repeat = key.kind == KeyEventKind::Repeat;
    let step = if repeat { REPEAT_STEP } else { 1 };

    match key.code {
        KeyCode::Down | KeyCode::Char('j') => {
            app.command_cursor = (app.command_cursor + step).min(COMMAND_VERBS.len() - 1);
        }
        KeyCode::Up | KeyCode::Char('k') => {
            app.command_cursor = app.command_cursor.saturating_sub(step);
        }
        KeyCode::Enter => {
            // A held-down Enter must not re-run the verb.
            if repeat {
                return;
            }
            let (verb, _) = COMMAND_VERBS[app.command_cursor];
            app.request_action(ActionId::RunVerb(verb), Vec::new());
        }
        _ => {}
    }
}

/// Handle a mouse event: wheel scrolling and click-to-select.
pub fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.startup_err.is_some() || app.screen == Screen::Confirm || app.help_open {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => scroll_by(app, 3, mouse),
        MouseEventKind::ScrollUp => scroll_by(app, -3, mouse),
        MouseEventKind::Down(MouseButton::Left) => handle_click(app, mouse),
        _ => {}
    }
}

fn scroll_by(app: &mut App, delta: i32, mouse: MouseEvent) {
    match app.screen {
        Screen::Diff => {
            let max = app.diff_screen.lines.len().saturating_sub(1) as u16;
            if delta > 0 {
                app.diff_screen.scroll =
                    app.diff_screen.scroll.saturating_add(delta as u16).min(max);
            } else {
                app.diff_screen.scroll = app.diff_screen.scroll.saturating_sub((-delta) as u16);
            }
        }
        Screen::Tabs => {
            let over_panel =
                app.panel.should_show(app.width) && mouse.column >= app.panel_x && app.panel_x > 0;
            if over_panel {
                app.panel.scroll_by(delta);
                return;
            }
            match app.tab {
                Tab::Status => {
                    app.sel.move_by(&app.rows, delta as isize, false);
                    app.request_panel_load();
                }
                Tab::Files => {
                    let len = app.files.len();
                    if len > 0 {
                        let cur = app.files.cursor as i32 + delta;
                        app.files.cursor = cur.clamp(0, len as i32 - 1) as usize;
                        app.request_panel_load();
                    }
                }
                Tab::Info => {
                    let view = app.info.active_view_mut();
                    let max = view.lines.len().saturating_sub(1) as u16;
                    if delta > 0 {
                        view.scroll = view.scroll.saturating_add(delta as u16).min(max);
                    } else {
                        view.scroll = view.scroll.saturating_sub((-delta) as u16);
                    }
                }
                Tab::Commands => {
                    let cur = app.command_cursor as i32 + delta;
                    app.command_cursor = cur.clamp(0, COMMAND_VERBS.len() as i32 - 1) as usize;
                }
            }
        }
        _ => {}
    }
}

fn handle_click(app: &mut App, mouse: MouseEvent) {
    if app.screen != Screen::Tabs || mouse.row < app.list_top {
        return;
    }
    if app.panel.should_show(app.width) && mouse.column >= app.panel_x && app.panel_x > 0 {
        app.panel.focused = true;
        return;
    }

    let offset = (mouse.row - app.list_top) as usize + app.list_offset;
    match app.tab {
        Tab::Status => {
            if offset < app.rows.len() {
                app.sel.cursor = offset;
                app.sel.clear();
                app.panel.focused = false;
                app.request_panel_load();
            }
        }
        Tab::Files => {
            if offset < app.files.len() {
                app.files.cursor = offset;
                app.request_panel_load();
            }
        }
        Tab::Commands => {
            if offset < COMMAND_VERBS.len() {
                app.command_cursor = offset;
            }
        }
        Tab::Info => {}
    }
}
