use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::prelude::*;
use std::{
    collections::BTreeSet,
    env,
    io,
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const VERSION: &str = env!("CARGO_PKG_VERSION");

mod chezmoi;
mod commit;
mod config;
mod events;
mod highlight;
mod info;
mod jobs;
mod panel;
mod rows;
mod search_loader;
mod theme;
mod ui;

use chezmoi::{ChezmoiService, DotfileService, FileStatus, GitCommits, GitStatusData};
use commit::CommitState;
use config::{EscBehavior, IconMode, InitialTab, Options, PanelModeOption};
use info::{INFO_VIEWS, InfoState};
use jobs::{ActionId, Dispatcher, JobResult};
use panel::{PanelEntry, PanelKey, PanelMode, PanelState};
use rows::{Row, Section, Selection, build_rows};
use search_loader::SearchLoader;

pub(crate) const SPINNER_FRAMES: [&str; 4] = ["|", "/", "-", "\\"];
const STATUS_TTL: Duration = Duration::from_secs(2);
const LANDING_STATS_DEBOUNCE: Duration = Duration::from_millis(150);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Screen {
    Landing,
    Tabs,
    Diff,
    Confirm,
    Commit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Tab {
    Status,
    Files,
    Info,
    Commands,
}

pub(crate) const TAB_ORDER: [Tab; 4] = [Tab::Status, Tab::Files, Tab::Info, Tab::Commands];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DomainKind {
    Status,
    Git,
    Managed,
    Info,
}

impl Tab {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Tab::Status => "Status",
            Tab::Files => "Files",
            Tab::Info => "Info",
            Tab::Commands => "Commands",
        }
    }

    pub(crate) fn index(self) -> usize {
        TAB_ORDER.iter().position(|t| *t == self).unwrap_or(0)
    }

    fn from_initial(initial: InitialTab) -> Self {
        match initial {
            InitialTab::Status => Tab::Status,
            InitialTab::Files => Tab::Files,
            InitialTab::Info => Tab::Info,
            InitialTab::Commands => Tab::Commands,
        }
    }

    fn domains(self) -> &'static [DomainKind] {
        match self {
            Tab::Status => &[DomainKind::Status, DomainKind::Git, DomainKind::Managed],
            Tab::Files => &[DomainKind::Managed],
            Tab::Info => &[DomainKind::Info],
            Tab::Commands => &[],
        }
    }
}

/// Load lifecycle of one data domain. At most one of `deferred`/`loading`
/// holds while the data is stale; both drop once `loaded`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct DomainLoad {
    pub deferred: bool,
    pub loading: bool,
    pub loaded: bool,
}

impl DomainLoad {
    fn begin(&mut self) {
        self.deferred = false;
        self.loading = true;
    }

    fn finish(&mut self) {
        self.loading = false;
        self.loaded = true;
    }

    fn settled(&self) -> bool {
        !self.deferred && !self.loading && self.loaded
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SearchPhase {
    Idle,
    Searching,
    Paused,
    Done,
}

pub(crate) struct SearchState {
    pub phase: SearchPhase,
    pub cancel: Option<CancellationToken>,
}

pub(crate) struct FilesState {
    pub managed: Vec<String>,
    pub unmanaged: Vec<String>,
    pub cursor: usize,
}

impl FilesState {
    pub fn len(&self) -> usize {
        self.managed.len() + self.unmanaged.len()
    }

    /// Path under the cursor; managed files come first.
    pub fn selected(&self) -> Option<&str> {
        if self.cursor < self.managed.len() {
            self.managed.get(self.cursor).map(String::as_str)
        } else {
            self.unmanaged
                .get(self.cursor - self.managed.len())
                .map(String::as_str)
        }
    }

    pub fn selected_is_managed(&self) -> bool {
        self.cursor < self.managed.len()
    }
}

pub(crate) struct ConfirmState {
    pub action: ActionId,
    pub label: String,
    pub paths: Vec<String>,
}

pub(crate) struct DiffScreenState {
    pub title: String,
    pub lines: Vec<String>,
    pub scroll: u16,
    pub err: Option<String>,
    pub loading: bool,
}

impl DiffScreenState {
    fn new() -> Self {
        Self {
            title: String::new(),
            lines: Vec::new(),
            scroll: 0,
            err: None,
            loading: false,
        }
    }
}

pub(crate) struct LandingState {
    pub cursor: usize,
    pub stats_ready: bool,
    stats_ready_at: Option<Instant>,
}

pub(crate) struct ActionMenu {
    pub items: Vec<ActionId>,
    pub cursor: usize,
}

/// Verbs offered on the Commands tab.
pub(crate) const COMMAND_VERBS: [(&str, &str); 5] = [
    ("apply", "Apply the source state to the destination"),
    ("update", "Pull the source repo and apply"),
    ("upgrade", "Upgrade the dotfile tool itself"),
    ("verify", "Verify the destination matches the target state"),
    ("re-add", "Re-add modified destination files to the source"),
];

pub(crate) struct App {
    pub service: Arc<dyn DotfileService + Send + Sync>,
    pub dispatcher: Dispatcher,
    pub search_loader: SearchLoader,
    pub jobs_rx: mpsc::Receiver<JobResult>,

    pub screen: Screen,
    pub tab: Tab,
    pub startup_err: Option<String>,
    pub should_quit: bool,

    pub r#gen: u64,

    pub status_domain: DomainLoad,
    pub statuses: Vec<FileStatus>,
    pub git_domain: DomainLoad,
    git_pending: u8,
    pub git: GitStatusData,
    pub commits: GitCommits,
    pub managed_domain: DomainLoad,
    pub info_domain: DomainLoad,
    pub info: InfoState,

    pub rows: Vec<Row>,
    pub sel: Selection,
    pub collapsed: BTreeSet<Section>,

    pub filter_query: String,
    pub filter_editing: bool,
    pub help_open: bool,
    pub view_picker: Option<usize>,
    pub action_menu: Option<ActionMenu>,

    pub panel: PanelState,
    pub highlight_cache: highlight::HighlightCache,
    pub confirm: Option<ConfirmState>,
    pub commit_ui: CommitState,
    pub diff_screen: DiffScreenState,

    pub busy_action: Option<ActionId>,
    pub status_message: Option<(String, Instant)>,
    pub spinner_frame: usize,

    pub landing: LandingState,
    pub files: FilesState,
    pub search: SearchState,
    pub command_cursor: usize,

    pub esc_behavior: EscBehavior,
    pub icon_mode: IconMode,
    pub breadcrumb: Option<String>,
    pub theme: theme::Theme,
    pub palette: theme::Palette,
    ui_settings_path: Option<PathBuf>,

    pub width: u16,
    pub height: u16,
    // Layout anchors recorded at draw time for mouse routing.
    pub panel_x: u16,
    pub list_top: u16,
    pub list_offset: usize,
}

impl App {
    fn new(options: Options) -> Self {
        let (tx, rx) = mpsc::channel::<JobResult>(64);
        let service = options.service.clone();
        let dispatcher = Dispatcher::new(service.clone(), tx.clone());
        let search_loader = SearchLoader::new(tx);

        let ui_settings_path = config::ui_settings_file_path();
        let saved = config::load_ui_settings(ui_settings_path.as_ref());
        let theme = saved.theme.unwrap_or(theme::Theme::Terminal);
        let icon_mode = saved.icon_mode.unwrap_or(options.icon_mode);

        let panel_override = match options.panel_mode {
            PanelModeOption::Auto => saved.panel_override,
            PanelModeOption::Show => Some(true),
            PanelModeOption::Hide => Some(false),
        };

        let initial_tab = Tab::from_initial(options.initial_tab);

        let mut app = Self {
            service,
            dispatcher,
            search_loader,
            jobs_rx: rx,

            screen: Screen::Landing,
            tab: initial_tab,
            startup_err: None,
            should_quit: false,

            r#gen: 0,

            status_domain: DomainLoad::default(),
            statuses: Vec::new(),
            git_domain: DomainLoad::default(),
            git_pending: 0,
            git: GitStatusData::default(),
            commits: GitCommits::default(),
            managed_domain: DomainLoad::default(),
            info_domain: DomainLoad::default(),
            info: InfoState::new(),

            rows: Vec::new(),
            sel: Selection::default(),
            collapsed: BTreeSet::new(),

            filter_query: String::new(),
            filter_editing: false,
            help_open: false,
            view_picker: None,
            action_menu: None,

            panel: PanelState::new(panel_override),
            highlight_cache: highlight::HighlightCache::new(16),
            confirm: None,
            commit_ui: CommitState::new(options.commit_presets),
            diff_screen: DiffScreenState::new(),

            busy_action: None,
            status_message: None,
            spinner_frame: 0,

            landing: LandingState {
                cursor: initial_tab.index(),
                stats_ready: false,
                stats_ready_at: None,
            },
            files: FilesState {
                managed: Vec::new(),
                unmanaged: Vec::new(),
                cursor: 0,
            },
            search: SearchState {
                phase: SearchPhase::Idle,
                cancel: None,
            },
            command_cursor: 0,

            esc_behavior: options.esc_behavior,
            icon_mode,
            breadcrumb: options.breadcrumb,
            theme,
            palette: theme::palette(theme),
            ui_settings_path,

            width: 0,
            height: 0,
            panel_x: 0,
            list_top: 0,
            list_offset: 0,
        };
        app.init();
        app
    }

    fn init(&mut self) {
        if let Err(e) = self.service.target_path() {
            self.startup_err = Some(e);
            return;
        }

        self.status_domain.deferred = true;
        self.managed_domain.deferred = true;
        self.info_domain.deferred = true;
        if self.service.is_read_only() {
            // Git data is inapplicable; the domain counts as settled.
            self.git_domain.loaded = true;
        } else {
            self.git_domain.deferred = true;
        }

        let tab = self.tab;
        self.load_deferred_for_tab(tab);
    }

    pub(crate) fn next_gen(&mut self) -> u64 {
        self.r#gen += 1;
        self.r#gen
    }

    /// Kick off loads for every domain of `tab` still marked deferred.
    /// Idempotent: once a domain is loaded (or loading), nothing happens.
    pub(crate) fn load_deferred_for_tab(&mut self, tab: Tab) -> bool {
        let job_gen = self.r#gen;
        let mut any = false;
        for domain in tab.domains() {
            match domain {
                DomainKind::Status if self.status_domain.deferred => {
                    self.status_domain.begin();
                    self.dispatcher.load_status(job_gen);
                    any = true;
                }
                DomainKind::Git if self.git_domain.deferred => {
                    self.git_domain.begin();
                    self.git_pending = 2;
                    self.dispatcher.load_git_status(job_gen);
                    self.dispatcher.load_git_commits(job_gen);
                    any = true;
                }
                DomainKind::Managed if self.managed_domain.deferred => {
                    self.managed_domain.begin();
                    self.dispatcher.load_managed(job_gen);
                    any = true;
                }
                DomainKind::Info if self.info_domain.deferred => {
                    self.info_domain.begin();
                    for view in INFO_VIEWS {
                        self.info.view_mut(view).loading = true;
                        self.dispatcher.load_info(job_gen, view);
                    }
                    any = true;
                }
                _ => {}
            }
        }
        any
    }

    /// Reload the active tab's data under a fresh generation, invalidating
    /// whatever is still in flight.
    pub(crate) fn refresh_active(&mut self) {
        let job_gen = self.next_gen();
        log::debug!("refresh tab {:?} gen {}", self.tab, job_gen);
        for domain in self.tab.domains() {
            match domain {
                DomainKind::Status if !self.status_domain.deferred => {
                    self.status_domain.begin();
                    self.dispatcher.load_status(job_gen);
                }
                DomainKind::Git if !self.git_domain.deferred && !self.service.is_read_only() => {
                    self.git_domain.begin();
                    self.git_pending = 2;
                    self.dispatcher.load_git_status(job_gen);
                    self.dispatcher.load_git_commits(job_gen);
                }
                DomainKind::Managed if !self.managed_domain.deferred => {
                    self.managed_domain.begin();
                    self.dispatcher.load_managed(job_gen);
                }
                DomainKind::Info if !self.info_domain.deferred => {
                    self.info_domain.begin();
                    for view in INFO_VIEWS {
                        self.info.view_mut(view).loading = true;
                        self.dispatcher.load_info(job_gen, view);
                    }
                }
                _ => {}
            }
        }
        self.panel.reset_for_tab();
        self.highlight_cache.clear();
    }

    pub(crate) fn set_tab(&mut self, tab: Tab) {
        if self.tab != tab {
            self.tab = tab;
            self.panel.reset_for_tab();
            self.sel = Selection::default();
        }
        self.screen = Screen::Tabs;
        self.load_deferred_for_tab(tab);
        self.rebuild_rows();
        self.request_panel_load();
    }

    pub(crate) fn all_landing_stats_loaded(&self) -> bool {
        self.status_domain.settled()
            && self.managed_domain.settled()
            && (self.git_domain.settled() || self.service.is_read_only())
    }

    /// Per-frame housekeeping: spinner, status TTL, landing debounce.
    pub(crate) fn tick(&mut self) {
        if self.is_loading() || self.busy_action.is_some() {
            self.spinner_frame = self.spinner_frame.wrapping_add(1);
        }

        if let Some((_, at)) = &self.status_message {
            if at.elapsed() > STATUS_TTL {
                self.status_message = None;
            }
        }

        if !self.landing.stats_ready && self.all_landing_stats_loaded() {
            match self.landing.stats_ready_at {
                // Debounced so near-simultaneous completions do not flash
                // two different layouts.
                Some(at) if at.elapsed() >= LANDING_STATS_DEBOUNCE => {
                    self.landing.stats_ready = true;
                }
                Some(_) => {}
                None => self.landing.stats_ready_at = Some(Instant::now()),
            }
        }
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.status_domain.loading
            || self.git_domain.loading
            || self.managed_domain.loading
            || self.info_domain.loading
            || self.search.phase == SearchPhase::Searching
            || self.diff_screen.loading
    }

    pub(crate) fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), Instant::now()));
    }

    pub(crate) fn rebuild_rows(&mut self) {
        self.rows = build_rows(
            &self.statuses,
            &self.git,
            &self.commits.unpushed,
            &self.commits.incoming,
            &self.collapsed,
            &self.filter_query,
        );
        self.sel.clamp_to(self.rows.len());
    }

    /// Panel cache key for the row or file under the cursor, if it has
    /// previewable content.
    pub(crate) fn panel_key_for_cursor(&self) -> Option<PanelKey> {
        match self.tab {
            Tab::Status => {
                let row = self.rows.get(self.sel.cursor)?;
                let path = row.path()?.to_string();
                Some(PanelKey {
                    path,
                    mode: PanelMode::Diff,
                    section: row.section(),
                })
            }
            Tab::Files => {
                if !self.files.selected_is_managed() {
                    return None;
                }
                let path = self.files.selected()?.to_string();
                Some(PanelKey {
                    path,
                    mode: PanelMode::Content,
                    section: Section::Drift,
                })
            }
            _ => None,
        }
    }

    /// Dispatch a panel load for the cursor's key unless cached or pending.
    pub(crate) fn request_panel_load(&mut self) {
        self.panel.invalidate_render();
        if self.screen != Screen::Tabs {
            return;
        }
        let Some(key) = self.panel_key_for_cursor() else {
            return;
        };
        if self.panel.get(&key).is_some() || self.panel.is_pending(&key) {
            return;
        }
        self.panel.mark_pending(key.clone());
        self.dispatcher.load_panel(self.r#gen, key);
    }

    // ---- actions ----

    /// Route a mutating action: suppressed in read-only mode, gated by the
    /// single busy slot, confirmed first when destructive or remote.
    pub(crate) fn request_action(&mut self, action: ActionId, paths: Vec<String>) {
        if self.service.is_read_only() {
            self.set_status("read-only mode");
            return;
        }
        if self.busy_action.is_some() {
            self.set_status("busy");
            return;
        }
        if action.needs_confirm() {
            let label = match paths.len() {
                0 => action.label(),
                1 => format!("{} {}", action.label(), paths[0]),
                n => format!("{} {} files", action.label(), n),
            };
            self.confirm = Some(ConfirmState {
                action,
                label,
                paths,
            });
            self.screen = Screen::Confirm;
            return;
        }
        self.dispatch_action(action, paths, None);
    }

    pub(crate) fn dispatch_action(
        &mut self,
        action: ActionId,
        paths: Vec<String>,
        message: Option<String>,
    ) {
        log::debug!("dispatch action {:?}", action);
        self.busy_action = Some(action);
        self.dispatcher.run_action(action, paths, message);
    }

    /// `y` on the confirm screen: clear the stored action first, then
    /// dispatch it. Returns true when a job was dispatched.
    pub(crate) fn confirm_yes(&mut self) -> bool {
        let Some(confirm) = self.confirm.take() else {
            return false;
        };
        self.screen = Screen::Tabs;
        self.dispatch_action(confirm.action, confirm.paths, None);
        true
    }

    /// `n`/Esc on the confirm screen: identical state clearing, no dispatch.
    pub(crate) fn confirm_no(&mut self) {
        self.confirm = None;
        self.screen = Screen::Tabs;
    }

    // ---- Enter semantics ----

    /// Enter on the status list: headers toggle collapse, files open their
    /// diff, commits open the commit patch. Ignored while an action is in
    /// flight.
    pub(crate) fn activate_cursor_row(&mut self) {
        if self.busy_action.is_some() {
            return;
        }
        let Some(row) = self.rows.get(self.sel.cursor).cloned() else {
            return;
        };
        match row {
            Row::Header { section, .. } => {
                if !self.collapsed.remove(&section) {
                    self.collapsed.insert(section);
                }
                self.rebuild_rows();
            }
            Row::Drift(fs) => self.open_file_diff(fs.path),
            Row::GitFile { entry, .. } => self.open_file_diff(entry.path),
            Row::Commit { entry, .. } => self.open_commit_diff(entry.hash, entry.subject),
        }
    }

    pub(crate) fn open_file_diff(&mut self, path: String) {
        let job_gen = self.r#gen;
        self.diff_screen = DiffScreenState {
            title: path.clone(),
            lines: Vec::new(),
            scroll: 0,
            err: None,
            loading: true,
        };
        self.screen = Screen::Diff;
        self.dispatcher.load_file_diff(job_gen, path);
    }

    /// Full-screen view of a managed file's target content (Files tab).
    pub(crate) fn open_file_content(&mut self, path: String) {
        let job_gen = self.r#gen;
        self.diff_screen = DiffScreenState {
            title: path.clone(),
            lines: Vec::new(),
            scroll: 0,
            err: None,
            loading: true,
        };
        self.screen = Screen::Diff;
        self.dispatcher.load_file_content(job_gen, path);
    }

    pub(crate) fn open_commit_diff(&mut self, hash: String, subject: String) {
        let job_gen = self.r#gen;
        self.diff_screen = DiffScreenState {
            title: subject,
            lines: Vec::new(),
            scroll: 0,
            err: None,
            loading: true,
        };
        self.screen = Screen::Diff;
        self.dispatcher.load_commit_diff(job_gen, hash);
    }

    // ---- deep search ----

    pub(crate) fn toggle_search(&mut self) {
        match self.search.phase {
            SearchPhase::Searching => {
                // The one operation with true cancellation.
                if let Some(token) = self.search.cancel.take() {
                    token.cancel();
                }
                self.search.phase = SearchPhase::Paused;
                self.set_status("search paused");
            }
            _ => {
                let Ok(dir) = self.service.target_path() else {
                    return;
                };
                let managed: BTreeSet<String> = self.files.managed.iter().cloned().collect();
                self.files.unmanaged.clear();
                let token = self.search_loader.request(dir, managed, self.r#gen);
                self.search.cancel = Some(token);
                self.search.phase = SearchPhase::Searching;
            }
        }
    }

    // ---- async completions ----

    pub(crate) fn handle_job(&mut self, job: JobResult) {
        if self.job_is_stale(&job) {
            log::debug!("discarding stale completion (gen {})", self.r#gen);
            return;
        }

        match job {
            // Action completions are not generation-tagged: the busy slot
            // must clear even across reloads.
            JobResult::Action { action, result } => {
                self.busy_action = None;
                match result {
                    Ok(msg) => {
                        log::debug!("action {:?} ok", action);
                        self.set_status(msg);
                        self.refresh_active();
                    }
                    Err(e) => self.set_status(format!("Error: {}", e)),
                }
            }
            JobResult::Status { result, .. } => {
                self.status_domain.finish();
                match result {
                    Ok(statuses) => self.statuses = statuses,
                    Err(e) => self.set_status(format!("Error: {}", e)),
                }
                self.rebuild_rows();
                self.request_panel_load();
            }
            JobResult::GitStatus { result, .. } => {
                self.git_pending = self.git_pending.saturating_sub(1);
                if self.git_pending == 0 {
                    self.git_domain.finish();
                }
                match result {
                    Ok(git) => self.git = git,
                    Err(e) => self.set_status(format!("Error: {}", e)),
                }
                self.rebuild_rows();
            }
            JobResult::GitCommits { result, .. } => {
                self.git_pending = self.git_pending.saturating_sub(1);
                if self.git_pending == 0 {
                    self.git_domain.finish();
                }
                match result {
                    Ok(commits) => self.commits = commits,
                    Err(e) => self.set_status(format!("Error: {}", e)),
                }
                self.rebuild_rows();
            }
            JobResult::Managed { result, .. } => {
                self.managed_domain.finish();
                match result {
                    Ok(files) => {
                        self.files.managed = files;
                        self.files.cursor = 0;
                    }
                    Err(e) => self.set_status(format!("Error: {}", e)),
                }
            }
            JobResult::Info { view, result, .. } => {
                self.info.view_mut(view).set_content(result);
                if self.info.views.iter().all(|v| v.loaded) {
                    self.info_domain.finish();
                }
            }
            JobResult::Panel { key, result, .. } => {
                let entry = match result {
                    Ok(content) => PanelEntry {
                        lines: content.lines().map(str::to_string).collect(),
                        err: None,
                    },
                    Err(err) => PanelEntry {
                        lines: Vec::new(),
                        err: Some(err),
                    },
                };
                self.panel.put(key, entry);
            }
            JobResult::DiffScreen { result, .. } => {
                self.diff_screen.loading = false;
                match result {
                    Ok(text) => {
                        self.diff_screen.lines = text.lines().map(str::to_string).collect();
                    }
                    Err(e) => self.diff_screen.err = Some(e),
                }
            }
            JobResult::Search { files, done, .. } => {
                self.files.unmanaged.extend(files);
                if done {
                    self.search.phase = SearchPhase::Done;
                    self.search.cancel = None;
                    let n = self.files.unmanaged.len();
                    self.set_status(format!("{} unmanaged files", n));
                }
            }
        }
    }

    fn job_is_stale(&self, job: &JobResult) -> bool {
        let job_gen = match job {
            JobResult::Status { job_gen, .. }
            | JobResult::GitStatus { job_gen, .. }
            | JobResult::GitCommits { job_gen, .. }
            | JobResult::Managed { job_gen, .. }
            | JobResult::Info { job_gen, .. }
            | JobResult::Panel { job_gen, .. }
            | JobResult::DiffScreen { job_gen, .. }
            | JobResult::Search { job_gen, .. } => *job_gen,
            JobResult::Action { .. } => return false,
        };
        job_gen != self.r#gen
    }

    // ---- misc ----

    pub(crate) fn on_resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        // Width changes invalidate the panel's wrap state.
        self.panel.invalidate_render();
    }

    pub(crate) fn cycle_theme(&mut self) {
        let idx = theme::THEME_ORDER
            .iter()
            .position(|t| *t == self.theme)
            .unwrap_or(0);
        self.theme = theme::THEME_ORDER[(idx + 1) % theme::THEME_ORDER.len()];
        self.palette = theme::palette(self.theme);
        self.set_status(format!("theme: {}", self.theme.label()));
        self.save_ui_settings();
    }

    pub(crate) fn toggle_panel(&mut self) {
        self.panel.toggle(self.width);
        self.save_ui_settings();
    }

    fn save_ui_settings(&self) {
        config::save_ui_settings(
            self.ui_settings_path.as_ref(),
            self.theme,
            self.icon_mode,
            self.panel.manual_override,
        );
    }

    /// Esc from a tab screen, per the configured behavior.
    pub(crate) fn escape_from_tabs(&mut self) {
        match self.esc_behavior {
            EscBehavior::EscQuit => self.screen = Screen::Landing,
            EscBehavior::EscBack => self.should_quit = true,
        }
    }

    pub(crate) fn handle_info_result_width(&mut self, width: u16) {
        // Info viewports are built lazily on first render at this width.
        let view = self.info.active_view_mut();
        if view.rendered_width != width {
            view.rendered_width = width;
            view.scroll = 0;
        }
    }
}

fn print_usage() {
    println!(
        "dotui {}\n\nUsage: dotui [options]\n\n  --bin <path>       dotfile tool binary (default: chezmoi)\n  --tab <name>       startup tab: status|files|info|commands\n  --panel <mode>     preview panel: auto|show|hide\n  --icons <mode>     icon mode: auto|nerd|ascii|none\n  --read-only        suppress all mutating actions\n  --esc-back         Esc exits instead of returning to the landing screen\n  --preset <msg>     commit message preset (repeatable)\n  --breadcrumb <s>   navigation trail shown in the title bar\n  --debug-log <path> write a structured event log\n  -V, --version      print version",
        VERSION
    );
}

struct CliArgs {
    bin: String,
    tab: Option<String>,
    panel: Option<String>,
    icons: Option<String>,
    read_only: bool,
    esc_back: bool,
    presets: Vec<String>,
    breadcrumb: Option<String>,
    debug_log: Option<PathBuf>,
}

fn parse_args() -> Result<Option<CliArgs>, String> {
    let mut args = CliArgs {
        bin: env::var("DOTUI_BIN").unwrap_or_else(|_| "chezmoi".to_string()),
        tab: None,
        panel: None,
        icons: None,
        read_only: false,
        esc_back: false,
        presets: Vec::new(),
        breadcrumb: None,
        debug_log: None,
    };

    let mut it = env::args().skip(1);
    while let Some(arg) = it.next() {
        let mut take = |name: &str| {
            it.next()
                .ok_or_else(|| format!("{} requires a value", name))
        };
        match arg.as_str() {
            "--version" | "-V" => {
                println!("dotui {}", VERSION);
                return Ok(None);
            }
            "--help" | "-h" => {
                print_usage();
                return Ok(None);
            }
            "--bin" => args.bin = take("--bin")?,
            "--tab" => args.tab = Some(take("--tab")?),
            "--panel" => args.panel = Some(take("--panel")?),
            "--icons" => args.icons = Some(take("--icons")?),
            "--read-only" => args.read_only = true,
            "--esc-back" => args.esc_back = true,
            "--preset" => args.presets.push(take("--preset")?),
            "--breadcrumb" => args.breadcrumb = Some(take("--breadcrumb")?),
            "--debug-log" => args.debug_log = Some(PathBuf::from(take("--debug-log")?)),
            other => return Err(format!("unknown argument {:?}", other)),
        }
    }
    Ok(Some(args))
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = match parse_args() {
        Ok(Some(cli)) => cli,
        Ok(None) => return Ok(()),
        Err(e) => {
            eprintln!("dotui: {}", e);
            std::process::exit(2);
        }
    };

    if let Some(path) = &cli.debug_log {
        if let Ok(file) = std::fs::File::create(path) {
            let _ = simplelog::WriteLogger::init(
                log::LevelFilter::Debug,
                simplelog::Config::default(),
                file,
            );
        }
    }

    let service = Arc::new(ChezmoiService::new(cli.bin, cli.read_only));
    let mut options = match Options::new(Some(service)).apply(
        cli.tab.as_deref(),
        cli.panel.as_deref(),
        cli.icons.as_deref(),
    ) {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("dotui: {}", e);
            std::process::exit(2);
        }
    };
    if cli.esc_back {
        options.esc_behavior = EscBehavior::EscBack;
    }
    options.commit_presets = cli.presets;
    options.breadcrumb = cli.breadcrumb;
    options.debug_log = cli.debug_log;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(options);
    let mut event_stream = EventStream::new();

    loop {
        app.tick();
        terminal.draw(|f| ui::draw_ui(f, &mut app))?;

        if app.should_quit {
            break;
        }

        let poll_timeout = tokio::time::sleep(Duration::from_millis(100));
        tokio::pin!(poll_timeout);

        tokio::select! {
            Some(job) = app.jobs_rx.recv() => {
                app.handle_job(job);
            }
            Some(event_result) = event_stream.next() => {
                if let Ok(event) = event_result {
                    match event {
                        Event::Key(key) if key.kind != KeyEventKind::Release => {
                            events::handle_key(&mut app, key);
                        }
                        Event::Mouse(mouse) => {
                            events::handle_mouse(&mut app, mouse);
                        }
                        Event::Resize(w, h) => app.on_resize(w, h),
                        _ => {}
                    }
                }
            }
            _ = &mut poll_timeout => {}
        }
    }

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chezmoi::tests::FakeService;

    fn options_with(service: FakeService) -> Options {
        Options::new(Some(Arc::new(service)))
    }

    fn app_with(service: FakeService) -> App {
        App::new(options_with(service))
    }

    fn drift(path: &str) -> FileStatus {
        FileStatus {
            path: path.to_string(),
            actual: ' ',
            target: 'M',
        }
    }

    fn service_with_target() -> FakeService {
        FakeService {
            target: Some(PathBuf::from("/home/user")),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn startup_failure_is_fail_fast() {
        let app = app_with(FakeService::default());
        assert!(app.startup_err.is_some());
        assert!(!app.status_domain.loading);
    }

    #[tokio::test]
    async fn initial_tab_status_loads_landing_domains_eagerly() {
        let app = app_with(service_with_target());
        assert!(app.status_domain.loading);
        assert!(app.git_domain.loading);
        assert!(app.managed_domain.loading);
        assert!(app.info_domain.deferred);
        assert!(!app.info_domain.loading);
    }

    #[tokio::test]
    async fn initial_tab_info_defers_landing_domains() {
        let mut options = options_with(service_with_target());
        options.initial_tab = InitialTab::Info;
        let app = App::new(options);

        assert!(app.info.views.iter().all(|v| v.loading));
        assert!(app.status_domain.deferred);
        assert!(app.git_domain.deferred);
        assert!(app.managed_domain.deferred);
    }

    #[tokio::test]
    async fn read_only_git_domain_counts_as_settled() {
        let mut service = service_with_target();
        service.read_only = true;
        let mut app = app_with(service);
        assert!(app.git_domain.settled());

        app.handle_job(JobResult::Status {
            job_gen: 0,
            result: Ok(vec![]),
        });
        app.handle_job(JobResult::Managed {
            job_gen: 0,
            result: Ok(vec![]),
        });
        assert!(app.all_landing_stats_loaded());
    }

    #[tokio::test]
    async fn stale_completion_leaves_state_unchanged() {
        let mut app = app_with(service_with_target());
        app.handle_job(JobResult::Status {
            job_gen: 0,
            result: Ok(vec![drift(".bashrc")]),
        });
        assert_eq!(app.statuses.len(), 1);

        // A reload bumps the generation; the old in-flight completion is
        // discarded without touching the data it would have written.
        app.refresh_active();
        app.handle_job(JobResult::Status {
            job_gen: 0,
            result: Ok(vec![drift(".bashrc"), drift(".vimrc")]),
        });
        assert_eq!(app.statuses.len(), 1);
        assert!(app.status_domain.loading);

        app.handle_job(JobResult::Status {
            job_gen: app.r#gen,
            result: Ok(vec![drift(".bashrc"), drift(".vimrc")]),
        });
        assert_eq!(app.statuses.len(), 2);
        assert!(app.status_domain.settled());
    }

    #[tokio::test]
    async fn deferred_load_is_idempotent_once_loaded() {
        let mut app = app_with(service_with_target());
        app.handle_job(JobResult::Status {
            job_gen: 0,
            result: Ok(vec![]),
        });
        app.handle_job(JobResult::GitStatus {
            job_gen: 0,
            result: Ok(GitStatusData::default()),
        });
        app.handle_job(JobResult::GitCommits {
            job_gen: 0,
            result: Ok(GitCommits::default()),
        });
        app.handle_job(JobResult::Managed {
            job_gen: 0,
            result: Ok(vec![]),
        });

        assert!(!app.load_deferred_for_tab(Tab::Status));
        assert!(app.status_domain.settled());
    }

    #[tokio::test]
    async fn git_domain_finishes_after_both_loads() {
        let mut app = app_with(service_with_target());
        assert!(app.git_domain.loading);
        app.handle_job(JobResult::GitStatus {
            job_gen: 0,
            result: Ok(GitStatusData::default()),
        });
        assert!(app.git_domain.loading);
        app.handle_job(JobResult::GitCommits {
            job_gen: 0,
            result: Ok(GitCommits::default()),
        });
        assert!(app.git_domain.settled());
    }

    #[tokio::test]
    async fn confirm_yes_clears_state_then_dispatches() {
        let mut app = app_with(service_with_target());
        app.screen = Screen::Tabs;
        app.request_action(ActionId::GitStageAll, vec![".bashrc".to_string()]);
        assert_eq!(app.screen, Screen::Confirm);
        let confirm = app.confirm.as_ref().unwrap();
        assert_eq!(confirm.action, ActionId::GitStageAll);
        assert!(!confirm.label.is_empty());

        assert!(app.confirm_yes());
        assert!(app.confirm.is_none());
        assert_eq!(app.screen, Screen::Tabs);
        assert_eq!(app.busy_action, Some(ActionId::GitStageAll));
    }

    #[tokio::test]
    async fn confirm_no_clears_without_dispatch() {
        let mut app = app_with(service_with_target());
        app.screen = Screen::Tabs;
        app.request_action(ActionId::GitPush, Vec::new());
        assert_eq!(app.screen, Screen::Confirm);

        app.confirm_no();
        assert!(app.confirm.is_none());
        assert_eq!(app.screen, Screen::Tabs);
        assert_eq!(app.busy_action, None);
    }

    #[tokio::test]
    async fn busy_slot_gates_second_action() {
        let mut app = app_with(service_with_target());
        app.screen = Screen::Tabs;
        app.request_action(ActionId::GitStage, vec![".bashrc".to_string()]);
        assert_eq!(app.busy_action, Some(ActionId::GitStage));

        app.request_action(ActionId::Apply, vec![".vimrc".to_string()]);
        assert_eq!(app.busy_action, Some(ActionId::GitStage));
        assert_eq!(app.status_message.as_ref().unwrap().0, "busy");
    }

    #[tokio::test]
    async fn action_completion_frees_busy_slot_and_refreshes() {
        let mut app = app_with(service_with_target());
        app.screen = Screen::Tabs;
        app.request_action(ActionId::GitStage, vec![".bashrc".to_string()]);
        let gen_before = app.r#gen;

        app.handle_job(JobResult::Action {
            action: ActionId::GitStage,
            result: Ok("staged".to_string()),
        });
        assert_eq!(app.busy_action, None);
        assert!(app.r#gen > gen_before);
    }

    #[tokio::test]
    async fn read_only_suppresses_mutations() {
        let mut service = service_with_target();
        service.read_only = true;
        let mut app = app_with(service);
        app.screen = Screen::Tabs;

        app.request_action(ActionId::GitPush, Vec::new());
        assert_eq!(app.screen, Screen::Tabs);
        assert!(app.confirm.is_none());
        assert_eq!(app.busy_action, None);
    }

    #[tokio::test]
    async fn enter_on_header_toggles_collapse_without_async() {
        let mut service = service_with_target();
        service.statuses = vec![drift(".bashrc")];
        let mut app = app_with(service);
        app.handle_job(JobResult::Status {
            job_gen: 0,
            result: Ok(vec![drift(".bashrc")]),
        });
        assert_eq!(app.rows.len(), 2);

        app.sel.cursor = 0;
        app.activate_cursor_row();
        assert!(app.collapsed.contains(&Section::Drift));
        assert_eq!(app.rows.len(), 1);
        assert_eq!(app.screen, Screen::Landing);

        app.activate_cursor_row();
        assert!(!app.collapsed.contains(&Section::Drift));
        assert_eq!(app.rows.len(), 2);
    }

    #[tokio::test]
    async fn enter_ignored_while_busy() {
        let mut app = app_with(service_with_target());
        app.handle_job(JobResult::Status {
            job_gen: 0,
            result: Ok(vec![drift(".bashrc")]),
        });
        app.busy_action = Some(ActionId::Apply);
        app.sel.cursor = 1;
        app.activate_cursor_row();
        assert_eq!(app.screen, Screen::Landing);
        assert!(!app.diff_screen.loading);
    }

    #[tokio::test]
    async fn panel_completion_fills_cache() {
        let mut app = app_with(service_with_target());
        let key = PanelKey {
            path: ".bashrc".to_string(),
            mode: PanelMode::Diff,
            section: Section::Drift,
        };
        app.panel.mark_pending(key.clone());
        app.handle_job(JobResult::Panel {
            job_gen: 0,
            key: key.clone(),
            result: Ok("+added".to_string()),
        });
        let entry = app.panel.get(&key).unwrap();
        assert_eq!(entry.lines, vec!["+added".to_string()]);
        assert!(!app.panel.is_pending(&key));
    }

    #[tokio::test]
    async fn stale_panel_completion_discarded() {
        let mut app = app_with(service_with_target());
        app.next_gen();
        let key = PanelKey {
            path: ".bashrc".to_string(),
            mode: PanelMode::Diff,
            section: Section::Drift,
        };
        app.handle_job(JobResult::Panel {
            job_gen: 0,
            key: key.clone(),
            result: Ok("old".to_string()),
        });
        assert!(app.panel.get(&key).is_none());
    }

    #[tokio::test]
    async fn search_results_stream_and_finish() {
        let mut app = app_with(service_with_target());
        app.handle_job(JobResult::Search {
            job_gen: 0,
            files: vec!["stray.txt".to_string()],
            done: false,
        });
        app.handle_job(JobResult::Search {
            job_gen: 0,
            files: vec!["other.txt".to_string()],
            done: true,
        });
        assert_eq!(app.files.unmanaged.len(), 2);
        assert_eq!(app.search.phase, SearchPhase::Done);
    }

    #[tokio::test]
    async fn landing_stats_debounce_waits() {
        let mut app = app_with(service_with_target());
        app.handle_job(JobResult::Status {
            job_gen: 0,
            result: Ok(vec![]),
        });
        app.handle_job(JobResult::GitStatus {
            job_gen: 0,
            result: Ok(GitStatusData::default()),
        });
        app.handle_job(JobResult::GitCommits {
            job_gen: 0,
            result: Ok(GitCommits::default()),
        });
        app.handle_job(JobResult::Managed {
            job_gen: 0,
            result: Ok(vec![]),
        });
        assert!(app.all_landing_stats_loaded());

        // First tick arms the debounce; readiness arrives only after the
        // delay has elapsed.
        app.tick();
        assert!(!app.landing.stats_ready);
        app.landing.stats_ready_at =
            Some(Instant::now() - LANDING_STATS_DEBOUNCE - Duration::from_millis(10));
        app.tick();
        assert!(app.landing.stats_ready);
    }

    #[tokio::test]
    async fn tab_switch_resets_panel_cache() {
        let mut app = app_with(service_with_target());
        let key = PanelKey {
            path: ".bashrc".to_string(),
            mode: PanelMode::Diff,
            section: Section::Drift,
        };
        app.panel.put(
            key.clone(),
            PanelEntry {
                lines: vec!["x".to_string()],
                err: None,
            },
        );
        app.set_tab(Tab::Files);
        assert!(app.panel.get(&key).is_none());
    }

    #[tokio::test]
    async fn info_domain_settles_after_all_views() {
        let mut options = options_with(service_with_target());
        options.initial_tab = InitialTab::Info;
        let mut app = App::new(options);

        for view in INFO_VIEWS {
            assert!(!app.info_domain.settled());
            app.handle_job(JobResult::Info {
                job_gen: 0,
                view,
                result: Ok("text".to_string()),
            });
        }
        assert!(app.info_domain.settled());
        assert!(app.info.views.iter().all(|v| v.loaded && !v.loading));
    }
}
