//! Preview panel: keyed content cache, width-driven visibility, and
//! viewport synchronization for the side pane.

use std::collections::{HashMap, HashSet};

use unicode_width::UnicodeWidthChar;

use crate::rows::Section;

/// Panel narrower than this is never shown.
pub const MIN_PANEL_WIDTH: u16 = 60;
/// Auto mode shows the panel at or above this terminal width.
pub const AUTO_PANEL_WIDTH: u16 = 90;
/// Entry count at which the whole cache is dropped.
pub const MAX_CACHE_SIZE: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PanelMode {
    Diff,
    Content,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PanelKey {
    pub path: String,
    pub mode: PanelMode,
    pub section: Section,
}

/// Errors shown inside the panel. `Friendly` covers expected conditions
/// and renders without the generic `Error:` prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PanelError {
    Friendly(String),
    Raw(String),
}

impl PanelError {
    pub fn user_message(&self) -> String {
        match self {
            PanelError::Friendly(msg) => msg.clone(),
            PanelError::Raw(msg) => format!("Error: {}", msg),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct PanelEntry {
    pub lines: Vec<String>,
    pub err: Option<PanelError>,
}

#[derive(Clone, Debug)]
struct PanelRender {
    width: u16,
    lines: Vec<String>,
}

pub struct PanelState {
    /// None = auto (width decides); Some(v) = user override.
    pub manual_override: Option<bool>,
    pub focused: bool,
    pub scroll: u16,
    cache: HashMap<PanelKey, PanelEntry>,
    pending: HashSet<PanelKey>,
    render: Option<PanelRender>,
    last_height: u16,
}

impl PanelState {
    pub fn new(manual_override: Option<bool>) -> Self {
        Self {
            manual_override,
            focused: false,
            scroll: 0,
            cache: HashMap::new(),
            pending: HashSet::new(),
            render: None,
            last_height: 0,
        }
    }

    pub fn should_show(&self, width: u16) -> bool {
        if width < MIN_PANEL_WIDTH {
            return false;
        }
        match self.manual_override {
            Some(v) => v,
            None => width >= AUTO_PANEL_WIDTH,
        }
    }

    /// First toggle inverts what auto mode currently shows; later toggles
    /// flip the stored override.
    pub fn toggle(&mut self, width: u16) {
        self.manual_override = Some(match self.manual_override {
            Some(v) => !v,
            None => !(width >= AUTO_PANEL_WIDTH),
        });
    }

    pub fn get(&self, key: &PanelKey) -> Option<&PanelEntry> {
        self.cache.get(key)
    }

    pub fn put(&mut self, key: PanelKey, entry: PanelEntry) {
        self.pending.remove(&key);
        if self.cache.len() >= MAX_CACHE_SIZE {
            self.cache.clear();
        }
        self.cache.insert(key, entry);
        self.render = None;
    }

    pub fn is_pending(&self, key: &PanelKey) -> bool {
        self.pending.contains(key)
    }

    pub fn mark_pending(&mut self, key: PanelKey) {
        self.pending.insert(key);
    }

    pub fn entry_count(&self) -> usize {
        self.cache.len()
    }

    /// Wholesale reset on tab switch.
    pub fn reset_for_tab(&mut self) {
        self.cache.clear();
        self.pending.clear();
        self.scroll = 0;
        self.render = None;
        self.focused = false;
    }

    pub fn scroll_by(&mut self, delta: i32) {
        if delta >= 0 {
            self.scroll = self.scroll.saturating_add(delta as u16);
        } else {
            self.scroll = self.scroll.saturating_sub((-delta) as u16);
        }
    }

    /// Wrapped lines for the current entry at the given geometry. The wrap
    /// cache is rebuilt whenever the width changes or nothing has been
    /// rendered yet; height only re-clamps the scroll offset.
    pub fn viewport(&mut self, source: &[String], width: u16, height: u16) -> Vec<String> {
        let stale = match &self.render {
            Some(r) => r.width != width,
            None => true,
        };
        if stale {
            let mut lines = Vec::new();
            for src in source {
                wrap_into(src, width as usize, &mut lines);
            }
            self.render = Some(PanelRender { width, lines });
        }

        if self.last_height != height {
            self.last_height = height;
        }

        let lines = &self.render.as_ref().unwrap().lines;
        let max_scroll = lines.len().saturating_sub(height as usize) as u16;
        if self.scroll > max_scroll {
            self.scroll = max_scroll;
        }
        lines
            .iter()
            .skip(self.scroll as usize)
            .take(height as usize)
            .cloned()
            .collect()
    }

    /// Drop the wrap cache without touching the content cache. Called when
    /// the entry under the cursor changes.
    pub fn invalidate_render(&mut self) {
        self.render = None;
        self.scroll = 0;
    }
}

fn wrap_into(src: &str, width: usize, out: &mut Vec<String>) {
    if width == 0 {
        out.push(String::new());
        return;
    }
    let mut cur = String::new();
    let mut w = 0usize;
    for ch in src.chars() {
        let cw = if ch == '\t' {
            4
        } else {
            UnicodeWidthChar::width(ch).unwrap_or(0)
        };
        if w + cw > width && !cur.is_empty() {
            out.push(std::mem::take(&mut cur));
            w = 0;
        }
        cur.push(ch);
        w += cw;
    }
    out.push(cur);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(path: &str) -> PanelKey {
        PanelKey {
            path: path.to_string(),
            mode: PanelMode::Diff,
            section: Section::Drift,
        }
    }

    fn entry(text: &str) -> PanelEntry {
        PanelEntry {
            lines: vec![text.to_string()],
            err: None,
        }
    }

    #[test]
    fn width_thresholds() {
        let panel = PanelState::new(None);
        assert!(panel.should_show(120));
        assert!(!panel.should_show(80));
        assert!(!panel.should_show(59));
    }

    #[test]
    fn min_width_beats_override() {
        let panel = PanelState::new(Some(true));
        assert!(!panel.should_show(50));
        assert!(panel.should_show(61));
    }

    #[test]
    fn first_toggle_inverts_auto() {
        // Auto would show at 120; first toggle hides.
        let mut panel = PanelState::new(None);
        panel.toggle(120);
        assert_eq!(panel.manual_override, Some(false));
        assert!(!panel.should_show(120));

        // Auto would hide at 80; first toggle shows.
        let mut panel = PanelState::new(None);
        panel.toggle(80);
        assert_eq!(panel.manual_override, Some(true));
        assert!(panel.should_show(80));

        // Later toggles just flip.
        panel.toggle(80);
        assert!(!panel.should_show(80));
        panel.toggle(80);
        assert!(panel.should_show(80));
    }

    #[test]
    fn cache_round_trip() {
        let mut panel = PanelState::new(None);
        panel.put(key("a"), entry("diff a"));
        let got = panel.get(&key("a")).unwrap();
        assert_eq!(got.lines, vec!["diff a".to_string()]);
        assert!(got.err.is_none());
    }

    #[test]
    fn cache_clears_wholesale_at_capacity() {
        let mut panel = PanelState::new(None);
        for i in 0..MAX_CACHE_SIZE {
            panel.put(key(&format!("f{}", i)), entry("x"));
        }
        assert_eq!(panel.entry_count(), MAX_CACHE_SIZE);

        // The insert that would exceed capacity drops everything first.
        panel.put(key("overflow"), entry("x"));
        assert_eq!(panel.entry_count(), 1);
        assert!(panel.get(&key("f0")).is_none());
        assert!(panel.get(&key("overflow")).is_some());
    }

    #[test]
    fn pending_cleared_by_put() {
        let mut panel = PanelState::new(None);
        panel.mark_pending(key("a"));
        assert!(panel.is_pending(&key("a")));
        panel.put(key("a"), entry("x"));
        assert!(!panel.is_pending(&key("a")));
    }

    #[test]
    fn reset_for_tab_drops_everything() {
        let mut panel = PanelState::new(None);
        panel.put(key("a"), entry("x"));
        panel.mark_pending(key("b"));
        panel.scroll = 7;
        panel.reset_for_tab();
        assert_eq!(panel.entry_count(), 0);
        assert!(!panel.is_pending(&key("b")));
        assert_eq!(panel.scroll, 0);
    }

    #[test]
    fn viewport_rebuilds_on_width_change() {
        let mut panel = PanelState::new(None);
        let source = vec!["abcdefghij".to_string()];
        let narrow = panel.viewport(&source, 5, 10);
        assert_eq!(narrow, vec!["abcde".to_string(), "fghij".to_string()]);

        let wide = panel.viewport(&source, 20, 10);
        assert_eq!(wide, vec!["abcdefghij".to_string()]);
    }

    #[test]
    fn viewport_clamps_scroll_to_height() {
        let mut panel = PanelState::new(None);
        let source: Vec<String> = (0..10).map(|i| format!("line {}", i)).collect();
        panel.scroll = 100;
        let visible = panel.viewport(&source, 40, 4);
        assert_eq!(visible.len(), 4);
        assert_eq!(panel.scroll, 6);
        assert_eq!(visible[0], "line 6");
    }

    #[test]
    fn friendly_errors_render_without_prefix() {
        let friendly = PanelError::Friendly("directory selected; preview skipped".into());
        assert!(!friendly.user_message().starts_with("Error:"));
        let raw = PanelError::Raw("exit status 1".into());
        assert!(raw.user_message().starts_with("Error:"));
    }
}
