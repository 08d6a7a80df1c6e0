//! The Info tab: four independently loaded read-only sub-views.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InfoViewKind {
    Config,
    Full,
    Data,
    Doctor,
}

pub const INFO_VIEWS: [InfoViewKind; 4] = [
    InfoViewKind::Config,
    InfoViewKind::Full,
    InfoViewKind::Data,
    InfoViewKind::Doctor,
];

impl InfoViewKind {
    pub fn label(self) -> &'static str {
        match self {
            InfoViewKind::Config => "Config",
            InfoViewKind::Full => "Full",
            InfoViewKind::Data => "Data",
            InfoViewKind::Doctor => "Doctor",
        }
    }

    pub fn index(self) -> usize {
        INFO_VIEWS.iter().position(|v| *v == self).unwrap_or(0)
    }
}

#[derive(Clone, Debug, Default)]
pub struct InfoView {
    pub loading: bool,
    pub loaded: bool,
    pub lines: Vec<String>,
    pub err: Option<String>,
    pub scroll: u16,
    /// Width the wrap state was last built at; rebuilt lazily on first
    /// render at a different width.
    pub rendered_width: u16,
}

impl InfoView {
    pub fn set_content(&mut self, result: Result<String, String>) {
        self.loading = false;
        self.loaded = true;
        match result {
            Ok(text) => {
                self.lines = text.lines().map(str::to_string).collect();
                self.err = None;
            }
            Err(e) => {
                self.lines.clear();
                self.err = Some(e);
            }
        }
        self.scroll = 0;
        self.rendered_width = 0;
    }

    pub fn reset(&mut self) {
        self.loading = false;
        self.loaded = false;
        self.lines.clear();
        self.err = None;
        self.scroll = 0;
        self.rendered_width = 0;
    }
}

#[derive(Clone, Debug)]
pub struct InfoState {
    pub views: [InfoView; 4],
    pub active: usize,
}

impl InfoState {
    pub fn new() -> Self {
        Self {
            views: Default::default(),
            active: 0,
        }
    }

    pub fn active_view(&self) -> &InfoView {
        &self.views[self.active]
    }

    pub fn active_view_mut(&mut self) -> &mut InfoView {
        &mut self.views[self.active]
    }

    pub fn active_kind(&self) -> InfoViewKind {
        INFO_VIEWS[self.active]
    }

    pub fn select(&mut self, idx: usize) {
        if idx < INFO_VIEWS.len() {
            self.active = idx;
        }
    }

    pub fn cycle(&mut self, delta: isize) {
        let n = INFO_VIEWS.len() as isize;
        self.active = ((self.active as isize + delta).rem_euclid(n)) as usize;
    }

    pub fn view_mut(&mut self, kind: InfoViewKind) -> &mut InfoView {
        &mut self.views[kind.index()]
    }

    pub fn all_loading(&self) -> bool {
        self.views.iter().all(|v| v.loading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_wraps_both_ways() {
        let mut info = InfoState::new();
        info.cycle(-1);
        assert_eq!(info.active_kind(), InfoViewKind::Doctor);
        info.cycle(1);
        assert_eq!(info.active_kind(), InfoViewKind::Config);
        info.cycle(2);
        assert_eq!(info.active_kind(), InfoViewKind::Data);
    }

    #[test]
    fn content_resets_scroll_and_wrap() {
        let mut view = InfoView {
            scroll: 12,
            rendered_width: 80,
            ..Default::default()
        };
        view.set_content(Ok("a\nb".to_string()));
        assert!(view.loaded);
        assert!(!view.loading);
        assert_eq!(view.lines.len(), 2);
        assert_eq!(view.scroll, 0);
        assert_eq!(view.rendered_width, 0);
    }

    #[test]
    fn error_kept_separately_from_lines() {
        let mut view = InfoView::default();
        view.set_content(Err("doctor failed".to_string()));
        assert!(view.loaded);
        assert!(view.lines.is_empty());
        assert_eq!(view.err.as_deref(), Some("doctor failed"));
    }
}
