//! Syntax highlighting for file content shown in the preview panel.

use std::num::NonZeroUsize;
use std::sync::OnceLock;

use lru::LruCache;
use parking_lot::RwLock;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;

fn syntax_set() -> &'static SyntaxSet {
    static SET: OnceLock<SyntaxSet> = OnceLock::new();
    SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn theme() -> &'static Theme {
    static THEME: OnceLock<Theme> = OnceLock::new();
    THEME.get_or_init(|| {
        let mut set = ThemeSet::load_defaults();
        set.themes
            .remove("base16-ocean.dark")
            .expect("default theme set includes base16-ocean.dark")
    })
}

/// Highlighted content keyed by path, so scrolling the panel does not
/// re-run syntect. Whole entries are cheap to rebuild, so a small LRU is
/// plenty.
pub struct HighlightCache {
    cache: RwLock<LruCache<String, Vec<Line<'static>>>>,
}

impl HighlightCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(16).unwrap());
        Self {
            cache: RwLock::new(LruCache::new(cap)),
        }
    }

    pub fn get(&self, path: &str) -> Option<Vec<Line<'static>>> {
        self.cache.write().get(path).cloned()
    }

    pub fn insert(&self, path: String, lines: Vec<Line<'static>>) {
        self.cache.write().put(path, lines);
    }

    pub fn clear(&self) {
        self.cache.write().clear();
    }
}

/// Highlight `lines` as the language implied by `path`'s extension.
/// Unknown extensions fall back to plain text.
pub fn highlight_lines(path: &str, lines: &[String]) -> Vec<Line<'static>> {
    let set = syntax_set();
    let ext = path.rsplit('.').next().unwrap_or("");
    let syntax = set
        .find_syntax_by_extension(ext)
        .unwrap_or_else(|| set.find_syntax_plain_text());

    let mut hl = HighlightLines::new(syntax, theme());
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        let Ok(ranges) = hl.highlight_line(line, set) else {
            out.push(Line::from(line.clone()));
            continue;
        };
        let spans: Vec<Span<'static>> = ranges
            .into_iter()
            .map(|(style, text)| {
                let fg = style.foreground;
                Span::styled(
                    text.to_string(),
                    Style::default().fg(Color::Rgb(fg.r, fg.g, fg.b)),
                )
            })
            .collect();
        out.push(Line::from(spans));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extension_falls_back_to_plain() {
        let lines = vec!["hello world".to_string()];
        let out = highlight_lines("notes.xyzzy", &lines);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn cache_round_trip_and_eviction() {
        let cache = HighlightCache::new(2);
        cache.insert("a".to_string(), vec![Line::from("a")]);
        cache.insert("b".to_string(), vec![Line::from("b")]);
        assert!(cache.get("a").is_some());
        // "b" is now least-recent; inserting "c" evicts it.
        cache.insert("c".to_string(), vec![Line::from("c")]);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
    }

    #[test]
    fn rust_source_gets_multiple_spans() {
        let lines = vec!["fn main() {}".to_string()];
        let out = highlight_lines("main.rs", &lines);
        assert!(out[0].spans.len() > 1);
    }
}
