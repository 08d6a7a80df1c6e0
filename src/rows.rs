//! The flattened status list: heterogeneous rows grouped into sections,
//! plus the cursor/range selection model that walks them.

use std::collections::BTreeSet;

use crate::chezmoi::{CommitEntry, FileStatus, GitFileEntry, GitStatusData};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    Drift,
    Unstaged,
    Staged,
    Unpushed,
    Incoming,
}

impl Section {
    pub fn label(self) -> &'static str {
        match self {
            Section::Drift => "Drift",
            Section::Unstaged => "Unstaged",
            Section::Staged => "Staged",
            Section::Unpushed => "Unpushed commits",
            Section::Incoming => "Incoming commits",
        }
    }
}

#[derive(Clone, Debug)]
pub enum Row {
    Header {
        section: Section,
        collapsed: bool,
        count: usize,
    },
    Drift(FileStatus),
    GitFile {
        entry: GitFileEntry,
        section: Section,
    },
    Commit {
        entry: CommitEntry,
        section: Section,
    },
}

impl Row {
    pub fn section(&self) -> Section {
        match self {
            Row::Header { section, .. } => *section,
            Row::Drift(_) => Section::Drift,
            Row::GitFile { section, .. } => *section,
            Row::Commit { section, .. } => *section,
        }
    }

    pub fn is_header(&self) -> bool {
        matches!(self, Row::Header { .. })
    }

    /// Path for file-backed rows; commits and headers have none.
    pub fn path(&self) -> Option<&str> {
        match self {
            Row::Drift(fs) => Some(&fs.path),
            Row::GitFile { entry, .. } => Some(&entry.path),
            _ => None,
        }
    }

    pub fn commit_hash(&self) -> Option<&str> {
        match self {
            Row::Commit { entry, .. } => Some(&entry.hash),
            _ => None,
        }
    }
}

fn matches_filter(path: &str, filter: &str) -> bool {
    filter.is_empty() || path.to_lowercase().contains(&filter.to_lowercase())
}

/// Flatten the per-domain slices into one ordered row list. Headers always
/// precede their section's rows; empty sections are omitted entirely;
/// collapsed sections contribute only their header.
pub fn build_rows(
    statuses: &[FileStatus],
    git: &GitStatusData,
    unpushed: &[CommitEntry],
    incoming: &[CommitEntry],
    collapsed: &BTreeSet<Section>,
    filter: &str,
) -> Vec<Row> {
    let mut rows = Vec::new();

    let drift: Vec<&FileStatus> = statuses
        .iter()
        .filter(|fs| matches_filter(&fs.path, filter))
        .collect();
    push_section(&mut rows, Section::Drift, drift.len(), collapsed, |rows| {
        for fs in &drift {
            rows.push(Row::Drift((*fs).clone()));
        }
    });

    let unstaged: Vec<&GitFileEntry> = git
        .entries
        .iter()
        .filter(|e| e.is_unstaged() && matches_filter(&e.path, filter))
        .collect();
    push_section(
        &mut rows,
        Section::Unstaged,
        unstaged.len(),
        collapsed,
        |rows| {
            for e in &unstaged {
                rows.push(Row::GitFile {
                    entry: (*e).clone(),
                    section: Section::Unstaged,
                });
            }
        },
    );

    let staged: Vec<&GitFileEntry> = git
        .entries
        .iter()
        .filter(|e| e.is_staged() && matches_filter(&e.path, filter))
        .collect();
    push_section(
        &mut rows,
        Section::Staged,
        staged.len(),
        collapsed,
        |rows| {
            for e in &staged {
                rows.push(Row::GitFile {
                    entry: (*e).clone(),
                    section: Section::Staged,
                });
            }
        },
    );

    push_section(
        &mut rows,
        Section::Unpushed,
        unpushed.len(),
        collapsed,
        |rows| {
            for c in unpushed {
                rows.push(Row::Commit {
                    entry: c.clone(),
                    section: Section::Unpushed,
                });
            }
        },
    );

    push_section(
        &mut rows,
        Section::Incoming,
        incoming.len(),
        collapsed,
        |rows| {
            for c in incoming {
                rows.push(Row::Commit {
                    entry: c.clone(),
                    section: Section::Incoming,
                });
            }
        },
    );

    rows
}

fn push_section(
    rows: &mut Vec<Row>,
    section: Section,
    count: usize,
    collapsed: &BTreeSet<Section>,
    fill: impl FnOnce(&mut Vec<Row>),
) {
    if count == 0 {
        return;
    }
    let is_collapsed = collapsed.contains(&section);
    rows.push(Row::Header {
        section,
        collapsed: is_collapsed,
        count,
    });
    if !is_collapsed {
        fill(rows);
    }
}

/// Rows advanced per key-repeat event for pure cursor motion.
pub const REPEAT_STEP: usize = 3;

/// Cursor plus optional anchored range over a row list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub cursor: usize,
    pub active: bool,
    pub anchor: usize,
}

impl Selection {
    /// Move the cursor. Plain movement clears any active range; extending
    /// movement anchors at the pre-movement cursor and clamps at the
    /// anchor section's boundary rather than crossing into a neighbor.
    pub fn move_by(&mut self, rows: &[Row], delta: isize, extend: bool) {
        if rows.is_empty() {
            self.cursor = 0;
            self.active = false;
            return;
        }

        if extend && !self.active {
            self.active = true;
            self.anchor = self.cursor.min(rows.len() - 1);
        } else if !extend {
            self.active = false;
        }

        let max = rows.len() as isize - 1;
        let mut target = (self.cursor as isize + delta).clamp(0, max) as usize;

        if extend {
            let anchor_section = rows[self.anchor.min(rows.len() - 1)].section();
            if rows[target].section() != anchor_section {
                // Walk back toward the anchor until we re-enter its section.
                let step: isize = if delta > 0 { -1 } else { 1 };
                let mut t = target as isize;
                while t != self.anchor as isize && rows[t as usize].section() != anchor_section {
                    t += step;
                }
                target = t as usize;
            }
        }

        self.cursor = target;
    }

    pub fn clamp_to(&mut self, len: usize) {
        if len == 0 {
            self.cursor = 0;
            self.active = false;
            return;
        }
        if self.cursor >= len {
            self.cursor = len - 1;
        }
        if self.anchor >= len {
            self.active = false;
        }
    }

    pub fn clear(&mut self) {
        self.active = false;
    }

    /// Inclusive row range covered by the selection, or just the cursor.
    pub fn range(&self) -> (usize, usize) {
        if self.active {
            (self.cursor.min(self.anchor), self.cursor.max(self.anchor))
        } else {
            (self.cursor, self.cursor)
        }
    }

    pub fn contains(&self, idx: usize) -> bool {
        let (lo, hi) = self.range();
        self.active && idx >= lo && idx <= hi
    }
}

/// Non-header rows covered by the selection, for bulk actions.
pub fn actionable_rows<'a>(rows: &'a [Row], sel: &Selection) -> Vec<&'a Row> {
    let (lo, hi) = sel.range();
    rows.iter()
        .enumerate()
        .filter(|(i, r)| *i >= lo && *i <= hi && !r.is_header())
        .map(|(_, r)| r)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chezmoi::GitCommits;

    fn status(path: &str) -> FileStatus {
        FileStatus {
            path: path.to_string(),
            actual: ' ',
            target: 'M',
        }
    }

    fn git_entry(path: &str, x: char, y: char) -> GitFileEntry {
        GitFileEntry {
            path: path.to_string(),
            x,
            y,
            renamed_from: None,
        }
    }

    fn sample_rows() -> Vec<Row> {
        let statuses = vec![status(".bashrc"), status(".vimrc")];
        let git = GitStatusData {
            branch: "main".to_string(),
            ahead: 0,
            behind: 0,
            entries: vec![git_entry("dot_bashrc", ' ', 'M'), git_entry("dot_zshrc", 'A', ' ')],
        };
        let commits = GitCommits::default();
        build_rows(
            &statuses,
            &git,
            &commits.unpushed,
            &commits.incoming,
            &BTreeSet::new(),
            "",
        )
    }

    #[test]
    fn headers_precede_contiguous_sections() {
        let rows = sample_rows();
        // Drift header, 2 drift files, Unstaged header, 1 file, Staged header, 1 file.
        assert_eq!(rows.len(), 7);
        assert!(rows[0].is_header());
        assert_eq!(rows[0].section(), Section::Drift);
        assert_eq!(rows[1].section(), Section::Drift);
        assert_eq!(rows[2].section(), Section::Drift);
        assert!(rows[3].is_header());
        assert_eq!(rows[3].section(), Section::Unstaged);
        assert_eq!(rows[4].section(), Section::Unstaged);
        assert!(rows[5].is_header());
        assert_eq!(rows[5].section(), Section::Staged);

        let mut seen = Vec::new();
        for r in &rows {
            if seen.last() != Some(&r.section()) {
                seen.push(r.section());
            }
        }
        let mut dedup = seen.clone();
        dedup.dedup();
        assert_eq!(seen, dedup, "sections must be contiguous");
    }

    #[test]
    fn empty_sections_are_omitted() {
        let rows = build_rows(
            &[],
            &GitStatusData::default(),
            &[],
            &[],
            &BTreeSet::new(),
            "",
        );
        assert!(rows.is_empty());
    }

    #[test]
    fn collapsed_section_keeps_only_header() {
        let statuses = vec![status(".bashrc")];
        let collapsed: BTreeSet<Section> = [Section::Drift].into_iter().collect();
        let rows = build_rows(
            &statuses,
            &GitStatusData::default(),
            &[],
            &[],
            &collapsed,
            "",
        );
        assert_eq!(rows.len(), 1);
        assert!(matches!(rows[0], Row::Header { collapsed: true, .. }));
    }

    #[test]
    fn filter_narrows_rows() {
        let statuses = vec![status(".bashrc"), status(".vimrc")];
        let rows = build_rows(
            &statuses,
            &GitStatusData::default(),
            &[],
            &[],
            &BTreeSet::new(),
            "vim",
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].path(), Some(".vimrc"));
    }

    #[test]
    fn plain_movement_never_activates_selection() {
        let rows = sample_rows();
        let mut sel = Selection::default();
        for _ in 0..5 {
            sel.move_by(&rows, 1, false);
            assert!(!sel.active);
        }
        sel.move_by(&rows, -2, false);
        assert!(!sel.active);
    }

    #[test]
    fn shift_movement_anchors_at_previous_cursor() {
        let rows = sample_rows();
        let mut sel = Selection::default();
        sel.move_by(&rows, 1, false);
        assert_eq!(sel.cursor, 1);

        sel.move_by(&rows, 1, true);
        assert!(sel.active);
        assert_eq!(sel.anchor, 1);
        assert_eq!(sel.cursor, 2);
        assert_eq!(sel.range(), (1, 2));
    }

    #[test]
    fn plain_movement_clears_active_selection() {
        let rows = sample_rows();
        let mut sel = Selection::default();
        sel.move_by(&rows, 1, true);
        assert!(sel.active);
        sel.move_by(&rows, 1, false);
        assert!(!sel.active);
    }

    #[test]
    fn extension_clamps_at_section_boundary() {
        let rows = sample_rows();
        let mut sel = Selection {
            cursor: 1,
            active: false,
            anchor: 0,
        };
        // Extending far past the drift section stops at its last row (2).
        sel.move_by(&rows, 10, true);
        assert_eq!(sel.cursor, 2);
        assert_eq!(rows[sel.cursor].section(), Section::Drift);

        // And extending backwards from within a later section stops at
        // its header row.
        let mut sel = Selection {
            cursor: 4,
            active: false,
            anchor: 0,
        };
        sel.move_by(&rows, -10, true);
        assert_eq!(sel.cursor, 3);
        assert_eq!(rows[sel.cursor].section(), Section::Unstaged);
    }

    #[test]
    fn repeat_step_moves_multiple_rows() {
        let rows: Vec<Row> = (0..5)
            .map(|i| Row::Drift(status(&format!("f{}", i))))
            .collect();
        let mut sel = Selection::default();
        sel.move_by(&rows, 1, false);
        assert_eq!(sel.cursor, 1);

        let mut sel = Selection::default();
        sel.move_by(&rows, REPEAT_STEP as isize, false);
        assert_eq!(sel.cursor, REPEAT_STEP.min(rows.len() - 1));
    }

    #[test]
    fn actionable_rows_exclude_headers() {
        let rows = sample_rows();
        let sel = Selection {
            cursor: 0,
            active: true,
            anchor: 4,
        };
        let picked = actionable_rows(&rows, &sel);
        assert_eq!(picked.len(), 3);
        assert!(picked.iter().all(|r| !r.is_header()));
    }
}
