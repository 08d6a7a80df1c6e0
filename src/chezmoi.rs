//! The external dotfile-tool collaborator.
//!
//! Everything the UI knows about dotfiles comes through [`DotfileService`].
//! The production implementation shells out to a chezmoi-compatible binary;
//! tests substitute an in-memory fake.

use std::{io, path::Path, path::PathBuf, process::Command};

/// One managed file with pending drift.
///
/// `actual` is the effect of the last apply, `target` what an apply would
/// do now. Codes follow chezmoi status: 'A' added, 'M' modified,
/// 'D' deleted, 'R' script, ' ' no change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileStatus {
    pub path: String,
    pub actual: char,
    pub target: char,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GitFileEntry {
    pub path: String,
    pub x: char,
    pub y: char,
    pub renamed_from: Option<String>,
}

impl GitFileEntry {
    pub fn is_staged(&self) -> bool {
        self.x != ' ' && self.x != '?'
    }

    pub fn is_unstaged(&self) -> bool {
        self.y != ' ' || self.x == '?'
    }
}

#[derive(Clone, Debug, Default)]
pub struct GitStatusData {
    pub branch: String,
    pub ahead: u32,
    pub behind: u32,
    pub entries: Vec<GitFileEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitEntry {
    pub hash: String,
    pub short: String,
    pub date: String,
    pub author: String,
    pub subject: String,
}

#[derive(Clone, Debug, Default)]
pub struct GitCommits {
    pub unpushed: Vec<CommitEntry>,
    pub incoming: Vec<CommitEntry>,
}

/// Blocking operations of the dotfile tool. Invoked from
/// `tokio::task::spawn_blocking`; the handle itself is never mutated, so a
/// shared `Arc` may issue calls from any number of in-flight jobs.
pub trait DotfileService {
    /// Destination directory the tool manages. Failing to resolve it is a
    /// startup-fatal condition.
    fn target_path(&self) -> Result<PathBuf, String>;

    fn status(&self) -> Result<Vec<FileStatus>, String>;
    fn diff(&self, path: &str) -> Result<String, String>;
    fn managed(&self) -> Result<Vec<String>, String>;
    fn cat_file(&self, path: &str) -> Result<String, String>;

    fn cat_config(&self) -> Result<String, String>;
    fn dump_config(&self) -> Result<String, String>;
    fn data(&self) -> Result<String, String>;
    fn doctor(&self) -> Result<String, String>;

    fn git_status(&self) -> Result<GitStatusData, String>;
    fn git_commits(&self) -> Result<GitCommits, String>;
    fn show_commit(&self, hash: &str) -> Result<String, String>;

    fn apply(&self, paths: &[String]) -> Result<(), String>;
    fn re_add(&self, paths: &[String]) -> Result<(), String>;
    fn forget(&self, paths: &[String]) -> Result<(), String>;
    fn destroy(&self, paths: &[String]) -> Result<(), String>;

    fn git_add(&self, paths: &[String]) -> Result<(), String>;
    fn git_unstage(&self, paths: &[String]) -> Result<(), String>;
    fn git_discard(&self, paths: &[String]) -> Result<(), String>;
    fn git_commit(&self, message: &str) -> Result<(), String>;
    fn git_push(&self) -> Result<(), String>;
    fn git_pull(&self) -> Result<(), String>;
    fn git_fetch(&self) -> Result<(), String>;
    fn git_undo_commit(&self) -> Result<(), String>;

    fn run_verb(&self, verb: &str) -> Result<String, String>;

    /// When true the UI suppresses every mutating action and hint.
    fn is_read_only(&self) -> bool;
}

/// Production service driving the `chezmoi` binary.
pub struct ChezmoiService {
    bin: String,
    read_only: bool,
}

impl ChezmoiService {
    pub fn new(bin: impl Into<String>, read_only: bool) -> Self {
        Self {
            bin: bin.into(),
            read_only,
        }
    }

    fn run(&self, args: &[&str]) -> io::Result<std::process::Output> {
        Command::new(&self.bin)
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GCM_INTERACTIVE", "never")
            .env("GIT_PAGER", "cat")
            .env("PAGER", "cat")
            .env("GIT_EDITOR", ":")
            .env("EDITOR", ":")
            .output()
    }

    fn run_ok(&self, args: &[&str]) -> Result<String, String> {
        let out = self.run(args).map_err(|e| e.to_string())?;
        if !out.status.success() {
            return Err(String::from_utf8_lossy(&out.stderr).trim().to_string());
        }
        Ok(String::from_utf8_lossy(&out.stdout).to_string())
    }

    fn run_unit(&self, args: &[&str]) -> Result<(), String> {
        self.run_ok(args).map(|_| ())
    }

    fn guard_mutation(&self) -> Result<(), String> {
        if self.read_only {
            return Err("service is read-only".to_string());
        }
        Ok(())
    }

    fn run_git(&self, git_args: &[&str]) -> Result<String, String> {
        let mut args = vec!["git", "--"];
        args.extend_from_slice(git_args);
        self.run_ok(&args)
    }

    fn list_commits(&self, range: &str) -> Result<Vec<CommitEntry>, String> {
        let out = self.run_git(&[
            "log",
            "--no-color",
            "--date=short",
            "--max-count",
            "50",
            "--pretty=format:%H\t%h\t%ad\t%an\t%s",
            range,
        ]);
        // A repo with no upstream has no range to ask about; treat that as
        // an empty list rather than an error.
        match out {
            Ok(text) => Ok(parse_commit_lines(&text)),
            Err(e) if e.contains("no upstream") || e.contains("unknown revision") => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

impl DotfileService for ChezmoiService {
    fn target_path(&self) -> Result<PathBuf, String> {
        let out = self.run_ok(&["target-path"])?;
        let path = out.trim();
        if path.is_empty() {
            return Err("empty target path".to_string());
        }
        Ok(PathBuf::from(path))
    }

    fn status(&self) -> Result<Vec<FileStatus>, String> {
        let out = self.run_ok(&["status"])?;
        Ok(parse_status_lines(&out))
    }

    fn diff(&self, path: &str) -> Result<String, String> {
        self.run_ok(&["diff", "--", path])
    }

    fn managed(&self) -> Result<Vec<String>, String> {
        let out = self.run_ok(&["managed", "--include", "files"])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn cat_file(&self, path: &str) -> Result<String, String> {
        self.run_ok(&["cat", "--", path])
    }

    fn cat_config(&self) -> Result<String, String> {
        self.run_ok(&["cat-config"])
    }

    fn dump_config(&self) -> Result<String, String> {
        self.run_ok(&["dump-config"])
    }

    fn data(&self) -> Result<String, String> {
        self.run_ok(&["data"])
    }

    fn doctor(&self) -> Result<String, String> {
        self.run_ok(&["doctor"])
    }

    fn git_status(&self) -> Result<GitStatusData, String> {
        let out = self
            .run(&["git", "--", "status", "--porcelain=v1", "-z", "-b"])
            .map_err(|e| e.to_string())?;
        if !out.status.success() {
            return Err(String::from_utf8_lossy(&out.stderr).trim().to_string());
        }
        Ok(parse_porcelain_status(&out.stdout))
    }

    fn git_commits(&self) -> Result<GitCommits, String> {
        let unpushed = self.list_commits("@{u}..HEAD")?;
        let incoming = self.list_commits("HEAD..@{u}")?;
        Ok(GitCommits { unpushed, incoming })
    }

    fn show_commit(&self, hash: &str) -> Result<String, String> {
        self.run_git(&["show", "--no-color", "--stat", "--patch", hash])
    }

    fn apply(&self, paths: &[String]) -> Result<(), String> {
        self.guard_mutation()?;
        let mut args = vec!["apply", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.run_unit(&args)
    }

    fn re_add(&self, paths: &[String]) -> Result<(), String> {
        self.guard_mutation()?;
        let mut args = vec!["re-add", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.run_unit(&args)
    }

    fn forget(&self, paths: &[String]) -> Result<(), String> {
        self.guard_mutation()?;
        let mut args = vec!["forget", "--force", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.run_unit(&args)
    }

    fn destroy(&self, paths: &[String]) -> Result<(), String> {
        self.guard_mutation()?;
        let mut args = vec!["destroy", "--force", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.run_unit(&args)
    }

    fn git_add(&self, paths: &[String]) -> Result<(), String> {
        self.guard_mutation()?;
        let mut args = vec!["git", "--", "add", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.run_unit(&args)
    }

    fn git_unstage(&self, paths: &[String]) -> Result<(), String> {
        self.guard_mutation()?;
        let mut args = vec!["git", "--", "restore", "--staged", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.run_unit(&args)
    }

    fn git_discard(&self, paths: &[String]) -> Result<(), String> {
        self.guard_mutation()?;
        let mut args = vec!["git", "--", "checkout", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.run_unit(&args)
    }

    fn git_commit(&self, message: &str) -> Result<(), String> {
        self.guard_mutation()?;
        self.run_unit(&["git", "--", "commit", "-m", message])
    }

    fn git_push(&self) -> Result<(), String> {
        self.guard_mutation()?;
        self.run_unit(&["git", "--", "push"])
    }

    fn git_pull(&self) -> Result<(), String> {
        self.guard_mutation()?;
        self.run_unit(&["git", "--", "pull", "--rebase"])
    }

    fn git_fetch(&self) -> Result<(), String> {
        self.run_unit(&["git", "--", "fetch", "--prune"])
    }

    fn git_undo_commit(&self) -> Result<(), String> {
        self.guard_mutation()?;
        self.run_unit(&["git", "--", "reset", "--soft", "HEAD~1"])
    }

    fn run_verb(&self, verb: &str) -> Result<String, String> {
        self.guard_mutation()?;
        self.run_ok(&[verb])
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }
}

fn parse_status_lines(out: &str) -> Vec<FileStatus> {
    let mut entries = Vec::new();
    for line in out.lines() {
        if line.len() < 4 {
            continue;
        }
        let mut chars = line.chars();
        let actual = chars.next().unwrap_or(' ');
        let target = chars.next().unwrap_or(' ');
        let path = line[2..].trim().to_string();
        if path.is_empty() {
            continue;
        }
        entries.push(FileStatus {
            path,
            actual,
            target,
        });
    }
    entries
}

fn parse_commit_lines(out: &str) -> Vec<CommitEntry> {
    let mut entries = Vec::new();
    for line in out.lines() {
        let mut it = line.splitn(5, '\t');
        let hash = it.next().unwrap_or("").trim().to_string();
        let short = it.next().unwrap_or("").trim().to_string();
        let date = it.next().unwrap_or("").trim().to_string();
        let author = it.next().unwrap_or("").trim().to_string();
        let subject = it.next().unwrap_or("").trim().to_string();
        if hash.is_empty() {
            continue;
        }
        entries.push(CommitEntry {
            hash,
            short,
            date,
            author,
            subject,
        });
    }
    entries
}

fn parse_porcelain_status(stdout: &[u8]) -> GitStatusData {
    let mut data = GitStatusData::default();

    let items: Vec<&[u8]> = stdout.split(|b| *b == 0).filter(|s| !s.is_empty()).collect();
    let mut i = 0;
    while i < items.len() {
        let s = String::from_utf8_lossy(items[i]).to_string();
        if let Some(branch_line) = s.strip_prefix("## ") {
            parse_branch_line(&mut data, branch_line);
            i += 1;
            continue;
        }

        if s.len() >= 3 {
            let x = s.chars().next().unwrap_or(' ');
            let y = s.chars().nth(1).unwrap_or(' ');

            if &s[0..2] == "??" {
                data.entries.push(GitFileEntry {
                    path: s[3..].to_string(),
                    x: '?',
                    y: '?',
                    renamed_from: None,
                });
                i += 1;
                continue;
            }

            // Renames and copies list the new path here; the origin path
            // follows as the next NUL item.
            if matches!(x, 'R' | 'C') {
                let path = s[3..].to_string();
                let origin = if i + 1 < items.len() {
                    Some(String::from_utf8_lossy(items[i + 1]).to_string())
                } else {
                    None
                };
                data.entries.push(GitFileEntry {
                    path,
                    x,
                    y,
                    renamed_from: origin,
                });
                i += 2;
                continue;
            }

            data.entries.push(GitFileEntry {
                path: s[3..].to_string(),
                x,
                y,
                renamed_from: None,
            });
        }
        i += 1;
    }

    data
}

fn parse_branch_line(data: &mut GitStatusData, rest: &str) {
    let rest = rest.trim();
    if rest.is_empty() {
        return;
    }

    let (head, ab_part) = if let Some((left, right)) = rest.rsplit_once('[') {
        (left.trim(), Some(right.trim_end_matches(']').trim()))
    } else {
        (rest, None)
    };

    data.branch = head.split("...").next().unwrap_or(head).trim().to_string();

    let Some(ab_part) = ab_part else {
        return;
    };
    for item in ab_part.split(',').map(str::trim) {
        if let Some(v) = item.strip_prefix("ahead ") {
            data.ahead = v.parse::<u32>().unwrap_or(0);
        } else if let Some(v) = item.strip_prefix("behind ") {
            data.behind = v.parse::<u32>().unwrap_or(0);
        }
    }
}

/// Walk `dir` collecting files not in `managed`, relative to `dir`.
/// Used by the deep search; lives here so the walking rules sit next to
/// the service that defines "managed".
pub fn walk_unmanaged(
    dir: &Path,
    managed: &std::collections::BTreeSet<String>,
    should_stop: &dyn Fn() -> bool,
    sink: &mut dyn FnMut(String),
) {
    let mut stack = vec![dir.to_path_buf()];
    while let Some(cur) = stack.pop() {
        if should_stop() {
            return;
        }
        let Ok(entries) = std::fs::read_dir(&cur) else {
            continue;
        };
        for entry in entries.filter_map(|e| e.ok()) {
            if should_stop() {
                return;
            }
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            if name == ".git" {
                continue;
            }
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            let Ok(rel) = path.strip_prefix(dir) else {
                continue;
            };
            let rel = rel.to_string_lossy().to_string();
            if !managed.contains(&rel) {
                sink(rel);
            }
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    /// In-memory service for update-core tests.
    #[derive(Default)]
    pub struct FakeService {
        pub target: Option<PathBuf>,
        pub statuses: Vec<FileStatus>,
        pub managed_files: Vec<String>,
        pub git: GitStatusData,
        pub commits: GitCommits,
        pub diffs: Vec<(String, String)>,
        pub read_only: bool,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeService {
        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }
    }

    impl DotfileService for FakeService {
        fn target_path(&self) -> Result<PathBuf, String> {
            self.target
                .clone()
                .ok_or_else(|| "cannot resolve target path".to_string())
        }

        fn status(&self) -> Result<Vec<FileStatus>, String> {
            Ok(self.statuses.clone())
        }

        fn diff(&self, path: &str) -> Result<String, String> {
            self.diffs
                .iter()
                .find(|(p, _)| p == path)
                .map(|(_, d)| d.clone())
                .ok_or_else(|| format!("no diff for {}", path))
        }

        fn managed(&self) -> Result<Vec<String>, String> {
            Ok(self.managed_files.clone())
        }

        fn cat_file(&self, path: &str) -> Result<String, String> {
            Ok(format!("contents of {}", path))
        }

        fn cat_config(&self) -> Result<String, String> {
            Ok("config".to_string())
        }

        fn dump_config(&self) -> Result<String, String> {
            Ok("full config".to_string())
        }

        fn data(&self) -> Result<String, String> {
            Ok("data".to_string())
        }

        fn doctor(&self) -> Result<String, String> {
            Ok("ok".to_string())
        }

        fn git_status(&self) -> Result<GitStatusData, String> {
            Ok(self.git.clone())
        }

        fn git_commits(&self) -> Result<GitCommits, String> {
            Ok(self.commits.clone())
        }

        fn show_commit(&self, hash: &str) -> Result<String, String> {
            Ok(format!("commit {}", hash))
        }

        fn apply(&self, _paths: &[String]) -> Result<(), String> {
            self.record("apply");
            Ok(())
        }

        fn re_add(&self, _paths: &[String]) -> Result<(), String> {
            self.record("re_add");
            Ok(())
        }

        fn forget(&self, _paths: &[String]) -> Result<(), String> {
            self.record("forget");
            Ok(())
        }

        fn destroy(&self, _paths: &[String]) -> Result<(), String> {
            self.record("destroy");
            Ok(())
        }

        fn git_add(&self, _paths: &[String]) -> Result<(), String> {
            self.record("git_add");
            Ok(())
        }

        fn git_unstage(&self, _paths: &[String]) -> Result<(), String> {
            self.record("git_unstage");
            Ok(())
        }

        fn git_discard(&self, _paths: &[String]) -> Result<(), String> {
            self.record("git_discard");
            Ok(())
        }

        fn git_commit(&self, _message: &str) -> Result<(), String> {
            self.record("git_commit");
            Ok(())
        }

        fn git_push(&self) -> Result<(), String> {
            self.record("git_push");
            Ok(())
        }

        fn git_pull(&self) -> Result<(), String> {
            self.record("git_pull");
            Ok(())
        }

        fn git_fetch(&self) -> Result<(), String> {
            self.record("git_fetch");
            Ok(())
        }

        fn git_undo_commit(&self) -> Result<(), String> {
            self.record("git_undo_commit");
            Ok(())
        }

        fn run_verb(&self, verb: &str) -> Result<String, String> {
            self.record(verb);
            Ok(String::new())
        }

        fn is_read_only(&self) -> bool {
            self.read_only
        }
    }

    #[test]
    fn parses_status_lines() {
        let out = " M .bashrc\nA  .config/nvim/init.lua\n\nDM .profile\n";
        let entries = parse_status_lines(out);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].path, ".bashrc");
        assert_eq!(entries[0].actual, ' ');
        assert_eq!(entries[0].target, 'M');
        assert_eq!(entries[1].path, ".config/nvim/init.lua");
        assert_eq!(entries[2].actual, 'D');
        assert_eq!(entries[2].target, 'M');
    }

    #[test]
    fn parses_porcelain_branch_and_entries() {
        let raw = b"## main...origin/main [ahead 2, behind 1]\0 M .bashrc\0?? junk.txt\0".to_vec();
        let data = parse_porcelain_status(&raw);
        assert_eq!(data.branch, "main");
        assert_eq!(data.ahead, 2);
        assert_eq!(data.behind, 1);
        assert_eq!(data.entries.len(), 2);
        assert!(data.entries[0].is_unstaged());
        assert!(!data.entries[0].is_staged());
        assert_eq!(data.entries[1].x, '?');
    }

    #[test]
    fn parses_porcelain_rename_pair() {
        let raw = b"R  new-name\0old-name\0".to_vec();
        let data = parse_porcelain_status(&raw);
        assert_eq!(data.entries.len(), 1);
        assert_eq!(data.entries[0].path, "new-name");
        assert_eq!(
            data.entries[0].renamed_from,
            Some("old-name".to_string())
        );
    }

    #[test]
    fn parses_commit_lines() {
        let out = "abc123\tabc\t2026-01-02\tJo\tfix the thing\n";
        let entries = parse_commit_lines(out);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].short, "abc");
        assert_eq!(entries[0].subject, "fix the thing");
    }

    #[test]
    fn walk_skips_managed_and_git() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".bashrc"), "x").unwrap();
        std::fs::write(dir.path().join("stray.txt"), "x").unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git").join("HEAD"), "x").unwrap();

        let managed: BTreeSet<String> = [".bashrc".to_string()].into_iter().collect();
        let mut found = Vec::new();
        walk_unmanaged(dir.path(), &managed, &|| false, &mut |p| found.push(p));
        assert_eq!(found, vec!["stray.txt".to_string()]);
    }

    #[test]
    fn walk_honors_stop() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        let managed = BTreeSet::new();
        let mut found = Vec::new();
        walk_unmanaged(dir.path(), &managed, &|| true, &mut |p| found.push(p));
        assert!(found.is_empty());
    }
}
