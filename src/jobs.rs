//! Async command factory.
//!
//! Every data load is wrapped in `tokio::task::spawn_blocking`, tagged with
//! the generation current at dispatch time, and reports back as a
//! [`JobResult`] on the app channel. The update loop compares the carried
//! generation against the model's and discards stale completions.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::chezmoi::{DotfileService, FileStatus, GitCommits, GitStatusData};
use crate::info::InfoViewKind;
use crate::panel::{PanelError, PanelKey, PanelMode};

/// Identifier for a mutating operation. One of these at a time: the app
/// keeps a single shared busy slot rather than per-action flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionId {
    Apply,
    ApplyAll,
    ReAdd,
    Forget,
    Destroy,
    GitStage,
    GitStageAll,
    GitUnstage,
    GitDiscard,
    GitCommit,
    GitPush,
    GitPull,
    GitFetch,
    GitUndoCommit,
    RunVerb(&'static str),
}

impl ActionId {
    pub fn label(self) -> String {
        match self {
            ActionId::Apply => "apply".to_string(),
            ActionId::ApplyAll => "apply all".to_string(),
            ActionId::ReAdd => "re-add".to_string(),
            ActionId::Forget => "forget".to_string(),
            ActionId::Destroy => "destroy".to_string(),
            ActionId::GitStage => "stage".to_string(),
            ActionId::GitStageAll => "stage all".to_string(),
            ActionId::GitUnstage => "unstage".to_string(),
            ActionId::GitDiscard => "discard".to_string(),
            ActionId::GitCommit => "commit".to_string(),
            ActionId::GitPush => "push".to_string(),
            ActionId::GitPull => "pull".to_string(),
            ActionId::GitFetch => "fetch".to_string(),
            ActionId::GitUndoCommit => "undo last commit".to_string(),
            ActionId::RunVerb(v) => v.to_string(),
        }
    }

    /// Actions routed through the confirm screen before dispatch.
    pub fn needs_confirm(self) -> bool {
        matches!(
            self,
            ActionId::ApplyAll
                | ActionId::Forget
                | ActionId::Destroy
                | ActionId::GitStageAll
                | ActionId::GitDiscard
                | ActionId::GitPush
                | ActionId::GitPull
                | ActionId::GitUndoCommit
        )
    }
}

/// Completion message for every dispatched job.
#[derive(Debug)]
pub enum JobResult {
    Status {
        job_gen: u64,
        result: Result<Vec<FileStatus>, String>,
    },
    GitStatus {
        job_gen: u64,
        result: Result<GitStatusData, String>,
    },
    GitCommits {
        job_gen: u64,
        result: Result<GitCommits, String>,
    },
    Managed {
        job_gen: u64,
        result: Result<Vec<String>, String>,
    },
    Info {
        job_gen: u64,
        view: InfoViewKind,
        result: Result<String, String>,
    },
    Panel {
        job_gen: u64,
        key: PanelKey,
        result: Result<String, PanelError>,
    },
    DiffScreen {
        job_gen: u64,
        result: Result<String, String>,
    },
    Action {
        action: ActionId,
        result: Result<String, String>,
    },
    Search {
        job_gen: u64,
        files: Vec<String>,
        done: bool,
    },
}

/// Wraps service calls into deferred jobs. Cheap to clone; each job captures
/// only the service handle, the generation, and its arguments.
#[derive(Clone)]
pub struct Dispatcher {
    service: Arc<dyn DotfileService + Send + Sync>,
    tx: mpsc::Sender<JobResult>,
}

impl Dispatcher {
    pub fn new(service: Arc<dyn DotfileService + Send + Sync>, tx: mpsc::Sender<JobResult>) -> Self {
        Self { service, tx }
    }

    fn spawn<T, F, M>(&self, call: F, wrap: M)
    where
        T: Send + 'static,
        F: FnOnce(&dyn DotfileService) -> Result<T, String> + Send + 'static,
        M: FnOnce(Result<T, String>) -> JobResult + Send + 'static,
    {
        let service = self.service.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = tokio::task::spawn_blocking(move || call(service.as_ref()))
                .await
                .unwrap_or_else(|e| Err(format!("task join error: {}", e)));
            let _ = tx.send(wrap(result)).await;
        });
    }

    pub fn load_status(&self, job_gen: u64) {
        self.spawn(
            |s| s.status(),
            move |result| JobResult::Status { job_gen, result },
        );
    }

    pub fn load_git_status(&self, job_gen: u64) {
        self.spawn(
            |s| s.git_status(),
            move |result| JobResult::GitStatus { job_gen, result },
        );
    }

    pub fn load_git_commits(&self, job_gen: u64) {
        self.spawn(
            |s| s.git_commits(),
            move |result| JobResult::GitCommits { job_gen, result },
        );
    }

    pub fn load_managed(&self, job_gen: u64) {
        self.spawn(
            |s| s.managed(),
            move |result| JobResult::Managed { job_gen, result },
        );
    }

    pub fn load_info(&self, job_gen: u64, view: InfoViewKind) {
        self.spawn(
            move |s| match view {
                InfoViewKind::Config => s.cat_config(),
                InfoViewKind::Full => s.dump_config(),
                InfoViewKind::Data => s.data(),
                InfoViewKind::Doctor => s.doctor(),
            },
            move |result| JobResult::Info {
                job_gen,
                view,
                result,
            },
        );
    }

    pub fn load_panel(&self, job_gen: u64, key: PanelKey) {
        let path = key.path.clone();
        let mode = key.mode;
        self.spawn(
            move |s| match mode {
                PanelMode::Diff => s.diff(&path),
                PanelMode::Content => s.cat_file(&path),
            },
            move |result| JobResult::Panel {
                job_gen,
                key,
                result: result.map_err(classify_panel_error),
            },
        );
    }

    pub fn load_file_diff(&self, job_gen: u64, path: String) {
        self.spawn(
            move |s| s.diff(&path),
            move |result| JobResult::DiffScreen { job_gen, result },
        );
    }

    pub fn load_file_content(&self, job_gen: u64, path: String) {
        self.spawn(
            move |s| s.cat_file(&path),
            move |result| JobResult::DiffScreen { job_gen, result },
        );
    }

    pub fn load_commit_diff(&self, job_gen: u64, hash: String) {
        self.spawn(
            move |s| s.show_commit(&hash),
            move |result| JobResult::DiffScreen { job_gen, result },
        );
    }

    pub fn run_action(&self, action: ActionId, paths: Vec<String>, message: Option<String>) {
        self.spawn(
            move |s| run_action_blocking(s, action, &paths, message.as_deref()),
            move |result| JobResult::Action { action, result },
        );
    }
}

fn run_action_blocking(
    s: &dyn DotfileService,
    action: ActionId,
    paths: &[String],
    message: Option<&str>,
) -> Result<String, String> {
    match action {
        ActionId::Apply | ActionId::ApplyAll => s.apply(paths).map(|_| "applied".to_string()),
        ActionId::ReAdd => s.re_add(paths).map(|_| "re-added".to_string()),
        ActionId::Forget => s.forget(paths).map(|_| "forgotten".to_string()),
        ActionId::Destroy => s.destroy(paths).map(|_| "destroyed".to_string()),
        ActionId::GitStage | ActionId::GitStageAll => {
            s.git_add(paths).map(|_| "staged".to_string())
        }
        ActionId::GitUnstage => s.git_unstage(paths).map(|_| "unstaged".to_string()),
        ActionId::GitDiscard => s.git_discard(paths).map(|_| "discarded".to_string()),
        ActionId::GitCommit => s
            .git_commit(message.unwrap_or_default())
            .map(|_| "committed".to_string()),
        ActionId::GitPush => s.git_push().map(|_| "pushed".to_string()),
        ActionId::GitPull => s.git_pull().map(|_| "pulled".to_string()),
        ActionId::GitFetch => s.git_fetch().map(|_| "fetched".to_string()),
        ActionId::GitUndoCommit => s.git_undo_commit().map(|_| "last commit undone".to_string()),
        ActionId::RunVerb(v) => s.run_verb(v).map(|out| {
            let trimmed = out.trim();
            if trimmed.is_empty() {
                format!("{} done", v)
            } else {
                trimmed.lines().next().unwrap_or("done").to_string()
            }
        }),
    }
}

/// Known expected conditions get a friendly message; everything else keeps
/// the raw text and the generic prefix at render time.
fn classify_panel_error(raw: String) -> PanelError {
    let lower = raw.to_lowercase();
    if lower.contains("is a directory") || lower.contains("directory selected") {
        return PanelError::Friendly("directory selected; preview skipped".to_string());
    }
    if lower.contains("not managed") || lower.contains("not in source state") {
        return PanelError::Friendly("not a managed file".to_string());
    }
    PanelError::Raw(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chezmoi::tests::FakeService;
    use crate::rows::Section;

    fn dispatcher(service: Arc<FakeService>) -> (Dispatcher, mpsc::Receiver<JobResult>) {
        let (tx, rx) = mpsc::channel(32);
        (Dispatcher::new(service, tx), rx)
    }

    #[tokio::test]
    async fn status_load_carries_generation() {
        let service = Arc::new(FakeService {
            statuses: vec![FileStatus {
                path: ".bashrc".to_string(),
                actual: ' ',
                target: 'M',
            }],
            ..Default::default()
        });
        let (dispatcher, mut rx) = dispatcher(service);
        dispatcher.load_status(7);

        match rx.recv().await.unwrap() {
            JobResult::Status { job_gen, result } => {
                assert_eq!(job_gen, 7);
                assert_eq!(result.unwrap().len(), 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn panel_load_uses_mode() {
        let service = Arc::new(FakeService {
            diffs: vec![(".bashrc".to_string(), "+line".to_string())],
            ..Default::default()
        });
        let (dispatcher, mut rx) = dispatcher(service);
        dispatcher.load_panel(
            1,
            PanelKey {
                path: ".bashrc".to_string(),
                mode: PanelMode::Diff,
                section: Section::Drift,
            },
        );

        match rx.recv().await.unwrap() {
            JobResult::Panel { key, result, .. } => {
                assert_eq!(key.mode, PanelMode::Diff);
                assert_eq!(result.unwrap(), "+line");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn action_reports_outcome() {
        let service = Arc::new(FakeService::default());
        let (dispatcher, mut rx) = dispatcher(service.clone());
        dispatcher.run_action(ActionId::GitPush, Vec::new(), None);

        match rx.recv().await.unwrap() {
            JobResult::Action { action, result } => {
                assert_eq!(action, ActionId::GitPush);
                assert_eq!(result.unwrap(), "pushed");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(
            service.calls.lock().unwrap().as_slice(),
            &["git_push".to_string()]
        );
    }

    #[test]
    fn directory_error_is_friendly() {
        match classify_panel_error("cat: .config: is a directory".to_string()) {
            PanelError::Friendly(msg) => assert!(msg.contains("preview skipped")),
            PanelError::Raw(_) => panic!("expected friendly"),
        }
        match classify_panel_error("exit status 1".to_string()) {
            PanelError::Raw(msg) => assert_eq!(msg, "exit status 1"),
            PanelError::Friendly(_) => panic!("expected raw"),
        }
    }

    #[test]
    fn confirm_gating_covers_remote_and_destructive_ops() {
        assert!(ActionId::GitStageAll.needs_confirm());
        assert!(ActionId::GitPush.needs_confirm());
        assert!(ActionId::GitPull.needs_confirm());
        assert!(ActionId::GitDiscard.needs_confirm());
        assert!(ActionId::GitUndoCommit.needs_confirm());
        assert!(!ActionId::GitStage.needs_confirm());
        assert!(!ActionId::Apply.needs_confirm());
    }
}
