//! Deep search for unmanaged files.
//!
//! The only operation with true cancellation: the walk checks its
//! `CancellationToken` between directory entries, so pausing the search
//! stops work promptly instead of merely discarding a stale result.

use std::collections::BTreeSet;
use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::chezmoi::walk_unmanaged;
use crate::jobs::JobResult;

const BATCH_SIZE: usize = 64;

struct SearchRequest {
    dir: PathBuf,
    managed: BTreeSet<String>,
    job_gen: u64,
    cancel: CancellationToken,
}

/// Handle for starting deep searches. Results stream back as
/// [`JobResult::Search`] batches on the app channel.
pub struct SearchLoader {
    tx: mpsc::Sender<SearchRequest>,
}

impl SearchLoader {
    pub fn new(results: mpsc::Sender<JobResult>) -> Self {
        let (request_tx, request_rx) = mpsc::channel::<SearchRequest>(4);
        tokio::spawn(search_loader_task(request_rx, results));
        Self { tx: request_tx }
    }

    /// Start a walk of `dir`. Returns the token that pauses it.
    pub fn request(
        &self,
        dir: PathBuf,
        managed: BTreeSet<String>,
        job_gen: u64,
    ) -> CancellationToken {
        let cancel = CancellationToken::new();
        let _ = self.tx.try_send(SearchRequest {
            dir,
            managed,
            job_gen,
            cancel: cancel.clone(),
        });
        cancel
    }
}

async fn search_loader_task(
    mut rx: mpsc::Receiver<SearchRequest>,
    tx: mpsc::Sender<JobResult>,
) {
    let mut current_cancel: Option<CancellationToken> = None;

    while let Some(request) = rx.recv().await {
        // A new search supersedes any walk still running.
        if let Some(token) = current_cancel.take() {
            token.cancel();
        }
        current_cancel = Some(request.cancel.clone());

        if request.cancel.is_cancelled() {
            continue;
        }

        let SearchRequest {
            dir,
            managed,
            job_gen,
            cancel,
        } = request;
        let batch_tx = tx.clone();

        let _ = tokio::task::spawn_blocking(move || {
            let mut batch: Vec<String> = Vec::new();
            let stop = || cancel.is_cancelled();
            walk_unmanaged(&dir, &managed, &stop, &mut |path| {
                batch.push(path);
                if batch.len() >= BATCH_SIZE {
                    let _ = batch_tx.blocking_send(JobResult::Search {
                        job_gen,
                        files: std::mem::take(&mut batch),
                        done: false,
                    });
                }
            });

            if cancel.is_cancelled() {
                return;
            }
            let _ = batch_tx.blocking_send(JobResult::Search {
                job_gen,
                files: batch,
                done: true,
            });
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn streams_results_and_finishes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        std::fs::write(dir.path().join("b.txt"), "x").unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        let loader = SearchLoader::new(tx);
        let _cancel = loader.request(dir.path().to_path_buf(), BTreeSet::new(), 3);

        let mut files = Vec::new();
        loop {
            match rx.recv().await.unwrap() {
                JobResult::Search {
                    job_gen,
                    files: batch,
                    done,
                } => {
                    assert_eq!(job_gen, 3);
                    files.extend(batch);
                    if done {
                        break;
                    }
                }
                other => panic!("unexpected result: {:?}", other),
            }
        }
        files.sort();
        assert_eq!(files, vec!["a.txt".to_string(), "b.txt".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancelled_search_never_reports_partial_completion() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..(BATCH_SIZE * 3) {
            std::fs::write(dir.path().join(format!("f{}.txt", i)), "x").unwrap();
        }

        let (tx, mut rx) = mpsc::channel(32);
        let loader = SearchLoader::new(tx);
        let cancel = loader.request(dir.path().to_path_buf(), BTreeSet::new(), 1);
        cancel.cancel();

        // The cancel usually lands before the walk starts; if the walk won
        // the race instead, the only legal `done` batch is a complete one.
        let mut files = Vec::new();
        loop {
            let next =
                tokio::time::timeout(std::time::Duration::from_millis(200), rx.recv()).await;
            match next {
                Err(_) | Ok(None) => {
                    assert!(files.len() < BATCH_SIZE * 3);
                    break;
                }
                Ok(Some(JobResult::Search { files: batch, done, .. })) => {
                    files.extend(batch);
                    if done {
                        assert_eq!(files.len(), BATCH_SIZE * 3);
                        break;
                    }
                }
                Ok(Some(other)) => panic!("unexpected result: {:?}", other),
            }
        }
    }
}
