//! Blame producer.
//!
//! Runs the repository's annotate on a worker thread. Each attribution is sent
//! as it is found; the callback checks the shared quit flag first and fails
//! fast with [`Cancelled`] so a closed or restarted blame view never waits for
//! a long walk to finish.

use crate::content::CommitMeta;
use crate::model::{AnnotateError, ArtifactId, Cancelled, RepoError, WorkerError};
use crate::producer::SharedState;
use crate::repo::{AnnotateRequest, AnnotateStatus, AnnotatedLine, SharedRepository};
use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

const WORKER_NAME: &str = "blame";

/// Message from the blame worker.
#[derive(Debug)]
pub enum BlameEvent {
    /// Metadata of a commit, sent before its first line.
    Meta(CommitMeta),
    /// One attribution.
    Line(AnnotatedLine),
    /// The walk finished.
    Done(AnnotateStatus),
    /// The walk was cancelled.
    Cancelled,
    /// The walk failed.
    Failed(RepoError),
}

/// How a blame run ended.
#[derive(Debug)]
pub enum BlameOutcome {
    /// Annotate returned normally.
    Finished(AnnotateStatus),
    /// Quit was requested.
    Cancelled,
    /// Repository error.
    Failed(RepoError),
}

/// Events drained in one [`BlameProducer::pump`].
#[derive(Debug, Default)]
pub struct BlameBatch {
    /// Commit metadata.
    pub metas: Vec<CommitMeta>,
    /// Attributions, in discovery order.
    pub lines: Vec<AnnotatedLine>,
    /// Set once, when the worker finishes.
    pub outcome: Option<BlameOutcome>,
}

/// Consumer side of the blame worker.
pub struct BlameProducer {
    shared: SharedState,
    events: Receiver<BlameEvent>,
    handle: Option<JoinHandle<()>>,
    finished: bool,
}

impl std::fmt::Debug for BlameProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlameProducer")
            .field("finished", &self.finished)
            .field("live", &self.handle.is_some())
            .finish_non_exhaustive()
    }
}

impl BlameProducer {
    /// Start annotating `request` on a new worker.
    ///
    /// # Errors
    ///
    /// `WorkerError::Spawn` if the thread cannot be created.
    pub fn spawn(repo: SharedRepository, request: AnnotateRequest) -> Result<Self, WorkerError> {
        Self::spawn_with(repo, request, SharedState::new())
    }

    /// Start with a caller-provided quit flag.
    ///
    /// # Errors
    ///
    /// `WorkerError::Spawn` if the thread cannot be created.
    pub fn spawn_with(
        repo: SharedRepository,
        request: AnnotateRequest,
        shared: SharedState,
    ) -> Result<Self, WorkerError> {
        let (tx, rx) = mpsc::channel();
        let worker_shared = shared.clone();
        debug!(path = %request.path, start = %request.start.short(), reverse = request.reverse, "blame worker starting");
        let handle = thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || run_worker(&repo, &request, &worker_shared, &tx))
            .map_err(|source| WorkerError::Spawn {
                worker: WORKER_NAME,
                source,
            })?;
        Ok(Self {
            shared,
            events: rx,
            handle: Some(handle),
            finished: false,
        })
    }

    /// The quit flag shared with the worker.
    pub fn shared(&self) -> &SharedState {
        &self.shared
    }

    /// Whether the worker reported its outcome.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Drain every event received so far.
    pub fn pump(&mut self) -> BlameBatch {
        let mut batch = BlameBatch::default();
        loop {
            match self.events.try_recv() {
                Ok(BlameEvent::Meta(meta)) => batch.metas.push(meta),
                Ok(BlameEvent::Line(line)) => batch.lines.push(line),
                Ok(BlameEvent::Done(status)) => {
                    batch.outcome = Some(BlameOutcome::Finished(status));
                }
                Ok(BlameEvent::Cancelled) => batch.outcome = Some(BlameOutcome::Cancelled),
                Ok(BlameEvent::Failed(e)) => batch.outcome = Some(BlameOutcome::Failed(e)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.finished && batch.outcome.is_none() {
                        batch.outcome = Some(BlameOutcome::Cancelled);
                    }
                    break;
                }
            }
        }
        if batch.outcome.is_some() {
            self.finished = true;
            if let Err(e) = self.join() {
                warn!(error = %e, "blame worker ended abnormally");
            }
        }
        batch
    }

    fn join(&mut self) -> Result<(), WorkerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| WorkerError::Panicked {
                worker: WORKER_NAME,
            }),
            None => Ok(()),
        }
    }

    /// Request quit and join. Lines sent before the quit stay available to
    /// the next [`pump`](Self::pump).
    ///
    /// # Errors
    ///
    /// `WorkerError::Panicked` if the worker panicked.
    pub fn stop(&mut self) -> Result<(), WorkerError> {
        self.shared.request_quit();
        let joined = self.join();
        debug!("blame worker stopped");
        joined
    }
}

impl Drop for BlameProducer {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(error = %e, "blame worker ended abnormally");
        }
    }
}

fn run_worker(
    repo: &SharedRepository,
    request: &AnnotateRequest,
    shared: &SharedState,
    events: &Sender<BlameEvent>,
) {
    let mut known: HashSet<ArtifactId> = HashSet::new();
    let mut meta_error: Option<RepoError> = None;
    let result = repo.annotate(request, &mut |line: AnnotatedLine| {
        if shared.is_quit_requested() {
            return Err(Cancelled);
        }
        if known.insert(line.commit.clone()) {
            let manifest = match repo.manifest(&line.commit) {
                Ok(manifest) => manifest,
                Err(e) => {
                    // Unwind the walk; the error is reported once it returns.
                    meta_error = Some(e);
                    return Err(Cancelled);
                }
            };
            let meta = CommitMeta {
                id: manifest.id,
                user: manifest.user,
                timestamp: manifest.timestamp,
            };
            events.send(BlameEvent::Meta(meta)).map_err(|_| Cancelled)?;
        }
        events.send(BlameEvent::Line(line)).map_err(|_| Cancelled)
    });
    let event = match (result, meta_error) {
        (_, Some(e)) => {
            warn!(error = %e, "blame commit lookup failed");
            BlameEvent::Failed(e)
        }
        (Ok(status), None) => BlameEvent::Done(status),
        (Err(AnnotateError::Cancelled(_)), None) => BlameEvent::Cancelled,
        (Err(AnnotateError::Repo(e)), None) => BlameEvent::Failed(e),
    };
    let _ = events.send(event);
}

#[cfg(test)]
#[path = "blame_tests.rs"]
mod tests;
