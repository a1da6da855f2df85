//! History producer feeding a timeline.
//!
//! # Flow control
//!
//! The consumer asks for rows with [`HistoryProducer::signal_more`] and counts
//! them in `ncommits_needed`. The worker keeps its own budget, sends one
//! [`HistoryEvent::Commit`] per row and decrements the budget; when the
//! budget hits zero it blocks on the request channel until `More(n)` or
//! `Quit` arrives. `ncommits_needed` only goes down when the consumer
//! receives a row, so both counters agree once the channel is drained.
//!
//! # Parking
//!
//! A hidden timeline parks its producer (the worker is stopped and joined).
//! Resuming re-prepares the query from a [`ResumePoint`]: the oldest queued
//! timestamp, inclusive, plus the ids already queued at that time, which the
//! new worker skips.

use crate::model::{RepoError, WorkerError};
use crate::producer::SharedState;
use crate::repo::{HistoryCursor, HistoryQuery, HistoryRow, ResumePoint, SharedRepository};
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

const WORKER_NAME: &str = "history";

/// Message from the consumer to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRequest {
    /// Produce `n` more rows.
    More(usize),
    /// Stop now.
    Quit,
}

/// Message from the worker to the consumer.
#[derive(Debug)]
pub enum HistoryEvent {
    /// One history row.
    Commit(HistoryRow),
    /// History exhausted or worker stopped.
    End,
    /// The query failed; the worker has exited.
    Failed(RepoError),
}

/// Lifecycle of a producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProducerState {
    /// No worker (not started yet, or parked).
    #[default]
    Idle,
    /// Rows requested and not yet received.
    Running,
    /// Worker alive, nothing outstanding.
    Waiting,
    /// History exhausted (or failed); no worker.
    Done,
}

/// Events drained in one [`HistoryProducer::pump`].
#[derive(Debug, Default)]
pub struct HistoryBatch {
    /// New rows, newest first.
    pub rows: Vec<HistoryRow>,
    /// The end of history was reached.
    pub ended: bool,
    /// The worker failed.
    pub error: Option<RepoError>,
}

impl HistoryBatch {
    /// Whether the batch carries nothing.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && !self.ended && self.error.is_none()
    }
}

/// Consumer side of the history worker.
pub struct HistoryProducer {
    repo: SharedRepository,
    query: HistoryQuery,
    state: ProducerState,
    shared: SharedState,
    requests: Option<Sender<HistoryRequest>>,
    events: Option<Receiver<HistoryEvent>>,
    handle: Option<JoinHandle<()>>,
    backlog: VecDeque<HistoryEvent>,
    ncommits_needed: usize,
    requested_total: usize,
}

impl std::fmt::Debug for HistoryProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryProducer")
            .field("query", &self.query)
            .field("state", &self.state)
            .field("ncommits_needed", &self.ncommits_needed)
            .field("requested_total", &self.requested_total)
            .finish_non_exhaustive()
    }
}

impl HistoryProducer {
    /// Idle producer for `query`.
    pub fn new(repo: SharedRepository, query: HistoryQuery) -> Self {
        Self {
            repo,
            query,
            state: ProducerState::Idle,
            shared: SharedState::new(),
            requests: None,
            events: None,
            handle: None,
            backlog: VecDeque::new(),
            ncommits_needed: 0,
            requested_total: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> ProducerState {
        self.state
    }

    /// Rows requested and not yet received.
    pub fn ncommits_needed(&self) -> usize {
        self.ncommits_needed
    }

    /// Rows requested over the producer's lifetime.
    pub fn requested_total(&self) -> usize {
        self.requested_total
    }

    /// Whether the end of history has been reached.
    pub fn is_done(&self) -> bool {
        self.state == ProducerState::Done
    }

    /// Whether a worker thread is alive.
    pub fn is_live(&self) -> bool {
        self.handle.is_some()
    }

    /// The query being produced.
    pub fn query(&self) -> &HistoryQuery {
        &self.query
    }

    /// Spawn the worker with an initial budget of `initial` rows.
    ///
    /// # Errors
    ///
    /// `WorkerError::Spawn` if the thread cannot be created.
    pub fn start(&mut self, initial: usize) -> Result<(), WorkerError> {
        self.spawn(initial, ResumePoint::default())
    }

    fn spawn(&mut self, initial: usize, resume: ResumePoint) -> Result<(), WorkerError> {
        if self.handle.is_some() || self.state == ProducerState::Done {
            return Ok(());
        }
        let (request_tx, request_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let shared = SharedState::new();
        let worker_shared = shared.clone();
        let repo = self.repo.clone();
        let mut query = self.query.clone();
        query.resume_at = resume.at.or(query.resume_at);

        let handle = thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || {
                let cursor = match repo.history(&query) {
                    Ok(cursor) => cursor,
                    Err(e) => {
                        let _ = event_tx.send(HistoryEvent::Failed(e));
                        return;
                    }
                };
                run_worker(cursor, &worker_shared, &request_rx, &event_tx, initial, &resume);
            })
            .map_err(|source| WorkerError::Spawn {
                worker: WORKER_NAME,
                source,
            })?;

        debug!(initial, "history worker started");
        self.shared = shared;
        self.requests = Some(request_tx);
        self.events = Some(event_rx);
        self.handle = Some(handle);
        self.ncommits_needed = initial;
        self.requested_total = self.requested_total.saturating_add(initial);
        self.update_state();
        Ok(())
    }

    /// Ask for `n` more rows. With `wait`, block until at least one event arrives.
    ///
    /// Returns `false` when nothing was requested (no live worker, or `n == 0`).
    pub fn signal_more(&mut self, n: usize, wait: bool) -> bool {
        if n == 0 || self.state == ProducerState::Done {
            return false;
        }
        let Some(requests) = &self.requests else {
            return false;
        };
        if requests.send(HistoryRequest::More(n)).is_err() {
            return false;
        }
        self.ncommits_needed = self.ncommits_needed.saturating_add(n);
        self.requested_total = self.requested_total.saturating_add(n);
        debug!(n, needed = self.ncommits_needed, "requested more history");
        if wait && self.backlog.is_empty() {
            if let Some(events) = &self.events {
                match events.recv() {
                    Ok(event) => self.backlog.push_back(event),
                    Err(_) => self.backlog.push_back(HistoryEvent::End),
                }
            }
        }
        self.update_state();
        true
    }

    /// Drain every event received so far.
    pub fn pump(&mut self) -> HistoryBatch {
        let mut disconnected = false;
        if let Some(events) = &self.events {
            loop {
                match events.try_recv() {
                    Ok(event) => self.backlog.push_back(event),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        disconnected = true;
                        break;
                    }
                }
            }
        }
        if disconnected {
            // A panicking worker closes the channel without sending End.
            self.backlog.push_back(HistoryEvent::End);
            self.events = None;
        }
        self.apply_backlog()
    }

    /// Block until nothing is outstanding or the history ends.
    pub fn settle(&mut self, timeout: Duration) -> HistoryBatch {
        let mut batch = self.pump();
        let deadline = std::time::Instant::now() + timeout;
        while self.state == ProducerState::Running {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                break;
            }
            let received = match &self.events {
                Some(events) => events.recv_timeout(remaining),
                None => break,
            };
            match received {
                Ok(event) => self.backlog.push_back(event),
                Err(mpsc::RecvTimeoutError::Timeout) => break,
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    self.backlog.push_back(HistoryEvent::End);
                    self.events = None;
                }
            }
            let more = self.pump();
            batch.rows.extend(more.rows);
            batch.ended |= more.ended;
            batch.error = batch.error.or(more.error);
        }
        batch
    }

    fn apply_backlog(&mut self) -> HistoryBatch {
        let mut batch = HistoryBatch::default();
        while let Some(event) = self.backlog.pop_front() {
            match event {
                HistoryEvent::Commit(row) => {
                    self.ncommits_needed = self.ncommits_needed.saturating_sub(1);
                    batch.rows.push(row);
                }
                HistoryEvent::End => {
                    batch.ended = true;
                    self.finish();
                }
                HistoryEvent::Failed(e) => {
                    warn!(error = %e, "history query failed");
                    batch.error = Some(e);
                    self.finish();
                }
            }
        }
        self.update_state();
        batch
    }

    fn finish(&mut self) {
        self.ncommits_needed = 0;
        self.state = ProducerState::Done;
        if let Err(e) = self.join() {
            warn!(error = %e, "history worker ended abnormally");
        }
    }

    fn update_state(&mut self) {
        if self.state == ProducerState::Done {
            return;
        }
        self.state = match (self.handle.is_some(), self.ncommits_needed) {
            (false, _) => ProducerState::Idle,
            (true, 0) => ProducerState::Waiting,
            (true, _) => ProducerState::Running,
        };
    }

    fn join(&mut self) -> Result<(), WorkerError> {
        self.requests = None;
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| WorkerError::Panicked {
                worker: WORKER_NAME,
            }),
            None => Ok(()),
        }
    }

    /// Signal quit and join the worker. Rows already sent stay available to
    /// the next [`pump`](Self::pump).
    ///
    /// # Errors
    ///
    /// `WorkerError::Panicked` if the worker panicked.
    pub fn stop(&mut self) -> Result<(), WorkerError> {
        if self.handle.is_none() {
            return Ok(());
        }
        self.shared.request_quit();
        if let Some(requests) = &self.requests {
            let _ = requests.send(HistoryRequest::Quit);
        }
        let joined = self.join();
        if let Some(events) = self.events.take() {
            // A quit-triggered End is not the end of history.
            self.backlog.extend(
                events
                    .try_iter()
                    .filter(|e| !matches!(e, HistoryEvent::End)),
            );
        }
        self.ncommits_needed = 0;
        self.update_state();
        debug!("history worker stopped");
        joined
    }

    /// Stop the worker while the view is hidden.
    ///
    /// # Errors
    ///
    /// See [`stop`](Self::stop).
    pub fn park(&mut self) -> Result<(), WorkerError> {
        if self.state == ProducerState::Done {
            return Ok(());
        }
        self.stop()
    }

    /// Restart a parked producer from `resume`, asking for `need` rows.
    ///
    /// # Errors
    ///
    /// `WorkerError::Spawn` if the thread cannot be created.
    pub fn resume(&mut self, resume: ResumePoint, need: usize) -> Result<(), WorkerError> {
        if self.handle.is_some() || self.state == ProducerState::Done {
            return Ok(());
        }
        debug!(at = ?resume.at, seen = resume.seen.len(), "history worker resuming");
        self.spawn(need, resume)
    }
}

impl Drop for HistoryProducer {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(error = %e, "history worker ended abnormally");
        }
    }
}

/// Worker loop: produce rows while the budget lasts, then wait for more.
fn run_worker(
    mut cursor: Box<dyn HistoryCursor>,
    shared: &SharedState,
    requests: &Receiver<HistoryRequest>,
    events: &Sender<HistoryEvent>,
    initial: usize,
    resume: &ResumePoint,
) {
    let mut budget = initial;
    let mut skipping = !resume.seen.is_empty();
    loop {
        loop {
            match requests.try_recv() {
                Ok(HistoryRequest::More(n)) => budget = budget.saturating_add(n),
                Ok(HistoryRequest::Quit) | Err(TryRecvError::Disconnected) => {
                    let _ = events.send(HistoryEvent::End);
                    return;
                }
                Err(TryRecvError::Empty) => break,
            }
        }
        if shared.is_quit_requested() {
            let _ = events.send(HistoryEvent::End);
            return;
        }
        if budget == 0 {
            match requests.recv() {
                Ok(HistoryRequest::More(n)) => budget = budget.saturating_add(n),
                Ok(HistoryRequest::Quit) | Err(_) => {
                    let _ = events.send(HistoryEvent::End);
                    return;
                }
            }
            continue;
        }
        match cursor.step() {
            Ok(Some(row)) => {
                if skipping && resume.seen.contains(&row.id) {
                    continue;
                }
                skipping = false;
                if events.send(HistoryEvent::Commit(row)).is_err() {
                    return;
                }
                budget -= 1;
            }
            Ok(None) => {
                let _ = events.send(HistoryEvent::End);
                return;
            }
            Err(e) => {
                let _ = events.send(HistoryEvent::Failed(e));
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
