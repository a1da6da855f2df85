use super::*;
use crate::model::BlameLines;
use crate::repo::{
    AnnotateLimit, Artifact, BranchFilter, BranchRow, Checkout, CommitSpec, HistoryCursor,
    HistoryQuery, Manifest, Repository, SnapshotBuilder,
};
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Reports `lines` attributions, requesting quit on `shared` before line `quit_at`.
/// Commit lookups fail unless `known_commits` is set.
struct StoppingRepo {
    lines: usize,
    quit_at: usize,
    shared: SharedState,
    known_commits: bool,
}

impl Repository for StoppingRepo {
    fn history(&self, _: &HistoryQuery) -> Result<Box<dyn HistoryCursor>, RepoError> {
        Err(RepoError::NoCheckout)
    }
    fn resolve(&self, name: &str) -> Result<ArtifactId, RepoError> {
        Err(RepoError::UnknownName {
            name: name.to_string(),
        })
    }
    fn manifest(&self, id: &ArtifactId) -> Result<Manifest, RepoError> {
        if !self.known_commits {
            return Err(RepoError::MissingArtifact { id: id.to_string() });
        }
        Ok(Manifest {
            id: id.clone(),
            parents: Vec::new(),
            user: "walker".into(),
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            comment: String::new(),
            branch: None,
            tags: Vec::new(),
            cards: Vec::new(),
        })
    }
    fn blob(&self, id: &ArtifactId) -> Result<Vec<u8>, RepoError> {
        Err(RepoError::MissingArtifact { id: id.to_string() })
    }
    fn artifact(&self, id: &ArtifactId) -> Result<Artifact, RepoError> {
        Err(RepoError::MissingArtifact { id: id.to_string() })
    }
    fn checkout(&self) -> Option<Checkout> {
        None
    }
    fn children(&self, _: &ArtifactId) -> Result<Vec<ArtifactId>, RepoError> {
        Ok(Vec::new())
    }
    fn annotate(
        &self,
        _: &AnnotateRequest,
        on_line: &mut dyn FnMut(AnnotatedLine) -> Result<(), Cancelled>,
    ) -> Result<AnnotateStatus, AnnotateError> {
        for line in 0..self.lines {
            if line == self.quit_at {
                self.shared.request_quit();
            }
            on_line(AnnotatedLine {
                line,
                commit: ArtifactId::new(format!("{:04x}", line + 1)).unwrap(),
            })?;
        }
        Ok(AnnotateStatus::Complete { versions: 1 })
    }
    fn branches(&self, _: &BranchFilter) -> Result<Vec<BranchRow>, RepoError> {
        Ok(Vec::new())
    }
}

fn request(start: &ArtifactId) -> AnnotateRequest {
    AnnotateRequest {
        path: "f.txt".into(),
        start: start.clone(),
        limit: AnnotateLimit::default(),
        reverse: false,
    }
}

fn drain(producer: &mut BlameProducer) -> BlameBatch {
    let mut all = BlameBatch::default();
    let deadline = Instant::now() + Duration::from_secs(5);
    while all.outcome.is_none() && Instant::now() < deadline {
        let batch = producer.pump();
        all.metas.extend(batch.metas);
        all.lines.extend(batch.lines);
        all.outcome = batch.outcome;
        std::thread::sleep(Duration::from_millis(5));
    }
    all
}

#[test]
fn cancel_after_k_lines_annotates_exactly_k() {
    let shared = SharedState::new();
    let repo = Arc::new(StoppingRepo {
        lines: 10,
        quit_at: 4,
        shared: shared.clone(),
        known_commits: true,
    });
    let start = ArtifactId::new("abcd").unwrap();
    let mut producer = BlameProducer::spawn_with(repo, request(&start), shared).unwrap();
    let batch = drain(&mut producer);
    assert!(matches!(batch.outcome, Some(BlameOutcome::Cancelled)));

    let mut lines = BlameLines::new(10);
    for line in batch.lines {
        lines.annotate(line.line, line.commit);
    }
    assert_eq!(lines.annotated(), 4);
    assert!((0..4).all(|i| lines.get(i).unwrap().is_annotated()));
    assert!((4..10).all(|i| !lines.get(i).unwrap().is_annotated()));
    producer.stop().unwrap();
}

#[test]
fn complete_run_sends_metadata_before_lines() {
    let mut b = SnapshotBuilder::new();
    let at = |m| Utc.with_ymd_and_hms(2024, 2, 2, 2, m, 0).unwrap();
    let c1 = b.commit(CommitSpec::new("alice", at(0), "one").file("f.txt", "a\nb\n"));
    let c2 = b.commit(
        CommitSpec::new("bob", at(1), "two")
            .parent(&c1)
            .file("f.txt", "a\nB\n"),
    );
    let repo = Arc::new(b.build().unwrap());
    let mut producer = BlameProducer::spawn(repo, request(&c2)).unwrap();
    let batch = drain(&mut producer);
    assert!(matches!(
        batch.outcome,
        Some(BlameOutcome::Finished(AnnotateStatus::Complete { versions: 2 }))
    ));
    assert!(producer.is_finished());
    let users: HashSet<_> = batch.metas.iter().map(|m| m.user.as_str()).collect();
    assert_eq!(users, HashSet::from(["alice", "bob"]));
    assert_eq!(batch.lines.len(), 2);
}

#[test]
fn stop_before_completion_joins_cleanly() {
    let shared = SharedState::new();
    let repo = Arc::new(StoppingRepo {
        lines: 3,
        quit_at: usize::MAX,
        shared: shared.clone(),
        known_commits: true,
    });
    let start = ArtifactId::new("abcd").unwrap();
    let mut producer = BlameProducer::spawn_with(repo, request(&start), shared).unwrap();
    producer.stop().unwrap();
    assert!(producer.shared().is_quit_requested());
}

#[test]
fn failed_commit_lookup_ends_the_run_with_the_error() {
    let shared = SharedState::new();
    let repo = Arc::new(StoppingRepo {
        lines: 5,
        quit_at: usize::MAX,
        shared: shared.clone(),
        known_commits: false,
    });
    let start = ArtifactId::new("abcd").unwrap();
    let mut producer = BlameProducer::spawn_with(repo, request(&start), shared).unwrap();
    let batch = drain(&mut producer);
    assert!(matches!(
        batch.outcome,
        Some(BlameOutcome::Failed(RepoError::MissingArtifact { .. }))
    ));
    assert!(batch.metas.is_empty());
    assert!(batch.lines.is_empty());
}
