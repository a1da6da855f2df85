use super::*;
use crate::model::ArtifactId;
use crate::repo::{CommitSpec, SnapshotBuilder};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashSet;
use std::sync::Arc;

const SETTLE: Duration = Duration::from_secs(5);

fn at(minute: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + minute * 60, 0).unwrap()
}

fn linear_repo(count: usize) -> (SharedRepository, Vec<ArtifactId>) {
    let mut b = SnapshotBuilder::new();
    let mut ids: Vec<ArtifactId> = Vec::new();
    for i in 0..count {
        let mut spec = CommitSpec::new("alice", at(i as i64), &format!("commit {i}"))
            .file("f.txt", &format!("{i}\n"));
        if let Some(parent) = ids.last() {
            spec = spec.parent(parent);
        }
        ids.push(b.commit(spec));
    }
    (Arc::new(b.build().unwrap()), ids)
}

#[test]
fn initial_budget_is_delivered_exactly() {
    let (repo, _) = linear_repo(50);
    let mut producer = HistoryProducer::new(repo, HistoryQuery::default());
    producer.start(19).unwrap();
    let batch = producer.settle(SETTLE);
    assert_eq!(batch.rows.len(), 19);
    assert_eq!(producer.ncommits_needed(), 0);
    assert_eq!(producer.state(), ProducerState::Waiting);

    assert!(producer.signal_more(5, true));
    let batch = producer.settle(SETTLE);
    assert_eq!(batch.rows.len(), 5);
    assert_eq!(producer.requested_total(), 24);
    assert_eq!(producer.ncommits_needed(), 0);
    producer.stop().unwrap();
}

#[test]
fn short_history_ends_with_done() {
    let (repo, ids) = linear_repo(3);
    let mut producer = HistoryProducer::new(repo, HistoryQuery::default());
    producer.start(10).unwrap();
    let batch = producer.settle(SETTLE);
    let got: Vec<_> = batch.rows.iter().map(|r| r.id.clone()).collect();
    assert_eq!(got, vec![ids[2].clone(), ids[1].clone(), ids[0].clone()]);
    assert!(batch.ended);
    assert!(producer.is_done());
    assert_eq!(producer.ncommits_needed(), 0);
    assert!(!producer.signal_more(1, false));
}

#[test]
fn stop_joins_and_returns_to_idle() {
    let (repo, _) = linear_repo(20);
    let mut producer = HistoryProducer::new(repo, HistoryQuery::default());
    producer.start(2).unwrap();
    producer.stop().unwrap();
    assert!(!producer.is_live());
    assert_eq!(producer.state(), ProducerState::Idle);
    let batch = producer.pump();
    assert!(!batch.ended);
    assert!(batch.rows.len() <= 2);
}

#[test]
fn resume_skips_rows_already_seen_at_the_boundary() {
    let mut b = SnapshotBuilder::new();
    let c1 = b.commit(CommitSpec::new("a", at(0), "c1"));
    let c2 = b.commit(CommitSpec::new("a", at(1), "c2").parent(&c1));
    let c3 = b.commit(CommitSpec::new("a", at(2), "c3").parent(&c2));
    let c4 = b.commit(CommitSpec::new("a", at(2), "c4").parent(&c2));
    let c5 = b.commit(CommitSpec::new("a", at(3), "c5").parent(&c4));
    let c6 = b.commit(CommitSpec::new("a", at(4), "c6").parent(&c5));
    let repo: SharedRepository = Arc::new(b.build().unwrap());

    let mut fresh = HistoryProducer::new(repo.clone(), HistoryQuery::default());
    fresh.start(100).unwrap();
    let expected: Vec<_> = fresh
        .settle(SETTLE)
        .rows
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(expected, vec![c6, c5, c4.clone(), c3, c2, c1]);

    let mut producer = HistoryProducer::new(repo, HistoryQuery::default());
    producer.start(3).unwrap();
    let mut got: Vec<_> = producer
        .settle(SETTLE)
        .rows
        .into_iter()
        .map(|r| r.id)
        .collect();
    producer.park().unwrap();
    got.extend(producer.pump().rows.into_iter().map(|r| r.id));
    assert_eq!(got.len(), 3);

    let resume = ResumePoint {
        at: Some(at(2)),
        seen: HashSet::from([c4]),
    };
    producer.resume(resume, 3).unwrap();
    got.extend(producer.settle(SETTLE).rows.into_iter().map(|r| r.id));
    assert_eq!(got, expected);
}

#[test]
fn failed_query_is_reported_not_dropped() {
    let (repo, _) = linear_repo(2);
    let query = HistoryQuery {
        start: Some(ArtifactId::new("ffff").unwrap()),
        ..Default::default()
    };
    let mut producer = HistoryProducer::new(repo, query);
    producer.start(5).unwrap();
    let batch = producer.settle(SETTLE);
    assert!(matches!(batch.error, Some(RepoError::MissingArtifact { .. })));
    assert!(producer.is_done());
}
