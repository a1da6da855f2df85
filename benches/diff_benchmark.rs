//! Diff and search performance benchmarks.
//!
//! Builds a checkin that rewrites every few lines of a large file set, then
//! measures building the diff text and scanning it for a pattern.
//!
//! Run with: cargo bench --bench diff_benchmark

#![allow(missing_docs)] // criterion macros generate undocumented items

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use regex::Regex;
use repotui::content::{DiffBuilder, DiffKind, DiffOptions};
use repotui::model::ArtifactId;
use repotui::repo::{CommitSpec, SnapshotBuilder, SnapshotRepository};
use repotui::search::{SearchDirection, SearchEngine, SearchTarget};

/// Two checkins over `files` files of `lines` lines; every seventh line changes.
fn fixture(files: usize, lines: usize) -> (SnapshotRepository, ArtifactId, ArtifactId) {
    let at = |m| Utc.with_ymd_and_hms(2024, 1, 1, 0, m, 0).unwrap();
    let body = |edit: bool| -> String {
        (0..lines)
            .map(|i| {
                if edit && i % 7 == 0 {
                    format!("let value_{i} = compute({i}) + 1;\n")
                } else {
                    format!("let value_{i} = compute({i});\n")
                }
            })
            .collect()
    };
    let mut old = CommitSpec::new("bench", at(0), "base");
    let mut new_files = Vec::with_capacity(files);
    for f in 0..files {
        old = old.file(&format!("src/mod_{f:03}.rs"), &body(false));
        new_files.push(format!("src/mod_{f:03}.rs"));
    }
    let mut b = SnapshotBuilder::new();
    let c1 = b.commit(old);
    let mut new = CommitSpec::new("bench", at(1), "edit").parent(&c1);
    for path in &new_files {
        new = new.file(path, &body(true));
    }
    let c2 = b.commit(new);
    (b.build().unwrap(), c1, c2)
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_build");
    for &(files, lines) in &[(10, 200), (50, 1_000)] {
        let (repo, c1, c2) = fixture(files, lines);
        let kind = DiffKind::Checkin {
            from: Some(c1),
            to: c2,
        };
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{files}x{lines}")),
            &kind,
            |b, kind| {
                b.iter(|| {
                    let text = DiffBuilder::new(&repo, DiffOptions::default())
                        .build(black_box(kind))
                        .unwrap();
                    black_box(text.len())
                })
            },
        );
    }
    group.finish();
}

/// Diff text as a search target.
struct Lines(repotui::content::DiffText);

impl SearchTarget for Lines {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn is_match(&mut self, index: usize, pattern: &Regex) -> bool {
        matches!(self.0.line(index), Ok(Some(line)) if pattern.is_match(&line))
    }
}

fn bench_search(c: &mut Criterion) {
    let (repo, c1, c2) = fixture(50, 1_000);
    let kind = DiffKind::Checkin {
        from: Some(c1),
        to: c2,
    };
    let text = DiffBuilder::new(&repo, DiffOptions::default())
        .build(&kind)
        .unwrap();
    let mut target = Lines(text);
    let pattern = Regex::new(r"mod_049\.rs").unwrap();

    c.bench_function("diff_search_last_file", |b| {
        b.iter(|| {
            let mut engine = SearchEngine::new();
            engine.init(pattern.clone(), SearchDirection::Forward);
            black_box(engine.next(&mut target, SearchDirection::Forward, 0))
        })
    });
}

criterion_group!(benches, bench_build, bench_search);
criterion_main!(benches);
