//! Line attribution over a file's version chain.
//!
//! Works on any [`Repository`] through `manifest`, `blob` and `children`, so an
//! engine only needs to provide storage access to get annotate for free.
//!
//! Forward mode walks primary parents from the starting checkin and attributes
//! each line to the newest version in which it appeared. Reverse mode walks
//! primary children from a root checkin and attributes each line of the root
//! version to the first later version that changed it.

use crate::model::{AnnotateError, ArtifactId, Cancelled, RepoError};
use crate::repo::{
    split_lines, AnnotateRequest, AnnotateStatus, AnnotatedLine, Manifest, Repository,
};
use similar::{capture_diff_slices, Algorithm, DiffOp};
use std::time::Instant;
use tracing::debug;

/// One distinct content of the file along the walk.
#[derive(Debug, Clone)]
struct FileVersion {
    /// Commit credited with this content.
    commit: ArtifactId,
    /// Content lines.
    lines: Vec<String>,
}

/// Outcome of collecting versions.
struct VersionChain {
    versions: Vec<FileVersion>,
    truncated: bool,
    /// Newest commit a reverse walk reached. Lines that survive every version
    /// are credited here rather than to the last version's commit.
    tip: Option<ArtifactId>,
}

/// Run annotate against `repo`, reporting each attribution through `on_line`.
pub fn annotate<R: Repository + ?Sized>(
    repo: &R,
    request: &AnnotateRequest,
    on_line: &mut dyn FnMut(AnnotatedLine) -> Result<(), Cancelled>,
) -> Result<AnnotateStatus, AnnotateError> {
    let started = Instant::now();
    let chain = if request.reverse {
        collect_descendant_versions(repo, request, started)?
    } else {
        collect_ancestor_versions(repo, request, started)?
    };
    debug!(
        path = %request.path,
        versions = chain.versions.len(),
        truncated = chain.truncated,
        reverse = request.reverse,
        "annotate version chain collected"
    );
    attribute(&chain.versions, request.reverse, chain.tip.as_ref(), on_line)?;

    let versions = chain.versions.len();
    Ok(if chain.truncated {
        AnnotateStatus::Truncated { versions }
    } else {
        AnnotateStatus::Complete { versions }
    })
}

fn over_budget(request: &AnnotateRequest, started: Instant, versions: usize) -> bool {
    if let Some(max) = request.limit.max_versions {
        if versions >= max.max(1) {
            return true;
        }
    }
    request
        .limit
        .budget
        .is_some_and(|budget| started.elapsed() >= budget)
}

fn load_lines<R: Repository + ?Sized>(repo: &R, id: &ArtifactId) -> Result<Vec<String>, RepoError> {
    let bytes = repo.blob(id)?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(split_lines(&text).into_iter().map(str::to_owned).collect())
}

/// Walk parents from the starting checkin, collecting each distinct content.
///
/// A version is credited to the oldest commit of the run of commits sharing its
/// content, which is the commit that introduced it.
fn collect_ancestor_versions<R: Repository + ?Sized>(
    repo: &R,
    request: &AnnotateRequest,
    started: Instant,
) -> Result<VersionChain, RepoError> {
    let start = repo.manifest(&request.start)?;
    let card = start.card(&request.path).ok_or_else(|| RepoError::PathNotFound {
        path: request.path.clone(),
        commit: request.start.short().to_string(),
    })?;

    let mut versions = vec![FileVersion {
        commit: start.id.clone(),
        lines: load_lines(repo, &card.id)?,
    }];
    let mut content_id = card.id.clone();
    let mut path = card.prior_name.clone().unwrap_or_else(|| card.path.clone());
    let mut current: Manifest = start;

    loop {
        let Some(parent_id) = current.parent().cloned() else {
            return Ok(VersionChain {
                versions,
                truncated: false,
                tip: None,
            });
        };
        let parent = repo.manifest(&parent_id)?;
        let Some(parent_card) = parent.card(&path) else {
            return Ok(VersionChain {
                versions,
                truncated: false,
                tip: None,
            });
        };
        if parent_card.id == content_id {
            // Same content further back: the older commit introduced it.
            if let Some(last) = versions.last_mut() {
                last.commit = parent.id.clone();
            }
        } else {
            if over_budget(request, started, versions.len()) {
                return Ok(VersionChain {
                    versions,
                    truncated: true,
                    tip: None,
                });
            }
            content_id = parent_card.id.clone();
            versions.push(FileVersion {
                commit: parent.id.clone(),
                lines: load_lines(repo, &content_id)?,
            });
        }
        if let Some(prior) = &parent_card.prior_name {
            path = prior.clone();
        }
        current = parent;
    }
}

/// Walk primary children from the root checkin, collecting each distinct content.
///
/// A deleted file ends the walk with an empty version, so every remaining line is
/// credited to the deleting commit.
fn collect_descendant_versions<R: Repository + ?Sized>(
    repo: &R,
    request: &AnnotateRequest,
    started: Instant,
) -> Result<VersionChain, RepoError> {
    let root = repo.manifest(&request.start)?;
    let card = root.card(&request.path).ok_or_else(|| RepoError::PathNotFound {
        path: request.path.clone(),
        commit: request.start.short().to_string(),
    })?;

    let mut versions = vec![FileVersion {
        commit: root.id.clone(),
        lines: load_lines(repo, &card.id)?,
    }];
    let mut content_id = card.id.clone();
    let mut path = request.path.clone();
    let mut current_id = root.id;

    loop {
        let Some(child_id) = repo.children(&current_id)?.into_iter().next() else {
            return Ok(VersionChain {
                versions,
                truncated: false,
                tip: Some(current_id),
            });
        };
        let child = repo.manifest(&child_id)?;
        let renamed = child
            .cards
            .iter()
            .find(|c| c.prior_name.as_deref() == Some(path.as_str()));
        let child_card = renamed.or_else(|| child.card(&path));

        match child_card {
            Some(c) if c.id == content_id => {
                path = c.path.clone();
            }
            Some(c) => {
                if over_budget(request, started, versions.len()) {
                    return Ok(VersionChain {
                        versions,
                        truncated: true,
                        tip: Some(current_id),
                    });
                }
                content_id = c.id.clone();
                path = c.path.clone();
                versions.push(FileVersion {
                    commit: child.id.clone(),
                    lines: load_lines(repo, &content_id)?,
                });
            }
            None => {
                versions.push(FileVersion {
                    commit: child.id.clone(),
                    lines: Vec::new(),
                });
                return Ok(VersionChain {
                    versions,
                    truncated: false,
                    tip: Some(child.id.clone()),
                });
            }
        }
        current_id = child.id;
    }
}

/// Map lines of `from` that survive unchanged into `to`.
///
/// Returns, for each line index of `from`, the matching index in `to`.
fn surviving_lines(from: &[String], to: &[String]) -> Vec<Option<usize>> {
    let mut map = vec![None; from.len()];
    for op in capture_diff_slices(Algorithm::Myers, from, to) {
        if let DiffOp::Equal {
            old_index,
            new_index,
            len,
        } = op
        {
            for k in 0..len {
                map[old_index + k] = Some(new_index + k);
            }
        }
    }
    map
}

/// Propagate line origins across the version chain and report attributions.
///
/// `origin[i]` holds the annotated-file line number that line `i` of the
/// version under inspection descends from (or leads to, in reverse mode).
/// Lines surviving the whole chain go to `tip`, or to the last version's
/// commit when there is none.
fn attribute(
    versions: &[FileVersion],
    reverse: bool,
    tip: Option<&ArtifactId>,
    on_line: &mut dyn FnMut(AnnotatedLine) -> Result<(), Cancelled>,
) -> Result<(), Cancelled> {
    let Some(first) = versions.first() else {
        return Ok(());
    };
    let mut origin: Vec<Option<usize>> = (0..first.lines.len()).map(Some).collect();

    for pair in versions.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);
        let survivors = surviving_lines(&current.lines, &next.lines);
        let mut next_origin = vec![None; next.lines.len()];
        // Forward: lines missing from the older version were introduced by `current`.
        // Reverse: lines missing from the newer version were changed by `next`.
        let credit = if reverse { &next.commit } else { &current.commit };
        for (line, source) in origin.iter().enumerate() {
            let Some(source) = *source else { continue };
            match survivors[line] {
                Some(target) => next_origin[target] = Some(source),
                None => on_line(AnnotatedLine {
                    line: source,
                    commit: credit.clone(),
                })?,
            }
        }
        origin = next_origin;
    }

    if let Some(credit) = tip.or_else(|| versions.last().map(|v| &v.commit)) {
        for source in origin.into_iter().flatten() {
            on_line(AnnotatedLine {
                line: source,
                commit: credit.clone(),
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::{AnnotateLimit, CommitSpec, SnapshotBuilder};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn at(secs: i64) -> chrono::DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    /// Three commits: c1 writes a/b/c, c2 changes b, c3 appends d.
    fn three_versions() -> (crate::repo::SnapshotRepository, Vec<ArtifactId>) {
        let mut b = SnapshotBuilder::new();
        let c1 = b.commit(CommitSpec::new("alice", at(0), "one").file("f.txt", "a\nb\nc\n"));
        let c2 = b.commit(
            CommitSpec::new("bob", at(10), "two")
                .parent(&c1)
                .file("f.txt", "a\nB\nc\n"),
        );
        let c3 = b.commit(
            CommitSpec::new("carol", at(20), "three")
                .parent(&c2)
                .file("f.txt", "a\nB\nc\nd\n"),
        );
        (b.build().unwrap(), vec![c1, c2, c3])
    }

    fn run(
        repo: &crate::repo::SnapshotRepository,
        request: &AnnotateRequest,
    ) -> (AnnotateStatus, BTreeMap<usize, ArtifactId>) {
        let mut seen = BTreeMap::new();
        let status = annotate(repo, request, &mut |line| {
            assert!(
                seen.insert(line.line, line.commit).is_none(),
                "line reported twice"
            );
            Ok(())
        })
        .unwrap();
        (status, seen)
    }

    #[test]
    fn forward_attributes_each_line_to_introducing_commit() {
        let (repo, ids) = three_versions();
        let request = AnnotateRequest {
            path: "f.txt".into(),
            start: ids[2].clone(),
            limit: AnnotateLimit::default(),
            reverse: false,
        };
        let (status, lines) = run(&repo, &request);
        assert_eq!(status, AnnotateStatus::Complete { versions: 3 });
        assert_eq!(lines[&0], ids[0]);
        assert_eq!(lines[&1], ids[1]);
        assert_eq!(lines[&2], ids[0]);
        assert_eq!(lines[&3], ids[2]);
    }

    #[test]
    fn version_limit_credits_remaining_lines_to_oldest_examined() {
        let (repo, ids) = three_versions();
        let request = AnnotateRequest {
            path: "f.txt".into(),
            start: ids[2].clone(),
            limit: AnnotateLimit {
                max_versions: Some(2),
                budget: None,
            },
            reverse: false,
        };
        let (status, lines) = run(&repo, &request);
        assert_eq!(status, AnnotateStatus::Truncated { versions: 2 });
        assert_eq!(lines.len(), 4, "every line still gets an attribution");
        assert_eq!(lines[&0], ids[1]);
        assert_eq!(lines[&3], ids[2]);
    }

    #[test]
    fn reverse_attributes_lines_to_first_later_change() {
        let (repo, ids) = three_versions();
        let request = AnnotateRequest {
            path: "f.txt".into(),
            start: ids[0].clone(),
            limit: AnnotateLimit::default(),
            reverse: true,
        };
        let (status, lines) = run(&repo, &request);
        assert_eq!(status, AnnotateStatus::Complete { versions: 3 });
        assert_eq!(lines.len(), 3, "root version has three lines");
        assert_eq!(lines[&1], ids[1], "'b' was changed by the second commit");
        assert_eq!(lines[&0], ids[2], "unchanged lines reach the tip");
    }

    #[test]
    fn reverse_credits_untouched_lines_to_the_tip_reached() {
        let mut b = SnapshotBuilder::new();
        let c1 = b.commit(CommitSpec::new("alice", at(0), "one").file("f.txt", "a\nb\n"));
        let c2 = b.commit(
            CommitSpec::new("bob", at(10), "edit b")
                .parent(&c1)
                .file("f.txt", "a\nB\n"),
        );
        let c3 = b.commit(
            CommitSpec::new("carol", at(20), "other file")
                .parent(&c2)
                .file("f.txt", "a\nB\n")
                .file("g.txt", "g\n"),
        );
        let repo = b.build().unwrap();
        let request = AnnotateRequest {
            path: "f.txt".into(),
            start: c1,
            limit: AnnotateLimit::default(),
            reverse: true,
        };
        let (status, lines) = run(&repo, &request);
        assert_eq!(status, AnnotateStatus::Complete { versions: 2 });
        assert_eq!(lines[&0], c3);
        assert_eq!(lines[&1], c2);
    }

    #[test]
    fn unchanged_commits_credit_the_oldest_identical_version() {
        let mut b = SnapshotBuilder::new();
        let c1 = b.commit(CommitSpec::new("alice", at(0), "one").file("f.txt", "x\n"));
        let c2 = b.commit(
            CommitSpec::new("bob", at(10), "touch other")
                .parent(&c1)
                .file("f.txt", "x\n")
                .file("g.txt", "y\n"),
        );
        let repo = b.build().unwrap();
        let request = AnnotateRequest {
            path: "f.txt".into(),
            start: c2,
            limit: AnnotateLimit::default(),
            reverse: false,
        };
        let (_, lines) = run(&repo, &request);
        assert_eq!(lines[&0], c1);
    }

    #[test]
    fn cancellation_stops_after_callback_error() {
        let (repo, ids) = three_versions();
        let request = AnnotateRequest {
            path: "f.txt".into(),
            start: ids[2].clone(),
            limit: AnnotateLimit::default(),
            reverse: false,
        };
        let mut calls = 0;
        let result = annotate(&repo, &request, &mut |_| {
            calls += 1;
            if calls == 2 {
                Err(Cancelled)
            } else {
                Ok(())
            }
        });
        assert!(matches!(result, Err(AnnotateError::Cancelled(_))));
        assert_eq!(calls, 2);
    }

    #[test]
    fn missing_path_is_reported() {
        let (repo, ids) = three_versions();
        let request = AnnotateRequest {
            path: "nope.txt".into(),
            start: ids[0].clone(),
            limit: AnnotateLimit::default(),
            reverse: false,
        };
        let result = annotate(&repo, &request, &mut |_| Ok(()));
        assert!(matches!(
            result,
            Err(AnnotateError::Repo(RepoError::PathNotFound { .. }))
        ));
    }
}
