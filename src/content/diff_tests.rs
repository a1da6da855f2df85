use super::*;
use crate::repo::{CommitSpec, SnapshotBuilder, SnapshotRepository, VFile};
use chrono::TimeZone;

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, minute, 0).unwrap()
}

fn all_lines(text: &mut DiffText) -> Vec<String> {
    let len = text.len();
    text.lines(0, len).unwrap()
}

fn two_commits(
    old: CommitSpec,
    new: impl FnOnce(&ArtifactId) -> CommitSpec,
) -> (SnapshotRepository, ArtifactId, ArtifactId) {
    let mut b = SnapshotBuilder::new();
    let c1 = b.commit(old);
    let c2 = b.commit(new(&c1));
    (b.build().unwrap(), c1, c2)
}

#[test]
fn offsets_point_at_line_starts() {
    let (repo, c1, c2) = two_commits(
        CommitSpec::new("alice", at(0), "base").file("a.txt", "1\n2\n3\n"),
        |p| {
            CommitSpec::new("bob", at(1), "edit\nwith body")
                .parent(p)
                .file("a.txt", "1\nzwei\n3\n")
                .file("b.txt", "new\n")
        },
    );
    let kind = DiffKind::Checkin {
        from: Some(c1),
        to: c2,
    };
    let text = DiffBuilder::new(&repo, DiffOptions::default())
        .build(&kind)
        .unwrap();
    let len = text.len();
    let offsets: Vec<u64> = (0..len).map(|k| text.offset(k).unwrap()).collect();
    let bytes = text.into_inner().into_inner();

    let mut expected = vec![0u64];
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'\n' && i + 1 < bytes.len() {
            expected.push(i as u64 + 1);
        }
    }
    assert_eq!(offsets, expected);
}

#[test]
fn recorded_rename_yields_one_segment() {
    let (repo, c1, c2) = two_commits(
        CommitSpec::new("alice", at(0), "base").file("old.txt", "same\n"),
        |p| {
            CommitSpec::new("alice", at(1), "move")
                .parent(p)
                .file("new.txt", "same\nplus\n")
                .rename("old.txt", "new.txt")
        },
    );
    let mut text = DiffBuilder::new(&repo, DiffOptions::default())
        .build(&DiffKind::Checkin {
            from: Some(c1),
            to: c2,
        })
        .unwrap();
    assert_eq!(
        text.segments(),
        &[FileSegment {
            path: "new.txt".into(),
            change: FileChange::Renamed {
                from: "old.txt".into()
            },
            start: text.segments()[0].start,
        }]
    );
    let start = text.segments()[0].start;
    assert_eq!(
        text.line(start).unwrap().as_deref(),
        Some("RENAMED  old.txt -> new.txt")
    );
    let lines = all_lines(&mut text);
    assert!(lines.contains(&"+plus".to_string()));
}

#[test]
fn rename_from_an_earlier_checkin_is_not_repeated() {
    let mut b = SnapshotBuilder::new();
    let c1 = b.commit(CommitSpec::new("alice", at(0), "base").file("x.txt", "one\n"));
    let c2 = b.commit(
        CommitSpec::new("alice", at(1), "move")
            .parent(&c1)
            .file("y.txt", "one\n")
            .rename("x.txt", "y.txt"),
    );
    let c3 = b.commit(
        CommitSpec::new("bob", at(2), "bring x back")
            .parent(&c2)
            .file("x.txt", "two\n")
            .file("y.txt", "one\n"),
    );
    let repo = b.build().unwrap();
    let text = DiffBuilder::new(&repo, DiffOptions::default())
        .build(&DiffKind::Checkin {
            from: Some(c2),
            to: c3,
        })
        .unwrap();
    let changes: Vec<_> = text
        .segments()
        .iter()
        .map(|s| (s.path.as_str(), s.change.clone()))
        .collect();
    assert_eq!(changes, vec![("x.txt", FileChange::Added)]);
}

#[test]
fn inverted_recorded_rename_points_back() {
    let (repo, c1, c2) = two_commits(
        CommitSpec::new("alice", at(0), "base").file("old.txt", "same\n"),
        |p| {
            CommitSpec::new("alice", at(1), "move")
                .parent(p)
                .file("new.txt", "same\nplus\n")
                .rename("old.txt", "new.txt")
        },
    );
    let options = DiffOptions {
        invert: true,
        ..Default::default()
    };
    let text = DiffBuilder::new(&repo, options)
        .build(&DiffKind::Checkin {
            from: Some(c1),
            to: c2,
        })
        .unwrap();
    let changes: Vec<_> = text
        .segments()
        .iter()
        .map(|s| (s.path.as_str(), s.change.clone()))
        .collect();
    assert_eq!(
        changes,
        vec![(
            "old.txt",
            FileChange::Renamed {
                from: "new.txt".into()
            }
        )]
    );
}

#[test]
fn identical_content_add_and_remove_pair_as_rename() {
    let (repo, c1, c2) = two_commits(
        CommitSpec::new("alice", at(0), "base").file("a/x.rs", "fn x() {}\n"),
        |p| {
            CommitSpec::new("alice", at(1), "move")
                .parent(p)
                .file("b/x.rs", "fn x() {}\n")
        },
    );
    let text = DiffBuilder::new(&repo, DiffOptions::default())
        .build(&DiffKind::Checkin {
            from: Some(c1),
            to: c2,
        })
        .unwrap();
    assert_eq!(text.segments().len(), 1);
    assert_eq!(
        text.segments()[0].change,
        FileChange::Renamed {
            from: "a/x.rs".into()
        }
    );
}

#[test]
fn blob_diff_renders_unified_hunk() {
    let mut b = SnapshotBuilder::new();
    let old = b.blob("a\nb\nc\n");
    let new = b.blob("a\nB\nc\nd\n");
    let repo = b.build().unwrap();
    let mut text = DiffBuilder::new(&repo, DiffOptions::default())
        .build(&DiffKind::Blobs { from: old, to: new })
        .unwrap();
    let body = all_lines(&mut text)[4..].join("\n");
    insta::assert_snapshot!(body, @r"
    @@ -1,3 +1,4 @@
     a
    -b
    +B
     c
    +d
    ");
}

#[test]
fn invert_swaps_sides() {
    let mut b = SnapshotBuilder::new();
    let old = b.blob("keep\nold\n");
    let new = b.blob("keep\nnew\n");
    let repo = b.build().unwrap();
    let options = DiffOptions {
        invert: true,
        ..Default::default()
    };
    let mut text = DiffBuilder::new(&repo, options)
        .build(&DiffKind::Blobs { from: old, to: new })
        .unwrap();
    let lines = all_lines(&mut text);
    assert!(lines.contains(&"-new".to_string()));
    assert!(lines.contains(&"+old".to_string()));
}

#[test]
fn whitespace_only_changes_can_be_ignored() {
    let mut b = SnapshotBuilder::new();
    let old = b.blob("let x = 1;\n");
    let new = b.blob("let  x =\t1;\n");
    let repo = b.build().unwrap();
    let options = DiffOptions {
        ignore_whitespace: true,
        ..Default::default()
    };
    let mut text = DiffBuilder::new(&repo, options)
        .build(&DiffKind::Blobs { from: old, to: new })
        .unwrap();
    let lines = all_lines(&mut text);
    assert_eq!(lines.last().map(String::as_str), Some("(whitespace changes only)"));
}

#[test]
fn added_file_body_only_in_verbose_mode() {
    let (repo, c1, c2) = two_commits(CommitSpec::new("alice", at(0), "base"), |p| {
        CommitSpec::new("alice", at(1), "add")
            .parent(p)
            .file("n.txt", "hello\n")
    });
    let kind = DiffKind::Checkin {
        from: Some(c1),
        to: c2,
    };
    let mut quiet = DiffBuilder::new(&repo, DiffOptions::default())
        .build(&kind)
        .unwrap();
    assert!(!all_lines(&mut quiet).contains(&"+hello".to_string()));

    let verbose = DiffOptions {
        verbose: true,
        ..Default::default()
    };
    let mut loud = DiffBuilder::new(&repo, verbose).build(&kind).unwrap();
    assert!(all_lines(&mut loud).contains(&"+hello".to_string()));
    assert_eq!(loud.segments()[0].change, FileChange::Added);
}

#[test]
fn segment_navigation_moves_between_files() {
    let (repo, c1, c2) = two_commits(
        CommitSpec::new("alice", at(0), "base")
            .file("a", "1\n")
            .file("b", "1\n")
            .file("c", "1\n"),
        |p| {
            CommitSpec::new("alice", at(1), "all")
                .parent(p)
                .file("a", "2\n")
                .file("b", "2\n")
                .file("c", "2\n")
        },
    );
    let text = DiffBuilder::new(&repo, DiffOptions::default())
        .build(&DiffKind::Checkin {
            from: Some(c1),
            to: c2,
        })
        .unwrap();
    let starts: Vec<usize> = text.segments().iter().map(|s| s.start).collect();
    assert_eq!(starts.len(), 3);
    assert_eq!(text.next_segment(0).map(|s| s.start), Some(starts[0]));
    assert_eq!(text.next_segment(starts[0]).map(|s| s.start), Some(starts[1]));
    assert_eq!(text.prev_segment(starts[2]).map(|s| s.start), Some(starts[1]));
    assert!(text.next_segment(starts[2]).is_none());
}

#[test]
fn local_diff_requires_checkout() {
    let mut b = SnapshotBuilder::new();
    b.commit(CommitSpec::new("alice", at(0), "base").file("a", "1\n"));
    let repo = b.build().unwrap();
    let err = DiffBuilder::new(&repo, DiffOptions::default())
        .build(&DiffKind::Local)
        .unwrap_err();
    assert!(matches!(err, RepoError::NoCheckout));
}

#[test]
fn local_diff_lists_edited_and_added_files() {
    let mut b = SnapshotBuilder::new();
    let base = b.commit(
        CommitSpec::new("alice", at(0), "base")
            .file("a", "1\n")
            .file("b", "keep\n"),
    );
    b.checkout(
        &base,
        vec![
            VFile {
                path: "a".into(),
                state: VFileState::Edited,
                content: Some("2\n".into()),
            },
            VFile {
                path: "b".into(),
                state: VFileState::Unchanged,
                content: Some("keep\n".into()),
            },
            VFile {
                path: "c".into(),
                state: VFileState::Added,
                content: Some("new\n".into()),
            },
        ],
    );
    let repo = b.build().unwrap();
    let mut text = DiffBuilder::new(&repo, DiffOptions::default())
        .build(&DiffKind::Local)
        .unwrap();
    let changes: Vec<_> = text.segments().iter().map(|s| s.change.clone()).collect();
    assert_eq!(changes, vec![FileChange::Modified, FileChange::Added]);
    let lines = all_lines(&mut text);
    assert!(lines.contains(&"-1".to_string()));
    assert!(lines.contains(&"+2".to_string()));
}

#[test]
fn ticket_changes_render_fields() {
    let mut b = SnapshotBuilder::new();
    let id = b.ticket(
        "abcdef",
        "carol",
        at(3),
        &[("status", "closed"), ("comment", "first\nsecond")],
    );
    let repo = b.build().unwrap();
    let kind = DiffKind::for_artifact(&repo, &id).unwrap();
    assert_eq!(kind, DiffKind::NonCheckin(id));
    let mut text = DiffBuilder::new(&repo, DiffOptions::default())
        .build(&kind)
        .unwrap();
    let lines = all_lines(&mut text);
    let fields = lines
        .iter()
        .position(|l| l == "Fields changed:")
        .unwrap();
    assert_eq!(
        &lines[fields + 1..],
        &["  comment: first", "    second", "  status: closed"]
    );
}

#[test]
fn checkin_kind_diffs_against_parent() {
    let (repo, c1, c2) = two_commits(
        CommitSpec::new("alice", at(0), "base").file("a", "1\n"),
        |p| CommitSpec::new("alice", at(1), "next").parent(p).file("a", "2\n"),
    );
    assert_eq!(
        DiffKind::for_artifact(&repo, &c2).unwrap(),
        DiffKind::Checkin {
            from: Some(c1),
            to: c2
        }
    );
}

#[test]
fn multi_line_tag_values_keep_offsets_in_step() {
    let mut b = SnapshotBuilder::new();
    let c1 = b.commit(CommitSpec::new("alice", at(0), "base").file("a", "1\n"));
    let id = b.tag(
        "dave",
        at(4),
        &c1,
        vec![crate::repo::TagCard {
            op: crate::repo::TagOp::Add,
            name: "note".into(),
            value: Some("line one\nline two".into()),
        }],
    );
    let repo = b.build().unwrap();
    let mut text = DiffBuilder::new(&repo, DiffOptions::default())
        .build(&DiffKind::NonCheckin(id))
        .unwrap();
    let lines = all_lines(&mut text);
    assert_eq!(
        &lines[lines.len() - 2..],
        &["  +note=line one", "        line two"]
    );

    let len = text.len();
    let offsets: Vec<u64> = (0..len).map(|k| text.offset(k).unwrap()).collect();
    let bytes = text.into_inner().into_inner();
    let newlines = bytes.iter().filter(|b| **b == b'\n').count();
    assert_eq!(offsets.len(), newlines);
    for pair in offsets.windows(2) {
        assert_eq!(bytes[pair[1] as usize - 1], b'\n');
    }
}
