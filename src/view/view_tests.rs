use super::*;
use crate::repo::{CommitSpec, SnapshotBuilder};
use crate::test_harness::{buffer_to_string, minute};
use std::sync::Arc;

fn context() -> (Context, ArtifactId) {
    let mut b = SnapshotBuilder::new();
    let root = b.commit(CommitSpec::new("frank", minute(0), "root").file("a.txt", "one\n"));
    b.commit(
        CommitSpec::new("frank", minute(1), "feature work")
            .parent(&root)
            .branch("feature")
            .file("a.txt", "one\ntwo\n"),
    );
    let tip = b.commit(
        CommitSpec::new("grace", minute(2), "trunk work")
            .parent(&root)
            .file("a.txt", "zero\none\n"),
    );
    let ctx = Context::new(Arc::new(b.build().unwrap()), ResolvedConfig::default());
    (ctx, tip)
}

fn branch_view(ctx: &Context) -> View {
    open_branch(ctx, BranchFilter::default()).unwrap()
}

fn diff_view(ctx: &Context, tip: &ArtifactId) -> View {
    let kind = DiffKind::for_artifact(ctx.repo.as_ref(), tip).unwrap();
    open_diff(ctx, kind).unwrap()
}

#[test]
fn clip_counts_terminal_cells() {
    assert_eq!(clip("hello", 3), "hel");
    assert_eq!(clip("日本語", 4), "日本");
    assert_eq!(clip("日本語", 5), "日本");
    assert_eq!(clip("", 5), "");
}

#[test]
fn scroll_into_view_moves_only_when_needed() {
    assert_eq!(scroll_into_view(3, 0, 10), 0);
    assert_eq!(scroll_into_view(10, 0, 10), 1);
    assert_eq!(scroll_into_view(2, 5, 10), 2);
    assert_eq!(scroll_into_view(7, 7, 0), 7);
}

#[test]
fn header_pads_between_title_and_position() {
    let area = Rect::new(0, 0, 20, 1);
    let mut buf = Buffer::empty(area);
    render_header(area, &mut buf, "timeline", "3/9", true, &Palette::default());
    assert_eq!(buffer_to_string(&buf), "timeline         3/9");
}

#[test]
fn vertical_child_draws_a_divider() {
    let (ctx, tip) = context();
    let mut parent = branch_view(&ctx);
    let mut child = diff_view(&ctx, &tip);
    child.set_mode(SplitMode::Vertical);
    parent.set_child(child).unwrap();

    let area = Rect::new(0, 0, 130, 12);
    parent.layout(area, SplitHeight::default());
    let child = parent.child().unwrap();
    assert_eq!(parent.panel_area().width, 50);
    assert_eq!(child.area().x, 50);
    assert_eq!(child.panel_area().x, 51);
    assert_eq!(child.panel_area().width, 79);

    let mut buf = Buffer::empty(area);
    parent.show(&mut buf, &Palette::default()).unwrap();
    assert_eq!(buf[(50, 3)].symbol(), "│");
    let screen = buffer_to_string(&buf);
    assert!(screen.contains("branches"));
    assert!(screen.contains("diff "));
}

#[test]
fn fullscreen_child_hides_its_parent() {
    let (ctx, tip) = context();
    let mut parent = branch_view(&ctx);
    parent.set_child(diff_view(&ctx, &tip)).unwrap();
    assert!(parent.child_is_fullscreen());

    let area = Rect::new(0, 0, 80, 10);
    parent.layout(area, SplitHeight::default());
    let mut buf = Buffer::empty(area);
    parent.show(&mut buf, &Palette::default()).unwrap();
    let screen = buffer_to_string(&buf);
    assert!(!screen.contains("branches"));
    assert!(screen.contains("diff "));
}

#[test]
fn close_releases_the_child_and_is_idempotent() {
    let (ctx, tip) = context();
    let mut parent = branch_view(&ctx);
    parent.set_child(diff_view(&ctx, &tip)).unwrap();
    parent.search_init(Regex::new("trunk").unwrap());

    parent.close().unwrap();
    assert!(parent.child().is_none());
    assert!(parent.search().pattern().is_none());
    parent.close().unwrap();
}

#[test]
fn search_steps_report_their_outcome() {
    let (ctx, _) = context();
    let mut view = branch_view(&ctx);
    view.layout(Rect::new(0, 0, 80, 10), SplitHeight::default());

    let outcome = view.search_next(SearchDirection::Forward);
    assert!(matches!(outcome, InputOutcome::Status(ref s) if s == "no search pattern"));

    view.search_init(Regex::new("release").unwrap());
    let outcome = view.search_next(SearchDirection::Forward);
    assert!(matches!(outcome, InputOutcome::Status(ref s) if s == "no matches found"));

    view.search_init(Regex::new("^trunk$").unwrap());
    let outcome = view.search_next(SearchDirection::Forward);
    assert!(matches!(outcome, InputOutcome::Handled));
    // Sorted by name: feature, trunk.
    assert_eq!(view.panel().selected(), 1);

    // Reverse from the only match finds nothing: reverse never wraps.
    let outcome = view.input(KeyAction::PrevMatch, &ctx).unwrap();
    assert!(matches!(outcome, InputOutcome::Status(ref s) if s == "no matches found"));
}

#[test]
fn end_key_selects_the_last_row_of_a_complete_list() {
    let (ctx, _) = context();
    let mut view = branch_view(&ctx);
    view.layout(Rect::new(0, 0, 80, 10), SplitHeight::default());
    let outcome = view.input(KeyAction::ScrollToBottom, &ctx).unwrap();
    assert!(matches!(outcome, InputOutcome::Handled));
    assert_eq!(view.panel().selected(), view.panel().len() - 1);
}

#[test]
fn kind_labels_name_each_view() {
    let labels: Vec<&str> = [
        ViewKind::Timeline,
        ViewKind::Diff,
        ViewKind::Tree,
        ViewKind::Blame,
        ViewKind::Branch,
    ]
    .into_iter()
    .map(ViewKind::label)
    .collect();
    assert_eq!(labels, ["timeline", "diff", "tree", "blame", "branch"]);
}
