//! Tree view: directory listing of one checkin.
//!
//! The node arena is built once. Each directory on screen is a materialized
//! [`TreeObject`]; descending pushes the current listing onto a
//! [`ParentFrame`] stack and ascending pops it, dropping the subtree listing.

use crate::content::{ParentFrame, RepositoryTree, TreeEntry, TreeObject, ROOT};
use crate::model::{AppError, ArtifactId, KeyAction, RepoError, SHORT_ID_LEN};
use crate::repo::{HistoryQuery, Permission};
use crate::search::SearchTarget;
use crate::view::{
    clip, render_header, render_row, scroll_into_view, BlameOptions, BlameView, Context,
    InputOutcome, Palette, Panel, TimelineView, ViewKind, ViewPanel,
};
use ratatui::{buffer::Buffer, layout::Rect, text::Span};
use regex::Regex;
use tracing::debug;

/// Directory browser.
#[derive(Debug)]
pub struct TreeView {
    tree: RepositoryTree,
    current: TreeObject,
    frames: Vec<ParentFrame>,
    selected: usize,
    offset: usize,
    rows: usize,
    show_ids: bool,
}

impl TreeView {
    /// Tree of `commit`, opened at directory `path` (root when `None`).
    ///
    /// # Errors
    ///
    /// Repository errors loading the manifest; `RepoError::PathNotFound` when
    /// `path` is not a directory of `commit`.
    pub fn new(ctx: &Context, commit: &ArtifactId, path: Option<&str>) -> Result<Self, AppError> {
        let manifest = ctx.repo.manifest(commit)?;
        let tree = RepositoryTree::build(&manifest);
        let not_found = |p: &str| RepoError::PathNotFound {
            path: p.to_string(),
            commit: commit.short().to_string(),
        };
        let root = tree.materialize(ROOT).ok_or_else(|| not_found(""))?;
        let mut view = Self {
            tree,
            current: root,
            frames: Vec::new(),
            selected: 0,
            offset: 0,
            rows: 1,
            show_ids: ctx.config.settings.flag("show-ids"),
        };
        if let Some(path) = path.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
            let mut walked = String::new();
            for name in path.split('/') {
                if !walked.is_empty() {
                    walked.push('/');
                }
                walked.push_str(name);
                let index = view
                    .current
                    .entries
                    .iter()
                    .position(|e| e.is_dir() && e.name == name)
                    .ok_or_else(|| not_found(path))?;
                view.selected = index;
                view.descend()?;
            }
            debug!(path = %walked, depth = view.frames.len(), "tree opened below root");
        }
        Ok(view)
    }

    /// Checkin being browsed.
    pub fn checkin(&self) -> &ArtifactId {
        self.tree.checkin()
    }

    /// Listing on screen.
    pub fn current(&self) -> &TreeObject {
        &self.current
    }

    /// Directories above the current one.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Whether file ids are displayed.
    pub fn shows_ids(&self) -> bool {
        self.show_ids
    }

    fn entry(&self) -> Option<&TreeEntry> {
        self.current.entries.get(self.selected)
    }

    fn descend(&mut self) -> Result<(), AppError> {
        let Some(entry) = self.entry().filter(|e| e.is_dir()) else {
            return Ok(());
        };
        let (node, path) = (entry.node, entry.path.clone());
        let object = self.tree.materialize(node).ok_or(RepoError::PathNotFound {
            path,
            commit: self.tree.checkin().short().to_string(),
        })?;
        let parent = std::mem::replace(&mut self.current, object);
        self.frames.push(ParentFrame {
            object: parent,
            selected: self.selected,
            offset: self.offset,
        });
        self.selected = 0;
        self.offset = 0;
        Ok(())
    }

    fn ascend(&mut self) -> bool {
        match self.frames.pop() {
            Some(frame) => {
                self.current = frame.object;
                self.selected = frame.selected;
                self.offset = scroll_into_view(frame.selected, frame.offset, self.rows);
                true
            }
            None => false,
        }
    }

    fn open_blame(&self, ctx: &Context) -> Result<InputOutcome, AppError> {
        let Some(entry) = self.entry() else {
            return Ok(InputOutcome::Ignored);
        };
        if entry.is_dir() {
            return Ok(InputOutcome::Status(format!("{} is a directory", entry.path)));
        }
        let blame = BlameView::new(
            ctx,
            &entry.path,
            self.tree.checkin(),
            BlameOptions::from_config(&ctx.config),
        )?;
        Ok(InputOutcome::Open(Box::new(ViewPanel::Blame(blame))))
    }

    fn entry_spans<'a>(&self, entry: &'a TreeEntry, width: usize, palette: &Palette) -> Vec<Span<'a>> {
        let mut spans = Vec::new();
        if self.show_ids {
            let id = entry.id.as_ref().map_or("", |id| id.short());
            spans.push(Span::styled(format!("{id:<SHORT_ID_LEN$} "), palette.id));
        }
        let (name, style) = if entry.is_dir() {
            (format!("{}/", entry.name), palette.directory)
        } else {
            let suffix = match entry.perm {
                Permission::Regular => "",
                Permission::Executable => "*",
                Permission::Symlink => "@",
            };
            (format!("{}{suffix}", entry.name), Default::default())
        };
        spans.push(Span::styled(clip(&name, width), style));
        spans
    }
}

impl SearchTarget for TreeView {
    fn len(&self) -> usize {
        self.current.entries.len()
    }

    fn is_match(&mut self, index: usize, pattern: &Regex) -> bool {
        self.current
            .entries
            .get(index)
            .is_some_and(|e| pattern.is_match(&e.name))
    }
}

impl Panel for TreeView {
    fn kind(&self) -> ViewKind {
        ViewKind::Tree
    }

    fn title(&self) -> String {
        format!("tree {} /{}", self.tree.checkin().short(), self.current.path)
    }

    fn show(
        &mut self,
        area: Rect,
        buf: &mut Buffer,
        active: bool,
        palette: &Palette,
    ) -> Result<(), AppError> {
        self.resize(area);
        let position = format!(
            "{}/{}",
            if self.current.entries.is_empty() { 0 } else { self.selected + 1 },
            self.current.entries.len()
        );
        render_header(area, buf, &self.title(), &position, active, palette);

        let body = Rect {
            y: area.y + 1,
            height: area.height.saturating_sub(1),
            ..area
        };
        let width = usize::from(area.width);
        let end = (self.offset + self.rows).min(self.current.entries.len());
        for (row, entry) in self.current.entries[self.offset.min(end)..end].iter().enumerate() {
            let index = self.offset + row;
            let spans = self.entry_spans(entry, width, palette);
            render_row(body, buf, row as u16, spans, index == self.selected, palette);
        }
        Ok(())
    }

    fn input(&mut self, action: KeyAction, ctx: &Context) -> Result<InputOutcome, AppError> {
        let page = self.rows.max(1);
        match action {
            KeyAction::ScrollDown => self.select(self.selected + 1),
            KeyAction::ScrollUp => self.select(self.selected.saturating_sub(1)),
            KeyAction::PageDown => self.select(self.selected + page),
            KeyAction::PageUp => self.select(self.selected.saturating_sub(page)),
            KeyAction::HalfPageDown => self.select(self.selected + (page / 2).max(1)),
            KeyAction::HalfPageUp => self.select(self.selected.saturating_sub((page / 2).max(1))),
            KeyAction::ScrollToTop => self.select(0),
            KeyAction::Select => match self.entry() {
                Some(entry) if entry.is_dir() => self.descend()?,
                Some(_) => return self.open_blame(ctx),
                None => return Ok(InputOutcome::Ignored),
            },
            KeyAction::BlameCommit => return self.open_blame(ctx),
            KeyAction::Back => {
                if !self.ascend() {
                    return Ok(InputOutcome::Status("already at the root".to_string()));
                }
            }
            KeyAction::ToggleIds => self.show_ids = !self.show_ids,
            KeyAction::OpenTimeline => {
                let path = match self.entry() {
                    Some(entry) => entry.path.clone(),
                    None => self.current.path.clone(),
                };
                let query = HistoryQuery {
                    start: Some(self.tree.checkin().clone()),
                    path: Some(path).filter(|p| !p.is_empty()),
                    ..HistoryQuery::default()
                };
                let timeline = TimelineView::new(ctx, query);
                return Ok(InputOutcome::Open(Box::new(ViewPanel::Timeline(timeline))));
            }
            KeyAction::Close => return Ok(InputOutcome::Close),
            KeyAction::Quit => return Ok(InputOutcome::Quit),
            _ => return Ok(InputOutcome::Ignored),
        }
        Ok(InputOutcome::Handled)
    }

    fn selected(&self) -> usize {
        self.selected
    }

    fn select(&mut self, index: usize) {
        self.selected = index.min(self.current.entries.len().saturating_sub(1));
        self.offset = scroll_into_view(self.selected, self.offset, self.rows);
    }

    fn resize(&mut self, area: Rect) {
        self.rows = usize::from(area.height.saturating_sub(1)).max(1);
        self.offset = scroll_into_view(self.selected, self.offset, self.rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolvedConfig;
    use crate::repo::{CommitSpec, SnapshotBuilder};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn setup() -> (Context, ArtifactId) {
        let mut b = SnapshotBuilder::new();
        let c1 = b.commit(
            CommitSpec::new("alice", Utc.with_ymd_and_hms(2024, 2, 2, 2, 2, 2).unwrap(), "init")
                .file("README", "hi\n")
                .file("src/main.rs", "fn main() {}\n")
                .file("src/view/mod.rs", "\n")
                .executable("build.sh", "#!/bin/sh\n"),
        );
        let ctx = Context::new(Arc::new(b.build().unwrap()), ResolvedConfig::default());
        (ctx, c1)
    }

    fn names(view: &TreeView) -> Vec<&str> {
        view.current().entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn root_listing_is_path_sorted() {
        let (ctx, c1) = setup();
        let view = TreeView::new(&ctx, &c1, None).unwrap();
        assert_eq!(names(&view), vec!["README", "build.sh", "src"]);
    }

    #[test]
    fn descend_and_ascend_restore_the_cursor() {
        let (ctx, c1) = setup();
        let mut view = TreeView::new(&ctx, &c1, None).unwrap();
        view.select(2);
        view.input(KeyAction::Select, &ctx).unwrap();
        assert_eq!(view.depth(), 1);
        assert_eq!(names(&view), vec!["main.rs", "view"]);
        assert_eq!(view.selected(), 0);

        view.input(KeyAction::Back, &ctx).unwrap();
        assert_eq!(view.depth(), 0);
        assert_eq!(view.selected(), 2);
        let outcome = view.input(KeyAction::Back, &ctx).unwrap();
        assert!(matches!(outcome, InputOutcome::Status(_)));
    }

    #[test]
    fn opening_at_a_path_builds_the_frame_stack() {
        let (ctx, c1) = setup();
        let mut view = TreeView::new(&ctx, &c1, Some("src/view")).unwrap();
        assert_eq!(view.depth(), 2);
        assert_eq!(names(&view), vec!["mod.rs"]);
        view.input(KeyAction::Back, &ctx).unwrap();
        assert_eq!(view.current().path, "src");
        assert_eq!(view.selected(), 1);
    }

    #[test]
    fn missing_directory_is_a_repository_error() {
        let (ctx, c1) = setup();
        let err = TreeView::new(&ctx, &c1, Some("docs")).unwrap_err();
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("docs"));
        let err = TreeView::new(&ctx, &c1, Some("README")).unwrap_err();
        assert!(matches!(err, AppError::Repo(RepoError::PathNotFound { .. })));
    }

    #[test]
    fn selecting_a_file_opens_blame() {
        let (ctx, c1) = setup();
        let mut view = TreeView::new(&ctx, &c1, None).unwrap();
        let outcome = view.input(KeyAction::Select, &ctx).unwrap();
        match outcome {
            InputOutcome::Open(panel) => assert_eq!(panel.kind(), ViewKind::Blame),
            other => panic!("expected blame, got {other:?}"),
        }
    }

    #[test]
    fn timeline_is_filtered_by_the_selected_path() {
        let (ctx, c1) = setup();
        let mut view = TreeView::new(&ctx, &c1, None).unwrap();
        view.select(2);
        let outcome = view.input(KeyAction::OpenTimeline, &ctx).unwrap();
        let InputOutcome::Open(panel) = outcome else {
            panic!("expected a timeline");
        };
        let ViewPanel::Timeline(timeline) = *panel else {
            panic!("expected a timeline");
        };
        assert_eq!(timeline.producer().query().path.as_deref(), Some("src"));
    }

    #[test]
    fn id_toggle_flips_display() {
        let (ctx, c1) = setup();
        let mut view = TreeView::new(&ctx, &c1, None).unwrap();
        assert!(!view.shows_ids());
        view.input(KeyAction::ToggleIds, &ctx).unwrap();
        assert!(view.shows_ids());
    }
}
