//! Blame view.
//!
//! The file text is shown immediately; attributions fill in as the
//! [`BlameProducer`] reports them. Blaming another version (parent of the
//! selected line's commit, or that commit itself) stops the running worker,
//! pushes the current version on a stack, and starts over; `c` pops it.

use crate::config::ResolvedConfig;
use crate::content::{format_blame_line, load_blame_source, number_width, BlameSource, CommitMeta, DiffKind};
use crate::model::{AppError, ArtifactId, BlameLines, KeyAction};
use crate::producer::{BlameOutcome, BlameProducer};
use crate::repo::{AnnotateLimit, AnnotateRequest, AnnotateStatus, HistoryQuery, SharedRepository};
use crate::search::SearchTarget;
use crate::view::{
    clip, render_header, render_row, scroll_into_view, Context, DiffView, InputOutcome, Palette,
    Panel, TimelineView, ViewKind, ViewPanel,
};
use ratatui::{buffer::Buffer, layout::Rect, text::Span};
use regex::Regex;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Limits and direction of a blame run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlameOptions {
    /// Stop after this many versions.
    pub limit: Option<usize>,
    /// Stop after this much wall-clock time.
    pub budget: Option<Duration>,
    /// Walk forward from the given commit instead of back.
    pub reverse: bool,
}

impl BlameOptions {
    /// Options from the configured version limit.
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self {
            limit: config.blame_limit,
            ..Self::default()
        }
    }
}

/// A version blamed earlier, restored by `c`.
#[derive(Debug, Clone)]
struct BlameFrame {
    commit: ArtifactId,
    path: String,
    selected: usize,
    offset: usize,
}

/// Per-line attribution of one file.
pub struct BlameView {
    repo: SharedRepository,
    options: BlameOptions,
    source: BlameSource,
    lines: BlameLines,
    metas: HashMap<ArtifactId, CommitMeta>,
    producer: Option<BlameProducer>,
    frames: Vec<BlameFrame>,
    outcome: Option<String>,
    selected: usize,
    offset: usize,
    rows: usize,
}

impl std::fmt::Debug for BlameView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlameView")
            .field("path", &self.source.path)
            .field("commit", &self.source.commit)
            .field("annotated", &self.lines.annotated())
            .field("lines", &self.lines.len())
            .field("running", &self.producer.is_some())
            .finish_non_exhaustive()
    }
}

impl BlameView {
    /// Blame `path` as of `commit` (the root commit in reverse mode).
    ///
    /// # Errors
    ///
    /// Repository errors loading the file; `AppError::Worker` if the worker
    /// cannot be spawned.
    pub fn new(
        ctx: &Context,
        path: &str,
        commit: &ArtifactId,
        options: BlameOptions,
    ) -> Result<Self, AppError> {
        let source = load_blame_source(ctx.repo.as_ref(), path, commit)?;
        let mut view = Self {
            repo: ctx.repo.clone(),
            options,
            lines: BlameLines::new(source.lines.len()),
            source,
            metas: HashMap::new(),
            producer: None,
            frames: Vec::new(),
            outcome: None,
            selected: 0,
            offset: 0,
            rows: 1,
        };
        view.spawn()?;
        Ok(view)
    }

    /// The version being blamed.
    pub fn source(&self) -> &BlameSource {
        &self.source
    }

    /// Attributions so far.
    pub fn lines(&self) -> &BlameLines {
        &self.lines
    }

    /// Versions stacked below the current one.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Whether the worker is still running.
    pub fn is_running(&self) -> bool {
        self.producer.is_some()
    }

    /// How the last run ended, once it has.
    pub fn outcome(&self) -> Option<&str> {
        self.outcome.as_deref()
    }

    fn spawn(&mut self) -> Result<(), AppError> {
        let request = AnnotateRequest {
            path: self.source.path.clone(),
            start: self.source.commit.clone(),
            limit: AnnotateLimit {
                max_versions: self.options.limit,
                budget: self.options.budget,
            },
            reverse: self.options.reverse,
        };
        self.producer = Some(BlameProducer::spawn(self.repo.clone(), request)?);
        self.outcome = None;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AppError> {
        if let Some(mut producer) = self.producer.take() {
            producer.stop()?;
        }
        Ok(())
    }

    /// Stop the current run and blame `path` as of `commit` instead.
    fn restart(&mut self, commit: &ArtifactId, path: &str) -> Result<(), AppError> {
        let source = load_blame_source(self.repo.as_ref(), path, commit)?;
        self.stop()?;
        info!(path = %source.path, commit = %commit.short(), "restarting blame");
        self.lines = BlameLines::new(source.lines.len());
        self.source = source;
        self.spawn()
    }

    fn line_commit(&self) -> Option<ArtifactId> {
        self.lines.get(self.selected).and_then(|l| l.commit.clone())
    }

    /// Name of the blamed file as of `target`, following renames along the
    /// primary chain the annotate walk took. Falls back to the current name
    /// when `target` is not on that chain.
    fn path_at(&self, target: &ArtifactId) -> Result<String, AppError> {
        let mut path = self.source.path.clone();
        let mut current = self.source.commit.clone();
        loop {
            if &current == target {
                return Ok(path);
            }
            let next = if self.options.reverse {
                let Some(child) = self.repo.children(&current)?.into_iter().next() else {
                    break;
                };
                let manifest = self.repo.manifest(&child)?;
                if let Some(renamed) = manifest
                    .cards
                    .iter()
                    .find(|c| c.prior_name.as_deref() == Some(path.as_str()))
                {
                    path = renamed.path.clone();
                } else if manifest.card(&path).is_none() {
                    break;
                }
                child
            } else {
                let manifest = self.repo.manifest(&current)?;
                let Some(card) = manifest.card(&path) else {
                    break;
                };
                if let Some(prior) = &card.prior_name {
                    path = prior.clone();
                }
                let Some(parent) = manifest.parent().cloned() else {
                    break;
                };
                parent
            };
            current = next;
        }
        debug!(commit = %target.short(), path = %self.source.path, "blame target off the walked chain");
        Ok(self.source.path.clone())
    }

    fn blame_version(&mut self, target: ArtifactId, path: String) -> Result<InputOutcome, AppError> {
        if target == self.source.commit {
            return Ok(InputOutcome::Status(format!(
                "already blaming {}",
                target.short()
            )));
        }
        let frame = BlameFrame {
            commit: self.source.commit.clone(),
            path: self.source.path.clone(),
            selected: self.selected,
            offset: self.offset,
        };
        self.restart(&target, &path)?;
        self.frames.push(frame);
        let selected = self.selected;
        self.select(selected);
        Ok(InputOutcome::Handled)
    }

    fn blame_parent(&mut self) -> Result<InputOutcome, AppError> {
        let Some(commit) = self.line_commit() else {
            return Ok(InputOutcome::Status("line is not annotated yet".to_string()));
        };
        let path = self.path_at(&commit)?;
        let manifest = self.repo.manifest(&commit)?;
        // A rename recorded in `commit` means the parent knows the file by its prior name.
        let parent_path = manifest
            .card(&path)
            .and_then(|c| c.prior_name.clone())
            .unwrap_or(path);
        match manifest.parent() {
            Some(parent) => self.blame_version(parent.clone(), parent_path),
            None => Ok(InputOutcome::Status(format!(
                "{} has no parent",
                commit.short()
            ))),
        }
    }

    fn blame_back(&mut self) -> Result<InputOutcome, AppError> {
        let Some(frame) = self.frames.last().cloned() else {
            return Ok(InputOutcome::Status("no earlier blame".to_string()));
        };
        self.restart(&frame.commit, &frame.path)?;
        self.frames.pop();
        self.offset = frame.offset;
        self.select(frame.selected);
        Ok(InputOutcome::Handled)
    }

    fn absorb_outcome(&mut self, outcome: BlameOutcome) -> Result<(), AppError> {
        self.producer = None;
        match outcome {
            BlameOutcome::Finished(AnnotateStatus::Complete { versions }) => {
                debug!(versions, "blame complete");
                self.outcome = Some(format!("{versions} versions"));
            }
            BlameOutcome::Finished(AnnotateStatus::Truncated { versions }) => {
                self.outcome = Some(format!("truncated after {versions} versions"));
            }
            BlameOutcome::Cancelled => self.outcome = Some("cancelled".to_string()),
            BlameOutcome::Failed(e) => {
                self.outcome = Some("failed".to_string());
                return Err(e.into());
            }
        }
        Ok(())
    }
}

impl SearchTarget for BlameView {
    fn len(&self) -> usize {
        self.source.lines.len()
    }

    fn is_match(&mut self, index: usize, pattern: &Regex) -> bool {
        let text = self.source.lines.get(index).is_some_and(|l| pattern.is_match(l));
        text || self
            .lines
            .get(index)
            .and_then(|l| l.commit.as_ref())
            .and_then(|id| self.metas.get(id))
            .is_some_and(|meta| pattern.is_match(&meta.user))
    }
}

impl Panel for BlameView {
    fn kind(&self) -> ViewKind {
        ViewKind::Blame
    }

    fn title(&self) -> String {
        let mode = if self.options.reverse { " (reverse)" } else { "" };
        format!(
            "blame {} @ {}{mode}",
            self.source.path,
            self.source.commit.short()
        )
    }

    fn show(
        &mut self,
        area: Rect,
        buf: &mut Buffer,
        active: bool,
        palette: &Palette,
    ) -> Result<(), AppError> {
        self.resize(area);
        let progress = match &self.outcome {
            _ if self.producer.is_some() => {
                format!("annotating {}/{}", self.lines.annotated(), self.lines.len())
            }
            Some(outcome) => outcome.clone(),
            None => String::new(),
        };
        let position = format!(
            "{progress}  {}/{}",
            if self.source.lines.is_empty() { 0 } else { self.selected + 1 },
            self.source.lines.len()
        );
        render_header(area, buf, &self.title(), &position, active, palette);

        let body = Rect {
            y: area.y + 1,
            height: area.height.saturating_sub(1),
            ..area
        };
        let width = usize::from(area.width);
        let digits = number_width(self.source.lines.len());
        let end = (self.offset + self.rows).min(self.source.lines.len());
        for index in self.offset.min(end)..end {
            let Some(attribution) = self.lines.get(index) else {
                continue;
            };
            let meta = attribution.commit.as_ref().and_then(|id| self.metas.get(id));
            let text = self.source.lines[index].replace('\t', "    ");
            let line = format_blame_line(attribution, meta, index + 1, digits, &text);
            let style = if attribution.is_annotated() {
                Default::default()
            } else {
                palette.muted
            };
            let row = (index - self.offset) as u16;
            let spans = vec![Span::styled(clip(&line, width), style)];
            render_row(body, buf, row, spans, index == self.selected, palette);
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
            KeyAction::BlameParent => return self.blame_parent(),
            KeyAction::BlameCommit => {
                let Some(commit) = self.line_commit() else {
                    return Ok(InputOutcome::Status("line is not annotated yet".to_string()));
                };
                let path = self.path_at(&commit)?;
                return self.blame_version(commit, path);
            }
            KeyAction::BlameBack => return self.blame_back(),
            KeyAction::Select => {
                let Some(commit) = self.line_commit() else {
                    return Ok(InputOutcome::Status("line is not annotated yet".to_string()));
                };
                let kind = DiffKind::for_artifact(self.repo.as_ref(), &commit)?;
                let diff = DiffView::new(ctx, kind)?;
                return Ok(InputOutcome::Open(Box::new(ViewPanel::Diff(diff))));
            }
            KeyAction::OpenTimeline => {
                let query = HistoryQuery {
                    start: Some(self.source.commit.clone()),
                    path: Some(self.source.path.clone()),
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

    fn close(&mut self) -> Result<(), AppError> {
        self.stop()
    }

    fn selected(&self) -> usize {
        self.selected
    }

    fn select(&mut self, index: usize) {
        self.selected = index.min(self.source.lines.len().saturating_sub(1));
        self.offset = scroll_into_view(self.selected, self.offset, self.rows);
    }

    fn pump(&mut self) -> Result<bool, AppError> {
        let Some(producer) = self.producer.as_mut() else {
            return Ok(false);
        };
        let batch = producer.pump();
        let mut changed = false;
        for meta in batch.metas {
            self.metas.entry(meta.id.clone()).or_insert(meta);
        }
        for line in batch.lines {
            changed |= self.lines.annotate(line.line, line.commit);
        }
        if let Some(outcome) = batch.outcome {
            self.absorb_outcome(outcome)?;
            changed = true;
        }
        Ok(changed)
    }

    fn resize(&mut self, area: Rect) {
        self.rows = usize::from(area.height.saturating_sub(1)).max(1);
        self.offset = scroll_into_view(self.selected, self.offset, self.rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::{CommitSpec, SnapshotBuilder};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use std::time::Instant;

    fn history() -> (Context, Vec<ArtifactId>) {
        let at = |m| Utc.with_ymd_and_hms(2024, 7, 1, 10, m, 0).unwrap();
        let mut b = SnapshotBuilder::new();
        let c1 = b.commit(CommitSpec::new("alice", at(0), "one").file("f.txt", "a\nb\nc\n"));
        let c2 = b.commit(
            CommitSpec::new("bob", at(1), "two")
                .parent(&c1)
                .file("f.txt", "a\nB\nc\n"),
        );
        let c3 = b.commit(
            CommitSpec::new("carol", at(2), "three")
                .parent(&c2)
                .file("f.txt", "a\nB\nc\nd\n"),
        );
        let ctx = Context::new(Arc::new(b.build().unwrap()), ResolvedConfig::default());
        (ctx, vec![c1, c2, c3])
    }

    fn finish(view: &mut BlameView) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while view.is_running() && Instant::now() < deadline {
            view.pump().unwrap();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!view.is_running(), "blame did not finish");
    }

    fn commits(view: &BlameView) -> Vec<Option<ArtifactId>> {
        view.lines().iter().map(|l| l.commit.clone()).collect()
    }

    #[test]
    fn lines_are_attributed_to_their_introducing_commit() {
        let (ctx, ids) = history();
        let mut view = BlameView::new(&ctx, "f.txt", &ids[2], BlameOptions::default()).unwrap();
        finish(&mut view);
        assert_eq!(
            commits(&view),
            vec![
                Some(ids[0].clone()),
                Some(ids[1].clone()),
                Some(ids[0].clone()),
                Some(ids[2].clone())
            ]
        );
        assert!(view.lines().is_complete());
    }

    #[test]
    fn parent_and_back_walk_the_version_stack() {
        let (ctx, ids) = history();
        let mut view = BlameView::new(&ctx, "f.txt", &ids[2], BlameOptions::default()).unwrap();
        finish(&mut view);

        view.select(3);
        view.input(KeyAction::BlameParent, &ctx).unwrap();
        assert_eq!(view.source().commit, ids[1]);
        assert_eq!(view.depth(), 1);
        assert_eq!(view.len(), 3);
        assert_eq!(view.selected(), 2, "cursor clamped to the shorter file");
        finish(&mut view);

        view.input(KeyAction::BlameBack, &ctx).unwrap();
        assert_eq!(view.source().commit, ids[2]);
        assert_eq!(view.depth(), 0);
        assert_eq!(view.selected(), 3);
        let outcome = view.input(KeyAction::BlameBack, &ctx).unwrap();
        assert!(matches!(outcome, InputOutcome::Status(_)));
    }

    #[test]
    fn older_versions_are_blamed_under_their_prior_name() {
        let at = |m| Utc.with_ymd_and_hms(2024, 7, 1, 10, m, 0).unwrap();
        let mut b = SnapshotBuilder::new();
        let c1 = b.commit(CommitSpec::new("alice", at(0), "one").file("old.txt", "a\nb\n"));
        let c2 = b.commit(
            CommitSpec::new("bob", at(1), "move and edit")
                .parent(&c1)
                .file("new.txt", "a\nB\n")
                .rename("old.txt", "new.txt"),
        );
        let c3 = b.commit(
            CommitSpec::new("carol", at(2), "append")
                .parent(&c2)
                .file("new.txt", "a\nB\nc\n"),
        );
        let ctx = Context::new(Arc::new(b.build().unwrap()), ResolvedConfig::default());
        let mut view = BlameView::new(&ctx, "new.txt", &c3, BlameOptions::default()).unwrap();
        finish(&mut view);
        assert_eq!(
            commits(&view),
            vec![Some(c1.clone()), Some(c2.clone()), Some(c3.clone())]
        );

        view.select(1);
        view.input(KeyAction::BlameParent, &ctx).unwrap();
        assert_eq!(view.source().commit, c1);
        assert_eq!(view.source().path, "old.txt");
        finish(&mut view);

        view.input(KeyAction::BlameBack, &ctx).unwrap();
        assert_eq!(view.source().path, "new.txt");
        finish(&mut view);

        view.select(0);
        view.input(KeyAction::BlameCommit, &ctx).unwrap();
        assert_eq!(view.source().commit, c1);
        assert_eq!(view.source().path, "old.txt");

        view.input(KeyAction::BlameBack, &ctx).unwrap();
        finish(&mut view);
        view.select(1);
        view.input(KeyAction::BlameCommit, &ctx).unwrap();
        assert_eq!(view.source().commit, c2);
        assert_eq!(view.source().path, "new.txt");
    }

    #[test]
    fn blaming_the_same_commit_is_reported() {
        let (ctx, ids) = history();
        let mut view = BlameView::new(&ctx, "f.txt", &ids[2], BlameOptions::default()).unwrap();
        finish(&mut view);
        view.select(3);
        let outcome = view.input(KeyAction::BlameCommit, &ctx).unwrap();
        assert!(matches!(outcome, InputOutcome::Status(_)));
        assert_eq!(view.depth(), 0);
    }

    #[test]
    fn root_commit_has_no_parent_to_blame() {
        let (ctx, ids) = history();
        let mut view = BlameView::new(&ctx, "f.txt", &ids[2], BlameOptions::default()).unwrap();
        finish(&mut view);
        view.select(0);
        let outcome = view.input(KeyAction::BlameParent, &ctx).unwrap();
        assert!(matches!(outcome, InputOutcome::Status(_)));
    }

    #[test]
    fn version_limit_reports_truncation() {
        let (ctx, ids) = history();
        let options = BlameOptions {
            limit: Some(1),
            ..BlameOptions::default()
        };
        let mut view = BlameView::new(&ctx, "f.txt", &ids[2], options).unwrap();
        finish(&mut view);
        assert!(view.outcome().is_some_and(|o| o.starts_with("truncated")));
        assert!(view.lines().is_complete());
    }

    #[test]
    fn missing_file_fails_before_spawning() {
        let (ctx, ids) = history();
        let err = BlameView::new(&ctx, "nope.txt", &ids[2], BlameOptions::default()).unwrap_err();
        assert!(!err.is_fatal());
    }

    #[test]
    fn search_matches_text_and_author() {
        let (ctx, ids) = history();
        let mut view = BlameView::new(&ctx, "f.txt", &ids[2], BlameOptions::default()).unwrap();
        finish(&mut view);
        assert!(view.is_match(1, &Regex::new("^B$").unwrap()));
        assert!(view.is_match(3, &Regex::new("carol").unwrap()));
        assert!(!view.is_match(0, &Regex::new("carol").unwrap()));
    }
}
