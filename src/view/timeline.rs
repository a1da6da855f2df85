//! Timeline view: commit history, newest first, loaded on demand.
//!
//! The view asks its [`HistoryProducer`] for exactly the rows it can show
//! (height minus the header) and for more only when scrolling needs them.
//! While hidden behind another fullscreen view the producer is parked and
//! resumes from the oldest queued commit on the next `show`.

use crate::content::{build_commit_entry, DiffKind};
use crate::model::{AppError, ArtifactType, CommitEntry, CommitQueue, KeyAction, SHORT_ID_LEN};
use crate::producer::{HistoryBatch, HistoryProducer};
use crate::repo::{BranchFilter, HistoryQuery, ResumePoint, SharedRepository};
use crate::search::SearchTarget;
use crate::view::{
    clip, render_header, render_row, scroll_into_view, BranchView, Context, DiffView,
    InputOutcome, Palette, Panel, TreeView, ViewKind, ViewPanel,
};
use ratatui::{buffer::Buffer, layout::Rect, text::Span};
use regex::Regex;
use std::time::Duration;
use tracing::{debug, warn};

/// Width of the user column.
const USER_COLUMN: usize = 10;

/// Commit history.
pub struct TimelineView {
    repo: SharedRepository,
    producer: HistoryProducer,
    queue: CommitQueue,
    selected: usize,
    offset: usize,
    rows: usize,
    started: bool,
    parked: bool,
    failure: Option<String>,
    date_format: String,
    title: String,
}

impl std::fmt::Debug for TimelineView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelineView")
            .field("producer", &self.producer)
            .field("queued", &self.queue.len())
            .field("selected", &self.selected)
            .field("offset", &self.offset)
            .field("rows", &self.rows)
            .field("parked", &self.parked)
            .finish_non_exhaustive()
    }
}

impl TimelineView {
    /// Timeline for `query`. Nothing is loaded until the first `show`.
    pub fn new(ctx: &Context, query: HistoryQuery) -> Self {
        let title = describe_query(&query);
        Self {
            repo: ctx.repo.clone(),
            producer: HistoryProducer::new(ctx.repo.clone(), query),
            queue: CommitQueue::new(),
            selected: 0,
            offset: 0,
            rows: 1,
            started: false,
            parked: false,
            failure: None,
            date_format: ctx
                .config
                .settings
                .get("date-format")
                .unwrap_or_else(|| "%Y-%m-%d".to_string()),
            title,
        }
    }

    /// Commits received so far.
    pub fn queue(&self) -> &CommitQueue {
        &self.queue
    }

    /// The history producer.
    pub fn producer(&self) -> &HistoryProducer {
        &self.producer
    }

    /// Body rows on screen.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// First row on screen.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whether the producer is parked.
    pub fn is_parked(&self) -> bool {
        self.parked
    }

    /// Block until every outstanding row has arrived, or `timeout` passes.
    ///
    /// # Errors
    ///
    /// The worker's failure, if it reported one.
    pub fn settle(&mut self, timeout: Duration) -> Result<bool, AppError> {
        let batch = self.producer.settle(timeout);
        self.absorb(batch)
    }

    fn absorb(&mut self, batch: HistoryBatch) -> Result<bool, AppError> {
        let changed = !batch.is_empty();
        for row in batch.rows {
            let entry = build_commit_entry(row, self.queue.len());
            if !self.queue.push(entry) {
                warn!("dropped out-of-order timeline entry");
            }
        }
        if let Some(err) = batch.error {
            self.failure = Some(err.to_string());
            return Err(err.into());
        }
        Ok(changed)
    }

    fn ensure_running(&mut self) -> Result<(), AppError> {
        if !self.started {
            self.started = true;
            self.producer.start(self.rows)?;
        } else if self.parked {
            self.parked = false;
            let need = (self.offset + self.rows).saturating_sub(self.queue.len());
            self.producer.resume(self.resume_point(), need)?;
        }
        Ok(())
    }

    /// Oldest queued timestamp, inclusive, with the ids already queued there.
    fn resume_point(&self) -> ResumePoint {
        match self.queue.last() {
            None => ResumePoint::default(),
            Some(last) => ResumePoint {
                at: Some(last.timestamp),
                seen: self
                    .queue
                    .iter()
                    .rev()
                    .take_while(|e| e.timestamp == last.timestamp)
                    .map(|e| e.id.clone())
                    .collect(),
            },
        }
    }

    /// Make sure `total` rows are queued or requested.
    fn demand(&mut self, total: usize, wait: bool) -> Result<(), AppError> {
        if !self.started || self.parked || self.producer.is_done() {
            return Ok(());
        }
        let have = self.queue.len() + self.producer.ncommits_needed();
        if total > have && self.producer.signal_more(total - have, wait) {
            let batch = self.producer.pump();
            self.absorb(batch)?;
        }
        Ok(())
    }

    fn move_down(&mut self, n: usize) -> Result<(), AppError> {
        let target = self.selected + n;
        let offset = scroll_into_view(target, self.offset, self.rows);
        self.demand(offset + self.rows, true)?;
        self.select(target);
        Ok(())
    }

    fn current(&self) -> Option<&CommitEntry> {
        self.queue.get(self.selected)
    }

    fn render_entry<'a>(&self, entry: &'a CommitEntry, width: usize, palette: &Palette) -> Vec<Span<'a>> {
        let mut spans = vec![
            Span::styled(entry.id.short().to_string(), palette.id),
            Span::raw(" "),
            Span::styled(
                entry.timestamp.format(&self.date_format).to_string(),
                palette.muted,
            ),
            Span::raw(" "),
            Span::styled(
                format!("{:<USER_COLUMN$}", clip(&entry.user, USER_COLUMN)),
                palette.muted,
            ),
            Span::raw(" "),
        ];
        if entry.kind != ArtifactType::Checkin {
            spans.push(Span::styled(format!("[{}] ", entry.kind), palette.label));
        }
        if let Some(branch) = &entry.branch {
            spans.push(Span::styled(format!("[{branch}] "), palette.label));
        }
        let used = SHORT_ID_LEN + USER_COLUMN + 24;
        spans.push(Span::raw(clip(entry.summary(), width.saturating_sub(used))));
        for tag in &entry.tags {
            spans.push(Span::styled(format!(" ({tag})"), palette.label));
        }
        spans
    }
}

fn describe_query(query: &HistoryQuery) -> String {
    let mut title = String::from("timeline");
    if let Some(start) = &query.start {
        title.push_str(&format!("  from {}", start.short()));
    }
    if let Some(branch) = &query.branch {
        title.push_str(&format!("  branch:{branch}"));
    }
    if let Some(user) = &query.user {
        title.push_str(&format!("  user:{user}"));
    }
    if let Some(kind) = query.kind {
        title.push_str(&format!("  type:{kind}"));
    }
    if let Some(path) = &query.path {
        title.push_str(&format!("  {path}"));
    }
    title
}

impl SearchTarget for TimelineView {
    fn len(&self) -> usize {
        self.queue.len()
    }

    fn is_match(&mut self, index: usize, pattern: &Regex) -> bool {
        self.queue.get(index).is_some_and(|e| {
            pattern.is_match(&e.comment)
                || pattern.is_match(&e.user)
                || pattern.is_match(e.id.as_str())
                || e.branch.as_deref().is_some_and(|b| pattern.is_match(b))
                || e.tags.iter().any(|t| pattern.is_match(t))
        })
    }

    fn exhausted(&self) -> bool {
        !self.started || self.producer.is_done() || self.failure.is_some()
    }

    fn request_more(&mut self) -> bool {
        if !self.started || self.parked || self.producer.is_done() {
            return false;
        }
        if self.producer.ncommits_needed() > 0 {
            return true;
        }
        self.producer.signal_more(self.rows.max(1), false)
    }
}

impl Panel for TimelineView {
    fn kind(&self) -> ViewKind {
        ViewKind::Timeline
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn show(
        &mut self,
        area: Rect,
        buf: &mut Buffer,
        active: bool,
        palette: &Palette,
    ) -> Result<(), AppError> {
        self.resize(area);
        self.ensure_running()?;

        let position = if self.queue.is_empty() {
            "0/0".to_string()
        } else {
            let more = if self.producer.is_done() { "" } else { "+" };
            format!("{}/{}{}", self.selected + 1, self.queue.len(), more)
        };
        render_header(area, buf, &self.title, &position, active, palette);

        let body = Rect {
            y: area.y + 1,
            height: area.height.saturating_sub(1),
            ..area
        };
        if self.queue.is_empty() {
            let message = match &self.failure {
                Some(failure) => failure.clone(),
                None if self.producer.is_done() => "no history".to_string(),
                None => "loading...".to_string(),
            };
            render_row(body, buf, 0, vec![Span::styled(message, palette.muted)], false, palette);
            return Ok(());
        }
        let width = usize::from(area.width);
        for (row, entry) in self
            .queue
            .window(self.offset, self.offset + self.rows)
            .iter()
            .enumerate()
        {
            let spans = self.render_entry(entry, width, palette);
            let selected = entry.index == self.selected;
            render_row(body, buf, row as u16, spans, selected, palette);
        }
        Ok(())
    }

    fn input(&mut self, action: KeyAction, ctx: &Context) -> Result<InputOutcome, AppError> {
        let page = self.rows.max(1);
        match action {
            KeyAction::ScrollDown => self.move_down(1)?,
            KeyAction::PageDown => self.move_down(page)?,
            KeyAction::HalfPageDown => self.move_down((page / 2).max(1))?,
            KeyAction::ScrollUp => self.select(self.selected.saturating_sub(1)),
            KeyAction::PageUp => self.select(self.selected.saturating_sub(page)),
            KeyAction::HalfPageUp => self.select(self.selected.saturating_sub((page / 2).max(1))),
            KeyAction::ScrollToTop => self.select(0),
            KeyAction::Select => {
                let Some(entry) = self.current() else {
                    return Ok(InputOutcome::Ignored);
                };
                let kind = DiffKind::for_artifact(self.repo.as_ref(), &entry.id)?;
                let diff = DiffView::new(ctx, kind)?;
                return Ok(InputOutcome::Open(Box::new(ViewPanel::Diff(diff))));
            }
            KeyAction::OpenTree => {
                let Some(entry) = self.current() else {
                    return Ok(InputOutcome::Ignored);
                };
                if entry.kind != ArtifactType::Checkin {
                    return Ok(InputOutcome::Status(format!(
                        "{} is a {}, not a checkin",
                        entry.id.short(),
                        entry.kind
                    )));
                }
                let tree = TreeView::new(ctx, &entry.id, None)?;
                return Ok(InputOutcome::Open(Box::new(ViewPanel::Tree(tree))));
            }
            KeyAction::OpenTimeline => {
                let Some(branch) = self.current().and_then(|e| e.branch.clone()) else {
                    return Ok(InputOutcome::Ignored);
                };
                let query = HistoryQuery {
                    branch: Some(branch),
                    ..HistoryQuery::default()
                };
                let timeline = TimelineView::new(ctx, query);
                return Ok(InputOutcome::Open(Box::new(ViewPanel::Timeline(timeline))));
            }
            KeyAction::OpenBranches => {
                let branches = BranchView::new(ctx, BranchFilter::default())?;
                return Ok(InputOutcome::Open(Box::new(ViewPanel::Branch(branches))));
            }
            KeyAction::Close => return Ok(InputOutcome::Close),
            KeyAction::Quit => return Ok(InputOutcome::Quit),
            _ => return Ok(InputOutcome::Ignored),
        }
        Ok(InputOutcome::Handled)
    }

    fn close(&mut self) -> Result<(), AppError> {
        self.producer.stop()?;
        Ok(())
    }

    fn selected(&self) -> usize {
        self.selected
    }

    fn select(&mut self, index: usize) {
        self.selected = index.min(self.queue.len().saturating_sub(1));
        self.offset = scroll_into_view(self.selected, self.offset, self.rows);
    }

    fn pump(&mut self) -> Result<bool, AppError> {
        if !self.started {
            return Ok(false);
        }
        let batch = self.producer.pump();
        self.absorb(batch)
    }

    fn resize(&mut self, area: Rect) {
        let rows = usize::from(area.height.saturating_sub(1)).max(1);
        if rows == self.rows {
            return;
        }
        self.rows = rows;
        self.offset = scroll_into_view(self.selected, self.offset, self.rows);
        if let Err(e) = self.demand(self.offset + self.rows, false) {
            warn!(error = %e, "timeline resize could not request rows");
        }
    }

    fn hide(&mut self) -> Result<(), AppError> {
        if !self.started || self.parked || self.producer.is_done() {
            return Ok(());
        }
        debug!(queued = self.queue.len(), "parking timeline producer");
        self.producer.park()?;
        self.parked = true;
        let batch = self.producer.pump();
        self.absorb(batch)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "timeline_tests.rs"]
mod tests;
