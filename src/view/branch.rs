//! Branch list view.

use crate::content::{load_branches, sort_branches};
use crate::model::{AppError, BranchEntry, BranchSort, KeyAction, SHORT_ID_LEN};
use crate::repo::{BranchFilter, HistoryQuery};
use crate::search::SearchTarget;
use crate::view::{
    clip, render_header, render_row, scroll_into_view, Context, InputOutcome, Palette, Panel,
    TimelineView, TreeView, ViewKind, ViewPanel,
};
use ratatui::{buffer::Buffer, layout::Rect, text::Span};
use regex::Regex;

/// Branches, sorted and filtered.
#[derive(Debug)]
pub struct BranchView {
    filter: BranchFilter,
    sort: BranchSort,
    entries: Vec<BranchEntry>,
    selected: usize,
    offset: usize,
    rows: usize,
    show_ids: bool,
    date_format: String,
}

impl BranchView {
    /// Branches matching `filter`, in the configured sort order.
    ///
    /// # Errors
    ///
    /// Repository errors while listing branches.
    pub fn new(ctx: &Context, filter: BranchFilter) -> Result<Self, AppError> {
        let sort = ctx.config.branch_sort;
        let entries = load_branches(ctx.repo.as_ref(), &filter, sort)?;
        Ok(Self {
            filter,
            sort,
            entries,
            selected: 0,
            offset: 0,
            rows: 1,
            show_ids: ctx.config.settings.flag("show-ids"),
            date_format: ctx
                .config
                .settings
                .get("date-format")
                .unwrap_or_else(|| "%Y-%m-%d".to_string()),
        })
    }

    /// Entries in display order.
    pub fn entries(&self) -> &[BranchEntry] {
        &self.entries
    }

    /// Current sort order.
    pub fn sort(&self) -> BranchSort {
        self.sort
    }

    /// The filter the list was loaded with.
    pub fn filter(&self) -> &BranchFilter {
        &self.filter
    }

    fn cycle_sort(&mut self) {
        let name = self.entries.get(self.selected).map(|e| e.name.clone());
        self.sort = self.sort.next();
        sort_branches(&mut self.entries, self.sort);
        // Keep the same branch under the cursor.
        let index = name
            .and_then(|n| self.entries.iter().position(|e| e.name == n))
            .unwrap_or(0);
        self.select(index);
    }

    fn entry_spans<'a>(&self, entry: &'a BranchEntry, width: usize, palette: &Palette) -> Vec<Span<'a>> {
        let marker = if entry.current { "* " } else { "  " };
        let mut spans = vec![Span::raw(marker)];
        if self.show_ids {
            spans.push(Span::styled(
                format!("{:<SHORT_ID_LEN$} ", entry.tip.short()),
                palette.id,
            ));
        }
        spans.push(Span::styled(
            entry.last_activity.format(&self.date_format).to_string(),
            palette.muted,
        ));
        spans.push(Span::raw(" "));
        let mut flags = String::new();
        if !entry.open {
            flags.push_str(" (closed)");
        }
        if entry.private {
            flags.push_str(" (private)");
        }
        spans.push(Span::styled(clip(&entry.name, width), palette.label));
        if !flags.is_empty() {
            spans.push(Span::styled(flags, palette.muted));
        }
        spans
    }
}

impl SearchTarget for BranchView {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_match(&mut self, index: usize, pattern: &Regex) -> bool {
        self.entries
            .get(index)
            .is_some_and(|e| pattern.is_match(&e.name))
    }
}

impl Panel for BranchView {
    fn kind(&self) -> ViewKind {
        ViewKind::Branch
    }

    fn title(&self) -> String {
        format!("branches  sort:{}", self.sort)
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
            if self.entries.is_empty() { 0 } else { self.selected + 1 },
            self.entries.len()
        );
        render_header(area, buf, &self.title(), &position, active, palette);
        let body = Rect {
            y: area.y + 1,
            height: area.height.saturating_sub(1),
            ..area
        };
        if self.entries.is_empty() {
            let spans = vec![Span::styled("no branches", palette.muted)];
            render_row(body, buf, 0, spans, false, palette);
            return Ok(());
        }
        let width = usize::from(area.width);
        let end = (self.offset + self.rows).min(self.entries.len());
        for (row, entry) in self.entries[self.offset.min(end)..end].iter().enumerate() {
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
            KeyAction::CycleSort => self.cycle_sort(),
            KeyAction::ToggleIds => self.show_ids = !self.show_ids,
            KeyAction::Select | KeyAction::OpenTimeline => {
                let Some(entry) = self.entries.get(self.selected) else {
                    return Ok(InputOutcome::Ignored);
                };
                let query = HistoryQuery {
                    branch: Some(entry.name.clone()),
                    ..HistoryQuery::default()
                };
                let timeline = TimelineView::new(ctx, query);
                return Ok(InputOutcome::Open(Box::new(ViewPanel::Timeline(timeline))));
            }
            KeyAction::OpenTree => {
                let Some(entry) = self.entries.get(self.selected) else {
                    return Ok(InputOutcome::Ignored);
                };
                let tree = TreeView::new(ctx, &entry.tip, None)?;
                return Ok(InputOutcome::Open(Box::new(ViewPanel::Tree(tree))));
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
        self.selected = index.min(self.entries.len().saturating_sub(1));
        self.offset = scroll_into_view(self.selected, self.offset, self.rows);
    }

    fn resize(&mut self, area: Rect) {
        self.rows = usize::from(area.height.saturating_sub(1)).max(1);
        self.offset = scroll_into_view(self.selected, self.offset, self.rows);
    }
}
