//! Terminal views (impure shell).
//!
//! A [`View`] binds one panel (timeline, diff, tree, blame or branch list) to
//! a rectangle, owns the panel's [`SearchEngine`], and may own one child view
//! that shares its area. The [`app::TuiApp`] event loop keeps the ordered list
//! of top-level views and decides which one is focused.
//!
//! Panels implement [`Panel`]; [`ViewPanel`] is the closed set of panel kinds
//! and dispatches to them.

pub mod app;
mod blame;
mod branch;
mod diff;
mod help;
pub mod layout;
pub mod styles;
mod timeline;
mod tree;

pub use app::TuiApp;
pub use blame::{BlameOptions, BlameView};
pub use branch::BranchView;
pub use diff::DiffView;
pub use help::render_help_overlay;
pub use layout::SplitMode;
pub use styles::{ColorConfig, Palette};
pub use timeline::TimelineView;
pub use tree::TreeView;

use crate::config::{ResolvedConfig, SplitHeight};
use crate::content::DiffKind;
use crate::model::{AppError, ArtifactId, KeyAction};
use crate::repo::{BranchFilter, HistoryQuery, SharedRepository};
use crate::search::{SearchDirection, SearchEngine, SearchState, SearchTarget};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use regex::Regex;
use tracing::info;

/// Everything a panel needs from the outside world.
#[derive(Clone)]
pub struct Context {
    /// Repository being browsed.
    pub repo: SharedRepository,
    /// Resolved configuration.
    pub config: ResolvedConfig,
    /// Colours.
    pub palette: Palette,
}

impl Context {
    /// Context with the default palette.
    pub fn new(repo: SharedRepository, config: ResolvedConfig) -> Self {
        Self {
            repo,
            config,
            palette: Palette::default(),
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// The five kinds of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// Commit history.
    Timeline,
    /// Diff of a commit, blobs or local changes.
    Diff,
    /// Directory tree of a commit.
    Tree,
    /// Per-line attribution of a file.
    Blame,
    /// Branch list.
    Branch,
}

impl ViewKind {
    /// Name shown in headers.
    pub fn label(self) -> &'static str {
        match self {
            ViewKind::Timeline => "timeline",
            ViewKind::Diff => "diff",
            ViewKind::Tree => "tree",
            ViewKind::Blame => "blame",
            ViewKind::Branch => "branch",
        }
    }
}

/// What the event loop should do after a key was handled.
#[derive(Debug)]
pub enum InputOutcome {
    /// State changed; redraw.
    Handled,
    /// The key means nothing here.
    Ignored,
    /// Open a new view from the focused one.
    Open(Box<ViewPanel>),
    /// Close the focused view.
    Close,
    /// Close everything.
    Quit,
    /// Show a transient message.
    Status(String),
}

/// Behaviour shared by every panel kind.
///
/// Row-oriented panels are searchable: [`SearchTarget`] exposes their rows,
/// [`selected`](Panel::selected) and [`select`](Panel::select) move the cursor.
pub trait Panel: SearchTarget {
    /// Which kind of view this is.
    fn kind(&self) -> ViewKind;

    /// Header text.
    fn title(&self) -> String;

    /// Render into `area` of `buf`. `active` marks the focused view.
    ///
    /// # Errors
    ///
    /// Fatal errors only (a producer that cannot be started).
    fn show(
        &mut self,
        area: Rect,
        buf: &mut Buffer,
        active: bool,
        palette: &Palette,
    ) -> Result<(), AppError>;

    /// React to a key.
    ///
    /// # Errors
    ///
    /// Repository errors abort the command; others are fatal.
    fn input(&mut self, action: KeyAction, ctx: &Context) -> Result<InputOutcome, AppError>;

    /// Release producers. Called once, before the panel is dropped.
    ///
    /// # Errors
    ///
    /// `AppError::Worker` if a worker panicked.
    fn close(&mut self) -> Result<(), AppError> {
        Ok(())
    }

    /// Row under the cursor.
    fn selected(&self) -> usize;

    /// Move the cursor to `index` (clamped) and scroll it into view.
    fn select(&mut self, index: usize);

    /// Move the cursor to the last row.
    fn select_last(&mut self) {
        let last = self.len().saturating_sub(1);
        self.select(last);
    }

    /// Drain producer output. Returns whether anything changed.
    ///
    /// # Errors
    ///
    /// Producer failures, as reported by the worker.
    fn pump(&mut self) -> Result<bool, AppError> {
        Ok(false)
    }

    /// The panel's area changed.
    fn resize(&mut self, _area: Rect) {}

    /// The panel is no longer on screen.
    ///
    /// # Errors
    ///
    /// `AppError::Worker` if a parked worker panicked.
    fn hide(&mut self) -> Result<(), AppError> {
        Ok(())
    }

    /// Start a new search.
    fn search_init(&mut self, engine: &mut SearchEngine, pattern: Regex) {
        engine.init(pattern, SearchDirection::Forward);
    }

    /// One search step; moves the cursor on a match.
    fn search_next(&mut self, engine: &mut SearchEngine, direction: SearchDirection) -> SearchState {
        let origin = self.selected();
        let state = engine.next(self, direction, origin);
        if state == SearchState::Complete {
            if let Some(found) = engine.matched() {
                self.select(found);
            }
        }
        state
    }

    /// Continue a step suspended while the producer delivers rows.
    fn search_resume(&mut self, engine: &mut SearchEngine) -> SearchState {
        let for_end = engine.state() == SearchState::ForEnd;
        let state = engine.resume(self);
        if state == SearchState::Complete {
            if for_end {
                self.select_last();
            } else if let Some(found) = engine.matched() {
                self.select(found);
            }
        }
        state
    }
}

/// One of the five panel kinds.
#[derive(Debug)]
pub enum ViewPanel {
    /// Commit history.
    Timeline(TimelineView),
    /// Diff text.
    Diff(DiffView),
    /// Directory tree.
    Tree(TreeView),
    /// Blame.
    Blame(BlameView),
    /// Branch list.
    Branch(BranchView),
}

macro_rules! dispatch {
    ($self:expr, $panel:ident => $body:expr) => {
        match $self {
            ViewPanel::Timeline($panel) => $body,
            ViewPanel::Diff($panel) => $body,
            ViewPanel::Tree($panel) => $body,
            ViewPanel::Blame($panel) => $body,
            ViewPanel::Branch($panel) => $body,
        }
    };
}

impl SearchTarget for ViewPanel {
    fn len(&self) -> usize {
        dispatch!(self, p => p.len())
    }

    fn is_match(&mut self, index: usize, pattern: &Regex) -> bool {
        dispatch!(self, p => p.is_match(index, pattern))
    }

    fn exhausted(&self) -> bool {
        dispatch!(self, p => p.exhausted())
    }

    fn request_more(&mut self) -> bool {
        dispatch!(self, p => p.request_more())
    }
}

impl Panel for ViewPanel {
    fn kind(&self) -> ViewKind {
        dispatch!(self, p => p.kind())
    }

    fn title(&self) -> String {
        dispatch!(self, p => p.title())
    }

    fn show(
        &mut self,
        area: Rect,
        buf: &mut Buffer,
        active: bool,
        palette: &Palette,
    ) -> Result<(), AppError> {
        dispatch!(self, p => p.show(area, buf, active, palette))
    }

    fn input(&mut self, action: KeyAction, ctx: &Context) -> Result<InputOutcome, AppError> {
        dispatch!(self, p => p.input(action, ctx))
    }

    fn close(&mut self) -> Result<(), AppError> {
        dispatch!(self, p => p.close())
    }

    fn selected(&self) -> usize {
        dispatch!(self, p => p.selected())
    }

    fn select(&mut self, index: usize) {
        dispatch!(self, p => p.select(index))
    }

    fn pump(&mut self) -> Result<bool, AppError> {
        dispatch!(self, p => p.pump())
    }

    fn resize(&mut self, area: Rect) {
        dispatch!(self, p => p.resize(area))
    }

    fn hide(&mut self) -> Result<(), AppError> {
        dispatch!(self, p => p.hide())
    }

    fn search_init(&mut self, engine: &mut SearchEngine, pattern: Regex) {
        dispatch!(self, p => p.search_init(engine, pattern))
    }

    fn search_next(&mut self, engine: &mut SearchEngine, direction: SearchDirection) -> SearchState {
        dispatch!(self, p => p.search_next(engine, direction))
    }

    fn search_resume(&mut self, engine: &mut SearchEngine) -> SearchState {
        dispatch!(self, p => p.search_resume(engine))
    }
}

/// A panel bound to a screen region, with an optional child.
#[derive(Debug)]
pub struct View {
    area: Rect,
    panel_area: Rect,
    mode: SplitMode,
    active: bool,
    child: Option<Box<View>>,
    panel: ViewPanel,
    search: SearchEngine,
    status: Option<String>,
    closed: bool,
}

impl View {
    /// Fullscreen view around `panel`.
    pub fn new(panel: ViewPanel) -> Self {
        Self {
            area: Rect::default(),
            panel_area: Rect::default(),
            mode: SplitMode::NoSplit,
            active: false,
            child: None,
            panel,
            search: SearchEngine::new(),
            status: None,
            closed: false,
        }
    }

    /// Kind of the panel.
    pub fn kind(&self) -> ViewKind {
        self.panel.kind()
    }

    /// The panel.
    pub fn panel(&self) -> &ViewPanel {
        &self.panel
    }

    /// The panel, mutably.
    pub fn panel_mut(&mut self) -> &mut ViewPanel {
        &mut self.panel
    }

    /// Whole region assigned to this view (and its child).
    pub fn area(&self) -> Rect {
        self.area
    }

    /// Region the panel itself draws into.
    pub fn panel_area(&self) -> Rect {
        self.panel_area
    }

    /// How this view shares its parent's area.
    pub fn mode(&self) -> SplitMode {
        self.mode
    }

    /// Change the split mode; takes effect at the next layout.
    pub fn set_mode(&mut self, mode: SplitMode) {
        self.mode = mode;
    }

    /// Whether this view has focus.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Give or take focus.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// The child view.
    pub fn child(&self) -> Option<&View> {
        self.child.as_deref()
    }

    /// The child view, mutably.
    pub fn child_mut(&mut self) -> Option<&mut View> {
        self.child.as_deref_mut()
    }

    /// Whether the child covers this view entirely.
    pub fn child_is_fullscreen(&self) -> bool {
        self.child
            .as_ref()
            .is_some_and(|c| c.mode == SplitMode::NoSplit)
    }

    /// Install `child`, closing the one it replaces.
    ///
    /// # Errors
    ///
    /// Errors from closing the old child.
    pub fn set_child(&mut self, child: View) -> Result<(), AppError> {
        let replaced = self.take_child();
        self.child = Some(Box::new(child));
        match replaced {
            Some(mut old) => old.close(),
            None => Ok(()),
        }
    }

    /// Detach the child without closing it.
    pub fn take_child(&mut self) -> Option<View> {
        self.child.take().map(|c| *c)
    }

    /// The search engine.
    pub fn search(&self) -> &SearchEngine {
        &self.search
    }

    /// Take the message left by an asynchronous search step.
    pub fn take_status(&mut self) -> Option<String> {
        let own = self.status.take();
        let child = self.child.as_mut().and_then(|c| c.take_status());
        own.or(child)
    }

    /// Assign `area` and lay out the child. Every panel is told its new size.
    pub fn layout(&mut self, area: Rect, height: SplitHeight) {
        self.area = area;
        match self.child.as_mut() {
            Some(child) => {
                let (parent, child_area) = layout::split_areas(area, child.mode, height);
                self.panel_area = parent;
                child.layout(child_area, height);
                if child.mode != SplitMode::NoSplit && child_area.x > area.x {
                    // Vertical: leave a column for the divider.
                    child.panel_area = Rect {
                        x: child_area.x + 1,
                        width: child_area.width.saturating_sub(1),
                        ..child_area
                    };
                    child.panel.resize(child.panel_area);
                }
            }
            None => self.panel_area = area,
        }
        self.panel.resize(self.panel_area);
    }

    /// Render the view and its child.
    ///
    /// # Errors
    ///
    /// Fatal errors from a panel.
    pub fn show(&mut self, buf: &mut Buffer, palette: &Palette) -> Result<(), AppError> {
        let child_fullscreen = self.child_is_fullscreen();
        if !child_fullscreen {
            self.panel.show(self.panel_area, buf, self.active, palette)?;
        }
        if let Some(child) = self.child.as_mut() {
            if child.panel_area.x > child.area.x {
                let divider = Rect {
                    width: 1,
                    ..child.area
                };
                Block::default()
                    .borders(Borders::LEFT)
                    .border_style(palette.muted)
                    .render(divider, buf);
            }
            child.show(buf, palette)?;
        }
        Ok(())
    }

    /// Tell hidden panels they are off screen.
    ///
    /// # Errors
    ///
    /// Worker errors while parking.
    pub fn hide(&mut self) -> Result<(), AppError> {
        self.panel.hide()?;
        if let Some(child) = self.child.as_mut() {
            child.hide()?;
        }
        Ok(())
    }

    /// Hide the panel only if its child covers it.
    ///
    /// # Errors
    ///
    /// Worker errors while parking.
    pub fn hide_covered(&mut self) -> Result<(), AppError> {
        if self.child_is_fullscreen() {
            self.panel.hide()?;
        }
        Ok(())
    }

    /// Handle a key for this view (not its child).
    ///
    /// Search stepping and end-of-list moves are handled here, generically;
    /// the rest goes to the panel.
    ///
    /// # Errors
    ///
    /// See [`Panel::input`].
    pub fn input(&mut self, action: KeyAction, ctx: &Context) -> Result<InputOutcome, AppError> {
        match action {
            KeyAction::NextMatch => Ok(self.search_next(SearchDirection::Forward)),
            KeyAction::PrevMatch => Ok(self.search_next(SearchDirection::Reverse)),
            KeyAction::ScrollToBottom => Ok(self.for_end()),
            other => self.panel.input(other, ctx),
        }
    }

    /// Compile-checked pattern becomes the view's search.
    pub fn search_init(&mut self, pattern: Regex) {
        self.panel.search_init(&mut self.search, pattern);
    }

    /// One search step, reported as an outcome for the status line.
    pub fn search_next(&mut self, direction: SearchDirection) -> InputOutcome {
        if self.search.pattern().is_none() {
            return InputOutcome::Status("no search pattern".to_string());
        }
        let state = self.panel.search_next(&mut self.search, direction);
        search_outcome(state)
    }

    fn for_end(&mut self) -> InputOutcome {
        match self.search.for_end(&mut self.panel) {
            SearchState::ForEnd => InputOutcome::Status("loading...".to_string()),
            _ => {
                self.panel.select_last();
                InputOutcome::Handled
            }
        }
    }

    /// Drain producers of this view and its child, resuming suspended searches.
    ///
    /// # Errors
    ///
    /// Producer failures.
    pub fn pump(&mut self) -> Result<bool, AppError> {
        let mut changed = self.panel.pump()?;
        if changed && self.search.is_suspended() {
            let state = self.panel.search_resume(&mut self.search);
            if let InputOutcome::Status(message) = search_outcome(state) {
                self.status = Some(message);
            }
        }
        if let Some(child) = self.child.as_mut() {
            changed |= child.pump()?;
        }
        Ok(changed)
    }

    /// Close the child, then this view, releasing producers. Idempotent.
    ///
    /// # Errors
    ///
    /// The first error encountered; every panel is still closed.
    pub fn close(&mut self) -> Result<(), AppError> {
        let child_result = match self.child.take() {
            Some(mut child) => child.close(),
            None => Ok(()),
        };
        if self.closed {
            return child_result;
        }
        self.closed = true;
        self.search.clear();
        info!(kind = self.kind().label(), "view closed");
        let own = self.panel.close();
        child_result.and(own)
    }
}

fn search_outcome(state: SearchState) -> InputOutcome {
    match state {
        SearchState::Complete | SearchState::Waiting => InputOutcome::Handled,
        SearchState::NoMatch => InputOutcome::Status("no matches found".to_string()),
        SearchState::Continue => InputOutcome::Status("searching...".to_string()),
        SearchState::ForEnd => InputOutcome::Status("loading...".to_string()),
    }
}

/// Draw the one-line header at the top of a panel.
pub(crate) fn render_header(
    area: Rect,
    buf: &mut Buffer,
    left: &str,
    right: &str,
    active: bool,
    palette: &Palette,
) {
    if area.height == 0 {
        return;
    }
    let style = if active {
        palette.header_active
    } else {
        palette.header
    };
    let width = usize::from(area.width);
    let right_width = unicode_width::UnicodeWidthStr::width(right);
    let left = clip(left, width.saturating_sub(right_width + 1));
    let pad = width.saturating_sub(unicode_width::UnicodeWidthStr::width(left.as_str()) + right_width);
    let line = Line::from(vec![
        Span::raw(left),
        Span::raw(" ".repeat(pad)),
        Span::raw(right.to_string()),
    ])
    .style(style);
    buf.set_style(Rect { height: 1, ..area }, style);
    buf.set_line(area.x, area.y, &line, area.width);
}

/// Draw one body row, highlighting it when selected.
pub(crate) fn render_row(
    area: Rect,
    buf: &mut Buffer,
    row: u16,
    spans: Vec<Span<'_>>,
    selected: bool,
    palette: &Palette,
) {
    let y = area.y + row;
    if row >= area.height {
        return;
    }
    let line = Line::from(spans);
    buf.set_line(area.x, y, &line, area.width);
    if selected {
        buf.set_style(
            Rect {
                y,
                height: 1,
                ..area
            },
            palette.selection,
        );
    }
}

/// Truncate `text` to `width` terminal cells.
pub(crate) fn clip(text: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out
}

/// Keep `selected` inside a window of `rows` starting at `offset`.
pub(crate) fn scroll_into_view(selected: usize, offset: usize, rows: usize) -> usize {
    let rows = rows.max(1);
    if selected < offset {
        selected
    } else if selected >= offset + rows {
        selected + 1 - rows
    } else {
        offset
    }
}

/// Timeline of `query`.
pub fn open_timeline(ctx: &Context, query: HistoryQuery) -> View {
    info!(?query, "opening timeline");
    View::new(ViewPanel::Timeline(TimelineView::new(ctx, query)))
}

/// Diff of `kind`.
///
/// # Errors
///
/// Repository errors while building the diff.
pub fn open_diff(ctx: &Context, kind: DiffKind) -> Result<View, AppError> {
    info!(?kind, "opening diff");
    Ok(View::new(ViewPanel::Diff(DiffView::new(ctx, kind)?)))
}

/// Tree of `commit`, descending into `path` if given.
///
/// # Errors
///
/// `RepoError::PathNotFound` if `path` is not a directory of the commit.
pub fn open_tree(ctx: &Context, commit: &ArtifactId, path: Option<&str>) -> Result<View, AppError> {
    info!(commit = %commit.short(), ?path, "opening tree");
    Ok(View::new(ViewPanel::Tree(TreeView::new(ctx, commit, path)?)))
}

/// Blame of `path` as of `commit`.
///
/// # Errors
///
/// Repository errors loading the file, or a worker spawn failure.
pub fn open_blame(
    ctx: &Context,
    path: &str,
    commit: &ArtifactId,
    options: BlameOptions,
) -> Result<View, AppError> {
    info!(%path, commit = %commit.short(), "opening blame");
    Ok(View::new(ViewPanel::Blame(BlameView::new(
        ctx, path, commit, options,
    )?)))
}

/// Branch list.
///
/// # Errors
///
/// Repository errors while listing branches.
pub fn open_branch(ctx: &Context, filter: BranchFilter) -> Result<View, AppError> {
    info!(?filter, "opening branch list");
    Ok(View::new(ViewPanel::Branch(BranchView::new(ctx, filter)?)))
}

/// Run the event loop on the real terminal until the last view closes.
///
/// # Errors
///
/// Terminal failures and fatal worker errors.
pub fn run(view: View, ctx: Context) -> Result<(), AppError> {
    let mut app = TuiApp::new(view, ctx)?;
    let result = app.run();
    let restored = app.restore();
    result.and(restored)
}

#[cfg(test)]
#[path = "view_tests.rs"]
mod tests;
