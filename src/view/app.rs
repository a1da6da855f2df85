//! Event loop.
//!
//! [`TuiApp`] owns the ordered list of top-level views. Exactly one of them is
//! current; focus is either on it or on its child. The loop polls the
//! terminal with a short timeout and drains every producer between polls, so
//! a single thread mutates all view state.

use crate::config::keybindings::KeyBindings;
use crate::model::{AppError, KeyAction};
use crate::search::SearchDirection;
use crate::view::help::{help_line_count, render_help_overlay};
use crate::view::layout::{choose_split, SplitMode};
use crate::view::{clip, Context, InputOutcome, View, ViewPanel};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    Terminal,
};
use regex::Regex;
use std::io::{self, Stdout};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long `run` waits for terminal input before draining producers.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Transient message on the last screen row.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StatusLine {
    text: String,
    error: bool,
}

/// Main TUI application
///
/// Generic over backend to support testing with TestBackend
pub struct TuiApp<B>
where
    B: Backend,
{
    terminal: Terminal<B>,
    views: Vec<View>,
    current: usize,
    focus_child: bool,
    prompt: Option<String>,
    status: Option<StatusLine>,
    help_visible: bool,
    help_scroll: u16,
    key_bindings: KeyBindings,
    ctx: Context,
}

impl TuiApp<CrosstermBackend<Stdout>> {
    /// Set up the terminal (raw mode, alternate screen) around `view`.
    ///
    /// # Errors
    ///
    /// Terminal I/O failures.
    pub fn new(view: View, ctx: Context) -> Result<Self, AppError> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Self::with_terminal(terminal, view, ctx)
    }

    /// Run until the last view closes.
    ///
    /// Fatal errors close every view before they are returned.
    ///
    /// # Errors
    ///
    /// Terminal failures and fatal worker errors.
    pub fn run(&mut self) -> Result<(), AppError> {
        let result = self.event_loop();
        if result.is_err() {
            self.close_all();
        }
        result
    }

    fn event_loop(&mut self) -> Result<(), AppError> {
        self.draw()?;
        loop {
            let mut dirty = false;
            if event::poll(POLL_INTERVAL)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if self.handle_key(key)? {
                            return Ok(());
                        }
                        dirty = true;
                    }
                    Event::Resize(width, height) => {
                        debug!(width, height, "terminal resized");
                        self.relayout()?;
                        dirty = true;
                    }
                    _ => {}
                }
            }
            dirty |= self.pump()?;
            if dirty {
                self.draw()?;
            }
        }
    }

    /// Leave the alternate screen and raw mode.
    ///
    /// # Errors
    ///
    /// Terminal I/O failures.
    pub fn restore(&mut self) -> Result<(), AppError> {
        disable_raw_mode()?;
        self.terminal.backend_mut().execute(LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl<B> TuiApp<B>
where
    B: Backend,
{
    /// App on an existing terminal, for tests and benchmarks.
    ///
    /// # Errors
    ///
    /// Terminal size query failures.
    pub fn with_terminal(terminal: Terminal<B>, view: View, ctx: Context) -> Result<Self, AppError> {
        let mut app = Self {
            terminal,
            views: vec![view],
            current: 0,
            focus_child: false,
            prompt: None,
            status: None,
            help_visible: false,
            help_scroll: 0,
            key_bindings: KeyBindings::default(),
            ctx,
        };
        app.relayout()?;
        app.sync_focus()?;
        Ok(app)
    }

    /// Top-level views, in opening order.
    pub fn views(&self) -> &[View] {
        &self.views
    }

    /// Top-level views, mutably.
    pub fn views_mut(&mut self) -> &mut [View] {
        &mut self.views
    }

    /// Index of the current top-level view.
    pub fn current(&self) -> usize {
        self.current
    }

    /// The focused view: the current top-level view or its child.
    pub fn focused(&self) -> Option<&View> {
        let view = self.views.get(self.current)?;
        match view.child() {
            Some(child) if self.focus_child => Some(child),
            _ => Some(view),
        }
    }

    fn focused_mut(&mut self) -> Option<&mut View> {
        let focus_child = self.focus_child;
        let view = self.views.get_mut(self.current)?;
        if focus_child && view.child().is_some() {
            view.child_mut()
        } else {
            Some(view)
        }
    }

    /// Message on the status line, if any.
    pub fn status(&self) -> Option<&str> {
        self.status.as_ref().map(|s| s.text.as_str())
    }

    /// Text typed at the search prompt, while it is open.
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    /// Whether the help overlay is shown.
    pub fn help_visible(&self) -> bool {
        self.help_visible
    }

    /// The terminal.
    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }

    /// Area shared by the top-level views: everything above the status line.
    fn view_area(&self) -> Result<Rect, AppError> {
        let size = self.terminal.size()?;
        Ok(Rect::new(0, 0, size.width.max(1), size.height.saturating_sub(1)))
    }

    /// Lay every view out again, hidden ones included.
    ///
    /// # Errors
    ///
    /// Terminal size query failures.
    pub fn relayout(&mut self) -> Result<(), AppError> {
        let area = self.view_area()?;
        let height = self.ctx.config.split_height;
        for view in &mut self.views {
            view.layout(area, height);
        }
        Ok(())
    }

    /// Mark the focused view active, park views that are off screen.
    fn sync_focus(&mut self) -> Result<(), AppError> {
        if self.current >= self.views.len() {
            self.current = self.views.len().saturating_sub(1);
        }
        let current = self.current;
        // A parent covered by a fullscreen child cannot hold focus.
        let (has_child, covered) = self
            .views
            .get(current)
            .map_or((false, false), |v| (v.child().is_some(), v.child_is_fullscreen()));
        self.focus_child = has_child && (self.focus_child || covered);
        let focus_child = self.focus_child;
        for (i, view) in self.views.iter_mut().enumerate() {
            let is_current = i == current;
            view.set_active(is_current && !focus_child);
            if let Some(child) = view.child_mut() {
                child.set_active(is_current && focus_child);
            }
            if is_current {
                view.hide_covered()?;
            } else {
                view.hide()?;
            }
        }
        Ok(())
    }

    fn set_status(&mut self, text: impl Into<String>, error: bool) {
        self.status = Some(StatusLine {
            text: text.into(),
            error,
        });
    }

    /// Handle one key press. Returns `true` once the last view has closed.
    ///
    /// # Errors
    ///
    /// Fatal errors; every view is closed before they are returned.
    pub fn handle_key(&mut self, key: KeyEvent) -> Result<bool, AppError> {
        if self.help_visible {
            self.help_key(key);
            return Ok(false);
        }
        if self.prompt.is_some() {
            self.prompt_key(key)?;
            return Ok(self.views.is_empty());
        }
        let Some(action) = self.key_bindings.get(key) else {
            return Ok(false);
        };
        self.status = None;
        match self.dispatch(action) {
            Ok(quit) => Ok(quit || self.views.is_empty()),
            Err(e) if e.is_fatal() => {
                warn!(error = %e, "fatal error, closing all views");
                self.close_all();
                Err(e)
            }
            Err(e) => {
                self.set_status(e.to_string(), true);
                Ok(false)
            }
        }
    }

    fn help_key(&mut self, key: KeyEvent) {
        match (key.code, self.key_bindings.get(key)) {
            (KeyCode::Esc, _) | (_, Some(KeyAction::Help)) => {
                self.help_visible = false;
                self.help_scroll = 0;
            }
            (_, Some(KeyAction::ScrollDown)) => {
                let max = u16::try_from(help_line_count()).unwrap_or(u16::MAX);
                self.help_scroll = (self.help_scroll + 1).min(max);
            }
            (_, Some(KeyAction::ScrollUp)) => {
                self.help_scroll = self.help_scroll.saturating_sub(1);
            }
            _ => {}
        }
    }

    fn prompt_key(&mut self, key: KeyEvent) -> Result<(), AppError> {
        let Some(prompt) = self.prompt.as_mut() else {
            return Ok(());
        };
        match key.code {
            KeyCode::Esc => self.prompt = None,
            KeyCode::Backspace => {
                if prompt.pop().is_none() {
                    self.prompt = None;
                }
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => prompt.push(c),
            KeyCode::Enter => {
                let text = self.prompt.take().unwrap_or_default();
                if text.is_empty() {
                    return Ok(());
                }
                match Regex::new(&text) {
                    Ok(pattern) => {
                        info!(pattern = %text, "search started");
                        let outcome = match self.focused_mut() {
                            Some(view) => {
                                view.search_init(pattern);
                                view.search_next(SearchDirection::Forward)
                            }
                            None => InputOutcome::Ignored,
                        };
                        self.apply(outcome)?;
                    }
                    Err(e) => self.set_status(format!("invalid pattern: {e}"), true),
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Run one action; returns `true` to quit.
    fn dispatch(&mut self, action: KeyAction) -> Result<bool, AppError> {
        match action {
            KeyAction::Quit => {
                self.close_all();
                return Ok(true);
            }
            KeyAction::Help => self.help_visible = true,
            KeyAction::Redraw => self.terminal.clear()?,
            KeyAction::StartSearch => self.prompt = Some(String::new()),
            KeyAction::CycleFocus => self.cycle_focus()?,
            KeyAction::ToggleFullscreen => self.toggle_fullscreen()?,
            KeyAction::SwitchSplit => self.switch_split()?,
            other => {
                let ctx = self.ctx.clone();
                let outcome = match self.focused_mut() {
                    Some(view) => view.input(other, &ctx)?,
                    None => return Ok(true),
                };
                return self.apply(outcome);
            }
        }
        Ok(false)
    }

    fn apply(&mut self, outcome: InputOutcome) -> Result<bool, AppError> {
        match outcome {
            InputOutcome::Handled | InputOutcome::Ignored => {}
            InputOutcome::Open(panel) => self.open(*panel)?,
            InputOutcome::Close => self.close_focused()?,
            InputOutcome::Quit => {
                self.close_all();
                return Ok(true);
            }
            InputOutcome::Status(text) => self.set_status(text, false),
        }
        Ok(false)
    }

    /// Open `panel` from the focused view.
    ///
    /// From a top-level view it becomes (or replaces) the child when the
    /// split preference allows it; otherwise, and always from a child, it is
    /// pushed as a new top-level view.
    ///
    /// # Errors
    ///
    /// Errors closing a replaced child, or parking hidden views.
    pub fn open(&mut self, panel: ViewPanel) -> Result<(), AppError> {
        let mut view = View::new(panel);
        info!(kind = view.kind().label(), "opening view");
        let cols = self.terminal.size()?.width;
        let split = if self.focus_child {
            None
        } else {
            choose_split(self.ctx.config.split_mode, cols)
        };
        match (split, self.views.get_mut(self.current)) {
            (Some(mode), Some(parent)) => {
                view.set_mode(mode);
                parent.set_child(view)?;
                self.focus_child = true;
            }
            _ => {
                self.views.push(view);
                self.current = self.views.len() - 1;
                self.focus_child = false;
            }
        }
        self.relayout()?;
        self.sync_focus()
    }

    fn close_focused(&mut self) -> Result<(), AppError> {
        if self.views.is_empty() {
            return Ok(());
        }
        if self.focus_child {
            if let Some(mut child) = self.views[self.current].take_child() {
                child.close()?;
            }
            self.focus_child = false;
        } else {
            let mut view = self.views.remove(self.current);
            view.close()?;
            self.current = self.current.saturating_sub(1);
        }
        if self.views.is_empty() {
            return Ok(());
        }
        self.relayout()?;
        self.sync_focus()
    }

    /// Close every view, logging failures.
    pub fn close_all(&mut self) {
        while let Some(mut view) = self.views.pop() {
            if let Err(e) = view.close() {
                warn!(error = %e, "error while closing view");
            }
        }
        self.current = 0;
        self.focus_child = false;
    }

    fn cycle_focus(&mut self) -> Result<(), AppError> {
        let has_child = self
            .views
            .get(self.current)
            .is_some_and(|v| v.child().is_some());
        if !self.focus_child && has_child {
            self.focus_child = true;
        } else {
            self.focus_child = false;
            if self.views.len() > 1 {
                self.current = (self.current + 1) % self.views.len();
            }
        }
        self.sync_focus()
    }

    fn toggle_fullscreen(&mut self) -> Result<(), AppError> {
        let preference = self.ctx.config.split_mode;
        let cols = self.terminal.size()?.width;
        let focus_child = self.focus_child;
        let Some(child) = self
            .views
            .get_mut(self.current)
            .and_then(|v| v.child_mut())
            .filter(|_| focus_child)
        else {
            self.set_status("not a split view", false);
            return Ok(());
        };
        let mode = match child.mode() {
            SplitMode::NoSplit => choose_split(preference, cols).unwrap_or(SplitMode::Horizontal),
            _ => SplitMode::NoSplit,
        };
        child.set_mode(mode);
        self.relayout()?;
        self.sync_focus()
    }

    fn switch_split(&mut self) -> Result<(), AppError> {
        let Some(child) = self.views.get_mut(self.current).and_then(|v| v.child_mut()) else {
            self.set_status("no split to switch", false);
            return Ok(());
        };
        child.set_mode(child.mode().flipped());
        self.relayout()
    }

    /// Drain every producer. Returns whether anything changed.
    ///
    /// # Errors
    ///
    /// Fatal producer failures; every view is closed first.
    pub fn pump(&mut self) -> Result<bool, AppError> {
        let mut changed = false;
        let mut message = None;
        let mut fatal = None;
        for view in &mut self.views {
            match view.pump() {
                Ok(c) => changed |= c,
                Err(e) if e.is_fatal() => {
                    fatal = Some(e);
                    break;
                }
                Err(e) => {
                    message = Some(e.to_string());
                    changed = true;
                }
            }
            if let Some(status) = view.take_status() {
                message.get_or_insert(status);
                changed = true;
            }
        }
        if let Some(e) = fatal {
            return self.fail(e);
        }
        if let Some(message) = message {
            self.set_status(message, true);
        }
        Ok(changed)
    }

    fn fail(&mut self, e: AppError) -> Result<bool, AppError> {
        warn!(error = %e, "fatal producer error, closing all views");
        self.close_all();
        Err(e)
    }

    /// Render the current view, the status line, and the help overlay.
    ///
    /// # Errors
    ///
    /// Terminal failures and fatal panel errors.
    pub fn draw(&mut self) -> Result<(), AppError> {
        self.relayout()?;
        let palette = self.ctx.palette;
        let status = self.status_line();
        let mut shown = Ok(());
        let current = self.current;
        let views = &mut self.views;
        let bindings = &self.key_bindings;
        let help = self.help_visible.then_some(self.help_scroll);
        self.terminal.draw(|frame| {
            let area = frame.area();
            if let Some(view) = views.get_mut(current) {
                shown = view.show(frame.buffer_mut(), &palette);
            }
            render_status(frame.buffer_mut(), area, status);
            if let Some(scroll) = help {
                render_help_overlay(frame, bindings, &palette, scroll);
            }
        })?;
        match shown {
            Err(e) if e.is_fatal() => {
                self.fail(e)?;
                Ok(())
            }
            Err(e) => {
                self.set_status(e.to_string(), true);
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    fn status_line(&self) -> Line<'static> {
        let palette = &self.ctx.palette;
        if let Some(prompt) = &self.prompt {
            return Line::from(vec![Span::raw("/"), Span::raw(prompt.clone())]);
        }
        if let Some(status) = &self.status {
            let style = if status.error {
                palette.error
            } else {
                palette.muted
            };
            return Line::from(Span::styled(status.text.clone(), style));
        }
        let position = if self.views.len() > 1 {
            format!("[{}/{}] ", self.current + 1, self.views.len())
        } else {
            String::new()
        };
        Line::from(Span::styled(format!("{position}? help"), palette.muted))
    }
}

fn render_status(buf: &mut Buffer, area: Rect, line: Line<'_>) {
    if area.height == 0 {
        return;
    }
    let y = area.y + area.height - 1;
    let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
    let width = usize::from(area.width);
    if text.chars().count() > width {
        let clipped = clip(&text, width);
        let style = line.spans.first().map(|s| s.style).unwrap_or_default();
        buf.set_line(area.x, y, &Line::from(Span::styled(clipped, style)), area.width);
    } else {
        buf.set_line(area.x, y, &line, area.width);
    }
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod tests;
