//! Diff view.
//!
//! Pages through a [`DiffText`] by seeking into its offset table; only the
//! visible lines are read. Option changes rebuild the text and keep the
//! cursor on the same line number where possible.

use crate::content::{DiffBuilder, DiffKind, DiffOptions, DiffText};
use crate::model::{AppError, KeyAction};
use crate::repo::SharedRepository;
use crate::search::SearchTarget;
use crate::view::{
    clip, render_header, render_row, scroll_into_view, Context, InputOutcome, Palette, Panel,
    ViewKind,
};
use ratatui::{buffer::Buffer, layout::Rect, text::Span};
use regex::Regex;
use tracing::{debug, warn};

/// Largest context the `]` key will reach.
const MAX_CONTEXT: usize = 100;

/// Rendered diff with cursor.
pub struct DiffView {
    repo: SharedRepository,
    kind: DiffKind,
    options: DiffOptions,
    text: DiffText,
    selected: usize,
    offset: usize,
    rows: usize,
}

impl std::fmt::Debug for DiffView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiffView")
            .field("kind", &self.kind)
            .field("options", &self.options)
            .field("lines", &self.text.len())
            .field("selected", &self.selected)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

impl DiffView {
    /// Build the diff of `kind` with the configured context.
    ///
    /// # Errors
    ///
    /// Repository errors while building the diff.
    pub fn new(ctx: &Context, kind: DiffKind) -> Result<Self, AppError> {
        let options = DiffOptions {
            context: ctx.config.diff_context,
            ..DiffOptions::default()
        };
        let text = DiffBuilder::new(ctx.repo.as_ref(), options).build(&kind)?;
        Ok(Self {
            repo: ctx.repo.clone(),
            kind,
            options,
            text,
            selected: 0,
            offset: 0,
            rows: 1,
        })
    }

    /// What is being diffed.
    pub fn diff_kind(&self) -> &DiffKind {
        &self.kind
    }

    /// Current options.
    pub fn options(&self) -> DiffOptions {
        self.options
    }

    /// The rendered text.
    pub fn text(&self) -> &DiffText {
        &self.text
    }

    /// First visible line.
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn rebuild(&mut self, options: DiffOptions) -> Result<(), AppError> {
        let text = DiffBuilder::new(self.repo.as_ref(), options).build(&self.kind)?;
        debug!(?options, lines = text.len(), "diff rebuilt");
        self.options = options;
        self.text = text;
        let selected = self.selected;
        self.select(selected);
        Ok(())
    }

    fn jump_to(&mut self, line: Option<usize>) -> InputOutcome {
        match line {
            Some(line) => {
                self.select(line);
                // Put the file header at the top.
                self.offset = line.min(self.text.len().saturating_sub(self.rows));
                InputOutcome::Handled
            }
            None => InputOutcome::Status("no more files".to_string()),
        }
    }

    fn describe(&self) -> String {
        match &self.kind {
            DiffKind::Checkin { from: Some(from), to } => {
                format!("diff {} {}", from.short(), to.short())
            }
            DiffKind::Checkin { from: None, to } => format!("diff {} (initial)", to.short()),
            DiffKind::Local => "diff local changes".to_string(),
            DiffKind::Blobs { from, to } => format!("diff {} {}", from.short(), to.short()),
            DiffKind::NonCheckin(id) => format!("diff {}", id.short()),
        }
    }
}

impl SearchTarget for DiffView {
    fn len(&self) -> usize {
        self.text.len()
    }

    fn is_match(&mut self, index: usize, pattern: &Regex) -> bool {
        match self.text.line(index) {
            Ok(Some(line)) => pattern.is_match(&line),
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, index, "diff line unreadable");
                false
            }
        }
    }
}

impl Panel for DiffView {
    fn kind(&self) -> ViewKind {
        ViewKind::Diff
    }

    fn title(&self) -> String {
        self.describe()
    }

    fn show(
        &mut self,
        area: Rect,
        buf: &mut Buffer,
        active: bool,
        palette: &Palette,
    ) -> Result<(), AppError> {
        self.resize(area);
        let mut flags = format!("-U{}", self.options.context);
        if self.options.ignore_whitespace {
            flags.push_str(" -w");
        }
        if self.options.invert {
            flags.push_str(" -R");
        }
        let files = self.text.segments().len();
        let position = format!(
            "{} files  {flags}  {}/{}",
            files,
            if self.text.is_empty() { 0 } else { self.selected + 1 },
            self.text.len()
        );
        render_header(area, buf, &self.describe(), &position, active, palette);

        let body = Rect {
            y: area.y + 1,
            height: area.height.saturating_sub(1),
            ..area
        };
        if self.text.is_empty() {
            render_row(
                body,
                buf,
                0,
                vec![Span::styled("no changes", palette.muted)],
                false,
                palette,
            );
            return Ok(());
        }
        let width = usize::from(area.width);
        let lines = self.text.lines(self.offset, self.rows)?;
        for (row, line) in lines.into_iter().enumerate() {
            let style = palette.diff_line(&line);
            let index = self.offset + row;
            let span = Span::styled(clip(&line.replace('\t', "    "), width), style);
            render_row(body, buf, row as u16, vec![span], index == self.selected, palette);
        }
        Ok(())
    }

    fn input(&mut self, action: KeyAction, _ctx: &Context) -> Result<InputOutcome, AppError> {
        let page = self.rows.max(1);
        match action {
            KeyAction::ScrollDown => self.select(self.selected + 1),
            KeyAction::ScrollUp => self.select(self.selected.saturating_sub(1)),
            KeyAction::PageDown => self.select(self.selected + page),
            KeyAction::PageUp => self.select(self.selected.saturating_sub(page)),
            KeyAction::HalfPageDown => self.select(self.selected + (page / 2).max(1)),
            KeyAction::HalfPageUp => self.select(self.selected.saturating_sub((page / 2).max(1))),
            KeyAction::ScrollToTop => self.select(0),
            KeyAction::MoreContext => {
                if self.options.context >= MAX_CONTEXT {
                    return Ok(InputOutcome::Status(format!(
                        "context is already {MAX_CONTEXT} lines"
                    )));
                }
                let options = DiffOptions {
                    context: self.options.context + 1,
                    ..self.options
                };
                self.rebuild(options)?;
            }
            KeyAction::LessContext => {
                if self.options.context == 0 {
                    return Ok(InputOutcome::Status("context is already 0 lines".to_string()));
                }
                let options = DiffOptions {
                    context: self.options.context - 1,
                    ..self.options
                };
                self.rebuild(options)?;
            }
            KeyAction::ToggleWhitespace => {
                let options = DiffOptions {
                    ignore_whitespace: !self.options.ignore_whitespace,
                    ..self.options
                };
                self.rebuild(options)?;
            }
            KeyAction::ToggleInvert => {
                let options = DiffOptions {
                    invert: !self.options.invert,
                    ..self.options
                };
                self.rebuild(options)?;
            }
            KeyAction::NextFile => {
                let line = self.text.next_segment(self.selected).map(|s| s.start);
                return Ok(self.jump_to(line));
            }
            KeyAction::PrevFile => {
                let line = self.text.prev_segment(self.selected).map(|s| s.start);
                return Ok(self.jump_to(line));
            }
            KeyAction::Close | KeyAction::Back => return Ok(InputOutcome::Close),
            KeyAction::Quit => return Ok(InputOutcome::Quit),
            _ => return Ok(InputOutcome::Ignored),
        }
        Ok(InputOutcome::Handled)
    }

    fn selected(&self) -> usize {
        self.selected
    }

    fn select(&mut self, index: usize) {
        self.selected = index.min(self.text.len().saturating_sub(1));
        self.offset = scroll_into_view(self.selected, self.offset, self.rows);
    }

    fn resize(&mut self, area: Rect) {
        self.rows = usize::from(area.height.saturating_sub(1)).max(1);
        self.offset = scroll_into_view(self.selected, self.offset, self.rows);
    }
}
