//! Help overlay widget displaying keyboard shortcuts.
//!
//! Shows a centered modal overlay with the current key bindings grouped by
//! category. Triggered by '?' key, dismissed by 'Esc' or '?'.

use crate::config::keybindings::{describe, KeyBindings};
use crate::model::KeyAction;
use crate::view::Palette;
use ratatui::{
    layout::{Alignment, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

/// Percentage of the screen the overlay covers.
const POPUP_WIDTH_PERCENT: u16 = 70;
const POPUP_HEIGHT_PERCENT: u16 = 80;

/// Width of the key column.
const KEY_COLUMN: usize = 22;

const SECTIONS: &[(&str, &[(KeyAction, &str)])] = &[
    (
        "Movement",
        &[
            (KeyAction::ScrollDown, "Move down"),
            (KeyAction::ScrollUp, "Move up"),
            (KeyAction::PageDown, "Page down"),
            (KeyAction::PageUp, "Page up"),
            (KeyAction::HalfPageDown, "Half page down"),
            (KeyAction::HalfPageUp, "Half page up"),
            (KeyAction::ScrollToTop, "First line"),
            (KeyAction::ScrollToBottom, "Last line (loads the rest)"),
            (KeyAction::Select, "Open selection"),
            (KeyAction::Back, "Parent directory"),
        ],
    ),
    (
        "Views",
        &[
            (KeyAction::Close, "Close view"),
            (KeyAction::Quit, "Quit"),
            (KeyAction::CycleFocus, "Next view"),
            (KeyAction::ToggleFullscreen, "Toggle fullscreen"),
            (KeyAction::SwitchSplit, "Vertical / horizontal split"),
            (KeyAction::OpenTimeline, "Timeline of selection"),
            (KeyAction::OpenTree, "Tree of selection"),
            (KeyAction::OpenBranches, "Branch list"),
        ],
    ),
    (
        "Search",
        &[
            (KeyAction::StartSearch, "Search (regex)"),
            (KeyAction::NextMatch, "Next match"),
            (KeyAction::PrevMatch, "Previous match"),
        ],
    ),
    (
        "Diff",
        &[
            (KeyAction::MoreContext, "More context"),
            (KeyAction::LessContext, "Less context"),
            (KeyAction::ToggleWhitespace, "Ignore whitespace"),
            (KeyAction::ToggleInvert, "Invert diff"),
            (KeyAction::NextFile, "Next file"),
            (KeyAction::PrevFile, "Previous file"),
        ],
    ),
    (
        "Blame",
        &[
            (KeyAction::BlameParent, "Blame parent of line's commit"),
            (KeyAction::BlameCommit, "Blame line's commit"),
            (KeyAction::BlameBack, "Back to previous blame"),
        ],
    ),
    (
        "Tree / Branches",
        &[
            (KeyAction::ToggleIds, "Show ids"),
            (KeyAction::CycleSort, "Cycle sort order"),
        ],
    ),
    (
        "Application",
        &[
            (KeyAction::Help, "Toggle this help"),
            (KeyAction::Redraw, "Redraw screen"),
        ],
    ),
];

/// Render the help overlay centered on the screen.
///
/// `scroll_offset` is the first content line shown.
pub fn render_help_overlay(
    frame: &mut Frame,
    bindings: &KeyBindings,
    palette: &Palette,
    scroll_offset: u16,
) {
    let popup_area = centered_rect(POPUP_WIDTH_PERCENT, POPUP_HEIGHT_PERCENT, frame.area());
    frame.render_widget(Clear, popup_area);

    let help_paragraph = Paragraph::new(build_help_content(bindings, palette))
        .block(
            Block::default()
                .title(" Keyboard Shortcuts ")
                .borders(Borders::ALL)
                .border_style(palette.hunk),
        )
        .wrap(Wrap { trim: false })
        .alignment(Alignment::Left)
        .scroll((scroll_offset, 0));
    frame.render_widget(help_paragraph, popup_area);

    let hint_area = Rect {
        y: popup_area.y + popup_area.height.saturating_sub(1),
        height: 1,
        ..popup_area
    };
    let hint = Paragraph::new(Line::from(Span::styled(
        " Press Esc or ? to close ",
        palette.muted.add_modifier(Modifier::DIM),
    )))
    .alignment(Alignment::Center);
    frame.render_widget(hint, hint_area);
}

/// Lines of help content, for scroll clamping.
pub fn help_line_count() -> usize {
    SECTIONS.iter().map(|(_, rows)| rows.len() + 2).sum()
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_width = area.width * percent_x / 100;
    let popup_height = area.height * percent_y / 100;
    Rect {
        x: area.x + (area.width.saturating_sub(popup_width)) / 2,
        y: area.y + (area.height.saturating_sub(popup_height)) / 2,
        width: popup_width,
        height: popup_height,
    }
}

fn build_help_content(bindings: &KeyBindings, palette: &Palette) -> Vec<Line<'static>> {
    let mut lines = Vec::with_capacity(help_line_count());
    for (title, rows) in SECTIONS {
        lines.push(Line::from(Span::styled(
            *title,
            palette.file_header,
        )));
        for (action, text) in rows.iter() {
            let keys: Vec<String> = bindings.keys_for(*action).into_iter().map(describe).collect();
            let keys = if keys.is_empty() {
                "(unbound)".to_string()
            } else {
                keys.join("/")
            };
            lines.push(Line::from(vec![
                Span::styled(format!("  {keys:<KEY_COLUMN$}"), palette.key),
                Span::raw(*text),
            ]));
        }
        lines.push(Line::default());
    }
    lines
}
