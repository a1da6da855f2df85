//! Domain-level keyboard actions independent of key bindings.

/// Domain-level actions that can be mapped to configurable key bindings.
///
/// These represent user intent, not specific keys. The mapping from
/// crossterm::event::KeyEvent to KeyAction is handled by KeyBindings.
/// Each view interprets the view-specific actions in its own way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    // Movement
    /// Move selection up one line. Default: k/↑
    ScrollUp,
    /// Move selection down one line. Default: j/↓
    ScrollDown,
    /// Move up one page. Default: Ctrl+b/Page Up
    PageUp,
    /// Move down one page. Default: Ctrl+f/Page Down/Space
    PageDown,
    /// Move up half a page. Default: Ctrl+u
    HalfPageUp,
    /// Move down half a page. Default: Ctrl+d
    HalfPageDown,
    /// Jump to the first line. Default: g/Home
    ScrollToTop,
    /// Jump to the last line, loading everything first if needed. Default: G/End
    ScrollToBottom,

    // Selection
    /// Open the selected item (diff, directory, blame, timeline). Default: Enter
    Select,
    /// Go back (parent directory). Default: Backspace/h/←
    Back,

    // View management
    /// Close the active view. Default: q
    Close,
    /// Close every view and exit. Default: Q/Ctrl+c
    Quit,
    /// Move focus to the next view (child, parent, sibling). Default: Tab
    CycleFocus,
    /// Toggle fullscreen of a split view. Default: F
    ToggleFullscreen,
    /// Flip between vertical and horizontal split. Default: S
    SwitchSplit,
    /// Open the tree view for the selection. Default: t
    OpenTree,
    /// Open the branch list. Default: B
    OpenBranches,
    /// Open the timeline for the selection. Default: T
    OpenTimeline,

    // Search
    /// Start typing a search pattern. Default: /
    StartSearch,
    /// Next match in the search direction. Default: n
    NextMatch,
    /// Previous match. Default: N
    PrevMatch,

    // Diff
    /// Show more context lines. Default: ]
    MoreContext,
    /// Show fewer context lines. Default: [
    LessContext,
    /// Toggle ignoring whitespace. Default: w
    ToggleWhitespace,
    /// Swap old and new sides. Default: i
    ToggleInvert,
    /// Jump to the next file segment. Default: J
    NextFile,
    /// Jump to the previous file segment. Default: K
    PrevFile,

    // Blame
    /// Blame the parent of the selected line's commit. Default: p
    BlameParent,
    /// Blame the selected line's commit. Default: b
    BlameCommit,
    /// Return to the previously blamed version. Default: c
    BlameBack,

    // Tree / branch
    /// Toggle artifact id display. Default: I
    ToggleIds,
    /// Cycle the sort order. Default: s
    CycleSort,

    // Application
    /// Show help overlay with keyboard shortcuts. Default: ?
    Help,
    /// Redraw the screen. Default: Ctrl+l
    Redraw,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn actions_are_hashable_and_distinct() {
        let set: HashSet<KeyAction> = [
            KeyAction::Close,
            KeyAction::Quit,
            KeyAction::Close,
            KeyAction::NextMatch,
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 3);
    }
}
