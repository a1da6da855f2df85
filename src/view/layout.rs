//! Split geometry.
//!
//! Pure functions: given the parent's area and the split mode, compute where
//! the parent and its child go.

use crate::config::{SplitHeight, SplitPreference};
use ratatui::layout::Rect;

/// Narrowest terminal that gets a vertical split.
pub const VERTICAL_SPLIT_MIN_COLS: u16 = 120;

/// Minimum width of the child in a vertical split.
pub const CHILD_MIN_COLS: u16 = 80;

/// Lines the parent keeps in a horizontal split.
pub const PARENT_MIN_LINES: u16 = 2;

/// How a view shares its parent's area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitMode {
    /// Fullscreen: the view covers the whole area.
    #[default]
    NoSplit,
    /// Side by side, child on the right.
    Vertical,
    /// Stacked, child at the bottom.
    Horizontal,
}

impl SplitMode {
    /// Vertical ↔ horizontal; `NoSplit` stays.
    pub fn flipped(self) -> Self {
        match self {
            SplitMode::NoSplit => SplitMode::NoSplit,
            SplitMode::Vertical => SplitMode::Horizontal,
            SplitMode::Horizontal => SplitMode::Vertical,
        }
    }
}

/// Split mode for a view opened from a top-level view on a terminal `cols`
/// wide, or `None` when it must open fullscreen as a new top-level view.
pub fn choose_split(preference: SplitPreference, cols: u16) -> Option<SplitMode> {
    let wide = cols >= VERTICAL_SPLIT_MIN_COLS;
    match preference {
        SplitPreference::Auto if wide => Some(SplitMode::Vertical),
        SplitPreference::Auto => None,
        SplitPreference::Vertical if wide => Some(SplitMode::Vertical),
        SplitPreference::Vertical | SplitPreference::Horizontal => Some(SplitMode::Horizontal),
    }
}

/// Areas of the parent and the child for `mode`.
///
/// A vertical split that does not fit falls back to horizontal. The child of
/// a `NoSplit` view covers the parent entirely.
pub fn split_areas(area: Rect, mode: SplitMode, height: SplitHeight) -> (Rect, Rect) {
    match mode {
        SplitMode::NoSplit => (area, area),
        SplitMode::Vertical if area.width >= VERTICAL_SPLIT_MIN_COLS => {
            let child_cols = (area.width / 2).max(CHILD_MIN_COLS).min(area.width);
            let parent_cols = area.width - child_cols;
            let parent = Rect {
                width: parent_cols,
                ..area
            };
            let child = Rect {
                x: area.x + parent_cols,
                width: child_cols,
                ..area
            };
            (parent, child)
        }
        SplitMode::Vertical | SplitMode::Horizontal => {
            let max_child = area.height.saturating_sub(PARENT_MIN_LINES);
            let child_lines = height.rows(area.height).clamp(1, max_child.max(1));
            let child_lines = child_lines.min(area.height);
            let parent_lines = area.height - child_lines;
            let parent = Rect {
                height: parent_lines,
                ..area
            };
            let child = Rect {
                y: area.y + parent_lines,
                height: child_lines,
                ..area
            };
            (parent, child)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen(width: u16, height: u16) -> Rect {
        Rect::new(0, 0, width, height)
    }

    #[test]
    fn auto_splits_vertically_only_on_wide_terminals() {
        assert_eq!(
            choose_split(SplitPreference::Auto, 120),
            Some(SplitMode::Vertical)
        );
        assert_eq!(choose_split(SplitPreference::Auto, 119), None);
        assert_eq!(
            choose_split(SplitPreference::Vertical, 100),
            Some(SplitMode::Horizontal)
        );
        assert_eq!(
            choose_split(SplitPreference::Horizontal, 200),
            Some(SplitMode::Horizontal)
        );
    }

    #[test]
    fn vertical_child_gets_half_or_eighty_columns() {
        let (parent, child) = split_areas(screen(120, 30), SplitMode::Vertical, SplitHeight::default());
        assert_eq!(child.width, 80);
        assert_eq!(parent.width, 40);
        assert_eq!(child.x, 40);

        let (parent, child) = split_areas(screen(200, 30), SplitMode::Vertical, SplitHeight::default());
        assert_eq!(child.width, 100);
        assert_eq!(parent.width, 100);
        assert_eq!(child.height, 30);
    }

    #[test]
    fn narrow_vertical_falls_back_to_horizontal() {
        let (parent, child) =
            split_areas(screen(100, 30), SplitMode::Vertical, SplitHeight::Percent(50));
        assert_eq!(parent.width, 100);
        assert_eq!(child.height, 15);
        assert_eq!(child.y, 15);
    }

    #[test]
    fn horizontal_parent_keeps_two_lines() {
        let (parent, child) =
            split_areas(screen(80, 10), SplitMode::Horizontal, SplitHeight::Lines(50));
        assert_eq!(parent.height, 2);
        assert_eq!(child.height, 8);
        assert_eq!(child.y, 2);

        let (parent, child) =
            split_areas(screen(80, 24), SplitMode::Horizontal, SplitHeight::Percent(25));
        assert_eq!(child.height, 6);
        assert_eq!(parent.height, 18);
    }

    #[test]
    fn tiny_areas_do_not_underflow() {
        let (parent, child) =
            split_areas(screen(10, 1), SplitMode::Horizontal, SplitHeight::Lines(5));
        assert_eq!(parent.height + child.height, 1);
    }

    #[test]
    fn no_split_child_covers_the_parent() {
        let area = screen(90, 20);
        assert_eq!(
            split_areas(area, SplitMode::NoSplit, SplitHeight::default()),
            (area, area)
        );
    }
}
