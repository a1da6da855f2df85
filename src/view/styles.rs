//! Colours used by every view.
//!
//! Colour is on unless `--no-color` is given or `NO_COLOR` is set; without it
//! only modifiers (reverse, bold) remain so selection is still visible.

use ratatui::style::{Color, Modifier, Style};

/// Whether colour output is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorConfig {
    enabled: bool,
}

impl ColorConfig {
    /// Create a ColorConfig from CLI args and environment.
    ///
    /// Priority (first match wins):
    /// 1. `--no-color` flag (disables colors)
    /// 2. `NO_COLOR` env var (any value disables colors)
    /// 3. Default: colors enabled
    pub fn from_env_and_args(no_color_flag: bool) -> Self {
        let enabled = !no_color_flag && std::env::var("NO_COLOR").is_err();
        Self { enabled }
    }

    /// Explicit setting, for tests.
    pub fn with_colors(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Check if colors are enabled.
    pub fn colors_enabled(self) -> bool {
        self.enabled
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self::from_env_and_args(false)
    }
}

/// Resolved styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Header line of the focused view.
    pub header_active: Style,
    /// Header line of other views.
    pub header: Style,
    /// Selected row.
    pub selection: Style,
    /// Short ids.
    pub id: Style,
    /// Dates and authors.
    pub muted: Style,
    /// Branch and tag names.
    pub label: Style,
    /// Directories in the tree view.
    pub directory: Style,
    /// Added diff lines.
    pub added: Style,
    /// Removed diff lines.
    pub removed: Style,
    /// `@@` hunk headers.
    pub hunk: Style,
    /// File section headers in a diff.
    pub file_header: Style,
    /// Status line errors.
    pub error: Style,
    /// Help overlay keys.
    pub key: Style,
}

impl Palette {
    /// Palette for the given colour setting.
    pub fn new(config: ColorConfig) -> Self {
        let reversed = Style::default().add_modifier(Modifier::REVERSED);
        if config.colors_enabled() {
            Self {
                header_active: Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
                header: Style::default().fg(Color::Black).bg(Color::DarkGray),
                selection: reversed,
                id: Style::default().fg(Color::Yellow),
                muted: Style::default().fg(Color::DarkGray),
                label: Style::default().fg(Color::Magenta),
                directory: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
                added: Style::default().fg(Color::Green),
                removed: Style::default().fg(Color::Red),
                hunk: Style::default().fg(Color::Cyan),
                file_header: Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                error: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                key: Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            }
        } else {
            let bold = Style::default().add_modifier(Modifier::BOLD);
            Self {
                header_active: reversed.add_modifier(Modifier::BOLD),
                header: reversed,
                selection: reversed,
                id: Style::default(),
                muted: Style::default(),
                label: Style::default(),
                directory: bold,
                added: Style::default(),
                removed: Style::default(),
                hunk: Style::default(),
                file_header: bold,
                error: bold,
                key: bold,
            }
        }
    }

    /// Style of one line of diff output.
    pub fn diff_line(&self, line: &str) -> Style {
        if line.starts_with("+++") || line.starts_with("---") {
            self.file_header
        } else if line.starts_with('+') {
            self.added
        } else if line.starts_with('-') {
            self.removed
        } else if line.starts_with("@@") {
            self.hunk
        } else if is_section_header(line) {
            self.file_header
        } else {
            Style::default()
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(ColorConfig::default())
    }
}

fn is_section_header(line: &str) -> bool {
    ["ADDED ", "DELETED ", "CHANGED ", "RENAMED ", "MODE "]
        .iter()
        .any(|p| line.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn no_color_flag_disables_colors() {
        assert!(!ColorConfig::from_env_and_args(true).colors_enabled());
    }

    #[test]
    #[serial(env)]
    fn no_color_env_var_disables_colors() {
        std::env::set_var("NO_COLOR", "");
        assert!(!ColorConfig::from_env_and_args(false).colors_enabled());
        std::env::remove_var("NO_COLOR");
        assert!(ColorConfig::from_env_and_args(false).colors_enabled());
    }

    #[test]
    fn monochrome_palette_keeps_selection_visible() {
        let palette = Palette::new(ColorConfig::with_colors(false));
        assert!(palette.selection.add_modifier.contains(Modifier::REVERSED));
        assert_eq!(palette.added.fg, None);
    }

    #[test]
    fn diff_lines_are_classified() {
        let palette = Palette::new(ColorConfig::with_colors(true));
        assert_eq!(palette.diff_line("+added"), palette.added);
        assert_eq!(palette.diff_line("-removed"), palette.removed);
        assert_eq!(palette.diff_line("+++ new"), palette.file_header);
        assert_eq!(palette.diff_line("@@ -1 +1 @@"), palette.hunk);
        assert_eq!(palette.diff_line("CHANGED  src/lib.rs"), palette.file_header);
        assert_eq!(palette.diff_line(" context"), Style::default());
    }
}
