//! Acceptance test harness for TUI testing.
//!
//! Wraps `TuiApp<TestBackend>` with methods that simulate user interaction:
//! key presses, typed text, and waiting for producers to deliver.

use crate::config::ResolvedConfig;
use crate::model::{AppError, ArtifactId};
use crate::repo::{CommitSpec, SharedRepository, SnapshotBuilder};
use crate::view::{Context, TuiApp, View};
use chrono::{DateTime, TimeZone, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::backend::TestBackend;
use ratatui::Terminal;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Convert a ratatui buffer to a string representation for snapshot testing.
///
/// Captures the visual output character by character, preserving layout.
/// Empty trailing lines are removed to keep snapshots clean.
pub(crate) fn buffer_to_string(buffer: &ratatui::buffer::Buffer) -> String {
    let area = buffer.area();
    let mut lines = Vec::new();

    for y in area.top()..area.bottom() {
        let mut line = String::new();
        for x in area.left()..area.right() {
            line.push_str(buffer[(x, y)].symbol());
        }
        let trimmed = line.trim_end();
        if !trimmed.is_empty() {
            lines.push(trimmed.to_string());
        }
    }

    lines.join("\n")
}

/// Fixed commit time `minutes` after a base instant.
pub(crate) fn minute(minutes: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + minutes * 60, 0)
        .single()
        .unwrap_or_default()
}

/// Linear history of `count` commits by alternating authors, oldest first.
pub(crate) fn linear_repo(count: usize) -> (SharedRepository, Vec<ArtifactId>) {
    let mut b = SnapshotBuilder::new();
    let mut ids: Vec<ArtifactId> = Vec::new();
    for i in 0..count {
        let user = if i % 2 == 0 { "alice" } else { "bob" };
        let mut spec = CommitSpec::new(user, minute(i as i64), &format!("commit number {i}"))
            .file("README", "readme\n")
            .file("src/lib.rs", &format!("pub const N: usize = {i};\n"));
        if let Some(parent) = ids.last() {
            spec = spec.parent(parent);
        }
        ids.push(b.commit(spec));
    }
    let repo = b.build().unwrap_or_else(|e| panic!("fixture repository: {e}"));
    (Arc::new(repo), ids)
}

/// Test harness for acceptance testing.
pub(crate) struct AppHarness {
    app: TuiApp<TestBackend>,
    running: bool,
}

impl AppHarness {
    /// App of the given size around `view`.
    pub(crate) fn new(
        repo: SharedRepository,
        config: ResolvedConfig,
        width: u16,
        height: u16,
        open: impl FnOnce(&Context) -> View,
    ) -> Result<Self, AppError> {
        let ctx = Context::new(repo, config);
        let view = open(&ctx);
        let terminal = Terminal::new(TestBackend::new(width, height))?;
        let app = TuiApp::with_terminal(terminal, view, ctx)?;
        Ok(Self { app, running: true })
    }

    /// The app.
    pub(crate) fn app(&self) -> &TuiApp<TestBackend> {
        &self.app
    }

    /// The app, mutably.
    pub(crate) fn app_mut(&mut self) -> &mut TuiApp<TestBackend> {
        &mut self.app
    }

    /// Send a single key. Returns `true` once the app has quit.
    pub(crate) fn send_key(&mut self, key: KeyCode) -> bool {
        self.send_key_with_mods(key, KeyModifiers::NONE)
    }

    /// Send a key with modifiers (e.g., Ctrl+C).
    pub(crate) fn send_key_with_mods(&mut self, key: KeyCode, mods: KeyModifiers) -> bool {
        if !self.running {
            return true;
        }
        let quit = self
            .app
            .handle_key(KeyEvent::new(key, mods))
            .unwrap_or_else(|e| panic!("fatal error on {key:?}: {e}"));
        if quit {
            self.running = false;
        }
        quit
    }

    /// Type text one character at a time.
    pub(crate) fn type_text(&mut self, text: &str) {
        for ch in text.chars() {
            if self.send_key(KeyCode::Char(ch)) {
                break;
            }
        }
    }

    /// Draw a frame, then pump producers until nothing changes for a while.
    pub(crate) fn settle(&mut self) {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut quiet = 0;
        while quiet < 5 && Instant::now() < deadline {
            self.draw();
            let changed = self
                .app
                .pump()
                .unwrap_or_else(|e| panic!("fatal producer error: {e}"));
            if changed {
                quiet = 0;
            } else {
                quiet += 1;
                std::thread::sleep(Duration::from_millis(10));
            }
        }
    }

    /// Render one frame.
    pub(crate) fn draw(&mut self) {
        self.app
            .draw()
            .unwrap_or_else(|e| panic!("draw failed: {e}"));
    }

    /// Render and return the screen as text.
    pub(crate) fn screen(&mut self) -> String {
        self.draw();
        buffer_to_string(self.app.terminal().backend().buffer())
    }

    /// Whether the app is still running.
    pub(crate) fn is_running(&self) -> bool {
        self.running
    }
}
