//! Application state and lifecycle.

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::core::{
    BindState, BufferId, Command, Config, Editor, GitGutter, GitRepositoryProvider, Hunk,
    Project, RepoError, RepoWatcher, Repository, RepositoryProvider, SelectionUi, Settings,
    WatchEvent,
};

use super::editor::{ListUi, TerminalEditor};
use super::palette::Palette;

/// Terminal application: one file view with its gutter.
pub struct App {
    // Dropped first: trackers release the editor before it goes away.
    gutter: GitGutter,
    editor: Rc<TerminalEditor>,
    list: Rc<ListUi>,
    provider: Arc<GitRepositoryProvider>,
    watcher: Option<RepoWatcher>,
    root: PathBuf,

    /// Colors.
    pub palette: Palette,
    /// First visible row.
    pub scroll_y: usize,
    /// Rows available to the text view at the last draw.
    pub viewport_height: usize,
    /// Transient message for the bottom bar.
    pub status: Option<String>,
    /// Should the app quit?
    pub should_quit: bool,
    /// Whether the UI needs a redraw.
    pub dirty: bool,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("editor", &self.editor)
            .field("root", &self.root)
            .field("watching", &self.watcher.is_some())
            .finish()
    }
}

impl App {
    /// Open `path` and start tracking it.
    ///
    /// The project root is the repository working tree containing the file,
    /// or the file's directory when it is not in a repository.
    pub fn new(path: &Path, settings: Settings) -> Result<Self> {
        let path = path
            .canonicalize()
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));

        let provider = Arc::new(GitRepositoryProvider::new());
        let root = match provider.open(&parent) {
            Ok(repo) => repo.workdir().to_path_buf(),
            Err(RepoError::NotARepo) => parent,
            Err(e) => {
                tracing::warn!(error = %e, "repository discovery failed");
                parent
            }
        };

        let editor = Rc::new(
            TerminalEditor::open(BufferId(1), &path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
        );
        let list = Rc::new(ListUi::new());

        let config = Arc::new(Config::new(settings));
        let project = Arc::new(Project::new(vec![root.clone()]));
        let shared_provider: Arc<dyn RepositoryProvider> = provider.clone();
        let ui: Rc<dyn SelectionUi> = list.clone();
        let mut gutter = GitGutter::activate(config, project, shared_provider, ui);

        let tracked: Rc<dyn Editor> = editor.clone();
        gutter.observe_editor(tracked);

        let watcher = match RepoWatcher::new(&root) {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::warn!(root = %root.display(), error = %e, "file watching disabled");
                None
            }
        };

        tracing::info!(path = %path.display(), root = %root.display(), "file opened");

        Ok(Self {
            gutter,
            editor,
            list,
            provider,
            watcher,
            root,
            palette: Palette::default(),
            scroll_y: 0,
            viewport_height: 0,
            status: None,
            should_quit: false,
            dirty: true,
        })
    }

    /// The file view.
    pub fn editor(&self) -> &TerminalEditor {
        &self.editor
    }

    /// The hunk list overlay.
    pub fn list(&self) -> &ListUi {
        &self.list
    }

    /// Project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Live settings.
    pub fn settings(&self) -> Settings {
        self.gutter.config().get()
    }

    /// Buffer id of the file view.
    pub fn buffer(&self) -> BufferId {
        self.editor.id()
    }

    /// Current hunks of the file.
    pub fn hunks(&self) -> &[Hunk] {
        self.gutter
            .tracker(self.buffer())
            .map(|t| t.hunks())
            .unwrap_or_default()
    }

    /// Whether the repository lookup has finished.
    pub fn is_bound(&self) -> bool {
        self.gutter
            .tracker(self.buffer())
            .is_some_and(|t| matches!(t.state(), BindState::Bound(_)) && t.pending_bind().is_none())
    }

    /// Whether the file belongs to a repository.
    pub fn in_repository(&self) -> bool {
        self.gutter
            .tracker(self.buffer())
            .is_some_and(|t| t.repository().is_some())
    }

    /// Apply background results and file changes.
    pub fn poll(&mut self) {
        if let Some(WatchEvent::Changed(paths)) = self.watcher.as_ref().and_then(RepoWatcher::poll)
        {
            tracing::debug!(count = paths.len(), "files changed");
            self.provider.refresh_statuses();
            let own = self.editor.path();
            if own.as_deref().is_some_and(|own| paths.iter().any(|p| p == own)) {
                if let Err(e) = self.editor.reload() {
                    tracing::warn!(error = %e, "reload failed");
                    self.status = Some(format!("Reload failed: {e}"));
                }
            }
            self.dirty = true;
        }

        if self.gutter.poll() {
            self.dirty = true;
        }
    }

    /// Poll until the repository lookup finishes or `timeout` passes.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.gutter.poll();
            if self.is_bound() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    /// Run a package command against the file view.
    pub fn dispatch(&mut self, command: Command) -> bool {
        let handled = self.gutter.dispatch(command, Some(self.buffer()));
        if !handled && command != Command::ToggleHunkList {
            self.status = Some("No more diffs".into());
        }
        self.dirty = true;
        handled
    }

    /// Move the cursor by `delta` rows.
    pub fn move_cursor(&mut self, delta: isize) {
        self.editor.move_cursor_by(delta);
        self.dirty = true;
    }

    /// Cursor to the first row.
    pub fn cursor_to_top(&mut self) {
        self.editor.set_cursor(0, 0, true);
        self.dirty = true;
    }

    /// Cursor to the last row.
    pub fn cursor_to_bottom(&mut self) {
        let last = self.editor.line_count().saturating_sub(1);
        self.editor.set_cursor(last, 0, true);
        self.dirty = true;
    }

    /// Re-read the file from disk.
    pub fn reload(&mut self) {
        match self.editor.reload() {
            Ok(true) => self.status = Some("Reloaded".into()),
            Ok(false) => self.status = Some("Unchanged".into()),
            Err(e) => self.status = Some(format!("Reload failed: {e}")),
        }
        self.dirty = true;
    }

    /// Flip gutter icons on or off.
    pub fn toggle_icons(&mut self) {
        let mut settings = self.settings();
        settings.show_icons_in_editor_gutter = !settings.show_icons_in_editor_gutter;
        self.gutter.config().set(settings);
        self.dirty = true;
    }

    /// Flip wrap-around navigation.
    pub fn toggle_wrap(&mut self) {
        let mut settings = self.settings();
        settings.wrap_around_on_move_to_diff = !settings.wrap_around_on_move_to_diff;
        self.gutter.config().set(settings);
        self.status = Some(if settings.wrap_around_on_move_to_diff {
            "Wrap around on".into()
        } else {
            "Wrap around off".into()
        });
        self.dirty = true;
    }

    /// Flip line numbers.
    pub fn toggle_line_numbers(&mut self) {
        let mut settings = self.settings();
        settings.show_line_numbers = !settings.show_line_numbers;
        self.gutter.config().set(settings);
        self.dirty = true;
    }

    // ========================================================================
    // Hunk list
    // ========================================================================

    /// Whether the hunk list is open.
    pub fn list_visible(&self) -> bool {
        self.gutter.picker().is_some_and(|p| p.is_visible())
    }

    /// Current hunk list filter.
    pub fn list_query(&self) -> &str {
        self.gutter.picker().map(|p| p.query()).unwrap_or_default()
    }

    /// Append a character to the filter.
    pub fn list_push_char(&mut self, c: char) {
        self.edit_query(|q| q.push(c));
    }

    /// Delete the last filter character.
    pub fn list_pop_char(&mut self) {
        self.edit_query(|q| {
            q.pop();
        });
    }

    fn edit_query(&mut self, edit: impl FnOnce(&mut String)) {
        if let Some(picker) = self.gutter.picker_mut() {
            let mut query = picker.query().to_owned();
            edit(&mut query);
            picker.set_query(&query);
            self.dirty = true;
        }
    }

    /// Highlight the next entry.
    pub fn list_select_next(&mut self) {
        if let Some(picker) = self.gutter.picker_mut() {
            picker.select_next();
            self.dirty = true;
        }
    }

    /// Highlight the previous entry.
    pub fn list_select_prev(&mut self) {
        if let Some(picker) = self.gutter.picker_mut() {
            picker.select_previous();
            self.dirty = true;
        }
    }

    /// Jump to the highlighted entry.
    pub fn list_confirm(&mut self) {
        if let Some(picker) = self.gutter.picker_mut() {
            picker.confirm_selected();
            self.dirty = true;
        }
    }

    /// Close the list without moving.
    pub fn list_cancel(&mut self) {
        if let Some(picker) = self.gutter.picker_mut() {
            picker.cancel();
            self.dirty = true;
        }
    }

    // ========================================================================
    // Viewport
    // ========================================================================

    /// Keep the cursor on screen, centering it after a jump.
    pub fn scroll_to_cursor(&mut self, height: usize) {
        self.viewport_height = height;
        if height == 0 {
            return;
        }
        let (row, _) = self.editor.cursor();
        let visible = self.scroll_y..self.scroll_y + height;
        if self.editor.take_scroll_request() && !visible.contains(&row) {
            self.scroll_y = row.saturating_sub(height / 2);
        } else if row < self.scroll_y {
            self.scroll_y = row;
        } else if row >= self.scroll_y + height {
            self.scroll_y = row + 1 - height;
        }
    }

    /// Half a screen, for paging.
    pub fn page_size(&self) -> isize {
        (self.viewport_height / 2).max(1) as isize
    }

    /// Redraw done.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Force a redraw.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Tear everything down.
    pub fn shutdown(self) {
        self.editor.destroy();
        self.gutter.deactivate();
    }
}
