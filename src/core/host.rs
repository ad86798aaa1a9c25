//! Contracts the hosting editor implements.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use super::{DecorationClass, EventHub, PickerEntry, RowRange};

/// Identity of an open buffer, assigned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

/// Handle to a row marker installed in an editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub u64);

/// Opaque token for whatever held keyboard focus before the hunk list opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FocusTarget(pub u64);

/// Buffer-level notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    /// Text settled after a burst of edits.
    TextSettled,
    /// The buffer was saved under, or moved to, another path.
    PathChanged,
    /// The buffer was closed.
    Destroyed,
}

/// One open text buffer in the host.
///
/// Methods take `&self`; hosts use interior mutability. All calls happen on
/// the UI thread.
pub trait Editor {
    /// Buffer identity.
    fn id(&self) -> BufferId;

    /// Path on disk, if the buffer has one.
    fn path(&self) -> Option<PathBuf>;

    /// Full text.
    fn text(&self) -> String;

    /// Length of the text in characters.
    fn char_len(&self) -> usize;

    /// Text of a row without its newline, `None` past the end.
    fn line_text(&self, row: usize) -> Option<String>;

    /// Cursor row (0-based).
    fn cursor_row(&self) -> usize;

    /// Move the cursor.
    fn set_cursor(&self, row: usize, column: usize, autoscroll: bool);

    /// Mark a row range and attach a class to it.
    fn mark_rows(&self, rows: RowRange, class: DecorationClass) -> MarkerId;

    /// Remove a marker created by [`Editor::mark_rows`].
    fn remove_marker(&self, marker: MarkerId);

    /// Switch gutter change icons on or off.
    fn set_gutter_icons(&self, enabled: bool);

    /// Whether the buffer has been closed.
    fn is_destroyed(&self) -> bool;

    /// Buffer notifications.
    fn events(&self) -> &EventHub<EditorEvent>;
}

/// Searchable modal list supplied by the host.
///
/// The core pushes entries in; the host reports confirm/cancel back through
/// [`crate::core::HunkPicker`].
pub trait SelectionUi {
    /// Show the list with these entries (already filtered and ordered).
    fn present(&self, entries: &[PickerEntry], selected: Option<usize>, empty_message: &str);

    /// Hide the list.
    fn hide(&self);

    /// Element currently holding keyboard focus.
    fn focused(&self) -> Option<FocusTarget>;

    /// Give focus back to a previously focused element.
    fn restore_focus(&self, target: FocusTarget);
}

/// Project-level notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectEvent {
    /// Root directories were added or removed.
    PathsChanged,
}

/// The set of root directories open in the host.
#[derive(Debug, Default)]
pub struct Project {
    directories: RwLock<Vec<PathBuf>>,
    events: EventHub<ProjectEvent>,
}

impl Project {
    /// Create a project over these root directories.
    pub fn new(directories: Vec<PathBuf>) -> Self {
        Self {
            directories: RwLock::new(directories),
            events: EventHub::new(),
        }
    }

    /// Snapshot of the root directories.
    pub fn directories(&self) -> Vec<PathBuf> {
        self.directories.read().clone()
    }

    /// Replace the root directories and notify listeners.
    pub fn set_directories(&self, directories: Vec<PathBuf>) {
        *self.directories.write() = directories;
        self.events.emit(&ProjectEvent::PathsChanged);
    }

    /// Root directory owning `path`, if any.
    pub fn directory_for_path(&self, path: &Path) -> Option<PathBuf> {
        directory_for_path(&self.directories.read(), path).map(Path::to_path_buf)
    }

    /// Project notifications.
    pub fn events(&self) -> &EventHub<ProjectEvent> {
        &self.events
    }
}

/// First directory equal to, or containing, `path`.
pub fn directory_for_path<'a>(directories: &'a [PathBuf], path: &Path) -> Option<&'a Path> {
    directories
        .iter()
        .find(|dir| path.starts_with(dir))
        .map(PathBuf::as_path)
}
