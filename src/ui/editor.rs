//! In-terminal implementations of the host contracts.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::{
    BufferId, DecorationClass, Editor, EditorEvent, EventHub, FocusTarget, MarkerId, PickerEntry,
    RowRange, SelectionUi, TextBuffer,
};

/// Focus token for the text view.
pub const EDITOR_FOCUS: FocusTarget = FocusTarget(1);
/// Focus token for the hunk list.
pub const LIST_FOCUS: FocusTarget = FocusTarget(2);

#[derive(Debug, Default)]
struct EditorState {
    buffer: TextBuffer,
    cursor_row: usize,
    cursor_col: usize,
    /// Set by an autoscrolling cursor move, consumed by the renderer.
    scroll_request: bool,
    markers: BTreeMap<MarkerId, (RowRange, DecorationClass)>,
    next_marker: u64,
    gutter_icons: bool,
    destroyed: bool,
}

/// A read-only file view that reloads from disk.
pub struct TerminalEditor {
    id: BufferId,
    path: RefCell<Option<PathBuf>>,
    state: RefCell<EditorState>,
    events: EventHub<EditorEvent>,
}

impl std::fmt::Debug for TerminalEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("TerminalEditor")
            .field("id", &self.id)
            .field("path", &self.path.borrow())
            .field("lines", &state.buffer.line_count())
            .field("markers", &state.markers.len())
            .finish()
    }
}

impl TerminalEditor {
    /// Open `path` from disk.
    pub fn open(id: BufferId, path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::with_buffer(
            id,
            Some(path.to_path_buf()),
            TextBuffer::from_bytes(&bytes),
        ))
    }

    /// View over in-memory text.
    pub fn from_text(id: BufferId, path: Option<PathBuf>, text: &str) -> Self {
        Self::with_buffer(id, path, TextBuffer::new(text))
    }

    fn with_buffer(id: BufferId, path: Option<PathBuf>, buffer: TextBuffer) -> Self {
        Self {
            id,
            path: RefCell::new(path),
            state: RefCell::new(EditorState {
                buffer,
                next_marker: 1,
                ..EditorState::default()
            }),
            events: EventHub::new(),
        }
    }

    /// Re-read the file. Emits [`EditorEvent::TextSettled`] when the text changed.
    pub fn reload(&self) -> std::io::Result<bool> {
        let Some(path) = self.path() else {
            return Ok(false);
        };
        let bytes = std::fs::read(&path)?;
        let buffer = TextBuffer::from_bytes(&bytes);
        Ok(self.replace_text(buffer))
    }

    /// Swap in new text, keeping the cursor inside it.
    pub fn set_text(&self, text: &str) -> bool {
        self.replace_text(TextBuffer::new(text))
    }

    fn replace_text(&self, buffer: TextBuffer) -> bool {
        {
            let mut state = self.state.borrow_mut();
            if state.destroyed || state.buffer.as_str() == buffer.as_str() {
                return false;
            }
            let last = buffer.line_count().saturating_sub(1);
            state.cursor_row = state.cursor_row.min(last);
            state.cursor_col = 0;
            state.buffer = buffer;
        }
        self.events.emit(&EditorEvent::TextSettled);
        true
    }

    /// Point the buffer at another file.
    pub fn set_path(&self, path: Option<PathBuf>) {
        *self.path.borrow_mut() = path;
        self.events.emit(&EditorEvent::PathChanged);
    }

    /// Close the buffer.
    pub fn destroy(&self) {
        {
            let mut state = self.state.borrow_mut();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
        }
        self.events.emit(&EditorEvent::Destroyed);
    }

    /// Snapshot of the text.
    pub fn buffer(&self) -> TextBuffer {
        self.state.borrow().buffer.clone()
    }

    /// Number of rows.
    pub fn line_count(&self) -> usize {
        self.state.borrow().buffer.line_count()
    }

    /// Cursor `(row, column)`.
    pub fn cursor(&self) -> (usize, usize) {
        let state = self.state.borrow();
        (state.cursor_row, state.cursor_col)
    }

    /// Move the cursor up or down, clamped to the buffer.
    pub fn move_cursor_by(&self, delta: isize) {
        let mut state = self.state.borrow_mut();
        let last = state.buffer.line_count().saturating_sub(1);
        let row = state.cursor_row.saturating_add_signed(delta).min(last);
        state.cursor_row = row;
        state.cursor_col = 0;
    }

    /// Take the pending autoscroll request.
    pub fn take_scroll_request(&self) -> bool {
        std::mem::take(&mut self.state.borrow_mut().scroll_request)
    }

    /// Decoration covering `row`. The oldest marker wins on overlap.
    pub fn row_class(&self, row: usize) -> Option<DecorationClass> {
        self.state
            .borrow()
            .markers
            .values()
            .find(|(rows, _)| rows.contains(row))
            .map(|&(_, class)| class)
    }

    /// Number of installed markers.
    pub fn marker_count(&self) -> usize {
        self.state.borrow().markers.len()
    }

    /// Whether gutter icons are on.
    pub fn gutter_icons(&self) -> bool {
        self.state.borrow().gutter_icons
    }
}

impl Editor for TerminalEditor {
    fn id(&self) -> BufferId {
        self.id
    }

    fn path(&self) -> Option<PathBuf> {
        self.path.borrow().clone()
    }

    fn text(&self) -> String {
        self.state.borrow().buffer.as_str().to_owned()
    }

    fn char_len(&self) -> usize {
        self.state.borrow().buffer.char_len()
    }

    fn line_text(&self, row: usize) -> Option<String> {
        self.state.borrow().buffer.line(row).map(str::to_owned)
    }

    fn cursor_row(&self) -> usize {
        self.state.borrow().cursor_row
    }

    fn set_cursor(&self, row: usize, column: usize, autoscroll: bool) {
        let mut state = self.state.borrow_mut();
        let last = state.buffer.line_count().saturating_sub(1);
        state.cursor_row = row.min(last);
        state.cursor_col = column;
        state.scroll_request |= autoscroll;
    }

    fn mark_rows(&self, rows: RowRange, class: DecorationClass) -> MarkerId {
        let mut state = self.state.borrow_mut();
        let id = MarkerId(state.next_marker);
        state.next_marker += 1;
        state.markers.insert(id, (rows, class));
        id
    }

    fn remove_marker(&self, marker: MarkerId) {
        self.state.borrow_mut().markers.remove(&marker);
    }

    fn set_gutter_icons(&self, enabled: bool) {
        self.state.borrow_mut().gutter_icons = enabled;
    }

    fn is_destroyed(&self) -> bool {
        self.state.borrow().destroyed
    }

    fn events(&self) -> &EventHub<EditorEvent> {
        &self.events
    }
}

/// What the hunk list overlay should draw.
#[derive(Debug, Clone, Default)]
pub struct ListView {
    /// Entries in display order.
    pub entries: Vec<PickerEntry>,
    /// Highlighted position in `entries`.
    pub selected: Option<usize>,
    /// Text shown when `entries` is empty.
    pub empty_message: String,
}

/// Hunk list overlay state, filled in by the picker.
#[derive(Debug)]
pub struct ListUi {
    view: RefCell<Option<ListView>>,
    focus: Cell<FocusTarget>,
}

impl Default for ListUi {
    fn default() -> Self {
        Self {
            view: RefCell::new(None),
            focus: Cell::new(EDITOR_FOCUS),
        }
    }
}

impl ListUi {
    /// Hidden list; the text view has focus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current overlay contents, `None` when hidden.
    pub fn view(&self) -> Option<ListView> {
        self.view.borrow().clone()
    }

    /// Whether the overlay is showing.
    pub fn is_visible(&self) -> bool {
        self.view.borrow().is_some()
    }

    /// Who has keyboard focus.
    pub fn focus(&self) -> FocusTarget {
        self.focus.get()
    }
}

impl SelectionUi for ListUi {
    fn present(&self, entries: &[PickerEntry], selected: Option<usize>, empty_message: &str) {
        *self.view.borrow_mut() = Some(ListView {
            entries: entries.to_vec(),
            selected,
            empty_message: empty_message.to_owned(),
        });
        self.focus.set(LIST_FOCUS);
    }

    fn hide(&self) {
        *self.view.borrow_mut() = None;
    }

    fn focused(&self) -> Option<FocusTarget> {
        Some(self.focus.get())
    }

    fn restore_focus(&self, target: FocusTarget) {
        self.focus.set(target);
    }
}
