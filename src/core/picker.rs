//! Filterable hunk list for jumping to a change.

use std::rc::Rc;

use super::{Editor, FocusTarget, FuzzyMatcher, Hunk, SelectionUi};

/// Shown by the host when the list has nothing to offer.
pub const EMPTY_MESSAGE: &str = "No diffs in file";

/// One row of the hunk list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerEntry {
    /// Hunk this entry jumps to.
    pub hunk: Hunk,
    /// Buffer row the cursor lands on.
    pub row: usize,
    /// Trimmed buffer text at `row`; the filter key.
    pub line_text: String,
    /// Range label, e.g. `-3,2 +3,4`.
    pub label: String,
}

impl PickerEntry {
    /// Build an entry from a hunk and the live buffer.
    pub fn new(hunk: Hunk, editor: &dyn Editor) -> Self {
        let row = entry_row(&hunk);
        let line_text = editor
            .line_text(row)
            .map(|line| line.trim().to_owned())
            .unwrap_or_default();
        Self {
            hunk,
            row,
            line_text,
            label: hunk.header(),
        }
    }
}

/// Buffer row a list entry refers to.
///
/// The row is `new_start` read as a 0-based row; a hunk anchored above the
/// first line (`new_start == 0`) maps to row 0.
pub fn entry_row(hunk: &Hunk) -> usize {
    if hunk.new_start == 0 {
        0
    } else {
        hunk.new_start as usize
    }
}

/// Modal hunk list, shared by every buffer and repointed on each open.
pub struct HunkPicker {
    ui: Rc<dyn SelectionUi>,
    editor: Option<Rc<dyn Editor>>,
    entries: Vec<PickerEntry>,
    query: String,
    /// Indices into `entries`, in display order.
    filtered: Vec<usize>,
    /// Index into `filtered`.
    selected: usize,
    visible: bool,
    previously_focused: Option<FocusTarget>,
    matcher: FuzzyMatcher,
}

impl std::fmt::Debug for HunkPicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HunkPicker")
            .field("visible", &self.visible)
            .field("entries", &self.entries.len())
            .field("query", &self.query)
            .field("selected", &self.selected)
            .finish()
    }
}

impl HunkPicker {
    /// Create a hidden picker drawing into `ui`.
    pub fn new(ui: Rc<dyn SelectionUi>) -> Self {
        Self {
            ui,
            editor: None,
            entries: Vec::new(),
            query: String::new(),
            filtered: Vec::new(),
            selected: 0,
            visible: false,
            previously_focused: None,
            matcher: FuzzyMatcher::new(),
        }
    }

    /// Whether the list is showing.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Buffer the list currently points at.
    pub fn editor(&self) -> Option<&Rc<dyn Editor>> {
        self.editor.as_ref()
    }

    /// All entries, in hunk order.
    pub fn entries(&self) -> &[PickerEntry] {
        &self.entries
    }

    /// Current filter text.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Entries passing the filter, in display order.
    pub fn visible_entries(&self) -> impl Iterator<Item = &PickerEntry> + '_ {
        self.filtered.iter().filter_map(|&i| self.entries.get(i))
    }

    /// Position of the highlighted entry within [`HunkPicker::visible_entries`].
    pub fn selected_index(&self) -> Option<usize> {
        (!self.filtered.is_empty()).then_some(self.selected)
    }

    /// Highlighted entry.
    pub fn selected_entry(&self) -> Option<&PickerEntry> {
        self.filtered
            .get(self.selected)
            .and_then(|&i| self.entries.get(i))
    }

    /// Close the list if open, otherwise open it for `editor`.
    ///
    /// Without an active buffer this does nothing.
    pub fn toggle(&mut self, editor: Option<Rc<dyn Editor>>, hunks: &[Hunk]) {
        if self.visible {
            self.cancel();
        } else if let Some(editor) = editor {
            self.open(editor, hunks);
        }
    }

    /// Rebuild the entries from `hunks` and show the list.
    pub fn open(&mut self, editor: Rc<dyn Editor>, hunks: &[Hunk]) {
        self.entries = hunks
            .iter()
            .map(|&hunk| PickerEntry::new(hunk, editor.as_ref()))
            .collect();
        self.editor = Some(editor);
        self.query.clear();
        self.refilter();

        self.previously_focused = self.ui.focused();
        self.visible = true;
        self.present();
    }

    /// Replace the filter text and refresh the list.
    pub fn set_query(&mut self, query: &str) {
        self.query.clear();
        self.query.push_str(query);
        self.refilter();
        self.present();
    }

    /// Highlight the next visible entry.
    pub fn select_next(&mut self) {
        if self.selected + 1 < self.filtered.len() {
            self.selected += 1;
            self.present();
        }
    }

    /// Highlight the previous visible entry.
    pub fn select_previous(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.present();
        }
    }

    /// Confirm the highlighted entry.
    pub fn confirm_selected(&mut self) -> bool {
        match self.selected_index() {
            Some(index) => self.confirm(index),
            None => false,
        }
    }

    /// Confirm the entry at `index` within the visible entries: close the
    /// list and put the cursor at the start of its row.
    pub fn confirm(&mut self, index: usize) -> bool {
        let Some(row) = self
            .filtered
            .get(index)
            .and_then(|&i| self.entries.get(i))
            .map(|entry| entry.row)
        else {
            return false;
        };

        self.cancel();
        if let Some(editor) = &self.editor {
            editor.set_cursor(row, 0, true);
        }
        true
    }

    /// Close the list and give focus back.
    pub fn cancel(&mut self) {
        if self.visible {
            self.ui.hide();
            self.visible = false;
        }
        if let Some(target) = self.previously_focused.take() {
            self.ui.restore_focus(target);
        }
    }

    /// Close the list and drop every entry.
    pub fn destroy(&mut self) {
        self.cancel();
        self.entries.clear();
        self.filtered.clear();
        self.query.clear();
        self.editor = None;
    }

    fn refilter(&mut self) {
        self.filtered = self.matcher.filter_sorted(
            &self.query,
            self.entries
                .iter()
                .enumerate()
                .map(|(i, e)| (i, e.line_text.as_str())),
        );
        self.selected = 0;
    }

    fn present(&self) {
        if !self.visible {
            return;
        }
        let shown: Vec<PickerEntry> = self.visible_entries().cloned().collect();
        self.ui
            .present(&shown, self.selected_index(), EMPTY_MESSAGE);
    }
}
