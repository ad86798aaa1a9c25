//! Fakes shared by the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use gitgutter::core::{
    BufferId, Config, DecorationClass, Editor, EditorEvent, EventHub, FocusTarget, GitGutter,
    Hunk, MarkerId, PickerEntry, Project, Repository, RepositoryEvent, RepositoryProvider,
    RowRange, SelectionUi, Settings, SharedRepository, TextBuffer,
};

pub const ROOT: &str = "/work";

/// Editor double recording every call the core makes.
pub struct FakeEditor {
    id: BufferId,
    path: RefCell<Option<PathBuf>>,
    buffer: RefCell<TextBuffer>,
    cursor_row: RefCell<usize>,
    pub cursor_moves: RefCell<Vec<(usize, usize, bool)>>,
    markers: RefCell<BTreeMap<MarkerId, (RowRange, DecorationClass)>>,
    next_marker: RefCell<u64>,
    pub gutter_icons: RefCell<Option<bool>>,
    destroyed: RefCell<bool>,
    events: EventHub<EditorEvent>,
}

impl FakeEditor {
    pub fn new(id: u64, path: Option<&str>, text: &str) -> Rc<Self> {
        Rc::new(Self {
            id: BufferId(id),
            path: RefCell::new(path.map(PathBuf::from)),
            buffer: RefCell::new(TextBuffer::new(text)),
            cursor_row: RefCell::new(0),
            cursor_moves: RefCell::new(Vec::new()),
            markers: RefCell::new(BTreeMap::new()),
            next_marker: RefCell::new(1),
            gutter_icons: RefCell::new(None),
            destroyed: RefCell::new(false),
            events: EventHub::new(),
        })
    }

    /// A file under [`ROOT`] with `lines` numbered lines.
    pub fn numbered(id: u64, name: &str, lines: usize) -> Rc<Self> {
        let text: String = (1..=lines).map(|i| format!("  line {i}\n")).collect();
        Self::new(id, Some(&format!("{ROOT}/{name}")), &text)
    }

    pub fn set_text(&self, text: &str) {
        *self.buffer.borrow_mut() = TextBuffer::new(text);
        self.events.emit(&EditorEvent::TextSettled);
    }

    pub fn set_path(&self, path: Option<&str>) {
        *self.path.borrow_mut() = path.map(PathBuf::from);
        self.events.emit(&EditorEvent::PathChanged);
    }

    pub fn place_cursor(&self, row: usize) {
        *self.cursor_row.borrow_mut() = row;
    }

    pub fn destroy(&self) {
        *self.destroyed.borrow_mut() = true;
        self.events.emit(&EditorEvent::Destroyed);
    }

    pub fn markers(&self) -> Vec<(RowRange, DecorationClass)> {
        self.markers.borrow().values().copied().collect()
    }

    pub fn last_cursor_move(&self) -> Option<(usize, usize, bool)> {
        self.cursor_moves.borrow().last().copied()
    }
}

impl Editor for FakeEditor {
    fn id(&self) -> BufferId {
        self.id
    }

    fn path(&self) -> Option<PathBuf> {
        self.path.borrow().clone()
    }

    fn text(&self) -> String {
        self.buffer.borrow().as_str().to_owned()
    }

    fn char_len(&self) -> usize {
        self.buffer.borrow().char_len()
    }

    fn line_text(&self, row: usize) -> Option<String> {
        self.buffer.borrow().line(row).map(str::to_owned)
    }

    fn cursor_row(&self) -> usize {
        *self.cursor_row.borrow()
    }

    fn set_cursor(&self, row: usize, column: usize, autoscroll: bool) {
        *self.cursor_row.borrow_mut() = row;
        self.cursor_moves.borrow_mut().push((row, column, autoscroll));
    }

    fn mark_rows(&self, rows: RowRange, class: DecorationClass) -> MarkerId {
        let mut next = self.next_marker.borrow_mut();
        let id = MarkerId(*next);
        *next += 1;
        self.markers.borrow_mut().insert(id, (rows, class));
        id
    }

    fn remove_marker(&self, marker: MarkerId) {
        self.markers.borrow_mut().remove(&marker);
    }

    fn set_gutter_icons(&self, enabled: bool) {
        *self.gutter_icons.borrow_mut() = Some(enabled);
    }

    fn is_destroyed(&self) -> bool {
        *self.destroyed.borrow()
    }

    fn events(&self) -> &EventHub<EditorEvent> {
        &self.events
    }
}

/// Repository double returning a fixed hunk list.
pub struct FakeRepository {
    root: PathBuf,
    hunks: Mutex<Vec<Hunk>>,
    pub diff_calls: AtomicUsize,
    events: EventHub<RepositoryEvent>,
}

impl FakeRepository {
    pub fn new(hunks: Vec<Hunk>) -> Arc<Self> {
        Arc::new(Self {
            root: PathBuf::from(ROOT),
            hunks: Mutex::new(hunks),
            diff_calls: AtomicUsize::new(0),
            events: EventHub::new(),
        })
    }

    pub fn set_hunks(&self, hunks: Vec<Hunk>) {
        *self.hunks.lock().unwrap() = hunks;
    }

    pub fn calls(&self) -> usize {
        self.diff_calls.load(Ordering::SeqCst)
    }

    pub fn emit(&self, event: RepositoryEvent) {
        self.events.emit(&event);
    }

    pub fn listener_count(&self) -> usize {
        self.events.listener_count()
    }
}

impl Repository for FakeRepository {
    fn workdir(&self) -> &Path {
        &self.root
    }

    fn line_diffs(&self, _path: &Path, _text: &str) -> Option<Vec<Hunk>> {
        self.diff_calls.fetch_add(1, Ordering::SeqCst);
        Some(self.hunks.lock().unwrap().clone())
    }

    fn events(&self) -> &EventHub<RepositoryEvent> {
        &self.events
    }
}

/// Provider answering with one repository, optionally held back until released.
pub struct FakeProvider {
    repository: Option<Arc<FakeRepository>>,
    gate: Option<(Mutex<bool>, Condvar)>,
    pub lookups: AtomicUsize,
}

impl FakeProvider {
    /// Answers immediately.
    pub fn with(repository: Option<Arc<FakeRepository>>) -> Arc<Self> {
        Arc::new(Self {
            repository,
            gate: None,
            lookups: AtomicUsize::new(0),
        })
    }

    /// Blocks every lookup until [`FakeProvider::release`].
    pub fn gated(repository: Option<Arc<FakeRepository>>) -> Arc<Self> {
        Arc::new(Self {
            repository,
            gate: Some((Mutex::new(false), Condvar::new())),
            lookups: AtomicUsize::new(0),
        })
    }

    pub fn release(&self) {
        if let Some((open, cvar)) = &self.gate {
            *open.lock().unwrap() = true;
            cvar.notify_all();
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl RepositoryProvider for FakeProvider {
    fn repository_for_directory(&self, _directory: &Path) -> Option<SharedRepository> {
        if let Some((open, cvar)) = &self.gate {
            let mut open = open.lock().unwrap();
            while !*open {
                open = cvar.wait(open).unwrap();
            }
        }
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.repository
            .as_ref()
            .map(|repo| Arc::clone(repo) as SharedRepository)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCall {
    Present {
        entries: Vec<PickerEntry>,
        selected: Option<usize>,
        empty_message: String,
    },
    Hide,
    RestoreFocus(FocusTarget),
}

pub const PREVIOUS_FOCUS: FocusTarget = FocusTarget(7);

/// Selection list double recording what the picker asked for.
#[derive(Default)]
pub struct RecordingUi {
    pub calls: RefCell<Vec<UiCall>>,
}

impl RecordingUi {
    pub fn last_present(&self) -> Option<(Vec<PickerEntry>, Option<usize>, String)> {
        self.calls.borrow().iter().rev().find_map(|call| match call {
            UiCall::Present {
                entries,
                selected,
                empty_message,
            } => Some((entries.clone(), *selected, empty_message.clone())),
            _ => None,
        })
    }
}

impl SelectionUi for RecordingUi {
    fn present(&self, entries: &[PickerEntry], selected: Option<usize>, empty_message: &str) {
        self.calls.borrow_mut().push(UiCall::Present {
            entries: entries.to_vec(),
            selected,
            empty_message: empty_message.to_owned(),
        });
    }

    fn hide(&self) {
        self.calls.borrow_mut().push(UiCall::Hide);
    }

    fn focused(&self) -> Option<FocusTarget> {
        Some(PREVIOUS_FOCUS)
    }

    fn restore_focus(&self, target: FocusTarget) {
        self.calls.borrow_mut().push(UiCall::RestoreFocus(target));
    }
}

/// An activated package wired to the fakes.
pub struct Harness {
    pub gutter: GitGutter,
    pub config: Arc<Config>,
    pub project: Arc<Project>,
    pub ui: Rc<RecordingUi>,
}

impl Harness {
    pub fn new(provider: Arc<FakeProvider>) -> Self {
        Self::with_settings(provider, Settings::default())
    }

    pub fn with_settings(provider: Arc<FakeProvider>, settings: Settings) -> Self {
        gitgutter::log::test();
        let config = Arc::new(Config::new(settings));
        let project = Arc::new(Project::new(vec![PathBuf::from(ROOT)]));
        let ui = Rc::new(RecordingUi::default());
        let gutter = GitGutter::activate(
            Arc::clone(&config),
            Arc::clone(&project),
            provider,
            Rc::clone(&ui) as Rc<dyn SelectionUi>,
        );
        Self {
            gutter,
            config,
            project,
            ui,
        }
    }

    /// Track `editor` and wait for its repository lookup.
    pub fn observe(&mut self, editor: &Rc<FakeEditor>) -> BufferId {
        let id = self.gutter.observe_editor(Rc::clone(editor) as Rc<dyn Editor>);
        self.settle(id);
        id
    }

    /// Poll until `id` has no lookup in flight.
    pub fn settle(&mut self, id: BufferId) {
        let gutter = &mut self.gutter;
        let done = wait_until(gutter, |g| {
            g.tracker(id).map_or(true, |t| t.pending_bind().is_none())
        });
        assert!(done, "repository lookup did not finish");
    }
}

/// Poll `gutter` until `cond` holds, for up to five seconds.
pub fn wait_until(gutter: &mut GitGutter, cond: impl Fn(&GitGutter) -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        gutter.poll();
        if cond(gutter) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
}
