//! Process-wide state: one tracker per open buffer plus the shared hunk list.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use super::{
    BufferId, Config, DiffTracker, Editor, HunkPicker, Project, RepositoryProvider, Resolver,
    SelectionUi, Signal,
};

/// Commands exposed to the host's keymap and menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Jump to the next hunk.
    MoveToNextHunk,
    /// Jump to the previous hunk.
    MoveToPreviousHunk,
    /// Open or close the hunk list.
    ToggleHunkList,
}

impl Command {
    /// Every command, in menu order.
    pub const ALL: [Command; 3] = [
        Command::MoveToNextHunk,
        Command::MoveToPreviousHunk,
        Command::ToggleHunkList,
    ];

    /// Name the command is registered under.
    pub fn name(self) -> &'static str {
        match self {
            Self::MoveToNextHunk => "git-diff:move-to-next-diff",
            Self::MoveToPreviousHunk => "git-diff:move-to-previous-diff",
            Self::ToggleHunkList => "git-diff:toggle-diff-list",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown command name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown command: {0}")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| UnknownCommand(s.to_owned()))
    }
}

/// Activated gutter package state.
///
/// Created by [`GitGutter::activate`], torn down by
/// [`GitGutter::deactivate`]. The host calls [`GitGutter::poll`] from its
/// event loop to apply repository lookups and queued notifications.
pub struct GitGutter {
    // Trackers hold resolver handles; they must drop before the resolver joins.
    trackers: HashMap<BufferId, DiffTracker>,
    picker: Option<HunkPicker>,
    ui: Rc<dyn SelectionUi>,
    config: Arc<Config>,
    project: Arc<Project>,
    signal_tx: Sender<Signal>,
    signal_rx: Receiver<Signal>,
    resolver: Resolver,
}

impl fmt::Debug for GitGutter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitGutter")
            .field("trackers", &self.trackers.len())
            .field("picker", &self.picker)
            .field("resolver", &self.resolver)
            .finish()
    }
}

impl GitGutter {
    /// Activate: start the resolver with no trackers and no picker.
    pub fn activate(
        config: Arc<Config>,
        project: Arc<Project>,
        provider: Arc<dyn RepositoryProvider>,
        ui: Rc<dyn SelectionUi>,
    ) -> Self {
        let (signal_tx, signal_rx) = mpsc::channel();
        tracing::info!("gitgutter activated");
        Self {
            trackers: HashMap::new(),
            picker: None,
            ui,
            config,
            project,
            signal_tx,
            signal_rx,
            resolver: Resolver::spawn(provider),
        }
    }

    /// Start tracking an open buffer. Buffers already tracked are left alone.
    pub fn observe_editor(&mut self, editor: Rc<dyn Editor>) -> BufferId {
        let id = editor.id();
        if !self.trackers.contains_key(&id) {
            let tracker = DiffTracker::new(
                editor,
                Arc::clone(&self.config),
                Arc::clone(&self.project),
                self.resolver.handle(),
                self.signal_tx.clone(),
            );
            self.trackers.insert(id, tracker);
        }
        id
    }

    /// Tracker for a buffer.
    pub fn tracker(&self, id: BufferId) -> Option<&DiffTracker> {
        self.trackers.get(&id)
    }

    /// Mutable tracker for a buffer.
    pub fn tracker_mut(&mut self, id: BufferId) -> Option<&mut DiffTracker> {
        self.trackers.get_mut(&id)
    }

    /// Number of live trackers.
    pub fn tracker_count(&self) -> usize {
        self.trackers.len()
    }

    /// The shared hunk list, once it has been opened at least once.
    pub fn picker(&self) -> Option<&HunkPicker> {
        self.picker.as_ref()
    }

    /// Mutable access to the hunk list, for the host's confirm/cancel/filter calls.
    pub fn picker_mut(&mut self) -> Option<&mut HunkPicker> {
        self.picker.as_mut()
    }

    /// Live configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Open project.
    pub fn project(&self) -> &Arc<Project> {
        &self.project
    }

    /// Apply finished repository lookups and queued notifications.
    ///
    /// Returns whether anything was processed.
    pub fn poll(&mut self) -> bool {
        let mut processed = false;

        while let Some(response) = self.resolver.try_recv() {
            processed = true;
            match self.trackers.get_mut(&response.buffer) {
                Some(tracker) => {
                    tracker.finish_bind(response.id, response.repository);
                }
                None => tracing::trace!(
                    buffer = response.buffer.0,
                    "dropping lookup for untracked buffer"
                ),
            }
        }

        while let Ok(signal) = self.signal_rx.try_recv() {
            processed = true;
            let Some(tracker) = self.trackers.get_mut(&signal.buffer) else {
                continue;
            };
            tracker.handle(&signal.kind);
            if tracker.is_destroyed() {
                self.forget(signal.buffer);
            }
        }

        processed
    }

    /// Run a command against the active buffer.
    ///
    /// Returns whether the command did anything.
    pub fn dispatch(&mut self, command: Command, active: Option<BufferId>) -> bool {
        tracing::debug!(%command, buffer = ?active, "dispatch");
        match command {
            Command::MoveToNextHunk => active
                .and_then(|id| self.trackers.get(&id))
                .is_some_and(DiffTracker::move_to_next_hunk),
            Command::MoveToPreviousHunk => active
                .and_then(|id| self.trackers.get(&id))
                .is_some_and(DiffTracker::move_to_previous_hunk),
            Command::ToggleHunkList => {
                let picker = self
                    .picker
                    .get_or_insert_with(|| HunkPicker::new(Rc::clone(&self.ui)));
                if picker.is_visible() {
                    picker.cancel();
                    return true;
                }
                let Some(tracker) = active.and_then(|id| self.trackers.get(&id)) else {
                    return false;
                };
                picker.toggle(Some(Rc::clone(tracker.editor())), tracker.hunks());
                true
            }
        }
    }

    /// Tear down the tracker of a closed buffer.
    pub fn close_editor(&mut self, id: BufferId) {
        if let Some(mut tracker) = self.trackers.remove(&id) {
            tracker.teardown();
        }
        self.forget(id);
    }

    fn forget(&mut self, id: BufferId) {
        self.trackers.remove(&id);
        if let Some(picker) = &mut self.picker {
            if picker.editor().is_some_and(|e| e.id() == id) {
                picker.destroy();
            }
        }
    }

    /// Deactivate: destroy the picker, tear down every tracker and stop the
    /// resolver.
    pub fn deactivate(mut self) {
        if let Some(mut picker) = self.picker.take() {
            picker.destroy();
        }
        for (_, mut tracker) in self.trackers.drain() {
            tracker.teardown();
        }
        self.resolver.shutdown();
        tracing::info!("gitgutter deactivated");
    }
}
