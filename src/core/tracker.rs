//! Per-buffer diff tracking: repository binding, decorations and navigation.

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::mpsc::Sender;
use std::sync::Arc;

use super::{
    classify, first_non_whitespace_column, BufferId, Config, ConfigEvent, Decoration, Editor,
    EditorEvent, Hunk, MarkerId, Project, ProjectEvent, RepositoryEvent, ResolveRequest,
    ResolverHandle, SharedRepository, SubscriptionGroup,
};

/// Buffers at or above this many characters are never diffed (2 MiB).
pub const MAX_BUFFER_LENGTH_TO_DIFF: usize = 2 * 1024 * 1024;

/// A notification queued for one tracker, handled on the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    /// Buffer the signal is for.
    pub buffer: BufferId,
    /// What happened.
    pub kind: SignalKind,
}

/// What a [`Signal`] reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalKind {
    /// Buffer text settled.
    TextSettled,
    /// Buffer path changed.
    PathChanged,
    /// Buffer closed.
    EditorDestroyed,
    /// Project root directories changed.
    ProjectPathsChanged,
    /// A gutter-related setting changed.
    ConfigChanged,
    /// Repository statuses refreshed.
    StatusesChanged,
    /// Status of one file changed.
    StatusChanged(PathBuf),
}

/// Repository association of a tracker.
#[derive(Clone, Default)]
pub enum BindState {
    /// No lookup has completed yet.
    #[default]
    Uninitialized,
    /// Lookup completed; `None` means the buffer has no repository.
    Bound(Option<SharedRepository>),
}

impl std::fmt::Debug for BindState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("Uninitialized"),
            Self::Bound(Some(repo)) => f
                .debug_tuple("Bound")
                .field(&repo.workdir().display())
                .finish(),
            Self::Bound(None) => f.write_str("Bound(None)"),
        }
    }
}

/// A decoration installed in the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstalledDecoration {
    /// What was decorated.
    pub decoration: Decoration,
    /// Editor marker backing it.
    pub marker: MarkerId,
}

/// Tracks git changes for one open buffer.
pub struct DiffTracker {
    editor: Rc<dyn Editor>,
    config: Arc<Config>,
    project: Arc<Project>,
    resolver: Option<ResolverHandle>,
    signals: Sender<Signal>,

    state: BindState,
    pending_bind: Option<u64>,
    next_bind_id: u64,

    hunks: Vec<Hunk>,
    decorations: Vec<InstalledDecoration>,

    /// Editor, project and config listeners. Live for the tracker's lifetime.
    subscriptions: SubscriptionGroup,
    /// Repository listeners. Replaced on every bind.
    repo_subscriptions: SubscriptionGroup,
    destroyed: bool,
}

impl std::fmt::Debug for DiffTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiffTracker")
            .field("buffer", &self.editor.id())
            .field("state", &self.state)
            .field("pending_bind", &self.pending_bind)
            .field("hunks", &self.hunks.len())
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

impl DiffTracker {
    /// Create a tracker, subscribe it to its notification sources and start
    /// the first repository lookup.
    ///
    /// Notifications are not handled inline: they are queued on `signals` and
    /// fed back through [`DiffTracker::handle`].
    pub fn new(
        editor: Rc<dyn Editor>,
        config: Arc<Config>,
        project: Arc<Project>,
        resolver: Option<ResolverHandle>,
        signals: Sender<Signal>,
    ) -> Self {
        let buffer = editor.id();
        let mut subscriptions = SubscriptionGroup::new();

        let tx = signals.clone();
        subscriptions.add(editor.events().subscribe(move |event| {
            let kind = match event {
                EditorEvent::TextSettled => SignalKind::TextSettled,
                EditorEvent::PathChanged => SignalKind::PathChanged,
                EditorEvent::Destroyed => SignalKind::EditorDestroyed,
            };
            let _ = tx.send(Signal { buffer, kind });
        }));

        let tx = signals.clone();
        subscriptions.add(project.events().subscribe(move |event| match event {
            ProjectEvent::PathsChanged => {
                let _ = tx.send(Signal {
                    buffer,
                    kind: SignalKind::ProjectPathsChanged,
                });
            }
        }));

        let tx = signals.clone();
        subscriptions.add(config.events().subscribe(move |event| {
            if matches!(
                event,
                ConfigEvent::ShowIconsChanged | ConfigEvent::ShowLineNumbersChanged
            ) {
                let _ = tx.send(Signal {
                    buffer,
                    kind: SignalKind::ConfigChanged,
                });
            }
        }));

        let mut tracker = Self {
            editor,
            config,
            project,
            resolver,
            signals,
            state: BindState::Uninitialized,
            pending_bind: None,
            next_bind_id: 1,
            hunks: Vec::new(),
            decorations: Vec::new(),
            subscriptions,
            repo_subscriptions: SubscriptionGroup::new(),
            destroyed: false,
        };
        tracker.bind_repository();
        tracker
    }

    /// Buffer this tracker belongs to.
    pub fn buffer(&self) -> BufferId {
        self.editor.id()
    }

    /// The tracked editor.
    pub fn editor(&self) -> &Rc<dyn Editor> {
        &self.editor
    }

    /// Current repository association.
    pub fn state(&self) -> &BindState {
        &self.state
    }

    /// Repository the buffer is bound to, if any.
    pub fn repository(&self) -> Option<&SharedRepository> {
        match &self.state {
            BindState::Bound(repo) => repo.as_ref(),
            BindState::Uninitialized => None,
        }
    }

    /// Id of the lookup still in flight, if any.
    pub fn pending_bind(&self) -> Option<u64> {
        self.pending_bind
    }

    /// Hunks from the last recompute, sorted by `new_start`.
    pub fn hunks(&self) -> &[Hunk] {
        &self.hunks
    }

    /// Decorations currently installed.
    pub fn decorations(&self) -> &[InstalledDecoration] {
        &self.decorations
    }

    /// Whether [`DiffTracker::teardown`] has run.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Start resolving the repository that owns the buffer.
    ///
    /// The previous repository subscriptions are cancelled first; any lookup
    /// still in flight is superseded. Returns the new request id. The answer
    /// is applied through [`DiffTracker::finish_bind`].
    pub fn bind_repository(&mut self) -> u64 {
        self.repo_subscriptions.cancel_all();

        let id = self.next_bind_id;
        self.next_bind_id = self.next_bind_id.wrapping_add(1);
        self.pending_bind = Some(id);

        let request = ResolveRequest {
            id,
            buffer: self.buffer(),
            path: self.editor.path(),
            directories: self.project.directories(),
        };

        tracing::debug!(buffer = request.buffer.0, id, "binding repository");

        let submitted = self
            .resolver
            .as_ref()
            .is_some_and(|resolver| resolver.submit(request));
        if !submitted {
            tracing::warn!(buffer = self.buffer().0, "resolver unavailable, treating buffer as untracked");
            self.finish_bind(id, None);
        }
        id
    }

    /// Apply a finished repository lookup.
    ///
    /// Answers for superseded requests, or arriving after the buffer closed,
    /// are discarded and false is returned.
    pub fn finish_bind(&mut self, id: u64, repository: Option<SharedRepository>) -> bool {
        if self.destroyed || self.editor.is_destroyed() {
            tracing::trace!(buffer = self.buffer().0, id, "dropping lookup for closed buffer");
            return false;
        }
        if self.pending_bind != Some(id) {
            tracing::trace!(
                buffer = self.buffer().0,
                id,
                pending = ?self.pending_bind,
                "dropping superseded lookup"
            );
            return false;
        }
        self.pending_bind = None;
        self.repo_subscriptions.cancel_all();

        if let Some(repo) = &repository {
            let buffer = self.buffer();
            let tx = self.signals.clone();
            self.repo_subscriptions
                .add(repo.events().subscribe(move |event| {
                    let kind = match event {
                        RepositoryEvent::StatusesChanged => SignalKind::StatusesChanged,
                        RepositoryEvent::StatusChanged(path) => {
                            SignalKind::StatusChanged(path.clone())
                        }
                    };
                    let _ = tx.send(Signal { buffer, kind });
                }));
        }

        self.state = BindState::Bound(repository);
        tracing::debug!(buffer = self.buffer().0, state = ?self.state, "repository bound");

        self.update_gutter_icons();
        self.recompute();
        true
    }

    /// React to a queued notification.
    pub fn handle(&mut self, kind: &SignalKind) {
        if self.destroyed {
            return;
        }
        match kind {
            SignalKind::TextSettled | SignalKind::PathChanged | SignalKind::StatusesChanged => {
                self.recompute();
            }
            SignalKind::StatusChanged(path) => {
                if self
                    .editor
                    .path()
                    .is_some_and(|own| same_file(&own, path))
                {
                    self.recompute();
                }
            }
            SignalKind::ProjectPathsChanged => {
                self.bind_repository();
            }
            SignalKind::ConfigChanged => self.update_gutter_icons(),
            SignalKind::EditorDestroyed => self.teardown(),
        }
    }

    /// Hunks for the buffer as it is now. Empty when unbound, path-less or
    /// oversized.
    pub fn fresh_hunks(&self) -> Vec<Hunk> {
        let Some(repo) = self.repository() else {
            return Vec::new();
        };
        let len = self.editor.char_len();
        if len >= MAX_BUFFER_LENGTH_TO_DIFF {
            tracing::debug!(buffer = self.buffer().0, len, "buffer too large to diff");
            return Vec::new();
        }
        let Some(path) = self.editor.path() else {
            return Vec::new();
        };

        let mut hunks = repo
            .line_diffs(&path, &self.editor.text())
            .unwrap_or_default();
        hunks.sort_by_key(|h| h.new_start);
        hunks
    }

    /// Recompute hunks and replace every decoration.
    pub fn recompute(&mut self) {
        if self.destroyed || self.editor.is_destroyed() {
            return;
        }
        let _timer = crate::metrics::Timer::start("recompute");

        self.remove_decorations();
        self.hunks = self.fresh_hunks();

        for hunk in &self.hunks {
            let decoration = classify(hunk);
            let marker = self.editor.mark_rows(decoration.rows, decoration.class);
            self.decorations.push(InstalledDecoration { decoration, marker });
        }

        tracing::debug!(
            buffer = self.buffer().0,
            hunks = self.hunks.len(),
            "decorations updated"
        );
    }

    /// Remove every installed decoration. No-op when there are none.
    pub fn remove_decorations(&mut self) {
        for installed in self.decorations.drain(..) {
            self.editor.remove_marker(installed.marker);
        }
    }

    /// Push the gutter-icon flag to the editor.
    pub fn update_gutter_icons(&self) {
        if self.destroyed {
            return;
        }
        self.editor
            .set_gutter_icons(self.config.get().gutter_icons_enabled());
    }

    /// First hunk below `cursor_row`, wrapping to the first hunk if allowed.
    pub fn next_hunk_from(&self, cursor_row: usize, wrap: bool) -> Option<&Hunk> {
        next_hunk(&self.hunks, cursor_row, wrap)
    }

    /// Nearest hunk above `cursor_row`, wrapping to the last hunk if allowed.
    pub fn previous_hunk_from(&self, cursor_row: usize, wrap: bool) -> Option<&Hunk> {
        previous_hunk(&self.hunks, cursor_row, wrap)
    }

    /// Move the cursor to the next hunk. Returns whether it moved.
    pub fn move_to_next_hunk(&self) -> bool {
        let wrap = self.config.get().wrap_around_on_move_to_diff;
        let target = self
            .next_hunk_from(self.editor.cursor_row(), wrap)
            .map(Hunk::target_row);
        self.move_cursor_to(target)
    }

    /// Move the cursor to the previous hunk. Returns whether it moved.
    pub fn move_to_previous_hunk(&self) -> bool {
        let wrap = self.config.get().wrap_around_on_move_to_diff;
        let target = self
            .previous_hunk_from(self.editor.cursor_row(), wrap)
            .map(Hunk::target_row);
        self.move_cursor_to(target)
    }

    /// Put the cursor on the first non-whitespace character of `target`.
    pub fn move_cursor_to(&self, target: Option<usize>) -> bool {
        let Some(row) = target else {
            return false;
        };
        let column = self
            .editor
            .line_text(row)
            .map_or(0, |line| first_non_whitespace_column(&line));
        self.editor.set_cursor(row, column, true);
        true
    }

    /// Remove decorations, cancel every subscription and stop accepting
    /// lookups. Idempotent.
    pub fn teardown(&mut self) {
        if self.destroyed {
            return;
        }
        self.remove_decorations();
        self.hunks.clear();
        self.subscriptions.cancel_all();
        self.repo_subscriptions.cancel_all();
        self.pending_bind = None;
        self.resolver = None;
        self.destroyed = true;
        tracing::debug!(buffer = self.buffer().0, "tracker torn down");
    }
}

impl Drop for DiffTracker {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// First hunk starting below the cursor line.
///
/// Hunk starts are 1-based while `cursor_row` is 0-based. With `wrap`, falls
/// back to the first hunk. `hunks` must be sorted by `new_start`.
pub fn next_hunk(hunks: &[Hunk], cursor_row: usize, wrap: bool) -> Option<&Hunk> {
    let line = cursor_row + 1;
    let idx = hunks.partition_point(|h| h.new_start as usize <= line);
    hunks
        .get(idx)
        .or_else(|| if wrap { hunks.first() } else { None })
}

/// Nearest hunk starting above the cursor line.
///
/// With `wrap`, falls back to the last hunk. `hunks` must be sorted by
/// `new_start`.
pub fn previous_hunk(hunks: &[Hunk], cursor_row: usize, wrap: bool) -> Option<&Hunk> {
    let line = cursor_row + 1;
    let idx = hunks.partition_point(|h| (h.new_start as usize) < line);
    idx.checked_sub(1)
        .and_then(|i| hunks.get(i))
        .or_else(|| if wrap { hunks.last() } else { None })
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hunks_at(starts: &[u32]) -> Vec<Hunk> {
        starts.iter().map(|&s| Hunk::new(s, 1, s, 1)).collect()
    }

    #[test]
    fn next_skips_hunks_at_or_above_cursor() {
        let hunks = hunks_at(&[2, 5, 20]);
        assert_eq!(next_hunk(&hunks, 10, false).map(|h| h.new_start), Some(20));
        // Cursor on line 5 itself moves on to the following hunk.
        assert_eq!(next_hunk(&hunks, 4, false).map(|h| h.new_start), Some(20));
        assert_eq!(next_hunk(&hunks, 0, false).map(|h| h.new_start), Some(2));
    }

    #[test]
    fn next_wraps_only_when_enabled() {
        let hunks = hunks_at(&[2, 5, 20]);
        assert_eq!(next_hunk(&hunks, 25, false), None);
        assert_eq!(next_hunk(&hunks, 25, true).map(|h| h.new_start), Some(2));
        assert_eq!(next_hunk(&hunks, 25, true).map(Hunk::target_row), Some(1));
    }

    #[test]
    fn previous_mirrors_next() {
        let hunks = hunks_at(&[2, 5, 20]);
        assert_eq!(previous_hunk(&hunks, 10, false).map(|h| h.new_start), Some(5));
        assert_eq!(previous_hunk(&hunks, 4, false).map(|h| h.new_start), Some(2));
        assert_eq!(previous_hunk(&hunks, 1, false), None);
        assert_eq!(previous_hunk(&hunks, 1, true).map(|h| h.new_start), Some(20));
        assert_eq!(previous_hunk(&hunks, 30, false).map(|h| h.new_start), Some(20));
    }

    #[test]
    fn empty_list_has_no_target_even_with_wrap() {
        assert_eq!(next_hunk(&[], 3, true), None);
        assert_eq!(previous_hunk(&[], 3, true), None);
    }

    #[test]
    fn top_deletion_targets_row_zero() {
        let hunks = vec![Hunk::new(1, 2, 0, 0)];
        assert_eq!(next_hunk(&hunks, 5, true).map(Hunk::target_row), Some(0));
    }

    proptest! {
        #[test]
        fn next_is_strictly_below_cursor_unless_wrapped(
            mut starts in proptest::collection::vec(1u32..500, 0..20),
            cursor in 0usize..600,
        ) {
            starts.sort_unstable();
            let hunks = hunks_at(&starts);
            match next_hunk(&hunks, cursor, false) {
                Some(h) => prop_assert!(h.new_start as usize > cursor + 1),
                None => prop_assert!(starts.iter().all(|&s| s as usize <= cursor + 1)),
            }
            prop_assert_eq!(next_hunk(&hunks, cursor, false), next_hunk(&hunks, cursor, false));
        }

        #[test]
        fn previous_is_strictly_above_cursor_unless_wrapped(
            mut starts in proptest::collection::vec(1u32..500, 0..20),
            cursor in 0usize..600,
        ) {
            starts.sort_unstable();
            let hunks = hunks_at(&starts);
            match previous_hunk(&hunks, cursor, false) {
                Some(h) => prop_assert!((h.new_start as usize) < cursor + 1),
                None => prop_assert!(starts.iter().all(|&s| s as usize >= cursor + 1)),
            }
        }

        #[test]
        fn wrap_never_returns_none_for_nonempty_lists(
            mut starts in proptest::collection::vec(1u32..500, 1..20),
            cursor in 0usize..600,
        ) {
            starts.sort_unstable();
            let hunks = hunks_at(&starts);
            prop_assert!(next_hunk(&hunks, cursor, true).is_some());
            prop_assert!(previous_hunk(&hunks, cursor, true).is_some());
        }
    }
}
