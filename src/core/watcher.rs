//! File system watching for status refresh and buffer reload.

use std::path::{Component, Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult};

/// Events emitted by the repo watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// Files changed under the watched root.
    Changed(Vec<PathBuf>),
}

/// Watches a working tree for file and git metadata changes.
pub struct RepoWatcher {
    rx: Receiver<WatchEvent>,
    /// Keep watcher alive. Dropping this stops watching.
    _watcher: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
}

impl RepoWatcher {
    /// Watch `root` recursively.
    ///
    /// Object-store churn under `.git/` is filtered out; index, HEAD and ref
    /// updates are kept since they change file statuses. Events are debounced
    /// (200ms window).
    pub fn new(root: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let repo_path = root.to_path_buf();

        let mut debouncer = new_debouncer(
            Duration::from_millis(200),
            move |res: DebounceEventResult| {
                let Ok(events) = res else {
                    return;
                };
                let relevant: Vec<PathBuf> = events
                    .into_iter()
                    .map(|e| e.path)
                    .filter(|p| !is_ignored_path(p, &repo_path))
                    .collect();
                if !relevant.is_empty() {
                    let _ = tx.send(WatchEvent::Changed(relevant));
                }
            },
        )?;

        debouncer.watcher().watch(root, RecursiveMode::Recursive)?;

        Ok(Self {
            rx,
            _watcher: debouncer,
        })
    }

    /// Poll for watch events without blocking.
    ///
    /// Pending events are merged into one. Returns `None` if nothing changed.
    pub fn poll(&self) -> Option<WatchEvent> {
        let mut paths = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(WatchEvent::Changed(more)) => paths.extend(more),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        if paths.is_empty() {
            return None;
        }
        paths.sort();
        paths.dedup();
        Some(WatchEvent::Changed(paths))
    }
}

/// Check if a path is noise for status purposes.
fn is_ignored_path(path: &Path, repo_root: &Path) -> bool {
    let rel = match path.strip_prefix(repo_root) {
        Ok(r) => r,
        Err(_) => return false,
    };

    let mut components = rel.components().filter_map(|c| match c {
        Component::Normal(name) => Some(name.to_string_lossy()),
        _ => None,
    });

    match components.next().as_deref() {
        Some(".git") => {}
        _ => return false,
    }

    if rel.extension().is_some_and(|ext| ext == "lock") {
        return true;
    }
    matches!(components.next().as_deref(), Some("objects" | "logs"))
}
