//! git2-backed repository provider.
//!
//! Buffers are diffed against the file's blob in `HEAD`. Status snapshots are
//! refreshed on demand (typically from a [`RepoWatcher`](super::RepoWatcher)
//! poll) and changes are reported through the repository's event hub.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use git2::{ErrorCode, Oid, Status, StatusOptions};
use parking_lot::Mutex;

use super::{line_hunks, EventHub, Hunk, RepoError, Repository, RepositoryEvent, TextBuffer};
use super::{RepositoryProvider, SharedRepository};

/// Maximum committed blob size to diff against (50 MiB).
pub const MAX_BLOB_SIZE: usize = 50 * 1024 * 1024;

#[derive(Debug, Default, PartialEq, Eq)]
struct StatusSnapshot {
    head: Option<Oid>,
    files: HashMap<PathBuf, Status>,
}

/// A git working tree.
pub struct GitRepository {
    repo: Mutex<git2::Repository>,
    workdir: PathBuf,
    statuses: Mutex<StatusSnapshot>,
    events: EventHub<RepositoryEvent>,
}

impl std::fmt::Debug for GitRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepository")
            .field("workdir", &self.workdir)
            .finish()
    }
}

impl GitRepository {
    /// Open the repository containing `path`.
    pub fn discover(path: &Path) -> Result<Self, RepoError> {
        let repo = git2::Repository::discover(path).map_err(|e| match e.code() {
            ErrorCode::NotFound => RepoError::NotARepo,
            _ => RepoError::Git(e),
        })?;
        let workdir = repo.workdir().ok_or(RepoError::Bare)?.canonicalize()?;

        let this = Self {
            repo: Mutex::new(repo),
            workdir,
            statuses: Mutex::new(StatusSnapshot::default()),
            events: EventHub::new(),
        };
        *this.statuses.lock() = this.snapshot()?;
        Ok(this)
    }

    /// Path of `path` relative to the working tree.
    fn relative(&self, path: &Path) -> Result<PathBuf, RepoError> {
        if let Ok(rel) = path.strip_prefix(&self.workdir) {
            return Ok(rel.to_path_buf());
        }
        let canonical = path.canonicalize()?;
        canonical
            .strip_prefix(&self.workdir)
            .map(Path::to_path_buf)
            .map_err(|_| RepoError::OutsideWorkTree(path.to_path_buf()))
    }

    /// Contents of `rel` in `HEAD` with LF line endings, `None` when untracked
    /// or `HEAD` is unborn.
    fn head_content(&self, rel: &Path) -> Result<Option<String>, RepoError> {
        let repo = self.repo.lock();
        let head = match repo.head() {
            Ok(head) => head,
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                return Ok(None)
            }
            Err(e) => return Err(e.into()),
        };
        let tree = head.peel_to_tree()?;
        let entry = match tree.get_path(rel) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let blob = repo.find_blob(entry.id())?;
        if blob.size() > MAX_BLOB_SIZE || blob.is_binary() {
            return Ok(None);
        }
        // Buffers hold LF text; compare like with like.
        Ok(Some(TextBuffer::from_bytes(blob.content()).as_str().to_owned()))
    }

    fn try_line_diffs(&self, path: &Path, text: &str) -> Result<Option<Vec<Hunk>>, RepoError> {
        let rel = self.relative(path)?;
        Ok(self
            .head_content(&rel)?
            .map(|committed| line_hunks(&committed, text)))
    }

    fn snapshot(&self) -> Result<StatusSnapshot, RepoError> {
        let repo = self.repo.lock();
        let head = repo.head().ok().and_then(|h| h.target());

        let mut opts = StatusOptions::new();
        opts.include_untracked(true).recurse_untracked_dirs(true);
        let statuses = repo.statuses(Some(&mut opts))?;

        let files = statuses
            .iter()
            .filter_map(|entry| {
                let path = entry.path()?;
                Some((self.workdir.join(path), entry.status()))
            })
            .collect();

        Ok(StatusSnapshot { head, files })
    }

    /// Re-read statuses and emit events for whatever changed.
    ///
    /// Emits one [`RepositoryEvent::StatusChanged`] per file whose status
    /// differs, then [`RepositoryEvent::StatusesChanged`] if anything (including
    /// `HEAD`) moved. Returns whether anything changed.
    pub fn refresh_status(&self) -> Result<bool, RepoError> {
        let next = self.snapshot()?;
        let prev = std::mem::replace(&mut *self.statuses.lock(), next);
        let current = self.statuses.lock();

        let mut changed: Vec<PathBuf> = prev
            .files
            .iter()
            .filter(|(path, status)| current.files.get(*path) != Some(status))
            .map(|(path, _)| path.clone())
            .collect();
        changed.extend(
            current
                .files
                .keys()
                .filter(|path| !prev.files.contains_key(*path))
                .cloned(),
        );
        let head_moved = prev.head != current.head;
        drop(current);

        changed.sort();
        for path in &changed {
            self.events.emit(&RepositoryEvent::StatusChanged(path.clone()));
        }

        let any = head_moved || !changed.is_empty();
        if any {
            tracing::debug!(
                workdir = %self.workdir.display(),
                files = changed.len(),
                head_moved,
                "repository statuses changed"
            );
            self.events.emit(&RepositoryEvent::StatusesChanged);
        }
        Ok(any)
    }
}

impl Repository for GitRepository {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn line_diffs(&self, path: &Path, text: &str) -> Option<Vec<Hunk>> {
        match self.try_line_diffs(path, text) {
            Ok(hunks) => hunks,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "line diff failed");
                None
            }
        }
    }

    fn events(&self) -> &EventHub<RepositoryEvent> {
        &self.events
    }
}

/// Opens and caches [`GitRepository`] handles, one per working tree.
#[derive(Debug, Default)]
pub struct GitRepositoryProvider {
    repositories: Mutex<HashMap<PathBuf, Arc<GitRepository>>>,
}

impl GitRepositoryProvider {
    /// Create a provider with an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or reuse) the repository containing `path`.
    pub fn open(&self, path: &Path) -> Result<Arc<GitRepository>, RepoError> {
        let repo = GitRepository::discover(path)?;
        let mut cache = self.repositories.lock();
        let entry = cache
            .entry(repo.workdir.clone())
            .or_insert_with(|| Arc::new(repo));
        Ok(Arc::clone(entry))
    }

    /// Refresh statuses of every cached repository.
    pub fn refresh_statuses(&self) -> bool {
        let repos: Vec<Arc<GitRepository>> = self.repositories.lock().values().cloned().collect();
        let mut any = false;
        for repo in repos {
            match repo.refresh_status() {
                Ok(changed) => any |= changed,
                Err(e) => tracing::warn!(error = %e, "status refresh failed"),
            }
        }
        any
    }
}

impl RepositoryProvider for GitRepositoryProvider {
    fn repository_for_directory(&self, directory: &Path) -> Option<SharedRepository> {
        match self.open(directory) {
            Ok(repo) => Some(repo),
            Err(RepoError::NotARepo) => None,
            Err(e) => {
                tracing::warn!(directory = %directory.display(), error = %e, "repository lookup failed");
                None
            }
        }
    }
}
