//! Repository contracts and lookup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use super::{directory_for_path, EventHub, Hunk};

/// Errors from repository operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RepoError {
    /// Path is not inside a git repository.
    #[error("not inside a git repository")]
    NotARepo,
    /// Repository has no working tree.
    #[error("repository has no working tree")]
    Bare,
    /// Path lies outside the repository's working tree.
    #[error("path is outside the working tree: {0}")]
    OutsideWorkTree(PathBuf),
    /// libgit2 error.
    #[error("git error: {0}")]
    Git(#[from] git2::Error),
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Repository-level notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryEvent {
    /// Statuses were refreshed wholesale.
    StatusesChanged,
    /// The status of one file changed.
    StatusChanged(PathBuf),
}

/// A version-controlled repository able to diff buffer text against history.
pub trait Repository: Send + Sync {
    /// Working directory root.
    fn workdir(&self) -> &Path;

    /// Line hunks between the committed version of `path` and `text`.
    ///
    /// `None` means "nothing to report" (untracked file, lookup failure) and
    /// is treated the same as an empty list.
    fn line_diffs(&self, path: &Path, text: &str) -> Option<Vec<Hunk>>;

    /// Status notifications.
    fn events(&self) -> &EventHub<RepositoryEvent>;
}

/// Shared handle to a repository.
pub type SharedRepository = Arc<dyn Repository>;

/// Finds the repository for a project root directory.
pub trait RepositoryProvider: Send + Sync {
    /// Repository owning `directory`, if any. May block.
    fn repository_for_directory(&self, directory: &Path) -> Option<SharedRepository>;
}

/// Repository owning `path`, looked up through the project root that contains it.
///
/// Files outside every project root have no repository.
pub fn resolve_repository(
    provider: &dyn RepositoryProvider,
    directories: &[PathBuf],
    path: &Path,
) -> Option<SharedRepository> {
    let directory = directory_for_path(directories, path)?;
    provider.repository_for_directory(directory)
}
