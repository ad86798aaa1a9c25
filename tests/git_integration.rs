//! Integration tests with real git repositories.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use git2::{IndexAddOption, Signature};
use gitgutter::core::{
    Command, DecorationClass, GitRepository, GitRepositoryProvider, Hunk, RepoError, Repository,
    RepositoryEvent, RepositoryProvider, Settings,
};
use gitgutter::ui::{annotate, App};
use tempfile::TempDir;

const FILE: &str = "notes.txt";
const COMMITTED: &str = "one\ntwo\nthree\nfour\nfive\n";

/// Create a temporary git repo with one commit.
fn create_test_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    let path = dir.path();
    let repo = git2::Repository::init(path).unwrap();
    {
        let mut config = repo.config().unwrap();
        config.set_str("user.email", "test@example.com").unwrap();
        config.set_str("user.name", "Test").unwrap();
    }

    std::fs::write(path.join(FILE), COMMITTED).unwrap();
    commit_all(&repo, "initial");
    dir
}

fn commit_all(repo: &git2::Repository, message: &str) {
    let mut index = repo.index().unwrap();
    index
        .add_all(["."], IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let sig = Signature::now("Test", "test@example.com").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap();
}

fn file_path(dir: &TempDir) -> PathBuf {
    dir.path().canonicalize().unwrap().join(FILE)
}

#[test]
fn discovers_repository_from_subdirectory() {
    let dir = create_test_repo();
    std::fs::create_dir_all(dir.path().join("src/deep")).unwrap();

    let repo = GitRepository::discover(&dir.path().join("src/deep")).unwrap();
    assert_eq!(repo.workdir(), dir.path().canonicalize().unwrap());
}

#[test]
fn directory_outside_repository_is_not_a_repo() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        GitRepository::discover(dir.path()),
        Err(RepoError::NotARepo)
    ));
    let provider = GitRepositoryProvider::new();
    assert!(provider.repository_for_directory(dir.path()).is_none());
}

#[test]
fn provider_reuses_open_repositories() {
    let dir = create_test_repo();
    std::fs::create_dir_all(dir.path().join("sub")).unwrap();
    let provider = GitRepositoryProvider::new();
    let a = provider.open(dir.path()).unwrap();
    let b = provider.open(&dir.path().join("sub")).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn clean_file_has_no_hunks() {
    let dir = create_test_repo();
    let repo = GitRepository::discover(dir.path()).unwrap();
    assert_eq!(repo.line_diffs(&file_path(&dir), COMMITTED), Some(vec![]));
}

#[test]
fn edits_are_reported_as_git_style_hunks() {
    let dir = create_test_repo();
    let repo = GitRepository::discover(dir.path()).unwrap();

    let edited = "zero\none\nTWO\nthree\nfive\n";
    let hunks = repo.line_diffs(&file_path(&dir), edited).unwrap();
    assert_eq!(
        hunks,
        vec![
            Hunk::new(0, 0, 1, 1),
            Hunk::new(2, 1, 3, 1),
            Hunk::new(4, 1, 4, 0),
        ]
    );
}

#[test]
fn untracked_file_has_nothing_to_report() {
    let dir = create_test_repo();
    std::fs::write(dir.path().join("new.txt"), "fresh\n").unwrap();
    let repo = GitRepository::discover(dir.path()).unwrap();

    let path = dir.path().canonicalize().unwrap().join("new.txt");
    assert_eq!(repo.line_diffs(&path, "fresh\n"), None);
}

#[test]
fn status_refresh_reports_changed_files() {
    let dir = create_test_repo();
    let repo = GitRepository::discover(dir.path()).unwrap();

    let changed = Arc::new(parking_lot::Mutex::new(Vec::<PathBuf>::new()));
    let wholesale = Arc::new(AtomicUsize::new(0));
    let _subscription = {
        let changed = Arc::clone(&changed);
        let wholesale = Arc::clone(&wholesale);
        repo.events().subscribe(move |event| match event {
            RepositoryEvent::StatusChanged(path) => changed.lock().push(path.clone()),
            RepositoryEvent::StatusesChanged => {
                wholesale.fetch_add(1, Ordering::SeqCst);
            }
        })
    };

    assert!(!repo.refresh_status().unwrap());
    assert_eq!(wholesale.load(Ordering::SeqCst), 0);

    std::fs::write(dir.path().join(FILE), "edited\n").unwrap();
    assert!(repo.refresh_status().unwrap());
    assert_eq!(*changed.lock(), vec![file_path(&dir)]);
    assert_eq!(wholesale.load(Ordering::SeqCst), 1);
}

#[test]
fn new_commit_moves_head_and_clears_hunks() {
    let dir = create_test_repo();
    let repo = GitRepository::discover(dir.path()).unwrap();

    let edited = "one\ntwo\nthree\nfour\nfive\nsix\n";
    std::fs::write(dir.path().join(FILE), edited).unwrap();
    assert_eq!(
        repo.line_diffs(&file_path(&dir), edited),
        Some(vec![Hunk::new(5, 0, 6, 1)])
    );

    commit_all(&git2::Repository::open(dir.path()).unwrap(), "second");
    assert!(repo.refresh_status().unwrap());
    assert_eq!(repo.line_diffs(&file_path(&dir), edited), Some(vec![]));
}

#[test]
fn crlf_file_matches_its_normalized_buffer() {
    let dir = create_test_repo();
    std::fs::write(dir.path().join("w.txt"), "a\r\nb\r\nc\r\n").unwrap();
    commit_all(&git2::Repository::open(dir.path()).unwrap(), "crlf");

    let app = open_app(&dir.path().join("w.txt"));
    assert!(app.in_repository());
    assert!(app.hunks().is_empty(), "unchanged file has hunks: {:?}", app.hunks());
    assert_eq!(app.editor().marker_count(), 0);
    app.shutdown();

    let repo = GitRepository::discover(dir.path()).unwrap();
    let path = dir.path().canonicalize().unwrap().join("w.txt");
    assert_eq!(
        repo.line_diffs(&path, "a\nB\nc\n"),
        Some(vec![Hunk::new(2, 1, 2, 1)])
    );
}

fn open_app(path: &Path) -> App {
    let mut app = App::new(path, Settings::default()).unwrap();
    assert!(app.settle(Duration::from_secs(5)), "repository lookup timed out");
    app
}

#[test]
fn app_decorates_and_navigates_a_modified_file() {
    let dir = create_test_repo();
    std::fs::write(dir.path().join(FILE), "one\nTWO\nthree\nfour\nfive\nsix\n").unwrap();

    let mut app = open_app(&dir.path().join(FILE));
    assert!(app.in_repository());
    assert_eq!(app.hunks(), &[Hunk::new(2, 1, 2, 1), Hunk::new(5, 0, 6, 1)]);
    assert_eq!(app.editor().row_class(1), Some(DecorationClass::Modified));
    assert_eq!(app.editor().row_class(5), Some(DecorationClass::Added));

    assert!(app.dispatch(Command::MoveToNextHunk));
    assert_eq!(app.editor().cursor(), (1, 0));
    assert!(app.dispatch(Command::MoveToNextHunk));
    assert_eq!(app.editor().cursor(), (5, 0));

    assert_eq!(
        annotate(app.editor(), false),
        "  one\n~ TWO\n  three\n  four\n  five\n+ six\n"
    );
    app.shutdown();
}

#[test]
fn app_picks_up_changes_on_reload() {
    let dir = create_test_repo();
    let mut app = open_app(&dir.path().join(FILE));
    assert!(app.hunks().is_empty());

    std::fs::write(dir.path().join(FILE), "one\ntwo\nfive\n").unwrap();
    app.reload();
    app.poll();

    assert_eq!(app.hunks(), &[Hunk::new(3, 2, 2, 0)]);
    assert_eq!(app.editor().row_class(1), Some(DecorationClass::Removed));
    app.shutdown();
}

#[test]
fn app_outside_repository_shows_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("loose.txt");
    std::fs::write(&path, "a\nb\n").unwrap();

    let app = open_app(&path);
    assert!(!app.in_repository());
    assert!(app.hunks().is_empty());
    assert_eq!(annotate(app.editor(), true), "  1 a\n  2 b\n");
    app.shutdown();
}
