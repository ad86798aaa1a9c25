//! Core primitives for gitgutter (no TUI dependencies).

mod config;
mod diff;
mod events;
mod fuzzy;
mod git;
mod host;
mod hunk;
mod picker;
mod registry;
mod repo;
mod resolver;
mod text;
mod tracker;
mod watcher;

pub use config::*;
pub use diff::*;
pub use events::*;
pub use fuzzy::*;
pub use git::*;
pub use host::*;
pub use hunk::*;
pub use picker::*;
pub use registry::*;
pub use repo::*;
pub use resolver::*;
pub use text::*;
pub use tracker::*;
pub use watcher::*;
