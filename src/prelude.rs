//! Common re-exports for convenient importing.
//!
//! # Example
//!
//! ```rust,ignore
//! use gitgutter::prelude::*;
//! ```

pub use crate::core::{
    classify, BufferId, Command, Config, Decoration, DecorationClass, DiffTracker, Editor,
    EditorEvent, GitGutter, GitRepositoryProvider, Hunk, HunkPicker, PickerEntry, Project,
    Repository, RepositoryProvider, RowRange, SelectionUi, Settings,
};
