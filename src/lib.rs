//! gitgutter - git change markers for editor gutters.
//!
//! Maps line hunks of a buffer against its committed version onto classified
//! gutter decorations, moves the cursor between hunks and offers a filterable
//! hunk list. The host editor plugs in through the traits in [`core`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use gitgutter::prelude::*;
//!
//! let mut gutter = GitGutter::activate(config, project, provider, ui);
//! let buffer = gutter.observe_editor(editor);
//! gutter.poll();
//! gutter.dispatch(Command::MoveToNextHunk, Some(buffer));
//! ```

#![deny(missing_docs)]

pub mod core;
pub mod log;
pub mod metrics;
pub mod prelude;
pub mod ui;
