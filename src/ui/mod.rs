//! Terminal host using ratatui.

mod app;
mod editor;
mod input;
mod palette;
mod render;

pub use app::App;
pub use editor::{ListUi, ListView, TerminalEditor, EDITOR_FOCUS, LIST_FOCUS};
pub use input::handle_input;
pub use palette::{class_icon, Palette};
pub use render::{annotate, render};
