//! Colors for the terminal host.

use ratatui::style::Color;

use crate::core::DecorationClass;

/// Dark palette used by every widget.
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub struct Palette {
    pub bg_dark: Color,
    pub bg_elevated: Color,
    pub bg_selected: Color,
    pub bg_cursor: Color,

    pub text_muted: Color,
    pub text_normal: Color,
    pub text_bright: Color,

    pub accent: Color,

    pub added: Color,
    pub modified: Color,
    pub removed: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            bg_dark: Color::Rgb(18, 18, 22),
            bg_elevated: Color::Rgb(36, 36, 44),
            bg_selected: Color::Rgb(45, 45, 55),
            bg_cursor: Color::Rgb(30, 30, 38),

            text_muted: Color::Rgb(80, 80, 92),
            text_normal: Color::Rgb(175, 175, 185),
            text_bright: Color::Rgb(230, 230, 235),

            accent: Color::Rgb(80, 200, 200),

            added: Color::Rgb(85, 185, 105),
            modified: Color::Rgb(215, 175, 80),
            removed: Color::Rgb(215, 85, 85),
        }
    }
}

impl Palette {
    /// Gutter color for a decoration class.
    pub fn class_color(&self, class: DecorationClass) -> Color {
        match class {
            DecorationClass::Added => self.added,
            DecorationClass::Modified => self.modified,
            DecorationClass::Removed | DecorationClass::PreviousLineRemoved => self.removed,
        }
    }
}

/// Gutter glyph drawn when icons are enabled.
pub fn class_icon(class: DecorationClass) -> char {
    match class {
        DecorationClass::Added => '+',
        DecorationClass::Modified => '~',
        DecorationClass::Removed => '_',
        DecorationClass::PreviousLineRemoved => '‾',
    }
}
