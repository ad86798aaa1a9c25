//! Hunk model and the hunk-to-decoration classifier.

use std::fmt;

/// One contiguous changed line region between the committed file and the buffer.
///
/// Starts are 1-based (git convention). When a side has a zero line count its
/// start names the line *after which* the change happens, so `new_start` is 0
/// for a deletion at the top of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hunk {
    /// First line in the committed version (1-based).
    pub old_start: u32,
    /// Number of lines in the committed version.
    pub old_lines: u32,
    /// First line in the buffer (1-based).
    pub new_start: u32,
    /// Number of lines in the buffer.
    pub new_lines: u32,
}

impl Hunk {
    /// Create a hunk from its four header fields.
    pub const fn new(old_start: u32, old_lines: u32, new_start: u32, new_lines: u32) -> Self {
        Self {
            old_start,
            old_lines,
            new_start,
            new_lines,
        }
    }

    /// Range label in unified-diff form, e.g. `-3,2 +3,4`.
    pub fn header(&self) -> String {
        self.to_string()
    }

    /// Row the cursor lands on when navigating to this hunk (0-based).
    #[inline]
    pub fn target_row(&self) -> usize {
        (self.new_start as usize).saturating_sub(1)
    }
}

impl fmt::Display for Hunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "-{},{} +{},{}",
            self.old_start, self.old_lines, self.new_start, self.new_lines
        )
    }
}

/// Change class attached to a decorated row range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecorationClass {
    /// Lines inserted with no committed counterpart.
    Added,
    /// Lines removed after the anchored row.
    Removed,
    /// Lines removed above the first line of the buffer.
    PreviousLineRemoved,
    /// Lines replaced.
    Modified,
}

impl DecorationClass {
    /// Class name handed to the host for styling.
    pub fn class_name(self) -> &'static str {
        match self {
            Self::Added => "git-line-added",
            Self::Removed => "git-line-removed",
            Self::PreviousLineRemoved => "git-previous-line-removed",
            Self::Modified => "git-line-modified",
        }
    }
}

/// Inclusive range of 0-based buffer rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowRange {
    /// First row.
    pub start: usize,
    /// Last row (inclusive).
    pub end: usize,
}

impl RowRange {
    /// Range covering a single row.
    pub const fn single(row: usize) -> Self {
        Self {
            start: row,
            end: row,
        }
    }

    /// Number of rows covered.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Always false: a range covers at least one row.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether `row` falls inside the range.
    pub fn contains(&self, row: usize) -> bool {
        (self.start..=self.end).contains(&row)
    }
}

/// A classified row range derived from exactly one hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decoration {
    /// Rows to mark.
    pub rows: RowRange,
    /// Change class.
    pub class: DecorationClass,
}

/// Map a hunk onto the buffer rows it decorates.
///
/// Total: every hunk yields one decoration, degenerate headers clamp to row 0.
pub fn classify(hunk: &Hunk) -> Decoration {
    let new_start = hunk.new_start as usize;
    let new_lines = hunk.new_lines as usize;

    if hunk.old_lines == 0 && hunk.new_lines > 0 {
        return Decoration {
            rows: span(new_start, new_lines),
            class: DecorationClass::Added,
        };
    }

    if hunk.new_lines == 0 && hunk.old_lines > 0 {
        // new_start == 0 means the removal sits above the first buffer line.
        return match new_start.checked_sub(1) {
            None => Decoration {
                rows: RowRange::single(0),
                class: DecorationClass::PreviousLineRemoved,
            },
            Some(anchor) => Decoration {
                rows: RowRange::single(anchor),
                class: DecorationClass::Removed,
            },
        };
    }

    Decoration {
        rows: span(new_start, new_lines),
        class: DecorationClass::Modified,
    }
}

fn span(new_start: usize, new_lines: usize) -> RowRange {
    let start = new_start.saturating_sub(1);
    RowRange {
        start,
        end: start + new_lines.saturating_sub(1),
    }
}
