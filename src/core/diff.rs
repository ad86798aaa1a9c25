//! Zero-context line diffing into git-style hunks.

use std::ops::Range;

use similar::{DiffTag, TextDiff};

use crate::core::Hunk;

/// Compute the changed line regions between `old` and `new`.
///
/// Hunks carry no context lines and follow git's header convention: a side
/// with zero lines reports the line *before* the change as its start.
/// Returned hunks are sorted by `new_start`.
pub fn line_hunks(old: &str, new: &str) -> Vec<Hunk> {
    let _timer = crate::metrics::Timer::start("line_hunks");

    let diff = TextDiff::from_lines(old, new);

    let mut hunks = Vec::new();
    let mut pending: Option<(Range<usize>, Range<usize>)> = None;

    for op in diff.ops() {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        if tag == DiffTag::Equal {
            if let Some((o, n)) = pending.take() {
                hunks.push(make_hunk(o, n));
            }
            continue;
        }

        // Adjacent delete/insert runs collapse into one hunk.
        pending = Some(match pending.take() {
            Some((o, n)) => (o.start..old_range.end, n.start..new_range.end),
            None => (old_range, new_range),
        });
    }

    if let Some((o, n)) = pending {
        hunks.push(make_hunk(o, n));
    }

    hunks
}

fn make_hunk(old: Range<usize>, new: Range<usize>) -> Hunk {
    let (old_start, old_lines) = header_pair(&old);
    let (new_start, new_lines) = header_pair(&new);
    Hunk::new(old_start, old_lines, new_start, new_lines)
}

/// Convert a 0-based line range into a 1-based (start, count) header pair.
fn header_pair(range: &Range<usize>) -> (u32, u32) {
    let count = range.len();
    let start = if count == 0 {
        range.start
    } else {
        range.start + 1
    };
    (to_u32(start), to_u32(count))
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
