//! Fuzzy matching for the hunk list filter.

use nucleo_matcher::{
    pattern::{AtomKind, CaseMatching, Normalization, Pattern},
    Config, Matcher, Utf32Str,
};

/// Fuzzy matcher wrapping nucleo-matcher.
///
/// Reuses internal buffers across calls.
pub struct FuzzyMatcher {
    matcher: Matcher,
    buf: Vec<char>,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FuzzyMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FuzzyMatcher").finish_non_exhaustive()
    }
}

impl FuzzyMatcher {
    /// Create a matcher tuned for source lines.
    pub fn new() -> Self {
        Self {
            matcher: Matcher::new(Config::DEFAULT),
            buf: Vec::with_capacity(256),
        }
    }

    /// Indices of the candidates matching `pattern`, best match first.
    ///
    /// Equal scores keep candidate order. A blank pattern matches everything
    /// in candidate order.
    pub fn filter_sorted<I, S>(&mut self, pattern: &str, candidates: I) -> Vec<usize>
    where
        I: Iterator<Item = (usize, S)>,
        S: AsRef<str>,
    {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return candidates.map(|(idx, _)| idx).collect();
        }

        let pat = Pattern::new(
            pattern,
            CaseMatching::Smart,
            Normalization::Smart,
            AtomKind::Fuzzy,
        );

        let mut results: Vec<(usize, u32)> = candidates
            .filter_map(|(idx, s)| {
                self.buf.clear();
                let haystack = Utf32Str::new(s.as_ref(), &mut self.buf);
                pat.score(haystack, &mut self.matcher).map(|sc| (idx, sc))
            })
            .collect();

        // Stable: ties stay in hunk order.
        results.sort_by(|a, b| b.1.cmp(&a.1));

        results.into_iter().map(|(i, _)| i).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(pattern: &str, candidates: &[&str]) -> Vec<usize> {
        FuzzyMatcher::new().filter_sorted(pattern, candidates.iter().enumerate())
    }

    #[test]
    fn blank_pattern_keeps_everything_in_order() {
        assert_eq!(run("", &["b", "a", "c"]), vec![0, 1, 2]);
        assert_eq!(run("   ", &["b", "a"]), vec![0, 1]);
    }

    #[test]
    fn no_match() {
        assert!(run("xyz", &["fn main()", "let x = 1;"]).is_empty());
    }

    #[test]
    fn fuzzy_match() {
        assert_eq!(run("fnmn", &["fn main() {", "let a = b;"]), vec![0]);
    }

    #[test]
    fn smart_case() {
        assert_eq!(run("Foo", &["foo()", "Foo::new()"]), vec![1]);
        assert_eq!(run("foo", &["foo()", "Foo::new()"]).len(), 2);
    }

    #[test]
    fn better_match_first() {
        let results = run("return", &["let r = e; t(u, r, n)", "return x;"]);
        assert_eq!(results.first(), Some(&1));
    }
}
