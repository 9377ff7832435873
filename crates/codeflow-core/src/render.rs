//! Bounded, failure-safe textual snapshots of runtime values.

use std::fmt::{self, Write};
use std::panic::{self, AssertUnwindSafe};

/// Renders values into strings of bounded length.
///
/// Rendering never fails: a value whose `Display` implementation returns an
/// error or panics is rendered as [`ValueRenderer::UNREPRESENTABLE`]. The
/// only state is the configured maximum length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueRenderer {
    max_len: usize,
}

impl ValueRenderer {
    pub const DEFAULT_MAX_LEN: usize = 200;

    /// Replacement text for values that cannot be rendered.
    pub const UNREPRESENTABLE: &'static str = "<unrepr-able>";

    /// Appended once to every truncated rendering.
    pub const TRUNCATION_MARKER: char = '…';

    /// `max_len` is counted in characters, not bytes.
    pub fn new(max_len: usize) -> Self {
        ValueRenderer { max_len }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn render(&self, value: &dyn fmt::Display) -> String {
        let mut out = String::new();
        let written = panic::catch_unwind(AssertUnwindSafe(|| write!(out, "{value}")));
        match written {
            Ok(Ok(())) => {}
            _ => return Self::UNREPRESENTABLE.to_string(),
        }

        if let Some((cut, _)) = out.char_indices().nth(self.max_len) {
            out.truncate(cut);
            out.push(Self::TRUNCATION_MARKER);
        }
        out
    }
}

impl Default for ValueRenderer {
    fn default() -> Self {
        ValueRenderer::new(Self::DEFAULT_MAX_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl fmt::Display for Failing {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    struct Panicking;

    impl fmt::Display for Panicking {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            panic!("display exploded")
        }
    }

    #[test]
    fn short_values_are_untouched() {
        let r = ValueRenderer::default();
        assert_eq!(r.render(&42), "42");
        assert_eq!(r.render(&"hello"), "hello");
    }

    #[test]
    fn long_values_are_cut_to_limit_plus_marker() {
        let r = ValueRenderer::new(10);
        let long = "x".repeat(25);
        let out = r.render(&long);
        assert_eq!(out.chars().count(), 11);
        assert_eq!(out, format!("{}…", "x".repeat(10)));
    }

    #[test]
    fn value_exactly_at_limit_is_not_marked() {
        let r = ValueRenderer::new(5);
        assert_eq!(r.render(&"abcde"), "abcde");
    }

    #[test]
    fn limit_counts_characters() {
        let r = ValueRenderer::new(3);
        assert_eq!(r.render(&"éééé"), "ééé…");
    }

    #[test]
    fn formatting_error_yields_sentinel() {
        let r = ValueRenderer::default();
        assert_eq!(r.render(&Failing), ValueRenderer::UNREPRESENTABLE);
    }

    #[test]
    fn panicking_display_yields_sentinel() {
        let r = ValueRenderer::default();
        assert_eq!(r.render(&Panicking), ValueRenderer::UNREPRESENTABLE);
    }
}
