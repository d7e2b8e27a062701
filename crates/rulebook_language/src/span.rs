//! Source location tracking.
//!
//! `Span` tracks the position of tokens and AST nodes in source code
//! for error reporting. Rule files embed constraint and consequence text,
//! so spans always carry file-relative line and column numbers even when the
//! embedded text is lexed on its own.

/// A span of source text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Span {
    /// Byte offset where this span starts.
    pub start: usize,
    /// Byte offset where this span ends (exclusive).
    pub end: usize,
    /// 1-based line number where this span starts.
    pub line: u32,
    /// 1-based column number where this span starts.
    pub column: u32,
}

impl Span {
    /// Creates a new span.
    #[must_use]
    pub const fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Creates a span at the start of input.
    #[must_use]
    pub const fn at_start() -> Self {
        Self::new(0, 0, 1, 1)
    }

    /// Creates a span covering the range from this span to another.
    #[must_use]
    pub fn to(self, other: Self) -> Self {
        Self {
            start: self.start,
            end: other.end,
            line: self.line,
            column: self.column,
        }
    }

    /// Returns the length of this span in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true if this span is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns the text this span covers in the given source.
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_to_keeps_start_position() {
        let a = Span::new(0, 5, 2, 3);
        let b = Span::new(8, 10, 2, 11);
        let combined = a.to(b);
        assert_eq!((combined.start, combined.end), (0, 10));
        assert_eq!((combined.line, combined.column), (2, 3));
        assert_eq!(combined.len(), 10);
    }

    #[test]
    fn span_text_out_of_range_is_empty() {
        let span = Span::new(4, 20, 1, 1);
        assert_eq!(span.text("short"), "");
        assert_eq!(Span::new(0, 5, 1, 1).text("hello world"), "hello");
    }
}
