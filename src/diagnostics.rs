use crate::fix::TextEdit;
use crate::level::LintLevel;
use crate::lint::LintDescriptor;
use crate::syntax::ast::TextRange;

/// A single lint finding produced by without.
#[derive(Debug, Clone)]
#[must_use]
pub struct Diagnostic {
    pub lint: &'static LintDescriptor,
    pub level: LintLevel,
    pub file: Option<String>,
    pub span: Span,
    pub message: String,
    pub help: Option<String>,
    pub suggestion: Option<Suggestion>,
}

/// Optional machine- or human-applicable fix for a diagnostic.
#[derive(Debug, Clone)]
pub struct Suggestion {
    pub message: String,
    pub edit: TextEdit,
    pub applicability: Applicability,
}

/// Applicability of an automated suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applicability {
    MachineApplicable,
    /// Applied only when the user opts in to unsafe fixes.
    MaybeIncorrect,
}

impl Applicability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Applicability::MachineApplicable => "machine-applicable",
            Applicability::MaybeIncorrect => "maybe-incorrect",
        }
    }
}

/// Span in a source file (1-based row/column positions, end exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

/// Single position in a source file (1-based row, 1-based column in chars).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub row: usize,
    pub column: usize,
}

impl Span {
    /// Construct a `Span` from a byte range into `source`.
    #[must_use]
    pub fn from_range(source: &str, range: TextRange) -> Self {
        Self {
            start: position_from_byte_offset(source, range.start),
            end: position_from_byte_offset(source, range.end),
        }
    }
}

/// 1-based position of `offset`; offsets past the end clamp to the end.
pub fn position_from_byte_offset(source: &str, offset: usize) -> Position {
    let mut row = 1;
    let mut column = 1;
    for (i, c) in source.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            row += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    Position { row, column }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_one_based() {
        let source = "ab\ncd\n";
        assert_eq!(
            position_from_byte_offset(source, 0),
            Position { row: 1, column: 1 }
        );
        assert_eq!(
            position_from_byte_offset(source, 4),
            Position { row: 2, column: 2 }
        );
        assert_eq!(
            position_from_byte_offset(source, 100),
            Position { row: 3, column: 1 }
        );
    }

    #[test]
    fn span_from_multiline_range() {
        let source = "x = 1\n  With p\n  End With\n";
        let span = Span::from_range(source, TextRange::new(8, 25));
        assert_eq!(span.start, Position { row: 2, column: 3 });
        assert_eq!(span.end, Position { row: 3, column: 11 });
    }

    #[test]
    fn columns_count_chars_not_bytes() {
        let source = "s = \"é\" : With x";
        let offset = source.find("With").unwrap();
        assert_eq!(
            position_from_byte_offset(source, offset).column,
            source[..offset].chars().count() + 1
        );
    }
}
