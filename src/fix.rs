//! Text edits over source strings.
//!
//! All functions work on strings and byte offsets, no file I/O.
//!
//! - Edits are validated to be in bounds and non-overlapping before application
//! - Edits are applied in reverse order to preserve byte offsets

use thiserror::Error;

/// Error type for edit application.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FixError {
    #[error("Overlapping edits detected at byte {0}")]
    OverlappingEdits(usize),

    #[error("Edit range [{start}..{end}) exceeds source length {source_len}")]
    InvalidRange {
        start: usize,
        end: usize,
        source_len: usize,
    },

    #[error("Edit start {start} is after edit end {end}")]
    InvalidEditOrder { start: usize, end: usize },

    #[error("Edit boundary {0} is not on a character boundary")]
    NotCharBoundary(usize),
}

/// Replace the bytes `[start_byte, end_byte)` with `replacement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub start_byte: usize,
    pub end_byte: usize,
    pub replacement: String,
}

impl TextEdit {
    pub fn new(start_byte: usize, end_byte: usize, replacement: String) -> Self {
        Self {
            start_byte,
            end_byte,
            replacement,
        }
    }

    pub fn replace(start_byte: usize, end_byte: usize, replacement: String) -> Self {
        Self::new(start_byte, end_byte, replacement)
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start_byte..self.end_byte
    }

    /// Two ranges [a, b) and [c, d) overlap iff a < d && c < b.
    pub fn overlaps_with(&self, other: &TextEdit) -> bool {
        self.start_byte < other.end_byte && other.start_byte < self.end_byte
    }

    /// `other` lies entirely inside this edit's range.
    pub fn contains(&self, other: &TextEdit) -> bool {
        self.start_byte <= other.start_byte && other.end_byte <= self.end_byte
    }

    pub fn validate(&self, source: &str) -> Result<(), FixError> {
        if self.start_byte > self.end_byte {
            return Err(FixError::InvalidEditOrder {
                start: self.start_byte,
                end: self.end_byte,
            });
        }

        if self.end_byte > source.len() {
            return Err(FixError::InvalidRange {
                start: self.start_byte,
                end: self.end_byte,
                source_len: source.len(),
            });
        }

        for offset in [self.start_byte, self.end_byte] {
            if !source.is_char_boundary(offset) {
                return Err(FixError::NotCharBoundary(offset));
            }
        }

        Ok(())
    }
}

/// Validate that a list of edits are non-overlapping and within bounds.
pub fn validate_edits(edits: &[TextEdit], source: &str) -> Result<(), FixError> {
    for edit in edits {
        edit.validate(source)?;
    }

    for i in 0..edits.len() {
        for j in (i + 1)..edits.len() {
            if edits[i].overlaps_with(&edits[j]) {
                return Err(FixError::OverlappingEdits(
                    edits[i].start_byte.max(edits[j].start_byte),
                ));
            }
        }
    }

    Ok(())
}

/// Apply a list of non-overlapping edits to source code.
///
/// # Errors
///
/// Returns an error if edits overlap or any edit is out of bounds.
///
/// # Example
///
/// ```rust
/// use without::fix::{TextEdit, apply_edits};
///
/// let source = "With p\n    .Go()\nEnd With";
/// let edits = vec![TextEdit::replace(0, source.len(), "Dim w = p\nw.Go()".to_string())];
///
/// let result = apply_edits(source, &edits).unwrap();
/// assert_eq!(result, "Dim w = p\nw.Go()");
/// ```
pub fn apply_edits(source: &str, edits: &[TextEdit]) -> Result<String, FixError> {
    if edits.is_empty() {
        return Ok(source.to_string());
    }

    validate_edits(edits, source)?;

    let mut sorted_edits = edits.to_vec();
    sorted_edits.sort_by(|a, b| b.start_byte.cmp(&a.start_byte));

    let mut result = source.to_string();
    for edit in sorted_edits {
        result.replace_range(edit.range(), &edit.replacement);
    }

    Ok(result)
}

pub fn apply_edit(source: &str, edit: &TextEdit) -> Result<String, FixError> {
    apply_edits(source, std::slice::from_ref(edit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlaps_with() {
        let edit1 = TextEdit::new(0, 10, "a".to_string());
        let edit2 = TextEdit::new(5, 15, "b".to_string());
        let edit3 = TextEdit::new(10, 20, "c".to_string());

        assert!(edit1.overlaps_with(&edit2));
        assert!(edit2.overlaps_with(&edit1));
        assert!(!edit1.overlaps_with(&edit3));
        assert!(!edit3.overlaps_with(&edit1));
    }

    #[test]
    fn test_contains() {
        let outer = TextEdit::new(0, 20, "a".to_string());
        let inner = TextEdit::new(5, 15, "b".to_string());
        let straddling = TextEdit::new(15, 25, "c".to_string());

        assert!(outer.contains(&inner));
        assert!(outer.contains(&outer));
        assert!(!inner.contains(&outer));
        assert!(!outer.contains(&straddling));
    }

    #[test]
    fn test_validate_edit_invalid_order() {
        let edit = TextEdit::new(10, 5, "x".to_string());
        assert!(matches!(
            edit.validate(&"y".repeat(20)),
            Err(FixError::InvalidEditOrder { .. })
        ));
    }

    #[test]
    fn test_validate_edit_exceeds_length() {
        let edit = TextEdit::new(0, 15, "x".to_string());
        assert!(matches!(
            edit.validate(&"y".repeat(10)),
            Err(FixError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_validate_edit_splitting_a_char() {
        let edit = TextEdit::new(1, 2, "x".to_string());
        assert_eq!(edit.validate("é"), Err(FixError::NotCharBoundary(1)));
    }

    #[test]
    fn test_validate_edits_overlapping() {
        let edits = vec![
            TextEdit::new(0, 10, "a".to_string()),
            TextEdit::new(5, 15, "b".to_string()),
        ];
        assert_eq!(
            validate_edits(&edits, &"y".repeat(20)),
            Err(FixError::OverlappingEdits(5))
        );
    }

    #[test]
    fn test_apply_single_replacement() {
        let source = "x = 1\nWith p\n    .A = 2\nEnd With\n";
        let start = source.find("With").unwrap();
        let end = source.rfind("With").unwrap() + 4;
        let edit = TextEdit::replace(start, end, "Dim w = p\nw.A = 2".to_string());
        let result = apply_edit(source, &edit).unwrap();
        assert_eq!(result, "x = 1\nDim w = p\nw.A = 2\n");
    }

    #[test]
    fn test_apply_edits_reversed_order() {
        let source = "abc def ghi";
        let edits = vec![
            TextEdit::replace(8, 11, "3".to_string()),
            TextEdit::replace(0, 3, "1".to_string()),
            TextEdit::replace(4, 7, "2".to_string()),
        ];
        let result = apply_edits(source, &edits).unwrap();
        assert_eq!(result, "1 2 3");
    }

    #[test]
    fn test_no_edits_is_identity() {
        assert_eq!(apply_edits("unchanged", &[]).unwrap(), "unchanged");
    }
}
