//! Auto-fix application module.
//!
//! This module handles applying machine-applicable fix suggestions to source
//! files and rendering the result as a unified diff.

use crate::diagnostics::{Applicability, Diagnostic};
use crate::fix::{self, TextEdit};
use crate::trace_debug;
use std::path::Path;

/// Result of applying fixes to a source file.
#[derive(Debug)]
pub struct FixResult {
    /// The modified source code.
    pub fixed_source: String,
    /// Number of fixes applied.
    pub fixes_applied: usize,
    /// `MaybeIncorrect` suggestions left out because `allow_unsafe` was unset.
    pub fixes_skipped: usize,
    /// Fixes nested inside an applied fix. They target text that was just
    /// replaced and must be recomputed from the fixed source.
    pub fixes_deferred: usize,
}

/// Error when applying fixes.
#[derive(Debug, thiserror::Error)]
pub enum FixError {
    #[error("Overlapping fixes detected at byte {0} - cannot safely apply")]
    OverlappingFixes(usize),

    #[error(transparent)]
    Edit(#[from] fix::FixError),
}

/// Apply fixes from diagnostics to source code.
///
/// # Arguments
/// * `source` - The original source code
/// * `diagnostics` - Diagnostics with fix suggestions
/// * `allow_unsafe` - Whether to apply `MaybeIncorrect` fixes
///
/// When one fix lies inside another, only the outer one is applied and the
/// inner one is counted as deferred. Partially overlapping fixes are an error.
pub fn apply_fixes(
    source: &str,
    diagnostics: &[Diagnostic],
    allow_unsafe: bool,
) -> Result<FixResult, FixError> {
    let mut candidates: Vec<&TextEdit> = Vec::new();
    let mut skipped = 0;

    for diag in diagnostics {
        let Some(suggestion) = &diag.suggestion else {
            continue;
        };

        if suggestion.applicability == Applicability::MaybeIncorrect && !allow_unsafe {
            skipped += 1;
            continue;
        }

        candidates.push(&suggestion.edit);
    }

    // Outermost first: by start, then longest.
    candidates.sort_by(|a, b| {
        a.start_byte
            .cmp(&b.start_byte)
            .then(b.end_byte.cmp(&a.end_byte))
    });

    let mut selected: Vec<TextEdit> = Vec::new();
    let mut deferred = 0;
    for edit in candidates {
        if selected.iter().any(|s| s.contains(edit)) {
            deferred += 1;
            continue;
        }
        if selected.iter().any(|s| s.overlaps_with(edit)) {
            return Err(FixError::OverlappingFixes(edit.start_byte));
        }
        selected.push(edit.clone());
    }

    let fixed_source = fix::apply_edits(source, &selected)?;
    trace_debug!(
        applied = selected.len(),
        skipped,
        deferred,
        "applied fixes"
    );

    Ok(FixResult {
        fixed_source,
        fixes_applied: selected.len(),
        fixes_skipped: skipped,
        fixes_deferred: deferred,
    })
}

// ============================================================================
// Diff rendering
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DiffOp<'a> {
    Equal(&'a str),
    Delete(&'a str),
    Insert(&'a str),
}

/// Line diff by longest common subsequence, after trimming the common prefix
/// and suffix.
fn diff_lines<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<DiffOp<'a>> {
    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();
    let a = &old[prefix..old.len() - suffix];
    let b = &new[prefix..new.len() - suffix];

    // lcs[i][j] = length of the LCS of a[i..] and b[j..]
    let (n, m) = (a.len(), b.len());
    let mut lcs = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(old.len().max(new.len()));
    ops.extend(old[..prefix].iter().map(|&l| DiffOp::Equal(l)));
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            ops.push(DiffOp::Equal(a[i]));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            ops.push(DiffOp::Delete(a[i]));
            i += 1;
        } else {
            ops.push(DiffOp::Insert(b[j]));
            j += 1;
        }
    }
    ops.extend(a[i..].iter().map(|&l| DiffOp::Delete(l)));
    ops.extend(b[j..].iter().map(|&l| DiffOp::Insert(l)));
    ops.extend(old[old.len() - suffix..].iter().map(|&l| DiffOp::Equal(l)));
    ops
}

/// Generate a unified diff between original and fixed source.
///
/// Includes context lines (3 lines before and after each change) for better readability.
pub fn format_diff(original: &str, fixed: &str, path: &Path) -> String {
    format_diff_with_context(original, fixed, path, 3)
}

/// Generate a unified diff with configurable context lines.
pub fn format_diff_with_context(
    original: &str,
    fixed: &str,
    path: &Path,
    context: usize,
) -> String {
    let orig_lines: Vec<&str> = original.lines().collect();
    let fixed_lines: Vec<&str> = fixed.lines().collect();
    let ops = diff_lines(&orig_lines, &fixed_lines);

    // Group changed ops into hunks (as op index ranges) with context
    let mut hunks: Vec<(usize, usize)> = Vec::new();
    for (i, op) in ops.iter().enumerate() {
        if matches!(op, DiffOp::Equal(_)) {
            continue;
        }
        let start = i.saturating_sub(context);
        let end = (i + context + 1).min(ops.len());
        match hunks.last_mut() {
            Some(last) if start <= last.1 => last.1 = end,
            _ => hunks.push((start, end)),
        }
    }

    if hunks.is_empty() {
        return String::new();
    }

    // Line numbers (0-based) in the old and new text before each op
    let mut positions = Vec::with_capacity(ops.len() + 1);
    let (mut old_line, mut new_line) = (0usize, 0usize);
    for op in &ops {
        positions.push((old_line, new_line));
        match op {
            DiffOp::Equal(_) => {
                old_line += 1;
                new_line += 1;
            }
            DiffOp::Delete(_) => old_line += 1,
            DiffOp::Insert(_) => new_line += 1,
        }
    }

    let path_str = path.display().to_string();
    let mut output = String::new();
    output.push_str(&format!("--- a/{path_str}\n"));
    output.push_str(&format!("+++ b/{path_str}\n"));

    for (start, end) in hunks {
        let hunk = &ops[start..end];
        let orig_size = hunk
            .iter()
            .filter(|op| !matches!(op, DiffOp::Insert(_)))
            .count();
        let fixed_size = hunk
            .iter()
            .filter(|op| !matches!(op, DiffOp::Delete(_)))
            .count();
        let (old_start, new_start) = positions[start];

        output.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            hunk_start(old_start, orig_size),
            orig_size,
            hunk_start(new_start, fixed_size),
            fixed_size
        ));

        for op in hunk {
            let (marker, line) = match op {
                DiffOp::Equal(line) => (' ', line),
                DiffOp::Delete(line) => ('-', line),
                DiffOp::Insert(line) => ('+', line),
            };
            output.push(marker);
            output.push_str(line);
            output.push('\n');
        }
    }

    output
}

/// 1-based start line for a hunk header; an empty side names the line before.
fn hunk_start(zero_based: usize, size: usize) -> usize {
    if size == 0 { zero_based } else { zero_based + 1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Span, Suggestion};
    use crate::level::LintLevel;
    use crate::rules::WITH_BLOCK;
    use crate::syntax::ast::TextRange;

    fn diag_with_edit(source: &str, edit: TextEdit, applicability: Applicability) -> Diagnostic {
        Diagnostic {
            lint: &WITH_BLOCK,
            level: LintLevel::Warn,
            file: None,
            span: Span::from_range(source, TextRange::new(edit.start_byte, edit.end_byte)),
            message: "test".into(),
            help: None,
            suggestion: Some(Suggestion {
                message: "Replace".into(),
                edit,
                applicability,
            }),
        }
    }

    #[test]
    fn test_apply_single_fix() {
        let source = "With p\n    .A = 1\nEnd With\n";
        let edit = TextEdit::replace(0, source.len() - 1, "Dim w = p\nw.A = 1".to_string());
        let diag = diag_with_edit(source, edit, Applicability::MachineApplicable);

        let result = apply_fixes(source, &[diag], false).unwrap();
        assert_eq!(result.fixed_source, "Dim w = p\nw.A = 1\n");
        assert_eq!(result.fixes_applied, 1);
        assert_eq!(result.fixes_deferred, 0);
    }

    #[test]
    fn test_nested_fix_is_deferred() {
        let source = "0123456789";
        let outer = diag_with_edit(
            source,
            TextEdit::replace(2, 8, "X".to_string()),
            Applicability::MachineApplicable,
        );
        let inner = diag_with_edit(
            source,
            TextEdit::replace(4, 6, "Y".to_string()),
            Applicability::MachineApplicable,
        );

        // Order of diagnostics does not matter.
        let result = apply_fixes(source, &[inner, outer], false).unwrap();
        assert_eq!(result.fixed_source, "01X89");
        assert_eq!(result.fixes_applied, 1);
        assert_eq!(result.fixes_deferred, 1);
    }

    #[test]
    fn test_partial_overlap_is_rejected() {
        let source = "0123456789";
        let a = diag_with_edit(
            source,
            TextEdit::replace(2, 6, "X".to_string()),
            Applicability::MachineApplicable,
        );
        let b = diag_with_edit(
            source,
            TextEdit::replace(4, 8, "Y".to_string()),
            Applicability::MachineApplicable,
        );
        assert!(matches!(
            apply_fixes(source, &[a, b], false),
            Err(FixError::OverlappingFixes(4))
        ));
    }

    #[test]
    fn test_unsafe_fixes_need_opt_in() {
        let source = "abc";
        let diag = || {
            diag_with_edit(
                source,
                TextEdit::replace(0, 1, "z".to_string()),
                Applicability::MaybeIncorrect,
            )
        };

        let result = apply_fixes(source, &[diag()], false).unwrap();
        assert_eq!(result.fixed_source, "abc");
        assert_eq!(result.fixes_skipped, 1);

        let result = apply_fixes(source, &[diag()], true).unwrap();
        assert_eq!(result.fixed_source, "zbc");
    }

    #[test]
    fn test_format_diff_with_inserted_lines() {
        let original = "Sub Main()\n    With p\n        .A = 1\n    End With\nEnd Sub\n";
        let fixed = "Sub Main()\n    Dim w = p\n    w.A = 1\nEnd Sub\n";
        let diff = format_diff(original, fixed, Path::new("Program.vb"));

        assert_eq!(
            diff,
            "--- a/Program.vb\n\
             +++ b/Program.vb\n\
             @@ -1,5 +1,4 @@\n \
             Sub Main()\n\
             -    With p\n\
             -        .A = 1\n\
             -    End With\n\
             +    Dim w = p\n\
             +    w.A = 1\n \
             End Sub\n"
        );
    }

    #[test]
    fn test_format_diff_separates_distant_hunks() {
        let original: String = (1..=20).map(|i| format!("line{i}\n")).collect();
        let fixed = original
            .replace("line2\n", "LINE2\n")
            .replace("line18\n", "LINE18\n");
        let diff = format_diff(&original, &fixed, Path::new("a.vb"));
        assert!(diff.contains("@@ -1,5 +1,5 @@"));
        assert!(diff.contains("@@ -15,6 +15,6 @@"));
        assert!(diff.contains("-line2\n+LINE2\n"));
    }

    #[test]
    fn test_identical_sources_have_empty_diff() {
        assert!(format_diff("a\nb\n", "a\nb\n", Path::new("x.vb")).is_empty());
    }
}
