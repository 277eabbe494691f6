use crate::diagnostics::{Diagnostic, Span, Suggestion};
use crate::level::LintLevel;
use crate::naming::DEFAULT_BINDING_PREFIX;
use crate::syntax::ast::{CompilationUnit, TextRange};
use anyhow::{Result, anyhow};
use std::collections::{HashMap, HashSet};

/// Descriptor for an auto-fix associated with a lint rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixDescriptor {
    /// Whether an auto-fix is available for this lint.
    pub available: bool,
    /// Human-readable description of what the fix does.
    pub description: &'static str,
}

impl FixDescriptor {
    pub const fn available(description: &'static str) -> Self {
        Self {
            available: true,
            description,
        }
    }
}

// ============================================================================
// Lint Categories
// ============================================================================

/// High-level categories used to group lints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LintCategory {
    /// Constructs that obscure what code operates on.
    Design,
}

impl LintCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LintCategory::Design => "design",
        }
    }
}

/// Static metadata describing a lint rule.
#[derive(Debug)]
pub struct LintDescriptor {
    pub name: &'static str,
    /// Stable diagnostic code, e.g. `WITHOUT001`. Accepted wherever a lint
    /// name is.
    pub code: &'static str,
    pub category: LintCategory,
    pub description: &'static str,
    pub fix: FixDescriptor,
}

/// A single lint rule that can inspect a syntax tree.
pub trait LintRule: Send + Sync {
    fn descriptor(&self) -> &'static LintDescriptor;
    fn check(&self, unit: &CompilationUnit, ctx: &mut LintContext<'_>);
}

/// Per-lint configuration derived from `without.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintSettings {
    levels: HashMap<String, LintLevel>,
}

impl LintSettings {
    #[must_use]
    pub fn with_config_levels(mut self, levels: HashMap<String, LintLevel>) -> Self {
        for (name, level) in levels {
            let canonical = resolve_lint_alias(&name);
            self.levels.insert(canonical.to_string(), level);
        }
        self
    }

    #[must_use]
    pub fn disable(mut self, disabled: impl IntoIterator<Item = String>) -> Self {
        for name in disabled {
            let canonical = resolve_lint_alias(&name);
            self.levels.insert(canonical.to_string(), LintLevel::Allow);
        }
        self
    }

    pub fn level_for(&self, lint_name: &str) -> LintLevel {
        if let Some(&level) = self.levels.get(lint_name) {
            return level;
        }
        let canonical = resolve_lint_alias(lint_name);
        self.levels.get(canonical).copied().unwrap_or_default()
    }
}

/// Options that shape the replacement text of fixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixSettings {
    /// Prefix of generated binding names.
    pub binding_prefix: String,
    /// Append the syntactically evident type to binding names.
    pub type_hints: bool,
}

impl Default for FixSettings {
    fn default() -> Self {
        Self {
            binding_prefix: DEFAULT_BINDING_PREFIX.to_string(),
            type_hints: true,
        }
    }
}

/// Mutable context passed to lint rules while traversing a file.
pub struct LintContext<'src> {
    source: &'src str,
    settings: LintSettings,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> LintContext<'src> {
    pub fn new(source: &'src str, settings: LintSettings) -> Self {
        Self {
            source,
            settings,
            diagnostics: Vec::new(),
        }
    }

    /// Whether `lint` would be reported at all; rules use this to skip
    /// building suggestions nobody will see.
    pub fn is_enabled(&self, lint: &'static LintDescriptor) -> bool {
        self.settings.level_for(lint.name) != LintLevel::Allow
    }

    pub fn report_with_suggestion(
        &mut self,
        lint: &'static LintDescriptor,
        range: TextRange,
        message: impl Into<String>,
        help: Option<String>,
        suggestion: Option<Suggestion>,
    ) {
        let level = self.settings.level_for(lint.name);
        if level == LintLevel::Allow {
            return;
        }

        self.diagnostics.push(Diagnostic {
            lint,
            level,
            file: None,
            span: Span::from_range(self.source, range),
            message: message.into(),
            help,
            suggestion,
        });
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    #[must_use]
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

// ============================================================================
// Lint Name Aliases
// ============================================================================

/// Resolve a lint name to its canonical form.
///
/// Diagnostic codes (`WITHOUT001`, any case) resolve to the lint's name.
/// Anything else is returned unchanged.
pub fn resolve_lint_alias(name: &str) -> &str {
    crate::rules::ALL_DESCRIPTORS
        .iter()
        .find(|d| d.code.eq_ignore_ascii_case(name))
        .map_or(name, |d| d.name)
}

/// Check if a name is a known alias (not the canonical name).
pub fn is_lint_alias(name: &str) -> bool {
    resolve_lint_alias(name) != name
}

pub fn all_known_lints() -> HashSet<&'static str> {
    crate::rules::ALL_DESCRIPTORS.iter().map(|d| d.name).collect()
}

/// Registry of lint rules run by the engine.
pub struct LintRegistry {
    rules: Vec<Box<dyn LintRule>>,
}

impl Default for LintRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LintRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    #[must_use]
    pub fn with_rule(mut self, rule: impl LintRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn LintRule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &'static LintDescriptor> + '_ {
        self.rules.iter().map(|r| r.descriptor())
    }

    pub fn find_descriptor(&self, name: &str) -> Option<&'static LintDescriptor> {
        let canonical = resolve_lint_alias(name);
        self.descriptors().find(|d| d.name == canonical)
    }

    #[must_use = "registry should be used to create an engine"]
    pub fn default_rules(fix: &FixSettings) -> Self {
        crate::rules::build_registry(fix)
    }

    /// Default rules minus those excluded by `only`, `skip` and `disabled`.
    ///
    /// # Errors
    ///
    /// Returns error if any lint name in `only`, `skip`, or `disabled` is unknown.
    pub fn default_rules_filtered(
        only: &[String],
        skip: &[String],
        disabled: &[String],
        fix: &FixSettings,
    ) -> Result<Self> {
        let known = all_known_lints();

        for n in only.iter().chain(skip.iter()).chain(disabled.iter()) {
            if !known.contains(resolve_lint_alias(n)) {
                return Err(anyhow!("unknown lint: {n}"));
            }
        }

        let only_set: Option<HashSet<&str>> = if only.is_empty() {
            None
        } else {
            Some(only.iter().map(|s| resolve_lint_alias(s)).collect())
        };
        let excluded: HashSet<&str> = skip
            .iter()
            .chain(disabled.iter())
            .map(|s| resolve_lint_alias(s))
            .collect();

        let mut reg = Self::new();
        for rule in Self::default_rules(fix).rules {
            let name = rule.descriptor().name;
            if let Some(ref only) = only_set
                && !only.contains(name)
            {
                continue;
            }
            if excluded.contains(name) {
                continue;
            }
            reg.rules.push(rule);
        }

        Ok(reg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_resolve_to_names() {
        assert_eq!(resolve_lint_alias("WITHOUT001"), "with_block");
        assert_eq!(resolve_lint_alias("without001"), "with_block");
        assert_eq!(resolve_lint_alias("with_block"), "with_block");
        assert_eq!(resolve_lint_alias("nope"), "nope");
        assert!(is_lint_alias("WITHOUT001"));
        assert!(!is_lint_alias("with_block"));
    }

    #[test]
    fn settings_levels_accept_codes() {
        let settings = LintSettings::default().with_config_levels(HashMap::from([(
            "WITHOUT001".to_string(),
            LintLevel::Error,
        )]));
        assert_eq!(settings.level_for("with_block"), LintLevel::Error);
        assert_eq!(settings.level_for("WITHOUT001"), LintLevel::Error);
    }

    #[test]
    fn disabled_lints_are_allowed() {
        let settings = LintSettings::default().disable(["with_block".to_string()]);
        assert_eq!(settings.level_for("with_block"), LintLevel::Allow);
    }

    #[test]
    fn unknown_lint_in_filter_is_rejected() {
        let err = LintRegistry::default_rules_filtered(
            &["bogus".to_string()],
            &[],
            &[],
            &FixSettings::default(),
        )
        .err()
        .expect("unknown lint should fail");
        assert!(err.to_string().contains("unknown lint: bogus"));
    }

    #[test]
    fn skip_removes_rule() {
        let reg = LintRegistry::default_rules_filtered(
            &[],
            &["WITHOUT001".to_string()],
            &[],
            &FixSettings::default(),
        )
        .unwrap();
        assert_eq!(reg.rules().count(), 0);

        let reg = LintRegistry::default_rules_filtered(
            &["with_block".to_string()],
            &[],
            &[],
            &FixSettings::default(),
        )
        .unwrap();
        assert!(reg.find_descriptor("WITHOUT001").is_some());
    }
}
