//! Lint engine for Visual Basic `With` blocks.
//!
//! The crate parses a Visual Basic subset into an immutable syntax tree,
//! reports every `With ... End With` block and offers a fix that replaces the
//! block with a local variable:
//!
//! ```text
//! With New Person()              Dim __withPerson1 = New Person()
//!     .Name = "Ada"       =>     __withPerson1.Name = "Ada"
//! End With
//! ```

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fix;
pub mod fixer;
pub mod level;
pub mod lint;
pub mod naming;
pub mod rewrite;
pub mod rules;
pub mod syntax;
pub mod telemetry;

use anyhow::{Context, Result};

use crate::config::WithoutConfig;
use crate::diagnostics::Diagnostic;
use crate::lint::{FixSettings, LintContext, LintRegistry, LintSettings};
use crate::syntax::ast::CompilationUnit;
use crate::syntax::parse_source;

/// Upper bound on lint-and-fix rounds for one source. Each round fixes the
/// outermost remaining blocks, so this is also the deepest nesting fixed.
pub const MAX_FIX_ROUNDS: usize = 10;

/// Engine orchestrates linting by parsing source and running registered rules.
pub struct LintEngine {
    registry: LintRegistry,
    settings: LintSettings,
}

/// What [`LintEngine::fix_source`] did to a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixOutcome {
    pub fixed_source: String,
    pub fixes_applied: usize,
    /// Fixes left out in the final round (`MaybeIncorrect` without opt-in).
    pub fixes_skipped: usize,
    /// Rounds that applied at least one fix.
    pub rounds: usize,
    /// False when [`MAX_FIX_ROUNDS`] ran out before fixes stopped applying.
    pub converged: bool,
}

impl LintEngine {
    /// Create a new engine with default lint settings.
    pub fn new(registry: LintRegistry) -> Self {
        Self {
            registry,
            settings: LintSettings::default(),
        }
    }

    /// Create a new engine with explicit lint settings (e.g. from config).
    pub fn new_with_settings(registry: LintRegistry, settings: LintSettings) -> Self {
        Self { registry, settings }
    }

    /// Build an engine from an optional `without.toml` plus CLI filters.
    ///
    /// # Errors
    ///
    /// Unknown lint names in `only`, `skip` or the config, or an invalid
    /// `[fix]` table.
    pub fn from_config(
        config: Option<&WithoutConfig>,
        only: &[String],
        skip: &[String],
    ) -> Result<Self> {
        let (disabled, settings, fix) = match config {
            Some(cfg) => (
                cfg.lints.disabled.clone(),
                LintSettings::default()
                    .with_config_levels(cfg.lints.levels.clone())
                    .disable(cfg.lints.disabled.clone()),
                cfg.fix.to_settings()?,
            ),
            None => (Vec::new(), LintSettings::default(), FixSettings::default()),
        };

        let known = lint::all_known_lints();
        if let Some(cfg) = config
            && let Some(unknown) = cfg
                .lints
                .levels
                .keys()
                .find(|name| !known.contains(lint::resolve_lint_alias(name)))
        {
            anyhow::bail!("unknown lint in config: {unknown}");
        }

        let registry = LintRegistry::default_rules_filtered(only, skip, &disabled, &fix)?;
        Ok(Self::new_with_settings(registry, settings))
    }

    pub fn registry(&self) -> &LintRegistry {
        &self.registry
    }

    /// Lint a single in-memory source string and return diagnostics.
    pub fn lint_source(&self, source: &str) -> Result<Vec<Diagnostic>> {
        crate::instrument_block!("lint_source", {
            let unit = parse_source(source).context("failed to parse source")?;
            Ok(self.lint_unit(source, &unit))
        })
    }

    /// Run every rule over an already parsed `unit` of `source`.
    pub fn lint_unit(&self, source: &str, unit: &CompilationUnit) -> Vec<Diagnostic> {
        let mut ctx = LintContext::new(source, self.settings.clone());
        for rule in self.registry.rules() {
            rule.check(unit, &mut ctx);
        }
        ctx.into_diagnostics()
    }

    /// Lint and apply machine-applicable fixes until none apply.
    ///
    /// Nested blocks are fixed outermost first, one nesting level per round.
    pub fn fix_source(&self, source: &str) -> Result<FixOutcome> {
        self.fix_source_with(source, false)
    }

    /// Like [`LintEngine::fix_source`], additionally applying
    /// `MaybeIncorrect` fixes when `unsafe_fixes` is set.
    pub fn fix_source_with(&self, source: &str, unsafe_fixes: bool) -> Result<FixOutcome> {
        crate::instrument_block!("fix_source", {
            let mut outcome = FixOutcome {
                fixed_source: source.to_string(),
                fixes_applied: 0,
                fixes_skipped: 0,
                rounds: 0,
                converged: false,
            };

            for _ in 0..MAX_FIX_ROUNDS {
                let diagnostics = self.lint_source(&outcome.fixed_source)?;
                let result = fixer::apply_fixes(&outcome.fixed_source, &diagnostics, unsafe_fixes)?;
                outcome.fixes_skipped = result.fixes_skipped;
                if result.fixes_applied == 0 {
                    outcome.converged = true;
                    break;
                }

                outcome.fixes_applied += result.fixes_applied;
                outcome.rounds += 1;
                outcome.fixed_source = result.fixed_source;
                crate::trace_debug!(
                    round = outcome.rounds,
                    applied = result.fixes_applied,
                    deferred = result.fixes_deferred,
                    "fix round"
                );
            }

            Ok(outcome)
        })
    }
}

/// Construct a `LintEngine` with all built-in lints and default settings.
pub fn create_default_engine() -> LintEngine {
    LintEngine::new(LintRegistry::default_rules(&FixSettings::default()))
}
