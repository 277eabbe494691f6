pub mod with_block;

use crate::lint::{FixSettings, LintDescriptor, LintRegistry};

pub use with_block::{Finding, WITH_BLOCK, WithBlockLint, scan};

/// Descriptors of every built-in lint, in `list-rules` order.
pub static ALL_DESCRIPTORS: &[&LintDescriptor] = &[&WITH_BLOCK];

/// Registry with every built-in lint, configured with `fix`.
pub fn build_registry(fix: &FixSettings) -> LintRegistry {
    LintRegistry::new().with_rule(WithBlockLint::new(fix.clone()))
}
