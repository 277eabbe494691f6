use std::sync::Arc;

use crate::diagnostics::{Applicability, Suggestion};
use crate::fix::TextEdit;
use crate::lint::{
    FixDescriptor, FixSettings, LintCategory, LintContext, LintDescriptor, LintRule,
};
use crate::naming::{NameGenerator, ScopedNameGenerator, TypeEnv, binding_base, infer_type_hint};
use crate::rewrite::rewrite_with_block;
use crate::syntax::ast::{CompilationUnit, Item, Stmt, TextRange, WithBlock};
use crate::syntax::lexer::contains_comment;
use crate::syntax::printer::render_statements;
use crate::trace_debug;

// ============================================================================
// WithBlockLint
// ============================================================================

pub const WITH_BLOCK_MESSAGE: &str = "Don't use With blocks";
pub const WITH_BLOCK_FIX_MESSAGE: &str = "Replace With block with local variable";

const HELP: &str = "assign the expression to a local variable and qualify members with it";

pub static WITH_BLOCK: LintDescriptor = LintDescriptor {
    name: "with_block",
    code: "WITHOUT001",
    category: LintCategory::Design,
    description: "`With` blocks hide the receiver of member accesses; use a local variable instead",
    fix: FixDescriptor::available(WITH_BLOCK_FIX_MESSAGE),
};

/// One reported `With` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// From `With` through `End With`.
    pub range: TextRange,
    pub rule: &'static str,
    pub code: &'static str,
    pub message: &'static str,
}

impl Finding {
    fn for_block(block: &WithBlock) -> Self {
        Self {
            range: block.range,
            rule: WITH_BLOCK.name,
            code: WITH_BLOCK.code,
            message: WITH_BLOCK_MESSAGE,
        }
    }
}

/// Every `With` block in `unit`, nested ones included, in source order.
pub fn scan(unit: &CompilationUnit) -> Vec<Finding> {
    collect_blocks(unit)
        .into_iter()
        .map(Finding::for_block)
        .collect()
}

fn collect_blocks(unit: &CompilationUnit) -> Vec<&WithBlock> {
    // Walks by hand rather than through `Visitor` so the results can borrow
    // from `unit`.
    struct Collector<'a> {
        blocks: Vec<&'a WithBlock>,
    }

    impl<'a> Collector<'a> {
        fn items(&mut self, items: &'a [Item]) {
            for item in items {
                match item {
                    Item::Type(decl) => self.items(&decl.members),
                    Item::Method(method) => self.body(&method.body),
                    Item::Statement(stmt) => self.stmt(stmt),
                    Item::Imports(_) | Item::Field(_) => {}
                }
            }
        }

        fn body(&mut self, body: &'a [Arc<Stmt>]) {
            for stmt in body {
                self.stmt(stmt);
            }
        }

        fn stmt(&mut self, stmt: &'a Stmt) {
            match stmt {
                Stmt::With(block) => {
                    self.blocks.push(block);
                    self.body(&block.body);
                }
                Stmt::If(block) => {
                    self.body(&block.then_body);
                    for clause in &block.else_ifs {
                        self.body(&clause.body);
                    }
                    if let Some(body) = &block.else_body {
                        self.body(body);
                    }
                }
                Stmt::For(block) => self.body(&block.body),
                Stmt::ForEach(block) => self.body(&block.body),
                Stmt::While(block) => self.body(&block.body),
                Stmt::Local(_) | Stmt::Assign(_) | Stmt::Expr(_) | Stmt::Return(_) => {}
            }
        }
    }

    let mut collector = Collector { blocks: Vec::new() };
    collector.items(&unit.items);
    collector.blocks
}

/// Reports every `With` block and offers to replace it with a local binding.
#[derive(Debug, Clone, Default)]
pub struct WithBlockLint {
    fix: FixSettings,
}

impl WithBlockLint {
    pub fn new(fix: FixSettings) -> Self {
        Self { fix }
    }
}

impl LintRule for WithBlockLint {
    fn descriptor(&self) -> &'static LintDescriptor {
        &WITH_BLOCK
    }

    fn check(&self, unit: &CompilationUnit, ctx: &mut LintContext<'_>) {
        let lint = self.descriptor();
        if !ctx.is_enabled(lint) {
            return;
        }

        let blocks = collect_blocks(unit);
        if blocks.is_empty() {
            return;
        }

        let env = self.fix.type_hints.then(|| TypeEnv::from_unit(unit));
        let mut names = ScopedNameGenerator::for_unit(unit);
        let source = ctx.source();

        for block in blocks {
            let finding = Finding::for_block(block);
            let suggestion = self.suggest(block, source, env.as_ref(), &mut names);
            ctx.report_with_suggestion(
                lint,
                finding.range,
                finding.message,
                Some(HELP.to_string()),
                suggestion,
            );
        }
    }
}

impl WithBlockLint {
    fn suggest(
        &self,
        block: &WithBlock,
        source: &str,
        env: Option<&TypeEnv>,
        names: &mut impl NameGenerator,
    ) -> Option<Suggestion> {
        let hint = match (env, &block.expr) {
            (Some(env), Some(expr)) => infer_type_hint(expr, env),
            _ => None,
        };
        let name = names.fresh_name(&binding_base(&self.fix.binding_prefix, hint.as_deref()));

        let statements = match rewrite_with_block(block, &name) {
            Ok(statements) => statements,
            Err(err) => {
                trace_debug!(error = %err, start = block.range.start, "no fix for With block");
                return None;
            }
        };

        let indent = line_indent(source, block.range.start);
        let eol = line_ending(source, block.range.start);
        // The rendering drops comments.
        let applicability = if contains_comment(&source[block.range.start..block.range.end]) {
            Applicability::MaybeIncorrect
        } else {
            Applicability::MachineApplicable
        };
        Some(Suggestion {
            message: WITH_BLOCK_FIX_MESSAGE.to_string(),
            edit: TextEdit::replace(
                block.range.start,
                block.range.end,
                indent_continuation_lines(&render_statements(&statements), indent, eol),
            ),
            applicability,
        })
    }
}

/// Leading whitespace of the line containing `offset`, up to `offset`.
fn line_indent(source: &str, offset: usize) -> &str {
    let line_start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    let prefix = &source[line_start..offset];
    let end = prefix
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(prefix.len());
    &prefix[..end]
}

/// `"\r\n"` when the line containing `offset` ends in CRLF, else `"\n"`.
fn line_ending(source: &str, offset: usize) -> &'static str {
    match source[offset..].find('\n') {
        Some(i) if source[..offset + i].ends_with('\r') => "\r\n",
        _ => "\n",
    }
}

/// Join the lines of `text` with `eol`, prefixing every line but the first
/// with `indent`; the first line replaces text that already sits after the
/// indentation.
fn indent_continuation_lines(text: &str, indent: &str, eol: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push_str(eol);
            out.push_str(indent);
        }
        out.push_str(line);
    }
    out
}
