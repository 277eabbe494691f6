//! Renders trees back to source text.
//!
//! Output is canonical rather than faithful: keywords are capitalized, one
//! statement per line, bodies indented by four spaces. Parenthesized
//! expressions keep their parentheses, and extra ones are only added where a
//! synthesized tree would otherwise re-parse differently.

use std::sync::Arc;

use super::ast::*;

const INDENT: &str = "    ";

/// Render a statement list, one line per statement, joined by `\n` with no
/// trailing newline.
pub fn render_statements(body: &[Arc<Stmt>]) -> String {
    let mut printer = Printer::default();
    printer.body(body);
    printer.finish()
}

pub fn render_expr(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr);
    out
}

/// Render a whole file, ending with a newline.
pub fn render_unit(unit: &CompilationUnit) -> String {
    let mut printer = Printer::default();
    for item in &unit.items {
        printer.item(item);
    }
    let mut out = printer.finish();
    out.push('\n');
    out
}

#[derive(Default)]
struct Printer {
    lines: Vec<String>,
    depth: usize,
}

impl Printer {
    fn finish(self) -> String {
        self.lines.join("\n")
    }

    fn line(&mut self, text: impl AsRef<str>) {
        let mut line = INDENT.repeat(self.depth);
        line.push_str(text.as_ref());
        self.lines.push(line);
    }

    fn nested(&mut self, body: &[Arc<Stmt>]) {
        self.depth += 1;
        self.body(body);
        self.depth -= 1;
    }

    fn body(&mut self, body: &[Arc<Stmt>]) {
        for stmt in body {
            self.stmt(stmt);
        }
    }

    fn item(&mut self, item: &Item) {
        match item {
            Item::Imports(imports) => self.line(format!("Imports {}", imports.path.path())),
            Item::Type(decl) => {
                self.line(format!(
                    "{}{} {}",
                    modifiers(&decl.modifiers),
                    decl.kind.keyword(),
                    decl.name.name
                ));
                self.depth += 1;
                for member in &decl.members {
                    self.item(member);
                }
                self.depth -= 1;
                self.line(format!("End {}", decl.kind.keyword()));
            }
            Item::Method(method) => {
                let params = method
                    .params
                    .iter()
                    .map(param)
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut header = format!(
                    "{}{} {}({})",
                    modifiers(&method.modifiers),
                    method.kind.keyword(),
                    method.name.name,
                    params
                );
                if let Some(ty) = &method.return_type {
                    header.push_str(" As ");
                    header.push_str(&ty.path());
                }
                self.line(header);
                self.nested(&method.body);
                self.line(format!("End {}", method.kind.keyword()));
            }
            Item::Field(field) => {
                let lead = if field.modifiers.is_empty() {
                    "Dim ".to_string()
                } else {
                    modifiers(&field.modifiers)
                };
                self.line(format!("{lead}{}", declarator(&field.decl)));
            }
            Item::Statement(stmt) => self.stmt(stmt),
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Local(decl) => self.line(format!("Dim {}", declarator(decl))),
            Stmt::Assign(assign) => self.line(format!(
                "{} {} {}",
                render_expr(&assign.target),
                assign.op.as_str(),
                render_expr(&assign.value)
            )),
            Stmt::Expr(expr_stmt) => {
                let call = if expr_stmt.call_keyword { "Call " } else { "" };
                self.line(format!("{call}{}", render_expr(&expr_stmt.expr)));
            }
            Stmt::With(block) => {
                match &block.expr {
                    Some(expr) => self.line(format!("With {}", render_expr(expr))),
                    None => self.line("With"),
                }
                self.nested(&block.body);
                self.line("End With");
            }
            Stmt::If(block) => {
                self.line(format!("If {} Then", render_expr(&block.condition)));
                self.nested(&block.then_body);
                for clause in &block.else_ifs {
                    self.line(format!("ElseIf {} Then", render_expr(&clause.condition)));
                    self.nested(&clause.body);
                }
                if let Some(body) = &block.else_body {
                    self.line("Else");
                    self.nested(body);
                }
                self.line("End If");
            }
            Stmt::For(block) => {
                let mut header = format!(
                    "For {} = {} To {}",
                    block.var.name,
                    render_expr(&block.start),
                    render_expr(&block.end)
                );
                if let Some(step) = &block.step {
                    header.push_str(" Step ");
                    header.push_str(&render_expr(step));
                }
                self.line(header);
                self.nested(&block.body);
                self.line("Next");
            }
            Stmt::ForEach(block) => {
                self.line(format!(
                    "For Each {} In {}",
                    block.var.name,
                    render_expr(&block.iterable)
                ));
                self.nested(&block.body);
                self.line("Next");
            }
            Stmt::While(block) => {
                self.line(format!("While {}", render_expr(&block.condition)));
                self.nested(&block.body);
                self.line("End While");
            }
            Stmt::Return(ret) => match &ret.value {
                Some(value) => self.line(format!("Return {}", render_expr(value))),
                None => self.line("Return"),
            },
        }
    }
}

fn modifiers(modifiers: &[Modifier]) -> String {
    modifiers
        .iter()
        .map(|m| format!("{} ", m.keyword()))
        .collect()
}

fn param(param: &Param) -> String {
    let mut out = match param.passing {
        Some(PassingMode::ByVal) => "ByVal ".to_string(),
        Some(PassingMode::ByRef) => "ByRef ".to_string(),
        None => String::new(),
    };
    out.push_str(&param.name.name);
    if let Some(ty) = &param.type_ref {
        out.push_str(" As ");
        out.push_str(&ty.path());
    }
    out
}

/// `name [As T] [= init]`, or `name As New T(..)`.
fn declarator(decl: &LocalDecl) -> String {
    let mut out = decl.name.name.clone();
    match (&decl.init, decl.as_new) {
        (Some(init), true) => {
            out.push_str(" As ");
            write_expr(&mut out, init);
        }
        (init, _) => {
            if let Some(ty) = &decl.type_ref {
                out.push_str(" As ");
                out.push_str(&ty.path());
            }
            if let Some(init) = init {
                out.push_str(" = ");
                write_expr(&mut out, init);
            }
        }
    }
    out
}

fn write_expr(out: &mut String, expr: &Expr) {
    match expr {
        Expr::Literal(literal) => write_literal(out, &literal.kind),
        Expr::Name(ident) => out.push_str(&ident.name),
        Expr::MemberAccess(access) => {
            if let Some(receiver) = &access.receiver {
                write_operand(out, receiver, needs_parens_as_receiver(receiver));
            }
            out.push_str(access.operator.as_str());
            out.push_str(&access.name.name);
        }
        Expr::Invocation(call) => {
            write_operand(out, &call.target, needs_parens_as_receiver(&call.target));
            write_args(out, &call.args);
        }
        Expr::New(creation) => {
            out.push_str("New ");
            out.push_str(&creation.type_ref.path());
            if let Some(args) = &creation.args {
                write_args(out, args);
            }
        }
        Expr::Unary(unary) => {
            out.push_str(unary.op.as_str());
            let wrap = match (&*unary.operand, unary.op) {
                (Expr::Binary(inner), UnaryOp::Not) => {
                    inner.op.precedence() < BinaryOp::Eq.precedence()
                }
                (Expr::Binary(_) | Expr::Unary(_), UnaryOp::Neg) => true,
                _ => false,
            };
            write_operand(out, &unary.operand, wrap);
        }
        Expr::Binary(binary) => {
            let prec = binary.op.precedence();
            write_operand(out, &binary.lhs, needs_parens_in_binary(&binary.lhs, prec, false));
            out.push(' ');
            out.push_str(binary.op.as_str());
            out.push(' ');
            write_operand(out, &binary.rhs, needs_parens_in_binary(&binary.rhs, prec, true));
        }
        Expr::Paren(paren) => {
            out.push('(');
            write_expr(out, &paren.inner);
            out.push(')');
        }
    }
}

fn write_operand(out: &mut String, expr: &Expr, wrap: bool) {
    if wrap {
        out.push('(');
        write_expr(out, expr);
        out.push(')');
    } else {
        write_expr(out, expr);
    }
}

fn write_args(out: &mut String, args: &[Arc<Expr>]) {
    out.push('(');
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_expr(out, arg);
    }
    out.push(')');
}

fn write_literal(out: &mut String, kind: &LiteralKind) {
    match kind {
        LiteralKind::Integer(value) => out.push_str(&value.to_string()),
        LiteralKind::Float(text) => out.push_str(text),
        LiteralKind::String(value) => {
            out.push('"');
            out.push_str(&value.replace('"', "\"\""));
            out.push('"');
        }
        LiteralKind::Boolean(true) => out.push_str("True"),
        LiteralKind::Boolean(false) => out.push_str("False"),
        LiteralKind::Nothing => out.push_str("Nothing"),
    }
}

fn needs_parens_as_receiver(expr: &Expr) -> bool {
    matches!(expr, Expr::Binary(_) | Expr::Unary(_))
}

fn needs_parens_in_binary(child: &Expr, parent_prec: u8, is_rhs: bool) -> bool {
    match child {
        Expr::Binary(inner) => {
            let prec = inner.op.precedence();
            prec < parent_prec || (is_rhs && prec == parent_prec)
        }
        Expr::Unary(inner) => {
            inner.op == UnaryOp::Not && parent_prec >= BinaryOp::Eq.precedence()
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{parse_source, parse_statements};

    fn roundtrip(src: &str) -> String {
        render_statements(&parse_statements(src).unwrap())
    }

    #[test]
    fn renders_with_block_indented() {
        assert_eq!(
            roundtrip("with p\n.name = \"x\"\n  .Save()\nend with"),
            "With p\n    .name = \"x\"\n    .Save()\nEnd With"
        );
    }

    #[test]
    fn renders_declarations() {
        assert_eq!(
            roundtrip("Dim a As Integer = 1\nDim b As New List()\nDim c = New Person"),
            "Dim a As Integer = 1\nDim b As New List()\nDim c = New Person"
        );
    }

    #[test]
    fn escapes_quotes_in_strings() {
        assert_eq!(roundtrip(r#"s = "say ""hi""""#), r#"s = "say ""hi""""#);
    }

    #[test]
    fn keeps_source_parentheses_and_bang() {
        assert_eq!(
            roundtrip("x = (a + b) * c!Key"),
            "x = (a + b) * c!Key"
        );
    }

    #[test]
    fn adds_parentheses_for_synthesized_precedence() {
        let lhs = Arc::new(Expr::Binary(BinaryExpr {
            op: BinaryOp::Add,
            lhs: Expr::name("a"),
            rhs: Expr::name("b"),
            range: TextRange::detached(),
        }));
        let product = Expr::Binary(BinaryExpr {
            op: BinaryOp::Mul,
            lhs,
            rhs: Expr::name("c"),
            range: TextRange::detached(),
        });
        assert_eq!(render_expr(&product), "(a + b) * c");
    }

    #[test]
    fn renders_control_flow() {
        let src = "If a Then\nx = 1\nElseIf b Then\nx = 2\nElse\nx = 3\nEnd If\n\
                   For i = 1 To 10 Step 2\nNext\nFor Each v In items\nNext v\n\
                   While Not done\nReturn\nEnd While";
        assert_eq!(
            roundtrip(src),
            "If a Then\n    x = 1\nElseIf b Then\n    x = 2\nElse\n    x = 3\nEnd If\n\
             For i = 1 To 10 Step 2\nNext\nFor Each v In items\nNext\n\
             While Not done\n    Return\nEnd While"
        );
    }

    #[test]
    fn rendered_unit_parses_to_same_shape() {
        let src = "Imports System.Text\n\
                   Public Module Program\n\
                   Private count As Integer = 0\n\
                   Sub Main(ByVal args As String)\n\
                   With New StringBuilder()\n\
                   .Append(\"a\" & count)\n\
                   End With\n\
                   End Sub\n\
                   End Module\n";
        let first = render_unit(&parse_source(src).unwrap());
        let second = render_unit(&parse_source(&first).unwrap());
        assert_eq!(first, second);
        assert!(first.contains("    Private count As Integer = 0\n"));
        assert!(first.contains("        With New StringBuilder()\n"));
    }
}
