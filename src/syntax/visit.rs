//! Tree traversal.
//!
//! [`Visitor`] walks a tree read-only. [`Fold`] rebuilds one: every fold
//! method returns `None` when the subtree came out unchanged, so callers keep
//! sharing the original `Arc` and only the path to an edit is reallocated.

use std::sync::Arc;

use super::ast::*;

// ============================================================================
// Visitor
// ============================================================================

pub trait Visitor {
    fn visit_item(&mut self, item: &Item) {
        walk_item(self, item);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_with_block(&mut self, block: &WithBlock) {
        walk_with_block(self, block);
    }

    fn visit_local(&mut self, decl: &LocalDecl) {
        walk_local(self, decl);
    }

    fn visit_param(&mut self, param: &Param) {
        walk_param(self, param);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    fn visit_member_access(&mut self, access: &MemberAccess) {
        walk_member_access(self, access);
    }

    fn visit_ident(&mut self, _ident: &Ident) {}

    fn visit_type_ref(&mut self, _type_ref: &TypeRef) {}
}

pub fn walk_unit<V: Visitor + ?Sized>(v: &mut V, unit: &CompilationUnit) {
    for item in &unit.items {
        v.visit_item(item);
    }
}

pub fn walk_item<V: Visitor + ?Sized>(v: &mut V, item: &Item) {
    match item {
        Item::Imports(imports) => v.visit_type_ref(&imports.path),
        Item::Type(decl) => {
            v.visit_ident(&decl.name);
            for member in &decl.members {
                v.visit_item(member);
            }
        }
        Item::Method(method) => {
            v.visit_ident(&method.name);
            for param in &method.params {
                v.visit_param(param);
            }
            if let Some(ty) = &method.return_type {
                v.visit_type_ref(ty);
            }
            walk_body(v, &method.body);
        }
        Item::Field(field) => v.visit_local(&field.decl),
        Item::Statement(stmt) => v.visit_stmt(stmt),
    }
}

pub fn walk_body<V: Visitor + ?Sized>(v: &mut V, body: &[Arc<Stmt>]) {
    for stmt in body {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: Visitor + ?Sized>(v: &mut V, stmt: &Stmt) {
    match stmt {
        Stmt::Local(decl) => v.visit_local(decl),
        Stmt::Assign(assign) => {
            v.visit_expr(&assign.target);
            v.visit_expr(&assign.value);
        }
        Stmt::Expr(expr_stmt) => v.visit_expr(&expr_stmt.expr),
        Stmt::With(block) => v.visit_with_block(block),
        Stmt::If(block) => {
            v.visit_expr(&block.condition);
            walk_body(v, &block.then_body);
            for clause in &block.else_ifs {
                v.visit_expr(&clause.condition);
                walk_body(v, &clause.body);
            }
            if let Some(body) = &block.else_body {
                walk_body(v, body);
            }
        }
        Stmt::For(block) => {
            v.visit_ident(&block.var);
            v.visit_expr(&block.start);
            v.visit_expr(&block.end);
            if let Some(step) = &block.step {
                v.visit_expr(step);
            }
            walk_body(v, &block.body);
        }
        Stmt::ForEach(block) => {
            v.visit_ident(&block.var);
            v.visit_expr(&block.iterable);
            walk_body(v, &block.body);
        }
        Stmt::While(block) => {
            v.visit_expr(&block.condition);
            walk_body(v, &block.body);
        }
        Stmt::Return(ret) => {
            if let Some(value) = &ret.value {
                v.visit_expr(value);
            }
        }
    }
}

pub fn walk_with_block<V: Visitor + ?Sized>(v: &mut V, block: &WithBlock) {
    if let Some(expr) = &block.expr {
        v.visit_expr(expr);
    }
    walk_body(v, &block.body);
}

pub fn walk_local<V: Visitor + ?Sized>(v: &mut V, decl: &LocalDecl) {
    v.visit_ident(&decl.name);
    if let Some(ty) = &decl.type_ref {
        v.visit_type_ref(ty);
    }
    if let Some(init) = &decl.init {
        v.visit_expr(init);
    }
}

pub fn walk_param<V: Visitor + ?Sized>(v: &mut V, param: &Param) {
    v.visit_ident(&param.name);
    if let Some(ty) = &param.type_ref {
        v.visit_type_ref(ty);
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, expr: &Expr) {
    match expr {
        Expr::Literal(_) => {}
        Expr::Name(ident) => v.visit_ident(ident),
        Expr::MemberAccess(access) => v.visit_member_access(access),
        Expr::Invocation(call) => {
            v.visit_expr(&call.target);
            for arg in &call.args {
                v.visit_expr(arg);
            }
        }
        Expr::New(creation) => {
            v.visit_type_ref(&creation.type_ref);
            for arg in creation.args.iter().flatten() {
                v.visit_expr(arg);
            }
        }
        Expr::Unary(unary) => v.visit_expr(&unary.operand),
        Expr::Binary(binary) => {
            v.visit_expr(&binary.lhs);
            v.visit_expr(&binary.rhs);
        }
        Expr::Paren(paren) => v.visit_expr(&paren.inner),
    }
}

pub fn walk_member_access<V: Visitor + ?Sized>(v: &mut V, access: &MemberAccess) {
    if let Some(receiver) = &access.receiver {
        v.visit_expr(receiver);
    }
    v.visit_ident(&access.name);
}

// ============================================================================
// Fold
// ============================================================================

pub trait Fold {
    fn fold_stmt(&mut self, stmt: &Arc<Stmt>) -> Option<Arc<Stmt>> {
        fold_stmt_children(self, stmt)
    }

    fn fold_with_block(&mut self, block: &WithBlock) -> Option<WithBlock> {
        fold_with_block_children(self, block)
    }

    fn fold_expr(&mut self, expr: &Arc<Expr>) -> Option<Arc<Expr>> {
        fold_expr_children(self, expr)
    }

    fn fold_member_access(&mut self, access: &MemberAccess) -> Option<MemberAccess> {
        fold_member_access_children(self, access)
    }
}

/// Fold every statement of `body`; `None` when none of them changed.
pub fn fold_body<F: Fold + ?Sized>(f: &mut F, body: &[Arc<Stmt>]) -> Option<Vec<Arc<Stmt>>> {
    let mut rebuild = Rebuild::default();
    let folded = rebuild.body(f, body);
    rebuild.finish(folded)
}

/// Records whether any child came back changed while a node is rebuilt.
#[derive(Default)]
struct Rebuild {
    changed: bool,
}

impl Rebuild {
    fn expr<F: Fold + ?Sized>(&mut self, f: &mut F, expr: &Arc<Expr>) -> Arc<Expr> {
        match f.fold_expr(expr) {
            Some(folded) => {
                self.changed = true;
                folded
            }
            None => Arc::clone(expr),
        }
    }

    fn opt_expr<F: Fold + ?Sized>(
        &mut self,
        f: &mut F,
        expr: &Option<Arc<Expr>>,
    ) -> Option<Arc<Expr>> {
        expr.as_ref().map(|e| self.expr(f, e))
    }

    fn exprs<F: Fold + ?Sized>(&mut self, f: &mut F, exprs: &[Arc<Expr>]) -> Vec<Arc<Expr>> {
        exprs.iter().map(|e| self.expr(f, e)).collect()
    }

    fn stmt<F: Fold + ?Sized>(&mut self, f: &mut F, stmt: &Arc<Stmt>) -> Arc<Stmt> {
        match f.fold_stmt(stmt) {
            Some(folded) => {
                self.changed = true;
                folded
            }
            None => Arc::clone(stmt),
        }
    }

    fn body<F: Fold + ?Sized>(&mut self, f: &mut F, body: &[Arc<Stmt>]) -> Vec<Arc<Stmt>> {
        body.iter().map(|s| self.stmt(f, s)).collect()
    }

    fn finish<T>(self, value: T) -> Option<T> {
        self.changed.then_some(value)
    }
}

pub fn fold_stmt_children<F: Fold + ?Sized>(f: &mut F, stmt: &Arc<Stmt>) -> Option<Arc<Stmt>> {
    let mut r = Rebuild::default();
    let rebuilt = match &**stmt {
        Stmt::Local(decl) => Stmt::Local(LocalDecl {
            init: r.opt_expr(f, &decl.init),
            ..decl.clone()
        }),
        Stmt::Assign(assign) => Stmt::Assign(Assignment {
            target: r.expr(f, &assign.target),
            value: r.expr(f, &assign.value),
            ..assign.clone()
        }),
        Stmt::Expr(expr_stmt) => Stmt::Expr(ExprStmt {
            expr: r.expr(f, &expr_stmt.expr),
            ..expr_stmt.clone()
        }),
        Stmt::With(block) => {
            return f
                .fold_with_block(block)
                .map(|block| Arc::new(Stmt::With(block)));
        }
        Stmt::If(block) => {
            let condition = r.expr(f, &block.condition);
            let then_body = r.body(f, &block.then_body);
            let else_ifs = block
                .else_ifs
                .iter()
                .map(|clause| ElseIfClause {
                    condition: r.expr(f, &clause.condition),
                    body: r.body(f, &clause.body),
                    range: clause.range,
                })
                .collect();
            let else_body = block.else_body.as_ref().map(|body| r.body(f, body));
            Stmt::If(IfBlock {
                condition,
                then_body,
                else_ifs,
                else_body,
                range: block.range,
            })
        }
        Stmt::For(block) => Stmt::For(ForBlock {
            var: block.var.clone(),
            start: r.expr(f, &block.start),
            end: r.expr(f, &block.end),
            step: r.opt_expr(f, &block.step),
            body: r.body(f, &block.body),
            range: block.range,
        }),
        Stmt::ForEach(block) => Stmt::ForEach(ForEachBlock {
            var: block.var.clone(),
            iterable: r.expr(f, &block.iterable),
            body: r.body(f, &block.body),
            range: block.range,
        }),
        Stmt::While(block) => Stmt::While(WhileBlock {
            condition: r.expr(f, &block.condition),
            body: r.body(f, &block.body),
            range: block.range,
        }),
        Stmt::Return(ret) => Stmt::Return(ReturnStmt {
            value: r.opt_expr(f, &ret.value),
            range: ret.range,
        }),
    };
    r.finish(Arc::new(rebuilt))
}

pub fn fold_with_block_children<F: Fold + ?Sized>(
    f: &mut F,
    block: &WithBlock,
) -> Option<WithBlock> {
    let mut r = Rebuild::default();
    let rebuilt = WithBlock {
        expr: r.opt_expr(f, &block.expr),
        body: r.body(f, &block.body),
        range: block.range,
    };
    r.finish(rebuilt)
}

pub fn fold_expr_children<F: Fold + ?Sized>(f: &mut F, expr: &Arc<Expr>) -> Option<Arc<Expr>> {
    let mut r = Rebuild::default();
    let rebuilt = match &**expr {
        Expr::Literal(_) | Expr::Name(_) => return None,
        Expr::MemberAccess(access) => {
            return f
                .fold_member_access(access)
                .map(|access| Arc::new(Expr::MemberAccess(access)));
        }
        Expr::Invocation(call) => Expr::Invocation(Invocation {
            target: r.expr(f, &call.target),
            args: r.exprs(f, &call.args),
            range: call.range,
        }),
        Expr::New(creation) => Expr::New(ObjectCreation {
            type_ref: creation.type_ref.clone(),
            args: creation.args.as_ref().map(|args| r.exprs(f, args)),
            range: creation.range,
        }),
        Expr::Unary(unary) => Expr::Unary(UnaryExpr {
            op: unary.op,
            operand: r.expr(f, &unary.operand),
            range: unary.range,
        }),
        Expr::Binary(binary) => Expr::Binary(BinaryExpr {
            op: binary.op,
            lhs: r.expr(f, &binary.lhs),
            rhs: r.expr(f, &binary.rhs),
            range: binary.range,
        }),
        Expr::Paren(paren) => Expr::Paren(ParenExpr {
            inner: r.expr(f, &paren.inner),
            range: paren.range,
        }),
    };
    r.finish(Arc::new(rebuilt))
}

pub fn fold_member_access_children<F: Fold + ?Sized>(
    f: &mut F,
    access: &MemberAccess,
) -> Option<MemberAccess> {
    let mut r = Rebuild::default();
    let rebuilt = MemberAccess {
        receiver: r.opt_expr(f, &access.receiver),
        ..access.clone()
    };
    r.finish(rebuilt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_statements;

    /// Renames every `Name` expression called `old` to `new`.
    struct Rename<'a> {
        old: &'a str,
        new: &'a str,
    }

    impl Fold for Rename<'_> {
        fn fold_expr(&mut self, expr: &Arc<Expr>) -> Option<Arc<Expr>> {
            match &**expr {
                Expr::Name(ident) if ident.name == self.old => Some(Expr::name(self.new)),
                _ => fold_expr_children(self, expr),
            }
        }
    }

    #[derive(Default)]
    struct CountMembers {
        implicit: usize,
        explicit: usize,
    }

    impl Visitor for CountMembers {
        fn visit_member_access(&mut self, access: &MemberAccess) {
            if access.is_implicit() {
                self.implicit += 1;
            } else {
                self.explicit += 1;
            }
            walk_member_access(self, access);
        }
    }

    #[test]
    fn visitor_reaches_nested_bodies() {
        let body = parse_statements(
            "If a.Ok Then\n  While .More\n    x = .Next(b.Value)\n  End While\nEnd If",
        )
        .unwrap();
        let mut counter = CountMembers::default();
        walk_body(&mut counter, &body);
        assert_eq!(counter.implicit, 2);
        assert_eq!(counter.explicit, 2);
    }

    #[test]
    fn unchanged_fold_returns_none() {
        let body = parse_statements("x = 1\ny = Foo(2)").unwrap();
        let mut rename = Rename { old: "z", new: "w" };
        assert!(fold_body(&mut rename, &body).is_none());
    }

    #[test]
    fn fold_shares_untouched_siblings() {
        let body = parse_statements("x = 1\ny = a + 2").unwrap();
        let mut rename = Rename { old: "a", new: "b" };
        let folded = fold_body(&mut rename, &body).expect("second statement changes");

        assert!(Arc::ptr_eq(&folded[0], &body[0]));
        assert!(!Arc::ptr_eq(&folded[1], &body[1]));

        let (Stmt::Assign(before), Stmt::Assign(after)) = (&*body[1], &*folded[1]) else {
            panic!("expected assignments");
        };
        // The target did not change and is shared.
        assert!(Arc::ptr_eq(&before.target, &after.target));
        let Expr::Binary(sum) = &*after.value else {
            panic!("expected binary");
        };
        assert!(matches!(&*sum.lhs, Expr::Name(n) if n.name == "b"));
    }
}
