//! Scope-bounded rewrite of a `With` block into an explicit local binding.
//!
//! ```text
//! With GetA()                Dim a = GetA()
//!     With .B         =>     With a.B
//!         .C = 1                 .C = 1
//!     End With               End With
//! End With
//! ```
//!
//! Implicit member accesses are qualified with the binding only while they
//! belong to the block being rewritten. A nested `With` starts a new scope:
//! its governing expression is evaluated in the outer scope and rewritten,
//! its body is left for a later fix of the nested block.

use std::sync::Arc;

use crate::ensure_well_formed;
use crate::error::{WithoutError, WithoutResult};
use crate::syntax::ast::{Expr, LocalDecl, MemberAccess, Stmt, WithBlock};
use crate::syntax::lexer::{Token, lex};
use crate::syntax::visit::{Fold, fold_body, fold_member_access_children};

/// Rewrite `block` into `Dim <binding> = <expr>` followed by its body with
/// every implicit receiver replaced by `binding`.
///
/// The binding name is used verbatim; picking one that does not collide is
/// the caller's job (see [`crate::naming`]). Statements and expressions the
/// rewrite does not touch are shared with `block`.
pub fn rewrite_with_block(block: &WithBlock, binding: &str) -> WithoutResult<Vec<Arc<Stmt>>> {
    let Some(expr) = &block.expr else {
        return Err(WithoutError::malformed(
            "With block has no governing expression",
        ));
    };
    ensure_well_formed!(
        is_identifier(binding),
        "`{binding}` is not a valid identifier"
    );

    let mut rewriter = WithBodyRewriter::new(binding);
    let body = fold_body(&mut rewriter, &block.body).unwrap_or_else(|| block.body.clone());

    let mut out = Vec::with_capacity(body.len() + 1);
    out.push(Arc::new(Stmt::Local(LocalDecl::inferred(
        binding,
        Arc::clone(expr),
    ))));
    out.extend(body);
    Ok(out)
}

/// A single plain identifier that is not a keyword.
pub fn is_identifier(name: &str) -> bool {
    if name == "_" {
        return false;
    }
    match lex(name) {
        Ok(lexemes) => {
            lexemes.len() == 1
                && lexemes[0].token == Token::Ident
                && lexemes[0].range.len() == name.len()
        }
        Err(_) => false,
    }
}

/// Qualifies implicit member accesses belonging to one `With` scope.
struct WithBodyRewriter {
    receiver: Arc<Expr>,
}

impl WithBodyRewriter {
    fn new(binding: &str) -> Self {
        Self {
            receiver: Expr::name(binding),
        }
    }
}

impl Fold for WithBodyRewriter {
    fn fold_member_access(&mut self, access: &MemberAccess) -> Option<MemberAccess> {
        if access.is_implicit() {
            return Some(MemberAccess {
                receiver: Some(Arc::clone(&self.receiver)),
                ..access.clone()
            });
        }
        fold_member_access_children(self, access)
    }

    fn fold_with_block(&mut self, block: &WithBlock) -> Option<WithBlock> {
        // Only the governing expression is in our scope; the nested body
        // binds to the nested block.
        let expr = self.fold_expr(block.expr.as_ref()?)?;
        Some(WithBlock {
            expr: Some(expr),
            body: block.body.clone(),
            range: block.range,
        })
    }
}
