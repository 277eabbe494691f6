//! Fresh binding names for rewritten `With` blocks.
//!
//! Names look like `__with1` or, when the type of the governing expression is
//! evident from the syntax, `__withPerson1`.

use std::collections::{HashMap, HashSet};

use crate::syntax::ast::{CompilationUnit, Expr, Ident, LocalDecl, Param, TypeRef};
use crate::syntax::visit::{Visitor, walk_local, walk_param, walk_unit};

/// Default prefix for generated bindings.
pub const DEFAULT_BINDING_PREFIX: &str = "__with";

/// Supplies binding names that do not collide with anything in scope.
pub trait NameGenerator {
    /// A name starting with `base` that has not been used or handed out yet.
    fn fresh_name(&mut self, base: &str) -> String;
}

/// Avoids every identifier that appears anywhere in a compilation unit.
///
/// VB identifiers are case-insensitive, so comparisons ignore ASCII case.
/// Suffixes start at 1 and increase until a free name is found; names handed
/// out are remembered, so two blocks in the same file never share one.
#[derive(Debug, Clone, Default)]
pub struct ScopedNameGenerator {
    taken: HashSet<String>,
}

impl ScopedNameGenerator {
    pub fn for_unit(unit: &CompilationUnit) -> Self {
        let mut collector = NameCollector::default();
        walk_unit(&mut collector, unit);
        Self {
            taken: collector.names,
        }
    }

    pub fn is_taken(&self, name: &str) -> bool {
        self.taken.contains(&name.to_ascii_lowercase())
    }
}

impl NameGenerator for ScopedNameGenerator {
    fn fresh_name(&mut self, base: &str) -> String {
        let mut n = 1usize;
        loop {
            let candidate = format!("{base}{n}");
            if self.taken.insert(candidate.to_ascii_lowercase()) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[derive(Default)]
struct NameCollector {
    names: HashSet<String>,
}

impl Visitor for NameCollector {
    fn visit_ident(&mut self, ident: &Ident) {
        self.names.insert(ident.name.to_ascii_lowercase());
    }

    fn visit_type_ref(&mut self, type_ref: &TypeRef) {
        for segment in &type_ref.segments {
            self.visit_ident(segment);
        }
    }
}

/// `prefix` followed by the type hint, if any.
pub fn binding_base(prefix: &str, hint: Option<&str>) -> String {
    match hint {
        Some(hint) => format!("{prefix}{hint}"),
        None => prefix.to_string(),
    }
}

// ============================================================================
// Type hints
// ============================================================================

/// Declared types of variables and parameters in a unit, by name.
///
/// Scoping is ignored: a name declared with two different types anywhere in
/// the unit has no entry.
#[derive(Debug, Clone, Default)]
pub struct TypeEnv {
    types: HashMap<String, Option<String>>,
}

impl TypeEnv {
    pub fn from_unit(unit: &CompilationUnit) -> Self {
        let mut env = TypeEnv::default();
        walk_unit(&mut env, unit);
        env
    }

    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.types
            .get(&name.to_ascii_lowercase())
            .and_then(|ty| ty.as_deref())
    }

    fn declare(&mut self, name: &Ident, ty: &str) {
        let key = name.name.to_ascii_lowercase();
        match self.types.get_mut(&key) {
            Some(existing) => {
                if existing.as_deref() != Some(ty) {
                    *existing = None;
                }
            }
            None => {
                self.types.insert(key, Some(ty.to_string()));
            }
        }
    }
}

impl Visitor for TypeEnv {
    fn visit_local(&mut self, decl: &LocalDecl) {
        let declared = match (&decl.type_ref, decl.init.as_deref()) {
            (Some(ty), _) => ty.last_segment(),
            (None, Some(Expr::New(creation))) if decl.as_new => creation.type_ref.last_segment(),
            _ => None,
        };
        if let Some(ty) = declared {
            self.declare(&decl.name, ty);
        }
        walk_local(self, decl);
    }

    fn visit_param(&mut self, param: &Param) {
        if let Some(ty) = param.type_ref.as_ref().and_then(|t| t.last_segment()) {
            self.declare(&param.name, ty);
        }
        walk_param(self, param);
    }
}

const CONVERSIONS: [&str; 3] = ["ctype", "directcast", "trycast"];

/// Type name evident from the syntax of `expr`, last path segment only.
///
/// Recognizes `New T(..)`, the conversions `CType`/`DirectCast`/`TryCast(x, T)`,
/// names with a declared type, and parenthesized forms of these.
pub fn infer_type_hint(expr: &Expr, env: &TypeEnv) -> Option<String> {
    match expr {
        Expr::New(creation) => creation.type_ref.last_segment().map(str::to_string),
        Expr::Invocation(call) => {
            let Expr::Name(callee) = &*call.target else {
                return None;
            };
            let is_conversion = CONVERSIONS
                .iter()
                .any(|c| callee.name.eq_ignore_ascii_case(c));
            if !is_conversion || call.args.len() != 2 {
                return None;
            }
            type_name_of(&call.args[1])
        }
        Expr::Name(ident) => env.lookup(&ident.name).map(str::to_string),
        Expr::Paren(paren) => infer_type_hint(&paren.inner, env),
        _ => None,
    }
}

/// Last segment of a type written in expression position: `T` or `a.b.T`.
fn type_name_of(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Name(ident) => Some(ident.name.clone()),
        Expr::MemberAccess(access) if !access.is_implicit() => Some(access.name.name.clone()),
        _ => None,
    }
}
