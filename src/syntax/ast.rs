//! Immutable syntax tree for the supported Visual Basic subset.
//!
//! Child links are `Arc`s so a rewritten tree can share every subtree it did
//! not touch with the tree it was derived from. Nothing here is ever mutated
//! after the parser hands it out.

use std::sync::Arc;

/// Half-open byte range `[start, end)` into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Range used for nodes synthesized by a rewrite.
    pub const fn detached() -> Self {
        Self { start: 0, end: 0 }
    }

    pub fn cover(self, other: TextRange) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub range: TextRange,
}

impl Ident {
    pub fn new(name: impl Into<String>, range: TextRange) -> Self {
        Self {
            name: name.into(),
            range,
        }
    }

    pub fn detached(name: impl Into<String>) -> Self {
        Self::new(name, TextRange::detached())
    }
}

/// Dotted type name such as `System.Text.StringBuilder`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    pub segments: Vec<Ident>,
    pub range: TextRange,
}

impl TypeRef {
    pub fn path(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn last_segment(&self) -> Option<&str> {
        self.segments.last().map(|s| s.name.as_str())
    }
}

// ============================================================================
// Compilation unit and items
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CompilationUnit {
    pub items: Vec<Item>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Imports(ImportsDecl),
    Type(TypeDecl),
    Method(MethodDecl),
    Field(FieldDecl),
    /// Script-style statement outside any method.
    Statement(Arc<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportsDecl {
    pub path: TypeRef,
    pub range: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Module,
    Class,
    Structure,
}

impl TypeKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            TypeKind::Module => "Module",
            TypeKind::Class => "Class",
            TypeKind::Structure => "Structure",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub kind: TypeKind,
    pub modifiers: Vec<Modifier>,
    pub name: Ident,
    pub members: Vec<Item>,
    pub range: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Public,
    Private,
    Friend,
    Protected,
    Shared,
    Overrides,
    Overridable,
}

impl Modifier {
    pub fn keyword(&self) -> &'static str {
        match self {
            Modifier::Public => "Public",
            Modifier::Private => "Private",
            Modifier::Friend => "Friend",
            Modifier::Protected => "Protected",
            Modifier::Shared => "Shared",
            Modifier::Overrides => "Overrides",
            Modifier::Overridable => "Overridable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Sub,
    Function,
}

impl MethodKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            MethodKind::Sub => "Sub",
            MethodKind::Function => "Function",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub kind: MethodKind,
    pub modifiers: Vec<Modifier>,
    pub name: Ident,
    pub params: Vec<Param>,
    pub return_type: Option<TypeRef>,
    pub body: Vec<Arc<Stmt>>,
    pub range: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassingMode {
    ByVal,
    ByRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub passing: Option<PassingMode>,
    pub name: Ident,
    pub type_ref: Option<TypeRef>,
    pub range: TextRange,
}

/// Type-level variable: `Private count As Integer = 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub modifiers: Vec<Modifier>,
    pub decl: LocalDecl,
    pub range: TextRange,
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Local(LocalDecl),
    Assign(Assignment),
    Expr(ExprStmt),
    With(WithBlock),
    If(IfBlock),
    For(ForBlock),
    ForEach(ForEachBlock),
    While(WhileBlock),
    Return(ReturnStmt),
}

impl Stmt {
    pub fn range(&self) -> TextRange {
        match self {
            Stmt::Local(s) => s.range,
            Stmt::Assign(s) => s.range,
            Stmt::Expr(s) => s.range,
            Stmt::With(s) => s.range,
            Stmt::If(s) => s.range,
            Stmt::For(s) => s.range,
            Stmt::ForEach(s) => s.range,
            Stmt::While(s) => s.range,
            Stmt::Return(s) => s.range,
        }
    }
}

/// `Dim name [As T] [= init]` or `Dim name As New T(args)`.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalDecl {
    pub name: Ident,
    pub type_ref: Option<TypeRef>,
    pub init: Option<Arc<Expr>>,
    /// Written as `As New T(..)`; `init` then holds the `New` expression.
    pub as_new: bool,
    pub range: TextRange,
}

impl LocalDecl {
    /// `Dim <name> = <init>` with no declared type.
    pub fn inferred(name: &str, init: Arc<Expr>) -> Self {
        Self {
            name: Ident::detached(name),
            type_ref: None,
            init: Some(init),
            as_new: false,
            range: TextRange::detached(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    ConcatAssign,
}

impl AssignOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::ConcatAssign => "&=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: Arc<Expr>,
    pub op: AssignOp,
    pub value: Arc<Expr>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprStmt {
    /// Written with a leading `Call` keyword.
    pub call_keyword: bool,
    pub expr: Arc<Expr>,
    pub range: TextRange,
}

/// `With <expr> ... End With`.
#[derive(Debug, Clone, PartialEq)]
pub struct WithBlock {
    /// `None` only for malformed input such as a bare `With` line.
    pub expr: Option<Arc<Expr>>,
    pub body: Vec<Arc<Stmt>>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfBlock {
    pub condition: Arc<Expr>,
    pub then_body: Vec<Arc<Stmt>>,
    pub else_ifs: Vec<ElseIfClause>,
    pub else_body: Option<Vec<Arc<Stmt>>>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElseIfClause {
    pub condition: Arc<Expr>,
    pub body: Vec<Arc<Stmt>>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForBlock {
    pub var: Ident,
    pub start: Arc<Expr>,
    pub end: Arc<Expr>,
    pub step: Option<Arc<Expr>>,
    pub body: Vec<Arc<Stmt>>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForEachBlock {
    pub var: Ident,
    pub iterable: Arc<Expr>,
    pub body: Vec<Arc<Stmt>>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileBlock {
    pub condition: Arc<Expr>,
    pub body: Vec<Arc<Stmt>>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub value: Option<Arc<Expr>>,
    pub range: TextRange,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Name(Ident),
    MemberAccess(MemberAccess),
    Invocation(Invocation),
    New(ObjectCreation),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Paren(ParenExpr),
}

impl Expr {
    pub fn range(&self) -> TextRange {
        match self {
            Expr::Literal(e) => e.range,
            Expr::Name(e) => e.range,
            Expr::MemberAccess(e) => e.range,
            Expr::Invocation(e) => e.range,
            Expr::New(e) => e.range,
            Expr::Unary(e) => e.range,
            Expr::Binary(e) => e.range,
            Expr::Paren(e) => e.range,
        }
    }

    pub fn name(name: &str) -> Arc<Expr> {
        Arc::new(Expr::Name(Ident::detached(name)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralKind {
    Integer(i64),
    /// Kept as written so rendering does not reformat it.
    Float(String),
    /// Unescaped contents, without the surrounding quotes.
    String(String),
    Boolean(bool),
    Nothing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub kind: LiteralKind,
    pub range: TextRange,
}

/// Separator between receiver and member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOperator {
    /// `obj.Member`
    Dot,
    /// `obj!Key` dictionary lookup.
    Bang,
}

impl AccessOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessOperator::Dot => ".",
            AccessOperator::Bang => "!",
        }
    }
}

/// `receiver.name`, or `.name` when the receiver is implied by an enclosing
/// `With` block.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberAccess {
    pub receiver: Option<Arc<Expr>>,
    pub operator: AccessOperator,
    pub name: Ident,
    pub range: TextRange,
}

impl MemberAccess {
    pub fn is_implicit(&self) -> bool {
        self.receiver.is_none()
    }
}

/// Call or index: `target(args)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub target: Arc<Expr>,
    pub args: Vec<Arc<Expr>>,
    pub range: TextRange,
}

/// `New T(args)`; `args` is `None` when written without parentheses.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectCreation {
    pub type_ref: TypeRef,
    pub args: Option<Vec<Arc<Expr>>>,
    pub range: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "Not ",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Arc<Expr>,
    pub range: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    IntDiv,
    Mod,
    Concat,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    AndAlso,
    OrElse,
    Xor,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::IntDiv => "\\",
            BinaryOp::Mod => "Mod",
            BinaryOp::Concat => "&",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "And",
            BinaryOp::Or => "Or",
            BinaryOp::AndAlso => "AndAlso",
            BinaryOp::OrElse => "OrElse",
            BinaryOp::Xor => "Xor",
        }
    }

    /// Binding power; higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::OrElse => 1,
            BinaryOp::AndAlso => 2,
            BinaryOp::Or | BinaryOp::Xor => 3,
            BinaryOp::And => 4,
            BinaryOp::Eq
            | BinaryOp::NotEq
            | BinaryOp::Lt
            | BinaryOp::LtEq
            | BinaryOp::Gt
            | BinaryOp::GtEq => 5,
            BinaryOp::Concat => 6,
            BinaryOp::Add | BinaryOp::Sub => 7,
            BinaryOp::Mod => 8,
            BinaryOp::IntDiv => 9,
            BinaryOp::Mul | BinaryOp::Div => 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub lhs: Arc<Expr>,
    pub rhs: Arc<Expr>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParenExpr {
    pub inner: Arc<Expr>,
    pub range: TextRange,
}
