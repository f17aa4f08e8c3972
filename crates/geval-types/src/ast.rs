//! AST node types for rule text.
//!
//! A rule is a single [`Block`] of statements. Every node carries a [`Span`]
//! for error reporting and large recursive types are boxed.

use crate::Span;

// ══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ══════════════════════════════════════════════════════════════════════════════

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

/// `{ statements... }`; the whole rule is one block.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign(AssignStmt),
    IncDec(IncDecStmt),
    If(IfStmt),
    For(ForStmt),
    Branch(BranchStmt),
    Block(Block),
    Return(ReturnStmt),
    Expr(ExprStmt),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Assign(s) => s.span,
            Stmt::IncDec(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::For(s) => s.span,
            Stmt::Branch(s) => s.span,
            Stmt::Block(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Expr(s) => s.span,
        }
    }

    /// Short name of the node kind, used in diagnostics.
    pub fn node_name(&self) -> &'static str {
        match self {
            Stmt::Assign(_) => "assignment",
            Stmt::IncDec(_) => "inc/dec statement",
            Stmt::If(_) => "if statement",
            Stmt::For(_) => "for statement",
            Stmt::Branch(b) => b.kind.as_str(),
            Stmt::Block(_) => "block",
            Stmt::Return(_) => "return statement",
            Stmt::Expr(_) => "expression statement",
        }
    }
}

/// `a = 1`, `a, b = f()`, `x := 0`, `n += 2`
#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    pub targets: Vec<Expr>,
    pub op: AssignOp,
    pub values: Vec<Expr>,
    pub span: Span,
}

/// The assignment token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `=`
    Assign,
    /// `:=`
    Define,
    /// `+=`
    Add,
    /// `-=`
    Sub,
    /// `*=`
    Mul,
    /// `/=`
    Div,
}

impl AssignOp {
    /// The arithmetic operator a compound assignment expands to.
    pub fn binary_op(self) -> Option<BinOp> {
        match self {
            AssignOp::Assign | AssignOp::Define => None,
            AssignOp::Add => Some(BinOp::Add),
            AssignOp::Sub => Some(BinOp::Sub),
            AssignOp::Mul => Some(BinOp::Mul),
            AssignOp::Div => Some(BinOp::Div),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Define => ":=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
        }
    }
}

/// `x++` / `x--`
#[derive(Debug, Clone, PartialEq)]
pub struct IncDecStmt {
    pub target: Expr,
    pub op: IncDecOp,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncDecOp {
    Inc,
    Dec,
}

/// `if [init;] cond { ... } [else ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub init: Option<Box<Stmt>>,
    pub condition: Expr,
    pub then_block: Block,
    pub else_branch: Option<ElseBranch>,
    pub span: Span,
}

/// The else branch of an if statement.
#[derive(Debug, Clone, PartialEq)]
pub enum ElseBranch {
    /// `else if cond { ... }`
    ElseIf(Box<IfStmt>),
    /// `else { ... }`
    Block(Block),
}

/// `for [init]; [cond]; [post] { ... }` or `for cond { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub init: Option<Box<Stmt>>,
    pub condition: Option<Expr>,
    pub post: Option<Box<Stmt>>,
    pub body: Block,
    pub span: Span,
}

/// `break` / `continue`
#[derive(Debug, Clone, PartialEq)]
pub struct BranchStmt {
    pub kind: BranchKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    Break,
    Continue,
}

impl BranchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BranchKind::Break => "break",
            BranchKind::Continue => "continue",
        }
    }
}

/// `return [exprs]`; parsed so it can be reported, never executed.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub values: Vec<Expr>,
    pub span: Span,
}

/// A bare expression statement, usually a call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// The kind of expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    // ── Literals ──
    /// `42`, `0xff`
    IntLit(i64),
    /// `3.14`, `1e3`
    FloatLit(f64),
    /// `"hello"`, `` `raw` ``
    StringLit(String),
    /// `[]int{1, 2, 3}`
    SliceLit { elem: Ident, elements: Vec<Expr> },
    /// `map[string]int`, only meaningful as the argument of `make`
    MapType { key: Ident, value: Ident },

    // ── Names & access ──
    /// `count`, `true`, `nil`
    Identifier(String),
    /// `expr.field`
    Selector { object: Box<Expr>, field: Ident },
    /// `expr[index]`
    Index { object: Box<Expr>, index: Box<Expr> },
    /// `callee(args...)`; the callee is an identifier or a selector
    Call { callee: Box<Expr>, args: Vec<Expr> },

    // ── Operators ──
    /// `a + b`, `a == b`, `a && b`, ...
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    /// `-x`, `!x`
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// `(expr)`
    Paren(Box<Expr>),
}

/// Binary operators (in precedence order, lowest first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Logical
    Or,
    And,
    // Comparison
    Eq,
    NotEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    /// Returns the operator symbol for error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Or => "||",
            BinOp::And => "&&",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Less => "<",
            BinOp::Greater => ">",
            BinOp::LessEq => "<=",
            BinOp::GreaterEq => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `+x`
    Plus,
    /// `!x`
    Not,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
        }
    }
}
