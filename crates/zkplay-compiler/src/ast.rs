//! Abstract syntax tree
//!
//! Every node carries a [`Span`]. Expressions additionally carry an
//! [`ExprId`], unique within one parse, which later passes use as a key for
//! per-expression facts (types, call targets).

use crate::diagnostic::Span;
use std::fmt;

pub type ExprId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    pub items: Vec<Item>,
    /// Number of expression ids handed out by the parser
    pub expr_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Function(Function),
    Struct(StructDef),
    Global(GlobalDef),
    Use(UseDecl),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: Ident,
    pub params: Vec<Param>,
    pub return_type: Option<ReturnType>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: Ident,
    pub ty: TypeExpr,
    pub public: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnType {
    pub ty: TypeExpr,
    pub public: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDef {
    pub name: Ident,
    pub fields: Vec<(Ident, TypeExpr)>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalDef {
    pub name: Ident,
    pub ty: Option<TypeExpr>,
    pub value: Expr,
    pub span: Span,
}

/// `use std::hash::mimc;` binds `mimc` to the full path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseDecl {
    pub path: Vec<Ident>,
    pub span: Span,
}

impl UseDecl {
    pub fn alias(&self) -> Option<&Ident> {
        self.path.last()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExprKind {
    Field,
    Bool,
    UInt(u32),
    SInt(u32),
    /// `[T; N]` where `N` is a literal or a global
    Array(Box<TypeExpr>, Box<Expr>),
    Tuple(Vec<TypeExpr>),
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    /// Trailing expression without `;`, the value of the block
    pub tail: Option<Box<Expr>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Binding { name: Ident, mutable: bool },
    Tuple(Vec<Pattern>, Span),
    Wildcard(Span),
}

impl Pattern {
    pub fn span(&self) -> Span {
        match self {
            Pattern::Binding { name, .. } => name.span,
            Pattern::Tuple(_, span) | Pattern::Wildcard(span) => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
    Let {
        pattern: Pattern,
        ty: Option<TypeExpr>,
        value: Expr,
    },
    /// `target = value` or `target op= value`
    Assign {
        target: Expr,
        op: Option<BinaryOp>,
        value: Expr,
    },
    For {
        var: Ident,
        start: Expr,
        end: Expr,
        body: Block,
    },
    Assert {
        cond: Expr,
        message: Option<String>,
    },
    AssertEq {
        left: Expr,
        right: Expr,
        message: Option<String>,
    },
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(self, BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge)
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod
        )
    }

    pub fn is_bitwise(self) -> bool {
        matches!(self, BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub id: ExprId,
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    /// Literal text as written, decimal or `0x` hex
    Int(String),
    Bool(bool),
    /// A variable, a global, or a qualified name
    Path(Vec<Ident>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Cast {
        expr: Box<Expr>,
        ty: TypeExpr,
    },
    Call {
        path: Vec<Ident>,
        args: Vec<Expr>,
    },
    MethodCall {
        receiver: Box<Expr>,
        method: Ident,
        args: Vec<Expr>,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Field {
        base: Box<Expr>,
        field: Ident,
    },
    TupleIndex {
        base: Box<Expr>,
        index: usize,
    },
    Array(Vec<Expr>),
    /// `[value; count]`
    Repeat {
        value: Box<Expr>,
        count: Box<Expr>,
    },
    Tuple(Vec<Expr>),
    StructLit {
        name: Ident,
        fields: Vec<(Ident, Expr)>,
    },
    If {
        cond: Box<Expr>,
        then_branch: Block,
        /// Either a `Block` expression or another `If`
        else_branch: Option<Box<Expr>>,
    },
    Block(Block),
}

impl Expr {
    /// True for expressions that end in a block and may stand as statements without `;`
    pub fn is_block_like(&self) -> bool {
        matches!(self.kind, ExprKind::If { .. } | ExprKind::Block(_))
    }

    /// True for integer literals, possibly negated or combined only with other literals
    pub fn is_untyped_literal(&self) -> bool {
        match &self.kind {
            ExprKind::Int(_) => true,
            ExprKind::Unary { op: UnaryOp::Neg, operand } => operand.is_untyped_literal(),
            ExprKind::Binary { op, lhs, rhs } if op.is_arithmetic() => {
                lhs.is_untyped_literal() && rhs.is_untyped_literal()
            }
            _ => false,
        }
    }
}

pub fn path_to_string(path: &[Ident]) -> String {
    path.iter().map(|segment| segment.name.as_str()).collect::<Vec<_>>().join("::")
}
