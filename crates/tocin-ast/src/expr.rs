//! Expression nodes.

use tocin_common::Span;

use crate::{ExprId, PatId, StmtId, TypeId};

/// An expression node: a kind plus the source span it covers.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
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
}

impl BinOp {
    /// The surface spelling, for diagnostics.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(self, BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge)
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Ne)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }
}

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    /// Arithmetic negation `-e`.
    Neg,
    /// Logical negation `!e`.
    Not,
}

impl UnOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnOp::Neg => "-",
            UnOp::Not => "!",
        }
    }
}

/// One segment of an interpolated string literal.
#[derive(Debug, Clone)]
pub enum InterpSegment {
    /// A literal text run.
    Text(String),
    /// An embedded `${expr}`.
    Expr(ExprId),
}

/// One arm of a match expression.
#[derive(Debug, Clone)]
pub struct MatchArm {
    pub pattern: PatId,
    /// Optional boolean guard; a guarded arm never counts toward
    /// exhaustiveness.
    pub guard: Option<ExprId>,
    pub body: ExprId,
    pub span: Span,
}

/// The expression sum.
#[derive(Debug, Clone)]
pub enum ExprKind {
    // ── Literals ───────────────────────────────────────────────────────
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Nil,
    /// An interpolated string: text and embedded expressions, in order.
    Interp(Vec<InterpSegment>),

    /// A name reference, possibly `Module.name` qualified (the path is
    /// kept as written; resolution splits on `.`).
    Var(String),

    Unary {
        op: UnOp,
        operand: ExprId,
    },
    Binary {
        op: BinOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    /// Parenthesized expression. Kept so spans and lowering stay faithful.
    Group(ExprId),

    /// `target = value`; the target must resolve to an assignable place
    /// (variable, member, or index).
    Assign {
        target: ExprId,
        value: ExprId,
    },

    Call {
        callee: ExprId,
        /// Explicit type arguments, e.g. `id<int>(3)`.
        type_args: Vec<TypeId>,
        args: Vec<ExprId>,
    },

    /// Member read `object.name`. Member writes are an [`ExprKind::Assign`]
    /// whose target is a `Member`.
    Member {
        object: ExprId,
        name: String,
    },

    Index {
        object: ExprId,
        index: ExprId,
    },

    // ── Collection literals ────────────────────────────────────────────
    List(Vec<ExprId>),
    Dict(Vec<(ExprId, ExprId)>),
    Tuple(Vec<ExprId>),

    Lambda {
        params: Vec<crate::Param>,
        ret: Option<TypeId>,
        body: StmtId,
    },

    // ── Concurrency ────────────────────────────────────────────────────
    /// `await e`; only admissible inside an async function.
    Await(ExprId),
    /// Channel send `ch <- v`; yields void.
    Send {
        channel: ExprId,
        value: ExprId,
    },
    /// Channel receive `<-ch`.
    Recv(ExprId),

    // ── Ownership ──────────────────────────────────────────────────────
    /// Explicit move `move e`.
    Move(ExprId),

    // ── Heap ───────────────────────────────────────────────────────────
    /// `new T(args)`.
    New {
        ty: TypeId,
        args: Vec<ExprId>,
    },
    /// `delete e`; yields void.
    Delete(ExprId),

    /// `e as T` explicit cast.
    Cast {
        operand: ExprId,
        ty: TypeId,
    },

    Match {
        scrutinee: ExprId,
        arms: Vec<MatchArm>,
    },

    /// Placeholder inserted by the parser after an unrecoverable
    /// expression error; the checker types it as the poison type.
    Error,
}
