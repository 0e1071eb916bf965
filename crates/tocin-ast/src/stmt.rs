//! Statement and declaration nodes.

use tocin_common::Span;

use crate::{ExprId, StmtId, TypeId, TypeParamDecl};

/// A statement node: a kind plus the source span it covers.
#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

/// A function parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    /// Lambdas may omit the annotation; declared functions never do.
    pub ty: Option<TypeId>,
    /// Whether the parameter is moved-in (`fn f(move x: T)`): the argument
    /// is transferred, and the caller's binding becomes `Moved`.
    pub is_moved: bool,
    pub span: Span,
}

/// A function declaration (top-level, method, or extension method).
#[derive(Debug, Clone)]
pub struct FnDecl {
    pub name: String,
    pub type_params: Vec<TypeParamDecl>,
    pub params: Vec<Param>,
    pub ret: Option<TypeId>,
    /// Always a block statement.
    pub body: StmtId,
    pub is_async: bool,
    pub is_pub: bool,
}

/// A field of a class declaration.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeId,
    pub span: Span,
}

/// A class declaration. Inheritance is a name reference resolved into a
/// side table by the checker, never a pointer to another node.
#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub type_params: Vec<TypeParamDecl>,
    pub base: Option<String>,
    pub fields: Vec<FieldDecl>,
    /// Method declarations; each id is a `StmtKind::Fn`.
    pub methods: Vec<StmtId>,
    pub is_pub: bool,
}

/// One variant of an enum declaration.
#[derive(Debug, Clone)]
pub struct VariantDecl {
    pub name: String,
    /// Payload types; empty for nullary variants.
    pub fields: Vec<TypeId>,
    pub span: Span,
}

/// An algebraic data type declaration.
#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: String,
    pub type_params: Vec<TypeParamDecl>,
    pub variants: Vec<VariantDecl>,
    pub is_pub: bool,
}

/// A method signature inside a trait declaration, with an optional
/// default body.
#[derive(Debug, Clone)]
pub struct TraitMethod {
    pub name: String,
    pub params: Vec<Param>,
    pub ret: Option<TypeId>,
    /// When present, impl blocks may omit this method.
    pub default_body: Option<StmtId>,
    pub span: Span,
}

/// A trait declaration.
#[derive(Debug, Clone)]
pub struct TraitDecl {
    pub name: String,
    pub supertraits: Vec<String>,
    pub methods: Vec<TraitMethod>,
    pub is_pub: bool,
}

/// An `impl Trait for Type { ... }` block.
#[derive(Debug, Clone)]
pub struct ImplDecl {
    pub trait_name: String,
    pub target: TypeId,
    /// Method declarations; each id is a `StmtKind::Fn`.
    pub methods: Vec<StmtId>,
}

/// A property declaration: a typed slot with getter/setter bodies.
#[derive(Debug, Clone)]
pub struct PropDecl {
    pub name: String,
    pub ty: TypeId,
    /// Getter body block, if declared.
    pub getter: Option<StmtId>,
    /// Setter: the value parameter name plus the body block.
    pub setter: Option<(String, StmtId)>,
}

/// The channel operation heading a `select` arm.
#[derive(Debug, Clone)]
pub enum SelectOp {
    /// `case v = <-ch` (bind) or `case <-ch` (discard).
    Recv {
        binding: Option<String>,
        channel: ExprId,
    },
    /// `case ch <- value`.
    Send { channel: ExprId, value: ExprId },
}

/// One arm of a `select` statement.
#[derive(Debug, Clone)]
pub struct SelectArm {
    pub op: SelectOp,
    pub body: StmtId,
    pub span: Span,
}

/// The statement sum.
#[derive(Debug, Clone)]
pub enum StmtKind {
    Expr(ExprId),
    Block(Vec<StmtId>),

    /// `let name[: ty] = init` or `const name[: ty] = init`.
    Let {
        name: String,
        is_const: bool,
        ty: Option<TypeId>,
        init: Option<ExprId>,
    },

    Fn(FnDecl),
    Return(Option<ExprId>),

    If {
        cond: ExprId,
        then_block: StmtId,
        /// `elif` chains, in order.
        elifs: Vec<(ExprId, StmtId)>,
        else_block: Option<StmtId>,
    },
    While {
        cond: ExprId,
        body: StmtId,
    },
    /// `for name in iterable { ... }`.
    For {
        name: String,
        iterable: ExprId,
        body: StmtId,
    },
    Break,
    Continue,

    Class(ClassDecl),
    Enum(EnumDecl),
    Trait(TraitDecl),
    Impl(ImplDecl),
    /// `extend Type { fn ... }` extension-method block.
    Extend {
        target: String,
        methods: Vec<StmtId>,
    },

    /// `import M` or `import M.{a, b as c}`.
    Import {
        module: String,
        /// `(source_name, local_alias)` pairs; empty for a bare import.
        names: Vec<(String, Option<String>)>,
    },
    /// `export {a, b}`.
    Export { names: Vec<String> },
    /// `module M { ... }`.
    Module { name: String, body: Vec<StmtId> },

    /// `go call(...)` task spawn.
    Go { call: ExprId },
    /// `defer stmt`; runs on every path exiting the enclosing scope, in
    /// reverse registration order.
    Defer { stmt: StmtId },

    Select {
        arms: Vec<SelectArm>,
        default: Option<StmtId>,
    },

    Prop(PropDecl),

    /// Placeholder inserted by the parser after an unrecoverable
    /// statement error.
    Error,
}
