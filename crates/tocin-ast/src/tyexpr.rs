//! Type syntax nodes: types as written in source.
//!
//! These are resolved into semantic type terms by the checker; the AST
//! keeps only the surface shape.

use tocin_common::Span;

use crate::TypeId;

/// A type expression node.
#[derive(Debug, Clone)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

/// A generic parameter declaration with its trait bounds, e.g.
/// `T: Display + Clone`. Bounds constrain instantiation; they never appear
/// in resolved type terms.
#[derive(Debug, Clone)]
pub struct TypeParamDecl {
    pub name: String,
    pub bounds: Vec<String>,
    pub span: Span,
}

/// The type-syntax sum.
#[derive(Debug, Clone)]
pub enum TypeExprKind {
    /// A named type with optional arguments: `int`, `Point`,
    /// `list<int>`, `Result<T, E>`, `M.Type`.
    Name { name: String, args: Vec<TypeId> },
    /// A function type `fn(T1, T2) -> R`, optionally `async`.
    Fun {
        params: Vec<TypeId>,
        ret: TypeId,
        is_async: bool,
    },
    /// A tuple type `(T1, T2)`.
    Tuple(Vec<TypeId>),
    /// A union type `A | B | C`.
    Union(Vec<TypeId>),
    /// A trait object `dyn Trait`.
    TraitObject(String),
    /// An rvalue-reference binding target `T&&`.
    RValueRef(TypeId),
}
