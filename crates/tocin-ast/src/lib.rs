//! Arena-backed AST for the Tocin compiler.
//!
//! Nodes live in per-category growable arenas owned by [`Ast`]; child
//! relations are `u32` newtype ids, never pointers. This gives every node
//! a stable identity (side tables in later passes key off the ids), makes
//! cloning a reference free, and rules out accidental cycles.
//!
//! Each category is a tagged sum with a single public match point:
//! traversals are exhaustive `match`es on the kind enums, not a visitor
//! hierarchy.

pub mod expr;
pub mod pat;
pub mod stmt;
pub mod tyexpr;

pub use expr::{BinOp, Expr, ExprKind, InterpSegment, MatchArm, UnOp};
pub use pat::{Pat, PatKind, PatLit};
pub use stmt::{
    ClassDecl, EnumDecl, FieldDecl, FnDecl, ImplDecl, Param, PropDecl, SelectArm, SelectOp, Stmt,
    StmtKind, TraitDecl, TraitMethod, VariantDecl,
};
pub use tyexpr::{TypeExpr, TypeExprKind, TypeParamDecl};

use tocin_common::{FileId, Span};

macro_rules! arena_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

arena_id!(
    /// Index of an expression in [`Ast::exprs`].
    ExprId
);
arena_id!(
    /// Index of a statement in [`Ast::stmts`].
    StmtId
);
arena_id!(
    /// Index of a pattern in [`Ast::pats`].
    PatId
);
arena_id!(
    /// Index of a type expression in [`Ast::types`].
    TypeId
);

/// One parsed compilation unit: the node arenas plus the ordered list of
/// top-level statements.
pub struct Ast {
    pub file: FileId,
    pub exprs: Vec<Expr>,
    pub stmts: Vec<Stmt>,
    pub pats: Vec<Pat>,
    pub types: Vec<TypeExpr>,
    /// Top-level statements in source order.
    pub items: Vec<StmtId>,
}

impl Ast {
    pub fn new(file: FileId) -> Self {
        Self {
            file,
            exprs: Vec::new(),
            stmts: Vec::new(),
            pats: Vec::new(),
            types: Vec::new(),
            items: Vec::new(),
        }
    }

    // ── Allocation ─────────────────────────────────────────────────────

    pub fn alloc_expr(&mut self, kind: ExprKind, span: Span) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(Expr { kind, span });
        id
    }

    pub fn alloc_stmt(&mut self, kind: StmtKind, span: Span) -> StmtId {
        let id = StmtId(self.stmts.len() as u32);
        self.stmts.push(Stmt { kind, span });
        id
    }

    pub fn alloc_pat(&mut self, kind: PatKind, span: Span) -> PatId {
        let id = PatId(self.pats.len() as u32);
        self.pats.push(Pat { kind, span });
        id
    }

    pub fn alloc_type(&mut self, kind: TypeExprKind, span: Span) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeExpr { kind, span });
        id
    }

    // ── Access ─────────────────────────────────────────────────────────

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    pub fn pat(&self, id: PatId) -> &Pat {
        &self.pats[id.index()]
    }

    pub fn type_expr(&self, id: TypeId) -> &TypeExpr {
        &self.types[id.index()]
    }

    /// The set of variable names a pattern binds, in name order.
    ///
    /// Or-pattern alternatives are required to bind the same set; the
    /// checker reports a mismatch, so this helper just takes the first
    /// alternative's set.
    pub fn pattern_bindings(&self, id: PatId) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_pattern_bindings(id, &mut names);
        names.sort();
        names.dedup();
        names
    }

    fn collect_pattern_bindings(&self, id: PatId, out: &mut Vec<String>) {
        match &self.pat(id).kind {
            PatKind::Wildcard | PatKind::Lit(_) => {}
            PatKind::Bind(name) => out.push(name.clone()),
            PatKind::Ctor { args, .. } => {
                for arg in args {
                    self.collect_pattern_bindings(*arg, out);
                }
            }
            PatKind::Tuple(elems) => {
                for elem in elems {
                    self.collect_pattern_bindings(*elem, out);
                }
            }
            PatKind::Struct { fields, .. } => {
                for (_, pat) in fields {
                    self.collect_pattern_bindings(*pat, out);
                }
            }
            PatKind::Or(alts) => {
                // All alternatives must agree; take the first.
                if let Some(first) = alts.first() {
                    self.collect_pattern_bindings(*first, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tocin_common::Span;

    #[test]
    fn ids_are_dense_and_stable() {
        let mut ast = Ast::new(FileId(0));
        let a = ast.alloc_expr(ExprKind::Int(1), Span::new(0, 1));
        let b = ast.alloc_expr(ExprKind::Int(2), Span::new(2, 3));
        assert_eq!(a, ExprId(0));
        assert_eq!(b, ExprId(1));
        assert!(matches!(ast.expr(a).kind, ExprKind::Int(1)));
        assert!(matches!(ast.expr(b).kind, ExprKind::Int(2)));
    }

    #[test]
    fn pattern_bindings_recurse_and_dedup() {
        let mut ast = Ast::new(FileId(0));
        let sp = Span::new(0, 0);
        let x = ast.alloc_pat(PatKind::Bind("x".into()), sp);
        let y = ast.alloc_pat(PatKind::Bind("y".into()), sp);
        let inner = ast.alloc_pat(
            PatKind::Ctor {
                name: "Some".into(),
                args: vec![y],
            },
            sp,
        );
        let tuple = ast.alloc_pat(PatKind::Tuple(vec![x, inner]), sp);
        assert_eq!(ast.pattern_bindings(tuple), vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn or_pattern_bindings_take_first_alternative() {
        let mut ast = Ast::new(FileId(0));
        let sp = Span::new(0, 0);
        let a = ast.alloc_pat(PatKind::Bind("n".into()), sp);
        let b = ast.alloc_pat(PatKind::Bind("n".into()), sp);
        let or = ast.alloc_pat(PatKind::Or(vec![a, b]), sp);
        assert_eq!(ast.pattern_bindings(or), vec!["n".to_string()]);
    }
}
