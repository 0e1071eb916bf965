//! Type checking for the Tocin compiler.
//!
//! The entry point is [`check`]: it runs the declaration pass and the
//! bottom-up checking pass over one unit, reports diagnostics into the
//! shared sink, and returns a [`TypeckResult`] -- every expression
//! annotated with a type, plus the registries the later passes
//! (ownership, pattern compilation, lowering) and the backend consume.

pub mod defs;
pub mod error;
pub mod infer;
pub mod prelude;
pub mod scope;
pub mod traits;
pub mod ty;
pub mod unify;

use rustc_hash::FxHashMap;

use tocin_ast::{Ast, ExprId};
use tocin_common::Diagnostics;

pub use defs::{ClassInfo, Defs, EnumInfo, FnSig, PropInfo, VariantInfo};
pub use error::TypeError;
pub use scope::{Binding, BindingKind, SymbolTable, Visibility};
pub use traits::{Dispatch, ExtensionRegistry, ImplDef, TraitDef, TraitRegistry};
pub use ty::{canonicalize, equal, free_type_params, substitute, Prim, Ty};

/// Everything the middle-end knows after type checking one unit.
pub struct TypeckResult {
    /// The synthesized type of every expression, indexed by `ExprId`.
    pub expr_types: Vec<Ty>,
    pub table: SymbolTable,
    pub traits: TraitRegistry,
    pub extensions: ExtensionRegistry,
    pub defs: Defs,
    /// Concrete generic instantiations discovered at call sites.
    pub call_instantiations: FxHashMap<ExprId, (String, Vec<Ty>)>,
    /// Calls that resolved to extension methods, with the free-function
    /// name each rewrites to.
    pub ext_calls: FxHashMap<ExprId, String>,
    /// Names exported by `export` statements, in source order.
    pub exports: Vec<String>,
}

impl TypeckResult {
    pub fn expr_ty(&self, id: ExprId) -> &Ty {
        &self.expr_types[id.index()]
    }
}

/// Type-check one unit, reporting diagnostics into `diags`.
pub fn check(ast: &Ast, diags: &mut Diagnostics) -> TypeckResult {
    let mut checker = infer::Checker::new(ast);
    checker.run();

    for error in checker.errors.drain(..) {
        diags.report(error.into_diagnostic(ast.file));
    }

    TypeckResult {
        expr_types: checker.expr_types,
        table: checker.table,
        traits: checker.traits,
        extensions: checker.exts,
        defs: checker.defs,
        call_instantiations: checker.call_instantiations,
        ext_calls: checker.ext_calls,
        exports: checker.exports,
    }
}
