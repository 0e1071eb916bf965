//! Lowering: the final middle-end pass.
//!
//! Takes the typed, ownership-checked AST and produces the normalized
//! module a backend consumes: `match` expressions compiled to decision
//! trees (with exhaustiveness and reachability reported here as
//! `P001`/`P002`), generic uses expanded into cached specializations,
//! async functions split into `f$async` + blocking wrapper pairs,
//! extension calls rewritten to free functions, and the module
//! import/export surface linked.
//!
//! Pass order across the middle-end is fixed: type-check, ownership,
//! pattern-compile, lower.

pub mod asynk;
pub mod modules;
pub mod mono;
pub mod pattern;

pub use asynk::AsyncPair;
pub use modules::{ImportBinding, ModuleInit, ModuleLink};
pub use mono::{mangle, InstantiationCache, Specialization};
pub use pattern::{compile_match, AccessPath, CompiledMatch, CtorTag, DecisionTree, Test};

use rustc_hash::FxHashMap;

use tocin_ast::{Ast, ExprId, ExprKind, StmtId, StmtKind};
use tocin_common::diag::{Code, Diagnostic, Diagnostics, Severity};
use tocin_typeck::{Ty, TypeckResult};

/// The shape of one lowered function.
#[derive(Debug, Clone)]
pub enum FnForm {
    Plain,
    /// The transformed async body: returns `Future<T>` and suspends at
    /// each recorded point.
    AsyncBody { suspension_points: Vec<ExprId> },
    /// The blocking compatibility wrapper around an async body.
    AsyncWrapper { of: String },
    /// A monomorphic copy of a generic function.
    Specialization { of: String, type_args: Vec<Ty> },
    /// An extension method rewritten to a free function.
    Extension,
}

/// One function in the normalized module.
#[derive(Debug, Clone)]
pub struct LoweredFn {
    pub name: String,
    pub form: FnForm,
    pub params: Vec<Ty>,
    pub ret: Ty,
    /// The defining body, shared with the AST arena. `None` for
    /// wrappers, whose body is synthesized by the backend.
    pub body: Option<StmtId>,
}

/// The backend handoff: a fully normalized compilation unit.
pub struct LoweredModule {
    /// Every function, in deterministic (name-sorted) order.
    pub functions: Vec<LoweredFn>,
    /// Compiled decision trees, keyed by match expression.
    pub matches: FxHashMap<ExprId, DecisionTree>,
    /// Call-site rewrites: extension calls and specialized generic
    /// calls, keyed by call expression.
    pub call_rewrites: FxHashMap<ExprId, String>,
    /// The module import/export surface.
    pub link: ModuleLink,
}

impl LoweredModule {
    pub fn function(&self, name: &str) -> Option<&LoweredFn> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// Lower one unit. Expects type checking (and ownership analysis) to
/// have already run; pattern diagnostics are reported here.
pub fn lower(ast: &Ast, typeck: &TypeckResult, diags: &mut Diagnostics) -> LoweredModule {
    let mut matches = FxHashMap::default();
    compile_matches(ast, typeck, diags, &mut matches);

    let mut cache = InstantiationCache::new();
    cache.populate(typeck);

    let mut functions = Vec::new();
    let ext_fns: Vec<String> = typeck
        .extensions
        .all()
        .into_iter()
        .map(|(_, _, m)| m.mangled.clone())
        .collect();

    let mut sigs: Vec<&tocin_typeck::FnSig> = typeck.defs.fns.values().collect();
    sigs.sort_by(|a, b| a.name.cmp(&b.name));
    for sig in sigs {
        let Some(decl) = sig.decl else {
            continue; // intrinsics have no lowered body
        };
        let body = fn_body(ast, decl);
        if sig.is_generic() {
            // Only concrete instantiations are emitted; the open
            // template has no monomorphic form.
            continue;
        }
        if ext_fns.contains(&sig.name) {
            functions.push(LoweredFn {
                name: sig.name.clone(),
                form: FnForm::Extension,
                params: sig.params.clone(),
                ret: sig.ret.clone(),
                body,
            });
            continue;
        }
        if sig.is_async {
            let pair = asynk::transform(ast, sig);
            functions.push(LoweredFn {
                name: pair.body_fn.clone(),
                form: FnForm::AsyncBody {
                    suspension_points: pair.suspension_points.clone(),
                },
                params: sig.params.clone(),
                ret: pair.future_ty.clone(),
                body,
            });
            functions.push(LoweredFn {
                name: pair.wrapper.clone(),
                form: FnForm::AsyncWrapper { of: pair.body_fn },
                params: sig.params.clone(),
                ret: pair.value_ty,
                body: None,
            });
            continue;
        }
        functions.push(LoweredFn {
            name: sig.name.clone(),
            form: FnForm::Plain,
            params: sig.params.clone(),
            ret: sig.ret.clone(),
            body,
        });
    }

    for spec in cache.specializations() {
        let body = typeck
            .defs
            .fns
            .get(&spec.original)
            .and_then(|sig| sig.decl)
            .and_then(|decl| fn_body(ast, decl));
        functions.push(LoweredFn {
            name: spec.mangled.clone(),
            form: FnForm::Specialization {
                of: spec.original.clone(),
                type_args: spec.type_args.clone(),
            },
            params: spec.params.clone(),
            ret: spec.ret.clone(),
            body,
        });
    }

    functions.sort_by(|a, b| a.name.cmp(&b.name));

    let mut call_rewrites = typeck.ext_calls.clone();
    for (call, target) in cache.call_targets() {
        call_rewrites.insert(*call, target.clone());
    }

    let link = modules::link(ast, &typeck.exports);

    LoweredModule {
        functions,
        matches,
        call_rewrites,
        link,
    }
}

fn fn_body(ast: &Ast, decl: StmtId) -> Option<StmtId> {
    match &ast.stmt(decl).kind {
        StmtKind::Fn(decl) => Some(decl.body),
        _ => None,
    }
}

/// Compile every `match` in the unit, reporting `P001` (error, with at
/// least one witness constructor) and `P002` (warning, per shadowed
/// arm).
fn compile_matches(
    ast: &Ast,
    typeck: &TypeckResult,
    diags: &mut Diagnostics,
    out: &mut FxHashMap<ExprId, DecisionTree>,
) {
    for (index, expr) in ast.exprs.iter().enumerate() {
        let ExprKind::Match { scrutinee, arms } = &expr.kind else {
            continue;
        };
        let id = ExprId(index as u32);
        let scrutinee_ty = typeck.expr_ty(*scrutinee);
        let compiled = compile_match(ast, &typeck.defs, scrutinee_ty, arms);

        if compiled.tree.can_fail() {
            let mut witnesses = compiled.missing.clone();
            if witnesses.is_empty() {
                witnesses.push("_".to_string());
            }
            diags.report(Diagnostic::new(
                Code::P001,
                Severity::Error,
                format!(
                    "non-exhaustive match on `{scrutinee_ty}`: missing `{}`",
                    witnesses.join("`, `")
                ),
                ast.file,
                expr.span,
            ));
        }
        for arm_index in &compiled.unreachable_arms {
            diags.report(Diagnostic::new(
                Code::P002,
                Severity::Warning,
                "unreachable pattern: covered by earlier arms".to_string(),
                ast.file,
                arms[*arm_index].span,
            ));
        }

        out.insert(id, compiled.tree);
    }
}
