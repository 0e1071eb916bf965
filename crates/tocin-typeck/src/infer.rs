//! The type checker: bottom-up synthesis with local inference.
//!
//! Two passes per unit. The declaration pass registers every enum,
//! class, trait, impl, extension, function, and module so bodies can
//! reference names in any order. The check pass walks statements and
//! expressions bottom-up, annotating every expression with a type and
//! degrading to the poison type after an error so checking continues.
//!
//! There is no global constraint solver. Placeholder variables appear
//! only for empty collection literals, `nil`, and call-site generic
//! instantiation, and each resolves against its first concrete use.

use rustc_hash::FxHashMap;

use tocin_ast::{
    Ast, BinOp, ClassDecl, EnumDecl, ExprId, ExprKind, FnDecl, ImplDecl, InterpSegment, PatId,
    PatKind, PatLit, SelectOp, Stmt, StmtId, StmtKind, TraitDecl, TypeExprKind, TypeId, UnOp,
};
use tocin_common::Span;

use crate::defs::{ClassInfo, Defs, EnumInfo, FnSig, PropInfo, VariantInfo};
use crate::error::TypeError;
use crate::prelude;
use crate::scope::{Binding, BindingKind, DeclareError, SymbolTable, Visibility};
use crate::traits::{
    type_key, Dispatch, ExtMethod, ExtensionRegistry, ImplDef, ImplMethod, TraitDef,
    TraitMethodSig, TraitRegistry,
};
use crate::ty::{canonicalize, substitute, Prim, Ty};
use crate::unify::InferCtx;

/// The checker for one compilation unit.
pub struct Checker<'a> {
    ast: &'a Ast,
    pub table: SymbolTable,
    pub traits: TraitRegistry,
    pub exts: ExtensionRegistry,
    pub defs: Defs,
    ctx: InferCtx,
    pub errors: Vec<TypeError>,
    /// Synthesized type per expression, parallel to `ast.exprs`.
    pub expr_types: Vec<Ty>,
    /// Enclosing function return types.
    ret_stack: Vec<Ty>,
    /// Whether each enclosing function is async.
    async_stack: Vec<bool>,
    /// Generic parameter names visible at this point, innermost last.
    type_param_stack: Vec<Vec<String>>,
    /// The `Self` type inside class/impl/extend bodies.
    self_ty_stack: Vec<Ty>,
    /// Concrete instantiations discovered at call sites:
    /// call expression -> (function name, canonical type arguments).
    pub call_instantiations: FxHashMap<ExprId, (String, Vec<Ty>)>,
    /// Extension-method calls: call expression -> mangled free function.
    pub ext_calls: FxHashMap<ExprId, String>,
    /// Names listed in `export` statements.
    pub exports: Vec<String>,
    current_module: Option<String>,
}

impl<'a> Checker<'a> {
    pub fn new(ast: &'a Ast) -> Self {
        let mut checker = Self {
            ast,
            table: SymbolTable::new(),
            traits: TraitRegistry::new(),
            exts: ExtensionRegistry::new(),
            defs: Defs::new(),
            ctx: InferCtx::new(),
            errors: Vec::new(),
            expr_types: vec![Ty::Error; ast.exprs.len()],
            ret_stack: Vec::new(),
            async_stack: Vec::new(),
            type_param_stack: Vec::new(),
            self_ty_stack: Vec::new(),
            call_instantiations: FxHashMap::default(),
            ext_calls: FxHashMap::default(),
            exports: Vec::new(),
            current_module: None,
        };
        prelude::install(&mut checker.defs, &mut checker.table, &mut checker.traits);
        checker
    }

    /// Run both passes over the unit.
    pub fn run(&mut self) {
        self.declare_items(&self.ast.items);
        for item in &self.ast.items {
            self.check_stmt(*item);
        }
        // Final resolution: pin every expression type through the
        // unification table so later passes see concrete terms.
        for ty in self.expr_types.iter_mut() {
            let resolved = self.ctx.resolve(ty);
            *ty = canonicalize(&resolved);
        }
    }

    // ── Declaration pass ───────────────────────────────────────────────

    fn declare_items(&mut self, items: &[StmtId]) {
        for item in items {
            self.declare_item(*item);
        }
    }

    fn declare_item(&mut self, id: StmtId) {
        let stmt = self.ast.stmt(id);
        let span = stmt.span;
        match &stmt.kind {
            StmtKind::Fn(decl) => self.declare_fn(decl, id, span),
            StmtKind::Class(decl) => self.declare_class(decl, span),
            StmtKind::Enum(decl) => self.declare_enum(decl, span),
            StmtKind::Trait(decl) => self.declare_trait(decl, span),
            StmtKind::Impl(decl) => self.declare_impl(decl, span),
            StmtKind::Extend { target, methods } => {
                self.declare_extend(target, methods, span)
            }
            StmtKind::Module { name, body } => self.declare_module(name, body, span),
            StmtKind::Prop(decl) => {
                let ty = self.resolve_type_expr(decl.ty);
                self.defs.props.insert(
                    decl.name.clone(),
                    PropInfo {
                        name: decl.name.clone(),
                        ty: ty.clone(),
                        getter: decl.getter,
                        setter: decl.setter.clone(),
                        span,
                    },
                );
                self.declare_binding(decl.name.clone(), BindingKind::Property, ty, span, true);
            }
            _ => {}
        }
    }

    fn declare_fn(&mut self, decl: &FnDecl, id: StmtId, span: Span) {
        let sig = self.build_fn_sig(decl, id, span);
        let qualified = self.qualify(&decl.name);
        self.declare_binding(
            decl.name.clone(),
            BindingKind::Function,
            sig.ty(),
            span,
            false,
        );
        self.defs.fns.insert(qualified, sig);
    }

    /// Resolve a function declaration into a signature. `self`
    /// parameters are kept (typed from the enclosing `Self`).
    fn build_fn_sig(&mut self, decl: &FnDecl, id: StmtId, span: Span) -> FnSig {
        let type_params: Vec<(String, Vec<String>)> = decl
            .type_params
            .iter()
            .map(|p| (p.name.clone(), p.bounds.clone()))
            .collect();
        self.type_param_stack
            .push(type_params.iter().map(|(n, _)| n.clone()).collect());

        let mut param_names = Vec::new();
        let mut params = Vec::new();
        let mut moved_params = Vec::new();
        for param in &decl.params {
            param_names.push(param.name.clone());
            moved_params.push(param.is_moved);
            let ty = if param.name == "self" {
                self.self_ty_stack.last().cloned().unwrap_or(Ty::Error)
            } else {
                match param.ty {
                    Some(ty) => self.resolve_type_expr(ty),
                    None => {
                        self.errors.push(TypeError::CannotInfer {
                            name: param.name.clone(),
                            span: param.span,
                        });
                        Ty::Error
                    }
                }
            };
            params.push(ty);
        }
        let ret = match decl.ret {
            Some(ty) => self.resolve_type_expr(ty),
            None => Ty::void(),
        };
        self.type_param_stack.pop();

        FnSig {
            name: self.qualify(&decl.name),
            type_params,
            param_names,
            params,
            moved_params,
            ret,
            is_async: decl.is_async,
            decl: Some(id),
            span,
        }
    }

    fn declare_class(&mut self, decl: &ClassDecl, span: Span) {
        let type_params: Vec<String> = decl.type_params.iter().map(|p| p.name.clone()).collect();
        self.type_param_stack.push(type_params.clone());
        let self_ty = Ty::Named {
            name: decl.name.clone(),
            args: type_params.iter().map(|p| Ty::Param(p.clone())).collect(),
        };
        self.self_ty_stack.push(self_ty.clone());

        let fields: Vec<(String, Ty)> = decl
            .fields
            .iter()
            .map(|f| (f.name.clone(), self.resolve_type_expr(f.ty)))
            .collect();
        let mut methods = FxHashMap::default();
        for method_id in &decl.methods {
            if let StmtKind::Fn(method) = &self.ast.stmt(*method_id).kind {
                let sig = self.build_fn_sig(method, *method_id, self.ast.stmt(*method_id).span);
                methods.insert(method.name.clone(), sig);
            }
        }

        self.self_ty_stack.pop();
        self.type_param_stack.pop();

        self.defs.classes.insert(
            decl.name.clone(),
            ClassInfo {
                name: decl.name.clone(),
                type_params,
                base: decl.base.clone(),
                fields,
                methods,
                span,
            },
        );
        self.declare_binding(
            decl.name.clone(),
            BindingKind::Type,
            self_ty_for_name(&decl.name),
            span,
            false,
        );
    }

    fn declare_enum(&mut self, decl: &EnumDecl, span: Span) {
        let type_params: Vec<String> = decl.type_params.iter().map(|p| p.name.clone()).collect();
        self.type_param_stack.push(type_params.clone());
        let variants: Vec<VariantInfo> = decl
            .variants
            .iter()
            .map(|v| VariantInfo {
                name: v.name.clone(),
                payload: v.fields.iter().map(|f| self.resolve_type_expr(*f)).collect(),
                span: v.span,
            })
            .collect();
        self.type_param_stack.pop();

        self.defs.enums.insert(
            decl.name.clone(),
            EnumInfo {
                name: decl.name.clone(),
                type_params,
                variants,
                is_builtin: false,
                span,
            },
        );
        self.declare_binding(
            decl.name.clone(),
            BindingKind::Type,
            self_ty_for_name(&decl.name),
            span,
            false,
        );
    }

    fn declare_trait(&mut self, decl: &TraitDecl, span: Span) {
        let mut methods = Vec::new();
        for method in &decl.methods {
            let params: Vec<Ty> = method
                .params
                .iter()
                .filter(|p| p.name != "self")
                .map(|p| match p.ty {
                    Some(ty) => self.resolve_type_expr(ty),
                    None => Ty::Error,
                })
                .collect();
            let ret = match method.ret {
                Some(ty) => self.resolve_type_expr(ty),
                None => Ty::void(),
            };
            methods.push(TraitMethodSig {
                name: method.name.clone(),
                params,
                ret,
                default_body: method.default_body,
                span: method.span,
            });
        }
        if let Some(err) = self.traits.register_trait(TraitDef {
            name: decl.name.clone(),
            supertraits: decl.supertraits.clone(),
            methods,
            span,
        }) {
            self.errors.push(err);
        }
        self.declare_binding(
            decl.name.clone(),
            BindingKind::Trait,
            Ty::TraitObj(decl.name.clone()),
            span,
            false,
        );
    }

    fn declare_impl(&mut self, decl: &ImplDecl, span: Span) {
        let target = self.resolve_type_expr(decl.target);
        self.self_ty_stack.push(target.clone());
        let mut methods = FxHashMap::default();
        for method_id in &decl.methods {
            if let StmtKind::Fn(method) = &self.ast.stmt(*method_id).kind {
                let sig = self.build_fn_sig(method, *method_id, self.ast.stmt(*method_id).span);
                let params: Vec<Ty> = sig
                    .param_names
                    .iter()
                    .zip(sig.params.iter())
                    .filter(|(n, _)| n.as_str() != "self")
                    .map(|(_, t)| t.clone())
                    .collect();
                methods.insert(
                    method.name.clone(),
                    ImplMethod {
                        name: method.name.clone(),
                        params,
                        ret: sig.ret.clone(),
                        decl: *method_id,
                    },
                );
            }
        }
        self.self_ty_stack.pop();
        let errors = self.traits.register_impl(ImplDef {
            trait_name: decl.trait_name.clone(),
            target,
            methods,
            span,
        });
        self.errors.extend(errors);
    }

    fn declare_extend(&mut self, target: &str, methods: &[StmtId], span: Span) {
        let Some(target_ty) = self.resolve_type_name(target) else {
            self.errors.push(TypeError::UnknownType {
                name: target.to_string(),
                span,
            });
            return;
        };
        let key = type_key(&target_ty);
        self.self_ty_stack.push(target_ty);
        for method_id in methods {
            if let StmtKind::Fn(method) = &self.ast.stmt(*method_id).kind {
                let mspan = self.ast.stmt(*method_id).span;
                let sig = self.build_fn_sig(method, *method_id, mspan);
                let mangled = format!("{key}_{}", method.name);
                let params: Vec<Ty> = sig
                    .param_names
                    .iter()
                    .zip(sig.params.iter())
                    .filter(|(n, _)| n.as_str() != "self")
                    .map(|(_, t)| t.clone())
                    .collect();
                if let Some(err) = self.exts.register(
                    &key,
                    &method.name,
                    ExtMethod {
                        params,
                        ret: sig.ret.clone(),
                        mangled: mangled.clone(),
                        decl: *method_id,
                        span: mspan,
                    },
                ) {
                    self.errors.push(err);
                }
                // The rewritten free function also lives in the function
                // table so lowering and the backend can find it.
                let mut free_sig = sig;
                free_sig.name = mangled.clone();
                self.defs.fns.insert(mangled, free_sig);
            }
        }
        self.self_ty_stack.pop();
    }

    fn declare_module(&mut self, name: &str, body: &[StmtId], span: Span) {
        self.declare_binding(
            name.to_string(),
            BindingKind::Module,
            Ty::void(),
            span,
            false,
        );
        let saved = self.current_module.replace(name.to_string());
        self.table.push_scope();
        self.declare_items(body);
        for binding in self.table.current_bindings() {
            self.table.expose_qualified(name, binding);
        }
        self.table.pop_scope();
        self.current_module = saved;
    }

    fn declare_binding(
        &mut self,
        name: String,
        kind: BindingKind,
        ty: Ty,
        span: Span,
        mutable: bool,
    ) {
        let result = self.table.declare(Binding {
            name: name.clone(),
            kind,
            ty,
            span,
            mutable,
            visibility: Visibility::Public,
        });
        match result {
            Ok(()) => {}
            Err(DeclareError::Duplicate { previous }) => {
                self.errors.push(TypeError::Duplicate { name, span, previous });
            }
            Err(DeclareError::Reserved) => {
                self.errors.push(TypeError::InvalidAssignment {
                    reason: format!("`{name}` is a reserved name"),
                    span,
                });
            }
        }
    }

    fn qualify(&self, name: &str) -> String {
        match &self.current_module {
            Some(module) => format!("{module}.{name}"),
            None => name.to_string(),
        }
    }

    // ── Type syntax resolution ─────────────────────────────────────────

    /// Resolve a surface type expression into a semantic term.
    pub fn resolve_type_expr(&mut self, id: TypeId) -> Ty {
        let node = self.ast.type_expr(id);
        let span = node.span;
        match node.kind.clone() {
            TypeExprKind::Name { name, args } => {
                let args: Vec<Ty> = args.iter().map(|a| self.resolve_type_expr(*a)).collect();
                self.resolve_named_type(&name, args, span)
            }
            TypeExprKind::Fun { params, ret, is_async } => Ty::Fun {
                params: params.iter().map(|p| self.resolve_type_expr(*p)).collect(),
                ret: Box::new(self.resolve_type_expr(ret)),
                is_async,
            },
            TypeExprKind::Tuple(elems) => {
                Ty::tuple(elems.iter().map(|e| self.resolve_type_expr(*e)).collect())
            }
            TypeExprKind::Union(members) => canonicalize(&Ty::Union(
                members.iter().map(|m| self.resolve_type_expr(*m)).collect(),
            )),
            TypeExprKind::TraitObject(name) => {
                if self.traits.get_trait(&name).is_none() {
                    self.errors.push(TypeError::UnknownType { name: name.clone(), span });
                }
                Ty::TraitObj(name)
            }
            TypeExprKind::RValueRef(inner) => {
                Ty::RValueRef(Box::new(self.resolve_type_expr(inner)))
            }
        }
    }

    fn resolve_named_type(&mut self, name: &str, args: Vec<Ty>, span: Span) -> Ty {
        // Primitives.
        let prim = match name {
            "int" => Some(Prim::Int),
            "float32" => Some(Prim::Float32),
            "float64" | "float" => Some(Prim::Float64),
            "bool" => Some(Prim::Bool),
            "string" => Some(Prim::Str),
            "void" => Some(Prim::Void),
            _ => None,
        };
        if let Some(p) = prim {
            if !args.is_empty() {
                self.errors.push(TypeError::ArityMismatch {
                    expected: 0,
                    found: args.len(),
                    span,
                });
            }
            return Ty::Prim(p);
        }

        // Generic parameters in scope.
        if args.is_empty()
            && self
                .type_param_stack
                .iter()
                .any(|frame| frame.iter().any(|p| p == name))
        {
            return Ty::Param(name.to_string());
        }

        // `Self` inside class/impl/extend bodies.
        if name == "Self" {
            if let Some(self_ty) = self.self_ty_stack.last() {
                return self_ty.clone();
            }
            return Ty::named("Self");
        }

        // Builtin containers.
        let builtin_arity = match name {
            "list" | "Channel" | "Future" | "Promise" | "Option" => Some(1),
            "dict" | "Result" => Some(2),
            _ => None,
        };
        if let Some(arity) = builtin_arity {
            if args.len() != arity {
                self.errors.push(TypeError::ArityMismatch {
                    expected: arity,
                    found: args.len(),
                    span,
                });
                return Ty::Error;
            }
            return Ty::Generic { name: name.to_string(), args };
        }

        // User-defined enums and classes.
        if let Some(info) = self.defs.enums.get(name) {
            if args.len() != info.type_params.len() {
                self.errors.push(TypeError::ArityMismatch {
                    expected: info.type_params.len(),
                    found: args.len(),
                    span,
                });
                return Ty::Error;
            }
            return info.ty(args);
        }
        if let Some(info) = self.defs.classes.get(name) {
            if args.len() != info.type_params.len() {
                self.errors.push(TypeError::ArityMismatch {
                    expected: info.type_params.len(),
                    found: args.len(),
                    span,
                });
                return Ty::Error;
            }
            return Ty::Named { name: name.to_string(), args };
        }

        self.errors.push(TypeError::UnknownType {
            name: name.to_string(),
            span,
        });
        Ty::Error
    }

    /// Resolve a bare type name (extension targets).
    fn resolve_type_name(&self, name: &str) -> Option<Ty> {
        let prim = match name {
            "int" => Some(Prim::Int),
            "float32" => Some(Prim::Float32),
            "float64" | "float" => Some(Prim::Float64),
            "bool" => Some(Prim::Bool),
            "string" => Some(Prim::Str),
            _ => None,
        };
        if let Some(p) = prim {
            return Some(Ty::Prim(p));
        }
        match name {
            "list" | "dict" | "Channel" | "Future" | "Promise" | "Option" | "Result" => {
                return Some(Ty::Generic { name: name.to_string(), args: vec![] })
            }
            _ => {}
        }
        if self.defs.enums.contains_key(name) || self.defs.classes.contains_key(name) {
            return Some(Ty::named(name));
        }
        None
    }

    // ── Assignability ──────────────────────────────────────────────────

    /// Whether `from` may flow into a slot of type `to`, resolving
    /// placeholders as a side effect.
    pub fn assignable(&mut self, from: &Ty, to: &Ty) -> bool {
        let from = self.ctx.resolve(from);
        let to = self.ctx.resolve(to);

        if matches!(from, Ty::Error) || matches!(to, Ty::Error) {
            return true;
        }
        // `nil` into nil-admitting types.
        if matches!(from, Ty::Nil) {
            return to.admits_nil();
        }
        // Numeric widening, never narrowing.
        if let (Ty::Prim(pf), Ty::Prim(pt)) = (&from, &to) {
            if widens_to(*pf, *pt) {
                return true;
            }
        }
        // A union source must be accepted member-wise.
        if let Ty::Union(members) = &from {
            return members.iter().all(|m| {
                let m = m.clone();
                self.assignable(&m, &to)
            });
        }
        // A union target accepts any single member.
        if let Ty::Union(members) = &to {
            return members.iter().any(|m| {
                let m = m.clone();
                self.assignable(&from, &m)
            });
        }
        // A trait object accepts any implementor.
        if let Ty::TraitObj(trait_name) = &to {
            if matches!(from, Ty::TraitObj(ref f) if f == trait_name) {
                return true;
            }
            return self.traits.has_impl(trait_name, &from);
        }
        // An rvalue-reference target takes exactly its inner type.
        if let Ty::RValueRef(inner) = &to {
            let inner = inner.as_ref().clone();
            return self.assignable(&from, &inner);
        }
        // Structural identity, joining placeholders.
        self.ctx.unify(&from, &to).is_ok()
    }

    fn require_assignable(&mut self, from: &Ty, to: &Ty, span: Span) {
        if !self.assignable(from, to) {
            let from = self.ctx.resolve(from);
            let to = self.ctx.resolve(to);
            if matches!(from, Ty::Nil) {
                self.errors.push(TypeError::NilNotAllowed { target: to, span });
            } else {
                self.errors.push(TypeError::Mismatch {
                    expected: to,
                    found: from,
                    span,
                });
            }
        }
    }

    // ── Statements ─────────────────────────────────────────────────────

    pub fn check_stmt(&mut self, id: StmtId) {
        let stmt: &Stmt = self.ast.stmt(id);
        let span = stmt.span;
        match stmt.kind.clone() {
            StmtKind::Expr(expr) => {
                self.check_expr(expr);
            }
            StmtKind::Block(stmts) => {
                self.table.push_scope();
                for s in stmts {
                    self.check_stmt(s);
                }
                self.table.pop_scope();
            }
            StmtKind::Let { name, is_const, ty, init } => {
                self.check_let(name, is_const, ty, init, span)
            }
            StmtKind::Fn(decl) => {
                // Top-level declarations were registered in the
                // declaration pass; nested ones are declared here.
                if self.table.resolve(&decl.name).is_none() {
                    self.declare_fn(&decl, id, span);
                }
                let sig = self.defs.fns.get(&self.qualify(&decl.name)).cloned();
                if let Some(sig) = sig {
                    self.check_fn_body(&decl, &sig, None);
                }
            }
            StmtKind::Return(value) => self.check_return(value, span),
            StmtKind::If { cond, then_block, elifs, else_block } => {
                let cond_ty = self.check_expr(cond);
                self.require_assignable(&cond_ty, &Ty::bool(), self.ast.expr(cond).span);
                self.check_stmt(then_block);
                for (elif_cond, elif_block) in elifs {
                    let ty = self.check_expr(elif_cond);
                    self.require_assignable(&ty, &Ty::bool(), self.ast.expr(elif_cond).span);
                    self.check_stmt(elif_block);
                }
                if let Some(else_block) = else_block {
                    self.check_stmt(else_block);
                }
            }
            StmtKind::While { cond, body } => {
                let cond_ty = self.check_expr(cond);
                self.require_assignable(&cond_ty, &Ty::bool(), self.ast.expr(cond).span);
                self.check_stmt(body);
            }
            StmtKind::For { name, iterable, body } => {
                let iter_ty = self.check_expr(iterable);
                let elem = self.element_type(&iter_ty, self.ast.expr(iterable).span);
                self.table.push_scope();
                self.declare_binding(name, BindingKind::Variable, elem, span, false);
                self.check_stmt(body);
                self.table.pop_scope();
            }
            StmtKind::Break | StmtKind::Continue => {}
            StmtKind::Class(decl) => self.check_class_bodies(&decl),
            StmtKind::Enum(_) => {}
            StmtKind::Trait(decl) => self.check_trait_defaults(&decl),
            StmtKind::Impl(decl) => self.check_impl_bodies(&decl),
            StmtKind::Extend { target, methods } => {
                self.check_extend_bodies(&target, &methods)
            }
            StmtKind::Import { module, names } => self.check_import(&module, &names, span),
            StmtKind::Export { names } => {
                for name in names {
                    if self.table.resolve(&name).is_none() {
                        self.errors.push(TypeError::UnboundVariable {
                            name: name.clone(),
                            span,
                        });
                    }
                    self.exports.push(name);
                }
            }
            StmtKind::Module { name, body } => {
                let saved = self.current_module.replace(name.clone());
                self.table.push_scope();
                // Restore the module scope from its qualified exposure;
                // registries were already filled by the declaration pass.
                let bindings: Vec<Binding> = self
                    .table
                    .module_exports(&name)
                    .into_iter()
                    .cloned()
                    .collect();
                for binding in bindings {
                    let _ = self.table.declare(binding);
                }
                for s in &body {
                    self.check_stmt(*s);
                }
                self.table.pop_scope();
                self.current_module = saved;
            }
            StmtKind::Go { call } => {
                self.check_expr(call);
            }
            StmtKind::Defer { stmt } => self.check_stmt(stmt),
            StmtKind::Select { arms, default } => {
                for arm in arms {
                    self.table.push_scope();
                    match arm.op {
                        SelectOp::Recv { binding, channel } => {
                            let chan_ty = self.check_expr(channel);
                            let elem =
                                self.channel_element(&chan_ty, self.ast.expr(channel).span);
                            if let Some(binding) = binding {
                                self.declare_binding(
                                    binding,
                                    BindingKind::Variable,
                                    elem,
                                    arm.span,
                                    false,
                                );
                            }
                        }
                        SelectOp::Send { channel, value } => {
                            let chan_ty = self.check_expr(channel);
                            let elem =
                                self.channel_element(&chan_ty, self.ast.expr(channel).span);
                            let value_ty = self.check_expr(value);
                            self.require_assignable(
                                &value_ty,
                                &elem,
                                self.ast.expr(value).span,
                            );
                        }
                    }
                    self.check_stmt(arm.body);
                    self.table.pop_scope();
                }
                if let Some(default) = default {
                    self.check_stmt(default);
                }
            }
            StmtKind::Prop(decl) => {
                let prop_ty = self.resolve_type_expr(decl.ty);
                if let Some(getter) = decl.getter {
                    self.ret_stack.push(prop_ty.clone());
                    self.async_stack.push(false);
                    self.check_stmt(getter);
                    self.async_stack.pop();
                    self.ret_stack.pop();
                }
                if let Some((param, setter)) = decl.setter {
                    self.table.push_scope();
                    self.declare_binding(
                        param,
                        BindingKind::Parameter,
                        prop_ty.clone(),
                        span,
                        false,
                    );
                    self.ret_stack.push(Ty::void());
                    self.async_stack.push(false);
                    self.check_stmt(setter);
                    self.async_stack.pop();
                    self.ret_stack.pop();
                    self.table.pop_scope();
                }
            }
            StmtKind::Error => {}
        }
    }

    fn check_let(
        &mut self,
        name: String,
        is_const: bool,
        ty: Option<TypeId>,
        init: Option<ExprId>,
        span: Span,
    ) {
        let declared = ty.map(|t| self.resolve_type_expr(t));
        let init_ty = init.map(|e| (self.check_expr(e), self.ast.expr(e).span));

        let binding_ty = match (&declared, &init_ty) {
            (Some(declared), Some((init_ty, init_span))) => {
                self.require_assignable(init_ty, declared, *init_span);
                declared.clone()
            }
            (Some(declared), None) => declared.clone(),
            (None, Some((init_ty, init_span))) => {
                let resolved = self.ctx.resolve(init_ty);
                if matches!(resolved, Ty::Nil) {
                    self.errors.push(TypeError::CannotInfer {
                        name: name.clone(),
                        span: *init_span,
                    });
                    Ty::Error
                } else {
                    resolved
                }
            }
            (None, None) => {
                self.errors.push(TypeError::CannotInfer { name: name.clone(), span });
                Ty::Error
            }
        };

        self.declare_binding(name, BindingKind::Variable, binding_ty, span, !is_const);
    }

    fn check_return(&mut self, value: Option<ExprId>, span: Span) {
        let expected = self.ret_stack.last().cloned().unwrap_or(Ty::void());
        match value {
            Some(expr) => {
                let ty = self.check_expr(expr);
                self.require_assignable(&ty, &expected, self.ast.expr(expr).span);
            }
            None => {
                if !matches!(self.ctx.resolve(&expected), Ty::Prim(Prim::Void) | Ty::Error) {
                    self.errors.push(TypeError::Mismatch {
                        expected,
                        found: Ty::void(),
                        span,
                    });
                }
            }
        }
    }

    /// Check a function body under its signature.
    fn check_fn_body(&mut self, decl: &FnDecl, sig: &FnSig, self_ty: Option<Ty>) {
        let self_popped = self_ty.is_some();
        if let Some(self_ty) = self_ty {
            self.self_ty_stack.push(self_ty);
        }
        self.type_param_stack
            .push(sig.type_params.iter().map(|(n, _)| n.clone()).collect());
        self.table.push_scope();
        for ((name, ty), moved) in sig
            .param_names
            .iter()
            .zip(sig.params.iter())
            .zip(sig.moved_params.iter())
        {
            let _ = moved; // move discipline is the ownership pass's job
            self.declare_binding(
                name.clone(),
                BindingKind::Parameter,
                ty.clone(),
                sig.span,
                true,
            );
        }
        self.ret_stack.push(sig.ret.clone());
        self.async_stack.push(sig.is_async);
        self.check_stmt(decl.body);
        self.async_stack.pop();
        self.ret_stack.pop();
        self.table.pop_scope();
        self.type_param_stack.pop();
        if self_popped {
            self.self_ty_stack.pop();
        }
    }

    fn check_class_bodies(&mut self, decl: &ClassDecl) {
        let Some(info) = self.defs.classes.get(&decl.name).cloned() else {
            return;
        };
        let self_ty = Ty::Named {
            name: info.name.clone(),
            args: info.type_params.iter().map(|p| Ty::Param(p.clone())).collect(),
        };
        self.type_param_stack.push(info.type_params.clone());
        self.self_ty_stack.push(self_ty);
        for method_id in &decl.methods {
            if let StmtKind::Fn(method) = self.ast.stmt(*method_id).kind.clone() {
                if let Some(sig) = info.methods.get(&method.name).cloned() {
                    self.check_fn_body(&method, &sig, None);
                }
            }
        }
        self.self_ty_stack.pop();
        self.type_param_stack.pop();
    }

    fn check_trait_defaults(&mut self, decl: &TraitDecl) {
        self.self_ty_stack.push(Ty::TraitObj(decl.name.clone()));
        for method in &decl.methods {
            if let Some(body) = method.default_body {
                let params: Vec<(String, Ty)> = method
                    .params
                    .iter()
                    .map(|p| {
                        let ty = match p.ty {
                            Some(t) => self.resolve_type_expr(t),
                            None if p.name == "self" => {
                                Ty::TraitObj(decl.name.clone())
                            }
                            None => Ty::Error,
                        };
                        (p.name.clone(), ty)
                    })
                    .collect();
                let ret = match method.ret {
                    Some(t) => self.resolve_type_expr(t),
                    None => Ty::void(),
                };
                self.table.push_scope();
                for (name, ty) in params {
                    self.declare_binding(name, BindingKind::Parameter, ty, method.span, true);
                }
                self.ret_stack.push(ret);
                self.async_stack.push(false);
                self.check_stmt(body);
                self.async_stack.pop();
                self.ret_stack.pop();
                self.table.pop_scope();
            }
        }
        self.self_ty_stack.pop();
    }

    fn check_impl_bodies(&mut self, decl: &ImplDecl) {
        let target = self.resolve_type_expr(decl.target);
        self.self_ty_stack.push(target);
        for method_id in &decl.methods {
            if let StmtKind::Fn(method) = self.ast.stmt(*method_id).kind.clone() {
                let sig =
                    self.build_fn_sig(&method, *method_id, self.ast.stmt(*method_id).span);
                self.check_fn_body(&method, &sig, None);
            }
        }
        self.self_ty_stack.pop();
    }

    fn check_extend_bodies(&mut self, target: &str, methods: &[StmtId]) {
        let Some(target_ty) = self.resolve_type_name(target) else {
            return;
        };
        self.self_ty_stack.push(target_ty);
        for method_id in methods {
            if let StmtKind::Fn(method) = self.ast.stmt(*method_id).kind.clone() {
                let sig =
                    self.build_fn_sig(&method, *method_id, self.ast.stmt(*method_id).span);
                self.check_fn_body(&method, &sig, None);
            }
        }
        self.self_ty_stack.pop();
    }

    fn check_import(
        &mut self,
        module: &str,
        names: &[(String, Option<String>)],
        span: Span,
    ) {
        let exports = self.table.module_exports(module);
        if exports.is_empty() && self.table.resolve(module).is_none() {
            self.errors.push(TypeError::UnknownType {
                name: module.to_string(),
                span,
            });
            return;
        }
        let exports: Vec<Binding> = exports.into_iter().cloned().collect();
        for (name, alias) in names {
            match exports.iter().find(|b| &b.name == name) {
                Some(binding) => {
                    let local = alias.clone().unwrap_or_else(|| name.clone());
                    let mut imported = binding.clone();
                    imported.name = local;
                    let result = self.table.declare(imported.clone());
                    if let Err(DeclareError::Duplicate { previous }) = result {
                        self.errors.push(TypeError::Duplicate {
                            name: imported.name,
                            span,
                            previous,
                        });
                    }
                }
                None => {
                    self.errors.push(TypeError::UnboundVariable {
                        name: format!("{module}.{name}"),
                        span,
                    });
                }
            }
        }
    }

    // ── Expressions ────────────────────────────────────────────────────

    /// Synthesize and record the type of an expression.
    pub fn check_expr(&mut self, id: ExprId) -> Ty {
        let span = self.ast.expr(id).span;
        let ty = match self.ast.expr(id).kind.clone() {
            ExprKind::Int(_) => Ty::int(),
            ExprKind::Float(_) => Ty::float64(),
            ExprKind::Str(_) => Ty::string(),
            ExprKind::Bool(_) => Ty::bool(),
            ExprKind::Nil => Ty::Nil,
            ExprKind::Interp(segments) => {
                for segment in &segments {
                    if let InterpSegment::Expr(e) = segment {
                        self.check_expr(*e);
                    }
                }
                Ty::string()
            }
            ExprKind::Var(name) => self.check_var(&name, span),
            ExprKind::Unary { op, operand } => {
                let operand_ty = self.check_expr(operand);
                self.check_unary(op, &operand_ty, span)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs_ty = self.check_expr(lhs);
                let rhs_ty = self.check_expr(rhs);
                self.check_binary(op, &lhs_ty, &rhs_ty, span)
            }
            ExprKind::Group(inner) => self.check_expr(inner),
            ExprKind::Assign { target, value } => self.check_assign(target, value, span),
            ExprKind::Call { callee, type_args, args } => {
                self.check_call(id, callee, &type_args, &args, span)
            }
            ExprKind::Member { object, name } => self.check_member(object, &name, span),
            ExprKind::Index { object, index } => self.check_index(object, index, span),
            ExprKind::List(elems) => self.check_list(&elems),
            ExprKind::Dict(entries) => self.check_dict(&entries),
            ExprKind::Tuple(elems) => {
                let tys: Vec<Ty> = elems.iter().map(|e| self.check_expr(*e)).collect();
                if tys.is_empty() {
                    Ty::void()
                } else {
                    Ty::tuple(tys)
                }
            }
            ExprKind::Lambda { params, ret, body } => self.check_lambda(&params, ret, body),
            ExprKind::Await(operand) => {
                let operand_ty = self.check_expr(operand);
                self.check_await(&operand_ty, span)
            }
            ExprKind::Send { channel, value } => {
                let chan_ty = self.check_expr(channel);
                let elem = self.channel_element(&chan_ty, self.ast.expr(channel).span);
                let value_ty = self.check_expr(value);
                self.require_assignable(&value_ty, &elem, self.ast.expr(value).span);
                Ty::void()
            }
            ExprKind::Recv(channel) => {
                let chan_ty = self.check_expr(channel);
                self.channel_element(&chan_ty, self.ast.expr(channel).span)
            }
            ExprKind::Move(operand) => {
                // Moving preserves the type; validity is checked by the
                // ownership pass.
                self.check_expr(operand)
            }
            ExprKind::New { ty, args } => self.check_new(ty, &args, span),
            ExprKind::Delete(operand) => {
                let operand_ty = self.check_expr(operand);
                let resolved = self.ctx.resolve(&operand_ty);
                let deletable = matches!(
                    resolved,
                    Ty::Named { .. } | Ty::Error
                ) || matches!(&resolved, Ty::Generic { name, .. } if name == "Channel");
                if !deletable {
                    self.errors.push(TypeError::InvalidOperator {
                        op: "delete",
                        lhs: resolved,
                        rhs: None,
                        span,
                    });
                }
                Ty::void()
            }
            ExprKind::Cast { operand, ty } => {
                let operand_ty = self.check_expr(operand);
                let target = self.resolve_type_expr(ty);
                self.check_cast(&operand_ty, &target, span)
            }
            ExprKind::Match { scrutinee, arms } => self.check_match(scrutinee, &arms),
            ExprKind::Error => Ty::Error,
        };
        self.expr_types[id.index()] = ty.clone();
        ty
    }

    fn check_var(&mut self, name: &str, span: Span) -> Ty {
        if let Some(binding) = self.table.resolve(name) {
            let ty = binding.ty.clone();
            return self.ctx.resolve(&ty);
        }
        if name.contains('.') {
            if let Some(binding) = self.table.resolve_qualified(name) {
                let ty = binding.ty.clone();
                return self.ctx.resolve(&ty);
            }
        }
        // Enum constructors referenced as plain names.
        if let Some((info, variant)) = self.defs.variant_of(name) {
            let info = info.clone();
            let variant = variant.clone();
            return self.constructor_ty(&info, &variant);
        }
        self.errors.push(TypeError::UnboundVariable {
            name: name.to_string(),
            span,
        });
        Ty::Error
    }

    /// The type of a constructor reference: the enum itself for nullary
    /// variants, a function into the enum otherwise. Parameters are
    /// freshened per reference site.
    fn constructor_ty(&mut self, info: &EnumInfo, variant: &VariantInfo) -> Ty {
        let mut env = FxHashMap::default();
        for param in &info.type_params {
            env.insert(param.clone(), self.ctx.fresh_var());
        }
        let enum_ty = info.ty(
            info.type_params
                .iter()
                .map(|p| env.get(p).cloned().unwrap_or(Ty::Error))
                .collect(),
        );
        if variant.payload.is_empty() {
            enum_ty
        } else {
            Ty::Fun {
                params: variant.payload.iter().map(|p| substitute(p, &env)).collect(),
                ret: Box::new(enum_ty),
                is_async: false,
            }
        }
    }

    fn check_unary(&mut self, op: UnOp, operand: &Ty, span: Span) -> Ty {
        let operand = self.ctx.resolve(operand);
        if matches!(operand, Ty::Error) {
            return Ty::Error;
        }
        match op {
            UnOp::Neg => match &operand {
                Ty::Prim(p) if p.is_numeric() => operand,
                _ => {
                    self.errors.push(TypeError::InvalidOperator {
                        op: "-",
                        lhs: operand,
                        rhs: None,
                        span,
                    });
                    Ty::Error
                }
            },
            UnOp::Not => match &operand {
                Ty::Prim(Prim::Bool) => Ty::bool(),
                _ => {
                    self.errors.push(TypeError::InvalidOperator {
                        op: "!",
                        lhs: operand,
                        rhs: None,
                        span,
                    });
                    Ty::Error
                }
            },
        }
    }

    fn check_binary(&mut self, op: BinOp, lhs: &Ty, rhs: &Ty, span: Span) -> Ty {
        let lhs = self.ctx.resolve(lhs);
        let rhs = self.ctx.resolve(rhs);
        if matches!(lhs, Ty::Error) || matches!(rhs, Ty::Error) {
            return if op.is_comparison() || op.is_equality() || op.is_logical() {
                Ty::bool()
            } else {
                Ty::Error
            };
        }

        let invalid = |checker: &mut Self| {
            checker.errors.push(TypeError::InvalidOperator {
                op: op.symbol(),
                lhs: lhs.clone(),
                rhs: Some(rhs.clone()),
                span,
            });
        };

        match op {
            BinOp::Add => {
                if let Some(widened) = numeric_join(&lhs, &rhs) {
                    return widened;
                }
                if matches!((&lhs, &rhs), (Ty::Prim(Prim::Str), Ty::Prim(Prim::Str))) {
                    return Ty::string();
                }
                invalid(self);
                Ty::Error
            }
            BinOp::Sub | BinOp::Mul | BinOp::Div => {
                if let Some(widened) = numeric_join(&lhs, &rhs) {
                    return widened;
                }
                invalid(self);
                Ty::Error
            }
            BinOp::Mod => {
                if matches!((&lhs, &rhs), (Ty::Prim(Prim::Int), Ty::Prim(Prim::Int))) {
                    return Ty::int();
                }
                invalid(self);
                Ty::Error
            }
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                let ordered = numeric_join(&lhs, &rhs).is_some()
                    || matches!((&lhs, &rhs), (Ty::Prim(Prim::Str), Ty::Prim(Prim::Str)));
                if !ordered {
                    invalid(self);
                }
                Ty::bool()
            }
            BinOp::Eq | BinOp::Ne => {
                let comparable = self.assignable(&lhs, &rhs) || self.assignable(&rhs, &lhs);
                if !comparable {
                    invalid(self);
                }
                Ty::bool()
            }
            BinOp::And | BinOp::Or => {
                if !matches!((&lhs, &rhs), (Ty::Prim(Prim::Bool), Ty::Prim(Prim::Bool))) {
                    invalid(self);
                }
                Ty::bool()
            }
        }
    }

    fn check_assign(&mut self, target: ExprId, value: ExprId, span: Span) -> Ty {
        let value_ty = self.check_expr(value);
        let value_span = self.ast.expr(value).span;

        match self.ast.expr(target).kind.clone() {
            ExprKind::Var(name) => {
                let binding = self.table.resolve(&name).cloned();
                match binding {
                    Some(binding) => {
                        if !binding.mutable {
                            self.errors.push(TypeError::InvalidAssignment {
                                reason: format!("`{name}` is declared `const`"),
                                span,
                            });
                        }
                        self.expr_types[target.index()] = binding.ty.clone();
                        self.require_assignable(&value_ty, &binding.ty, value_span);
                    }
                    None => {
                        self.errors.push(TypeError::UnboundVariable { name, span });
                    }
                }
            }
            ExprKind::Member { .. } | ExprKind::Index { .. } => {
                let target_ty = self.check_expr(target);
                self.require_assignable(&value_ty, &target_ty, value_span);
            }
            _ => {
                self.errors.push(TypeError::InvalidAssignment {
                    reason: "target is not a variable, member, or index".to_string(),
                    span,
                });
            }
        }
        Ty::void()
    }

    // ── Calls ──────────────────────────────────────────────────────────

    fn check_call(
        &mut self,
        call_id: ExprId,
        callee: ExprId,
        type_args: &[TypeId],
        args: &[ExprId],
        span: Span,
    ) -> Ty {
        let explicit: Vec<Ty> = type_args.iter().map(|t| self.resolve_type_expr(*t)).collect();

        match self.ast.expr(callee).kind.clone() {
            ExprKind::Var(name) => self.check_named_call(call_id, &name, &explicit, args, span),
            ExprKind::Member { object, name } => {
                self.check_method_call(call_id, object, &name, &explicit, args, span)
            }
            _ => {
                let callee_ty = self.check_expr(callee);
                self.check_value_call(&callee_ty, args, span)
            }
        }
    }

    /// A call whose callee is a bare (possibly qualified) name.
    fn check_named_call(
        &mut self,
        call_id: ExprId,
        name: &str,
        explicit: &[Ty],
        args: &[ExprId],
        span: Span,
    ) -> Ty {
        // Declared functions, in the current module first.
        let sig = self
            .defs
            .fns
            .get(&self.qualify(name))
            .or_else(|| self.defs.fns.get(name))
            .cloned();
        if let Some(sig) = sig {
            return self.check_sig_call(call_id, &sig, explicit, args, span);
        }

        // Enum constructors.
        if let Some((info, variant)) = self.defs.variant_of(name) {
            let info = info.clone();
            let variant = variant.clone();
            return self.check_ctor_call(&info, &variant, args, span);
        }

        // Local bindings holding function values (lambdas, parameters).
        if let Some(binding) = self.table.resolve(name).cloned() {
            let ty = self.ctx.resolve(&binding.ty);
            return self.check_value_call(&ty, args, span);
        }
        if name.contains('.') {
            if let Some(binding) = self.table.resolve_qualified(name).cloned() {
                if let Some(sig) = self.defs.fns.get(name).cloned() {
                    return self.check_sig_call(call_id, &sig, explicit, args, span);
                }
                let ty = self.ctx.resolve(&binding.ty);
                return self.check_value_call(&ty, args, span);
            }
        }

        self.errors.push(TypeError::UnboundVariable {
            name: name.to_string(),
            span,
        });
        for arg in args {
            self.check_expr(*arg);
        }
        Ty::Error
    }

    /// Call through a known signature, instantiating generics.
    fn check_sig_call(
        &mut self,
        call_id: ExprId,
        sig: &FnSig,
        explicit: &[Ty],
        args: &[ExprId],
        span: Span,
    ) -> Ty {
        let arg_tys: Vec<(Ty, Span)> = args
            .iter()
            .map(|a| (self.check_expr(*a), self.ast.expr(*a).span))
            .collect();

        if arg_tys.len() != sig.params.len() {
            self.errors.push(TypeError::ArityMismatch {
                expected: sig.params.len(),
                found: arg_tys.len(),
                span,
            });
            return Ty::Error;
        }

        if sig.type_params.is_empty() {
            for ((arg_ty, arg_span), param) in arg_tys.iter().zip(sig.params.iter()) {
                self.require_assignable(arg_ty, param, *arg_span);
            }
            return self.finish_call_ret(sig);
        }

        // Build the instantiation environment.
        let mut env: FxHashMap<String, Ty> = FxHashMap::default();
        if !explicit.is_empty() {
            if explicit.len() != sig.type_params.len() {
                self.errors.push(TypeError::ArityMismatch {
                    expected: sig.type_params.len(),
                    found: explicit.len(),
                    span,
                });
                return Ty::Error;
            }
            for ((name, _), concrete) in sig.type_params.iter().zip(explicit.iter()) {
                env.insert(name.clone(), concrete.clone());
            }
        } else {
            for (name, _) in &sig.type_params {
                env.insert(name.clone(), self.ctx.fresh_var());
            }
        }

        for ((arg_ty, arg_span), param) in arg_tys.iter().zip(sig.params.iter()) {
            let expected = substitute(param, &env);
            self.require_assignable(arg_ty, &expected, *arg_span);
        }

        // Pin down the concrete arguments.
        let mut concrete = Vec::new();
        let mut inferred_ok = true;
        for (name, bounds) in &sig.type_params {
            let ty = env.get(name).cloned().unwrap_or(Ty::Error);
            let resolved = self.ctx.resolve(&ty);
            if self.ctx.has_unresolved(&resolved) {
                self.errors.push(TypeError::CannotInfer {
                    name: name.clone(),
                    span,
                });
                inferred_ok = false;
                continue;
            }
            let errors = self.traits.check_bounds(&resolved, bounds, span);
            self.errors.extend(errors);
            concrete.push(canonicalize(&resolved));
        }
        if inferred_ok && sig.decl.is_some() {
            self.call_instantiations
                .insert(call_id, (sig.name.clone(), concrete));
        }

        let ret = substitute(&sig.ret, &env);
        let ret = self.ctx.resolve(&ret);
        if sig.is_async {
            self.async_call_ret(ret)
        } else {
            ret
        }
    }

    fn finish_call_ret(&mut self, sig: &FnSig) -> Ty {
        if sig.is_async {
            self.async_call_ret(sig.ret.clone())
        } else {
            sig.ret.clone()
        }
    }

    /// Calling an async function yields `Future<T>` inside another async
    /// function (awaitable) and `T` from synchronous code (the blocking
    /// wrapper).
    fn async_call_ret(&mut self, ret: Ty) -> Ty {
        if self.async_stack.last().copied().unwrap_or(false) {
            Ty::future(ret)
        } else {
            ret
        }
    }

    fn check_ctor_call(
        &mut self,
        info: &EnumInfo,
        variant: &VariantInfo,
        args: &[ExprId],
        span: Span,
    ) -> Ty {
        let mut env = FxHashMap::default();
        for param in &info.type_params {
            env.insert(param.clone(), self.ctx.fresh_var());
        }
        if args.len() != variant.payload.len() {
            self.errors.push(TypeError::ArityMismatch {
                expected: variant.payload.len(),
                found: args.len(),
                span,
            });
            return Ty::Error;
        }
        for (arg, payload) in args.iter().zip(variant.payload.iter()) {
            let arg_ty = self.check_expr(*arg);
            let expected = substitute(payload, &env);
            self.require_assignable(&arg_ty, &expected, self.ast.expr(*arg).span);
        }
        let enum_ty = info.ty(
            info.type_params
                .iter()
                .map(|p| env.get(p).cloned().unwrap_or(Ty::Error))
                .collect(),
        );
        self.ctx.resolve(&enum_ty)
    }

    /// Call through an arbitrary function-typed value.
    fn check_value_call(&mut self, callee_ty: &Ty, args: &[ExprId], span: Span) -> Ty {
        let callee_ty = self.ctx.resolve(callee_ty);
        match callee_ty {
            Ty::Fun { params, ret, is_async } => {
                if args.len() != params.len() {
                    self.errors.push(TypeError::ArityMismatch {
                        expected: params.len(),
                        found: args.len(),
                        span,
                    });
                    return Ty::Error;
                }
                for (arg, param) in args.iter().zip(params.iter()) {
                    let arg_ty = self.check_expr(*arg);
                    self.require_assignable(&arg_ty, param, self.ast.expr(*arg).span);
                }
                if is_async {
                    self.async_call_ret(*ret)
                } else {
                    *ret
                }
            }
            Ty::Error => {
                for arg in args {
                    self.check_expr(*arg);
                }
                Ty::Error
            }
            other => {
                self.errors.push(TypeError::NotCallable { ty: other, span });
                for arg in args {
                    self.check_expr(*arg);
                }
                Ty::Error
            }
        }
    }

    /// Resolve `receiver.method(args...)` per the dispatch ladder:
    /// module-qualified functions, class methods, trait impls, supertrait
    /// defaults, trait objects, then extension methods.
    fn check_method_call(
        &mut self,
        call_id: ExprId,
        object: ExprId,
        method: &str,
        explicit: &[Ty],
        args: &[ExprId],
        span: Span,
    ) -> Ty {
        // Module-qualified call: `Math.add(...)`.
        if let ExprKind::Var(name) = &self.ast.expr(object).kind {
            let is_module = self
                .table
                .resolve(name)
                .map(|b| b.kind == BindingKind::Module)
                .unwrap_or(false);
            if is_module {
                let qualified = format!("{name}.{method}");
                self.expr_types[object.index()] = Ty::void();
                return self.check_named_call(call_id, &qualified, explicit, args, span);
            }
            // Enum-qualified constructor: `Shape.Circle(...)`.
            let enum_variant = self
                .defs
                .enums
                .get(name)
                .and_then(|info| info.variant(method).map(|v| (info.clone(), v.clone())));
            if let Some((info, variant)) = enum_variant {
                self.expr_types[object.index()] = Ty::void();
                return self.check_ctor_call(&info, &variant, args, span);
            }
        }

        let recv_ty = self.check_expr(object);
        let recv_ty = self.ctx.resolve(&recv_ty);
        if matches!(recv_ty, Ty::Error) {
            for arg in args {
                self.check_expr(*arg);
            }
            return Ty::Error;
        }

        // Class methods, walking the base chain.
        if let Ty::Named { name, .. } = &recv_ty {
            if let Some(sig) = self.defs.method_of(name, method).cloned() {
                // Drop the leading `self` parameter for the call shape.
                let mut callee = sig.clone();
                if callee.param_names.first().map(String::as_str) == Some("self") {
                    callee.param_names.remove(0);
                    callee.params.remove(0);
                    callee.moved_params.remove(0);
                }
                return self.check_sig_call(call_id, &callee, explicit, args, span);
            }
        }

        // Trait impls and defaults on the concrete type.
        if let Some(resolved) = self.traits.resolve_concrete_method(&recv_ty, method) {
            return self.apply_resolved_method(&resolved.params, &resolved.ret, args, span);
        }

        // Dynamic dispatch through a trait object.
        if let Ty::TraitObj(trait_name) = &recv_ty {
            if let Some(resolved) = self.traits.resolve_dynamic_method(trait_name, method) {
                debug_assert!(matches!(resolved.dispatch, Dispatch::Dynamic { .. }));
                return self.apply_resolved_method(&resolved.params, &resolved.ret, args, span);
            }
        }

        // Extension methods, last.
        if let Some(ext) = self.exts.lookup(&recv_ty, method).cloned() {
            self.ext_calls.insert(call_id, ext.mangled.clone());
            return self.apply_resolved_method(&ext.params, &ext.ret, args, span);
        }

        self.errors.push(TypeError::UnknownMethod {
            receiver: recv_ty,
            name: method.to_string(),
            span,
        });
        for arg in args {
            self.check_expr(*arg);
        }
        Ty::Error
    }

    fn apply_resolved_method(
        &mut self,
        params: &[Ty],
        ret: &Ty,
        args: &[ExprId],
        span: Span,
    ) -> Ty {
        if args.len() != params.len() {
            self.errors.push(TypeError::ArityMismatch {
                expected: params.len(),
                found: args.len(),
                span,
            });
            return Ty::Error;
        }
        for (arg, param) in args.iter().zip(params.iter()) {
            let arg_ty = self.check_expr(*arg);
            self.require_assignable(&arg_ty, param, self.ast.expr(*arg).span);
        }
        ret.clone()
    }

    // ── Member access, indexing, collections ───────────────────────────

    fn check_member(&mut self, object: ExprId, name: &str, span: Span) -> Ty {
        // Module member read: `Math.pi`.
        if let ExprKind::Var(obj_name) = &self.ast.expr(object).kind {
            let is_module = self
                .table
                .resolve(obj_name)
                .map(|b| b.kind == BindingKind::Module)
                .unwrap_or(false);
            if is_module {
                let qualified = format!("{obj_name}.{name}");
                self.expr_types[object.index()] = Ty::void();
                if let Some(binding) = self.table.resolve_qualified(&qualified) {
                    let ty = binding.ty.clone();
                    return self.ctx.resolve(&ty);
                }
                self.errors.push(TypeError::UnboundVariable {
                    name: qualified,
                    span,
                });
                return Ty::Error;
            }
            // Nullary enum constructor: `Shape.Dot`.
            let enum_variant = self
                .defs
                .enums
                .get(obj_name)
                .and_then(|info| info.variant(name).map(|v| (info.clone(), v.clone())));
            if let Some((info, variant)) = enum_variant {
                self.expr_types[object.index()] = Ty::void();
                return self.constructor_ty(&info, &variant);
            }
        }

        let object_ty = self.check_expr(object);
        let object_ty = self.ctx.resolve(&object_ty);
        match &object_ty {
            Ty::Named { name: class_name, .. } => {
                if let Some(field_ty) = self.defs.field_of(class_name, name) {
                    return field_ty;
                }
                // A method referenced without a call: give it its
                // function type so `let f = obj.method` works.
                if let Some(sig) = self.defs.method_of(class_name, name) {
                    return sig.ty();
                }
                self.errors.push(TypeError::UnknownMethod {
                    receiver: object_ty.clone(),
                    name: name.to_string(),
                    span,
                });
                Ty::Error
            }
            Ty::Error => Ty::Error,
            _ => {
                self.errors.push(TypeError::UnknownMethod {
                    receiver: object_ty.clone(),
                    name: name.to_string(),
                    span,
                });
                Ty::Error
            }
        }
    }

    fn check_index(&mut self, object: ExprId, index: ExprId, span: Span) -> Ty {
        let object_ty = self.check_expr(object);
        let object_ty = self.ctx.resolve(&object_ty);
        let index_ty = self.check_expr(index);
        let index_span = self.ast.expr(index).span;
        match &object_ty {
            Ty::Generic { name, args } if name == "list" => {
                self.require_assignable(&index_ty, &Ty::int(), index_span);
                args.first().cloned().unwrap_or(Ty::Error)
            }
            Ty::Generic { name, args } if name == "dict" => {
                let key = args.first().cloned().unwrap_or(Ty::Error);
                self.require_assignable(&index_ty, &key, index_span);
                args.get(1).cloned().unwrap_or(Ty::Error)
            }
            Ty::Prim(Prim::Str) => {
                self.require_assignable(&index_ty, &Ty::int(), index_span);
                Ty::string()
            }
            Ty::Error => Ty::Error,
            _ => {
                self.errors.push(TypeError::InvalidOperator {
                    op: "[]",
                    lhs: object_ty.clone(),
                    rhs: Some(index_ty),
                    span,
                });
                Ty::Error
            }
        }
    }

    fn check_list(&mut self, elems: &[ExprId]) -> Ty {
        if elems.is_empty() {
            // Joinable placeholder: `list<any>` until first concrete use.
            let elem = self.ctx.fresh_var();
            return Ty::list(elem);
        }
        let first = self.check_expr(elems[0]);
        for elem in &elems[1..] {
            let ty = self.check_expr(*elem);
            self.require_assignable(&ty, &first, self.ast.expr(*elem).span);
        }
        Ty::list(self.ctx.resolve(&first))
    }

    fn check_dict(&mut self, entries: &[(ExprId, ExprId)]) -> Ty {
        if entries.is_empty() {
            let key = self.ctx.fresh_var();
            let value = self.ctx.fresh_var();
            return Ty::dict(key, value);
        }
        let (first_key, first_value) = entries[0];
        let key_ty = self.check_expr(first_key);
        let value_ty = self.check_expr(first_value);
        for (key, value) in &entries[1..] {
            let k = self.check_expr(*key);
            self.require_assignable(&k, &key_ty, self.ast.expr(*key).span);
            let v = self.check_expr(*value);
            self.require_assignable(&v, &value_ty, self.ast.expr(*value).span);
        }
        Ty::dict(self.ctx.resolve(&key_ty), self.ctx.resolve(&value_ty))
    }

    fn check_lambda(
        &mut self,
        params: &[tocin_ast::Param],
        ret: Option<TypeId>,
        body: StmtId,
    ) -> Ty {
        let param_tys: Vec<Ty> = params
            .iter()
            .map(|p| match p.ty {
                Some(ty) => self.resolve_type_expr(ty),
                None => self.ctx.fresh_var(),
            })
            .collect();
        let ret_ty = match ret {
            Some(ty) => self.resolve_type_expr(ty),
            None => Ty::void(),
        };

        self.table.push_scope();
        for (param, ty) in params.iter().zip(param_tys.iter()) {
            self.declare_binding(
                param.name.clone(),
                BindingKind::Parameter,
                ty.clone(),
                param.span,
                true,
            );
        }
        self.ret_stack.push(ret_ty.clone());
        self.async_stack.push(false);
        self.check_stmt(body);
        self.async_stack.pop();
        self.ret_stack.pop();
        self.table.pop_scope();

        let params = param_tys.iter().map(|t| self.ctx.resolve(t)).collect();
        Ty::Fun {
            params,
            ret: Box::new(self.ctx.resolve(&ret_ty)),
            is_async: false,
        }
    }

    fn check_await(&mut self, operand: &Ty, span: Span) -> Ty {
        if !self.async_stack.last().copied().unwrap_or(false) {
            self.errors.push(TypeError::AwaitOutsideAsync { span });
        }
        let operand = self.ctx.resolve(operand);
        match &operand {
            Ty::Generic { name, args } if name == "Future" => {
                args.first().cloned().unwrap_or(Ty::Error)
            }
            Ty::Error => Ty::Error,
            other => {
                self.errors.push(TypeError::Mismatch {
                    expected: Ty::future(Ty::Error),
                    found: other.clone(),
                    span,
                });
                Ty::Error
            }
        }
    }

    fn check_new(&mut self, ty: TypeId, args: &[ExprId], span: Span) -> Ty {
        let target = self.resolve_type_expr(ty);
        match &target {
            Ty::Named { name, args: type_args } => {
                let Some(info) = self.defs.classes.get(name.as_str()).cloned() else {
                    self.errors.push(TypeError::UnknownType {
                        name: name.clone(),
                        span,
                    });
                    return Ty::Error;
                };
                let mut env = FxHashMap::default();
                for (param, arg) in info.type_params.iter().zip(type_args.iter()) {
                    env.insert(param.clone(), arg.clone());
                }
                let fields = self.defs.all_fields(name);
                if args.len() != fields.len() {
                    self.errors.push(TypeError::ArityMismatch {
                        expected: fields.len(),
                        found: args.len(),
                        span,
                    });
                    return target.clone();
                }
                for (arg, (_, field_ty)) in args.iter().zip(fields.iter()) {
                    let arg_ty = self.check_expr(*arg);
                    let expected = substitute(field_ty, &env);
                    self.require_assignable(&arg_ty, &expected, self.ast.expr(*arg).span);
                }
                target.clone()
            }
            Ty::Generic { name, .. } if name == "Channel" => {
                if !args.is_empty() {
                    self.errors.push(TypeError::ArityMismatch {
                        expected: 0,
                        found: args.len(),
                        span,
                    });
                }
                target.clone()
            }
            Ty::Error => Ty::Error,
            other => {
                self.errors.push(TypeError::Mismatch {
                    expected: Ty::named("<class>"),
                    found: other.clone(),
                    span,
                });
                Ty::Error
            }
        }
    }

    fn check_cast(&mut self, operand: &Ty, target: &Ty, span: Span) -> Ty {
        let operand = self.ctx.resolve(operand);
        if matches!(operand, Ty::Error) || matches!(target, Ty::Error) {
            return target.clone();
        }
        // Numeric casts in both directions (narrowing requires this
        // explicit form).
        if let (Ty::Prim(from), Ty::Prim(to)) = (&operand, target) {
            if from.is_numeric() && to.is_numeric() {
                return target.clone();
            }
        }
        // Upcast to a trait object the operand implements.
        if let Ty::TraitObj(trait_name) = target {
            if self.traits.has_impl(trait_name, &operand) {
                return target.clone();
            }
        }
        if self.assignable(&operand, target) {
            return target.clone();
        }
        self.errors.push(TypeError::Mismatch {
            expected: target.clone(),
            found: operand,
            span,
        });
        target.clone()
    }

    // ── Match ──────────────────────────────────────────────────────────

    fn check_match(&mut self, scrutinee: ExprId, arms: &[tocin_ast::MatchArm]) -> Ty {
        let scrutinee_ty = self.check_expr(scrutinee);
        let scrutinee_ty = self.ctx.resolve(&scrutinee_ty);

        let mut result: Option<Ty> = None;
        for arm in arms {
            self.table.push_scope();
            let mut bindings = Vec::new();
            self.check_pattern(arm.pattern, &scrutinee_ty, &mut bindings);
            for (name, ty, bind_span) in bindings {
                self.declare_binding(name, BindingKind::Variable, ty, bind_span, false);
            }
            if let Some(guard) = arm.guard {
                let guard_ty = self.check_expr(guard);
                self.require_assignable(&guard_ty, &Ty::bool(), self.ast.expr(guard).span);
            }
            let body_ty = self.check_expr(arm.body);
            self.table.pop_scope();

            match &result {
                None => result = Some(body_ty),
                Some(current) => {
                    let current = current.clone();
                    if self.assignable(&body_ty, &current) {
                        // keep current
                    } else if self.assignable(&current, &body_ty) {
                        result = Some(body_ty);
                    } else {
                        self.errors.push(TypeError::Mismatch {
                            expected: current,
                            found: body_ty,
                            span: arm.span,
                        });
                    }
                }
            }
        }
        result
            .map(|t| self.ctx.resolve(&t))
            .unwrap_or_else(Ty::void)
    }

    /// Check a pattern against the scrutinee type, collecting bindings.
    pub fn check_pattern(
        &mut self,
        pat: PatId,
        expected: &Ty,
        bindings: &mut Vec<(String, Ty, Span)>,
    ) {
        let span = self.ast.pat(pat).span;
        match self.ast.pat(pat).kind.clone() {
            PatKind::Wildcard => {}
            PatKind::Lit(lit) => {
                let lit_ty = match lit {
                    PatLit::Int(_) => Ty::int(),
                    PatLit::Float(_) => Ty::float64(),
                    PatLit::Str(_) => Ty::string(),
                    PatLit::Bool(_) => Ty::bool(),
                    PatLit::Nil => Ty::Nil,
                };
                self.require_assignable(&lit_ty, expected, span);
            }
            PatKind::Bind(name) => {
                bindings.push((name, expected.clone(), span));
            }
            PatKind::Ctor { name, args } => {
                let Some((info, variant)) = self.defs.variant_of(&name) else {
                    self.errors.push(TypeError::UnknownConstructor { name, span });
                    return;
                };
                let info = info.clone();
                let variant = variant.clone();
                let mut env = FxHashMap::default();
                for param in &info.type_params {
                    env.insert(param.clone(), self.ctx.fresh_var());
                }
                let enum_ty = info.ty(
                    info.type_params
                        .iter()
                        .map(|p| env.get(p).cloned().unwrap_or(Ty::Error))
                        .collect(),
                );
                self.require_assignable(&enum_ty, expected, span);
                if args.len() != variant.payload.len() {
                    self.errors.push(TypeError::ArityMismatch {
                        expected: variant.payload.len(),
                        found: args.len(),
                        span,
                    });
                    return;
                }
                for (sub, payload) in args.iter().zip(variant.payload.iter()) {
                    let sub_ty = substitute(payload, &env);
                    let sub_ty = self.ctx.resolve(&sub_ty);
                    self.check_pattern(*sub, &sub_ty, bindings);
                }
            }
            PatKind::Tuple(elems) => {
                let expected = self.ctx.resolve(expected);
                match &expected {
                    Ty::Generic { name, args } if name == "tuple" && args.len() == elems.len() => {
                        for (sub, ty) in elems.iter().zip(args.iter()) {
                            self.check_pattern(*sub, ty, bindings);
                        }
                    }
                    Ty::Error => {
                        for sub in &elems {
                            self.check_pattern(*sub, &Ty::Error, bindings);
                        }
                    }
                    other => {
                        self.errors.push(TypeError::Mismatch {
                            expected: Ty::tuple(vec![Ty::Error; elems.len()]),
                            found: other.clone(),
                            span,
                        });
                    }
                }
            }
            PatKind::Struct { name, fields } => {
                let Some(info) = self.defs.classes.get(&name).cloned() else {
                    self.errors.push(TypeError::UnknownType { name, span });
                    return;
                };
                let struct_ty = Ty::Named {
                    name: info.name.clone(),
                    args: vec![],
                };
                self.require_assignable(&struct_ty, expected, span);
                for (field, sub) in &fields {
                    match self.defs.field_of(&info.name, field) {
                        Some(field_ty) => self.check_pattern(*sub, &field_ty, bindings),
                        None => {
                            self.errors.push(TypeError::UnknownMethod {
                                receiver: struct_ty.clone(),
                                name: field.clone(),
                                span,
                            });
                        }
                    }
                }
            }
            PatKind::Or(alts) => {
                let mut first_bindings: Option<Vec<(String, Ty, Span)>> = None;
                for alt in &alts {
                    let mut alt_bindings = Vec::new();
                    self.check_pattern(*alt, expected, &mut alt_bindings);
                    match &first_bindings {
                        None => first_bindings = Some(alt_bindings),
                        Some(first) => {
                            let mut expected_names: Vec<String> =
                                first.iter().map(|(n, _, _)| n.clone()).collect();
                            let mut found_names: Vec<String> =
                                alt_bindings.iter().map(|(n, _, _)| n.clone()).collect();
                            expected_names.sort();
                            found_names.sort();
                            if expected_names != found_names {
                                self.errors.push(TypeError::OrPatternBindingMismatch {
                                    expected: expected_names,
                                    found: found_names,
                                    span,
                                });
                            }
                        }
                    }
                }
                if let Some(first) = first_bindings {
                    bindings.extend(first);
                }
            }
        }
    }

    // ── Helpers ────────────────────────────────────────────────────────

    fn element_type(&mut self, iterable: &Ty, span: Span) -> Ty {
        let iterable = self.ctx.resolve(iterable);
        match &iterable {
            Ty::Generic { name, args } if name == "list" => {
                args.first().cloned().unwrap_or(Ty::Error)
            }
            Ty::Generic { name, args } if name == "dict" => Ty::tuple(args.clone()),
            Ty::Prim(Prim::Str) => Ty::string(),
            Ty::Error => Ty::Error,
            other => {
                self.errors.push(TypeError::InvalidOperator {
                    op: "for-in",
                    lhs: other.clone(),
                    rhs: None,
                    span,
                });
                Ty::Error
            }
        }
    }

    fn channel_element(&mut self, chan: &Ty, span: Span) -> Ty {
        let chan = self.ctx.resolve(chan);
        match &chan {
            Ty::Generic { name, args } if name == "Channel" => {
                args.first().cloned().unwrap_or(Ty::Error)
            }
            Ty::Error => Ty::Error,
            other => {
                self.errors.push(TypeError::Mismatch {
                    expected: Ty::channel(Ty::Error),
                    found: other.clone(),
                    span,
                });
                Ty::Error
            }
        }
    }
}

fn self_ty_for_name(name: &str) -> Ty {
    Ty::named(name)
}

/// The widened result of a numeric operator, when both operands are
/// numeric.
fn numeric_join(lhs: &Ty, rhs: &Ty) -> Option<Ty> {
    match (lhs, rhs) {
        (Ty::Prim(a), Ty::Prim(b)) if a.is_numeric() && b.is_numeric() => {
            if *a == Prim::Float64 || *b == Prim::Float64 {
                Some(Ty::float64())
            } else if *a == Prim::Float32 || *b == Prim::Float32 {
                Some(Ty::float32())
            } else {
                Some(Ty::int())
            }
        }
        _ => None,
    }
}

/// Implicit widening: `int` into either float width, `float32` into
/// `float64`. Narrowing is never implicit.
fn widens_to(from: Prim, to: Prim) -> bool {
    matches!(
        (from, to),
        (Prim::Int, Prim::Float32)
            | (Prim::Int, Prim::Float64)
            | (Prim::Float32, Prim::Float64)
    )
}
