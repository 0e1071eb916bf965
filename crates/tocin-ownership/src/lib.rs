//! Ownership and move analysis.
//!
//! Runs after type checking, per function body (and once over the
//! top-level statements). The control-flow graph is walked at statement
//! granularity through the structured statement tree: branches are
//! analyzed on environment copies and joined, and loop headers are fixed
//! points reached by re-analyzing the body until the entry environment
//! is stable.
//!
//! Transitions:
//! - a declaration without an initializer seeds `Uninitialized`; the
//!   first assignment makes it `Owned`;
//! - `move x`, and any assignment/return whose right-hand side is a
//!   plain reference to a non-`Copy` variable, make the source `Moved`;
//! - passing a variable to a moved-in parameter moves it;
//! - a `go` capture of a non-`Copy` variable marks it `Borrowed`, and a
//!   later move of a borrowed variable is `B002`;
//! - reading a `Moved` variable is `B001`.
//!
//! `defer` actions are replayed in reverse registration order against
//! the environment at every exit edge of their scope (fall-through and
//! `return`), and must not read `Moved` variables.

mod state;

pub use state::{BorrowKind, Env, OwnState, VarState};

use tocin_ast::{Ast, ExprId, ExprKind, InterpSegment, SelectOp, StmtId, StmtKind};
use tocin_common::diag::{Code, Diagnostic, Diagnostics, Severity};
use tocin_common::Span;
use tocin_typeck::{Ty, TypeckResult};

/// Run the analysis over one unit, reporting `B001`/`B002`.
pub fn analyze(ast: &Ast, typeck: &TypeckResult, diags: &mut Diagnostics) {
    let mut checker = MoveChecker {
        ast,
        typeck,
        errors: Vec::new(),
    };

    // Top-level statements form the unit's implicit body.
    let mut env = Env::new();
    let mut defers = DeferStack::new();
    defers.push_scope();
    for item in &ast.items {
        checker.analyze_stmt(*item, &mut env, &mut defers);
    }
    checker.run_defers(&defers.pop_scope(), &env);

    // Every declared function body, including methods and extensions.
    for sig in typeck.defs.fns.values() {
        if let Some(decl_id) = sig.decl {
            if let StmtKind::Fn(decl) = &ast.stmt(decl_id).kind {
                checker.analyze_fn(decl, sig);
            }
        }
    }

    for error in checker.errors {
        diags.report(error.into_diagnostic(ast.file));
    }
}

/// An ownership violation.
#[derive(Debug, Clone)]
enum OwnError {
    UseAfterMove { name: String, span: Span },
    InvalidMove { reason: String, span: Span },
}

impl OwnError {
    fn into_diagnostic(self, file: tocin_common::FileId) -> Diagnostic {
        match self {
            OwnError::UseAfterMove { name, span } => Diagnostic::new(
                Code::B001,
                Severity::Error,
                format!("use of moved variable `{name}`"),
                file,
                span,
            ),
            OwnError::InvalidMove { reason, span } => {
                Diagnostic::new(Code::B002, Severity::Error, reason, file, span)
            }
        }
    }
}

/// Deferred statements, per enclosing scope, in registration order.
struct DeferStack {
    scopes: Vec<Vec<StmtId>>,
}

impl DeferStack {
    fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    fn push_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    fn pop_scope(&mut self) -> Vec<StmtId> {
        self.scopes.pop().unwrap_or_default()
    }

    fn register(&mut self, stmt: StmtId) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(stmt);
        }
    }

    /// Everything registered anywhere up the stack, for `return` edges.
    fn all(&self) -> Vec<StmtId> {
        self.scopes.iter().flatten().copied().collect()
    }
}

struct MoveChecker<'a> {
    ast: &'a Ast,
    typeck: &'a TypeckResult,
    errors: Vec<OwnError>,
}

impl<'a> MoveChecker<'a> {
    fn analyze_fn(&mut self, decl: &tocin_ast::FnDecl, sig: &tocin_typeck::FnSig) {
        let mut env = Env::new();
        for (name, ty) in sig.param_names.iter().zip(sig.params.iter()) {
            env.declare(name, OwnState::Owned, ty.is_copy(), sig.span);
        }
        let mut defers = DeferStack::new();
        defers.push_scope();
        self.analyze_stmt(decl.body, &mut env, &mut defers);
        self.run_defers(&defers.pop_scope(), &env);
    }

    // ── Statements ─────────────────────────────────────────────────────

    fn analyze_stmt(&mut self, id: StmtId, env: &mut Env, defers: &mut DeferStack) {
        let stmt = self.ast.stmt(id);
        let span = stmt.span;
        match stmt.kind.clone() {
            StmtKind::Expr(expr) => {
                self.analyze_expr(expr, env);
            }
            StmtKind::Block(stmts) => {
                defers.push_scope();
                for s in stmts {
                    self.analyze_stmt(s, env, defers);
                }
                self.run_defers(&defers.pop_scope(), env);
            }
            StmtKind::Let { name, init, .. } => {
                match init {
                    Some(init) => {
                        self.analyze_expr(init, env);
                        self.implicit_move_of_source(init, env);
                        let is_copy = self.expr_ty(init).is_copy();
                        env.declare(&name, OwnState::Owned, is_copy, span);
                    }
                    None => {
                        env.declare(&name, OwnState::Uninitialized, false, span);
                    }
                }
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.analyze_expr(value, env);
                    self.implicit_move_of_source(value, env);
                }
                // Every registered defer runs on this exit edge.
                let pending = defers.all();
                self.run_defers(&pending, env);
            }
            StmtKind::If { cond, then_block, elifs, else_block } => {
                self.analyze_expr(cond, env);
                let mut branches = Vec::new();

                let mut then_env = env.clone();
                self.analyze_stmt(then_block, &mut then_env, defers);
                branches.push(then_env);

                for (elif_cond, elif_block) in elifs {
                    self.analyze_expr(elif_cond, env);
                    let mut elif_env = env.clone();
                    self.analyze_stmt(elif_block, &mut elif_env, defers);
                    branches.push(elif_env);
                }

                match else_block {
                    Some(else_block) => {
                        let mut else_env = env.clone();
                        self.analyze_stmt(else_block, &mut else_env, defers);
                        branches.push(else_env);
                    }
                    None => {
                        // Fall-through predecessor with no branch taken.
                        branches.push(env.clone());
                    }
                }

                let mut joined = branches[0].clone();
                for branch in &branches[1..] {
                    joined = joined.join(branch);
                }
                *env = joined;
            }
            StmtKind::While { cond, body } => {
                self.loop_fixpoint(env, |checker, env| {
                    checker.analyze_expr(cond, env);
                    let mut body_env = env.clone();
                    checker.analyze_stmt(body, &mut body_env, &mut DeferStack::new());
                    env.join(&body_env)
                });
                // Re-walk once for diagnostics at the stable state.
                self.analyze_expr(cond, env);
                let mut body_env = env.clone();
                self.analyze_stmt(body, &mut body_env, defers);
                *env = env.join(&body_env);
            }
            StmtKind::For { name, iterable, body } => {
                self.analyze_expr(iterable, env);
                self.loop_fixpoint(env, |checker, env| {
                    let mut body_env = env.clone();
                    body_env.declare(&name, OwnState::Owned, true, span);
                    checker.analyze_stmt(body, &mut body_env, &mut DeferStack::new());
                    env.join(&body_env)
                });
                let mut body_env = env.clone();
                body_env.declare(&name, OwnState::Owned, true, span);
                self.analyze_stmt(body, &mut body_env, defers);
                *env = env.join(&body_env);
            }
            StmtKind::Break | StmtKind::Continue => {}
            StmtKind::Go { call } => self.analyze_go(call, env),
            StmtKind::Defer { stmt } => {
                defers.register(stmt);
            }
            StmtKind::Select { arms, default } => {
                let mut branches = Vec::new();
                for arm in arms {
                    let mut arm_env = env.clone();
                    match arm.op {
                        SelectOp::Recv { binding, channel } => {
                            self.analyze_expr(channel, &mut arm_env);
                            if let Some(binding) = binding {
                                arm_env.declare(&binding, OwnState::Owned, false, arm.span);
                            }
                        }
                        SelectOp::Send { channel, value } => {
                            self.analyze_expr(channel, &mut arm_env);
                            self.analyze_expr(value, &mut arm_env);
                            self.implicit_move_of_source(value, &mut arm_env);
                        }
                    }
                    self.analyze_stmt(arm.body, &mut arm_env, defers);
                    branches.push(arm_env);
                }
                if let Some(default) = default {
                    let mut default_env = env.clone();
                    self.analyze_stmt(default, &mut default_env, defers);
                    branches.push(default_env);
                } else if branches.is_empty() {
                    branches.push(env.clone());
                }
                let mut joined = branches[0].clone();
                for branch in &branches[1..] {
                    joined = joined.join(branch);
                }
                *env = joined;
            }
            // Declarations carry no runtime ownership flow of their own;
            // their bodies are analyzed as separate functions.
            StmtKind::Fn(_)
            | StmtKind::Class(_)
            | StmtKind::Enum(_)
            | StmtKind::Trait(_)
            | StmtKind::Impl(_)
            | StmtKind::Extend { .. }
            | StmtKind::Import { .. }
            | StmtKind::Export { .. }
            | StmtKind::Prop(_)
            | StmtKind::Error => {}
            StmtKind::Module { body, .. } => {
                for s in body {
                    self.analyze_stmt(s, env, defers);
                }
            }
        }
    }

    /// Iterate a loop body until the entry environment is stable. The
    /// lattice is finite, so this terminates; the cap is a backstop.
    fn loop_fixpoint(
        &mut self,
        env: &mut Env,
        mut step: impl FnMut(&mut Self, &mut Env) -> Env,
    ) {
        // Errors found during fixpoint iteration are duplicates of the
        // final re-walk; keep only the stable-state ones.
        let saved_errors = self.errors.len();
        for _ in 0..8 {
            let next = step(self, env);
            if next == *env {
                break;
            }
            *env = next;
        }
        self.errors.truncate(saved_errors);
    }

    /// Replay deferred statements in reverse registration order against
    /// the exit environment.
    fn run_defers(&mut self, registered: &[StmtId], env: &Env) {
        for stmt in registered.iter().rev() {
            let mut defer_env = env.clone();
            let mut defers = DeferStack::new();
            defers.push_scope();
            self.analyze_stmt(*stmt, &mut defer_env, &mut defers);
        }
    }

    // ── Expressions ────────────────────────────────────────────────────

    fn analyze_expr(&mut self, id: ExprId, env: &mut Env) {
        let span = self.ast.expr(id).span;
        match self.ast.expr(id).kind.clone() {
            ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::Str(_)
            | ExprKind::Bool(_)
            | ExprKind::Nil
            | ExprKind::Error => {}
            ExprKind::Interp(segments) => {
                for segment in segments {
                    if let InterpSegment::Expr(e) = segment {
                        self.analyze_expr(e, env);
                    }
                }
            }
            ExprKind::Var(name) => self.check_read(&name, span, env),
            ExprKind::Unary { operand, .. } => self.analyze_expr(operand, env),
            ExprKind::Binary { lhs, rhs, .. } => {
                self.analyze_expr(lhs, env);
                self.analyze_expr(rhs, env);
            }
            ExprKind::Group(inner) => self.analyze_expr(inner, env),
            ExprKind::Assign { target, value } => {
                self.analyze_expr(value, env);
                self.implicit_move_of_source(value, env);
                match self.ast.expr(target).kind.clone() {
                    ExprKind::Var(name) => {
                        // First assignment initializes; reassignment
                        // re-owns.
                        if env.get(&name).is_some() {
                            env.set_state(&name, OwnState::Owned, span);
                        }
                    }
                    _ => self.analyze_expr(target, env),
                }
            }
            ExprKind::Call { callee, args, .. } => self.analyze_call(callee, &args, env),
            ExprKind::Member { object, .. } => self.analyze_expr(object, env),
            ExprKind::Index { object, index } => {
                self.analyze_expr(object, env);
                self.analyze_expr(index, env);
            }
            ExprKind::List(elems) => {
                for elem in elems {
                    self.analyze_expr(elem, env);
                    self.implicit_move_of_source(elem, env);
                }
            }
            ExprKind::Dict(entries) => {
                for (key, value) in entries {
                    self.analyze_expr(key, env);
                    self.analyze_expr(value, env);
                    self.implicit_move_of_source(value, env);
                }
            }
            ExprKind::Tuple(elems) => {
                for elem in elems {
                    self.analyze_expr(elem, env);
                    self.implicit_move_of_source(elem, env);
                }
            }
            ExprKind::Lambda { body, .. } => {
                // The closure observes captures at creation; moves
                // inside it do not leak into this frame.
                let mut inner = env.clone();
                let mut defers = DeferStack::new();
                defers.push_scope();
                self.analyze_stmt(body, &mut inner, &mut defers);
            }
            ExprKind::Await(operand) => self.analyze_expr(operand, env),
            ExprKind::Send { channel, value } => {
                self.analyze_expr(channel, env);
                self.analyze_expr(value, env);
                // A send transfers the value to the receiver.
                self.implicit_move_of_source(value, env);
            }
            ExprKind::Recv(channel) => self.analyze_expr(channel, env),
            ExprKind::Move(operand) => self.analyze_move(operand, span, env),
            ExprKind::New { args, .. } => {
                for arg in args {
                    self.analyze_expr(arg, env);
                    self.implicit_move_of_source(arg, env);
                }
            }
            ExprKind::Delete(operand) => {
                self.analyze_expr(operand, env);
                // Deleting consumes the storage.
                self.implicit_move_of_source(operand, env);
            }
            ExprKind::Cast { operand, .. } => self.analyze_expr(operand, env),
            ExprKind::Match { scrutinee, arms } => {
                self.analyze_expr(scrutinee, env);
                let mut branches = Vec::new();
                for arm in arms {
                    let mut arm_env = env.clone();
                    for name in self.ast.pattern_bindings(arm.pattern) {
                        arm_env.declare(&name, OwnState::Owned, true, arm.span);
                    }
                    if let Some(guard) = arm.guard {
                        self.analyze_expr(guard, &mut arm_env);
                    }
                    self.analyze_expr(arm.body, &mut arm_env);
                    branches.push(arm_env);
                }
                if let Some(first) = branches.first().cloned() {
                    let mut joined = first;
                    for branch in &branches[1..] {
                        joined = joined.join(branch);
                    }
                    *env = joined;
                }
            }
        }
    }

    /// `go f(args...)`: captured non-`Copy` variables become shared
    /// borrows observed by the spawned task.
    fn analyze_go(&mut self, call: ExprId, env: &mut Env) {
        if let ExprKind::Call { callee, args, .. } = self.ast.expr(call).kind.clone() {
            self.analyze_expr(callee, env);
            for arg in &args {
                self.analyze_expr(*arg, env);
                if let ExprKind::Var(name) = &self.ast.expr(*arg).kind {
                    if let Some(var) = env.get(name) {
                        if !var.is_copy && var.state == OwnState::Owned {
                            env.set_state(
                                name,
                                OwnState::Borrowed(BorrowKind::Shared),
                                self.ast.expr(*arg).span,
                            );
                        }
                    }
                }
            }
        } else {
            self.analyze_expr(call, env);
        }
    }

    fn analyze_call(&mut self, callee: ExprId, args: &[ExprId], env: &mut Env) {
        // Moved-in parameter positions come from the resolved signature.
        let moved_params = self.callee_moved_params(callee);

        match &self.ast.expr(callee).kind {
            // A named callee is a read only when it is a tracked local
            // (a lambda binding); global functions are not in the env.
            ExprKind::Var(name) => {
                let name = name.clone();
                self.check_read(&name, self.ast.expr(callee).span, env);
            }
            ExprKind::Member { object, .. } => {
                let object = *object;
                self.analyze_expr(object, env);
            }
            _ => self.analyze_expr(callee, env),
        }

        for (i, arg) in args.iter().enumerate() {
            self.analyze_expr(*arg, env);
            let moved_in = moved_params.as_ref().map(|m| m.get(i) == Some(&true)).unwrap_or(false);
            if moved_in {
                self.move_argument(*arg, env);
            }
        }
    }

    /// The moved-in flags of the callee's declared signature, when the
    /// callee is a known function name.
    fn callee_moved_params(&self, callee: ExprId) -> Option<Vec<bool>> {
        if let ExprKind::Var(name) = &self.ast.expr(callee).kind {
            if let Some(sig) = self.typeck.defs.fns.get(name) {
                return Some(sig.moved_params.clone());
            }
        }
        None
    }

    /// An argument flowing into a moved-in parameter.
    fn move_argument(&mut self, arg: ExprId, env: &mut Env) {
        let span = self.ast.expr(arg).span;
        match &self.ast.expr(arg).kind {
            ExprKind::Var(name) => {
                let name = name.clone();
                match env.get(&name) {
                    Some(var) if var.is_copy => {}
                    Some(var) => match var.state {
                        OwnState::Owned => env.set_state(&name, OwnState::Moved, span),
                        OwnState::Moved => self.errors.push(OwnError::UseAfterMove {
                            name,
                            span,
                        }),
                        OwnState::Borrowed(_) => self.errors.push(OwnError::InvalidMove {
                            reason: format!(
                                "cannot move `{name}` while it is observed by another task"
                            ),
                            span,
                        }),
                        OwnState::Uninitialized => self.errors.push(OwnError::InvalidMove {
                            reason: format!("cannot move uninitialized variable `{name}`"),
                            span,
                        }),
                    },
                    None => {}
                }
            }
            // Temporaries (call results, literals) move freely.
            _ => {}
        }
    }

    /// `move x`.
    fn analyze_move(&mut self, operand: ExprId, span: Span, env: &mut Env) {
        match &self.ast.expr(operand).kind {
            ExprKind::Var(name) => {
                let name = name.clone();
                match env.get(&name) {
                    Some(var) if var.is_copy => {}
                    Some(var) => match var.state {
                        OwnState::Owned => env.set_state(&name, OwnState::Moved, span),
                        OwnState::Moved => {
                            self.errors.push(OwnError::UseAfterMove { name, span })
                        }
                        OwnState::Borrowed(_) => self.errors.push(OwnError::InvalidMove {
                            reason: format!(
                                "cannot move `{name}` while it is observed by another task"
                            ),
                            span,
                        }),
                        OwnState::Uninitialized => self.errors.push(OwnError::InvalidMove {
                            reason: format!("cannot move uninitialized variable `{name}`"),
                            span,
                        }),
                    },
                    // Not a tracked local (a global or parameter of an
                    // enclosing frame): moving it is not meaningful.
                    None => self.errors.push(OwnError::InvalidMove {
                        reason: format!("cannot move `{name}`: not a local variable"),
                        span,
                    }),
                }
            }
            _ => {
                self.analyze_expr(operand, env);
                self.errors.push(OwnError::InvalidMove {
                    reason: "`move` requires a variable".to_string(),
                    span,
                });
            }
        }
    }

    /// Reading a variable: `Moved` reads are `B001`.
    fn check_read(&mut self, name: &str, span: Span, env: &Env) {
        if let Some(var) = env.get(name) {
            if var.state == OwnState::Moved {
                self.errors.push(OwnError::UseAfterMove {
                    name: name.to_string(),
                    span,
                });
            }
        }
    }

    /// An assignment, return, send, or container build whose source is a
    /// plain reference to a non-`Copy` variable transfers ownership.
    fn implicit_move_of_source(&mut self, source: ExprId, env: &mut Env) {
        let kind = self.ast.expr(source).kind.clone();
        let span = self.ast.expr(source).span;
        let inner = match kind {
            ExprKind::Var(name) => Some(name),
            ExprKind::Move(_) => None, // explicit move already handled
            _ => None,
        };
        if let Some(name) = inner {
            if let Some(var) = env.get(&name) {
                if !var.is_copy && var.state == OwnState::Owned {
                    env.set_state(&name, OwnState::Moved, span);
                }
            }
        }
    }

    fn expr_ty(&self, id: ExprId) -> &Ty {
        self.typeck.expr_ty(id)
    }
}
