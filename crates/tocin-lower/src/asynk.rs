//! The async transform.
//!
//! Every `async fn f(args...) -> T` lowers into a pair:
//!
//! - `f$async(args...) -> Future<T>`: allocates a Promise, obtains its
//!   Future, runs the original body with each `await` marked as a
//!   suspension point, and resolves the Promise on normal exit;
//! - `f(args...) -> T`: a synchronous wrapper that calls `f$async` and
//!   blocks on the returned Future, keeping existing call sites valid.
//!
//! The suspension mechanism itself (state machine vs. stackful) belongs
//! to the backend; what the transform guarantees is that every `await`
//! in the body is a recorded boundary where local state must be
//! materialized.

use tocin_ast::{Ast, ExprId, ExprKind, InterpSegment, StmtId, StmtKind};
use tocin_typeck::{FnSig, Ty};

/// One lowered async function pair.
#[derive(Debug, Clone)]
pub struct AsyncPair {
    /// The original declared name (`f`), now the blocking wrapper.
    pub wrapper: String,
    /// The transformed body (`f$async`).
    pub body_fn: String,
    /// The body's result type: `Future<T>`.
    pub future_ty: Ty,
    /// The wrapped value type `T`.
    pub value_ty: Ty,
    /// Every `await` in the body, in source order: the suspension
    /// points the backend must materialize state across.
    pub suspension_points: Vec<ExprId>,
    /// The original body statement.
    pub body: StmtId,
}

/// Transform one async signature into its pair.
pub fn transform(ast: &Ast, sig: &FnSig) -> AsyncPair {
    let body = sig.decl.and_then(|id| match &ast.stmt(id).kind {
        StmtKind::Fn(decl) => Some(decl.body),
        _ => None,
    });
    let mut suspension_points = Vec::new();
    if let Some(body) = body {
        collect_awaits_stmt(ast, body, &mut suspension_points);
    }
    AsyncPair {
        wrapper: sig.name.clone(),
        body_fn: format!("{}$async", sig.name),
        future_ty: Ty::future(sig.ret.clone()),
        value_ty: sig.ret.clone(),
        suspension_points,
        body: body.unwrap_or(StmtId(0)),
    }
}

fn collect_awaits_stmt(ast: &Ast, id: StmtId, out: &mut Vec<ExprId>) {
    match &ast.stmt(id).kind {
        StmtKind::Expr(expr) => collect_awaits_expr(ast, *expr, out),
        StmtKind::Block(stmts) => {
            for s in stmts {
                collect_awaits_stmt(ast, *s, out);
            }
        }
        StmtKind::Let { init, .. } => {
            if let Some(init) = init {
                collect_awaits_expr(ast, *init, out);
            }
        }
        StmtKind::Return(value) => {
            if let Some(value) = value {
                collect_awaits_expr(ast, *value, out);
            }
        }
        StmtKind::If { cond, then_block, elifs, else_block } => {
            collect_awaits_expr(ast, *cond, out);
            collect_awaits_stmt(ast, *then_block, out);
            for (elif_cond, elif_block) in elifs {
                collect_awaits_expr(ast, *elif_cond, out);
                collect_awaits_stmt(ast, *elif_block, out);
            }
            if let Some(else_block) = else_block {
                collect_awaits_stmt(ast, *else_block, out);
            }
        }
        StmtKind::While { cond, body } => {
            collect_awaits_expr(ast, *cond, out);
            collect_awaits_stmt(ast, *body, out);
        }
        StmtKind::For { iterable, body, .. } => {
            collect_awaits_expr(ast, *iterable, out);
            collect_awaits_stmt(ast, *body, out);
        }
        StmtKind::Go { call } => collect_awaits_expr(ast, *call, out),
        StmtKind::Defer { stmt } => collect_awaits_stmt(ast, *stmt, out),
        StmtKind::Select { arms, default } => {
            for arm in arms {
                collect_awaits_stmt(ast, arm.body, out);
            }
            if let Some(default) = default {
                collect_awaits_stmt(ast, *default, out);
            }
        }
        _ => {}
    }
}

fn collect_awaits_expr(ast: &Ast, id: ExprId, out: &mut Vec<ExprId>) {
    match &ast.expr(id).kind {
        ExprKind::Await(operand) => {
            collect_awaits_expr(ast, *operand, out);
            out.push(id);
        }
        ExprKind::Interp(segments) => {
            for segment in segments {
                if let InterpSegment::Expr(e) = segment {
                    collect_awaits_expr(ast, *e, out);
                }
            }
        }
        ExprKind::Unary { operand, .. }
        | ExprKind::Group(operand)
        | ExprKind::Move(operand)
        | ExprKind::Recv(operand)
        | ExprKind::Delete(operand)
        | ExprKind::Cast { operand, .. } => collect_awaits_expr(ast, *operand, out),
        ExprKind::Binary { lhs, rhs, .. } => {
            collect_awaits_expr(ast, *lhs, out);
            collect_awaits_expr(ast, *rhs, out);
        }
        ExprKind::Assign { target, value } => {
            collect_awaits_expr(ast, *target, out);
            collect_awaits_expr(ast, *value, out);
        }
        ExprKind::Call { callee, args, .. } => {
            collect_awaits_expr(ast, *callee, out);
            for arg in args {
                collect_awaits_expr(ast, *arg, out);
            }
        }
        ExprKind::Member { object, .. } => collect_awaits_expr(ast, *object, out),
        ExprKind::Index { object, index } => {
            collect_awaits_expr(ast, *object, out);
            collect_awaits_expr(ast, *index, out);
        }
        ExprKind::List(elems) | ExprKind::Tuple(elems) => {
            for elem in elems {
                collect_awaits_expr(ast, *elem, out);
            }
        }
        ExprKind::Dict(entries) => {
            for (key, value) in entries {
                collect_awaits_expr(ast, *key, out);
                collect_awaits_expr(ast, *value, out);
            }
        }
        ExprKind::Send { channel, value } => {
            collect_awaits_expr(ast, *channel, out);
            collect_awaits_expr(ast, *value, out);
        }
        ExprKind::New { args, .. } => {
            for arg in args {
                collect_awaits_expr(ast, *arg, out);
            }
        }
        ExprKind::Match { scrutinee, arms } => {
            collect_awaits_expr(ast, *scrutinee, out);
            for arm in arms {
                if let Some(guard) = arm.guard {
                    collect_awaits_expr(ast, guard, out);
                }
                collect_awaits_expr(ast, arm.body, out);
            }
        }
        // Lambdas are their own (non-async) frame; awaits inside one
        // were already rejected by the checker.
        ExprKind::Lambda { .. } => {}
        _ => {}
    }
}
