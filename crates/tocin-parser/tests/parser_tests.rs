//! Parser integration tests: source text in, AST shapes out.

use tocin_ast::{BinOp, ExprKind, PatKind, StmtKind};
use tocin_common::FileId;
use tocin_parser::parse_source;

fn parse_ok(source: &str) -> tocin_ast::Ast {
    let (ast, diags) = parse_source(FileId(0), source);
    assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
    ast
}

#[test]
fn arithmetic_precedence() {
    let ast = parse_ok("let x: int = 2 + 3 * 4");
    let item = ast.stmt(ast.items[0]);
    let StmtKind::Let { name, init, .. } = &item.kind else {
        panic!("expected let, got {:?}", item.kind);
    };
    assert_eq!(name, "x");
    let init = init.expect("initializer");
    // `+` at the top, `*` nested on the right.
    let ExprKind::Binary { op: BinOp::Add, rhs, .. } = &ast.expr(init).kind else {
        panic!("expected add at root");
    };
    assert!(matches!(
        ast.expr(*rhs).kind,
        ExprKind::Binary { op: BinOp::Mul, .. }
    ));
}

#[test]
fn function_with_bounds_and_body() {
    let ast = parse_ok("fn f<T: Display + Clone>(x: T) -> T { return x }");
    let StmtKind::Fn(decl) = &ast.stmt(ast.items[0]).kind else {
        panic!("expected fn");
    };
    assert_eq!(decl.name, "f");
    assert_eq!(decl.type_params.len(), 1);
    assert_eq!(decl.type_params[0].bounds, vec!["Display", "Clone"]);
    assert_eq!(decl.params.len(), 1);
    assert!(!decl.is_async);
}

#[test]
fn async_fn_and_await() {
    let ast = parse_ok("async fn g() -> int { return await h() }");
    let StmtKind::Fn(decl) = &ast.stmt(ast.items[0]).kind else {
        panic!("expected fn");
    };
    assert!(decl.is_async);
}

#[test]
fn match_expression_with_arms() {
    let ast = parse_ok("let r = match opt { Some(x) -> x, None -> 0 }");
    let StmtKind::Let { init, .. } = &ast.stmt(ast.items[0]).kind else {
        panic!("expected let");
    };
    let ExprKind::Match { arms, .. } = &ast.expr(init.unwrap()).kind else {
        panic!("expected match");
    };
    assert_eq!(arms.len(), 2);
    assert!(matches!(
        &ast.pat(arms[0].pattern).kind,
        PatKind::Ctor { name, args } if name == "Some" && args.len() == 1
    ));
    assert!(matches!(
        &ast.pat(arms[1].pattern).kind,
        PatKind::Ctor { name, args } if name == "None" && args.is_empty()
    ));
}

#[test]
fn or_pattern_and_guard() {
    let ast = parse_ok("let r = match n { 1 | 2 -> true, m if m > 10 -> true, _ -> false }");
    let StmtKind::Let { init, .. } = &ast.stmt(ast.items[0]).kind else {
        panic!("expected let");
    };
    let ExprKind::Match { arms, .. } = &ast.expr(init.unwrap()).kind else {
        panic!("expected match");
    };
    assert!(matches!(&ast.pat(arms[0].pattern).kind, PatKind::Or(alts) if alts.len() == 2));
    assert!(arms[1].guard.is_some());
    assert!(matches!(&ast.pat(arms[2].pattern).kind, PatKind::Wildcard));
}

#[test]
fn generic_call_vs_comparison() {
    // `id<int>(3)` is a call with explicit type args...
    let ast = parse_ok("let a = id<int>(3)");
    let StmtKind::Let { init, .. } = &ast.stmt(ast.items[0]).kind else {
        panic!("expected let");
    };
    let ExprKind::Call { type_args, args, .. } = &ast.expr(init.unwrap()).kind else {
        panic!("expected call, got {:?}", ast.expr(init.unwrap()).kind);
    };
    assert_eq!(type_args.len(), 1);
    assert_eq!(args.len(), 1);

    // ...while `a < b` stays a comparison.
    let ast = parse_ok("let c = a < b");
    let StmtKind::Let { init, .. } = &ast.stmt(ast.items[0]).kind else {
        panic!("expected let");
    };
    assert!(matches!(
        ast.expr(init.unwrap()).kind,
        ExprKind::Binary { op: BinOp::Lt, .. }
    ));
}

#[test]
fn channel_send_and_receive() {
    let ast = parse_ok("ch <- 1; let v = <-ch");
    let StmtKind::Expr(send) = &ast.stmt(ast.items[0]).kind else {
        panic!("expected expr stmt");
    };
    assert!(matches!(ast.expr(*send).kind, ExprKind::Send { .. }));
    let StmtKind::Let { init, .. } = &ast.stmt(ast.items[1]).kind else {
        panic!("expected let");
    };
    assert!(matches!(ast.expr(init.unwrap()).kind, ExprKind::Recv(_)));
}

#[test]
fn enum_trait_impl_extend() {
    let ast = parse_ok(
        "enum Shape { Circle(float64), Rect(float64, float64), Dot }\n\
         trait Area { fn area(self) -> float64; }\n\
         impl Area for Shape { fn area(self) -> float64 { return 0.0 } }\n\
         extend int { fn double(self) -> int { return self * 2 } }",
    );
    assert!(matches!(
        &ast.stmt(ast.items[0]).kind,
        StmtKind::Enum(decl) if decl.variants.len() == 3
    ));
    assert!(matches!(
        &ast.stmt(ast.items[1]).kind,
        StmtKind::Trait(decl) if decl.methods.len() == 1 && decl.methods[0].default_body.is_none()
    ));
    assert!(matches!(&ast.stmt(ast.items[2]).kind, StmtKind::Impl(_)));
    assert!(matches!(
        &ast.stmt(ast.items[3]).kind,
        StmtKind::Extend { target, methods } if target == "int" && methods.len() == 1
    ));
}

#[test]
fn import_with_aliases() {
    let ast = parse_ok("import Math.{sin, cos as cosine}");
    let StmtKind::Import { module, names } = &ast.stmt(ast.items[0]).kind else {
        panic!("expected import");
    };
    assert_eq!(module, "Math");
    assert_eq!(names.len(), 2);
    assert_eq!(names[1], ("cos".to_string(), Some("cosine".to_string())));
}

#[test]
fn go_defer_select() {
    let ast = parse_ok(
        "go work(1)\n\
         defer close(ch)\n\
         select { case v = <-ch { use(v) } default { } }",
    );
    assert!(matches!(&ast.stmt(ast.items[0]).kind, StmtKind::Go { .. }));
    assert!(matches!(&ast.stmt(ast.items[1]).kind, StmtKind::Defer { .. }));
    let StmtKind::Select { arms, default } = &ast.stmt(ast.items[2]).kind else {
        panic!("expected select");
    };
    assert_eq!(arms.len(), 1);
    assert!(default.is_some());
}

#[test]
fn interpolated_string() {
    let ast = parse_ok("let s = \"sum is ${a + b}!\"");
    let StmtKind::Let { init, .. } = &ast.stmt(ast.items[0]).kind else {
        panic!("expected let");
    };
    let ExprKind::Interp(segments) = &ast.expr(init.unwrap()).kind else {
        panic!("expected interpolated string");
    };
    assert_eq!(segments.len(), 3);
}

#[test]
fn class_with_base_and_members() {
    let ast = parse_ok(
        "class Dog : Animal { name: string; fn speak(self) -> string { return \"woof\" } }",
    );
    let StmtKind::Class(decl) = &ast.stmt(ast.items[0]).kind else {
        panic!("expected class");
    };
    assert_eq!(decl.base.as_deref(), Some("Animal"));
    assert_eq!(decl.fields.len(), 1);
    assert_eq!(decl.methods.len(), 1);
}

#[test]
fn syntax_error_recovers_and_reports_s001() {
    let (ast, diags) = parse_source(FileId(0), "let = 3\nlet y = 4");
    assert!(!diags.is_empty());
    assert!(diags.iter().all(|d| d.code == tocin_common::Code::S001));
    // The second statement still parses.
    assert!(ast
        .items
        .iter()
        .any(|s| matches!(&ast.stmt(*s).kind, StmtKind::Let { name, .. } if name == "y")));
}

#[test]
fn move_and_new_delete() {
    let ast = parse_ok("let b = move a\nlet p = new Point(1, 2)\ndelete p");
    let StmtKind::Let { init, .. } = &ast.stmt(ast.items[0]).kind else {
        panic!("expected let");
    };
    assert!(matches!(ast.expr(init.unwrap()).kind, ExprKind::Move(_)));
    let StmtKind::Let { init, .. } = &ast.stmt(ast.items[1]).kind else {
        panic!("expected let");
    };
    assert!(matches!(ast.expr(init.unwrap()).kind, ExprKind::New { .. }));
}

#[test]
fn defer_registers_statement() {
    let ast = parse_ok("fn f() { defer cleanup() }");
    let StmtKind::Fn(decl) = &ast.stmt(ast.items[0]).kind else {
        panic!("expected fn");
    };
    let StmtKind::Block(stmts) = &ast.stmt(decl.body).kind else {
        panic!("expected block");
    };
    assert!(matches!(&ast.stmt(stmts[0]).kind, StmtKind::Defer { .. }));
}
