//! Expression typing: literals, collections, placeholders, generics,
//! match, channels, and the async call rules.

use tocin_ast::StmtKind;
use tocin_common::{Code, Diagnostics, FileId};
use tocin_typeck::{Ty, TypeckResult};

fn typecheck(source: &str) -> (tocin_ast::Ast, TypeckResult, Diagnostics) {
    let (ast, parse_diags) = tocin_parser::parse_source(FileId(0), source);
    assert!(
        parse_diags.is_empty(),
        "test source must parse cleanly: {parse_diags:?}"
    );
    let mut diags = Diagnostics::new();
    let result = tocin_typeck::check(&ast, &mut diags);
    (ast, result, diags)
}

/// The type of the initializer of the `index`-th top-level `let`.
fn let_init_ty(ast: &tocin_ast::Ast, result: &TypeckResult, index: usize) -> Ty {
    let mut seen = 0;
    for item in &ast.items {
        if let StmtKind::Let { init, .. } = &ast.stmt(*item).kind {
            if seen == index {
                return result.expr_ty(init.expect("initializer")).clone();
            }
            seen += 1;
        }
    }
    panic!("no let at index {index}");
}

#[test]
fn literal_types() {
    let (ast, result, diags) = typecheck(
        "let a = 1\n\
         let b = 1.5\n\
         let c = \"s\"\n\
         let d = true",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
    assert_eq!(let_init_ty(&ast, &result, 0), Ty::int());
    assert_eq!(let_init_ty(&ast, &result, 1), Ty::float64());
    assert_eq!(let_init_ty(&ast, &result, 2), Ty::string());
    assert_eq!(let_init_ty(&ast, &result, 3), Ty::bool());
}

#[test]
fn collection_literals() {
    let (ast, result, diags) = typecheck(
        "let xs = [1, 2, 3]\n\
         let kv = {\"a\": 1}\n\
         let tup = (1, \"x\")",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
    assert_eq!(let_init_ty(&ast, &result, 0), Ty::list(Ty::int()));
    assert_eq!(let_init_ty(&ast, &result, 1), Ty::dict(Ty::string(), Ty::int()));
    assert_eq!(
        let_init_ty(&ast, &result, 2),
        Ty::tuple(vec![Ty::int(), Ty::string()])
    );
}

#[test]
fn heterogeneous_list_is_t001() {
    let (_, _, diags) = typecheck("let xs = [1, \"two\"]");
    let codes: Vec<Code> = diags.entries().iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![Code::T001]);
}

#[test]
fn empty_list_placeholder_joins_at_first_use() {
    let (_, _, diags) = typecheck(
        "fn take(xs: list<int>) { }\n\
         let xs = []\n\
         take(xs)",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());

    // Joined once, the element type is pinned.
    let (_, _, diags) = typecheck(
        "fn take(xs: list<int>) { }\n\
         fn strings(xs: list<string>) { }\n\
         let xs = []\n\
         take(xs)\n\
         strings(xs)",
    );
    let codes: Vec<Code> = diags.entries().iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![Code::T001]);
}

#[test]
fn generic_identity_instantiates_per_call_site() {
    let (ast, result, diags) = typecheck(
        "fn id<T>(x: T) -> T { return x }\n\
         let a = id<int>(3)\n\
         let b = id(\"s\")",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
    assert_eq!(let_init_ty(&ast, &result, 0), Ty::int());
    assert_eq!(let_init_ty(&ast, &result, 1), Ty::string());
    // Both call sites recorded their concrete instantiation.
    let mut insts: Vec<(String, Vec<Ty>)> =
        result.call_instantiations.values().cloned().collect();
    insts.sort_by(|a, b| format!("{:?}", a).cmp(&format!("{:?}", b)));
    assert_eq!(insts.len(), 2);
    assert!(insts.contains(&("id".to_string(), vec![Ty::int()])));
    assert!(insts.contains(&("id".to_string(), vec![Ty::string()])));
}

#[test]
fn option_constructors_infer_their_argument() {
    let (ast, result, diags) = typecheck(
        "let s = Some(1)\n\
         let n: Option<int> = None",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
    assert_eq!(let_init_ty(&ast, &result, 0), Ty::option(Ty::int()));
}

#[test]
fn match_arms_join_to_one_type() {
    let (ast, result, diags) = typecheck(
        "let opt = Some(1)\n\
         let r = match opt { Some(x) -> x, None -> 0 }",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
    assert_eq!(let_init_ty(&ast, &result, 1), Ty::int());
}

#[test]
fn match_arm_type_disagreement_is_t001() {
    let (_, _, diags) = typecheck(
        "let opt = Some(1)\n\
         let r = match opt { Some(x) -> x, None -> \"none\" }",
    );
    let codes: Vec<Code> = diags.entries().iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![Code::T001]);
}

#[test]
fn match_guard_must_be_bool() {
    let (_, _, diags) = typecheck(
        "let r = match 3 { n if n -> 1, _ -> 0 }",
    );
    let codes: Vec<Code> = diags.entries().iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![Code::T001]);
}

#[test]
fn channel_send_and_receive_are_typed() {
    let (ast, result, diags) = typecheck(
        "let ch = new Channel<int>()\n\
         ch <- 1\n\
         let v = <-ch",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
    assert_eq!(let_init_ty(&ast, &result, 0), Ty::channel(Ty::int()));
    assert_eq!(let_init_ty(&ast, &result, 1), Ty::int());
}

#[test]
fn channel_send_of_wrong_type_is_t001() {
    let (_, _, diags) = typecheck(
        "let ch = new Channel<int>()\n\
         ch <- \"nope\"",
    );
    let codes: Vec<Code> = diags.entries().iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![Code::T001]);
}

#[test]
fn async_call_is_future_inside_async_and_plain_outside() {
    let (ast, result, diags) = typecheck(
        "async fn inner() -> int { return 1 }\n\
         async fn outer() -> int { return await inner() }\n\
         let blocking = inner()",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
    // From synchronous code the blocking wrapper yields the plain value.
    assert_eq!(let_init_ty(&ast, &result, 0), Ty::int());
}

#[test]
fn string_interpolation_is_string_and_checks_segments() {
    let (ast, result, diags) = typecheck(
        "let a = 1\n\
         let s = \"a is ${a + 1}\"",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
    assert_eq!(let_init_ty(&ast, &result, 1), Ty::string());

    let (_, _, diags) = typecheck("let s = \"bad ${missing}\"");
    let codes: Vec<Code> = diags.entries().iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![Code::T002]);
}

#[test]
fn module_exports_import_and_qualified_access() {
    let (ast, result, diags) = typecheck(
        "module Math {\n\
           fn add(a: int, b: int) -> int { return a + b }\n\
         }\n\
         import Math.{add}\n\
         let s = add(1, 2)\n\
         let q = Math.add(3, 4)",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
    assert_eq!(let_init_ty(&ast, &result, 0), Ty::int());
    assert_eq!(let_init_ty(&ast, &result, 1), Ty::int());
}

#[test]
fn import_of_missing_name_is_t002() {
    let (_, _, diags) = typecheck(
        "module Math { fn add(a: int, b: int) -> int { return a + b } }\n\
         import Math.{subtract}",
    );
    let codes: Vec<Code> = diags.entries().iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![Code::T002]);
}

#[test]
fn union_types_accept_members_only() {
    let (_, _, diags) = typecheck("let u: int | string = 1");
    assert!(diags.is_empty(), "{:?}", diags.entries());

    let (_, _, diags) = typecheck("let u: int | string = true");
    let codes: Vec<Code> = diags.entries().iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![Code::T001]);
}

#[test]
fn for_loop_binds_the_element_type() {
    let (_, _, diags) = typecheck(
        "fn want_int(x: int) { }\n\
         for n in [1, 2, 3] { want_int(n) }",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
}

#[test]
fn lambda_types_flow_through_calls() {
    let (ast, result, diags) = typecheck(
        "let double = fn(x: int) -> int { return x * 2 }\n\
         let d = double(4)",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
    assert_eq!(let_init_ty(&ast, &result, 1), Ty::int());
}
