//! Diagnostic-producing programs: one scenario per stable code.

use tocin_common::{Code, Diagnostics, FileId};
use tocin_typeck::TypeckResult;

fn typecheck(source: &str) -> (TypeckResult, Diagnostics) {
    let (ast, parse_diags) = tocin_parser::parse_source(FileId(0), source);
    assert!(
        parse_diags.is_empty(),
        "test source must parse cleanly: {parse_diags:?}"
    );
    let mut diags = Diagnostics::new();
    let result = tocin_typeck::check(&ast, &mut diags);
    (result, diags)
}

fn codes(diags: &Diagnostics) -> Vec<Code> {
    diags.entries().iter().map(|d| d.code).collect()
}

#[test]
fn clean_arithmetic_has_no_diagnostics() {
    let (_, diags) = typecheck("let x: int = 2 + 3 * 4");
    assert!(diags.is_empty(), "{:?}", diags.entries());
}

#[test]
fn t001_type_mismatch_at_the_initializer() {
    let (_, diags) = typecheck("let x: int = \"hi\"");
    assert_eq!(codes(&diags), vec![Code::T001]);
    // The diagnostic points at the string literal, column 14.
    let span = diags.entries()[0].span;
    assert_eq!(span.start, 13);
}

#[test]
fn t002_undefined_variable() {
    let (_, diags) = typecheck("let x = missing");
    assert_eq!(codes(&diags), vec![Code::T002]);
}

#[test]
fn t003_unknown_method() {
    let (_, diags) = typecheck("let x = (1).frobnicate()");
    assert_eq!(codes(&diags), vec![Code::T003]);
}

#[test]
fn t004_unknown_type() {
    let (_, diags) = typecheck("let x: Widget = 1");
    assert_eq!(codes(&diags), vec![Code::T004]);
}

#[test]
fn t005_assignment_to_const() {
    let (_, diags) = typecheck("const c = 1\nc = 2");
    assert_eq!(codes(&diags), vec![Code::T005]);
}

#[test]
fn t006_invalid_operator() {
    let (_, diags) = typecheck("let x = true + 1");
    assert_eq!(codes(&diags), vec![Code::T006]);
}

#[test]
fn t007_wrong_argument_count() {
    let (_, diags) = typecheck("fn two(a: int, b: int) -> int { return a }\nlet x = two(1)");
    assert_eq!(codes(&diags), vec![Code::T007]);
}

#[test]
fn t008_await_outside_async() {
    let (_, diags) = typecheck(
        "async fn h() -> int { return 1 }\n\
         fn g() -> int { return await h() }",
    );
    assert!(codes(&diags).contains(&Code::T008));
}

#[test]
fn t009_cannot_infer_without_annotation_or_init() {
    let (_, diags) = typecheck("let x");
    assert_eq!(codes(&diags), vec![Code::T009]);
}

#[test]
fn t009_nil_initializer_needs_annotation() {
    let (_, diags) = typecheck("let x = nil");
    assert_eq!(codes(&diags), vec![Code::T009]);
}

#[test]
fn m001_duplicate_definition() {
    let (_, diags) = typecheck("fn f() { }\nfn f() { }");
    assert_eq!(codes(&diags), vec![Code::M001]);
}

#[test]
fn nil_only_flows_into_nil_admitting_types() {
    let (_, diags) = typecheck("let o: Option<int> = nil");
    assert!(diags.is_empty(), "{:?}", diags.entries());

    let (_, diags) = typecheck("let i: int = nil");
    assert_eq!(codes(&diags), vec![Code::T001]);
}

#[test]
fn errors_do_not_stop_the_pass() {
    // Three independent mistakes, three diagnostics.
    let (_, diags) = typecheck(
        "let a: int = \"one\"\n\
         let b = missing\n\
         let c: bool = 3",
    );
    assert_eq!(diags.entries().len(), 3);
    assert!(codes(&diags).contains(&Code::T001));
    assert!(codes(&diags).contains(&Code::T002));
}

#[test]
fn widening_is_implicit_narrowing_is_not() {
    let (_, diags) = typecheck("let f: float64 = 1");
    assert!(diags.is_empty(), "int widens to float64: {:?}", diags.entries());

    let (_, diags) = typecheck("let f: float32 = 1");
    assert!(diags.is_empty(), "int widens to float32: {:?}", diags.entries());

    let (_, diags) = typecheck("let i: int = 1.5");
    assert_eq!(codes(&diags), vec![Code::T001], "float does not narrow to int");

    // Narrowing is available through an explicit cast.
    let (_, diags) = typecheck("let i: int = 1.5 as int");
    assert!(diags.is_empty(), "{:?}", diags.entries());
}

#[test]
fn or_pattern_alternatives_must_bind_the_same_names() {
    let (_, diags) = typecheck(
        "enum E { A(int), B(int) }\n\
         let e = A(1)\n\
         let r = match e { A(x) | B(y) -> 0, _ -> 1 }",
    );
    assert!(codes(&diags).contains(&Code::T001));
}
