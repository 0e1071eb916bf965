//! Pattern compilation: exhaustiveness, reachability, and decision-tree
//! shapes, driven from source text.

use tocin_common::{Code, Diagnostics, FileId, Severity};
use tocin_lower::{DecisionTree, LoweredModule};

fn lower(source: &str) -> (LoweredModule, Diagnostics) {
    let (ast, parse_diags) = tocin_parser::parse_source(FileId(0), source);
    assert!(
        parse_diags.is_empty(),
        "test source must parse cleanly: {parse_diags:?}"
    );
    let mut diags = Diagnostics::new();
    let typeck = tocin_typeck::check(&ast, &mut diags);
    assert!(
        !diags.has_errors(),
        "test source must typecheck cleanly: {:?}",
        diags.entries()
    );
    let module = tocin_lower::lower(&ast, &typeck, &mut diags);
    (module, diags)
}

fn codes(diags: &Diagnostics) -> Vec<Code> {
    diags.entries().iter().map(|d| d.code).collect()
}

#[test]
fn exhaustive_option_match_is_clean_and_complete() {
    let (module, diags) = lower(
        "let opt = Some(1)\n\
         let r = match opt { Some(x) -> x, None -> 0 }",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());

    let tree = module.matches.values().next().expect("one compiled match");
    // A complete switch over both constructors needs no default.
    let DecisionTree::Switch { arms, default, .. } = tree else {
        panic!("expected a switch at the root, got {tree:?}");
    };
    assert_eq!(arms.len(), 2);
    assert!(default.is_none());
    assert!(!tree.can_fail());
}

#[test]
fn missing_none_is_p001_citing_the_constructor() {
    let (_, diags) = lower(
        "let opt = Some(1)\n\
         let r = match opt { Some(x) -> x }",
    );
    assert_eq!(codes(&diags), vec![Code::P001]);
    let message = &diags.entries()[0].message;
    assert!(message.contains("None"), "witness missing from: {message}");
    assert!(message.contains("Option<int>"), "type missing from: {message}");
}

#[test]
fn user_enum_reports_all_missing_variants() {
    let (_, diags) = lower(
        "enum Shape { Circle(float64), Rect(float64, float64), Dot }\n\
         let s = Dot\n\
         let r = match s { Circle(r) -> 1, Dot -> 2 }",
    );
    assert_eq!(codes(&diags), vec![Code::P001]);
    assert!(diags.entries()[0].message.contains("Rect"));
}

#[test]
fn wildcard_arm_makes_open_types_exhaustive() {
    let (_, diags) = lower("let r = match 3 { 1 -> \"one\", _ -> \"other\" }");
    assert!(diags.is_empty(), "{:?}", diags.entries());
}

#[test]
fn integer_match_without_default_is_p001() {
    let (_, diags) = lower("let r = match 3 { 1 -> \"one\", 2 -> \"two\" }");
    assert_eq!(codes(&diags), vec![Code::P001]);
    assert!(diags.entries()[0].message.contains('_'));
}

#[test]
fn bool_match_with_both_literals_is_exhaustive() {
    let (_, diags) = lower("let r = match true { true -> 1, false -> 0 }");
    assert!(diags.is_empty(), "{:?}", diags.entries());

    let (_, diags) = lower("let r = match true { true -> 1 }");
    assert_eq!(codes(&diags), vec![Code::P001]);
    assert!(diags.entries()[0].message.contains("false"));
}

#[test]
fn shadowed_arm_is_p002_warning() {
    let (_, diags) = lower("let r = match 1 { 1 -> \"a\", 1 -> \"b\", _ -> \"c\" }");
    assert_eq!(codes(&diags), vec![Code::P002]);
    assert_eq!(diags.entries()[0].severity, Severity::Warning);
    // Warnings do not fail the build.
    assert!(!diags.has_errors());
}

#[test]
fn earlier_wildcard_shadows_everything_after() {
    let (_, diags) = lower("let r = match 1 { _ -> \"any\", 2 -> \"two\" }");
    assert_eq!(codes(&diags), vec![Code::P002]);
}

#[test]
fn or_patterns_share_one_arm() {
    let (module, diags) = lower("let r = match 3 { 1 | 2 -> \"low\", _ -> \"high\" }");
    assert!(diags.is_empty(), "{:?}", diags.entries());
    let tree = module.matches.values().next().expect("one compiled match");
    let DecisionTree::Switch { arms, default, .. } = tree else {
        panic!("expected a switch, got {tree:?}");
    };
    // Both alternatives test separately but land in the same arm.
    assert_eq!(arms.len(), 2);
    assert!(default.is_some());
    let mut reached = Vec::new();
    tree.reachable_arms(&mut reached);
    reached.sort();
    reached.dedup();
    assert_eq!(reached, vec![0, 1]);
}

#[test]
fn guarded_arm_does_not_count_toward_exhaustiveness() {
    let (_, diags) = lower("let r = match 1 { n if n > 0 -> 1, _ -> 0 }");
    assert!(diags.is_empty(), "{:?}", diags.entries());

    let (_, diags) = lower("let r = match 1 { n if n > 0 -> 1 }");
    assert_eq!(codes(&diags), vec![Code::P001]);
}

#[test]
fn nested_constructor_patterns_decompose() {
    let (module, diags) = lower(
        "let v = Some(Some(1))\n\
         let r = match v {\n\
           Some(Some(x)) -> x,\n\
           Some(None) -> 0,\n\
           None -> 0\n\
         }",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
    let tree = module.matches.values().next().expect("one compiled match");
    assert!(!tree.can_fail());
    let mut reached = Vec::new();
    tree.reachable_arms(&mut reached);
    reached.sort();
    assert_eq!(reached, vec![0, 1, 2]);
}

#[test]
fn tuple_patterns_expand_structurally() {
    let (_, diags) = lower(
        "let pair = (1, true)\n\
         let r = match pair { (0, _) -> 0, (n, true) -> n, (n, false) -> 0 }",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
}

#[test]
fn tuple_match_missing_a_case_is_p001() {
    let (_, diags) = lower(
        "let pair = (1, true)\n\
         let r = match pair { (0, _) -> 0, (n, true) -> n }",
    );
    assert_eq!(codes(&diags), vec![Code::P001]);
}

#[test]
fn bindings_carry_access_paths() {
    let (module, diags) = lower(
        "let opt = Some(41)\n\
         let r = match opt { Some(x) -> x, None -> 0 }",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
    let tree = module.matches.values().next().expect("one compiled match");
    let DecisionTree::Switch { arms, .. } = tree else {
        panic!("expected switch");
    };
    // The Some arm binds `x` to the first payload field of the root.
    let (_, some_child) = &arms[0];
    let DecisionTree::Leaf { bindings, .. } = some_child else {
        panic!("expected leaf under Some, got {some_child:?}");
    };
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].0, "x");
    assert_eq!(bindings[0].1.to_string(), "$.0");
}
