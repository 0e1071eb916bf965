//! Trait registration, impl verification, dispatch, bounds, and
//! extension methods, driven from source text.

use tocin_common::{Code, Diagnostics, FileId};
use tocin_typeck::{Ty, TypeckResult};

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
fn impl_registers_and_methods_dispatch() {
    let (result, diags) = typecheck(
        "trait Area { fn area(self) -> float64; }\n\
         class Square { side: float64 }\n\
         impl Area for Square { fn area(self) -> float64 { return 1.0 } }\n\
         let a = new Square(2.0).area()",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
    assert!(result.traits.has_impl("Area", &Ty::named("Square")));
}

#[test]
fn missing_trait_method_is_t003() {
    let (_, diags) = typecheck(
        "trait Area { fn area(self) -> float64; }\n\
         class Square { side: float64 }\n\
         impl Area for Square { }",
    );
    assert_eq!(codes(&diags), vec![Code::T003]);
}

#[test]
fn impl_signature_must_match_structurally() {
    let (_, diags) = typecheck(
        "trait Area { fn area(self) -> float64; }\n\
         class Square { side: float64 }\n\
         impl Area for Square { fn area(self) -> int { return 1 } }",
    );
    assert_eq!(codes(&diags), vec![Code::T001]);
}

#[test]
fn default_method_resolves_when_impl_omits_it() {
    let (_, diags) = typecheck(
        "trait Greeter {\n\
           fn name(self) -> string;\n\
           fn greet(self) -> string { return \"hi\" }\n\
         }\n\
         class P { }\n\
         impl Greeter for P { fn name(self) -> string { return \"p\" } }\n\
         let g: string = new P().greet()",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
}

#[test]
fn supertrait_default_is_visible_through_subtrait_impl() {
    let (_, diags) = typecheck(
        "trait Base { fn describe(self) -> string { return \"base\" } }\n\
         trait Derived : Base { }\n\
         class W { }\n\
         impl Derived for W { }\n\
         let d: string = new W().describe()",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
}

#[test]
fn duplicate_impl_is_m001() {
    let (_, diags) = typecheck(
        "trait Area { fn area(self) -> float64; }\n\
         class S { }\n\
         impl Area for S { fn area(self) -> float64 { return 1.0 } }\n\
         impl Area for S { fn area(self) -> float64 { return 2.0 } }",
    );
    assert_eq!(codes(&diags), vec![Code::M001]);
}

#[test]
fn trait_object_accepts_implementors_and_dispatches() {
    let (_, diags) = typecheck(
        "trait Speak { fn speak(self) -> string; }\n\
         class Dog { }\n\
         impl Speak for Dog { fn speak(self) -> string { return \"woof\" } }\n\
         let s: dyn Speak = new Dog()\n\
         let noise: string = s.speak()",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
}

#[test]
fn trait_object_rejects_non_implementors() {
    let (_, diags) = typecheck(
        "trait Speak { fn speak(self) -> string; }\n\
         class Rock { }\n\
         let s: dyn Speak = new Rock()",
    );
    assert_eq!(codes(&diags), vec![Code::T001]);
}

#[test]
fn bound_failure_names_the_trait() {
    let (_, diags) = typecheck(
        "fn show<T: Display>(x: T) { }\n\
         class Blob { }\n\
         show(new Blob())",
    );
    assert_eq!(codes(&diags), vec![Code::T001]);
    assert!(diags.entries()[0].message.contains("Display"));
    assert!(diags.entries()[0].message.contains("Blob"));
}

#[test]
fn bound_satisfied_by_builtin_display_impls() {
    let (_, diags) = typecheck(
        "fn show<T: Display>(x: T) { }\n\
         show(42)\n\
         show(\"text\")",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
}

#[test]
fn bound_satisfied_by_user_impl() {
    let (_, diags) = typecheck(
        "class Blob { }\n\
         impl Display for Blob { fn to_string(self) -> string { return \"blob\" } }\n\
         fn show<T: Display>(x: T) { }\n\
         show(new Blob())",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
}

#[test]
fn extension_method_resolves_after_traits() {
    let (result, diags) = typecheck(
        "extend int { fn double(self) -> int { return self * 2 } }\n\
         let d: int = (21).double()",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
    // The call was recorded for the lowering rewrite.
    assert_eq!(result.ext_calls.len(), 1);
    assert!(result.ext_calls.values().any(|m| m == "int_double"));
    // The rewritten free function exists for the backend.
    assert!(result.defs.fns.contains_key("int_double"));
}

#[test]
fn extension_methods_do_not_satisfy_bounds() {
    // `to_string` via extension must not discharge `T: Display`.
    let (_, diags) = typecheck(
        "class Blob { }\n\
         extend Blob { fn to_string(self) -> string { return \"b\" } }\n\
         fn show<T: Display>(x: T) { }\n\
         show(new Blob())",
    );
    assert_eq!(codes(&diags), vec![Code::T001]);
}

#[test]
fn method_resolution_prefers_class_methods() {
    let (_, diags) = typecheck(
        "class Dog {\n\
           fn speak(self) -> string { return \"woof\" }\n\
         }\n\
         extend Dog { fn speak2(self) -> string { return \"ext\" } }\n\
         let a: string = new Dog().speak()\n\
         let b: string = new Dog().speak2()",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
}
