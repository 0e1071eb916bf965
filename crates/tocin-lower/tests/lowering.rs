//! Lowering: async pairs, generic specialization caching, extension
//! rewriting, and module linking.

use tocin_common::{Diagnostics, FileId};
use tocin_lower::{mangle, FnForm, LoweredModule};
use tocin_typeck::Ty;

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

// ── Async transform ────────────────────────────────────────────────────

#[test]
fn async_fn_lowers_to_body_and_wrapper_pair() {
    let (module, diags) = lower("async fn g() -> int { return 1 }");
    assert!(diags.is_empty(), "{:?}", diags.entries());

    let body = module.function("g$async").expect("transformed body");
    assert!(matches!(body.form, FnForm::AsyncBody { .. }));
    assert_eq!(body.ret, Ty::future(Ty::int()));

    let wrapper = module.function("g").expect("blocking wrapper");
    let FnForm::AsyncWrapper { of } = &wrapper.form else {
        panic!("expected wrapper, got {:?}", wrapper.form);
    };
    assert_eq!(of, "g$async");
    assert_eq!(wrapper.ret, Ty::int());
    // The wrapper's body is synthesized by the backend.
    assert!(wrapper.body.is_none());
}

#[test]
fn awaits_become_suspension_points() {
    let (module, diags) = lower(
        "async fn inner() -> int { return 1 }\n\
         async fn outer() -> int {\n\
           let a = await inner()\n\
           let b = await inner()\n\
           return a + b\n\
         }",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
    let body = module.function("outer$async").expect("transformed body");
    let FnForm::AsyncBody { suspension_points } = &body.form else {
        panic!("expected async body");
    };
    assert_eq!(suspension_points.len(), 2);
}

// ── Generic instantiation ──────────────────────────────────────────────

#[test]
fn repeated_instantiation_shares_one_specialization() {
    let (module, diags) = lower(
        "fn id<T>(x: T) -> T { return x }\n\
         let a = id<int>(3)\n\
         let b = id<int>(4)\n\
         let c = id<float64>(1.0)",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());

    let specs: Vec<&str> = module
        .functions
        .iter()
        .filter(|f| matches!(f.form, FnForm::Specialization { .. }))
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(specs, vec!["id_float64", "id_int"], "exactly two specializations");

    // The open generic template itself is not emitted.
    assert!(module.function("id").is_none());

    // All three call sites were rewritten.
    let mut targets: Vec<&String> = module.call_rewrites.values().collect();
    targets.sort();
    assert_eq!(targets, vec!["id_float64", "id_int", "id_int"]);
}

#[test]
fn specialization_substitutes_the_signature() {
    let (module, diags) = lower(
        "fn id<T>(x: T) -> T { return x }\n\
         let a = id<int>(3)",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
    let spec = module.function("id_int").expect("specialization");
    assert_eq!(spec.params, vec![Ty::int()]);
    assert_eq!(spec.ret, Ty::int());
    let FnForm::Specialization { of, type_args } = &spec.form else {
        panic!("expected specialization");
    };
    assert_eq!(of, "id");
    assert_eq!(type_args, &[Ty::int()]);
    // The specialization shares the template's body.
    assert!(spec.body.is_some());
}

#[test]
fn mangling_follows_name_underscore_args() {
    insta::assert_snapshot!(mangle("id", &[Ty::int()]), @"id_int");
    insta::assert_snapshot!(
        mangle("pair", &[Ty::int(), Ty::string()]),
        @"pair_int_string"
    );
    insta::assert_snapshot!(
        mangle("wrap", &[Ty::list(Ty::option(Ty::int()))]),
        @"wrap_list_option_int"
    );
}

// ── Extension rewriting ────────────────────────────────────────────────

#[test]
fn extension_calls_rewrite_to_free_functions() {
    let (module, diags) = lower(
        "extend int { fn double(self) -> int { return self * 2 } }\n\
         let d = (21).double()",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());

    let ext = module.function("int_double").expect("rewritten free function");
    assert!(matches!(ext.form, FnForm::Extension));
    // `self` becomes the leading parameter.
    assert_eq!(ext.params, vec![Ty::int()]);

    assert!(module.call_rewrites.values().any(|t| t == "int_double"));
}

// ── Plain functions ────────────────────────────────────────────────────

#[test]
fn plain_functions_pass_through() {
    let (module, diags) = lower("fn add(a: int, b: int) -> int { return a + b }");
    assert!(diags.is_empty(), "{:?}", diags.entries());
    let add = module.function("add").expect("plain function");
    assert!(matches!(add.form, FnForm::Plain));
    assert_eq!(add.params, vec![Ty::int(), Ty::int()]);
    assert!(add.body.is_some());
    // Intrinsics like `print` have no lowered form.
    assert!(module.function("print").is_none());
}

// ── Module linking ─────────────────────────────────────────────────────

#[test]
fn imports_bind_qualified_symbols() {
    let (module, diags) = lower(
        "module Math {\n\
           fn add(a: int, b: int) -> int { return a + b }\n\
         }\n\
         import Math.{add, add as plus}\n\
         let s = add(1, 2)",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
    assert_eq!(module.link.imports.len(), 2);
    assert_eq!(module.link.imports[0].local, "add");
    assert_eq!(module.link.imports[0].qualified, "Math$add");
    assert_eq!(module.link.imports[1].local, "plus");
    assert_eq!(module.link.imports[1].qualified, "Math$add");
}

#[test]
fn module_bodies_become_init_lists() {
    let (module, diags) = lower(
        "module Config {\n\
           fn default_port() -> int { return 8080 }\n\
           let port = default_port()\n\
         }",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
    assert_eq!(module.link.inits.len(), 1);
    assert_eq!(module.link.inits[0].module, "Config");
    // Only the runtime statement, not the fn declaration.
    assert_eq!(module.link.inits[0].body.len(), 1);
}

#[test]
fn exports_surface_in_the_link() {
    let (module, diags) = lower(
        "fn util() -> int { return 1 }\n\
         fn helper() -> int { return 2 }\n\
         export {util, helper}",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
    assert_eq!(module.link.exports, vec!["util", "helper"]);
}

#[test]
fn module_functions_keep_their_qualified_names() {
    let (module, diags) = lower(
        "module Math { fn add(a: int, b: int) -> int { return a + b } }",
    );
    assert!(diags.is_empty(), "{:?}", diags.entries());
    assert!(module.function("Math.add").is_some());
}
