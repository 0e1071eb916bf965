//! The builtin environment: `Option`/`Result`, the `Display` trait with
//! its primitive impls, and the handful of intrinsic functions every
//! unit can call.

use rustc_hash::FxHashMap;

use tocin_ast::StmtId;
use tocin_common::Span;

use crate::defs::{Defs, EnumInfo, FnSig, VariantInfo};
use crate::scope::{Binding, BindingKind, SymbolTable, Visibility};
use crate::traits::{ImplDef, ImplMethod, TraitDef, TraitMethodSig, TraitRegistry};
use crate::ty::Ty;

/// Sentinel declaration id for builtin impl methods; the backend treats
/// these as intrinsics.
pub const BUILTIN_DECL: StmtId = StmtId(u32::MAX);

/// Install the prelude into a fresh unit.
pub fn install(defs: &mut Defs, table: &mut SymbolTable, traits: &mut TraitRegistry) {
    let span = Span::point(0);

    // ── Builtin sum types ──────────────────────────────────────────────
    defs.enums.insert(
        "Option".into(),
        EnumInfo {
            name: "Option".into(),
            type_params: vec!["T".into()],
            variants: vec![
                VariantInfo {
                    name: "Some".into(),
                    payload: vec![Ty::Param("T".into())],
                    span,
                },
                VariantInfo { name: "None".into(), payload: vec![], span },
            ],
            is_builtin: true,
            span,
        },
    );
    defs.enums.insert(
        "Result".into(),
        EnumInfo {
            name: "Result".into(),
            type_params: vec!["T".into(), "E".into()],
            variants: vec![
                VariantInfo {
                    name: "Ok".into(),
                    payload: vec![Ty::Param("T".into())],
                    span,
                },
                VariantInfo {
                    name: "Err".into(),
                    payload: vec![Ty::Param("E".into())],
                    span,
                },
            ],
            is_builtin: true,
            span,
        },
    );

    // ── Display ────────────────────────────────────────────────────────
    traits.register_trait(TraitDef {
        name: "Display".into(),
        supertraits: vec![],
        methods: vec![TraitMethodSig {
            name: "to_string".into(),
            params: vec![],
            ret: Ty::string(),
            default_body: None,
            span,
        }],
        span,
    });
    for target in [Ty::int(), Ty::float32(), Ty::float64(), Ty::bool(), Ty::string()] {
        let mut methods = FxHashMap::default();
        methods.insert(
            "to_string".to_string(),
            ImplMethod {
                name: "to_string".into(),
                params: vec![],
                ret: Ty::string(),
                decl: BUILTIN_DECL,
            },
        );
        traits.register_impl(ImplDef {
            trait_name: "Display".into(),
            target,
            methods,
            span,
        });
    }

    // ── Intrinsic functions ────────────────────────────────────────────
    let mut intrinsic = |name: &str,
                         type_params: Vec<(String, Vec<String>)>,
                         params: Vec<Ty>,
                         ret: Ty| {
        let param_names = (0..params.len()).map(|i| format!("arg{i}")).collect();
        let moved_params = vec![false; params.len()];
        let sig = FnSig {
            name: name.to_string(),
            type_params,
            param_names,
            params,
            moved_params,
            ret,
            is_async: false,
            decl: None,
            span,
        };
        let _ = table.declare(Binding {
            name: name.to_string(),
            kind: BindingKind::Function,
            ty: sig.ty(),
            span,
            mutable: false,
            visibility: Visibility::Public,
        });
        defs.fns.insert(name.to_string(), sig);
    };

    intrinsic(
        "print",
        vec![("T".into(), vec![])],
        vec![Ty::Param("T".into())],
        Ty::void(),
    );
    intrinsic(
        "println",
        vec![("T".into(), vec![])],
        vec![Ty::Param("T".into())],
        Ty::void(),
    );
    intrinsic(
        "len",
        vec![("T".into(), vec![])],
        vec![Ty::list(Ty::Param("T".into()))],
        Ty::int(),
    );
    intrinsic(
        "close",
        vec![("T".into(), vec![])],
        vec![Ty::channel(Ty::Param("T".into()))],
        Ty::void(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prelude_installs_builtins() {
        let mut defs = Defs::new();
        let mut table = SymbolTable::new();
        let mut traits = TraitRegistry::new();
        install(&mut defs, &mut table, &mut traits);

        assert!(defs.enums.contains_key("Option"));
        assert!(defs.enums.contains_key("Result"));
        assert!(defs.variant_of("Some").is_some());
        assert!(defs.variant_of("Err").is_some());
        assert!(table.resolve("print").is_some());
        assert!(traits.has_impl("Display", &Ty::int()));
        assert!(!traits.has_impl("Display", &Ty::named("Blob")));
    }
}
