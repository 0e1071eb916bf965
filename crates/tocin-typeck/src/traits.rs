//! Trait registry, impl lookup, and extension methods.
//!
//! Stores trait definitions (with default bodies and supertraits) and
//! impl registrations indexed `target type -> trait -> impl`. Method
//! resolution walks direct impls first, then supertrait defaults, then
//! the extension registry; trait-object receivers dispatch through the
//! trait's own method table.

use rustc_hash::FxHashMap;

use tocin_ast::StmtId;
use tocin_common::Span;

use crate::error::TypeError;
use crate::ty::{equal, Ty};

/// The canonical registry key for a type: its base constructor name.
pub fn type_key(ty: &Ty) -> String {
    match ty {
        Ty::Prim(p) => p.name().to_string(),
        Ty::Named { name, .. } | Ty::Generic { name, .. } => name.clone(),
        Ty::TraitObj(name) => format!("dyn {name}"),
        Ty::RValueRef(inner) => type_key(inner),
        other => other.to_string(),
    }
}

/// A method signature inside a trait definition.
#[derive(Clone, Debug)]
pub struct TraitMethodSig {
    pub name: String,
    /// Parameter types, excluding `self`.
    pub params: Vec<Ty>,
    pub ret: Ty,
    /// Default body, when the trait provides one; impls may then omit
    /// the method.
    pub default_body: Option<StmtId>,
    pub span: Span,
}

/// A trait definition.
#[derive(Clone, Debug)]
pub struct TraitDef {
    pub name: String,
    pub supertraits: Vec<String>,
    pub methods: Vec<TraitMethodSig>,
    pub span: Span,
}

impl TraitDef {
    pub fn method(&self, name: &str) -> Option<&TraitMethodSig> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// One method provided by an impl block.
#[derive(Clone, Debug)]
pub struct ImplMethod {
    pub name: String,
    /// Parameter types, excluding `self`.
    pub params: Vec<Ty>,
    pub ret: Ty,
    /// The function declaration, for the backend's vtable construction.
    pub decl: StmtId,
}

/// An `impl Trait for Type` registration.
#[derive(Clone, Debug)]
pub struct ImplDef {
    pub trait_name: String,
    pub target: Ty,
    pub methods: FxHashMap<String, ImplMethod>,
    pub span: Span,
}

/// How a resolved method will be dispatched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// Statically, through a direct impl.
    Static { trait_name: String },
    /// Statically, through a trait default body.
    Default { trait_name: String },
    /// Dynamically, through a trait object's method table.
    Dynamic { trait_name: String },
    /// Statically, through an extension function.
    Extension { mangled: String },
}

/// A successful method resolution: the signature plus dispatch kind.
#[derive(Clone, Debug)]
pub struct ResolvedMethod {
    pub params: Vec<Ty>,
    pub ret: Ty,
    pub dispatch: Dispatch,
}

/// The trait registry for one compilation unit.
#[derive(Default)]
pub struct TraitRegistry {
    traits: FxHashMap<String, TraitDef>,
    /// `target type key -> trait name -> impl`.
    impls: FxHashMap<String, FxHashMap<String, ImplDef>>,
}

impl TraitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a trait definition. Duplicate names are a definition
    /// error.
    pub fn register_trait(&mut self, def: TraitDef) -> Option<TypeError> {
        if let Some(previous) = self.traits.get(&def.name) {
            return Some(TypeError::Duplicate {
                name: def.name.clone(),
                span: def.span,
                previous: previous.span,
            });
        }
        self.traits.insert(def.name.clone(), def);
        None
    }

    pub fn get_trait(&self, name: &str) -> Option<&TraitDef> {
        self.traits.get(name)
    }

    /// Register an impl, verifying it against the trait definition:
    /// every non-defaulted method must be present with a structurally
    /// identical signature, and `(type, trait)` pairs are unique.
    pub fn register_impl(&mut self, impl_def: ImplDef) -> Vec<TypeError> {
        let mut errors = Vec::new();
        let key = type_key(&impl_def.target);
        let target_name = impl_def.target.to_string();

        match self.traits.get(&impl_def.trait_name) {
            None => {
                errors.push(TypeError::UnknownType {
                    name: impl_def.trait_name.clone(),
                    span: impl_def.span,
                });
            }
            Some(trait_def) => {
                for required in &trait_def.methods {
                    match impl_def.methods.get(&required.name) {
                        None => {
                            if required.default_body.is_none() {
                                errors.push(TypeError::MissingTraitMethod {
                                    trait_name: impl_def.trait_name.clone(),
                                    method_name: required.name.clone(),
                                    impl_ty: target_name.clone(),
                                    span: impl_def.span,
                                });
                            }
                        }
                        Some(provided) => {
                            let sig_matches = provided.params.len() == required.params.len()
                                && provided
                                    .params
                                    .iter()
                                    .zip(required.params.iter())
                                    .all(|(a, b)| signature_part_matches(a, b, &impl_def.target))
                                && signature_part_matches(
                                    &provided.ret,
                                    &required.ret,
                                    &impl_def.target,
                                );
                            if !sig_matches {
                                errors.push(TypeError::TraitMethodSignatureMismatch {
                                    trait_name: impl_def.trait_name.clone(),
                                    method_name: required.name.clone(),
                                    expected: render_sig(&required.params, &required.ret),
                                    found: render_sig(&provided.params, &provided.ret),
                                    span: impl_def.span,
                                });
                            }
                        }
                    }
                }
            }
        }

        let for_type = self.impls.entry(key).or_default();
        if let Some(previous) = for_type.get(&impl_def.trait_name) {
            errors.push(TypeError::Duplicate {
                name: format!("impl {} for {}", impl_def.trait_name, target_name),
                span: impl_def.span,
                previous: previous.span,
            });
        } else {
            for_type.insert(impl_def.trait_name.clone(), impl_def);
        }
        errors
    }

    /// Whether `ty` has a registered impl of `trait_name`.
    pub fn has_impl(&self, trait_name: &str, ty: &Ty) -> bool {
        self.impls
            .get(&type_key(ty))
            .is_some_and(|for_type| for_type.contains_key(trait_name))
    }

    pub fn find_impl(&self, trait_name: &str, ty: &Ty) -> Option<&ImplDef> {
        self.impls.get(&type_key(ty))?.get(trait_name)
    }

    /// All impls registered for a type.
    pub fn impls_for(&self, ty: &Ty) -> impl Iterator<Item = &ImplDef> {
        self.impls
            .get(&type_key(ty))
            .into_iter()
            .flat_map(|m| m.values())
    }

    /// All impls in the unit, for the backend's vtable construction.
    pub fn all_impls(&self) -> impl Iterator<Item = &ImplDef> {
        self.impls.values().flat_map(|m| m.values())
    }

    /// Resolve `receiver.method(...)` for a concrete receiver type:
    /// direct impls first, then supertrait defaults (depth-first).
    pub fn resolve_concrete_method(&self, receiver: &Ty, method: &str) -> Option<ResolvedMethod> {
        // Direct impls on the receiver.
        for impl_def in self.impls_for(receiver) {
            if let Some(found) = impl_def.methods.get(method) {
                return Some(ResolvedMethod {
                    params: found.params.clone(),
                    ret: found.ret.clone(),
                    dispatch: Dispatch::Static {
                        trait_name: impl_def.trait_name.clone(),
                    },
                });
            }
        }
        // Defaults from implemented traits and their supertraits.
        let implemented: Vec<String> = self
            .impls_for(receiver)
            .map(|i| i.trait_name.clone())
            .collect();
        for trait_name in implemented {
            if let Some(found) = self.find_default_method(&trait_name, method) {
                return Some(found);
            }
        }
        None
    }

    /// Depth-first search through a trait and its supertraits for a
    /// defaulted method.
    fn find_default_method(&self, trait_name: &str, method: &str) -> Option<ResolvedMethod> {
        let def = self.traits.get(trait_name)?;
        if let Some(sig) = def.method(method) {
            if sig.default_body.is_some() {
                return Some(ResolvedMethod {
                    params: sig.params.clone(),
                    ret: sig.ret.clone(),
                    dispatch: Dispatch::Default {
                        trait_name: trait_name.to_string(),
                    },
                });
            }
        }
        for supertrait in &def.supertraits {
            if let Some(found) = self.find_default_method(supertrait, method) {
                return Some(found);
            }
        }
        None
    }

    /// Resolve a method on a trait-object receiver: the trait's own
    /// method table, dynamically dispatched. Supertrait methods are
    /// visible through the object as well.
    pub fn resolve_dynamic_method(&self, trait_name: &str, method: &str) -> Option<ResolvedMethod> {
        let def = self.traits.get(trait_name)?;
        if let Some(sig) = def.method(method) {
            return Some(ResolvedMethod {
                params: sig.params.clone(),
                ret: sig.ret.clone(),
                dispatch: Dispatch::Dynamic {
                    trait_name: trait_name.to_string(),
                },
            });
        }
        for supertrait in &def.supertraits {
            if let Some(found) = self.resolve_dynamic_method(supertrait, method) {
                return Some(found);
            }
        }
        None
    }

    /// Discharge `concrete: bound1 + bound2 + ...`. Extension methods
    /// never satisfy bounds; only registered impls count.
    pub fn check_bounds(&self, concrete: &Ty, bounds: &[String], span: Span) -> Vec<TypeError> {
        let mut errors = Vec::new();
        // The poison type satisfies everything to avoid cascades.
        if matches!(concrete, Ty::Error) {
            return errors;
        }
        for bound in bounds {
            if !self.has_impl(bound, concrete) {
                errors.push(TypeError::BoundNotSatisfied {
                    ty: concrete.clone(),
                    trait_name: bound.clone(),
                    span,
                });
            }
        }
        errors
    }
}

/// In trait signatures `Self` stands for the implementing type; treat the
/// two as identical when comparing an impl against its trait.
fn signature_part_matches(provided: &Ty, required: &Ty, target: &Ty) -> bool {
    if let Ty::Named { name, args } = required {
        if name == "Self" && args.is_empty() {
            return equal(provided, target);
        }
    }
    equal(provided, required)
}

fn render_sig(params: &[Ty], ret: &Ty) -> String {
    let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
    format!("fn({}) -> {}", params.join(", "), ret)
}

// ── Extension methods ──────────────────────────────────────────────────

/// One registered extension method.
#[derive(Clone, Debug)]
pub struct ExtMethod {
    /// Parameter types, excluding `self`.
    pub params: Vec<Ty>,
    pub ret: Ty,
    /// The free-function name the call rewrites to (`Type_method`).
    pub mangled: String,
    pub decl: StmtId,
    pub span: Span,
}

/// Flat registry `type name -> method name -> function`, consulted after
/// trait resolution fails.
#[derive(Default)]
pub struct ExtensionRegistry {
    methods: FxHashMap<String, FxHashMap<String, ExtMethod>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        target_key: &str,
        method_name: &str,
        method: ExtMethod,
    ) -> Option<TypeError> {
        let for_type = self.methods.entry(target_key.to_string()).or_default();
        if let Some(previous) = for_type.get(method_name) {
            return Some(TypeError::Duplicate {
                name: format!("{target_key}.{method_name}"),
                span: method.span,
                previous: previous.span,
            });
        }
        for_type.insert(method_name.to_string(), method);
        None
    }

    pub fn lookup(&self, receiver: &Ty, method_name: &str) -> Option<&ExtMethod> {
        self.methods.get(&type_key(receiver))?.get(method_name)
    }

    /// Every registered extension as `(type key, method name, method)`,
    /// sorted for deterministic emission.
    pub fn all(&self) -> Vec<(&str, &str, &ExtMethod)> {
        let mut out: Vec<(&str, &str, &ExtMethod)> = self
            .methods
            .iter()
            .flat_map(|(key, methods)| {
                methods.iter().map(move |(name, m)| (key.as_str(), name.as_str(), m))
            })
            .collect();
        out.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        out
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span::new(0, 0)
    }

    fn display_trait() -> TraitDef {
        TraitDef {
            name: "Display".into(),
            supertraits: vec![],
            methods: vec![TraitMethodSig {
                name: "to_string".into(),
                params: vec![],
                ret: Ty::string(),
                default_body: None,
                span: span(),
            }],
            span: span(),
        }
    }

    fn to_string_impl(target: Ty) -> ImplDef {
        let mut methods = FxHashMap::default();
        methods.insert(
            "to_string".to_string(),
            ImplMethod {
                name: "to_string".into(),
                params: vec![],
                ret: Ty::string(),
                decl: StmtId(0),
            },
        );
        ImplDef {
            trait_name: "Display".into(),
            target,
            methods,
            span: span(),
        }
    }

    #[test]
    fn register_and_query_impl() {
        let mut registry = TraitRegistry::new();
        assert!(registry.register_trait(display_trait()).is_none());
        let errors = registry.register_impl(to_string_impl(Ty::int()));
        assert!(errors.is_empty());

        assert!(registry.has_impl("Display", &Ty::int()));
        assert!(!registry.has_impl("Display", &Ty::float64()));
        assert!(!registry.has_impl("Clone", &Ty::int()));
    }

    #[test]
    fn missing_method_is_an_error() {
        let mut registry = TraitRegistry::new();
        registry.register_trait(display_trait());
        let empty_impl = ImplDef {
            trait_name: "Display".into(),
            target: Ty::int(),
            methods: FxHashMap::default(),
            span: span(),
        };
        let errors = registry.register_impl(empty_impl);
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], TypeError::MissingTraitMethod { .. }));
    }

    #[test]
    fn defaulted_method_may_be_omitted() {
        let mut registry = TraitRegistry::new();
        registry.register_trait(TraitDef {
            name: "Greet".into(),
            supertraits: vec![],
            methods: vec![TraitMethodSig {
                name: "greet".into(),
                params: vec![],
                ret: Ty::string(),
                default_body: Some(StmtId(7)),
                span: span(),
            }],
            span: span(),
        });
        let empty_impl = ImplDef {
            trait_name: "Greet".into(),
            target: Ty::int(),
            methods: FxHashMap::default(),
            span: span(),
        };
        assert!(registry.register_impl(empty_impl).is_empty());

        // The default resolves through the impl'd trait.
        let resolved = registry.resolve_concrete_method(&Ty::int(), "greet").unwrap();
        assert_eq!(resolved.dispatch, Dispatch::Default { trait_name: "Greet".into() });
    }

    #[test]
    fn signature_mismatch_is_an_error() {
        let mut registry = TraitRegistry::new();
        registry.register_trait(display_trait());
        let mut methods = FxHashMap::default();
        methods.insert(
            "to_string".to_string(),
            ImplMethod {
                name: "to_string".into(),
                params: vec![],
                ret: Ty::int(), // trait requires string
                decl: StmtId(0),
            },
        );
        let bad = ImplDef {
            trait_name: "Display".into(),
            target: Ty::int(),
            methods,
            span: span(),
        };
        let errors = registry.register_impl(bad);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            TypeError::TraitMethodSignatureMismatch { .. }
        ));
    }

    #[test]
    fn duplicate_impl_rejected() {
        let mut registry = TraitRegistry::new();
        registry.register_trait(display_trait());
        assert!(registry.register_impl(to_string_impl(Ty::int())).is_empty());
        let errors = registry.register_impl(to_string_impl(Ty::int()));
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], TypeError::Duplicate { .. }));

        // A different target is fine.
        assert!(registry.register_impl(to_string_impl(Ty::string())).is_empty());
    }

    #[test]
    fn self_in_trait_signature_means_the_target() {
        let mut registry = TraitRegistry::new();
        registry.register_trait(TraitDef {
            name: "Clone2".into(),
            supertraits: vec![],
            methods: vec![TraitMethodSig {
                name: "clone2".into(),
                params: vec![],
                ret: Ty::named("Self"),
                default_body: None,
                span: span(),
            }],
            span: span(),
        });
        let mut methods = FxHashMap::default();
        methods.insert(
            "clone2".to_string(),
            ImplMethod {
                name: "clone2".into(),
                params: vec![],
                ret: Ty::named("Point"),
                decl: StmtId(0),
            },
        );
        let errors = registry.register_impl(ImplDef {
            trait_name: "Clone2".into(),
            target: Ty::named("Point"),
            methods,
            span: span(),
        });
        assert!(errors.is_empty(), "Self should match the impl target: {errors:?}");
    }

    #[test]
    fn supertrait_default_resolves_depth_first() {
        let mut registry = TraitRegistry::new();
        registry.register_trait(TraitDef {
            name: "Base".into(),
            supertraits: vec![],
            methods: vec![TraitMethodSig {
                name: "describe".into(),
                params: vec![],
                ret: Ty::string(),
                default_body: Some(StmtId(3)),
                span: span(),
            }],
            span: span(),
        });
        registry.register_trait(TraitDef {
            name: "Derived".into(),
            supertraits: vec!["Base".into()],
            methods: vec![],
            span: span(),
        });
        let errors = registry.register_impl(ImplDef {
            trait_name: "Derived".into(),
            target: Ty::named("Widget"),
            methods: FxHashMap::default(),
            span: span(),
        });
        assert!(errors.is_empty());

        let resolved = registry
            .resolve_concrete_method(&Ty::named("Widget"), "describe")
            .unwrap();
        assert_eq!(resolved.dispatch, Dispatch::Default { trait_name: "Base".into() });
    }

    #[test]
    fn dynamic_dispatch_through_trait_object() {
        let mut registry = TraitRegistry::new();
        registry.register_trait(display_trait());
        let resolved = registry.resolve_dynamic_method("Display", "to_string").unwrap();
        assert_eq!(
            resolved.dispatch,
            Dispatch::Dynamic { trait_name: "Display".into() }
        );
        assert!(registry.resolve_dynamic_method("Display", "missing").is_none());
    }

    #[test]
    fn bounds_check_reports_each_missing_trait() {
        let mut registry = TraitRegistry::new();
        registry.register_trait(display_trait());
        registry.register_impl(to_string_impl(Ty::int()));

        let ok = registry.check_bounds(&Ty::int(), &["Display".into()], span());
        assert!(ok.is_empty());

        let missing = registry.check_bounds(
            &Ty::named("Blob"),
            &["Display".into(), "Clone".into()],
            span(),
        );
        assert_eq!(missing.len(), 2);
        assert!(missing
            .iter()
            .all(|e| matches!(e, TypeError::BoundNotSatisfied { .. })));
    }

    #[test]
    fn extension_registry_lookup() {
        let mut exts = ExtensionRegistry::new();
        assert!(exts
            .register(
                "int",
                "double",
                ExtMethod {
                    params: vec![],
                    ret: Ty::int(),
                    mangled: "int_double".into(),
                    decl: StmtId(0),
                    span: span(),
                },
            )
            .is_none());
        let found = exts.lookup(&Ty::int(), "double").unwrap();
        assert_eq!(found.mangled, "int_double");
        assert!(exts.lookup(&Ty::string(), "double").is_none());

        // Duplicate registration is rejected.
        let dup = exts.register(
            "int",
            "double",
            ExtMethod {
                params: vec![],
                ret: Ty::int(),
                mangled: "int_double".into(),
                decl: StmtId(0),
                span: span(),
            },
        );
        assert!(matches!(dup, Some(TypeError::Duplicate { .. })));
    }
}
