//! Generic instantiation.
//!
//! Every concrete use of a generic function recorded by the checker
//! produces a mangled specialization; a cache keyed by
//! `(original name, canonical type arguments)` guarantees one
//! specialization per distinct instantiation. Substitution maps the
//! declaration's type parameters to the concrete arguments through the
//! signature; the shared body is re-walked by the backend under the same
//! environment.

use rustc_hash::FxHashMap;

use tocin_ast::ExprId;
use tocin_typeck::{canonicalize, substitute, Ty, TypeckResult};

/// One emitted specialization.
#[derive(Debug, Clone, PartialEq)]
pub struct Specialization {
    /// The generic function's declared name.
    pub original: String,
    /// The mangled symbol, e.g. `id_int` or `pair_int_string`.
    pub mangled: String,
    /// Canonical concrete type arguments, in declaration order.
    pub type_args: Vec<Ty>,
    /// The instantiated parameter types.
    pub params: Vec<Ty>,
    /// The instantiated return type.
    pub ret: Ty,
}

/// The instantiation cache and its outputs.
#[derive(Default)]
pub struct InstantiationCache {
    by_key: FxHashMap<(String, Vec<Ty>), usize>,
    specializations: Vec<Specialization>,
    /// Call-site rewrites: call expression -> mangled callee.
    call_targets: FxHashMap<ExprId, String>,
}

impl InstantiationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run over every instantiation the checker recorded.
    pub fn populate(&mut self, typeck: &TypeckResult) {
        // Deterministic order: sort call sites by expression id.
        let mut sites: Vec<(&ExprId, &(String, Vec<Ty>))> =
            typeck.call_instantiations.iter().collect();
        sites.sort_by_key(|(id, _)| **id);

        for (call, (name, type_args)) in sites {
            let Some(sig) = typeck.defs.fns.get(name) else {
                continue;
            };
            let canonical: Vec<Ty> = type_args.iter().map(|t| canonicalize(t)).collect();
            let key = (name.clone(), canonical.clone());
            let index = match self.by_key.get(&key) {
                Some(index) => *index,
                None => {
                    let mut env = FxHashMap::default();
                    for ((param, _), concrete) in
                        sig.type_params.iter().zip(canonical.iter())
                    {
                        env.insert(param.clone(), concrete.clone());
                    }
                    let spec = Specialization {
                        original: name.clone(),
                        mangled: mangle(name, &canonical),
                        type_args: canonical.clone(),
                        params: sig.params.iter().map(|p| substitute(p, &env)).collect(),
                        ret: substitute(&sig.ret, &env),
                    };
                    let index = self.specializations.len();
                    self.specializations.push(spec);
                    self.by_key.insert(key, index);
                    index
                }
            };
            self.call_targets
                .insert(*call, self.specializations[index].mangled.clone());
        }
    }

    pub fn specializations(&self) -> &[Specialization] {
        &self.specializations
    }

    pub fn call_targets(&self) -> &FxHashMap<ExprId, String> {
        &self.call_targets
    }
}

/// Mangle `name<T1, ..., Tn>` into `name_t1_..._tn`: the canonical
/// rendering of each argument, lowercased, punctuation folded to `_`.
pub fn mangle(name: &str, type_args: &[Ty]) -> String {
    let mut out = name.replace('.', "_");
    for arg in type_args {
        out.push('_');
        out.push_str(&mangle_ty(arg));
    }
    out
}

fn mangle_ty(ty: &Ty) -> String {
    let rendered = canonicalize(ty).to_string().to_lowercase();
    let mut out = String::with_capacity(rendered.len());
    let mut last_was_sep = false;
    for c in rendered.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_was_sep = false;
        } else if !last_was_sep && !out.is_empty() {
            out.push('_');
            last_was_sep = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mangle_simple_and_nested() {
        assert_eq!(mangle("id", &[Ty::int()]), "id_int");
        assert_eq!(
            mangle("pair", &[Ty::int(), Ty::string()]),
            "pair_int_string"
        );
        assert_eq!(mangle("wrap", &[Ty::list(Ty::int())]), "wrap_list_int");
        assert_eq!(
            mangle("get", &[Ty::dict(Ty::string(), Ty::int())]),
            "get_dict_string_int"
        );
    }

    #[test]
    fn mangle_qualified_names() {
        assert_eq!(mangle("Math.id", &[Ty::int()]), "Math_id_int");
    }

    #[test]
    fn mangling_is_deterministic_for_unions() {
        // Unions canonicalize (sorted members), so both spellings agree.
        let a = Ty::Union(vec![Ty::int(), Ty::string()]);
        let b = Ty::Union(vec![Ty::string(), Ty::int()]);
        assert_eq!(mangle("f", &[a]), mangle("f", &[b]));
    }
}
