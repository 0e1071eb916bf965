//! Semantic type terms.
//!
//! Defines the canonical `Ty` sum and the operations the rest of the
//! middle-end builds on: equality, assignability, substitution,
//! canonicalization, and free-parameter collection.
//!
//! Unions are kept canonical (flattened, sorted by rendered name, no
//! duplicates); `canonicalize` is idempotent and every stored type is
//! canonical.

use std::fmt;

use rustc_hash::FxHashMap;

/// A local inference placeholder, identified by an index into the
/// checker's unification table. Placeholders only arise from empty
/// collection literals, `nil`, and call-site generic instantiation; they
/// never survive into a `TypeckResult`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TyVar(pub u32);

/// The primitive types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Prim {
    Int,
    Float32,
    Float64,
    Bool,
    Str,
    Void,
}

impl Prim {
    pub fn name(self) -> &'static str {
        match self {
            Prim::Int => "int",
            Prim::Float32 => "float32",
            Prim::Float64 => "float64",
            Prim::Bool => "bool",
            Prim::Str => "string",
            Prim::Void => "void",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Prim::Int | Prim::Float32 | Prim::Float64)
    }

    pub fn is_float(self) -> bool {
        matches!(self, Prim::Float32 | Prim::Float64)
    }
}

/// A Tocin type term.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    Prim(Prim),
    /// A user-defined class or enum, possibly with type arguments. The
    /// name may be module-qualified (`Geometry.Point`).
    Named { name: String, args: Vec<Ty> },
    /// A function type.
    Fun {
        params: Vec<Ty>,
        ret: Box<Ty>,
        is_async: bool,
    },
    /// A builtin parameterized container: `list`, `dict`, `tuple`,
    /// `Channel`, `Future`, `Promise`, `Option`, `Result`.
    Generic { name: String, args: Vec<Ty> },
    /// A union; canonical form is flattened, sorted, deduplicated.
    Union(Vec<Ty>),
    /// An unresolved generic parameter. Valid only inside the generic
    /// scope that declares its name; bounds live on the declaration.
    Param(String),
    /// An existential `dyn Trait`; dispatch through it is dynamic.
    TraitObj(String),
    /// A move-only binding target `T&&`.
    RValueRef(Box<Ty>),
    /// The type of the `nil` literal before it meets a typed context.
    Nil,
    /// A local inference placeholder.
    Var(TyVar),
    /// The poison type synthesized after an error; assignable both ways
    /// so one mistake does not cascade.
    Error,
}

impl Ty {
    pub fn int() -> Ty {
        Ty::Prim(Prim::Int)
    }

    pub fn float32() -> Ty {
        Ty::Prim(Prim::Float32)
    }

    pub fn float64() -> Ty {
        Ty::Prim(Prim::Float64)
    }

    pub fn bool() -> Ty {
        Ty::Prim(Prim::Bool)
    }

    pub fn string() -> Ty {
        Ty::Prim(Prim::Str)
    }

    pub fn void() -> Ty {
        Ty::Prim(Prim::Void)
    }

    pub fn list(elem: Ty) -> Ty {
        Ty::Generic { name: "list".into(), args: vec![elem] }
    }

    pub fn dict(key: Ty, value: Ty) -> Ty {
        Ty::Generic { name: "dict".into(), args: vec![key, value] }
    }

    pub fn tuple(elems: Vec<Ty>) -> Ty {
        Ty::Generic { name: "tuple".into(), args: elems }
    }

    pub fn channel(elem: Ty) -> Ty {
        Ty::Generic { name: "Channel".into(), args: vec![elem] }
    }

    pub fn future(elem: Ty) -> Ty {
        Ty::Generic { name: "Future".into(), args: vec![elem] }
    }

    pub fn promise(elem: Ty) -> Ty {
        Ty::Generic { name: "Promise".into(), args: vec![elem] }
    }

    pub fn option(elem: Ty) -> Ty {
        Ty::Generic { name: "Option".into(), args: vec![elem] }
    }

    pub fn result(ok: Ty, err: Ty) -> Ty {
        Ty::Generic { name: "Result".into(), args: vec![ok, err] }
    }

    pub fn fun(params: Vec<Ty>, ret: Ty) -> Ty {
        Ty::Fun { params, ret: Box::new(ret), is_async: false }
    }

    pub fn named(name: impl Into<String>) -> Ty {
        Ty::Named { name: name.into(), args: vec![] }
    }

    /// Whether values of this type copy on use rather than move.
    /// Primitives (and the poison type) are `Copy`; everything else has
    /// move semantics.
    pub fn is_copy(&self) -> bool {
        matches!(self, Ty::Prim(_) | Ty::Error | Ty::Nil)
    }

    /// Whether `nil` may inhabit this type: options, channels, class
    /// instances, and trait objects.
    pub fn admits_nil(&self) -> bool {
        match self {
            Ty::Generic { name, .. } => name == "Option" || name == "Channel",
            Ty::Named { .. } | Ty::TraitObj(_) => true,
            Ty::Error => true,
            _ => false,
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Prim(p) => write!(f, "{}", p.name()),
            Ty::Named { name, args } | Ty::Generic { name, args } => {
                if name == "tuple" {
                    write!(f, "(")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{a}")?;
                    }
                    return write!(f, ")");
                }
                write!(f, "{name}")?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{a}")?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            Ty::Fun { params, ret, is_async } => {
                if *is_async {
                    write!(f, "async ")?;
                }
                write!(f, "fn(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> {ret}")
            }
            Ty::Union(members) => {
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{m}")?;
                }
                Ok(())
            }
            Ty::Param(name) => write!(f, "{name}"),
            Ty::TraitObj(name) => write!(f, "dyn {name}"),
            Ty::RValueRef(inner) => write!(f, "{inner}&&"),
            Ty::Nil => write!(f, "nil"),
            Ty::Var(v) => write!(f, "?{}", v.0),
            Ty::Error => write!(f, "<error>"),
        }
    }
}

// ── Canonicalization ───────────────────────────────────────────────────

/// Produce the canonical form of a type: unions flattened, sorted by
/// rendered name, and deduplicated, recursively. Idempotent.
pub fn canonicalize(ty: &Ty) -> Ty {
    match ty {
        Ty::Union(members) => {
            let mut flat: Vec<Ty> = Vec::new();
            flatten_union(members, &mut flat);
            let mut flat: Vec<Ty> = flat.iter().map(canonicalize).collect();
            flat.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
            flat.dedup();
            match flat.len() {
                0 => Ty::void(),
                1 => flat.pop().expect("len checked"),
                _ => Ty::Union(flat),
            }
        }
        Ty::Named { name, args } => Ty::Named {
            name: name.clone(),
            args: args.iter().map(canonicalize).collect(),
        },
        Ty::Generic { name, args } => Ty::Generic {
            name: name.clone(),
            args: args.iter().map(canonicalize).collect(),
        },
        Ty::Fun { params, ret, is_async } => Ty::Fun {
            params: params.iter().map(canonicalize).collect(),
            ret: Box::new(canonicalize(ret)),
            is_async: *is_async,
        },
        Ty::RValueRef(inner) => Ty::RValueRef(Box::new(canonicalize(inner))),
        other => other.clone(),
    }
}

fn flatten_union(members: &[Ty], out: &mut Vec<Ty>) {
    for member in members {
        match member {
            Ty::Union(inner) => flatten_union(inner, out),
            other => out.push(other.clone()),
        }
    }
}

/// Structural equality on canonical forms.
pub fn equal(a: &Ty, b: &Ty) -> bool {
    canonicalize(a) == canonicalize(b)
}

// ── Substitution ───────────────────────────────────────────────────────

/// Replace `Param` names with concrete terms per the environment.
/// Names missing from the environment are left as-is.
pub fn substitute(ty: &Ty, env: &FxHashMap<String, Ty>) -> Ty {
    match ty {
        Ty::Param(name) => env.get(name).cloned().unwrap_or_else(|| ty.clone()),
        Ty::Named { name, args } => Ty::Named {
            name: name.clone(),
            args: args.iter().map(|a| substitute(a, env)).collect(),
        },
        Ty::Generic { name, args } => Ty::Generic {
            name: name.clone(),
            args: args.iter().map(|a| substitute(a, env)).collect(),
        },
        Ty::Fun { params, ret, is_async } => Ty::Fun {
            params: params.iter().map(|p| substitute(p, env)).collect(),
            ret: Box::new(substitute(ret, env)),
            is_async: *is_async,
        },
        Ty::Union(members) => canonicalize(&Ty::Union(
            members.iter().map(|m| substitute(m, env)).collect(),
        )),
        Ty::RValueRef(inner) => Ty::RValueRef(Box::new(substitute(inner, env))),
        other => other.clone(),
    }
}

/// Collect free generic parameter names, in order of first appearance.
pub fn free_type_params(ty: &Ty) -> Vec<String> {
    let mut out = Vec::new();
    collect_params(ty, &mut out);
    out
}

fn collect_params(ty: &Ty, out: &mut Vec<String>) {
    match ty {
        Ty::Param(name) => {
            if !out.iter().any(|n| n == name) {
                out.push(name.clone());
            }
        }
        Ty::Named { args, .. } | Ty::Generic { args, .. } => {
            for a in args {
                collect_params(a, out);
            }
        }
        Ty::Fun { params, ret, .. } => {
            for p in params {
                collect_params(p, out);
            }
            collect_params(ret, out);
        }
        Ty::Union(members) => {
            for m in members {
                collect_params(m, out);
            }
        }
        Ty::RValueRef(inner) => collect_params(inner, out),
        _ => {}
    }
}

// ── ena integration ────────────────────────────────────────────────────

impl ena::unify::UnifyKey for TyVar {
    type Value = Option<Ty>;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        TyVar(u)
    }

    fn tag() -> &'static str {
        "TyVar"
    }
}

impl ena::unify::EqUnifyValue for Ty {}
