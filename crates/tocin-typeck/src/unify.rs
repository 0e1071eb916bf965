//! Local unification for placeholder types.
//!
//! The Tocin checker is deliberately local: there is no whole-program
//! constraint solver. Placeholders arise in exactly three places -- empty
//! collection literals, the `nil` literal, and call-site instantiation of
//! generic signatures -- and each is resolved against its first concrete
//! use through this union-find table.

use ena::unify::InPlaceUnificationTable;

use crate::ty::{Ty, TyVar};

/// Owns the unification table for one compilation unit's checking run.
pub struct InferCtx {
    table: InPlaceUnificationTable<TyVar>,
}

impl InferCtx {
    pub fn new() -> Self {
        Self {
            table: InPlaceUnificationTable::new(),
        }
    }

    /// Create a fresh placeholder.
    pub fn fresh_var(&mut self) -> Ty {
        Ty::Var(self.table.new_key(None))
    }

    /// Resolve a type by following union-find indirection, recursively.
    pub fn resolve(&mut self, ty: &Ty) -> Ty {
        match ty {
            Ty::Var(v) => match self.table.probe_value(*v) {
                Some(inner) => self.resolve(&inner),
                None => Ty::Var(self.table.find(*v)),
            },
            Ty::Named { name, args } => Ty::Named {
                name: name.clone(),
                args: args.iter().map(|a| self.resolve(a)).collect(),
            },
            Ty::Generic { name, args } => Ty::Generic {
                name: name.clone(),
                args: args.iter().map(|a| self.resolve(a)).collect(),
            },
            Ty::Fun { params, ret, is_async } => Ty::Fun {
                params: params.iter().map(|p| self.resolve(p)).collect(),
                ret: Box::new(self.resolve(ret)),
                is_async: *is_async,
            },
            Ty::Union(members) => crate::ty::canonicalize(&Ty::Union(
                members.iter().map(|m| self.resolve(m)).collect(),
            )),
            Ty::RValueRef(inner) => Ty::RValueRef(Box::new(self.resolve(inner))),
            other => other.clone(),
        }
    }

    /// Whether the resolved type still contains placeholders.
    pub fn has_unresolved(&mut self, ty: &Ty) -> bool {
        match self.resolve(ty) {
            Ty::Var(_) => true,
            Ty::Named { args, .. } | Ty::Generic { args, .. } => {
                args.iter().any(|a| self.has_unresolved(a))
            }
            Ty::Fun { params, ret, .. } => {
                params.iter().any(|p| self.has_unresolved(p)) || self.has_unresolved(&ret)
            }
            Ty::Union(members) => members.iter().any(|m| self.has_unresolved(m)),
            Ty::RValueRef(inner) => self.has_unresolved(&inner),
            _ => false,
        }
    }

    /// Occurs check: does `var` appear inside `ty`?
    fn occurs_in(&mut self, var: TyVar, ty: &Ty) -> bool {
        match ty {
            Ty::Var(v) => {
                if *v == var {
                    return true;
                }
                match self.table.probe_value(*v) {
                    Some(inner) => self.occurs_in(var, &inner),
                    None => false,
                }
            }
            Ty::Named { args, .. } | Ty::Generic { args, .. } => {
                args.iter().any(|a| self.occurs_in(var, a))
            }
            Ty::Fun { params, ret, .. } => {
                params.iter().any(|p| self.occurs_in(var, p)) || self.occurs_in(var, ret)
            }
            Ty::Union(members) => members.iter().any(|m| self.occurs_in(var, m)),
            Ty::RValueRef(inner) => self.occurs_in(var, inner),
            _ => false,
        }
    }

    /// Unify two types structurally. On mismatch nothing is recorded
    /// here; the caller owns the diagnostic.
    pub fn unify(&mut self, a: &Ty, b: &Ty) -> Result<(), ()> {
        let a = self.resolve(a);
        let b = self.resolve(b);
        match (a, b) {
            (Ty::Var(v1), Ty::Var(v2)) if v1 == v2 => Ok(()),
            (Ty::Var(v1), Ty::Var(v2)) => {
                self.table
                    .unify_var_var(v1, v2)
                    .map_err(|_| ())
            }
            (Ty::Var(v), ty) | (ty, Ty::Var(v)) => {
                if self.occurs_in(v, &ty) {
                    return Err(());
                }
                self.table.unify_var_value(v, Some(ty)).map_err(|_| ())
            }
            // The poison type unifies with anything.
            (Ty::Error, _) | (_, Ty::Error) => Ok(()),
            (Ty::Prim(p1), Ty::Prim(p2)) if p1 == p2 => Ok(()),
            (
                Ty::Named { name: n1, args: a1 },
                Ty::Named { name: n2, args: a2 },
            )
            | (
                Ty::Generic { name: n1, args: a1 },
                Ty::Generic { name: n2, args: a2 },
            ) => {
                if n1 != n2 || a1.len() != a2.len() {
                    return Err(());
                }
                for (x, y) in a1.iter().zip(a2.iter()) {
                    self.unify(x, y)?;
                }
                Ok(())
            }
            (
                Ty::Fun { params: p1, ret: r1, .. },
                Ty::Fun { params: p2, ret: r2, .. },
            ) => {
                if p1.len() != p2.len() {
                    return Err(());
                }
                for (x, y) in p1.iter().zip(p2.iter()) {
                    self.unify(x, y)?;
                }
                self.unify(&r1, &r2)
            }
            (Ty::TraitObj(t1), Ty::TraitObj(t2)) if t1 == t2 => Ok(()),
            (Ty::RValueRef(i1), Ty::RValueRef(i2)) => self.unify(&i1, &i2),
            (Ty::Param(p1), Ty::Param(p2)) if p1 == p2 => Ok(()),
            (Ty::Nil, Ty::Nil) => Ok(()),
            (a, b) if a == b => Ok(()),
            _ => Err(()),
        }
    }
}

impl Default for InferCtx {
    fn default() -> Self {
        Self::new()
    }
}
