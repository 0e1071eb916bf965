//! The ownership lattice and the per-point environment.

use rustc_hash::FxHashMap;

use tocin_common::Span;

/// How a borrow is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowKind {
    Shared,
    Unique,
}

/// The ownership state of one variable at one program point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnState {
    /// Declared but not yet assigned.
    Uninitialized,
    /// Holds its value.
    Owned,
    /// The value has been moved out; reads are `B001`.
    Moved,
    /// Observed by another task (a `go` capture) or otherwise lent out.
    Borrowed(BorrowKind),
}

/// One tracked variable: its state plus the point of the last
/// transition (for diagnostics).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarState {
    pub state: OwnState,
    pub last_transition: Span,
    /// Copy-typed variables never transition to `Moved`.
    pub is_copy: bool,
}

/// The environment: every tracked variable's state at a program point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Env {
    vars: FxHashMap<String, VarState>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: &str, state: OwnState, is_copy: bool, span: Span) {
        self.vars.insert(
            name.to_string(),
            VarState { state, last_transition: span, is_copy },
        );
    }

    pub fn get(&self, name: &str) -> Option<VarState> {
        self.vars.get(name).copied()
    }

    pub fn set_state(&mut self, name: &str, state: OwnState, span: Span) {
        if let Some(var) = self.vars.get_mut(name) {
            var.state = state;
            var.last_transition = span;
        }
    }

    /// Join with another branch of control flow: a variable is `Owned`
    /// at the join only when it is `Owned` on every predecessor; mixed
    /// states degrade to `Moved`.
    pub fn join(&self, other: &Env) -> Env {
        let mut joined = FxHashMap::default();
        for (name, a) in &self.vars {
            let state = match other.vars.get(name) {
                Some(b) if a.state == b.state => a.state,
                Some(b) => match (a.state, b.state) {
                    (OwnState::Uninitialized, OwnState::Uninitialized) => OwnState::Uninitialized,
                    _ => OwnState::Moved,
                },
                // Declared on one side only: scope-local to a branch;
                // keep the side that has it.
                None => a.state,
            };
            joined.insert(
                name.clone(),
                VarState {
                    state,
                    last_transition: a.last_transition,
                    is_copy: a.is_copy,
                },
            );
        }
        for (name, b) in &other.vars {
            joined.entry(name.clone()).or_insert(*b);
        }
        Env { vars: joined }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span::new(0, 0)
    }

    #[test]
    fn join_owned_owned_is_owned() {
        let mut a = Env::new();
        a.declare("x", OwnState::Owned, false, span());
        let b = a.clone();
        assert_eq!(a.join(&b).get("x").unwrap().state, OwnState::Owned);
    }

    #[test]
    fn join_owned_moved_degrades_to_moved() {
        let mut a = Env::new();
        a.declare("x", OwnState::Owned, false, span());
        let mut b = a.clone();
        b.set_state("x", OwnState::Moved, span());
        assert_eq!(a.join(&b).get("x").unwrap().state, OwnState::Moved);
        assert_eq!(b.join(&a).get("x").unwrap().state, OwnState::Moved);
    }

    #[test]
    fn join_mixed_uninit_degrades_to_moved() {
        let mut a = Env::new();
        a.declare("x", OwnState::Uninitialized, false, span());
        let mut b = a.clone();
        b.set_state("x", OwnState::Owned, span());
        assert_eq!(a.join(&b).get("x").unwrap().state, OwnState::Moved);
    }

    #[test]
    fn join_keeps_branch_locals() {
        let mut a = Env::new();
        a.declare("only_a", OwnState::Owned, false, span());
        let b = Env::new();
        assert_eq!(a.join(&b).get("only_a").unwrap().state, OwnState::Owned);
    }
}
