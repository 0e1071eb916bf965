//! Decision trees: the compiled form of `match` expressions.

pub mod compile;

pub use compile::{compile_match, CompiledMatch};

use std::fmt;

/// How to reach a sub-value of the scrutinee.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AccessPath {
    /// The scrutinee itself.
    Root,
    /// The `index`-th field of the value at `base` (constructor payload,
    /// tuple element, or struct field slot).
    Field { base: Box<AccessPath>, index: usize },
}

impl AccessPath {
    pub fn field(&self, index: usize) -> AccessPath {
        AccessPath::Field {
            base: Box::new(self.clone()),
            index,
        }
    }
}

impl fmt::Display for AccessPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessPath::Root => write!(f, "$"),
            AccessPath::Field { base, index } => write!(f, "{base}.{index}"),
        }
    }
}

/// A constructor a switch can test for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CtorTag {
    pub type_name: String,
    pub variant: String,
    /// Discriminant: the variant's position in the enum declaration.
    pub tag: usize,
    pub arity: usize,
}

/// What one switch arm tests.
#[derive(Debug, Clone, PartialEq)]
pub enum Test {
    Ctor(CtorTag),
    Int(i64),
    /// Bit pattern of the float, so arms stay comparable.
    Float(u64),
    Str(String),
    Bool(bool),
    Nil,
}

impl fmt::Display for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Test::Ctor(tag) => write!(f, "{}", tag.variant),
            Test::Int(v) => write!(f, "{v}"),
            Test::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
            Test::Str(s) => write!(f, "{s:?}"),
            Test::Bool(b) => write!(f, "{b}"),
            Test::Nil => write!(f, "nil"),
        }
    }
}

/// The compiled decision tree.
///
/// `Leaf` selects a match arm with the bindings discovered along the
/// path; `Switch` tests one scrutinee position; `Guard` runs an arm's
/// guard expression, falling through on failure. `Fail` marks a path no
/// arm covers (reachable `Fail` means the match was non-exhaustive).
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionTree {
    Leaf {
        case_index: usize,
        bindings: Vec<(String, AccessPath)>,
    },
    Guard {
        case_index: usize,
        bindings: Vec<(String, AccessPath)>,
        guard: tocin_ast::ExprId,
        failure: Box<DecisionTree>,
    },
    Switch {
        path: AccessPath,
        arms: Vec<(Test, DecisionTree)>,
        default: Option<Box<DecisionTree>>,
    },
    Fail,
}

impl DecisionTree {
    /// Collect every arm index reachable through the tree.
    pub fn reachable_arms(&self, out: &mut Vec<usize>) {
        match self {
            DecisionTree::Leaf { case_index, .. } => out.push(*case_index),
            DecisionTree::Guard { case_index, failure, .. } => {
                out.push(*case_index);
                failure.reachable_arms(out);
            }
            DecisionTree::Switch { arms, default, .. } => {
                for (_, child) in arms {
                    child.reachable_arms(out);
                }
                if let Some(default) = default {
                    default.reachable_arms(out);
                }
            }
            DecisionTree::Fail => {}
        }
    }

    /// Whether any path through the tree reaches `Fail`.
    pub fn can_fail(&self) -> bool {
        match self {
            DecisionTree::Leaf { .. } => false,
            DecisionTree::Guard { failure, .. } => failure.can_fail(),
            DecisionTree::Switch { arms, default, .. } => {
                arms.iter().any(|(_, child)| child.can_fail())
                    || default.as_ref().map(|d| d.can_fail()).unwrap_or(false)
            }
            DecisionTree::Fail => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_path_display() {
        let path = AccessPath::Root.field(0).field(2);
        assert_eq!(path.to_string(), "$.0.2");
    }

    #[test]
    fn reachable_arms_walks_the_tree() {
        let tree = DecisionTree::Switch {
            path: AccessPath::Root,
            arms: vec![
                (
                    Test::Bool(true),
                    DecisionTree::Leaf { case_index: 0, bindings: vec![] },
                ),
                (
                    Test::Bool(false),
                    DecisionTree::Leaf { case_index: 1, bindings: vec![] },
                ),
            ],
            default: None,
        };
        let mut arms = Vec::new();
        tree.reachable_arms(&mut arms);
        arms.sort();
        assert_eq!(arms, vec![0, 1]);
        assert!(!tree.can_fail());
    }

    #[test]
    fn fail_is_detected_through_defaults() {
        let tree = DecisionTree::Switch {
            path: AccessPath::Root,
            arms: vec![(
                Test::Int(1),
                DecisionTree::Leaf { case_index: 0, bindings: vec![] },
            )],
            default: Some(Box::new(DecisionTree::Fail)),
        };
        assert!(tree.can_fail());
    }
}
