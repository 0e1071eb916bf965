//! The symbol table: a tree of lexical scopes.
//!
//! Scopes are stored in one arena; the active scope is an index and
//! lookup walks parent links. Module scopes additionally expose their
//! bindings in the global scope under `module$name` qualified keys, which
//! is what `resolve_qualified` consults.

use rustc_hash::FxHashMap;

use tocin_common::Span;

use crate::ty::Ty;

/// A name the symbol table can never admit; scope internals reserve it.
pub const RESERVED_PARENT: &str = "__parent";

/// What kind of entity a binding names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Variable,
    Function,
    Parameter,
    Type,
    Trait,
    Module,
    Property,
}

/// Binding visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Private,
    Public,
}

/// One declared name.
#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
    pub ty: Ty,
    pub span: Span,
    pub mutable: bool,
    pub visibility: Visibility,
}

/// Why a `declare` call failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclareError {
    /// The current scope already binds this name.
    Duplicate { previous: Span },
    /// The name is reserved for scope internals.
    Reserved,
}

struct Scope {
    bindings: FxHashMap<String, Binding>,
    parent: Option<usize>,
}

/// The scope stack for one compilation unit.
pub struct SymbolTable {
    scopes: Vec<Scope>,
    current: usize,
    /// Qualified bindings: `module$name` from every named module scope.
    qualified: FxHashMap<String, Binding>,
}

impl SymbolTable {
    /// Create the table with its global scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                bindings: FxHashMap::default(),
                parent: None,
            }],
            current: 0,
            qualified: FxHashMap::default(),
        }
    }

    /// Enter a new child scope.
    pub fn push_scope(&mut self) {
        let id = self.scopes.len();
        self.scopes.push(Scope {
            bindings: FxHashMap::default(),
            parent: Some(self.current),
        });
        self.current = id;
    }

    /// Leave the current scope. The global scope is never popped.
    pub fn pop_scope(&mut self) {
        if let Some(parent) = self.scopes[self.current].parent {
            self.current = parent;
        }
    }

    /// Whether the current scope is the global one.
    pub fn at_global_scope(&self) -> bool {
        self.current == 0
    }

    /// Declare a binding in the current scope.
    pub fn declare(&mut self, binding: Binding) -> Result<(), DeclareError> {
        if binding.name == RESERVED_PARENT {
            return Err(DeclareError::Reserved);
        }
        let scope = &mut self.scopes[self.current];
        if let Some(previous) = scope.bindings.get(&binding.name) {
            return Err(DeclareError::Duplicate {
                previous: previous.span,
            });
        }
        scope.bindings.insert(binding.name.clone(), binding);
        Ok(())
    }

    /// Resolve a name by walking from the current scope to the root.
    /// Returns the closest enclosing binding.
    pub fn resolve(&self, name: &str) -> Option<&Binding> {
        let mut scope = self.current;
        loop {
            if let Some(binding) = self.scopes[scope].bindings.get(name) {
                return Some(binding);
            }
            scope = self.scopes[scope].parent?;
        }
    }

    /// Resolve a `Module.name` qualified reference.
    pub fn resolve_qualified(&self, path: &str) -> Option<&Binding> {
        let (module, name) = path.rsplit_once('.')?;
        self.qualified.get(&format!("{module}${name}"))
    }

    /// Expose a binding under its module-qualified key.
    pub fn expose_qualified(&mut self, module: &str, binding: Binding) {
        self.qualified
            .insert(format!("{module}${}", binding.name), binding);
    }

    /// All qualified names exposed by a module, for import linking.
    pub fn module_exports(&self, module: &str) -> Vec<&Binding> {
        let prefix = format!("{module}$");
        let mut found: Vec<&Binding> = self
            .qualified
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(_, b)| b)
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }

    /// Snapshot of the current scope's own bindings, in name order.
    /// Used to expose a module scope's contents under qualified names.
    pub fn current_bindings(&self) -> Vec<Binding> {
        let mut bindings: Vec<Binding> =
            self.scopes[self.current].bindings.values().cloned().collect();
        bindings.sort_by(|a, b| a.name.cmp(&b.name));
        bindings
    }

    /// Update the mutability-tracked type of an existing binding (used
    /// when a placeholder resolves at first concrete use).
    pub fn update_type(&mut self, name: &str, ty: Ty) {
        let mut scope = self.current;
        loop {
            if let Some(binding) = self.scopes[scope].bindings.get_mut(name) {
                binding.ty = ty;
                return;
            }
            match self.scopes[scope].parent {
                Some(parent) => scope = parent,
                None => return,
            }
        }
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
