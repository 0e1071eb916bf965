//! Module linking.
//!
//! `import M.{a, b as c}` binds `a` and `c` in the importing scope to
//! the exporting module's qualified symbols (`M$a`, `M$b`); `export`
//! records the unit's public surface. Module bodies run once per
//! compilation unit, in declaration order, before the entry point.

use tocin_ast::{Ast, StmtId, StmtKind};

/// One imported name: the local binding and the qualified symbol it
/// resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub local: String,
    pub qualified: String,
}

/// A module body to execute once at unit start.
#[derive(Debug, Clone)]
pub struct ModuleInit {
    pub module: String,
    /// Non-declaration statements of the module body, in order.
    pub body: Vec<StmtId>,
}

/// The unit's linked module surface.
#[derive(Debug, Clone, Default)]
pub struct ModuleLink {
    pub imports: Vec<ImportBinding>,
    pub exports: Vec<String>,
    pub inits: Vec<ModuleInit>,
}

/// Collect the link surface from the unit's items.
pub fn link(ast: &Ast, exports: &[String]) -> ModuleLink {
    let mut imports = Vec::new();
    let mut inits = Vec::new();

    for item in &ast.items {
        match &ast.stmt(*item).kind {
            StmtKind::Import { module, names } => {
                for (name, alias) in names {
                    imports.push(ImportBinding {
                        local: alias.clone().unwrap_or_else(|| name.clone()),
                        qualified: format!("{module}${name}"),
                    });
                }
            }
            StmtKind::Module { name, body } => {
                let runtime_body: Vec<StmtId> = body
                    .iter()
                    .copied()
                    .filter(|s| is_runtime_stmt(ast, *s))
                    .collect();
                inits.push(ModuleInit {
                    module: name.clone(),
                    body: runtime_body,
                });
            }
            _ => {}
        }
    }

    ModuleLink {
        imports,
        exports: exports.to_vec(),
        inits,
    }
}

/// Whether a module-body statement executes at init time (declarations
/// do not).
fn is_runtime_stmt(ast: &Ast, id: StmtId) -> bool {
    !matches!(
        ast.stmt(id).kind,
        StmtKind::Fn(_)
            | StmtKind::Class(_)
            | StmtKind::Enum(_)
            | StmtKind::Trait(_)
            | StmtKind::Impl(_)
            | StmtKind::Extend { .. }
            | StmtKind::Import { .. }
            | StmtKind::Export { .. }
            | StmtKind::Module { .. }
            | StmtKind::Error
    )
}
