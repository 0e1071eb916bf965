//! Artifact printers for `--emit`.
//!
//! Three forms, each a plain-text rendering on stdout: the raw AST, the
//! typed AST (every expression with its synthesized type), and the
//! normalized lowered module the backend would consume.

use std::fmt::Write as _;

use tocin_ast::{Ast, ExprId, StmtId, StmtKind};
use tocin_lower::{FnForm, LoweredModule};
use tocin_typeck::TypeckResult;

/// `--emit=ast`: the parsed statement tree.
pub fn render_ast(ast: &Ast) -> String {
    let mut out = String::new();
    for item in &ast.items {
        render_stmt(ast, *item, 0, &mut out);
    }
    out
}

/// `--emit=typed-ast`: the statement tree with expression types.
pub fn render_typed(ast: &Ast, typeck: &TypeckResult) -> String {
    let mut out = String::new();
    for item in &ast.items {
        render_stmt(ast, *item, 0, &mut out);
    }
    out.push_str("\n; expression types\n");
    for (index, ty) in typeck.expr_types.iter().enumerate() {
        let span = ast.expr(ExprId(index as u32)).span;
        let _ = writeln!(out, "#{index} @{}..{}: {ty}", span.start, span.end);
    }
    out
}

/// `--emit=ir`: the lowered module.
pub fn render_ir(module: &LoweredModule) -> String {
    let mut out = String::new();
    for function in &module.functions {
        let params: Vec<String> = function.params.iter().map(|p| p.to_string()).collect();
        let form = match &function.form {
            FnForm::Plain => "fn".to_string(),
            FnForm::AsyncBody { suspension_points } => {
                format!("async-body[{} suspension(s)]", suspension_points.len())
            }
            FnForm::AsyncWrapper { of } => format!("wrapper-of {of}"),
            FnForm::Specialization { of, type_args } => {
                let args: Vec<String> = type_args.iter().map(|t| t.to_string()).collect();
                format!("specialization-of {of}<{}>", args.join(", "))
            }
            FnForm::Extension => "extension".to_string(),
        };
        let _ = writeln!(
            out,
            "{form} {}({}) -> {}",
            function.name,
            params.join(", "),
            function.ret
        );
    }
    if !module.matches.is_empty() {
        out.push_str("\n; compiled matches\n");
        let mut keys: Vec<_> = module.matches.keys().collect();
        keys.sort();
        for key in keys {
            let _ = writeln!(out, "match #{}: {:?}", key.0, module.matches[key]);
        }
    }
    if !module.call_rewrites.is_empty() {
        out.push_str("\n; call rewrites\n");
        let mut rewrites: Vec<_> = module.call_rewrites.iter().collect();
        rewrites.sort_by_key(|(id, _)| **id);
        for (call, target) in rewrites {
            let _ = writeln!(out, "call #{} -> {target}", call.0);
        }
    }
    if !module.link.imports.is_empty() || !module.link.exports.is_empty() {
        out.push_str("\n; module surface\n");
        for import in &module.link.imports {
            let _ = writeln!(out, "import {} = {}", import.local, import.qualified);
        }
        for export in &module.link.exports {
            let _ = writeln!(out, "export {export}");
        }
    }
    out
}

fn render_stmt(ast: &Ast, id: StmtId, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let stmt = ast.stmt(id);
    let head = match &stmt.kind {
        StmtKind::Expr(e) => format!("expr #{}", e.0),
        StmtKind::Block(stmts) => format!("block[{}]", stmts.len()),
        StmtKind::Let { name, is_const, .. } => {
            format!("{} {name}", if *is_const { "const" } else { "let" })
        }
        StmtKind::Fn(decl) => format!(
            "{}fn {}({} params)",
            if decl.is_async { "async " } else { "" },
            decl.name,
            decl.params.len()
        ),
        StmtKind::Return(_) => "return".to_string(),
        StmtKind::If { .. } => "if".to_string(),
        StmtKind::While { .. } => "while".to_string(),
        StmtKind::For { name, .. } => format!("for {name}"),
        StmtKind::Break => "break".to_string(),
        StmtKind::Continue => "continue".to_string(),
        StmtKind::Class(decl) => format!("class {}", decl.name),
        StmtKind::Enum(decl) => format!("enum {}[{} variants]", decl.name, decl.variants.len()),
        StmtKind::Trait(decl) => format!("trait {}", decl.name),
        StmtKind::Impl(decl) => format!("impl {}", decl.trait_name),
        StmtKind::Extend { target, .. } => format!("extend {target}"),
        StmtKind::Import { module, .. } => format!("import {module}"),
        StmtKind::Export { names } => format!("export[{}]", names.len()),
        StmtKind::Module { name, .. } => format!("module {name}"),
        StmtKind::Go { .. } => "go".to_string(),
        StmtKind::Defer { .. } => "defer".to_string(),
        StmtKind::Select { arms, .. } => format!("select[{} arms]", arms.len()),
        StmtKind::Prop(decl) => format!("prop {}", decl.name),
        StmtKind::Error => "<error>".to_string(),
    };
    let _ = writeln!(out, "{indent}{head}");

    // One level of structural descent keeps the output readable.
    match &stmt.kind {
        StmtKind::Block(stmts) | StmtKind::Module { body: stmts, .. } => {
            for s in stmts {
                render_stmt(ast, *s, depth + 1, out);
            }
        }
        StmtKind::Fn(decl) => render_stmt(ast, decl.body, depth + 1, out),
        StmtKind::If { then_block, elifs, else_block, .. } => {
            render_stmt(ast, *then_block, depth + 1, out);
            for (_, block) in elifs {
                render_stmt(ast, *block, depth + 1, out);
            }
            if let Some(block) = else_block {
                render_stmt(ast, *block, depth + 1, out);
            }
        }
        StmtKind::While { body, .. } | StmtKind::For { body, .. } => {
            render_stmt(ast, *body, depth + 1, out);
        }
        StmtKind::Defer { stmt } => render_stmt(ast, *stmt, depth + 1, out),
        _ => {}
    }
}
