//! The Tocin compiler CLI.
//!
//! Provides the `tocinc` command:
//!
//! - `tocinc compile <file>` - run the full middle-end over one unit
//!
//! Options:
//! - `--emit` - which artifact to print (`ast`, `typed-ast`, `ir`)
//! - `--error-format` - diagnostic rendering (`human`, `json`)
//!
//! Environment:
//! - `TOCIN_MODULE_PATH` - colon-separated directories searched for
//!   `<Module>.to` files during import resolution
//!
//! Exit codes: 0 clean (warnings allowed), 1 on any error diagnostic,
//! 2 on a fatal diagnostic or an unreadable input.

mod emit;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use tocin_common::diag::{render_human, render_json};
use tocin_common::{Diagnostics, SourceMap};

#[derive(Parser)]
#[command(name = "tocinc", version, about = "The Tocin compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EmitKind {
    Ast,
    #[value(name = "typed-ast")]
    TypedAst,
    Ir,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ErrorFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a Tocin source file through the middle-end
    Compile {
        /// Path to the source file
        file: PathBuf,

        /// Artifact to print to stdout
        #[arg(long, value_enum)]
        emit: Option<EmitKind>,

        /// Diagnostic rendering
        #[arg(long = "error-format", value_enum, default_value = "human")]
        error_format: ErrorFormat,
    },
}

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Commands::Compile { file, emit, error_format } => {
            process::exit(compile(&file, emit, error_format));
        }
    }
}

fn compile(path: &Path, emit: Option<EmitKind>, error_format: ErrorFormat) -> i32 {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read `{}`: {err}", path.display());
            return 2;
        }
    };

    // Splice module files named by imports into the unit.
    let source = match resolve_module_imports(&source, &module_search_paths()) {
        Ok(source) => source,
        Err(message) => {
            eprintln!("error: {message}");
            return 2;
        }
    };

    let mut sources = SourceMap::new();
    let file = sources.add_file(path, source.clone());

    let mut diags = Diagnostics::new();

    // Lex + parse.
    let (tokens, lex_diags) = tocin_lexer::tokenize(file, &source);
    for diag in lex_diags {
        diags.report(diag);
    }
    let (ast, parse_diags) = tocin_parser::parse(file, &tokens);
    for diag in parse_diags {
        diags.report(diag);
    }

    if diags.is_fatal() {
        report(&diags, &sources, error_format);
        return diags.exit_code();
    }

    // The middle-end, in fixed order: type-check, ownership,
    // pattern-compile + lower.
    let typeck = tocin_typeck::check(&ast, &mut diags);
    if diags.is_fatal() {
        report(&diags, &sources, error_format);
        return diags.exit_code();
    }

    tocin_ownership::analyze(&ast, &typeck, &mut diags);
    if diags.is_fatal() {
        report(&diags, &sources, error_format);
        return diags.exit_code();
    }

    let lowered = tocin_lower::lower(&ast, &typeck, &mut diags);

    match emit {
        Some(EmitKind::Ast) => print!("{}", emit::render_ast(&ast)),
        Some(EmitKind::TypedAst) => print!("{}", emit::render_typed(&ast, &typeck)),
        Some(EmitKind::Ir) => print!("{}", emit::render_ir(&lowered)),
        None => {}
    }

    report(&diags, &sources, error_format);
    diags.exit_code()
}

fn report(diags: &Diagnostics, sources: &SourceMap, format: ErrorFormat) {
    for diag in diags.entries() {
        match format {
            ErrorFormat::Human => eprint!("{}", render_human(diag, sources)),
            ErrorFormat::Json => eprintln!("{}", render_json(diag, sources)),
        }
    }
}

/// Directories named by `TOCIN_MODULE_PATH` (colon-separated).
fn module_search_paths() -> Vec<PathBuf> {
    std::env::var("TOCIN_MODULE_PATH")
        .map(|raw| raw.split(':').map(PathBuf::from).collect())
        .unwrap_or_default()
}

/// Splice `<Module>.to` files from the search path into the unit as
/// `module M { ... }` blocks, so imports of on-disk modules resolve like
/// in-unit ones. Transitive imports are handled by iterating to a fixed
/// point.
fn resolve_module_imports(source: &str, search_paths: &[PathBuf]) -> Result<String, String> {
    if search_paths.is_empty() {
        return Ok(source.to_string());
    }

    let mut combined = source.to_string();
    let mut spliced: Vec<String> = Vec::new();

    for _ in 0..8 {
        let missing = missing_modules(&combined);
        let mut progressed = false;
        for module in missing {
            if spliced.contains(&module) {
                continue;
            }
            if let Some(path) = find_module_file(&module, search_paths) {
                let text = std::fs::read_to_string(&path)
                    .map_err(|e| format!("cannot read module `{}`: {e}", path.display()))?;
                combined.push_str(&format!("\nmodule {module} {{\n{text}\n}}\n"));
                spliced.push(module);
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }
    Ok(combined)
}

/// Modules named by imports but not declared in the given source.
fn missing_modules(source: &str) -> Vec<String> {
    use tocin_ast::StmtKind;
    use tocin_common::FileId;

    let (ast, _) = tocin_parser::parse_source(FileId(0), source);
    let mut declared = Vec::new();
    let mut imported = Vec::new();
    for item in &ast.items {
        match &ast.stmt(*item).kind {
            StmtKind::Module { name, .. } => declared.push(name.clone()),
            StmtKind::Import { module, .. } => imported.push(module.clone()),
            _ => {}
        }
    }
    imported.retain(|m| !declared.contains(m));
    imported
}

fn find_module_file(module: &str, search_paths: &[PathBuf]) -> Option<PathBuf> {
    for dir in search_paths {
        let candidate = dir.join(format!("{module}.to"));
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}
