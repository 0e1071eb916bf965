//! Structured diagnostics: stable codes, severities, and the sink every
//! pass reports into.
//!
//! A pass never aborts on an `Error`; it records the diagnostic and keeps
//! going so one run surfaces as many problems as possible. A `Fatal`
//! diagnostic marks the whole unit as poisoned: the driver skips all
//! subsequent passes for it. Internal invariant violations are `C004` and
//! always fatal.

use std::fmt;

use serde::Serialize;

use crate::source::{FileId, SourceMap};
use crate::span::Span;

/// Stable diagnostic codes, grouped by family.
///
/// The code is part of the compiler's public surface: tests and tooling
/// match on it, so variants are never renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Code {
    // ── L: lexical ─────────────────────────────────────────────────────
    /// Invalid number literal format.
    L001,
    /// Unterminated string literal.
    L002,
    /// Unexpected character.
    L003,
    // ── S: syntactic ───────────────────────────────────────────────────
    /// Unexpected token.
    S001,
    /// Expected an item (declaration) at top level.
    S002,
    // ── T: types ───────────────────────────────────────────────────────
    /// Type mismatch (also: trait bound not satisfied).
    T001,
    /// Undefined variable.
    T002,
    /// Undefined function or method.
    T003,
    /// Undefined type or trait.
    T004,
    /// Invalid assignment target or assignment to an immutable binding.
    T005,
    /// Invalid operator for operand type.
    T006,
    /// Incorrect argument count.
    T007,
    /// `await` outside an async function.
    T008,
    /// Cannot infer a type at a binding site.
    T009,
    // ── B: ownership ───────────────────────────────────────────────────
    /// Use after move.
    B001,
    /// Invalid move.
    B002,
    // ── M: modules/names ───────────────────────────────────────────────
    /// Duplicate definition in the same scope.
    M001,
    // ── P: patterns ────────────────────────────────────────────────────
    /// Non-exhaustive match.
    P001,
    /// Unreachable pattern.
    P002,
    // ── C: compiler ────────────────────────────────────────────────────
    /// Unimplemented feature.
    C001,
    /// Code-generation error.
    C002,
    /// Internal type-check failure.
    C003,
    /// Internal assertion failed. Always fatal.
    C004,
}

impl Code {
    pub fn as_str(self) -> &'static str {
        match self {
            Code::L001 => "L001",
            Code::L002 => "L002",
            Code::L003 => "L003",
            Code::S001 => "S001",
            Code::S002 => "S002",
            Code::T001 => "T001",
            Code::T002 => "T002",
            Code::T003 => "T003",
            Code::T004 => "T004",
            Code::T005 => "T005",
            Code::T006 => "T006",
            Code::T007 => "T007",
            Code::T008 => "T008",
            Code::T009 => "T009",
            Code::B001 => "B001",
            Code::B002 => "B002",
            Code::M001 => "M001",
            Code::P001 => "P001",
            Code::P002 => "P002",
            Code::C001 => "C001",
            Code::C002 => "C002",
            Code::C003 => "C003",
            Code::C004 => "C004",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
    /// Aborts the current pass and skips subsequent passes on the unit.
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => f.write_str("info"),
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
            Severity::Fatal => f.write_str("fatal"),
        }
    }
}

/// One reported problem, anchored to a source location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub code: Code,
    pub severity: Severity,
    pub message: String,
    pub file: FileId,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(
        code: Code,
        severity: Severity,
        message: impl Into<String>,
        file: FileId,
        span: Span,
    ) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            file,
            span,
        }
    }

    pub fn error(code: Code, message: impl Into<String>, file: FileId, span: Span) -> Self {
        Self::new(code, Severity::Error, message, file, span)
    }

    pub fn warning(code: Code, message: impl Into<String>, file: FileId, span: Span) -> Self {
        Self::new(code, Severity::Warning, message, file, span)
    }

    pub fn fatal(code: Code, message: impl Into<String>, file: FileId, span: Span) -> Self {
        Self::new(code, Severity::Fatal, message, file, span)
    }
}

/// The diagnostic sink threaded by explicit parameter through every pass.
#[derive(Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic.
    pub fn report(&mut self, diag: Diagnostic) {
        self.entries.push(diag);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether anything at `Error` severity or above was reported.
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity >= Severity::Error)
    }

    /// Whether a `Fatal` diagnostic poisoned the unit.
    pub fn is_fatal(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Fatal)
    }

    /// The highest severity observed, if any.
    pub fn max_severity(&self) -> Option<Severity> {
        self.entries.iter().map(|d| d.severity).max()
    }

    /// The driver exit code: 0 clean, 1 errors, 2 fatal.
    pub fn exit_code(&self) -> i32 {
        match self.max_severity() {
            Some(Severity::Fatal) => 2,
            Some(Severity::Error) => 1,
            _ => 0,
        }
    }

    /// Count of diagnostics with the given code. Test convenience.
    pub fn count_of(&self, code: Code) -> usize {
        self.entries.iter().filter(|d| d.code == code).count()
    }
}

// ── Rendering ──────────────────────────────────────────────────────────

/// Render one diagnostic in human format via ariadne, with the source
/// snippet and a labeled span.
pub fn render_human(diag: &Diagnostic, sources: &SourceMap) -> String {
    use ariadne::{Label, Report, ReportKind, Source};

    let file = sources.file(diag.file);
    let kind = match diag.severity {
        Severity::Info => ReportKind::Advice,
        Severity::Warning => ReportKind::Warning,
        Severity::Error | Severity::Fatal => ReportKind::Error,
    };
    let start = diag.span.start as usize;
    let end = (diag.span.end as usize).max(start + 1);

    let mut out = Vec::new();
    let _ = Report::<std::ops::Range<usize>>::build(kind, start..end)
        .with_code(diag.code.as_str())
        .with_message(&diag.message)
        .with_label(Label::new(start..end).with_message(&diag.message))
        .finish()
        .write(Source::from(file.text.as_str()), &mut out);
    let mut rendered = String::from_utf8_lossy(&out).into_owned();

    // Ariadne does not know the file path or line/column; prefix them so
    // the output is greppable.
    let (line, col) = file.line_col(diag.span.start);
    rendered.insert_str(
        0,
        &format!("{}:{}:{}: {}\n", file.path.display(), line, col, diag.severity),
    );
    rendered
}

/// Render one diagnostic as a single-line JSON object.
pub fn render_json(diag: &Diagnostic, sources: &SourceMap) -> String {
    #[derive(Serialize)]
    struct JsonDiag<'a> {
        code: &'static str,
        severity: String,
        message: &'a str,
        file: String,
        line: u32,
        column: u32,
    }

    let file = sources.file(diag.file);
    let (line, column) = file.line_col(diag.span.start);
    let payload = JsonDiag {
        code: diag.code.as_str(),
        severity: diag.severity.to_string(),
        message: &diag.message,
        file: file.path.display().to_string(),
        line,
        column,
    };
    // Serialization of a flat struct of strings and ints cannot fail.
    serde_json::to_string(&payload).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_file() -> (SourceMap, FileId) {
        let mut map = SourceMap::new();
        let id = map.add_file("main.to", "let x: int = \"hi\"\n");
        (map, id)
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Fatal > Severity::Error);
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn exit_codes() {
        let (_, id) = one_file();
        let mut diags = Diagnostics::new();
        assert_eq!(diags.exit_code(), 0);

        diags.report(Diagnostic::warning(Code::P002, "unreachable", id, Span::new(0, 3)));
        assert_eq!(diags.exit_code(), 0);
        assert!(!diags.has_errors());

        diags.report(Diagnostic::error(Code::T001, "type mismatch", id, Span::new(13, 17)));
        assert_eq!(diags.exit_code(), 1);
        assert!(diags.has_errors());
        assert!(!diags.is_fatal());

        diags.report(Diagnostic::fatal(Code::C004, "assertion failed", id, Span::point(0)));
        assert_eq!(diags.exit_code(), 2);
        assert!(diags.is_fatal());
    }

    #[test]
    fn json_rendering_carries_line_and_column() {
        let (map, id) = one_file();
        let diag = Diagnostic::error(Code::T001, "type mismatch", id, Span::new(13, 17));
        let json = render_json(&diag, &map);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["code"], "T001");
        assert_eq!(value["severity"], "error");
        assert_eq!(value["line"], 1);
        assert_eq!(value["column"], 14);
    }

    #[test]
    fn human_rendering_names_the_file() {
        let (map, id) = one_file();
        let diag = Diagnostic::error(Code::T001, "type mismatch", id, Span::new(13, 17));
        let out = render_human(&diag, &map);
        assert!(out.starts_with("main.to:1:14: error"));
        assert!(out.contains("T001"));
    }
}
