//! Shared types for the Tocin compiler.
//!
//! Everything here is phase-agnostic: byte spans and the line index,
//! the source map, the token vocabulary, and the diagnostic model that
//! every pass reports into.

pub mod diag;
pub mod source;
pub mod span;
pub mod token;

pub use diag::{Code, Diagnostic, Diagnostics, Severity};
pub use source::{FileId, SourceFile, SourceMap};
pub use span::{LineIndex, Span};
pub use token::{Token, TokenKind};
