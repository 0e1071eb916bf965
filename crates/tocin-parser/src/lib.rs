//! Recursive-descent parser for the Tocin language.
//!
//! Consumes the token stream and fills an [`Ast`] arena. Syntax errors are
//! reported as `S001`/`S002` diagnostics and recovered with panic mode:
//! the parser skips to the next statement-starting token (or a closing
//! brace) and continues, so one run reports as many problems as possible.
//!
//! Statement terminators (`;`) are optional; declarations and blocks are
//! self-delimiting.

mod expr;
mod item;
mod pat;
mod ty;

use tocin_common::diag::{Code, Diagnostic, Severity};
use tocin_common::{FileId, Span, Token, TokenKind};

use tocin_ast::{Ast, ExprKind, StmtId, StmtKind};

/// Parse a token stream into an AST.
///
/// The returned diagnostics are the parser's own; the caller merges them
/// into the unit sink after the lexer's.
pub fn parse(file: FileId, tokens: &[Token]) -> (Ast, Vec<Diagnostic>) {
    let mut parser = Parser::new(file, tokens);
    parser.parse_program();
    (parser.ast, parser.errors)
}

/// Convenience for tests and the driver: lex and parse in one step.
pub fn parse_source(file: FileId, source: &str) -> (Ast, Vec<Diagnostic>) {
    let (tokens, mut diags) = tocin_lexer::tokenize(file, source);
    let (ast, parse_diags) = parse(file, &tokens);
    diags.extend(parse_diags);
    (ast, diags)
}

#[derive(Clone, Copy)]
pub(crate) struct Checkpoint {
    pos: usize,
    errors_len: usize,
}

pub(crate) struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    pub(crate) ast: Ast,
    file: FileId,
    pub(crate) errors: Vec<Diagnostic>,
}

impl<'t> Parser<'t> {
    fn new(file: FileId, tokens: &'t [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            ast: Ast::new(file),
            file,
            errors: Vec::new(),
        }
    }

    fn parse_program(&mut self) {
        while !self.at(TokenKind::Eof) {
            let before = self.pos;
            let stmt = self.parse_stmt();
            self.ast.items.push(stmt);
            // A statement that consumed nothing would loop forever; skip a
            // token and keep going.
            if self.pos == before {
                self.advance();
            }
        }
    }

    // ── Token access ───────────────────────────────────────────────────

    pub(crate) fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> &TokenKind {
        &self.tokens[(self.pos + n).min(self.tokens.len() - 1)].kind
    }

    pub(crate) fn current_span(&self) -> Span {
        self.tokens[self.pos.min(self.tokens.len() - 1)].span
    }

    pub(crate) fn prev_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1).min(self.tokens.len() - 1)].span
    }

    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        *self.peek() == kind
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    /// Consume the token if it matches.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume the expected token or report `S001` (without advancing).
    pub(crate) fn expect(&mut self, kind: TokenKind, what: &str) -> bool {
        if self.eat(kind) {
            true
        } else {
            self.error_here(format!("expected {what}, found {}", describe(self.peek())));
            false
        }
    }

    /// Save/restore points for speculative parses (explicit call-site
    /// type arguments need lookahead past `<`). Rewinding also discards
    /// any diagnostics the speculation produced.
    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            errors_len: self.errors.len(),
        }
    }

    pub(crate) fn rewind(&mut self, checkpoint: Checkpoint) {
        self.pos = checkpoint.pos;
        self.errors.truncate(checkpoint.errors_len);
    }

    // ── Errors & recovery ──────────────────────────────────────────────

    pub(crate) fn error_here(&mut self, message: String) {
        let span = self.current_span();
        self.errors
            .push(Diagnostic::new(Code::S001, Severity::Error, message, self.file, span));
    }

    pub(crate) fn error_at(&mut self, code: Code, message: String, span: Span) {
        self.errors
            .push(Diagnostic::new(code, Severity::Error, message, self.file, span));
    }

    /// Panic-mode recovery: skip tokens until something that can start a
    /// statement, a closing brace, or end of input.
    pub(crate) fn recover_to_stmt_boundary(&mut self) {
        while !self.at(TokenKind::Eof) {
            if self.eat(TokenKind::Semi) {
                return;
            }
            if self.peek().starts_statement() || self.at(TokenKind::RBrace) {
                return;
            }
            self.advance();
        }
    }

    /// Parse an identifier or report and return a placeholder.
    pub(crate) fn expect_ident(&mut self, what: &str) -> String {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                name
            }
            other => {
                self.error_here(format!("expected {what}, found {}", describe(&other)));
                String::new()
            }
        }
    }

    /// Parse a possibly dot-qualified name (`Module.name`).
    pub(crate) fn expect_path(&mut self, what: &str) -> String {
        let mut path = self.expect_ident(what);
        while self.at(TokenKind::Dot) {
            // Only continue the path when an identifier follows the dot.
            if let TokenKind::Ident(_) = self.peek_ahead(1) {
                self.advance();
                let segment = self.expect_ident("name after `.`");
                path.push('.');
                path.push_str(&segment);
            } else {
                break;
            }
        }
        path
    }

    /// Allocate an error expression at the current location.
    pub(crate) fn error_expr(&mut self) -> tocin_ast::ExprId {
        let span = self.current_span();
        self.ast.alloc_expr(ExprKind::Error, span)
    }

    pub(crate) fn error_stmt(&mut self) -> StmtId {
        let span = self.current_span();
        self.ast.alloc_stmt(StmtKind::Error, span)
    }
}

/// A short human description of a token for error messages.
pub(crate) fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Ident(name) => format!("identifier `{name}`"),
        TokenKind::Int(v) => format!("integer `{v}`"),
        TokenKind::Float(v) => format!("float `{v}`"),
        TokenKind::Str(_) | TokenKind::StrOpen => "string literal".to_string(),
        TokenKind::Eof => "end of input".to_string(),
        other => format!("`{}`", token_text(other)),
    }
}

fn token_text(kind: &TokenKind) -> &'static str {
    use TokenKind::*;
    match kind {
        As => "as",
        Async => "async",
        Await => "await",
        Break => "break",
        Class => "class",
        Const => "const",
        Continue => "continue",
        Default => "default",
        Defer => "defer",
        Delete => "delete",
        Dyn => "dyn",
        Elif => "elif",
        Else => "else",
        Enum => "enum",
        Export => "export",
        Extend => "extend",
        False => "false",
        Fn => "fn",
        For => "for",
        Go => "go",
        If => "if",
        Impl => "impl",
        Import => "import",
        In => "in",
        Let => "let",
        Match => "match",
        Module => "module",
        Move => "move",
        New => "new",
        Nil => "nil",
        Prop => "prop",
        Pub => "pub",
        Return => "return",
        Select => "select",
        SelfKw => "self",
        Trait => "trait",
        True => "true",
        While => "while",
        Plus => "+",
        Minus => "-",
        Star => "*",
        Slash => "/",
        Percent => "%",
        EqEq => "==",
        NotEq => "!=",
        Lt => "<",
        Gt => ">",
        LtEq => "<=",
        GtEq => ">=",
        AmpAmp => "&&",
        PipePipe => "||",
        Bang => "!",
        Eq => "=",
        Arrow => "->",
        LArrow => "<-",
        Pipe => "|",
        Question => "?",
        DotDot => "..",
        LParen => "(",
        RParen => ")",
        LBrace => "{",
        RBrace => "}",
        LBracket => "[",
        RBracket => "]",
        Comma => ",",
        Dot => ".",
        Colon => ":",
        Semi => ";",
        StrText(_) => "string text",
        InterpStart => "${",
        InterpEnd => "}",
        StrClose => "\"",
        _ => "token",
    }
}
