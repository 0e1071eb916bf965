//! Tokenizer for the Tocin language.
//!
//! Converts source text into the token stream consumed by the parser.
//! Errors are collected rather than aborting, so one pass reports every
//! lexical problem and the parser still receives a usable stream.
//!
//! Interpolated strings use a state stack: `"a ${x} b"` lexes as
//! `StrOpen StrText("a ") InterpStart Ident(x) InterpEnd StrText(" b")
//! StrClose`, while a string with no `${` collapses to a single `Str`
//! token.

mod cursor;

use cursor::Cursor;
use tocin_common::diag::{Code, Diagnostic, Severity};
use tocin_common::{FileId, Span, Token, TokenKind};

/// What the lexer is currently doing.
#[derive(Debug, Clone, PartialEq)]
enum LexerState {
    /// Normal top-level tokenization.
    Normal,
    /// Inside an interpolated string (after `StrOpen`).
    InString,
    /// Inside a `${...}` interpolation expression.
    InInterp { brace_depth: u32 },
}

/// The Tocin lexer.
pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    file: FileId,
    emitted_eof: bool,
    /// Tokens queued for emission before resuming normal lexing.
    pending: Vec<Token>,
    state_stack: Vec<LexerState>,
    errors: Vec<Diagnostic>,
}

/// Tokenize an entire source file.
///
/// Returns the token stream (always terminated by `Eof`) and any lexical
/// diagnostics, which the caller forwards into the unit's sink.
pub fn tokenize(file: FileId, source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut lexer = Lexer::new(file, source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            break;
        }
    }
    (tokens, lexer.errors)
}

impl<'src> Lexer<'src> {
    pub fn new(file: FileId, source: &'src str) -> Self {
        Self {
            cursor: Cursor::new(source),
            file,
            emitted_eof: false,
            pending: Vec::new(),
            state_stack: vec![LexerState::Normal],
            errors: Vec::new(),
        }
    }

    fn error(&mut self, code: Code, message: impl Into<String>, span: Span) {
        self.errors
            .push(Diagnostic::new(code, Severity::Error, message, self.file, span));
    }

    /// Produce the next token based on the current state.
    pub fn next_token(&mut self) -> Token {
        if let Some(token) = self.pending.pop() {
            return token;
        }
        if self.emitted_eof {
            let at = self.cursor.pos();
            return Token::new(TokenKind::Eof, at, at);
        }
        let state = self
            .state_stack
            .last()
            .cloned()
            .unwrap_or(LexerState::Normal);
        let token = match state {
            LexerState::Normal | LexerState::InInterp { .. } => self.lex_normal(),
            LexerState::InString => self.lex_string_content(),
        };
        if token.kind == TokenKind::Eof {
            self.emitted_eof = true;
        }
        token
    }

    // ── Normal mode ────────────────────────────────────────────────────

    fn lex_normal(&mut self) -> Token {
        self.skip_trivia();

        let start = self.cursor.pos();
        let Some(c) = self.cursor.peek() else {
            return Token::new(TokenKind::Eof, start, start);
        };

        match c {
            '(' => self.single(TokenKind::LParen, start),
            ')' => self.single(TokenKind::RParen, start),
            '[' => self.single(TokenKind::LBracket, start),
            ']' => self.single(TokenKind::RBracket, start),
            '{' => {
                if let Some(LexerState::InInterp { brace_depth }) = self.state_stack.last_mut() {
                    *brace_depth += 1;
                }
                self.single(TokenKind::LBrace, start)
            }
            '}' => self.lex_rbrace(start),
            ',' => self.single(TokenKind::Comma, start),
            ';' => self.single(TokenKind::Semi, start),
            ':' => self.single(TokenKind::Colon, start),
            '.' => self.lex_dot(start),
            '?' => self.single(TokenKind::Question, start),
            '+' => self.single(TokenKind::Plus, start),
            '*' => self.single(TokenKind::Star, start),
            '/' => self.single(TokenKind::Slash, start),
            '%' => self.single(TokenKind::Percent, start),
            '=' => self.two(start, TokenKind::Eq, '=', TokenKind::EqEq),
            '!' => self.two(start, TokenKind::Bang, '=', TokenKind::NotEq),
            '>' => self.two(start, TokenKind::Gt, '=', TokenKind::GtEq),
            '<' => self.lex_lt(start),
            '-' => self.lex_minus(start),
            '&' => self.lex_amp(start),
            '|' => self.two(start, TokenKind::Pipe, '|', TokenKind::PipePipe),
            '#' => {
                self.cursor.eat_while(|c| c != '\n');
                self.lex_normal()
            }
            '0'..='9' => self.lex_number(start),
            '"' => self.lex_string_open(start),
            c if is_ident_start(c) => self.lex_ident(start),
            other => {
                self.cursor.advance();
                let span = Span::new(start, self.cursor.pos());
                self.error(Code::L003, format!("unexpected character `{other}`"), span);
                self.lex_normal()
            }
        }
    }

    fn skip_trivia(&mut self) {
        self.cursor
            .eat_while(|c| c == ' ' || c == '\t' || c == '\n' || c == '\r');
    }

    fn single(&mut self, kind: TokenKind, start: u32) -> Token {
        self.cursor.advance();
        Token::new(kind, start, self.cursor.pos())
    }

    /// One character `plain`, or two characters `extended` when the next
    /// char is `second`.
    fn two(&mut self, start: u32, plain: TokenKind, second: char, extended: TokenKind) -> Token {
        self.cursor.advance();
        if self.cursor.peek() == Some(second) {
            self.cursor.advance();
            Token::new(extended, start, self.cursor.pos())
        } else {
            Token::new(plain, start, self.cursor.pos())
        }
    }

    /// `<` -> `Lt`, `<=` -> `LtEq`, `<-` -> `LArrow`.
    fn lex_lt(&mut self, start: u32) -> Token {
        self.cursor.advance();
        match self.cursor.peek() {
            Some('=') => {
                self.cursor.advance();
                Token::new(TokenKind::LtEq, start, self.cursor.pos())
            }
            Some('-') => {
                self.cursor.advance();
                Token::new(TokenKind::LArrow, start, self.cursor.pos())
            }
            _ => Token::new(TokenKind::Lt, start, self.cursor.pos()),
        }
    }

    /// `-` -> `Minus`, `->` -> `Arrow`.
    fn lex_minus(&mut self, start: u32) -> Token {
        self.cursor.advance();
        if self.cursor.peek() == Some('>') {
            self.cursor.advance();
            Token::new(TokenKind::Arrow, start, self.cursor.pos())
        } else {
            Token::new(TokenKind::Minus, start, self.cursor.pos())
        }
    }

    /// `&&` -> `AmpAmp`; a lone `&` is a lexical error.
    fn lex_amp(&mut self, start: u32) -> Token {
        self.cursor.advance();
        if self.cursor.peek() == Some('&') {
            self.cursor.advance();
            Token::new(TokenKind::AmpAmp, start, self.cursor.pos())
        } else {
            let span = Span::new(start, self.cursor.pos());
            self.error(Code::L003, "unexpected character `&`", span);
            self.lex_normal()
        }
    }

    /// `.` -> `Dot`, `..` -> `DotDot`.
    fn lex_dot(&mut self, start: u32) -> Token {
        self.cursor.advance();
        if self.cursor.peek() == Some('.') {
            self.cursor.advance();
            Token::new(TokenKind::DotDot, start, self.cursor.pos())
        } else {
            Token::new(TokenKind::Dot, start, self.cursor.pos())
        }
    }

    /// A `}` either closes an interpolation (popping back into string
    /// mode) or is an ordinary right brace.
    fn lex_rbrace(&mut self, start: u32) -> Token {
        if let Some(LexerState::InInterp { brace_depth }) = self.state_stack.last_mut() {
            if *brace_depth == 0 {
                self.state_stack.pop();
                self.cursor.advance();
                return Token::new(TokenKind::InterpEnd, start, self.cursor.pos());
            }
            *brace_depth -= 1;
        }
        self.single(TokenKind::RBrace, start)
    }

    // ── Numbers ────────────────────────────────────────────────────────

    fn lex_number(&mut self, start: u32) -> Token {
        self.cursor.eat_while(|c| c.is_ascii_digit());

        let is_float = self.cursor.peek() == Some('.')
            && self.cursor.peek_next().is_some_and(|c| c.is_ascii_digit());
        if is_float {
            self.cursor.advance(); // '.'
            self.cursor.eat_while(|c| c.is_ascii_digit());
        }

        let end = self.cursor.pos();
        let text = self.cursor.slice(start, end);
        let span = Span::new(start, end);
        if is_float {
            match text.parse::<f64>() {
                Ok(value) => Token::new(TokenKind::Float(value), start, end),
                Err(_) => {
                    self.error(Code::L001, format!("invalid number literal `{text}`"), span);
                    Token::new(TokenKind::Float(0.0), start, end)
                }
            }
        } else {
            match text.parse::<i64>() {
                Ok(value) => Token::new(TokenKind::Int(value), start, end),
                Err(_) => {
                    self.error(Code::L001, format!("invalid number literal `{text}`"), span);
                    Token::new(TokenKind::Int(0), start, end)
                }
            }
        }
    }

    // ── Strings ────────────────────────────────────────────────────────

    /// Lex from an opening quote. Scans ahead: a string with no `${`
    /// becomes one `Str` token; otherwise the segmented form begins.
    fn lex_string_open(&mut self, start: u32) -> Token {
        self.cursor.advance(); // opening quote
        let (text, stopped_at) = self.scan_string_text();
        match stopped_at {
            StringStop::Quote => Token::new(TokenKind::Str(text), start, self.cursor.pos()),
            StringStop::Interp => {
                // Emit StrOpen now; queue the text segment and InterpStart.
                let open_end = start + 1;
                let pos = self.cursor.pos();
                self.pending.push(Token::new(TokenKind::InterpStart, pos - 2, pos));
                if !text.is_empty() {
                    self.pending
                        .push(Token::new(TokenKind::StrText(text), open_end, pos - 2));
                }
                self.state_stack.push(LexerState::InString);
                self.state_stack.push(LexerState::InInterp { brace_depth: 0 });
                Token::new(TokenKind::StrOpen, start, open_end)
            }
            StringStop::Eof => {
                let span = Span::new(start, self.cursor.pos());
                self.error(Code::L002, "unterminated string literal", span);
                Token::new(TokenKind::Str(text), start, self.cursor.pos())
            }
        }
    }

    /// Resume lexing string content after an interpolation closed.
    fn lex_string_content(&mut self) -> Token {
        let start = self.cursor.pos();
        let (text, stopped_at) = self.scan_string_text();
        match stopped_at {
            StringStop::Quote => {
                self.state_stack.pop();
                let pos = self.cursor.pos();
                self.pending.push(Token::new(TokenKind::StrClose, pos - 1, pos));
                if !text.is_empty() {
                    return Token::new(TokenKind::StrText(text), start, pos - 1);
                }
                self.pending.pop().unwrap_or(Token::new(TokenKind::StrClose, pos - 1, pos))
            }
            StringStop::Interp => {
                let pos = self.cursor.pos();
                self.state_stack.push(LexerState::InInterp { brace_depth: 0 });
                self.pending.push(Token::new(TokenKind::InterpStart, pos - 2, pos));
                if !text.is_empty() {
                    return Token::new(TokenKind::StrText(text), start, pos - 2);
                }
                self.pending.pop().unwrap_or(Token::new(TokenKind::InterpStart, pos - 2, pos))
            }
            StringStop::Eof => {
                self.state_stack.pop();
                let span = Span::new(start, self.cursor.pos());
                self.error(Code::L002, "unterminated string literal", span);
                Token::new(TokenKind::StrClose, self.cursor.pos(), self.cursor.pos())
            }
        }
    }

    /// Scan literal string text, processing escapes, until a closing
    /// quote, a `${`, or end of input. Consumes the terminator.
    fn scan_string_text(&mut self) -> (String, StringStop) {
        let mut text = String::new();
        loop {
            match self.cursor.peek() {
                None => return (text, StringStop::Eof),
                Some('"') => {
                    self.cursor.advance();
                    return (text, StringStop::Quote);
                }
                Some('$') if self.cursor.peek_next() == Some('{') => {
                    self.cursor.advance();
                    self.cursor.advance();
                    return (text, StringStop::Interp);
                }
                Some('\\') => {
                    self.cursor.advance();
                    match self.cursor.advance() {
                        Some('n') => text.push('\n'),
                        Some('t') => text.push('\t'),
                        Some('r') => text.push('\r'),
                        Some('\\') => text.push('\\'),
                        Some('"') => text.push('"'),
                        Some('$') => text.push('$'),
                        Some('0') => text.push('\0'),
                        Some(other) => {
                            let pos = self.cursor.pos();
                            self.error(
                                Code::L003,
                                format!("invalid escape sequence `\\{other}`"),
                                Span::new(pos.saturating_sub(2), pos),
                            );
                        }
                        None => return (text, StringStop::Eof),
                    }
                }
                Some(c) => {
                    self.cursor.advance();
                    text.push(c);
                }
            }
        }
    }

    // ── Identifiers ────────────────────────────────────────────────────

    fn lex_ident(&mut self, start: u32) -> Token {
        self.cursor.eat_while(is_ident_continue);
        let end = self.cursor.pos();
        let text = self.cursor.slice(start, end);
        let kind = TokenKind::keyword(text).unwrap_or_else(|| TokenKind::Ident(text.to_string()));
        Token::new(kind, start, end)
    }
}

enum StringStop {
    Quote,
    Interp,
    Eof,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
