//! Pattern parsing.
//!
//! Constructor names start with an uppercase letter (`Some`, `Circle`);
//! lowercase identifiers are fresh bindings. `_` is the wildcard.

use tocin_ast::{PatId, PatKind, PatLit};
use tocin_common::TokenKind;

use crate::Parser;

impl<'t> Parser<'t> {
    /// Parse a pattern, including `|` alternatives.
    pub(crate) fn parse_pattern(&mut self) -> PatId {
        let start = self.current_span();
        let first = self.parse_simple_pattern();
        if !self.at(TokenKind::Pipe) {
            return first;
        }
        let mut alts = vec![first];
        while self.eat(TokenKind::Pipe) {
            alts.push(self.parse_simple_pattern());
        }
        let span = start.merge(self.prev_span());
        self.ast.alloc_pat(PatKind::Or(alts), span)
    }

    fn parse_simple_pattern(&mut self) -> PatId {
        let start = self.current_span();
        match self.peek().clone() {
            TokenKind::Int(v) => {
                self.advance();
                self.ast.alloc_pat(PatKind::Lit(PatLit::Int(v)), start)
            }
            TokenKind::Float(v) => {
                self.advance();
                self.ast.alloc_pat(PatKind::Lit(PatLit::Float(v)), start)
            }
            TokenKind::Str(s) => {
                self.advance();
                self.ast.alloc_pat(PatKind::Lit(PatLit::Str(s)), start)
            }
            TokenKind::True => {
                self.advance();
                self.ast.alloc_pat(PatKind::Lit(PatLit::Bool(true)), start)
            }
            TokenKind::False => {
                self.advance();
                self.ast.alloc_pat(PatKind::Lit(PatLit::Bool(false)), start)
            }
            TokenKind::Nil => {
                self.advance();
                self.ast.alloc_pat(PatKind::Lit(PatLit::Nil), start)
            }
            // Negative literal patterns: `-3`.
            TokenKind::Minus => {
                self.advance();
                match self.peek().clone() {
                    TokenKind::Int(v) => {
                        self.advance();
                        let span = start.merge(self.prev_span());
                        self.ast.alloc_pat(PatKind::Lit(PatLit::Int(-v)), span)
                    }
                    TokenKind::Float(v) => {
                        self.advance();
                        let span = start.merge(self.prev_span());
                        self.ast.alloc_pat(PatKind::Lit(PatLit::Float(-v)), span)
                    }
                    other => {
                        self.error_here(format!(
                            "expected a number after `-` in pattern, found {}",
                            crate::describe(&other)
                        ));
                        self.ast.alloc_pat(PatKind::Wildcard, start)
                    }
                }
            }
            // Tuple pattern.
            TokenKind::LParen => {
                self.advance();
                let mut elems = Vec::new();
                if !self.at(TokenKind::RParen) {
                    loop {
                        elems.push(self.parse_pattern());
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RParen, "`)`");
                let span = start.merge(self.prev_span());
                if elems.len() == 1 {
                    elems.pop().expect("len checked")
                } else {
                    self.ast.alloc_pat(PatKind::Tuple(elems), span)
                }
            }
            TokenKind::Ident(name) => {
                self.advance();
                if name == "_" {
                    return self.ast.alloc_pat(PatKind::Wildcard, start);
                }
                // Extend into a qualified path (`Option.Some`).
                let mut path = name;
                while self.at(TokenKind::Dot) {
                    if let TokenKind::Ident(_) = self.peek_ahead(1) {
                        self.advance();
                        let segment = self.expect_ident("name after `.`");
                        path.push('.');
                        path.push_str(&segment);
                    } else {
                        break;
                    }
                }

                if self.at(TokenKind::LParen) {
                    // Constructor with payload: `Some(x)`.
                    self.advance();
                    let mut args = Vec::new();
                    if !self.at(TokenKind::RParen) {
                        loop {
                            args.push(self.parse_pattern());
                            if !self.eat(TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RParen, "`)`");
                    let span = start.merge(self.prev_span());
                    self.ast.alloc_pat(PatKind::Ctor { name: path, args }, span)
                } else if self.at(TokenKind::LBrace) {
                    // Struct pattern: `Point { x: px, y: py }`.
                    self.advance();
                    let mut fields = Vec::new();
                    while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
                        let field = self.expect_ident("field name");
                        self.expect(TokenKind::Colon, "`:`");
                        let pat = self.parse_pattern();
                        fields.push((field, pat));
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expect(TokenKind::RBrace, "`}`");
                    let span = start.merge(self.prev_span());
                    self.ast.alloc_pat(PatKind::Struct { name: path, fields }, span)
                } else if is_constructor_name(&path) {
                    // Bare constructor: `None`.
                    let span = start.merge(self.prev_span());
                    self.ast
                        .alloc_pat(PatKind::Ctor { name: path, args: vec![] }, span)
                } else {
                    self.ast.alloc_pat(PatKind::Bind(path), start)
                }
            }
            other => {
                self.error_here(format!(
                    "expected a pattern, found {}",
                    crate::describe(&other)
                ));
                self.ast.alloc_pat(PatKind::Wildcard, start)
            }
        }
    }
}

/// Uppercase first letter (of the last path segment) means constructor.
fn is_constructor_name(path: &str) -> bool {
    path.rsplit('.')
        .next()
        .and_then(|seg| seg.chars().next())
        .is_some_and(|c| c.is_uppercase())
}
