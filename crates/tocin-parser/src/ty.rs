//! Type-expression parsing.

use tocin_ast::{TypeExprKind, TypeId, TypeParamDecl};
use tocin_common::TokenKind;

use crate::Parser;

impl<'t> Parser<'t> {
    /// Parse a type expression: unions of postfix types.
    pub(crate) fn parse_type(&mut self) -> TypeId {
        let start = self.current_span();
        let first = self.parse_postfix_type();
        if !self.at(TokenKind::Pipe) {
            return first;
        }
        let mut members = vec![first];
        while self.eat(TokenKind::Pipe) {
            members.push(self.parse_postfix_type());
        }
        let span = start.merge(self.prev_span());
        self.ast.alloc_type(TypeExprKind::Union(members), span)
    }

    /// An atom type with an optional trailing `&&` (rvalue reference).
    fn parse_postfix_type(&mut self) -> TypeId {
        let start = self.current_span();
        let inner = self.parse_atom_type();
        if self.eat(TokenKind::AmpAmp) {
            let span = start.merge(self.prev_span());
            self.ast.alloc_type(TypeExprKind::RValueRef(inner), span)
        } else {
            inner
        }
    }

    fn parse_atom_type(&mut self) -> TypeId {
        let start = self.current_span();
        match self.peek().clone() {
            // `dyn Trait`
            TokenKind::Dyn => {
                self.advance();
                let name = self.expect_path("trait name after `dyn`");
                let span = start.merge(self.prev_span());
                self.ast.alloc_type(TypeExprKind::TraitObject(name), span)
            }
            // `fn(T1, T2) -> R` and `async fn(...) -> R`
            TokenKind::Fn | TokenKind::Async => {
                let is_async = self.eat(TokenKind::Async);
                self.expect(TokenKind::Fn, "`fn`");
                self.expect(TokenKind::LParen, "`(`");
                let mut params = Vec::new();
                if !self.at(TokenKind::RParen) {
                    loop {
                        params.push(self.parse_type());
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RParen, "`)`");
                self.expect(TokenKind::Arrow, "`->`");
                let ret = self.parse_type();
                let span = start.merge(self.prev_span());
                self.ast
                    .alloc_type(TypeExprKind::Fun { params, ret, is_async }, span)
            }
            // Tuple type or parenthesized type.
            TokenKind::LParen => {
                self.advance();
                let mut elems = Vec::new();
                if !self.at(TokenKind::RParen) {
                    loop {
                        elems.push(self.parse_type());
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RParen, "`)`");
                let span = start.merge(self.prev_span());
                if elems.len() == 1 {
                    elems.pop().unwrap_or_else(|| {
                        self.ast.alloc_type(
                            TypeExprKind::Name { name: "void".into(), args: vec![] },
                            span,
                        )
                    })
                } else {
                    self.ast.alloc_type(TypeExprKind::Tuple(elems), span)
                }
            }
            TokenKind::Ident(_) => {
                let name = self.expect_path("type name");
                let args = self.parse_type_args();
                let span = start.merge(self.prev_span());
                self.ast.alloc_type(TypeExprKind::Name { name, args }, span)
            }
            other => {
                self.error_here(format!(
                    "expected a type, found {}",
                    crate::describe(&other)
                ));
                let span = self.current_span();
                self.ast
                    .alloc_type(TypeExprKind::Name { name: "void".into(), args: vec![] }, span)
            }
        }
    }

    /// Angle-bracketed type arguments, or empty when no `<` follows.
    pub(crate) fn parse_type_args(&mut self) -> Vec<TypeId> {
        if !self.at(TokenKind::Lt) {
            return Vec::new();
        }
        self.advance();
        let mut args = Vec::new();
        if !self.at(TokenKind::Gt) {
            loop {
                args.push(self.parse_type());
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::Gt, "`>`");
        args
    }

    /// Generic parameter list with bounds: `<T, U: Display + Clone>`.
    /// Returns empty when no `<` follows.
    pub(crate) fn parse_type_params(&mut self) -> Vec<TypeParamDecl> {
        if !self.at(TokenKind::Lt) {
            return Vec::new();
        }
        self.advance();
        let mut params = Vec::new();
        if !self.at(TokenKind::Gt) {
            loop {
                let start = self.current_span();
                let name = self.expect_ident("type parameter name");
                let mut bounds = Vec::new();
                if self.eat(TokenKind::Colon) {
                    loop {
                        bounds.push(self.expect_path("trait bound"));
                        if !self.eat(TokenKind::Plus) {
                            break;
                        }
                    }
                }
                let span = start.merge(self.prev_span());
                params.push(TypeParamDecl { name, bounds, span });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::Gt, "`>`");
        params
    }
}
