//! Statement and declaration parsing.

use tocin_ast::{
    ClassDecl, EnumDecl, ExprKind, FieldDecl, FnDecl, ImplDecl, Param, PropDecl, SelectArm,
    SelectOp, StmtId, StmtKind, TraitDecl, TraitMethod, VariantDecl,
};
use tocin_common::TokenKind;

use crate::Parser;

impl<'t> Parser<'t> {
    pub(crate) fn parse_stmt(&mut self) -> StmtId {
        match self.peek() {
            TokenKind::Let | TokenKind::Const => self.parse_let(),
            TokenKind::Fn | TokenKind::Async => self.parse_fn(false),
            TokenKind::Pub => self.parse_pub_item(),
            TokenKind::Return => self.parse_return(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Break => {
                let span = self.current_span();
                self.advance();
                self.eat(TokenKind::Semi);
                self.ast.alloc_stmt(StmtKind::Break, span)
            }
            TokenKind::Continue => {
                let span = self.current_span();
                self.advance();
                self.eat(TokenKind::Semi);
                self.ast.alloc_stmt(StmtKind::Continue, span)
            }
            TokenKind::Class => self.parse_class(false),
            TokenKind::Enum => self.parse_enum(false),
            TokenKind::Trait => self.parse_trait(false),
            TokenKind::Impl => self.parse_impl(),
            TokenKind::Extend => self.parse_extend(),
            TokenKind::Import => self.parse_import(),
            TokenKind::Export => self.parse_export(),
            TokenKind::Module => self.parse_module(),
            TokenKind::Go => self.parse_go(),
            TokenKind::Defer => self.parse_defer(),
            TokenKind::Select => self.parse_select(),
            TokenKind::Prop => self.parse_prop(),
            TokenKind::LBrace => self.parse_block(),
            _ => self.parse_expr_stmt(),
        }
    }

    fn parse_expr_stmt(&mut self) -> StmtId {
        let start = self.current_span();
        let expr = self.parse_expr();
        // Bail out of a wedged expression (nothing consumed).
        if matches!(self.ast.expr(expr).kind, ExprKind::Error) {
            self.recover_to_stmt_boundary();
        }
        self.eat(TokenKind::Semi);
        let span = start.merge(self.prev_span());
        self.ast.alloc_stmt(StmtKind::Expr(expr), span)
    }

    // ── Bindings ───────────────────────────────────────────────────────

    fn parse_let(&mut self) -> StmtId {
        let start = self.current_span();
        let is_const = self.at(TokenKind::Const);
        self.advance(); // `let` or `const`
        let name = self.expect_ident("binding name");
        let ty = if self.eat(TokenKind::Colon) {
            Some(self.parse_type())
        } else {
            None
        };
        let init = if self.eat(TokenKind::Eq) {
            Some(self.parse_expr())
        } else {
            None
        };
        self.eat(TokenKind::Semi);
        let span = start.merge(self.prev_span());
        self.ast
            .alloc_stmt(StmtKind::Let { name, is_const, ty, init }, span)
    }

    // ── Functions ──────────────────────────────────────────────────────

    fn parse_pub_item(&mut self) -> StmtId {
        self.advance(); // `pub`
        match self.peek() {
            TokenKind::Fn | TokenKind::Async => self.parse_fn(true),
            TokenKind::Class => self.parse_class(true),
            TokenKind::Enum => self.parse_enum(true),
            TokenKind::Trait => self.parse_trait(true),
            other => {
                let other = other.clone();
                self.error_here(format!(
                    "expected a declaration after `pub`, found {}",
                    crate::describe(&other)
                ));
                self.recover_to_stmt_boundary();
                self.error_stmt()
            }
        }
    }

    pub(crate) fn parse_fn(&mut self, is_pub: bool) -> StmtId {
        let start = self.current_span();
        let is_async = self.eat(TokenKind::Async);
        if !self.expect(TokenKind::Fn, "`fn`") {
            self.recover_to_stmt_boundary();
            return self.error_stmt();
        }
        let name = self.expect_ident("function name");
        let type_params = self.parse_type_params();
        self.expect(TokenKind::LParen, "`(`");
        let params = self.parse_params();
        let ret = if self.eat(TokenKind::Arrow) {
            Some(self.parse_type())
        } else {
            None
        };
        let body = self.parse_block();
        let span = start.merge(self.prev_span());
        self.ast.alloc_stmt(
            StmtKind::Fn(FnDecl {
                name,
                type_params,
                params,
                ret,
                body,
                is_async,
                is_pub,
            }),
            span,
        )
    }

    /// Parameters up to the closing paren (consumed). `self` is allowed
    /// as a bare first parameter in method position.
    fn parse_params(&mut self) -> Vec<Param> {
        let mut params = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                let start = self.current_span();
                if self.eat(TokenKind::SelfKw) {
                    params.push(Param {
                        name: "self".into(),
                        ty: None,
                        is_moved: false,
                        span: start,
                    });
                } else {
                    let is_moved = self.eat(TokenKind::Move);
                    let name = self.expect_ident("parameter name");
                    self.expect(TokenKind::Colon, "`:` after parameter name");
                    let ty = Some(self.parse_type());
                    let span = start.merge(self.prev_span());
                    params.push(Param { name, ty, is_moved, span });
                }
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "`)`");
        params
    }

    fn parse_return(&mut self) -> StmtId {
        let start = self.current_span();
        self.advance(); // `return`
        let value = if self.at(TokenKind::Semi)
            || self.at(TokenKind::RBrace)
            || self.at(TokenKind::Eof)
        {
            None
        } else {
            Some(self.parse_expr())
        };
        self.eat(TokenKind::Semi);
        let span = start.merge(self.prev_span());
        self.ast.alloc_stmt(StmtKind::Return(value), span)
    }

    // ── Control flow ───────────────────────────────────────────────────

    fn parse_if(&mut self) -> StmtId {
        let start = self.current_span();
        self.advance(); // `if`
        let cond = self.parse_expr();
        let then_block = self.parse_block();
        let mut elifs = Vec::new();
        while self.at(TokenKind::Elif) {
            self.advance();
            let elif_cond = self.parse_expr();
            let elif_block = self.parse_block();
            elifs.push((elif_cond, elif_block));
        }
        let else_block = if self.eat(TokenKind::Else) {
            Some(self.parse_block())
        } else {
            None
        };
        let span = start.merge(self.prev_span());
        self.ast.alloc_stmt(
            StmtKind::If { cond, then_block, elifs, else_block },
            span,
        )
    }

    fn parse_while(&mut self) -> StmtId {
        let start = self.current_span();
        self.advance(); // `while`
        let cond = self.parse_expr();
        let body = self.parse_block();
        let span = start.merge(self.prev_span());
        self.ast.alloc_stmt(StmtKind::While { cond, body }, span)
    }

    fn parse_for(&mut self) -> StmtId {
        let start = self.current_span();
        self.advance(); // `for`
        let name = self.expect_ident("loop variable");
        self.expect(TokenKind::In, "`in`");
        let iterable = self.parse_expr();
        let body = self.parse_block();
        let span = start.merge(self.prev_span());
        self.ast
            .alloc_stmt(StmtKind::For { name, iterable, body }, span)
    }

    // ── Type declarations ──────────────────────────────────────────────

    fn parse_class(&mut self, is_pub: bool) -> StmtId {
        let start = self.current_span();
        self.advance(); // `class`
        let name = self.expect_ident("class name");
        let type_params = self.parse_type_params();
        let base = if self.eat(TokenKind::Colon) {
            Some(self.expect_path("base class name"))
        } else {
            None
        };
        self.expect(TokenKind::LBrace, "`{`");
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            match self.peek() {
                TokenKind::Fn | TokenKind::Async => {
                    methods.push(self.parse_fn(false));
                }
                TokenKind::Ident(_) => {
                    let fstart = self.current_span();
                    let fname = self.expect_ident("field name");
                    self.expect(TokenKind::Colon, "`:` after field name");
                    let ty = self.parse_type();
                    self.eat(TokenKind::Semi);
                    self.eat(TokenKind::Comma);
                    let span = fstart.merge(self.prev_span());
                    fields.push(FieldDecl { name: fname, ty, span });
                }
                other => {
                    let other = other.clone();
                    self.error_here(format!(
                        "expected a field or method, found {}",
                        crate::describe(&other)
                    ));
                    self.advance();
                }
            }
        }
        self.expect(TokenKind::RBrace, "`}`");
        let span = start.merge(self.prev_span());
        self.ast.alloc_stmt(
            StmtKind::Class(ClassDecl { name, type_params, base, fields, methods, is_pub }),
            span,
        )
    }

    fn parse_enum(&mut self, is_pub: bool) -> StmtId {
        let start = self.current_span();
        self.advance(); // `enum`
        let name = self.expect_ident("enum name");
        let type_params = self.parse_type_params();
        self.expect(TokenKind::LBrace, "`{`");
        let mut variants = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            let vstart = self.current_span();
            let vname = self.expect_ident("variant name");
            let mut payload = Vec::new();
            if self.eat(TokenKind::LParen) {
                if !self.at(TokenKind::RParen) {
                    loop {
                        payload.push(self.parse_type());
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RParen, "`)`");
            }
            let span = vstart.merge(self.prev_span());
            variants.push(VariantDecl { name: vname, fields: payload, span });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "`}`");
        let span = start.merge(self.prev_span());
        self.ast.alloc_stmt(
            StmtKind::Enum(EnumDecl { name, type_params, variants, is_pub }),
            span,
        )
    }

    fn parse_trait(&mut self, is_pub: bool) -> StmtId {
        let start = self.current_span();
        self.advance(); // `trait`
        let name = self.expect_ident("trait name");
        let mut supertraits = Vec::new();
        if self.eat(TokenKind::Colon) {
            loop {
                supertraits.push(self.expect_path("supertrait name"));
                if !self.eat(TokenKind::Plus) {
                    break;
                }
            }
        }
        self.expect(TokenKind::LBrace, "`{`");
        let mut methods = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            let mstart = self.current_span();
            if !self.expect(TokenKind::Fn, "`fn`") {
                self.advance();
                continue;
            }
            let mname = self.expect_ident("method name");
            self.expect(TokenKind::LParen, "`(`");
            let params = self.parse_params();
            let ret = if self.eat(TokenKind::Arrow) {
                Some(self.parse_type())
            } else {
                None
            };
            // A body makes this a default method; a `;` leaves it abstract.
            let default_body = if self.at(TokenKind::LBrace) {
                Some(self.parse_block())
            } else {
                self.eat(TokenKind::Semi);
                None
            };
            let span = mstart.merge(self.prev_span());
            methods.push(TraitMethod { name: mname, params, ret, default_body, span });
        }
        self.expect(TokenKind::RBrace, "`}`");
        let span = start.merge(self.prev_span());
        self.ast.alloc_stmt(
            StmtKind::Trait(TraitDecl { name, supertraits, methods, is_pub }),
            span,
        )
    }

    fn parse_impl(&mut self) -> StmtId {
        let start = self.current_span();
        self.advance(); // `impl`
        let trait_name = self.expect_path("trait name");
        self.expect(TokenKind::For, "`for`");
        let target = self.parse_type();
        self.expect(TokenKind::LBrace, "`{`");
        let mut methods = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            if matches!(self.peek(), TokenKind::Fn | TokenKind::Async) {
                methods.push(self.parse_fn(false));
            } else {
                let other = self.peek().clone();
                self.error_here(format!(
                    "expected a method, found {}",
                    crate::describe(&other)
                ));
                self.advance();
            }
        }
        self.expect(TokenKind::RBrace, "`}`");
        let span = start.merge(self.prev_span());
        self.ast
            .alloc_stmt(StmtKind::Impl(ImplDecl { trait_name, target, methods }), span)
    }

    fn parse_extend(&mut self) -> StmtId {
        let start = self.current_span();
        self.advance(); // `extend`
        let target = self.expect_path("type name");
        self.expect(TokenKind::LBrace, "`{`");
        let mut methods = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            if matches!(self.peek(), TokenKind::Fn | TokenKind::Async) {
                methods.push(self.parse_fn(false));
            } else {
                let other = self.peek().clone();
                self.error_here(format!(
                    "expected an extension method, found {}",
                    crate::describe(&other)
                ));
                self.advance();
            }
        }
        self.expect(TokenKind::RBrace, "`}`");
        let span = start.merge(self.prev_span());
        self.ast
            .alloc_stmt(StmtKind::Extend { target, methods }, span)
    }

    // ── Modules ────────────────────────────────────────────────────────

    /// `import M`, `import M.{a, b as c}`.
    fn parse_import(&mut self) -> StmtId {
        let start = self.current_span();
        self.advance(); // `import`
        let mut module = self.expect_ident("module name");
        let mut names = Vec::new();
        loop {
            if !self.at(TokenKind::Dot) {
                break;
            }
            match self.peek_ahead(1) {
                TokenKind::LBrace => {
                    self.advance(); // `.`
                    self.advance(); // `{`
                    while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
                        let name = self.expect_ident("imported name");
                        let alias = if self.eat(TokenKind::As) {
                            Some(self.expect_ident("alias"))
                        } else {
                            None
                        };
                        names.push((name, alias));
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expect(TokenKind::RBrace, "`}`");
                    break;
                }
                TokenKind::Ident(_) => {
                    self.advance(); // `.`
                    let segment = self.expect_ident("module path segment");
                    module.push('.');
                    module.push_str(&segment);
                }
                _ => break,
            }
        }
        self.eat(TokenKind::Semi);
        let span = start.merge(self.prev_span());
        self.ast.alloc_stmt(StmtKind::Import { module, names }, span)
    }

    /// `export {a, b}`.
    fn parse_export(&mut self) -> StmtId {
        let start = self.current_span();
        self.advance(); // `export`
        self.expect(TokenKind::LBrace, "`{`");
        let mut names = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            names.push(self.expect_ident("exported name"));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "`}`");
        self.eat(TokenKind::Semi);
        let span = start.merge(self.prev_span());
        self.ast.alloc_stmt(StmtKind::Export { names }, span)
    }

    fn parse_module(&mut self) -> StmtId {
        let start = self.current_span();
        self.advance(); // `module`
        let name = self.expect_ident("module name");
        self.expect(TokenKind::LBrace, "`{`");
        let mut body = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            let before = self.pos;
            body.push(self.parse_stmt());
            if self.pos == before {
                self.advance();
            }
        }
        self.expect(TokenKind::RBrace, "`}`");
        let span = start.merge(self.prev_span());
        self.ast.alloc_stmt(StmtKind::Module { name, body }, span)
    }

    // ── Concurrency & scope hooks ──────────────────────────────────────

    fn parse_go(&mut self) -> StmtId {
        let start = self.current_span();
        self.advance(); // `go`
        let call = self.parse_expr();
        if !matches!(self.ast.expr(call).kind, ExprKind::Call { .. }) {
            let span = self.ast.expr(call).span;
            self.error_at(
                tocin_common::Code::S001,
                "`go` requires a function call".to_string(),
                span,
            );
        }
        self.eat(TokenKind::Semi);
        let span = start.merge(self.prev_span());
        self.ast.alloc_stmt(StmtKind::Go { call }, span)
    }

    fn parse_defer(&mut self) -> StmtId {
        let start = self.current_span();
        self.advance(); // `defer`
        let stmt = self.parse_stmt();
        let span = start.merge(self.prev_span());
        self.ast.alloc_stmt(StmtKind::Defer { stmt }, span)
    }

    /// `select { case v = <-ch { ... } case ch <- x { ... } default { ... } }`
    fn parse_select(&mut self) -> StmtId {
        let start = self.current_span();
        self.advance(); // `select`
        self.expect(TokenKind::LBrace, "`{`");
        let mut arms = Vec::new();
        let mut default = None;
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            if self.eat(TokenKind::Default) {
                default = Some(self.parse_block());
                continue;
            }
            let arm_start = self.current_span();
            if !self.expect_case_keyword() {
                self.advance();
                continue;
            }
            let op = self.parse_select_op();
            let body = self.parse_block();
            let span = arm_start.merge(self.prev_span());
            arms.push(SelectArm { op, body, span });
        }
        self.expect(TokenKind::RBrace, "`}`");
        let span = start.merge(self.prev_span());
        self.ast.alloc_stmt(StmtKind::Select { arms, default }, span)
    }

    /// `case` is contextual (it is not a reserved word elsewhere).
    fn expect_case_keyword(&mut self) -> bool {
        if matches!(self.peek(), TokenKind::Ident(name) if name == "case") {
            self.advance();
            true
        } else {
            self.error_here("expected `case` or `default` in select".to_string());
            false
        }
    }

    fn parse_select_op(&mut self) -> SelectOp {
        // `<-ch` (discarding receive)
        if self.eat(TokenKind::LArrow) {
            let channel = self.parse_expr();
            return SelectOp::Recv { binding: None, channel };
        }
        // `v = <-ch` (binding receive) or `ch <- x` (send).
        let checkpoint = self.checkpoint();
        if let TokenKind::Ident(name) = self.peek().clone() {
            self.advance();
            if self.eat(TokenKind::Eq) && self.eat(TokenKind::LArrow) {
                let channel = self.parse_expr();
                return SelectOp::Recv { binding: Some(name), channel };
            }
            self.rewind(checkpoint);
        }
        let channel = self.parse_expr();
        self.expect(TokenKind::LArrow, "`<-` in select send");
        let value = self.parse_expr();
        SelectOp::Send { channel, value }
    }

    // ── Properties ─────────────────────────────────────────────────────

    /// `prop name: T { get { ... } set(v) { ... } }`
    fn parse_prop(&mut self) -> StmtId {
        let start = self.current_span();
        self.advance(); // `prop`
        let name = self.expect_ident("property name");
        self.expect(TokenKind::Colon, "`:`");
        let ty = self.parse_type();
        self.expect(TokenKind::LBrace, "`{`");
        let mut getter = None;
        let mut setter = None;
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            match self.peek().clone() {
                TokenKind::Ident(kw) if kw == "get" => {
                    self.advance();
                    getter = Some(self.parse_block());
                }
                TokenKind::Ident(kw) if kw == "set" => {
                    self.advance();
                    self.expect(TokenKind::LParen, "`(`");
                    let param = self.expect_ident("setter parameter");
                    self.expect(TokenKind::RParen, "`)`");
                    setter = Some((param, self.parse_block()));
                }
                other => {
                    self.error_here(format!(
                        "expected `get` or `set`, found {}",
                        crate::describe(&other)
                    ));
                    self.advance();
                }
            }
        }
        self.expect(TokenKind::RBrace, "`}`");
        let span = start.merge(self.prev_span());
        self.ast
            .alloc_stmt(StmtKind::Prop(PropDecl { name, ty, getter, setter }), span)
    }
}
