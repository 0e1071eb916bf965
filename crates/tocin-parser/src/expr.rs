//! Expression parsing: precedence climbing with a small amount of
//! speculation for explicit call-site type arguments (`id<int>(3)` vs.
//! the comparison `id < int`).

use tocin_ast::{BinOp, ExprId, ExprKind, InterpSegment, MatchArm, Param, StmtKind, UnOp};
use tocin_common::TokenKind;

use crate::Parser;

impl<'t> Parser<'t> {
    pub(crate) fn parse_expr(&mut self) -> ExprId {
        self.parse_assign()
    }

    /// Assignment and channel send sit at the lowest precedence and are
    /// right-associative.
    fn parse_assign(&mut self) -> ExprId {
        let start = self.current_span();
        let lhs = self.parse_or();
        if self.eat(TokenKind::Eq) {
            let value = self.parse_assign();
            let span = start.merge(self.prev_span());
            return self.ast.alloc_expr(ExprKind::Assign { target: lhs, value }, span);
        }
        if self.eat(TokenKind::LArrow) {
            let value = self.parse_assign();
            let span = start.merge(self.prev_span());
            return self
                .ast
                .alloc_expr(ExprKind::Send { channel: lhs, value }, span);
        }
        lhs
    }

    fn parse_or(&mut self) -> ExprId {
        let start = self.current_span();
        let mut lhs = self.parse_and();
        while self.eat(TokenKind::PipePipe) {
            let rhs = self.parse_and();
            let span = start.merge(self.prev_span());
            lhs = self.ast.alloc_expr(ExprKind::Binary { op: BinOp::Or, lhs, rhs }, span);
        }
        lhs
    }

    fn parse_and(&mut self) -> ExprId {
        let start = self.current_span();
        let mut lhs = self.parse_equality();
        while self.eat(TokenKind::AmpAmp) {
            let rhs = self.parse_equality();
            let span = start.merge(self.prev_span());
            lhs = self.ast.alloc_expr(ExprKind::Binary { op: BinOp::And, lhs, rhs }, span);
        }
        lhs
    }

    fn parse_equality(&mut self) -> ExprId {
        let start = self.current_span();
        let mut lhs = self.parse_comparison();
        loop {
            let op = if self.eat(TokenKind::EqEq) {
                BinOp::Eq
            } else if self.eat(TokenKind::NotEq) {
                BinOp::Ne
            } else {
                break;
            };
            let rhs = self.parse_comparison();
            let span = start.merge(self.prev_span());
            lhs = self.ast.alloc_expr(ExprKind::Binary { op, lhs, rhs }, span);
        }
        lhs
    }

    fn parse_comparison(&mut self) -> ExprId {
        let start = self.current_span();
        let mut lhs = self.parse_additive();
        loop {
            let op = if self.eat(TokenKind::Lt) {
                BinOp::Lt
            } else if self.eat(TokenKind::LtEq) {
                BinOp::Le
            } else if self.eat(TokenKind::Gt) {
                BinOp::Gt
            } else if self.eat(TokenKind::GtEq) {
                BinOp::Ge
            } else {
                break;
            };
            let rhs = self.parse_additive();
            let span = start.merge(self.prev_span());
            lhs = self.ast.alloc_expr(ExprKind::Binary { op, lhs, rhs }, span);
        }
        lhs
    }

    fn parse_additive(&mut self) -> ExprId {
        let start = self.current_span();
        let mut lhs = self.parse_multiplicative();
        loop {
            let op = if self.eat(TokenKind::Plus) {
                BinOp::Add
            } else if self.eat(TokenKind::Minus) {
                BinOp::Sub
            } else {
                break;
            };
            let rhs = self.parse_multiplicative();
            let span = start.merge(self.prev_span());
            lhs = self.ast.alloc_expr(ExprKind::Binary { op, lhs, rhs }, span);
        }
        lhs
    }

    fn parse_multiplicative(&mut self) -> ExprId {
        let start = self.current_span();
        let mut lhs = self.parse_cast();
        loop {
            let op = if self.eat(TokenKind::Star) {
                BinOp::Mul
            } else if self.eat(TokenKind::Slash) {
                BinOp::Div
            } else if self.eat(TokenKind::Percent) {
                BinOp::Mod
            } else {
                break;
            };
            let rhs = self.parse_cast();
            let span = start.merge(self.prev_span());
            lhs = self.ast.alloc_expr(ExprKind::Binary { op, lhs, rhs }, span);
        }
        lhs
    }

    /// `e as T` binds tighter than arithmetic, looser than unary.
    fn parse_cast(&mut self) -> ExprId {
        let start = self.current_span();
        let mut operand = self.parse_unary();
        while self.eat(TokenKind::As) {
            let ty = self.parse_type();
            let span = start.merge(self.prev_span());
            operand = self.ast.alloc_expr(ExprKind::Cast { operand, ty }, span);
        }
        operand
    }

    fn parse_unary(&mut self) -> ExprId {
        let start = self.current_span();
        match self.peek().clone() {
            TokenKind::Minus => {
                self.advance();
                let operand = self.parse_unary();
                let span = start.merge(self.prev_span());
                self.ast.alloc_expr(ExprKind::Unary { op: UnOp::Neg, operand }, span)
            }
            TokenKind::Bang => {
                self.advance();
                let operand = self.parse_unary();
                let span = start.merge(self.prev_span());
                self.ast.alloc_expr(ExprKind::Unary { op: UnOp::Not, operand }, span)
            }
            TokenKind::Await => {
                self.advance();
                let operand = self.parse_unary();
                let span = start.merge(self.prev_span());
                self.ast.alloc_expr(ExprKind::Await(operand), span)
            }
            TokenKind::Move => {
                self.advance();
                let operand = self.parse_unary();
                let span = start.merge(self.prev_span());
                self.ast.alloc_expr(ExprKind::Move(operand), span)
            }
            TokenKind::LArrow => {
                self.advance();
                let channel = self.parse_unary();
                let span = start.merge(self.prev_span());
                self.ast.alloc_expr(ExprKind::Recv(channel), span)
            }
            TokenKind::Delete => {
                self.advance();
                let operand = self.parse_unary();
                let span = start.merge(self.prev_span());
                self.ast.alloc_expr(ExprKind::Delete(operand), span)
            }
            TokenKind::New => {
                self.advance();
                let ty = self.parse_type();
                self.expect(TokenKind::LParen, "`(` after `new` type");
                let args = self.parse_call_args();
                let span = start.merge(self.prev_span());
                self.ast.alloc_expr(ExprKind::New { ty, args }, span)
            }
            _ => self.parse_postfix(),
        }
    }

    /// Comma-separated arguments up to a closing paren (consumed).
    fn parse_call_args(&mut self) -> Vec<ExprId> {
        let mut args = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                args.push(self.parse_expr());
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "`)`");
        args
    }

    fn parse_postfix(&mut self) -> ExprId {
        let start = self.current_span();
        let mut expr = self.parse_primary();
        loop {
            match self.peek() {
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_call_args();
                    let span = start.merge(self.prev_span());
                    expr = self.ast.alloc_expr(
                        ExprKind::Call { callee: expr, type_args: vec![], args },
                        span,
                    );
                }
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect_ident("member name after `.`");
                    let span = start.merge(self.prev_span());
                    expr = self.ast.alloc_expr(ExprKind::Member { object: expr, name }, span);
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expr();
                    self.expect(TokenKind::RBracket, "`]`");
                    let span = start.merge(self.prev_span());
                    expr = self.ast.alloc_expr(ExprKind::Index { object: expr, index }, span);
                }
                TokenKind::Lt => {
                    // Maybe explicit type arguments: `id<int>(3)`. Try a
                    // speculative parse; on failure this is a comparison
                    // and the caller handles it.
                    let Some((type_args, args)) = self.try_parse_generic_call() else {
                        break;
                    };
                    let span = start.merge(self.prev_span());
                    expr = self.ast.alloc_expr(
                        ExprKind::Call { callee: expr, type_args, args },
                        span,
                    );
                }
                _ => break,
            }
        }
        expr
    }

    /// Speculatively parse `<T, ...>(args)`. Returns `None` (with the
    /// position restored) when the tokens do not form a generic call.
    fn try_parse_generic_call(
        &mut self,
    ) -> Option<(Vec<tocin_ast::TypeId>, Vec<ExprId>)> {
        // Cheap pre-check: a type argument must start with something a
        // type can start with.
        if !matches!(
            self.peek_ahead(1),
            TokenKind::Ident(_) | TokenKind::Dyn | TokenKind::Fn | TokenKind::LParen
        ) {
            return None;
        }
        let checkpoint = self.checkpoint();
        self.advance(); // `<`
        let mut type_args = Vec::new();
        loop {
            type_args.push(self.parse_type());
            if self.eat(TokenKind::Comma) {
                continue;
            }
            break;
        }
        if !self.eat(TokenKind::Gt) || !self.at(TokenKind::LParen) {
            self.rewind(checkpoint);
            return None;
        }
        self.advance(); // `(`
        let args = self.parse_call_args();
        Some((type_args, args))
    }

    fn parse_primary(&mut self) -> ExprId {
        let start = self.current_span();
        match self.peek().clone() {
            TokenKind::Int(v) => {
                self.advance();
                self.ast.alloc_expr(ExprKind::Int(v), start)
            }
            TokenKind::Float(v) => {
                self.advance();
                self.ast.alloc_expr(ExprKind::Float(v), start)
            }
            TokenKind::Str(s) => {
                self.advance();
                self.ast.alloc_expr(ExprKind::Str(s), start)
            }
            TokenKind::True => {
                self.advance();
                self.ast.alloc_expr(ExprKind::Bool(true), start)
            }
            TokenKind::False => {
                self.advance();
                self.ast.alloc_expr(ExprKind::Bool(false), start)
            }
            TokenKind::Nil => {
                self.advance();
                self.ast.alloc_expr(ExprKind::Nil, start)
            }
            TokenKind::StrOpen => self.parse_interp_string(),
            TokenKind::Ident(name) => {
                self.advance();
                self.ast.alloc_expr(ExprKind::Var(name), start)
            }
            TokenKind::SelfKw => {
                self.advance();
                self.ast.alloc_expr(ExprKind::Var("self".into()), start)
            }
            TokenKind::LParen => {
                self.advance();
                if self.eat(TokenKind::RParen) {
                    // `()` is the empty tuple (void value).
                    let span = start.merge(self.prev_span());
                    return self.ast.alloc_expr(ExprKind::Tuple(vec![]), span);
                }
                let first = self.parse_expr();
                if self.eat(TokenKind::Comma) {
                    let mut elems = vec![first];
                    if !self.at(TokenKind::RParen) {
                        loop {
                            elems.push(self.parse_expr());
                            if !self.eat(TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RParen, "`)`");
                    let span = start.merge(self.prev_span());
                    self.ast.alloc_expr(ExprKind::Tuple(elems), span)
                } else {
                    self.expect(TokenKind::RParen, "`)`");
                    let span = start.merge(self.prev_span());
                    self.ast.alloc_expr(ExprKind::Group(first), span)
                }
            }
            TokenKind::LBracket => {
                self.advance();
                let mut elems = Vec::new();
                if !self.at(TokenKind::RBracket) {
                    loop {
                        elems.push(self.parse_expr());
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RBracket, "`]`");
                let span = start.merge(self.prev_span());
                self.ast.alloc_expr(ExprKind::List(elems), span)
            }
            TokenKind::LBrace => {
                // In expression position `{` opens a dictionary literal.
                self.advance();
                let mut entries = Vec::new();
                if !self.at(TokenKind::RBrace) {
                    loop {
                        let key = self.parse_expr();
                        self.expect(TokenKind::Colon, "`:` between dict key and value");
                        let value = self.parse_expr();
                        entries.push((key, value));
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RBrace, "`}`");
                let span = start.merge(self.prev_span());
                self.ast.alloc_expr(ExprKind::Dict(entries), span)
            }
            TokenKind::Fn => self.parse_lambda(),
            TokenKind::Match => self.parse_match_expr(),
            other => {
                self.error_here(format!(
                    "expected an expression, found {}",
                    crate::describe(&other)
                ));
                self.error_expr()
            }
        }
    }

    /// `fn(params) [-> T] { ... }` in expression position.
    fn parse_lambda(&mut self) -> ExprId {
        let start = self.current_span();
        self.advance(); // `fn`
        self.expect(TokenKind::LParen, "`(`");
        let mut params = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                let pstart = self.current_span();
                let is_moved = self.eat(TokenKind::Move);
                let name = self.expect_ident("parameter name");
                let ty = if self.eat(TokenKind::Colon) {
                    Some(self.parse_type())
                } else {
                    None
                };
                let span = pstart.merge(self.prev_span());
                params.push(Param { name, ty, is_moved, span });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "`)`");
        let ret = if self.eat(TokenKind::Arrow) {
            Some(self.parse_type())
        } else {
            None
        };
        let body = self.parse_block();
        let span = start.merge(self.prev_span());
        self.ast.alloc_expr(ExprKind::Lambda { params, ret, body }, span)
    }

    /// `match scrutinee { pat [if guard] -> expr, ... }`.
    pub(crate) fn parse_match_expr(&mut self) -> ExprId {
        let start = self.current_span();
        self.advance(); // `match`
        let scrutinee = self.parse_expr();
        self.expect(TokenKind::LBrace, "`{` after match scrutinee");
        let mut arms = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            let arm_start = self.current_span();
            let pattern = self.parse_pattern();
            let guard = if self.eat(TokenKind::If) {
                Some(self.parse_expr())
            } else {
                None
            };
            self.expect(TokenKind::Arrow, "`->` after match pattern");
            let body = self.parse_arm_body();
            let span = arm_start.merge(self.prev_span());
            arms.push(MatchArm { pattern, guard, body, span });
            // Arms are separated by `,` or `;`, both optional before `}`.
            if !self.eat(TokenKind::Comma) {
                self.eat(TokenKind::Semi);
            }
        }
        self.expect(TokenKind::RBrace, "`}`");
        let span = start.merge(self.prev_span());
        self.ast.alloc_expr(ExprKind::Match { scrutinee, arms }, span)
    }

    fn parse_arm_body(&mut self) -> ExprId {
        self.parse_expr()
    }

    /// `"a ${x} b"` segmented interpolated string.
    fn parse_interp_string(&mut self) -> ExprId {
        let start = self.current_span();
        self.advance(); // StrOpen
        let mut segments = Vec::new();
        loop {
            match self.peek().clone() {
                TokenKind::StrText(text) => {
                    self.advance();
                    segments.push(InterpSegment::Text(text));
                }
                TokenKind::InterpStart => {
                    self.advance();
                    let expr = self.parse_expr();
                    self.expect(TokenKind::InterpEnd, "`}` closing interpolation");
                    segments.push(InterpSegment::Expr(expr));
                }
                TokenKind::StrClose => {
                    self.advance();
                    break;
                }
                _ => {
                    self.error_here("unterminated string interpolation".to_string());
                    break;
                }
            }
        }
        let span = start.merge(self.prev_span());
        self.ast.alloc_expr(ExprKind::Interp(segments), span)
    }

    /// A block in statement form, for lambda and control-flow bodies.
    pub(crate) fn parse_block(&mut self) -> tocin_ast::StmtId {
        let start = self.current_span();
        if !self.expect(TokenKind::LBrace, "`{`") {
            return self.error_stmt();
        }
        let mut stmts = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            let before = self.pos;
            stmts.push(self.parse_stmt());
            if self.pos == before {
                self.advance();
            }
        }
        self.expect(TokenKind::RBrace, "`}`");
        let span = start.merge(self.prev_span());
        self.ast.alloc_stmt(StmtKind::Block(stmts), span)
    }
}
