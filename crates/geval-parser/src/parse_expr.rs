//! Expression parsing with full operator precedence.
//!
//! Precedence (lowest → highest):
//! 6. `||`
//! 5. `&&`
//! 4. `==`, `!=`, `<`, `>`, `<=`, `>=`
//! 3. `+`, `-`
//! 2. `*`, `/`, `%`
//! 1. unary `-`, `+`, `!`
//! 0. `.` (selector), `[]` (index), `()` (call)

use geval_lexer::token::TokenKind;
use geval_types::ast::*;
use geval_types::ErrorCode;

use crate::parser::Parser;

/// Deepest expression nesting accepted before reporting E104.
pub(crate) const MAX_EXPR_DEPTH: u32 = 64;

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Point
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse an expression.
    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        self.parse_nested(Self::parse_or)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence Chain
    // ══════════════════════════════════════════════════════════════════════════

    /// `OrExpr = AndExpr { "||" AndExpr }`
    fn parse_or(&mut self) -> Option<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::OrOr) {
            let right = self.parse_and()?;
            left = binary(left, BinOp::Or, right);
        }
        Some(left)
    }

    /// `AndExpr = CompExpr { "&&" CompExpr }`
    fn parse_and(&mut self) -> Option<Expr> {
        let mut left = self.parse_comparison()?;
        while self.eat(&TokenKind::AndAnd) {
            let right = self.parse_comparison()?;
            left = binary(left, BinOp::And, right);
        }
        Some(left)
    }

    /// `CompExpr = AddExpr { CompOp AddExpr }`
    fn parse_comparison(&mut self) -> Option<Expr> {
        let mut left = self.parse_add()?;
        while let Some(op) = self.match_comparison_op() {
            self.advance(); // consume operator
            let right = self.parse_add()?;
            left = binary(left, op, right);
        }
        Some(left)
    }

    /// Check if current token is a comparison operator, return corresponding BinOp.
    fn match_comparison_op(&self) -> Option<BinOp> {
        match self.peek_kind() {
            TokenKind::EqEq => Some(BinOp::Eq),
            TokenKind::BangEq => Some(BinOp::NotEq),
            TokenKind::Less => Some(BinOp::Less),
            TokenKind::Greater => Some(BinOp::Greater),
            TokenKind::LessEq => Some(BinOp::LessEq),
            TokenKind::GreaterEq => Some(BinOp::GreaterEq),
            _ => None,
        }
    }

    /// `AddExpr = MulExpr { ("+" | "-") MulExpr }`
    fn parse_add(&mut self) -> Option<Expr> {
        let mut left = self.parse_mul()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_mul()?;
            left = binary(left, op, right);
        }
        Some(left)
    }

    /// `MulExpr = UnaryExpr { ("*" | "/" | "%") UnaryExpr }`
    fn parse_mul(&mut self) -> Option<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Rem,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(left, op, right);
        }
        Some(left)
    }

    /// `UnaryExpr = ("-" | "+" | "!") UnaryExpr | PostfixExpr`
    fn parse_unary(&mut self) -> Option<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        let start = self.advance();
        // Nested unary operators count towards the depth limit
        let operand = self.parse_nested(Self::parse_unary)?;
        let span = start.merge(operand.span);
        Some(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    /// Run `parse` one nesting level deeper.
    fn parse_nested(&mut self, parse: fn(&mut Self) -> Option<Expr>) -> Option<Expr> {
        self.expr_depth += 1;
        if self.expr_depth > MAX_EXPR_DEPTH {
            self.error_at_current(
                ErrorCode::NESTING_TOO_DEEP,
                format!("maximum expression nesting depth is {MAX_EXPR_DEPTH}"),
            );
            self.expr_depth -= 1;
            return None;
        }
        let result = parse(self);
        self.expr_depth -= 1;
        result
    }

    /// `PostfixExpr = PrimaryExpr { "." Identifier | "[" Expr "]" | "(" ArgList ")" }`
    fn parse_postfix(&mut self) -> Option<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.advance(); // eat `.`
                    let field = self.expect_identifier()?;
                    let span = expr.span.merge(field.span);
                    expr = Expr::new(
                        ExprKind::Selector {
                            object: Box::new(expr),
                            field,
                        },
                        span,
                    );
                }
                TokenKind::LBracket => {
                    let open = self.advance(); // eat `[`
                    self.skip_newlines();
                    let index = self.parse_expression()?;
                    self.skip_newlines();
                    self.expect_closing(&TokenKind::RBracket, open)?;
                    let span = expr.span.merge(self.previous_span());
                    expr = Expr::new(
                        ExprKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                TokenKind::LParen => {
                    let open = self.advance(); // eat `(`
                    let args = self.parse_expr_list_until(&TokenKind::RParen)?;
                    self.expect_closing(&TokenKind::RParen, open)?;
                    let span = expr.span.merge(self.previous_span());
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
                _ => break,
            }
        }
        Some(expr)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Primary Expressions
    // ══════════════════════════════════════════════════════════════════════════

    /// `Primary = literal | ident | "(" Expr ")" | "[" "]" Type "{" [ExprList] "}" | MapType`
    fn parse_primary(&mut self) -> Option<Expr> {
        let start = self.current_span();
        match self.peek_kind().clone() {
            TokenKind::IntLit(n) => {
                self.advance();
                Some(Expr::new(ExprKind::IntLit(n), start))
            }
            TokenKind::FloatLit(n) => {
                self.advance();
                Some(Expr::new(ExprKind::FloatLit(n), start))
            }
            TokenKind::StringLit(s) => {
                self.advance();
                Some(Expr::new(ExprKind::StringLit(s), start))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Some(Expr::new(ExprKind::Identifier(name), start))
            }
            TokenKind::LParen => {
                self.advance(); // eat `(`
                self.skip_newlines();
                let inner = self.parse_expression()?;
                self.skip_newlines();
                self.expect_closing(&TokenKind::RParen, start)?;
                let span = start.merge(self.previous_span());
                Some(Expr::new(ExprKind::Paren(Box::new(inner)), span))
            }
            TokenKind::LBracket => self.parse_slice_literal(),
            TokenKind::Map => self.parse_map_type(),
            other => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected expression, got '{other}'"),
                );
                None
            }
        }
    }

    /// `"[" "]" Type "{" [ExprList] "}"`
    fn parse_slice_literal(&mut self) -> Option<Expr> {
        let start = self.advance(); // eat `[`
        self.expect(&TokenKind::RBracket)?;
        let elem = self.parse_type_name()?;
        if !self.check_exact(&TokenKind::LBrace) {
            self.error_with_suggestion(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("expected '{{' after '[]{}', got '{}'", elem.name, self.peek_kind()),
                self.current_span(),
                format!("write a slice literal such as []{}{{}}", elem.name),
            );
            return None;
        }
        let open = self.advance(); // eat `{`
        let elements = self.parse_expr_list_until(&TokenKind::RBrace)?;
        self.expect_closing(&TokenKind::RBrace, open)?;
        let span = start.merge(self.previous_span());
        Some(Expr::new(ExprKind::SliceLit { elem, elements }, span))
    }

    /// Comma-separated expressions up to (not including) `closing`.
    /// Line breaks and a trailing comma are allowed.
    pub(crate) fn parse_expr_list_until(&mut self, closing: &TokenKind) -> Option<Vec<Expr>> {
        let mut items = Vec::new();
        self.skip_newlines();
        while !self.check_exact(closing) && !self.at_end() {
            items.push(self.parse_expression()?);
            self.skip_newlines();
            if !self.eat(&TokenKind::Comma) {
                break;
            }
            self.skip_newlines();
        }
        Some(items)
    }
}

/// Build a binary node spanning both operands.
fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr::new(
        ExprKind::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}
