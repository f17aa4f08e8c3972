//! Statement parsing.

use crate::parser::Parser;
use geval_lexer::token::TokenKind;
use geval_types::ast::*;
use geval_types::ErrorCode;

impl<'src> Parser<'src> {
    /// Parse the whole token stream as one statement list.
    pub(crate) fn parse_rule_body(&mut self) -> Option<Block> {
        let start = self.current_span();
        let mut stmts = Vec::new();
        self.skip_terminators();
        while !self.at_end() {
            if self.too_many_errors() {
                break;
            }
            if self.check_exact(&TokenKind::RBrace) {
                self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, "unexpected '}'");
                self.advance();
            } else {
                self.parse_statement_into(&mut stmts);
            }
            self.skip_terminators();
        }
        let span = start.merge(self.previous_span());
        Some(Block { stmts, span })
    }

    /// Parse a block of statements: `{ stmts... }`
    pub(crate) fn parse_block(&mut self) -> Option<Block> {
        let start = self.expect(&TokenKind::LBrace)?;
        self.skip_terminators();
        let mut stmts = Vec::new();
        while !self.check_exact(&TokenKind::RBrace) && !self.at_end() {
            if self.too_many_errors() {
                break;
            }
            self.parse_statement_into(&mut stmts);
            self.skip_terminators();
        }
        self.expect_closing(&TokenKind::RBrace, start)?;
        let span = start.merge(self.previous_span());
        Some(Block { stmts, span })
    }

    /// Parse one statement, recovering on failure.
    fn parse_statement_into(&mut self, stmts: &mut Vec<Stmt>) {
        let before = self.position();
        if let Some(stmt) = self.parse_statement() {
            stmts.push(stmt);
            return;
        }
        self.synchronize();
        if self.position() == before {
            // Recovery stopped on the token that failed; skip it
            self.advance();
        }
    }

    /// Parse a single statement including its terminator.
    pub(crate) fn parse_statement(&mut self) -> Option<Stmt> {
        let stmt = match self.peek_kind().clone() {
            TokenKind::If => self.parse_if_stmt().map(Stmt::If),
            TokenKind::For => self.parse_for_stmt().map(Stmt::For),
            TokenKind::Break => Some(self.parse_branch_stmt(BranchKind::Break)),
            TokenKind::Continue => Some(self.parse_branch_stmt(BranchKind::Continue)),
            TokenKind::Return => self.parse_return_stmt(),
            TokenKind::LBrace => self.parse_block().map(Stmt::Block),
            TokenKind::Else => {
                self.error_with_suggestion(
                    ErrorCode::UNEXPECTED_TOKEN,
                    "unexpected 'else'",
                    self.current_span(),
                    "put 'else' on the same line as the closing '}'",
                );
                None
            }
            TokenKind::Reserved(word) => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("'{word}' is not supported in rules"),
                );
                None
            }
            _ => self.parse_simple_stmt(),
        }?;
        self.expect_terminator();
        Some(stmt)
    }

    /// `SimpleStmt = ExprList ("=" | ":=") ExprList | Expr op= Expr | Expr ("++" | "--") | Expr`
    ///
    /// Does not consume a terminator, so it can be reused in `if`/`for` headers.
    pub(crate) fn parse_simple_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        let first = self.parse_expression()?;

        let mut targets = vec![first];
        while self.eat(&TokenKind::Comma) {
            targets.push(self.parse_expression()?);
        }

        let op = match self.peek_kind() {
            TokenKind::Eq => AssignOp::Assign,
            TokenKind::ColonEq => AssignOp::Define,
            TokenKind::PlusEq => AssignOp::Add,
            TokenKind::MinusEq => AssignOp::Sub,
            TokenKind::StarEq => AssignOp::Mul,
            TokenKind::SlashEq => AssignOp::Div,
            TokenKind::PlusPlus | TokenKind::MinusMinus if targets.len() == 1 => {
                let op = if self.check_exact(&TokenKind::PlusPlus) {
                    IncDecOp::Inc
                } else {
                    IncDecOp::Dec
                };
                self.advance();
                let span = start.merge(self.previous_span());
                let target = targets.pop()?;
                return Some(Stmt::IncDec(IncDecStmt { target, op, span }));
            }
            _ if targets.len() == 1 => {
                let expr = targets.pop()?;
                let span = expr.span;
                return Some(Stmt::Expr(ExprStmt { expr, span }));
            }
            other => {
                let message = format!("expected '=' or ':=' after expression list, got '{other}'");
                self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, message);
                return None;
            }
        };
        let op_span = self.advance();

        if op.binary_op().is_some() && targets.len() > 1 {
            self.error_at(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("'{}' takes a single target", op.as_str()),
                op_span,
            );
            return None;
        }
        if op == AssignOp::Define {
            for target in &targets {
                if !matches!(target.kind, ExprKind::Identifier(_)) {
                    self.error_at(
                        ErrorCode::UNEXPECTED_TOKEN,
                        "non-name on left side of ':='",
                        target.span,
                    );
                    return None;
                }
            }
        }

        let mut values = vec![self.parse_expression()?];
        while self.eat(&TokenKind::Comma) {
            values.push(self.parse_expression()?);
        }

        let span = start.merge(self.previous_span());
        Some(Stmt::Assign(AssignStmt {
            targets,
            op,
            values,
            span,
        }))
    }

    /// `if [init;] cond { ... } [else (if ... | { ... })]`
    pub(crate) fn parse_if_stmt(&mut self) -> Option<IfStmt> {
        let start = self.advance(); // eat `if`

        let header = self.parse_simple_stmt()?;
        let (init, condition) = if self.eat(&TokenKind::Semicolon) {
            (Some(Box::new(header)), self.parse_expression()?)
        } else {
            (None, self.stmt_into_condition(header)?)
        };

        let then_block = self.parse_block()?;

        let else_branch = if self.eat(&TokenKind::Else) {
            if self.check_exact(&TokenKind::If) {
                Some(ElseBranch::ElseIf(Box::new(self.parse_if_stmt()?)))
            } else {
                Some(ElseBranch::Block(self.parse_block()?))
            }
        } else {
            None
        };

        let span = start.merge(self.previous_span());
        Some(IfStmt {
            init,
            condition,
            then_block,
            else_branch,
            span,
        })
    }

    /// `for { ... }`, `for cond { ... }` or `for [init]; [cond]; [post] { ... }`
    pub(crate) fn parse_for_stmt(&mut self) -> Option<ForStmt> {
        let start = self.advance(); // eat `for`

        let (init, condition, post) = if self.check_exact(&TokenKind::LBrace) {
            (None, None, None)
        } else {
            let header = if self.check_exact(&TokenKind::Semicolon) {
                None
            } else {
                Some(self.parse_simple_stmt()?)
            };

            if self.eat(&TokenKind::Semicolon) {
                let condition = if self.check_exact(&TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect(&TokenKind::Semicolon)?;
                let post = if self.check_exact(&TokenKind::LBrace) {
                    None
                } else {
                    Some(Box::new(self.parse_simple_stmt()?))
                };
                (header.map(Box::new), condition, post)
            } else {
                let header = header?;
                (None, Some(self.stmt_into_condition(header)?), None)
            }
        };

        let body = self.parse_block()?;
        let span = start.merge(self.previous_span());
        Some(ForStmt {
            init,
            condition,
            post,
            body,
            span,
        })
    }

    /// A header statement used as a condition must be a bare expression.
    fn stmt_into_condition(&mut self, stmt: Stmt) -> Option<Expr> {
        match stmt {
            Stmt::Expr(expr_stmt) => Some(expr_stmt.expr),
            other => {
                self.error_at(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected condition expression, found {}", other.node_name()),
                    other.span(),
                );
                None
            }
        }
    }

    /// `break` / `continue`
    fn parse_branch_stmt(&mut self, kind: BranchKind) -> Stmt {
        let span = self.advance();
        Stmt::Branch(BranchStmt { kind, span })
    }

    /// `return [ExprList]`
    fn parse_return_stmt(&mut self) -> Option<Stmt> {
        let start = self.advance(); // eat `return`
        let mut values = Vec::new();
        if !self.at_terminator() && !self.check_exact(&TokenKind::RBrace) && !self.at_end() {
            values.push(self.parse_expression()?);
            while self.eat(&TokenKind::Comma) {
                values.push(self.parse_expression()?);
            }
        }
        let span = start.merge(self.previous_span());
        Some(Stmt::Return(ReturnStmt { values, span }))
    }
}
