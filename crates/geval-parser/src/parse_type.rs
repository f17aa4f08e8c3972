//! Type name parsing for slice literals and `map[K]V` types.

use crate::parser::Parser;
use geval_lexer::token::TokenKind;
use geval_types::ast::*;
use geval_types::ErrorCode;

impl<'src> Parser<'src> {
    /// Parse a single type name. Only plain identifiers name types.
    pub(crate) fn parse_type_name(&mut self) -> Option<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance();
                Some(Ident::new(name, span))
            }
            TokenKind::Reserved(word) => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("'{word}' is not a supported element type"),
                );
                None
            }
            TokenKind::LBracket | TokenKind::Map => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    "nested container types are not supported",
                );
                None
            }
            other => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected type name, got '{other}'"),
                );
                None
            }
        }
    }

    /// `map "[" Type "]" Type`
    pub(crate) fn parse_map_type(&mut self) -> Option<Expr> {
        let start = self.advance(); // eat `map`
        let open = self.expect(&TokenKind::LBracket)?;
        let key = self.parse_type_name()?;
        self.expect_closing(&TokenKind::RBracket, open)?;
        let value = self.parse_type_name()?;
        let span = start.merge(value.span);
        Some(Expr::new(ExprKind::MapType { key, value }, span))
    }
}
