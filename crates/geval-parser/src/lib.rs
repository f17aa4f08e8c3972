//! geval parser: converts a token stream into a rule AST.

mod parse_expr;
mod parse_stmt;
mod parse_type;
mod parser;

pub use parser::{ParseResult, Parser};

use geval_lexer::Lexer;
use geval_types::SourceFile;

/// Lex and parse a rule body.
///
/// Lexing errors stop the pipeline before parsing, so a result with
/// lexer errors never carries a block.
pub fn parse_rule(source: &SourceFile) -> ParseResult {
    let lexed = Lexer::new(source).lex();
    if lexed.errors.has_errors() {
        return ParseResult {
            block: None,
            errors: lexed.errors,
        };
    }
    Parser::new(lexed.tokens, source).parse()
}
