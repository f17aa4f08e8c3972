//! Lexer tests.
//!
//! Covers: keywords and reserved words, operators, integer/float/string
//! literals, comments, automatic semicolon insertion, spans, error
//! recovery and the error cap.

use geval_lexer::{Lexer, TokenKind};
use geval_types::{ErrorCode, SourceFile, MAX_ERRORS};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

/// Lex source text and return just the token kinds (excluding final Eof).
fn kinds(source: &str) -> Vec<TokenKind> {
    let sf = SourceFile::new("rule", source);
    let result = Lexer::new(&sf).lex();
    result
        .tokens
        .into_iter()
        .filter(|t| t.kind != TokenKind::Eof)
        .map(|t| t.kind)
        .collect()
}

/// Lex and return the error count.
fn error_count(source: &str) -> usize {
    let sf = SourceFile::new("rule", source);
    Lexer::new(&sf).lex().errors.total_errors
}

/// Lex and return the first error's code and message.
fn first_error(source: &str) -> (ErrorCode, String) {
    let sf = SourceFile::new("rule", source);
    let result = Lexer::new(&sf).lex();
    let err = result
        .errors
        .errors
        .first()
        .cloned()
        .expect("expected a lex error");
    (err.code, err.message)
}

fn ident(name: &str) -> TokenKind {
    TokenKind::Identifier(name.to_string())
}

// ─────────────────────────────────────────────────────────────────────
// Keywords & identifiers
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_statement_keywords() {
    let pairs = [
        ("if", TokenKind::If),
        ("else", TokenKind::Else),
        ("for", TokenKind::For),
        ("map", TokenKind::Map),
    ];
    for (src, expected) in &pairs {
        assert_eq!(kinds(src), vec![expected.clone()], "keyword '{src}'");
    }
}

#[test]
fn test_reserved_words_lex_as_reserved() {
    assert_eq!(kinds("switch"), vec![TokenKind::Reserved("switch".into())]);
    assert_eq!(kinds("func"), vec![TokenKind::Reserved("func".into())]);
}

#[test]
fn test_identifiers() {
    assert_eq!(
        kinds("a _tmp Value2 true nil"),
        vec![ident("a"), ident("_tmp"), ident("Value2"), ident("true"), ident("nil")]
    );
}

#[test]
fn test_keyword_prefix_is_identifier() {
    assert_eq!(kinds("iffy"), vec![ident("iffy")]);
    assert_eq!(kinds("format"), vec![ident("format")]);
}

// ─────────────────────────────────────────────────────────────────────
// Operators & punctuation
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_arithmetic_operators() {
    assert_eq!(
        kinds("+ - * / %"),
        vec![
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Star,
            TokenKind::Slash,
            TokenKind::Percent,
        ]
    );
}

#[test]
fn test_comparison_and_logical_operators() {
    assert_eq!(
        kinds("== != < > <= >= && || !"),
        vec![
            TokenKind::EqEq,
            TokenKind::BangEq,
            TokenKind::Less,
            TokenKind::Greater,
            TokenKind::LessEq,
            TokenKind::GreaterEq,
            TokenKind::AndAnd,
            TokenKind::OrOr,
            TokenKind::Bang,
        ]
    );
}

#[test]
fn test_assignment_operators() {
    assert_eq!(
        kinds("= := += -= *= /="),
        vec![
            TokenKind::Eq,
            TokenKind::ColonEq,
            TokenKind::PlusEq,
            TokenKind::MinusEq,
            TokenKind::StarEq,
            TokenKind::SlashEq,
        ]
    );
}

#[test]
fn test_punctuation() {
    assert_eq!(
        kinds("( ) [ ] { } , ; ."),
        vec![
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::LBracket,
            TokenKind::RBracket,
            TokenKind::LBrace,
            TokenKind::RBrace,
            TokenKind::Comma,
            TokenKind::Semicolon,
            TokenKind::Dot,
        ]
    );
}

#[test]
fn test_operators_without_spaces() {
    assert_eq!(
        kinds("a+=b*-c"),
        vec![
            ident("a"),
            TokenKind::PlusEq,
            ident("b"),
            TokenKind::Star,
            TokenKind::Minus,
            ident("c"),
        ]
    );
}

#[test]
fn test_increment_statement() {
    assert_eq!(
        kinds("d[\"c\"]++"),
        vec![
            ident("d"),
            TokenKind::LBracket,
            TokenKind::StringLit("c".into()),
            TokenKind::RBracket,
            TokenKind::PlusPlus,
        ]
    );
}

// ─────────────────────────────────────────────────────────────────────
// Number literals
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_integer_literals() {
    assert_eq!(
        kinds("0 42 0x1F 0XfF"),
        vec![
            TokenKind::IntLit(0),
            TokenKind::IntLit(42),
            TokenKind::IntLit(31),
            TokenKind::IntLit(255),
        ]
    );
}

#[test]
fn test_float_literals() {
    assert_eq!(
        kinds("1.9 .5 1e3 2.5E-1"),
        vec![
            TokenKind::FloatLit(1.9),
            TokenKind::FloatLit(0.5),
            TokenKind::FloatLit(1000.0),
            TokenKind::FloatLit(0.25),
        ]
    );
}

#[test]
fn test_number_followed_by_selector_dot() {
    // `1.` without a digit is the integer followed by a dot
    assert_eq!(kinds("1.x"), vec![TokenKind::IntLit(1), TokenKind::Dot, ident("x")]);
}

#[test]
fn test_integer_overflow_is_invalid_literal() {
    let (code, msg) = first_error("99999999999999999999");
    assert_eq!(code, ErrorCode::INVALID_LITERAL);
    assert!(msg.contains("out of range"), "got: {msg}");
}

#[test]
fn test_empty_hex_is_invalid_literal() {
    let (code, _) = first_error("0x");
    assert_eq!(code, ErrorCode::INVALID_LITERAL);
}

// ─────────────────────────────────────────────────────────────────────
// String literals
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_string_literal() {
    assert_eq!(
        kinds("\"Hello world\""),
        vec![TokenKind::StringLit("Hello world".into())]
    );
}

#[test]
fn test_string_escapes() {
    assert_eq!(
        kinds(r#""a\n\t\"b\\'""#),
        vec![TokenKind::StringLit("a\n\t\"b\\'".into())]
    );
}

#[test]
fn test_raw_string_keeps_backslashes_and_newlines() {
    assert_eq!(
        kinds("`C:\\dir\nnext`"),
        vec![TokenKind::StringLit("C:\\dir\nnext".into())]
    );
}

#[test]
fn test_unicode_string() {
    assert_eq!(kinds("\"héllo ✓\""), vec![TokenKind::StringLit("héllo ✓".into())]);
}

#[test]
fn test_unterminated_string() {
    let (code, msg) = first_error("a = \"oops\nb = 1");
    assert_eq!(code, ErrorCode::UNTERMINATED);
    assert!(msg.contains("Unterminated string"));
}

#[test]
fn test_unterminated_raw_string() {
    let (code, _) = first_error("`never closed");
    assert_eq!(code, ErrorCode::UNTERMINATED);
}

#[test]
fn test_invalid_escape() {
    let (code, msg) = first_error(r#""\q""#);
    assert_eq!(code, ErrorCode::INVALID_LITERAL);
    assert!(msg.contains("\\q"));
}

// ─────────────────────────────────────────────────────────────────────
// Comments
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_line_comment_keeps_statement_break() {
    assert_eq!(
        kinds("a = 1 // set a\nb = 2"),
        vec![
            ident("a"),
            TokenKind::Eq,
            TokenKind::IntLit(1),
            TokenKind::Newline,
            ident("b"),
            TokenKind::Eq,
            TokenKind::IntLit(2),
        ]
    );
}

#[test]
fn test_inline_block_comment() {
    assert_eq!(
        kinds("a /* note */ = 1"),
        vec![ident("a"), TokenKind::Eq, TokenKind::IntLit(1)]
    );
}

#[test]
fn test_unterminated_block_comment() {
    let (code, _) = first_error("a = 1 /* open");
    assert_eq!(code, ErrorCode::UNTERMINATED);
}

// ─────────────────────────────────────────────────────────────────────
// Semicolon insertion
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_newline_after_value_ends_statement() {
    assert_eq!(
        kinds("a = 1\nb = c"),
        vec![
            ident("a"),
            TokenKind::Eq,
            TokenKind::IntLit(1),
            TokenKind::Newline,
            ident("b"),
            TokenKind::Eq,
            ident("c"),
        ]
    );
}

#[test]
fn test_newline_after_open_brace_is_dropped() {
    assert_eq!(
        kinds("if a {\n}"),
        vec![TokenKind::If, ident("a"), TokenKind::LBrace, TokenKind::RBrace]
    );
}

#[test]
fn test_newline_after_operator_continues_expression() {
    assert_eq!(
        kinds("a = 1 +\n2"),
        vec![
            ident("a"),
            TokenKind::Eq,
            TokenKind::IntLit(1),
            TokenKind::Plus,
            TokenKind::IntLit(2),
        ]
    );
}

#[test]
fn test_newline_after_keyword_statements() {
    assert_eq!(
        kinds("break\ncontinue\nreturn\n"),
        vec![
            TokenKind::Break,
            TokenKind::Newline,
            TokenKind::Continue,
            TokenKind::Newline,
            TokenKind::Return,
            TokenKind::Newline,
        ]
    );
}

#[test]
fn test_blank_lines_collapse() {
    assert_eq!(
        kinds("a++\n\n\n\nb--\n"),
        vec![
            ident("a"),
            TokenKind::PlusPlus,
            TokenKind::Newline,
            ident("b"),
            TokenKind::MinusMinus,
            TokenKind::Newline,
        ]
    );
}

#[test]
fn test_crlf_line_endings() {
    assert_eq!(
        kinds("a = 1\r\nb = 2\r\n"),
        vec![
            ident("a"),
            TokenKind::Eq,
            TokenKind::IntLit(1),
            TokenKind::Newline,
            ident("b"),
            TokenKind::Eq,
            TokenKind::IntLit(2),
            TokenKind::Newline,
        ]
    );
}

// ─────────────────────────────────────────────────────────────────────
// Spans
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_token_spans() {
    let sf = SourceFile::new("rule", "a = 10\n  bb := 2");
    let tokens = Lexer::new(&sf).lex().tokens;
    // a
    assert_eq!((tokens[0].span.start_line, tokens[0].span.start_col), (1, 1));
    // 10
    assert_eq!((tokens[2].span.start_col, tokens[2].span.end_col), (5, 6));
    // bb on line 2
    assert_eq!(tokens[4].kind, ident("bb"));
    assert_eq!((tokens[4].span.start_line, tokens[4].span.start_col), (2, 3));
}

// ─────────────────────────────────────────────────────────────────────
// Error recovery
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_unexpected_character_is_skipped() {
    let sf = SourceFile::new("rule", "a = 1 @ 2");
    let result = Lexer::new(&sf).lex();
    assert_eq!(result.errors.total_errors, 1);
    let err = &result.errors.errors[0];
    assert_eq!(err.code, ErrorCode::UNEXPECTED_TOKEN);
    assert_eq!(err.message, "Unexpected character '@'");
    assert_eq!(err.source_line, "a = 1 @ 2");
    let kinds: Vec<_> = result.tokens.into_iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ident("a"),
            TokenKind::Eq,
            TokenKind::IntLit(1),
            TokenKind::IntLit(2),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_single_ampersand_suggests_and() {
    let sf = SourceFile::new("rule", "a & b");
    let result = Lexer::new(&sf).lex();
    let err = &result.errors.errors[0];
    assert_eq!(err.suggestion.as_deref(), Some("Use '&&' for logical and"));
}

#[test]
fn test_multiple_errors_collected() {
    assert_eq!(error_count("@ # $"), 3);
}

#[test]
fn test_error_cap() {
    let src = "@".repeat(50);
    let sf = SourceFile::new("rule", &src);
    let result = Lexer::new(&sf).lex();
    assert_eq!(result.errors.errors.len(), MAX_ERRORS);
    assert_eq!(result.tokens.last().map(|t| t.kind.clone()), Some(TokenKind::Eof));
}

#[test]
fn test_lexing_is_deterministic() {
    let src = "for i := 0; i < 10; i++ {\n  d[\"k\"] += 1.5\n}\n";
    let sf = SourceFile::new("rule", src);
    let first = Lexer::new(&sf).lex().tokens;
    for _ in 0..50 {
        assert_eq!(Lexer::new(&sf).lex().tokens, first);
    }
}
