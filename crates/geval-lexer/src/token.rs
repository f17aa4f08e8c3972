//! Token types for the geval lexer.
//!
//! Defines [`TokenKind`] covering every lexeme of the rule language and
//! [`Token`], which pairs a kind with a source [`Span`].

use geval_types::Span;
use std::fmt;

/// Every reserved word. The supported statement keywords come first; the
/// rest are reserved so that rules using them get a targeted parse error.
pub const ALL_KEYWORDS: &[&str] = &[
    // Supported (7)
    "if", "else", "for", "break", "continue", "return", "map",
    // Reserved, not supported in rules (18)
    "func", "switch", "case", "default", "select", "go", "defer", "goto",
    "fallthrough", "range", "var", "const", "type", "struct", "interface",
    "chan", "package", "import",
];

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

/// A single token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns `true` if this token is a reserved keyword.
    pub fn is_keyword(&self) -> bool {
        self.kind.is_keyword()
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

/// Every token kind in the rule language.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────

    /// Integer literal: `42`, `0x2A`
    IntLit(i64),
    /// Floating-point literal: `3.14`, `1e3`, `.5`
    FloatLit(f64),
    /// String literal, interpreted or raw: `"hi\n"`, `` `C:\dir` ``
    StringLit(String),

    // ── Identifiers ──────────────────────────────────────────

    /// Identifier, including `true`, `false` and `nil`.
    Identifier(String),

    // ── Keywords ─────────────────────────────────────────────

    /// `if`
    If,
    /// `else`
    Else,
    /// `for`
    For,
    /// `break`
    Break,
    /// `continue`
    Continue,
    /// `return`
    Return,
    /// `map`
    Map,
    /// A reserved word the rule language does not support (`switch`, `func`, ...).
    Reserved(String),

    // ── Operators ────────────────────────────────────────────

    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `==`
    EqEq,
    /// `!=`
    BangEq,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `<=`
    LessEq,
    /// `>=`
    GreaterEq,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `!`
    Bang,
    /// `=`
    Eq,
    /// `:=`
    ColonEq,
    /// `+=`
    PlusEq,
    /// `-=`
    MinusEq,
    /// `*=`
    StarEq,
    /// `/=`
    SlashEq,
    /// `++`
    PlusPlus,
    /// `--`
    MinusMinus,

    // ── Punctuation ──────────────────────────────────────────

    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `;` written in the source
    Semicolon,

    // ── Special ──────────────────────────────────────────────

    /// A line break that terminates a statement (implicit `;`).
    Newline,
    /// End of input
    Eof,
}

impl TokenKind {
    /// Look up a reserved word. Returns `None` for user identifiers.
    pub fn from_keyword(s: &str) -> Option<TokenKind> {
        Some(match s {
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "return" => TokenKind::Return,
            "map" => TokenKind::Map,
            _ if ALL_KEYWORDS.contains(&s) => TokenKind::Reserved(s.to_string()),
            _ => return None,
        })
    }

    /// Returns `true` for every reserved word, supported or not.
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::If
                | TokenKind::Else
                | TokenKind::For
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Return
                | TokenKind::Map
                | TokenKind::Reserved(_)
        )
    }

    /// Whether a line break right after this token ends the statement.
    pub fn ends_statement(&self) -> bool {
        matches!(
            self,
            TokenKind::Identifier(_)
                | TokenKind::IntLit(_)
                | TokenKind::FloatLit(_)
                | TokenKind::StringLit(_)
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Return
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::PlusPlus
                | TokenKind::MinusMinus
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Literals
            TokenKind::IntLit(n) => write!(f, "{n}"),
            TokenKind::FloatLit(n) => write!(f, "{n}"),
            TokenKind::StringLit(s) => write!(f, "{s:?}"),
            TokenKind::Identifier(s) => f.write_str(s),
            // Keywords
            TokenKind::If => f.write_str("if"),
            TokenKind::Else => f.write_str("else"),
            TokenKind::For => f.write_str("for"),
            TokenKind::Break => f.write_str("break"),
            TokenKind::Continue => f.write_str("continue"),
            TokenKind::Return => f.write_str("return"),
            TokenKind::Map => f.write_str("map"),
            TokenKind::Reserved(s) => f.write_str(s),
            // Operators
            TokenKind::Plus => f.write_str("+"),
            TokenKind::Minus => f.write_str("-"),
            TokenKind::Star => f.write_str("*"),
            TokenKind::Slash => f.write_str("/"),
            TokenKind::Percent => f.write_str("%"),
            TokenKind::EqEq => f.write_str("=="),
            TokenKind::BangEq => f.write_str("!="),
            TokenKind::Less => f.write_str("<"),
            TokenKind::Greater => f.write_str(">"),
            TokenKind::LessEq => f.write_str("<="),
            TokenKind::GreaterEq => f.write_str(">="),
            TokenKind::AndAnd => f.write_str("&&"),
            TokenKind::OrOr => f.write_str("||"),
            TokenKind::Bang => f.write_str("!"),
            TokenKind::Eq => f.write_str("="),
            TokenKind::ColonEq => f.write_str(":="),
            TokenKind::PlusEq => f.write_str("+="),
            TokenKind::MinusEq => f.write_str("-="),
            TokenKind::StarEq => f.write_str("*="),
            TokenKind::SlashEq => f.write_str("/="),
            TokenKind::PlusPlus => f.write_str("++"),
            TokenKind::MinusMinus => f.write_str("--"),
            // Punctuation
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
            TokenKind::LBrace => f.write_str("{"),
            TokenKind::RBrace => f.write_str("}"),
            TokenKind::LBracket => f.write_str("["),
            TokenKind::RBracket => f.write_str("]"),
            TokenKind::Comma => f.write_str(","),
            TokenKind::Dot => f.write_str("."),
            TokenKind::Semicolon => f.write_str(";"),
            // Special
            TokenKind::Newline => f.write_str("newline"),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_keywords_count() {
        assert_eq!(ALL_KEYWORDS.len(), 25);
    }

    #[test]
    fn test_from_keyword_recognises_all() {
        for &kw in ALL_KEYWORDS {
            let kind = TokenKind::from_keyword(kw);
            assert!(kind.is_some(), "from_keyword should recognise '{kw}'");
            assert!(kind.unwrap().is_keyword());
        }
    }

    #[test]
    fn test_truth_literals_are_identifiers() {
        for name in ["true", "false", "nil", "len", "make", "int", "string"] {
            assert!(
                TokenKind::from_keyword(name).is_none(),
                "'{name}' must lex as an identifier"
            );
        }
    }

    #[test]
    fn test_unsupported_keywords_are_reserved() {
        assert_eq!(
            TokenKind::from_keyword("switch"),
            Some(TokenKind::Reserved("switch".into()))
        );
        assert_eq!(TokenKind::from_keyword("for"), Some(TokenKind::For));
    }

    #[test]
    fn test_ends_statement() {
        assert!(TokenKind::Identifier("a".into()).ends_statement());
        assert!(TokenKind::RBrace.ends_statement());
        assert!(TokenKind::PlusPlus.ends_statement());
        assert!(!TokenKind::Plus.ends_statement());
        assert!(!TokenKind::LBrace.ends_statement());
        assert!(!TokenKind::Comma.ends_statement());
    }

    #[test]
    fn test_display_roundtrip_keywords() {
        for &kw in ALL_KEYWORDS {
            let kind = TokenKind::from_keyword(kw).unwrap();
            assert_eq!(kind.to_string(), kw);
        }
    }

    #[test]
    fn test_display_operators() {
        assert_eq!(TokenKind::ColonEq.to_string(), ":=");
        assert_eq!(TokenKind::AndAnd.to_string(), "&&");
        assert_eq!(TokenKind::MinusMinus.to_string(), "--");
        assert_eq!(TokenKind::Newline.to_string(), "newline");
        assert_eq!(TokenKind::StringLit("a\"b".into()).to_string(), "\"a\\\"b\"");
    }
}
