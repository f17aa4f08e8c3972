//! Core rule lexer: converts rule text to a token stream.
//!
//! Features:
//! - Identifiers, reserved words, operators and punctuation of the rule language
//! - Decimal and hexadecimal integers, floats with fraction and/or exponent
//! - Interpreted (`"..."`) and raw (`` `...` ``) string literals
//! - `//` and `/* */` comments
//! - Automatic semicolon insertion: a line break after a token that can end a
//!   statement becomes a [`TokenKind::Newline`]; other line breaks are dropped
//! - Error recovery: collects up to 20 errors instead of stopping at the first

use geval_types::{ErrorCode, ParseError, ParseErrors, SourceFile, Span};

use crate::token::{Token, TokenKind};

/// The rule lexer.
///
/// Converts source text into a vector of [`Token`]s, collecting up to
/// [`geval_types::MAX_ERRORS`] errors along the way.
pub struct Lexer<'src> {
    /// The full source text as bytes.
    source: &'src [u8],
    /// The same text as `str`, for slicing lexemes.
    text: &'src str,
    /// Source file for error reporting.
    source_file: &'src SourceFile,
    /// Rule name (for errors).
    file_name: &'src str,
    /// Current byte offset into `source`.
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based).
    col: u32,
    /// Collected errors.
    errors: ParseErrors,
    /// Set when the previous token can end a statement.
    insert_semi: bool,
}

/// Result of lexing: tokens + any errors collected.
pub struct LexResult {
    /// The token stream (always ends with [`TokenKind::Eof`]).
    pub tokens: Vec<Token>,
    /// Errors encountered during lexing.
    pub errors: ParseErrors,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source file.
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            source: source_file.source.as_bytes(),
            text: &source_file.source,
            source_file,
            file_name: &source_file.name,
            pos: 0,
            line: 1,
            col: 1,
            errors: ParseErrors::empty(),
            insert_semi: false,
        }
    }

    /// Lex the entire source file into a token stream.
    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();

        loop {
            if self.errors.is_full() {
                break;
            }

            let token = self.next_token();
            self.insert_semi = token.kind.ends_statement();

            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);

            if is_eof {
                break;
            }
        }

        // Ensure token stream always ends with Eof
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            tokens.push(Token::new(TokenKind::Eof, self.current_span()));
        }

        LexResult {
            tokens,
            errors: self.errors,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else if ch & 0xC0 != 0x80 {
            // UTF-8 continuation bytes do not start a new column
            self.col += 1;
        }
        Some(ch)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(1),
        )
    }

    fn source_line_at(&self, line: u32) -> String {
        self.source_file.line(line).unwrap_or("").to_string()
    }

    fn emit_error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_line_at(span.start_line);
        let err = ParseError::new(self.file_name, code, message, span, source_line);
        self.errors.push_error(err);
    }

    fn emit_error_with_suggestion(
        &mut self,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        suggestion: impl Into<String>,
    ) {
        let source_line = self.source_line_at(span.start_line);
        let err = ParseError::new(self.file_name, code, message, span, source_line)
            .with_suggestion(suggestion);
        self.errors.push_error(err);
    }

    // ─────────────────────────────────────────────────────────────
    // Whitespace & comments
    // ─────────────────────────────────────────────────────────────

    /// Skip spaces, tabs and carriage returns (NOT newlines).
    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\r') = self.peek() {
            self.advance();
        }
    }

    /// Skip a `// ...` comment up to (not including) the line break.
    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == b'\n' {
                break;
            }
            self.advance();
        }
    }

    /// Skip a `/* ... */` comment. Returns `true` if it spanned a line break.
    fn skip_block_comment(&mut self) -> bool {
        let start_line = self.line;
        let start_col = self.col;
        self.advance();
        self.advance();
        loop {
            match self.peek() {
                None => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error_with_suggestion(
                        ErrorCode::UNTERMINATED,
                        "Unterminated block comment",
                        span,
                        "Close the comment with */",
                    );
                    break;
                }
                Some(b'*') if self.peek_at(1) == Some(b'/') => {
                    self.advance();
                    self.advance();
                    break;
                }
                _ => {
                    self.advance();
                }
            }
        }
        self.line != start_line
    }

    // ─────────────────────────────────────────────────────────────
    // Token scanning
    // ─────────────────────────────────────────────────────────────

    /// Scan until a token is produced.
    fn next_token(&mut self) -> Token {
        loop {
            if let Some(token) = self.scan() {
                return token;
            }
        }
    }

    /// Scan one lexeme. Returns `None` for input that produces no token
    /// (comments, insignificant line breaks, rejected characters).
    fn scan(&mut self) -> Option<Token> {
        self.skip_whitespace();

        // If we've hit the error cap, stop immediately
        if self.errors.is_full() || self.at_end() {
            return Some(Token::new(TokenKind::Eof, self.current_span()));
        }

        let start_pos = self.pos;
        let start_line = self.line;
        let start_col = self.col;

        // Comments
        if self.peek() == Some(b'/') {
            match self.peek_at(1) {
                Some(b'/') => {
                    self.skip_line_comment();
                    return None;
                }
                Some(b'*') => {
                    let crossed_line = self.skip_block_comment();
                    if crossed_line && self.insert_semi {
                        return Some(Token::new(
                            TokenKind::Newline,
                            self.span_from(start_line, start_col),
                        ));
                    }
                    return None;
                }
                _ => {}
            }
        }

        let ch = self.advance()?;
        let kind = match ch {
            // ── Line break ──
            b'\n' => {
                if !self.insert_semi {
                    return None;
                }
                TokenKind::Newline
            }

            // ── String literals ──
            b'"' => return Some(self.scan_string(start_line, start_col)),
            b'`' => return Some(self.scan_raw_string(start_line, start_col)),

            // ── Number literals ──
            b'0'..=b'9' => return Some(self.scan_number(start_pos, start_line, start_col)),
            b'.' if matches!(self.peek(), Some(b'0'..=b'9')) => {
                return Some(self.scan_number(start_pos, start_line, start_col))
            }

            // ── Identifiers & keywords ──
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                return Some(self.scan_identifier(start_pos, start_line, start_col))
            }

            // ── Operators ──
            b'+' => self.pick(
                &[(b'+', TokenKind::PlusPlus), (b'=', TokenKind::PlusEq)],
                TokenKind::Plus,
            ),
            b'-' => self.pick(
                &[(b'-', TokenKind::MinusMinus), (b'=', TokenKind::MinusEq)],
                TokenKind::Minus,
            ),
            b'*' => self.pick(&[(b'=', TokenKind::StarEq)], TokenKind::Star),
            b'/' => self.pick(&[(b'=', TokenKind::SlashEq)], TokenKind::Slash),
            b'%' => TokenKind::Percent,
            b'=' => self.pick(&[(b'=', TokenKind::EqEq)], TokenKind::Eq),
            b'!' => self.pick(&[(b'=', TokenKind::BangEq)], TokenKind::Bang),
            b'<' => self.pick(&[(b'=', TokenKind::LessEq)], TokenKind::Less),
            b'>' => self.pick(&[(b'=', TokenKind::GreaterEq)], TokenKind::Greater),

            b'&' if self.peek() == Some(b'&') => {
                self.advance();
                TokenKind::AndAnd
            }
            b'|' if self.peek() == Some(b'|') => {
                self.advance();
                TokenKind::OrOr
            }
            b':' if self.peek() == Some(b'=') => {
                self.advance();
                TokenKind::ColonEq
            }

            // ── Punctuation ──
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b',' => TokenKind::Comma,
            b'.' => TokenKind::Dot,
            b';' => TokenKind::Semicolon,

            _ => {
                // Consume the rest of a multi-byte character
                while matches!(self.peek(), Some(b) if b & 0xC0 == 0x80) {
                    self.advance();
                }
                let lexeme = &self.text[start_pos..self.pos];
                let span = self.span_from(start_line, start_col);
                let message = format!("Unexpected character '{lexeme}'");
                match ch {
                    b'&' => self.emit_error_with_suggestion(
                        ErrorCode::UNEXPECTED_TOKEN,
                        message,
                        span,
                        "Use '&&' for logical and",
                    ),
                    b'|' => self.emit_error_with_suggestion(
                        ErrorCode::UNEXPECTED_TOKEN,
                        message,
                        span,
                        "Use '||' for logical or",
                    ),
                    _ => self.emit_error(ErrorCode::UNEXPECTED_TOKEN, message, span),
                }
                return None;
            }
        };

        Some(Token::new(kind, self.span_from(start_line, start_col)))
    }

    /// Consume one of `options`' follow bytes if present, else yield `single`.
    fn pick(&mut self, options: &[(u8, TokenKind)], single: TokenKind) -> TokenKind {
        for (next, kind) in options {
            if self.peek() == Some(*next) {
                self.advance();
                return kind.clone();
            }
        }
        single
    }

    // ─────────────────────────────────────────────────────────────
    // Number literals
    // ─────────────────────────────────────────────────────────────

    fn scan_number(&mut self, start_pos: usize, start_line: u32, start_col: u32) -> Token {
        // The first character (digit or '.') was already consumed
        if self.source[start_pos] == b'0' && matches!(self.peek(), Some(b'x' | b'X')) {
            self.advance();
            while matches!(self.peek(), Some(b) if b.is_ascii_hexdigit()) {
                self.advance();
            }
            let digits = &self.text[start_pos + 2..self.pos];
            let span = self.span_from(start_line, start_col);
            let value = match i64::from_str_radix(digits, 16) {
                Ok(n) => n,
                Err(_) => {
                    self.emit_error(
                        ErrorCode::INVALID_LITERAL,
                        format!("Invalid hexadecimal literal '{}'", &self.text[start_pos..self.pos]),
                        span,
                    );
                    0
                }
            };
            return Token::new(TokenKind::IntLit(value), span);
        }

        let mut is_float = self.source[start_pos] == b'.';
        self.skip_digits();

        if !is_float && self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            is_float = true;
            self.advance(); // consume '.'
            self.skip_digits();
        }

        if matches!(self.peek(), Some(b'e' | b'E')) {
            let digit_at = match self.peek_at(1) {
                Some(b'+' | b'-') => 2,
                _ => 1,
            };
            if matches!(self.peek_at(digit_at), Some(b'0'..=b'9')) {
                is_float = true;
                for _ in 0..digit_at {
                    self.advance();
                }
                self.skip_digits();
            }
        }

        let span = self.span_from(start_line, start_col);
        let text = &self.text[start_pos..self.pos];

        if is_float {
            match text.parse::<f64>() {
                Ok(value) => Token::new(TokenKind::FloatLit(value), span),
                Err(_) => {
                    self.emit_error(
                        ErrorCode::INVALID_LITERAL,
                        format!("Invalid float literal '{text}'"),
                        span,
                    );
                    Token::new(TokenKind::FloatLit(0.0), span)
                }
            }
        } else {
            match text.parse::<i64>() {
                Ok(value) => Token::new(TokenKind::IntLit(value), span),
                Err(_) => {
                    self.emit_error_with_suggestion(
                        ErrorCode::INVALID_LITERAL,
                        format!("Integer literal '{text}' is out of range"),
                        span,
                        "Integer literals must fit in a signed 64-bit integer",
                    );
                    Token::new(TokenKind::IntLit(0), span)
                }
            }
        }
    }

    fn skip_digits(&mut self) {
        while let Some(b'0'..=b'9') = self.peek() {
            self.advance();
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Identifiers & keywords
    // ─────────────────────────────────────────────────────────────

    fn scan_identifier(&mut self, start_pos: usize, start_line: u32, start_col: u32) -> Token {
        // First character was already consumed (letter or `_`)
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == b'_' {
                self.advance();
            } else {
                break;
            }
        }

        let span = self.span_from(start_line, start_col);
        let text = &self.text[start_pos..self.pos];

        let kind = TokenKind::from_keyword(text)
            .unwrap_or_else(|| TokenKind::Identifier(text.to_string()));

        Token::new(kind, span)
    }

    // ─────────────────────────────────────────────────────────────
    // String literals
    // ─────────────────────────────────────────────────────────────

    /// Scan an interpreted string literal starting after the opening `"`.
    fn scan_string(&mut self, start_line: u32, start_col: u32) -> Token {
        let mut buf: Vec<u8> = Vec::new();

        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error_with_suggestion(
                        ErrorCode::UNTERMINATED,
                        "Unterminated string literal",
                        span,
                        "Use a raw `...` string for text spanning several lines",
                    );
                    break;
                }
                Some(b'"') => {
                    self.advance();
                    break;
                }
                Some(b'\\') => {
                    if let Some(escaped) = self.scan_escape_sequence() {
                        buf.push(escaped);
                    }
                }
                Some(ch) => {
                    self.advance();
                    buf.push(ch);
                }
            }
        }

        let value = String::from_utf8_lossy(&buf).into_owned();
        Token::new(TokenKind::StringLit(value), self.span_from(start_line, start_col))
    }

    /// Scan a raw string literal starting after the opening backtick.
    /// Raw strings may span lines; carriage returns are dropped.
    fn scan_raw_string(&mut self, start_line: u32, start_col: u32) -> Token {
        let mut buf: Vec<u8> = Vec::new();

        loop {
            match self.advance() {
                None => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(
                        ErrorCode::UNTERMINATED,
                        "Unterminated raw string literal",
                        span,
                    );
                    break;
                }
                Some(b'`') => break,
                Some(b'\r') => {}
                Some(ch) => buf.push(ch),
            }
        }

        let value = String::from_utf8_lossy(&buf).into_owned();
        Token::new(TokenKind::StringLit(value), self.span_from(start_line, start_col))
    }

    /// Scan an escape sequence starting at the `\`.
    /// Returns the unescaped byte, or `None` if input ended (error emitted).
    fn scan_escape_sequence(&mut self) -> Option<u8> {
        let start_line = self.line;
        let start_col = self.col;
        self.advance(); // consume the '\'

        match self.peek() {
            Some(b'"') | Some(b'\\') | Some(b'\'') => self.advance(),
            Some(b'n') => self.advance().map(|_| b'\n'),
            Some(b't') => self.advance().map(|_| b'\t'),
            Some(b'r') => self.advance().map(|_| b'\r'),
            Some(b'\n') | None => {
                // Leave the line break for the unterminated-string check
                None
            }
            Some(ch) => {
                self.advance();
                let span = self.span_from(start_line, start_col);
                self.emit_error_with_suggestion(
                    ErrorCode::INVALID_LITERAL,
                    format!("Invalid escape sequence '\\{}'", ch as char),
                    span,
                    "Supported escapes are \\n \\t \\r \\\\ \\\" and \\'",
                );
                Some(ch) // error recovery: emit the char as-is
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
