//! Core parser infrastructure: token cursor, error reporting, helpers.

use geval_lexer::token::{Token, TokenKind};
use geval_types::ast::{Block, Ident};
use geval_types::{ErrorCode, ParseError, ParseErrors, SourceFile, Span};

/// The rule parser.
///
/// Consumes a token stream produced by the lexer and builds a [`Block`]
/// holding the rule's statements. Collects errors and attempts recovery
/// when possible.
pub struct Parser<'src> {
    /// The token stream.
    tokens: Vec<Token>,
    /// Current index into `tokens`.
    pos: usize,
    /// Source file for error context.
    source_file: &'src SourceFile,
    /// Rule name for error messages.
    file_name: String,
    /// Collected errors.
    errors: ParseErrors,
    /// Current expression nesting depth.
    pub(crate) expr_depth: u32,
}

/// Result of parsing.
#[derive(Debug)]
pub struct ParseResult {
    /// The rule body. `None` when parsing could not produce a tree.
    pub block: Option<Block>,
    pub errors: ParseErrors,
}

impl ParseResult {
    /// Returns the block when there were no errors.
    pub fn into_result(self) -> Result<Block, ParseErrors> {
        match self.block {
            Some(block) if !self.errors.has_errors() => Ok(block),
            _ => Err(self.errors),
        }
    }
}

impl<'src> Parser<'src> {
    /// Create a new parser from a token stream and source file.
    pub fn new(tokens: Vec<Token>, source_file: &'src SourceFile) -> Self {
        Self {
            tokens,
            pos: 0,
            file_name: source_file.name.clone(),
            source_file,
            errors: ParseErrors::empty(),
            expr_depth: 0,
        }
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    /// Returns the current token without advancing.
    pub(crate) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).or_else(|| self.tokens.last())
    }

    /// Returns the kind of the current token.
    pub(crate) fn peek_kind(&self) -> &TokenKind {
        self.peek().map(|t| &t.kind).unwrap_or(&TokenKind::Eof)
    }

    /// Advance the cursor by one and return the consumed token's span.
    pub(crate) fn advance(&mut self) -> Span {
        let span = self.current_span();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        span
    }

    /// Returns the previously consumed token's span.
    pub(crate) fn previous_span(&self) -> Span {
        match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(token) => token.span,
            None => Span::point(1, 1),
        }
    }

    /// Returns the span of the current token.
    pub(crate) fn current_span(&self) -> Span {
        self.peek().map(|t| t.span).unwrap_or_else(|| Span::point(1, 1))
    }

    /// Current cursor position, used to detect stalled recovery.
    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    /// Returns `true` if the current token is `Eof`.
    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    /// Check if the current token matches the given kind exactly.
    pub(crate) fn check_exact(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// If the current token matches, advance and return `true`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check_exact(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Look ahead by `n` tokens from current position.
    pub(crate) fn look_ahead(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    // ── Terminators ───────────────────────────────────────────────────────────

    /// Returns `true` on `;` or an implicit semicolon.
    pub(crate) fn at_terminator(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Semicolon | TokenKind::Newline)
    }

    /// Skip all consecutive terminators.
    pub(crate) fn skip_terminators(&mut self) {
        while self.at_terminator() {
            self.advance();
        }
    }

    /// Skip line breaks inside a bracketed list.
    pub(crate) fn skip_newlines(&mut self) {
        while self.check_exact(&TokenKind::Newline) {
            self.advance();
        }
    }

    /// Expect the end of a statement: `;`, a line break, a closing `}` or
    /// end of input. Reports an error otherwise.
    pub(crate) fn expect_terminator(&mut self) {
        match self.peek_kind() {
            TokenKind::Semicolon | TokenKind::Newline => {
                self.advance();
            }
            TokenKind::RBrace | TokenKind::Eof => {}
            other => {
                let message = format!("expected ';' or newline after statement, got '{other}'");
                self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, message);
            }
        }
    }

    // ── Expect Helpers ────────────────────────────────────────────────────────

    /// Expect a specific token kind. Returns its span if matched, or emits an error.
    pub(crate) fn expect(&mut self, expected: &TokenKind) -> Option<Span> {
        if self.check_exact(expected) {
            Some(self.advance())
        } else {
            let message = format!("expected '{}', got '{}'", expected, self.peek_kind());
            self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, message);
            None
        }
    }

    /// Expect the closing delimiter for an opener at `open_span`.
    ///
    /// Running out of input reports [`ErrorCode::UNCLOSED_DELIMITER`]
    /// pointing at the opener.
    pub(crate) fn expect_closing(&mut self, closing: &TokenKind, open_span: Span) -> Option<Span> {
        if self.check_exact(closing) {
            return Some(self.advance());
        }
        if self.at_end() {
            self.error_at(
                ErrorCode::UNCLOSED_DELIMITER,
                format!("unclosed delimiter: expected '{closing}' before end of input"),
                open_span,
            );
            None
        } else {
            self.expect(closing)
        }
    }

    /// Expect an identifier token.
    pub(crate) fn expect_identifier(&mut self) -> Option<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance();
                Some(Ident::new(name, span))
            }
            other => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected identifier, got '{other}'"),
                );
                None
            }
        }
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    /// Report an error at the current token position.
    pub(crate) fn error_at_current(&mut self, code: ErrorCode, message: impl Into<String>) {
        let span = self.current_span();
        self.error_at(code, message, span);
    }

    /// Report an error at a specific span.
    pub(crate) fn error_at(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let error = self.make_error(code, message, span);
        self.errors.push_error(error);
    }

    /// Report an error with a fix suggestion.
    pub(crate) fn error_with_suggestion(
        &mut self,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        suggestion: impl Into<String>,
    ) {
        let error = self.make_error(code, message, span).with_suggestion(suggestion);
        self.errors.push_error(error);
    }

    fn make_error(&self, code: ErrorCode, message: impl Into<String>, span: Span) -> ParseError {
        let source_line = self
            .source_file
            .line(span.start_line)
            .unwrap_or("")
            .to_string();
        ParseError::new(&self.file_name, code, message, span, source_line)
    }

    /// Returns `true` if we've hit the error limit and should stop.
    pub(crate) fn too_many_errors(&self) -> bool {
        self.errors.is_full()
    }

    // ── Synchronization ───────────────────────────────────────────────────────

    /// Skip tokens until we reach a synchronization point.
    /// Used after an error to resume at a known-good position.
    pub(crate) fn synchronize(&mut self) {
        while !self.at_end() {
            // A terminator ends the broken statement
            if self.at_terminator() {
                self.skip_terminators();
                return;
            }
            // Stop at statement keywords and block ends
            match self.peek_kind() {
                TokenKind::If
                | TokenKind::For
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Return
                | TokenKind::RBrace => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ── Public API ────────────────────────────────────────────────────────────

    /// Parse the token stream as a rule body: a statement list without
    /// surrounding braces.
    pub fn parse(mut self) -> ParseResult {
        let block = self.parse_rule_body();
        ParseResult {
            block,
            errors: self.errors,
        }
    }
}
