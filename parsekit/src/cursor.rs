use std::fmt::Display;

use crate::{
    error::{Found, SyntaxError},
    format_utils::Separated,
    token::{SourceLocation, Token},
};

/// A forward-only, mutable-position view over a token sequence.
///
/// This is the substrate every parser in the crate reads from. The position
/// only moves forward, except through [`TokenCursor::reset`], so parsers built
/// on top of it commit to decisions taken on the next token's text.
///
/// Invariant: `0 <= position <= len`.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct TokenCursor {
    tokens: Vec<Token>,
    index: usize,
}

impl TokenCursor {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, index: 0 }
    }

    /// Returns the next token and advances past it.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<&Token, SyntaxError> {
        let token = self
            .tokens
            .get(self.index)
            .ok_or_else(|| self.end_of_input())?;
        self.index += 1;
        Ok(token)
    }

    pub fn next_text(&mut self) -> Result<&str, SyntaxError> {
        self.next().map(Token::text)
    }

    /// Lookahead without advancing. `seek(0)` is the token [`Self::next`] would return.
    pub fn seek(&self, n: usize) -> Result<&Token, SyntaxError> {
        self.index
            .checked_add(n)
            .and_then(|index| self.tokens.get(index))
            .ok_or_else(|| self.end_of_input())
    }

    pub fn seek_text(&self, n: usize) -> Result<&str, SyntaxError> {
        self.seek(n).map(Token::text)
    }

    /// Non-failing form of `seek(0)`.
    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    pub fn peek_text(&self) -> Option<&str> {
        self.peek().map(Token::text)
    }

    pub fn has_next(&self) -> bool {
        self.index < self.tokens.len()
    }

    /// Whether the next token's text is one of `keywords`. False at end of input.
    pub fn is_next<K: AsRef<str>>(&self, keywords: &[K]) -> bool {
        match self.peek_text() {
            Some(text) => keywords.iter().any(|keyword| keyword.as_ref() == text),
            None => false,
        }
    }

    /// Consumes the next token and checks that its text is one of `keywords`.
    ///
    /// The token is consumed even when it is rejected.
    pub fn accept<K: AsRef<str>>(&mut self, keywords: &[K]) -> Result<&Token, SyntaxError> {
        let Some(token) = self.tokens.get(self.index) else {
            return Err(SyntaxError::expected(
                Found::EndOfInput(self.last_location().cloned()),
                keywords,
            ));
        };
        self.index += 1;

        if keywords.iter().any(|keyword| keyword.as_ref() == token.text()) {
            Ok(token)
        } else {
            Err(SyntaxError::expected(Found::Token(token.clone()), keywords))
        }
    }

    /// Advances only if the next token's text is one of `keywords`.
    pub fn accept_if_next<K: AsRef<str>>(&mut self, keywords: &[K]) -> bool {
        if self.is_next(keywords) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    /// Rewinds to the first token.
    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// Extends the sequence, for streams that are fed incrementally.
    pub fn append(&mut self, token: Token) -> &mut Self {
        self.tokens.push(token);
        self
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    pub fn position(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Location of the last token in the sequence, used to place end-of-input errors.
    pub fn last_location(&self) -> Option<&SourceLocation> {
        self.tokens.last().map(Token::location)
    }

    /// An error describing the current position: the next token, or end of input.
    pub fn error_here(&self, message: impl Into<String>) -> SyntaxError {
        match self.peek() {
            Some(token) => SyntaxError::unexpected(token.clone(), message),
            None => SyntaxError::new(Found::EndOfInput(self.last_location().cloned()), message),
        }
    }

    fn end_of_input(&self) -> SyntaxError {
        SyntaxError::end_of_input(self.last_location().cloned())
    }
}

impl From<Vec<Token>> for TokenCursor {
    fn from(tokens: Vec<Token>) -> Self {
        Self::new(tokens)
    }
}

impl FromIterator<Token> for TokenCursor {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Display for TokenCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", Separated(self.tokens.as_slice(), ", "))
    }
}
