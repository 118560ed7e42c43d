use std::fmt::Display;

use thiserror::Error;

use crate::{
    format_utils::{Expected, Quoted},
    token::{SourceLocation, Token},
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Any failure surfaced while tokenizing or parsing.
///
/// None of these are caught or retried inside the crate: the first error
/// aborts the whole operation.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Grammar(#[from] GrammarError),
}

/// Raised by the tokenizer. The whole scan is abandoned, no partial token
/// sequence is returned.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum LexError {
    #[error("Lexical error in {location}: unexpected end of input in the middle of a comment")]
    UnterminatedComment { location: SourceLocation },
    #[error(
        "Lexical error in {location}: unexpected end of input in the middle of a string constant"
    )]
    UnterminatedString { location: SourceLocation },
    #[error("Lexical error in {location}: invalid escape sequence `{sequence}'")]
    InvalidEscape {
        sequence: String,
        location: SourceLocation,
    },
}

impl LexError {
    pub fn location(&self) -> &SourceLocation {
        match self {
            Self::UnterminatedComment { location }
            | Self::UnterminatedString { location }
            | Self::InvalidEscape { location, .. } => location,
        }
    }
}

/// What the parser was looking at when it failed.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Found {
    Token(Token),
    /// The sequence was exhausted. Carries the location of the last token, if any.
    EndOfInput(Option<SourceLocation>),
}

impl Found {
    pub fn token(&self) -> Option<&Token> {
        match self {
            Self::Token(token) => Some(token),
            Self::EndOfInput(_) => None,
        }
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Self::Token(token) => Some(token.location()),
            Self::EndOfInput(location) => location.as_ref(),
        }
    }
}

impl Display for Found {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token(token) => write!(f, "on token {} in {}", Quoted(token), token.location()),
            Self::EndOfInput(Some(location)) => write!(f, "at end of input in {location}"),
            Self::EndOfInput(None) => write!(f, "at end of input"),
        }
    }
}

/// An unexpected token (or end of input) met by the cursor, a precedence
/// parser or a grammar step.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
#[error("Syntax error {found}: {message}")]
pub struct SyntaxError {
    pub found: Found,
    pub message: String,
}

impl SyntaxError {
    pub fn new(found: Found, message: impl Into<String>) -> Self {
        Self {
            found,
            message: message.into(),
        }
    }

    pub fn unexpected(token: Token, message: impl Into<String>) -> Self {
        Self::new(Found::Token(token), message)
    }

    pub fn expected<K: AsRef<str>>(found: Found, keywords: &[K]) -> Self {
        Self::new(found, Expected(keywords).to_string())
    }

    pub fn end_of_input(last: Option<SourceLocation>) -> Self {
        Self::new(Found::EndOfInput(last), "Unexpected end of input")
    }
}

/// Contradictory or malformed tokenizer configuration, raised while the
/// rules are declared rather than during a scan.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum ConfigError {
    #[error("the character {0:?} being ignored is already marked not to be ignored")]
    AlreadyNotIgnored(char),
    #[error("the character {0:?} marked not to be ignored is already marked to be ignored")]
    AlreadyIgnored(char),
    #[error("{0} must not be empty")]
    EmptyRule(&'static str),
    #[error("invalid pattern `{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("invalid character escape code {code:?}: {message}")]
    InvalidCharEscape { code: char, message: &'static str },
}

/// A grammar that cannot be compiled, or a lookup of a node that does not exist.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum GrammarError {
    #[error("node `{0}' is defined more than once")]
    DuplicateNode(String),
    #[error("node `{0}' is referenced but never defined")]
    UndefinedNode(String),
    #[error("node `{0}' has no converter")]
    MissingConverter(String),
    /// `maybe`, `many` and `once_or_more` are entered on a keyword only.
    #[error("node `{0}' has an optional or repeated rule that no keyword can start")]
    NoStartKeywords(String),
}
