use std::fmt::{Debug, Display};

use arcstr::ArcStr;

/// Where a token came from: a file (or stream) label and a 1-based line.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file: ArcStr,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<ArcStr>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

impl Debug for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

/// An immutable lexeme.
///
/// Tokens are produced by the [`Tokenizer`](crate::lexer::Tokenizer), or
/// appended by client code to a [`TokenCursor`](crate::cursor::TokenCursor)
/// that is fed incrementally.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Token {
    text: String,
    location: SourceLocation,
}

impl Token {
    pub fn new(text: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            text: text.into(),
            location,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn file(&self) -> &ArcStr {
        &self.location.file
    }

    pub fn line(&self) -> u32 {
        self.location.line
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.text
    }
}
