#![forbid(unsafe_code)]

//! A parsing toolkit: a configurable [`Tokenizer`], the [`TokenCursor`] every
//! parser reads from, a precedence-climbing [`PrecedenceParser`] and
//! combinator-built [`Grammar`]s that parse with one token of lookahead.

pub mod cursor;
pub mod error;
pub mod format_utils;
pub mod grammar;
pub mod lexer;
pub mod precedence;
pub mod token;

pub use cursor::TokenCursor;
pub use error::{ConfigError, Error, GrammarError, LexError, Result, SyntaxError};
pub use grammar::{AttributeMap, Grammar, GrammarBuilder, Node, NodeId, Rule, StartSet};
pub use lexer::{Tokenizer, TokenizerConfig};
pub use precedence::{Associativity, OperatorRegistry, Operators, PrecedenceParser};
pub use token::{SourceLocation, Token};
