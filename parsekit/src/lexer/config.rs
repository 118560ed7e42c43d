use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::Tokenizer;

/// Declarative form of a [`Tokenizer`].
///
/// Missing fields take the same defaults as [`Tokenizer::new`].
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    pub ignore_whitespace: bool,
    pub dont_ignore: Vec<char>,
    pub ignore: Vec<String>,
    pub comments: Vec<DelimitedConfig>,
    pub patterns: Vec<PatternConfig>,
    pub strings: Vec<StringConfig>,
    pub escape_codes: Vec<EscapeCodeConfig>,
    pub char_escape_codes: Vec<CharEscapeCodeConfig>,
    pub operators: Vec<String>,
    /// Every character becomes a single-character operator.
    pub char_operators: String,
    pub separate_identifiers_and_punctuation: bool,
    pub end_marker: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct DelimitedConfig {
    pub start: String,
    pub end: String,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct PatternConfig {
    pub pattern: String,
    #[serde(default)]
    pub starts_with: String,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct StringConfig {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub escape: Option<char>,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct EscapeCodeConfig {
    pub code: char,
    pub replacement: String,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct CharEscapeCodeConfig {
    pub code: char,
    pub digits: usize,
    pub radix: u32,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            ignore_whitespace: true,
            dont_ignore: vec![],
            ignore: vec![],
            comments: vec![],
            patterns: vec![],
            strings: vec![],
            escape_codes: vec![],
            char_escape_codes: vec![],
            operators: vec![],
            char_operators: String::new(),
            separate_identifiers_and_punctuation: true,
            end_marker: None,
        }
    }
}

impl Tokenizer {
    pub fn from_config(config: &TokenizerConfig) -> Result<Self, ConfigError> {
        let mut tokenizer = Tokenizer::new();
        tokenizer
            .ignore_whitespace(config.ignore_whitespace)
            .separate_identifiers_and_punctuation(config.separate_identifiers_and_punctuation)
            .add_operators(&config.char_operators);

        for chr in &config.dont_ignore {
            tokenizer.dont_ignore(*chr)?;
        }
        for seq in &config.ignore {
            tokenizer.ignore(seq)?;
        }
        for comment in &config.comments {
            tokenizer.add_comment_rule(&comment.start, &comment.end)?;
        }
        for pattern in &config.patterns {
            tokenizer.add_pattern_rule(&pattern.pattern, &pattern.starts_with)?;
        }
        for string in &config.strings {
            tokenizer.add_string_rule(&string.start, &string.end, string.escape)?;
        }
        for escape in &config.escape_codes {
            tokenizer.add_escape_code(escape.code, &escape.replacement);
        }
        for escape in &config.char_escape_codes {
            tokenizer.add_char_escape_code(escape.code, escape.digits, escape.radix)?;
        }
        for operator in &config.operators {
            tokenizer.add_operator_rule(operator)?;
        }
        if let Some(marker) = &config.end_marker {
            tokenizer.append_on_eof(marker);
        }

        Ok(tokenizer)
    }
}

impl TryFrom<&TokenizerConfig> for Tokenizer {
    type Error = ConfigError;

    fn try_from(config: &TokenizerConfig) -> Result<Self, Self::Error> {
        Self::from_config(config)
    }
}
