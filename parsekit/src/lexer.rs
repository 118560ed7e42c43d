//! The configurable tokenizer.
//!
//! A [`Tokenizer`] is configured once with lexical rules and can then scan any
//! number of sources. At each position the rule families are tried in a fixed
//! priority order: whitespace, ignored sequences, ignored blocks, patterns,
//! string rules, multi-character operators, single-character operators and
//! finally punctuation splitting. Characters that match nothing accumulate
//! into a pending token.

use arcstr::ArcStr;
use fnv::FnvHashSet;
use regex_automata::meta;
use tracing::{debug, trace};

use crate::{
    cursor::TokenCursor,
    error::{ConfigError, LexError},
    token::{SourceLocation, Token},
};

use self::{
    rules::{BlockRule, KeyedRules, PatternRules, StringRule},
    unescape::{EscapeCodes, EscapeFailure},
};

mod config;
mod rules;
mod unescape;

pub use config::{
    CharEscapeCodeConfig, DelimitedConfig, EscapeCodeConfig, PatternConfig, StringConfig,
    TokenizerConfig,
};

#[derive(Clone, Debug)]
pub struct Tokenizer {
    ignore_whitespace: bool,
    dont_ignore: FnvHashSet<char>,
    ignored: KeyedRules<String>,
    blocks: KeyedRules<BlockRule>,
    patterns: PatternRules,
    strings: KeyedRules<StringRule>,
    escapes: EscapeCodes,
    operators: KeyedRules<String>,
    /// Declaration order, for [`Self::operators`].
    char_operators: Vec<char>,
    char_operator_set: FnvHashSet<char>,
    separate_punctuation: bool,
    end_marker: Option<String>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self {
            ignore_whitespace: true,
            dont_ignore: FnvHashSet::default(),
            ignored: KeyedRules::default(),
            blocks: KeyedRules::default(),
            patterns: PatternRules::default(),
            strings: KeyedRules::default(),
            escapes: EscapeCodes::default(),
            operators: KeyedRules::default(),
            char_operators: vec![],
            char_operator_set: FnvHashSet::default(),
            separate_punctuation: true,
            end_marker: None,
        }
    }
}

impl Tokenizer {
    /// A tokenizer that ignores whitespace and splits identifiers from
    /// punctuation, with no other rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip every occurrence of `chr`.
    pub fn ignore_char(&mut self, chr: char) -> Result<&mut Self, ConfigError> {
        self.ignore(&chr.to_string())
    }

    /// Skip every occurrence of `seq`.
    pub fn ignore(&mut self, seq: &str) -> Result<&mut Self, ConfigError> {
        let first = first_char(seq, "ignored sequence")?;
        if seq.len() == first.len_utf8() && self.dont_ignore.contains(&first) {
            return Err(ConfigError::AlreadyNotIgnored(first));
        }
        self.ignored.insert(first, seq.to_string());
        Ok(self)
    }

    /// Exempt a whitespace character from whitespace skipping.
    pub fn dont_ignore(&mut self, chr: char) -> Result<&mut Self, ConfigError> {
        if self.ignored.get(chr).iter().any(|seq| seq.len() == chr.len_utf8()) {
            return Err(ConfigError::AlreadyIgnored(chr));
        }
        self.dont_ignore.insert(chr);
        Ok(self)
    }

    pub fn ignore_whitespace(&mut self, value: bool) -> &mut Self {
        self.ignore_whitespace = value;
        self
    }

    /// Append a token with the given text after the last scanned token.
    pub fn append_on_eof(&mut self, text: impl Into<String>) -> &mut Self {
        self.end_marker = Some(text.into());
        self
    }

    /// Declare a pattern rule. `starts_with` lists the characters a match can
    /// start with; when empty the pattern is tried at every position.
    pub fn add_pattern_rule(
        &mut self,
        pattern: &str,
        starts_with: &str,
    ) -> Result<&mut Self, ConfigError> {
        let regex = meta::Regex::new(pattern).map_err(|err| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            message: err.to_string(),
        })?;
        self.patterns.insert(regex, starts_with);
        Ok(self)
    }

    pub fn add_operator_rule(&mut self, operator: &str) -> Result<&mut Self, ConfigError> {
        let first = first_char(operator, "operator")?;
        self.operators.insert(first, operator.to_string());
        Ok(self)
    }

    /// Declare a string rule. The start and end delimiters and the body are
    /// emitted as three tokens.
    pub fn add_string_rule(
        &mut self,
        start: &str,
        end: &str,
        escape: Option<char>,
    ) -> Result<&mut Self, ConfigError> {
        let first = first_char(start, "string start delimiter")?;
        first_char(end, "string end delimiter")?;
        self.strings.insert(
            first,
            StringRule {
                start: start.to_string(),
                end: end.to_string(),
                escape,
            },
        );
        Ok(self)
    }

    /// Inside strings, the escape character followed by `code` expands to `replacement`.
    pub fn add_escape_code(&mut self, code: char, replacement: impl Into<String>) -> &mut Self {
        self.escapes.add(code, replacement);
        self
    }

    /// Inside strings, the escape character followed by `code` and exactly
    /// `digits` digits in `radix` expands to the character with that code point.
    pub fn add_char_escape_code(
        &mut self,
        code: char,
        digits: usize,
        radix: u32,
    ) -> Result<&mut Self, ConfigError> {
        self.escapes.add_char_code(code, digits, radix)?;
        Ok(self)
    }

    pub fn add_comment_rule(&mut self, start: &str, end: &str) -> Result<&mut Self, ConfigError> {
        let first = first_char(start, "comment start")?;
        first_char(end, "comment end")?;
        self.blocks.insert(
            first,
            BlockRule {
                start: start.to_string(),
                end: end.to_string(),
            },
        );
        Ok(self)
    }

    /// Every character of `operators` becomes a single-character operator.
    pub fn add_operators(&mut self, operators: &str) -> &mut Self {
        for chr in operators.chars() {
            if self.char_operator_set.insert(chr) {
                self.char_operators.push(chr);
            }
        }
        self
    }

    /// When enabled, every character that is neither a letter nor a digit
    /// becomes a token of its own.
    pub fn separate_identifiers_and_punctuation(&mut self, value: bool) -> &mut Self {
        self.separate_punctuation = value;
        self
    }

    /// Multi-character operator rules, then single-character operators.
    pub fn operators(&self) -> Vec<String> {
        self.operators
            .iter_sorted()
            .cloned()
            .chain(self.char_operators.iter().map(char::to_string))
            .collect()
    }

    pub fn tokenize(&self, source: &str, file: impl Into<ArcStr>) -> Result<TokenCursor, LexError> {
        self.tokenize_from(source, file, 1)
    }

    /// Scan `source`, numbering lines from `first_line`.
    pub fn tokenize_from(
        &self,
        source: &str,
        file: impl Into<ArcStr>,
        first_line: u32,
    ) -> Result<TokenCursor, LexError> {
        let mut scan = Scan::new(source, file.into(), first_line);

        while let Some(chr) = scan.current() {
            if self.ignore_whitespace && chr.is_whitespace() && !self.dont_ignore.contains(&chr) {
                scan.flush();
                scan.advance(chr.len_utf8());
                continue;
            }

            if let Some(seq) = self.ignored.get(chr).iter().find(|seq| scan.at(seq)) {
                scan.flush();
                scan.advance(seq.len());
                continue;
            }

            if let Some(block) = self.blocks.get(chr).iter().find(|block| scan.at(&block.start)) {
                scan.flush();
                self.skip_block(&mut scan, block)?;
                continue;
            }

            if let Some(len) = self.patterns.match_at(scan.rest(), chr) {
                scan.emit_span(len);
                continue;
            }

            if let Some(rule) = self.strings.get(chr).iter().find(|rule| scan.at(&rule.start)) {
                scan.flush();
                self.scan_string(&mut scan, rule)?;
                continue;
            }

            if let Some(operator) = self.operators.get(chr).iter().find(|op| scan.at(op)) {
                scan.emit_span(operator.len());
                continue;
            }

            if self.char_operator_set.contains(&chr)
                || (self.separate_punctuation && !chr.is_alphanumeric())
            {
                scan.emit_span(chr.len_utf8());
                continue;
            }

            scan.push_pending(chr);
        }

        scan.flush();

        if let Some(marker) = self.end_marker.as_deref().filter(|marker| !marker.is_empty()) {
            let location = scan.location();
            scan.emit(marker.to_string(), location);
        }

        debug!("tokenized {} tokens from {}", scan.tokens.len(), scan.file);

        Ok(TokenCursor::new(scan.tokens))
    }

    fn skip_block(&self, scan: &mut Scan, block: &BlockRule) -> Result<(), LexError> {
        let location = scan.location();
        let body = &scan.rest()[block.start.len()..];

        match body.find(block.end.as_str()) {
            Some(offset) => {
                scan.advance(block.start.len() + offset + block.end.len());
                Ok(())
            }
            None => Err(LexError::UnterminatedComment { location }),
        }
    }

    fn scan_string(&self, scan: &mut Scan, rule: &StringRule) -> Result<(), LexError> {
        let start_location = scan.location();
        scan.emit_span(rule.start.len());

        let mut body = String::new();
        let body_location = scan.location();

        loop {
            let rest = scan.rest();
            let Some(chr) = rest.chars().next() else {
                return Err(LexError::UnterminatedString {
                    location: start_location,
                });
            };

            if Some(chr) == rule.escape {
                let after_escape = &rest[chr.len_utf8()..];
                match self.escapes.unescape(after_escape, &rule.end, chr) {
                    Ok((text, consumed)) => {
                        body.push_str(&text);
                        scan.advance(chr.len_utf8() + consumed);
                        continue;
                    }
                    // an escape character that also opens the end delimiter may close the string
                    Err(_) if rest.starts_with(rule.end.as_str()) => {}
                    Err(EscapeFailure::Truncated) => {
                        return Err(LexError::UnterminatedString {
                            location: start_location,
                        });
                    }
                    Err(EscapeFailure::Invalid(sequence)) => {
                        return Err(LexError::InvalidEscape {
                            sequence,
                            location: scan.location(),
                        });
                    }
                }
            }

            if rest.starts_with(rule.end.as_str()) {
                scan.emit(body, body_location);
                scan.emit_span(rule.end.len());
                return Ok(());
            }

            body.push(chr);
            scan.advance(chr.len_utf8());
        }
    }
}

fn first_char(seq: &str, what: &'static str) -> Result<char, ConfigError> {
    seq.chars().next().ok_or(ConfigError::EmptyRule(what))
}

/// Scanning state of one `tokenize` call.
struct Scan<'s> {
    source: &'s str,
    pos: usize,
    line: u32,
    file: ArcStr,
    tokens: Vec<Token>,
    pending: String,
    pending_line: u32,
}

impl<'s> Scan<'s> {
    fn new(source: &'s str, file: ArcStr, line: u32) -> Self {
        Self {
            source,
            pos: 0,
            line,
            file,
            tokens: vec![],
            pending: String::new(),
            pending_line: line,
        }
    }

    fn rest(&self) -> &'s str {
        &self.source[self.pos..]
    }

    fn current(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn at(&self, seq: &str) -> bool {
        self.rest().starts_with(seq)
    }

    fn location(&self) -> SourceLocation {
        SourceLocation::new(self.file.clone(), self.line)
    }

    /// Move forward `len` bytes, counting the newlines passed over.
    fn advance(&mut self, len: usize) {
        let end = self.pos + len;
        let newlines = self.source[self.pos..end].matches('\n').count();
        self.line = self.line.saturating_add(newlines as u32);
        self.pos = end;
    }

    fn push_pending(&mut self, chr: char) {
        if self.pending.is_empty() {
            self.pending_line = self.line;
        }
        self.pending.push(chr);
        self.advance(chr.len_utf8());
    }

    fn flush(&mut self) {
        if !self.pending.is_empty() {
            let text = std::mem::take(&mut self.pending);
            let location = SourceLocation::new(self.file.clone(), self.pending_line);
            self.emit(text, location);
        }
    }

    fn emit(&mut self, text: String, location: SourceLocation) {
        trace!("token `{text}' at {location}");
        self.tokens.push(Token::new(text, location));
    }

    /// Flush, then emit the next `len` bytes as a token of their own.
    fn emit_span(&mut self, len: usize) {
        self.flush();
        let text = self.rest()[..len].to_string();
        let location = self.location();
        self.emit(text, location);
        self.advance(len);
    }
}
