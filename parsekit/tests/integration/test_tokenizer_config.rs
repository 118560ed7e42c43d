use assert_matches::assert_matches;
use indoc::indoc;
use parsekit::{ConfigError, LexError, Tokenizer, TokenizerConfig};
use pretty_assertions::assert_eq;
use test_log::test;

use crate::texts;

const CONFIG: &str = indoc! {r#"
    {
        "comments": [
            { "start": "/*", "end": "*/" },
            { "start": "//", "end": "\n" }
        ],
        "patterns": [
            { "pattern": "[0-9]+(\\.[0-9]+)?", "starts_with": "0123456789" }
        ],
        "strings": [
            { "start": "\"", "end": "\"", "escape": "\\" }
        ],
        "escape_codes": [
            { "code": "n", "replacement": "\n" }
        ],
        "operators": ["==", "<="],
        "end_marker": "<eof>"
    }
"#};

const SOURCE: &str = indoc! {r#"
    x <= 3.14 // up to pi
    /* then */ y == "a\nb"
"#};

fn configured() -> Tokenizer {
    let config: TokenizerConfig = serde_json::from_str(CONFIG).unwrap();
    Tokenizer::try_from(&config).unwrap()
}

fn built() -> Tokenizer {
    let mut tokenizer = Tokenizer::new();
    tokenizer
        .add_comment_rule("/*", "*/")
        .unwrap()
        .add_comment_rule("//", "\n")
        .unwrap()
        .add_pattern_rule(r"[0-9]+(\.[0-9]+)?", "0123456789")
        .unwrap()
        .add_string_rule("\"", "\"", Some('\\'))
        .unwrap()
        .add_escape_code('n', "\n")
        .add_operator_rule("==")
        .unwrap()
        .add_operator_rule("<=")
        .unwrap()
        .append_on_eof("<eof>");
    tokenizer
}

#[test]
fn json_config_matches_builder() {
    let tokenizer = configured();

    let from_config = tokenizer.tokenize(SOURCE, "config").unwrap();
    let from_builder = built().tokenize(SOURCE, "config").unwrap();

    assert_eq!(
        texts(&from_config),
        ["x", "<=", "3.14", "y", "==", "\"", "a\nb", "\"", "<eof>"]
    );
    assert_eq!(from_config, from_builder);
    assert_eq!(tokenizer.operators(), built().operators());
}

#[test]
fn lines_follow_comments() {
    let cursor = configured().tokenize(SOURCE, "config").unwrap();

    let lines: Vec<(&str, u32)> = cursor
        .tokens()
        .iter()
        .map(|token| (token.text(), token.line()))
        .collect();
    assert_eq!(lines[..3], [("x", 1), ("<=", 1), ("3.14", 1)]);
    assert_eq!(lines[3], ("y", 2));
    assert_eq!(lines.last(), Some(&("<eof>", 3)));
}

#[test]
fn missing_fields_take_defaults() {
    let config: TokenizerConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, TokenizerConfig::default());
    assert!(config.ignore_whitespace);
    assert!(config.separate_identifiers_and_punctuation);
}

#[test]
fn invalid_configs_are_rejected() {
    let config: TokenizerConfig = serde_json::from_str(indoc! {r#"
        { "patterns": [{ "pattern": "(unclosed" }] }
    "#})
    .unwrap();
    assert_matches!(
        Tokenizer::try_from(&config),
        Err(ConfigError::InvalidPattern { pattern, .. }) if pattern == "(unclosed"
    );

    let config: TokenizerConfig = serde_json::from_str(indoc! {r#"
        { "ignore": [" "], "dont_ignore": [" "] }
    "#})
    .unwrap();
    assert_matches!(
        Tokenizer::try_from(&config),
        Err(ConfigError::AlreadyNotIgnored(' '))
    );

    let config: TokenizerConfig = serde_json::from_str(indoc! {r#"
        { "char_escape_codes": [{ "code": "u", "digits": 4, "radix": 40 }] }
    "#})
    .unwrap();
    assert_matches!(
        Tokenizer::try_from(&config),
        Err(ConfigError::InvalidCharEscape { code: 'u', .. })
    );
}

#[test]
fn scan_errors_surface_from_configured_tokenizer() {
    let error = configured()
        .tokenize("a\n\"b\\q\"", "config")
        .unwrap_err();

    assert_matches!(error, LexError::InvalidEscape { ref sequence, .. } if sequence == "\\q");
    assert_eq!(error.location().line, 2);
}
