use std::borrow::Cow;

use crate::error::ConfigError;

/// Escape codes understood inside string rules.
#[derive(Clone, Default, Debug)]
pub(crate) struct EscapeCodes {
    codes: Vec<(char, String)>,
    char_codes: Vec<CharEscape>,
}

/// `\xNNNN`-style escape: a code character followed by a fixed number of
/// digits in some radix, expanding to the character with that code point.
#[derive(Clone, Copy, Debug)]
struct CharEscape {
    code: char,
    digits: usize,
    radix: u32,
}

#[derive(Debug)]
pub(crate) enum EscapeFailure {
    /// Input ended right after the escape character.
    Truncated,
    /// The escape character was followed by something that is not an escape.
    Invalid(String),
}

impl EscapeCodes {
    pub fn add(&mut self, code: char, replacement: impl Into<String>) {
        self.codes.push((code, replacement.into()));
    }

    pub fn add_char_code(
        &mut self,
        code: char,
        digits: usize,
        radix: u32,
    ) -> Result<(), ConfigError> {
        if digits == 0 {
            return Err(ConfigError::InvalidCharEscape {
                code,
                message: "at least one digit is required",
            });
        }
        if !(2..=36).contains(&radix) {
            return Err(ConfigError::InvalidCharEscape {
                code,
                message: "radix must be between 2 and 36",
            });
        }
        self.char_codes.push(CharEscape {
            code,
            digits,
            radix,
        });
        Ok(())
    }

    /// Expands the escape sequence at the start of `rest`, which is the
    /// input directly following the escape character.
    ///
    /// Returns the expansion and the number of bytes of `rest` it consumed.
    /// An escaped end delimiter expands to the delimiter itself and is checked
    /// before any escape code.
    pub fn unescape<'a>(
        &'a self,
        rest: &'a str,
        end: &'a str,
        escape: char,
    ) -> Result<(Cow<'a, str>, usize), EscapeFailure> {
        if rest.starts_with(end) {
            return Ok((Cow::Borrowed(end), end.len()));
        }

        let Some(next) = rest.chars().next() else {
            return Err(EscapeFailure::Truncated);
        };

        if let Some((_, replacement)) = self.codes.iter().find(|(code, _)| *code == next) {
            return Ok((Cow::Borrowed(replacement.as_str()), next.len_utf8()));
        }

        if let Some(char_escape) = self.char_codes.iter().find(|ce| ce.code == next) {
            let digits_start = next.len_utf8();
            let digits: String = rest[digits_start..]
                .chars()
                .take(char_escape.digits)
                .collect();
            let sequence = || format!("{escape}{next}{digits}");

            if digits.chars().count() < char_escape.digits
                || !digits.chars().all(|chr| chr.is_digit(char_escape.radix))
            {
                return Err(EscapeFailure::Invalid(sequence()));
            }

            return match u32::from_str_radix(&digits, char_escape.radix)
                .ok()
                .and_then(char::from_u32)
            {
                Some(chr) => Ok((Cow::Owned(chr.to_string()), digits_start + digits.len())),
                None => Err(EscapeFailure::Invalid(sequence())),
            };
        }

        Err(EscapeFailure::Invalid(format!("{escape}{next}")))
    }
}
