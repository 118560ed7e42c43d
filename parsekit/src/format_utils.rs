use std::fmt::Display;

/// Quotes a token text the way every error message in the crate does: `` `text' ``.
pub struct Quoted<T>(pub T);

impl<T: Display> Display for Quoted<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "`{}'", self.0)
    }
}

/// Lists acceptable keywords: "Expected `a'", "Expected one of `a' or `b'",
/// "Expected one of `a', `b' or `c'".
pub struct Expected<'a, K>(pub &'a [K]);

impl<K: AsRef<str>> Display for Expected<'_, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            [] => write!(f, "Unexpected token"),
            [single] => write!(f, "Expected {}", Quoted(single.as_ref())),
            [init @ .., last] => {
                write!(f, "Expected one of ")?;
                for (index, keyword) in init.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", Quoted(keyword.as_ref()))?;
                }
                write!(f, " or {}", Quoted(last.as_ref()))
            }
        }
    }
}

/// Displays every item of a slice with `separator` between them.
pub struct Separated<'a, T>(pub &'a [T], pub &'static str);

impl<T: Display> Display for Separated<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self(items, separator) = self;
        if let [first, rest @ ..] = items {
            write!(f, "{first}")?;
            for item in rest {
                write!(f, "{separator}{item}")?;
            }
        }
        Ok(())
    }
}
