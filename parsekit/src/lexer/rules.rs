use fnv::FnvHashMap;
use regex_automata::{Anchored, Input, meta};

/// Rules bucketed by their first character, so that scanning a position only
/// looks at the rules that can start there.
#[derive(Clone, Debug)]
pub(crate) struct KeyedRules<R> {
    table: FnvHashMap<char, Vec<R>>,
}

impl<R> Default for KeyedRules<R> {
    fn default() -> Self {
        Self {
            table: FnvHashMap::default(),
        }
    }
}

impl<R> KeyedRules<R> {
    pub fn insert(&mut self, key: char, rule: R) {
        self.table.entry(key).or_default().push(rule);
    }

    pub fn get(&self, key: char) -> &[R] {
        self.table.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    /// All rules, grouped by ascending first character, each group in declaration order.
    pub fn iter_sorted(&self) -> impl Iterator<Item = &R> {
        let mut keys: Vec<&char> = self.table.keys().collect();
        keys.sort();
        keys.into_iter().flat_map(|key| self.table[key].iter())
    }
}

/// A skipped region, such as a block comment.
#[derive(Clone, Debug)]
pub(crate) struct BlockRule {
    pub start: String,
    pub end: String,
}

/// A quoted-string rule.
#[derive(Clone, Debug)]
pub(crate) struct StringRule {
    pub start: String,
    pub end: String,
    pub escape: Option<char>,
}

/// Pattern rules in declaration order.
///
/// A pattern may be keyed by any number of start characters; one declared
/// without start characters is tried at every position.
#[derive(Clone, Default, Debug)]
pub(crate) struct PatternRules {
    patterns: Vec<meta::Regex>,
    keyed: KeyedRules<usize>,
    anywhere: Vec<usize>,
}

impl PatternRules {
    pub fn insert(&mut self, regex: meta::Regex, starts_with: &str) {
        let index = self.patterns.len();
        self.patterns.push(regex);

        if starts_with.is_empty() {
            self.anywhere.push(index);
        } else {
            let mut keys: Vec<char> = starts_with.chars().collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                self.keyed.insert(key, index);
            }
        }
    }

    /// Length in bytes of the first non-empty match at the start of `rest`.
    ///
    /// Patterns only see `rest`, so `^` and `\b` treat the current position
    /// as the start of input.
    pub fn match_at(&self, rest: &str, key: char) -> Option<usize> {
        let keyed = self.keyed.get(key);
        let mut keyed_iter = keyed.iter().copied().peekable();
        let mut anywhere_iter = self.anywhere.iter().copied().peekable();

        // merge both index lists to preserve declaration order
        loop {
            let index = match (keyed_iter.peek(), anywhere_iter.peek()) {
                (Some(a), Some(b)) if a <= b => keyed_iter.next(),
                (Some(_), Some(_)) => anywhere_iter.next(),
                (Some(_), None) => keyed_iter.next(),
                (None, Some(_)) => anywhere_iter.next(),
                (None, None) => return None,
            }?;

            let input = Input::new(rest).anchored(Anchored::Yes);
            if let Some(found) = self.patterns[index].find(input) {
                if found.end() > 0 {
                    return Some(found.end());
                }
            }
        }
    }
}
