use std::fmt::Debug;

use super::FnvIndexMap;

/// Values captured while parsing one node, by capture name.
///
/// Names keep the order of their first capture and repeated captures under
/// one name append. Nested rules (the bodies of `maybe`, `many` and the
/// like) capture into the map of the node that contains them.
#[derive(Clone, PartialEq)]
pub struct AttributeMap<T> {
    values: FnvIndexMap<String, Vec<T>>,
}

impl<T> AttributeMap<T> {
    pub fn new() -> Self {
        Self {
            values: FnvIndexMap::default(),
        }
    }

    pub fn push(&mut self, name: &str, value: T) {
        match self.values.get_mut(name) {
            Some(values) => values.push(value),
            None => {
                self.values.insert(name.to_string(), vec![value]);
            }
        }
    }

    /// All values captured under `name`, empty if nothing was.
    pub fn get(&self, name: &str) -> &[T] {
        self.values.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn first(&self, name: &str) -> Option<&T> {
        self.get(name).first()
    }

    pub fn contains(&self, name: &str) -> bool {
        !self.get(name).is_empty()
    }

    /// Moves the values captured under `name` out of the map.
    pub fn take(&mut self, name: &str) -> Vec<T> {
        self.values
            .get_mut(name)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Moves the first value captured under `name` out of the map.
    pub fn take_first(&mut self, name: &str) -> Option<T> {
        let values = self.values.get_mut(name)?;
        if values.is_empty() {
            None
        } else {
            Some(values.remove(0))
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[T])> {
        self.values
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<T> Default for AttributeMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Debug> Debug for AttributeMap<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.values.iter()).finish()
    }
}

impl<T> IntoIterator for AttributeMap<T> {
    type Item = (String, Vec<T>);
    type IntoIter = indexmap::map::IntoIter<String, Vec<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
