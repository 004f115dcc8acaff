//! Hyperparameter configurations and their deduplication keys.
//!
//! A [`Configuration`] is a full assignment of values to a set of
//! hyperparameter names. It is immutable once built and is identified
//! externally by its **configuration id** — its insertion index in the
//! [`ConfigurationManager`](crate::ConfigurationManager) pool, never the
//! configuration itself.
//!
//! Deduplication compares configurations by their *canonical key*: the
//! name-sorted sequence of (name, value) pairs, with floats compared by bit
//! pattern. This is exact-match equality; continuous hyperparameters sampled
//! from continuous distributions essentially never collide, so dedup work
//! happens on categorical and integer spaces.

use std::collections::BTreeMap;

use crate::value::Value;

/// An immutable assignment of values to hyperparameter names.
///
/// Entries are kept name-sorted. Hyperparameters that are inactive in a
/// conditional subspace are simply absent; the tabular projection renders
/// them as missing values.
///
/// # Examples
///
/// ```
/// use graybox::{Configuration, Value};
///
/// let config: Configuration = [
///     ("learning_rate", Value::Float(1e-3)),
///     ("optimizer", Value::Str("adam".into())),
/// ]
/// .into_iter()
/// .collect();
///
/// assert_eq!(config.get("optimizer"), Some(&Value::Str("adam".into())));
/// assert_eq!(config.len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Configuration {
    values: BTreeMap<String, Value>,
}

impl Configuration {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value assigned to `name`, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Iterates over (name, value) pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of assigned hyperparameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no hyperparameters are assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The deduplication key: name-sorted (name, value) pairs with floats
    /// reduced to their bit pattern so the key is hashable.
    pub(crate) fn canonical_key(&self) -> CanonicalKey {
        CanonicalKey(
            self.values
                .iter()
                .map(|(name, value)| (name.clone(), ValueKey::from(value)))
                .collect(),
        )
    }
}

impl From<BTreeMap<String, Value>> for Configuration {
    fn from(values: BTreeMap<String, Value>) -> Self {
        Self { values }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Configuration {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A hashable stand-in for [`Value`] used in canonical keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum ValueKey {
    Float(u64),
    Int(i64),
    Str(String),
    Bool(bool),
}

impl From<&Value> for ValueKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Float(v) => Self::Float(v.to_bits()),
            Value::Int(v) => Self::Int(*v),
            Value::Str(v) => Self::Str(v.clone()),
            Value::Bool(v) => Self::Bool(*v),
        }
    }
}

/// The canonical tuple of a configuration: name-sorted (name, value) pairs.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct CanonicalKey(Vec<(String, ValueKey)>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_key_ignores_insertion_order() {
        let a: Configuration = [("x", Value::Int(1)), ("y", Value::Int(2))]
            .into_iter()
            .collect();
        let b: Configuration = [("y", Value::Int(2)), ("x", Value::Int(1))]
            .into_iter()
            .collect();
        assert_eq!(a.canonical_key(), b.canonical_key());
    }

    #[test]
    fn canonical_key_distinguishes_values() {
        let a: Configuration = [("x", Value::Float(0.1))].into_iter().collect();
        let b: Configuration = [("x", Value::Float(0.2))].into_iter().collect();
        assert_ne!(a.canonical_key(), b.canonical_key());
    }

    #[test]
    fn canonical_key_float_equality_is_exact() {
        let a: Configuration = [("x", Value::Float(0.1 + 0.2))].into_iter().collect();
        let b: Configuration = [("x", Value::Float(0.3))].into_iter().collect();
        // 0.1 + 0.2 != 0.3 in f64; exact-match semantics keep them distinct.
        assert_ne!(a.canonical_key(), b.canonical_key());
    }

    #[test]
    fn missing_entries_change_the_key() {
        let full: Configuration = [("x", Value::Int(1)), ("y", Value::Int(2))]
            .into_iter()
            .collect();
        let partial: Configuration = [("x", Value::Int(1))].into_iter().collect();
        assert_ne!(full.canonical_key(), partial.canonical_key());
    }
}
