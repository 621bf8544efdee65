//! Label sets and metric identity.
//!
//! Labels are held sorted by key so that two sets with the same pairs are
//! equal, hash equally and produce the same identity key no matter what
//! order they were built in.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Constant label pairs attached to a metric series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Add or overwrite one pair.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Identity of a counter series named `name` carrying these labels.
    pub fn identity_key(&self, name: &str) -> MetricKey {
        MetricKey {
            name: name.to_string(),
            labels: self.0.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }

    /// Copy in the shape metrics backends take for constant labels.
    pub fn to_const_labels(&self) -> HashMap<String, String> {
        self.0.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<const N: usize> From<[(&str, &str); N]> for LabelSet {
    fn from(pairs: [(&str, &str); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl From<&[(&str, &str)]> for LabelSet {
    fn from(pairs: &[(&str, &str)]) -> Self {
        pairs.iter().copied().collect()
    }
}

impl From<HashMap<String, String>> for LabelSet {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map.into_iter().collect())
    }
}

/// Structural identity of a metric series: name plus sorted label pairs.
///
/// Kept as separate fields rather than one concatenated string so that
/// `("ab", "c")` and `("a", "bc")` stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricKey {
    pub name: String,
    pub labels: Vec<(String, String)>,
}

/// `{"day": "YYYY-MM-DD"}` for the current UTC date.
pub fn day_labels() -> LabelSet {
    day_labels_at(Utc::now())
}

/// `{"day": "YYYY-MM-DD"}` for the UTC date of `at`.
pub fn day_labels_at(at: DateTime<Utc>) -> LabelSet {
    LabelSet::new().with("day", at.format("%Y-%m-%d").to_string())
}
