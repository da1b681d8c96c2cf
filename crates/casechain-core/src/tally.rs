//! Counting tables with a deterministic "top-N" order.
//!
//! Rows sort by descending count, ties broken by ascending key, so two runs
//! over the same input always print the same report.

use std::collections::BTreeMap;

use serde::Serialize;

/// Occurrence counts keyed by label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FrequencyTable {
    counts: BTreeMap<String, usize>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: impl Into<String>) {
        *self.counts.entry(key.into()).or_insert(0) += 1;
    }

    pub fn add_n(&mut self, key: impl Into<String>, n: usize) {
        if n > 0 {
            *self.counts.entry(key.into()).or_insert(0) += n;
        }
    }

    pub fn get(&self, key: &str) -> usize {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// All rows, count descending then key ascending.
    pub fn ranked(&self) -> Vec<(&str, usize)> {
        let mut rows: Vec<(&str, usize)> =
            self.counts.iter().map(|(k, &v)| (k.as_str(), v)).collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        rows
    }

    /// The first `n` rows of [`ranked`](Self::ranked).
    pub fn top(&self, n: usize) -> Vec<(&str, usize)> {
        let mut rows = self.ranked();
        rows.truncate(n);
        rows
    }

    /// Rows in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Fold another table into this one.
    pub fn merge(mut self, other: &FrequencyTable) -> Self {
        for (k, v) in other.iter() {
            self.add_n(k, v);
        }
        self
    }
}

impl<S: Into<String>> FromIterator<S> for FrequencyTable {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut table = Self::new();
        for key in iter {
            table.add(key);
        }
        table
    }
}

/// `part / whole * 100`, or 0 when `whole` is 0.
pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
