//! Per-rule violation report.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Failure message mapped to the serialized items that failed it.
///
/// Messages keep first-reported order. Items under one message are
/// deduplicated by value, first occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Report {
    violations: IndexMap<String, Vec<Value>>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `items` under `message`, skipping ones already listed there.
    pub fn record(&mut self, message: impl Into<String>, items: impl IntoIterator<Item = Value>) {
        let listed = self.violations.entry(message.into()).or_default();
        for item in items {
            if !listed.contains(&item) {
                listed.push(item);
            }
        }
    }

    pub fn get(&self, message: &str) -> Option<&[Value]> {
        self.violations.get(message).map(Vec::as_slice)
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.violations.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Total number of listed items across all messages.
    pub fn violation_count(&self) -> usize {
        self.violations.values().map(Vec::len).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl FromIterator<(String, Vec<Value>)> for Report {
    fn from_iter<T: IntoIterator<Item = (String, Vec<Value>)>>(iter: T) -> Self {
        let mut report = Report::new();
        for (message, items) in iter {
            report.record(message, items);
        }
        report
    }
}
