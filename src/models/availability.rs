use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Size label to availability, as observed by one poll.
///
/// Labels missing from the map are unavailable. Recording the same label twice
/// keeps it available if either observation was.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityResult {
    sizes: BTreeMap<String, bool>,
}

impl AvailabilityResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, label: impl Into<String>, available: bool) {
        let entry = self.sizes.entry(label.into()).or_insert(false);
        *entry |= available;
    }

    pub fn get(&self, label: &str) -> Option<bool> {
        self.sizes.get(label).copied()
    }

    pub fn is_available(&self, label: &str) -> bool {
        self.get(label).unwrap_or(false)
    }

    pub fn available_labels(&self) -> Vec<&str> {
        self.sizes
            .iter()
            .filter(|(_, available)| **available)
            .map(|(label, _)| label.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.sizes.iter().map(|(label, available)| (label.as_str(), *available))
    }
}

impl<L: Into<String>> FromIterator<(L, bool)> for AvailabilityResult {
    fn from_iter<I: IntoIterator<Item = (L, bool)>>(iter: I) -> Self {
        let mut result = AvailabilityResult::new();
        for (label, available) in iter {
            result.record(label, available);
        }
        result
    }
}
