use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// Sparse result of a link computation: source id -> target id -> confidence.
///
/// Topological relations are binary, so joins always record a confidence of
/// `1.0`. Ordered maps keep iteration and serialization deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mapping {
    links: BTreeMap<String, BTreeMap<String, f64>>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a link. An existing link keeps the higher of the two
    /// confidences.
    pub fn add(&mut self, source: &str, target: &str, confidence: f64) {
        let targets = self.links.entry(source.to_string()).or_default();
        match targets.entry(target.to_string()) {
            Entry::Occupied(mut existing) => {
                if confidence > *existing.get() {
                    existing.insert(confidence);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(confidence);
            }
        }
    }

    pub fn contains(&self, source: &str, target: &str) -> bool {
        self.links
            .get(source)
            .is_some_and(|targets| targets.contains_key(target))
    }

    pub fn confidence(&self, source: &str, target: &str) -> Option<f64> {
        self.links.get(source)?.get(target).copied()
    }

    /// Targets linked to `source`.
    pub fn targets(&self, source: &str) -> Option<&BTreeMap<String, f64>> {
        self.links.get(source)
    }

    /// Number of (source, target) links.
    pub fn size(&self) -> usize {
        self.links.values().map(BTreeMap::len).sum()
    }

    pub fn source_count(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// All links in (source, target) order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.links.iter().flat_map(|(s, targets)| {
            targets
                .iter()
                .map(move |(t, confidence)| (s.as_str(), t.as_str(), *confidence))
        })
    }

    /// Links with the source and target roles exchanged.
    pub fn reversed(&self) -> Mapping {
        let mut reversed = Mapping::new();
        for (s, t, confidence) in self.iter() {
            reversed.add(t, s, confidence);
        }
        reversed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_contains() {
        let mut m = Mapping::new();
        m.add("a", "b", 1.0);
        m.add("a", "c", 1.0);
        m.add("d", "b", 1.0);

        assert!(m.contains("a", "b"));
        assert!(!m.contains("b", "a"));
        assert_eq!(m.size(), 3);
        assert_eq!(m.source_count(), 2);
    }

    #[test]
    fn test_add_keeps_highest_confidence() {
        let mut m = Mapping::new();
        m.add("a", "b", 0.4);
        m.add("a", "b", 0.9);
        m.add("a", "b", 0.1);
        assert_eq!(m.confidence("a", "b"), Some(0.9));
        assert_eq!(m.size(), 1);
    }

    #[test]
    fn test_reversed() {
        let mut m = Mapping::new();
        m.add("a", "b", 1.0);
        m.add("a", "c", 1.0);
        let r = m.reversed();
        assert!(r.contains("b", "a"));
        assert!(r.contains("c", "a"));
        assert_eq!(r.source_count(), 2);
    }

    #[test]
    fn test_iter_is_ordered() {
        let mut m = Mapping::new();
        m.add("z", "y", 1.0);
        m.add("a", "q", 1.0);
        m.add("a", "b", 1.0);
        let pairs: Vec<_> = m.iter().map(|(s, t, _)| (s, t)).collect();
        assert_eq!(pairs, vec![("a", "b"), ("a", "q"), ("z", "y")]);
    }

    #[test]
    fn test_json_shape() {
        let mut m = Mapping::new();
        m.add("a", "b", 1.0);
        assert_eq!(serde_json::to_string(&m).unwrap(), r#"{"a":{"b":1.0}}"#);
    }
}
