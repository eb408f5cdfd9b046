use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Shot counts keyed by outcome bit string.
///
/// Keys are kept sorted, so iteration order is lexicographic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeasurementDistribution {
    counts: BTreeMap<String, usize>,
}

impl MeasurementDistribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_counts<I, S>(counts: I) -> Self
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        let mut dist = Self::new();
        for (label, n) in counts {
            dist.add(label, n);
        }
        dist
    }

    /// Adds `n` shots to `label`. Zero additions do not create a key.
    pub fn add(&mut self, label: impl Into<String>, n: usize) {
        if n == 0 {
            return;
        }
        *self.counts.entry(label.into()).or_insert(0) += n;
    }

    /// Removes up to `n` shots from `label` and returns how many were removed.
    pub fn take(&mut self, label: &str, n: usize) -> usize {
        let Some(count) = self.counts.get_mut(label) else {
            return 0;
        };
        let taken = n.min(*count);
        *count -= taken;
        if *count == 0 {
            self.counts.remove(label);
        }
        taken
    }

    pub fn get(&self, label: &str) -> usize {
        self.counts.get(label).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Label with the highest count; ties go to the lexicographically lowest label.
    pub fn most_frequent(&self) -> Option<&str> {
        let mut best: Option<(&str, usize)> = None;
        for (label, &count) in &self.counts {
            match best {
                Some((_, c)) if count <= c => {}
                _ => best = Some((label.as_str(), count)),
            }
        }
        best.map(|(label, _)| label)
    }

    /// Fraction of shots that landed on `label`.
    pub fn probability(&self, label: &str) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.get(label) as f64 / total as f64
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(k, &v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_break_to_lowest_label() {
        let dist = MeasurementDistribution::from_counts([("10", 5), ("01", 5), ("11", 2)]);
        assert_eq!(dist.most_frequent(), Some("01"));
    }

    #[test]
    fn take_is_bounded_by_available_shots() {
        let mut dist = MeasurementDistribution::from_counts([("00", 3)]);
        assert_eq!(dist.take("00", 10), 3);
        assert_eq!(dist.get("00"), 0);
        assert!(dist.is_empty());
        assert_eq!(dist.take("11", 1), 0);
    }

    #[test]
    fn serializes_as_plain_map() {
        let dist = MeasurementDistribution::from_counts([("00", 1000), ("11", 24)]);
        let json = serde_json::to_string(&dist).unwrap();
        assert_eq!(json, r#"{"00":1000,"11":24}"#);
        let back: MeasurementDistribution = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dist);
    }
}
