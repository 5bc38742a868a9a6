//! Metrics sink
//!
//! Aggregators publish whole metric families here once per pass. The
//! registry is an explicit handle shared through an `Arc`, so whatever serves
//! the metrics reads the same instance the ingestion cycle writes.
//!
//! Publishing replaces a family wholesale: label sets missing from the new
//! pass disappear instead of lingering with last cycle's values. Families a
//! failed cycle never reached keep their previous values.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

/// One labelled value of a family
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    /// Label values, positionally matching [`MetricFamily::labels`]
    pub labels: Vec<String>,
    pub value: f64,
}

/// A named metric with its label names and every sample of one pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricFamily {
    pub name: String,
    pub help: String,
    pub labels: Vec<String>,
    pub samples: Vec<Sample>,
}

impl MetricFamily {
    /// Value of the sample with exactly these label values
    pub fn get(&self, label_values: &[&str]) -> Option<f64> {
        self.samples
            .iter()
            .find(|sample| sample.labels.iter().map(String::as_str).eq(label_values.iter().copied()))
            .map(|sample| sample.value)
    }
}

/// Destination for aggregated families
pub trait MetricsSink: Send + Sync {
    /// Replace the family named `family.name` with this snapshot
    fn publish(&self, family: MetricFamily);
}

/// In-memory sink holding the latest snapshot of every family
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    families: RwLock<BTreeMap<String, MetricFamily>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest snapshot of one family
    pub fn family(&self, name: &str) -> Option<MetricFamily> {
        self.families
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Convenience lookup of a single sample
    pub fn value(&self, name: &str, label_values: &[&str]) -> Option<f64> {
        self.family(name)?.get(label_values)
    }

    /// Every family, ordered by name
    pub fn snapshot(&self) -> Vec<MetricFamily> {
        self.families
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

impl MetricsSink for MetricsRegistry {
    fn publish(&self, family: MetricFamily) {
        self.families
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(family.name.clone(), family);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(samples: &[(&str, f64)]) -> MetricFamily {
        MetricFamily {
            name: "e621_posts_by_rating".to_string(),
            help: "Posts per rating".to_string(),
            labels: vec!["rating".to_string()],
            samples: samples
                .iter()
                .map(|(label, value)| Sample {
                    labels: vec![label.to_string()],
                    value: *value,
                })
                .collect(),
        }
    }

    #[test]
    fn test_publish_replaces_whole_family() {
        let registry = MetricsRegistry::new();
        registry.publish(family(&[("s", 3.0), ("e", 1.0)]));
        registry.publish(family(&[("s", 4.0)]));

        assert_eq!(registry.value("e621_posts_by_rating", &["s"]), Some(4.0));
        assert_eq!(registry.value("e621_posts_by_rating", &["e"]), None);
    }

    #[test]
    fn test_snapshot_is_sorted_by_name() {
        let registry = MetricsRegistry::new();
        let mut tags = family(&[]);
        tags.name = "e621_tags_by_category".to_string();
        registry.publish(tags);
        registry.publish(family(&[("q", 2.0)]));

        let names: Vec<_> = registry.snapshot().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["e621_posts_by_rating", "e621_tags_by_category"]);
    }
}
