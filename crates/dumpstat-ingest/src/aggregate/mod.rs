//! Dimensional aggregation of dump records
//!
//! Each dataset type gets a [`DatasetAggregator`] made of [`Dimension`]s. A
//! dimension maps a record to one or more label tuples and adds the record's
//! weight (1 for plain counts) under each. State lives only for one pass and
//! is published to the sink once, at the end.

pub mod domain;
pub mod media;
pub mod posts;
pub mod tables;

use std::collections::HashMap;
use tracing::debug;

use crate::config::IngestConfig;
use crate::csv::Record;
use crate::dataset::DatasetType;
use crate::error::Result;
use crate::pipeline::RecordConsumer;
use crate::sink::{MetricFamily, MetricsSink, Sample};

pub use domain::source_domain;
pub use media::{classify_extension, MediaCategory, MediaType};

/// Label tuples a record contributes to
pub type Keys = Vec<Vec<String>>;

/// Extracts label tuples; an error rejects the whole record
pub type KeyFn = fn(&Record) -> Result<Keys>;

/// Amount added per label tuple
pub type WeightFn = fn(&Record) -> f64;

/// A single label tuple
pub fn key<I, S>(values: I) -> Keys
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    vec![values.into_iter().map(Into::into).collect()]
}

/// Label text for booleans
pub fn bool_label(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Trimmed value, `unknown` when empty
pub fn text_label(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        "unknown".to_string()
    } else {
        value.to_string()
    }
}

/// One metric family under construction
pub struct Dimension {
    name: &'static str,
    help: &'static str,
    labels: &'static [&'static str],
    keys: KeyFn,
    weight: Option<WeightFn>,
    min_count: Option<f64>,
    values: HashMap<Vec<String>, f64>,
}

impl Dimension {
    /// Count records per label tuple
    pub fn counter(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
        keys: KeyFn,
    ) -> Self {
        Self {
            name,
            help,
            labels,
            keys,
            weight: None,
            min_count: None,
            values: HashMap::new(),
        }
    }

    /// Sum `weight` per label tuple instead of counting
    pub fn summing(mut self, weight: WeightFn) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Only publish label tuples whose value reaches `min`
    pub fn min_count(mut self, min: u64) -> Self {
        self.min_count = Some(min as f64);
        self
    }

    fn add(&mut self, keys: Keys, weight: f64) {
        for key in keys {
            *self.values.entry(key).or_insert(0.0) += weight;
        }
    }

    /// Distinct label tuples seen so far
    pub fn cardinality(&self) -> usize {
        self.values.len()
    }

    /// Apply the threshold and freeze into a family, samples sorted by labels
    pub fn into_family(self) -> MetricFamily {
        let min = self.min_count;
        let mut samples: Vec<Sample> = self
            .values
            .into_iter()
            .filter(|(_, value)| min.is_none_or(|min| *value >= min))
            .map(|(labels, value)| Sample { labels, value })
            .collect();
        samples.sort_by(|a, b| a.labels.cmp(&b.labels));

        MetricFamily {
            name: self.name.to_string(),
            help: self.help.to_string(),
            labels: self.labels.iter().map(|l| l.to_string()).collect(),
            samples,
        }
    }
}

/// All dimensions of one dataset type for one pass
pub struct DatasetAggregator {
    dataset: DatasetType,
    dimensions: Vec<Dimension>,
    rows: u64,
}

impl DatasetAggregator {
    pub fn new(dataset: DatasetType, dimensions: Vec<Dimension>) -> Self {
        Self {
            dataset,
            dimensions,
            rows: 0,
        }
    }

    /// The breakdowns published for `dataset`
    pub fn for_dataset(dataset: DatasetType, config: &IngestConfig) -> Self {
        let dimensions = match dataset {
            DatasetType::Posts => posts::dimensions(config.tag_threshold, config.source_threshold),
            DatasetType::Pools => tables::pool_dimensions(),
            DatasetType::Tags => tables::tag_dimensions(),
            DatasetType::TagAliases => tables::alias_dimensions(),
            DatasetType::TagImplications => tables::implication_dimensions(),
            DatasetType::WikiPages => tables::wiki_dimensions(),
        };
        Self::new(dataset, dimensions)
    }

    /// Records folded so far
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Fold one record into every dimension.
    ///
    /// All keys are computed before anything is added, so a record rejected
    /// by one dimension leaves every dimension untouched.
    pub fn fold(&mut self, record: &Record) -> Result<()> {
        let mut staged = Vec::with_capacity(self.dimensions.len());
        for dimension in &self.dimensions {
            let keys = (dimension.keys)(record)?;
            let weight = dimension.weight.map_or(1.0, |weight| weight(record));
            staged.push((keys, weight));
        }

        for (dimension, (keys, weight)) in self.dimensions.iter_mut().zip(staged) {
            dimension.add(keys, weight);
        }
        self.rows += 1;
        Ok(())
    }

    pub fn into_families(self) -> Vec<MetricFamily> {
        self.dimensions.into_iter().map(Dimension::into_family).collect()
    }

    /// Publish every family, replacing the previous pass's values
    pub fn flush(self, sink: &dyn MetricsSink) -> usize {
        let dataset = self.dataset;
        let families = self.into_families();
        let count = families.len();

        for family in families {
            debug!(
                dataset = %dataset,
                metric = %family.name,
                samples = family.samples.len(),
                "Publishing metric family"
            );
            sink.publish(family);
        }

        count
    }
}

impl RecordConsumer for DatasetAggregator {
    fn consume(&mut self, record: &Record) -> Result<()> {
        self.fold(record)
    }
}
