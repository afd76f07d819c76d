//! Statistics Calculator Module
//! Groups trial rows by (treatment, timepoint) and computes means and standard errors.

use crate::data::TrialRow;
use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Partition key for aggregation. Orders by treatment, then timepoint.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GroupKey {
    pub treatment: String,
    pub timepoint: i64,
}

impl GroupKey {
    pub fn new(treatment: impl Into<String>, timepoint: i64) -> Self {
        Self {
            treatment: treatment.into(),
            timepoint,
        }
    }
}

/// Mean and standard error of the mean for one measured quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub mean: f64,
    /// NaN when the group has fewer than two values.
    pub sem: f64,
}

impl Default for Summary {
    fn default() -> Self {
        Self {
            mean: f64::NAN,
            sem: f64::NAN,
        }
    }
}

/// Statistics for a single (treatment, timepoint) group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRecord {
    pub key: GroupKey,
    pub tumor_volume: Summary,
    pub metastatic_sites: Summary,
    pub mouse_count: usize,
}

#[derive(Default)]
struct GroupValues {
    tumor_volumes: Vec<f64>,
    metastatic_sites: Vec<f64>,
}

/// Handles statistical calculations over joined trial rows.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Mean and SEM (sample standard deviation over the square root of n).
    pub fn summarize(values: &[f64]) -> Summary {
        if values.is_empty() {
            return Summary::default();
        }

        let mean = values.iter().mean();
        // statrs yields NaN for fewer than two samples
        let std_dev = values.iter().std_dev();
        let sem = std_dev / (values.len() as f64).sqrt();

        Summary { mean, sem }
    }

    /// Aggregate rows per group key, sorted by key.
    ///
    /// Rows without a treatment belong to no group and are left out.
    pub fn aggregate(rows: &[TrialRow]) -> Vec<AggregateRecord> {
        let mut groups: BTreeMap<GroupKey, GroupValues> = BTreeMap::new();
        let mut untreated = 0usize;

        for row in rows {
            let Some(treatment) = &row.treatment else {
                untreated += 1;
                continue;
            };

            let values = groups
                .entry(GroupKey::new(treatment.as_str(), row.timepoint))
                .or_default();
            values.tumor_volumes.push(row.tumor_volume);
            values.metastatic_sites.push(row.metastatic_sites as f64);
        }

        if untreated > 0 {
            debug!(rows = untreated, "rows without treatment left out of aggregation");
        }

        let records: Vec<AggregateRecord> = groups
            .into_iter()
            .map(|(key, values)| AggregateRecord {
                tumor_volume: Self::summarize(&values.tumor_volumes),
                metastatic_sites: Self::summarize(&values.metastatic_sites),
                mouse_count: values.tumor_volumes.len(),
                key,
            })
            .collect();

        info!(groups = records.len(), "aggregated trial data");
        records
    }

    /// Percent change from `first` to `last`.
    pub fn percent_change(first: f64, last: f64) -> f64 {
        100.0 * (last / first - 1.0)
    }
}
