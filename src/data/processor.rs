//! Data Processor Module
//! Pivots long-form aggregate records into wide tables (timepoint x treatment) and back.

use crate::stats::{AggregateRecord, GroupKey};
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Scalar picked out of an aggregate record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    TumorVolumeMean,
    TumorVolumeSem,
    MetastaticSitesMean,
    MetastaticSitesSem,
    MouseCount,
}

impl Metric {
    pub fn label(self) -> &'static str {
        match self {
            Metric::TumorVolumeMean => "Mean Tumor Volume (mm3)",
            Metric::TumorVolumeSem => "SEM Tumor Volume (mm3)",
            Metric::MetastaticSitesMean => "Mean Metastatic Sites",
            Metric::MetastaticSitesSem => "SEM Metastatic Sites",
            Metric::MouseCount => "Mouse Count",
        }
    }

    fn value(self, record: &AggregateRecord) -> f64 {
        match self {
            Metric::TumorVolumeMean => record.tumor_volume.mean,
            Metric::TumorVolumeSem => record.tumor_volume.sem,
            Metric::MetastaticSitesMean => record.metastatic_sites.mean,
            Metric::MetastaticSitesSem => record.metastatic_sites.sem,
            Metric::MouseCount => record.mouse_count as f64,
        }
    }
}

/// Wide form of one metric: timepoint -> treatment -> value.
///
/// Missing (treatment, timepoint) combinations are absent cells.
#[derive(Debug, Clone, PartialEq)]
pub struct WideTable {
    metric: Metric,
    cells: BTreeMap<i64, BTreeMap<String, f64>>,
}

impl WideTable {
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            cells: BTreeMap::new(),
        }
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn insert(&mut self, timepoint: i64, treatment: &str, value: f64) {
        self.cells
            .entry(timepoint)
            .or_default()
            .insert(treatment.to_string(), value);
    }

    pub fn get(&self, timepoint: i64, treatment: &str) -> Option<f64> {
        self.cells.get(&timepoint)?.get(treatment).copied()
    }

    /// Row index, ascending.
    pub fn timepoints(&self) -> Vec<i64> {
        self.cells.keys().copied().collect()
    }

    /// Column names, sorted.
    pub fn treatments(&self) -> Vec<String> {
        let names: BTreeSet<&String> = self.cells.values().flat_map(|row| row.keys()).collect();
        names.into_iter().cloned().collect()
    }

    pub fn has_treatment(&self, treatment: &str) -> bool {
        self.cells.values().any(|row| row.contains_key(treatment))
    }

    /// Present cells of one treatment column, ordered by timepoint.
    pub fn column(&self, treatment: &str) -> Vec<(i64, f64)> {
        self.cells
            .iter()
            .filter_map(|(tp, row)| row.get(treatment).map(|v| (*tp, *v)))
            .collect()
    }

    /// First and last present cell of a treatment column, as (timepoint, value).
    pub fn first_and_last(&self, treatment: &str) -> Option<((i64, f64), (i64, f64))> {
        let column = self.column(treatment);
        let first = *column.first()?;
        let last = *column.last()?;
        Some((first, last))
    }

    pub fn cell_count(&self) -> usize {
        self.cells.values().map(|row| row.len()).sum()
    }

    /// Rescale every column to a percentage of its first present value.
    pub fn as_percent_of_first(&self) -> WideTable {
        let mut scaled = WideTable::new(self.metric);
        for treatment in self.treatments() {
            let column = self.column(&treatment);
            let Some(&(_, base)) = column.first() else {
                continue;
            };
            for (tp, value) in column {
                scaled.insert(tp, &treatment, 100.0 * value / base);
            }
        }
        scaled
    }

    /// Render as a data frame: timepoint column plus one nullable column per treatment.
    pub fn to_dataframe(&self, index_name: &str) -> PolarsResult<DataFrame> {
        let timepoints = self.timepoints();
        let mut columns = vec![Column::new(index_name.into(), timepoints.clone())];

        for treatment in self.treatments() {
            let values: Vec<Option<f64>> = timepoints
                .iter()
                .map(|tp| self.get(*tp, &treatment))
                .collect();
            columns.push(Column::new(treatment.as_str().into(), values));
        }

        DataFrame::new(columns)
    }
}

/// The wide tables used for charting, built from one aggregation.
#[derive(Debug, Clone)]
pub struct TrialTables {
    pub tumor_mean: WideTable,
    pub tumor_sem: WideTable,
    pub sites_mean: WideTable,
    pub sites_sem: WideTable,
    pub mouse_count: WideTable,
}

impl TrialTables {
    pub fn from_records(records: &[AggregateRecord]) -> Self {
        Self {
            tumor_mean: DataProcessor::pivot(records, Metric::TumorVolumeMean),
            tumor_sem: DataProcessor::pivot(records, Metric::TumorVolumeSem),
            sites_mean: DataProcessor::pivot(records, Metric::MetastaticSitesMean),
            sites_sem: DataProcessor::pivot(records, Metric::MetastaticSitesSem),
            mouse_count: DataProcessor::pivot(records, Metric::MouseCount),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &WideTable> {
        [
            &self.tumor_mean,
            &self.tumor_sem,
            &self.sites_mean,
            &self.sites_sem,
            &self.mouse_count,
        ]
        .into_iter()
    }
}

/// Handles long <-> wide reshaping.
pub struct DataProcessor;

impl DataProcessor {
    /// Pivot records to wide form for one metric.
    pub fn pivot(records: &[AggregateRecord], metric: Metric) -> WideTable {
        let mut table = WideTable::new(metric);
        for record in records {
            table.insert(
                record.key.timepoint,
                &record.key.treatment,
                metric.value(record),
            );
        }
        table
    }

    /// Stack a wide table back to long form, one entry per present cell.
    ///
    /// Output is ordered by group key.
    pub fn unpivot(table: &WideTable) -> Vec<(GroupKey, f64)> {
        let mut long: Vec<(GroupKey, f64)> = table
            .cells
            .iter()
            .flat_map(|(tp, row)| {
                row.iter()
                    .map(move |(treatment, value)| (GroupKey::new(treatment.as_str(), *tp), *value))
            })
            .collect();
        long.sort_by(|a, b| a.0.cmp(&b.0));
        long
    }

    /// Rebuild a wide table from long-form entries.
    pub fn from_long(metric: Metric, long: &[(GroupKey, f64)]) -> WideTable {
        let mut table = WideTable::new(metric);
        for (key, value) in long {
            table.insert(key.timepoint, &key.treatment, *value);
        }
        table
    }
}
