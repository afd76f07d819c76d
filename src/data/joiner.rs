//! Trial Joiner Module
//! Left-joins the clinical table with the mouse-drug table and materializes trial rows.

use super::TrialRow;
use crate::config::ColumnNames;
use polars::prelude::*;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum JoinError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Join produced {joined} rows from {clinical} clinical rows")]
    RowCountMismatch { clinical: usize, joined: usize },
    #[error("Joined row {row} has no value in column '{column}'")]
    MissingValue { row: usize, column: String },
}

/// Combines the two source tables into one trial dataset.
pub struct TrialJoiner<'a> {
    columns: &'a ColumnNames,
}

impl<'a> TrialJoiner<'a> {
    pub fn new(columns: &'a ColumnNames) -> Self {
        Self { columns }
    }

    /// Left join on the mouse identifier.
    ///
    /// Every clinical row is kept; mice without a drug assignment get a null treatment.
    pub fn merge(&self, clinical: &DataFrame, mouse_drug: &DataFrame) -> Result<DataFrame, JoinError> {
        let key = self.columns.mouse_id.as_str();
        let assignments = self.first_assignments(mouse_drug)?;

        let joined = clinical
            .clone()
            .lazy()
            .join(
                assignments.lazy(),
                [col(key)],
                [col(key)],
                JoinArgs::new(JoinType::Left),
            )
            .collect()?;

        if joined.height() != clinical.height() {
            return Err(JoinError::RowCountMismatch {
                clinical: clinical.height(),
                joined: joined.height(),
            });
        }

        let unmatched = joined.column(&self.columns.treatment)?.null_count();
        if unmatched > 0 {
            warn!(rows = unmatched, "clinical rows without a drug assignment");
        }
        info!(rows = joined.height(), "combined trial data");
        debug!("combined preview:\n{}", joined.head(Some(5)));
        Ok(joined)
    }

    /// Keep the first drug assignment of every mouse.
    fn first_assignments(&self, mouse_drug: &DataFrame) -> Result<DataFrame, JoinError> {
        let ids = mouse_drug.column(&self.columns.mouse_id)?.str()?;
        let drugs = mouse_drug.column(&self.columns.treatment)?.str()?;

        let mut seen = HashSet::new();
        let mut kept_ids: Vec<Option<String>> = Vec::new();
        let mut kept_drugs: Vec<Option<String>> = Vec::new();

        for (id, drug) in ids.into_iter().zip(drugs.into_iter()) {
            if let Some(id) = id {
                if !seen.insert(id) {
                    warn!(mouse = id, drug = ?drug, "duplicate mouse assignment ignored");
                    continue;
                }
            }
            kept_ids.push(id.map(str::to_string));
            kept_drugs.push(drug.map(str::to_string));
        }

        let df = DataFrame::new(vec![
            Column::new(self.columns.mouse_id.as_str().into(), kept_ids),
            Column::new(self.columns.treatment.as_str().into(), kept_drugs),
        ])?;
        Ok(df)
    }

    /// Convert the joined frame into trial rows.
    pub fn trial_rows(&self, joined: &DataFrame) -> Result<Vec<TrialRow>, JoinError> {
        let ids = joined.column(&self.columns.mouse_id)?.str()?;
        let drugs = joined.column(&self.columns.treatment)?.str()?;
        let timepoints = joined.column(&self.columns.timepoint)?.i64()?;
        let volumes = joined.column(&self.columns.tumor_volume)?.f64()?;
        let sites = joined.column(&self.columns.metastatic_sites)?.i64()?;

        let missing = |row: usize, column: &String| JoinError::MissingValue {
            row,
            column: column.clone(),
        };

        let mut rows = Vec::with_capacity(joined.height());
        for (row, ((((id, drug), timepoint), volume), sites)) in ids
            .into_iter()
            .zip(drugs.into_iter())
            .zip(timepoints.into_iter())
            .zip(volumes.into_iter())
            .zip(sites.into_iter())
            .enumerate()
        {
            rows.push(TrialRow {
                mouse_id: id.ok_or_else(|| missing(row, &self.columns.mouse_id))?.to_string(),
                treatment: drug.map(str::to_string),
                timepoint: timepoint.ok_or_else(|| missing(row, &self.columns.timepoint))?,
                tumor_volume: volume.ok_or_else(|| missing(row, &self.columns.tumor_volume))?,
                metastatic_sites: sites
                    .ok_or_else(|| missing(row, &self.columns.metastatic_sites))?,
            });
        }

        Ok(rows)
    }
}
