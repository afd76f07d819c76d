//! CSV Data Loader Module
//! Loads the mouse-drug and clinical trial tables using Polars and coerces their column types.

use crate::config::ColumnNames;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Input file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to load CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },
    #[error("{path}: required column '{column}' is missing")]
    MissingColumn { path: PathBuf, column: String },
    #[error("{path}: column '{column}' contains a value that is not {expected}")]
    Malformed {
        path: PathBuf,
        column: String,
        expected: &'static str,
    },
    #[error("{path}: column '{column}' has {count} empty cell(s)")]
    MissingValue {
        path: PathBuf,
        column: String,
        count: usize,
    },
}

/// Loads the two source tables of a trial.
pub struct DataLoader<'a> {
    columns: &'a ColumnNames,
}

impl<'a> DataLoader<'a> {
    pub fn new(columns: &'a ColumnNames) -> Self {
        Self { columns }
    }

    /// Load the per-mouse drug assignment table.
    ///
    /// Output columns: [mouse_id: String, treatment: String]
    pub fn load_mouse_drug(&self, path: &Path) -> Result<DataFrame, LoaderError> {
        let raw = Self::read_csv(path)?;
        let columns = vec![
            Self::typed_column(&raw, path, &self.columns.mouse_id, ColumnKind::Text)?,
            Self::typed_column(&raw, path, &self.columns.treatment, ColumnKind::Text)?,
        ];
        let df = DataFrame::new(columns).map_err(|source| Self::csv_error(path, source))?;

        info!(path = %path.display(), rows = df.height(), "loaded mouse drug data");
        debug!("mouse drug preview:\n{}", df.head(Some(5)));
        Ok(df)
    }

    /// Load the per-timepoint clinical measurements table.
    ///
    /// Output columns: [mouse_id: String, timepoint: Int64, tumor_volume: Float64,
    /// metastatic_sites: Int64]
    pub fn load_clinical(&self, path: &Path) -> Result<DataFrame, LoaderError> {
        let raw = Self::read_csv(path)?;
        let columns = vec![
            Self::typed_column(&raw, path, &self.columns.mouse_id, ColumnKind::Text)?,
            Self::typed_column(&raw, path, &self.columns.timepoint, ColumnKind::Integer)?,
            Self::typed_column(&raw, path, &self.columns.tumor_volume, ColumnKind::Float)?,
            Self::typed_column(&raw, path, &self.columns.metastatic_sites, ColumnKind::Integer)?,
        ];
        let df = DataFrame::new(columns).map_err(|source| Self::csv_error(path, source))?;

        info!(path = %path.display(), rows = df.height(), "loaded clinical trial data");
        debug!("clinical trial preview:\n{}", df.head(Some(5)));
        Ok(df)
    }

    fn read_csv(path: &Path) -> Result<DataFrame, LoaderError> {
        if !path.is_file() {
            return Err(LoaderError::NotFound(path.to_path_buf()));
        }

        LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .finish()
            .and_then(|lazy| lazy.collect())
            .map_err(|source| Self::csv_error(path, source))
    }

    /// Select a required column and cast it strictly, so unparsable cells fail the load.
    fn typed_column(
        df: &DataFrame,
        path: &Path,
        name: &str,
        kind: ColumnKind,
    ) -> Result<Column, LoaderError> {
        let column = df.column(name).map_err(|_| LoaderError::MissingColumn {
            path: path.to_path_buf(),
            column: name.to_string(),
        })?;

        let series = column
            .as_materialized_series()
            .strict_cast(&kind.dtype())
            .map_err(|_| LoaderError::Malformed {
                path: path.to_path_buf(),
                column: name.to_string(),
                expected: kind.describe(),
            })?;

        if kind != ColumnKind::Text && series.null_count() > 0 {
            return Err(LoaderError::MissingValue {
                path: path.to_path_buf(),
                column: name.to_string(),
                count: series.null_count(),
            });
        }

        Ok(Column::from(series))
    }

    fn csv_error(path: &Path, source: PolarsError) -> LoaderError {
        LoaderError::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Text,
    Integer,
    Float,
}

impl ColumnKind {
    fn dtype(self) -> DataType {
        match self {
            ColumnKind::Text => DataType::String,
            ColumnKind::Integer => DataType::Int64,
            ColumnKind::Float => DataType::Float64,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            ColumnKind::Text => "text",
            ColumnKind::Integer => "an integer",
            ColumnKind::Float => "a number",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_clinical_types() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "clinical.csv",
            "Mouse ID,Timepoint,Tumor Volume (mm3),Metastatic Sites\n\
             b128,0,45.0,0\n\
             b128,5,45.651331,0\n\
             f932,0,45,1\n",
        );
        let columns = ColumnNames::default();
        let df = DataLoader::new(&columns).load_clinical(&path).unwrap();

        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 4);
        assert_eq!(df.column("Timepoint").unwrap().dtype(), &DataType::Int64);
        assert_eq!(
            df.column("Tumor Volume (mm3)").unwrap().dtype(),
            &DataType::Float64
        );
        assert_eq!(df.column("Metastatic Sites").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_load_mouse_drug_keeps_only_required_columns() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "mice.csv",
            "Mouse ID,Drug,Sex\nb128,Capomulin,F\nf932,Ketapril,M\n",
        );
        let columns = ColumnNames::default();
        let df = DataLoader::new(&columns).load_mouse_drug(&path).unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 2);
        assert_eq!(df.column("Drug").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let columns = ColumnNames::default();
        let err = DataLoader::new(&columns)
            .load_clinical(Path::new("does/not/exist.csv"))
            .unwrap_err();
        assert!(matches!(err, LoaderError::NotFound(_)));
    }

    #[test]
    fn test_missing_column_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "mice.csv", "Mouse ID,Treatment\nb128,Capomulin\n");
        let columns = ColumnNames::default();
        let err = DataLoader::new(&columns).load_mouse_drug(&path).unwrap_err();
        assert!(matches!(err, LoaderError::MissingColumn { ref column, .. } if column == "Drug"));
    }

    #[test]
    fn test_malformed_number_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "clinical.csv",
            "Mouse ID,Timepoint,Tumor Volume (mm3),Metastatic Sites\n\
             b128,0,45.0,0\n\
             b128,5,large,0\n",
        );
        let columns = ColumnNames::default();
        let err = DataLoader::new(&columns).load_clinical(&path).unwrap_err();
        assert!(
            matches!(err, LoaderError::Malformed { ref column, .. } if column == "Tumor Volume (mm3)")
        );
    }

    #[test]
    fn test_empty_measurement_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "clinical.csv",
            "Mouse ID,Timepoint,Tumor Volume (mm3),Metastatic Sites\n\
             b128,0,45.0,0\n\
             b128,5,,0\n",
        );
        let columns = ColumnNames::default();
        let err = DataLoader::new(&columns).load_clinical(&path).unwrap_err();
        assert!(matches!(err, LoaderError::MissingValue { count: 1, .. }));
    }
}
