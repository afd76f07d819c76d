//! Data module - CSV loading, joining and reshaping

mod joiner;
mod loader;
mod processor;

pub use joiner::{JoinError, TrialJoiner};
pub use loader::{DataLoader, LoaderError};
pub use processor::{DataProcessor, Metric, TrialTables, WideTable};

/// One clinical measurement with the drug assigned to its mouse.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialRow {
    pub mouse_id: String,
    /// `None` when the mouse has no entry in the mouse-drug table.
    pub treatment: Option<String>,
    pub timepoint: i64,
    pub tumor_volume: f64,
    pub metastatic_sites: i64,
}
