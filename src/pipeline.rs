//! Trial pipeline - load, join, aggregate, reshape, chart.

use crate::charts::{ChartError, ChartKind, ChartPlotter, ChartSet, RenderError, StaticChartRenderer};
use crate::config::TrialConfig;
use crate::data::{DataLoader, JoinError, LoaderError, TrialJoiner, TrialTables};
use crate::stats::{AggregateRecord, StatsCalculator};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Join(#[from] JoinError),
    #[error(transparent)]
    Chart(#[from] ChartError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("Failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything computed for a trial before rendering.
#[derive(Debug, Clone)]
pub struct TrialAnalysis {
    pub clinical_rows: usize,
    pub joined_rows: usize,
    pub untreated_rows: usize,
    pub records: Vec<AggregateRecord>,
    pub tables: TrialTables,
    pub charts: ChartSet,
}

#[derive(Debug, Clone, Serialize)]
pub struct PercentChange {
    pub treatment: String,
    pub percent: f64,
}

/// Outcome of a full run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub rows: usize,
    pub groups: usize,
    pub charts: Vec<PathBuf>,
    pub percent_changes: Vec<PercentChange>,
}

/// Main pipeline
pub struct Pipeline {
    config: TrialConfig,
}

impl Pipeline {
    pub fn new(config: TrialConfig) -> Self {
        Self { config }
    }

    /// Load, join, aggregate, reshape and build the chart models.
    pub fn analyze(&self) -> Result<TrialAnalysis, PipelineError> {
        let columns = &self.config.columns;
        let loader = DataLoader::new(columns);
        let mouse_drug = loader.load_mouse_drug(&self.config.input.mouse_drug)?;
        let clinical = loader.load_clinical(&self.config.input.clinical_trial)?;

        let joiner = TrialJoiner::new(columns);
        let joined = joiner.merge(&clinical, &mouse_drug)?;
        let rows = joiner.trial_rows(&joined)?;
        let untreated_rows = rows.iter().filter(|r| r.treatment.is_none()).count();

        let records = StatsCalculator::aggregate(&rows);
        let tables = TrialTables::from_records(&records);
        for table in tables.iter() {
            match table.to_dataframe(&columns.timepoint) {
                Ok(df) => debug!(
                    cells = table.cell_count(),
                    "{}:\n{}",
                    table.metric().label(),
                    df.head(Some(5))
                ),
                Err(e) => debug!(error = %e, "table preview unavailable"),
            }
        }

        let charts = ChartPlotter::new(&self.config).build(&tables)?;

        Ok(TrialAnalysis {
            clinical_rows: clinical.height(),
            joined_rows: rows.len(),
            untreated_rows,
            records,
            tables,
            charts,
        })
    }

    /// Run the whole pipeline and write the chart images.
    pub fn run(&self) -> Result<PipelineReport, PipelineError> {
        StaticChartRenderer::check_fonts()?;
        let analysis = self.analyze()?;

        let output = &self.config.output;
        std::fs::create_dir_all(&output.directory).map_err(|source| PipelineError::OutputDir {
            path: output.directory.clone(),
            source,
        })?;

        let renderer = StaticChartRenderer::new(output.width, output.height);
        let mut written = Vec::with_capacity(ChartKind::ALL.len());
        for (kind, image) in renderer.render_all(&analysis.charts)? {
            let path = output.directory.join(kind.file_name());
            StaticChartRenderer::save(&image, &path)?;
            info!(path = %path.display(), "chart written");
            written.push(path);
        }

        if output.show {
            for path in &written {
                if let Err(e) = open::that(path) {
                    warn!(path = %path.display(), error = %e, "could not open chart");
                }
            }
        }

        let percent_changes = analysis
            .charts
            .tumor_change
            .bars
            .iter()
            .map(|bar| PercentChange {
                treatment: bar.treatment.clone(),
                percent: bar.percent,
            })
            .collect();

        Ok(PipelineReport {
            rows: analysis.joined_rows,
            groups: analysis.records.len(),
            charts: written,
            percent_changes,
        })
    }
}
