//! Chart Plotter Module
//! Builds chart models (series, error bars, bars) from the wide trial tables.

use crate::config::{Marker, MissingTreatmentPolicy, TreatmentStyle, TrialConfig};
use crate::data::{TrialTables, WideTable};
use crate::stats::StatsCalculator;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Bar colour for treatments that shrank the tumor.
pub const SHRINKING_COLOR: [u8; 3] = [0, 128, 0];
/// Bar colour for treatments where the tumor held or grew.
pub const GROWING_COLOR: [u8; 3] = [255, 0, 0];

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Treatment '{treatment}' has no data for the {chart} chart")]
    MissingTreatment { treatment: String, chart: &'static str },
    #[error("Tumor change for '{treatment}' is undefined: first mean volume is {baseline}")]
    UndefinedChange { treatment: String, baseline: f64 },
}

/// The four charts produced for a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    TumorResponse,
    MetastaticSpread,
    Survival,
    TumorChange,
}

impl ChartKind {
    pub const ALL: [ChartKind; 4] = [
        ChartKind::TumorResponse,
        ChartKind::MetastaticSpread,
        ChartKind::Survival,
        ChartKind::TumorChange,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            ChartKind::TumorResponse => "treatment_graph.png",
            ChartKind::MetastaticSpread => "metastatic_spread_graph.png",
            ChartKind::Survival => "survival_graph.png",
            ChartKind::TumorChange => "tumor_change.png",
        }
    }

    fn name(self) -> &'static str {
        match self {
            ChartKind::TumorResponse => "tumor response",
            ChartKind::MetastaticSpread => "metastatic spread",
            ChartKind::Survival => "survival",
            ChartKind::TumorChange => "tumor change",
        }
    }
}

/// The charts drawn against the timepoint axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeChart {
    TumorResponse,
    MetastaticSpread,
    Survival,
}

impl TimeChart {
    pub fn kind(self) -> ChartKind {
        match self {
            TimeChart::TumorResponse => ChartKind::TumorResponse,
            TimeChart::MetastaticSpread => ChartKind::MetastaticSpread,
            TimeChart::Survival => ChartKind::Survival,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendPosition {
    UpperLeft,
    LowerLeft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridLines {
    Horizontal,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub timepoint: i64,
    pub value: f64,
    /// Half-height of the error bar; `None` when there is no finite error.
    pub error: Option<f64>,
}

/// One treatment line on a time chart.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub treatment: String,
    pub color: [u8; 3],
    pub marker: Marker,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone)]
pub struct LineChart {
    pub kind: ChartKind,
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub axis: Vec<i64>,
    /// Fixed y range; computed from the data when `None`.
    pub y_range: Option<(f64, f64)>,
    pub legend: LegendPosition,
    pub grid: GridLines,
    pub series: Vec<TimeSeries>,
}

impl LineChart {
    pub fn x_range(&self) -> (f64, f64) {
        let first = self.axis.first().copied().unwrap_or(0) as f64;
        let last = self.axis.last().copied().unwrap_or(0) as f64;
        let pad = ((last - first) * 0.05).max(1.0);
        (first - pad, last + pad)
    }

    pub fn y_range(&self) -> (f64, f64) {
        if let Some(range) = self.y_range {
            return range;
        }

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for point in self.series.iter().flat_map(|s| s.points.iter()) {
            let error = point.error.unwrap_or(0.0);
            min = min.min(point.value - error);
            max = max.max(point.value + error);
        }
        if !min.is_finite() || !max.is_finite() {
            return (0.0, 1.0);
        }
        let pad = ((max - min) * 0.1).max(0.5);
        (min - pad, max + pad)
    }
}

/// Sign class of a percent change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOutcome {
    Shrinking,
    Growing,
}

impl ChangeOutcome {
    pub fn of(percent: f64) -> Self {
        if percent < 0.0 {
            ChangeOutcome::Shrinking
        } else {
            ChangeOutcome::Growing
        }
    }

    pub fn color(self) -> [u8; 3] {
        match self {
            ChangeOutcome::Shrinking => SHRINKING_COLOR,
            ChangeOutcome::Growing => GROWING_COLOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeBar {
    pub treatment: String,
    pub percent: f64,
    pub outcome: ChangeOutcome,
}

impl ChangeBar {
    /// Bar label, the integer part of the percentage.
    pub fn label(&self) -> String {
        format!("{}%", self.percent.trunc() as i64)
    }
}

#[derive(Debug, Clone)]
pub struct BarChart {
    pub title: String,
    pub y_desc: String,
    pub bars: Vec<ChangeBar>,
}

impl BarChart {
    pub fn y_range(&self) -> (f64, f64) {
        let finite = || self.bars.iter().map(|b| b.percent).filter(|p| p.is_finite());
        let min = finite().fold(0.0, f64::min);
        let max = finite().fold(0.0, f64::max);
        let pad = ((max - min) * 0.15).max(5.0);
        (min - pad, max + pad)
    }
}

/// All charts of one trial.
#[derive(Debug, Clone)]
pub struct ChartSet {
    pub tumor_response: LineChart,
    pub metastatic_spread: LineChart,
    pub survival: LineChart,
    pub tumor_change: BarChart,
}

/// Creates chart models from trial tables and the configured treatment list.
pub struct ChartPlotter<'a> {
    config: &'a TrialConfig,
}

impl<'a> ChartPlotter<'a> {
    pub fn new(config: &'a TrialConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, tables: &TrialTables) -> Result<ChartSet, ChartError> {
        let tumor_response = self.line_chart(
            TimeChart::TumorResponse,
            &tables.tumor_mean,
            Some(&tables.tumor_sem),
        )?;

        let metastatic_spread = self.line_chart(
            TimeChart::MetastaticSpread,
            &tables.sites_mean,
            Some(&tables.sites_sem),
        )?;

        let survival = if self.config.charts.survival_as_percent {
            let rates = tables.mouse_count.as_percent_of_first();
            LineChart {
                y_desc: "Survival Rate (%)".to_string(),
                ..self.line_chart(TimeChart::Survival, &rates, None)?
            }
        } else {
            self.line_chart(TimeChart::Survival, &tables.mouse_count, None)?
        };

        let (bars, last_day) = self.change_bars(&tables.tumor_mean)?;
        let last_day = last_day
            .or_else(|| self.config.charts.timepoints.last().copied())
            .unwrap_or(0);
        let tumor_change = BarChart {
            title: format!("Tumor Change over {last_day} Day Treatment"),
            y_desc: "% Tumor Volume Change".to_string(),
            bars,
        };

        Ok(ChartSet {
            tumor_response,
            metastatic_spread,
            survival,
            tumor_change,
        })
    }

    fn line_chart(
        &self,
        chart: TimeChart,
        values: &WideTable,
        errors: Option<&WideTable>,
    ) -> Result<LineChart, ChartError> {
        let kind = chart.kind();
        let mut series = Vec::with_capacity(self.config.treatments.len());
        for style in &self.config.treatments {
            if !self.check_treatment(values, style, kind)? {
                continue;
            }
            series.push(self.time_series(style, values, errors));
        }

        let (title, x_desc, y_desc, legend, grid, y_range) = match chart {
            TimeChart::TumorResponse => (
                "Tumor Response to Treatment",
                "Time (Days)",
                "Tumor Volume (mm3)",
                LegendPosition::UpperLeft,
                GridLines::Horizontal,
                None,
            ),
            TimeChart::MetastaticSpread => (
                "Metastatic Spread During Treatment",
                "Treatment Duration (Days)",
                "Met. Sites",
                LegendPosition::UpperLeft,
                GridLines::Horizontal,
                Some((-0.3, 3.75)),
            ),
            TimeChart::Survival => (
                "Survival During Treatment",
                "Time (Days)",
                "Survival Rate",
                LegendPosition::LowerLeft,
                GridLines::Both,
                None,
            ),
        };

        Ok(LineChart {
            kind,
            title: title.to_string(),
            x_desc: x_desc.to_string(),
            y_desc: y_desc.to_string(),
            axis: self.config.charts.timepoints.clone(),
            y_range,
            legend,
            grid,
            series,
        })
    }

    /// Points on the configured axis; timepoints without a value are left out.
    fn time_series(
        &self,
        style: &TreatmentStyle,
        values: &WideTable,
        errors: Option<&WideTable>,
    ) -> TimeSeries {
        let points = self
            .config
            .charts
            .timepoints
            .iter()
            .filter_map(|&tp| {
                let value = values.get(tp, &style.name)?;
                let error = errors
                    .and_then(|e| e.get(tp, &style.name))
                    .filter(|e| e.is_finite());
                Some(SeriesPoint {
                    timepoint: tp,
                    value,
                    error,
                })
            })
            .collect();

        TimeSeries {
            treatment: style.name.clone(),
            color: style.color,
            marker: style.marker,
            points,
        }
    }

    /// One bar per drawable treatment, plus the last day measured among them.
    fn change_bars(
        &self,
        tumor_mean: &WideTable,
    ) -> Result<(Vec<ChangeBar>, Option<i64>), ChartError> {
        let mut bars = Vec::with_capacity(self.config.treatments.len());
        let mut last_day = None;
        for style in &self.config.treatments {
            if !self.check_treatment(tumor_mean, style, ChartKind::TumorChange)? {
                continue;
            }
            let Some(((_, first), (day, last))) = tumor_mean.first_and_last(&style.name) else {
                continue;
            };

            let percent = StatsCalculator::percent_change(first, last);
            if !percent.is_finite() {
                match self.config.charts.missing_treatment {
                    MissingTreatmentPolicy::Fail => {
                        return Err(ChartError::UndefinedChange {
                            treatment: style.name.clone(),
                            baseline: first,
                        })
                    }
                    MissingTreatmentPolicy::Skip => {
                        warn!(treatment = %style.name, baseline = first, "tumor change undefined, skipped");
                        continue;
                    }
                }
            }

            last_day = last_day.max(Some(day));
            bars.push(ChangeBar {
                treatment: style.name.clone(),
                percent,
                outcome: ChangeOutcome::of(percent),
            });
        }
        Ok((bars, last_day))
    }

    /// Apply the missing-treatment policy. Returns whether the treatment should be drawn.
    fn check_treatment(
        &self,
        table: &WideTable,
        style: &TreatmentStyle,
        kind: ChartKind,
    ) -> Result<bool, ChartError> {
        if table.has_treatment(&style.name) {
            return Ok(true);
        }
        match self.config.charts.missing_treatment {
            MissingTreatmentPolicy::Fail => Err(ChartError::MissingTreatment {
                treatment: style.name.clone(),
                chart: kind.name(),
            }),
            MissingTreatmentPolicy::Skip => {
                warn!(treatment = %style.name, chart = kind.name(), "treatment has no data, skipped");
                Ok(false)
            }
        }
    }
}
