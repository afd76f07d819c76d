//! Charts module - Chart models and rendering

mod plotter;
mod renderer;

pub use plotter::{
    BarChart, ChangeBar, ChangeOutcome, ChartError, ChartKind, ChartPlotter, ChartSet, GridLines,
    LegendPosition, LineChart, SeriesPoint, TimeChart, TimeSeries, GROWING_COLOR, SHRINKING_COLOR,
};
pub use renderer::{RenderError, StaticChartRenderer};
