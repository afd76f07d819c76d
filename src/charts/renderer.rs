//! Static Chart Renderer
//! Draws chart models into RGB images with plotters and writes them as PNG.
//!
//! Layout follows the trial report:
//! 1. Time charts: dashed line per treatment, marker per timepoint, vertical error bars
//! 2. Change chart: one bar per treatment, green when the tumor shrank, red otherwise,
//!    labelled with the integer percentage

use super::plotter::{BarChart, ChartKind, ChartSet, GridLines, LegendPosition, LineChart};
use crate::config::Marker;
use image::{ImageFormat, RgbImage};
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;
use thiserror::Error;

const FONT: &str = "sans-serif";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Drawing failed: {0}")]
    Drawing(String),
    #[error("No usable sans-serif font for chart text: {0}")]
    Font(String),
    #[error("Pixel buffer does not fit a {width}x{height} image")]
    Buffer { width: u32, height: u32 },
    #[error("Failed to write image: {0}")]
    Image(#[from] image::ImageError),
}

fn drawing<E: std::fmt::Display>(err: E) -> RenderError {
    RenderError::Drawing(err.to_string())
}

fn rgb(color: [u8; 3]) -> RGBColor {
    RGBColor(color[0], color[1], color[2])
}

type TimeChartContext<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

pub struct StaticChartRenderer {
    width: u32,
    height: u32,
}

impl StaticChartRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Check that chart text can be laid out with the system font.
    pub fn check_fonts() -> Result<(), RenderError> {
        (FONT, 12)
            .into_font()
            .box_size("0%")
            .map(|_| ())
            .map_err(|e| RenderError::Font(e.to_string()))
    }

    /// Render every chart of the set, in [`ChartKind::ALL`] order.
    pub fn render_all(&self, charts: &ChartSet) -> Result<Vec<(ChartKind, RgbImage)>, RenderError> {
        let mut images = Vec::with_capacity(ChartKind::ALL.len());
        for kind in ChartKind::ALL {
            let image = match kind {
                ChartKind::TumorResponse => self.render_line_chart(&charts.tumor_response)?,
                ChartKind::MetastaticSpread => self.render_line_chart(&charts.metastatic_spread)?,
                ChartKind::Survival => self.render_line_chart(&charts.survival)?,
                ChartKind::TumorChange => self.render_bar_chart(&charts.tumor_change)?,
            };
            images.push((kind, image));
        }
        Ok(images)
    }

    pub fn render_line_chart(&self, chart: &LineChart) -> Result<RgbImage, RenderError> {
        let mut buffer = self.blank_buffer();
        {
            let root =
                BitMapBackend::with_buffer(&mut buffer, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE).map_err(drawing)?;

            let (x_min, x_max) = chart.x_range();
            let (y_min, y_max) = chart.y_range();
            let mut ctx = ChartBuilder::on(&root)
                .margin(20)
                .caption(chart.title.as_str(), (FONT, 22))
                .x_label_area_size(45)
                .y_label_area_size(60)
                .build_cartesian_2d(x_min..x_max, y_min..y_max)
                .map_err(drawing)?;

            let x_fmt = |x: &f64| format!("{x:.0}");
            let mut mesh = ctx.configure_mesh();
            mesh.x_desc(chart.x_desc.as_str())
                .y_desc(chart.y_desc.as_str())
                .x_labels(chart.axis.len())
                .x_label_formatter(&x_fmt);
            if chart.grid == GridLines::Horizontal {
                mesh.disable_x_mesh();
            }
            mesh.draw().map_err(drawing)?;

            for series in &chart.series {
                let color = rgb(series.color);
                let points: Vec<(f64, f64)> = series
                    .points
                    .iter()
                    .map(|p| (p.timepoint as f64, p.value))
                    .collect();

                ctx.draw_series(DashedLineSeries::new(
                    points.clone(),
                    6,
                    4,
                    color.stroke_width(1),
                ))
                .map_err(drawing)?
                .label(series.treatment.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x - 8, y), (x + 8, y)], color.stroke_width(2)));

                ctx.draw_series(series.points.iter().filter_map(|p| {
                    let error = p.error?;
                    Some(ErrorBar::new_vertical(
                        p.timepoint as f64,
                        p.value - error,
                        p.value,
                        p.value + error,
                        color.stroke_width(1),
                        6,
                    ))
                }))
                .map_err(drawing)?;

                Self::draw_markers(&mut ctx, &points, series.marker, color)?;
            }

            let position = match chart.legend {
                LegendPosition::UpperLeft => SeriesLabelPosition::UpperLeft,
                LegendPosition::LowerLeft => SeriesLabelPosition::LowerLeft,
            };
            ctx.configure_series_labels()
                .position(position)
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .draw()
                .map_err(drawing)?;

            root.present().map_err(drawing)?;
        }
        self.to_image(buffer)
    }

    pub fn render_bar_chart(&self, chart: &BarChart) -> Result<RgbImage, RenderError> {
        let mut buffer = self.blank_buffer();
        {
            let root =
                BitMapBackend::with_buffer(&mut buffer, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE).map_err(drawing)?;

            let slots = chart.bars.len().max(1);
            let (y_min, y_max) = chart.y_range();
            let mut ctx = ChartBuilder::on(&root)
                .margin(20)
                .caption(chart.title.as_str(), (FONT, 22))
                .x_label_area_size(40)
                .y_label_area_size(60)
                .build_cartesian_2d(-0.5..(slots as f64 - 0.5), y_min..y_max)
                .map_err(drawing)?;

            // Bars sit on integer x positions; only those get a treatment label
            let x_fmt = |x: &f64| {
                let idx = x.round();
                if (x - idx).abs() > 1e-6 || idx < 0.0 {
                    return String::new();
                }
                chart
                    .bars
                    .get(idx as usize)
                    .map(|bar| bar.treatment.clone())
                    .unwrap_or_default()
            };
            ctx.configure_mesh()
                .x_labels(slots)
                .x_label_formatter(&x_fmt)
                .y_desc(chart.y_desc.as_str())
                .draw()
                .map_err(drawing)?;

            ctx.draw_series(chart.bars.iter().enumerate().map(|(i, bar)| {
                let x = i as f64;
                Rectangle::new(
                    [(x - 0.4, 0.0), (x + 0.4, bar.percent)],
                    rgb(bar.outcome.color()).filled(),
                )
            }))
            .map_err(drawing)?;

            ctx.draw_series(LineSeries::new(
                vec![(-0.5, 0.0), (slots as f64 - 0.5, 0.0)],
                &BLACK,
            ))
            .map_err(drawing)?;

            let offset = (y_max - y_min) * 0.04;
            let label_style = (FONT, 15)
                .into_font()
                .color(&WHITE)
                .pos(Pos::new(HPos::Center, VPos::Center));
            ctx.draw_series(chart.bars.iter().enumerate().map(|(i, bar)| {
                let y = if bar.percent > 0.0 { offset } else { -offset };
                Text::new(bar.label(), (i as f64, y), label_style.clone())
            }))
            .map_err(drawing)?;

            root.present().map_err(drawing)?;
        }
        self.to_image(buffer)
    }

    /// Write an image as PNG.
    pub fn save(image: &RgbImage, path: &Path) -> Result<(), RenderError> {
        image.save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }

    fn draw_markers<DB: DrawingBackend>(
        ctx: &mut TimeChartContext<'_, DB>,
        points: &[(f64, f64)],
        marker: Marker,
        color: RGBColor,
    ) -> Result<(), RenderError> {
        let style = color.filled();
        let drawn = match marker {
            Marker::Circle => ctx
                .draw_series(points.iter().map(|&p| Circle::new(p, 4, style)))
                .map(|_| ()),
            Marker::Triangle => ctx
                .draw_series(points.iter().map(|&p| TriangleMarker::new(p, 5, style)))
                .map(|_| ()),
            Marker::Square => ctx
                .draw_series(
                    points
                        .iter()
                        .map(|&p| EmptyElement::at(p) + Rectangle::new([(-4, -4), (4, 4)], style)),
                )
                .map(|_| ()),
            Marker::Diamond => ctx
                .draw_series(points.iter().map(|&p| {
                    EmptyElement::at(p) + Polygon::new(vec![(0, -5), (5, 0), (0, 5), (-5, 0)], style)
                }))
                .map(|_| ()),
        };
        drawn.map_err(drawing)
    }

    fn blank_buffer(&self) -> Vec<u8> {
        vec![0u8; self.width as usize * self.height as usize * 3]
    }

    fn to_image(&self, buffer: Vec<u8>) -> Result<RgbImage, RenderError> {
        RgbImage::from_raw(self.width, self.height, buffer).ok_or(RenderError::Buffer {
            width: self.width,
            height: self.height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::{ChangeBar, ChangeOutcome, SeriesPoint, TimeSeries};

    fn line_chart() -> LineChart {
        LineChart {
            kind: ChartKind::TumorResponse,
            title: "Tumor Response to Treatment".to_string(),
            x_desc: "Time (Days)".to_string(),
            y_desc: "Tumor Volume (mm3)".to_string(),
            axis: vec![0, 5, 10],
            y_range: None,
            legend: LegendPosition::UpperLeft,
            grid: GridLines::Horizontal,
            series: vec![TimeSeries {
                treatment: "Capomulin".to_string(),
                color: [255, 0, 0],
                marker: Marker::Diamond,
                points: vec![
                    SeriesPoint { timepoint: 0, value: 45.0, error: None },
                    SeriesPoint { timepoint: 5, value: 44.2, error: Some(0.4) },
                    SeriesPoint { timepoint: 10, value: 43.1, error: Some(0.6) },
                ],
            }],
        }
    }

    #[test]
    fn test_render_line_chart_dimensions() {
        if StaticChartRenderer::check_fonts().is_err() {
            eprintln!("no {FONT} font, skipping");
            return;
        }
        let renderer = StaticChartRenderer::new(640, 480);
        let image = renderer.render_line_chart(&line_chart()).unwrap();
        assert_eq!(image.dimensions(), (640, 480));
    }

    #[test]
    fn test_render_bar_chart_colors_bars() {
        if StaticChartRenderer::check_fonts().is_err() {
            eprintln!("no {FONT} font, skipping");
            return;
        }
        let renderer = StaticChartRenderer::new(640, 480);
        let chart = BarChart {
            title: "Tumor Change over 45 Day Treatment".to_string(),
            y_desc: "% Tumor Volume Change".to_string(),
            bars: vec![
                ChangeBar {
                    treatment: "Capomulin".to_string(),
                    percent: -19.5,
                    outcome: ChangeOutcome::Shrinking,
                },
                ChangeBar {
                    treatment: "Placebo".to_string(),
                    percent: 51.3,
                    outcome: ChangeOutcome::Growing,
                },
            ],
        };
        let image = renderer.render_bar_chart(&chart).unwrap();
        let green = image::Rgb([0, 128, 0]);
        let red = image::Rgb([255, 0, 0]);
        assert!(image.pixels().any(|p| *p == green));
        assert!(image.pixels().any(|p| *p == red));
    }

    #[test]
    fn test_buffer_size_mismatch() {
        let renderer = StaticChartRenderer::new(10, 10);
        let err = renderer.to_image(vec![0u8; 12]).unwrap_err();
        assert!(matches!(err, RenderError::Buffer { width: 10, height: 10 }));
    }
}
