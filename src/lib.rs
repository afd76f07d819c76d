//! Pymaceuticals - Preclinical Drug Trial Analysis
//!
//! Joins per-mouse drug assignments with clinical measurements, summarizes them per
//! (drug, timepoint) and renders the trial charts.

pub mod charts;
pub mod config;
pub mod data;
pub mod pipeline;
pub mod stats;

pub use config::TrialConfig;
pub use pipeline::{Pipeline, PipelineError, PipelineReport, TrialAnalysis};
