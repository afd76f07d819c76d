//! Pymaceuticals - Preclinical Drug Trial Analysis
//!
//! Reads the mouse-drug and clinical trial tables, summarizes them and writes the trial charts.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, LogFormat};
use pymaceuticals::{Pipeline, TrialConfig};
use tracing::info;
use tracing_subscriber::Layer;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Pymaceuticals starting");

    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = TrialConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    if cli.no_show {
        config.output.show = false;
    }

    info!(
        mouse_drug = %config.input.mouse_drug.display(),
        clinical_trial = %config.input.clinical_trial.display(),
        treatments = ?config.treatment_names(),
        "Configuration loaded"
    );

    let report = Pipeline::new(config).run()?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for change in &report.percent_changes {
            info!(treatment = %change.treatment, percent = %format!("{:.2}", change.percent), "tumor volume change");
        }
        info!(charts = report.charts.len(), rows = report.rows, "Done");
    }
    Ok(())
}

/// Initialize logging based on CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if cli.quiet {
        EnvFilter::new("error")
    } else {
        let default_level = match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    // Keep stdout clean for --json
    let fmt_layer = match cli.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_writer(std::io::stderr).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
