use pymaceuticals::charts::{ChangeOutcome, ChartError, StaticChartRenderer};
use pymaceuticals::config::{Marker, MissingTreatmentPolicy, TreatmentStyle};
use pymaceuticals::data::LoaderError;
use pymaceuticals::{Pipeline, PipelineError, TrialConfig};
use std::fmt::Write as _;
use std::path::Path;
use tempfile::TempDir;

const TREATMENTS: [(&str, f64); 4] = [
    ("Capomulin", -0.2),
    ("Infubinol", 0.4),
    ("Ketapril", 0.5),
    ("Placebo", 0.45),
];

/// Two mice per treatment, measured every five days. `p1` drops out after day 20 and
/// `z999` has no drug assignment.
fn write_trial(dir: &Path) -> TrialConfig {
    let mut mouse_drug = String::from("Mouse ID,Drug\n");
    let mut clinical =
        String::from("Mouse ID,Timepoint,Tumor Volume (mm3),Metastatic Sites\n");

    for (t, (drug, slope)) in TREATMENTS.iter().enumerate() {
        for m in 0..2 {
            let id = format!("{}{}", drug[..1].to_lowercase(), m);
            writeln!(mouse_drug, "{id},{drug}").unwrap();
            for tp in (0..=45).step_by(5) {
                if *drug == "Placebo" && m == 1 && tp > 20 {
                    continue;
                }
                let volume = 45.0 + slope * tp as f64;
                writeln!(clinical, "{id},{tp},{volume:.1},{}", (tp / 15 + t) % 4).unwrap();
            }
        }
    }
    clinical.push_str("z999,0,45.0,0\nz999,5,46.1,0\n");

    let mouse_drug_path = dir.join("mouse_drug_data.csv");
    let clinical_path = dir.join("clinicaltrial_data.csv");
    std::fs::write(&mouse_drug_path, mouse_drug).unwrap();
    std::fs::write(&clinical_path, clinical).unwrap();

    let mut config = TrialConfig::default();
    config.input.mouse_drug = mouse_drug_path;
    config.input.clinical_trial = clinical_path;
    config.output.directory = dir.join("charts_images");
    config.output.show = false;
    config
}

#[test]
fn test_analyze_full_trial() {
    let dir = TempDir::new().unwrap();
    let config = write_trial(dir.path());

    let analysis = Pipeline::new(config).analyze().unwrap();

    // 7 complete mice and 1 dropout over 10 timepoints, plus the unassigned mouse
    assert_eq!(analysis.clinical_rows, 7 * 10 + 5 + 2);
    assert_eq!(analysis.joined_rows, analysis.clinical_rows);
    assert_eq!(analysis.untreated_rows, 2);
    assert_eq!(analysis.records.len(), 4 * 10);

    let charts = &analysis.charts;
    for chart in [&charts.tumor_response, &charts.metastatic_spread, &charts.survival] {
        assert_eq!(chart.series.len(), 4);
        assert_eq!(chart.axis, (0..=45).step_by(5).collect::<Vec<i64>>());
    }
    assert!(charts.survival.series.iter().all(|s| s.points.iter().all(|p| p.error.is_none())));

    let placebo = charts
        .survival
        .series
        .iter()
        .find(|s| s.treatment == "Placebo")
        .unwrap();
    assert_eq!(placebo.points[0].value, 2.0);
    assert_eq!(placebo.points[9].value, 1.0);

    // Single-mouse groups have no standard error
    let placebo_tumor = charts
        .tumor_response
        .series
        .iter()
        .find(|s| s.treatment == "Placebo")
        .unwrap();
    assert!(placebo_tumor.points[4].error.is_some());
    assert!(placebo_tumor.points[5].error.is_none());

    let bars = &charts.tumor_change.bars;
    assert_eq!(bars.len(), 4);
    assert_eq!(bars[0].treatment, "Capomulin");
    assert!((bars[0].percent - -20.0).abs() < 1e-9);
    assert_eq!(bars[0].outcome, ChangeOutcome::Shrinking);
    assert!(bars[1..].iter().all(|b| b.outcome == ChangeOutcome::Growing));
    assert_eq!(charts.tumor_change.title, "Tumor Change over 45 Day Treatment");
}

#[test]
fn test_survival_as_percent() {
    let dir = TempDir::new().unwrap();
    let mut config = write_trial(dir.path());
    config.charts.survival_as_percent = true;

    let analysis = Pipeline::new(config).analyze().unwrap();

    let placebo = analysis
        .charts
        .survival
        .series
        .iter()
        .find(|s| s.treatment == "Placebo")
        .unwrap();
    assert_eq!(placebo.points[0].value, 100.0);
    assert_eq!(placebo.points[9].value, 50.0);
    assert_eq!(analysis.charts.survival.y_desc, "Survival Rate (%)");
}

#[test]
fn test_missing_treatment_policy() {
    let dir = TempDir::new().unwrap();
    let mut config = write_trial(dir.path());
    config
        .treatments
        .push(TreatmentStyle::new("Ceftamin", [128, 0, 128], Marker::Circle));

    let err = Pipeline::new(config.clone()).analyze().unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Chart(ChartError::MissingTreatment { ref treatment, .. }) if treatment == "Ceftamin"
    ));

    config.charts.missing_treatment = MissingTreatmentPolicy::Skip;
    let analysis = Pipeline::new(config).analyze().unwrap();
    assert_eq!(analysis.charts.tumor_response.series.len(), 4);
    assert_eq!(analysis.charts.tumor_change.bars.len(), 4);
}

#[test]
fn test_zero_baseline_fails_instead_of_charting() {
    let dir = TempDir::new().unwrap();
    let config = write_trial(dir.path());
    let clinical = std::fs::read_to_string(&config.input.clinical_trial)
        .unwrap()
        .replace("c0,0,45.0,", "c0,0,0.0,")
        .replace("c1,0,45.0,", "c1,0,0.0,");
    std::fs::write(&config.input.clinical_trial, clinical).unwrap();

    let err = Pipeline::new(config.clone()).analyze().unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Chart(ChartError::UndefinedChange { ref treatment, .. }) if treatment == "Capomulin"
    ));

    let mut config = config;
    config.charts.missing_treatment = MissingTreatmentPolicy::Skip;
    let analysis = Pipeline::new(config).analyze().unwrap();
    let bars = &analysis.charts.tumor_change.bars;
    assert_eq!(bars.len(), 3);
    let (min, max) = analysis.charts.tumor_change.y_range();
    assert!(min.is_finite() && max.is_finite());
}

#[test]
fn test_missing_input_file() {
    let dir = TempDir::new().unwrap();
    let mut config = write_trial(dir.path());
    config.input.clinical_trial = dir.path().join("absent.csv");

    let err = Pipeline::new(config).analyze().unwrap_err();
    assert!(matches!(err, PipelineError::Loader(LoaderError::NotFound(_))));
}

#[test]
fn test_run_writes_charts() {
    if StaticChartRenderer::check_fonts().is_err() {
        eprintln!("no sans-serif font, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let config = write_trial(dir.path());
    let output = config.output.directory.clone();

    let report = Pipeline::new(config).run().unwrap();

    assert_eq!(report.charts.len(), 4);
    for name in [
        "treatment_graph.png",
        "metastatic_spread_graph.png",
        "survival_graph.png",
        "tumor_change.png",
    ] {
        assert!(output.join(name).is_file(), "{name} not written");
    }
    assert_eq!(report.percent_changes.len(), 4);
}
