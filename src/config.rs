//! Trial Configuration Module
//! Input paths, column names, output settings and the treatment list used for charting.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default configuration file looked up by the binary.
pub const DEFAULT_CONFIG_FILE: &str = "pymaceuticals.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration at {field}: {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialConfig {
    pub input: InputConfig,
    pub columns: ColumnNames,
    pub output: OutputConfig,
    pub charts: ChartsConfig,
    pub treatments: Vec<TreatmentStyle>,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            input: InputConfig::default(),
            columns: ColumnNames::default(),
            output: OutputConfig::default(),
            charts: ChartsConfig::default(),
            treatments: default_treatments(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub mouse_drug: PathBuf,
    pub clinical_trial: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            mouse_drug: PathBuf::from("data/mouse_drug_data.csv"),
            clinical_trial: PathBuf::from("data/clinicaltrial_data.csv"),
        }
    }
}

/// Column headers expected in the two source tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub mouse_id: String,
    pub treatment: String,
    pub timepoint: String,
    pub tumor_volume: String,
    pub metastatic_sites: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            mouse_id: "Mouse ID".to_string(),
            treatment: "Drug".to_string(),
            timepoint: "Timepoint".to_string(),
            tumor_volume: "Tumor Volume (mm3)".to_string(),
            metastatic_sites: "Metastatic Sites".to_string(),
        }
    }
}

impl ColumnNames {
    fn all(&self) -> [(&'static str, &str); 5] {
        [
            ("mouse_id", &self.mouse_id),
            ("treatment", &self.treatment),
            ("timepoint", &self.timepoint),
            ("tumor_volume", &self.tumor_volume),
            ("metastatic_sites", &self.metastatic_sites),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Open every written chart with the system image viewer.
    pub show: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("charts_images"),
            width: 800,
            height: 600,
            show: true,
        }
    }
}

/// What to do when a configured treatment has no data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingTreatmentPolicy {
    #[default]
    Fail,
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartsConfig {
    /// Fixed x axis shared by the three time charts.
    pub timepoints: Vec<i64>,
    pub missing_treatment: MissingTreatmentPolicy,
    /// Plot survival as a percentage of the mice alive at the first timepoint.
    pub survival_as_percent: bool,
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self {
            timepoints: (0..=45).step_by(5).collect(),
            missing_treatment: MissingTreatmentPolicy::Fail,
            survival_as_percent: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Marker {
    Circle,
    Triangle,
    Diamond,
    Square,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentStyle {
    pub name: String,
    /// RGB line and marker colour.
    pub color: [u8; 3],
    pub marker: Marker,
}

impl TreatmentStyle {
    pub fn new(name: &str, color: [u8; 3], marker: Marker) -> Self {
        Self {
            name: name.to_string(),
            color,
            marker,
        }
    }
}

fn default_treatments() -> Vec<TreatmentStyle> {
    vec![
        TreatmentStyle::new("Capomulin", [255, 0, 0], Marker::Circle),
        TreatmentStyle::new("Infubinol", [0, 0, 255], Marker::Triangle),
        TreatmentStyle::new("Ketapril", [0, 128, 0], Marker::Diamond),
        TreatmentStyle::new("Placebo", [0, 0, 0], Marker::Square),
    ]
}

impl TrialConfig {
    /// Parse and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load the config file when it exists, otherwise fall back to the built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: TrialConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the first problem found, or Ok(()).
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_treatments()?;
        self.validate_timepoints()?;
        self.validate_columns()?;

        if self.output.width == 0 || self.output.height == 0 {
            return Err(ConfigError::invalid(
                "output",
                "image width and height must be non-zero",
            ));
        }
        Ok(())
    }

    fn validate_treatments(&self) -> Result<(), ConfigError> {
        if self.treatments.is_empty() {
            return Err(ConfigError::invalid(
                "treatments",
                "at least one treatment is required",
            ));
        }

        let mut seen = HashSet::new();
        for (idx, treatment) in self.treatments.iter().enumerate() {
            if treatment.name.trim().is_empty() {
                return Err(ConfigError::invalid(
                    format!("treatments[{idx}].name"),
                    "treatment name is empty",
                ));
            }
            if !seen.insert(treatment.name.as_str()) {
                return Err(ConfigError::invalid(
                    format!("treatments[name={}]", treatment.name),
                    "duplicate treatment",
                ));
            }
        }
        Ok(())
    }

    fn validate_timepoints(&self) -> Result<(), ConfigError> {
        let axis = &self.charts.timepoints;
        if axis.is_empty() {
            return Err(ConfigError::invalid(
                "charts.timepoints",
                "timepoint axis is empty",
            ));
        }
        if axis.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::invalid(
                "charts.timepoints",
                "timepoints must be strictly increasing",
            ));
        }
        Ok(())
    }

    fn validate_columns(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (field, name) in self.columns.all() {
            if name.trim().is_empty() {
                return Err(ConfigError::invalid(
                    format!("columns.{field}"),
                    "column name is empty",
                ));
            }
            if !seen.insert(name) {
                return Err(ConfigError::invalid(
                    format!("columns.{field}"),
                    format!("column name '{name}' is used twice"),
                ));
            }
        }
        Ok(())
    }

    pub fn treatment_names(&self) -> Vec<&str> {
        self.treatments.iter().map(|t| t.name.as_str()).collect()
    }
}
