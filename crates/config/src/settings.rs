// Application settings
// Loaded from ~/.config/ratebook/settings.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    /// File could not be read or written.
    Io(String),
    /// TOML parse / deserialization error.
    Parse(String),
    /// Values parsed but are out of range.
    Validation(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "settings IO error: {msg}"),
            Self::Parse(msg) => write!(f, "settings parse error: {msg}"),
            Self::Validation(msg) => write!(f, "invalid settings: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// One abbreviation rewritten before matching, e.g. `MBS` -> `MSB`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Abbreviation {
    pub from: String,
    pub to: String,
}

/// Free-text matching against master lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSettings {
    /// Minimum similarity (0-100) for an automatic fuzzy match
    pub threshold: f64,

    /// Minimum similarity (0-100) for a value to be offered as a suggestion
    pub suggestion_floor: f64,

    /// Maximum number of suggestions shown per field
    pub top_n: usize,

    /// Abbreviations normalized before matching
    pub abbreviations: Vec<Abbreviation>,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            threshold: 90.0,
            suggestion_floor: 60.0,
            top_n: 3,
            abbreviations: vec![Abbreviation {
                from: "MBS".into(),
                to: "MSB".into(),
            }],
        }
    }
}

/// Report partitioning and filtering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Column holding the revenue type used to split CPD from CPM rows
    pub revenue_type_column: String,

    /// Substring (case-insensitive) marking a CPD row
    pub cpd_marker: String,

    /// Only keep rows whose property is in this list (empty = keep all)
    pub properties: Vec<String>,

    /// Only keep rows whose business unit is in this list (empty = keep all)
    pub business_units: Vec<String>,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            revenue_type_column: "supply__dimension_dict__revenue_type".into(),
            cpd_marker: "cpd".into(),
            properties: Vec::new(),
            business_units: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub matching: MatchSettings,
    pub report: ReportSettings,
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ratebook")
            .join("settings.toml")
    }

    /// Parse and validate settings from TOML text
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let settings: Settings =
            toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from an explicit file
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml(&contents)
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match Self::from_path(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %path.display(), "{e}; using default settings");
                Self::default()
            }
        }
    }

    /// Save current settings to disk
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }
        let text = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        fs::write(path, text).map_err(|e| ConfigError::Io(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.matching;
        if !(0.0..=100.0).contains(&m.threshold) {
            return Err(ConfigError::Validation(format!(
                "matching.threshold must be within 0..=100, got {}",
                m.threshold
            )));
        }
        if !(0.0..=100.0).contains(&m.suggestion_floor) {
            return Err(ConfigError::Validation(format!(
                "matching.suggestion_floor must be within 0..=100, got {}",
                m.suggestion_floor
            )));
        }
        if m.top_n == 0 {
            return Err(ConfigError::Validation("matching.top_n must be at least 1".into()));
        }
        if let Some(a) = m.abbreviations.iter().find(|a| a.from.is_empty()) {
            return Err(ConfigError::Validation(format!(
                "abbreviation for '{}' has an empty 'from'",
                a.to
            )));
        }
        if self.report.cpd_marker.is_empty() {
            return Err(ConfigError::Validation("report.cpd_marker must not be empty".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
