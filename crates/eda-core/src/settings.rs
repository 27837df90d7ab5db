use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{EdaError, Result};
use crate::models::{KeyColumn, Metric};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Prepare COVID-19 case data and render the exploratory charts
#[derive(Parser, Debug, Clone)]
#[command(
    name = "covid-eda",
    about = "Prepare COVID-19 case data and render the exploratory charts",
    version
)]
pub struct Settings {
    /// Cleaned case CSV to read
    #[arg(long, default_value = "covid19clean.csv")]
    pub input: PathBuf,

    /// JSON file mapping source header names (defaults to ~/.covid-eda/columns.json if present)
    #[arg(long)]
    pub columns: Option<PathBuf>,

    /// Directory the JSON chart sink writes into
    #[arg(long, default_value = "charts")]
    pub output_dir: PathBuf,

    /// Chart sink
    #[arg(long, default_value = "json", value_parser = ["json", "text"])]
    pub format: String,

    /// Log the geographic breakdown of one region (e.g. "US")
    #[arg(long)]
    pub region: Option<String>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Parse the process arguments.
    pub fn load() -> Self {
        Self::load_from_args(std::env::args_os().collect())
    }

    /// Same as [`Settings::load`] but accepts an explicit argument list.
    pub fn load_from_args(args: Vec<std::ffi::OsString>) -> Self {
        let mut settings = Settings::parse_from(args);

        // --debug overrides log level.
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        settings
    }
}

// ── ColumnMap ──────────────────────────────────────────────────────────────────

/// Header names of the source file, plus the display name of the derived
/// `still_infected` column.
///
/// Persisted as JSON; any field left out keeps its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub date: String,
    pub region: String,
    pub subregion: String,
    pub confirmed: String,
    pub deaths: String,
    pub recovered: String,
    pub still_infected: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            date: "Date".to_string(),
            region: "Country/Region".to_string(),
            subregion: "Province/State".to_string(),
            confirmed: "Confirmed".to_string(),
            deaths: "Deaths".to_string(),
            recovered: "Recovered".to_string(),
            still_infected: "Still Infected".to_string(),
        }
    }
}

impl ColumnMap {
    /// Return the default path of the column map.
    /// Uses `~/.covid-eda/columns.json`.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".covid-eda").join("columns.json")
    }

    /// Load and validate a column map from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EdaError::Config(format!("cannot read column map {}: {}", path.display(), e))
        })?;
        let map: ColumnMap = serde_json::from_str(&content)?;
        map.validate()?;
        Ok(map)
    }

    /// Resolve the column map for a run.
    ///
    /// An explicit path must load. Otherwise the default path is used when it
    /// exists, and the built-in names when it does not.
    pub fn resolve(explicit: Option<&Path>, default_path: &Path) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from(path),
            None if default_path.exists() => {
                tracing::debug!("Using column map {}", default_path.display());
                Self::load_from(default_path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Reject empty names and source columns that share a header.
    pub fn validate(&self) -> Result<()> {
        let source = [
            &self.date,
            &self.region,
            &self.subregion,
            &self.confirmed,
            &self.deaths,
            &self.recovered,
        ];
        for (i, name) in source.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(EdaError::Config("column names must not be empty".to_string()));
            }
            if source[..i].contains(name) {
                return Err(EdaError::Config(format!(
                    "column '{}' is mapped more than once",
                    name
                )));
            }
        }
        if self.still_infected.trim().is_empty() {
            return Err(EdaError::Config("column names must not be empty".to_string()));
        }
        Ok(())
    }

    /// Display / header name of a key column.
    pub fn key_name(&self, column: KeyColumn) -> &str {
        match column {
            KeyColumn::Date => &self.date,
            KeyColumn::Region => &self.region,
            KeyColumn::Subregion => &self.subregion,
        }
    }

    /// Display / header name of a numeric column.
    pub fn metric_name(&self, metric: Metric) -> &str {
        match metric {
            Metric::Confirmed => &self.confirmed,
            Metric::Deaths => &self.deaths,
            Metric::Recovered => &self.recovered,
            Metric::StillInfected => &self.still_infected,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
