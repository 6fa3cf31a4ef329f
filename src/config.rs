//! Run configuration.
//!
//! One [`EtlConfig`] is built at process start (defaults, or a JSON file) and
//! passed by reference to every stage. Nothing reads configuration from
//! global state after that.

use crate::error::{EtlError, Result, ResultExt as _};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable pointing at a JSON config file for [`crate::pipeline::run_pipeline`].
pub const CONFIG_ENV_VAR: &str = "MOVIES_ETL_CONFIG";

pub const DEFAULT_NULL_TOKEN: &str = "\\N";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocations {
    pub title_basics: String,
    pub title_ratings: String,
    pub title_crew: String,
    pub name_basics: String,
}

impl Default for SourceLocations {
    fn default() -> Self {
        Self {
            title_basics: "https://datasets.imdbws.com/title.basics.tsv.gz".to_owned(),
            title_ratings: "https://datasets.imdbws.com/title.ratings.tsv.gz".to_owned(),
            title_crew: "https://datasets.imdbws.com/title.crew.tsv.gz".to_owned(),
            name_basics: "https://datasets.imdbws.com/name.basics.tsv.gz".to_owned(),
        }
    }
}

/// Filter applied to the raw title catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleFilter {
    /// Value of `titleType` that marks a feature film
    pub title_type: String,
    /// Inclusive lower bound on `startYear`
    pub year_from: i64,
    /// Inclusive upper bound on `startYear`
    pub year_to: i64,
    pub used_columns: Vec<String>,
}

impl Default for TitleFilter {
    fn default() -> Self {
        Self {
            title_type: "movie".to_owned(),
            year_from: 2015,
            year_to: 2020,
            used_columns: owned(&["tconst", "startYear", "genres", "runtimeMinutes"]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggFunction {
    Mean,
    Sum,
    Min,
    Max,
    Median,
    Count,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation {
    pub column: String,
    pub function: AggFunction,
}

impl Aggregation {
    pub fn new(column: &str, function: AggFunction) -> Self {
        Self {
            column: column.to_owned(),
            function,
        }
    }
}

/// Grouping and aggregation of the ratings-joined titles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeConfig {
    pub group_by: Vec<String>,
    /// Applied in order; output measure columns follow this order.
    pub aggregations: Vec<Aggregation>,
}

impl Default for ResumeConfig {
    fn default() -> Self {
        Self {
            group_by: owned(&["startYear", "genres"]),
            aggregations: vec![
                Aggregation::new("runtimeMinutes", AggFunction::Mean),
                Aggregation::new("averageRating", AggFunction::Mean),
                Aggregation::new("numVotes", AggFunction::Sum),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewConfig {
    pub used_columns: Vec<String>,
}

impl Default for CrewConfig {
    fn default() -> Self {
        Self {
            used_columns: owned(&["startYear", "genres", "directors", "writers"]),
        }
    }
}

/// Where the final `numWriters` column comes from.
///
/// The legacy job copied `numVotes` into `numWriters`; `NumVotes` reproduces
/// that output exactly, `WritersAggregate` uses the distinct-writers count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumWritersSource {
    #[default]
    WritersAggregate,
    NumVotes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub num_writers_source: NumWritersSource,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("resultados.csv"),
            num_writers_source: NumWritersSource::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    pub sources: SourceLocations,
    pub null_token: String,
    pub titles: TitleFilter,
    pub resume: ResumeConfig,
    pub crew: CrewConfig,
    pub output: OutputConfig,
}

impl EtlConfig {
    /// Load a config from a JSON file. Missing sections take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::Config`] if the file cannot be read, parsed or fails validation.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    /// # Errors
    ///
    /// Returns [`EtlError::Config`] on malformed JSON or invalid values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).context("Failed to parse configuration JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Config from [`CONFIG_ENV_VAR`] when set, otherwise the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the referenced file is unusable.
    pub fn from_env_or_default() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => {
                tracing::info!("Loading configuration from {:?}", path);
                Self::from_file(PathBuf::from(path))
            }
            None => Ok(Self::default()),
        }
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// # Errors
    ///
    /// Returns [`EtlError::Config`] describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.titles.year_from > self.titles.year_to {
            return Err(EtlError::Config(format!(
                "year_from ({}) is after year_to ({})",
                self.titles.year_from, self.titles.year_to
            )));
        }
        if self.resume.group_by.is_empty() {
            return Err(EtlError::Config("resume.group_by is empty".to_owned()));
        }
        if self.resume.aggregations.is_empty() {
            return Err(EtlError::Config("resume.aggregations is empty".to_owned()));
        }
        if self.null_token.is_empty() {
            return Err(EtlError::Config("null_token is empty".to_owned()));
        }
        Ok(())
    }
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            sources: SourceLocations::default(),
            null_token: DEFAULT_NULL_TOKEN.to_owned(),
            titles: TitleFilter::default(),
            resume: ResumeConfig::default(),
            crew: CrewConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| (*s).to_owned()).collect()
}
