//! Pipeline driver.
//!
//! Loads the four sources one at a time and hands each to the stage that
//! consumes it, so at most one raw dataset is resident at once. The clean
//! titles are the only intermediate table that outlives its first consumer:
//! both the ratings join and the crew aggregation read them.

use super::crew::{NUM_DIRECTORS, NUM_WRITERS, TOP_DIRECTORS, crew_stats_by_group};
use super::directors::Id2NameLookup;
use super::resume::{key_exprs, year_genre_resume};
use super::titles::{clean_title_basics, join_ratings};
use crate::config::{AggFunction, EtlConfig, NumWritersSource};
use crate::error::{EtlError, Result};
use crate::source::{SourceKind, SourceLoader};
use polars::prelude::*;
use std::path::{Path, PathBuf};

/// Decimal places kept for averaged measures in the output.
pub const OUTPUT_DECIMALS: u32 = 2;

/// Row counts and timing of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub director_names: usize,
    pub clean_titles: usize,
    pub titles_with_ratings: usize,
    pub resume_groups: usize,
    pub crew_groups: usize,
    pub output_rows: usize,
    pub output_path: PathBuf,
    pub duration: std::time::Duration,
}

impl RunReport {
    pub fn summary(&self) -> String {
        format!(
            "Pipeline completed: {} groups written to {} ({} clean titles, {} title/genre rows, {} crew groups, {} names), {:.2}s",
            self.output_rows,
            self.output_path.display(),
            self.clean_titles,
            self.titles_with_ratings,
            self.crew_groups,
            self.director_names,
            self.duration.as_secs_f64()
        )
    }
}

/// Zero-argument entry point for schedulers.
///
/// Reads the configuration named by [`crate::config::CONFIG_ENV_VAR`], or
/// uses the defaults, and runs the whole pipeline.
///
/// # Errors
///
/// Any load, transform or write failure aborts the run.
pub fn run_pipeline() -> Result<()> {
    let config = EtlConfig::from_env_or_default()?;
    let report = run_pipeline_with(&config)?;
    tracing::info!("{}", report.summary());
    Ok(())
}

/// Run every stage with an explicit configuration.
///
/// # Errors
///
/// Any load, transform or write failure aborts the run; nothing is written
/// unless every stage succeeded.
pub fn run_pipeline_with(config: &EtlConfig) -> Result<RunReport> {
    let start = std::time::Instant::now();
    config.validate()?;
    let sources = &config.sources;
    let loader = SourceLoader::new(&config.null_token)?;

    tracing::info!("Creating director id to name lookup");
    let lookup = Id2NameLookup::from_name_basics(loader.load(SourceKind::NameBasics, sources)?)?;
    let director_names = lookup.len();

    tracing::info!("Processing title basics");
    let clean_titles = clean_title_basics(
        loader.load(SourceKind::TitleBasics, sources)?,
        &config.titles,
    )?;
    tracing::info!("{} titles left after cleaning", clean_titles.height());

    tracing::info!("Processing title ratings");
    let titles_with_ratings = join_ratings(
        &clean_titles,
        loader.load(SourceKind::TitleRatings, sources)?,
    )?;
    let joined_rows = titles_with_ratings.height();

    tracing::info!("Computing year/genre resume");
    let resume = year_genre_resume(titles_with_ratings, &config.resume)?;
    tracing::info!("{} year/genre groups", resume.height());

    tracing::info!("Processing crew data by group");
    let crew_stats = crew_stats_by_group(
        &clean_titles,
        loader.load(SourceKind::TitleCrew, sources)?,
        &lookup,
        &config.resume.group_by,
        &config.crew,
    )?;
    let clean_count = clean_titles.height();
    drop(clean_titles);
    drop(lookup);

    let resume_groups = resume.height();
    let crew_groups = crew_stats.height();

    tracing::info!("Creating output");
    let mut output = build_final_output(resume, crew_stats, config)?;

    tracing::info!("Dumping output to {}", config.output.path.display());
    write_output(&mut output, &config.output.path)?;
    tracing::info!("Done. Results stored at {}", config.output.path.display());

    Ok(RunReport {
        director_names,
        clean_titles: clean_count,
        titles_with_ratings: joined_rows,
        resume_groups,
        crew_groups,
        output_rows: output.height(),
        output_path: config.output.path.clone(),
        duration: start.elapsed(),
    })
}

/// Merge the resume with the crew statistics into the output table.
///
/// Every resume group is kept; groups without crew data get 0 directors and
/// writers and no top director. Averaged measures are rounded to
/// [`OUTPUT_DECIMALS`] and rows are sorted by the group key.
///
/// # Errors
///
/// Fails on missing columns, or when `numWriters` is configured to come from
/// a `numVotes` column the resume does not have.
pub fn build_final_output(
    resume: DataFrame,
    crew_stats: DataFrame,
    config: &EtlConfig,
) -> Result<DataFrame> {
    let group_by = &config.resume.group_by;
    let keys = key_exprs(group_by);
    let stats = crew_stats.lazy();

    let mut merged = resume.lazy();
    for measure in [NUM_WRITERS, NUM_DIRECTORS, TOP_DIRECTORS] {
        let mut projection = keys.clone();
        projection.push(col(measure));
        merged = merged.join(
            stats.clone().select(projection),
            keys.clone(),
            keys.clone(),
            JoinArgs::new(JoinType::Left),
        );
    }

    let mut columns: Vec<Expr> = group_by
        .iter()
        .map(|name| match name.as_str() {
            "startYear" => col(name.as_str()).cast(DataType::Int64),
            _ => col(name.as_str()),
        })
        .collect();
    for aggregation in &config.resume.aggregations {
        let name = aggregation.column.as_str();
        columns.push(match aggregation.function {
            AggFunction::Mean | AggFunction::Median => {
                round_half_even(col(name), OUTPUT_DECIMALS).alias(name)
            }
            _ if name == "numVotes" => col(name).cast(DataType::Int64),
            _ => col(name),
        });
    }
    columns.push(num_writers(config)?);
    columns.push(
        col(NUM_DIRECTORS)
            .fill_null(lit(0))
            .cast(DataType::Int64)
            .alias(NUM_DIRECTORS),
    );
    columns.push(col(TOP_DIRECTORS));

    let output = merged
        .select(columns)
        .sort_by_exprs(keys, SortMultipleOptions::default().with_maintain_order(true))
        .collect()?;

    Ok(output)
}

/// Round to `decimals` places, exact halves going to the even neighbour
/// (0.125 -> 0.12, 0.375 -> 0.38).
fn round_half_even(value: Expr, decimals: u32) -> Expr {
    let scale = 10f64.powi(decimals as i32);
    let scaled = value * lit(scale);
    let floor = scaled.clone().floor();
    let fraction = scaled - floor.clone();
    let up = floor.clone() + lit(1.0);

    when(fraction.clone().gt(lit(0.5)))
        .then(up.clone())
        .when(fraction.lt(lit(0.5)))
        .then(floor.clone())
        .when((floor.clone() % lit(2.0)).eq(lit(0.0)))
        .then(floor)
        .otherwise(up)
        / lit(scale)
}

fn num_writers(config: &EtlConfig) -> Result<Expr> {
    match config.output.num_writers_source {
        NumWritersSource::WritersAggregate => Ok(col(NUM_WRITERS)
            .fill_null(lit(0))
            .cast(DataType::Int64)
            .alias(NUM_WRITERS)),
        NumWritersSource::NumVotes => {
            if !config.resume.aggregations.iter().any(|a| a.column == "numVotes") {
                return Err(EtlError::Config(
                    "num_writers_source is num_votes but numVotes is not aggregated".to_owned(),
                ));
            }
            tracing::warn!("numWriters is copied from numVotes (legacy output compatibility)");
            Ok(col("numVotes").cast(DataType::Int64).alias(NUM_WRITERS))
        }
    }
}

/// Write `df` as comma-separated text with a header, replacing any existing
/// file.
///
/// # Errors
///
/// Returns [`EtlError::SinkWrite`] if the file or its directory cannot be
/// created or written.
pub fn write_output(df: &mut DataFrame, path: &Path) -> Result<()> {
    let sink_error = |detail: String| EtlError::SinkWrite {
        path: path.to_path_buf(),
        detail,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| sink_error(e.to_string()))?;
    }

    let file = std::fs::File::create(path).map_err(|e| sink_error(e.to_string()))?;
    CsvWriter::new(file)
        .include_header(true)
        .with_separator(b',')
        .finish(df)
        .map_err(|e| sink_error(e.to_string()))?;

    Ok(())
}
