//! Crew statistics per (year, genre) group.
//!
//! Directors are exploded to one id per row, writers are not: `numWriters`
//! counts distinct comma-joined writer lists, `numDirectors` counts distinct
//! director ids. This matches the historical output of the job.

use super::directors::{Id2NameLookup, director_mode, resolve_director_names};
use super::resume::key_exprs;
use crate::config::CrewConfig;
use crate::error::{Result, ResultExt as _};
use polars::prelude::*;

pub const NUM_DIRECTORS: &str = "numDirectors";
pub const NUM_WRITERS: &str = "numWriters";
pub const TOP_DIRECTORS: &str = "topDirectors";

const TITLE_ORDER: &str = "_title_order";
const DIRECTOR_IDS: &str = "_director_ids";

/// Join titles with crews and explode genres, then directors.
///
/// A title with `g` genres and `d` directors yields `g × d` rows. Titles with
/// no genres or no directors are dropped.
pub fn explode_crew(clean: &DataFrame, crew: DataFrame, config: &CrewConfig) -> LazyFrame {
    let used: Vec<Expr> = config
        .used_columns
        .iter()
        .map(|name| col(name.as_str()))
        .collect();

    clean
        .clone()
        .lazy()
        .with_row_index(TITLE_ORDER, None)
        .join(
            crew.lazy(),
            [col("tconst")],
            [col("tconst")],
            JoinArgs::new(JoinType::Left),
        )
        .filter(col("genres").is_not_null().and(col("directors").is_not_null()))
        .sort(
            [TITLE_ORDER],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .select(used)
        .with_columns([
            col("genres").str().split(lit(",")),
            col("directors").str().split(lit(",")),
        ])
        .explode([col("genres")])
        .explode([col("directors")])
}

/// Per-group director and writer counts plus the top director name(s).
///
/// Output columns: the group keys, `numDirectors`, `numWriters`,
/// `topDirectors`. Groups come out in order of first appearance.
///
/// # Errors
///
/// Returns [`crate::error::EtlError::UnknownDirector`] if a top director id is
/// missing from `lookup`, or a data error if polars fails.
pub fn crew_stats_by_group(
    clean: &DataFrame,
    crew: DataFrame,
    lookup: &Id2NameLookup,
    group_by: &[String],
    config: &CrewConfig,
) -> Result<DataFrame> {
    tracing::info!("Counting directors and writers per group");
    let grouped = explode_crew(clean, crew, config)
        .group_by_stable(key_exprs(group_by))
        .agg([
            col("directors")
                .n_unique()
                .cast(DataType::Int64)
                .alias(NUM_DIRECTORS),
            col("writers")
                .drop_nulls()
                .n_unique()
                .cast(DataType::Int64)
                .alias(NUM_WRITERS),
            col("directors").alias(DIRECTOR_IDS),
        ])
        .collect()
        .context("Failed to aggregate crew data")?;

    tracing::info!("Resolving top directors for {} groups", grouped.height());
    let top = top_director_names(&grouped, lookup)?;

    let mut stats = grouped.drop(DIRECTOR_IDS)?;
    stats.with_column(top)?;
    Ok(stats)
}

fn top_director_names(grouped: &DataFrame, lookup: &Id2NameLookup) -> Result<Series> {
    let id_lists = grouped.column(DIRECTOR_IDS)?.as_materialized_series().list()?;

    let mut names: Vec<Option<String>> = Vec::with_capacity(id_lists.len());
    for ids in id_lists {
        let resolved = match ids {
            Some(ids) => {
                let ids = ids.str()?;
                director_mode(ids.into_iter().flatten())
                    .map(|mode| resolve_director_names(&mode, lookup))
                    .transpose()?
            }
            None => None,
        };
        names.push(resolved);
    }

    Ok(Series::new(TOP_DIRECTORS.into(), names))
}
