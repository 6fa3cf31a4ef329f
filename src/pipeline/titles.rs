//! Title catalog cleaning and the ratings join.

use crate::config::TitleFilter;
use crate::error::Result;
use polars::prelude::*;

/// Keep feature films released inside the configured year window.
///
/// `startYear` is cast to `Int64` first; values that do not parse become null
/// and are dropped with the genuinely missing ones. Both year bounds are
/// inclusive. The raw table is consumed.
///
/// # Errors
///
/// Fails if a used column is missing or polars cannot evaluate the plan.
pub fn clean_title_basics(raw: DataFrame, filter: &TitleFilter) -> Result<DataFrame> {
    let used: Vec<Expr> = filter
        .used_columns
        .iter()
        .map(|name| col(name.as_str()))
        .collect();

    let clean = raw
        .lazy()
        .with_column(col("startYear").cast(DataType::Int64))
        .filter(col("startYear").is_not_null())
        .filter(col("titleType").eq(lit(filter.title_type.as_str())))
        .filter(
            col("startYear")
                .gt_eq(lit(filter.year_from))
                .and(col("startYear").lt_eq(lit(filter.year_to))),
        )
        .select(used)
        .collect()?;

    Ok(clean)
}

/// Attach ratings to the clean titles and expand to one row per genre.
///
/// Titles without a rating keep null `averageRating`/`numVotes`. Titles with
/// no genres are dropped. `clean` is only borrowed because crew aggregation
/// needs it later; `ratings` is consumed.
///
/// # Errors
///
/// Fails if a used column is missing or polars cannot evaluate the plan.
pub fn join_ratings(clean: &DataFrame, ratings: DataFrame) -> Result<DataFrame> {
    let ratings = ratings.lazy().select([
        col("tconst"),
        col("averageRating").cast(DataType::Float64),
        col("numVotes").cast(DataType::Int64),
    ]);

    let titles = clean
        .clone()
        .lazy()
        .join(
            ratings,
            [col("tconst")],
            [col("tconst")],
            JoinArgs::new(JoinType::Left),
        )
        .filter(col("genres").is_not_null())
        .with_column(col("genres").str().split(lit(",")))
        .explode([col("genres")])
        .with_column(col("runtimeMinutes").cast(DataType::Float64))
        .collect()?;

    Ok(titles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_titles() -> DataFrame {
        df!(
            "tconst" => ["tt1", "tt2", "tt3", "tt4", "tt5", "tt6", "tt7"],
            "titleType" => ["movie", "movie", "movie", "tvSeries", "movie", "movie", "movie"],
            "startYear" => [Some("2015"), Some("2020"), Some("2014"), Some("2016"), None, Some("2021"), Some("2018")],
            "genres" => [Some("Drama"), Some("Comedy,Drama"), Some("Drama"), Some("Drama"), Some("Drama"), Some("Drama"), None],
            "runtimeMinutes" => [Some("100"), Some("90"), Some("80"), Some("45"), Some("70"), Some("60"), None],
            "primaryTitle" => ["a", "b", "c", "d", "e", "f", "g"]
        )
        .unwrap()
    }

    fn ids(df: &DataFrame) -> Vec<String> {
        df.column("tconst")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .flatten()
            .map(ToOwned::to_owned)
            .collect()
    }

    #[test]
    fn test_clean_keeps_movies_inside_inclusive_year_range() -> anyhow::Result<()> {
        let clean = clean_title_basics(raw_titles(), &TitleFilter::default())?;

        assert_eq!(ids(&clean), vec!["tt1", "tt2", "tt7"]);
        assert_eq!(
            clean.get_column_names_str(),
            vec!["tconst", "startYear", "genres", "runtimeMinutes"]
        );

        let years = clean.column("startYear")?.as_materialized_series().i64()?;
        assert!(years.into_iter().flatten().all(|y| (2015..=2020).contains(&y)));
        assert_eq!(years.null_count(), 0);
        Ok(())
    }

    #[test]
    fn test_clean_drops_unparseable_years() -> anyhow::Result<()> {
        let raw = df!(
            "tconst" => ["tt1", "tt2"],
            "titleType" => ["movie", "movie"],
            "startYear" => ["2016", "soon"],
            "genres" => ["Drama", "Drama"],
            "runtimeMinutes" => ["100", "100"]
        )?;
        let clean = clean_title_basics(raw, &TitleFilter::default())?;
        assert_eq!(ids(&clean), vec!["tt1"]);
        Ok(())
    }

    #[test]
    fn test_join_single_title_scenario() -> anyhow::Result<()> {
        let clean = df!(
            "tconst" => ["t1"],
            "startYear" => [2015i64],
            "genres" => ["Drama"],
            "runtimeMinutes" => [100i64]
        )?;
        let ratings = df!(
            "tconst" => ["t1"],
            "averageRating" => [7.5f64],
            "numVotes" => [10i64]
        )?;

        let titles = join_ratings(&clean, ratings)?;
        assert_eq!(titles.height(), 1);
        assert_eq!(
            titles.column("runtimeMinutes")?.as_materialized_series().f64()?.get(0),
            Some(100.0)
        );
        assert_eq!(
            titles.column("averageRating")?.as_materialized_series().f64()?.get(0),
            Some(7.5)
        );
        assert_eq!(
            titles.column("numVotes")?.as_materialized_series().i64()?.get(0),
            Some(10)
        );
        Ok(())
    }

    #[test]
    fn test_join_explodes_genres_and_keeps_unrated_titles() -> anyhow::Result<()> {
        let clean = clean_title_basics(raw_titles(), &TitleFilter::default())?;
        let ratings = df!(
            "tconst" => ["tt2", "tt9"],
            "averageRating" => ["6.0", "9.9"],
            "numVotes" => ["42", "1"]
        )?;

        let titles = join_ratings(&clean, ratings)?;

        // tt1 (unrated, one genre) + tt2 (two genres); tt7 has no genres.
        assert_eq!(titles.height(), 3);
        let null_genres = clean.column("genres")?.null_count();
        assert!(titles.height() >= clean.height() - null_genres);

        let rated = titles
            .clone()
            .lazy()
            .filter(col("tconst").eq(lit("tt2")))
            .collect()?;
        let genres: Vec<&str> = rated
            .column("genres")?
            .as_materialized_series()
            .str()?
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(genres, vec!["Comedy", "Drama"]);
        let votes = rated.column("numVotes")?.as_materialized_series().i64()?;
        assert!(votes.into_iter().all(|v| v == Some(42)));

        let unrated = titles
            .lazy()
            .filter(col("tconst").eq(lit("tt1")))
            .collect()?;
        assert_eq!(unrated.column("averageRating")?.null_count(), 1);
        Ok(())
    }
}
