//! Per-group statistics over the ratings-joined titles.

use crate::config::{AggFunction, Aggregation, ResumeConfig};
use crate::error::Result;
use polars::prelude::*;

/// Group by the configured key and aggregate each configured measure.
///
/// Groups come out in order of first appearance. A measure whose values are
/// all null inside a group aggregates to null, including sums.
///
/// # Errors
///
/// Fails if a key or measure column is missing.
pub fn year_genre_resume(titles: DataFrame, resume: &ResumeConfig) -> Result<DataFrame> {
    let keys: Vec<Expr> = key_exprs(&resume.group_by);
    let aggs: Vec<Expr> = resume.aggregations.iter().map(aggregate).collect();

    let resume = titles.lazy().group_by_stable(keys).agg(aggs).collect()?;
    Ok(resume)
}

pub(crate) fn key_exprs(group_by: &[String]) -> Vec<Expr> {
    group_by.iter().map(|name| col(name.as_str())).collect()
}

fn aggregate(aggregation: &Aggregation) -> Expr {
    let values = col(aggregation.column.as_str());
    let expr = match aggregation.function {
        AggFunction::Mean => values.mean(),
        AggFunction::Median => values.median(),
        AggFunction::Min => values.min(),
        AggFunction::Max => values.max(),
        AggFunction::Count => values.count(),
        // polars sums an all-null group to 0
        AggFunction::Sum => when(values.clone().count().gt(lit(0)))
            .then(values.sum())
            .otherwise(lit(NULL)),
    };
    expr.alias(aggregation.column.as_str())
}
