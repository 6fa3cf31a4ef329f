//! Director id → name resolution.
//!
//! The crew data only carries `nconst` ids. [`Id2NameLookup`] is built once
//! from `name.basics` and then only read. The most frequent director(s) of a
//! group come out of [`director_mode`] as a [`DirectorIds`], which
//! [`resolve_director_names`] renders as a single string.

use crate::error::{EtlError, Result};
use polars::prelude::*;
use std::collections::{BTreeMap, HashMap};

/// Separator between names when a group's mode is tied.
pub const NAME_SEPARATOR: &str = "; ";

/// Outcome of the mode computation for one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectorIds {
    Single(String),
    /// Tied ids, ascending.
    Sequence(Vec<String>),
}

/// Immutable `nconst` → `primaryName` mapping.
#[derive(Debug, Clone, Default)]
pub struct Id2NameLookup {
    names: HashMap<String, String>,
}

impl Id2NameLookup {
    /// Build the lookup from the name catalog, consuming it.
    ///
    /// If an id repeats, the last row wins. Rows with a null id or name are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Fails if `nconst` or `primaryName` is missing or not a string column.
    pub fn from_name_basics(names: DataFrame) -> Result<Self> {
        let ids = names.column("nconst")?.as_materialized_series().str()?;
        let primary = names.column("primaryName")?.as_materialized_series().str()?;

        let mut lookup = HashMap::with_capacity(ids.len());
        let mut overwritten = 0usize;
        for (id, name) in ids.into_iter().zip(primary) {
            if let (Some(id), Some(name)) = (id, name)
                && lookup.insert(id.to_owned(), name.to_owned()).is_some()
            {
                overwritten += 1;
            }
        }

        if overwritten > 0 {
            tracing::warn!(
                "{} duplicate nconst ids in name data, kept the last occurrence of each",
                overwritten
            );
        }

        Ok(Self { names: lookup })
    }

    /// # Errors
    ///
    /// Returns [`EtlError::UnknownDirector`] if `id` is not in the lookup.
    pub fn name(&self, id: &str) -> Result<&str> {
        self.names
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| EtlError::UnknownDirector(id.to_owned()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Id2NameLookup {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(|(id, name)| (id.into(), name.into()))
                .collect(),
        }
    }
}

/// Most frequent id(s) in `ids`, or `None` when there are none.
///
/// Ties are returned in ascending id order.
pub fn director_mode<'a, I>(ids: I) -> Option<DirectorIds>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: BTreeMap<&'a str, usize> = BTreeMap::new();
    for id in ids {
        *counts.entry(id).or_default() += 1;
    }

    let top = counts.values().copied().max()?;
    let mut winners: Vec<String> = counts
        .into_iter()
        .filter(|(_, count)| *count == top)
        .map(|(id, _)| id.to_owned())
        .collect();

    if winners.len() == 1 {
        winners.pop().map(DirectorIds::Single)
    } else {
        Some(DirectorIds::Sequence(winners))
    }
}

/// Render director ids as names, joined with [`NAME_SEPARATOR`].
///
/// # Errors
///
/// Returns [`EtlError::UnknownDirector`] for the first id missing from `lookup`.
pub fn resolve_director_names(ids: &DirectorIds, lookup: &Id2NameLookup) -> Result<String> {
    match ids {
        DirectorIds::Single(id) => Ok(lookup.name(id)?.to_owned()),
        DirectorIds::Sequence(ids) => {
            let names = ids
                .iter()
                .map(|id| lookup.name(id))
                .collect::<Result<Vec<_>>>()?;
            Ok(names.join(NAME_SEPARATOR))
        }
    }
}
