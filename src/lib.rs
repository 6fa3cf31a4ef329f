//! # movies-etl
//!
//! Batch job that turns the public IMDb dumps (`title.basics`,
//! `title.ratings`, `title.crew`, `name.basics`) into one summary table per
//! release year and genre: mean runtime, mean rating, total votes, crew sizes
//! and the most frequent director.
//!
//! ## Quick Start
//!
//! ```no_run
//! // Defaults read the IMDb dataset URLs and write `resultados.csv`.
//! movies_etl::pipeline::run_pipeline()?;
//! # Ok::<(), movies_etl::error::EtlError>(())
//! ```
//!
//! ## Core Modules
//!
//! - [`pipeline`]: the transformation stages and the driver that sequences them
//! - [`source`]: TSV loading with column checks
//! - [`config`]: the immutable run configuration
//! - [`error`]: error taxonomy
//! - [`logging`]: console and rolling-file tracing setup
//!
//! ## Memory
//!
//! The dumps are large, so datasets are loaded one at a time and every raw
//! table is moved into the stage that consumes it. Nothing runs concurrently
//! except what polars parallelises inside a single operation.

#![warn(clippy::all, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod source;
