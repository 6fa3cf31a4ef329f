//! The movies summary pipeline.
//!
//! # Overview
//!
//! ```text
//! name.basics   ──> Id2NameLookup ──────────────────────────────┐
//! title.basics  ──> clean_title_basics ──┬─> join_ratings       │
//! title.ratings ─────────────────────────┘        │             │
//!                                                 v             │
//!                                     year_genre_resume         │
//! title.crew    ──> crew_stats_by_group <── clean titles, lookup┘
//!                                                 │
//!                       build_final_output <──────┘──> write_output
//! ```
//!
//! Every stage takes tables by value when it is their last reader, so the
//! raw datasets are released as soon as the stage that needs them returns.
//!
//! # Example
//!
//! ```no_run
//! use movies_etl::config::EtlConfig;
//! use movies_etl::pipeline::run_pipeline_with;
//!
//! let mut config = EtlConfig::default();
//! config.sources.title_basics = "data/title.basics.tsv.gz".to_owned();
//! config.output.path = "out/summary.csv".into();
//!
//! let report = run_pipeline_with(&config)?;
//! println!("{}", report.summary());
//! # Ok::<(), movies_etl::error::EtlError>(())
//! ```

pub mod crew;
pub mod directors;
pub mod executor;
pub mod resume;
pub mod titles;

pub use crew::{crew_stats_by_group, explode_crew};
pub use directors::{DirectorIds, Id2NameLookup, director_mode, resolve_director_names};
pub use executor::{RunReport, build_final_output, run_pipeline, run_pipeline_with, write_output};
pub use resume::year_genre_resume;
pub use titles::{clean_title_basics, join_ratings};
