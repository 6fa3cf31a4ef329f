use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use movies_etl::config::{EtlConfig, NumWritersSource};
use movies_etl::pipeline::run_pipeline_with;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "movies-etl",
    about = "Summarise IMDb titles, ratings and crews per release year and genre"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the whole pipeline once and write the summary CSV
    Run {
        /// JSON configuration file. Defaults to $MOVIES_ETL_CONFIG, then built-in defaults.
        #[arg(short, long, env = "MOVIES_ETL_CONFIG")]
        config: Option<PathBuf>,

        /// Output CSV path, overriding the configuration
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Location of title.basics (path or URL)
        #[arg(long)]
        title_basics: Option<String>,

        /// Location of title.ratings (path or URL)
        #[arg(long)]
        title_ratings: Option<String>,

        /// Location of title.crew (path or URL)
        #[arg(long)]
        title_crew: Option<String>,

        /// Location of name.basics (path or URL)
        #[arg(long)]
        name_basics: Option<String>,

        /// Copy numVotes into numWriters, as older releases of this job did
        #[arg(long)]
        legacy_num_writers: bool,
    },
    /// Print the default configuration as JSON, or write it to a file
    Config {
        /// File to write instead of printing
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            config,
            output,
            title_basics,
            title_ratings,
            title_crew,
            name_basics,
            legacy_num_writers,
        } => {
            let mut config = match config {
                Some(path) => EtlConfig::from_file(&path)?,
                None => EtlConfig::default(),
            };

            let sources = &mut config.sources;
            for (slot, value) in [
                (&mut sources.title_basics, title_basics),
                (&mut sources.title_ratings, title_ratings),
                (&mut sources.title_crew, title_crew),
                (&mut sources.name_basics, name_basics),
            ] {
                if let Some(value) = value {
                    *slot = value;
                }
            }
            if let Some(output) = output {
                config.output.path = output;
            }
            if legacy_num_writers {
                config.output.num_writers_source = NumWritersSource::NumVotes;
            }

            handle_run(&config)
        }
        Commands::Config { output } => handle_config(output),
    }
}

#[expect(clippy::print_stdout)]
fn handle_run(config: &EtlConfig) -> Result<()> {
    let report = run_pipeline_with(config)?;
    println!("{}", report.summary());
    Ok(())
}

#[expect(clippy::print_stdout)]
fn handle_config(output: Option<PathBuf>) -> Result<()> {
    let json = EtlConfig::default().to_json()?;
    match output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Default configuration written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
