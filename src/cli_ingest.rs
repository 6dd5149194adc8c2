use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use recycle_lens::ingestion::{default_sources, ingest_all, IngestOutcome, IngestSource};
use recycle_lens::knowledge::open_and_prepare;

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

/// Loads reference CSV data into the knowledge database. Rows whose first column
/// already exists in the table are skipped.
#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the reference database, created if missing.
    #[clap(long, value_parser = parse_path, default_value = "data.db")]
    pub db_path: PathBuf,

    /// Directory holding the five reference CSV files.
    #[clap(long, value_parser = parse_path, default_value = ".")]
    pub data_dir: PathBuf,

    /// Ingest a single CSV file instead of the default set, requires --table.
    #[clap(long, value_parser = parse_path, requires = "table")]
    pub csv: Option<PathBuf>,

    /// Target table of --csv.
    #[clap(long, requires = "csv")]
    pub table: Option<String>,
}

impl CliArgs {
    fn sources(&self) -> Vec<IngestSource> {
        match (&self.csv, &self.table) {
            (Some(csv), Some(table)) => vec![IngestSource::new(csv.clone(), table.clone())],
            _ => default_sources(&self.data_dir),
        }
    }
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let mut conn = open_and_prepare(&cli_args.db_path)?;
    info!("Reference database ready at {:?}", cli_args.db_path);

    let report = ingest_all(&mut conn, &cli_args.sources());
    for entry in &report.entries {
        let csv = entry.source.csv_path.display();
        let table = &entry.source.table;
        match &entry.result {
            Ok(IngestOutcome::Inserted { rows }) => {
                println!("Inserted {} rows from {} into {}.", rows, csv, table)
            }
            Ok(IngestOutcome::NoNewData) => {
                println!("No new data to insert into {} from {}.", table, csv)
            }
            Err(e) => println!("Error inserting data into {}: {}", table, e),
        }
    }
    println!(
        "Done: {} rows inserted, {} of {} sources failed.",
        report.inserted_rows(),
        report.failures(),
        report.entries.len()
    );

    if report.failures() == report.entries.len() && !report.entries.is_empty() {
        bail!("No source could be ingested");
    }
    Ok(())
}
