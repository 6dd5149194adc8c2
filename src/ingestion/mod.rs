//! Batch loading of reference CSV data into the knowledge database.

mod loader;

pub use loader::{ingest_csv, normalize_header, IngestOutcome};

use crate::knowledge::schema::{
    INTERNAL_PARTS, RECYCLABLE_ITEM_VALUE, RECYCLING_CENTERS, RESALE_DONATE_AREAS, REUSABLE_PARTS,
};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::error;

/// A CSV file and the table it feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSource {
    pub csv_path: PathBuf,
    pub table: String,
}

impl IngestSource {
    pub fn new(csv_path: impl Into<PathBuf>, table: impl Into<String>) -> Self {
        Self {
            csv_path: csv_path.into(),
            table: table.into(),
        }
    }
}

/// File names of the reference CSVs and their tables, parents first.
pub const DEFAULT_SOURCES: &[(&str, &str)] = &[
    ("internal_parts.csv", INTERNAL_PARTS),
    ("recyclable_values.csv", RECYCLABLE_ITEM_VALUE),
    ("recycling_centers.csv", RECYCLING_CENTERS),
    ("reusable_parts.csv", REUSABLE_PARTS),
    ("resale_centers.csv", RESALE_DONATE_AREAS),
];

pub fn default_sources(data_dir: &Path) -> Vec<IngestSource> {
    DEFAULT_SOURCES
        .iter()
        .map(|(file, table)| IngestSource::new(data_dir.join(file), *table))
        .collect()
}

#[derive(Debug)]
pub struct IngestEntry {
    pub source: IngestSource,
    pub result: Result<IngestOutcome, String>,
}

#[derive(Debug, Default)]
pub struct IngestReport {
    pub entries: Vec<IngestEntry>,
}

impl IngestReport {
    pub fn inserted_rows(&self) -> usize {
        self.entries
            .iter()
            .map(|e| match e.result {
                Ok(IngestOutcome::Inserted { rows }) => rows,
                _ => 0,
            })
            .sum()
    }

    pub fn failures(&self) -> usize {
        self.entries.iter().filter(|e| e.result.is_err()).count()
    }
}

/// Ingests every source in order. A failing source is logged and recorded in the
/// report, the remaining ones still run.
pub fn ingest_all(conn: &mut Connection, sources: &[IngestSource]) -> IngestReport {
    let mut report = IngestReport::default();
    for source in sources {
        let result = ingest_csv(conn, &source.csv_path, &source.table).map_err(|e| {
            error!(
                "Error inserting data into {} from {:?}: {:#}",
                source.table, source.csv_path, e
            );
            format!("{:#}", e)
        });
        report.entries.push(IngestEntry {
            source: source.clone(),
            result,
        });
    }
    report
}
