//! Loading of a single CSV file into a reference table.

use crate::knowledge::schema::latest_schema;
use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use rusqlite::{params_from_iter, Connection};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Inserted { rows: usize },
    /// Every row's key was already stored, or the file had no rows.
    NoNewData,
}

/// `"Item Name "` becomes `"item_name"`.
pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}

/// Appends the rows of `csv_path` to `table_name`.
///
/// The first CSV column is the deduplication key: rows whose key already exists in
/// the table are skipped. Empty cells are stored as NULL. All rows of one file are
/// inserted in a single transaction. Foreign keys to `internal_parts` are not
/// enforced, so child tables load even when their parent rows are missing.
pub fn ingest_csv(conn: &mut Connection, csv_path: &Path, table_name: &str) -> Result<IngestOutcome> {
    let table = latest_schema()
        .table(table_name)
        .with_context(|| format!("Unknown reference table '{}'", table_name))?;

    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_path(csv_path)
        .with_context(|| format!("Failed to open {:?}", csv_path))?;

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read header of {:?}", csv_path))?
        .iter()
        .map(normalize_header)
        .collect();
    if headers.is_empty() || headers.iter().any(|h| h.is_empty()) {
        bail!("{:?} has an empty header", csv_path);
    }
    let known: HashSet<&str> = table.column_names().collect();
    if let Some(unknown) = headers.iter().find(|h| !known.contains(h.as_str())) {
        bail!(
            "Column '{}' of {:?} does not exist in table {}",
            unknown,
            csv_path,
            table.name
        );
    }

    let key_column = &headers[0];
    let existing = existing_keys(conn, table.name, key_column)?;

    let mut fresh: Vec<StringRecord> = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("Malformed row {} in {:?}", line + 1, csv_path))?;
        let key = record.get(0).unwrap_or_default();
        if existing.contains(key) {
            continue;
        }
        fresh.push(record);
    }
    debug!(
        "{:?}: {} new rows, {} keys already in {}",
        csv_path,
        fresh.len(),
        existing.len(),
        table.name
    );

    if fresh.is_empty() {
        info!("No new data to insert into {} from {:?}", table.name, csv_path);
        return Ok(IngestOutcome::NoNewData);
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table.name,
        headers.join(", "),
        vec!["?"; headers.len()].join(", ")
    );
    // No-op inside a transaction, must run before it opens.
    conn.pragma_update(None, "foreign_keys", false)?;
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(&sql)?;
        for record in &fresh {
            let values = record
                .iter()
                .map(|cell| if cell.is_empty() { None } else { Some(cell) });
            stmt.execute(params_from_iter(values))
                .with_context(|| format!("Failed to insert {:?} into {}", record, table.name))?;
        }
    }
    tx.commit()?;

    info!(
        "Inserted {} rows from {:?} into {}",
        fresh.len(),
        csv_path,
        table.name
    );
    Ok(IngestOutcome::Inserted { rows: fresh.len() })
}

fn existing_keys(conn: &Connection, table: &str, column: &str) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT CAST({column} AS TEXT) FROM {table} WHERE {column} IS NOT NULL"
    ))?;
    let keys = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(keys)
}
