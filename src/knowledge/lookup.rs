use super::models::{CenterEntry, InternalPart, RecyclableValue, ReusablePart};
use super::KnowledgeStore;
use crate::server::metrics::{record_lookup_failure, record_lookup_query};
use anyhow::Result;
use rusqlite::ErrorCode;
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{debug, error};

/// Records related to a set of detected classes.
///
/// Every field is resolved independently: `None` means that query failed and the
/// information is unavailable, `Some(vec![])` means the query ran and found nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LookupResult {
    pub parts: Option<Vec<InternalPart>>,
    pub recyclable_values: Option<Vec<RecyclableValue>>,
    pub recycling_centers: Option<Vec<CenterEntry>>,
    pub reusable_parts: Option<Vec<ReusablePart>>,
    pub resale_donate_areas: Option<Vec<CenterEntry>>,
}

/// Resolves `class_names` against the reference tables.
///
/// An empty set returns an all-`None` result without touching the store.
/// Failures are logged and counted, never returned.
pub fn lookup(store: &dyn KnowledgeStore, class_names: &BTreeSet<String>) -> LookupResult {
    if class_names.is_empty() {
        return LookupResult::default();
    }

    let reader = match store.open_reader() {
        Ok(reader) => reader,
        Err(err) => {
            error!("Knowledge store unavailable, skipping every lookup: {:#}", err);
            record_lookup_failure("open", failure_kind(&err));
            return LookupResult::default();
        }
    };

    let names: Vec<String> = class_names.iter().cloned().collect();
    debug!("Looking up {} classes: {:?}", names.len(), names);

    LookupResult {
        parts: run_query("parts", || reader.internal_parts(&names)),
        recyclable_values: run_query("recyclable_values", || reader.recyclable_values(&names)),
        recycling_centers: run_query("recycling_centers", || reader.recycling_centers()),
        reusable_parts: run_query("reusable_parts", || reader.reusable_parts(&names)),
        resale_donate_areas: run_query("resale_donate_areas", || reader.resale_donate_areas()),
    }
}

fn run_query<T>(query: &'static str, run: impl FnOnce() -> Result<Vec<T>>) -> Option<Vec<T>> {
    let start = Instant::now();
    let result = run();
    record_lookup_query(query, start.elapsed());

    match result {
        Ok(rows) => Some(rows),
        Err(err) => {
            let kind = failure_kind(&err);
            error!("Lookup query '{}' failed ({}): {:#}", query, kind, err);
            record_lookup_failure(query, kind);
            None
        }
    }
}

/// Coarse classification of a lookup failure, used as log and metric label.
///
/// "query" covers everything SQLite reports as a generic error (syntax, missing
/// table or column), "data" covers rows that do not fit the models.
fn failure_kind(err: &anyhow::Error) -> &'static str {
    let Some(sql_err) = err.downcast_ref::<rusqlite::Error>() else {
        return "other";
    };
    match sql_err {
        rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::IntegralValueOutOfRange(..)
        | rusqlite::Error::InvalidColumnName(..) => "data",
        _ => match sql_err.sqlite_error_code() {
            Some(
                ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::NotADatabase
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::SystemIoFailure,
            ) => "connectivity",
            Some(_) => "query",
            None => "other",
        },
    }
}
