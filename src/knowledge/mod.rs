//! Reference knowledge base: recyclable parts, their values and where to bring them.

mod lookup;
pub mod models;
pub mod schema;
mod store;

pub use lookup::{lookup, LookupResult};
pub use models::{CenterEntry, InternalPart, RecyclableValue, ReusablePart, YesNo};
pub use store::{open_and_prepare, SqliteKnowledgeStore};

use anyhow::Result;

/// Source of [`KnowledgeReader`]s, one per lookup.
pub trait KnowledgeStore: Send + Sync {
    fn open_reader(&self) -> Result<Box<dyn KnowledgeReader>>;
}

/// Read access to the reference tables, scoped to a single lookup.
pub trait KnowledgeReader {
    /// Rows of `internal_parts` whose `item_name` is one of `item_names`.
    fn internal_parts(&self, item_names: &[String]) -> Result<Vec<InternalPart>>;

    /// Rows of `recyclable_item_value` whose `part_name` belongs to a part of one of `item_names`.
    fn recyclable_values(&self, item_names: &[String]) -> Result<Vec<RecyclableValue>>;

    /// Rows of `reusable_parts` whose `part_name` belongs to a part of one of `item_names`.
    fn reusable_parts(&self, item_names: &[String]) -> Result<Vec<ReusablePart>>;

    fn recycling_centers(&self) -> Result<Vec<CenterEntry>>;

    fn resale_donate_areas(&self) -> Result<Vec<CenterEntry>>;
}
