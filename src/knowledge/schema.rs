//! Schema of the reference database.

use crate::sqlite_column;
use crate::sqlite_persistence::{ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema};

pub const INTERNAL_PARTS: &str = "internal_parts";
pub const RECYCLABLE_ITEM_VALUE: &str = "recyclable_item_value";
pub const RECYCLING_CENTERS: &str = "recycling_centers";
pub const REUSABLE_PARTS: &str = "reusable_parts";
pub const RESALE_DONATE_AREAS: &str = "resale_donate_areas";

const INTERNAL_PART_FK: ForeignKey = ForeignKey {
    foreign_table: INTERNAL_PARTS,
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

// =============================================================================
// Version 1
// =============================================================================

const INTERNAL_PARTS_TABLE_V1: Table = Table {
    name: INTERNAL_PARTS,
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("item_name", &SqlType::Text, non_null = true),
        sqlite_column!("part_name", &SqlType::Text, non_null = true),
        sqlite_column!("materials_used", &SqlType::Text, non_null = true),
        sqlite_column!(
            "recyclable",
            &SqlType::Text,
            non_null = true,
            check = Some("recyclable IN ('Yes', 'No')")
        ),
        sqlite_column!(
            "reusable",
            &SqlType::Text,
            non_null = true,
            check = Some("reusable IN ('Yes', 'No')")
        ),
        sqlite_column!("recycling_process", &SqlType::Text, non_null = true),
    ],
    indices: &[
        ("idx_internal_parts_item_name", "item_name"),
        ("idx_internal_parts_part_name", "part_name"),
    ],
};

const RECYCLABLE_ITEM_VALUE_TABLE_V1: Table = Table {
    name: RECYCLABLE_ITEM_VALUE,
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "item_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&INTERNAL_PART_FK)
        ),
        sqlite_column!("part_name", &SqlType::Text, non_null = true),
        sqlite_column!("materials_used", &SqlType::Text, non_null = true),
        sqlite_column!("estimated_value", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_recyclable_item_value_part_name", "part_name")],
};

const RECYCLING_CENTERS_TABLE_V1: Table = Table {
    name: RECYCLING_CENTERS,
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("location", &SqlType::Text, non_null = true),
        sqlite_column!("center_name", &SqlType::Text, non_null = true),
        sqlite_column!("address", &SqlType::Text, non_null = true),
        sqlite_column!("contact", &SqlType::Text),
        sqlite_column!("working_hours", &SqlType::Text),
        sqlite_column!("website", &SqlType::Text),
    ],
    indices: &[],
};

const REUSABLE_PARTS_TABLE_V1: Table = Table {
    name: REUSABLE_PARTS,
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "item_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&INTERNAL_PART_FK)
        ),
        sqlite_column!("part_name", &SqlType::Text, non_null = true),
        sqlite_column!("reuse_potential", &SqlType::Text, non_null = true),
        sqlite_column!("estimated_value", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_reusable_parts_part_name", "part_name")],
};

const RESALE_DONATE_AREAS_TABLE_V1: Table = Table {
    name: RESALE_DONATE_AREAS,
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("location", &SqlType::Text, non_null = true),
        sqlite_column!("center_name", &SqlType::Text, non_null = true),
        sqlite_column!("address", &SqlType::Text, non_null = true),
        sqlite_column!("contact", &SqlType::Text),
        sqlite_column!("working_hours", &SqlType::Text),
        sqlite_column!("website", &SqlType::Text),
    ],
    indices: &[],
};

/// Parents before children, the order tables must be filled in.
pub const KNOWLEDGE_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[
        INTERNAL_PARTS_TABLE_V1,
        RECYCLABLE_ITEM_VALUE_TABLE_V1,
        RECYCLING_CENTERS_TABLE_V1,
        REUSABLE_PARTS_TABLE_V1,
        RESALE_DONATE_AREAS_TABLE_V1,
    ],
    migration: None,
}];

pub fn latest_schema() -> &'static VersionedSchema {
    // The slice literal above is never empty.
    &KNOWLEDGE_VERSIONED_SCHEMAS[KNOWLEDGE_VERSIONED_SCHEMAS.len() - 1]
}
