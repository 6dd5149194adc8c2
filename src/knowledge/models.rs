use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use rusqlite::Row;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum YesNo {
    Yes,
    No,
}

impl YesNo {
    pub fn as_str(&self) -> &'static str {
        match self {
            YesNo::Yes => "Yes",
            YesNo::No => "No",
        }
    }
}

impl FromSql for YesNo {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "Yes" => Ok(YesNo::Yes),
            "No" => Ok(YesNo::No),
            other => Err(FromSqlError::Other(
                format!("expected 'Yes' or 'No', got '{}'", other).into(),
            )),
        }
    }
}

/// One part of a detectable item, `item_name` matches the detector's class names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InternalPart {
    pub id: i64,
    pub item_name: String,
    pub part_name: String,
    pub materials_used: String,
    pub recyclable: YesNo,
    pub reusable: YesNo,
    pub recycling_process: String,
}

impl InternalPart {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            item_name: row.get("item_name")?,
            part_name: row.get("part_name")?,
            materials_used: row.get("materials_used")?,
            recyclable: row.get("recyclable")?,
            reusable: row.get("reusable")?,
            recycling_process: row.get("recycling_process")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecyclableValue {
    pub id: i64,
    pub part_name: String,
    pub materials_used: String,
    pub estimated_value: String,
}

impl RecyclableValue {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            part_name: row.get("part_name")?,
            materials_used: row.get("materials_used")?,
            estimated_value: row.get("estimated_value")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReusablePart {
    pub id: i64,
    pub part_name: String,
    pub reuse_potential: String,
    pub estimated_value: String,
}

impl ReusablePart {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            part_name: row.get("part_name")?,
            reuse_potential: row.get("reuse_potential")?,
            estimated_value: row.get("estimated_value")?,
        })
    }
}

/// A row of either `recycling_centers` or `resale_donate_areas`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CenterEntry {
    pub location: String,
    pub center_name: String,
    pub address: String,
    pub contact: Option<String>,
    pub working_hours: Option<String>,
    pub website: Option<String>,
}

impl CenterEntry {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            location: row.get("location")?,
            center_name: row.get("center_name")?,
            address: row.get("address")?,
            contact: row.get("contact")?,
            working_hours: row.get("working_hours")?,
            website: row.get("website")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn yes_no_parses_only_known_values() {
        let conn = Connection::open_in_memory().unwrap();

        let yes: YesNo = conn.query_row("SELECT 'Yes'", [], |row| row.get(0)).unwrap();
        assert_eq!(yes, YesNo::Yes);
        let no: YesNo = conn.query_row("SELECT 'No'", [], |row| row.get(0)).unwrap();
        assert_eq!(no, YesNo::No);

        let bad: rusqlite::Result<YesNo> = conn.query_row("SELECT 'yes'", [], |row| row.get(0));
        assert!(bad.is_err());
    }

    #[test]
    fn center_entry_keeps_missing_optional_fields_as_none() {
        let conn = Connection::open_in_memory().unwrap();
        let entry = conn
            .query_row(
                "SELECT 'Pune' AS location, 'Green Hub' AS center_name, 'MG Road 1' AS address,
                        NULL AS contact, '9-5' AS working_hours, NULL AS website",
                [],
                CenterEntry::from_row,
            )
            .unwrap();

        assert_eq!(entry.center_name, "Green Hub");
        assert_eq!(entry.contact, None);
        assert_eq!(entry.working_hours.as_deref(), Some("9-5"));
        assert_eq!(entry.website, None);
    }
}
