use super::models::{CenterEntry, InternalPart, RecyclableValue, ReusablePart};
use super::schema::{latest_schema, KNOWLEDGE_VERSIONED_SCHEMAS};
use super::{KnowledgeReader, KnowledgeStore};
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{bail, Context, Result};
use rusqlite::{params_from_iter, Connection, OpenFlags, Row};
use std::path::{Path, PathBuf};
use tracing::info;

/// Reference database backed by a SQLite file.
///
/// Request-time lookups open their own read-only connection through
/// [`KnowledgeStore::open_reader`], the connection is closed when the reader is dropped.
pub struct SqliteKnowledgeStore {
    db_path: PathBuf,
}

impl SqliteKnowledgeStore {
    /// Opens the database at `db_path`, creating the schema if the database is new
    /// and validating it otherwise.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        open_and_prepare(&db_path)?;
        Ok(Self { db_path })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

/// Opens a read-write connection to the reference database, ready to be written to.
///
/// Fresh databases get the latest schema. Databases created by the legacy setup
/// script (no version stamp, but the same tables) are adopted: missing indices are
/// added and the version is stamped. Anything else must validate against its version.
pub fn open_and_prepare(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open reference database at {:?}", db_path))?;

    let raw_version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let schema = latest_schema();

    if raw_version == 0 {
        let table_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
            [],
            |row| row.get(0),
        )?;
        if table_count == 0 {
            info!("Creating reference database schema at {:?}", db_path);
            schema.create(&conn)?;
        } else {
            info!("Adopting unversioned reference database at {:?}", db_path);
            adopt_unversioned(&conn)?;
        }
        return Ok(conn);
    }

    let db_version = raw_version - BASE_DB_VERSION as i64;
    let version_index = KNOWLEDGE_VERSIONED_SCHEMAS
        .iter()
        .position(|s| s.version as i64 == db_version)
        .with_context(|| format!("Unknown reference database version {}", db_version))?;

    KNOWLEDGE_VERSIONED_SCHEMAS[version_index]
        .validate(&conn)
        .with_context(|| {
            format!(
                "Reference database schema validation failed for version {}",
                db_version
            )
        })?;

    for next in KNOWLEDGE_VERSIONED_SCHEMAS.iter().skip(version_index + 1) {
        info!(
            "Migrating reference database to version {}",
            next.version
        );
        if let Some(migration) = next.migration {
            migration(&conn)
                .with_context(|| format!("Failed to run migration to version {}", next.version))?;
        }
        next.stamp(&conn)?;
    }

    Ok(conn)
}

fn adopt_unversioned(conn: &Connection) -> Result<()> {
    let schema = latest_schema();
    for table in schema.tables {
        for (index_name, column) in table.indices {
            conn.execute(
                &format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {}({});",
                    index_name, table.name, column
                ),
                [],
            )
            .with_context(|| format!("Table {} can not be adopted", table.name))?;
        }
    }
    if let Err(e) = schema.validate(conn) {
        bail!("Unversioned database does not match the reference schema: {}", e);
    }
    schema.stamp(conn)
}

impl KnowledgeStore for SqliteKnowledgeStore {
    fn open_reader(&self) -> Result<Box<dyn KnowledgeReader>> {
        let conn = Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open reference database at {:?}", self.db_path))?;
        Ok(Box::new(SqliteKnowledgeReader { conn }))
    }
}

pub struct SqliteKnowledgeReader {
    conn: Connection,
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}

impl SqliteKnowledgeReader {
    fn query_rows<T>(
        &self,
        sql: &str,
        params: &[String],
        map: fn(&Row) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), map)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl KnowledgeReader for SqliteKnowledgeReader {
    fn internal_parts(&self, item_names: &[String]) -> Result<Vec<InternalPart>> {
        if item_names.is_empty() {
            return Ok(vec![]);
        }
        let sql = format!(
            "SELECT id, item_name, part_name, materials_used, recyclable, reusable, recycling_process
             FROM internal_parts
             WHERE item_name IN ({})
             ORDER BY id",
            placeholders(item_names.len())
        );
        self.query_rows(&sql, item_names, InternalPart::from_row)
    }

    fn recyclable_values(&self, item_names: &[String]) -> Result<Vec<RecyclableValue>> {
        if item_names.is_empty() {
            return Ok(vec![]);
        }
        let sql = format!(
            "SELECT riv.id, riv.part_name, riv.materials_used, riv.estimated_value
             FROM recyclable_item_value riv
             WHERE riv.part_name IN (
                 SELECT ip.part_name FROM internal_parts ip WHERE ip.item_name IN ({})
             )
             ORDER BY riv.id",
            placeholders(item_names.len())
        );
        self.query_rows(&sql, item_names, RecyclableValue::from_row)
    }

    fn reusable_parts(&self, item_names: &[String]) -> Result<Vec<ReusablePart>> {
        if item_names.is_empty() {
            return Ok(vec![]);
        }
        let sql = format!(
            "SELECT rp.id, rp.part_name, rp.reuse_potential, rp.estimated_value
             FROM reusable_parts rp
             WHERE rp.part_name IN (
                 SELECT ip.part_name FROM internal_parts ip WHERE ip.item_name IN ({})
             )
             ORDER BY rp.id",
            placeholders(item_names.len())
        );
        self.query_rows(&sql, item_names, ReusablePart::from_row)
    }

    fn recycling_centers(&self) -> Result<Vec<CenterEntry>> {
        self.query_rows(
            "SELECT location, center_name, address, contact, working_hours, website
             FROM recycling_centers ORDER BY id",
            &[],
            CenterEntry::from_row,
        )
    }

    fn resale_donate_areas(&self) -> Result<Vec<CenterEntry>> {
        self.query_rows(
            "SELECT location, center_name, address, contact, working_hours, website
             FROM resale_donate_areas ORDER BY id",
            &[],
            CenterEntry::from_row,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::models::YesNo;
    use tempfile::TempDir;

    fn seeded_store() -> (TempDir, SqliteKnowledgeStore) {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("data.db");
        let store = SqliteKnowledgeStore::new(&db_path).unwrap();
        let conn = open_and_prepare(&db_path).unwrap();
        conn.execute_batch(
            "INSERT INTO internal_parts VALUES (1, 'bottle', 'cap', 'PP', 'Yes', 'Yes', 'Shred');
             INSERT INTO internal_parts VALUES (2, 'bottle', 'body', 'PET', 'Yes', 'No', 'Wash');
             INSERT INTO internal_parts VALUES (3, 'laptop', 'battery', 'Li-ion', 'Yes', 'No', 'E-waste');
             INSERT INTO recyclable_item_value VALUES (1, 2, 'body', 'PET', '5/kg');
             INSERT INTO recyclable_item_value VALUES (2, 3, 'battery', 'Li-ion', '80/unit');
             INSERT INTO reusable_parts VALUES (1, 1, 'cap', 'Crafts', '0.1/unit');
             INSERT INTO recycling_centers VALUES (1, 'Pune', 'Green Hub', 'MG Road 1', NULL, '9-5', NULL);
             INSERT INTO resale_donate_areas VALUES (1, 'Pune', 'Second Life', 'FC Road 7', '555', NULL, NULL);",
        )
        .unwrap();
        (dir, store)
    }

    #[test]
    fn creates_schema_for_new_database() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("fresh.db");
        SqliteKnowledgeStore::new(&db_path).unwrap();

        let conn = Connection::open(&db_path).unwrap();
        let version: usize = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, BASE_DB_VERSION + latest_schema().version);
        latest_schema().validate(&conn).unwrap();
    }

    #[test]
    fn reopening_an_existing_database_validates_it() {
        let (dir, _store) = seeded_store();
        SqliteKnowledgeStore::new(dir.path().join("data.db")).unwrap();
    }

    #[test]
    fn adopts_database_created_by_legacy_setup() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("legacy.db");
        let conn = Connection::open(&db_path).unwrap();
        conn.execute_batch(
            "CREATE TABLE internal_parts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                item_name TEXT NOT NULL,
                part_name TEXT NOT NULL,
                materials_used TEXT NOT NULL,
                recyclable TEXT CHECK(recyclable IN ('Yes', 'No')) NOT NULL,
                reusable TEXT CHECK(reusable IN ('Yes', 'No')) NOT NULL,
                recycling_process TEXT NOT NULL
            );
            CREATE TABLE recyclable_item_value (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                item_id INTEGER NOT NULL,
                part_name TEXT NOT NULL,
                materials_used TEXT NOT NULL,
                estimated_value TEXT NOT NULL,
                FOREIGN KEY (item_id) REFERENCES internal_parts(id) ON DELETE CASCADE
            );
            CREATE TABLE recycling_centers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                location TEXT NOT NULL,
                center_name TEXT NOT NULL,
                address TEXT NOT NULL,
                contact TEXT,
                working_hours TEXT,
                website TEXT
            );
            CREATE TABLE reusable_parts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                item_id INTEGER NOT NULL,
                part_name TEXT NOT NULL,
                reuse_potential TEXT NOT NULL,
                estimated_value TEXT NOT NULL,
                FOREIGN KEY (item_id) REFERENCES internal_parts(id) ON DELETE CASCADE
            );
            CREATE TABLE resale_donate_areas (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                location TEXT NOT NULL,
                center_name TEXT NOT NULL,
                address TEXT NOT NULL,
                contact TEXT,
                working_hours TEXT,
                website TEXT
            );",
        )
        .unwrap();
        drop(conn);

        SqliteKnowledgeStore::new(&db_path).unwrap();

        let conn = Connection::open(&db_path).unwrap();
        let version: usize = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, BASE_DB_VERSION + 1);
    }

    #[test]
    fn refuses_unrelated_unversioned_database() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("other.db");
        let conn = Connection::open(&db_path).unwrap();
        conn.execute("CREATE TABLE playlists (id INTEGER PRIMARY KEY)", [])
            .unwrap();
        drop(conn);

        assert!(SqliteKnowledgeStore::new(&db_path).is_err());
    }

    #[test]
    fn internal_parts_are_filtered_by_item_name() {
        let (_dir, store) = seeded_store();
        let reader = store.open_reader().unwrap();

        let parts = reader.internal_parts(&["bottle".to_string()]).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].part_name, "cap");
        assert_eq!(parts[0].reusable, YesNo::Yes);
        assert_eq!(parts[1].part_name, "body");
        assert_eq!(parts[1].reusable, YesNo::No);
    }

    #[test]
    fn values_follow_parts_of_the_requested_items() {
        let (_dir, store) = seeded_store();
        let reader = store.open_reader().unwrap();
        let names = vec!["bottle".to_string()];

        let values = reader.recyclable_values(&names).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].part_name, "body");
        assert_eq!(values[0].estimated_value, "5/kg");

        let reusable = reader.reusable_parts(&names).unwrap();
        assert_eq!(reusable.len(), 1);
        assert_eq!(reusable[0].reuse_potential, "Crafts");
    }

    #[test]
    fn center_tables_are_read_in_full() {
        let (_dir, store) = seeded_store();
        let reader = store.open_reader().unwrap();

        let centers = reader.recycling_centers().unwrap();
        assert_eq!(centers.len(), 1);
        assert_eq!(centers[0].center_name, "Green Hub");

        let areas = reader.resale_donate_areas().unwrap();
        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].contact.as_deref(), Some("555"));
    }

    #[test]
    fn reader_can_not_write() {
        let (_dir, store) = seeded_store();
        let reader = SqliteKnowledgeReader {
            conn: Connection::open_with_flags(store.db_path(), OpenFlags::SQLITE_OPEN_READ_ONLY)
                .unwrap(),
        };
        let result = reader
            .conn
            .execute("DELETE FROM recycling_centers", []);
        assert!(result.is_err());
    }
}
