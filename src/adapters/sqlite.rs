//! SQLite-backed warranty store.
//!
//! One `warranty` table keyed by `(serial_number, item_number)`. The store
//! stamps `last_updated_at` from its clock on every write and runs the upsert
//! check and write inside one immediate transaction, so overlapping runs
//! against the same database file cannot both insert a key.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{params, Connection, Row, TransactionBehavior};
use tracing::info;

use crate::domain::model::{UpsertOutcome, WarrantyFields, WarrantyRecord};
use crate::domain::ports::{Clock, WarrantyStore};
use crate::utils::error::Result;

pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS warranty (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    serial_number TEXT NOT NULL,
    item_number TEXT NOT NULL,
    entitlement_type TEXT,
    service_provider TEXT,
    service_level_group TEXT,
    service_level_description TEXT,
    service_level_code TEXT,
    start_date TEXT,
    end_date TEXT NOT NULL,
    active INTEGER NOT NULL,
    last_updated_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_warranty_key ON warranty(serial_number, item_number);
"#;

const SELECT_COLUMNS: &str = "id, serial_number, item_number, entitlement_type, service_provider, \
     service_level_group, service_level_description, service_level_code, start_date, end_date, \
     active, last_updated_at";

pub struct SqliteWarrantyStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl SqliteWarrantyStore {
    /// Opens or creates the database file, creating parent directories.
    pub fn open(db_path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&db_path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        let store = Self::with_connection(conn, db_path, clock)?;

        info!(
            "Warranty store opened: {} records, path={}",
            store.count()?,
            store.db_path.display()
        );
        Ok(store)
    }

    pub fn open_in_memory(clock: Arc<dyn Clock>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, PathBuf::from(":memory:"), clock)
    }

    fn with_connection(conn: Connection, db_path: PathBuf, clock: Arc<dyn Clock>) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            clock,
        })
    }

    pub fn count(&self) -> Result<i64> {
        let conn = self.conn.lock();
        let count = conn.query_row("SELECT COUNT(*) FROM warranty", [], |row| row.get(0))?;
        Ok(count)
    }

    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<WarrantyRecord> {
        Ok(WarrantyRecord {
            id: row.get(0)?,
            fields: WarrantyFields {
                serial_number: row.get(1)?,
                item_number: row.get(2)?,
                entitlement_type: row.get(3)?,
                service_provider: row.get(4)?,
                service_level_group: row.get(5)?,
                service_level_description: row.get(6)?,
                service_level_code: row.get(7)?,
                start_date: row.get(8)?,
                end_date: row.get(9)?,
                active: row.get(10)?,
            },
            last_updated_at: row.get(11)?,
        })
    }

    fn query_records(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<WarrantyRecord>> {
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params, Self::row_to_record)?;
        let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn insert_row(conn: &Connection, fields: &WarrantyFields, now: chrono::DateTime<chrono::Utc>) -> Result<()> {
        conn.prepare_cached(
            "INSERT INTO warranty (serial_number, item_number, entitlement_type, service_provider, \
             service_level_group, service_level_description, service_level_code, start_date, \
             end_date, active, last_updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )?
        .execute(params![
            fields.serial_number,
            fields.item_number,
            fields.entitlement_type,
            fields.service_provider,
            fields.service_level_group,
            fields.service_level_description,
            fields.service_level_code,
            fields.start_date,
            fields.end_date,
            fields.active,
            now,
        ])?;
        Ok(())
    }

    fn update_rows(conn: &Connection, fields: &WarrantyFields, now: chrono::DateTime<chrono::Utc>) -> Result<usize> {
        let written = conn
            .prepare_cached(
                "UPDATE warranty SET entitlement_type = ?3, service_provider = ?4, \
                 service_level_group = ?5, service_level_description = ?6, \
                 service_level_code = ?7, start_date = ?8, end_date = ?9, active = ?10, \
                 last_updated_at = ?11 \
                 WHERE serial_number = ?1 AND item_number = ?2",
            )?
            .execute(params![
                fields.serial_number,
                fields.item_number,
                fields.entitlement_type,
                fields.service_provider,
                fields.service_level_group,
                fields.service_level_description,
                fields.service_level_code,
                fields.start_date,
                fields.end_date,
                fields.active,
                now,
            ])?;
        Ok(written)
    }
}

impl WarrantyStore for SqliteWarrantyStore {
    async fn find_by_serial(&self, serial_number: &str) -> Result<Vec<WarrantyRecord>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM warranty WHERE serial_number = ?1 ORDER BY id",
            SELECT_COLUMNS
        );
        Self::query_records(&conn, &sql, params![serial_number])
    }

    async fn find_by_key(&self, serial_number: &str, item_number: &str) -> Result<Vec<WarrantyRecord>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM warranty WHERE serial_number = ?1 AND item_number = ?2 ORDER BY id",
            SELECT_COLUMNS
        );
        Self::query_records(&conn, &sql, params![serial_number, item_number])
    }

    async fn insert(&self, fields: &WarrantyFields) -> Result<()> {
        let now = self.clock.now();
        let conn = self.conn.lock();
        Self::insert_row(&conn, fields, now)
    }

    async fn update(&self, fields: &WarrantyFields) -> Result<usize> {
        let now = self.clock.now();
        let conn = self.conn.lock();
        Self::update_rows(&conn, fields, now)
    }

    async fn upsert(&self, fields: &WarrantyFields) -> Result<UpsertOutcome> {
        let now = self.clock.now();
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: i64 = tx.query_row(
            "SELECT COUNT(*) FROM warranty WHERE serial_number = ?1 AND item_number = ?2",
            params![fields.serial_number, fields.item_number],
            |row| row.get(0),
        )?;

        let outcome = if existing == 0 {
            Self::insert_row(&tx, fields, now)?;
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated(Self::update_rows(&tx, fields, now)?)
        };

        tx.commit()?;
        Ok(outcome)
    }
}
