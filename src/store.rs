use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};

use crate::models::PredictionRecord;

/// Append-only store of prediction records, one row per prediction keyed by
/// id. No update or delete operations exist.
pub struct HistoryStore {
    conn: Mutex<Connection>,
}

impl HistoryStore {
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        Self::initialize(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self, rusqlite::Error> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS predictions (
                 id         TEXT PRIMARY KEY,
                 result     TEXT NOT NULL,
                 suggestion TEXT NOT NULL,
                 created_at TEXT NOT NULL
             );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Write-once insert keyed by `record.id`. Retrying the same record is a
    /// no-op, so a retried request cannot overwrite an earlier one.
    pub fn put(&self, record: &PredictionRecord) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO predictions (id, result, suggestion, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO NOTHING",
            params![
                record.id,
                record.result,
                record.suggestion,
                record.created_at
            ],
        )?;
        Ok(())
    }

    /// Returns every persisted record. An empty store yields an empty vector,
    /// never an error.
    pub fn list_all(&self) -> Result<Vec<PredictionRecord>, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id, result, suggestion, created_at FROM predictions")?;
        let rows = stmt.query_map([], |row| {
            Ok(PredictionRecord {
                id: row.get(0)?,
                result: row.get(1)?,
                suggestion: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;
        rows.collect()
    }
}
