//! Document record store.
//!
//! SQLite-backed persistence for downloaded factsheets. Records are keyed
//! by filename with get-or-create semantics, so re-running a batch over an
//! existing database never duplicates a document.

use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Persistence failures. Fatal for the affected security only.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("store worker failed: {0}")]
    Worker(String),
}

/// A stored document row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    pub id: i64,
    pub name: String,
    pub source_ref: String,
    pub path: String,
    pub stored_at: String,
}

/// SQLite document store.
///
/// The connection lives behind a mutex so writes can run on a blocking
/// worker while the orchestrator thread keeps driving the browser. The
/// orchestrator awaits each write before moving on, so at most one write
/// is ever in flight.
#[derive(Clone)]
pub struct DocumentStore {
    conn: Arc<Mutex<Connection>>,
}

impl DocumentStore {
    /// Open (creating if needed) the database and ensure the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory store, for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS documents (
                id         INTEGER PRIMARY KEY,
                name       TEXT NOT NULL UNIQUE,
                source_ref TEXT NOT NULL,
                path       TEXT NOT NULL,
                stored_at  TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create-or-fetch the record for `name`, then attach the file path
    /// and source attribution. Idempotent on filename collision: an
    /// existing row is updated in place, never duplicated.
    pub fn attach(
        &self,
        name: &str,
        source_ref: &str,
        file_path: &Path,
    ) -> Result<DocumentRecord, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Worker(e.to_string()))?;

        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO documents (name, source_ref, path, stored_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(name) DO UPDATE SET
                 source_ref = excluded.source_ref,
                 path       = excluded.path,
                 stored_at  = excluded.stored_at",
            params![
                name,
                source_ref,
                file_path.to_string_lossy(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        let record = Self::get_by_name_inner(&tx, name)?
            .ok_or_else(|| StoreError::Worker(format!("row vanished after upsert: {name}")))?;
        tx.commit()?;

        Ok(record)
    }

    /// Run `attach` on the blocking pool; awaited by the caller so writes
    /// stay strictly ordered with respect to acquisition.
    pub async fn attach_on_worker(
        &self,
        name: String,
        source_ref: String,
        file_path: PathBuf,
    ) -> Result<DocumentRecord, StoreError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.attach(&name, &source_ref, &file_path))
            .await
            .map_err(|e| StoreError::Worker(e.to_string()))?
    }

    /// Fetch a record by filename, if present.
    pub fn get_by_name(&self, name: &str) -> Result<Option<DocumentRecord>, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Worker(e.to_string()))?;
        Self::get_by_name_inner(&conn, name)
    }

    fn get_by_name_inner(
        conn: &Connection,
        name: &str,
    ) -> Result<Option<DocumentRecord>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT id, name, source_ref, path, stored_at FROM documents WHERE name = ?1",
        )?;
        let mut rows = stmt.query(params![name])?;
        match rows.next()? {
            Some(row) => Ok(Some(DocumentRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                source_ref: row.get(2)?,
                path: row.get(3)?,
                stored_at: row.get(4)?,
            })),
            None => Ok(None),
        }
    }

    /// Number of stored documents.
    pub fn count(&self) -> Result<i64, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Worker(e.to_string()))?;
        let n = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_then_get() {
        let store = DocumentStore::open_in_memory().unwrap();
        let rec = store
            .attach("Fund Report.pdf", "fund-42", Path::new("/tmp/Fund Report.pdf"))
            .unwrap();
        assert_eq!(rec.name, "Fund Report.pdf");
        assert_eq!(rec.source_ref, "fund-42");

        let fetched = store.get_by_name("Fund Report.pdf").unwrap().unwrap();
        assert_eq!(fetched.id, rec.id);
    }

    #[test]
    fn test_attach_is_idempotent_on_filename_collision() {
        let store = DocumentStore::open_in_memory().unwrap();
        let first = store
            .attach("report.pdf", "fund-1", Path::new("/a/report.pdf"))
            .unwrap();
        let second = store
            .attach("report.pdf", "fund-1", Path::new("/b/report.pdf"))
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.path, "/b/report.pdf");
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("docs.db");
        {
            let store = DocumentStore::open(&db).unwrap();
            store
                .attach("a.pdf", "fund-9", Path::new("/x/a.pdf"))
                .unwrap();
        }
        let store = DocumentStore::open(&db).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_attach_on_worker() {
        let store = DocumentStore::open_in_memory().unwrap();
        let rec = store
            .attach_on_worker(
                "w.pdf".into(),
                "fund-7".into(),
                PathBuf::from("/tmp/w.pdf"),
            )
            .await
            .unwrap();
        assert_eq!(rec.source_ref, "fund-7");
    }
}
