//! SQLite Store
//!
//! Single-file entity store for offline runs. Properties are kept as a JSON
//! document per row; ids come from `AUTOINCREMENT`.

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use super::{EntityKey, EntityStore, Properties};
use crate::logic::error::StorageError;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS entities (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        kind        TEXT NOT NULL,
        namespace   TEXT,
        body        TEXT NOT NULL,
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_entities_kind ON entities(kind, namespace);
";

pub struct SqliteStore {
    conn: Mutex<Option<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database file
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StorageError::Backend(e.to_string()))?;
            }
        }
        let conn = Connection::open(path)?;
        tracing::info!(path = %path.display(), "Opened SQLite store");
        Self::with_connection(conn)
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Number of entities in a collection
    pub fn count(&self, collection: &str) -> Result<u64, StorageError> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM entities WHERE kind = ?1",
                params![collection],
                |r| r.get(0),
            )?;
            Ok(n as u64)
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T, StorageError>) -> Result<T, StorageError> {
        let guard = self.conn.lock();
        match guard.as_ref() {
            Some(conn) => f(conn),
            None => Err(StorageError::Backend("store is closed".into())),
        }
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn row_id(key: &EntityKey) -> Result<i64, StorageError> {
    key.id
        .parse()
        .map_err(|_| StorageError::NotFound(key.to_string()))
}

impl EntityStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn put(
        &self,
        properties: &Properties,
        collection: &str,
        namespace: Option<&str>,
    ) -> Result<EntityKey, StorageError> {
        let body = serde_json::to_string(properties).map_err(|e| StorageError::Malformed(e.to_string()))?;

        self.with_conn(|conn| {
            let ts = now();
            conn.execute(
                "INSERT INTO entities (kind, namespace, body, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![collection, namespace, body, ts],
            )?;
            Ok(EntityKey::new(collection, namespace, conn.last_insert_rowid().to_string()))
        })
    }

    fn get(&self, key: &EntityKey) -> Result<Option<Properties>, StorageError> {
        let Ok(id) = row_id(key) else {
            return Ok(None);
        };

        let body: Option<String> = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT body FROM entities WHERE id = ?1 AND kind = ?2 AND namespace IS ?3",
                    params![id, key.kind, key.namespace],
                    |r| r.get(0),
                )
                .optional()?)
        })?;

        body.map(|b| serde_json::from_str(&b).map_err(|e| StorageError::Malformed(e.to_string())))
            .transpose()
    }

    fn update(&self, key: &EntityKey, properties: &Properties) -> Result<(), StorageError> {
        let id = row_id(key)?;
        let body = serde_json::to_string(properties).map_err(|e| StorageError::Malformed(e.to_string()))?;

        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE entities SET body = ?1, updated_at = ?2
                 WHERE id = ?3 AND kind = ?4 AND namespace IS ?5",
                params![body, now(), id, key.kind, key.namespace],
            )?)
        })?;

        if changed == 0 {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Ok(())
    }

    fn health_check(&self) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |r| r.get::<_, i64>(0))?;
            Ok(())
        })
    }

    fn close(&self) -> Result<(), StorageError> {
        if let Some(conn) = self.conn.lock().take() {
            conn.close().map_err(|(_, e)| StorageError::from(e))?;
            tracing::debug!("SQLite store closed");
        }
        Ok(())
    }
}
