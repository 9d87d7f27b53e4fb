//! SQLite-backed primary store.
//!
//! Object bodies are stored as JSON text. Counters, the unique index and the
//! edge set each get their own table; the edge table keeps a sequence column
//! so adjacency lists come back in insertion order.

use crate::{ObjectPage, PrimaryStore, StorageError, StorageResult};
use async_trait::async_trait;
use graphstore_model::GraphObject;
use graphstore_types::{CounterModifier, EdgeTriple, ObjectId};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Persistent primary store backed by SQLite.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StorageResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut conn)
        })
        .await
        .map_err(|e| StorageError::TaskJoin(e.to_string()))?
    }
}

/// Creates the tables and indexes if they do not exist.
fn init_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS objects (
            id TEXT PRIMARY KEY,
            object_type TEXT NOT NULL,
            body TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_objects_type ON objects(object_type, id);

        CREATE TABLE IF NOT EXISTS counters (
            id TEXT NOT NULL,
            field TEXT NOT NULL,
            value INTEGER NOT NULL,
            PRIMARY KEY (id, field)
        );

        CREATE TABLE IF NOT EXISTS uniques (
            object_type TEXT NOT NULL,
            field TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (object_type, field, value)
        );

        CREATE TABLE IF NOT EXISTS edges (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            src TEXT NOT NULL,
            edge_name TEXT NOT NULL,
            dst TEXT NOT NULL,
            UNIQUE(src, edge_name, dst)
        );
        CREATE INDEX IF NOT EXISTS idx_edges_reverse ON edges(edge_name, dst);
        ",
    )?;
    Ok(())
}

fn load_body(conn: &Connection, id: &str) -> StorageResult<Option<GraphObject>> {
    let body: Option<String> = conn
        .query_row("SELECT body FROM objects WHERE id = ?1", params![id], |row| {
            row.get(0)
        })
        .optional()?;
    body.map(|b| parse_body(&b)).transpose()
}

fn parse_body(body: &str) -> StorageResult<GraphObject> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    GraphObject::from_value(value)
        .ok_or_else(|| StorageError::InvalidData("object body is not a JSON object".into()))
}

fn store_body(conn: &Connection, id: &str, object: &GraphObject) -> StorageResult<()> {
    let body = serde_json::to_string(object)?;
    conn.execute(
        "INSERT INTO objects (id, object_type, body) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET object_type = excluded.object_type, body = excluded.body",
        params![id, object.object_type().unwrap_or_default(), body],
    )?;
    Ok(())
}

fn ids_from(rows: Vec<String>) -> StorageResult<Vec<ObjectId>> {
    rows.iter()
        .map(|s| ObjectId::parse(s).map_err(|e| StorageError::InvalidData(e.to_string())))
        .collect()
}

#[async_trait]
impl PrimaryStore for SqliteStore {
    async fn init(&self) -> StorageResult<()> {
        self.with_conn(|conn| init_schema(conn)).await
    }

    async fn create_object(&self, id: &ObjectId, object: &GraphObject) -> StorageResult<()> {
        let id = id.to_string();
        let object = object.clone();
        self.with_conn(move |conn| store_body(conn, &id, &object))
            .await
    }

    async fn get_object(&self, id: &ObjectId) -> StorageResult<Option<GraphObject>> {
        let id = id.to_string();
        self.with_conn(move |conn| load_body(conn, &id)).await
    }

    async fn update_object(
        &self,
        id: &ObjectId,
        patch: &GraphObject,
    ) -> StorageResult<GraphObject> {
        let id = id.to_string();
        let patch = patch.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let mut object = load_body(&tx, &id)?.unwrap_or_default();
            object.merge(&patch);
            store_body(&tx, &id, &object)?;
            tx.commit()?;
            Ok(object)
        })
        .await
    }

    async fn query_objects(
        &self,
        object_type: &str,
        after: Option<&ObjectId>,
        limit: usize,
    ) -> StorageResult<ObjectPage> {
        let object_type = object_type.to_string();
        let after = after.map(ToString::to_string).unwrap_or_default();
        // One extra row tells whether another page follows.
        let fetch = i64::try_from(limit.saturating_add(1)).unwrap_or(i64::MAX);
        let mut rows: Vec<(String, String)> = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, body FROM objects
                     WHERE object_type = ?1 AND id > ?2
                     ORDER BY id LIMIT ?3",
                )?;
                let rows = stmt
                    .query_map(params![object_type, after, fetch], |row| {
                        Ok((row.get(0)?, row.get(1)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        let has_more = rows.len() > limit;
        rows.truncate(limit);
        let next = match rows.last() {
            Some((id, _)) if has_more => {
                Some(ObjectId::parse(id).map_err(|e| StorageError::InvalidData(e.to_string()))?)
            }
            _ => None,
        };
        let objects = rows
            .iter()
            .map(|(_, body)| parse_body(body))
            .collect::<StorageResult<Vec<_>>>()?;
        Ok(ObjectPage { objects, next })
    }

    async fn get_counter(&self, id: &ObjectId, field: &str) -> StorageResult<i64> {
        let id = id.to_string();
        let field = field.to_string();
        self.with_conn(move |conn| {
            let value: Option<i64> = conn
                .query_row(
                    "SELECT value FROM counters WHERE id = ?1 AND field = ?2",
                    params![id, field],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value.unwrap_or(0))
        })
        .await
    }

    async fn set_counter(
        &self,
        id: &ObjectId,
        field: &str,
        modifier: CounterModifier,
    ) -> StorageResult<i64> {
        let id = id.to_string();
        let field = field.to_string();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let current: i64 = tx
                .query_row(
                    "SELECT value FROM counters WHERE id = ?1 AND field = ?2",
                    params![id, field],
                    |row| row.get(0),
                )
                .optional()?
                .unwrap_or(0);
            let next = modifier.apply(current);
            tx.execute(
                "INSERT INTO counters (id, field, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id, field) DO UPDATE SET value = excluded.value",
                params![id, field, next],
            )?;
            tx.commit()?;
            debug!(%id, %field, %modifier, value = next, "counter written");
            Ok(next)
        })
        .await
    }

    async fn check_unique(
        &self,
        object_type: &str,
        field: &str,
        value: &str,
    ) -> StorageResult<bool> {
        let (object_type, field, value) =
            (object_type.to_string(), field.to_string(), value.to_string());
        self.with_conn(move |conn| {
            let taken: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM uniques
                 WHERE object_type = ?1 AND field = ?2 AND value = ?3)",
                params![object_type, field, value],
                |row| row.get(0),
            )?;
            Ok(!taken)
        })
        .await
    }

    async fn add_unique(&self, object_type: &str, field: &str, value: &str) -> StorageResult<bool> {
        let (object_type, field, value) =
            (object_type.to_string(), field.to_string(), value.to_string());
        self.with_conn(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO uniques (object_type, field, value) VALUES (?1, ?2, ?3)",
                params![object_type, field, value],
            )?;
            Ok(inserted == 1)
        })
        .await
    }

    async fn remove_unique(
        &self,
        object_type: &str,
        field: &str,
        value: &str,
    ) -> StorageResult<()> {
        let (object_type, field, value) =
            (object_type.to_string(), field.to_string(), value.to_string());
        self.with_conn(move |conn| {
            conn.execute(
                "DELETE FROM uniques WHERE object_type = ?1 AND field = ?2 AND value = ?3",
                params![object_type, field, value],
            )?;
            Ok(())
        })
        .await
    }

    async fn create_edge(&self, edge: &EdgeTriple) -> StorageResult<()> {
        let edge = edge.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO edges (src, edge_name, dst) VALUES (?1, ?2, ?3)",
                params![edge.src.as_str(), edge.edge_name, edge.dst.as_str()],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete_edge(&self, edge: &EdgeTriple) -> StorageResult<()> {
        let edge = edge.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "DELETE FROM edges WHERE src = ?1 AND edge_name = ?2 AND dst = ?3",
                params![edge.src.as_str(), edge.edge_name, edge.dst.as_str()],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_edges(&self, src: &ObjectId, edge_name: &str) -> StorageResult<Vec<ObjectId>> {
        let src = src.to_string();
        let edge_name = edge_name.to_string();
        let rows = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT dst FROM edges WHERE src = ?1 AND edge_name = ?2 ORDER BY seq",
                )?;
                let rows = stmt
                    .query_map(params![src, edge_name], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(rows)
            })
            .await?;
        ids_from(rows)
    }

    async fn get_reverse_edges(
        &self,
        edge_name: &str,
        dst: &ObjectId,
    ) -> StorageResult<Vec<ObjectId>> {
        let edge_name = edge_name.to_string();
        let dst = dst.to_string();
        let rows = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT src FROM edges WHERE edge_name = ?1 AND dst = ?2 ORDER BY src",
                )?;
                let rows = stmt
                    .query_map(params![edge_name, dst], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(rows)
            })
            .await?;
        ids_from(rows)
    }
}
