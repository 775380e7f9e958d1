//! Snapshot Store Adapter — component **C2**.
//!
//! Persists a room's full CRDT-encoded state so it can be restored after
//! the process restarts or the room is evicted and later reopened. The
//! trait is intentionally narrow: load-by-id and save-by-id, both
//! idempotent, both safe to call from a background tick.

use async_trait::async_trait;
use ib_domain::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load(&self, room_id: &str) -> Result<Option<Vec<u8>>>;
    async fn save(&self, room_id: &str, state: &[u8]) -> Result<()>;
}

/// Dev-mode store: kept for local runs and tests where no `sqlite_path` is
/// configured. State does not survive a restart.
#[derive(Default)]
pub struct InMemorySnapshotStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn load(&self, room_id: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.lock().get(room_id).cloned())
    }

    async fn save(&self, room_id: &str, state: &[u8]) -> Result<()> {
        self.blobs.lock().insert(room_id.to_string(), state.to_vec());
        Ok(())
    }
}

/// Durable store backed by a single-file SQLite database. `rusqlite` is
/// synchronous; connection access is serialized behind a blocking mutex and
/// offloaded to `spawn_blocking` so it never stalls the async runtime.
pub struct SqliteSnapshotStore {
    conn: std::sync::Arc<Mutex<rusqlite::Connection>>,
}

impl SqliteSnapshotStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = rusqlite::Connection::open(path)
            .map_err(|e| Error::Storage(format!("opening snapshot db: {e}")))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS snapshots (
                room_id    TEXT PRIMARY KEY,
                blob       BLOB NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| Error::Storage(format!("creating snapshots table: {e}")))?;
        Ok(Self {
            conn: std::sync::Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn load(&self, room_id: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.conn.clone();
        let room_id = room_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            conn.query_row(
                "SELECT blob FROM snapshots WHERE room_id = ?1",
                [&room_id],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(Error::Storage(format!("loading snapshot: {other}"))),
            })
        })
        .await
        .map_err(|e| Error::Storage(format!("snapshot load task panicked: {e}")))?
    }

    async fn save(&self, room_id: &str, state: &[u8]) -> Result<()> {
        let conn = self.conn.clone();
        let room_id = room_id.to_string();
        let state = state.to_vec();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            conn.execute(
                "INSERT INTO snapshots (room_id, blob, updated_at)
                 VALUES (?1, ?2, datetime('now'))
                 ON CONFLICT(room_id) DO UPDATE SET blob = excluded.blob, updated_at = excluded.updated_at",
                rusqlite::params![room_id, state],
            )
            .map_err(|e| Error::Storage(format!("saving snapshot: {e}")))?;
            Ok(())
        })
        .await
        .map_err(|e| Error::Storage(format!("snapshot save task panicked: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_round_trips() {
        let store = InMemorySnapshotStore::new();
        assert!(store.load("r1").await.unwrap().is_none());
        store.save("r1", b"hello").await.unwrap();
        assert_eq!(store.load("r1").await.unwrap().unwrap(), b"hello");
    }

    #[tokio::test]
    async fn sqlite_round_trips_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots.db");

        {
            let store = SqliteSnapshotStore::open(&path).unwrap();
            store.save("r1", b"state-one").await.unwrap();
        }

        let reopened = SqliteSnapshotStore::open(&path).unwrap();
        assert_eq!(reopened.load("r1").await.unwrap().unwrap(), b"state-one");
        assert!(reopened.load("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sqlite_save_overwrites_existing_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteSnapshotStore::open(&dir.path().join("s.db")).unwrap();
        store.save("r1", b"v1").await.unwrap();
        store.save("r1", b"v2").await.unwrap();
        assert_eq!(store.load("r1").await.unwrap().unwrap(), b"v2");
    }
}
