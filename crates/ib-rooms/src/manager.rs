//! Room Manager — component **C3**.
//!
//! Owns the registry of in-memory rooms: lazy load on first reference,
//! idle eviction, and the periodic snapshot tick. A room is loaded at most
//! once even when several connections race to open it at the same moment
//! (single-flight via a per-room `OnceCell`).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ib_crdt::BoardDocument;
use ib_domain::Result;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, OnceCell};

use crate::store::SnapshotStore;

pub type ConnectionId = u64;

/// One live room: its CRDT document plus the bookkeeping the manager needs
/// to decide when to snapshot or evict it.
pub struct RoomHandle {
    pub room_id: String,
    pub doc: Arc<BoardDocument>,
    dirty: AtomicBool,
    last_active: Mutex<DateTime<Utc>>,
    connections: RwLock<HashMap<ConnectionId, mpsc::Sender<Vec<u8>>>>,
}

impl RoomHandle {
    fn new(room_id: String, doc: Arc<BoardDocument>) -> Self {
        Self {
            room_id,
            doc,
            dirty: AtomicBool::new(false),
            last_active: Mutex::new(Utc::now()),
            connections: RwLock::new(HashMap::new()),
        }
    }

    pub fn touch(&self) {
        *self.last_active.lock() = Utc::now();
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Relaxed);
    }

    fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::Relaxed)
    }

    fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        let last = *self.last_active.lock();
        (now - last).to_std().unwrap_or_default()
    }

    pub fn register_connection(&self, id: ConnectionId, sink: mpsc::Sender<Vec<u8>>) {
        self.connections.write().insert(id, sink);
        self.touch();
    }

    pub fn remove_connection(&self, id: ConnectionId) {
        self.connections.write().remove(&id);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    /// Fan a frame out to every connection in the room except `except`
    /// (the frame's own sender, which already has the update applied).
    pub fn broadcast(&self, frame: Vec<u8>, except: Option<ConnectionId>) {
        let connections = self.connections.read();
        for (id, sink) in connections.iter() {
            if Some(*id) == except {
                continue;
            }
            let _ = sink.try_send(frame.clone());
        }
    }
}

/// Registry of live rooms plus the background maintenance operations the
/// gateway's timer loops drive.
pub struct RoomManager {
    rooms: RwLock<HashMap<String, Arc<RoomHandle>>>,
    loads: Mutex<HashMap<String, Arc<OnceCell<Arc<BoardDocument>>>>>,
    store: Arc<dyn SnapshotStore>,
    idle_timeout: Duration,
    next_connection_id: AtomicU64,
}

impl RoomManager {
    pub fn new(store: Arc<dyn SnapshotStore>, idle_timeout: Duration) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            loads: Mutex::new(HashMap::new()),
            store,
            idle_timeout,
            next_connection_id: AtomicU64::new(1),
        }
    }

    pub fn next_connection_id(&self) -> ConnectionId {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Fetch the room if already resident, without triggering a load.
    pub fn get(&self, room_id: &str) -> Option<Arc<RoomHandle>> {
        self.rooms.read().get(room_id).cloned()
    }

    /// Get a room, loading it from the snapshot store on first reference.
    /// Concurrent callers for the same `room_id` share one load.
    pub async fn get_or_create(&self, room_id: &str) -> Result<Arc<RoomHandle>> {
        if let Some(handle) = self.get(room_id) {
            handle.touch();
            return Ok(handle);
        }

        let cell = {
            let mut loads = self.loads.lock();
            loads
                .entry(room_id.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let doc = cell
            .get_or_try_init(|| async {
                match self.store.load(room_id).await? {
                    Some(bytes) => Ok(BoardDocument::from_snapshot(&bytes)
                        .map(Arc::new)
                        .unwrap_or_else(|e| {
                            tracing::warn!(room_id, error = %e, "discarding unreadable snapshot");
                            Arc::new(BoardDocument::new())
                        })),
                    None => Ok(Arc::new(BoardDocument::new())),
                }
            })
            .await?
            .clone();

        let handle = {
            let mut rooms = self.rooms.write();
            rooms
                .entry(room_id.to_string())
                .or_insert_with(|| Arc::new(RoomHandle::new(room_id.to_string(), doc)))
                .clone()
        };
        handle.touch();
        Ok(handle)
    }

    /// Snapshot every dirty room. Called from the gateway's periodic timer.
    pub async fn snapshot_tick(&self) {
        let rooms: Vec<Arc<RoomHandle>> = self.rooms.read().values().cloned().collect();
        for room in rooms {
            if !room.take_dirty() {
                continue;
            }
            let state = room.doc.encode_state();
            if let Err(e) = self.store.save(&room.room_id, &state).await {
                tracing::warn!(room_id = %room.room_id, error = %e, "snapshot save failed");
                room.mark_dirty();
            }
        }
    }

    /// Evict rooms that have no live connections and have been idle past
    /// the configured timeout, snapshotting first if dirty.
    pub async fn evict_idle(&self) {
        let now = Utc::now();
        let candidates: Vec<Arc<RoomHandle>> = self
            .rooms
            .read()
            .values()
            .filter(|r| r.connection_count() == 0 && r.idle_for(now) >= self.idle_timeout)
            .cloned()
            .collect();

        for room in candidates {
            if room.take_dirty() {
                let state = room.doc.encode_state();
                if let Err(e) = self.store.save(&room.room_id, &state).await {
                    tracing::warn!(room_id = %room.room_id, error = %e, "pre-eviction snapshot failed, keeping room resident");
                    continue;
                }
            }
            self.rooms.write().remove(&room.room_id);
            self.loads.lock().remove(&room.room_id);
            tracing::info!(room_id = %room.room_id, "room evicted");
        }
    }

    /// Sum of live connections across every resident room, for the
    /// gateway's `/metrics` endpoint.
    pub fn total_connections(&self) -> usize {
        self.rooms.read().values().map(|r| r.connection_count()).sum()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemorySnapshotStore;

    fn manager() -> RoomManager {
        RoomManager::new(Arc::new(InMemorySnapshotStore::new()), Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn get_or_create_loads_once_and_reuses_handle() {
        let mgr = manager();
        let a = mgr.get_or_create("r1").await.unwrap();
        let b = mgr.get_or_create("r1").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(mgr.room_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_get_or_create_shares_single_load() {
        let mgr = Arc::new(manager());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let mgr = mgr.clone();
            handles.push(tokio::spawn(async move { mgr.get_or_create("r1").await.unwrap() }));
        }
        let results: Vec<_> = futures_util::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        for pair in results.windows(2) {
            assert!(Arc::ptr_eq(&pair[0], &pair[1]));
        }
    }

    #[tokio::test]
    async fn snapshot_tick_only_saves_dirty_rooms() {
        let mgr = manager();
        let room = mgr.get_or_create("r1").await.unwrap();
        mgr.snapshot_tick().await;
        room.mark_dirty();
        mgr.snapshot_tick().await;
        assert!(!room.take_dirty());
    }

    #[tokio::test]
    async fn evict_idle_removes_empty_idle_rooms_but_not_active_ones() {
        let store = Arc::new(InMemorySnapshotStore::new());
        let mgr = RoomManager::new(store, Duration::from_secs(0));
        let idle_room = mgr.get_or_create("idle").await.unwrap();
        drop(idle_room);

        let active_room = mgr.get_or_create("active").await.unwrap();
        let (tx, _rx) = mpsc::channel(1);
        active_room.register_connection(1, tx);

        mgr.evict_idle().await;

        assert!(mgr.get("idle").is_none());
        assert!(mgr.get("active").is_some());
    }
}
