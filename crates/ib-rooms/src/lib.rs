pub mod manager;
pub mod store;

pub use manager::{ConnectionId, RoomHandle, RoomManager};
pub use store::{InMemorySnapshotStore, SnapshotStore, SqliteSnapshotStore};
