use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use altruist_core::{ClientId, Connection, ProcessId, TransportKind};
use dashmap::DashMap;
use tracing::debug;

use crate::room::{Room, DEFAULT_MAX_CAPACITY};

/// What the backplane knows about a connection this process doesn't own
/// locally. Resolved lazily by [`ConnectionStore::get_connection`] on a
/// local miss.
#[derive(Clone, Copy)]
pub struct ShadowInfo {
    pub transport: TransportKind,
    pub owner_process_id: ProcessId,
}

/// Seam onto the cross-process connection registry (`altruist_redis`).
/// `ConnectionStore` works standalone (single-process, no shadow lookups)
/// against the default no-op resolver; a deployment with the backplane
/// enabled injects a real one.
pub trait ShadowResolver: Send + Sync {
    fn resolve(&self, id: &ClientId) -> Option<ShadowInfo>;
}

/// Resolves nothing. Used when the Redis backplane feature is disabled.
pub struct NoShadow;

impl ShadowResolver for NoShadow {
    fn resolve(&self, _id: &ClientId) -> Option<ShadowInfo> {
        None
    }
}

/// Resolves `clientId -> Connection` and owns room membership.
///
/// Connections are held locally only for sockets this process owns; a
/// cross-process `Connection` is reconstructed as a read-only shadow via
/// [`ShadowResolver`] on every lookup miss rather than cached, since the
/// backplane is the source of truth for where it actually lives.
pub struct ConnectionStore {
    connections: DashMap<ClientId, Arc<Connection>>,
    rooms: DashMap<String, Arc<Room>>,
    shadow: Arc<dyn ShadowResolver>,
    anonymous_room_seq: AtomicU64,
}

impl ConnectionStore {
    pub fn new(shadow: Arc<dyn ShadowResolver>) -> Self {
        Self {
            connections: DashMap::new(),
            rooms: DashMap::new(),
            shadow,
            anonymous_room_seq: AtomicU64::new(0),
        }
    }

    pub fn standalone() -> Self {
        Self::new(Arc::new(NoShadow))
    }

    /// Registers a connection, optionally joining `room_id`. Rejects a
    /// duplicate id so a reconnect under the same id must remove the old
    /// entry first. Room capacity is checked *before* the connection is
    /// committed: if `room_id` names a room that is present but full, the
    /// whole call is rejected and the connection is never inserted.
    pub fn add_connection(&self, conn: Arc<Connection>, room_id: Option<&str>) -> bool {
        let id = conn.id().clone();
        if self.connections.contains_key(&id) {
            return false;
        }

        if let Some(room_id) = room_id {
            if let Some(room) = self.rooms.get(room_id) {
                if !room.add_member(id.clone()) {
                    return false;
                }
            }
        }

        self.connections.insert(id, conn);
        true
    }

    /// Removes a connection and its membership from every room, deleting
    /// any room left empty as a result.
    pub fn remove_connection(&self, id: &ClientId) {
        self.connections.remove(id);

        let mut emptied = Vec::new();
        for entry in self.rooms.iter() {
            if entry.value().remove_member(id) && entry.value().is_empty() {
                emptied.push(entry.key().clone());
            }
        }
        for room_id in emptied {
            self.rooms.remove(&room_id);
            debug!(room_id, "deleted emptied room");
        }
    }

    /// Local lookup first; on a miss, asks the [`ShadowResolver`] and
    /// returns a read-only shadow if it knows about the connection.
    pub fn get_connection(&self, id: &ClientId) -> Option<Arc<Connection>> {
        if let Some(conn) = self.connections.get(id) {
            return Some(conn.clone());
        }
        let shadow = self.shadow.resolve(id)?;
        Some(Arc::new(Connection::new_shadow(id.clone(), shadow.transport, shadow.owner_process_id)))
    }

    pub fn get_all_connections(&self) -> Vec<Arc<Connection>> {
        self.connections.iter().map(|e| e.value().clone()).collect()
    }

    pub fn get_connections_in_room(&self, room_id: &str) -> Vec<Arc<Connection>> {
        let Some(room) = self.rooms.get(room_id) else {
            return Vec::new();
        };
        room.member_ids().into_iter().filter_map(|id| self.get_connection(&id)).collect()
    }

    pub fn get_room(&self, room_id: &str) -> Option<Arc<Room>> {
        self.rooms.get(room_id).map(|e| e.value().clone())
    }

    pub fn get_all_rooms(&self) -> Vec<Arc<Room>> {
        self.rooms.iter().map(|e| e.value().clone()).collect()
    }

    /// Creates a room with the given id if it doesn't already exist.
    /// Returns the existing room otherwise.
    pub fn create_room(&self, id: impl Into<String>, max_capacity: usize) -> Arc<Room> {
        let id = id.into();
        self.rooms.entry(id.clone()).or_insert_with(|| Arc::new(Room::new(id, max_capacity))).clone()
    }

    /// Returns the first non-full room, creating a fresh one with the
    /// default capacity if none has space.
    pub fn find_available_room(&self) -> Arc<Room> {
        if let Some(room) = self.rooms.iter().find(|e| !e.value().is_full()) {
            return room.value().clone();
        }
        let seq = self.anonymous_room_seq.fetch_add(1, Ordering::Relaxed);
        self.create_room(format!("room-{seq}"), DEFAULT_MAX_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use altruist_core::{Connection, OutboundHandle, ProcessId, SendError};

    use super::*;

    struct NullHandle;
    impl OutboundHandle for NullHandle {
        fn try_send(&self, _frame: bytes::Bytes) -> Result<(), SendError> {
            Ok(())
        }
        fn is_connected(&self) -> bool {
            true
        }
        fn close(&self) {}
    }

    fn local_conn(id: &str) -> Arc<Connection> {
        Arc::new(Connection::new_local(id.into(), TransportKind::WebSocket, ProcessId::generate(), Arc::new(NullHandle)))
    }

    #[test]
    fn add_connection_rejects_duplicate_id() {
        let store = ConnectionStore::standalone();
        assert!(store.add_connection(local_conn("a"), None));
        assert!(!store.add_connection(local_conn("a"), None));
    }

    #[test]
    fn remove_connection_deletes_emptied_room() {
        let store = ConnectionStore::standalone();
        store.create_room("r1", 10);
        store.add_connection(local_conn("a"), Some("r1"));
        assert!(store.get_room("r1").is_some());

        store.remove_connection(&"a".into());
        assert!(store.get_room("r1").is_none());
    }

    #[test]
    fn find_available_room_creates_when_all_full() {
        let store = ConnectionStore::standalone();
        let room = store.create_room("full", 1);
        room.add_member("a".into());

        let available = store.find_available_room();
        assert_ne!(available.id(), "full");
    }

    #[test]
    fn get_connection_falls_back_to_shadow_on_miss() {
        struct AlwaysShadow;
        impl ShadowResolver for AlwaysShadow {
            fn resolve(&self, _id: &ClientId) -> Option<ShadowInfo> {
                Some(ShadowInfo {
                    transport: TransportKind::Tcp,
                    owner_process_id: ProcessId::generate(),
                })
            }
        }

        let store = ConnectionStore::new(Arc::new(AlwaysShadow));
        let conn = store.get_connection(&"remote".into()).unwrap();
        assert!(!conn.is_local());
    }
}
