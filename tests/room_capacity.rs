//! Room-full rejection, and the idempotent re-add this workspace chose
//! over optimistic concurrency control for the membership race (see
//! DESIGN.md, "Room mutation race").

use std::sync::Arc;

use altruist::{Connection, ProcessId, TransportKind};
use altruist_core::{OutboundHandle, SendError};
use altruist_store::ConnectionStore;
use bytes::Bytes;

struct NullHandle;

impl OutboundHandle for NullHandle {
    fn try_send(&self, _frame: Bytes) -> Result<(), SendError> {
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
fn joining_a_full_room_is_rejected() {
    let store = ConnectionStore::standalone();
    let room = store.create_room("lobby", 2);

    store.add_connection(local_conn("a"), Some("lobby"));
    store.add_connection(local_conn("b"), Some("lobby"));
    assert_eq!(room.len(), 2);
    assert!(room.is_full());

    // A third member can't join directly; a caller hitting this rejection
    // falls back to `find_available_room`, which creates a fresh room.
    assert!(!room.add_member("c".into()));
    assert_eq!(room.len(), 2);

    let fallback = store.find_available_room();
    assert_ne!(fallback.id(), room.id());
}

#[test]
fn rejoining_an_existing_member_of_a_full_room_still_succeeds() {
    let store = ConnectionStore::standalone();
    let room = store.create_room("lobby", 1);
    store.add_connection(local_conn("a"), Some("lobby"));

    assert!(room.add_member("a".into()));
    assert_eq!(room.len(), 1);
}

// Spec §8 scenario 4: addConnection("Z", connZ, roomId="R") on a full room
// must return false and leave the room's membership unchanged.
#[test]
fn add_connection_to_a_full_room_is_rejected_and_the_connection_is_never_registered() {
    let store = ConnectionStore::standalone();
    let room = store.create_room("R", 2);
    store.add_connection(local_conn("x"), Some("R"));
    store.add_connection(local_conn("y"), Some("R"));
    assert_eq!(room.len(), 2);

    let joined = store.add_connection(local_conn("z"), Some("R"));

    assert!(!joined);
    assert_eq!(room.member_ids().into_iter().map(|id| id.to_string()).collect::<std::collections::HashSet<_>>(), ["x", "y"].into_iter().map(str::to_owned).collect());
    assert!(store.get_connection(&"z".into()).is_none());
}
