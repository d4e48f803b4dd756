use rustc_hash::FxHashSet;

use altruist_core::ClientId;
use parking_lot::RwLock;

/// Default room capacity when none is specified at creation.
pub const DEFAULT_MAX_CAPACITY: usize = 100;

/// A room: `{id, maxCapacity, connectionIds}`.
///
/// Membership is additive and idempotent: adding a member already present
/// is a no-op success, never an error. Capacity is enforced on add, not on
/// construction, so a room can be created with any id/capacity pair ahead
/// of anyone joining it.
pub struct Room {
    id: String,
    max_capacity: usize,
    members: RwLock<FxHashSet<ClientId>>,
}

impl Room {
    pub fn new(id: impl Into<String>, max_capacity: usize) -> Self {
        Self {
            id: id.into(),
            max_capacity,
            members: RwLock::new(FxHashSet::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.max_capacity
    }

    pub fn contains(&self, id: &ClientId) -> bool {
        self.members.read().contains(id)
    }

    /// Adds `id` to the room. Returns `false` only when the room is full
    /// and `id` wasn't already a member; re-adding an existing member
    /// always succeeds.
    pub fn add_member(&self, id: ClientId) -> bool {
        let mut members = self.members.write();
        if members.contains(&id) {
            return true;
        }
        if members.len() >= self.max_capacity {
            return false;
        }
        members.insert(id);
        true
    }

    /// Removes `id` from the room. Returns whether it had been a member.
    pub fn remove_member(&self, id: &ClientId) -> bool {
        self.members.write().remove(id)
    }

    pub fn member_ids(&self) -> Vec<ClientId> {
        self.members.read().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_member_is_idempotent() {
        let room = Room::new("r1", 2);
        let a: ClientId = "a".into();
        assert!(room.add_member(a.clone()));
        assert!(room.add_member(a.clone()));
        assert_eq!(room.len(), 1);
    }

    #[test]
    fn add_member_rejects_over_capacity() {
        let room = Room::new("r1", 1);
        assert!(room.add_member("a".into()));
        assert!(!room.add_member("b".into()));
        assert_eq!(room.len(), 1);
    }

    #[test]
    fn remove_then_empty() {
        let room = Room::new("r1", 2);
        room.add_member("a".into());
        assert!(room.remove_member(&"a".into()));
        assert!(room.is_empty());
    }
}
