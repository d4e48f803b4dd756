use std::any::TypeId;
use std::sync::Arc;

use altruist_core::ClientId;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;

use crate::delta::Delta;
use crate::synced::{layout_for, Synced};

/// Computes per-client, per-entity deltas: which synced properties changed
/// since the last send, as a `(bitmask, sparse map)` pair.
///
/// State is keyed by `(clientId, entityType)`, matching §4.6; storage uses
/// the same `DashMap`-as-striped-locks shape `altruist_store::ConnectionStore`
/// uses for the same reason (many independent keys, short critical
/// sections) — a single writer at a time per key, readers copy under lock.
#[derive(Default)]
pub struct SyncEngine {
    state: DashMap<(ClientId, TypeId), Arc<Mutex<Vec<Value>>>>,
}

impl SyncEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the delta for `entity` as seen by `client`. Passing
    /// `force_all = true` sets every bit and is used for the first send
    /// after a client joins, to transmit a full snapshot.
    pub fn compute_delta<T: Synced>(&self, entity: &T, client: &ClientId, force_all: bool) -> Delta {
        let layout = layout_for::<T>();
        let key = (client.clone(), TypeId::of::<T>());
        let state = self
            .state
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(vec![Value::Null; layout.len()])))
            .clone();

        let values = entity.property_values();
        debug_assert_eq!(
            values.len(),
            layout.len(),
            "Synced::property_values() length must match Synced::SYNCED_PROPERTIES"
        );

        let mut last = state.lock();
        let mut delta = Delta::zeroed(layout.mask_words());
        for (i, name) in layout.names.iter().enumerate() {
            let new_value = &values[i];
            if force_all || last[i] != *new_value {
                delta.set_bit(i);
                delta.changed.insert((*name).to_owned(), new_value.clone());
                last[i] = new_value.clone();
            }
        }
        delta
    }

    /// Drops all sync state for `client` (e.g. on disconnect) across every
    /// entity type it had state for.
    pub fn forget_client(&self, client: &ClientId) {
        self.state.retain(|(c, _), _| c != client);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Avatar {
        name: String,
        x: f64,
        y: f64,
    }

    impl Synced for Avatar {
        const ENTITY_TYPE: &'static str = "Avatar";
        const SYNCED_PROPERTIES: &'static [&'static str] = &["name", "x", "y"];

        fn property_values(&self) -> Vec<Value> {
            vec![Value::from(self.name.clone()), Value::from(self.x), Value::from(self.y)]
        }
    }

    #[test]
    fn force_all_sets_every_bit() {
        let engine = SyncEngine::new();
        let entity = Avatar {
            name: "p".to_owned(),
            x: 0.0,
            y: 0.0,
        };
        let client: ClientId = "c".into();

        let delta = engine.compute_delta(&entity, &client, true);
        assert!(delta.bit(0) && delta.bit(1) && delta.bit(2));
        assert_eq!(delta.changed.len(), 3);
    }

    #[test]
    fn second_call_with_no_mutation_is_empty() {
        let engine = SyncEngine::new();
        let entity = Avatar {
            name: "p".to_owned(),
            x: 0.0,
            y: 0.0,
        };
        let client: ClientId = "c".into();

        engine.compute_delta(&entity, &client, true);
        let delta = engine.compute_delta(&entity, &client, false);
        assert!(delta.is_empty());
        assert!(delta.changed.is_empty());
    }

    #[test]
    fn mutation_of_one_property_sets_only_its_bit() {
        let engine = SyncEngine::new();
        let client: ClientId = "c".into();
        let mut entity = Avatar {
            name: "p".to_owned(),
            x: 0.0,
            y: 0.0,
        };
        engine.compute_delta(&entity, &client, false);

        entity.y = 3.0;
        let delta = engine.compute_delta(&entity, &client, false);
        assert!(!delta.bit(0));
        assert!(!delta.bit(1));
        assert!(delta.bit(2));
        assert_eq!(delta.changed.get("y"), Some(&Value::from(3.0)));
    }

    #[test]
    fn forget_client_drops_its_state() {
        let engine = SyncEngine::new();
        let client: ClientId = "c".into();
        let entity = Avatar {
            name: "p".to_owned(),
            x: 0.0,
            y: 0.0,
        };
        engine.compute_delta(&entity, &client, true);
        engine.forget_client(&client);

        // With state forgotten, the next call behaves like a first call
        // again: every bit set.
        let delta = engine.compute_delta(&entity, &client, false);
        assert!(delta.bit(0) && delta.bit(1) && delta.bit(2));
    }
}
