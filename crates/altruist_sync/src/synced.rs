use std::any::{Any, TypeId};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use serde_json::Value;

/// A type whose instances are delta-synchronized to clients.
///
/// There's no runtime reflection in Rust, so where the source walked a
/// type's declared properties at class-load time, here the synced
/// properties are declared once by implementing this trait:
/// [`Synced::SYNCED_PROPERTIES`] is the ordered property name list (base
/// type's properties first, then this type's own, in declaration order —
/// same determinism rule as the source), and [`Synced::property_values`]
/// must return values in that exact order. A `#[derive(Synced)]` macro is
/// a natural follow-up but isn't required for this trait to work by hand.
pub trait Synced: Any + Send + Sync {
    /// The wire-level entity type name, carried in `SyncPacket::entity_type`.
    const ENTITY_TYPE: &'static str;

    /// Ordered synced-property names. Index `i` here is bit `i` in the
    /// mask `SyncEngine::compute_delta` returns.
    const SYNCED_PROPERTIES: &'static [&'static str];

    /// The current value of each property in [`Self::SYNCED_PROPERTIES`]
    /// order.
    fn property_values(&self) -> Vec<Value>;
}

/// The per-type layout metadata `SyncEngine` needs: the property count and
/// names. Computed once per `TypeId` and cached, mirroring the teacher's
/// own pattern of lazily building per-entity-type layout metadata
/// (`EntityManager`/`TrackedData`) the first time a type is touched rather
/// than on every access.
pub struct PropertyLayout {
    pub names: &'static [&'static str],
}

impl PropertyLayout {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn mask_words(&self) -> usize {
        self.len().div_ceil(64)
    }
}

static LAYOUTS: OnceLock<DashMap<TypeId, Arc<PropertyLayout>>> = OnceLock::new();

/// Returns the cached [`PropertyLayout`] for `T`, computing it on first
/// access.
pub fn layout_for<T: Synced>() -> Arc<PropertyLayout> {
    let registry = LAYOUTS.get_or_init(DashMap::new);
    registry
        .entry(TypeId::of::<T>())
        .or_insert_with(|| {
            Arc::new(PropertyLayout {
                names: T::SYNCED_PROPERTIES,
            })
        })
        .clone()
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
    fn layout_is_cached_across_calls() {
        let a = layout_for::<Avatar>();
        let b = layout_for::<Avatar>();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.len(), 3);
        assert_eq!(a.mask_words(), 1);
    }
}
