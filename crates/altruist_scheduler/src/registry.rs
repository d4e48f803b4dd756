use std::any::Any;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Errors raised while registering an override.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Two registrations for the same key declared the same priority. The
    /// teacher's "most-derived wins" rule has no equivalent in Rust's flat
    /// trait-impl world, so ties are a hard configuration error raised at
    /// startup instead of silently picking one.
    #[error("gate {key:?} has two registrations at priority {priority}; give one a higher priority")]
    PriorityCollision { key: String, priority: u32 },
}

/// Resolves "which registered override wins for this key" the way the
/// original reflection-based system picked the most-derived override:
/// here, explicitly, by priority.
///
/// Shared by the tick engine (keying on a caller-supplied task identity)
/// and the portal dispatcher (keying on a packet type discriminator).
pub struct OverrideRegistry<T> {
    entries: DashMap<String, (u32, Arc<T>)>,
}

impl<T> Default for OverrideRegistry<T> {
    fn default() -> Self {
        Self { entries: DashMap::new() }
    }
}

impl<T> OverrideRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `value` under `key` at `priority`. Higher priority wins a
    /// future collision; registering the same `(key, priority)` twice is a
    /// [`SchedulerError::PriorityCollision`].
    pub fn register(&self, key: impl Into<String>, priority: u32, value: T) -> Result<(), SchedulerError> {
        let key = key.into();
        match self.entries.entry(key.clone()) {
            Entry::Vacant(slot) => {
                slot.insert((priority, Arc::new(value)));
                Ok(())
            }
            Entry::Occupied(mut slot) => {
                let (existing_priority, _) = *slot.get();
                if priority > existing_priority {
                    slot.insert((priority, Arc::new(value)));
                    Ok(())
                } else if priority == existing_priority {
                    Err(SchedulerError::PriorityCollision { key, priority })
                } else {
                    Ok(())
                }
            }
        }
    }

    pub fn resolve(&self, key: &str) -> Option<Arc<T>> {
        self.entries.get(key).map(|e| e.value().1.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Caches a per-key binding the first time it's requested, the Rust
/// analogue of the teacher's "static task binding cache" keyed by
/// `(declaring type, method name, resolved param types)` — here the key is
/// whatever the caller already uses to identify a call site.
pub struct BindingCache<V> {
    cache: DashMap<(&'static str, &'static str), Arc<V>>,
}

impl<V> Default for BindingCache<V> {
    fn default() -> Self {
        Self { cache: DashMap::new() }
    }
}

impl<V> BindingCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached binding for `key`, computing and storing it via
    /// `init` on first use.
    pub fn get_or_insert_with(&self, key: (&'static str, &'static str), init: impl FnOnce() -> V) -> Arc<V> {
        self.cache.entry(key).or_insert_with(|| Arc::new(init())).clone()
    }
}

/// A type-erased binding cache for callers that don't know `V` at the call
/// site (e.g. a generic registry keyed only by `TypeId`). Kept separate
/// from [`BindingCache`] rather than unifying the two: most callers know
/// their value type and shouldn't pay the downcast.
#[derive(Default)]
pub struct AnyBindingCache {
    cache: DashMap<(&'static str, &'static str), Arc<dyn Any + Send + Sync>>,
}

impl AnyBindingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_insert_with<V: Send + Sync + 'static>(&self, key: (&'static str, &'static str), init: impl FnOnce() -> V) -> Arc<V> {
        let entry = self.cache.entry(key).or_insert_with(|| Arc::new(init()) as Arc<dyn Any + Send + Sync>).clone();
        entry.downcast::<V>().expect("binding cache key reused with a different value type")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_priority_overrides_lower() {
        let reg: OverrideRegistry<&'static str> = OverrideRegistry::new();
        reg.register("chat", 1, "BaseChatPortal").unwrap();
        reg.register("chat", 5, "AdminChatPortal").unwrap();
        assert_eq!(*reg.resolve("chat").unwrap(), "AdminChatPortal");
    }

    #[test]
    fn lower_priority_after_higher_is_ignored() {
        let reg: OverrideRegistry<&'static str> = OverrideRegistry::new();
        reg.register("chat", 5, "AdminChatPortal").unwrap();
        reg.register("chat", 1, "BaseChatPortal").unwrap();
        assert_eq!(*reg.resolve("chat").unwrap(), "AdminChatPortal");
    }

    #[test]
    fn equal_priority_is_a_collision() {
        let reg: OverrideRegistry<&'static str> = OverrideRegistry::new();
        reg.register("chat", 1, "BaseChatPortal").unwrap();
        let err = reg.register("chat", 1, "OtherChatPortal").unwrap_err();
        assert!(matches!(err, SchedulerError::PriorityCollision { .. }));
    }

    #[test]
    fn binding_cache_computes_once() {
        let cache: BindingCache<u32> = BindingCache::new();
        let calls = std::sync::atomic::AtomicU32::new(0);
        let make = || {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            42
        };
        let key = ("MyPortal", "on_join");
        assert_eq!(*cache.get_or_insert_with(key, make), 42);
        assert_eq!(*cache.get_or_insert_with(key, make), 42);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
