use std::any::Any;
use std::sync::Arc;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BackplaneError;
use crate::pool::RedisPool;

/// A type stored in the keyed document store.
///
/// `PREFIX` and `TYPE_NAME` mirror the source's `RedisDocument`
/// `{clrType, redisPrefix, typePropertyName}` metadata triple — `PREFIX`
/// builds the key (`"<prefix>[_<group>]:<id>"`), `TYPE_NAME` is the
/// discriminator embedded in every stored value so a polymorphic read can
/// find its way back to the right concrete type.
pub trait RedisDocument: Serialize + DeserializeOwned + Send + Sync + 'static {
    const PREFIX: &'static str;
    const TYPE_NAME: &'static str;
}

pub(crate) fn document_key(prefix: &str, group: Option<&str>, id: &str) -> String {
    match group {
        Some(g) => format!("{prefix}_{g}:{id}"),
        None => format!("{prefix}:{id}"),
    }
}

fn scan_pattern(prefix: &str, group: Option<&str>) -> String {
    match group {
        Some(g) => format!("{prefix}_{g}:*"),
        None => format!("{prefix}:*"),
    }
}

#[derive(Serialize, Deserialize)]
struct StoredDocument {
    type_name: String,
    payload: Value,
}

fn encode<T: RedisDocument>(value: &T) -> Result<String, BackplaneError> {
    let payload = serde_json::to_value(value).map_err(BackplaneError::Serialize)?;
    let stored = StoredDocument {
        type_name: T::TYPE_NAME.to_owned(),
        payload,
    };
    serde_json::to_string(&stored).map_err(BackplaneError::Serialize)
}

pub(crate) fn decode_for_cursor<T: RedisDocument>(raw: &str) -> Result<T, BackplaneError> {
    decode(raw)
}

fn decode<T: RedisDocument>(raw: &str) -> Result<T, BackplaneError> {
    let stored: StoredDocument = serde_json::from_str(raw).map_err(|source| BackplaneError::Deserialize {
        type_name: T::TYPE_NAME.to_owned(),
        source,
    })?;
    serde_json::from_value(stored.payload).map_err(|source| BackplaneError::Deserialize {
        type_name: stored.type_name,
        source,
    })
}

/// `save<T>` / `get<T>` / `remove<T>` / `clear<T>` / `contains<T>` over the
/// Redis-backed keyed document store.
#[derive(Clone)]
pub struct DocumentStore {
    pool: RedisPool,
}

impl DocumentStore {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    pub async fn save<T: RedisDocument>(&self, id: &str, value: &T, group: Option<&str>) -> Result<(), BackplaneError> {
        let key = document_key(T::PREFIX, group, id);
        let encoded = encode(value)?;
        self.pool.set(&key, &encoded).await
    }

    pub async fn get<T: RedisDocument>(&self, id: &str, group: Option<&str>) -> Result<Option<T>, BackplaneError> {
        let key = document_key(T::PREFIX, group, id);
        match self.pool.get(&key).await? {
            Some(raw) => Ok(Some(decode(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn remove<T: RedisDocument>(&self, id: &str, group: Option<&str>) -> Result<(), BackplaneError> {
        let key = document_key(T::PREFIX, group, id);
        self.pool.del(&key).await
    }

    pub async fn contains<T: RedisDocument>(&self, id: &str, group: Option<&str>) -> Result<bool, BackplaneError> {
        let key = document_key(T::PREFIX, group, id);
        self.pool.exists(&key).await
    }

    /// Deletes every document of type `T` (optionally scoped to `group`):
    /// `KEYS <prefix>[_<group>]:*` then `DEL` each match.
    pub async fn clear<T: RedisDocument>(&self, group: Option<&str>) -> Result<(), BackplaneError> {
        let pattern = scan_pattern(T::PREFIX, group);
        for key in self.pool.keys(&pattern).await? {
            self.pool.del(&key).await?;
        }
        Ok(())
    }

    /// An async cursor over every stored document of type `T`, SCANning in
    /// pages of `batch_size`.
    pub fn get_all<T: RedisDocument>(&self, group: Option<&str>, batch_size: usize) -> crate::cursor::DocumentCursor<T> {
        crate::cursor::DocumentCursor::new(self.pool.clone(), group, batch_size)
    }
}

type Decoder = dyn Fn(&Value) -> Result<Box<dyn Any + Send + Sync>, BackplaneError> + Send + Sync;

/// Resolves a stored document's embedded `type_name` back to a concrete
/// Rust type at a call site that only knows it wants "whatever is stored
/// under this prefix," e.g. `getAll` over a family of related document
/// types. Callers downcast the returned `Box<dyn Any>` to the type they
/// registered.
#[derive(Default)]
pub struct TypeRegistry {
    decoders: DashMap<&'static str, Arc<Decoder>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: RedisDocument>(&self) {
        self.decoders.insert(
            T::TYPE_NAME,
            Arc::new(|payload: &Value| -> Result<Box<dyn Any + Send + Sync>, BackplaneError> {
                let value: T = serde_json::from_value(payload.clone()).map_err(|source| BackplaneError::Deserialize {
                    type_name: T::TYPE_NAME.to_owned(),
                    source,
                })?;
                Ok(Box::new(value))
            }),
        );
    }

    pub(crate) fn decode_any(&self, raw: &str) -> Result<Box<dyn Any + Send + Sync>, BackplaneError> {
        let stored: StoredDocument = serde_json::from_str(raw).map_err(|source| BackplaneError::Deserialize {
            type_name: "<unknown>".to_owned(),
            source,
        })?;
        let decoder = self
            .decoders
            .get(stored.type_name.as_str())
            .ok_or_else(|| BackplaneError::UnknownType(stored.type_name.clone()))?;
        decoder(&stored.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Widget {
        name: String,
    }

    impl RedisDocument for Widget {
        const PREFIX: &'static str = "widget";
        const TYPE_NAME: &'static str = "Widget";
    }

    #[test]
    fn document_key_with_and_without_group() {
        assert_eq!(document_key("widget", None, "1"), "widget:1");
        assert_eq!(document_key("widget", Some("tenant-a"), "1"), "widget_tenant-a:1");
    }

    #[test]
    fn encode_decode_round_trips() {
        let w = Widget { name: "gear".to_owned() };
        let raw = encode(&w).unwrap();
        let back: Widget = decode(&raw).unwrap();
        assert_eq!(w, back);
    }

    #[test]
    fn type_registry_resolves_by_discriminator() {
        let registry = TypeRegistry::new();
        registry.register::<Widget>();

        let raw = encode(&Widget { name: "gear".to_owned() }).unwrap();
        let decoded = registry.decode_any(&raw).unwrap();
        let widget = decoded.downcast::<Widget>().unwrap();
        assert_eq!(widget.name, "gear");
    }

    #[test]
    fn type_registry_errors_on_unknown_discriminator() {
        let registry = TypeRegistry::new();
        let raw = encode(&Widget { name: "gear".to_owned() }).unwrap();
        let err = registry.decode_any(&raw).unwrap_err();
        assert!(matches!(err, BackplaneError::UnknownType(_)));
    }
}
