//! The Redis backplane: cross-process packet fan-out, the keyed document
//! store, typed `SCAN` cursors, and the reconnect/resubscribe protocol.
//!
//! A single-process deployment doesn't need this crate at all — it's
//! wired in only when the root crate's `redis` feature is enabled, and
//! every seam it fills (`altruist_store::ShadowResolver`,
//! `altruist_network`'s sender fallback) degrades gracefully without it.

mod backplane;
mod config;
mod cursor;
mod directory;
mod documents;
mod error;
mod pool;
mod queue;
mod reconnect;

pub use backplane::{IngressSink, RedisBackplane};
pub use config::RedisConfig;
pub use cursor::DocumentCursor;
pub use directory::{ConnectionDirectory, ConnectionDocument};
pub use documents::{DocumentStore, RedisDocument, TypeRegistry};
pub use error::BackplaneError;
pub use pool::RedisPool;
pub use queue::{IngressQueue, NOTIFY_CHANNEL, QUEUE_KEY};
pub use reconnect::{BackplaneEvent, BackplaneEvents, ReconnectPolicy};
