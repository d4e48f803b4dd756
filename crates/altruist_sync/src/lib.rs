//! Delta synchronization: derive an ordered list of an entity type's synced
//! properties once, cache it, and compute a `(bitmask, sparse map)` delta
//! against each client's last-sent values.
//!
//! Nothing here knows about packets or the network — `altruist`'s
//! `ClientSynchronizator` calls [`SyncEngine::compute_delta`] and wraps the
//! result in a `SyncPacket` for the router to deliver.

mod delta;
mod engine;
mod synced;

pub use delta::Delta;
pub use engine::SyncEngine;
pub use synced::{layout_for, PropertyLayout, Synced};
