//! `clientId -> Connection` resolution and room membership.
//!
//! Connections are exclusively owned by whichever process accepted the
//! socket; this crate never reaches across the network itself to find one
//! it doesn't have, it asks a [`ShadowResolver`] (backed by the Redis
//! backplane when that feature is enabled).

mod room;
mod store;

pub use room::{Room, DEFAULT_MAX_CAPACITY};
pub use store::{ConnectionStore, NoShadow, ShadowInfo, ShadowResolver};
