//! Override resolution and binding caches shared by the tick engine and the
//! portal dispatcher, plus the process-wide readiness gate the tick engine
//! parks on at startup.
//!
//! Nothing here knows about packets, sockets, or ticks; it only generalizes
//! "resolve the winning registration for a key, cache a computed binding
//! per key" into one reusable structure instead of duplicating it in both
//! consumers.

mod registry;
mod status;

pub use registry::{AnyBindingCache, BindingCache, OverrideRegistry, SchedulerError};
pub use status::{AppStatus, AppStatusGate};
