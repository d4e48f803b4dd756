//! Maps a decoded packet's type discriminator to a registered [`Portal`]
//! handler.
//!
//! Override resolution (what happens when two portals register for the
//! same gate) is delegated to `altruist_scheduler::OverrideRegistry`
//! rather than reimplemented here.

mod dispatcher;
mod portal;

pub use dispatcher::PortalDispatcher;
pub use portal::Portal;
