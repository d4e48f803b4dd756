//! Transport accept loop and per-connection I/O.
//!
//! This crate owns sockets and nothing else. It turns an accepted stream
//! into an [`altruist_core::Connection`] plus a channel of decoded
//! [`altruist_protocol::Envelope`]s and hands both to the caller as a
//! [`NewConnection`]. Registering the connection in a store, routing its
//! packets to a dispatcher, and everything past that boundary is the root
//! crate's job, not this one's.

mod gate;
mod outbound;
mod server;

pub use gate::{AllowAllAuth, Acceptor, AuthProvider, PlainAcceptor};
pub use outbound::WsOutboundHandle;
pub use server::{NetworkConfig, NetworkServer, NewConnection};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use altruist_core::ProcessId;

    use super::*;

    #[tokio::test]
    async fn shutdown_closes_the_new_connection_channel() {
        let config = NetworkConfig {
            address: ([127, 0, 0, 1], 0).into(),
            max_connections: 4,
            keep_alive_minutes: 2,
        };
        let server = NetworkServer::new(config, ProcessId::generate(), Arc::new(PlainAcceptor), Arc::new(AllowAllAuth));
        let rx = server.clone().spawn();
        server.shutdown();
        // Closing the semaphore makes the accept loop return, which drops
        // the sender and closes the channel with no connection ever sent.
        assert!(rx.recv_async().await.is_err());
    }
}
