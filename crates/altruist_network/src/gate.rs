//! Narrow trait seams for concerns this workspace deliberately doesn't
//! implement: TLS termination and session authentication.
//!
//! A deployment that needs either plugs a real implementation in; the
//! defaults here are permissive pass-throughs so the accept loop works
//! out of the box for local development and the test suite.

use async_trait::async_trait;
use tokio::net::TcpStream;

/// Wraps stream acceptance, e.g. for TLS termination in front of the
/// WebSocket handshake.
#[async_trait]
pub trait Acceptor: Send + Sync {
    async fn accept(&self, stream: TcpStream) -> anyhow::Result<TcpStream>;
}

/// Accepts the raw TCP stream unmodified. The default for plain-text
/// deployments (e.g. behind a TLS-terminating load balancer).
pub struct PlainAcceptor;

#[async_trait]
impl Acceptor for PlainAcceptor {
    async fn accept(&self, stream: TcpStream) -> anyhow::Result<TcpStream> {
        Ok(stream)
    }
}

/// Authenticates a new connection before it is handed off as a
/// [`crate::NewConnection`]. Out-of-scope concerns like JWT/session
/// validation live behind this seam.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, remote_addr: std::net::SocketAddr) -> anyhow::Result<()>;
}

/// Admits every connection. The default; a deployment with real auth
/// requirements supplies its own [`AuthProvider`].
pub struct AllowAllAuth;

#[async_trait]
impl AuthProvider for AllowAllAuth {
    async fn authenticate(&self, _remote_addr: std::net::SocketAddr) -> anyhow::Result<()> {
        Ok(())
    }
}
