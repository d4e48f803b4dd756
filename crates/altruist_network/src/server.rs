use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use altruist_core::{ClientId, Connection, ProcessId, TransportKind};
use altruist_protocol::{Envelope, PacketDecoder};
use anyhow::Context;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::gate::{Acceptor, AuthProvider};
use crate::outbound::WsOutboundHandle;

/// Settings for [`NetworkServer`]; mirrors the `transport.*` configuration
/// values.
#[derive(Clone, Debug)]
pub struct NetworkConfig {
    pub address: SocketAddr,
    pub max_connections: usize,
    pub keep_alive_minutes: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            address: ([0, 0, 0, 0], 7777).into(),
            max_connections: 1024,
            keep_alive_minutes: 2,
        }
    }
}

/// A freshly accepted connection, handed off to whatever owns the
/// connection store and portal dispatcher.
pub struct NewConnection {
    pub connection: Arc<Connection>,
    /// Decoded inbound packets, in arrival order.
    pub inbound: flume::Receiver<Envelope>,
}

/// Accepts WebSocket connections and turns each into a [`NewConnection`].
///
/// Owns sockets only: it knows nothing about rooms, portals, or the tick
/// engine. Everything past the handshake is a byte stream in, an
/// [`Envelope`] stream out.
pub struct NetworkServer {
    config: NetworkConfig,
    owner_process_id: ProcessId,
    acceptor: Arc<dyn Acceptor>,
    auth: Arc<dyn AuthProvider>,
    semaphore: Arc<Semaphore>,
}

impl NetworkServer {
    pub fn new(config: NetworkConfig, owner_process_id: ProcessId, acceptor: Arc<dyn Acceptor>, auth: Arc<dyn AuthProvider>) -> Arc<Self> {
        let semaphore = Arc::new(Semaphore::new(config.max_connections));
        Arc::new(Self {
            config,
            owner_process_id,
            acceptor,
            auth,
            semaphore,
        })
    }

    /// Spawns the accept loop as a background task and returns the channel
    /// of connections it produces.
    pub fn spawn(self: Arc<Self>) -> flume::Receiver<NewConnection> {
        let (tx, rx) = flume::bounded(64);
        tokio::spawn(async move {
            if let Err(e) = self.accept_loop(tx).await {
                error!("accept loop exited: {e:#}");
            }
        });
        rx
    }

    /// Closes the connection semaphore, causing the accept loop to return
    /// on its next iteration instead of accepting new connections.
    pub fn shutdown(&self) {
        self.semaphore.close();
    }

    async fn accept_loop(self: Arc<Self>, new_conns: flume::Sender<NewConnection>) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.config.address).await.context("binding listener")?;
        debug!(address = %self.config.address, "listening for connections");

        loop {
            let permit = match self.semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return Ok(()),
            };

            let (stream, remote_addr) = match listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("failed to accept connection: {e}");
                    continue;
                }
            };

            let this = self.clone();
            let new_conns = new_conns.clone();

            tokio::spawn(async move {
                if let Err(e) = this.handle_connection(stream, remote_addr, new_conns).await {
                    warn!(%remote_addr, "connection ended with error: {e:#}");
                }
                drop(permit);
            });
        }
    }

    async fn handle_connection(self: Arc<Self>, stream: TcpStream, remote_addr: SocketAddr, new_conns: flume::Sender<NewConnection>) -> anyhow::Result<()> {
        stream.set_nodelay(true).ok();

        let stream = self.acceptor.accept(stream).await.context("acceptor rejected stream")?;
        self.auth.authenticate(remote_addr).await.context("authentication rejected")?;

        let ws = tokio_tungstenite::accept_async(stream).await.context("websocket handshake failed")?;
        let (mut ws_sink, mut ws_stream) = ws.split();

        let (outbound_tx, outbound_rx) = flume::unbounded::<bytes::Bytes>();
        let connected = Arc::new(AtomicBool::new(true));
        let close_signal = Arc::new(tokio::sync::Notify::new());
        let handle: Arc<dyn altruist_core::OutboundHandle> = Arc::new(WsOutboundHandle::new(outbound_tx, connected.clone(), close_signal.clone()));

        let client_id = ClientId::new(Uuid::new_v4().to_string());
        let connection = Arc::new(Connection::new_local(client_id, TransportKind::WebSocket, self.owner_process_id, handle));

        let keep_alive = Duration::from_secs(self.config.keep_alive_minutes.max(1) * 60);
        let writer_connected = connected.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(keep_alive);
            ticker.tick().await; // first tick fires immediately; consume it
            loop {
                tokio::select! {
                    frame = outbound_rx.recv_async() => {
                        let Ok(frame) = frame else { break };
                        if ws_sink.send(Message::Binary(frame.to_vec())).await.is_err() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        if ws_sink.send(Message::Ping(Vec::new())).await.is_err() {
                            break;
                        }
                    }
                    _ = close_signal.notified() => {
                        break;
                    }
                }
            }
            writer_connected.store(false, Ordering::Release);
            let _ = ws_sink.close().await;
        });

        let (inbound_tx, inbound_rx) = flume::unbounded::<Envelope>();
        let reader_connected = connected;
        tokio::spawn(async move {
            let mut decoder = PacketDecoder::new();
            while let Some(msg) = ws_stream.next().await {
                let msg = match msg {
                    Ok(m) => m,
                    Err(_) => break,
                };
                let bytes = match msg {
                    Message::Binary(b) => b,
                    Message::Text(t) => t.into_bytes(),
                    Message::Close(_) => break,
                    Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
                };

                decoder.queue_slice(&bytes);
                loop {
                    match decoder.try_next_frame() {
                        Ok(Some(envelope)) => {
                            if inbound_tx.send(envelope).is_err() {
                                return;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            warn!("dropping malformed frame: {e}");
                            break;
                        }
                    }
                }
            }
            reader_connected.store(false, Ordering::Release);
        });

        new_conns
            .send_async(NewConnection { connection, inbound: inbound_rx })
            .await
            .map_err(|_| anyhow::anyhow!("new-connection channel closed"))
    }
}
