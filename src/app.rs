//! Framework assembly: wires every crate in the workspace into one running
//! process and implements the start/stop lifecycle.
//!
//! Mirrors the teacher's own `Server`-holds-a-tokio-handle-alongside-a-
//! dedicated-thread shape (`altruist_tick::TickEngine`), just one layer up:
//! `Altruist` is the thing a deployment actually constructs and owns.

use std::sync::Arc;
#[cfg(feature = "redis")]
use std::time::Duration;

use altruist_core::ProcessId;
use altruist_dispatch::{Portal, PortalDispatcher};
use altruist_network::{AllowAllAuth, NetworkServer, PlainAcceptor};
use altruist_scheduler::{AppStatus, AppStatusGate, SchedulerError};
use altruist_store::ConnectionStore;
use altruist_sync::SyncEngine;
use altruist_tick::TickEngine;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "redis")]
use altruist_redis::RedisBackplane;

use crate::config::AppConfig;
use crate::egress::{Egress, NoEgress};
use crate::error::StartupError;
use crate::router::{EngineRouter, Router};

/// How often the Redis connection directory mirror is rebuilt wholesale.
/// Independent of `engine.hz`: this is wall-clock housekeeping, not game
/// logic.
#[cfg(feature = "redis")]
const DIRECTORY_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// A fully assembled Altruist process: connection store, router, tick
/// engine, portal dispatcher, transport, and (optionally) the Redis
/// backplane, behind one handle.
pub struct Altruist {
    config: AppConfig,
    process_id: ProcessId,
    readiness: AppStatusGate,
    store: Arc<ConnectionStore>,
    router: Arc<dyn Router>,
    engine: TickEngine,
    dispatcher: Arc<PortalDispatcher>,
    network: Arc<NetworkServer>,
    #[cfg(feature = "redis")]
    backplane: Option<Arc<RedisBackplane>>,
}

impl Altruist {
    /// Assembles every component from `config` but does not start anything:
    /// no socket is bound, no tick thread is spawned, no Redis traffic is
    /// sent until [`Altruist::start`] runs.
    pub async fn new(config: AppConfig) -> Result<Arc<Self>, StartupError> {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info")))
            .try_init()
            .ok();

        let process_id = ProcessId::generate();
        let readiness = AppStatusGate::new();

        #[cfg(feature = "redis")]
        let (store, backplane) = if config.redis_enabled {
            let backplane = RedisBackplane::connect(config.cache.to_redis_config(), process_id).await?;
            let store = Arc::new(ConnectionStore::new(backplane.directory()));
            (store, Some(backplane))
        } else {
            (Arc::new(ConnectionStore::standalone()), None)
        };
        #[cfg(not(feature = "redis"))]
        let store = Arc::new(ConnectionStore::standalone());

        let egress: Arc<dyn Egress> = {
            #[cfg(feature = "redis")]
            {
                match &backplane {
                    Some(backplane) => backplane.clone() as Arc<dyn Egress>,
                    None => Arc::new(NoEgress),
                }
            }
            #[cfg(not(feature = "redis"))]
            {
                Arc::new(NoEgress)
            }
        };

        let engine = TickEngine::new(config.engine.to_tick_engine_config(), tokio::runtime::Handle::current(), readiness.clone())?;
        let sync_engine = SyncEngine::new();
        let router: Arc<dyn Router> = Arc::new(EngineRouter::new(store.clone(), egress, sync_engine, engine.clone()));

        let network = NetworkServer::new(config.transport.to_network_config(), process_id, Arc::new(PlainAcceptor), Arc::new(AllowAllAuth));

        Ok(Arc::new(Self {
            config,
            process_id,
            readiness,
            store,
            router,
            engine,
            dispatcher: Arc::new(PortalDispatcher::new()),
            network,
            #[cfg(feature = "redis")]
            backplane,
        }))
    }

    pub fn process_id(&self) -> ProcessId {
        self.process_id
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ConnectionStore> {
        &self.store
    }

    pub fn router(&self) -> &Arc<dyn Router> {
        &self.router
    }

    pub fn engine(&self) -> &TickEngine {
        &self.engine
    }

    /// Registers `portal` for its own gate at `priority`. Two portals
    /// registered for the same gate at equal priority is a startup
    /// configuration error.
    pub fn register_portal(&self, portal: impl Portal + 'static, priority: u32) -> Result<(), SchedulerError> {
        self.dispatcher.register(portal, priority)
    }

    /// Starts the tick engine, the transport accept loop, connection intake,
    /// and (when configured) the Redis ingress and directory-refresh loops,
    /// then flips the process to [`AppStatus::Alive`].
    pub fn start(self: &Arc<Self>) {
        self.engine.start();

        let new_conns = self.network.clone().spawn();
        tokio::spawn(Self::intake_loop(self.clone(), new_conns));

        #[cfg(feature = "redis")]
        if let Some(backplane) = &self.backplane {
            let sink = Arc::new(crate::backplane::RouterIngressSink::new(self.router.clone()));
            backplane.spawn_ingress_loop(sink);
            backplane.spawn_directory_refresh(DIRECTORY_REFRESH_INTERVAL);
        }

        self.readiness.set(AppStatus::Alive);
        info!(process_id = %self.process_id, hz = self.engine.rate(), "altruist started");
    }

    async fn intake_loop(this: Arc<Self>, new_conns: flume::Receiver<altruist_network::NewConnection>) {
        while let Ok(new_conn) = new_conns.recv_async().await {
            let this = this.clone();
            tokio::spawn(this.handle_connection(new_conn));
        }
    }

    async fn handle_connection(self: Arc<Self>, new_conn: altruist_network::NewConnection) {
        let altruist_network::NewConnection { connection, inbound } = new_conn;
        let id = connection.id().clone();

        if !self.store.add_connection(connection.clone(), None) {
            warn!(client = %id, "duplicate connection id on accept; dropping");
            connection.close();
            return;
        }

        #[cfg(feature = "redis")]
        if let Some(backplane) = &self.backplane {
            if let Err(e) = backplane.directory().publish_local(&connection).await {
                warn!(client = %id, error = %e, "failed to publish connection to the directory");
            }
        }

        debug!(client = %id, "connection accepted");

        while let Ok(envelope) = inbound.recv_async().await {
            if let Err(e) = self.dispatcher.dispatch(&envelope, id.clone()).await {
                warn!(client = %id, error = %e, "dispatch failed");
            }
        }

        self.store.remove_connection(&id);
        self.router.sync().forget_client(&id);

        #[cfg(feature = "redis")]
        if let Some(backplane) = &self.backplane {
            if let Err(e) = backplane.directory().retract_local(&id).await {
                warn!(client = %id, error = %e, "failed to retract connection from the directory");
            }
        }

        debug!(client = %id, "connection closed");
    }

    /// Exit behavior per the design's shutdown sequence: cancel the engine,
    /// close every locally owned connection, flush outstanding Redis writes
    /// best-effort, unsubscribe.
    pub async fn stop(&self) {
        self.readiness.set(AppStatus::ShuttingDown);
        self.network.shutdown();
        self.engine.stop();

        for conn in self.store.get_all_connections() {
            if conn.is_local() {
                conn.close();
            }
        }

        #[cfg(feature = "redis")]
        if let Some(backplane) = &self.backplane {
            backplane.stop();
        }

        info!(process_id = %self.process_id, "altruist stopped");
    }
}
