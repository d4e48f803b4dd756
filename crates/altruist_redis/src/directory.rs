use altruist_core::{ClientId, Connection, ProcessId, TransportKind};
use altruist_store::{ShadowInfo, ShadowResolver};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::documents::{DocumentStore, RedisDocument};
use crate::error::BackplaneError;

/// The document published for every locally owned connection so peer
/// processes can resolve it as a shadow.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionDocument {
    pub client_id: String,
    pub transport: TransportKind,
    pub owner_process_id: ProcessId,
}

impl RedisDocument for ConnectionDocument {
    const PREFIX: &'static str = "altruist:connection";
    const TYPE_NAME: &'static str = "ConnectionDocument";
}

/// A [`ShadowResolver`] backed by the Redis document store, with a local
/// mirror so [`ShadowResolver::resolve`] (called from `ConnectionStore`'s
/// synchronous hot path) never blocks on network I/O.
///
/// The mirror is kept current two ways: a process updates it immediately
/// whenever it publishes or retracts one of its own connections, and
/// [`ConnectionDirectory::refresh`] periodically rebuilds it wholesale from
/// every process's published documents — the "caller that sees a stale
/// room size will re-check on next operation" eventual-consistency model
/// from §4.3, applied to connection visibility instead of room membership.
pub struct ConnectionDirectory {
    documents: DocumentStore,
    mirror: DashMap<ClientId, ShadowInfo>,
}

impl ConnectionDirectory {
    pub fn new(documents: DocumentStore) -> Self {
        Self {
            documents,
            mirror: DashMap::new(),
        }
    }

    /// Publishes this process's ownership of `conn` so peers can resolve
    /// it. Call on connection accept and on any state change a peer might
    /// care about.
    pub async fn publish_local(&self, conn: &Connection) -> Result<(), BackplaneError> {
        let doc = ConnectionDocument {
            client_id: conn.id().as_str().to_owned(),
            transport: conn.transport(),
            owner_process_id: conn.owner_process_id(),
        };
        self.documents.save(conn.id().as_str(), &doc, None).await?;
        self.mirror.insert(
            conn.id().clone(),
            ShadowInfo {
                transport: conn.transport(),
                owner_process_id: conn.owner_process_id(),
            },
        );
        Ok(())
    }

    /// Retracts a connection this process no longer owns (on disconnect).
    pub async fn retract_local(&self, id: &ClientId) -> Result<(), BackplaneError> {
        self.documents.remove::<ConnectionDocument>(id.as_str(), None).await?;
        self.mirror.remove(id);
        Ok(())
    }

    /// Rebuilds the mirror from every `ConnectionDocument` currently
    /// published across the cluster, dropping anything no longer present.
    pub async fn refresh(&self) -> Result<(), BackplaneError> {
        let mut fresh: DashMap<ClientId, ShadowInfo> = DashMap::new();
        let mut cursor = self.documents.get_all::<ConnectionDocument>(None, 200);

        loop {
            let batch = cursor.next_batch().await?;
            for doc in &batch {
                fresh.insert(
                    ClientId::new(doc.client_id.clone()),
                    ShadowInfo {
                        transport: doc.transport,
                        owner_process_id: doc.owner_process_id,
                    },
                );
            }
            if !cursor.has_next() {
                break;
            }
        }

        self.mirror.retain(|id, _| fresh.contains_key(id));
        for entry in fresh {
            self.mirror.insert(entry.0, entry.1);
        }
        Ok(())
    }

    pub(crate) fn log_refresh_failure(err: &BackplaneError) {
        warn!(error = %err, "connection directory refresh failed; mirror may be stale until the next cycle");
    }
}

impl ShadowResolver for ConnectionDirectory {
    fn resolve(&self, id: &ClientId) -> Option<ShadowInfo> {
        self.mirror.get(id).map(|e| *e.value())
    }
}
