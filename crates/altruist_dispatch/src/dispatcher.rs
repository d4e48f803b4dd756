use altruist_core::{AltruistError, ClientId};
use altruist_protocol::Envelope;
use altruist_scheduler::{OverrideRegistry, SchedulerError};
use dashmap::DashSet;
use tracing::warn;

use crate::portal::Portal;

/// Maps a decoded packet's type discriminator to the portal registered for
/// it and invokes it.
///
/// Dispatch is O(1): a single map lookup on `envelope.packet_type`, no
/// scanning. Registration-time collisions (two portals claiming the same
/// gate at equal priority) are the only place this ever errors; runtime
/// dispatch never does — a miss is logged once per type and the packet is
/// dropped, per the propagation policy.
pub struct PortalDispatcher {
    portals: OverrideRegistry<Box<dyn Portal>>,
    warned_missing: DashSet<String>,
}

impl Default for PortalDispatcher {
    fn default() -> Self {
        Self {
            portals: OverrideRegistry::new(),
            warned_missing: DashSet::new(),
        }
    }
}

impl PortalDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `portal` for its own [`Portal::gate`]. Two portals
    /// registered for the same gate at the same `priority` is a startup
    /// configuration error.
    pub fn register(&self, portal: impl Portal + 'static, priority: u32) -> Result<(), SchedulerError> {
        let gate = portal.gate().to_owned();
        self.portals.register(gate, priority, Box::new(portal))
    }

    pub async fn dispatch(&self, envelope: &Envelope, client: ClientId) -> Result<(), AltruistError> {
        let Some(portal) = self.portals.resolve(&envelope.packet_type) else {
            if self.warned_missing.insert(envelope.packet_type.clone()) {
                warn!(packet_type = %envelope.packet_type, "no portal handler registered");
            }
            return Err(AltruistError::DispatchMiss {
                packet_type: envelope.packet_type.clone(),
            });
        };

        portal.handle(envelope, client.clone()).await.map_err(|source| AltruistError::Handler {
            packet_type: envelope.packet_type.clone(),
            client,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use altruist_core::packet::SuccessPacket;
    use altruist_core::Packet;
    use async_trait::async_trait;

    use super::*;

    struct EchoPortal;

    #[async_trait]
    impl Portal for EchoPortal {
        fn gate(&self) -> &str {
            SuccessPacket::TYPE
        }

        async fn handle(&self, _envelope: &Envelope, _client: ClientId) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct FailingPortal;

    #[async_trait]
    impl Portal for FailingPortal {
        fn gate(&self) -> &str {
            "Failing"
        }

        async fn handle(&self, _envelope: &Envelope, _client: ClientId) -> anyhow::Result<()> {
            anyhow::bail!("boom")
        }
    }

    fn envelope(packet_type: &str) -> Envelope {
        Envelope::pack(&SuccessPacket {
            message: "hi".to_owned(),
        })
        .map(|mut e| {
            e.packet_type = packet_type.to_owned();
            e
        })
        .unwrap()
    }

    #[tokio::test]
    async fn dispatches_to_registered_portal() {
        let dispatcher = PortalDispatcher::new();
        dispatcher.register(EchoPortal, 1).unwrap();

        let result = dispatcher.dispatch(&envelope(SuccessPacket::TYPE), "client-1".into()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn missing_registration_is_dispatch_miss() {
        let dispatcher = PortalDispatcher::new();
        let result = dispatcher.dispatch(&envelope("Unregistered"), "client-1".into()).await;
        assert!(matches!(result, Err(AltruistError::DispatchMiss { .. })));
    }

    #[tokio::test]
    async fn handler_error_is_wrapped() {
        let dispatcher = PortalDispatcher::new();
        dispatcher.register(FailingPortal, 1).unwrap();

        let result = dispatcher.dispatch(&envelope("Failing"), "client-1".into()).await;
        assert!(matches!(result, Err(AltruistError::Handler { .. })));
    }
}
