//! Connection lifecycle management.
//!
//! The `ConnectionManager` trait is the seam between orchestration and
//! protocol specifics: the connector drives whatever manager it is composed
//! with, and the manager owns the network session, loss detection, and the
//! bounded autonomous reconnect path.

mod mqtt;

pub use mqtt::MqttConnectionManager;

use crate::message::RawMessage;
use crate::ConnectorResult;
use async_trait::async_trait;

/// Connection state of a manager
///
/// Exactly one manager instance owns the authoritative state; transitions
/// are serialized through the manager's `&mut self` methods, so there is
/// never more than one connect in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session, nobody trying to establish one
    Disconnected,
    /// A connect call is establishing the session
    Connecting,
    /// Session established, subscriptions active
    Connected,
    /// Session lost, the manager is autonomously re-entering the connect path
    Reconnecting,
}

/// Broker-originated notification that the peer is about to drop the link
#[derive(Debug, Clone)]
pub struct DisconnectNotice {
    reason: String,
}

impl DisconnectNotice {
    /// Create a notice with the broker-supplied reason
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Broker-supplied reason text
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// One event yielded by a connection manager's poll loop
#[derive(Debug)]
pub enum LinkEvent {
    /// An ordinary inbound payload
    Message(RawMessage),
    /// The broker announced it is about to drop the connection
    PeerDisconnecting(DisconnectNotice),
}

/// Owns one upstream connection: establishment, loss detection, bounded
/// reconnection, and the inbound event stream
///
/// Implementations are protocol-specific ([`MqttConnectionManager`] for
/// MQTT); the connector is generic over this trait so orchestration logic
/// stays independent of the wire protocol.
#[async_trait]
pub trait ConnectionManager: Send {
    /// Establish the session
    ///
    /// When already connected, performs an orderly disconnect first. Resolves
    /// once the session is up and the telemetry subscription has been issued;
    /// completion is signalled exactly once per call even when the connect
    /// path races the autonomous reconnect path.
    async fn connect(&mut self) -> ConnectorResult<()>;

    /// Tear the session down
    ///
    /// A no-op that still resolves when no session is active.
    async fn disconnect(&mut self) -> ConnectorResult<()>;

    /// Current connection state
    fn state(&self) -> ConnectionState;

    /// Wait for the next inbound event
    ///
    /// Connection loss is handled inside this call: the manager transitions
    /// to [`ConnectionState::Reconnecting`] and re-enters the connect path on
    /// its own. Only reconnect exhaustion (or polling without a session)
    /// surfaces as an error.
    async fn poll(&mut self) -> ConnectorResult<LinkEvent>;
}
