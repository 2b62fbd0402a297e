//! Message tap - splits the inbound protocol stream.
//!
//! Every inbound event is routed to exactly one of two logical channels:
//! telemetry payloads (PUBLISH packets) or broker-originated control
//! notifications (a server-sent DISCONNECT announcing the peer is about to
//! drop the link). Protocol housekeeping (acks, pings, connacks) carries no
//! application data and is skipped; a publish that cannot be represented is
//! dropped with a warning, never a fatal error.

use crate::connection::DisconnectNotice;
use crate::message::RawMessage;
use rumqttc::v5::mqttbytes::v5::{Disconnect, Packet};
use rumqttc::v5::Event;
use tracing::{trace, warn};

/// Outcome of tapping a single protocol event
#[derive(Debug)]
pub enum Tapped {
    /// An ordinary payload for the message pipeline
    Telemetry(RawMessage),
    /// A broker-originated control notification
    Notification(DisconnectNotice),
}

/// Splits the single inbound protocol stream into telemetry and
/// broker-notification channels
#[derive(Debug, Default)]
pub struct MessageTap;

impl MessageTap {
    /// Create a new message tap
    pub fn new() -> Self {
        Self
    }

    /// Classify one protocol event
    ///
    /// Returns `None` for events that carry nothing for either channel.
    pub fn tap(&self, event: Event) -> Option<Tapped> {
        match event {
            Event::Incoming(Packet::Publish(publish)) => {
                match RawMessage::from_publish(&publish) {
                    Ok(raw) => Some(Tapped::Telemetry(raw)),
                    Err(err) => {
                        warn!(%err, "dropping unclassifiable inbound message");
                        None
                    }
                }
            }
            Event::Incoming(Packet::Disconnect(disconnect)) => {
                Some(Tapped::Notification(notice_from(&disconnect)))
            }
            Event::Incoming(packet) => {
                trace!(?packet, "protocol housekeeping");
                None
            }
            Event::Outgoing(_) => None,
        }
    }
}

fn notice_from(disconnect: &Disconnect) -> DisconnectNotice {
    let reason = disconnect
        .properties
        .as_ref()
        .and_then(|props| props.reason_string.clone())
        .unwrap_or_else(|| format!("{:?}", disconnect.reason_code));
    DisconnectNotice::new(reason)
}
