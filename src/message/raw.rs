//! RawMessage - the protocol-native inbound envelope

use crate::message::{TransportMessageType, TransportQos};
use crate::{ConnectorError, ConnectorResult};
use bytes::Bytes;
use rumqttc::v5::mqttbytes::v5::Publish;
use rumqttc::v5::mqttbytes::QoS;
use std::collections::HashMap;

/// Inbound message as delivered by the protocol layer
///
/// Carries the MQTT headers (topic, QoS, dup/retain flags), the user
/// properties the upstream broker attached when republishing device traffic,
/// and the untouched body payload. Opaque to everything except the parameter
/// extractor and the converter.
#[derive(Debug, Clone)]
pub struct RawMessage {
    topic: String,
    qos: QoS,
    retain: bool,
    dup: bool,
    content_type: Option<String>,
    properties: HashMap<String, String>,
    payload: Bytes,
}

impl RawMessage {
    /// Create a raw message from its protocol parts
    pub fn new(topic: impl Into<String>, qos: QoS, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            qos,
            retain: false,
            dup: false,
            content_type: None,
            properties: HashMap::new(),
            payload: payload.into(),
        }
    }

    /// Attach a user property (builder style)
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Set the content type (builder style)
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Build a raw message from an inbound PUBLISH packet
    ///
    /// Fails when the packet cannot be represented (non-UTF-8 topic); the
    /// tap drops such messages with a warning.
    pub(crate) fn from_publish(publish: &Publish) -> ConnectorResult<Self> {
        let topic = std::str::from_utf8(&publish.topic)
            .map_err(|e| {
                ConnectorError::invalid_message(
                    format!("non UTF-8 topic in inbound publish: {}", e),
                    publish.payload.to_vec(),
                )
            })?
            .to_string();

        let mut properties = HashMap::new();
        let mut content_type = None;
        if let Some(props) = &publish.properties {
            properties.extend(props.user_properties.iter().cloned());
            content_type = props.content_type.clone();
        }

        Ok(Self {
            topic,
            qos: publish.qos,
            retain: publish.retain,
            dup: publish.dup,
            content_type,
            properties,
            payload: publish.payload.clone(),
        })
    }

    /// Topic the broker delivered the message on
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Delivery QoS of the inbound publish
    pub fn qos(&self) -> QoS {
        self.qos
    }

    /// Retain flag of the inbound publish
    pub fn retain(&self) -> bool {
        self.retain
    }

    /// Dup flag of the inbound publish
    pub fn dup(&self) -> bool {
        self.dup
    }

    /// Content type, when the publisher set one
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Get a specific user property
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Access all user properties
    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    /// Body payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// Extraction-derived metadata for a single inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageMetadata {
    /// Classified message kind
    pub message_type: TransportMessageType,
    /// Normalized `/`-delimited destination, routing prefix stripped
    pub destination: String,
    /// Delivery guarantee derived from the protocol, at-most-once otherwise
    pub qos: TransportQos,
}

/// A raw message paired with its extracted metadata
///
/// Created per inbound message and handed to the converter; discarded once
/// the converter has produced the canonical form.
#[derive(Debug, Clone)]
pub struct MessageContext {
    raw: RawMessage,
    metadata: MessageMetadata,
}

impl MessageContext {
    /// Pair a raw message with its extracted metadata
    pub fn new(raw: RawMessage, metadata: MessageMetadata) -> Self {
        Self { raw, metadata }
    }

    /// The protocol-native message
    pub fn raw(&self) -> &RawMessage {
        &self.raw
    }

    /// The extracted metadata
    pub fn metadata(&self) -> &MessageMetadata {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_message_builder() {
        let raw = RawMessage::new("telemetry/TENANT_A/data", QoS::AtLeastOnce, &b"{}"[..])
            .with_property("orig_address", "t.sensor.temp")
            .with_property("device_id", "device-7")
            .with_content_type("application/json");

        assert_eq!(raw.topic(), "telemetry/TENANT_A/data");
        assert_eq!(raw.qos(), QoS::AtLeastOnce);
        assert_eq!(raw.property("orig_address"), Some("t.sensor.temp"));
        assert_eq!(raw.property("device_id"), Some("device-7"));
        assert_eq!(raw.property("missing"), None);
        assert_eq!(raw.content_type(), Some("application/json"));
        assert_eq!(raw.payload(), b"{}");
        assert!(!raw.retain());
        assert!(!raw.dup());
    }

    #[test]
    fn test_message_context() {
        let raw = RawMessage::new("telemetry/TENANT_A/data", QoS::AtMostOnce, &b"42"[..]);
        let metadata = MessageMetadata {
            message_type: TransportMessageType::Telemetry,
            destination: "sensor/temp".to_string(),
            qos: TransportQos::AtMostOnce,
        };

        let context = MessageContext::new(raw, metadata.clone());
        assert_eq!(context.metadata(), &metadata);
        assert_eq!(context.raw().payload(), b"42");
    }
}
