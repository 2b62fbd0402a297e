//! TransportMessage - the canonical, protocol-agnostic form

use crate::ConnectorResult;
use rumqttc::v5::mqttbytes::QoS;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Kind of a canonical transport message
///
/// `Unmatched` marks messages whose original address carried neither the
/// telemetry nor the control routing prefix; they still flow through the
/// pipeline and the processor owns the policy for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportMessageType {
    /// Device-originated sensor/data payload
    Telemetry,
    /// Device-originated command/status payload
    Control,
    /// Neither routing prefix matched
    Unmatched,
}

/// Delivery guarantee level of a transport message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportQos {
    /// Fire and forget
    #[default]
    AtMostOnce,
    /// Acknowledged delivery
    AtLeastOnce,
    /// Assured, deduplicated delivery
    ExactlyOnce,
}

impl From<QoS> for TransportQos {
    fn from(qos: QoS) -> Self {
        match qos {
            QoS::AtMostOnce => TransportQos::AtMostOnce,
            QoS::AtLeastOnce => TransportQos::AtLeastOnce,
            QoS::ExactlyOnce => TransportQos::ExactlyOnce,
        }
    }
}

/// Canonical transport message produced by the converter
///
/// Owned transiently by the processor during handling; the connector keeps
/// no reference once `process` is called.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportMessage {
    message_type: TransportMessageType,
    destination: String,
    qos: TransportQos,
    payload: Vec<u8>,
}

impl TransportMessage {
    /// Create a canonical transport message
    pub fn new(
        message_type: TransportMessageType,
        destination: impl Into<String>,
        qos: TransportQos,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            message_type,
            destination: destination.into(),
            qos,
            payload,
        }
    }

    /// Message kind
    pub fn message_type(&self) -> TransportMessageType {
        self.message_type
    }

    /// Normalized `/`-delimited destination path
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Delivery guarantee
    pub fn qos(&self) -> TransportQos {
        self.qos
    }

    /// Payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Deserialize the payload as JSON into a concrete type
    ///
    /// # Example
    ///
    /// ```ignore
    /// #[derive(Deserialize)]
    /// struct Reading {
    ///     value: f64,
    ///     unit: String,
    /// }
    ///
    /// let reading: Reading = message.payload_json()?;
    /// ```
    pub fn payload_json<T: DeserializeOwned>(&self) -> ConnectorResult<T> {
        Ok(serde_json::from_slice(&self.payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qos_mapping() {
        assert_eq!(TransportQos::from(QoS::AtMostOnce), TransportQos::AtMostOnce);
        assert_eq!(TransportQos::from(QoS::AtLeastOnce), TransportQos::AtLeastOnce);
        assert_eq!(TransportQos::from(QoS::ExactlyOnce), TransportQos::ExactlyOnce);
        assert_eq!(TransportQos::default(), TransportQos::AtMostOnce);
    }

    #[test]
    fn test_transport_message_accessors() {
        let message = TransportMessage::new(
            TransportMessageType::Telemetry,
            "sensor/temp",
            TransportQos::AtLeastOnce,
            b"21.5".to_vec(),
        );

        assert_eq!(message.message_type(), TransportMessageType::Telemetry);
        assert_eq!(message.destination(), "sensor/temp");
        assert_eq!(message.qos(), TransportQos::AtLeastOnce);
        assert_eq!(message.payload(), b"21.5");
    }

    #[test]
    fn test_payload_json() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Reading {
            value: f64,
            unit: String,
        }

        let message = TransportMessage::new(
            TransportMessageType::Telemetry,
            "sensor/temp",
            TransportQos::AtMostOnce,
            br#"{"value": 21.5, "unit": "C"}"#.to_vec(),
        );

        let reading: Reading = message.payload_json().unwrap();
        assert_eq!(
            reading,
            Reading {
                value: 21.5,
                unit: "C".to_string()
            }
        );

        let message = TransportMessage::new(
            TransportMessageType::Telemetry,
            "sensor/temp",
            TransportQos::AtMostOnce,
            b"not json".to_vec(),
        );
        assert!(message.payload_json::<Reading>().is_err());
    }
}
