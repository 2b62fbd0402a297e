//! Parameter extraction - canonical metadata from protocol properties.
//!
//! The upstream broker republishes device traffic with the original device
//! address attached as the `orig_address` user property, dot-delimited. The
//! extractor rewrites it into a `/`-delimited path and classifies the
//! message by its leading routing segment.

use crate::message::{MessageMetadata, RawMessage, TransportMessageType};
use crate::{ConnectorError, ConnectorResult};

/// User property carrying the original device address
pub const ORIG_ADDRESS_PROPERTY: &str = "orig_address";

const TELEMETRY_PREFIX: &str = "t/";
const CONTROL_PREFIX: &str = "c/";

/// Derive canonical metadata from a raw message
///
/// The original address has its dot separators rewritten to `/`, then the
/// leading segment decides the message kind: `t/` marks telemetry, `c/`
/// marks control, and the matched prefix is stripped from the destination.
/// An address matching neither prefix passes through whole as `Unmatched`.
///
/// # Errors
///
/// A missing or empty `orig_address` property is an
/// [`ConnectorError::InvalidMessage`]: terminal for this message, reported
/// on the connector error channel, and never allowed to reach the
/// connection layer.
pub fn extract_metadata(raw: &RawMessage) -> ConnectorResult<MessageMetadata> {
    let address = raw.property(ORIG_ADDRESS_PROPERTY).ok_or_else(|| {
        ConnectorError::invalid_message(
            format!("missing {} property", ORIG_ADDRESS_PROPERTY),
            raw.payload().to_vec(),
        )
    })?;

    if address.is_empty() {
        return Err(ConnectorError::invalid_message(
            format!("empty {} property", ORIG_ADDRESS_PROPERTY),
            raw.payload().to_vec(),
        ));
    }

    let path = address.replace('.', "/");

    let (message_type, destination) = if let Some(rest) = path.strip_prefix(TELEMETRY_PREFIX) {
        (TransportMessageType::Telemetry, rest.to_string())
    } else if let Some(rest) = path.strip_prefix(CONTROL_PREFIX) {
        (TransportMessageType::Control, rest.to_string())
    } else {
        (TransportMessageType::Unmatched, path)
    };

    Ok(MessageMetadata {
        message_type,
        destination,
        qos: raw.qos().into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::TransportQos;
    use rumqttc::v5::mqttbytes::QoS;

    fn raw_with_address(address: &str) -> RawMessage {
        RawMessage::new("telemetry/TENANT_A/data", QoS::AtMostOnce, &b"{}"[..])
            .with_property(ORIG_ADDRESS_PROPERTY, address)
    }

    #[test]
    fn test_telemetry_prefix() {
        let metadata = extract_metadata(&raw_with_address("t.sensor.temp")).unwrap();
        assert_eq!(metadata.message_type, TransportMessageType::Telemetry);
        assert_eq!(metadata.destination, "sensor/temp");
    }

    #[test]
    fn test_control_prefix() {
        let metadata = extract_metadata(&raw_with_address("c.actuator.cmd")).unwrap();
        assert_eq!(metadata.message_type, TransportMessageType::Control);
        assert_eq!(metadata.destination, "actuator/cmd");
    }

    #[test]
    fn test_unmatched_prefix_passes_through() {
        let metadata = extract_metadata(&raw_with_address("x.other")).unwrap();
        assert_eq!(metadata.message_type, TransportMessageType::Unmatched);
        assert_eq!(metadata.destination, "x/other");
    }

    #[test]
    fn test_destination_has_no_protocol_separators() {
        let metadata = extract_metadata(&raw_with_address("t.a.b.c.d")).unwrap();
        assert_eq!(metadata.destination, "a/b/c/d");
        assert!(!metadata.destination.contains('.'));
        assert!(!metadata.destination.starts_with("t/"));
    }

    #[test]
    fn test_qos_derived_from_delivery() {
        let raw = RawMessage::new("telemetry/TENANT_A/data", QoS::ExactlyOnce, &b"{}"[..])
            .with_property(ORIG_ADDRESS_PROPERTY, "t.sensor.temp");
        let metadata = extract_metadata(&raw).unwrap();
        assert_eq!(metadata.qos, TransportQos::ExactlyOnce);
    }

    #[test]
    fn test_missing_address_is_message_local_error() {
        let raw = RawMessage::new("telemetry/TENANT_A/data", QoS::AtMostOnce, &b"{}"[..]);
        let err = extract_metadata(&raw).unwrap_err();
        assert!(err.is_message_local());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_empty_address_is_message_local_error() {
        let err = extract_metadata(&raw_with_address("")).unwrap_err();
        assert!(err.is_message_local());
    }
}
