//! Collaborator trait definitions.
//!
//! This module defines the two seams the connector pipeline is built over:
//! - `Converter`: turns a raw protocol message plus extracted metadata into
//!   the canonical transport form
//! - `Processor`: consumes canonical transport messages (storage, routing,
//!   business handling)

use crate::message::{MessageContext, TransportMessage};
use crate::ConnectorResult;
use async_trait::async_trait;

/// Trait for turning raw protocol messages into canonical transport messages
///
/// A failed conversion is terminal for that single message: the connector
/// logs it, drops the message, and moves on. The connection is never
/// affected.
///
/// # Example
///
/// ```rust,no_run
/// use mqtt_connect_core::{
///     Converter, ConnectorResult, MessageContext, TransportMessage,
/// };
/// use async_trait::async_trait;
///
/// /// Converter that refuses empty payloads
/// pub struct NonEmptyConverter;
///
/// #[async_trait]
/// impl Converter for NonEmptyConverter {
///     async fn convert(&self, context: &MessageContext) -> ConnectorResult<TransportMessage> {
///         if context.raw().payload().is_empty() {
///             return Err(mqtt_connect_core::ConnectorError::conversion("empty payload"));
///         }
///         let metadata = context.metadata();
///         Ok(TransportMessage::new(
///             metadata.message_type,
///             metadata.destination.clone(),
///             metadata.qos,
///             context.raw().payload().to_vec(),
///         ))
///     }
/// }
/// ```
#[async_trait]
pub trait Converter: Send + Sync {
    /// Build the canonical form of one inbound message
    async fn convert(&self, context: &MessageContext) -> ConnectorResult<TransportMessage>;
}

/// Trait for consuming canonical transport messages
///
/// # Return Value
///
/// - `Ok(())`: message handled
/// - `Err(_)`: logged and dropped; the core never retries, and the next
///   message is delivered regardless
///
/// # Backpressure
///
/// `process` is awaited inline on the connector's pump task, so a
/// non-yielding implementation throttles ingestion. Offload slow work to a
/// separate execution context if that is not the intent.
///
/// # Example
///
/// ```rust,no_run
/// use mqtt_connect_core::{Processor, ConnectorResult, TransportMessage};
/// use async_trait::async_trait;
///
/// pub struct LogProcessor;
///
/// #[async_trait]
/// impl Processor for LogProcessor {
///     async fn process(&mut self, message: TransportMessage) -> ConnectorResult<()> {
///         println!("{} -> {} bytes", message.destination(), message.payload().len());
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Processor: Send + Sync {
    /// Handle one canonical transport message
    async fn process(&mut self, message: TransportMessage) -> ConnectorResult<()>;
}

/// Stock converter: canonical metadata plus the untouched payload
///
/// The common case needs nothing beyond pairing the extracted metadata with
/// the raw payload bytes; implement [`Converter`] directly when payloads
/// need reshaping on the way through.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransportConverter;

#[async_trait]
impl Converter for TransportConverter {
    async fn convert(&self, context: &MessageContext) -> ConnectorResult<TransportMessage> {
        let metadata = context.metadata();
        Ok(TransportMessage::new(
            metadata.message_type,
            metadata.destination.clone(),
            metadata.qos,
            context.raw().payload().to_vec(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageMetadata, RawMessage, TransportMessageType, TransportQos};
    use rumqttc::v5::mqttbytes::QoS;

    #[tokio::test]
    async fn test_transport_converter_keeps_payload_and_metadata() {
        let raw = RawMessage::new("telemetry/TENANT_A/data", QoS::AtLeastOnce, &b"21.5"[..]);
        let context = MessageContext::new(
            raw,
            MessageMetadata {
                message_type: TransportMessageType::Telemetry,
                destination: "sensor/temp".to_string(),
                qos: TransportQos::AtLeastOnce,
            },
        );

        let message = TransportConverter.convert(&context).await.unwrap();
        assert_eq!(message.message_type(), TransportMessageType::Telemetry);
        assert_eq!(message.destination(), "sensor/temp");
        assert_eq!(message.qos(), TransportQos::AtLeastOnce);
        assert_eq!(message.payload(), b"21.5");
    }
}
