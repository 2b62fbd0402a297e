//! Message types flowing through the connector.
//!
//! `RawMessage` is the protocol-native envelope handed out by the connection
//! layer; `MessageContext` pairs it with extraction-derived metadata for the
//! converter; `TransportMessage` is the canonical form consumed by
//! processors.

mod raw;
mod transport;

// Re-export message types
pub use raw::{MessageContext, MessageMetadata, RawMessage};
pub use transport::{TransportMessage, TransportMessageType, TransportQos};
