//! # MQTT Connect Core
//!
//! Connector core for ingesting device telemetry and control data from an
//! upstream MQTT broker into a canonical transport pipeline.
//!
//! The crate owns the hard part of the bridge: the connection lifecycle
//! (connect, loss detection, bounded autonomous reconnection), tapping the
//! inbound packet stream into telemetry and broker notifications, and
//! normalizing each message's protocol metadata - all without letting a
//! single malformed message destabilize the connection.
//!
//! ## Overview
//!
//! A [`Connector`] composes four collaborators:
//! - a [`ConnectionManager`] owning the upstream session
//!   ([`MqttConnectionManager`] is the stock implementation)
//! - the parameter extractor deriving canonical metadata (message type,
//!   destination, QoS) from the `orig_address` user property
//! - a [`Converter`] building the canonical [`TransportMessage`]
//! - a [`Processor`] consuming canonical messages
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mqtt_connect_core::{
//!     Connector, ConnectorConfig, ConnectorResult, MqttConnectionManager,
//!     Processor, TransportConverter, TransportMessage,
//! };
//! use async_trait::async_trait;
//!
//! pub struct StoreProcessor;
//!
//! #[async_trait]
//! impl Processor for StoreProcessor {
//!     async fn process(&mut self, message: TransportMessage) -> ConnectorResult<()> {
//!         // Route or persist the canonical message
//!         println!("{} ({} bytes)", message.destination(), message.payload().len());
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> ConnectorResult<()> {
//!     let config = ConnectorConfig::from_env()?;
//!     let manager = MqttConnectionManager::new(config.clone());
//!     let mut connector = Connector::new(config, manager, TransportConverter, StoreProcessor);
//!
//!     connector.start().await?;
//!     tokio::signal::ctrl_c().await.ok();
//!     connector.stop().await
//! }
//! ```
//!
//! ## Features
//!
//! - **Managed Lifecycle**: `start`/`stop` with exactly-once completion,
//!   safely restartable
//! - **Bounded Reconnection**: autonomous recovery from connection loss,
//!   capped attempts with a fixed wait between them
//! - **Message Isolation**: classification, conversion and processing
//!   failures are terminal for one message only
//! - **Observability**: structured logging, health tracking, and metrics via
//!   the `metrics` facade

mod config;
mod connection;
mod connector;
mod error;
mod extract;
mod message;
mod metrics;
mod retry;
mod signal;
mod tap;
mod traits;
pub mod utils;

// Re-export public API
pub use config::{ConnectorConfig, ReconnectSettings, DEFAULT_TENANT};
pub use connection::{
    ConnectionManager, ConnectionState, DisconnectNotice, LinkEvent, MqttConnectionManager,
};
pub use connector::Connector;
pub use error::{ConnectorError, ConnectorResult};
pub use extract::{extract_metadata, ORIG_ADDRESS_PROPERTY};
pub use message::{
    MessageContext, MessageMetadata, RawMessage, TransportMessage, TransportMessageType,
    TransportQos,
};
pub use metrics::ConnectorMetrics;
pub use signal::{Completion, CompletionSignal};
pub use tap::{MessageTap, Tapped};
pub use traits::{Converter, Processor, TransportConverter};
pub use utils::{HealthChecker, HealthStatus};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
