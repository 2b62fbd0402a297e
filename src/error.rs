//! Error types for connector operations.

use thiserror::Error;

/// Result type for connector operations
///
/// **Mandatory public API** - all connector methods return this.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Error types for connector operations
///
/// The taxonomy mirrors how errors propagate: `Configuration` and
/// `ReconnectExhausted` are fatal and reach the host; `Connection` triggers
/// the bounded reconnect path; the message-local variants (`InvalidMessage`,
/// `Conversion`, `Processing`) are terminal for a single message only and
/// never affect the connection.
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// Configuration error - detected at startup, aborts `start()`
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Connection error - transient network/auth failure, recoverable
    /// through the bounded reconnect path
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Reconnection gave up after the configured number of attempts
    ///
    /// Fatal: reported to the host, the connector stops pumping messages.
    #[error("reconnect attempts exhausted after {attempts} tries")]
    ReconnectExhausted { attempts: u32 },

    /// Malformed single message - classification failed, message is dropped
    #[error("Invalid message: {message}")]
    InvalidMessage { message: String, payload: Vec<u8> },

    /// Converter rejected a single message - message is dropped
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Processor reported a failure for a single message - logged, never
    /// retried by the core
    #[error("Processing error: {message}")]
    Processing {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// MQTT client request error
    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::v5::ClientError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConnectorError {
    /// Check if this error terminates the connector (propagates to the host)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ConnectorError::Configuration(_) | ConnectorError::ReconnectExhausted { .. }
        )
    }

    /// Check if this error is terminal for a single message only
    pub fn is_message_local(&self) -> bool {
        matches!(
            self,
            ConnectorError::InvalidMessage { .. }
                | ConnectorError::Conversion(_)
                | ConnectorError::Processing { .. }
        )
    }

    /// Check if this error is a connection-level failure
    pub fn is_connection(&self) -> bool {
        matches!(self, ConnectorError::Connection { .. })
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        ConnectorError::Configuration(message.into())
    }

    /// Create a connection error from a message
    pub fn connection(message: impl Into<String>) -> Self {
        ConnectorError::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection error with source
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid message error, keeping the payload for diagnostics
    pub fn invalid_message(message: impl Into<String>, payload: Vec<u8>) -> Self {
        ConnectorError::InvalidMessage {
            message: message.into(),
            payload,
        }
    }

    /// Create a conversion error
    pub fn conversion(message: impl Into<String>) -> Self {
        ConnectorError::Conversion(message.into())
    }

    /// Create a processing error from a message
    pub fn processing(message: impl Into<String>) -> Self {
        ConnectorError::Processing {
            message: message.into(),
            source: None,
        }
    }

    /// Create a processing error with source
    pub fn processing_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::Processing {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for ConnectorError {
    fn from(err: serde_json::Error) -> Self {
        ConnectorError::Conversion(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let config = ConnectorError::config("missing host");
        assert!(config.is_fatal());
        assert!(!config.is_message_local());

        let exhausted = ConnectorError::ReconnectExhausted { attempts: 5 };
        assert!(exhausted.is_fatal());

        let connection = ConnectorError::connection("broker unreachable");
        assert!(connection.is_connection());
        assert!(!connection.is_fatal());

        let invalid = ConnectorError::invalid_message("no orig_address", vec![1, 2, 3]);
        assert!(invalid.is_message_local());
        assert!(!invalid.is_fatal());

        let processing = ConnectorError::processing("store rejected message");
        assert!(processing.is_message_local());
    }

    #[test]
    fn test_error_display() {
        let err = ConnectorError::ReconnectExhausted { attempts: 5 };
        assert_eq!(err.to_string(), "reconnect attempts exhausted after 5 tries");

        let err = ConnectorError::config("tenant list empty");
        assert_eq!(err.to_string(), "Configuration error: tenant list empty");
    }
}
