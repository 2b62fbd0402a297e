//! Configuration management for connectors.

use crate::{ConnectorError, ConnectorResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Tenant subscribed when none is configured
pub const DEFAULT_TENANT: &str = "DEFAULT_TENANT";

/// Main configuration for a connector instance
///
/// # Structure
/// - **Mandatory fields** (from environment): `host`, `tenant_ids`
/// - **Optional fields** (from config file or defaults): credentials,
///   `truststore_file`, `reconnect`
///
/// Immutable once loaded; each connector instance owns its config by value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Upstream broker host (mandatory, from CONNECTOR_HOST env var)
    pub host: String,

    /// Upstream broker port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Authentication username (optional)
    #[serde(default)]
    pub username: Option<String>,

    /// Authentication password (optional)
    #[serde(default)]
    pub password: Option<String>,

    /// Logical partitions to subscribe to, in priority order.
    ///
    /// Only the first entry is activated; additional entries are logged as
    /// skipped at connect time.
    pub tenant_ids: Vec<String>,

    /// Path to a TLS trust anchor file (PEM). A missing or unreadable file
    /// degrades to a warning and a plain TCP session, not a startup failure.
    #[serde(default)]
    pub truststore_file: Option<PathBuf>,

    /// Bounded-reconnect parameters (optional, from config file or defaults)
    #[serde(default)]
    pub reconnect: ReconnectSettings,
}

impl ConnectorConfig {
    /// Load mandatory configuration from environment variables
    ///
    /// Only reads mandatory fields:
    /// - `CONNECTOR_HOST`: upstream broker host (required)
    /// - `CONNECTOR_TENANT_ID`: comma-separated tenant list (required)
    ///
    /// Everything else uses defaults; load from a config file or call
    /// [`ConnectorConfig::apply_env_overrides`] to customize.
    pub fn from_env() -> ConnectorResult<Self> {
        let host = env::var("CONNECTOR_HOST")
            .map_err(|_| ConnectorError::config("CONNECTOR_HOST is required"))?;

        let tenant_ids = env::var("CONNECTOR_TENANT_ID")
            .map_err(|_| ConnectorError::config("CONNECTOR_TENANT_ID is required"))?;
        let tenant_ids = parse_tenant_list(&tenant_ids);

        let mut config = Self {
            host,
            tenant_ids,
            ..Self::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> ConnectorResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConnectorError::config(format!("Failed to read config file {}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            ConnectorError::config(format!("Failed to parse config file {}: {}", path, e))
        })
    }

    /// Apply environment variable overrides to the optional fields
    pub fn apply_env_overrides(&mut self) -> ConnectorResult<()> {
        if let Ok(val) = env::var("CONNECTOR_PORT") {
            self.port = val
                .parse()
                .map_err(|_| ConnectorError::config(format!("invalid CONNECTOR_PORT: {}", val)))?;
        }
        if let Ok(val) = env::var("CONNECTOR_USERNAME") {
            self.username = Some(val);
        }
        if let Ok(val) = env::var("CONNECTOR_PASSWORD") {
            self.password = Some(val);
        }
        if let Ok(val) = env::var("CONNECTOR_TRUSTSTORE_FILE") {
            self.truststore_file = Some(PathBuf::from(val));
        }
        if let Ok(val) = env::var("CONNECTOR_RECONNECT_ATTEMPTS") {
            self.reconnect.max_attempts = val.parse().map_err(|_| {
                ConnectorError::config(format!("invalid CONNECTOR_RECONNECT_ATTEMPTS: {}", val))
            })?;
        }
        if let Ok(val) = env::var("CONNECTOR_RECONNECT_INTERVAL_MS") {
            self.reconnect.interval_ms = val.parse().map_err(|_| {
                ConnectorError::config(format!("invalid CONNECTOR_RECONNECT_INTERVAL_MS: {}", val))
            })?;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConnectorResult<()> {
        if self.host.is_empty() {
            return Err(ConnectorError::config("host cannot be empty"));
        }

        if self.port == 0 {
            return Err(ConnectorError::config("port cannot be 0"));
        }

        if self.tenant_ids.is_empty() {
            return Err(ConnectorError::config("at least one tenant id is required"));
        }

        if self.tenant_ids.iter().any(|t| t.is_empty()) {
            return Err(ConnectorError::config("tenant ids cannot be empty"));
        }

        if self.reconnect.max_attempts == 0 {
            return Err(ConnectorError::config("reconnect max_attempts must be > 0"));
        }

        if self.reconnect.max_attempts > 100 {
            return Err(ConnectorError::config("reconnect max_attempts too high (max 100)"));
        }

        Ok(())
    }

    /// First configured tenant - the one actually subscribed
    pub fn primary_tenant(&self) -> &str {
        self.tenant_ids
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_TENANT)
    }
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            username: None,
            password: None,
            tenant_ids: vec![DEFAULT_TENANT.to_string()],
            truststore_file: None,
            reconnect: ReconnectSettings::default(),
        }
    }
}

fn parse_tenant_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn default_port() -> u16 {
    1883
}

/// Bounded-reconnect configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectSettings {
    /// Maximum number of reconnect attempts before the connector gives up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait between attempts, in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}
fn default_interval_ms() -> u64 {
    5000
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            interval_ms: 5000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ConnectorConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 1883);
        assert_eq!(config.tenant_ids, vec![DEFAULT_TENANT.to_string()]);
        assert_eq!(config.reconnect.max_attempts, 5);
        assert_eq!(config.reconnect.interval_ms, 5000);
    }

    #[test]
    fn test_config_validation() {
        let mut config = ConnectorConfig::default();
        assert!(config.validate().is_ok());

        config.host = "".to_string();
        assert!(config.validate().is_err());

        config.host = "broker.example.com".to_string();
        config.tenant_ids.clear();
        assert!(config.validate().is_err());

        config.tenant_ids = vec!["TENANT_A".to_string()];
        config.reconnect.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_toml() {
        let config: ConnectorConfig = toml::from_str(
            r#"
            host = "broker.example.com"
            port = 8883
            username = "connector"
            password = "secret"
            tenant_ids = ["TENANT_A", "TENANT_B"]
            truststore_file = "/etc/connector/ca.pem"

            [reconnect]
            max_attempts = 3
            interval_ms = 1000
            "#,
        )
        .unwrap();

        assert_eq!(config.host, "broker.example.com");
        assert_eq!(config.port, 8883);
        assert_eq!(config.username.as_deref(), Some("connector"));
        assert_eq!(config.tenant_ids.len(), 2);
        assert_eq!(config.primary_tenant(), "TENANT_A");
        assert_eq!(config.reconnect.max_attempts, 3);
        assert_eq!(config.reconnect.interval_ms, 1000);
    }

    #[test]
    fn test_config_toml_defaults() {
        // only mandatory fields present, everything else defaulted
        let config: ConnectorConfig = toml::from_str(
            r#"
            host = "broker.example.com"
            tenant_ids = ["TENANT_A"]
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 1883);
        assert!(config.username.is_none());
        assert!(config.truststore_file.is_none());
        assert_eq!(config.reconnect.max_attempts, 5);
    }

    #[test]
    fn test_tenant_list_parsing() {
        assert_eq!(
            parse_tenant_list("TENANT_A, TENANT_B,TENANT_C"),
            vec!["TENANT_A", "TENANT_B", "TENANT_C"]
        );
        assert_eq!(parse_tenant_list("TENANT_A,,"), vec!["TENANT_A"]);
        assert!(parse_tenant_list("").is_empty());
    }
}
