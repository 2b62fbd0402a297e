//! Metrics and observability for connectors.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Metrics collector for a connector instance
///
/// Thin label holder over the `metrics` facade; clones share the same
/// series. The host decides which exporter (if any) consumes them.
#[derive(Debug, Clone)]
pub struct ConnectorMetrics {
    /// Tenant/partition label
    tenant: String,
}

impl ConnectorMetrics {
    /// Create a new metrics collector
    pub fn new(tenant: impl Into<String>) -> Self {
        Self::register_metrics();

        Self {
            tenant: tenant.into(),
        }
    }

    /// Register metric descriptions
    fn register_metrics() {
        describe_counter!(
            "connector_messages_received_total",
            "Total number of inbound messages tapped from the broker"
        );
        describe_counter!(
            "connector_messages_processed_total",
            "Total number of messages successfully processed"
        );
        describe_counter!(
            "connector_messages_dropped_total",
            "Total number of messages dropped, by pipeline stage"
        );
        describe_counter!(
            "connector_reconnect_attempts_total",
            "Total number of reconnect attempts"
        );

        describe_histogram!(
            "connector_processing_duration_seconds",
            "Time spent converting and processing each message"
        );

        describe_gauge!(
            "connector_connected",
            "Connection state (1 = connected, 0 = not connected)"
        );
        describe_gauge!(
            "connector_health",
            "Pipeline health status (1 = healthy, 0 = unhealthy)"
        );
    }

    /// Record an inbound message
    pub fn record_received(&self) {
        counter!(
            "connector_messages_received_total",
            "tenant" => self.tenant.clone(),
        )
        .increment(1);
    }

    /// Record a message successfully processed
    pub fn record_processed(&self) {
        counter!(
            "connector_messages_processed_total",
            "tenant" => self.tenant.clone(),
        )
        .increment(1);
    }

    /// Record a dropped message, labelled with the stage that dropped it
    pub fn record_dropped(&self, stage: &str) {
        counter!(
            "connector_messages_dropped_total",
            "tenant" => self.tenant.clone(),
            "stage" => stage.to_string(),
        )
        .increment(1);
    }

    /// Record a reconnect attempt
    pub fn record_reconnect(&self) {
        counter!(
            "connector_reconnect_attempts_total",
            "tenant" => self.tenant.clone(),
        )
        .increment(1);
    }

    /// Record the time one message spent in convert + process
    pub fn record_processing_time(&self, duration: Duration) {
        histogram!(
            "connector_processing_duration_seconds",
            "tenant" => self.tenant.clone(),
        )
        .record(duration.as_secs_f64());
    }

    /// Set the connection-state gauge
    pub fn set_connected(&self, connected: bool) {
        gauge!(
            "connector_connected",
            "tenant" => self.tenant.clone(),
        )
        .set(if connected { 1.0 } else { 0.0 });
    }

    /// Set the pipeline health gauge
    pub fn set_health(&self, healthy: bool) {
        gauge!(
            "connector_health",
            "tenant" => self.tenant.clone(),
        )
        .set(if healthy { 1.0 } else { 0.0 });
    }
}
