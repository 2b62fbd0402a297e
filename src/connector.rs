//! Connector orchestration.
//!
//! Composes a connection manager, the parameter extractor, and the
//! converter/processor collaborators into one lifecycle-managed unit. A
//! single pump task per connector drives the protocol event loop; tap
//! dispatch, extraction, conversion and processing all run inline on that
//! task, so processing speed is the de-facto backpressure on ingestion.

use crate::config::ConnectorConfig;
use crate::connection::{ConnectionManager, DisconnectNotice, LinkEvent};
use crate::extract::extract_metadata;
use crate::message::{MessageContext, RawMessage};
use crate::metrics::ConnectorMetrics;
use crate::signal::{Completion, CompletionSignal};
use crate::traits::{Converter, Processor};
use crate::utils::HealthChecker;
use crate::{ConnectorError, ConnectorResult};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

const ERROR_CHANNEL_CAPACITY: usize = 16;
const HEALTH_FAILURE_THRESHOLD: usize = 3;

/// Lifecycle-managed connector instance
///
/// Create with [`Connector::new`], drive with [`Connector::start`] /
/// [`Connector::stop`]. Restartable: stop followed by start reuses the same
/// collaborators. Fatal errors (configuration aside, that is reconnect
/// exhaustion) arrive on the channel returned by
/// [`Connector::take_error_channel`]; message-local failures are reported
/// there too and can be told apart with [`ConnectorError::is_fatal`].
///
/// # Example
///
/// ```rust,no_run
/// use mqtt_connect_core::{
///     Connector, ConnectorConfig, MqttConnectionManager, Processor,
///     ConnectorResult, TransportConverter, TransportMessage,
/// };
/// use async_trait::async_trait;
///
/// struct PrintProcessor;
///
/// #[async_trait]
/// impl Processor for PrintProcessor {
///     async fn process(&mut self, message: TransportMessage) -> ConnectorResult<()> {
///         println!("{:?} {}", message.message_type(), message.destination());
///         Ok(())
///     }
/// }
///
/// #[tokio::main]
/// async fn main() -> ConnectorResult<()> {
///     let config = ConnectorConfig::from_env()?;
///     let manager = MqttConnectionManager::new(config.clone());
///     let mut connector = Connector::new(config, manager, TransportConverter, PrintProcessor);
///     connector.start().await?;
///     tokio::signal::ctrl_c().await.ok();
///     connector.stop().await
/// }
/// ```
pub struct Connector<M, C, P> {
    config: ConnectorConfig,
    metrics: ConnectorMetrics,
    error_tx: mpsc::Sender<ConnectorError>,
    error_rx: Option<mpsc::Receiver<ConnectorError>>,
    closed_signal: Option<CompletionSignal>,
    closed: Option<Completion>,
    parts: Option<Parts<M, C, P>>,
    running: Option<Running<M, C, P>>,
}

/// Everything the pump task owns while the connector runs
struct Parts<M, C, P> {
    manager: M,
    pipeline: Pipeline<C, P>,
}

struct Running<M, C, P> {
    handle: JoinHandle<Parts<M, C, P>>,
    shutdown: watch::Sender<bool>,
}

impl<M, C, P> Connector<M, C, P>
where
    M: ConnectionManager + 'static,
    C: Converter + 'static,
    P: Processor + 'static,
{
    /// Compose a connector from its collaborators
    pub fn new(config: ConnectorConfig, manager: M, converter: C, processor: P) -> Self {
        let metrics = ConnectorMetrics::new(config.primary_tenant());
        let (error_tx, error_rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);

        let pipeline = Pipeline {
            converter,
            processor,
            metrics: metrics.clone(),
            health: HealthChecker::new(HEALTH_FAILURE_THRESHOLD),
            error_tx: error_tx.clone(),
        };

        Self {
            config,
            metrics,
            error_tx,
            error_rx: Some(error_rx),
            closed_signal: None,
            closed: None,
            parts: Some(Parts { manager, pipeline }),
            running: None,
        }
    }

    /// Validate configuration, connect, and begin pumping messages
    ///
    /// Resolves once the first connection attempt completes (tenant
    /// subscription issuance included, acknowledgement not awaited). Fails
    /// with a configuration error before any network activity, or a
    /// connection error when the broker cannot be reached.
    pub async fn start(&mut self) -> ConnectorResult<()> {
        init_tracing();
        self.config.validate()?;

        let mut parts = self
            .parts
            .take()
            .ok_or_else(|| ConnectorError::config("connector already started"))?;

        info!(
            host = %self.config.host,
            port = self.config.port,
            tenant = %self.config.primary_tenant(),
            "starting connector"
        );

        if let Err(err) = parts.manager.connect().await {
            self.parts = Some(parts);
            return Err(err);
        }

        // fresh termination signal per start; stop() and a fatal pump exit
        // race to complete it, exactly one wins
        let (closed_signal, closed) = CompletionSignal::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(pump(
            parts,
            shutdown_rx,
            closed_signal.clone(),
            self.error_tx.clone(),
        ));

        self.closed_signal = Some(closed_signal);
        self.closed = Some(closed);
        self.running = Some(Running {
            handle,
            shutdown: shutdown_tx,
        });
        self.metrics.set_health(true);
        info!("connector started");
        Ok(())
    }

    /// Stop pumping and tear the connection down
    ///
    /// Idempotent: calling it when already stopped succeeds trivially. A
    /// processor call already in flight is not interrupted; the pump
    /// finishes the current message first.
    pub async fn stop(&mut self) -> ConnectorResult<()> {
        let Some(running) = self.running.take() else {
            debug!("connector already stopped");
            return Ok(());
        };

        info!("stopping connector");
        let _ = running.shutdown.send(true);

        let mut parts = running.handle.await.map_err(|err| {
            ConnectorError::connection(format!("message pump task failed: {}", err))
        })?;
        let result = parts.manager.disconnect().await;
        self.parts = Some(parts);

        if let Some(signal) = &self.closed_signal {
            signal.complete();
        }
        self.metrics.set_health(false);
        info!("connector stopped");
        result
    }

    /// Whether the pump task has been started and not yet stopped
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Receiver for errors the connector reports while running
    ///
    /// Carries both fatal errors (reconnect exhaustion, after which the pump
    /// has stopped) and message-local classification errors; distinguish
    /// with [`ConnectorError::is_fatal`]. Available once.
    pub fn take_error_channel(&mut self) -> Option<mpsc::Receiver<ConnectorError>> {
        self.error_rx.take()
    }

    /// Future resolving when the pump terminates, by `stop()` or fatally
    ///
    /// Available once per `start()`.
    pub fn closed(&mut self) -> Option<Completion> {
        self.closed.take()
    }
}

/// The message pump: one cooperative loop per connector instance
async fn pump<M, C, P>(
    mut parts: Parts<M, C, P>,
    mut shutdown: watch::Receiver<bool>,
    closed: CompletionSignal,
    error_tx: mpsc::Sender<ConnectorError>,
) -> Parts<M, C, P>
where
    M: ConnectionManager,
    C: Converter,
    P: Processor,
{
    info!("message pump running");

    loop {
        let event = tokio::select! {
            _ = shutdown.changed() => {
                info!("message pump stopping");
                break;
            }
            event = parts.manager.poll() => event,
        };

        match event {
            Ok(LinkEvent::Message(raw)) => parts.pipeline.handle_message(raw).await,
            Ok(LinkEvent::PeerDisconnecting(notice)) => {
                parts.pipeline.handle_notification(&notice)
            }
            Err(err) => {
                error!(error = %err, "connection manager failed, stopping pump");
                parts.pipeline.metrics.set_health(false);
                if error_tx.try_send(err).is_err() {
                    warn!("error channel unavailable, fatal error not reported");
                }
                break;
            }
        }
    }

    closed.complete();
    parts
}

/// Per-message path: extract, convert, process
///
/// Every failure in here is terminal for that single message only; the next
/// message and the connection are unaffected.
struct Pipeline<C, P> {
    converter: C,
    processor: P,
    metrics: ConnectorMetrics,
    health: HealthChecker,
    error_tx: mpsc::Sender<ConnectorError>,
}

impl<C, P> Pipeline<C, P>
where
    C: Converter,
    P: Processor,
{
    async fn handle_message(&mut self, raw: RawMessage) {
        self.metrics.record_received();
        debug!(
            topic = raw.topic(),
            device_id = raw.property("device_id").unwrap_or("-"),
            tenant_id = raw.property("tenant_id").unwrap_or("-"),
            content_type = raw.content_type().unwrap_or("-"),
            bytes = raw.payload().len(),
            "received telemetry message"
        );

        let metadata = match extract_metadata(&raw) {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(error = %err, topic = raw.topic(), "cannot classify message, dropping");
                self.metrics.record_dropped("classification");
                if self.error_tx.try_send(err).is_err() {
                    debug!("error channel unavailable, classification error not reported");
                }
                return;
            }
        };

        let context = MessageContext::new(raw, metadata);
        let started = Instant::now();

        let message = match self.converter.convert(&context).await {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, "conversion failed, dropping message");
                self.metrics.record_dropped("conversion");
                return;
            }
        };

        match self.processor.process(message).await {
            Ok(()) => {
                self.metrics.record_processed();
                self.metrics.record_processing_time(started.elapsed());
                if self.health.record_success() {
                    info!("message pipeline recovered");
                    self.metrics.set_health(true);
                }
            }
            Err(err) => {
                warn!(error = %err, "processor rejected message, dropping");
                self.metrics.record_dropped("processing");
                if self.health.record_failure() {
                    warn!(
                        consecutive_failures = self.health.consecutive_failures(),
                        "message pipeline unhealthy"
                    );
                    self.metrics.set_health(false);
                }
            }
        }
    }

    fn handle_notification(&self, notice: &DisconnectNotice) {
        info!(reason = notice.reason(), "broker announced pending disconnect");
    }
}

/// Initialize tracing/logging
fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .ok(); // Ignore if already initialized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ORIG_ADDRESS_PROPERTY;
    use crate::message::TransportMessage;
    use crate::traits::TransportConverter;
    use async_trait::async_trait;
    use rumqttc::v5::mqttbytes::QoS;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingProcessor {
        destinations: Arc<Mutex<Vec<String>>>,
        fail_destination: Option<String>,
    }

    #[async_trait]
    impl Processor for RecordingProcessor {
        async fn process(&mut self, message: TransportMessage) -> ConnectorResult<()> {
            if self.fail_destination.as_deref() == Some(message.destination()) {
                return Err(ConnectorError::processing("rejected by test processor"));
            }
            self.destinations
                .lock()
                .unwrap()
                .push(message.destination().to_string());
            Ok(())
        }
    }

    fn pipeline(processor: RecordingProcessor) -> Pipeline<TransportConverter, RecordingProcessor> {
        let (error_tx, _error_rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);
        Pipeline {
            converter: TransportConverter,
            processor,
            metrics: ConnectorMetrics::new("TENANT_A"),
            health: HealthChecker::new(HEALTH_FAILURE_THRESHOLD),
            error_tx,
        }
    }

    fn telemetry(address: &str) -> RawMessage {
        RawMessage::new("telemetry/TENANT_A/data", QoS::AtMostOnce, &b"{}"[..])
            .with_property(ORIG_ADDRESS_PROPERTY, address)
    }

    #[tokio::test]
    async fn test_processor_failure_does_not_block_next_message() {
        let processor = RecordingProcessor {
            fail_destination: Some("sensor/bad".to_string()),
            ..RecordingProcessor::default()
        };
        let destinations = processor.destinations.clone();
        let mut pipeline = pipeline(processor);

        pipeline.handle_message(telemetry("t.sensor.one")).await;
        pipeline.handle_message(telemetry("t.sensor.bad")).await;
        pipeline.handle_message(telemetry("t.sensor.two")).await;

        assert_eq!(
            *destinations.lock().unwrap(),
            vec!["sensor/one".to_string(), "sensor/two".to_string()]
        );
    }

    #[tokio::test]
    async fn test_unclassifiable_message_is_dropped_and_reported() {
        let processor = RecordingProcessor::default();
        let destinations = processor.destinations.clone();
        let (error_tx, mut error_rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);
        let mut pipeline = Pipeline {
            converter: TransportConverter,
            processor,
            metrics: ConnectorMetrics::new("TENANT_A"),
            health: HealthChecker::new(HEALTH_FAILURE_THRESHOLD),
            error_tx,
        };

        // no orig_address property at all
        let raw = RawMessage::new("telemetry/TENANT_A/data", QoS::AtMostOnce, &b"{}"[..]);
        pipeline.handle_message(raw).await;

        assert!(destinations.lock().unwrap().is_empty());
        let reported = error_rx.try_recv().unwrap();
        assert!(reported.is_message_local());
        assert!(!reported.is_fatal());
    }

    #[tokio::test]
    async fn test_unmatched_messages_are_still_forwarded() {
        let processor = RecordingProcessor::default();
        let destinations = processor.destinations.clone();
        let mut pipeline = pipeline(processor);

        pipeline.handle_message(telemetry("x.other")).await;

        assert_eq!(*destinations.lock().unwrap(), vec!["x/other".to_string()]);
    }

    #[tokio::test]
    async fn test_conversion_failure_is_message_local() {
        struct FailingConverter;

        #[async_trait]
        impl Converter for FailingConverter {
            async fn convert(&self, _: &MessageContext) -> ConnectorResult<TransportMessage> {
                Err(ConnectorError::conversion("refused by test converter"))
            }
        }

        let processor = RecordingProcessor::default();
        let destinations = processor.destinations.clone();
        let (error_tx, _error_rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);
        let mut pipeline = Pipeline {
            converter: FailingConverter,
            processor,
            metrics: ConnectorMetrics::new("TENANT_A"),
            health: HealthChecker::new(HEALTH_FAILURE_THRESHOLD),
            error_tx,
        };

        pipeline.handle_message(telemetry("t.sensor.temp")).await;
        assert!(destinations.lock().unwrap().is_empty());
    }

    #[test]
    fn test_handle_notification_does_not_panic() {
        let pipeline = pipeline(RecordingProcessor::default());
        pipeline.handle_notification(&DisconnectNotice::new("server shutting down"));
    }
}
